pub mod analyze;
pub mod annualize;
pub mod calculate;
