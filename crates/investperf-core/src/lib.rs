pub mod error;
pub mod frequency;
pub mod input;
pub mod types;

#[cfg(feature = "calculators")]
pub mod annualize;

#[cfg(feature = "calculators")]
pub mod calculator;

#[cfg(feature = "analysis")]
pub mod analysis;

pub use error::InvestPerfError;
pub use types::*;

/// Standard result type for all investment performance operations
pub type InvestPerfResult<T> = Result<T, InvestPerfError>;
