use chrono::NaiveDate;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum InvestPerfError {
    #[error("Invalid input: {field}: {reason}")]
    InvalidInput { field: String, reason: String },

    #[error("Missing valuation for {date} ({context})")]
    MissingValuation { date: NaiveDate, context: String },

    #[error("Financial impossibility: {0}")]
    FinancialImpossibility(String),

    #[error("Unknown calculator: {name}")]
    UnknownCalculator { name: String },

    #[error("Division by zero in {context}")]
    DivisionByZero { context: String },

    #[error("Date error: {0}")]
    DateError(String),

    #[error("Serialization error: {0}")]
    SerializationError(String),
}

impl InvestPerfError {
    pub(crate) fn invalid(field: &str, reason: impl Into<String>) -> Self {
        InvestPerfError::InvalidInput {
            field: field.into(),
            reason: reason.into(),
        }
    }

    pub(crate) fn missing(date: NaiveDate, context: &str) -> Self {
        InvestPerfError::MissingValuation {
            date,
            context: context.into(),
        }
    }
}

impl From<serde_json::Error> for InvestPerfError {
    fn from(e: serde_json::Error) -> Self {
        InvestPerfError::SerializationError(e.to_string())
    }
}
