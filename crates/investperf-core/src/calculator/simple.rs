use rust_decimal::Decimal;

use crate::error::InvestPerfError;
use crate::types::*;
use crate::InvestPerfResult;

/// `(end - start) / start` at `scale`. An end value of zero is a total loss.
pub fn simple_return(
    start_value: Money,
    end_value: Money,
    scale: u32,
    mode: RoundingMode,
) -> InvestPerfResult<Rate> {
    if start_value.is_zero() {
        return Err(InvestPerfError::invalid(
            "start_value",
            "must not be zero for a simple return",
        ));
    }
    if end_value.is_zero() {
        return Ok(Decimal::NEGATIVE_ONE);
    }
    divide(end_value - start_value, start_value, scale, mode, "simple return")
}
