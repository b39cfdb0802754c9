use chrono::NaiveDate;
use rust_decimal::{Decimal, RoundingStrategy};
use rust_decimal_macros::dec;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use crate::error::InvestPerfError;
use crate::InvestPerfResult;

/// All monetary values (valuations, flows, incomes, profits).
pub type Money = Decimal;

/// Rates expressed as decimals (0.05 = 5%) unless a request asks for percent.
pub type Rate = Decimal;

/// Chronologically ordered mapping of dates to amounts (flows or incomes).
pub type DatedAmounts = BTreeMap<NaiveDate, Money>;

/// Largest scale a `Decimal` can carry.
pub const MAX_SCALE: u32 = 28;

/// Whether a flow on a boundary date happens before or after that day's valuation.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum FlowTiming {
    /// The flow is available for investment during the whole day it occurs.
    #[default]
    BeginningOfDay,
    /// The flow is only counted after the day's valuation.
    EndOfDay,
}

/// Annualization policy applied to a cumulative return.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum AnnualizationOption {
    #[default]
    DoNotAnnualize,
    Annualize,
    /// No-op for spans of one year or less.
    AnnualizeIfOverOneYear,
}

/// Decimal rounding mode, mirroring the usual fixed-point conventions.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum RoundingMode {
    #[default]
    HalfUp,
    HalfDown,
    HalfEven,
    Up,
    Down,
    Ceiling,
    Floor,
}

impl RoundingMode {
    pub fn strategy(self) -> RoundingStrategy {
        match self {
            RoundingMode::HalfUp => RoundingStrategy::MidpointAwayFromZero,
            RoundingMode::HalfDown => RoundingStrategy::MidpointTowardZero,
            RoundingMode::HalfEven => RoundingStrategy::MidpointNearestEven,
            RoundingMode::Up => RoundingStrategy::AwayFromZero,
            RoundingMode::Down => RoundingStrategy::ToZero,
            RoundingMode::Ceiling => RoundingStrategy::ToPositiveInfinity,
            RoundingMode::Floor => RoundingStrategy::ToNegativeInfinity,
        }
    }
}

fn normalize_token(s: &str) -> String {
    s.chars()
        .filter(|c| *c != '_' && *c != '-' && *c != ' ')
        .collect::<String>()
        .to_ascii_lowercase()
}

impl FromStr for FlowTiming {
    type Err = InvestPerfError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match normalize_token(s).as_str() {
            "beginningofday" | "bod" => Ok(FlowTiming::BeginningOfDay),
            "endofday" | "eod" => Ok(FlowTiming::EndOfDay),
            _ => Err(InvestPerfError::invalid(
                "flow_timing",
                format!("'{s}' is not one of: beginning-of-day, end-of-day"),
            )),
        }
    }
}

impl FromStr for AnnualizationOption {
    type Err = InvestPerfError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match normalize_token(s).as_str() {
            "donotannualize" | "none" => Ok(AnnualizationOption::DoNotAnnualize),
            "annualize" => Ok(AnnualizationOption::Annualize),
            "annualizeifoveroneyear" => Ok(AnnualizationOption::AnnualizeIfOverOneYear),
            _ => Err(InvestPerfError::invalid(
                "annualization",
                format!(
                    "'{s}' is not one of: do-not-annualize, annualize, annualize-if-over-one-year"
                ),
            )),
        }
    }
}

impl FromStr for RoundingMode {
    type Err = InvestPerfError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match normalize_token(s).as_str() {
            "halfup" => Ok(RoundingMode::HalfUp),
            "halfdown" => Ok(RoundingMode::HalfDown),
            "halfeven" => Ok(RoundingMode::HalfEven),
            "up" => Ok(RoundingMode::Up),
            "down" => Ok(RoundingMode::Down),
            "ceiling" => Ok(RoundingMode::Ceiling),
            "floor" => Ok(RoundingMode::Floor),
            _ => Err(InvestPerfError::invalid(
                "rounding_mode",
                format!("'{s}' is not a known rounding mode"),
            )),
        }
    }
}

impl fmt::Display for FlowTiming {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FlowTiming::BeginningOfDay => write!(f, "beginning-of-day"),
            FlowTiming::EndOfDay => write!(f, "end-of-day"),
        }
    }
}

/// A single dated amount, as found in serialized inputs.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DatedAmount {
    pub date: NaiveDate,
    pub amount: Money,
}

// ---------------------------------------------------------------------------
// Decimal helpers
// ---------------------------------------------------------------------------

/// Round to exactly `scale` decimal places, padding with zeros when needed.
pub fn set_scale(value: Decimal, scale: u32, mode: RoundingMode) -> Decimal {
    let mut scaled = value.round_dp_with_strategy(scale, mode.strategy());
    scaled.rescale(scale);
    // -0.001 rounds to zero, never to "-0.00"
    if scaled.is_zero() {
        scaled.set_sign_positive(true);
    }
    scaled
}

/// `numerator / denominator`, rounded to `scale`.
pub fn divide(
    numerator: Decimal,
    denominator: Decimal,
    scale: u32,
    mode: RoundingMode,
    context: &str,
) -> InvestPerfResult<Decimal> {
    if denominator.is_zero() {
        return Err(InvestPerfError::DivisionByZero {
            context: context.into(),
        });
    }
    let quotient = numerator
        .checked_div(denominator)
        .ok_or_else(|| InvestPerfError::FinancialImpossibility(format!("overflow in {context}")))?;
    Ok(set_scale(quotient, scale, mode))
}

/// Multiply by 100 when `in_percent`, then round to `scale`.
pub fn to_pct_and_scale(value: Rate, in_percent: bool, scale: u32, mode: RoundingMode) -> Rate {
    let value = if in_percent { value * dec!(100) } else { value };
    set_scale(value, scale, mode)
}

// ---------------------------------------------------------------------------
// Date helpers
// ---------------------------------------------------------------------------

pub fn next_day(date: NaiveDate) -> InvestPerfResult<NaiveDate> {
    date.succ_opt()
        .ok_or_else(|| InvestPerfError::DateError(format!("no day after {date}")))
}

pub fn prev_day(date: NaiveDate) -> InvestPerfResult<NaiveDate> {
    date.pred_opt()
        .ok_or_else(|| InvestPerfError::DateError(format!("no day before {date}")))
}

/// Entries of `amounts` within `[from, to]`.
pub fn slice_amounts(amounts: &DatedAmounts, from: NaiveDate, to: NaiveDate) -> DatedAmounts {
    if from > to {
        return DatedAmounts::new();
    }
    amounts
        .range(from..=to)
        .map(|(d, a)| (*d, *a))
        .collect()
}

// ---------------------------------------------------------------------------
// Output envelope
// ---------------------------------------------------------------------------

/// Standard computation output envelope
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ComputationOutput<T: Serialize> {
    pub result: T,
    pub methodology: String,
    pub assumptions: serde_json::Value,
    pub warnings: Vec<String>,
    pub metadata: ComputationMetadata,
}

/// Metadata for every computation
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ComputationMetadata {
    pub version: String,
    pub computation_time_us: u64,
    pub precision: String,
}

/// Helper to wrap computation results with metadata
pub fn with_metadata<T: Serialize>(
    methodology: &str,
    assumptions: &impl Serialize,
    warnings: Vec<String>,
    elapsed_us: u64,
    result: T,
) -> ComputationOutput<T> {
    ComputationOutput {
        result,
        methodology: methodology.to_string(),
        assumptions: serde_json::to_value(assumptions).unwrap_or_default(),
        warnings,
        metadata: ComputationMetadata {
            version: env!("CARGO_PKG_VERSION").to_string(),
            computation_time_us: elapsed_us,
            precision: "rust_decimal_128bit".to_string(),
        },
    }
}
