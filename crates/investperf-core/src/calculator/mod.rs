//! Single-range return calculators.
//!
//! Every calculator shares the same outer steps: fold a boundary flow into the
//! start or end value, reject a non-positive start, fall back to the simple
//! return when no flows remain, then annualize and scale the result.

pub mod linked_dietz;
pub mod modified_dietz;
pub mod request;
pub mod simple;
pub mod true_twr;

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use tracing::debug;

use crate::annualize::annualize_return;
use crate::error::InvestPerfError;
use crate::types::*;
use crate::InvestPerfResult;

pub use request::{CalcConfig, CalcRequest, NoValuations, ValuationFn, ValuationLookup};

/// The fixed set of return algorithms.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ReturnMethod {
    /// `(end - start) / start`, ignoring flows.
    SimpleReturn,
    /// Sub-period chaining at every flow date.
    TrueTwr,
    /// Monthly (or large-flow) chaining of Modified Dietz returns.
    LinkedModifiedDietzTwr,
    /// Day-weighted Modified Dietz money-weighted return.
    ModifiedDietzMwr,
}

impl ReturnMethod {
    /// Resolve a calculator by its published name.
    pub fn from_name(name: &str) -> InvestPerfResult<Self> {
        match name {
            "SimpleReturnCalculator" => Ok(ReturnMethod::SimpleReturn),
            "TrueTwrCalculator" | "TwrCalculator" => Ok(ReturnMethod::TrueTwr),
            "LinkedModifiedDietzTwrCalculator" => Ok(ReturnMethod::LinkedModifiedDietzTwr),
            "ModifiedDietzMwrCalculator" | "MwrCalculator" => Ok(ReturnMethod::ModifiedDietzMwr),
            _ => Err(InvestPerfError::UnknownCalculator { name: name.into() }),
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            ReturnMethod::SimpleReturn => "SimpleReturnCalculator",
            ReturnMethod::TrueTwr => "TrueTwrCalculator",
            ReturnMethod::LinkedModifiedDietzTwr => "LinkedModifiedDietzTwrCalculator",
            ReturnMethod::ModifiedDietzMwr => "ModifiedDietzMwrCalculator",
        }
    }

    /// Return over the request's range, annualized and scaled per its config.
    pub fn calculate_return(&self, req: &CalcRequest<'_>) -> InvestPerfResult<Rate> {
        let mut start_value = req.start_value();
        let mut end_value = req.end_value();
        let mut flows = req.flows().clone();
        match req.flow_timing() {
            FlowTiming::BeginningOfDay => {
                if let Some(flow) = flows.remove(&req.start()) {
                    start_value += flow;
                }
            }
            FlowTiming::EndOfDay => {
                if let Some(flow) = flows.remove(&req.end()) {
                    end_value -= flow;
                }
            }
        }

        if start_value <= Decimal::ZERO {
            return Err(InvestPerfError::invalid(
                "start_value",
                format!(
                    "must be greater than zero after folding boundary flows; given {} for {}..{} ({})",
                    start_value,
                    req.start(),
                    req.end(),
                    req.flow_timing()
                ),
            ));
        }

        debug!(
            calculator = self.name(),
            start = %req.start(),
            end = %req.end(),
            flows = flows.len(),
            "calculating return"
        );

        let cumulative = if flows.is_empty() {
            simple::simple_return(start_value, end_value, req.calc_scale(), req.rounding_mode())?
        } else {
            let adjusted = req.with_values(start_value, end_value)?.with_flows(flows);
            self.cumulative_return(&adjusted)?
        };

        let config = req.config();
        let annualized = annualize_return(config.annualization, cumulative, req.start(), req.end())?;
        Ok(to_pct_and_scale(
            annualized,
            config.result_in_percent,
            config.result_scale,
            config.rounding_mode,
        ))
    }

    /// Variant-specific cumulative return of a request whose boundary flows
    /// are already folded and whose start value is positive.
    fn cumulative_return(&self, req: &CalcRequest<'_>) -> InvestPerfResult<Rate> {
        match self {
            ReturnMethod::SimpleReturn => simple::simple_return(
                req.start_value(),
                req.end_value(),
                req.calc_scale(),
                req.rounding_mode(),
            ),
            ReturnMethod::TrueTwr => true_twr::cumulative_return(req),
            ReturnMethod::LinkedModifiedDietzTwr => linked_dietz::cumulative_return(req),
            ReturnMethod::ModifiedDietzMwr => modified_dietz::cumulative_return(req),
        }
    }
}

impl fmt::Display for ReturnMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Time-weighted calculators selectable for periodized analysis.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum TwrCalculator {
    #[default]
    #[serde(alias = "TrueTwrCalculator", alias = "TwrCalculator")]
    TrueTwr,
    #[serde(alias = "LinkedModifiedDietzTwrCalculator")]
    LinkedModifiedDietz,
}

impl TwrCalculator {
    pub fn method(self) -> ReturnMethod {
        match self {
            TwrCalculator::TrueTwr => ReturnMethod::TrueTwr,
            TwrCalculator::LinkedModifiedDietz => ReturnMethod::LinkedModifiedDietzTwr,
        }
    }
}

impl FromStr for TwrCalculator {
    type Err = InvestPerfError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "TrueTwrCalculator" | "TwrCalculator" | "TrueTwr" => Ok(TwrCalculator::TrueTwr),
            "LinkedModifiedDietzTwrCalculator" | "LinkedModifiedDietz" => {
                Ok(TwrCalculator::LinkedModifiedDietz)
            }
            _ => Err(InvestPerfError::UnknownCalculator { name: s.into() }),
        }
    }
}

/// Money-weighted calculators selectable for periodized analysis.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum MwrCalculator {
    #[default]
    #[serde(alias = "ModifiedDietzMwrCalculator", alias = "MwrCalculator")]
    ModifiedDietz,
}

impl MwrCalculator {
    pub fn method(self) -> ReturnMethod {
        match self {
            MwrCalculator::ModifiedDietz => ReturnMethod::ModifiedDietzMwr,
        }
    }
}

impl FromStr for MwrCalculator {
    type Err = InvestPerfError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "ModifiedDietzMwrCalculator" | "MwrCalculator" | "ModifiedDietz" => {
                Ok(MwrCalculator::ModifiedDietz)
            }
            _ => Err(InvestPerfError::UnknownCalculator { name: s.into() }),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;
    use rust_decimal_macros::dec;

    fn d(y: i32, m: u32, day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, day).unwrap()
    }

    const ALL: [ReturnMethod; 4] = [
        ReturnMethod::SimpleReturn,
        ReturnMethod::TrueTwr,
        ReturnMethod::LinkedModifiedDietzTwr,
        ReturnMethod::ModifiedDietzMwr,
    ];

    #[test]
    fn test_name_resolution() {
        assert_eq!(ReturnMethod::from_name("TwrCalculator").unwrap(), ReturnMethod::TrueTwr);
        assert_eq!(
            ReturnMethod::from_name("MwrCalculator").unwrap(),
            ReturnMethod::ModifiedDietzMwr
        );
        for method in ALL {
            assert_eq!(ReturnMethod::from_name(method.name()).unwrap(), method);
        }
        let err = ReturnMethod::from_name("IrrCalculator").unwrap_err();
        assert!(matches!(err, InvestPerfError::UnknownCalculator { .. }));
        assert!("ModifiedDietzMwrCalculator".parse::<TwrCalculator>().is_err());
        assert!("TrueTwrCalculator".parse::<MwrCalculator>().is_err());
    }

    #[test]
    fn test_serde_accepts_calculator_names() {
        let twr: TwrCalculator = serde_json::from_str("\"LinkedModifiedDietzTwrCalculator\"").unwrap();
        assert_eq!(twr, TwrCalculator::LinkedModifiedDietz);
        let mwr: MwrCalculator = serde_json::from_str("\"MwrCalculator\"").unwrap();
        assert_eq!(mwr, MwrCalculator::ModifiedDietz);
    }

    #[test]
    fn test_no_flows_is_simple_return_for_every_method() {
        let req = CalcRequest::new(d(2021, 1, 1), d(2021, 3, 31), dec!(100), dec!(102)).unwrap();
        for method in ALL {
            assert_eq!(method.calculate_return(&req).unwrap().to_string(), "0.020000");
        }
    }

    #[test]
    fn test_zero_values_fail_for_every_method() {
        let req = CalcRequest::new(d(2021, 1, 1), d(2021, 1, 31), dec!(0), dec!(0)).unwrap();
        for method in ALL {
            assert!(method.calculate_return(&req).is_err(), "{} should fail", method);
        }
    }

    #[test]
    fn test_end_value_zero_is_total_loss() {
        let req = CalcRequest::new(d(2021, 1, 1), d(2021, 1, 31), dec!(100), dec!(0)).unwrap();
        for method in ALL {
            assert_eq!(method.calculate_return(&req).unwrap(), dec!(-1));
        }
    }

    #[test]
    fn test_single_day_boundary_flow() {
        let flows: DatedAmounts = [(d(2023, 1, 1), dec!(25))].into_iter().collect();
        let req = CalcRequest::new(d(2023, 1, 1), d(2023, 1, 1), dec!(100), dec!(150))
            .unwrap()
            .with_flows(flows);
        for method in [ReturnMethod::TrueTwr, ReturnMethod::ModifiedDietzMwr] {
            let bod = method.calculate_return(&req).unwrap();
            assert_eq!(bod.to_string(), "0.200000");
            let eod = method
                .calculate_return(&req.with_flow_timing(FlowTiming::EndOfDay))
                .unwrap();
            assert_eq!(eod.to_string(), "0.250000");
        }
    }

    #[test]
    fn test_start_zero_with_start_flow_and_annualization() {
        let flows: DatedAmounts = [(d(2022, 1, 1), dec!(100))].into_iter().collect();
        let req = CalcRequest::new(d(2022, 1, 1), d(2022, 12, 31), dec!(0), dec!(102))
            .unwrap()
            .with_flows(flows);
        for method in ALL {
            assert_eq!(method.calculate_return(&req).unwrap().to_string(), "0.020000");
            let ann = req.with_annualization(AnnualizationOption::Annualize);
            assert_eq!(method.calculate_return(&ann).unwrap().to_string(), "0.020000");
        }
    }
}
