use chrono::NaiveDate;
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};
use std::fmt;

use crate::error::InvestPerfError;
use crate::types::*;
use crate::InvestPerfResult;

// ---------------------------------------------------------------------------
// Valuation lookup
// ---------------------------------------------------------------------------

/// Source of asset valuations by calendar date.
///
/// `None` means the valuation is unknown. Calculators treat an unknown
/// valuation at a date they need as a fatal input error.
pub trait ValuationLookup {
    fn valuation(&self, date: NaiveDate) -> Option<Money>;
}

impl ValuationLookup for BTreeMap<NaiveDate, Money> {
    fn valuation(&self, date: NaiveDate) -> Option<Money> {
        self.get(&date).copied()
    }
}

impl ValuationLookup for HashMap<NaiveDate, Money> {
    fn valuation(&self, date: NaiveDate) -> Option<Money> {
        self.get(&date).copied()
    }
}

/// Adapts a closure into a [`ValuationLookup`].
pub struct ValuationFn<F>(pub F);

impl<F> ValuationLookup for ValuationFn<F>
where
    F: Fn(NaiveDate) -> Option<Money>,
{
    fn valuation(&self, date: NaiveDate) -> Option<Money> {
        (self.0)(date)
    }
}

/// A lookup that knows no valuations at all.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoValuations;

impl ValuationLookup for NoValuations {
    fn valuation(&self, _date: NaiveDate) -> Option<Money> {
        None
    }
}

static NO_VALUATIONS: NoValuations = NoValuations;

/// Look up a valuation that must exist.
pub(crate) fn required_valuation(
    lookup: &dyn ValuationLookup,
    date: NaiveDate,
    context: &str,
) -> InvestPerfResult<Money> {
    lookup
        .valuation(date)
        .ok_or_else(|| InvestPerfError::missing(date, context))
}

// ---------------------------------------------------------------------------
// Configuration
// ---------------------------------------------------------------------------

/// Tunables of a single-range return calculation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CalcConfig {
    /// Scale of intermediate results.
    pub calc_scale: u32,
    /// Scale of the returned rate.
    pub result_scale: u32,
    pub rounding_mode: RoundingMode,
    pub flow_timing: FlowTiming,
    pub annualization: AnnualizationOption,
    /// Flows larger than this percentage of the sub-period opening value
    /// force an extra valuation point in linked Modified Dietz.
    pub large_flow_threshold_pct: Decimal,
    /// Return 15.2 instead of 0.152.
    pub result_in_percent: bool,
}

impl Default for CalcConfig {
    fn default() -> Self {
        CalcConfig {
            calc_scale: 20,
            result_scale: 6,
            rounding_mode: RoundingMode::HalfUp,
            flow_timing: FlowTiming::BeginningOfDay,
            annualization: AnnualizationOption::DoNotAnnualize,
            large_flow_threshold_pct: dec!(5),
            result_in_percent: false,
        }
    }
}

impl CalcConfig {
    pub fn validate(&self) -> InvestPerfResult<()> {
        if self.calc_scale > MAX_SCALE {
            return Err(InvestPerfError::invalid(
                "calc_scale",
                format!("must be at most {MAX_SCALE}, given {}", self.calc_scale),
            ));
        }
        if self.result_scale > MAX_SCALE {
            return Err(InvestPerfError::invalid(
                "result_scale",
                format!("must be at most {MAX_SCALE}, given {}", self.result_scale),
            ));
        }
        if self.large_flow_threshold_pct < Decimal::ZERO {
            return Err(InvestPerfError::invalid(
                "large_flow_threshold_pct",
                "must not be negative",
            ));
        }
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Request
// ---------------------------------------------------------------------------

/// Everything needed to compute one return over `[start, end]`.
///
/// Immutable once built. Flows are clipped to the date range on
/// construction. The `with_*` methods derive a new, revalidated request.
#[derive(Clone)]
pub struct CalcRequest<'a> {
    start: NaiveDate,
    end: NaiveDate,
    start_value: Money,
    end_value: Money,
    flows: DatedAmounts,
    valuations: &'a dyn ValuationLookup,
    config: CalcConfig,
}

impl fmt::Debug for CalcRequest<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CalcRequest")
            .field("start", &self.start)
            .field("end", &self.end)
            .field("start_value", &self.start_value)
            .field("end_value", &self.end_value)
            .field("flows", &self.flows)
            .field("config", &self.config)
            .finish()
    }
}

impl<'a> CalcRequest<'a> {
    /// A request with no flows, no interim valuations and default config.
    ///
    /// `start_value` excludes any flow on `start`; `end_value` includes any
    /// flow on `end`.
    pub fn new(
        start: NaiveDate,
        end: NaiveDate,
        start_value: Money,
        end_value: Money,
    ) -> InvestPerfResult<Self> {
        CalcRequest {
            start,
            end,
            start_value,
            end_value,
            flows: DatedAmounts::new(),
            valuations: &NO_VALUATIONS,
            config: CalcConfig::default(),
        }
        .validated()
    }

    fn validated(mut self) -> InvestPerfResult<Self> {
        if self.start > self.end {
            return Err(InvestPerfError::invalid(
                "start_date",
                format!("start {} must not be after end {}", self.start, self.end),
            ));
        }
        if self.start_value < Decimal::ZERO {
            return Err(InvestPerfError::invalid(
                "start_value",
                format!("must not be negative, given {}", self.start_value),
            ));
        }
        if self.end_value < Decimal::ZERO {
            return Err(InvestPerfError::invalid(
                "end_value",
                format!("must not be negative, given {}", self.end_value),
            ));
        }
        self.config.validate()?;
        if let (Some((first, _)), Some((last, _))) =
            (self.flows.first_key_value(), self.flows.last_key_value())
        {
            if *first < self.start || *last > self.end {
                self.flows = slice_amounts(&self.flows, self.start, self.end);
            }
        }
        Ok(self)
    }

    pub fn with_range(&self, start: NaiveDate, end: NaiveDate) -> InvestPerfResult<Self> {
        CalcRequest {
            start,
            end,
            ..self.clone()
        }
        .validated()
    }

    pub fn with_values(&self, start_value: Money, end_value: Money) -> InvestPerfResult<Self> {
        CalcRequest {
            start_value,
            end_value,
            ..self.clone()
        }
        .validated()
    }

    /// Replace the flows; entries outside the date range are dropped.
    pub fn with_flows(&self, flows: DatedAmounts) -> Self {
        let flows = slice_amounts(&flows, self.start, self.end);
        CalcRequest {
            flows,
            ..self.clone()
        }
    }

    pub fn with_valuations(&self, valuations: &'a dyn ValuationLookup) -> Self {
        CalcRequest {
            valuations,
            ..self.clone()
        }
    }

    pub fn with_config(&self, config: CalcConfig) -> InvestPerfResult<Self> {
        CalcRequest {
            config,
            ..self.clone()
        }
        .validated()
    }

    pub fn with_flow_timing(&self, flow_timing: FlowTiming) -> Self {
        let mut derived = self.clone();
        derived.config.flow_timing = flow_timing;
        derived
    }

    pub fn with_annualization(&self, annualization: AnnualizationOption) -> Self {
        let mut derived = self.clone();
        derived.config.annualization = annualization;
        derived
    }

    pub fn with_result_in_percent(&self, result_in_percent: bool) -> Self {
        let mut derived = self.clone();
        derived.config.result_in_percent = result_in_percent;
        derived
    }

    pub fn with_result_scale(&self, result_scale: u32) -> InvestPerfResult<Self> {
        let mut derived = self.clone();
        derived.config.result_scale = result_scale;
        derived.validated()
    }

    pub fn start(&self) -> NaiveDate {
        self.start
    }

    pub fn end(&self) -> NaiveDate {
        self.end
    }

    pub fn start_value(&self) -> Money {
        self.start_value
    }

    pub fn end_value(&self) -> Money {
        self.end_value
    }

    pub fn flows(&self) -> &DatedAmounts {
        &self.flows
    }

    pub fn valuations(&self) -> &'a dyn ValuationLookup {
        self.valuations
    }

    pub fn config(&self) -> &CalcConfig {
        &self.config
    }

    pub fn calc_scale(&self) -> u32 {
        self.config.calc_scale
    }

    pub fn rounding_mode(&self) -> RoundingMode {
        self.config.rounding_mode
    }

    pub fn flow_timing(&self) -> FlowTiming {
        self.config.flow_timing
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    fn d(y: i32, m: u32, day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, day).unwrap()
    }

    #[test]
    fn test_defaults() {
        let req = CalcRequest::new(d(2023, 1, 1), d(2023, 12, 31), dec!(100), dec!(110)).unwrap();
        let cfg = req.config();
        assert_eq!(cfg.calc_scale, 20);
        assert_eq!(cfg.result_scale, 6);
        assert_eq!(cfg.rounding_mode, RoundingMode::HalfUp);
        assert_eq!(cfg.flow_timing, FlowTiming::BeginningOfDay);
        assert_eq!(cfg.annualization, AnnualizationOption::DoNotAnnualize);
        assert_eq!(cfg.large_flow_threshold_pct, dec!(5));
        assert!(!cfg.result_in_percent);
    }

    #[test]
    fn test_rejects_inverted_range_and_negative_values() {
        assert!(CalcRequest::new(d(2023, 2, 1), d(2023, 1, 1), dec!(1), dec!(1)).is_err());
        assert!(CalcRequest::new(d(2023, 1, 1), d(2023, 2, 1), dec!(-1), dec!(1)).is_err());
        assert!(CalcRequest::new(d(2023, 1, 1), d(2023, 2, 1), dec!(1), dec!(-1)).is_err());
    }

    #[test]
    fn test_flows_are_clipped_to_range() {
        let flows: DatedAmounts = [
            (d(2022, 12, 31), dec!(5)),
            (d(2023, 1, 10), dec!(10)),
            (d(2023, 2, 1), dec!(20)),
        ]
        .into_iter()
        .collect();
        let req = CalcRequest::new(d(2023, 1, 1), d(2023, 1, 31), dec!(100), dec!(110))
            .unwrap()
            .with_flows(flows);
        assert_eq!(req.flows().len(), 1);
        assert_eq!(req.flows().get(&d(2023, 1, 10)), Some(&dec!(10)));

        let narrowed = req.with_range(d(2023, 1, 11), d(2023, 1, 31)).unwrap();
        assert!(narrowed.flows().is_empty());
        assert_eq!(req.flows().len(), 1, "original request must stay untouched");
    }

    #[test]
    fn test_derive_does_not_mutate_original() {
        let req = CalcRequest::new(d(2023, 1, 1), d(2023, 1, 31), dec!(100), dec!(110)).unwrap();
        let derived = req.with_flow_timing(FlowTiming::EndOfDay);
        assert_eq!(req.flow_timing(), FlowTiming::BeginningOfDay);
        assert_eq!(derived.flow_timing(), FlowTiming::EndOfDay);
        assert!(req.with_result_scale(40).is_err());
    }

    #[test]
    fn test_valuation_adapters() {
        let mut map = BTreeMap::new();
        map.insert(d(2023, 1, 31), dec!(101));
        let f = ValuationFn(|date: NaiveDate| (date == d(2023, 1, 31)).then_some(dec!(101)));
        assert_eq!(map.valuation(d(2023, 1, 31)), Some(dec!(101)));
        assert_eq!(f.valuation(d(2023, 1, 31)), Some(dec!(101)));
        assert_eq!(f.valuation(d(2023, 1, 30)), None);
        assert!(required_valuation(&NoValuations, d(2023, 1, 1), "test").is_err());
    }
}
