use chrono::NaiveDate;
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::{Deserialize, Serialize};
use std::fmt;

use crate::calculator::{CalcConfig, MwrCalculator, TwrCalculator, ValuationLookup};
use crate::error::InvestPerfError;
use crate::frequency::Frequency;
use crate::types::*;
use crate::InvestPerfResult;

// ---------------------------------------------------------------------------
// Flow lookup
// ---------------------------------------------------------------------------

/// Range-bounded source of dated amounts (external flows or incomes).
///
/// Implementations must only return entries within `[from, to]`.
pub trait FlowLookup {
    fn amounts_between(&self, from: NaiveDate, to: NaiveDate) -> DatedAmounts;
}

impl FlowLookup for DatedAmounts {
    fn amounts_between(&self, from: NaiveDate, to: NaiveDate) -> DatedAmounts {
        slice_amounts(self, from, to)
    }
}

/// Adapts a closure into a [`FlowLookup`].
pub struct FlowFn<F>(pub F);

impl<F> FlowLookup for FlowFn<F>
where
    F: Fn(NaiveDate, NaiveDate) -> DatedAmounts,
{
    fn amounts_between(&self, from: NaiveDate, to: NaiveDate) -> DatedAmounts {
        (self.0)(from, to)
    }
}

static NO_FLOWS: DatedAmounts = DatedAmounts::new();

// ---------------------------------------------------------------------------
// Configuration
// ---------------------------------------------------------------------------

/// Tunables of a periodized performance analysis.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AnalysisConfig {
    pub frequency: Frequency,
    pub twr_calculator: TwrCalculator,
    pub mwr_calculator: MwrCalculator,
    pub twr_flow_timing: FlowTiming,
    pub mwr_flow_timing: FlowTiming,
    pub large_flow_threshold_pct: Decimal,
    pub calc_scale: u32,
    pub result_rate_scale: u32,
    pub result_amount_scale: u32,
    pub rounding_mode: RoundingMode,
    pub rates_in_percent: bool,
    pub calculate_mwr: bool,
    pub calculate_trailing_avg_profit_1y: bool,
    pub calculate_trailing_avg_flow_1y: bool,
    pub calculate_period_income: bool,
    pub calculate_trailing_avg_income_1y: bool,
    pub calculate_trailing_twr_1y: bool,
    pub calculate_trailing_twr_2y: bool,
    pub calculate_trailing_twr_3y: bool,
    pub calculate_trailing_twr_5y: bool,
    pub calculate_trailing_twr_10y: bool,
}

impl Default for AnalysisConfig {
    fn default() -> Self {
        AnalysisConfig {
            frequency: Frequency::Month,
            twr_calculator: TwrCalculator::TrueTwr,
            mwr_calculator: MwrCalculator::ModifiedDietz,
            twr_flow_timing: FlowTiming::BeginningOfDay,
            mwr_flow_timing: FlowTiming::BeginningOfDay,
            large_flow_threshold_pct: dec!(5),
            calc_scale: 20,
            result_rate_scale: 6,
            result_amount_scale: 2,
            rounding_mode: RoundingMode::HalfUp,
            rates_in_percent: false,
            calculate_mwr: false,
            calculate_trailing_avg_profit_1y: false,
            calculate_trailing_avg_flow_1y: false,
            calculate_period_income: false,
            calculate_trailing_avg_income_1y: false,
            calculate_trailing_twr_1y: false,
            calculate_trailing_twr_2y: false,
            calculate_trailing_twr_3y: false,
            calculate_trailing_twr_5y: false,
            calculate_trailing_twr_10y: false,
        }
    }
}

impl AnalysisConfig {
    pub fn validate(&self) -> InvestPerfResult<()> {
        for (field, scale) in [
            ("calc_scale", self.calc_scale),
            ("result_rate_scale", self.result_rate_scale),
            ("result_amount_scale", self.result_amount_scale),
        ] {
            if scale > MAX_SCALE {
                return Err(InvestPerfError::invalid(
                    field,
                    format!("must be at most {MAX_SCALE}, given {scale}"),
                ));
            }
        }
        if self.large_flow_threshold_pct < Decimal::ZERO {
            return Err(InvestPerfError::invalid(
                "large_flow_threshold_pct",
                "must not be negative",
            ));
        }
        Ok(())
    }

    /// Whether period income has to be aggregated at all.
    pub fn needs_incomes(&self) -> bool {
        self.calculate_period_income || self.calculate_trailing_avg_income_1y
    }

    /// Number of cascading trailing-TWR windows to maintain (0 to 5).
    /// A longer horizon is built on every shorter one.
    pub fn trailing_twr_depth(&self) -> usize {
        if self.calculate_trailing_twr_10y {
            5
        } else if self.calculate_trailing_twr_5y {
            4
        } else if self.calculate_trailing_twr_3y {
            3
        } else if self.calculate_trailing_twr_2y {
            2
        } else if self.calculate_trailing_twr_1y {
            1
        } else {
            0
        }
    }

    /// Config for the per-period calculator requests.
    pub(crate) fn calc_config(&self, flow_timing: FlowTiming) -> CalcConfig {
        CalcConfig {
            calc_scale: self.calc_scale,
            result_scale: self.calc_scale,
            rounding_mode: self.rounding_mode,
            flow_timing,
            annualization: AnnualizationOption::DoNotAnnualize,
            large_flow_threshold_pct: self.large_flow_threshold_pct,
            result_in_percent: false,
        }
    }
}

// ---------------------------------------------------------------------------
// Request
// ---------------------------------------------------------------------------

/// Input of one periodized analysis.
///
/// Rows are produced for every period of `[result_start, result_end]`;
/// returns are only measured inside the optional measurement window.
#[derive(Clone)]
pub struct AnalysisRequest<'a> {
    result_start: NaiveDate,
    result_end: NaiveDate,
    measure_start: NaiveDate,
    measure_end: NaiveDate,
    valuations: &'a dyn ValuationLookup,
    flows: &'a dyn FlowLookup,
    incomes: Option<&'a dyn FlowLookup>,
    config: AnalysisConfig,
}

impl fmt::Debug for AnalysisRequest<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AnalysisRequest")
            .field("result_start", &self.result_start)
            .field("result_end", &self.result_end)
            .field("measure_start", &self.measure_start)
            .field("measure_end", &self.measure_end)
            .field("has_incomes", &self.incomes.is_some())
            .field("config", &self.config)
            .finish()
    }
}

impl<'a> AnalysisRequest<'a> {
    /// An analysis over `[result_start, result_end]` with no flows, no
    /// incomes and the default config.
    pub fn new(
        result_start: NaiveDate,
        result_end: NaiveDate,
        valuations: &'a dyn ValuationLookup,
    ) -> InvestPerfResult<Self> {
        AnalysisRequest {
            result_start,
            result_end,
            measure_start: result_start,
            measure_end: result_end,
            valuations,
            flows: &NO_FLOWS,
            incomes: None,
            config: AnalysisConfig::default(),
        }
        .validated()
    }

    fn validated(self) -> InvestPerfResult<Self> {
        if self.result_start > self.result_end {
            return Err(InvestPerfError::invalid(
                "result_start",
                format!(
                    "start {} must not be after end {}",
                    self.result_start, self.result_end
                ),
            ));
        }
        self.config.validate()?;
        if self.config.needs_incomes() && self.incomes.is_none() {
            return Err(InvestPerfError::invalid(
                "incomes",
                "required when period income or trailing average income is enabled",
            ));
        }
        Ok(self)
    }

    /// Restrict return measurement to `[measure_start, measure_end]`.
    pub fn with_measurement_window(
        &self,
        measure_start: NaiveDate,
        measure_end: NaiveDate,
    ) -> InvestPerfResult<Self> {
        AnalysisRequest {
            measure_start,
            measure_end,
            ..self.clone()
        }
        .validated()
    }

    pub fn with_flows(&self, flows: &'a dyn FlowLookup) -> Self {
        AnalysisRequest {
            flows,
            ..self.clone()
        }
    }

    pub fn with_incomes(&self, incomes: &'a dyn FlowLookup) -> Self {
        AnalysisRequest {
            incomes: Some(incomes),
            ..self.clone()
        }
    }

    pub fn with_config(&self, config: AnalysisConfig) -> InvestPerfResult<Self> {
        AnalysisRequest {
            config,
            ..self.clone()
        }
        .validated()
    }

    pub fn result_start(&self) -> NaiveDate {
        self.result_start
    }

    pub fn result_end(&self) -> NaiveDate {
        self.result_end
    }

    /// First measured day: the later of the result and measurement starts.
    pub fn calc_start(&self) -> NaiveDate {
        self.result_start.max(self.measure_start)
    }

    /// Last measured day: the earlier of the result and measurement ends.
    pub fn calc_end(&self) -> NaiveDate {
        self.result_end.min(self.measure_end)
    }

    pub fn valuations(&self) -> &'a dyn ValuationLookup {
        self.valuations
    }

    pub fn flows(&self) -> &'a dyn FlowLookup {
        self.flows
    }

    pub fn incomes(&self) -> Option<&'a dyn FlowLookup> {
        self.incomes
    }

    pub fn config(&self) -> &AnalysisConfig {
        &self.config
    }
}
