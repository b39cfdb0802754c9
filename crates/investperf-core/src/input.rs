//! Serialized input documents and the entry points that run them.
//!
//! Dated entries arrive as lists; they are sanitized into date-keyed maps
//! before any calculation runs.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::time::Instant;

use crate::error::InvestPerfError;
use crate::types::*;
use crate::InvestPerfResult;

#[cfg(feature = "calculators")]
use crate::annualize::annualize_return;
#[cfg(feature = "calculators")]
use crate::calculator::{CalcConfig, CalcRequest, ReturnMethod};

#[cfg(feature = "analysis")]
use crate::analysis::{analyze_performance, AnalysisConfig, AnalysisRequest, PeriodAnalysis};

// ---------------------------------------------------------------------------
// Sanitization
// ---------------------------------------------------------------------------

/// Valuations within `[from, to]` keyed by date.
///
/// Repeated dates must agree on the amount.
pub fn sanitize_valuations(
    entries: &[DatedAmount],
    from: NaiveDate,
    to: NaiveDate,
) -> InvestPerfResult<DatedAmounts> {
    let mut valuations = DatedAmounts::new();
    for entry in entries.iter().filter(|e| e.date >= from && e.date <= to) {
        if let Some(existing) = valuations.insert(entry.date, entry.amount) {
            if existing != entry.amount {
                return Err(InvestPerfError::invalid(
                    "valuations",
                    format!(
                        "conflicting valuations {} and {} on {}",
                        existing, entry.amount, entry.date
                    ),
                ));
            }
        }
    }
    Ok(valuations)
}

/// Amounts within `[from, to]` summed per date, plus the number of entries dropped.
pub fn sanitize_amounts(
    entries: &[DatedAmount],
    from: NaiveDate,
    to: NaiveDate,
) -> (DatedAmounts, usize) {
    let mut amounts = DatedAmounts::new();
    let mut dropped = 0;
    for entry in entries {
        if entry.date < from || entry.date > to {
            dropped += 1;
            continue;
        }
        *amounts.entry(entry.date).or_default() += entry.amount;
    }
    (amounts, dropped)
}

// ---------------------------------------------------------------------------
// Single-range calculation
// ---------------------------------------------------------------------------

#[cfg(feature = "calculators")]
fn default_calculator() -> String {
    ReturnMethod::TrueTwr.name().to_string()
}

/// A single-range return calculation.
#[cfg(feature = "calculators")]
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CalcInput {
    /// Published calculator name, e.g. `ModifiedDietzMwrCalculator`.
    #[serde(default = "default_calculator")]
    pub calculator: String,
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
    pub start_value: Money,
    pub end_value: Money,
    #[serde(default)]
    pub flows: Vec<DatedAmount>,
    /// Interim valuations, needed by the time-weighted calculators when flows exist.
    #[serde(default)]
    pub valuations: Vec<DatedAmount>,
    #[serde(default)]
    pub config: CalcConfig,
}

#[cfg(feature = "calculators")]
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CalcOutput {
    pub calculator: String,
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
    #[serde(rename = "return")]
    pub return_value: Rate,
    pub in_percent: bool,
    pub flow_count: usize,
}

/// Resolve the calculator, sanitize the input and compute the return.
#[cfg(feature = "calculators")]
pub fn run_calculation(input: &CalcInput) -> InvestPerfResult<ComputationOutput<CalcOutput>> {
    let start = Instant::now();
    let mut warnings: Vec<String> = Vec::new();

    let method = ReturnMethod::from_name(&input.calculator)?;
    let (flows, dropped) = sanitize_amounts(&input.flows, input.start_date, input.end_date);
    if dropped > 0 {
        warnings.push(format!(
            "{dropped} flow(s) outside {}..{} ignored",
            input.start_date, input.end_date
        ));
    }
    let valuations = sanitize_valuations(
        &input.valuations,
        prev_day(input.start_date)?,
        input.end_date,
    )?;
    if flows.is_empty() && method != ReturnMethod::SimpleReturn {
        warnings.push("No flows within range; simple return used".into());
    }
    let flow_count = flows.len();

    let req = CalcRequest::new(input.start_date, input.end_date, input.start_value, input.end_value)?
        .with_config(input.config.clone())?
        .with_valuations(&valuations)
        .with_flows(flows);
    let return_value = method.calculate_return(&req)?;

    let output = CalcOutput {
        calculator: method.name().to_string(),
        start_date: input.start_date,
        end_date: input.end_date,
        return_value,
        in_percent: input.config.result_in_percent,
        flow_count,
    };

    let elapsed = start.elapsed().as_micros() as u64;
    Ok(with_metadata(
        method.name(),
        &serde_json::json!({
            "flow_timing": input.config.flow_timing,
            "annualization": input.config.annualization,
            "calc_scale": input.config.calc_scale,
            "result_scale": input.config.result_scale,
            "rounding_mode": input.config.rounding_mode,
            "large_flow_threshold_pct": input.config.large_flow_threshold_pct.to_string(),
        }),
        warnings,
        elapsed,
        output,
    ))
}

// ---------------------------------------------------------------------------
// Annualization
// ---------------------------------------------------------------------------

/// Annualize a cumulative return earned over `[start_date, end_date]`.
#[cfg(feature = "calculators")]
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AnnualizeInput {
    pub cumulative_return: Rate,
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
    #[serde(default = "default_annualization")]
    pub option: AnnualizationOption,
    #[serde(default = "default_result_scale")]
    pub result_scale: u32,
    #[serde(default)]
    pub rounding_mode: RoundingMode,
}

#[cfg(feature = "calculators")]
fn default_annualization() -> AnnualizationOption {
    AnnualizationOption::Annualize
}

#[cfg(feature = "calculators")]
fn default_result_scale() -> u32 {
    CalcConfig::default().result_scale
}

#[cfg(feature = "calculators")]
pub fn run_annualization(input: &AnnualizeInput) -> InvestPerfResult<ComputationOutput<Rate>> {
    let start = Instant::now();
    if input.result_scale > MAX_SCALE {
        return Err(InvestPerfError::invalid(
            "result_scale",
            format!("must be at most {MAX_SCALE}, given {}", input.result_scale),
        ));
    }
    if input.start_date > input.end_date {
        return Err(InvestPerfError::DateError(format!(
            "start date {} must not be after end date {}",
            input.start_date, input.end_date
        )));
    }
    let annualized = annualize_return(
        input.option,
        input.cumulative_return,
        input.start_date,
        input.end_date,
    )?;
    let result = set_scale(annualized, input.result_scale, input.rounding_mode);

    let elapsed = start.elapsed().as_micros() as u64;
    Ok(with_metadata(
        "Annualizer",
        &serde_json::json!({
            "option": input.option,
            "start_date": input.start_date,
            "end_date": input.end_date,
        }),
        Vec::new(),
        elapsed,
        result,
    ))
}

// ---------------------------------------------------------------------------
// Periodized analysis
// ---------------------------------------------------------------------------

/// A periodized performance analysis.
#[cfg(feature = "analysis")]
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AnalysisInput {
    pub result_start: NaiveDate,
    pub result_end: NaiveDate,
    /// Narrows the measured part of the result range.
    #[serde(default)]
    pub measure_start: Option<NaiveDate>,
    #[serde(default)]
    pub measure_end: Option<NaiveDate>,
    pub valuations: Vec<DatedAmount>,
    #[serde(default)]
    pub flows: Vec<DatedAmount>,
    #[serde(default)]
    pub incomes: Option<Vec<DatedAmount>>,
    #[serde(default)]
    pub config: AnalysisConfig,
}

#[cfg(feature = "analysis")]
pub fn run_analysis(input: &AnalysisInput) -> InvestPerfResult<ComputationOutput<Vec<PeriodAnalysis>>> {
    let start = Instant::now();
    let mut warnings: Vec<String> = Vec::new();

    let measure_start = input.measure_start.unwrap_or(input.result_start);
    let measure_end = input.measure_end.unwrap_or(input.result_end);
    let calc_start = input.result_start.max(measure_start);
    let calc_end = input.result_end.min(measure_end);
    if calc_start > calc_end {
        warnings.push(format!(
            "Measurement window {measure_start}..{measure_end} does not overlap the result range; no returns measured"
        ));
    }

    let valuations = sanitize_valuations(&input.valuations, prev_day(input.result_start)?, input.result_end)?;
    let (flows, dropped) = sanitize_amounts(&input.flows, calc_start, calc_end);
    if dropped > 0 {
        warnings.push(format!("{dropped} flow(s) outside {calc_start}..{calc_end} ignored"));
    }
    let incomes = input.incomes.as_ref().map(|entries| {
        let (incomes, dropped) = sanitize_amounts(entries, calc_start, calc_end);
        if dropped > 0 {
            warnings.push(format!("{dropped} income(s) outside {calc_start}..{calc_end} ignored"));
        }
        incomes
    });

    let mut req = AnalysisRequest::new(input.result_start, input.result_end, &valuations)?
        .with_flows(&flows)
        .with_measurement_window(measure_start, measure_end)?;
    if let Some(incomes) = incomes.as_ref() {
        req = req.with_incomes(incomes);
    }
    let req = req.with_config(input.config.clone())?;
    let rows = analyze_performance(&req)?;

    let elapsed = start.elapsed().as_micros() as u64;
    let cfg = &input.config;
    Ok(with_metadata(
        "Periodized TWR/MWR analysis",
        &serde_json::json!({
            "frequency": cfg.frequency,
            "twr_calculator": cfg.twr_calculator.method().name(),
            "mwr_calculator": cfg.mwr_calculator.method().name(),
            "twr_flow_timing": cfg.twr_flow_timing,
            "mwr_flow_timing": cfg.mwr_flow_timing,
            "rates_in_percent": cfg.rates_in_percent,
            "calc_start": calc_start,
            "calc_end": calc_end,
        }),
        warnings,
        elapsed,
        rows,
    ))
}
