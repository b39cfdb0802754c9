use chrono::NaiveDate;
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use tracing::{debug, trace};

use super::request::{required_valuation, CalcConfig, CalcRequest};
use super::ReturnMethod;
use crate::error::InvestPerfError;
use crate::frequency::Frequency;
use crate::types::*;
use crate::InvestPerfResult;

/// Linked Modified Dietz time-weighted return.
///
/// Valuation points are forced at every calendar month end and on the date
/// of any large flow (one whose size relative to the sub-period opening
/// value exceeds the configured threshold). Each sub-period is measured with
/// Modified Dietz and the results are chained geometrically.
pub fn cumulative_return(req: &CalcRequest<'_>) -> InvestPerfResult<Rate> {
    let scale = req.calc_scale();
    let mode = req.rounding_mode();
    let valuations = req.valuations();
    let threshold = divide(
        req.config().large_flow_threshold_pct,
        dec!(100),
        scale,
        mode,
        "large flow threshold",
    )?;
    let sub_config = CalcConfig {
        annualization: AnnualizationOption::DoNotAnnualize,
        result_in_percent: false,
        result_scale: scale,
        ..req.config().clone()
    };

    let mut cumulative = Decimal::ONE;
    let mut sub_start = req.start();
    while sub_start <= req.end() {
        let start_value = if sub_start == req.start() {
            req.start_value()
        } else {
            required_valuation(
                valuations,
                prev_day(sub_start)?,
                "linked Modified Dietz sub-period start",
            )?
        };

        let mut sub_end = Frequency::Month.period_end(sub_start)?.min(req.end());
        if !start_value.is_zero() {
            if let Some(flow_date) = first_large_flow(req, sub_start, sub_end, start_value, threshold)? {
                sub_end = match req.flow_timing() {
                    FlowTiming::BeginningOfDay => prev_day(flow_date)?,
                    FlowTiming::EndOfDay => flow_date,
                };
            }
        }

        let end_value = if sub_end == req.end() {
            req.end_value()
        } else {
            required_valuation(valuations, sub_end, "linked Modified Dietz sub-period end")?
        };

        let sub_req = req
            .with_range(sub_start, sub_end)?
            .with_values(start_value, end_value)?
            .with_config(sub_config.clone())?;
        let factor = Decimal::ONE + ReturnMethod::ModifiedDietzMwr.calculate_return(&sub_req)?;
        trace!(%sub_start, %sub_end, %factor, "linked Modified Dietz sub-period");

        if factor.is_zero() {
            debug!(%sub_end, "bankruptcy, cumulative factor collapses to zero");
            return Ok(Decimal::NEGATIVE_ONE);
        }
        if factor < Decimal::ZERO {
            return Err(InvestPerfError::FinancialImpossibility(format!(
                "negative growth factor {factor} for sub-period {sub_start}..{sub_end}"
            )));
        }
        cumulative = set_scale(cumulative * factor, scale, mode);
        sub_start = next_day(sub_end)?;
    }
    Ok(cumulative - Decimal::ONE)
}

/// Earliest flow in `(sub_start, sub_end)` exceeding `threshold` of `start_value`.
fn first_large_flow(
    req: &CalcRequest<'_>,
    sub_start: NaiveDate,
    sub_end: NaiveDate,
    start_value: Money,
    threshold: Decimal,
) -> InvestPerfResult<Option<NaiveDate>> {
    let search_from = next_day(sub_start)?;
    if search_from >= sub_end {
        return Ok(None);
    }
    for (flow_date, flow) in req.flows().range(search_from..sub_end) {
        let level = divide(
            *flow,
            start_value,
            req.calc_scale(),
            req.rounding_mode(),
            "large flow level",
        )?
        .abs();
        if level > threshold {
            return Ok(Some(*flow_date));
        }
    }
    Ok(None)
}
