use chrono::NaiveDate;
use rust_decimal::Decimal;
use tracing::{debug, trace};

use super::request::{required_valuation, CalcRequest};
use crate::error::InvestPerfError;
use crate::types::*;
use crate::InvestPerfResult;

/// True time-weighted return: a new sub-period starts at every flow date.
///
/// Expects boundary flows to be folded already, so with beginning-of-day
/// timing no flow sits on the start date, and with end-of-day timing none
/// sits on the end date.
pub fn cumulative_return(req: &CalcRequest<'_>) -> InvestPerfResult<Rate> {
    let flows: Vec<(NaiveDate, Money)> = req.flows().iter().map(|(d, a)| (*d, *a)).collect();
    let factor = match req.flow_timing() {
        FlowTiming::BeginningOfDay => factor_with_flows_at_beginning_of_day(req, &flows)?,
        FlowTiming::EndOfDay => factor_with_flows_at_end_of_day(req, &flows)?,
    };
    Ok(factor - Decimal::ONE)
}

fn sub_period_factor(
    end_value: Money,
    start_value: Money,
    req: &CalcRequest<'_>,
    sub_start: NaiveDate,
    sub_end: NaiveDate,
) -> InvestPerfResult<Decimal> {
    let factor = divide(
        end_value,
        start_value,
        req.calc_scale(),
        req.rounding_mode(),
        "true TWR sub-period factor",
    )?;
    if factor < Decimal::ZERO {
        return Err(InvestPerfError::FinancialImpossibility(format!(
            "negative growth factor {factor} for sub-period {sub_start}..{sub_end}"
        )));
    }
    trace!(%sub_start, %sub_end, %factor, "true TWR sub-period");
    Ok(factor)
}

fn factor_with_flows_at_beginning_of_day(
    req: &CalcRequest<'_>,
    flows: &[(NaiveDate, Money)],
) -> InvestPerfResult<Decimal> {
    let valuations = req.valuations();
    let period_count = flows.len() + 1;
    let mut cumulative = Decimal::ONE;
    let mut sub_start = req.start();
    // Flow that opened the current sub-period
    let mut opening_flow = Decimal::ZERO;

    for i in 0..period_count {
        let start_value = if i == 0 {
            req.start_value()
        } else {
            required_valuation(valuations, prev_day(sub_start)?, "true TWR sub-period start")?
        };
        let (sub_end, end_value) = if i == period_count - 1 {
            (req.end(), req.end_value())
        } else {
            let sub_end = prev_day(flows[i].0)?;
            (
                sub_end,
                required_valuation(valuations, sub_end, "true TWR sub-period end")?,
            )
        };

        let start_with_flow = start_value + opening_flow;
        let factor = if start_with_flow.is_zero() {
            if !end_value.is_zero() {
                return Err(InvestPerfError::FinancialImpossibility(format!(
                    "sub-period {sub_start}..{sub_end} grows from zero to {end_value} without a flow"
                )));
            }
            Decimal::ONE
        } else {
            let factor = sub_period_factor(end_value, start_with_flow, req, sub_start, sub_end)?;
            if factor.is_zero() {
                debug!(%sub_end, "bankruptcy, cumulative factor collapses to zero");
                return Ok(Decimal::ZERO);
            }
            factor
        };
        cumulative = set_scale(cumulative * factor, req.calc_scale(), req.rounding_mode());

        sub_start = next_day(sub_end)?;
        if i < period_count - 1 {
            opening_flow = flows[i].1;
        }
    }
    Ok(cumulative)
}

fn factor_with_flows_at_end_of_day(
    req: &CalcRequest<'_>,
    flows: &[(NaiveDate, Money)],
) -> InvestPerfResult<Decimal> {
    let valuations = req.valuations();
    let period_count = flows.len() + 1;
    let mut cumulative = Decimal::ONE;
    let mut sub_start = req.start();

    for i in 0..period_count {
        let start_value = if i == 0 {
            req.start_value()
        } else {
            required_valuation(valuations, prev_day(sub_start)?, "true TWR sub-period start")?
        };
        let (sub_end, end_value, closing_flow) = if i == period_count - 1 {
            (req.end(), req.end_value(), Decimal::ZERO)
        } else {
            let (flow_date, flow) = flows[i];
            (
                flow_date,
                required_valuation(valuations, flow_date, "true TWR sub-period end")?,
                flow,
            )
        };

        if start_value.is_zero() {
            return Err(InvestPerfError::FinancialImpossibility(format!(
                "sub-period {sub_start}..{sub_end} starts from zero"
            )));
        }
        let factor = sub_period_factor(end_value - closing_flow, start_value, req, sub_start, sub_end)?;
        if factor.is_zero() {
            debug!(%sub_end, "bankruptcy, cumulative factor collapses to zero");
            return Ok(Decimal::ZERO);
        }
        cumulative = set_scale(cumulative * factor, req.calc_scale(), req.rounding_mode());

        sub_start = next_day(sub_end)?;
    }
    Ok(cumulative)
}
