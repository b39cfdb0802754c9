use rust_decimal::Decimal;
use tracing::trace;

use super::request::CalcRequest;
use crate::error::InvestPerfError;
use crate::types::*;
use crate::InvestPerfResult;

/// Modified Dietz money-weighted return.
///
/// ```text
/// gain            = end - start - sum(flows)
/// average capital = start + sum(weight_i * flow_i)
/// weight_i        = (days from flow to end exclusive, minus 1 at end of day) / total days
/// ```
///
/// The result is floored at -1.
pub fn cumulative_return(req: &CalcRequest<'_>) -> InvestPerfResult<Rate> {
    let scale = req.calc_scale();
    let mode = req.rounding_mode();
    let end_excl = next_day(req.end())?;
    let total_days = (end_excl - req.start()).num_days();
    let total_days_dec = Decimal::from(total_days);
    let timing_adjuster = match req.flow_timing() {
        FlowTiming::BeginningOfDay => 0,
        FlowTiming::EndOfDay => -1,
    };

    let mut flow_sum = Decimal::ZERO;
    let mut weighted_flow_sum = Decimal::ZERO;
    for (flow_date, flow) in req.flows() {
        let weight_numerator = (end_excl - *flow_date).num_days() + timing_adjuster;
        if weight_numerator <= 0 || weight_numerator >= total_days {
            return Err(InvestPerfError::invalid(
                "flows",
                format!(
                    "flow date {} out of range for {}..{} ({}): weight {}/{}",
                    flow_date,
                    req.start(),
                    req.end(),
                    req.flow_timing(),
                    weight_numerator,
                    total_days
                ),
            ));
        }
        let weight = divide(
            Decimal::from(weight_numerator),
            total_days_dec,
            scale,
            mode,
            "Modified Dietz weight",
        )?;
        flow_sum += flow;
        weighted_flow_sum += flow * weight;
    }

    // Negative or zero average capital
    if req.start_value() <= -weighted_flow_sum {
        return Err(InvestPerfError::FinancialImpossibility(format!(
            "Modified Dietz average capital is not positive: start value {}, weighted flows {}, {}..{}",
            req.start_value(),
            weighted_flow_sum,
            req.start(),
            req.end()
        )));
    }

    let gain = req.end_value() - req.start_value() - flow_sum;
    let average_capital = req.start_value() + weighted_flow_sum;
    trace!(%gain, %average_capital, "Modified Dietz");

    let cumulative = divide(gain, average_capital, scale, mode, "Modified Dietz return")?;
    Ok(cumulative.max(Decimal::NEGATIVE_ONE))
}
