//! Periodized performance analysis.
//!
//! Splits a result range into calendar periods and reports, per period,
//! values, flows, TWR/MWR (period, cumulative, annualized), profit,
//! contribution, income and trailing figures. Returns are measured only
//! inside the measurement window; periods outside it are reported with
//! their bounds alone.

pub mod request;
pub mod result;
pub mod window;

use chrono::NaiveDate;
use rust_decimal::Decimal;
use tracing::{debug, trace};

use crate::annualize::{annualize_growth_factor, annualize_return};
use crate::calculator::request::required_valuation;
use crate::calculator::{CalcRequest, ValuationLookup};
use crate::error::InvestPerfError;
use crate::types::*;
use crate::InvestPerfResult;

pub use request::{AnalysisConfig, AnalysisRequest, FlowFn, FlowLookup};
pub use result::PeriodAnalysis;
pub use window::{TrailingTwr, TrailingWindow};

use result::PeriodRows;

/// Analyze performance period by period over the request's result range.
pub fn analyze_performance(req: &AnalysisRequest<'_>) -> InvestPerfResult<Vec<PeriodAnalysis>> {
    let calc_start = req.calc_start();
    let calc_end = req.calc_end();
    debug!(
        result_start = %req.result_start(),
        result_end = %req.result_end(),
        %calc_start,
        %calc_end,
        frequency = ?req.config().frequency,
        "analyzing performance"
    );

    let mut rows = PeriodRows::default();
    unmeasured_leading_periods(req, &mut rows)?;
    if calc_start <= calc_end {
        measured_periods(req, &mut rows)?;
    }
    unmeasured_trailing_periods(req, &mut rows)?;
    Ok(rows.into_rows())
}

/// Periods of the result range before measurement starts.
fn unmeasured_leading_periods(req: &AnalysisRequest<'_>, rows: &mut PeriodRows) -> InvestPerfResult<()> {
    let cfg = req.config();
    let calc_start = req.calc_start();
    let mut period_start = req.result_start();
    while period_start < calc_start && period_start <= req.result_end() {
        let period_end = cfg
            .frequency
            .period_end(period_start)?
            .min(prev_day(calc_start)?)
            .min(req.result_end());
        let mut row = PeriodAnalysis::bounds_only(
            period_start,
            period_end,
            cfg.frequency.caption(period_start),
        );
        // The last leading period ends right before measurement and shows
        // the inception value when it is known.
        if next_day(period_end)? == calc_start {
            row.period_end_value = req
                .valuations()
                .valuation(period_end)
                .map(|v| set_scale(v, cfg.result_amount_scale, cfg.rounding_mode));
        }
        rows.upsert(row);
        period_start = next_day(period_end)?;
    }
    Ok(())
}

/// Periods of the result range after measurement ends.
fn unmeasured_trailing_periods(req: &AnalysisRequest<'_>, rows: &mut PeriodRows) -> InvestPerfResult<()> {
    let cfg = req.config();
    let mut period_start = next_day(req.calc_end())?.max(req.result_start());
    while period_start <= req.result_end() {
        let period_end = cfg.frequency.period_end(period_start)?.min(req.result_end());
        rows.insert_if_absent(PeriodAnalysis::bounds_only(
            period_start,
            period_end,
            cfg.frequency.caption(period_start),
        ));
        period_start = next_day(period_end)?;
    }
    Ok(())
}

/// Entries of `lookup` in `[from, to]`; anything outside is an input error.
fn fetch_bounded(
    lookup: &dyn FlowLookup,
    from: NaiveDate,
    to: NaiveDate,
    field: &str,
) -> InvestPerfResult<DatedAmounts> {
    let amounts = lookup.amounts_between(from, to);
    if let (Some((first, _)), Some((last, _))) = (amounts.first_key_value(), amounts.last_key_value()) {
        if *first < from || *last > to {
            return Err(InvestPerfError::invalid(
                field,
                format!("lookup returned entries outside {from}..{to}: {first}..{last}"),
            ));
        }
    }
    Ok(amounts)
}

fn measured_periods(req: &AnalysisRequest<'_>, rows: &mut PeriodRows) -> InvestPerfResult<()> {
    let cfg = req.config();
    let calc_start = req.calc_start();
    let calc_end = req.calc_end();
    let valuations = req.valuations();
    let scale = cfg.calc_scale;
    let mode = cfg.rounding_mode;
    let amount = |v: Money| set_scale(v, cfg.result_amount_scale, mode);
    let rate = |r: Rate| to_pct_and_scale(r, cfg.rates_in_percent, cfg.result_rate_scale, mode);

    let flows = fetch_bounded(req.flows(), calc_start, calc_end, "flows")?;
    let incomes = match req.incomes() {
        Some(lookup) if cfg.needs_incomes() => fetch_bounded(lookup, calc_start, calc_end, "incomes")?,
        _ => DatedAmounts::new(),
    };

    let periods_per_year = cfg.frequency.count_per_year();
    let mut profit_window = cfg
        .calculate_trailing_avg_profit_1y
        .then(|| TrailingWindow::new(periods_per_year));
    let mut flow_window = cfg
        .calculate_trailing_avg_flow_1y
        .then(|| TrailingWindow::new(periods_per_year));
    let mut income_window = cfg
        .calculate_trailing_avg_income_1y
        .then(|| TrailingWindow::new(periods_per_year));
    let mut trailing_twr = TrailingTwr::new(periods_per_year, cfg.trailing_twr_depth());

    let inception_value = required_valuation(valuations, prev_day(calc_start)?, "inception")?;
    let mut cumulative_twr_factor = Decimal::ONE;
    let mut total_contribution = inception_value;
    let mut total_profit = Decimal::ZERO;

    let mut period_start = calc_start;
    while period_start <= calc_end {
        let period_end = cfg.frequency.period_end(period_start)?.min(calc_end);
        let start_value = if period_start == calc_start {
            inception_value
        } else {
            required_valuation(valuations, prev_day(period_start)?, "period start")?
        };
        let end_value = required_valuation(valuations, period_end, "period end")?;
        let period_flows = slice_amounts(&flows, period_start, period_end);

        let period_twr = period_twr(req, period_start, period_end, start_value, end_value, &period_flows)?;
        let period_twr_factor = Decimal::ONE + period_twr;
        cumulative_twr_factor = set_scale(cumulative_twr_factor * period_twr_factor, scale, mode);
        let annualized_twr_factor = annualize_growth_factor(
            AnnualizationOption::AnnualizeIfOverOneYear,
            cumulative_twr_factor,
            calc_start,
            period_end,
        )?;

        let (cumulative_mwr, annualized_mwr) = if cfg.calculate_mwr {
            let cumulative = inception_to_date_mwr(req, inception_value, period_end, end_value, &flows)?;
            let annualized = annualize_return(
                AnnualizationOption::AnnualizeIfOverOneYear,
                cumulative,
                calc_start,
                period_end,
            )?;
            (Some(cumulative), Some(annualized))
        } else {
            (None, None)
        };

        let period_flow: Money = period_flows.values().sum();
        total_contribution += period_flow;
        let period_profit = end_value - start_value - period_flow;
        total_profit += period_profit;

        let trailing_avg_profit = trailing_average(&mut profit_window, period_profit, cfg)?;
        let trailing_avg_flow = trailing_average(&mut flow_window, period_flow, cfg)?;
        let (period_income, trailing_avg_income) = if cfg.needs_incomes() {
            let income: Money = slice_amounts(&incomes, period_start, period_end).values().sum();
            (Some(income), trailing_average(&mut income_window, income, cfg)?)
        } else {
            (None, None)
        };

        let trailing = trailing_twr.push(period_twr_factor, scale, mode)?;
        let trailing_rate = |i: usize| trailing[i].map(|f| rate(f - Decimal::ONE));

        trace!(%period_start, %period_end, %period_twr, %cumulative_twr_factor, "measured period");

        rows.upsert(PeriodAnalysis {
            period_start,
            period_end,
            period_caption: cfg.frequency.caption(period_start),
            period_start_value: Some(amount(start_value)),
            period_end_value: Some(amount(end_value)),
            period_flow: Some(amount(period_flow)),
            period_twr: Some(rate(period_twr)),
            cumulative_twr: Some(rate(cumulative_twr_factor - Decimal::ONE)),
            annualized_twr: Some(rate(annualized_twr_factor - Decimal::ONE)),
            cumulative_mwr: cumulative_mwr.map(rate),
            annualized_mwr: annualized_mwr.map(rate),
            total_contribution: Some(amount(total_contribution)),
            period_profit: Some(amount(period_profit)),
            total_profit: Some(amount(total_profit)),
            period_income: period_income.map(amount),
            trailing_avg_profit_1y: trailing_avg_profit,
            trailing_avg_flow_1y: trailing_avg_flow,
            trailing_avg_income_1y: trailing_avg_income,
            trailing_twr_1y: trailing_rate(0),
            trailing_twr_2y: trailing_rate(1),
            trailing_twr_3y: trailing_rate(2),
            trailing_twr_5y: trailing_rate(3),
            trailing_twr_10y: trailing_rate(4),
        });

        period_start = next_day(period_end)?;
    }
    Ok(())
}

fn trailing_average(
    window: &mut Option<TrailingWindow>,
    value: Money,
    cfg: &AnalysisConfig,
) -> InvestPerfResult<Option<Money>> {
    window
        .as_mut()
        .map(|w| {
            w.push(value);
            w.average(cfg.result_amount_scale, cfg.rounding_mode)
        })
        .transpose()
}

/// Where a return starts when the portfolio is empty going into it: at the
/// first flow that funds it. `None` when that flow falls after `end`.
fn first_funded_start(
    valuations: &dyn ValuationLookup,
    timing: FlowTiming,
    first_flow_date: NaiveDate,
    end: NaiveDate,
) -> InvestPerfResult<Option<(NaiveDate, Money)>> {
    match timing {
        FlowTiming::BeginningOfDay => Ok(Some((first_flow_date, Decimal::ZERO))),
        FlowTiming::EndOfDay => {
            let start = next_day(first_flow_date)?;
            if start > end {
                return Ok(None);
            }
            let start_value = required_valuation(valuations, first_flow_date, "first funded day")?;
            Ok(Some((start, start_value)))
        }
    }
}

/// Time-weighted return of one period at calc scale, not annualized.
fn period_twr(
    req: &AnalysisRequest<'_>,
    period_start: NaiveDate,
    period_end: NaiveDate,
    start_value: Money,
    end_value: Money,
    period_flows: &DatedAmounts,
) -> InvestPerfResult<Rate> {
    let cfg = req.config();
    let timing = cfg.twr_flow_timing;

    let mut funded_start_value = start_value;
    let mut later_flows = period_flows.clone();
    if timing == FlowTiming::BeginningOfDay {
        if let Some(flow) = later_flows.remove(&period_start) {
            funded_start_value += flow;
        }
    }

    let (start, start_value, flows) = if funded_start_value.is_zero() {
        let Some((first_flow_date, _)) = later_flows.first_key_value() else {
            if end_value.is_zero() {
                return Ok(Decimal::ZERO);
            }
            return Err(InvestPerfError::FinancialImpossibility(format!(
                "period {period_start}..{period_end} grows from zero to {end_value} without a flow"
            )));
        };
        match first_funded_start(req.valuations(), timing, *first_flow_date, period_end)? {
            Some((start, value)) => (start, value, later_flows),
            None => return Ok(Decimal::ZERO),
        }
    } else {
        (period_start, start_value, period_flows.clone())
    };

    let calc_req = CalcRequest::new(start, period_end, start_value, end_value)?
        .with_valuations(req.valuations())
        .with_config(cfg.calc_config(timing))?
        .with_flows(flows);
    cfg.twr_calculator.method().calculate_return(&calc_req)
}

/// Money-weighted return from inception to `period_end` at calc scale, not annualized.
fn inception_to_date_mwr(
    req: &AnalysisRequest<'_>,
    inception_value: Money,
    period_end: NaiveDate,
    end_value: Money,
    flows: &DatedAmounts,
) -> InvestPerfResult<Rate> {
    let cfg = req.config();
    let timing = cfg.mwr_flow_timing;

    let (start, start_value) = if inception_value.is_zero() {
        let Some((first_flow_date, _)) = flows.range(..=period_end).next() else {
            return Ok(Decimal::ZERO);
        };
        match first_funded_start(req.valuations(), timing, *first_flow_date, period_end)? {
            Some(funded) => funded,
            None => return Ok(Decimal::ZERO),
        }
    } else {
        (req.calc_start(), inception_value)
    };

    let calc_req = CalcRequest::new(start, period_end, start_value, end_value)?
        .with_valuations(req.valuations())
        .with_config(cfg.calc_config(timing))?
        .with_flows(slice_amounts(flows, start, period_end));
    cfg.mwr_calculator.method().calculate_return(&calc_req)
}
