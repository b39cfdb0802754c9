use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

use crate::types::*;

/// One row of a periodized analysis.
///
/// Fields that were not computed for a row stay `None` (serialized as
/// `null`), which is distinct from a computed zero. Periods outside the
/// measurement window carry only their bounds and caption, plus the end
/// value of the period right before measurement starts, when known.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PeriodAnalysis {
    pub period_start: NaiveDate,
    pub period_end: NaiveDate,
    pub period_caption: String,
    pub period_start_value: Option<Money>,
    pub period_end_value: Option<Money>,
    pub period_flow: Option<Money>,
    pub period_twr: Option<Rate>,
    pub cumulative_twr: Option<Rate>,
    pub annualized_twr: Option<Rate>,
    pub cumulative_mwr: Option<Rate>,
    pub annualized_mwr: Option<Rate>,
    pub total_contribution: Option<Money>,
    pub period_profit: Option<Money>,
    pub total_profit: Option<Money>,
    pub period_income: Option<Money>,
    pub trailing_avg_profit_1y: Option<Money>,
    pub trailing_avg_flow_1y: Option<Money>,
    pub trailing_avg_income_1y: Option<Money>,
    pub trailing_twr_1y: Option<Rate>,
    pub trailing_twr_2y: Option<Rate>,
    pub trailing_twr_3y: Option<Rate>,
    pub trailing_twr_5y: Option<Rate>,
    pub trailing_twr_10y: Option<Rate>,
}

impl PeriodAnalysis {
    /// A row with only its bounds and caption set.
    pub fn bounds_only(period_start: NaiveDate, period_end: NaiveDate, caption: String) -> Self {
        PeriodAnalysis {
            period_start,
            period_end,
            period_caption: caption,
            period_start_value: None,
            period_end_value: None,
            period_flow: None,
            period_twr: None,
            cumulative_twr: None,
            annualized_twr: None,
            cumulative_mwr: None,
            annualized_mwr: None,
            total_contribution: None,
            period_profit: None,
            total_profit: None,
            period_income: None,
            trailing_avg_profit_1y: None,
            trailing_avg_flow_1y: None,
            trailing_avg_income_1y: None,
            trailing_twr_1y: None,
            trailing_twr_2y: None,
            trailing_twr_3y: None,
            trailing_twr_5y: None,
            trailing_twr_10y: None,
        }
    }
}

/// Rows in chronological order, unique by caption.
#[derive(Debug, Default)]
pub(crate) struct PeriodRows {
    rows: Vec<PeriodAnalysis>,
    index: HashMap<String, usize>,
}

impl PeriodRows {
    /// Insert a row, replacing any earlier row with the same caption in place.
    pub fn upsert(&mut self, row: PeriodAnalysis) {
        match self.index.get(&row.period_caption) {
            Some(&i) => self.rows[i] = row,
            None => {
                self.index.insert(row.period_caption.clone(), self.rows.len());
                self.rows.push(row);
            }
        }
    }

    /// Insert a row unless one with the same caption already exists.
    pub fn insert_if_absent(&mut self, row: PeriodAnalysis) {
        if !self.index.contains_key(&row.period_caption) {
            self.upsert(row);
        }
    }

    pub fn into_rows(self) -> Vec<PeriodAnalysis> {
        self.rows
    }
}
