use rust_decimal::Decimal;
use std::collections::VecDeque;

use crate::annualize::annualize_growth_factor_years;
use crate::types::*;
use crate::InvestPerfResult;

/// Fixed-capacity window over the most recent per-period values.
#[derive(Debug, Clone)]
pub struct TrailingWindow {
    capacity: usize,
    values: VecDeque<Decimal>,
}

impl TrailingWindow {
    pub fn new(capacity: usize) -> Self {
        TrailingWindow {
            capacity,
            values: VecDeque::with_capacity(capacity),
        }
    }

    /// Append the newest value, evicting the oldest once full.
    pub fn push(&mut self, value: Decimal) {
        if self.capacity == 0 {
            return;
        }
        if self.values.len() == self.capacity {
            self.values.pop_front();
        }
        self.values.push_back(value);
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    pub fn is_full(&self) -> bool {
        self.capacity > 0 && self.values.len() == self.capacity
    }

    pub fn sum(&self) -> Decimal {
        self.values.iter().sum()
    }

    /// Sum divided by the number of values currently held.
    pub fn average(&self, scale: u32, mode: RoundingMode) -> InvestPerfResult<Decimal> {
        divide(
            self.sum(),
            Decimal::from(self.values.len()),
            scale,
            mode,
            "trailing average",
        )
    }

    /// Product of all values except the `skip_newest` most recent ones.
    pub fn product_excluding_newest(&self, skip_newest: usize) -> Decimal {
        let keep = self.values.len().saturating_sub(skip_newest);
        self.values
            .iter()
            .take(keep)
            .fold(Decimal::ONE, |acc, v| acc * v)
    }
}

/// Horizons of the cascading trailing TWR, in years.
pub const TRAILING_TWR_YEARS: [u32; 5] = [1, 2, 3, 5, 10];

/// Trailing growth factors for the 1, 2, 3, 5 and 10 year horizons.
pub type TrailingFactors = [Option<Decimal>; 5];

/// Cascading windows of period growth factors.
///
/// Each horizon reuses the unannualized factor of the next shorter one and
/// multiplies in only the older periods it adds, so the 10Y window never
/// rescans the newest five years.
#[derive(Debug, Clone)]
pub struct TrailingTwr {
    periods_per_year: usize,
    windows: Vec<TrailingWindow>,
}

impl TrailingTwr {
    /// `depth` horizons are maintained, starting from 1Y.
    pub fn new(periods_per_year: usize, depth: usize) -> Self {
        let windows = TRAILING_TWR_YEARS
            .iter()
            .take(depth)
            .map(|years| TrailingWindow::new(*years as usize * periods_per_year))
            .collect();
        TrailingTwr {
            periods_per_year,
            windows,
        }
    }

    /// Record one period's growth factor and return the annualized trailing
    /// factors of every horizon whose window is full.
    pub fn push(
        &mut self,
        period_factor: Decimal,
        scale: u32,
        mode: RoundingMode,
    ) -> InvestPerfResult<TrailingFactors> {
        let mut annualized: TrailingFactors = [None; 5];
        let mut shorter: Option<Decimal> = None;
        let mut shorter_periods = 0;

        for (i, window) in self.windows.iter_mut().enumerate() {
            window.push(period_factor);
            let years = TRAILING_TWR_YEARS[i];
            let factor = if !window.is_full() {
                None
            } else if i == 0 {
                Some(set_scale(window.product_excluding_newest(0), scale, mode))
            } else {
                shorter.map(|f| {
                    set_scale(f * window.product_excluding_newest(shorter_periods), scale, mode)
                })
            };

            annualized[i] = match factor {
                Some(f) if i > 0 => Some(annualize_growth_factor_years(
                    AnnualizationOption::AnnualizeIfOverOneYear,
                    f,
                    years,
                )?),
                other => other,
            };
            shorter = factor;
            shorter_periods = years as usize * self.periods_per_year;
        }
        Ok(annualized)
    }
}
