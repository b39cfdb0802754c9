//! Calendar reporting frequencies for periodized analysis.

use chrono::{Datelike, NaiveDate};
use serde::{Deserialize, Serialize};
use std::str::FromStr;

use crate::error::InvestPerfError;
use crate::InvestPerfResult;

/// Calendar-aligned reporting period length.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Frequency {
    /// Calendar months.
    #[default]
    Month,
    /// Calendar quarters (Jan-Mar, Apr-Jun, ...).
    Quarter,
    /// Calendar half-years (Jan-Jun, Jul-Dec).
    HalfYear,
    /// Calendar years.
    Year,
}

impl Frequency {
    /// Number of periods in a year, used to size trailing windows.
    #[must_use]
    pub const fn count_per_year(&self) -> usize {
        match self {
            Frequency::Month => 12,
            Frequency::Quarter => 4,
            Frequency::HalfYear => 2,
            Frequency::Year => 1,
        }
    }

    const fn months(&self) -> u32 {
        match self {
            Frequency::Month => 1,
            Frequency::Quarter => 3,
            Frequency::HalfYear => 6,
            Frequency::Year => 12,
        }
    }

    /// Last day of the calendar period containing `date`.
    pub fn period_end(&self, date: NaiveDate) -> InvestPerfResult<NaiveDate> {
        let months = self.months();
        let next_start_month0 = (date.month0() / months + 1) * months;
        let (year, month) = if next_start_month0 >= 12 {
            (date.year() + 1, 1)
        } else {
            (date.year(), next_start_month0 + 1)
        };
        NaiveDate::from_ymd_opt(year, month, 1)
            .and_then(|d| d.pred_opt())
            .ok_or_else(|| InvestPerfError::DateError(format!("no period end for {date}")))
    }

    /// Caption of the calendar period containing `date`, e.g. "2023-01",
    /// "2023-Q1", "2023-H1" or "2023".
    pub fn caption(&self, date: NaiveDate) -> String {
        let year = date.year();
        match self {
            Frequency::Month => format!("{}-{:02}", year, date.month()),
            Frequency::Quarter => format!("{}-Q{}", year, date.month0() / 3 + 1),
            Frequency::HalfYear => format!("{}-H{}", year, date.month0() / 6 + 1),
            Frequency::Year => year.to_string(),
        }
    }
}

impl FromStr for Frequency {
    type Err = InvestPerfError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().replace(['-', '_'], "").as_str() {
            "month" | "monthly" => Ok(Frequency::Month),
            "quarter" | "quarterly" => Ok(Frequency::Quarter),
            "halfyear" | "semiannual" => Ok(Frequency::HalfYear),
            "year" | "annual" | "yearly" => Ok(Frequency::Year),
            _ => Err(InvestPerfError::invalid(
                "frequency",
                format!("'{s}' is not one of: month, quarter, half-year, year"),
            )),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn d(y: i32, m: u32, day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, day).unwrap()
    }

    #[test]
    fn test_month_end_handles_leap_february() {
        assert_eq!(Frequency::Month.period_end(d(2024, 2, 10)).unwrap(), d(2024, 2, 29));
        assert_eq!(Frequency::Month.period_end(d(2023, 2, 1)).unwrap(), d(2023, 2, 28));
        assert_eq!(Frequency::Month.period_end(d(2023, 12, 31)).unwrap(), d(2023, 12, 31));
    }

    #[test]
    fn test_quarter_and_half_year_ends() {
        assert_eq!(Frequency::Quarter.period_end(d(2023, 5, 17)).unwrap(), d(2023, 6, 30));
        assert_eq!(Frequency::Quarter.period_end(d(2023, 10, 1)).unwrap(), d(2023, 12, 31));
        assert_eq!(Frequency::HalfYear.period_end(d(2023, 7, 1)).unwrap(), d(2023, 12, 31));
        assert_eq!(Frequency::HalfYear.period_end(d(2023, 6, 30)).unwrap(), d(2023, 6, 30));
        assert_eq!(Frequency::Year.period_end(d(2023, 1, 1)).unwrap(), d(2023, 12, 31));
    }

    #[test]
    fn test_captions() {
        let date = d(2023, 8, 5);
        assert_eq!(Frequency::Month.caption(date), "2023-08");
        assert_eq!(Frequency::Quarter.caption(date), "2023-Q3");
        assert_eq!(Frequency::HalfYear.caption(date), "2023-H2");
        assert_eq!(Frequency::Year.caption(date), "2023");
    }

    #[test]
    fn test_parse() {
        assert_eq!("Monthly".parse::<Frequency>().unwrap(), Frequency::Month);
        assert_eq!("half-year".parse::<Frequency>().unwrap(), Frequency::HalfYear);
        assert!("weekly".parse::<Frequency>().is_err());
    }
}
