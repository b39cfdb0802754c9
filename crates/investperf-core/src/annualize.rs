use chrono::{Datelike, Months, NaiveDate};
use rust_decimal::prelude::{FromPrimitive, ToPrimitive};
use rust_decimal::Decimal;

use crate::error::InvestPerfError;
use crate::types::*;
use crate::InvestPerfResult;

/// Whole calendar months from `start` to `end`, truncated toward zero.
fn whole_months_between(start: NaiveDate, end: NaiveDate) -> i64 {
    let start_months = start.year() as i64 * 12 + start.month0() as i64;
    let end_months = end.year() as i64 * 12 + end.month0() as i64;
    let mut months = end_months - start_months;
    if months > 0 && end.day() < start.day() {
        months -= 1;
    } else if months < 0 && end.day() > start.day() {
        months += 1;
    }
    months
}

/// Split `[start, end_excl)` into whole years plus remaining days.
pub fn years_and_days(start: NaiveDate, end_excl: NaiveDate) -> InvestPerfResult<(i64, i64)> {
    if end_excl < start {
        return Err(InvestPerfError::DateError(format!(
            "start date {start} must not be after end date {end_excl}"
        )));
    }
    let full_years = whole_months_between(start, end_excl) / 12;
    let anniversary = start
        .checked_add_months(Months::new(full_years as u32 * 12))
        .ok_or_else(|| InvestPerfError::DateError(format!("date overflow from {start}")))?;
    let days = (end_excl - anniversary).num_days();
    Ok((full_years, days))
}

fn pow_factor(factor: Decimal, exponent: f64) -> InvestPerfResult<Decimal> {
    let base = factor.to_f64().ok_or_else(|| {
        InvestPerfError::FinancialImpossibility(format!("growth factor {factor} is not representable"))
    })?;
    let annualized = base.powf(exponent);
    Decimal::from_f64(annualized).ok_or_else(|| {
        InvestPerfError::FinancialImpossibility(format!(
            "cannot annualize growth factor {factor} (result {annualized})"
        ))
    })
}

/// Annualize a cumulative growth factor earned over `[start, end]` (both inclusive).
///
/// Factors of exactly 0 or 1 are returned unchanged. Uses floating-point
/// exponentiation since the exponent is generally irrational.
pub fn annualize_growth_factor(
    option: AnnualizationOption,
    factor: Decimal,
    start: NaiveDate,
    end: NaiveDate,
) -> InvestPerfResult<Decimal> {
    if option == AnnualizationOption::DoNotAnnualize {
        return Ok(factor);
    }
    if factor.is_zero() {
        return Ok(Decimal::ZERO);
    }
    if factor == Decimal::ONE {
        return Ok(factor);
    }
    let (full_years, days) = years_and_days(start, next_day(end)?)?;
    if option == AnnualizationOption::AnnualizeIfOverOneYear
        && (full_years == 0 || (full_years == 1 && days == 0))
    {
        return Ok(factor);
    }
    if full_years == 0 && days == 0 {
        return Err(InvestPerfError::DateError(format!(
            "cannot annualize an empty span {start}..{end}"
        )));
    }
    let exponent = 1.0 / (full_years as f64 + days as f64 / 365.0);
    pow_factor(factor, exponent)
}

/// Annualize a cumulative growth factor earned over exactly `full_years` years.
pub fn annualize_growth_factor_years(
    option: AnnualizationOption,
    factor: Decimal,
    full_years: u32,
) -> InvestPerfResult<Decimal> {
    if option == AnnualizationOption::DoNotAnnualize {
        return Ok(factor);
    }
    if factor.is_zero() {
        return Ok(Decimal::ZERO);
    }
    if factor == Decimal::ONE {
        return Ok(factor);
    }
    if option == AnnualizationOption::AnnualizeIfOverOneYear && full_years <= 1 {
        return Ok(factor);
    }
    match full_years {
        0 => Err(InvestPerfError::DateError(
            "cannot annualize over zero years".into(),
        )),
        1 => Ok(factor),
        n => pow_factor(factor, 1.0 / n as f64),
    }
}

/// Annualize a cumulative return (growth factor minus one) earned over `[start, end]`.
pub fn annualize_return(
    option: AnnualizationOption,
    cumulative_return: Rate,
    start: NaiveDate,
    end: NaiveDate,
) -> InvestPerfResult<Rate> {
    if option == AnnualizationOption::DoNotAnnualize {
        return Ok(cumulative_return);
    }
    let factor = annualize_growth_factor(option, cumulative_return + Decimal::ONE, start, end)?;
    Ok(factor - Decimal::ONE)
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    fn d(y: i32, m: u32, day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, day).unwrap()
    }

    #[test]
    fn test_do_not_annualize_is_identity() {
        let f = annualize_growth_factor(
            AnnualizationOption::DoNotAnnualize,
            dec!(1.7),
            d(2020, 1, 1),
            d(2025, 1, 1),
        )
        .unwrap();
        assert_eq!(f, dec!(1.7));
    }

    #[test]
    fn test_zero_and_one_factors_unchanged() {
        for factor in [Decimal::ZERO, Decimal::ONE] {
            let f = annualize_growth_factor(
                AnnualizationOption::Annualize,
                factor,
                d(2020, 1, 1),
                d(2023, 6, 30),
            )
            .unwrap();
            assert_eq!(f, factor);
        }
    }

    #[test]
    fn test_years_and_days() {
        assert_eq!(years_and_days(d(2021, 1, 1), d(2022, 1, 1)).unwrap(), (1, 0));
        assert_eq!(years_and_days(d(2020, 2, 28), d(2021, 3, 1)).unwrap(), (1, 1));
        assert_eq!(years_and_days(d(2020, 2, 29), d(2021, 2, 28)).unwrap(), (0, 365));
        assert!(years_and_days(d(2022, 1, 1), d(2020, 1, 1)).is_err());
    }

    #[test]
    fn test_reversed_span_is_error() {
        assert!(years_and_days(d(2023, 6, 1), d(2023, 3, 1)).is_err());
        for option in [
            AnnualizationOption::Annualize,
            AnnualizationOption::AnnualizeIfOverOneYear,
        ] {
            let err = annualize_growth_factor(option, dec!(1.1), d(2023, 6, 1), d(2023, 3, 1))
                .unwrap_err();
            assert!(matches!(err, InvestPerfError::DateError(_)), "got {err:?}");
        }
    }

    #[test]
    fn test_exactly_one_year_is_not_annualized_if_over_one_year() {
        let r = annualize_return(
            AnnualizationOption::AnnualizeIfOverOneYear,
            dec!(1.0),
            d(2021, 1, 1),
            d(2021, 12, 31),
        )
        .unwrap();
        assert_eq!(r, dec!(1.0));
    }

    #[test]
    fn test_one_year_and_one_day_is_annualized() {
        let r = annualize_return(
            AnnualizationOption::AnnualizeIfOverOneYear,
            dec!(1.0),
            d(2020, 2, 28),
            d(2021, 2, 28),
        )
        .unwrap();
        let expected = dec!(0.99621589487);
        assert!(
            (r - expected).abs() < dec!(0.000001),
            "Expected ~{}, got {}",
            expected,
            r
        );
    }

    #[test]
    fn test_two_years_square_root() {
        let f = annualize_growth_factor(
            AnnualizationOption::Annualize,
            dec!(1.21),
            d(2021, 1, 1),
            d(2022, 12, 31),
        )
        .unwrap();
        assert!((f - dec!(1.1)).abs() < dec!(0.0000001), "got {}", f);
    }

    #[test]
    fn test_integer_years_overload() {
        let f = annualize_growth_factor_years(AnnualizationOption::AnnualizeIfOverOneYear, dec!(4), 2)
            .unwrap();
        assert!((f - dec!(2)).abs() < dec!(0.0000001));
        assert_eq!(
            annualize_growth_factor_years(AnnualizationOption::Annualize, dec!(1.5), 1).unwrap(),
            dec!(1.5)
        );
        assert!(
            annualize_growth_factor_years(AnnualizationOption::Annualize, dec!(1.5), 0).is_err()
        );
    }

    #[test]
    fn test_short_span_annualize_always() {
        let f = annualize_growth_factor(
            AnnualizationOption::Annualize,
            dec!(1.01),
            d(2023, 1, 1),
            d(2023, 1, 31),
        )
        .unwrap();
        assert!(f > dec!(1.01));
    }
}
