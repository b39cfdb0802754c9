//! Single-range calculator tests.
//!
//! Fixed scenarios run through the JSON entry point, followed by property
//! tests for the invariants every calculator shares.

use chrono::{Days, NaiveDate};
use investperf_core::annualize::{annualize_growth_factor_years, annualize_return};
use investperf_core::calculator::{CalcConfig, CalcRequest, ReturnMethod};
use investperf_core::input::{run_annualization, run_calculation, AnnualizeInput, CalcInput};
use investperf_core::types::*;
use investperf_core::InvestPerfError;
use pretty_assertions::assert_eq;
use proptest::prelude::*;
use rust_decimal::{Decimal, MathematicalOps};
use rust_decimal_macros::dec;

// ===========================================================================
// Helpers
// ===========================================================================

fn d(s: &str) -> NaiveDate {
    s.parse().unwrap()
}

const ALL_METHODS: [ReturnMethod; 4] = [
    ReturnMethod::SimpleReturn,
    ReturnMethod::TrueTwr,
    ReturnMethod::LinkedModifiedDietzTwr,
    ReturnMethod::ModifiedDietzMwr,
];

/// 100,000 at the start of June, a 2,000 withdrawal on the 6th and a 20,000
/// contribution on the 11th, valued at 135,000 on the 30th.
fn readme_input(calculator: &str, flow_timing: &str) -> CalcInput {
    serde_json::from_value(serde_json::json!({
        "calculator": calculator,
        "start_date": "2020-06-01",
        "end_date": "2020-06-30",
        "start_value": "100000",
        "end_value": "135000",
        "flows": [
            {"date": "2020-06-06", "amount": "-2000"},
            {"date": "2020-06-11", "amount": "20000"}
        ],
        "valuations": [
            {"date": "2020-06-05", "amount": "101000"},
            {"date": "2020-06-10", "amount": "132000"}
        ],
        "config": {
            "flow_timing": flow_timing,
            "result_in_percent": true,
            "result_scale": 4
        }
    }))
    .unwrap()
}

fn readme_return(calculator: &str) -> String {
    run_calculation(&readme_input(calculator, "BeginningOfDay"))
        .unwrap()
        .result
        .return_value
        .to_string()
}

// ===========================================================================
// Fixed scenarios
// ===========================================================================

#[test]
fn test_readme_example_across_calculators() {
    assert_eq!(readme_return("SimpleReturnCalculator"), "35.0000");
    assert_eq!(readme_return("TrueTwrCalculator"), "19.6053");
    assert_eq!(readme_return("LinkedModifiedDietzTwrCalculator"), "19.3182");
    assert_eq!(readme_return("ModifiedDietzMwrCalculator"), "15.2239");
}

#[test]
fn test_readme_example_end_of_day_mwr() {
    let out = run_calculation(&readme_input("MwrCalculator", "EndOfDay")).unwrap();
    assert_eq!(out.result.return_value.to_string(), "15.3061");
    assert_eq!(out.result.calculator, "ModifiedDietzMwrCalculator");
    assert!(out.result.in_percent);
}

#[test]
fn test_simple_return_ignores_flows_without_warning() {
    let out = run_calculation(&readme_input("SimpleReturnCalculator", "BeginningOfDay")).unwrap();
    assert_eq!(out.result.flow_count, 2);
    assert!(out.warnings.is_empty());
}

#[test]
fn test_missing_interim_valuation_is_reported() {
    let mut input = readme_input("TrueTwrCalculator", "BeginningOfDay");
    input.valuations.retain(|v| v.date != d("2020-06-10"));
    match run_calculation(&input) {
        Err(InvestPerfError::MissingValuation { date, .. }) => assert_eq!(date, d("2020-06-10")),
        other => panic!("expected a missing valuation, got {other:?}"),
    }
}

#[test]
fn test_flows_outside_range_are_dropped_with_warning() {
    let input: CalcInput = serde_json::from_str(
        r#"{
            "calculator": "ModifiedDietzMwrCalculator",
            "start_date": "2021-01-01",
            "end_date": "2021-12-31",
            "start_value": "1000",
            "end_value": "1100",
            "flows": [{"date": "2022-01-15", "amount": "500"}]
        }"#,
    )
    .unwrap();
    let out = run_calculation(&input).unwrap();
    assert_eq!(out.result.return_value.to_string(), "0.100000");
    assert_eq!(out.result.flow_count, 0);
    assert_eq!(out.warnings.len(), 2);
}

#[test]
fn test_gips_style_mwr_with_mid_month_flows() {
    // 1,000,000 opening, +50,000 on the 10th, -20,000 on the 21st, 1,060,000 closing.
    // Weights over 30 days: 21/30 and 10/30 (beginning of day).
    let input: CalcInput = serde_json::from_str(
        r#"{
            "calculator": "ModifiedDietzMwrCalculator",
            "start_date": "2023-11-01",
            "end_date": "2023-11-30",
            "start_value": "1000000",
            "end_value": "1060000",
            "flows": [
                {"date": "2023-11-10", "amount": "50000"},
                {"date": "2023-11-21", "amount": "-20000"}
            ],
            "config": {"result_scale": 8}
        }"#,
    )
    .unwrap();
    let out = run_calculation(&input).unwrap();
    // gain 30,000 over average capital 1,028,333.33...
    assert_eq!(out.result.return_value.to_string(), "0.02917342");
}

#[test]
fn test_two_year_return_annualized_through_calculator() {
    let input: CalcInput = serde_json::from_str(
        r#"{
            "calculator": "TrueTwrCalculator",
            "start_date": "2021-01-01",
            "end_date": "2022-12-31",
            "start_value": "100",
            "end_value": "121",
            "config": {"annualization": "Annualize", "result_scale": 4}
        }"#,
    )
    .unwrap();
    let out = run_calculation(&input).unwrap();
    assert_eq!(out.result.return_value.to_string(), "0.1000");
    assert_eq!(out.warnings, vec!["No flows within range; simple return used".to_string()]);
}

#[test]
fn test_annualize_only_when_over_one_year() {
    let within_year = AnnualizeInput {
        cumulative_return: dec!(0.05),
        start_date: d("2023-01-01"),
        end_date: d("2023-12-31"),
        option: AnnualizationOption::AnnualizeIfOverOneYear,
        result_scale: 4,
        rounding_mode: RoundingMode::HalfUp,
    };
    assert_eq!(run_annualization(&within_year).unwrap().result.to_string(), "0.0500");

    let three_years = AnnualizeInput {
        cumulative_return: dec!(0.331),
        end_date: d("2025-12-31"),
        ..within_year
    };
    assert_eq!(run_annualization(&three_years).unwrap().result.to_string(), "0.1000");
}

#[test]
fn test_annualize_rejects_reversed_range() {
    let input = AnnualizeInput {
        cumulative_return: dec!(0.1),
        start_date: d("2023-06-01"),
        end_date: d("2023-01-01"),
        option: AnnualizationOption::Annualize,
        result_scale: 6,
        rounding_mode: RoundingMode::HalfUp,
    };
    assert!(run_annualization(&input).is_err());
}

// ===========================================================================
// Generators
// ===========================================================================

fn arb_amount() -> impl Strategy<Value = Decimal> {
    (1i64..=100_000_000).prop_map(|cents| Decimal::new(cents, 2))
}

fn arb_start_date() -> impl Strategy<Value = NaiveDate> {
    (2000i32..=2030, 1u32..=12, 1u32..=28)
        .prop_map(|(y, m, day)| NaiveDate::from_ymd_opt(y, m, day).unwrap())
}

/// A cumulative return between -99% and +1000%.
fn arb_cumulative_return() -> impl Strategy<Value = Decimal> {
    (-9_900i64..=100_000).prop_map(|bp| Decimal::new(bp, 4))
}

/// Percent of the interim valuation moved by a single flow, never zero.
fn arb_flow_pct() -> impl Strategy<Value = i64> {
    prop_oneof![-90i64..=-1, 1i64..=200]
}

// ===========================================================================
// Property Tests
// ===========================================================================

proptest! {
    #![proptest_config(ProptestConfig::with_cases(100))]

    /// Without flows every calculator collapses to the simple return.
    #[test]
    fn prop_no_flows_means_simple_return(
        start_value in arb_amount(),
        end_value in arb_amount(),
        start in arb_start_date(),
        length in 0u64..800,
    ) {
        let end = start.checked_add_days(Days::new(length)).unwrap();
        let req = CalcRequest::new(start, end, start_value, end_value).unwrap();
        let simple = ReturnMethod::SimpleReturn.calculate_return(&req).unwrap();
        for method in ALL_METHODS {
            prop_assert_eq!(method.calculate_return(&req).unwrap(), simple);
        }
    }

    /// A return earned within a year is left alone unless annualization is forced.
    #[test]
    fn prop_short_spans_are_not_annualized(
        cumulative in arb_cumulative_return(),
        start in arb_start_date(),
        length in 0u64..365,
    ) {
        let end = start.checked_add_days(Days::new(length)).unwrap();
        let unchanged = annualize_return(
            AnnualizationOption::AnnualizeIfOverOneYear, cumulative, start, end,
        ).unwrap();
        prop_assert_eq!(unchanged, cumulative);
        let untouched = annualize_return(
            AnnualizationOption::DoNotAnnualize, cumulative, start, end,
        ).unwrap();
        prop_assert_eq!(untouched, cumulative);
    }

    /// Annualizing a compounded factor over whole years recovers the yearly factor.
    #[test]
    fn prop_whole_year_annualization_inverts_compounding(
        yearly_bp in 5_000i64..=20_000,
        years in 2u32..=10,
    ) {
        let yearly = Decimal::new(yearly_bp, 4);
        let compounded = yearly.powu(years as u64);
        let annualized = annualize_growth_factor_years(
            AnnualizationOption::Annualize, compounded, years,
        ).unwrap();
        prop_assert!((annualized - yearly).abs() < dec!(0.000000001),
            "{} years of {} annualized to {}", years, yearly, annualized);
    }

    /// With every flow counted as large, linked Modified Dietz values the
    /// portfolio at each flow and matches the true time-weighted return.
    #[test]
    fn prop_linked_dietz_matches_true_twr_when_every_flow_is_large(
        start_value in arb_amount(),
        interim_value in arb_amount(),
        end_value in arb_amount(),
        flow_day in 2u32..=30,
        flow_pct in arb_flow_pct(),
    ) {
        let start = d("2023-01-01");
        let end = d("2023-01-31");
        let flow_date = NaiveDate::from_ymd_opt(2023, 1, flow_day).unwrap();
        let flow = interim_value * Decimal::from(flow_pct) / dec!(100);
        let valuations: DatedAmounts =
            [(flow_date.pred_opt().unwrap(), interim_value)].into_iter().collect();
        let req = CalcRequest::new(start, end, start_value, end_value)
            .unwrap()
            .with_flows([(flow_date, flow)].into_iter().collect())
            .with_valuations(&valuations)
            .with_config(CalcConfig {
                large_flow_threshold_pct: Decimal::ZERO,
                result_scale: 10,
                ..CalcConfig::default()
            })
            .unwrap();
        let twr = ReturnMethod::TrueTwr.calculate_return(&req).unwrap();
        let linked = ReturnMethod::LinkedModifiedDietzTwr.calculate_return(&req).unwrap();
        prop_assert!((twr - linked).abs() <= dec!(0.0000000001),
            "true TWR {} vs linked Modified Dietz {}", twr, linked);
    }

    /// When the closing value is exactly opening value plus net flows,
    /// the money-weighted return is zero.
    #[test]
    fn prop_modified_dietz_zero_gain_is_zero_return(
        start_value in arb_amount(),
        contributions in prop::collection::btree_map(1u32..=28, arb_amount(), 0..5),
    ) {
        let flows: DatedAmounts = contributions
            .iter()
            .map(|(day, amount)| (NaiveDate::from_ymd_opt(2023, 2, *day).unwrap(), *amount))
            .collect();
        let end_value = start_value + flows.values().copied().sum::<Decimal>();
        let req = CalcRequest::new(d("2023-02-01"), d("2023-02-28"), start_value, end_value)
            .unwrap()
            .with_flows(flows);
        let mwr = ReturnMethod::ModifiedDietzMwr.calculate_return(&req).unwrap();
        prop_assert!(mwr.is_zero(), "expected zero, got {}", mwr);
    }

    /// A single flow on the boundary the timing folds into leaves nothing
    /// to weight, so true TWR and Modified Dietz agree.
    #[test]
    fn prop_true_twr_matches_modified_dietz_with_boundary_flow(
        start_value in arb_amount(),
        gain in arb_amount(),
        flow in arb_amount(),
        start in arb_start_date(),
        length in 1u64..800,
        end_of_day in any::<bool>(),
    ) {
        let end = start.checked_add_days(Days::new(length)).unwrap();
        let (timing, flow_date) = if end_of_day {
            (FlowTiming::EndOfDay, end)
        } else {
            (FlowTiming::BeginningOfDay, start)
        };
        let req = CalcRequest::new(start, end, start_value, start_value + flow + gain)
            .unwrap()
            .with_flows([(flow_date, flow)].into_iter().collect())
            .with_flow_timing(timing);
        let twr = ReturnMethod::TrueTwr.calculate_return(&req).unwrap();
        let mwr = ReturnMethod::ModifiedDietzMwr.calculate_return(&req).unwrap();
        prop_assert_eq!(twr, mwr);
    }

    /// Past one year, annualizing moves any factor other than 0 or 1.
    #[test]
    fn prop_long_spans_are_annualized(
        cumulative in arb_cumulative_return(),
        start in arb_start_date(),
        length in 366u64..4000,
    ) {
        prop_assume!(!cumulative.is_zero());
        let end = start.checked_add_days(Days::new(length)).unwrap();
        let annualized = annualize_return(
            AnnualizationOption::AnnualizeIfOverOneYear, cumulative, start, end,
        ).unwrap();
        prop_assert_ne!(annualized, cumulative);
        // Same sign, smaller magnitude
        prop_assert!(annualized.abs() < cumulative.abs(),
            "{} over {} days annualized to {}", cumulative, length + 1, annualized);
        prop_assert_eq!(annualized.is_sign_negative(), cumulative.is_sign_negative());
    }

    /// Losing everything is a -100% money-weighted return whatever the flows.
    #[test]
    fn prop_modified_dietz_total_loss_is_minus_one(
        start_value in arb_amount(),
        contributions in prop::collection::btree_map(2u32..=28, arb_amount(), 1..5),
    ) {
        let flows: DatedAmounts = contributions
            .iter()
            .map(|(day, amount)| (NaiveDate::from_ymd_opt(2023, 2, *day).unwrap(), *amount))
            .collect();
        let req = CalcRequest::new(d("2023-02-01"), d("2023-02-28"), start_value, Decimal::ZERO)
            .unwrap()
            .with_flows(flows);
        let mwr = ReturnMethod::ModifiedDietzMwr.calculate_return(&req).unwrap();
        prop_assert_eq!(mwr, dec!(-1));
    }
}
