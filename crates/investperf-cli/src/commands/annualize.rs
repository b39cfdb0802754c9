use chrono::NaiveDate;
use clap::Args;
use rust_decimal::Decimal;
use serde_json::Value;

use investperf_core::input::{run_annualization, AnnualizeInput};
use investperf_core::types::*;

use crate::input;

/// Arguments for annualizing a cumulative return
#[derive(Args)]
pub struct AnnualizeArgs {
    /// Path to JSON or YAML input file
    #[arg(long)]
    pub input: Option<String>,

    /// Cumulative return as a decimal (0.21 = 21%)
    #[arg(long, allow_hyphen_values = true)]
    pub cumulative_return: Option<Decimal>,

    /// First day the return was earned (YYYY-MM-DD)
    #[arg(long)]
    pub start_date: Option<NaiveDate>,

    /// Last day the return was earned (YYYY-MM-DD)
    #[arg(long)]
    pub end_date: Option<NaiveDate>,

    /// annualize, annualize-if-over-one-year or do-not-annualize
    #[arg(long, default_value = "annualize")]
    pub option: AnnualizationOption,

    /// Decimal places of the result
    #[arg(long, default_value = "6")]
    pub scale: u32,
}

pub fn run_annualize(args: AnnualizeArgs) -> Result<Value, Box<dyn std::error::Error>> {
    let annualize_input: AnnualizeInput = if let Some(ref path) = args.input {
        input::file::read_input(path)?
    } else if let Some(data) = input::stdin::read_stdin()? {
        serde_json::from_value(data)?
    } else {
        AnnualizeInput {
            cumulative_return: args
                .cumulative_return
                .ok_or("--cumulative-return is required (or provide --input)")?,
            start_date: args
                .start_date
                .ok_or("--start-date is required (or provide --input)")?,
            end_date: args
                .end_date
                .ok_or("--end-date is required (or provide --input)")?,
            option: args.option,
            result_scale: args.scale,
            rounding_mode: RoundingMode::default(),
        }
    };

    let result = run_annualization(&annualize_input)?;
    Ok(serde_json::to_value(result)?)
}
