use chrono::NaiveDate;
use clap::Args;
use rust_decimal::Decimal;
use serde_json::Value;

use investperf_core::calculator::CalcConfig;
use investperf_core::input::{run_calculation, CalcInput};
use investperf_core::types::*;

use crate::input;

/// Arguments for a single-range return calculation
#[derive(Args)]
pub struct CalculateArgs {
    /// Path to JSON or YAML input file
    #[arg(long)]
    pub input: Option<String>,

    /// Calculator name, e.g. TrueTwrCalculator, LinkedModifiedDietzTwrCalculator,
    /// ModifiedDietzMwrCalculator or SimpleReturnCalculator
    #[arg(long, default_value = "TrueTwrCalculator")]
    pub calculator: String,

    /// First day of the range (YYYY-MM-DD)
    #[arg(long)]
    pub start_date: Option<NaiveDate>,

    /// Last day of the range (YYYY-MM-DD)
    #[arg(long)]
    pub end_date: Option<NaiveDate>,

    /// Value at the start, excluding any flow on the start date
    #[arg(long)]
    pub start_value: Option<Decimal>,

    /// Value at the end, including any flow on the end date
    #[arg(long)]
    pub end_value: Option<Decimal>,

    /// Comma-separated flows as DATE:AMOUNT (e.g. "2020-06-06:-2000,2020-06-11:20000")
    #[arg(long, value_delimiter = ',', allow_hyphen_values = true, value_parser = parse_dated_amount)]
    pub flows: Option<Vec<DatedAmount>>,

    /// Comma-separated interim valuations as DATE:AMOUNT
    #[arg(long, value_delimiter = ',', value_parser = parse_dated_amount)]
    pub valuations: Option<Vec<DatedAmount>>,

    /// When boundary flows are counted: beginning-of-day or end-of-day
    #[arg(long, default_value = "beginning-of-day")]
    pub flow_timing: FlowTiming,

    /// do-not-annualize, annualize or annualize-if-over-one-year
    #[arg(long, default_value = "do-not-annualize")]
    pub annualization: AnnualizationOption,

    /// Report the return in percent
    #[arg(long)]
    pub percent: bool,

    /// Decimal places of the reported return
    #[arg(long, default_value = "6")]
    pub scale: u32,
}

/// Parse `YYYY-MM-DD:AMOUNT`.
pub fn parse_dated_amount(s: &str) -> Result<DatedAmount, String> {
    let (date, amount) = s
        .split_once(':')
        .ok_or_else(|| format!("expected DATE:AMOUNT, got '{s}'"))?;
    let date: NaiveDate = date
        .trim()
        .parse()
        .map_err(|e| format!("invalid date '{date}': {e}"))?;
    let amount: Decimal = amount
        .trim()
        .parse()
        .map_err(|e| format!("invalid amount '{amount}': {e}"))?;
    Ok(DatedAmount { date, amount })
}

pub fn run_calculate(args: CalculateArgs) -> Result<Value, Box<dyn std::error::Error>> {
    let calc_input: CalcInput = if let Some(ref path) = args.input {
        input::file::read_input(path)?
    } else if let Some(data) = input::stdin::read_stdin()? {
        serde_json::from_value(data)?
    } else {
        let start_date = args
            .start_date
            .ok_or("--start-date is required (or provide --input)")?;
        let end_date = args
            .end_date
            .ok_or("--end-date is required (or provide --input)")?;
        let start_value = args
            .start_value
            .ok_or("--start-value is required (or provide --input)")?;
        let end_value = args
            .end_value
            .ok_or("--end-value is required (or provide --input)")?;

        CalcInput {
            calculator: args.calculator,
            start_date,
            end_date,
            start_value,
            end_value,
            flows: args.flows.unwrap_or_default(),
            valuations: args.valuations.unwrap_or_default(),
            config: CalcConfig {
                flow_timing: args.flow_timing,
                annualization: args.annualization,
                result_in_percent: args.percent,
                result_scale: args.scale,
                ..CalcConfig::default()
            },
        }
    };

    let result = run_calculation(&calc_input)?;
    Ok(serde_json::to_value(result)?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn test_parse_dated_amount() {
        let parsed = parse_dated_amount("2020-06-06:-2000").unwrap();
        assert_eq!(parsed.date, NaiveDate::from_ymd_opt(2020, 6, 6).unwrap());
        assert_eq!(parsed.amount, dec!(-2000));
        assert!(parse_dated_amount("2020-06-06").is_err());
        assert!(parse_dated_amount("06/06/2020:5").is_err());
    }
}
