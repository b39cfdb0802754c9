use clap::Args;
use serde_json::Value;

use investperf_core::frequency::Frequency;
use investperf_core::input::{run_analysis, AnalysisInput};

use crate::input;

/// Arguments for a periodized performance analysis
#[derive(Args)]
pub struct AnalyzeArgs {
    /// Path to JSON or YAML input file
    #[arg(long)]
    pub input: Option<String>,

    /// Override the reporting frequency: month, quarter, half-year or year
    #[arg(long)]
    pub frequency: Option<Frequency>,

    /// Report rates in percent
    #[arg(long)]
    pub percent: bool,
}

pub fn run_analyze(args: AnalyzeArgs) -> Result<Value, Box<dyn std::error::Error>> {
    let mut analysis_input: AnalysisInput = if let Some(ref path) = args.input {
        input::file::read_input(path)?
    } else if let Some(data) = input::stdin::read_stdin()? {
        serde_json::from_value(data)?
    } else {
        return Err("--input <file.json|file.yaml> or stdin required for analysis".into());
    };

    if let Some(frequency) = args.frequency {
        analysis_input.config.frequency = frequency;
    }
    if args.percent {
        analysis_input.config.rates_in_percent = true;
    }

    let result = run_analysis(&analysis_input)?;
    Ok(serde_json::to_value(result)?)
}
