mod commands;
mod input;
mod output;

use clap::{Parser, Subcommand, ValueEnum};
use colored::Colorize;
use std::process;
use tracing_subscriber::EnvFilter;

use commands::analyze::AnalyzeArgs;
use commands::annualize::AnnualizeArgs;
use commands::calculate::CalculateArgs;

/// Time-weighted and money-weighted investment performance
#[derive(Parser)]
#[command(
    name = "investperf",
    version,
    about = "Time-weighted and money-weighted investment performance",
    long_about = "A CLI for measuring investment performance with decimal precision. \
                  Computes true and linked Modified Dietz time-weighted returns, \
                  Modified Dietz money-weighted returns, annualization, and \
                  periodized analyses with trailing statistics."
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Output format
    #[arg(long, default_value = "json", global = true)]
    output: OutputFormat,

    /// Log calculation steps to stderr (overrides RUST_LOG)
    #[arg(long, short, global = true)]
    verbose: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Return over a single date range with a named calculator
    Calculate(CalculateArgs),
    /// Periodized TWR/MWR analysis over a result date range
    Analyze(AnalyzeArgs),
    /// Annualize a cumulative return earned over a date range
    Annualize(AnnualizeArgs),
    /// Print version information
    Version,
}

#[derive(Debug, Clone, ValueEnum)]
pub enum OutputFormat {
    Json,
    Table,
    Csv,
    Minimal,
}

fn init_tracing(verbose: bool) {
    let filter = if verbose {
        EnvFilter::new("investperf_core=debug")
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"))
    };
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

fn main() {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    let result: Result<serde_json::Value, Box<dyn std::error::Error>> = match cli.command {
        Commands::Calculate(args) => commands::calculate::run_calculate(args),
        Commands::Analyze(args) => commands::analyze::run_analyze(args),
        Commands::Annualize(args) => commands::annualize::run_annualize(args),
        Commands::Version => {
            println!("investperf {}", env!("CARGO_PKG_VERSION"));
            return;
        }
    };

    match result {
        Ok(value) => {
            output::format_output(&cli.output, &value);
            process::exit(0);
        }
        Err(e) => {
            eprintln!("{}: {}", "error".red().bold(), e);
            process::exit(1);
        }
    }
}
