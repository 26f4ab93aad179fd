//! Ride Demand Predictor - Main Entry Point
//!
//! Reads a batch of ride requests, predicts demand for each one and writes
//! the annotated batch back out.

use anyhow::{Context, Result};
use clap::Parser;
use ride_demand::config::{AppConfig, LoggingConfig};
use std::path::PathBuf;
use std::process::ExitCode;
use tracing::info;
use tracing_subscriber::EnvFilter;

#[derive(Debug, Parser)]
#[command(
    name = "predict",
    about = "Predict ride demand for a batch of pickup requests",
    version
)]
struct Cli {
    /// Input file path
    #[arg(short, long)]
    input: PathBuf,

    /// Output file path
    #[arg(short, long, default_value = "output.json")]
    output: PathBuf,

    /// TOML configuration file
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Artifact directory, overrides `artifacts.dir`
    #[arg(long)]
    models: Option<PathBuf>,
}

fn init_logging(logging: &LoggingConfig) -> Result<()> {
    let filter = EnvFilter::try_from_default_env().or_else(|_| {
        EnvFilter::try_new(format!("ride_demand={},predict={}", logging.level, logging.level))
    })?;
    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr);

    match logging.format.as_str() {
        "json" => builder.json().init(),
        _ => builder.init(),
    }
    Ok(())
}

fn setup(cli: &Cli) -> Result<AppConfig> {
    let mut config = AppConfig::load_or_default(cli.config.as_deref())
        .with_context(|| format!("Failed to load configuration from {:?}", cli.config))?;
    if let Some(dir) = &cli.models {
        config.artifacts.dir = dir.clone();
    }
    init_logging(&config.logging).context("Failed to initialize logging")?;
    Ok(config)
}

fn main() -> ExitCode {
    let cli = Cli::parse();

    let config = match setup(&cli) {
        Ok(config) => config,
        Err(e) => {
            eprintln!("{e:#}");
            return ExitCode::FAILURE;
        }
    };
    info!(
        input = %cli.input.display(),
        output = %cli.output.display(),
        "Starting demand prediction"
    );

    match ride_demand::run(&config, &cli.input, &cli.output) {
        Ok(summary) => {
            summary.metrics.print_summary();
            println!("Predictions saved to {}", summary.output.display());
            ExitCode::SUCCESS
        }
        Err(e) => {
            eprintln!("{e}");
            ExitCode::from(e.exit_code() as u8)
        }
    }
}
