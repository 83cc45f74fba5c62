//! Climate Aggregator
//!
//! Batch command turning a year of ERA5 NetCDF grids into monthly GeoJSON
//! layers for regions and settlements.

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::{Parser, ValueEnum};
use tracing::{error, info};
use tracing_subscriber::{fmt, EnvFilter};

use aggregator::{load_config, AggregatorConfig, Pipeline};

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum LogFormat {
    Text,
    Json,
}

/// Climate Aggregator
#[derive(Parser, Debug)]
#[command(name = "climate-aggregator")]
#[command(about = "Aggregate ERA5 grids into monthly values per region and settlement")]
struct Args {
    /// Configuration file (YAML); defaults plus CLIMATE_* variables when absent
    #[arg(short, long, env = "CLIMATE_CONFIG")]
    config: Option<PathBuf>,

    /// Variable to process, repeatable; all configured variables by default
    #[arg(short, long = "variable")]
    variables: Vec<String>,

    /// Year to process
    #[arg(long)]
    year: Option<i32>,

    /// Directory holding one sub-directory of input files per category
    #[arg(long)]
    data_dir: Option<PathBuf>,

    /// Directory receiving the output collections
    #[arg(long)]
    output_dir: Option<PathBuf>,

    /// Log level
    #[arg(long, default_value = "info", env = "RUST_LOG")]
    log_level: String,

    /// Log output format
    #[arg(long, value_enum, default_value_t = LogFormat::Text)]
    log_format: LogFormat,
}

fn main() {
    // Load .env file if present
    dotenvy::dotenv().ok();

    let args = Args::parse();

    // Initialize tracing
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&args.log_level));

    match args.log_format {
        LogFormat::Json => fmt()
            .with_env_filter(filter)
            .with_target(true)
            .with_level(true)
            .json()
            .init(),
        LogFormat::Text => fmt()
            .with_env_filter(filter)
            .with_target(true)
            .with_level(true)
            .init(),
    }

    if let Err(e) = run(args) {
        error!(error = %format!("{:#}", e), "Aggregation failed");
        std::process::exit(1);
    }
}

fn run(args: Args) -> Result<()> {
    let mut config = match &args.config {
        Some(path) => load_config(path)?,
        None => AggregatorConfig::from_env()?,
    };

    if let Some(year) = args.year {
        config.year = year;
    }
    if let Some(dir) = args.data_dir {
        config.data_dir = dir;
    }
    if let Some(dir) = args.output_dir {
        config.output_dir = dir;
    }
    config.validate().context("Invalid configuration")?;

    info!(
        year = config.year,
        data_dir = %config.data_dir.display(),
        output_dir = %config.output_dir.display(),
        "Starting climate aggregation"
    );

    let summaries = Pipeline::new(config).run(&args.variables)?;

    for summary in &summaries {
        info!(
            variable = %summary.variable,
            source_variable = %summary.source_variable,
            files = summary.files,
            instants = summary.instants,
            regions_with_data = ?summary.regions_with_data,
            settlements = ?summary.settlements_sampled,
            clamped = summary.settlements_clamped,
            outputs = ?summary.outputs,
            "Variable complete"
        );
    }

    info!(variables = summaries.len(), "Climate aggregation finished");
    Ok(())
}
