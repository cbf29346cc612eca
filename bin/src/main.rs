//! CLI for the betagrid feature pipeline.
//!
//! Reads a price CSV and a Fama-French factor CSV, runs the return
//! engineering and rolling beta window sweep, and writes the feature and
//! target tables.

use betagrid::{FactorSeries, FeaturePipeline, MIN_WINDOW, SweepConfig};
use clap::{Parser, Subcommand};
use indicatif::{ProgressBar, ProgressStyle};
use polars::prelude::*;
use std::path::{Path, PathBuf};
use std::time::Duration;

#[derive(Parser)]
#[command(name = "betagrid")]
#[command(about = "Rolling factor-beta feature pipeline", long_about = None)]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run the full feature pipeline over price and factor CSVs
    Run {
        /// Price CSV with symbol,date,close columns
        #[arg(long)]
        prices: PathBuf,
        /// Factor CSV with date,Market,SMB,HML,RMW,CMA,RF columns
        #[arg(long)]
        factors: PathBuf,
        /// Output directory for features.csv and targets.csv
        #[arg(long, default_value = ".")]
        output: PathBuf,
        /// Override the window-length sweep, e.g. --windows 15,30,60
        #[arg(long, value_delimiter = ',')]
        windows: Option<Vec<usize>>,
    },
    /// Print the configured window sweep
    Windows,
}

fn main() {
    let cli = Cli::parse();
    let result = match cli.command {
        Commands::Run {
            prices,
            factors,
            output,
            windows,
        } => run(&prices, &factors, &output, windows),
        Commands::Windows => {
            show_windows();
            Ok(())
        }
    };
    if let Err(err) = result {
        eprintln!("error: {err}");
        std::process::exit(1);
    }
}

fn run(
    prices: &Path,
    factors: &Path,
    output: &Path,
    windows: Option<Vec<usize>>,
) -> Result<(), Box<dyn std::error::Error>> {
    let price_frame = read_csv(prices)?;
    let factor_frame = read_csv(factors)?;
    let factor_series = FactorSeries::from_frame(&factor_frame)?;

    let mut config = SweepConfig::default();
    if let Some(windows) = windows {
        config.window_lengths = windows;
    }
    config.validate()?;

    let spinner = ProgressBar::new_spinner();
    spinner.set_style(ProgressStyle::default_spinner());
    spinner.set_message(format!(
        "sweeping {} windows over {} price rows",
        config.window_lengths.len(),
        price_frame.height()
    ));
    spinner.enable_steady_tick(Duration::from_millis(100));

    let pipeline = FeaturePipeline::new(config);
    let mut set = pipeline.run(&price_frame, &factor_series)?;
    spinner.finish_and_clear();

    std::fs::create_dir_all(output)?;
    write_csv(&mut set.features, &output.join("features.csv"))?;
    write_csv(&mut set.targets, &output.join("targets.csv"))?;

    println!(
        "features: {} rows x {} columns",
        set.features.height(),
        set.features.width()
    );
    println!(
        "targets:  {} rows x {} columns",
        set.targets.height(),
        set.targets.width()
    );
    println!(
        "coverage: {} estimates; {} of {} (symbol, window) pairs empty",
        set.report.estimates, set.report.empty_pairs, set.report.total_pairs
    );
    Ok(())
}

fn show_windows() {
    let config = SweepConfig::default();
    println!(
        "Window sweep ({} lengths, minimum usable {MIN_WINDOW}):",
        config.window_lengths.len()
    );
    for window in &config.window_lengths {
        println!("  {window:02} trading days");
    }
}

fn read_csv(path: &Path) -> Result<DataFrame, Box<dyn std::error::Error>> {
    let frame = CsvReadOptions::default()
        .with_has_header(true)
        .try_into_reader_with_file_path(Some(path.to_path_buf()))?
        .finish()?;
    Ok(frame)
}

fn write_csv(df: &mut DataFrame, path: &Path) -> Result<(), Box<dyn std::error::Error>> {
    let mut file = std::fs::File::create(path)?;
    CsvWriter::new(&mut file).finish(df)?;
    Ok(())
}
