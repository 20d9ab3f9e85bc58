mod config;

use std::fs::{self, File};
use std::io::BufWriter;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use clap::Parser;
use comfy_table::Table;
use sensorgrid_core::outputs::{output_path, write_table};
use sensorgrid_core::{resample, CsvOptions, OutputFormat, ResampleOutcome};
use sensorgrid_parser::parse_sensor_file;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use crate::config::{Overrides, Settings};

const DEFAULT_LOG_FILTER: &str = "warn,sensorgrid=info,sensorgrid_core=info";

#[derive(Parser, Debug)]
#[command(
    author,
    version,
    about = "Resample irregular multi-device sensor readings onto a shared time grid",
    long_about = None
)]
struct Cli {
    /// Input table with a timestamp column and a device column
    input: PathBuf,

    /// Target sampling rate in samples per second [default: 2]
    #[arg(allow_negative_numbers = true)]
    frequency: Option<f64>,

    /// TOML settings file (falls back to $SENSORGRID_CONFIG)
    #[arg(long)]
    config: Option<PathBuf>,

    /// Directory the cleaned file is written to [default: cleaned]
    #[arg(long)]
    output_dir: Option<PathBuf>,

    /// Output file format: csv or parquet
    #[arg(long)]
    format: Option<OutputFormat>,

    /// Do not prefix CSV output with a UTF-8 byte-order mark
    #[arg(long)]
    no_bom: bool,

    /// Write a JSON run summary to this path
    #[arg(long)]
    report: Option<PathBuf>,

    /// Header name of the timestamp column
    #[arg(long)]
    timestamp_column: Option<String>,

    /// Header name of the device column
    #[arg(long)]
    device_column: Option<String>,

    /// Print a per-device table to stderr after the run
    #[arg(long)]
    summary: bool,

    /// Emit logs as JSON
    #[arg(long)]
    log_json: bool,
}

impl Cli {
    fn overrides(&self) -> Overrides {
        Overrides {
            frequency: self.frequency,
            output_dir: self.output_dir.clone(),
            format: self.format,
            no_bom: self.no_bom,
            timestamp_column: self.timestamp_column.clone(),
            device_column: self.device_column.clone(),
        }
    }
}

fn main() -> Result<()> {
    dotenvy::dotenv().ok();
    let cli = Cli::parse();
    init_tracing(cli.log_json);

    let settings = Settings::resolve(
        cli.config.as_deref(),
        |key| std::env::var(key).ok(),
        &cli.overrides(),
    )?;

    let (outcome, output) = clean_file(&cli.input, &settings)?;

    if let Some(report_path) = &cli.report {
        write_report(report_path, &outcome)?;
    }
    if cli.summary {
        eprintln!("{}", device_table(&outcome));
    }
    for failure in &outcome.failures {
        eprintln!(
            "warning: device {} skipped: {}",
            failure.device_id, failure.error
        );
    }

    // The caller scans stdout for this marker to locate the result.
    println!("CLEANED_FILE:{}", output.display());
    Ok(())
}

fn init_tracing(json: bool) {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(DEFAULT_LOG_FILTER));
    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr);
    if json {
        builder.json().init();
    } else {
        builder.init();
    }
}

/// Parses, resamples and writes one file. Nothing is written unless resampling succeeds.
fn clean_file(input: &Path, settings: &Settings) -> Result<(ResampleOutcome, PathBuf)> {
    let content = fs::read_to_string(input)
        .with_context(|| format!("failed to read input file {}", input.display()))?;
    let dataset = parse_sensor_file(&content, &settings.columns)
        .with_context(|| format!("failed to parse {}", input.display()))?;
    info!(
        input = %input.display(),
        rows = dataset.len(),
        frequency = settings.frequency,
        "parsed input"
    );

    let outcome = resample(dataset, settings.frequency)
        .with_context(|| format!("failed to resample {}", input.display()))?;
    if outcome.has_failures() {
        warn!(
            failed = ?outcome.failed_device_ids(),
            "some devices were skipped"
        );
    }

    fs::create_dir_all(&settings.output_dir).with_context(|| {
        format!(
            "failed to create output directory {}",
            settings.output_dir.display()
        )
    })?;
    let output = output_path(input, &settings.output_dir, settings.format);
    let file = File::create(&output)
        .with_context(|| format!("failed to create {}", output.display()))?;
    write_table(
        &outcome.table,
        BufWriter::new(file),
        settings.format,
        CsvOptions { bom: settings.bom },
    )
    .with_context(|| format!("failed to write {}", output.display()))?;

    info!(output = %output.display(), rows = outcome.table.len(), "wrote cleaned file");
    Ok((outcome, output))
}

fn write_report(path: &Path, outcome: &ResampleOutcome) -> Result<()> {
    let json = serde_json::to_string_pretty(&outcome.summary)?;
    fs::write(path, json).with_context(|| format!("failed to write report {}", path.display()))
}

fn device_table(outcome: &ResampleOutcome) -> Table {
    let mut table = Table::new();
    table.set_header(vec!["device", "status", "rows"]);
    for device in outcome.table.device_ids() {
        let rows = outcome.table.records_for(device).count();
        table.add_row(vec![device.to_string(), "resampled".to_string(), rows.to_string()]);
    }
    for failure in &outcome.failures {
        table.add_row(vec![
            failure.device_id.clone(),
            format!("skipped: {}", failure.error),
            failure.row_count.to_string(),
        ]);
    }
    table
}
