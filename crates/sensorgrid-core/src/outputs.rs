use std::fmt;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::str::FromStr;

use chrono::Timelike;
use polars::io::parquet::write::{ParquetCompression, ParquetWriter, StatisticsOptions};
use polars::prelude::*;
use serde::{Deserialize, Serialize};

use crate::error::OutputError;
use crate::resample::OutputTable;

const UTF8_BOM: &[u8] = b"\xEF\xBB\xBF";
const SECONDS_FORMAT: &str = "%Y-%m-%d %H:%M:%S";
const MICROS_FORMAT: &str = "%Y-%m-%d %H:%M:%S%.6f";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OutputFormat {
    #[default]
    Csv,
    Parquet,
}

impl OutputFormat {
    pub fn as_str(&self) -> &'static str {
        match self {
            OutputFormat::Csv => "csv",
            OutputFormat::Parquet => "parquet",
        }
    }
}

impl fmt::Display for OutputFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for OutputFormat {
    type Err = String;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().as_str() {
            "csv" => Ok(OutputFormat::Csv),
            "parquet" | "pq" => Ok(OutputFormat::Parquet),
            other => Err(format!("unknown output format '{other}'")),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CsvOptions {
    /// Prefix the file with a UTF-8 byte-order mark so spreadsheet tools detect the encoding.
    pub bom: bool,
}

impl Default for CsvOptions {
    fn default() -> Self {
        Self { bom: true }
    }
}

/// `cleaned_<file name>` for CSV, `cleaned_<stem>.parquet` for Parquet, inside `output_dir`.
pub fn output_path(input: &Path, output_dir: &Path, format: OutputFormat) -> PathBuf {
    let file_name = match format {
        OutputFormat::Csv => input
            .file_name()
            .map(|name| name.to_string_lossy().into_owned())
            .unwrap_or_else(|| "output.csv".to_string()),
        OutputFormat::Parquet => {
            let stem = input
                .file_stem()
                .map(|stem| stem.to_string_lossy().into_owned())
                .unwrap_or_else(|| "output".to_string());
            format!("{stem}.parquet")
        }
    };
    output_dir.join(format!("cleaned_{file_name}"))
}

pub fn write_table<W: Write>(
    table: &OutputTable,
    writer: W,
    format: OutputFormat,
    csv_options: CsvOptions,
) -> Result<(), OutputError> {
    match format {
        OutputFormat::Csv => write_csv(table, writer, csv_options),
        OutputFormat::Parquet => write_parquet(table, writer),
    }
}

/// Writes the header and one row per resampled record. The timestamp column comes first; the
/// remaining columns keep their input order.
pub fn write_csv<W: Write>(
    table: &OutputTable,
    mut writer: W,
    options: CsvOptions,
) -> Result<(), OutputError> {
    if options.bom {
        writer.write_all(UTF8_BOM)?;
    }

    let mut csv_writer = csv::Writer::from_writer(writer);
    csv_writer.write_record(table.schema.output_columns())?;

    let format = timestamp_format(table);
    for record in table.iter() {
        let timestamp = record.timestamp.format(format).to_string();
        let mut row: Vec<&str> = Vec::with_capacity(record.payload.len() + 2);
        row.push(timestamp.as_str());
        row.extend(
            table
                .schema
                .arrange(&record.device_id, record.payload.iter().map(String::as_str)),
        );
        csv_writer.write_record(&row)?;
    }

    csv_writer.flush()?;
    Ok(())
}

// One format for the whole column: sub-second digits only when some row needs them.
fn timestamp_format(table: &OutputTable) -> &'static str {
    if table.iter().any(|record| record.timestamp.nanosecond() != 0) {
        MICROS_FORMAT
    } else {
        SECONDS_FORMAT
    }
}

/// Builds a DataFrame with a `Datetime(µs)` timestamp column and string columns for the rest.
pub fn to_dataframe(table: &OutputTable) -> Result<DataFrame, OutputError> {
    let schema = &table.schema;

    let timestamps: Vec<i64> = table
        .iter()
        .map(|record| record.timestamp.and_utc().timestamp_micros())
        .collect();
    let ts_series = Series::new(schema.timestamp_column.as_str().into(), timestamps)
        .cast(&DataType::Datetime(TimeUnit::Microseconds, None))?;

    let devices: Vec<&str> = table.iter().map(|record| record.device_id.as_str()).collect();
    let device_series = Series::new(schema.device_column.as_str().into(), devices);

    let mut rest: Vec<Series> = schema
        .payload_columns
        .iter()
        .enumerate()
        .map(|(idx, name)| {
            let values: Vec<Option<&str>> = table
                .iter()
                .map(|record| record.payload.get(idx).map(String::as_str))
                .collect();
            Series::new(name.as_str().into(), values)
        })
        .collect();
    let position = schema.device_position.min(rest.len());
    rest.insert(position, device_series);

    let mut columns: Vec<Column> = Vec::with_capacity(rest.len() + 1);
    columns.push(ts_series.into());
    columns.extend(rest.into_iter().map(Column::from));

    Ok(DataFrame::new(columns)?)
}

pub fn write_parquet<W: Write>(table: &OutputTable, writer: W) -> Result<(), OutputError> {
    let mut df = to_dataframe(table)?;
    ParquetWriter::new(writer)
        .with_compression(ParquetCompression::Zstd(None))
        .with_statistics(StatisticsOptions::default())
        .finish(&mut df)?;
    Ok(())
}
