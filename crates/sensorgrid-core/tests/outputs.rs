use std::path::Path;

use anyhow::Result;
use polars::prelude::{DataType, TimeUnit};
use sensorgrid_core::outputs::{output_path, to_dataframe, write_csv, write_parquet, write_table};
use sensorgrid_core::{resample, CsvOptions, OutputFormat, OutputTable};
use sensorgrid_parser::{parse_sensor_file, ColumnNames};

fn fixture(name: &str) -> String {
    let path = Path::new(env!("CARGO_MANIFEST_DIR"))
        .join("../sensorgrid-parser/tests/data")
        .join(name);
    std::fs::read_to_string(path).expect("read fixture")
}

fn resampled(name: &str, frequency: f64) -> Result<OutputTable> {
    let parsed = parse_sensor_file(&fixture(name), &ColumnNames::default())?;
    Ok(resample(parsed, frequency)?.table)
}

#[test]
fn csv_moves_timestamp_first_and_keeps_device_position() -> Result<()> {
    let table = resampled("sensors_semicolon.csv", 2.0)?;

    let mut buffer = Vec::new();
    write_csv(&table, &mut buffer, CsvOptions { bom: false })?;
    let text = String::from_utf8(buffer)?;
    let lines: Vec<&str> = text.lines().collect();

    assert_eq!(lines.len(), 9);
    assert_eq!(lines[0], "timestamp,temperature,device_id");
    assert_eq!(lines[1], "2024-05-01 10:00:00.000000,20.1,A");
    assert_eq!(lines[2], "2024-05-01 10:00:00.500000,20.1,A");
    assert_eq!(lines[3], "2024-05-01 10:00:01.000000,20.6,A");
    assert_eq!(lines[5], "2024-05-01 10:00:00.000000,20.4,B");
    Ok(())
}

#[test]
fn csv_prefixes_bom_only_when_asked() -> Result<()> {
    let table = resampled("sensors_zh.csv", 2.0)?;

    let mut with_bom = Vec::new();
    write_csv(&table, &mut with_bom, CsvOptions::default())?;
    assert!(with_bom.starts_with(b"\xEF\xBB\xBF"));
    let text = String::from_utf8(with_bom[3..].to_vec())?;
    assert_eq!(text.lines().next(), Some("时间戳,设备ID,温度,湿度"));

    let mut without_bom = Vec::new();
    write_csv(&table, &mut without_bom, CsvOptions { bom: false })?;
    assert!(without_bom.starts_with("时间戳".as_bytes()));
    Ok(())
}

#[test]
fn whole_second_grid_omits_fractional_digits() -> Result<()> {
    let table = resampled("sensors_semicolon.csv", 1.0)?;

    let mut buffer = Vec::new();
    write_csv(&table, &mut buffer, CsvOptions { bom: false })?;
    let text = String::from_utf8(buffer)?;

    assert_eq!(text.lines().nth(1), Some("2024-05-01 10:00:00,20.1,A"));
    assert_eq!(text.lines().nth(2), Some("2024-05-01 10:00:01,20.6,A"));
    Ok(())
}

#[test]
fn dataframe_has_one_row_per_record_in_output_column_order() -> Result<()> {
    let table = resampled("sensors_semicolon.csv", 2.0)?;

    let df = to_dataframe(&table)?;

    assert_eq!(df.height(), table.len());
    let names: Vec<&str> = df.get_column_names().iter().map(|n| n.as_str()).collect();
    assert_eq!(names, vec!["timestamp", "temperature", "device_id"]);
    assert_eq!(
        df.column("timestamp")?.dtype(),
        &DataType::Datetime(TimeUnit::Microseconds, None)
    );
    assert_eq!(df.column("device_id")?.str()?.get(7), Some("B"));
    Ok(())
}

#[test]
fn parquet_output_is_a_parquet_file() -> Result<()> {
    let table = resampled("sensors_zh.csv", 2.0)?;

    let mut direct = Vec::new();
    write_parquet(&table, &mut direct)?;
    assert!(direct.starts_with(b"PAR1"));
    assert!(direct.ends_with(b"PAR1"));

    let mut dispatched = Vec::new();
    write_table(&table, &mut dispatched, OutputFormat::Parquet, CsvOptions::default())?;
    assert!(dispatched.starts_with(b"PAR1"));
    Ok(())
}

#[test]
fn output_path_follows_cleaned_prefix_convention() {
    let input = Path::new("/data/incoming/raw_2024.csv");
    let dir = Path::new("cleaned");

    assert_eq!(
        output_path(input, dir, OutputFormat::Csv),
        Path::new("cleaned/cleaned_raw_2024.csv")
    );
    assert_eq!(
        output_path(input, dir, OutputFormat::Parquet),
        Path::new("cleaned/cleaned_raw_2024.parquet")
    );
}

#[test]
fn output_format_parses_case_insensitively() {
    assert_eq!("CSV".parse::<OutputFormat>(), Ok(OutputFormat::Csv));
    assert_eq!("parquet".parse::<OutputFormat>(), Ok(OutputFormat::Parquet));
    assert!("xlsx".parse::<OutputFormat>().is_err());
}
