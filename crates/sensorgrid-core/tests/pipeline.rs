use anyhow::Result;
use chrono::{NaiveDate, NaiveDateTime, TimeDelta};
use sensorgrid_core::{resample, DeviceResampleError, ResampleError};
use sensorgrid_parser::{parse_sensor_file, ColumnNames, Dataset, Record, Schema};

fn fixture(name: &str) -> String {
    let path = std::path::Path::new(env!("CARGO_MANIFEST_DIR"))
        .join("../sensorgrid-parser/tests/data")
        .join(name);
    std::fs::read_to_string(path).expect("read fixture")
}

fn at(millis: i64) -> NaiveDateTime {
    NaiveDate::from_ymd_opt(2024, 1, 1)
        .and_then(|d| d.and_hms_opt(0, 0, 0))
        .expect("valid timestamp")
        + TimeDelta::milliseconds(millis)
}

fn row(millis: i64, device: &str, payload: &[&str]) -> Record {
    Record::new(
        at(millis),
        device,
        payload.iter().map(|value| value.to_string()).collect(),
    )
}

fn dataset(records: Vec<Record>) -> Dataset {
    let schema = Schema::new("timestamp", "device_id", vec!["value".to_string()]);
    Dataset::new(schema, records)
}

#[test]
fn single_device_lands_on_half_second_grid() -> Result<()> {
    let input = dataset(vec![
        row(0, "A", &["a0"]),
        row(400, "A", &["a4"]),
        row(900, "A", &["a9"]),
    ]);

    let outcome = resample(input, 2.0)?;

    assert_eq!(outcome.grid.start(), at(0));
    assert_eq!(outcome.grid.end(), at(1000));
    assert_eq!(outcome.grid.points(), &[at(0), at(500)]);

    let timestamps: Vec<NaiveDateTime> = outcome.table.iter().map(|r| r.timestamp).collect();
    assert_eq!(timestamps, vec![at(0), at(500)]);
    let sources: Vec<NaiveDateTime> = outcome.table.iter().map(|r| r.source_timestamp).collect();
    assert_eq!(sources, vec![at(0), at(400)]);
    assert!(outcome.table.iter().all(|r| r.device_id == "A"));
    assert!(!outcome.has_failures());
    Ok(())
}

#[test]
fn duplicate_reading_keeps_first_payload() -> Result<()> {
    let input = dataset(vec![
        row(0, "A", &["first"]),
        row(0, "A", &["second"]),
        row(800, "A", &["later"]),
    ]);

    let outcome = resample(input, 2.0)?;

    assert_eq!(outcome.summary.input_rows, 3);
    assert_eq!(outcome.summary.deduplicated_rows, 2);
    assert_eq!(outcome.table.records[0].payload, vec!["first"]);
    assert!(outcome
        .table
        .iter()
        .all(|r| r.payload != vec!["second".to_string()]));
    Ok(())
}

#[test]
fn empty_dataset_is_fatal() {
    let err = resample(dataset(Vec::new()), 2.0).expect_err("should fail");
    assert!(matches!(err, ResampleError::EmptyDataset));
}

#[test]
fn invalid_frequency_is_reported_before_emptiness() {
    let err = resample(dataset(Vec::new()), -1.0).expect_err("should fail");
    assert!(matches!(err, ResampleError::InvalidFrequency { frequency } if frequency == -1.0));
}

#[test]
fn all_devices_failing_is_fatal_and_lists_them() {
    let input = dataset(vec![
        row(0, "A", &["1", "unexpected"]),
        row(300, "B", &[]),
        row(600, "A", &["2"]),
    ]);

    let err = resample(input, 2.0).expect_err("should fail");

    match err {
        ResampleError::NoValidData { failures } => {
            let ids: Vec<&str> = failures.iter().map(|f| f.device_id.as_str()).collect();
            assert_eq!(ids, vec!["A", "B"]);
            assert_eq!(
                failures[1].error,
                DeviceResampleError::PayloadWidth {
                    index: 0,
                    expected: 1,
                    found: 0,
                }
            );
            assert_eq!(failures[0].row_count, 2);
        }
        other => panic!("unexpected error: {other}"),
    }
}

#[test]
fn malformed_device_is_isolated() -> Result<()> {
    let input = dataset(vec![
        row(0, "A", &["a0"]),
        row(100, "B", &["b1", "extra"]),
        row(700, "A", &["a7"]),
        row(900, "B", &["b9"]),
    ]);

    let outcome = resample(input, 2.0)?;

    assert_eq!(outcome.failed_device_ids(), vec!["B"]);
    assert_eq!(outcome.table.device_ids(), vec!["A"]);
    assert_eq!(outcome.table.len(), outcome.grid.len());
    assert_eq!(outcome.summary.failed_devices.len(), 1);
    assert_eq!(outcome.summary.failed_devices[0].device_id, "B");
    assert_eq!(outcome.summary.failed_devices[0].rows, 2);
    assert!(outcome.summary.failed_devices[0]
        .reason
        .contains("expected 1"));
    Ok(())
}

#[test]
fn every_device_covers_the_whole_global_grid_in_encounter_order() -> Result<()> {
    let input = dataset(vec![
        row(2600, "Z", &["z26"]),
        row(0, "A", &["a0"]),
        row(300, "A", &["a3"]),
        row(2900, "Z", &["z29"]),
    ]);

    let outcome = resample(input, 2.0)?;
    let grid = &outcome.grid;

    assert_eq!(grid.end(), at(3000));
    assert_eq!(grid.len(), 6);
    assert_eq!(outcome.table.device_ids(), vec!["Z", "A"]);

    for device in ["Z", "A"] {
        let times: Vec<NaiveDateTime> = outcome
            .table
            .records_for(device)
            .map(|r| r.timestamp)
            .collect();
        assert_eq!(times, grid.points());
    }

    let a_payloads: Vec<&str> = outcome
        .table
        .records_for("A")
        .map(|r| r.payload[0].as_str())
        .collect();
    assert_eq!(a_payloads, vec!["a0", "a3", "a3", "a3", "a3", "a3"]);

    let z_payloads: Vec<&str> = outcome
        .table
        .records_for("Z")
        .map(|r| r.payload[0].as_str())
        .collect();
    assert_eq!(z_payloads, vec!["z26", "z26", "z26", "z26", "z26", "z26"]);
    Ok(())
}

#[test]
fn grid_collapsing_to_nothing_yields_no_valid_data() {
    let input = dataset(vec![row(1000, "A", &["x"]), row(1000, "B", &["y"])]);

    let err = resample(input, 2.0).expect_err("should fail");
    match err {
        ResampleError::NoValidData { failures } => assert!(failures.is_empty()),
        other => panic!("unexpected error: {other}"),
    }
}

#[test]
fn parsed_fixture_resamples_end_to_end() -> Result<()> {
    let parsed = parse_sensor_file(&fixture("sensors_zh.csv"), &ColumnNames::default())?;

    let outcome = resample(parsed, 2.0)?;

    assert_eq!(outcome.summary.input_rows, 7);
    assert_eq!(outcome.summary.deduplicated_rows, 6);
    assert_eq!(outcome.summary.devices, 2);
    assert_eq!(outcome.grid.len(), 6);
    assert_eq!(outcome.table.len(), 12);
    assert_eq!(outcome.table.device_ids(), vec!["dev-1", "dev-2"]);

    let dev1: Vec<&[String]> = outcome
        .table
        .records_for("dev-1")
        .map(|r| r.payload.as_slice())
        .collect();
    assert_eq!(dev1[0], ["21.5", "40"]);
    assert_eq!(dev1[1], ["21.7", "41"]);
    assert_eq!(dev1[2], ["21.9", "42"]);
    assert_eq!(dev1[5], ["21.9", "42"]);
    Ok(())
}

#[test]
fn ragged_fixture_drops_only_the_ragged_device() -> Result<()> {
    let parsed = parse_sensor_file(&fixture("sensors_ragged.csv"), &ColumnNames::default())?;

    let outcome = resample(parsed, 2.0)?;

    assert_eq!(outcome.failed_device_ids(), vec!["B"]);
    assert_eq!(outcome.table.device_ids(), vec!["A"]);
    assert_eq!(outcome.table.len(), outcome.grid.len());
    Ok(())
}

#[test]
fn blank_timestamp_fails_only_its_device() -> Result<()> {
    let parsed = parse_sensor_file(&fixture("sensors_gaps.csv"), &ColumnNames::default())?;

    let outcome = resample(parsed, 2.0)?;

    // The device-less row at 10:00:03.400 still stretches the grid to 10:00:04.
    assert_eq!(outcome.grid.len(), 8);
    assert_eq!(outcome.table.device_ids(), vec!["A"]);
    assert_eq!(outcome.table.len(), outcome.grid.len());
    let a_payloads: Vec<&str> = outcome
        .table
        .records_for("A")
        .map(|r| r.payload[0].as_str())
        .collect();
    assert_eq!(a_payloads, vec!["1", "3", "3", "3", "3", "3", "3", "3"]);

    assert_eq!(outcome.failed_device_ids(), vec!["B"]);
    assert_eq!(
        outcome.failures[0].error,
        DeviceResampleError::MissingTimestamp { count: 1 }
    );
    assert_eq!(outcome.failures[0].row_count, 2);
    Ok(())
}

#[test]
fn orphan_timestamps_widen_the_grid() -> Result<()> {
    let input = dataset(vec![row(0, "A", &["a0"])]).with_orphan_timestamps(vec![at(2300)]);

    let outcome = resample(input, 2.0)?;

    assert_eq!(outcome.grid.end(), at(3000));
    assert_eq!(outcome.table.len(), 6);
    Ok(())
}

#[test]
fn records_without_any_timestamp_yield_no_valid_data() {
    let input = dataset(vec![
        Record::untimed("A", vec!["1".to_string()]),
        Record::untimed("B", vec!["2".to_string()]),
    ]);

    let err = resample(input, 2.0).expect_err("should fail");
    match err {
        ResampleError::NoValidData { failures } => {
            let ids: Vec<&str> = failures.iter().map(|f| f.device_id.as_str()).collect();
            assert_eq!(ids, vec!["A", "B"]);
            assert!(failures
                .iter()
                .all(|f| f.error == DeviceResampleError::MissingTimestamp { count: 1 }));
        }
        other => panic!("unexpected error: {other}"),
    }
}
