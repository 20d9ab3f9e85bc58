//! Dedup -> grid -> per-device resample, as one pure function over a dataset.

use chrono::NaiveDateTime;
use sensorgrid_parser::Dataset;
use serde::Serialize;
use tracing::info;

use crate::dedup::deduplicate;
use crate::error::{DeviceResampleError, ResampleError};
use crate::grid::{build_grid, validate_frequency, TimeGrid};
use crate::group::group_by_device;
use crate::resample::{resample_groups, validated_timestamps, OutputTable};

/// A device dropped from the run, with the reason it was dropped.
#[derive(Debug, Clone, PartialEq)]
pub struct DeviceFailure {
    pub device_id: String,
    pub row_count: usize,
    pub error: DeviceResampleError,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FailedDevice {
    pub device_id: String,
    pub rows: usize,
    pub reason: String,
}

impl From<&DeviceFailure> for FailedDevice {
    fn from(failure: &DeviceFailure) -> Self {
        Self {
            device_id: failure.device_id.clone(),
            rows: failure.row_count,
            reason: failure.error.to_string(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RunSummary {
    pub frequency: f64,
    pub input_rows: usize,
    pub deduplicated_rows: usize,
    pub devices: usize,
    pub grid_start: NaiveDateTime,
    pub grid_end: NaiveDateTime,
    pub step_micros: i64,
    pub grid_points: usize,
    pub output_rows: usize,
    pub failed_devices: Vec<FailedDevice>,
}

#[derive(Debug, Clone)]
pub struct ResampleOutcome {
    pub table: OutputTable,
    pub failures: Vec<DeviceFailure>,
    pub grid: TimeGrid,
    pub summary: RunSummary,
}

impl ResampleOutcome {
    /// Failed device ids in the order the devices were first seen.
    pub fn failed_device_ids(&self) -> Vec<&str> {
        self.failures.iter().map(|f| f.device_id.as_str()).collect()
    }

    pub fn has_failures(&self) -> bool {
        !self.failures.is_empty()
    }
}

/// Resamples every device of `dataset` onto one shared grid at `frequency` samples per second.
///
/// Fails outright on a non-positive frequency, on an empty dataset, and when no device produced
/// a single resampled record. A device that cannot be resampled is otherwise reported in
/// [`ResampleOutcome::failures`] and left out of the table.
pub fn resample(dataset: Dataset, frequency: f64) -> Result<ResampleOutcome, ResampleError> {
    validate_frequency(frequency)?;
    if dataset.is_empty() {
        return Err(ResampleError::EmptyDataset);
    }
    let input_rows = dataset.len();

    let deduped = deduplicate(dataset);
    let grid = match deduped.timestamp_bounds() {
        Some(_) => Some(build_grid(&deduped, frequency)?),
        None => None,
    };

    let Dataset { schema, records, .. } = deduped;
    let deduplicated_rows = records.len();
    let groups = group_by_device(records);
    let devices = groups.len();
    let payload_width = schema.payload_width();

    // Not one record carries a timestamp, so every device fails on its own.
    let Some(grid) = grid else {
        let failures = groups
            .iter()
            .filter_map(|group| {
                validated_timestamps(group, payload_width)
                    .err()
                    .map(|error| DeviceFailure {
                        device_id: group.device_id.clone(),
                        row_count: group.len(),
                        error,
                    })
            })
            .collect();
        return Err(ResampleError::NoValidData { failures });
    };

    let mut rows = Vec::with_capacity(devices * grid.len());
    let mut failures = Vec::new();
    let mut producing_devices = 0usize;

    for result in resample_groups(groups, &grid, payload_width) {
        match result.outcome {
            Ok(resampled) => {
                if !resampled.is_empty() {
                    producing_devices += 1;
                }
                rows.extend(resampled);
            }
            Err(error) => failures.push(DeviceFailure {
                device_id: result.device_id,
                row_count: result.row_count,
                error,
            }),
        }
    }

    if producing_devices == 0 {
        return Err(ResampleError::NoValidData { failures });
    }

    let table = OutputTable::new(schema, rows);
    let summary = RunSummary {
        frequency,
        input_rows,
        deduplicated_rows,
        devices,
        grid_start: grid.start(),
        grid_end: grid.end(),
        step_micros: grid.step_micros(),
        grid_points: grid.len(),
        output_rows: table.len(),
        failed_devices: failures.iter().map(FailedDevice::from).collect(),
    };

    info!(
        devices,
        resampled_devices = producing_devices,
        failed_devices = failures.len(),
        output_rows = table.len(),
        "resampling finished"
    );

    Ok(ResampleOutcome {
        table,
        failures,
        grid,
        summary,
    })
}
