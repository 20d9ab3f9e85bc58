use chrono::NaiveDateTime;
use sensorgrid_parser::Schema;
use serde::Serialize;
use tracing::warn;

use crate::error::DeviceResampleError;
use crate::grid::TimeGrid;
use crate::group::DeviceGroup;

/// A record re-expressed at a grid point.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ResampledRecord {
    pub timestamp: NaiveDateTime,
    pub device_id: String,
    pub payload: Vec<String>,
    /// Timestamp of the source record the grid point was matched to. Not serialised to output
    /// tables.
    pub source_timestamp: NaiveDateTime,
}

/// Resampled records of every successful device, device-then-time order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OutputTable {
    pub schema: Schema,
    pub records: Vec<ResampledRecord>,
}

impl OutputTable {
    pub fn new(schema: Schema, records: Vec<ResampledRecord>) -> Self {
        Self { schema, records }
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, ResampledRecord> {
        self.records.iter()
    }

    pub fn device_ids(&self) -> Vec<&str> {
        let mut ids: Vec<&str> = Vec::new();
        for record in &self.records {
            if ids.last() != Some(&record.device_id.as_str()) {
                ids.push(record.device_id.as_str());
            }
        }
        ids
    }

    pub fn records_for<'a>(
        &'a self,
        device_id: &'a str,
    ) -> impl Iterator<Item = &'a ResampledRecord> + 'a {
        self.records
            .iter()
            .filter(move |record| record.device_id == device_id)
    }
}

/// Per-device outcome of a resampling pass.
#[derive(Debug, Clone)]
pub struct DeviceResult {
    pub device_id: String,
    pub row_count: usize,
    pub outcome: Result<Vec<ResampledRecord>, DeviceResampleError>,
}

/// Resamples each group onto `grid`. A failing device is reported in its own result and
/// never stops the remaining devices.
pub fn resample_groups(
    groups: Vec<DeviceGroup>,
    grid: &TimeGrid,
    payload_width: usize,
) -> Vec<DeviceResult> {
    groups
        .into_iter()
        .map(|group| {
            let outcome = resample_device(&group, grid, payload_width);
            if let Err(err) = &outcome {
                warn!(
                    device_id = %group.device_id,
                    rows = group.len(),
                    reason = %err,
                    "skipping device"
                );
            }
            DeviceResult {
                row_count: group.len(),
                device_id: group.device_id,
                outcome,
            }
        })
        .collect()
}

/// Projects one device onto the grid by nearest-timestamp matching against its own records.
pub fn resample_device(
    group: &DeviceGroup,
    grid: &TimeGrid,
    payload_width: usize,
) -> Result<Vec<ResampledRecord>, DeviceResampleError> {
    let timestamps = validated_timestamps(group, payload_width)?;
    let matches = nearest_indices(&timestamps, grid.points());

    Ok(grid
        .iter()
        .zip(matches)
        .map(|(point, idx)| ResampledRecord {
            timestamp: *point,
            device_id: group.device_id.clone(),
            payload: group.records[idx].payload.clone(),
            source_timestamp: timestamps[idx],
        })
        .collect())
}

/// Checks that a group can be matched against and returns its timestamps in record order.
pub fn validated_timestamps(
    group: &DeviceGroup,
    payload_width: usize,
) -> Result<Vec<NaiveDateTime>, DeviceResampleError> {
    if group.records.is_empty() {
        return Err(DeviceResampleError::EmptyGroup);
    }

    let timestamps: Vec<NaiveDateTime> =
        group.records.iter().filter_map(|record| record.timestamp).collect();
    let missing = group.len() - timestamps.len();
    if missing > 0 {
        return Err(DeviceResampleError::MissingTimestamp { count: missing });
    }

    for (index, pair) in timestamps.windows(2).enumerate() {
        if pair[1] <= pair[0] {
            return Err(DeviceResampleError::NonMonotonic {
                index: index + 1,
                previous: pair[0],
                current: pair[1],
            });
        }
    }

    if let Some((index, record)) = group
        .records
        .iter()
        .enumerate()
        .find(|(_, record)| record.payload.len() != payload_width)
    {
        return Err(DeviceResampleError::PayloadWidth {
            index,
            expected: payload_width,
            found: record.payload.len(),
        });
    }

    Ok(timestamps)
}

/// For each target, the index of the closest timestamp. Equidistant neighbours resolve to the
/// earlier one; targets outside the covered range resolve to the nearest end.
///
/// `timestamps` must be non-empty and strictly increasing; `targets` must be ascending.
pub fn nearest_indices(timestamps: &[NaiveDateTime], targets: &[NaiveDateTime]) -> Vec<usize> {
    if timestamps.is_empty() {
        return Vec::new();
    }

    let mut cursor = 0usize;
    targets
        .iter()
        .map(|target| {
            while cursor + 1 < timestamps.len() && timestamps[cursor + 1] <= *target {
                cursor += 1;
            }
            let left = timestamps[cursor];
            if left >= *target {
                return cursor;
            }
            match timestamps.get(cursor + 1) {
                Some(right) if *right - *target < *target - left => cursor + 1,
                _ => cursor,
            }
        })
        .collect()
}
