use chrono::{NaiveDateTime, TimeDelta, Timelike};
use sensorgrid_parser::Dataset;
use tracing::info;

use crate::error::ResampleError;

const MICROS_PER_SECOND: f64 = 1_000_000.0;

/// Target timestamps shared by every device.
///
/// Points run from `start` in steps of `1/frequency` seconds and stop strictly before `end`;
/// a point landing exactly on `end` is never included.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TimeGrid {
    start: NaiveDateTime,
    end: NaiveDateTime,
    step_micros: i64,
    points: Vec<NaiveDateTime>,
}

impl TimeGrid {
    /// Builds the grid over `[floor(min), ceil(max))`, both bounds rounded to whole seconds.
    pub fn spanning(
        min: NaiveDateTime,
        max: NaiveDateTime,
        frequency: f64,
    ) -> Result<Self, ResampleError> {
        let step_micros = step_micros_for(frequency)?;
        let start = floor_to_second(min);
        let end = ceil_to_second(max);

        let mut points = Vec::new();
        let mut k: i64 = 0;
        loop {
            let point = start + TimeDelta::microseconds(step_micros * k);
            if point >= end {
                break;
            }
            points.push(point);
            k += 1;
        }

        Ok(Self {
            start,
            end,
            step_micros,
            points,
        })
    }

    pub fn start(&self) -> NaiveDateTime {
        self.start
    }

    pub fn end(&self) -> NaiveDateTime {
        self.end
    }

    pub fn step(&self) -> TimeDelta {
        TimeDelta::microseconds(self.step_micros)
    }

    pub fn step_micros(&self) -> i64 {
        self.step_micros
    }

    pub fn points(&self) -> &[NaiveDateTime] {
        &self.points
    }

    pub fn len(&self) -> usize {
        self.points.len()
    }

    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, NaiveDateTime> {
        self.points.iter()
    }
}

/// Computes the global grid for a deduplicated dataset.
pub fn build_grid(dataset: &Dataset, frequency: f64) -> Result<TimeGrid, ResampleError> {
    validate_frequency(frequency)?;
    let (min, max) = dataset
        .timestamp_bounds()
        .ok_or(ResampleError::EmptyDataset)?;

    let grid = TimeGrid::spanning(min, max, frequency)?;
    info!(
        global_min = %grid.start(),
        global_max = %grid.end(),
        step_micros = grid.step_micros(),
        points = grid.len(),
        "computed resampling grid"
    );
    Ok(grid)
}

pub fn validate_frequency(frequency: f64) -> Result<(), ResampleError> {
    step_micros_for(frequency).map(|_| ())
}

// Step is kept at microsecond resolution; anything that rounds to zero is unusable.
fn step_micros_for(frequency: f64) -> Result<i64, ResampleError> {
    if !frequency.is_finite() || frequency <= 0.0 {
        return Err(ResampleError::InvalidFrequency { frequency });
    }
    let micros = (MICROS_PER_SECOND / frequency).round();
    if micros < 1.0 {
        return Err(ResampleError::InvalidFrequency { frequency });
    }
    Ok(micros as i64)
}

pub fn floor_to_second(ts: NaiveDateTime) -> NaiveDateTime {
    ts.with_nanosecond(0).unwrap_or(ts)
}

pub fn ceil_to_second(ts: NaiveDateTime) -> NaiveDateTime {
    let floored = floor_to_second(ts);
    if floored == ts {
        ts
    } else {
        floored + TimeDelta::seconds(1)
    }
}
