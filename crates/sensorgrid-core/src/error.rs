use chrono::NaiveDateTime;
use polars::error::PolarsError;
use thiserror::Error;

use crate::pipeline::DeviceFailure;

/// Run-level failures. Any of these aborts the whole resampling run.
#[derive(Debug, Error)]
pub enum ResampleError {
    #[error("dataset contains no records; cannot compute a time grid")]
    EmptyDataset,

    #[error("frequency must be a positive number of samples per second, got {frequency}")]
    InvalidFrequency { frequency: f64 },

    #[error("no device produced resampled output ({} device(s) failed)", .failures.len())]
    NoValidData { failures: Vec<DeviceFailure> },
}

/// Failure confined to a single device; the run continues without it.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum DeviceResampleError {
    #[error("device has no records")]
    EmptyGroup,

    #[error("{count} row(s) have no timestamp")]
    MissingTimestamp { count: usize },

    #[error("timestamps not strictly increasing at row {index}: {current} follows {previous}")]
    NonMonotonic {
        index: usize,
        previous: NaiveDateTime,
        current: NaiveDateTime,
    },

    #[error("row {index} carries {found} payload field(s), expected {expected}")]
    PayloadWidth {
        index: usize,
        expected: usize,
        found: usize,
    },
}

#[derive(Debug, Error)]
pub enum OutputError {
    #[error("CSV write failed: {0}")]
    Csv(#[from] csv::Error),

    #[error("Polars operation failed: {0}")]
    Polars(#[from] PolarsError),

    #[error("File I/O error: {0}")]
    Io(#[from] std::io::Error),
}
