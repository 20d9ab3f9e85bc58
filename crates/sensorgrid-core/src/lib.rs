pub mod dedup;
pub mod error;
pub mod grid;
pub mod group;
pub mod outputs;
pub mod pipeline;
pub mod resample;

pub use error::{DeviceResampleError, OutputError, ResampleError};
pub use grid::TimeGrid;
pub use group::DeviceGroup;
pub use outputs::{CsvOptions, OutputFormat};
pub use pipeline::{resample, DeviceFailure, FailedDevice, ResampleOutcome, RunSummary};
pub use resample::{OutputTable, ResampledRecord};
