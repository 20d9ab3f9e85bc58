pub mod errors;
pub mod formats;
pub mod model;
mod registry;

pub use errors::{ParserError, Rejection, Rejections};
pub use formats::{ColumnNames, DelimitedParser};
pub use model::{Dataset, Record, Schema};
pub use registry::{parse_sensor_file, parse_with_parsers, DatasetParser};
