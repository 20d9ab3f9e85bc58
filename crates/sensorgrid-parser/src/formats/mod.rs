mod common;
mod delimited;
pub(crate) mod schema;

pub use delimited::DelimitedParser;
pub use schema::{ColumnNames, DEFAULT_DEVICE_ALIASES, DEFAULT_TIMESTAMP_ALIASES};

pub(crate) use common::{parse_device_id, parse_timestamp, strip_bom};
pub(crate) use schema::{resolve_header, HeaderLayout, HeaderProblem};
