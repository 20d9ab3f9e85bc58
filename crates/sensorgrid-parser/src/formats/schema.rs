use serde::{Deserialize, Serialize};

pub const DEFAULT_TIMESTAMP_ALIASES: [&str; 4] = ["时间戳", "timestamp", "time", "datetime"];
pub const DEFAULT_DEVICE_ALIASES: [&str; 4] = ["设备ID", "device_id", "device", "deviceid"];

/// Accepted header names for the two required columns.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ColumnNames {
    #[serde(default = "default_timestamp_aliases")]
    pub timestamp: Vec<String>,
    #[serde(default = "default_device_aliases")]
    pub device: Vec<String>,
}

impl Default for ColumnNames {
    fn default() -> Self {
        Self {
            timestamp: default_timestamp_aliases(),
            device: default_device_aliases(),
        }
    }
}

impl ColumnNames {
    pub fn new(timestamp: impl Into<String>, device: impl Into<String>) -> Self {
        Self {
            timestamp: vec![timestamp.into()],
            device: vec![device.into()],
        }
    }

    pub fn is_timestamp(&self, header: &str) -> bool {
        matches_any(&self.timestamp, header)
    }

    pub fn is_device(&self, header: &str) -> bool {
        matches_any(&self.device, header)
    }
}

fn default_timestamp_aliases() -> Vec<String> {
    DEFAULT_TIMESTAMP_ALIASES.iter().map(|s| s.to_string()).collect()
}

fn default_device_aliases() -> Vec<String> {
    DEFAULT_DEVICE_ALIASES.iter().map(|s| s.to_string()).collect()
}

fn matches_any(aliases: &[String], header: &str) -> bool {
    let header = header.trim();
    aliases
        .iter()
        .any(|alias| alias.trim().to_lowercase() == header.to_lowercase())
}

/// Positions of the required columns within one header row.
#[derive(Debug, Clone)]
pub(crate) struct HeaderLayout {
    pub timestamp_index: usize,
    pub device_index: usize,
    pub timestamp_column: String,
    pub device_column: String,
    pub payload_columns: Vec<String>,
    /// Index of the device column once the timestamp column is removed.
    pub device_position: usize,
}

impl HeaderLayout {
    pub fn is_payload(&self, index: usize) -> bool {
        index != self.timestamp_index && index != self.device_index
    }
}

pub(crate) enum HeaderProblem {
    Missing(String),
    Ambiguous(String),
}

pub(crate) fn resolve_header(
    header: &[&str],
    columns: &ColumnNames,
) -> Result<HeaderLayout, HeaderProblem> {
    let timestamp_index = find_single(
        header,
        |h| columns.is_timestamp(h),
        "timestamp",
        &columns.timestamp,
    )?;
    let device_index = find_single(header, |h| columns.is_device(h), "device", &columns.device)?;

    if timestamp_index == device_index {
        return Err(HeaderProblem::Ambiguous(format!(
            "column '{}' matches both the timestamp and device aliases",
            header[timestamp_index].trim()
        )));
    }

    let payload_columns = header
        .iter()
        .enumerate()
        .filter(|(idx, _)| *idx != timestamp_index && *idx != device_index)
        .map(|(_, name)| name.trim().to_string())
        .collect();

    let device_position = if device_index > timestamp_index {
        device_index - 1
    } else {
        device_index
    };

    Ok(HeaderLayout {
        timestamp_index,
        device_index,
        timestamp_column: header[timestamp_index].trim().to_string(),
        device_column: header[device_index].trim().to_string(),
        payload_columns,
        device_position,
    })
}

fn find_single<F>(
    header: &[&str],
    matches: F,
    role: &str,
    aliases: &[String],
) -> Result<usize, HeaderProblem>
where
    F: Fn(&str) -> bool,
{
    let hits: Vec<usize> = header
        .iter()
        .enumerate()
        .filter(|(_, name)| matches(name))
        .map(|(idx, _)| idx)
        .collect();

    match hits.as_slice() {
        [single] => Ok(*single),
        [] => Err(HeaderProblem::Missing(format!(
            "{role} column (expected one of {aliases:?})"
        ))),
        many => Err(HeaderProblem::Ambiguous(format!(
            "{} columns match the {role} aliases",
            many.len()
        ))),
    }
}
