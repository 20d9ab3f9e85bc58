use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};

/// Header layout of a sensor table.
///
/// The timestamp and device columns are the only required fields; every other column is an
/// opaque payload column carried through unchanged. `device_position` is the index the device
/// column occupied among the non-timestamp columns so that output tables can restore it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Schema {
    pub timestamp_column: String,
    pub device_column: String,
    pub payload_columns: Vec<String>,
    pub device_position: usize,
}

impl Schema {
    pub fn new(
        timestamp_column: impl Into<String>,
        device_column: impl Into<String>,
        payload_columns: Vec<String>,
    ) -> Self {
        Self {
            timestamp_column: timestamp_column.into(),
            device_column: device_column.into(),
            payload_columns,
            device_position: 0,
        }
    }

    pub fn with_device_position(mut self, position: usize) -> Self {
        self.device_position = position.min(self.payload_columns.len());
        self
    }

    pub fn payload_width(&self) -> usize {
        self.payload_columns.len()
    }

    /// Column names in output order: timestamp first, then the remaining input columns in their
    /// original order.
    pub fn output_columns(&self) -> Vec<&str> {
        let mut columns = Vec::with_capacity(self.payload_columns.len() + 2);
        columns.push(self.timestamp_column.as_str());
        columns.extend(self.arrange(
            self.device_column.as_str(),
            self.payload_columns.iter().map(String::as_str),
        ));
        columns
    }

    /// Interleaves a device value with payload values the way the input header laid them out.
    pub fn arrange<'a, I>(&self, device: &'a str, payload: I) -> Vec<&'a str>
    where
        I: IntoIterator<Item = &'a str>,
    {
        let mut values: Vec<&'a str> = payload.into_iter().collect();
        let position = self.device_position.min(values.len());
        values.insert(position, device);
        values
    }
}

/// One reading. `timestamp` is `None` when the row's timestamp cell was blank; such a record
/// still belongs to its device so the failure stays confined there.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Record {
    pub timestamp: Option<NaiveDateTime>,
    pub device_id: String,
    pub payload: Vec<String>,
}

impl Record {
    pub fn new(
        timestamp: NaiveDateTime,
        device_id: impl Into<String>,
        payload: Vec<String>,
    ) -> Self {
        Self {
            timestamp: Some(timestamp),
            device_id: device_id.into(),
            payload,
        }
    }

    pub fn untimed(device_id: impl Into<String>, payload: Vec<String>) -> Self {
        Self {
            timestamp: None,
            device_id: device_id.into(),
            payload,
        }
    }
}

/// Every record of one input file, in input order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Dataset {
    pub schema: Schema,
    pub records: Vec<Record>,
    /// Timestamps of rows dropped for having no device id. They belong to no device but still
    /// widen the grid bounds.
    #[serde(default)]
    pub orphan_timestamps: Vec<NaiveDateTime>,
}

impl Dataset {
    pub fn new(schema: Schema, records: Vec<Record>) -> Self {
        Self {
            schema,
            records,
            orphan_timestamps: Vec::new(),
        }
    }

    pub fn with_orphan_timestamps(mut self, timestamps: Vec<NaiveDateTime>) -> Self {
        self.orphan_timestamps = timestamps;
        self
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Record> {
        self.records.iter()
    }

    /// Earliest and latest known timestamp across records and orphaned rows.
    pub fn timestamp_bounds(&self) -> Option<(NaiveDateTime, NaiveDateTime)> {
        let mut iter = self
            .records
            .iter()
            .filter_map(|record| record.timestamp)
            .chain(self.orphan_timestamps.iter().copied());
        let first = iter.next()?;
        Some(iter.fold((first, first), |(min, max), ts| (min.min(ts), max.max(ts))))
    }
}
