use chrono::NaiveDateTime;
use csv::{ReaderBuilder, StringRecord};
use tracing::warn;

use crate::errors::ParserError;
use crate::formats::{
    parse_device_id, parse_timestamp, resolve_header, strip_bom, ColumnNames, HeaderLayout,
    HeaderProblem,
};
use crate::model::{Dataset, Record, Schema};
use crate::registry::DatasetParser;

/// Header-first delimited text, one reading per row.
///
/// Rows are read flexibly: a row whose payload width disagrees with the header is kept as-is
/// and left for the resampler to reject for its device alone. The same holds for a blank
/// timestamp cell. Rows with a blank device id are dropped.
#[derive(Debug, Clone, Copy)]
pub struct DelimitedParser {
    name: &'static str,
    delimiter: u8,
}

impl DelimitedParser {
    pub const COMMA: DelimitedParser = DelimitedParser::new("csv_comma", b',');
    pub const SEMICOLON: DelimitedParser = DelimitedParser::new("csv_semicolon", b';');
    pub const TAB: DelimitedParser = DelimitedParser::new("tsv", b'\t');

    /// Layouts tried by [`crate::parse_sensor_file`], in order.
    pub const BUILT_IN: [DelimitedParser; 3] = [Self::COMMA, Self::SEMICOLON, Self::TAB];

    pub const fn new(name: &'static str, delimiter: u8) -> Self {
        Self { name, delimiter }
    }

    fn read_error(&self, source: csv::Error) -> ParserError {
        ParserError::Read {
            parser: self.name,
            source,
        }
    }

    fn layout(
        &self,
        header: &StringRecord,
        columns: &ColumnNames,
    ) -> Result<HeaderLayout, ParserError> {
        let fields: Vec<&str> = header.iter().collect();
        resolve_header(&fields, columns).map_err(|problem| match problem {
            HeaderProblem::Missing(reason) => ParserError::UnrecognisedHeader {
                parser: self.name,
                reason,
            },
            HeaderProblem::Ambiguous(message) => ParserError::AmbiguousHeader {
                parser: self.name,
                message,
            },
        })
    }

    fn parse_row(
        &self,
        layout: &HeaderLayout,
        row: &StringRecord,
        line: usize,
    ) -> Result<Row, ParserError> {
        let timestamp = parse_timestamp(self.name, row.get(layout.timestamp_index), line)?;
        let Some(device_id) = parse_device_id(row.get(layout.device_index)) else {
            return Ok(Row::Orphan(timestamp));
        };
        let payload = row
            .iter()
            .enumerate()
            .filter(|(idx, _)| layout.is_payload(*idx))
            .map(|(_, value)| value.to_string())
            .collect();

        Ok(Row::Record(Record {
            timestamp,
            device_id,
            payload,
        }))
    }
}

enum Row {
    Record(Record),
    /// No device id; only the timestamp, if any, is kept.
    Orphan(Option<NaiveDateTime>),
}

impl DatasetParser for DelimitedParser {
    fn name(&self) -> &'static str {
        self.name
    }

    fn parse(&self, content: &str, columns: &ColumnNames) -> Result<Dataset, ParserError> {
        let content = strip_bom(content);
        let mut reader = ReaderBuilder::new()
            .delimiter(self.delimiter)
            .has_headers(false)
            .flexible(true)
            .from_reader(content.as_bytes());

        let mut rows = reader.records();
        let header = match rows.next() {
            Some(header) => header.map_err(|err| self.read_error(err))?,
            None => {
                return Err(ParserError::UnrecognisedHeader {
                    parser: self.name,
                    reason: "header row (file is empty)".to_string(),
                })
            }
        };
        let layout = self.layout(&header, columns)?;

        let mut records = Vec::new();
        let mut orphan_timestamps = Vec::new();
        let mut orphan_rows = 0usize;
        for (idx, row) in rows.enumerate() {
            let row = row.map_err(|err| self.read_error(err))?;
            let line = row
                .position()
                .map(|pos| pos.line() as usize)
                .unwrap_or(idx + 2);
            match self.parse_row(&layout, &row, line)? {
                Row::Record(record) => records.push(record),
                Row::Orphan(timestamp) => {
                    orphan_rows += 1;
                    orphan_timestamps.extend(timestamp);
                }
            }
        }

        if orphan_rows > 0 {
            warn!(
                parser = self.name,
                rows = orphan_rows,
                column = %layout.device_column,
                "dropped rows without a device id"
            );
        }

        let schema = Schema::new(
            layout.timestamp_column.clone(),
            layout.device_column.clone(),
            layout.payload_columns.clone(),
        )
        .with_device_position(layout.device_position);

        Ok(Dataset::new(schema, records).with_orphan_timestamps(orphan_timestamps))
    }
}
