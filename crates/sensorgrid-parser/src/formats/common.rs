use chrono::{DateTime, FixedOffset, NaiveDate, NaiveDateTime, NaiveTime};

use crate::errors::ParserError;

const BOM: char = '\u{feff}';

const NAIVE_FORMATS: &[&str] = &[
    "%Y-%m-%d %H:%M:%S%.f",
    "%Y-%m-%d %H:%M:%S",
    "%Y-%m-%dT%H:%M:%S%.f",
    "%Y-%m-%dT%H:%M:%S",
    "%Y/%m/%d %H:%M:%S%.f",
    "%Y/%m/%d %H:%M:%S",
    "%Y-%m-%d %H:%M",
];

pub(crate) fn strip_bom(content: &str) -> &str {
    content.strip_prefix(BOM).unwrap_or(content)
}

/// `Ok(None)` for a blank or absent cell. Values carrying a UTC offset are converted to UTC and
/// stored without the offset.
pub(crate) fn parse_timestamp(
    parser: &'static str,
    value: Option<&str>,
    line: usize,
) -> Result<Option<NaiveDateTime>, ParserError> {
    let trimmed = value.map(str::trim).unwrap_or_default();
    if trimmed.is_empty() {
        return Ok(None);
    }

    let naive = NAIVE_FORMATS
        .iter()
        .find_map(|fmt| NaiveDateTime::parse_from_str(trimmed, fmt).ok())
        .or_else(|| {
            NaiveDate::parse_from_str(trimmed, "%Y-%m-%d")
                .ok()
                .map(|date| date.and_time(NaiveTime::MIN))
        })
        .or_else(|| {
            trimmed
                .parse::<DateTime<FixedOffset>>()
                .ok()
                .map(|dt| dt.naive_utc())
        });

    match naive {
        Some(timestamp) => Ok(Some(timestamp)),
        None => Err(ParserError::InvalidTimestamp {
            parser,
            line,
            value: trimmed.to_string(),
        }),
    }
}

/// Trimmed device id, or `None` when the cell is blank or absent.
pub(crate) fn parse_device_id(value: Option<&str>) -> Option<String> {
    value
        .map(str::trim)
        .filter(|id| !id.is_empty())
        .map(str::to_string)
}
