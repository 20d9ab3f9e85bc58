use std::collections::HashSet;

use chrono::NaiveDateTime;
use sensorgrid_parser::Dataset;
use tracing::debug;

/// Drops every record whose `(timestamp, device_id)` pair was already seen, keeping the first
/// occurrence. Surviving records keep their relative input order. Records without a timestamp
/// have no key and are always kept.
pub fn deduplicate(dataset: Dataset) -> Dataset {
    let Dataset {
        schema,
        records,
        orphan_timestamps,
    } = dataset;
    let input_rows = records.len();

    let mut seen: HashSet<(NaiveDateTime, String)> = HashSet::with_capacity(input_rows);
    let records: Vec<_> = records
        .into_iter()
        .filter(|record| match record.timestamp {
            Some(timestamp) => seen.insert((timestamp, record.device_id.clone())),
            None => true,
        })
        .collect();

    debug!(
        input_rows,
        kept = records.len(),
        dropped = input_rows - records.len(),
        "deduplicated records"
    );

    Dataset::new(schema, records).with_orphan_timestamps(orphan_timestamps)
}
