use std::collections::HashMap;

use sensorgrid_parser::Record;

/// All records of one device, ascending by timestamp. Records without a timestamp sort first.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeviceGroup {
    pub device_id: String,
    pub records: Vec<Record>,
}

impl DeviceGroup {
    /// Sorts `records` by timestamp. The sort is stable, so equal timestamps keep input order.
    pub fn new(device_id: impl Into<String>, mut records: Vec<Record>) -> Self {
        records.sort_by_key(|record| record.timestamp);
        Self {
            device_id: device_id.into(),
            records,
        }
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}

/// Groups records by device, devices ordered by first appearance.
pub fn group_by_device(records: Vec<Record>) -> Vec<DeviceGroup> {
    let mut order: Vec<String> = Vec::new();
    let mut buckets: HashMap<String, Vec<Record>> = HashMap::new();

    for record in records {
        match buckets.get_mut(&record.device_id) {
            Some(bucket) => bucket.push(record),
            None => {
                order.push(record.device_id.clone());
                buckets.insert(record.device_id.clone(), vec![record]);
            }
        }
    }

    order
        .into_iter()
        .map(|device_id| {
            let records = buckets.remove(&device_id).unwrap_or_default();
            DeviceGroup::new(device_id, records)
        })
        .collect()
}
