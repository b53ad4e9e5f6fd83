use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Placeholder for a real data packet. Carries nothing anyone reads.
///
/// The padding keeps the value at 16 bytes so that boxing it is a real heap
/// allocation; a zero-sized marker would never reach the allocator.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DataPacket {
    _padding: [u64; 2],
}

impl DataPacket {
    pub fn new() -> Self {
        Self::default()
    }
}

/// Records created by one cycle. Owned by that cycle only.
pub type Batch = Vec<Box<DataPacket>>;

/// One gathered metric point, flattened out of the registry's protobuf families.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MetricSample {
    pub name: String,
    pub kind: String,
    pub labels: BTreeMap<String, String>,
    pub value: f64,
}

/// Everything an exporter needs for a single export round.
#[derive(Debug, Clone)]
pub struct MetricsSnapshot {
    pub taken_at: DateTime<Utc>,
    pub samples: Vec<MetricSample>,
    /// Prometheus text exposition of the same gather.
    pub exposition: Vec<u8>,
    pub content_type: String,
}

impl MetricsSnapshot {
    pub fn find<'a>(&'a self, name: &'a str) -> impl Iterator<Item = &'a MetricSample> + 'a {
        self.samples.iter().filter(move |s| s.name == name)
    }
}
