use serde::{Deserialize, Serialize};

/// A mounted partition as listed by the host, with the space counters seen at
/// listing time.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PartitionInfo {
    pub mountpoint: String,
    pub fstype: String,
    pub total_space: u64,
    pub available_space: u64,
}

impl PartitionInfo {
    /// `None` when the counters contradict each other.
    pub fn used_from_snapshot(&self) -> Option<u64> {
        self.total_space.checked_sub(self.available_space)
    }
}
