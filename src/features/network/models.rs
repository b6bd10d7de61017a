use serde::{Deserialize, Serialize};

/// Cumulative byte counters of one interface since boot.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InterfaceCounters {
    pub name: String,
    pub bytes_sent: u64,
    pub bytes_recv: u64,
}
