mod sysinfo_source;

pub use sysinfo_source::SysinfoSource;

use crate::features::disk::PartitionInfo;
use crate::features::network::InterfaceCounters;
use crate::features::system_metrics::MemoryReading;
use crate::shared::error::CollectionError;
use std::time::Duration;

/// Raw host counters. Every call performs a fresh read; implementations keep
/// no state between calls.
pub trait HostSource: Send + Sync {
    /// Per-core utilization in percent, measured over `window`.
    fn cpu_usage(&self, window: Duration) -> Result<Vec<f32>, CollectionError>;

    fn memory(&self) -> Result<MemoryReading, CollectionError>;

    /// Cumulative byte counters per interface since boot.
    fn network_interfaces(&self) -> Result<Vec<InterfaceCounters>, CollectionError>;

    fn partitions(&self) -> Result<Vec<PartitionInfo>, CollectionError>;

    /// Bytes used on one mounted partition.
    fn partition_usage(&self, partition: &PartitionInfo) -> Result<u64, CollectionError>;
}
