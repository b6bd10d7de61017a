use crate::features::disk::models::PartitionInfo;
use crate::shared::collector::HostSource;
use crate::shared::error::PartialCollectionWarning;
use crate::shared::sample::Sample;
use chrono::{DateTime, Utc};

pub const DISK_USAGE: &str = "disk_usage";

/// One `disk_usage` sample per partition whose usage could be read.
///
/// Partitions that fail are reported as warnings and left out; they never fail
/// the batch.
pub fn disk_samples(
    source: &dyn HostSource,
    partitions: &[PartitionInfo],
    timestamp: DateTime<Utc>,
) -> (Vec<Sample>, Vec<PartialCollectionWarning>) {
    let mut samples = Vec::with_capacity(partitions.len());
    let mut warnings = Vec::new();

    for partition in partitions {
        let used = match source.partition_usage(partition) {
            Ok(used) => used,
            Err(e) => {
                warnings.push(PartialCollectionWarning::unit("disk", partition.mountpoint.as_str(), e));
                continue;
            }
        };

        let sample = Sample::builder(DISK_USAGE)
            .timestamp(timestamp)
            .value(used as f64)
            .tag("mountpoint", partition.mountpoint.as_str())
            .tag("fstype", partition.fstype.as_str())
            .build();

        match sample {
            Ok(sample) => samples.push(sample),
            Err(e) => warnings.push(PartialCollectionWarning::unit("disk", partition.mountpoint.as_str(), e)),
        }
    }

    (samples, warnings)
}
