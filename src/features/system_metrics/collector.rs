use crate::features::system_metrics::models::MemoryReading;
use crate::shared::error::CollectError;
use crate::shared::sample::Sample;
use chrono::{DateTime, Utc};

pub const CPU_USAGE: &str = "cpu_usage";
pub const MEMORY_USAGE: &str = "memory_usage";
pub const MEMORY_TOTAL: &str = "memory_total";

/// One `cpu_usage` sample per logical core, tagged `core=cpu<index>`.
pub fn cpu_samples(per_core: &[f32], timestamp: DateTime<Utc>) -> Result<Vec<Sample>, CollectError> {
    if per_core.is_empty() {
        return Err(CollectError::NoCpus);
    }

    per_core
        .iter()
        .enumerate()
        .map(|(index, usage)| {
            Sample::builder(CPU_USAGE)
                .timestamp(timestamp)
                .value(clamp_percent(*usage))
                .tag("core", format!("cpu{index}"))
                .build()
                .map_err(CollectError::from)
        })
        .collect()
}

pub fn memory_samples(reading: &MemoryReading, timestamp: DateTime<Utc>) -> Result<Vec<Sample>, CollectError> {
    let used = Sample::builder(MEMORY_USAGE)
        .timestamp(timestamp)
        .value(reading.used_bytes as f64)
        .tag("type", "used")
        .build()?;
    let total = Sample::builder(MEMORY_TOTAL)
        .timestamp(timestamp)
        .value(reading.total_bytes as f64)
        .build()?;

    Ok(vec![used, total])
}

// sysinfo can briefly report slightly above 100 right after a core comes online.
fn clamp_percent(usage: f32) -> f64 {
    if usage.is_nan() {
        0.0
    } else {
        f64::from(usage).clamp(0.0, 100.0)
    }
}
