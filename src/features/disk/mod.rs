mod collector;
mod models;

pub use collector::{disk_samples, DISK_USAGE};
pub use models::PartitionInfo;
