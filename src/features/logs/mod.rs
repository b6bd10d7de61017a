mod collector;
mod models;

pub use collector::{log_samples, LogFileCollector, LOG_ENTRY};
pub use models::{LogEntry, DEFAULT_LEVEL};
