mod collector;

pub use collector::{HostCollector, DEFAULT_CPU_WINDOW};
