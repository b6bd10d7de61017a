pub mod disk;
pub mod host;
pub mod logs;
pub mod network;
pub mod system_metrics;
