mod collector;
mod models;

pub use collector::{cpu_samples, memory_samples, CPU_USAGE, MEMORY_TOTAL, MEMORY_USAGE};
pub use models::MemoryReading;
