mod collector;
mod models;

pub use collector::{network_samples, NETWORK_BYTES_RECV, NETWORK_BYTES_SENT};
pub use models::InterfaceCounters;
