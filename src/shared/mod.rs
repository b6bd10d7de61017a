pub mod collector;
pub mod config;
pub mod diagnostics;
pub mod error;
pub mod sample;
pub mod scheduler;
pub mod storage;
pub mod traits;

pub use error::*;
pub use traits::*;
