use async_trait::async_trait;
use crate::shared::error::{CloseError, CollectError, WriteError};
use crate::shared::sample::Sample;

#[async_trait]
pub trait AsyncDataCollector<T: Send> {
    /// Performs a fresh read of host state.
    async fn collect(&mut self) -> Result<T, CollectError>;
    async fn validate(&self) -> Result<(), CollectError>;
    async fn health_check(&self) -> bool;
}

/// Storage backend accepting batches of samples.
///
/// Implementations must not retry internally; a failed `write` is reported for
/// the whole batch and the caller decides what happens next.
#[async_trait]
pub trait Sink: Send {
    async fn write(&mut self, batch: &[Sample]) -> Result<(), WriteError>;

    /// Releases connections and handles. A second call may return an error but
    /// must not panic.
    async fn close(&mut self) -> Result<(), CloseError>;

    /// Stable identifier for log correlation.
    fn name(&self) -> &str;
}

pub trait Validatable {
    fn validate(&self) -> Result<(), String>;
    fn is_valid(&self) -> bool {
        self.validate().is_ok()
    }
}
