use crate::shared::error::{CloseError, WriteError};
use crate::shared::sample::Sample;
use crate::shared::traits::Sink;
use async_trait::async_trait;
use log::debug;
use parking_lot::Mutex;
use std::collections::{HashMap, VecDeque};
use std::sync::Arc;

/// Failure to inject on a write call.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MockFailure {
    Unavailable,
    Rejected,
}

impl MockFailure {
    fn to_error(self, call: usize) -> WriteError {
        match self {
            MockFailure::Unavailable => {
                WriteError::BackendUnavailable(format!("simulated outage on write {call}"))
            }
            MockFailure::Rejected => {
                WriteError::RejectedSample(format!("simulated rejection on write {call}"))
            }
        }
    }
}

#[derive(Debug, Default)]
struct MockState {
    batches: VecDeque<Vec<Sample>>,
    /// Oldest batches are evicted beyond this many.
    capacity: Option<usize>,
    accepted: usize,
    write_calls: usize,
    close_calls: usize,
    closed: bool,
    scheduled: HashMap<usize, MockFailure>,
    always: Option<MockFailure>,
}

/// In-memory sink that records the batches it accepts.
///
/// Used as the `mock` backend for dry runs (with a bounded history) and as the
/// capturing double in tests. The sink itself moves into the scheduler; keep a `MockHandle` to
/// inspect what it received.
#[derive(Debug)]
pub struct MockStorage {
    name: String,
    state: Arc<Mutex<MockState>>,
}

/// Shared view of a `MockStorage`.
#[derive(Debug, Clone)]
pub struct MockHandle {
    state: Arc<Mutex<MockState>>,
}

impl MockStorage {
    pub fn new() -> Self {
        Self::named("mock")
    }

    pub fn named(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            state: Arc::new(Mutex::new(MockState::default())),
        }
    }

    /// Keeps only the `capacity` most recent batches.
    pub fn with_capacity(capacity: usize) -> Self {
        let storage = Self::new();
        storage.state.lock().capacity = Some(capacity);
        storage
    }

    pub fn handle(&self) -> MockHandle {
        MockHandle {
            state: Arc::clone(&self.state),
        }
    }
}

impl Default for MockStorage {
    fn default() -> Self {
        Self::new()
    }
}

impl MockHandle {
    /// Fails the `call`-th write (1-based).
    pub fn fail_write(&self, call: usize, failure: MockFailure) {
        self.state.lock().scheduled.insert(call, failure);
    }

    pub fn fail_every_write(&self, failure: MockFailure) {
        self.state.lock().always = Some(failure);
    }

    pub fn batches(&self) -> Vec<Vec<Sample>> {
        self.state.lock().batches.iter().cloned().collect()
    }

    /// Successful writes, including batches already evicted.
    pub fn accepted(&self) -> usize {
        self.state.lock().accepted
    }

    pub fn write_calls(&self) -> usize {
        self.state.lock().write_calls
    }

    pub fn close_calls(&self) -> usize {
        self.state.lock().close_calls
    }

    pub fn is_closed(&self) -> bool {
        self.state.lock().closed
    }
}

#[async_trait]
impl Sink for MockStorage {
    async fn write(&mut self, batch: &[Sample]) -> Result<(), WriteError> {
        let mut state = self.state.lock();
        state.write_calls += 1;
        let call = state.write_calls;

        if state.closed {
            return Err(WriteError::BackendUnavailable(format!("{} is closed", self.name)));
        }
        if let Some(failure) = state.scheduled.get(&call).copied().or(state.always) {
            return Err(failure.to_error(call));
        }

        state.accepted += 1;
        if state.capacity == Some(0) {
            return Ok(());
        }
        if state.capacity.is_some_and(|capacity| state.batches.len() >= capacity) {
            state.batches.pop_front();
        }
        state.batches.push_back(batch.to_vec());
        debug!("{} recorded batch {} with {} samples", self.name, state.accepted, batch.len());
        Ok(())
    }

    async fn close(&mut self) -> Result<(), CloseError> {
        let mut state = self.state.lock();
        state.close_calls += 1;
        if state.closed {
            return Err(CloseError::AlreadyClosed(self.name.clone()));
        }
        state.closed = true;
        Ok(())
    }

    fn name(&self) -> &str {
        &self.name
    }
}
