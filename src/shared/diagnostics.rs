//! Injected event reporting for the collection pipeline.
//!
//! The scheduler and collector never log through ambient state; they receive a
//! `Diagnostics` handle at construction. Production wiring forwards to the `log`
//! facade, tests capture events in memory.

use log::Level;
use parking_lot::Mutex;

pub const AGENT_TARGET: &str = "hostpulse::agent";

pub trait Diagnostics: Send + Sync {
    fn record(&self, level: Level, message: &str);

    fn debug(&self, message: &str) {
        self.record(Level::Debug, message);
    }

    fn info(&self, message: &str) {
        self.record(Level::Info, message);
    }

    fn warn(&self, message: &str) {
        self.record(Level::Warn, message);
    }

    fn error(&self, message: &str) {
        self.record(Level::Error, message);
    }
}

/// Forwards every event to the `log` facade.
#[derive(Debug, Clone)]
pub struct LogDiagnostics {
    target: &'static str,
}

impl LogDiagnostics {
    pub fn new(target: &'static str) -> Self {
        Self { target }
    }
}

impl Default for LogDiagnostics {
    fn default() -> Self {
        Self::new(AGENT_TARGET)
    }
}

impl Diagnostics for LogDiagnostics {
    fn record(&self, level: Level, message: &str) {
        log::log!(target: self.target, level, "{}", message);
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DiagnosticEvent {
    pub level: Level,
    pub message: String,
}

/// Keeps every event in memory, in emission order.
#[derive(Debug, Default)]
pub struct MemoryDiagnostics {
    events: Mutex<Vec<DiagnosticEvent>>,
}

impl MemoryDiagnostics {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn events(&self) -> Vec<DiagnosticEvent> {
        self.events.lock().clone()
    }

    pub fn messages_at(&self, level: Level) -> Vec<String> {
        self.events
            .lock()
            .iter()
            .filter(|event| event.level == level)
            .map(|event| event.message.clone())
            .collect()
    }

    pub fn contains(&self, needle: &str) -> bool {
        self.events
            .lock()
            .iter()
            .any(|event| event.message.contains(needle))
    }
}

impl Diagnostics for MemoryDiagnostics {
    fn record(&self, level: Level, message: &str) {
        self.events.lock().push(DiagnosticEvent {
            level,
            message: message.to_string(),
        });
    }
}
