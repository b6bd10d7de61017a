use std::fmt;
use std::io;
use std::path::PathBuf;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum AgentError {
    #[error("Configuration failed: {0}")]
    Config(#[from] ConfigError),

    #[error("Storage failed: {0}")]
    Storage(#[from] StorageError),
}

/// Failure reading one raw value from the host.
#[derive(Error, Debug)]
pub enum CollectionError {
    #[error("IO error: {0}")]
    Io(#[from] io::Error),

    #[error("Failed to parse data: {0}")]
    Parse(String),

    #[error("System API error: {0}")]
    SystemApi(String),
}

/// A mandatory subsystem could not be read; the whole tick's batch is lost.
#[derive(Error, Debug)]
pub enum CollectError {
    #[error("CPU usage unavailable: {0}")]
    Cpu(#[source] CollectionError),

    #[error("memory usage unavailable: {0}")]
    Memory(#[source] CollectionError),

    #[error("host reported no logical CPUs")]
    NoCpus,

    #[error("invalid sample: {0}")]
    InvalidSample(#[from] SampleError),

    #[error("collection task failed: {0}")]
    Task(String),

    #[error("log file unreadable: {0}")]
    LogFile(#[source] CollectionError),
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum SampleError {
    #[error("sample name must not be empty")]
    EmptyName,

    #[error("tag key must not be empty (sample {0})")]
    EmptyTagKey(String),
}

/// One optional subsystem or per-unit item that was dropped from a batch.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PartialCollectionWarning {
    pub subsystem: &'static str,
    pub unit: Option<String>,
    pub reason: String,
}

impl PartialCollectionWarning {
    pub fn subsystem(subsystem: &'static str, reason: impl fmt::Display) -> Self {
        Self {
            subsystem,
            unit: None,
            reason: reason.to_string(),
        }
    }

    pub fn unit(subsystem: &'static str, unit: impl Into<String>, reason: impl fmt::Display) -> Self {
        Self {
            subsystem,
            unit: Some(unit.into()),
            reason: reason.to_string(),
        }
    }
}

impl fmt::Display for PartialCollectionWarning {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.unit {
            Some(unit) => write!(f, "skipped {} {}: {}", self.subsystem, unit, self.reason),
            None => write!(f, "skipped {} samples: {}", self.subsystem, self.reason),
        }
    }
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum WriteError {
    #[error("backend unavailable: {0}")]
    BackendUnavailable(String),

    #[error("sample rejected: {0}")]
    RejectedSample(String),
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum CloseError {
    #[error("{0} is already closed")]
    AlreadyClosed(String),

    #[error("failed to release backend: {0}")]
    Backend(String),
}

/// A backend could not be constructed at startup.
#[derive(Error, Debug)]
pub enum StorageError {
    #[error("Unknown storage backend '{name}' (available: {available})")]
    UnknownBackend { name: String, available: String },

    #[error("Invalid backend address '{address}': {reason}")]
    InvalidAddress { address: String, reason: String },

    #[error("Connection setup failed: {0}")]
    Connection(String),
}

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Failed to read config {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("Failed to parse config: {0}")]
    Parse(#[from] serde_yaml::Error),

    #[error("Invalid duration '{0}' (expected e.g. 500ms, 15s, 2m, 1h)")]
    InvalidDuration(String),

    #[error("Invalid configuration: {0}")]
    Invalid(String),
}
