use crate::shared::error::ConfigError;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

pub const DEFAULT_STORAGE: &str = "prometheus";
pub const DEFAULT_PUSHGATEWAY_ADDRESS: &str = "http://localhost:9091";
pub const DEFAULT_ELASTICSEARCH_ADDRESS: &str = "http://localhost:9200";

/// Fully resolved agent settings. Built from defaults, an optional YAML file and
/// command-line overrides, in that order.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AgentConfig {
    pub storage: StorageSettings,
    #[serde(with = "duration_text")]
    pub interval: Duration,
    #[serde(with = "duration_text")]
    pub cpu_window: Duration,
    /// Immediate re-sends of a batch after `BackendUnavailable`, within one tick.
    pub write_retries: u32,
    /// How long an in-flight tick may run after shutdown is requested.
    #[serde(with = "duration_text")]
    pub shutdown_grace: Duration,
    pub max_ticks: Option<u64>,
    pub log_level: String,
    /// Application log whose new lines are sent as `log_entry` samples.
    pub log_file: Option<PathBuf>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct StorageSettings {
    pub backend: String,
    /// Left empty to use the backend's default address.
    pub address: String,
    pub prometheus_job: String,
    pub elasticsearch_index: String,
    #[serde(with = "duration_text")]
    pub request_timeout: Duration,
}

impl Default for AgentConfig {
    fn default() -> Self {
        Self {
            storage: StorageSettings::default(),
            interval: Duration::from_secs(15),
            cpu_window: Duration::from_secs(1),
            write_retries: 0,
            shutdown_grace: Duration::from_secs(5),
            max_ticks: None,
            log_level: String::from("info"),
            log_file: None,
        }
    }
}

impl Default for StorageSettings {
    fn default() -> Self {
        Self {
            backend: String::from(DEFAULT_STORAGE),
            address: String::new(),
            prometheus_job: String::from("hostpulse"),
            elasticsearch_index: String::from("host_metrics"),
            request_timeout: Duration::from_secs(10),
        }
    }
}

impl StorageSettings {
    /// Configured address, or the selected backend's well-known default.
    pub fn endpoint(&self) -> &str {
        if !self.address.trim().is_empty() {
            return &self.address;
        }
        match self.backend.as_str() {
            "prometheus" => DEFAULT_PUSHGATEWAY_ADDRESS,
            "elasticsearch" => DEFAULT_ELASTICSEARCH_ADDRESS,
            _ => "",
        }
    }
}

impl AgentConfig {
    pub fn from_yaml_str(content: &str) -> Result<Self, ConfigError> {
        let config: AgentConfig = serde_yaml::from_str(content)?;
        Ok(config)
    }

    pub fn from_yaml_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let content = fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_yaml_str(&content)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.interval.is_zero() {
            return Err(ConfigError::Invalid("interval must be greater than zero".into()));
        }
        if self.cpu_window >= self.interval {
            return Err(ConfigError::Invalid(format!(
                "cpu window ({}) must be shorter than the interval ({})",
                format_duration(self.cpu_window),
                format_duration(self.interval)
            )));
        }
        if self.storage.backend.trim().is_empty() {
            return Err(ConfigError::Invalid("storage backend must not be empty".into()));
        }
        if self.max_ticks == Some(0) {
            return Err(ConfigError::Invalid("max ticks must be at least 1".into()));
        }
        Ok(())
    }
}

/// Parses `500ms`, `15s`, `2m`, `1h`, or a bare number of seconds.
pub fn parse_duration(text: &str) -> Result<Duration, ConfigError> {
    let s = text.trim();

    let (numeric, multiplier) = if let Some(rest) = s.strip_suffix("ms") {
        (rest, 1u64)
    } else if let Some(rest) = s.strip_suffix('s') {
        (rest, 1_000)
    } else if let Some(rest) = s.strip_suffix('m') {
        (rest, 60_000)
    } else if let Some(rest) = s.strip_suffix('h') {
        (rest, 3_600_000)
    } else {
        (s, 1_000)
    };

    let value: u64 = numeric
        .trim()
        .parse()
        .map_err(|_| ConfigError::InvalidDuration(text.to_string()))?;
    value
        .checked_mul(multiplier)
        .map(Duration::from_millis)
        .ok_or_else(|| ConfigError::InvalidDuration(text.to_string()))
}

pub fn format_duration(duration: Duration) -> String {
    let millis = duration.as_millis();
    if millis % 1_000 == 0 {
        format!("{}s", millis / 1_000)
    } else {
        format!("{millis}ms")
    }
}

mod duration_text {
    use super::{format_duration, parse_duration};
    use serde::{Deserialize, Deserializer, Serializer};
    use std::time::Duration;

    pub fn serialize<S: Serializer>(duration: &Duration, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&format_duration(*duration))
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Duration, D::Error> {
        let text = String::deserialize(deserializer)?;
        parse_duration(&text).map_err(serde::de::Error::custom)
    }
}
