use crate::shared::error::SampleError;
use crate::shared::traits::Validatable;
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::collections::HashMap;

/// One telemetry reading. Immutable once built.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Sample {
    name: String,
    timestamp: DateTime<Utc>,
    value: f64,
    tags: HashMap<String, String>,
}

/// The samples produced by one collection call, in production order.
pub type Batch = Vec<Sample>;

/// Current wall-clock time truncated to millisecond resolution.
pub fn capture_time() -> DateTime<Utc> {
    let now = Utc::now();
    DateTime::from_timestamp_millis(now.timestamp_millis()).unwrap_or(now)
}

impl Sample {
    pub fn builder(name: impl Into<String>) -> SampleBuilder {
        SampleBuilder::new(name)
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn timestamp(&self) -> DateTime<Utc> {
        self.timestamp
    }

    pub fn timestamp_millis(&self) -> i64 {
        self.timestamp.timestamp_millis()
    }

    pub fn value(&self) -> f64 {
        self.value
    }

    pub fn tags(&self) -> &HashMap<String, String> {
        &self.tags
    }

    pub fn tag(&self, key: &str) -> Option<&str> {
        self.tags.get(key).map(String::as_str)
    }
}

impl Validatable for Sample {
    fn validate(&self) -> Result<(), String> {
        if self.name.is_empty() {
            return Err(SampleError::EmptyName.to_string());
        }
        if self.tags.keys().any(|key| key.is_empty()) {
            return Err(SampleError::EmptyTagKey(self.name.clone()).to_string());
        }
        Ok(())
    }
}

pub struct SampleBuilder {
    name: String,
    timestamp: Option<DateTime<Utc>>,
    value: f64,
    tags: HashMap<String, String>,
}

impl SampleBuilder {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            timestamp: None,
            value: 0.0,
            tags: HashMap::new(),
        }
    }

    pub fn timestamp(mut self, timestamp: DateTime<Utc>) -> Self {
        self.timestamp = Some(timestamp);
        self
    }

    pub fn value(mut self, value: f64) -> Self {
        self.value = value;
        self
    }

    /// Adds one tag; a repeated key replaces the earlier value.
    pub fn tag(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.tags.insert(key.into(), value.into());
        self
    }

    pub fn tags<I, K, V>(mut self, tags: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        self.tags
            .extend(tags.into_iter().map(|(k, v)| (k.into(), v.into())));
        self
    }

    /// Missing timestamps default to the capture time of this call.
    pub fn build(self) -> Result<Sample, SampleError> {
        if self.name.is_empty() {
            return Err(SampleError::EmptyName);
        }
        if self.tags.keys().any(|key| key.is_empty()) {
            return Err(SampleError::EmptyTagKey(self.name));
        }
        let timestamp = match self.timestamp {
            Some(ts) => DateTime::from_timestamp_millis(ts.timestamp_millis()).unwrap_or(ts),
            None => capture_time(),
        };

        Ok(Sample {
            name: self.name,
            timestamp,
            value: self.value,
            tags: self.tags,
        })
    }
}
