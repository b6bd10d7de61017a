use crate::shared::config::StorageSettings;
use crate::shared::error::StorageError;
use crate::shared::storage::{ElasticsearchStorage, MockStorage, PrometheusStorage};
use crate::shared::traits::Sink;
use std::collections::BTreeMap;

/// Batches the dry-run `mock` backend keeps for inspection.
pub const DRY_RUN_HISTORY: usize = 16;

pub type SinkFactory =
    Box<dyn Fn(&StorageSettings) -> Result<Box<dyn Sink>, StorageError> + Send + Sync>;

/// Backend identifier to constructor, resolved once at startup.
pub struct SinkRegistry {
    factories: BTreeMap<String, SinkFactory>,
}

impl SinkRegistry {
    pub fn new() -> Self {
        Self {
            factories: BTreeMap::new(),
        }
    }

    /// Registry with the `mock`, `prometheus` and `elasticsearch` backends.
    pub fn with_defaults() -> Self {
        let mut registry = Self::new();
        registry.register("mock", |_| Ok(Box::new(MockStorage::with_capacity(DRY_RUN_HISTORY))));
        registry.register("prometheus", |settings| {
            Ok(Box::new(PrometheusStorage::new(settings)?))
        });
        registry.register("elasticsearch", |settings| {
            Ok(Box::new(ElasticsearchStorage::new(settings)?))
        });
        registry
    }

    /// Adds or replaces the factory for `name`.
    pub fn register<F>(&mut self, name: impl Into<String>, factory: F)
    where
        F: Fn(&StorageSettings) -> Result<Box<dyn Sink>, StorageError> + Send + Sync + 'static,
    {
        self.factories.insert(name.into(), Box::new(factory));
    }

    pub fn backends(&self) -> Vec<&str> {
        self.factories.keys().map(String::as_str).collect()
    }

    pub fn build(&self, settings: &StorageSettings) -> Result<Box<dyn Sink>, StorageError> {
        let factory = self
            .factories
            .get(settings.backend.as_str())
            .ok_or_else(|| StorageError::UnknownBackend {
                name: settings.backend.clone(),
                available: self.backends().join(", "),
            })?;
        factory(settings)
    }
}

impl Default for SinkRegistry {
    fn default() -> Self {
        Self::with_defaults()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn settings(backend: &str) -> StorageSettings {
        StorageSettings {
            backend: backend.to_string(),
            ..StorageSettings::default()
        }
    }

    #[test]
    fn default_backends_are_registered() {
        let registry = SinkRegistry::with_defaults();
        assert_eq!(registry.backends(), vec!["elasticsearch", "mock", "prometheus"]);
    }

    #[test]
    fn builds_selected_backend() {
        let registry = SinkRegistry::with_defaults();
        assert_eq!(registry.build(&settings("mock")).unwrap().name(), "mock");
        assert_eq!(registry.build(&settings("prometheus")).unwrap().name(), "prometheus");
    }

    #[test]
    fn unknown_backend_lists_alternatives() {
        let registry = SinkRegistry::with_defaults();
        let err = match registry.build(&settings("influxdb")) {
            Err(e) => e,
            Ok(_) => panic!("influxdb is not registered"),
        };
        let message = err.to_string();
        assert!(message.contains("influxdb"));
        assert!(message.contains("elasticsearch, mock, prometheus"));
    }

    #[test]
    fn construction_failure_is_reported() {
        let registry = SinkRegistry::with_defaults();
        let mut bad = settings("prometheus");
        bad.address = "gateway without scheme".into();
        assert!(matches!(
            registry.build(&bad),
            Err(StorageError::InvalidAddress { .. })
        ));
    }

    #[test]
    fn custom_backend_can_be_registered() {
        let mut registry = SinkRegistry::new();
        registry.register("capture", |_| Ok(Box::new(MockStorage::named("capture"))));
        assert_eq!(registry.build(&settings("capture")).unwrap().name(), "capture");
    }
}
