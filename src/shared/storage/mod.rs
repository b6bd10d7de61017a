mod elasticsearch_storage;
mod mock_storage;
mod prometheus_storage;
mod registry;
#[cfg(test)]
mod stub_server;

pub use elasticsearch_storage::ElasticsearchStorage;
pub use mock_storage::{MockFailure, MockHandle, MockStorage};
pub use prometheus_storage::{encode_exposition, PrometheusStorage};
pub use registry::{SinkFactory, SinkRegistry, DRY_RUN_HISTORY};
