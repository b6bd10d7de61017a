use crate::shared::config::StorageSettings;
use crate::shared::error::{CloseError, StorageError, WriteError};
use crate::shared::sample::Sample;
use crate::shared::traits::Sink;
use async_trait::async_trait;
use chrono::SecondsFormat;
use elasticsearch::{
    http::request::JsonBody,
    http::transport::{SingleNodeConnectionPool, TransportBuilder},
    BulkParts, Elasticsearch,
};
use log::{debug, error, info};
use serde_json::{json, Value};
use url::Url;

/// Bulk-indexes one document per sample.
pub struct ElasticsearchStorage {
    client: Elasticsearch,
    index: String,
    closed: bool,
}

impl ElasticsearchStorage {
    pub fn new(settings: &StorageSettings) -> Result<Self, StorageError> {
        let address = settings.endpoint();
        let url = Url::parse(address).map_err(|e| StorageError::InvalidAddress {
            address: address.to_string(),
            reason: e.to_string(),
        })?;
        if settings.elasticsearch_index.is_empty() {
            return Err(StorageError::InvalidAddress {
                address: address.to_string(),
                reason: "elasticsearch index must not be empty".to_string(),
            });
        }

        let conn_pool = SingleNodeConnectionPool::new(url);
        let transport = TransportBuilder::new(conn_pool)
            .timeout(settings.request_timeout)
            .build()
            .map_err(|e| StorageError::Connection(e.to_string()))?;

        info!("Indexing metrics into {} at {}", settings.elasticsearch_index, address);
        Ok(Self {
            client: Elasticsearch::new(transport),
            index: settings.elasticsearch_index.clone(),
            closed: false,
        })
    }
}

fn document(sample: &Sample) -> Value {
    json!({
        "name": sample.name(),
        "@timestamp": sample.timestamp().to_rfc3339_opts(SecondsFormat::Millis, true),
        "value": sample.value(),
        "tags": sample.tags(),
    })
}

fn bulk_body(batch: &[Sample]) -> Vec<JsonBody<Value>> {
    let mut body: Vec<JsonBody<Value>> = Vec::with_capacity(batch.len() * 2);
    for sample in batch {
        body.push(json!({"index": {}}).into());
        body.push(document(sample).into());
    }
    body
}

/// First item-level failure reported by a bulk response, if any.
fn first_bulk_error(response: &Value) -> Option<String> {
    if response["errors"].as_bool() != Some(true) {
        return None;
    }
    let reason = response["items"]
        .as_array()
        .into_iter()
        .flatten()
        .filter_map(|item| item["index"]["error"].as_object())
        .map(|error| {
            format!(
                "{}: {}",
                error.get("type").and_then(Value::as_str).unwrap_or("unknown"),
                error.get("reason").and_then(Value::as_str).unwrap_or("no reason given")
            )
        })
        .next();
    Some(reason.unwrap_or_else(|| "bulk request reported errors".to_string()))
}

#[async_trait]
impl Sink for ElasticsearchStorage {
    async fn write(&mut self, batch: &[Sample]) -> Result<(), WriteError> {
        if self.closed {
            return Err(WriteError::BackendUnavailable("elasticsearch sink is closed".into()));
        }

        let response = self
            .client
            .bulk(BulkParts::Index(&self.index))
            .body(bulk_body(batch))
            .send()
            .await
            .map_err(|e| WriteError::BackendUnavailable(e.to_string()))?;

        let status = response.status_code();
        if !status.is_success() {
            error!("Failed to store metrics: {:?}", response);
            let message = format!("Elasticsearch returned error status: {}", status);
            return Err(if status.is_client_error() {
                WriteError::RejectedSample(message)
            } else {
                WriteError::BackendUnavailable(message)
            });
        }

        let response_body: Value = response
            .json()
            .await
            .map_err(|e| WriteError::BackendUnavailable(e.to_string()))?;
        if let Some(reason) = first_bulk_error(&response_body) {
            return Err(WriteError::RejectedSample(reason));
        }

        debug!("Indexed {} samples into {}", batch.len(), self.index);
        Ok(())
    }

    async fn close(&mut self) -> Result<(), CloseError> {
        if self.closed {
            return Err(CloseError::AlreadyClosed(self.name().to_string()));
        }
        self.closed = true;
        Ok(())
    }

    fn name(&self) -> &str {
        "elasticsearch"
    }
}
