use crate::shared::config::StorageSettings;
use crate::shared::error::{CloseError, StorageError, WriteError};
use crate::shared::sample::Sample;
use crate::shared::traits::Sink;
use async_trait::async_trait;
use log::{debug, info};
use reqwest::header::CONTENT_TYPE;
use reqwest::Client;
use std::collections::BTreeMap;
use std::fmt::Write as _;
use url::Url;

const EXPOSITION_CONTENT_TYPE: &str = "text/plain; version=0.0.4";

/// Pushes each batch to a Prometheus Pushgateway.
///
/// Every write replaces the grouping `job/<job>/instance/<host>` with the
/// current batch. Pushgateway refuses client-side timestamps, so sample
/// timestamps are not sent.
pub struct PrometheusStorage {
    client: Client,
    push_url: Url,
    closed: bool,
}

impl PrometheusStorage {
    pub fn new(settings: &StorageSettings) -> Result<Self, StorageError> {
        Self::with_instance(settings, &whoami::hostname())
    }

    pub fn with_instance(settings: &StorageSettings, instance: &str) -> Result<Self, StorageError> {
        let push_url = push_url(settings.endpoint(), &settings.prometheus_job, instance)?;
        let client = Client::builder()
            .timeout(settings.request_timeout)
            .build()
            .map_err(|e| StorageError::Connection(e.to_string()))?;

        info!("Pushing metrics to {}", push_url);
        Ok(Self {
            client,
            push_url,
            closed: false,
        })
    }

    pub fn push_url(&self) -> &Url {
        &self.push_url
    }
}

fn push_url(address: &str, job: &str, instance: &str) -> Result<Url, StorageError> {
    let invalid = |reason: String| StorageError::InvalidAddress {
        address: address.to_string(),
        reason,
    };

    let mut url = Url::parse(address).map_err(|e| invalid(e.to_string()))?;
    if job.is_empty() {
        return Err(invalid("prometheus job must not be empty".into()));
    }
    url.path_segments_mut()
        .map_err(|_| invalid("address cannot be a base URL".into()))?
        .pop_if_empty()
        .extend(["metrics", "job", job, "instance", instance]);
    Ok(url)
}

fn is_metric_name(name: &str) -> bool {
    let mut chars = name.chars();
    matches!(chars.next(), Some(c) if c.is_ascii_alphabetic() || c == '_' || c == ':')
        && chars.all(|c| c.is_ascii_alphanumeric() || c == '_' || c == ':')
}

fn is_label_name(name: &str) -> bool {
    let mut chars = name.chars();
    !name.starts_with("__")
        && matches!(chars.next(), Some(c) if c.is_ascii_alphabetic() || c == '_')
        && chars.all(|c| c.is_ascii_alphanumeric() || c == '_')
}

fn escape_label_value(value: &str) -> String {
    let mut escaped = String::with_capacity(value.len());
    for c in value.chars() {
        match c {
            '\\' => escaped.push_str("\\\\"),
            '"' => escaped.push_str("\\\""),
            '\n' => escaped.push_str("\\n"),
            other => escaped.push(other),
        }
    }
    escaped
}

fn format_value(value: f64) -> String {
    if value.is_nan() {
        "NaN".to_string()
    } else if value == f64::INFINITY {
        "+Inf".to_string()
    } else if value == f64::NEG_INFINITY {
        "-Inf".to_string()
    } else {
        value.to_string()
    }
}

/// Renders a batch in the Prometheus text exposition format.
///
/// Lines of one metric family are kept together, families appear in order of
/// first occurrence and labels are sorted by name. Any invalid metric or label
/// name rejects the whole batch.
pub fn encode_exposition(batch: &[Sample]) -> Result<String, WriteError> {
    let mut families: Vec<(&str, Vec<&Sample>)> = Vec::new();
    for sample in batch {
        if !is_metric_name(sample.name()) {
            return Err(WriteError::RejectedSample(format!(
                "invalid metric name '{}'",
                sample.name()
            )));
        }
        if let Some(key) = sample.tags().keys().find(|key| !is_label_name(key)) {
            return Err(WriteError::RejectedSample(format!(
                "invalid label name '{}' on {}",
                key,
                sample.name()
            )));
        }
        match families.iter_mut().find(|(name, _)| *name == sample.name()) {
            Some((_, members)) => members.push(sample),
            None => families.push((sample.name(), vec![sample])),
        }
    }

    let mut body = String::new();
    for (name, members) in families {
        for sample in members {
            let labels: BTreeMap<&String, &String> = sample.tags().iter().collect();
            body.push_str(name);
            if !labels.is_empty() {
                let rendered: Vec<String> = labels
                    .iter()
                    .map(|(key, value)| format!("{}=\"{}\"", key, escape_label_value(value)))
                    .collect();
                let _ = write!(body, "{{{}}}", rendered.join(","));
            }
            let _ = writeln!(body, " {}", format_value(sample.value()));
        }
    }
    Ok(body)
}

#[async_trait]
impl Sink for PrometheusStorage {
    async fn write(&mut self, batch: &[Sample]) -> Result<(), WriteError> {
        if self.closed {
            return Err(WriteError::BackendUnavailable("prometheus sink is closed".into()));
        }
        let body = encode_exposition(batch)?;

        let response = self
            .client
            .put(self.push_url.clone())
            .header(CONTENT_TYPE, EXPOSITION_CONTENT_TYPE)
            .body(body)
            .send()
            .await
            .map_err(|e| WriteError::BackendUnavailable(e.to_string()))?;

        let status = response.status();
        if status.is_success() {
            debug!("Pushed {} samples to {}", batch.len(), self.push_url);
            return Ok(());
        }

        let detail = response.text().await.unwrap_or_default();
        let message = format!("Pushgateway returned {}: {}", status, detail.trim());
        if status.is_client_error() {
            Err(WriteError::RejectedSample(message))
        } else {
            Err(WriteError::BackendUnavailable(message))
        }
    }

    async fn close(&mut self) -> Result<(), CloseError> {
        if self.closed {
            return Err(CloseError::AlreadyClosed(self.name().to_string()));
        }
        self.closed = true;
        Ok(())
    }

    fn name(&self) -> &str {
        "prometheus"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::shared::storage::stub_server::StubServer;

    fn sample(name: &str, value: f64, tags: &[(&str, &str)]) -> Sample {
        Sample::builder(name)
            .value(value)
            .tags(tags.iter().copied())
            .build()
            .unwrap()
    }

    #[test]
    fn groups_families_and_sorts_labels() {
        let batch = vec![
            sample("cpu_usage", 42.0, &[("core", "cpu0")]),
            sample("memory_total", 8192.0, &[]),
            sample("cpu_usage", 7.5, &[("core", "cpu1")]),
            sample("disk_usage", 10.0, &[("mountpoint", "/"), ("fstype", "ext4")]),
        ];

        let text = encode_exposition(&batch).unwrap();
        assert_eq!(
            text,
            "cpu_usage{core=\"cpu0\"} 42\n\
             cpu_usage{core=\"cpu1\"} 7.5\n\
             memory_total 8192\n\
             disk_usage{fstype=\"ext4\",mountpoint=\"/\"} 10\n"
        );
    }

    #[test]
    fn escapes_label_values() {
        let batch = vec![sample("disk_usage", 1.0, &[("mountpoint", "/mnt/\"odd\"\\dir")])];
        let text = encode_exposition(&batch).unwrap();
        assert_eq!(text, "disk_usage{mountpoint=\"/mnt/\\\"odd\\\"\\\\dir\"} 1\n");
    }

    #[test]
    fn rejects_invalid_names() {
        let bad_metric = vec![sample("cpu-usage", 1.0, &[])];
        assert!(matches!(
            encode_exposition(&bad_metric),
            Err(WriteError::RejectedSample(_))
        ));

        let bad_label = vec![sample("cpu_usage", 1.0, &[("core id", "cpu0")])];
        assert!(matches!(
            encode_exposition(&bad_label),
            Err(WriteError::RejectedSample(_))
        ));

        let reserved = vec![sample("cpu_usage", 1.0, &[("__name__", "x")])];
        assert!(encode_exposition(&reserved).is_err());
    }

    #[test]
    fn special_float_values() {
        assert_eq!(format_value(f64::NAN), "NaN");
        assert_eq!(format_value(f64::INFINITY), "+Inf");
        assert_eq!(format_value(f64::NEG_INFINITY), "-Inf");
        assert_eq!(format_value(0.25), "0.25");
    }

    #[test]
    fn push_url_appends_grouping_key() {
        let url = push_url("http://gateway:9091/", "hostpulse", "web-1").unwrap();
        assert_eq!(url.as_str(), "http://gateway:9091/metrics/job/hostpulse/instance/web-1");

        let url = push_url("http://gateway:9091/prefix", "hostpulse", "db 2").unwrap();
        assert_eq!(url.as_str(), "http://gateway:9091/prefix/metrics/job/hostpulse/instance/db%202");
    }

    #[test]
    fn push_url_rejects_bad_address() {
        assert!(matches!(
            push_url("not a url", "hostpulse", "h"),
            Err(StorageError::InvalidAddress { .. })
        ));
        assert!(push_url("http://gateway:9091", "", "h").is_err());
    }

    #[tokio::test]
    async fn unreachable_gateway_is_backend_unavailable() {
        let settings = StorageSettings {
            address: "http://127.0.0.1:9".into(),
            request_timeout: std::time::Duration::from_millis(500),
            ..StorageSettings::default()
        };
        let mut storage = PrometheusStorage::with_instance(&settings, "test").unwrap();
        let err = storage
            .write(&[sample("cpu_usage", 1.0, &[("core", "cpu0")])])
            .await
            .unwrap_err();
        assert!(matches!(err, WriteError::BackendUnavailable(_)));

        assert!(storage.close().await.is_ok());
        assert!(storage.close().await.is_err());
    }

    fn stub_settings(address: &str) -> StorageSettings {
        StorageSettings {
            address: address.to_string(),
            request_timeout: std::time::Duration::from_secs(5),
            ..StorageSettings::default()
        }
    }

    #[tokio::test]
    async fn push_is_a_put_of_the_exposition_text() {
        let server = StubServer::respond(200, "").await;
        let mut storage = PrometheusStorage::with_instance(&stub_settings(server.address()), "web-1").unwrap();

        storage
            .write(&[sample("cpu_usage", 12.5, &[("core", "cpu0")])])
            .await
            .unwrap();

        let request = server.request().await;
        assert!(request.starts_with("PUT /metrics/job/hostpulse/instance/web-1 HTTP/1.1\r\n"));
        assert!(request
            .to_ascii_lowercase()
            .contains("content-type: text/plain; version=0.0.4"));
        assert!(request.ends_with("cpu_usage{core=\"cpu0\"} 12.5\n"));
    }

    #[tokio::test]
    async fn client_error_status_rejects_the_batch() {
        let server = StubServer::respond(400, "text format parsing error").await;
        let mut storage = PrometheusStorage::with_instance(&stub_settings(server.address()), "web-1").unwrap();

        let err = storage.write(&[sample("memory_total", 1.0, &[])]).await.unwrap_err();
        match err {
            WriteError::RejectedSample(message) => {
                assert!(message.contains("400"));
                assert!(message.contains("text format parsing error"));
            }
            other => panic!("expected a rejection, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn server_error_status_is_backend_unavailable() {
        let server = StubServer::respond(503, "").await;
        let mut storage = PrometheusStorage::with_instance(&stub_settings(server.address()), "web-1").unwrap();

        let err = storage.write(&[sample("memory_total", 1.0, &[])]).await.unwrap_err();
        assert!(matches!(err, WriteError::BackendUnavailable(_)));
    }
}
