use crate::features::disk::disk_samples;
use crate::features::logs::LogFileCollector;
use crate::features::network::network_samples;
use crate::features::system_metrics::{cpu_samples, memory_samples};
use crate::shared::collector::HostSource;
use crate::shared::diagnostics::Diagnostics;
use crate::shared::error::{CollectError, PartialCollectionWarning};
use crate::shared::sample::{capture_time, Batch};
use crate::shared::traits::AsyncDataCollector;
use std::sync::Arc;
use std::time::Duration;
use tokio::task::{JoinError, JoinHandle};

pub const DEFAULT_CPU_WINDOW: Duration = Duration::from_secs(1);

/// Builds one batch per call from CPU, memory, network and disk readings, plus
/// new lines of an application log when one is attached.
///
/// CPU and memory are mandatory: if either cannot be read the call fails.
/// Network, disk and log failures only drop their own samples.
pub struct HostCollector {
    source: Arc<dyn HostSource>,
    diagnostics: Arc<dyn Diagnostics>,
    cpu_window: Duration,
    log_file: Option<LogFileCollector>,
}

impl HostCollector {
    pub fn new(source: Arc<dyn HostSource>, diagnostics: Arc<dyn Diagnostics>) -> Self {
        Self {
            source,
            diagnostics,
            cpu_window: DEFAULT_CPU_WINDOW,
            log_file: None,
        }
    }

    pub fn log_file(mut self, log_file: LogFileCollector) -> Self {
        self.log_file = Some(log_file);
        self
    }

    /// Window over which per-core utilization is measured.
    pub fn cpu_window(mut self, window: Duration) -> Self {
        self.cpu_window = window;
        self
    }

    fn read<T, F>(&self, read: F) -> JoinHandle<T>
    where
        F: FnOnce(&dyn HostSource) -> T + Send + 'static,
        T: Send + 'static,
    {
        let source = Arc::clone(&self.source);
        tokio::task::spawn_blocking(move || read(source.as_ref()))
    }
}

fn task_failed(e: JoinError) -> CollectError {
    CollectError::Task(e.to_string())
}

#[async_trait::async_trait]
impl AsyncDataCollector<Batch> for HostCollector {
    async fn collect(&mut self) -> Result<Batch, CollectError> {
        let window = self.cpu_window;
        let cpu = self.read(move |source| {
            let usage = source.cpu_usage(window);
            (usage, capture_time())
        });
        let memory = self.read(|source| (source.memory(), capture_time()));
        let network = self.read(|source| (source.network_interfaces(), capture_time()));
        let disk = self.read(|source| {
            source
                .partitions()
                .map(|partitions| disk_samples(source, &partitions, capture_time()))
        });

        let log_file = self.log_file.as_mut();
        let logs = async move {
            match log_file {
                Some(log_file) => Some(log_file.collect().await),
                None => None,
            }
        };

        let (cpu, memory, network, disk, logs) = tokio::join!(cpu, memory, network, disk, logs);

        let (usage, cpu_ts) = cpu.map_err(task_failed)?;
        let mut batch = cpu_samples(&usage.map_err(CollectError::Cpu)?, cpu_ts)?;

        let (reading, memory_ts) = memory.map_err(task_failed)?;
        batch.extend(memory_samples(&reading.map_err(CollectError::Memory)?, memory_ts)?);

        let mut warnings = Vec::new();
        match network {
            Ok((Ok(interfaces), ts)) => {
                let (samples, skipped) = network_samples(&interfaces, ts);
                batch.extend(samples);
                warnings.extend(skipped);
            }
            Ok((Err(e), _)) => warnings.push(PartialCollectionWarning::subsystem("network", e)),
            Err(e) => warnings.push(PartialCollectionWarning::subsystem("network", e)),
        }
        match disk {
            Ok(Ok((samples, skipped))) => {
                batch.extend(samples);
                warnings.extend(skipped);
            }
            Ok(Err(e)) => warnings.push(PartialCollectionWarning::subsystem("disk", e)),
            Err(e) => warnings.push(PartialCollectionWarning::subsystem("disk", e)),
        }
        match logs {
            Some(Ok(samples)) => batch.extend(samples),
            Some(Err(e)) => warnings.push(PartialCollectionWarning::subsystem("log", e)),
            None => {}
        }

        for warning in &warnings {
            self.diagnostics.warn(&warning.to_string());
        }
        self.diagnostics.debug(&format!(
            "collected {} samples, {} items skipped",
            batch.len(),
            warnings.len()
        ));
        Ok(batch)
    }

    async fn validate(&self) -> Result<(), CollectError> {
        let (cpus, memory) = tokio::join!(
            self.read(|source| source.cpu_usage(Duration::ZERO)),
            self.read(|source| source.memory()),
        );
        if cpus.map_err(task_failed)?.map_err(CollectError::Cpu)?.is_empty() {
            return Err(CollectError::NoCpus);
        }
        memory.map_err(task_failed)?.map_err(CollectError::Memory)?;
        Ok(())
    }

    async fn health_check(&self) -> bool {
        self.validate().await.is_ok()
    }
}
