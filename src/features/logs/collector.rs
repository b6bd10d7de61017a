use crate::features::logs::models::LogEntry;
use crate::shared::diagnostics::Diagnostics;
use crate::shared::error::{CollectError, CollectionError, SampleError};
use crate::shared::sample::{Batch, Sample};
use crate::shared::traits::AsyncDataCollector;
use async_trait::async_trait;
use std::io::SeekFrom;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio::fs::File;
use tokio::io::{AsyncReadExt, AsyncSeekExt};

pub const LOG_ENTRY: &str = "log_entry";

/// Follows an application log and turns each new line into a `log_entry`
/// sample (value 1, tags `level` and `message`).
///
/// Every call reads the complete lines appended since the previous call; a
/// trailing partial line waits for the next one. A file that shrank is read
/// again from the start.
pub struct LogFileCollector {
    path: PathBuf,
    offset: u64,
    diagnostics: Arc<dyn Diagnostics>,
}

impl LogFileCollector {
    pub fn new(path: impl Into<PathBuf>, diagnostics: Arc<dyn Diagnostics>) -> Self {
        Self {
            path: path.into(),
            offset: 0,
            diagnostics,
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    async fn read_new_lines(&mut self) -> Result<Vec<String>, CollectionError> {
        let mut file = File::open(&self.path).await?;
        let len = file.metadata().await?.len();
        if len < self.offset {
            self.diagnostics.info(&format!(
                "{} shrank from {} to {} bytes, reading from the start",
                self.path.display(),
                self.offset,
                len
            ));
            self.offset = 0;
        }

        file.seek(SeekFrom::Start(self.offset)).await?;
        let mut appended = Vec::new();
        file.read_to_end(&mut appended).await?;

        let complete = appended
            .iter()
            .rposition(|&byte| byte == b'\n')
            .map_or(0, |newline| newline + 1);
        self.offset += complete as u64;

        Ok(String::from_utf8_lossy(&appended[..complete])
            .lines()
            .filter(|line| !line.trim().is_empty())
            .map(str::to_owned)
            .collect())
    }
}

pub fn log_samples(entries: &[LogEntry]) -> Result<Vec<Sample>, SampleError> {
    entries
        .iter()
        .map(|entry| {
            Sample::builder(LOG_ENTRY)
                .timestamp(entry.timestamp)
                .value(1.0)
                .tag("level", entry.level.as_str())
                .tag("message", entry.message.as_str())
                .build()
        })
        .collect()
}

#[async_trait]
impl AsyncDataCollector<Batch> for LogFileCollector {
    async fn collect(&mut self) -> Result<Batch, CollectError> {
        let lines = self.read_new_lines().await.map_err(CollectError::LogFile)?;
        let entries: Vec<LogEntry> = lines.iter().filter_map(|line| LogEntry::parse(line)).collect();

        let skipped = lines.len() - entries.len();
        if skipped > 0 {
            self.diagnostics.debug(&format!(
                "skipped {} unparsable lines in {}",
                skipped,
                self.path.display()
            ));
        }
        Ok(log_samples(&entries)?)
    }

    async fn validate(&self) -> Result<(), CollectError> {
        tokio::fs::metadata(&self.path)
            .await
            .map(|_| ())
            .map_err(|e| CollectError::LogFile(e.into()))
    }

    async fn health_check(&self) -> bool {
        self.validate().await.is_ok()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::shared::diagnostics::MemoryDiagnostics;
    use std::fs::OpenOptions;
    use std::io::Write;

    fn append(path: &Path, text: &str) {
        let mut file = OpenOptions::new().append(true).open(path).unwrap();
        file.write_all(text.as_bytes()).unwrap();
    }

    fn collector(path: &Path) -> (LogFileCollector, Arc<MemoryDiagnostics>) {
        let diagnostics = Arc::new(MemoryDiagnostics::new());
        (LogFileCollector::new(path, diagnostics.clone()), diagnostics)
    }

    #[tokio::test]
    async fn each_line_becomes_one_sample() {
        let file = tempfile::NamedTempFile::new().unwrap();
        append(
            file.path(),
            "2024-03-01T12:00:00Z INFO service started\n\
             not a log line\n\
             \n\
             2024-03-01T12:00:05.250Z [error] upstream timed out\n",
        );
        let (mut collector, diagnostics) = collector(file.path());

        let batch = collector.collect().await.unwrap();

        assert_eq!(batch.len(), 2);
        assert!(batch.iter().all(|s| s.name() == LOG_ENTRY && s.value() == 1.0));
        assert_eq!(batch[0].tag("level"), Some("info"));
        assert_eq!(batch[0].tag("message"), Some("service started"));
        assert_eq!(batch[1].tag("level"), Some("error"));
        assert_eq!(batch[1].timestamp_millis(), 1_709_294_405_250);
        assert!(diagnostics.contains("skipped 1 unparsable lines"));
    }

    #[tokio::test]
    async fn only_appended_complete_lines_are_read() {
        let file = tempfile::NamedTempFile::new().unwrap();
        append(file.path(), "2024-03-01T12:00:00Z first\n");
        let (mut collector, _) = collector(file.path());

        assert_eq!(collector.collect().await.unwrap().len(), 1);
        assert!(collector.collect().await.unwrap().is_empty());

        append(file.path(), "2024-03-01T12:00:01Z second\n2024-03-01T12:00:02Z thi");
        let batch = collector.collect().await.unwrap();
        assert_eq!(batch.len(), 1);
        assert_eq!(batch[0].tag("message"), Some("second"));

        append(file.path(), "rd\n");
        let batch = collector.collect().await.unwrap();
        assert_eq!(batch.len(), 1);
        assert_eq!(batch[0].tag("message"), Some("third"));
    }

    #[tokio::test]
    async fn truncated_file_is_read_from_the_start() {
        let file = tempfile::NamedTempFile::new().unwrap();
        append(file.path(), "2024-03-01T12:00:00Z a fairly long first line\n");
        let (mut collector, diagnostics) = collector(file.path());
        assert_eq!(collector.collect().await.unwrap().len(), 1);

        std::fs::write(file.path(), "2024-03-01T13:00:00Z rotated\n").unwrap();
        let batch = collector.collect().await.unwrap();

        assert_eq!(batch.len(), 1);
        assert_eq!(batch[0].tag("message"), Some("rotated"));
        assert!(diagnostics.contains("reading from the start"));
    }

    #[tokio::test]
    async fn missing_file_is_a_collect_error() {
        let (mut collector, _) = collector(Path::new("/nonexistent/app.log"));
        assert!(matches!(collector.collect().await, Err(CollectError::LogFile(_))));
        assert!(!collector.health_check().await);
    }
}
