pub mod features;
pub mod shared;

pub use features::disk::{disk_samples, PartitionInfo, DISK_USAGE};
pub use features::host::{HostCollector, DEFAULT_CPU_WINDOW};
pub use features::logs::{log_samples, LogEntry, LogFileCollector, LOG_ENTRY};
pub use features::network::{network_samples, InterfaceCounters, NETWORK_BYTES_RECV, NETWORK_BYTES_SENT};
pub use features::system_metrics::{
    cpu_samples,
    memory_samples,
    MemoryReading,
    CPU_USAGE,
    MEMORY_TOTAL,
    MEMORY_USAGE,
};

pub use shared::collector::{HostSource, SysinfoSource};
pub use shared::config::{AgentConfig, StorageSettings};
pub use shared::diagnostics::{Diagnostics, LogDiagnostics, MemoryDiagnostics};
pub use shared::error::{
    AgentError,
    CloseError,
    CollectError,
    CollectionError,
    ConfigError,
    PartialCollectionWarning,
    SampleError,
    StorageError,
    WriteError,
};
pub use shared::sample::{Batch, Sample, SampleBuilder};
pub use shared::scheduler::{RunSummary, Scheduler, TickOutcome};
pub use shared::storage::{
    ElasticsearchStorage,
    MockFailure,
    MockHandle,
    MockStorage,
    PrometheusStorage,
    SinkRegistry,
    DRY_RUN_HISTORY,
};
pub use shared::traits::{AsyncDataCollector, Sink, Validatable};
