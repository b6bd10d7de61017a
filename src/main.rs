use clap::Parser;
use env_logger::Env;
use hostpulse::{
    shared::config::parse_duration,
    AgentConfig, AgentError, AsyncDataCollector, Diagnostics, HostCollector, LogDiagnostics,
    LogFileCollector, Scheduler, SinkRegistry, SysinfoSource,
};
use log::{error, info, warn};
use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;
use std::time::Duration;

#[derive(Parser, Debug)]
#[command(name = "hostpulse")]
#[command(about = "Samples host CPU, memory, network and disk counters and pushes them to a time-series backend")]
#[command(version)]
struct Cli {
    /// YAML file with agent settings; flags override its values
    #[arg(long)]
    config: Option<PathBuf>,

    /// Storage backend (prometheus, elasticsearch, mock)
    #[arg(long)]
    storage: Option<String>,

    /// Backend address; defaults to http://localhost:9091 for prometheus and
    /// http://localhost:9200 for elasticsearch
    #[arg(long, alias = "prometheus-address")]
    address: Option<String>,

    /// Collection interval (500ms, 15s, 2m, 1h)
    #[arg(long, value_parser = parse_duration)]
    interval: Option<Duration>,

    /// Window over which CPU utilization is measured
    #[arg(long, value_parser = parse_duration)]
    cpu_window: Option<Duration>,

    /// Immediate re-sends when the backend is unavailable
    #[arg(long)]
    write_retries: Option<u32>,

    /// Stop after this many ticks
    #[arg(long)]
    ticks: Option<u64>,

    /// Application log to follow; each new line is sent as a log_entry sample
    #[arg(long)]
    log_file: Option<PathBuf>,

    /// Log level when RUST_LOG is not set
    #[arg(long)]
    log_level: Option<String>,

    /// Print the registered storage backends and exit
    #[arg(long)]
    list_backends: bool,
}

impl Cli {
    fn resolve(&self) -> Result<AgentConfig, AgentError> {
        let mut config = match &self.config {
            Some(path) => AgentConfig::from_yaml_file(path)?,
            None => AgentConfig::default(),
        };
        self.apply(&mut config);
        config.validate()?;
        Ok(config)
    }

    fn apply(&self, config: &mut AgentConfig) {
        if let Some(storage) = &self.storage {
            config.storage.backend = storage.clone();
        }
        if let Some(address) = &self.address {
            config.storage.address = address.clone();
        }
        if let Some(interval) = self.interval {
            config.interval = interval;
        }
        if let Some(window) = self.cpu_window {
            config.cpu_window = window;
        }
        if let Some(retries) = self.write_retries {
            config.write_retries = retries;
        }
        if let Some(ticks) = self.ticks {
            config.max_ticks = Some(ticks);
        }
        if let Some(level) = &self.log_level {
            config.log_level = level.clone();
        }
        if let Some(path) = &self.log_file {
            config.log_file = Some(path.clone());
        }
    }
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        error!("Failed to listen for shutdown signal: {}", e);
        std::future::pending::<()>().await;
    }
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();
    let registry = SinkRegistry::with_defaults();

    if cli.list_backends {
        for backend in registry.backends() {
            println!("{backend}");
        }
        return ExitCode::SUCCESS;
    }

    let config = match cli.resolve() {
        Ok(config) => config,
        Err(e) => {
            eprintln!("hostpulse: {e}");
            return ExitCode::FAILURE;
        }
    };

    env_logger::Builder::from_env(Env::default().default_filter_or(config.log_level.as_str())).init();

    let sink = match registry.build(&config.storage).map_err(AgentError::from) {
        Ok(sink) => sink,
        Err(e) => {
            error!("Failed to initialize {} storage: {}", config.storage.backend, e);
            return ExitCode::FAILURE;
        }
    };

    let diagnostics: Arc<dyn Diagnostics> = Arc::new(LogDiagnostics::default());
    let mut collector = HostCollector::new(Arc::new(SysinfoSource::new()), Arc::clone(&diagnostics))
        .cpu_window(config.cpu_window);
    if let Err(e) = collector.validate().await {
        warn!("Host collector failed its startup check: {}", e);
    }
    if let Some(path) = &config.log_file {
        let log_file = LogFileCollector::new(path, Arc::clone(&diagnostics));
        if let Err(e) = log_file.validate().await {
            warn!("Following {} anyway: {}", path.display(), e);
        }
        collector = collector.log_file(log_file);
    }

    info!("Starting agent with storage: {}", sink.name());
    let summary = Scheduler::from_config(collector, sink, diagnostics, &config)
        .run(shutdown_signal())
        .await;

    info!(
        "Stopped after {} ticks: {} written, {} empty, {} collection failures, {} write failures, {} panics",
        summary.ticks,
        summary.writes,
        summary.empty_ticks,
        summary.collect_failures,
        summary.write_failures,
        summary.panics
    );
    ExitCode::SUCCESS
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn flags_override_config_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "interval: 30s\nstorage:\n  backend: elasticsearch\n  address: http://es:9200").unwrap();
        let path = file.path().to_string_lossy().into_owned();

        let cli = Cli::parse_from([
            "hostpulse",
            "--config",
            path.as_str(),
            "--storage",
            "mock",
            "--interval",
            "5s",
            "--ticks",
            "3",
        ]);
        let config = cli.resolve().unwrap();

        assert_eq!(config.storage.backend, "mock");
        assert_eq!(config.storage.address, "http://es:9200");
        assert_eq!(config.interval, Duration::from_secs(5));
        assert_eq!(config.max_ticks, Some(3));
    }

    #[test]
    fn prometheus_address_alias_is_accepted() {
        let cli = Cli::parse_from(["hostpulse", "--prometheus-address", "http://gw:9091"]);
        assert_eq!(cli.resolve().unwrap().storage.address, "http://gw:9091");
    }

    #[test]
    fn log_file_flag_is_applied() {
        let cli = Cli::parse_from(["hostpulse", "--storage", "mock", "--log-file", "/var/log/app.log"]);
        assert_eq!(
            cli.resolve().unwrap().log_file,
            Some(PathBuf::from("/var/log/app.log"))
        );
    }

    #[test]
    fn invalid_interval_flag_is_rejected() {
        assert!(Cli::try_parse_from(["hostpulse", "--interval", "soon"]).is_err());
    }

    #[test]
    fn interval_shorter_than_cpu_window_fails_validation() {
        let cli = Cli::parse_from(["hostpulse", "--interval", "500ms"]);
        assert!(matches!(cli.resolve(), Err(AgentError::Config(_))));
    }
}
