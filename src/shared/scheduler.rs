//! Fixed-interval collection loop.
//!
//! Each tick moves the loop from idle to running: collect a batch, write it
//! if it is not empty, report the outcome, then go back to waiting. Ticks that
//! fire while a tick is still running are skipped by the timer, so two
//! collections never overlap. Failures only cost the current tick.

use crate::shared::config::{format_duration, AgentConfig};
use crate::shared::diagnostics::Diagnostics;
use crate::shared::error::WriteError;
use crate::shared::sample::{Batch, Sample};
use crate::shared::traits::{AsyncDataCollector, Sink};
use futures::FutureExt;
use std::any::Any;
use std::future::Future;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use std::time::Duration;
use tokio::time::{self, MissedTickBehavior};

/// What happened during one tick.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TickOutcome {
    Written { samples: usize, attempts: u32 },
    Empty,
    CollectFailed,
    WriteFailed,
    /// The collector or the sink panicked; the tick's batch is lost.
    Panicked,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RunSummary {
    pub ticks: u64,
    pub writes: u64,
    pub empty_ticks: u64,
    pub collect_failures: u64,
    pub write_failures: u64,
    pub panics: u64,
    /// Set when shutdown cut an in-flight tick short.
    pub abandoned_tick: bool,
}

impl RunSummary {
    fn record(&mut self, outcome: TickOutcome) {
        self.ticks += 1;
        match outcome {
            TickOutcome::Written { .. } => self.writes += 1,
            TickOutcome::Empty => self.empty_ticks += 1,
            TickOutcome::CollectFailed => self.collect_failures += 1,
            TickOutcome::WriteFailed => self.write_failures += 1,
            TickOutcome::Panicked => self.panics += 1,
        }
    }
}

pub struct Scheduler<C> {
    collector: C,
    sink: Box<dyn Sink>,
    diagnostics: Arc<dyn Diagnostics>,
    interval: Duration,
    write_retries: u32,
    shutdown_grace: Duration,
    max_ticks: Option<u64>,
}

impl<C> Scheduler<C>
where
    C: AsyncDataCollector<Batch> + Send,
{
    pub fn new(collector: C, sink: Box<dyn Sink>, diagnostics: Arc<dyn Diagnostics>) -> Self {
        let defaults = AgentConfig::default();
        Self {
            collector,
            sink,
            diagnostics,
            interval: defaults.interval,
            write_retries: defaults.write_retries,
            shutdown_grace: defaults.shutdown_grace,
            max_ticks: None,
        }
    }

    pub fn from_config(
        collector: C,
        sink: Box<dyn Sink>,
        diagnostics: Arc<dyn Diagnostics>,
        config: &AgentConfig,
    ) -> Self {
        Self::new(collector, sink, diagnostics)
            .interval(config.interval)
            .write_retries(config.write_retries)
            .shutdown_grace(config.shutdown_grace)
            .max_ticks(config.max_ticks)
    }

    pub fn interval(mut self, interval: Duration) -> Self {
        self.interval = interval;
        self
    }

    pub fn write_retries(mut self, retries: u32) -> Self {
        self.write_retries = retries;
        self
    }

    pub fn shutdown_grace(mut self, grace: Duration) -> Self {
        self.shutdown_grace = grace;
        self
    }

    pub fn max_ticks(mut self, max_ticks: Option<u64>) -> Self {
        self.max_ticks = max_ticks;
        self
    }

    /// Runs until `shutdown` resolves or `max_ticks` ticks have completed, then
    /// closes the sink exactly once.
    pub async fn run<F>(mut self, shutdown: F) -> RunSummary
    where
        F: Future<Output = ()>,
    {
        tokio::pin!(shutdown);
        let diagnostics = Arc::clone(&self.diagnostics);
        let grace = self.shutdown_grace;

        // tokio panics on a zero period.
        let mut ticker = time::interval(self.interval.max(Duration::from_millis(1)));
        ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);
        let mut summary = RunSummary::default();

        diagnostics.info(&format!(
            "collecting every {}, writing to {}",
            format_duration(self.interval),
            self.sink.name()
        ));

        loop {
            if self.max_ticks.is_some_and(|max| summary.ticks >= max) {
                diagnostics.info(&format!("completed {} ticks", summary.ticks));
                break;
            }

            tokio::select! {
                biased;
                _ = &mut shutdown => {
                    diagnostics.info("shutdown requested");
                    break;
                }
                _ = ticker.tick() => {}
            }

            let tick_number = summary.ticks + 1;
            let tick = AssertUnwindSafe(self.run_tick(tick_number)).catch_unwind();
            tokio::pin!(tick);

            let stop = tokio::select! {
                result = &mut tick => {
                    summary.record(settle(diagnostics.as_ref(), tick_number, result));
                    false
                }
                _ = &mut shutdown => {
                    diagnostics.warn(&format!(
                        "shutdown requested during tick {}, allowing {} to finish",
                        tick_number,
                        format_duration(grace)
                    ));
                    match time::timeout(grace, &mut tick).await {
                        Ok(result) => {
                            summary.record(settle(diagnostics.as_ref(), tick_number, result))
                        }
                        Err(_) => {
                            diagnostics.warn(&format!("abandoned tick {tick_number}"));
                            summary.abandoned_tick = true;
                        }
                    }
                    true
                }
            };
            if stop {
                break;
            }
        }

        self.close_sink().await;
        summary
    }

    async fn run_tick(&mut self, tick: u64) -> TickOutcome {
        let batch = match self.collector.collect().await {
            Ok(batch) => batch,
            Err(e) => {
                self.diagnostics
                    .error(&format!("tick {tick}: collection failed, skipping write: {e}"));
                return TickOutcome::CollectFailed;
            }
        };

        if batch.is_empty() {
            self.diagnostics
                .info(&format!("tick {tick}: collected 0 samples, nothing to write"));
            return TickOutcome::Empty;
        }

        match self.write_with_retry(&batch).await {
            Ok(attempts) => {
                self.diagnostics.info(&format!(
                    "tick {tick}: collected {} samples, wrote to {}",
                    batch.len(),
                    self.sink.name()
                ));
                TickOutcome::Written {
                    samples: batch.len(),
                    attempts,
                }
            }
            Err(e) => {
                self.diagnostics.error(&format!(
                    "tick {tick}: collected {} samples, write to {} failed: {e}",
                    batch.len(),
                    self.sink.name()
                ));
                TickOutcome::WriteFailed
            }
        }
    }

    /// Only `BackendUnavailable` is retried; a rejected batch would be rejected again.
    async fn write_with_retry(&mut self, batch: &[Sample]) -> Result<u32, WriteError> {
        let mut attempts = 0;
        loop {
            attempts += 1;
            match self.sink.write(batch).await {
                Ok(()) => return Ok(attempts),
                Err(WriteError::BackendUnavailable(reason)) if attempts <= self.write_retries => {
                    self.diagnostics.warn(&format!(
                        "write to {} failed (attempt {attempts}), retrying: {reason}",
                        self.sink.name()
                    ));
                }
                Err(e) => return Err(e),
            }
        }
    }

    async fn close_sink(&mut self) {
        match self.sink.close().await {
            Ok(()) => self.diagnostics.info(&format!("closed {}", self.sink.name())),
            Err(e) => self
                .diagnostics
                .warn(&format!("closing {} failed: {e}", self.sink.name())),
        }
    }
}

/// Turns a tick that unwound into `TickOutcome::Panicked`.
fn settle(
    diagnostics: &dyn Diagnostics,
    tick: u64,
    result: Result<TickOutcome, Box<dyn Any + Send>>,
) -> TickOutcome {
    match result {
        Ok(outcome) => outcome,
        Err(payload) => {
            diagnostics.error(&format!(
                "tick {tick}: panicked, skipping write: {}",
                panic_message(payload.as_ref())
            ));
            TickOutcome::Panicked
        }
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> &str {
    if let Some(message) = payload.downcast_ref::<&str>() {
        message
    } else if let Some(message) = payload.downcast_ref::<String>() {
        message
    } else {
        "non-string panic payload"
    }
}
