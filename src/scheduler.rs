//! The fixed-cadence sampling loop.
//!
//! Each tick samples CPU, saves it, samples memory, saves it, then waits
//! [`TICK_INTERVAL`]. The wait is the only suspension point and is cut short
//! by a shutdown request; a request that arrives mid-tick is seen at the next
//! tick boundary. Read and write failures are logged and never end the loop.

use std::time::Duration;

use tokio::sync::watch;
use tracing::{debug, error, info, trace, warn};

use crate::record::{CpuSampleRecord, MemorySampleRecord};
use crate::store::SampleSink;
use crate::system::sampler::{now_millis, sample_cpu, sample_memory};
use crate::system::source::CounterSource;

pub const TICK_INTERVAL: Duration = Duration::from_secs(1);

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum LoopState {
    Running,
    /// Terminal.
    Stopped,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum StepOutcome {
    Saved,
    /// The read failed and nothing was written.
    ReadFailed,
    /// The read failed and a zero-valued record was written in its place.
    SavedZeroed,
    WriteFailed,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct TickReport {
    pub cpu: StepOutcome,
    pub memory: StepOutcome,
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct LoopStats {
    pub ticks: u64,
    pub cpu_saved: u64,
    pub memory_saved: u64,
    pub read_failures: u64,
    pub write_failures: u64,
}

#[derive(Clone, Copy, Debug, Default)]
pub struct SchedulerOptions {
    /// Persist a zero-valued record when a counter read fails instead of skipping it.
    pub persist_on_read_error: bool,
}

/// Sending half of the shutdown signal.
#[derive(Debug)]
pub struct ShutdownTrigger {
    tx: watch::Sender<bool>,
}

impl ShutdownTrigger {
    /// Requests shutdown. Returns `false` if shutdown had already been requested.
    pub fn trigger(&self) -> bool {
        !self.tx.send_replace(true)
    }
}

/// Receiving half of the shutdown signal, owned by the scheduler.
#[derive(Clone, Debug)]
pub struct Shutdown {
    rx: watch::Receiver<bool>,
}

impl Shutdown {
    pub fn channel() -> (ShutdownTrigger, Shutdown) {
        let (tx, rx) = watch::channel(false);
        (ShutdownTrigger { tx }, Shutdown { rx })
    }

    pub fn is_requested(&self) -> bool {
        *self.rx.borrow()
    }

    /// Resolves once shutdown has been requested. Never resolves if the
    /// trigger is dropped without firing.
    pub async fn requested(&mut self) {
        loop {
            if *self.rx.borrow_and_update() {
                return;
            }
            if self.rx.changed().await.is_err() {
                std::future::pending::<()>().await;
            }
        }
    }
}

pub struct Scheduler<S, K> {
    source: S,
    sink: K,
    shutdown: Shutdown,
    options: SchedulerOptions,
    state: LoopState,
    stats: LoopStats,
}

impl<S: CounterSource, K: SampleSink> Scheduler<S, K> {
    pub fn new(source: S, sink: K, shutdown: Shutdown, options: SchedulerOptions) -> Self {
        Self {
            source,
            sink,
            shutdown,
            options,
            state: LoopState::Running,
            stats: LoopStats::default(),
        }
    }

    pub fn state(&self) -> LoopState {
        self.state
    }

    pub fn stats(&self) -> LoopStats {
        self.stats
    }

    pub fn sink(&self) -> &K {
        &self.sink
    }

    pub fn into_sink(self) -> K {
        self.sink
    }

    /// Runs ticks until shutdown is requested, then returns the totals.
    pub async fn run(&mut self) -> LoopStats {
        info!(interval_ms = TICK_INTERVAL.as_millis() as u64, "sampling loop started");

        while self.state == LoopState::Running {
            if self.shutdown.is_requested() {
                self.state = LoopState::Stopped;
                break;
            }

            self.tick();

            tokio::select! {
                () = tokio::time::sleep(TICK_INTERVAL) => {}
                () = self.shutdown.requested() => {
                    debug!("shutdown requested while waiting for next tick");
                }
            }
        }

        let stats = self.stats;
        info!(
            ticks = stats.ticks,
            cpu_saved = stats.cpu_saved,
            memory_saved = stats.memory_saved,
            read_failures = stats.read_failures,
            write_failures = stats.write_failures,
            "sampling loop stopped"
        );
        stats
    }

    /// Executes one tick: CPU first, then memory, each independent of the other.
    pub fn tick(&mut self) -> TickReport {
        self.stats.ticks += 1;
        let _span = tracing::debug_span!("scheduler.tick", tick = self.stats.ticks).entered();

        let cpu = self.cpu_step();
        let memory = self.memory_step();
        TickReport { cpu, memory }
    }

    fn cpu_step(&mut self) -> StepOutcome {
        let (record, zeroed) = match sample_cpu(&self.source) {
            Ok(record) => (record, false),
            Err(e) => {
                warn!(error = %e, "cpu stat read failed");
                self.stats.read_failures += 1;
                if !self.options.persist_on_read_error {
                    return StepOutcome::ReadFailed;
                }
                (CpuSampleRecord::zeroed(now_millis()), true)
            }
        };

        match self.sink.save_cpu(&record) {
            Ok(id) => {
                debug!(id = id.0, cores = record.cores.len(), "saved cpu sample");
                trace!(id = id.0, ?record, "cpu sample");
                self.stats.cpu_saved += 1;
                if zeroed {
                    StepOutcome::SavedZeroed
                } else {
                    StepOutcome::Saved
                }
            }
            Err(e) => {
                error!(error = %e, "failed to save cpu sample");
                self.stats.write_failures += 1;
                StepOutcome::WriteFailed
            }
        }
    }

    fn memory_step(&mut self) -> StepOutcome {
        let (record, zeroed) = match sample_memory(&self.source) {
            Ok(record) => (record, false),
            Err(e) => {
                warn!(error = %e, "memory stat read failed");
                self.stats.read_failures += 1;
                if !self.options.persist_on_read_error {
                    return StepOutcome::ReadFailed;
                }
                (MemorySampleRecord::zeroed(now_millis()), true)
            }
        };

        match self.sink.save_memory(&record) {
            Ok(id) => {
                debug!(id, "saved memory sample");
                trace!(id, ?record, "memory sample");
                self.stats.memory_saved += 1;
                if zeroed {
                    StepOutcome::SavedZeroed
                } else {
                    StepOutcome::Saved
                }
            }
            Err(e) => {
                error!(error = %e, "failed to save memory sample");
                self.stats.write_failures += 1;
                StepOutcome::WriteFailed
            }
        }
    }
}
