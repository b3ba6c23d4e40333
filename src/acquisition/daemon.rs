// Copyright (c) 2025 Ronan LE MEILLAT, SCTG Development
// This file is part of the rust-npk-monitor project and is licensed under the
// SCTG Development Non-Commercial License v1.0 (see LICENSE.md for details).

//! Acquisition daemon module
//!
//! This module provides the poll loop that queries the soil probe, decodes
//! its answer and publishes the result to the shared store. A failed cycle
//! is logged and discarded; the next one runs after the normal wait.

use crate::acquisition::RecordLog;
use crate::sensor::{
    build_request, decode_response, FrameError, Reading, SensorTransport, TransportError,
};
use crate::utility::{ReadingStore, TimedReading};
use anyhow::Result;
use log::{debug, info, warn};
use std::sync::{
    atomic::{AtomicBool, AtomicU64, AtomicU8, Ordering},
    Arc,
};
use std::time::Duration;
use tokio::sync::{mpsc, Notify};
use tokio::time::sleep;

/// Default wait between the end of a cycle and the start of the next one
pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_secs(2);

/// Reasons a single acquisition cycle can fail
#[derive(thiserror::Error, Debug)]
pub enum CycleError {
    #[error(transparent)]
    Transport(#[from] TransportError),
    #[error(transparent)]
    Frame(#[from] FrameError),
    #[error("Serial worker failed: {0}")]
    Worker(#[from] tokio::task::JoinError),
}

/// Whether the loop is currently talking to the probe
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AcquisitionState {
    Idle,
    Polling,
}

impl AcquisitionState {
    fn from_u8(value: u8) -> Self {
        match value {
            1 => AcquisitionState::Polling,
            _ => AcquisitionState::Idle,
        }
    }

    fn as_u8(self) -> u8 {
        match self {
            AcquisitionState::Idle => 0,
            AcquisitionState::Polling => 1,
        }
    }
}

/// Cycle counters
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct AcquisitionStats {
    pub successful_cycles: u64,
    pub failed_cycles: u64,
}

/// Daemon polling the soil probe and feeding the [`ReadingStore`]
///
/// The daemon is the only writer of the store and the only caller of the
/// transport, so at most one exchange is ever in flight. Wrap it in an
/// [`Arc`] to keep a handle for [`stop`](Self::stop) while [`run`](Self::run)
/// executes in its own task.
pub struct SensorAcquisitionDaemon {
    /// Line to the probe
    transport: Arc<dyn SensorTransport>,
    /// Store receiving every decoded reading
    store: ReadingStore,
    /// Optional text record of each reading
    record_log: Option<RecordLog>,
    /// Queue feeding the persistence publisher
    persistence_queue: Option<mpsc::Sender<TimedReading>>,
    /// Wait between two cycles
    interval: Duration,
    /// Set while `run` is looping
    running: AtomicBool,
    /// Set by `stop`, checked between cycles
    stop_requested: AtomicBool,
    /// Wakes the inter-cycle wait on stop
    wake: Notify,
    state: AtomicU8,
    successful_cycles: AtomicU64,
    failed_cycles: AtomicU64,
}

impl SensorAcquisitionDaemon {
    /// Create a new acquisition daemon
    ///
    /// ### Parameters
    /// * `transport` - Line to the probe (serial or simulated)
    /// * `store` - Store receiving the decoded readings
    /// * `interval` - Wait measured from the end of one cycle to the start of the next
    pub fn new(transport: Arc<dyn SensorTransport>, store: ReadingStore, interval: Duration) -> Self {
        Self {
            transport,
            store,
            record_log: None,
            persistence_queue: None,
            interval,
            running: AtomicBool::new(false),
            stop_requested: AtomicBool::new(false),
            wake: Notify::new(),
            state: AtomicU8::new(AcquisitionState::Idle.as_u8()),
            successful_cycles: AtomicU64::new(0),
            failed_cycles: AtomicU64::new(0),
        }
    }

    /// Also append every successful reading to `record_log`
    pub fn with_record_log(mut self, record_log: RecordLog) -> Self {
        self.record_log = Some(record_log);
        self
    }

    /// Also hand every successful reading to `queue`.
    ///
    /// The hand-off never waits: when the queue is full the reading is not
    /// persisted and a warning is logged.
    pub fn with_persistence_queue(mut self, queue: mpsc::Sender<TimedReading>) -> Self {
        self.persistence_queue = Some(queue);
        self
    }

    /// Get the store fed by this daemon
    pub fn store(&self) -> &ReadingStore {
        &self.store
    }

    /// Run the poll loop until [`stop`](Self::stop) is called.
    ///
    /// Cycle failures never end the loop. A stop request is consumed by the
    /// run it ends, so the daemon can be run again afterwards.
    pub async fn run(&self) -> Result<()> {
        if self.running.swap(true, Ordering::AcqRel) {
            warn!("Acquisition daemon is already running");
            return Ok(());
        }

        info!(
            "Starting acquisition daemon on {}, interval {}ms",
            self.transport.describe(),
            self.interval.as_millis()
        );

        while !self.stop_requested.load(Ordering::Acquire) {
            if let Err(e) = self.run_cycle().await {
                warn!(
                    "Acquisition cycle on {} failed: {}",
                    self.transport.describe(),
                    e
                );
            }

            if self.stop_requested.load(Ordering::Acquire) {
                break;
            }
            tokio::select! {
                _ = sleep(self.interval) => {}
                _ = self.wake.notified() => {}
            }
        }

        self.stop_requested.store(false, Ordering::Release);
        self.running.store(false, Ordering::Release);
        info!("Acquisition daemon stopped");
        Ok(())
    }

    /// Perform one request/decode/publish cycle.
    ///
    /// On failure the store is left untouched.
    pub async fn run_cycle(&self) -> Result<TimedReading, CycleError> {
        self.state
            .store(AcquisitionState::Polling.as_u8(), Ordering::Release);
        let result = self.poll_probe().await;
        self.state
            .store(AcquisitionState::Idle.as_u8(), Ordering::Release);

        match result {
            Ok(reading) => {
                let timed = self.store.publish(reading);
                self.successful_cycles.fetch_add(1, Ordering::Relaxed);
                debug!(
                    "Reading #{}: T={:.1} H={:.1} pH={:.1} N={:.1} P={:.1} K={:.1}",
                    timed.sequence,
                    reading.temperature,
                    reading.humidity,
                    reading.ph,
                    reading.n,
                    reading.p,
                    reading.k
                );
                if let Some(record_log) = &self.record_log {
                    if let Err(e) = record_log.append(&timed) {
                        warn!("Could not write record log: {:#}", e);
                    }
                }
                if let Some(queue) = &self.persistence_queue {
                    match queue.try_send(timed) {
                        Ok(()) => {}
                        Err(mpsc::error::TrySendError::Full(_)) => warn!(
                            "Persistence queue full, reading #{} will not be persisted",
                            timed.sequence
                        ),
                        Err(mpsc::error::TrySendError::Closed(_)) => debug!(
                            "Persistence publisher gone, reading #{} not queued",
                            timed.sequence
                        ),
                    }
                }
                Ok(timed)
            }
            Err(e) => {
                self.failed_cycles.fetch_add(1, Ordering::Relaxed);
                Err(e)
            }
        }
    }

    async fn poll_probe(&self) -> Result<Reading, CycleError> {
        let request = build_request();
        let transport = self.transport.clone();
        // The serial exchange blocks for up to the read timeout
        let bytes = tokio::task::spawn_blocking(move || transport.exchange(&request)).await??;
        Ok(decode_response(&bytes)?)
    }

    /// Ask the loop to stop after the current cycle
    pub fn stop(&self) {
        info!("Stopping acquisition daemon");
        self.stop_requested.store(true, Ordering::Release);
        self.wake.notify_one();
    }

    /// Check if the loop is running
    pub fn is_running(&self) -> bool {
        self.running.load(Ordering::Acquire)
    }

    pub fn state(&self) -> AcquisitionState {
        AcquisitionState::from_u8(self.state.load(Ordering::Acquire))
    }

    pub fn stats(&self) -> AcquisitionStats {
        AcquisitionStats {
            successful_cycles: self.successful_cycles.load(Ordering::Relaxed),
            failed_cycles: self.failed_cycles.load(Ordering::Relaxed),
        }
    }
}
