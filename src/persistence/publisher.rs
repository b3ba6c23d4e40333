// Copyright (c) 2025 Ronan LE MEILLAT, SCTG Development
// This file is part of the rust-npk-monitor project and is licensed under the
// SCTG Development Non-Commercial License v1.0 (see LICENSE.md for details).

//! Persistence publisher
//!
//! The acquisition loop hands every successful reading to a bounded queue.
//! The publisher drains that queue on its own tick and submits each reading
//! once. Readings drained while the network is unreachable are dropped.

use anyhow::Result;
use log::{debug, info, warn};
use std::sync::{
    atomic::{AtomicBool, Ordering},
    Arc,
};
use std::time::Duration;
use tokio::sync::{mpsc, Mutex, Notify};
use tokio::time::sleep;

use super::{ConnectivityProbe, PersistenceRecord, PersistenceSink};
use crate::utility::TimedReading;

/// Readings waiting for the publisher before new ones are dropped
pub const DEFAULT_QUEUE_CAPACITY: usize = 256;

/// What happened to one queued reading
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PublishOutcome {
    /// The network was unreachable; the reading was dropped
    Offline { sequence: u64 },
    /// The sink accepted the reading
    Submitted { sequence: u64 },
    /// The sink rejected the reading; it was dropped
    Failed { sequence: u64 },
}

/// Create the queue linking the acquisition loop to a publisher
pub fn reading_queue(
    capacity: usize,
) -> (mpsc::Sender<TimedReading>, mpsc::Receiver<TimedReading>) {
    mpsc::channel(capacity)
}

/// Consumer pushing queued readings to a [`PersistenceSink`]
pub struct PersistencePublisher {
    queue: Mutex<mpsc::Receiver<TimedReading>>,
    sink: Arc<dyn PersistenceSink>,
    probe: Arc<dyn ConnectivityProbe>,
    interval: Duration,
    running: AtomicBool,
    stop_requested: AtomicBool,
    wake: Notify,
}

impl PersistencePublisher {
    pub fn new(
        queue: mpsc::Receiver<TimedReading>,
        sink: Arc<dyn PersistenceSink>,
        probe: Arc<dyn ConnectivityProbe>,
        interval: Duration,
    ) -> Self {
        Self {
            queue: Mutex::new(queue),
            sink,
            probe,
            interval,
            running: AtomicBool::new(false),
            stop_requested: AtomicBool::new(false),
            wake: Notify::new(),
        }
    }

    /// Handle every reading queued since the last call, oldest first.
    ///
    /// Connectivity is checked once per batch. Returns one outcome per
    /// reading; an empty result means nothing was queued.
    pub async fn publish_pending(&self) -> Vec<PublishOutcome> {
        let mut pending = Vec::new();
        {
            let mut queue = self.queue.lock().await;
            while let Ok(timed) = queue.try_recv() {
                pending.push(timed);
            }
        }
        if pending.is_empty() {
            return Vec::new();
        }

        if !self.probe.is_reachable().await {
            debug!(
                "Network unreachable, {} reading(s) not persisted",
                pending.len()
            );
            return pending
                .iter()
                .map(|timed| PublishOutcome::Offline {
                    sequence: timed.sequence,
                })
                .collect();
        }

        let mut outcomes = Vec::with_capacity(pending.len());
        for timed in &pending {
            let sequence = timed.sequence;
            let record = PersistenceRecord::from(timed);
            match self.sink.submit(&record).await {
                Ok(()) => {
                    debug!("Reading #{} persisted", sequence);
                    outcomes.push(PublishOutcome::Submitted { sequence });
                }
                Err(e) => {
                    warn!("Could not persist reading #{}: {:#}", sequence, e);
                    outcomes.push(PublishOutcome::Failed { sequence });
                }
            }
        }
        outcomes
    }

    /// Publish queued readings every interval until [`stop`](Self::stop) is called.
    ///
    /// A stop request is consumed by the run it ends, so the publisher can be
    /// run again afterwards.
    pub async fn run(&self) -> Result<()> {
        if self.running.swap(true, Ordering::AcqRel) {
            warn!("Persistence publisher is already running");
            return Ok(());
        }
        info!(
            "Starting persistence publisher, interval {}ms",
            self.interval.as_millis()
        );

        while !self.stop_requested.load(Ordering::Acquire) {
            self.publish_pending().await;
            tokio::select! {
                _ = sleep(self.interval) => {}
                _ = self.wake.notified() => {}
            }
        }

        self.stop_requested.store(false, Ordering::Release);
        self.running.store(false, Ordering::Release);
        info!("Persistence publisher stopped");
        Ok(())
    }

    pub fn stop(&self) {
        info!("Stopping persistence publisher");
        self.stop_requested.store(true, Ordering::Release);
        self.wake.notify_one();
    }

    pub fn is_running(&self) -> bool {
        self.running.load(Ordering::Acquire)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sensor::Reading;
    use crate::utility::ReadingStore;
    use async_trait::async_trait;
    use std::sync::Mutex as StdMutex;
    use tokio::time::timeout;

    #[derive(Default)]
    struct RecordingSink {
        records: StdMutex<Vec<PersistenceRecord>>,
        fail: AtomicBool,
        delay: Duration,
    }

    #[async_trait]
    impl PersistenceSink for RecordingSink {
        async fn submit(&self, record: &PersistenceRecord) -> Result<()> {
            if !self.delay.is_zero() {
                sleep(self.delay).await;
            }
            if self.fail.load(Ordering::SeqCst) {
                anyhow::bail!("backend down");
            }
            self.records.lock().unwrap().push(record.clone());
            Ok(())
        }
    }

    struct SwitchProbe(AtomicBool);

    #[async_trait]
    impl ConnectivityProbe for SwitchProbe {
        async fn is_reachable(&self) -> bool {
            self.0.load(Ordering::SeqCst)
        }
    }

    fn reading(n: f64) -> Reading {
        Reading {
            humidity: 40.0,
            temperature: 21.5,
            ph: 6.5,
            n,
            p: 2.0,
            k: 3.0,
        }
    }

    struct Fixture {
        publisher: PersistencePublisher,
        queue: mpsc::Sender<TimedReading>,
        store: ReadingStore,
        sink: Arc<RecordingSink>,
        probe: Arc<SwitchProbe>,
    }

    impl Fixture {
        fn new(online: bool, sink: RecordingSink) -> Self {
            let (queue, receiver) = reading_queue(DEFAULT_QUEUE_CAPACITY);
            let sink = Arc::new(sink);
            let probe = Arc::new(SwitchProbe(AtomicBool::new(online)));
            let publisher = PersistencePublisher::new(
                receiver,
                sink.clone(),
                probe.clone(),
                Duration::from_millis(10),
            );
            Self {
                publisher,
                queue,
                store: ReadingStore::default(),
                sink,
                probe,
            }
        }

        async fn acquire(&self, n: f64) -> TimedReading {
            let timed = self.store.publish(reading(n));
            self.queue.send(timed).await.unwrap();
            timed
        }
    }

    #[tokio::test]
    async fn test_nothing_before_first_reading() {
        let fixture = Fixture::new(true, RecordingSink::default());
        assert!(fixture.publisher.publish_pending().await.is_empty());
        assert!(fixture.sink.records.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_each_reading_submitted_once() {
        let fixture = Fixture::new(true, RecordingSink::default());

        let timed = fixture.acquire(1.0).await;
        assert_eq!(
            fixture.publisher.publish_pending().await,
            vec![PublishOutcome::Submitted { sequence: 1 }]
        );
        assert!(fixture.publisher.publish_pending().await.is_empty());

        let records = fixture.sink.records.lock().unwrap();
        assert_eq!(records.len(), 1);
        assert_eq!(records[0], PersistenceRecord::from(&timed));
        assert_eq!(records[0].n, 1.0);
    }

    #[tokio::test]
    async fn test_readings_between_ticks_are_all_submitted() {
        let fixture = Fixture::new(true, RecordingSink::default());

        for n in 1..=3 {
            fixture.acquire(f64::from(n)).await;
        }
        assert_eq!(
            fixture.publisher.publish_pending().await,
            vec![
                PublishOutcome::Submitted { sequence: 1 },
                PublishOutcome::Submitted { sequence: 2 },
                PublishOutcome::Submitted { sequence: 3 },
            ]
        );

        let records = fixture.sink.records.lock().unwrap();
        let values: Vec<f64> = records.iter().map(|record| record.n).collect();
        assert_eq!(values, vec![1.0, 2.0, 3.0]);
    }

    #[tokio::test]
    async fn test_offline_readings_are_dropped_not_queued() {
        let fixture = Fixture::new(false, RecordingSink::default());

        fixture.acquire(1.0).await;
        assert_eq!(
            fixture.publisher.publish_pending().await,
            vec![PublishOutcome::Offline { sequence: 1 }]
        );

        fixture.probe.0.store(true, Ordering::SeqCst);
        assert!(fixture.publisher.publish_pending().await.is_empty());

        fixture.acquire(2.0).await;
        assert_eq!(
            fixture.publisher.publish_pending().await,
            vec![PublishOutcome::Submitted { sequence: 2 }]
        );

        let records = fixture.sink.records.lock().unwrap();
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].n, 2.0);
    }

    #[tokio::test]
    async fn test_sink_failure_is_contained() {
        let fixture = Fixture::new(true, RecordingSink::default());
        fixture.sink.fail.store(true, Ordering::SeqCst);

        fixture.acquire(1.0).await;
        assert_eq!(
            fixture.publisher.publish_pending().await,
            vec![PublishOutcome::Failed { sequence: 1 }]
        );

        fixture.sink.fail.store(false, Ordering::SeqCst);
        fixture.acquire(2.0).await;
        assert_eq!(
            fixture.publisher.publish_pending().await,
            vec![PublishOutcome::Submitted { sequence: 2 }]
        );
    }

    #[tokio::test]
    async fn test_slow_sink_loses_no_reading_while_online() {
        let fixture = Fixture::new(
            true,
            RecordingSink {
                delay: Duration::from_millis(30),
                ..RecordingSink::default()
            },
        );
        let publisher = Arc::new(fixture.publisher);
        let runner = publisher.clone();
        let handle = tokio::spawn(async move { runner.run().await });

        // Readings arrive faster than the sink accepts them
        for n in 1..=20 {
            let timed = fixture.store.publish(reading(f64::from(n)));
            fixture.queue.send(timed).await.unwrap();
            sleep(Duration::from_millis(10)).await;
        }

        let sink = fixture.sink.clone();
        timeout(Duration::from_secs(10), async {
            while sink.records.lock().unwrap().len() < 20 {
                sleep(Duration::from_millis(10)).await;
            }
        })
        .await
        .unwrap();

        publisher.stop();
        timeout(Duration::from_secs(5), handle)
            .await
            .unwrap()
            .unwrap()
            .unwrap();

        let records = sink.records.lock().unwrap();
        let values: Vec<f64> = records.iter().map(|record| record.n).collect();
        let expected: Vec<f64> = (1..=20).map(f64::from).collect();
        assert_eq!(values, expected);
    }

    #[tokio::test]
    async fn test_run_publishes_stops_and_restarts() {
        let fixture = Fixture::new(true, RecordingSink::default());
        let publisher = Arc::new(fixture.publisher);
        let sink = fixture.sink.clone();

        for round in 1..=2usize {
            let runner = publisher.clone();
            let handle = tokio::spawn(async move { runner.run().await });

            let timed = fixture.store.publish(reading(4.0));
            fixture.queue.send(timed).await.unwrap();
            timeout(Duration::from_secs(5), async {
                while sink.records.lock().unwrap().len() < round {
                    sleep(Duration::from_millis(5)).await;
                }
            })
            .await
            .unwrap();

            publisher.stop();
            timeout(Duration::from_secs(5), handle)
                .await
                .unwrap()
                .unwrap()
                .unwrap();
            assert!(!publisher.is_running());
        }
    }
}
