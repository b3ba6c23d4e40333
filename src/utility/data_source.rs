// Copyright (c) 2025 Ronan LE MEILLAT, SCTG Development
// This file is part of the rust-npk-monitor project and is licensed under the
// SCTG Development Non-Commercial License v1.0 (see LICENSE.md for details).

//! Shared store for soil readings
//!
//! This module provides the central repository shared between the
//! acquisition loop (the only writer) and every consumer: web API,
//! dashboard, Modbus gateway and persistence publisher.

use std::collections::VecDeque;
use std::sync::{Arc, Mutex, MutexGuard};

use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::sensor::{HistoryField, Reading};

/// Default number of samples kept per nutrient history
pub const DEFAULT_HISTORY_CAPACITY: usize = 10;

/// A reading together with the moment it was stored
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct TimedReading {
    #[serde(flatten)]
    pub reading: Reading,

    /// When the store accepted the reading
    pub acquired_at: DateTime<Utc>,

    /// Publication counter, starting at 1 for the first reading
    pub sequence: u64,
}

/// Snapshot of the latest value held by the store
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum LatestReading {
    /// Nothing has been acquired yet
    NoData,
    /// Most recent successful reading
    Available(TimedReading),
}

impl LatestReading {
    pub fn as_option(&self) -> Option<&TimedReading> {
        match self {
            LatestReading::NoData => None,
            LatestReading::Available(timed) => Some(timed),
        }
    }

    pub fn is_available(&self) -> bool {
        matches!(self, LatestReading::Available(_))
    }
}

#[derive(Debug)]
struct StoreState {
    latest: LatestReading,
    next_sequence: u64,
    n: VecDeque<f64>,
    p: VecDeque<f64>,
    k: VecDeque<f64>,
}

impl StoreState {
    fn series_mut(&mut self, field: HistoryField) -> &mut VecDeque<f64> {
        match field {
            HistoryField::N => &mut self.n,
            HistoryField::P => &mut self.p,
            HistoryField::K => &mut self.k,
        }
    }

    fn series(&self, field: HistoryField) -> &VecDeque<f64> {
        match field {
            HistoryField::N => &self.n,
            HistoryField::P => &self.p,
            HistoryField::K => &self.k,
        }
    }
}

/// A thread-safe repository of soil readings
///
/// Holds the latest [`Reading`] and a bounded FIFO history of the N, P and K
/// values. Cloning the store is cheap and every clone shares the same data.
///
/// The lock is only held while copying values in or out, never across I/O,
/// so a reader sees either the previous reading or the new one in full.
#[derive(Clone, Debug)]
pub struct ReadingStore {
    state: Arc<Mutex<StoreState>>,
    capacity: usize,
}

impl ReadingStore {
    /// Create an empty store keeping `capacity` samples per history
    pub fn new(capacity: usize) -> Self {
        Self {
            state: Arc::new(Mutex::new(StoreState {
                latest: LatestReading::NoData,
                next_sequence: 1,
                n: VecDeque::with_capacity(capacity),
                p: VecDeque::with_capacity(capacity),
                k: VecDeque::with_capacity(capacity),
            })),
            capacity,
        }
    }

    fn lock(&self) -> MutexGuard<'_, StoreState> {
        // A panicking reader cannot leave the state half written
        self.state
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// Replace the latest reading and append its nutrients to the histories.
    ///
    /// Returns the stored reading with its timestamp and sequence number.
    pub fn publish(&self, reading: Reading) -> TimedReading {
        let mut state = self.lock();

        let timed = TimedReading {
            reading,
            acquired_at: Utc::now(),
            sequence: state.next_sequence,
        };
        state.next_sequence += 1;
        state.latest = LatestReading::Available(timed);

        for field in HistoryField::ALL {
            let capacity = self.capacity;
            let series = state.series_mut(field);
            series.push_back(reading.nutrient(field));
            while series.len() > capacity {
                series.pop_front();
            }
        }

        timed
    }

    /// Snapshot of the latest reading, or [`LatestReading::NoData`]
    pub fn latest(&self) -> LatestReading {
        self.lock().latest
    }

    /// Snapshot of one nutrient history, oldest sample first
    pub fn history(&self, field: HistoryField) -> Vec<f64> {
        self.lock().series(field).iter().copied().collect()
    }

    /// Maximum number of samples kept per history
    pub fn capacity(&self) -> usize {
        self.capacity
    }
}

impl Default for ReadingStore {
    fn default() -> Self {
        Self::new(DEFAULT_HISTORY_CAPACITY)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicBool, Ordering};
    use std::thread;

    fn reading(index: u32) -> Reading {
        let value = f64::from(index);
        Reading {
            humidity: value,
            temperature: value,
            ph: value,
            n: value,
            p: value + 0.5,
            k: value + 0.25,
        }
    }

    #[test]
    fn test_empty_store_reports_no_data() {
        let store = ReadingStore::default();
        assert_eq!(store.latest(), LatestReading::NoData);
        assert!(store.history(HistoryField::N).is_empty());
        assert_eq!(store.capacity(), DEFAULT_HISTORY_CAPACITY);
    }

    #[test]
    fn test_publish_replaces_latest_and_counts() {
        let store = ReadingStore::new(3);
        let first = store.publish(reading(1));
        let second = store.publish(reading(2));

        assert_eq!(first.sequence, 1);
        assert_eq!(second.sequence, 2);
        assert!(second.acquired_at >= first.acquired_at);
        match store.latest() {
            LatestReading::Available(timed) => assert_eq!(timed, second),
            LatestReading::NoData => panic!("expected a reading"),
        }
    }

    #[test]
    fn test_history_is_capped_fifo() {
        let store = ReadingStore::new(10);
        for index in 0..15 {
            store.publish(reading(index));
        }

        let n: Vec<f64> = (5..15).map(f64::from).collect();
        assert_eq!(store.history(HistoryField::N), n);
        assert_eq!(store.history(HistoryField::P).len(), 10);
        assert_eq!(store.history(HistoryField::P)[0], 5.5);
        assert_eq!(store.history(HistoryField::K)[9], 14.25);
    }

    #[test]
    fn test_history_is_a_snapshot() {
        let store = ReadingStore::new(4);
        store.publish(reading(1));
        let before = store.history(HistoryField::N);
        store.publish(reading(2));
        assert_eq!(before, vec![1.0]);
        assert_eq!(store.history(HistoryField::N), vec![1.0, 2.0]);
    }

    #[test]
    fn test_clones_share_state() {
        let store = ReadingStore::new(2);
        let consumer = store.clone();
        store.publish(reading(7));
        assert!(consumer.latest().is_available());
    }

    #[test]
    fn test_concurrent_readers_never_see_mixed_fields() {
        let store = ReadingStore::new(10);
        let done = Arc::new(AtomicBool::new(false));

        let readers: Vec<_> = (0..4)
            .map(|_| {
                let store = store.clone();
                let done = done.clone();
                thread::spawn(move || {
                    let mut last_sequence = 0;
                    while !done.load(Ordering::Acquire) {
                        if let LatestReading::Available(timed) = store.latest() {
                            let r = timed.reading;
                            assert_eq!(r.humidity, r.temperature);
                            assert_eq!(r.ph, r.n);
                            assert_eq!(r.p, r.n + 0.5);
                            assert_eq!(r.k, r.n + 0.25);
                            assert!(timed.sequence >= last_sequence);
                            last_sequence = timed.sequence;
                        }
                    }
                })
            })
            .collect();

        for index in 0..5000 {
            store.publish(reading(index));
        }
        done.store(true, Ordering::Release);

        for reader in readers {
            reader.join().unwrap();
        }
        assert_eq!(store.history(HistoryField::N).len(), 10);
    }
}
