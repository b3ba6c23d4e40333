// Copyright (c) 2025 Ronan LE MEILLAT, SCTG Development
// This file is part of the rust-npk-monitor project and is licensed under the
// SCTG Development Non-Commercial License v1.0 (see LICENSE.md for details).

//! Remote persistence of soil readings
//!
//! The acquisition loop pushes every successful reading onto a bounded queue
//! (see [`reading_queue`]). A [`PersistencePublisher`] drains it on its own
//! schedule and hands each reading to a [`PersistenceSink`], provided a
//! [`ConnectivityProbe`] reports the network as reachable. Readings drained
//! while offline are dropped, never retried.

use anyhow::Result;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

pub mod connectivity;
pub mod http_sink;
pub mod publisher;

pub use connectivity::TcpConnectivityProbe;
pub use http_sink::HttpSink;
pub use publisher::{reading_queue, PersistencePublisher, PublishOutcome, DEFAULT_QUEUE_CAPACITY};

use crate::utility::TimedReading;

/// Document submitted to the remote store
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PersistenceRecord {
    pub timestamp: DateTime<Utc>,
    pub temperature: f64,
    pub humidity: f64,
    pub ph: f64,
    pub n: f64,
    pub p: f64,
    pub k: f64,
}

impl From<&TimedReading> for PersistenceRecord {
    fn from(timed: &TimedReading) -> Self {
        let reading = &timed.reading;
        Self {
            timestamp: timed.acquired_at,
            temperature: reading.temperature,
            humidity: reading.humidity,
            ph: reading.ph,
            n: reading.n,
            p: reading.p,
            k: reading.k,
        }
    }
}

/// Destination of persisted readings
#[async_trait]
pub trait PersistenceSink: Send + Sync {
    /// Store one record
    async fn submit(&self, record: &PersistenceRecord) -> Result<()>;
}

/// Pass/fail check of network reachability
#[async_trait]
pub trait ConnectivityProbe: Send + Sync {
    async fn is_reachable(&self) -> bool;
}
