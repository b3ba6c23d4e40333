// Copyright (c) 2025 Ronan LE MEILLAT, SCTG Development
// This file is part of the rust-npk-monitor project and is licensed under the
// SCTG Development Non-Commercial License v1.0 (see LICENSE.md for details).

//! Data acquisition configuration
//!
//! This module defines the structures for configuring the soil probe
//! poll loop.

use serde::{Deserialize, Serialize};

use crate::acquisition::daemon::DEFAULT_POLL_INTERVAL;
use crate::utility::DEFAULT_HISTORY_CAPACITY;

/// Configuration for the data acquisition process.
///
/// This structure contains settings that control how often the probe is
/// polled and how much history is kept for the nutrient series.
#[derive(Debug, Deserialize, Serialize, Clone, PartialEq)]
pub struct AcquisitionConfig {
    /// Flag to enable or disable data acquisition.
    ///
    /// When disabled the probe is never queried and every consumer keeps
    /// reporting "no data".
    #[serde(default = "default_enabled")]
    pub enabled: bool,

    /// Time in milliseconds between the end of one poll and the start of the next.
    ///
    /// Must be greater than zero.
    #[serde(default = "default_interval_ms")]
    pub interval_ms: u64,

    /// Number of samples kept in each of the N, P and K histories
    #[serde(default = "default_history_capacity")]
    pub history_capacity: usize,
}

fn default_enabled() -> bool {
    true
}

fn default_interval_ms() -> u64 {
    DEFAULT_POLL_INTERVAL.as_millis() as u64
}

fn default_history_capacity() -> usize {
    DEFAULT_HISTORY_CAPACITY
}

// implement Default for AcquisitionConfig
impl Default for AcquisitionConfig {
    fn default() -> Self {
        Self {
            enabled: default_enabled(),
            interval_ms: default_interval_ms(),
            history_capacity: default_history_capacity(),
        }
    }
}
