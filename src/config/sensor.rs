// Copyright (c) 2025 Ronan LE MEILLAT, SCTG Development
// This file is part of the rust-npk-monitor project and is licensed under the
// SCTG Development Non-Commercial License v1.0 (see LICENSE.md for details).

//! Soil probe configuration
//!
//! This module defines the serial line settings used to reach the probe.

use serde::{Deserialize, Serialize};

/// Configuration of the serial line to the soil probe.
///
/// The probe speaks 8-N-1 framing; only the port, speed and read timeout
/// can be changed.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SensorConfig {
    /// Serial device the probe is attached to (e.g. `/dev/ttyUSB0` or `COM3`)
    #[serde(default = "default_port")]
    pub port: String,

    /// Line speed in baud. The probe ships configured for 4800.
    #[serde(default = "default_baud_rate")]
    pub baud_rate: u32,

    /// How long to wait for the answer, in milliseconds
    #[serde(default = "default_read_timeout_ms")]
    pub read_timeout_ms: u64,

    /// Replace the probe with a simulated one producing plausible values
    #[serde(default)]
    pub simulated: bool,
}

fn default_port() -> String {
    "/dev/ttyUSB0".to_string()
}

fn default_baud_rate() -> u32 {
    4800
}

fn default_read_timeout_ms() -> u64 {
    100
}

impl Default for SensorConfig {
    fn default() -> Self {
        Self {
            port: default_port(),
            baud_rate: default_baud_rate(),
            read_timeout_ms: default_read_timeout_ms(),
            simulated: false,
        }
    }
}
