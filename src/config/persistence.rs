// Copyright (c) 2025 Ronan LE MEILLAT, SCTG Development
// This file is part of the rust-npk-monitor project and is licensed under the
// SCTG Development Non-Commercial License v1.0 (see LICENSE.md for details).

//! Persistence publisher configuration

use serde::{Deserialize, Serialize};

/// Configuration for pushing readings to a remote store.
///
/// Before each submission the publisher opens a TCP connection to
/// `connectivity_host:connectivity_port`; when that fails the reading is
/// skipped, not queued.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PersistenceConfig {
    /// Enable or disable the publisher. Disabled by default.
    #[serde(default)]
    pub enabled: bool,

    /// URL the readings are POSTed to as JSON
    #[serde(default = "default_endpoint")]
    pub endpoint: String,

    /// Time in milliseconds between two checks for a new reading
    #[serde(default = "default_interval_ms")]
    pub interval_ms: u64,

    /// Host used to decide whether the network is reachable
    #[serde(default = "default_connectivity_host")]
    pub connectivity_host: String,

    /// Port used for the reachability check
    #[serde(default = "default_connectivity_port")]
    pub connectivity_port: u16,

    /// Reachability check timeout in milliseconds
    #[serde(default = "default_connectivity_timeout_ms")]
    pub connectivity_timeout_ms: u64,
}

fn default_endpoint() -> String {
    "http://127.0.0.1:5000/api/readings".to_string()
}

fn default_interval_ms() -> u64 {
    2000
}

// Public DNS resolver, as good a liveness target as any
fn default_connectivity_host() -> String {
    "8.8.8.8".to_string()
}

fn default_connectivity_port() -> u16 {
    53
}

fn default_connectivity_timeout_ms() -> u64 {
    3000
}

impl Default for PersistenceConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            endpoint: default_endpoint(),
            interval_ms: default_interval_ms(),
            connectivity_host: default_connectivity_host(),
            connectivity_port: default_connectivity_port(),
            connectivity_timeout_ms: default_connectivity_timeout_ms(),
        }
    }
}
