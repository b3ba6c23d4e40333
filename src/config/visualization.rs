// Copyright (c) 2025 Ronan LE MEILLAT, SCTG Development
// This file is part of the rust-npk-monitor project and is licensed under the
// SCTG Development Non-Commercial License v1.0 (see LICENSE.md for details).

//! Visualization server configuration
//!
//! This module defines the structure for configuring the web dashboard
//! and JSON API server.

use serde::{Deserialize, Serialize};

/// Configuration for the visualization web server.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VisualizationConfig {
    /// The TCP port the visualization server will listen on.
    ///
    /// Valid range is 1-65534. Default value is 8080.
    #[serde(default = "default_port")]
    pub port: u16,

    /// The network address the server will bind to.
    ///
    /// Can be an IPv4/IPv6 address or a hostname. Default is "127.0.0.1".
    /// Use "0.0.0.0" to bind to all IPv4 interfaces.
    #[serde(default = "default_address")]
    pub address: String,

    /// The server name reported in HTTP headers and logs.
    #[serde(default = "default_name")]
    pub name: String,

    /// Enable or disable the visualization server. Default is `true`.
    #[serde(default = "default_enabled")]
    pub enabled: bool,
}

/// Provides the default TCP port (8080) for the visualization server.
fn default_port() -> u16 {
    8080
}

/// Provides the default network binding address (127.0.0.1).
///
/// The loopback address only accepts connections from the local machine.
/// Use "0.0.0.0" to expose the dashboard on the network.
fn default_address() -> String {
    "127.0.0.1".to_string()
}

/// Generates the default server name string based on the current package version.
fn default_name() -> String {
    format!("NpkMonitor/{}", env!("CARGO_PKG_VERSION"))
}

fn default_enabled() -> bool {
    true
}

impl Default for VisualizationConfig {
    fn default() -> Self {
        Self {
            port: default_port(),
            address: default_address(),
            name: default_name(),
            enabled: default_enabled(),
        }
    }
}
