// Copyright (c) 2025 Ronan LE MEILLAT, SCTG Development
// This file is part of the rust-npk-monitor project and is licensed under the
// SCTG Development Non-Commercial License v1.0 (see LICENSE.md for details).

//! Modbus TCP gateway configuration
//!
//! This module defines the structures for configuring the Modbus TCP server
//! that republishes the latest soil reading.

use serde::{Deserialize, Serialize};

/// Configuration for the Modbus TCP gateway.
///
/// # Example
///
/// ```
/// use rust_npk_monitor::config::ModbusConfig;
///
/// let modbus_config = ModbusConfig {
///     enabled: true,
///     port: 5020,
///     address: "0.0.0.0".to_string(),
/// };
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ModbusConfig {
    /// Flag to enable or disable the gateway.
    pub enabled: bool,

    /// The TCP port the gateway listens on.
    ///
    /// Valid range is 1-65534. Default value is 502, the standard Modbus TCP port.
    pub port: u16,

    /// The network address the gateway binds to.
    ///
    /// Default is "127.0.0.1". Use "0.0.0.0" to bind to all IPv4 interfaces.
    pub address: String,
}

impl Default for ModbusConfig {
    fn default() -> Self {
        Self {
            enabled: false,                   // Disabled by default for safety
            port: 502,                        // Standard Modbus TCP port
            address: "127.0.0.1".to_string(), // Localhost for security
        }
    }
}
