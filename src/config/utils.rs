// Copyright (c) 2025 Ronan LE MEILLAT, SCTG Development
// This file is part of the rust-npk-monitor project and is licensed under the
// SCTG Development Non-Commercial License v1.0 (see LICENSE.md for details).

//! Configuration utilities
//!
//! This module provides utility functions for working with configuration
//! settings, including validation and schema management.

use anyhow::{Context, Result};
use log::{debug, warn};

use super::{Config, CONFIG_SCHEMA};

/// Output the embedded JSON schema to the console.
///
/// This function is called when the `--show-config-schema` flag is provided
/// on the command line.
///
/// # Example
///
/// ```bash
/// ./rust_npk_monitor --show-config-schema > config_schema.json
/// ```
pub fn output_config_schema() -> Result<()> {
    let schema: serde_json::Value =
        serde_json::from_str(CONFIG_SCHEMA).context("Failed to parse JSON schema")?;

    let formatted_schema =
        serde_json::to_string_pretty(&schema).context("Failed to format JSON schema")?;

    println!("{}", formatted_schema);

    Ok(())
}

/// Check if a string is a valid IP address
///
/// Validates that a string represents a valid IPv4 or IPv6 address,
/// or is one of the special values like "localhost" or "0.0.0.0".
pub fn is_valid_ip_address(addr: &str) -> bool {
    if addr.parse::<std::net::IpAddr>().is_ok() {
        return true;
    }

    // Special cases
    matches!(addr, "localhost" | "::" | "::0" | "0.0.0.0")
}

/// Validates the configuration against rules the JSON schema cannot express.
///
/// # Validation Rules
///
/// - **Serial line**: the port name is not empty, baud rate and read timeout are positive
/// - **Acquisition**: the interval is positive and at least one sample of history is kept
/// - **Port Range**: enabled servers use a port within 1-65534
/// - **Persistence**: when enabled, the endpoint is an absolute http(s) URL
/// - **IP Address Format**: unusual bind addresses only produce a warning
pub fn validate_specific_rules(config: &Config) -> Result<()> {
    debug!("Performing additional validation checks");

    if config.sensor.port.trim().is_empty() && !config.sensor.simulated {
        anyhow::bail!("Serial port name is empty");
    }
    if config.sensor.baud_rate == 0 {
        anyhow::bail!("Invalid baud rate: {}", config.sensor.baud_rate);
    }
    if config.sensor.read_timeout_ms == 0 {
        anyhow::bail!("Serial read timeout must be greater than zero");
    }

    if config.acquisition.interval_ms == 0 {
        anyhow::bail!("Acquisition interval must be greater than zero");
    }
    if config.acquisition.history_capacity == 0 {
        anyhow::bail!("History capacity must be at least 1");
    }

    if config.visualization.enabled
        && (config.visualization.port < 1 || config.visualization.port > 65534)
    {
        anyhow::bail!("Invalid port number: {}", config.visualization.port);
    }
    if config.modbus.enabled && (config.modbus.port < 1 || config.modbus.port > 65534) {
        anyhow::bail!("Invalid Modbus port number: {}", config.modbus.port);
    }

    for (name, address) in [
        ("visualization", &config.visualization.address),
        ("modbus", &config.modbus.address),
    ] {
        if !is_valid_ip_address(address) {
            // Hostnames are accepted, just flagged
            warn!("Potentially invalid {} address format: {}", name, address);
        }
    }

    if config.persistence.enabled {
        let url = reqwest::Url::parse(&config.persistence.endpoint).with_context(|| {
            format!(
                "Invalid persistence endpoint: {}",
                config.persistence.endpoint
            )
        })?;
        if !matches!(url.scheme(), "http" | "https") {
            anyhow::bail!(
                "Persistence endpoint must use http or https: {}",
                config.persistence.endpoint
            );
        }
        if config.persistence.interval_ms == 0 {
            anyhow::bail!("Persistence interval must be greater than zero");
        }
    }

    Ok(())
}
