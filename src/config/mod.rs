// Copyright (c) 2025 Ronan LE MEILLAT, SCTG Development
// This file is part of the rust-npk-monitor project and is licensed under the
// SCTG Development Non-Commercial License v1.0 (see LICENSE.md for details).

//! Configuration management for the soil monitor
//!
//! This module provides functionality for loading, validating, and applying
//! configuration settings. The configuration is backed by a YAML file and
//! validated against a JSON schema for robustness.
//!
//! ## Configuration Structure
//!
//! - `sensor`: Serial line to the soil probe
//! - `acquisition`: Poll interval and history size
//! - `visualization`: Settings for the dashboard web server
//! - `modbus`: Settings for the Modbus TCP gateway
//! - `persistence`: Remote store the readings are pushed to
//! - `record_log`: Plain text record of every reading
//!
//! ## Usage
//!
//! ```no_run
//! use rust_npk_monitor::config::Config;
//! use std::path::Path;
//!
//! // Load config from file, creates a default if not found
//! let mut config = Config::from_file(Path::new("config.yaml")).unwrap();
//!
//! // Apply command line overrides if needed
//! config.apply_args(
//!     Some(8081),                        // Web port
//!     Some("0.0.0.0".to_string()),       // Web address
//!     Some("/dev/ttyUSB1".to_string()),  // Serial port
//!     false,                             // Simulated probe
//!     Some(true),                        // Enable Modbus
//!     None,                              // Modbus address
//!     Some(5020),                        // Modbus port
//! );
//!
//! println!("Polling {} every {}ms", config.sensor.port, config.acquisition.interval_ms);
//! ```

pub mod acquisition;
pub mod modbus;
pub mod persistence;
pub mod record_log;
pub mod sensor;
pub mod utils;
pub mod visualization;

use std::fs::{self, File};
use std::io::Write;
use std::path::Path;

use anyhow::{Context, Result};
use log::{debug, error};
use serde::{Deserialize, Serialize};

// Re-export all types for public API
pub use acquisition::AcquisitionConfig;
pub use modbus::ModbusConfig;
pub use persistence::PersistenceConfig;
pub use record_log::RecordLogConfig;
pub use sensor::SensorConfig;
pub use utils::{is_valid_ip_address, output_config_schema, validate_specific_rules};
pub use visualization::VisualizationConfig;

/// JSON schema every configuration file is validated against
pub(crate) const CONFIG_SCHEMA: &str = include_str!("../../resources/config.schema.json");

/// Root configuration structure.
///
/// Every section falls back to its defaults when absent from the file, so an
/// empty document is a valid configuration.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Config {
    /// Serial line to the soil probe
    #[serde(default)]
    pub sensor: SensorConfig,

    /// Poll loop settings
    #[serde(default)]
    pub acquisition: AcquisitionConfig,

    /// Settings for the dashboard web server.
    ///
    /// These settings control network binding and whether the server runs.
    #[serde(default)]
    pub visualization: VisualizationConfig,

    /// Modbus TCP gateway settings
    #[serde(default)]
    pub modbus: ModbusConfig,

    /// Remote persistence settings
    #[serde(default)]
    pub persistence: PersistenceConfig,

    #[serde(default)]
    pub record_log: RecordLogConfig,
}

impl Config {
    /// Helper method to create a sample config file when validation fails
    fn create_sample_config<P: AsRef<Path>>(path: P) -> Result<()> {
        let path = path.as_ref();
        let sample_path = path.with_extension("sample.yaml");
        debug!("Original path: {:?}, Sample path: {:?}", path, sample_path);

        // Create parent directories if they don't exist
        if let Some(parent) = sample_path.parent() {
            if !parent.as_os_str().is_empty() && !parent.exists() {
                debug!("Creating parent directory: {:?}", parent);
                fs::create_dir_all(parent).with_context(|| {
                    format!(
                        "Failed to create parent directory for sample config at {:?}",
                        parent
                    )
                })?;
            }
        }

        Self::default()
            .save_to_file(&sample_path)
            .with_context(|| format!("Failed to save sample config to {:?}", sample_path))?;

        error!(
            "Sample configuration file created at {:?}\nPlease edit and rename it",
            sample_path
        );
        Ok(())
    }

    /// Load configuration from a file
    ///
    /// A missing file is created with the default values. A file failing
    /// validation is left untouched, a `.sample.yaml` with the defaults is
    /// written next to it and an error is returned.
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        if !path.exists() {
            debug!(
                "Configuration file not found at {:?}, creating default",
                path
            );
            let default_config = Self::default();
            default_config.save_to_file(path)?;
            return Ok(default_config);
        }

        debug!("Loading configuration from {:?}", path);
        let contents = fs::read_to_string(path)
            .with_context(|| format!("Failed to read configuration file at {:?}", path))?;

        // First step: convert YAML to a generic Value
        let yaml_value: serde_yml::Value = serde_yml::from_str(&contents)
            .with_context(|| format!("Failed to parse YAML configuration from {:?}", path))?;

        // An empty document means "all defaults"
        let yaml_value = match yaml_value {
            serde_yml::Value::Null => serde_yml::Value::Mapping(Default::default()),
            other => other,
        };

        // Convert to JSON Value for validation
        let json_value = serde_json::to_value(&yaml_value).with_context(|| {
            format!("Failed to convert YAML to JSON for validation: {:?}", path)
        })?;

        let schema: serde_json::Value =
            serde_json::from_str(CONFIG_SCHEMA).context("Failed to parse JSON schema")?;

        let validator = jsonschema::draft202012::options()
            .should_validate_formats(true)
            .build(&schema)?;

        debug!("Validating {} configuration against schema", path.display());
        if let Err(error) = validator.validate(&json_value) {
            error!("Configuration validation error before deserialization");
            Self::create_sample_config(path)?;
            anyhow::bail!("Configuration validation failed: {}", error);
        }

        // Now that YAML has been validated, deserialize to Config
        let config: Config = match serde_yml::from_value(yaml_value) {
            Ok(config) => config,
            Err(err) => {
                error!("Configuration deserialization error: {}", err);
                if let Err(e) = Self::create_sample_config(path) {
                    error!("Failed to create sample config: {}", e);
                }
                return Err(anyhow::anyhow!(
                    "Failed to deserialize configuration from {}: {}",
                    path.display(),
                    err
                ));
            }
        };

        // Perform additional specific validations
        if let Err(err) = utils::validate_specific_rules(&config) {
            error!("Configuration specific validation error: {}", err);
            Self::create_sample_config(path)?;
            return Err(err);
        }

        Ok(config)
    }

    /// Save the configuration to a file
    pub fn save_to_file<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let yaml =
            serde_yml::to_string(self).context("Failed to serialize configuration to YAML")?;

        let mut file = File::create(path.as_ref())
            .with_context(|| format!("Failed to create config file at {:?}", path.as_ref()))?;

        file.write_all(yaml.as_bytes())
            .with_context(|| format!("Failed to write configuration to {:?}", path.as_ref()))?;

        Ok(())
    }

    /// Apply command line arguments to override configuration values.
    ///
    /// Only explicitly provided values override the configuration.
    ///
    /// # Parameters
    ///
    /// * `web_port` - TCP port for the visualization server
    /// * `web_address` - Network address for the visualization server to bind to
    /// * `sensor_port` - Serial device the probe is attached to
    /// * `simulate` - If true, use the simulated probe instead of the serial line
    /// * `modbus_enabled` - Optional flag to enable/disable the Modbus gateway
    /// * `modbus_address` - Optional network address for the Modbus gateway
    /// * `modbus_port` - Optional TCP port for the Modbus gateway
    #[allow(clippy::too_many_arguments)]
    pub fn apply_args(
        &mut self,
        web_port: Option<u16>,
        web_address: Option<String>,
        sensor_port: Option<String>,
        simulate: bool,
        modbus_enabled: Option<bool>,
        modbus_address: Option<String>,
        modbus_port: Option<u16>,
    ) {
        if let Some(web_port) = web_port {
            debug!("Overriding port from command line: {}", web_port);
            self.visualization.port = web_port;
        }

        if let Some(web_address) = web_address {
            debug!("Overriding address from command line: {}", web_address);
            self.visualization.address = web_address;
        }

        if let Some(port) = sensor_port {
            debug!("Overriding serial port from command line: {}", port);
            self.sensor.port = port;
        }

        if simulate {
            debug!("Using simulated probe from command line");
            self.sensor.simulated = true;
        }

        // Apply Modbus settings
        if let Some(enabled) = modbus_enabled {
            debug!("Overriding Modbus enabled from command line: {}", enabled);
            self.modbus.enabled = enabled;
        }
        if let Some(port) = modbus_port {
            debug!("Overriding Modbus port from command line: {}", port);
            self.modbus.port = port;
        }
        if let Some(address) = modbus_address {
            debug!("Overriding Modbus address from command line: {}", address);
            self.modbus.address = address;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_match_probe_settings() {
        let config = Config::default();
        assert_eq!(config.sensor.port, "/dev/ttyUSB0");
        assert_eq!(config.sensor.baud_rate, 4800);
        assert_eq!(config.sensor.read_timeout_ms, 100);
        assert_eq!(config.acquisition.interval_ms, 2000);
        assert_eq!(config.acquisition.history_capacity, 10);
        assert_eq!(config.persistence.connectivity_host, "8.8.8.8");
        assert_eq!(config.persistence.connectivity_port, 53);
        assert!(!config.modbus.enabled);
        assert!(config.record_log.enabled);
    }

    #[test]
    fn test_default_config_passes_schema() {
        let schema: serde_json::Value = serde_json::from_str(CONFIG_SCHEMA).unwrap();
        let validator = jsonschema::draft202012::new(&schema).unwrap();
        let value = serde_json::to_value(Config::default()).unwrap();
        assert!(validator.is_valid(&value));
    }

    #[test]
    fn test_apply_args_overrides_only_given_values() {
        let mut config = Config::default();
        config.apply_args(
            None,
            Some("0.0.0.0".to_string()),
            Some("COM3".to_string()),
            true,
            Some(true),
            None,
            Some(5020),
        );

        assert_eq!(config.visualization.port, 8080);
        assert_eq!(config.visualization.address, "0.0.0.0");
        assert_eq!(config.sensor.port, "COM3");
        assert!(config.sensor.simulated);
        assert!(config.modbus.enabled);
        assert_eq!(config.modbus.address, "127.0.0.1");
        assert_eq!(config.modbus.port, 5020);
    }
}
