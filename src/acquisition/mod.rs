// Copyright (c) 2025 Ronan LE MEILLAT, SCTG Development
// This file is part of the rust-npk-monitor project and is licensed under the
// SCTG Development Non-Commercial License v1.0 (see LICENSE.md for details).

//! Soil reading acquisition module
//!
//! This module polls the soil probe on a fixed interval, decodes its answers
//! and publishes them to the shared [`ReadingStore`](crate::utility::ReadingStore).

use log::info;
use std::sync::Arc;

pub mod daemon;
pub mod record_log;

pub use daemon::{AcquisitionState, AcquisitionStats, CycleError, SensorAcquisitionDaemon};
pub use record_log::RecordLog;

use crate::config::SensorConfig;
use crate::sensor::{SensorTransport, SerialTransport, SimulatedSensor};

/// Get the transport matching the sensor configuration
pub fn get_sensor_transport(config: &SensorConfig) -> Arc<dyn SensorTransport> {
    if config.simulated {
        info!("Using simulated soil probe");
        Arc::new(SimulatedSensor::new())
    } else {
        info!(
            "Using soil probe on {} at {} baud",
            config.port, config.baud_rate
        );
        Arc::new(SerialTransport::from_config(config))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_transport_selection() {
        let mut config = SensorConfig::default();
        assert_eq!(get_sensor_transport(&config).describe(), "/dev/ttyUSB0@4800");

        config.simulated = true;
        assert_eq!(get_sensor_transport(&config).describe(), "simulated");
    }
}
