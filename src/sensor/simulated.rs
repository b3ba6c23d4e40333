// Copyright (c) 2025 Ronan LE MEILLAT, SCTG Development
// This file is part of the rust-npk-monitor project and is licensed under the
// SCTG Development Non-Commercial License v1.0 (see LICENSE.md for details).

//! Simulated soil probe
//!
//! Produces valid probe answers around plausible soil values, drifting a
//! little on every exchange, so the whole pipeline can run without hardware.

use std::sync::Mutex;

use rand::Rng;

use super::frame::{encode_response, RequestFrame, REGISTER_COUNT};
use super::transport::{SensorTransport, TransportError};

/// Values the simulated probe starts from, in register units (×10)
const INITIAL_REGISTERS: [u16; REGISTER_COUNT as usize] = [652, 231, 0, 68, 32, 58, 120];

/// Upper bound of each register, in register units
const REGISTER_LIMITS: [u16; REGISTER_COUNT as usize] = [1000, 800, 0, 140, 200, 200, 200];

/// Largest change applied to a register between two exchanges
const MAX_STEP: i32 = 3;

/// Transport answering every request with a synthetic frame
#[derive(Debug)]
pub struct SimulatedSensor {
    registers: Mutex<[u16; REGISTER_COUNT as usize]>,
}

impl SimulatedSensor {
    pub fn new() -> Self {
        Self::with_registers(INITIAL_REGISTERS)
    }

    /// Start from explicit register values
    pub fn with_registers(registers: [u16; REGISTER_COUNT as usize]) -> Self {
        Self {
            registers: Mutex::new(registers),
        }
    }

    fn next_registers(&self) -> [u16; REGISTER_COUNT as usize] {
        let mut registers = self
            .registers
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        let mut rng = rand::rng();

        for (register, limit) in registers.iter_mut().zip(REGISTER_LIMITS) {
            if limit == 0 {
                continue;
            }
            let step = rng.random_range(-MAX_STEP..=MAX_STEP);
            *register = (i32::from(*register) + step).clamp(0, i32::from(limit)) as u16;
        }
        *registers
    }
}

impl Default for SimulatedSensor {
    fn default() -> Self {
        Self::new()
    }
}

impl SensorTransport for SimulatedSensor {
    fn exchange(&self, _request: &RequestFrame) -> Result<Vec<u8>, TransportError> {
        Ok(encode_response(&self.next_registers()))
    }

    fn describe(&self) -> String {
        "simulated".to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sensor::{build_request, decode_response};

    #[test]
    fn test_simulated_frames_decode() {
        let sensor = SimulatedSensor::new();
        let request = build_request();
        for _ in 0..50 {
            let bytes = sensor.exchange(&request).unwrap();
            let reading = decode_response(&bytes).unwrap();
            assert!((0.0..=100.0).contains(&reading.humidity));
            assert!((0.0..=14.0).contains(&reading.ph));
        }
    }

    #[test]
    fn test_simulated_values_stay_in_range() {
        let sensor = SimulatedSensor::with_registers([0, 800, 0, 140, 0, 200, 1]);
        let request = build_request();
        for _ in 0..200 {
            let reading = decode_response(&sensor.exchange(&request).unwrap()).unwrap();
            assert!(reading.humidity >= 0.0);
            assert!(reading.temperature <= 80.0);
            assert!(reading.ph <= 14.0);
            assert!(reading.p <= 20.0);
        }
    }
}
