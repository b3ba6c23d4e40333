// Copyright (c) 2025 Ronan LE MEILLAT, SCTG Development
// This file is part of the rust-npk-monitor project and is licensed under the
// SCTG Development Non-Commercial License v1.0 (see LICENSE.md for details).

//! Soil probe access
//!
//! This module talks to the soil NPK / pH / humidity / temperature probe.
//! The probe answers a single fixed Modbus-RTU "read holding registers"
//! query over a serial line; everything needed to build that query, move it
//! across the wire and turn the answer into a [`Reading`] lives here.
//!
//! ## Components
//!
//! - [`frame`]: request construction, CRC16 and response decoding (pure functions)
//! - [`transport`]: the [`SensorTransport`] seam and its serial-port implementation
//! - [`simulated`]: a transport that synthesises valid probe answers without hardware
//!
//! ## Register layout
//!
//! | Register | Field | Scaling |
//! |----------|-------|---------|
//! | 0 | Humidity | ÷10 |
//! | 1 | Temperature | ÷10 |
//! | 2 | (unused) | - |
//! | 3 | pH | ÷10 |
//! | 4 | Nitrogen (N) | ÷10 |
//! | 5 | Phosphorus (P) | ÷10 |
//! | 6 | Potassium (K) | ÷10 |

pub mod frame;
pub mod simulated;
pub mod transport;

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

pub use frame::{
    build_request, compute_crc16, decode_response, encode_response, FrameError, RequestFrame,
    REGISTER_COUNT, REQUEST_LEN, RESPONSE_LEN,
};
pub use simulated::SimulatedSensor;
pub use transport::{SensorTransport, SerialTransport, TransportError};

/// One decoded probe answer.
///
/// All six fields come from the same response frame. A `Reading` is never
/// modified after construction; newer answers replace it as a whole.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Reading {
    /// Soil humidity in percent
    pub humidity: f64,
    /// Soil temperature in degrees Celsius
    pub temperature: f64,
    /// Soil pH
    pub ph: f64,
    /// Nitrogen content
    pub n: f64,
    /// Phosphorus content
    pub p: f64,
    /// Potassium content
    pub k: f64,
}

impl Reading {
    /// Build a reading from the seven raw probe registers.
    ///
    /// Register 2 is not used by the probe: pH is read from register 3.
    pub fn from_registers(registers: &[u16; REGISTER_COUNT as usize]) -> Self {
        let scaled = |index: usize| f64::from(registers[index]) / 10.0;
        Self {
            humidity: scaled(0),
            temperature: scaled(1),
            ph: scaled(3),
            n: scaled(4),
            p: scaled(5),
            k: scaled(6),
        }
    }

    /// Value of one of the nutrient fields kept in history
    pub fn nutrient(&self, field: HistoryField) -> f64 {
        match field {
            HistoryField::N => self.n,
            HistoryField::P => self.p,
            HistoryField::K => self.k,
        }
    }
}

/// Nutrient fields for which a bounded history is kept
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum HistoryField {
    N,
    P,
    K,
}

impl HistoryField {
    pub const ALL: [HistoryField; 3] = [HistoryField::N, HistoryField::P, HistoryField::K];

    pub fn as_str(&self) -> &'static str {
        match self {
            HistoryField::N => "n",
            HistoryField::P => "p",
            HistoryField::K => "k",
        }
    }
}

impl fmt::Display for HistoryField {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for HistoryField {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "n" | "nitrogen" => Ok(HistoryField::N),
            "p" | "phosphorus" => Ok(HistoryField::P),
            "k" | "potassium" => Ok(HistoryField::K),
            other => anyhow::bail!("Unknown history field: {}", other),
        }
    }
}
