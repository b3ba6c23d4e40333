// Copyright (c) 2025 Ronan LE MEILLAT, SCTG Development
// This file is part of the rust-npk-monitor project and is licensed under the
// SCTG Development Non-Commercial License v1.0 (see LICENSE.md for details).

//! Modbus communication module
//!
//! This module republishes the latest soil reading over Modbus TCP so that
//! PLCs and SCADA systems can read it without talking to the serial probe.
//!
//! ## Register Map
//!
//! ### Input Registers (Read-Only)
//!
//! | Register | Content | Scaling |
//! |----------|---------|---------|
//! | 0 | Humidity | ×10 |
//! | 1 | Temperature | ×10 |
//! | 2 | Reserved, always 0 | - |
//! | 3 | pH | ×10 |
//! | 4 | Nitrogen | ×10 |
//! | 5 | Phosphorus | ×10 |
//! | 6 | Potassium | ×10 |
//! | 7 | Status (0 = no data yet, 1 = reading available) | - |
//! | 8 | Acquisition timestamp, low word (UNIX epoch seconds) | - |
//! | 9 | Acquisition timestamp, high word | - |
//!
//! Registers 0 to 6 mirror the probe's own layout. There are no holding
//! registers: every other function code is answered with `IllegalFunction`.

pub mod modbus_server;
pub use modbus_server::{input_register_image, serve, NpkModbusServer, INPUT_REGISTER_COUNT};
