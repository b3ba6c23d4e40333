// Copyright (c) 2025 Ronan LE MEILLAT, SCTG Development
// This file is part of the rust-npk-monitor project and is licensed under the
// SCTG Development Non-Commercial License v1.0 (see LICENSE.md for details).

//! Rust NPK monitor library
//!
//! Polls a soil NPK / pH / humidity / temperature probe over a Modbus-RTU
//! serial line and shares the readings with a web dashboard, a Modbus TCP
//! gateway, a remote store and a plain text log.
//!
//! ## Data flow
//!
//! ```text
//! acquisition ──► sensor::transport ──► sensor::frame ──► utility::ReadingStore
//!                                                              │
//!                      visualization / modbus / persistence ◄──┘
//! ```

pub mod acquisition;
pub mod config;
pub mod daemon;
pub mod modbus;
pub mod persistence;
pub mod sensor;
pub mod utility;
pub mod visualization;

pub use sensor::{HistoryField, Reading};
pub use utility::{LatestReading, ReadingStore, TimedReading};
