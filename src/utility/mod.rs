// Copyright (c) 2025 Ronan LE MEILLAT, SCTG Development
// This file is part of the rust-npk-monitor project and is licensed under the
// SCTG Development Non-Commercial License v1.0 (see LICENSE.md for details).

//! Utility module for common utilities used throughout the project

pub mod data_source;

// Re-exports for use in other modules
pub use data_source::{LatestReading, ReadingStore, TimedReading, DEFAULT_HISTORY_CAPACITY};
