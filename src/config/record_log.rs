// Copyright (c) 2025 Ronan LE MEILLAT, SCTG Development
// This file is part of the rust-npk-monitor project and is licensed under the
// SCTG Development Non-Commercial License v1.0 (see LICENSE.md for details).

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Configuration of the plain text record of acquired readings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RecordLogConfig {
    #[serde(default = "default_enabled")]
    pub enabled: bool,

    /// File the lines are appended to; parent directories are created
    #[serde(default = "default_path")]
    pub path: PathBuf,
}

fn default_enabled() -> bool {
    true
}

fn default_path() -> PathBuf {
    PathBuf::from("log/sensor_log.log")
}

impl Default for RecordLogConfig {
    fn default() -> Self {
        Self {
            enabled: default_enabled(),
            path: default_path(),
        }
    }
}
