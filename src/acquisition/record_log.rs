// Copyright (c) 2025 Ronan LE MEILLAT, SCTG Development
// This file is part of the rust-npk-monitor project and is licensed under the
// SCTG Development Non-Commercial License v1.0 (see LICENSE.md for details).

//! Plain text record of successful acquisitions
//!
//! One line per reading:
//! `2025-06-01 14:03:22, 23.1, 65.2, 6.8, 3.2, 5.8, 12.0`
//! (local time, temperature, humidity, pH, N, P, K).

use anyhow::{Context, Result};
use chrono::Local;
use std::fs::{self, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};

use crate::utility::TimedReading;

/// Append-only file of acquired readings
#[derive(Debug, Clone)]
pub struct RecordLog {
    path: PathBuf,
}

impl RecordLog {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Append one line for `timed`, creating the file and its parent
    /// directories if needed
    pub fn append(&self, timed: &TimedReading) -> Result<()> {
        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent).with_context(|| {
                    format!("Failed to create log directory {}", parent.display())
                })?;
            }
        }

        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)
            .with_context(|| format!("Failed to open record log {}", self.path.display()))?;

        writeln!(file, "{}", format_record_line(timed))
            .with_context(|| format!("Failed to write record log {}", self.path.display()))?;
        Ok(())
    }
}

/// Format one record line, without the trailing newline
pub fn format_record_line(timed: &TimedReading) -> String {
    let reading = &timed.reading;
    format!(
        "{}, {:.1}, {:.1}, {:.1}, {:.1}, {:.1}, {:.1}",
        timed
            .acquired_at
            .with_timezone(&Local)
            .format("%Y-%m-%d %H:%M:%S"),
        reading.temperature,
        reading.humidity,
        reading.ph,
        reading.n,
        reading.p,
        reading.k
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sensor::Reading;
    use crate::utility::ReadingStore;
    use tempfile::tempdir;

    fn sample() -> Reading {
        Reading::from_registers(&[652, 231, 0, 68, 32, 58, 120])
    }

    #[test]
    fn test_record_line_layout() {
        let store = ReadingStore::default();
        let timed = store.publish(sample());
        let line = format_record_line(&timed);

        let fields: Vec<&str> = line.split(", ").collect();
        assert_eq!(fields.len(), 7);
        assert_eq!(fields[0].len(), "2025-01-01 00:00:00".len());
        assert_eq!(&fields[1..], &["23.1", "65.2", "6.8", "3.2", "5.8", "12.0"]);
    }

    #[test]
    fn test_append_creates_directories_and_accumulates() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("log").join("sensor_log.log");
        let log = RecordLog::new(&path);
        let store = ReadingStore::default();

        log.append(&store.publish(sample())).unwrap();
        log.append(&store.publish(sample())).unwrap();

        let content = fs::read_to_string(&path).unwrap();
        assert_eq!(content.lines().count(), 2);
        assert!(content.lines().all(|l| l.ends_with("3.2, 5.8, 12.0")));
    }

    #[test]
    fn test_append_reports_unwritable_path() {
        let dir = tempdir().unwrap();
        // A directory cannot be opened for appending
        let log = RecordLog::new(dir.path());
        let store = ReadingStore::default();
        assert!(log.append(&store.publish(sample())).is_err());
    }
}
