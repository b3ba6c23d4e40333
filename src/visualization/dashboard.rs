// Copyright (c) 2025 Ronan LE MEILLAT, SCTG Development
// This file is part of the rust-npk-monitor project and is licensed under the
// SCTG Development Non-Commercial License v1.0 (see LICENSE.md for details).

//! Dashboard view model
//!
//! Turns a store snapshot into what a small display needs: three half-donut
//! gauges (temperature, humidity, pH) and three line charts (N, P, K).
//! Drawing is left to the client.

use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::sensor::HistoryField;
use crate::utility::{LatestReading, ReadingStore};

/// Fixed y-range of the nutrient charts
pub const SERIES_Y_RANGE: (f64, f64) = (0.0, 20.0);

/// A half-donut gauge
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Gauge {
    pub name: &'static str,
    pub label: &'static str,
    pub unit: &'static str,
    /// Current value, `None` before the first reading
    pub value: Option<f64>,
    pub max: f64,
    /// Filled part of the gauge, within 0..=1
    pub fraction: f64,
    pub color: &'static str,
}

impl Gauge {
    fn new(
        name: &'static str,
        label: &'static str,
        unit: &'static str,
        value: Option<f64>,
        max: f64,
        color: &'static str,
    ) -> Self {
        Self {
            name,
            label,
            unit,
            value,
            max,
            fraction: value.map_or(0.0, |v| fill_fraction(v, max)),
            color,
        }
    }
}

/// A nutrient line chart
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Series {
    pub field: HistoryField,
    pub label: &'static str,
    /// Oldest sample first
    pub values: Vec<f64>,
    pub y_min: f64,
    pub y_max: f64,
    pub color: &'static str,
}

/// Everything the dashboard draws
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DashboardView {
    pub available: bool,
    pub acquired_at: Option<DateTime<Utc>>,
    pub sequence: Option<u64>,
    pub gauges: Vec<Gauge>,
    pub series: Vec<Series>,
}

/// Share of a gauge to fill for `value` out of `max`, clamped to 0..=1
pub fn fill_fraction(value: f64, max: f64) -> f64 {
    if max <= 0.0 || !value.is_finite() {
        return 0.0;
    }
    (value / max).clamp(0.0, 1.0)
}

impl DashboardView {
    /// Build the view from a snapshot of `store`
    pub fn from_store(store: &ReadingStore) -> Self {
        let latest = store.latest();
        let timed = latest.as_option();
        let reading = timed.map(|t| t.reading);

        let gauges = vec![
            Gauge::new(
                "temperature",
                "Temperature",
                "°C",
                reading.map(|r| r.temperature),
                100.0,
                "#ff0000",
            ),
            Gauge::new(
                "humidity",
                "Humidity",
                "%",
                reading.map(|r| r.humidity),
                100.0,
                "#0000ff",
            ),
            Gauge::new("ph", "pH", "", reading.map(|r| r.ph), 14.0, "#00ff00"),
        ];

        let series = HistoryField::ALL
            .iter()
            .map(|&field| Series {
                field,
                label: match field {
                    HistoryField::N => "N",
                    HistoryField::P => "P",
                    HistoryField::K => "K",
                },
                values: store.history(field),
                y_min: SERIES_Y_RANGE.0,
                y_max: SERIES_Y_RANGE.1,
                color: match field {
                    HistoryField::N => "#800080",
                    HistoryField::P => "#ffff00",
                    HistoryField::K => "#00ffff",
                },
            })
            .collect();

        Self {
            available: matches!(latest, LatestReading::Available(_)),
            acquired_at: timed.map(|t| t.acquired_at),
            sequence: timed.map(|t| t.sequence),
            gauges,
            series,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sensor::Reading;

    #[test]
    fn test_fill_fraction_is_clamped() {
        assert_eq!(fill_fraction(50.0, 100.0), 0.5);
        assert_eq!(fill_fraction(7.0, 14.0), 0.5);
        assert_eq!(fill_fraction(120.0, 100.0), 1.0);
        assert_eq!(fill_fraction(-5.0, 100.0), 0.0);
        assert_eq!(fill_fraction(5.0, 0.0), 0.0);
    }

    #[test]
    fn test_empty_store_gives_empty_view() {
        let view = DashboardView::from_store(&ReadingStore::default());
        assert!(!view.available);
        assert_eq!(view.sequence, None);
        assert!(view.gauges.iter().all(|g| g.value.is_none() && g.fraction == 0.0));
        assert!(view.series.iter().all(|s| s.values.is_empty()));
    }

    #[test]
    fn test_view_reflects_latest_reading() {
        let store = ReadingStore::new(10);
        store.publish(Reading {
            humidity: 65.2,
            temperature: 25.0,
            ph: 7.0,
            n: 3.2,
            p: 5.8,
            k: 12.0,
        });

        let view = DashboardView::from_store(&store);
        assert!(view.available);
        assert_eq!(view.sequence, Some(1));

        let ph = view.gauges.iter().find(|g| g.name == "ph").unwrap();
        assert_eq!(ph.max, 14.0);
        assert_eq!(ph.fraction, 0.5);
        let temperature = view.gauges.iter().find(|g| g.name == "temperature").unwrap();
        assert_eq!(temperature.fraction, 0.25);

        let k = view.series.iter().find(|s| s.field == HistoryField::K).unwrap();
        assert_eq!(k.values, vec![12.0]);
        assert_eq!((k.y_min, k.y_max), (0.0, 20.0));
    }
}
