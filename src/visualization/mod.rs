// Copyright (c) 2025 Ronan LE MEILLAT, SCTG Development
// This file is part of the rust-npk-monitor project and is licensed under the
// SCTG Development Non-Commercial License v1.0 (see LICENSE.md for details).
//!
//! Visualization module
//!
//! This module serves the readings over HTTP: a JSON API, a dashboard view
//! model and a small embedded web page using both.

pub mod api;
pub mod cors;
pub mod dashboard;
pub mod server;

pub use dashboard::{DashboardView, Gauge, Series};
pub use server::build_rocket;
