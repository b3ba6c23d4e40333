// Copyright (c) 2025 Ronan LE MEILLAT, SCTG Development
// This file is part of the rust-npk-monitor project and is licensed under the
// SCTG Development Non-Commercial License v1.0 (see LICENSE.md for details).

//! JSON API
//!
//! | Route | Content |
//! |-------|---------|
//! | `GET /api/sensor_data` | Latest reading, or 503 before the first one |
//! | `GET /api/history/<field>` | N, P or K history, oldest first |
//! | `GET /api/dashboard` | [`DashboardView`] |
//!
//! Every handler works on a snapshot of the [`ReadingStore`]; none of them
//! can delay the acquisition loop beyond the store's short lock.

use rocket::http::Status;
use rocket::request::FromParam;
use rocket::response::status;
use rocket::serde::json::{json, Json, Value};
use rocket::{get, State};
use serde::Serialize;

use super::dashboard::DashboardView;
use crate::sensor::HistoryField;
use crate::utility::{LatestReading, ReadingStore, TimedReading};

impl<'a> FromParam<'a> for HistoryField {
    type Error = &'a str;

    fn from_param(param: &'a str) -> Result<Self, Self::Error> {
        param.parse().map_err(|_| param)
    }
}

/// Body of `GET /api/history/<field>`
#[derive(Debug, Serialize)]
pub struct HistoryResponse {
    pub field: HistoryField,
    pub capacity: usize,
    pub values: Vec<f64>,
}

/// Latest reading with its acquisition time and sequence number
#[get("/sensor_data")]
pub fn sensor_data(
    store: &State<ReadingStore>,
) -> Result<Json<TimedReading>, status::Custom<Json<Value>>> {
    match store.latest() {
        LatestReading::Available(timed) => Ok(Json(timed)),
        LatestReading::NoData => Err(status::Custom(
            Status::ServiceUnavailable,
            Json(json!({ "status": "no_data" })),
        )),
    }
}

/// History of one nutrient
#[get("/history/<field>")]
pub fn history(
    field: Result<HistoryField, &str>,
    store: &State<ReadingStore>,
) -> Result<Json<HistoryResponse>, status::NotFound<Json<Value>>> {
    let field = field.map_err(|unknown| {
        status::NotFound(Json(json!({
            "error": format!("unknown field '{}', expected one of n, p, k", unknown)
        })))
    })?;

    Ok(Json(HistoryResponse {
        field,
        capacity: store.capacity(),
        values: store.history(field),
    }))
}

/// Gauges and charts for the dashboard
#[get("/dashboard")]
pub fn dashboard(store: &State<ReadingStore>) -> Json<DashboardView> {
    Json(DashboardView::from_store(store))
}
