// Copyright (c) 2025 Ronan LE MEILLAT, SCTG Development
// This file is part of the rust-npk-monitor project and is licensed under the
// SCTG Development Non-Commercial License v1.0 (see LICENSE.md for details).

use rocket::figment::Figment;
use rocket::response::content::RawHtml;
use rocket::{get, options, routes, Build, Rocket};
use std::path::PathBuf;

use super::api;
use super::cors::CORS;
use crate::utility::ReadingStore;

/// Single page dashboard polling the JSON API
const INDEX_HTML: &str = include_str!("../../resources/index.html");

#[get("/")]
async fn index() -> RawHtml<&'static str> {
    RawHtml(INDEX_HTML)
}

// Answers CORS preflight requests
#[options("/<_path..>")]
async fn options(_path: PathBuf) -> Result<(), std::io::Error> {
    Ok(())
}

/// Build the Rocket instance serving the dashboard and the JSON API.
///
/// `store` is shared with the acquisition loop; the server only reads it.
pub async fn build_rocket(figment: Figment, store: ReadingStore) -> Rocket<Build> {
    rocket::custom(figment)
        .attach(CORS)
        .mount("/", routes![index, options])
        .mount("/api", routes![api::sensor_data, api::history, api::dashboard])
        .manage(store)
}
