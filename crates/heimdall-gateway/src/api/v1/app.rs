/*
 * Copyright (c) 2025 Dylan Storey
 * Licensed under the Elastic License 2.0.
 * See LICENSE file in the project root for full license text.
 */

//! App status routes.
//!
//! Version and maintenance status come from the gateway's own configuration,
//! not the upstream; these routes exist so mobile clients have a single host
//! to ask.

use crate::api::AppState;
use axum::{extract::State, routing::get, Json, Router};
use serde_json::{json, Value};

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/app/version", get(version))
        .route("/app/maintenance", get(maintenance))
}

/// Returns the current released Android app version.
#[utoipa::path(
    get,
    path = "/api/v1/app/version",
    tag = "app",
    responses((status = 200, description = "Current app version"))
)]
pub(crate) async fn version(State(state): State<AppState>) -> Json<Value> {
    Json(json!({
        "platform": "android",
        "version": state.settings.app.android_version,
        "source": "config",
    }))
}

/// Returns whether the app is in maintenance mode.
#[utoipa::path(
    get,
    path = "/api/v1/app/maintenance",
    tag = "app",
    responses((status = 200, description = "Maintenance flag and optional message"))
)]
pub(crate) async fn maintenance(State(state): State<AppState>) -> Json<Value> {
    Json(json!({
        "maintenance": state.settings.app.maintenance,
        "message": state.settings.app.maintenance_message,
        "source": "config",
    }))
}
