/*
 * Copyright (c) 2025 Dylan Storey
 * Licensed under the Elastic License 2.0.
 * See LICENSE file in the project root for full license text.
 */

//! # API Routes Aggregator Module
//!
//! This module aggregates all API routes and provides a function to configure the main router.
//! It also owns the shared application state handed to every handler.

pub mod v1;

use crate::authz::RolePolicy;
use crate::upstream::IdentityDataApi;
use axum::{response::IntoResponse, routing::get, Json, Router};
use heimdall_utils::Settings;
use hyper::StatusCode;
use serde_json::json;
use std::sync::Arc;

/// Shared application state.
///
/// Built once at startup; the upstream client and the role policy are
/// constructed a single time and cloned into every request by reference
/// count, never rebuilt per request.
#[derive(Clone)]
pub struct AppState {
    /// Upstream identity & data API capability.
    pub upstream: Arc<dyn IdentityDataApi>,
    /// Full application settings.
    pub settings: Arc<Settings>,
    /// Role policy derived from the `[authz]` settings section.
    pub policy: RolePolicy,
}

impl AppState {
    pub fn new(upstream: Arc<dyn IdentityDataApi>, settings: Arc<Settings>) -> Self {
        let policy = RolePolicy::from_settings(&settings.authz);
        Self {
            upstream,
            settings,
            policy,
        }
    }
}

/// Configures and returns the main application router with all API routes.
///
/// Merges the versioned API routes and adds the health check endpoints and
/// the JSON 404 fallback.
pub fn configure_api_routes(state: AppState) -> Router<AppState> {
    Router::new()
        .nest("/api/v1", v1::routes(state))
        .route("/healthz", get(healthz))
        .route("/readyz", get(readyz))
        .fallback(not_found)
}

/// Health check endpoint handler
///
/// Returns a 200 OK status code with "OK" in the body.
async fn healthz() -> impl IntoResponse {
    (StatusCode::OK, "OK")
}

/// Ready check endpoint handler
///
/// Returns a 200 OK status code with "Ready" in the body.
async fn readyz() -> impl IntoResponse {
    (StatusCode::OK, "Ready")
}

/// Fallback handler for unknown routes.
async fn not_found() -> impl IntoResponse {
    (
        StatusCode::NOT_FOUND,
        Json(json!({ "error": "Page not found" })),
    )
}
