/*
 * Copyright (c) 2025 Dylan Storey
 * Licensed under the Elastic License 2.0.
 * See LICENSE file in the project root for full license text.
 */

//! Version 1 of the gateway API.
//!
//! Route groups: authentication (`/login`, `/register`, ...), the
//! authenticated user's own account (`/user`, `/logout`, ...), app status
//! (`/app/...`), and the admin routes, which are wrapped in the admin
//! authorization middleware.

pub mod admin;
pub mod app;
pub mod auth;
pub mod middleware;
mod openapi;
pub mod users;

use crate::api::AppState;
use crate::upstream::UpstreamError;
use axum::middleware::from_fn_with_state;
use axum::{http::StatusCode, Json, Router};
use heimdall_utils::logging::prelude::*;
use serde_json::{json, Value};

pub fn routes(state: AppState) -> Router<AppState> {
    let admin_routes = admin::routes().layer(from_fn_with_state(
        state.clone(),
        middleware::admin_auth,
    ));

    Router::new()
        .merge(auth::routes())
        .merge(users::routes())
        .merge(app::routes())
        .merge(admin_routes)
        .merge(openapi::configure_openapi())
}

/// Maps an upstream failure to the generic error payload.
///
/// The message comes from the upstream body when one can be extracted,
/// otherwise `fallback`. Internal detail (status codes, transport errors)
/// stays in the logs.
pub(crate) fn upstream_failure(
    status: StatusCode,
    error: UpstreamError,
    fallback: &str,
) -> (StatusCode, Json<Value>) {
    warn!("Upstream call failed: {}", error);
    let message = error
        .upstream_message()
        .unwrap_or_else(|| fallback.to_string());
    (status, Json(json!({ "error": message })))
}

/// Reshapes an upstream session payload into the gateway's session body.
pub(crate) fn session_body(session: &Value) -> Value {
    json!({
        "access_token": session.get("access_token").cloned().unwrap_or(Value::Null),
        "refresh_token": session.get("refresh_token").cloned().unwrap_or(Value::Null),
        "token_type": session.get("token_type").cloned().unwrap_or_else(|| json!("bearer")),
        "expires_in": session.get("expires_in").cloned().unwrap_or(Value::Null),
        "user": session.get("user").cloned().unwrap_or(Value::Null),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_session_body_reshapes_known_fields() {
        let upstream = json!({
            "access_token": "at",
            "refresh_token": "rt",
            "token_type": "bearer",
            "expires_in": 3600,
            "user": {"id": "u1"},
            "provider_token": "should-not-leak"
        });
        let body = session_body(&upstream);
        assert_eq!(body["access_token"], "at");
        assert_eq!(body["expires_in"], 3600);
        assert_eq!(body["user"]["id"], "u1");
        assert!(body.get("provider_token").is_none());
    }

    #[test]
    fn test_session_body_defaults_token_type() {
        let body = session_body(&json!({"access_token": "at"}));
        assert_eq!(body["token_type"], "bearer");
        assert_eq!(body["refresh_token"], Value::Null);
    }

    #[test]
    fn test_upstream_failure_uses_upstream_message() {
        let error = UpstreamError::Status {
            status: 400,
            body: r#"{"msg": "Invalid login credentials"}"#.to_string(),
        };
        let (status, Json(body)) =
            upstream_failure(StatusCode::UNAUTHORIZED, error, "Authentication failed");
        assert_eq!(status, StatusCode::UNAUTHORIZED);
        assert_eq!(body["error"], "Invalid login credentials");
    }

    #[test]
    fn test_upstream_failure_falls_back_to_generic_message() {
        let error = UpstreamError::Status {
            status: 502,
            body: "Bad Gateway".to_string(),
        };
        let (_, Json(body)) = upstream_failure(StatusCode::BAD_REQUEST, error, "Request failed");
        assert_eq!(body["error"], "Request failed");
    }
}
