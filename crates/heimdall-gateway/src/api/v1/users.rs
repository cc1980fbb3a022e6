/*
 * Copyright (c) 2025 Dylan Storey
 * Licensed under the Elastic License 2.0.
 * See LICENSE file in the project root for full license text.
 */

//! Routes for the authenticated user's own account.

use crate::api::v1::middleware::bearer_token;
use crate::api::v1::{session_body, upstream_failure};
use crate::api::AppState;
use crate::validation;
use axum::{
    extract::State,
    http::{HeaderMap, StatusCode},
    routing::post,
    Json, Router,
};
use serde::Deserialize;
use serde_json::{json, Map, Value};
use utoipa::ToSchema;
use validator::Validate;

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/user", post(me))
        .route("/user/update", post(update))
        .route("/logout", post(logout))
        .route("/refresh-token", post(refresh_token))
}

/// Body for `POST /user/update`. All fields optional; only present fields
/// are validated and forwarded.
#[derive(Debug, Deserialize, Validate, ToSchema)]
pub struct UpdateUserRequest {
    #[validate(email(message = "invalid e-mail address"))]
    pub email: Option<String>,
    #[validate(length(min = 6, message = "password must be at least 6 characters"))]
    pub password: Option<String>,
    /// Arbitrary user metadata to merge into the account.
    #[schema(value_type = Object)]
    pub metadata: Option<Value>,
}

/// Body for `POST /refresh-token`.
#[derive(Debug, Deserialize, Validate, ToSchema)]
pub struct RefreshTokenRequest {
    #[validate(length(min = 1, message = "refresh_token is required"))]
    pub refresh_token: String,
}

fn token_or_unauthorized(headers: &HeaderMap) -> Result<String, (StatusCode, Json<Value>)> {
    bearer_token(headers).ok_or((
        StatusCode::UNAUTHORIZED,
        Json(json!({ "error": "Token not provided" })),
    ))
}

/// Returns the authenticated user's record.
#[utoipa::path(
    post,
    path = "/api/v1/user",
    tag = "users",
    responses(
        (status = 200, description = "Authenticated user returned"),
        (status = 401, description = "Missing or invalid bearer token"),
    ),
    security(("bearer_auth" = []))
)]
pub(crate) async fn me(
    State(state): State<AppState>,
    headers: HeaderMap,
) -> Result<Json<Value>, (StatusCode, Json<Value>)> {
    let token = token_or_unauthorized(&headers)?;

    match state.upstream.resolve_identity(&token).await {
        Ok(user) => Ok(Json(json!({ "user": user }))),
        Err(e) => Err(upstream_failure(
            StatusCode::UNAUTHORIZED,
            e,
            "Failed to fetch the authenticated user",
        )),
    }
}

/// Updates the authenticated user's email, password, or metadata.
#[utoipa::path(
    post,
    path = "/api/v1/user/update",
    tag = "users",
    request_body = UpdateUserRequest,
    responses(
        (status = 200, description = "User updated"),
        (status = 400, description = "Upstream rejected the update"),
        (status = 401, description = "Missing or invalid bearer token"),
        (status = 422, description = "Payload failed validation"),
    ),
    security(("bearer_auth" = []))
)]
pub(crate) async fn update(
    State(state): State<AppState>,
    headers: HeaderMap,
    Json(payload): Json<UpdateUserRequest>,
) -> Result<Json<Value>, (StatusCode, Json<Value>)> {
    let token = token_or_unauthorized(&headers)?;
    validation::check(&payload)?;

    let mut changes = Map::new();
    if let Some(email) = payload.email {
        changes.insert("email".to_string(), Value::String(email));
    }
    if let Some(password) = payload.password {
        changes.insert("password".to_string(), Value::String(password));
    }
    if let Some(metadata) = payload.metadata {
        changes.insert("data".to_string(), metadata);
    }

    match state
        .upstream
        .update_user(&token, Value::Object(changes))
        .await
    {
        Ok(user) => Ok(Json(json!({ "user": user }))),
        Err(e) => Err(upstream_failure(
            StatusCode::BAD_REQUEST,
            e,
            "Failed to update user data",
        )),
    }
}

/// Revokes the caller's current session.
#[utoipa::path(
    post,
    path = "/api/v1/logout",
    tag = "users",
    responses(
        (status = 200, description = "Session revoked"),
        (status = 400, description = "Upstream rejected the logout"),
        (status = 401, description = "Missing or invalid bearer token"),
    ),
    security(("bearer_auth" = []))
)]
pub(crate) async fn logout(
    State(state): State<AppState>,
    headers: HeaderMap,
) -> Result<Json<Value>, (StatusCode, Json<Value>)> {
    let token = token_or_unauthorized(&headers)?;

    match state.upstream.sign_out(&token).await {
        Ok(()) => Ok(Json(json!({ "message": "Logged out successfully" }))),
        Err(e) => Err(upstream_failure(
            StatusCode::BAD_REQUEST,
            e,
            "Failed to log out",
        )),
    }
}

/// Exchanges a refresh token for a new session.
#[utoipa::path(
    post,
    path = "/api/v1/refresh-token",
    tag = "users",
    request_body = RefreshTokenRequest,
    responses(
        (status = 200, description = "New session payload returned"),
        (status = 401, description = "Refresh token rejected"),
        (status = 422, description = "Payload failed validation"),
    )
)]
pub(crate) async fn refresh_token(
    State(state): State<AppState>,
    Json(payload): Json<RefreshTokenRequest>,
) -> Result<Json<Value>, (StatusCode, Json<Value>)> {
    validation::check(&payload)?;

    match state
        .upstream
        .refresh_session(&payload.refresh_token)
        .await
    {
        Ok(session) => Ok(Json(session_body(&session))),
        Err(e) => Err(upstream_failure(
            StatusCode::UNAUTHORIZED,
            e,
            "Failed to refresh the session",
        )),
    }
}
