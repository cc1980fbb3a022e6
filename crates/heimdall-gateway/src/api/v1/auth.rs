/*
 * Copyright (c) 2025 Dylan Storey
 * Licensed under the Elastic License 2.0.
 * See LICENSE file in the project root for full license text.
 */

//! Authentication routes for the API v1.
//!
//! These endpoints validate the inbound payload and forward the call to the
//! upstream Auth API; nothing is decided locally. Upstream failures come
//! back as a generic `{"error": ...}` payload.

use crate::api::v1::middleware::bearer_token;
use crate::api::v1::{session_body, upstream_failure};
use crate::api::AppState;
use crate::validation;
use axum::{
    extract::{Query, State},
    http::{HeaderMap, StatusCode},
    response::Html,
    routing::{get, post},
    Json, Router,
};
use serde::Deserialize;
use serde_json::{json, Value};
use utoipa::ToSchema;
use validator::Validate;

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/login", post(login))
        .route("/register", post(register))
        .route("/reset-password", post(reset_password))
        .route("/profile", post(profile))
        .route("/auth/callback", get(auth_callback))
}

/// Body for `POST /login`.
#[derive(Debug, Deserialize, Validate, ToSchema)]
pub struct LoginRequest {
    #[validate(email(message = "invalid e-mail address"))]
    pub email: String,
    #[validate(length(min = 6, message = "password must be at least 6 characters"))]
    pub password: String,
}

/// Body for `POST /register`.
#[derive(Debug, Deserialize, Validate, ToSchema)]
pub struct RegisterRequest {
    #[validate(email(message = "invalid e-mail address"))]
    pub email: String,
    #[validate(length(min = 6, message = "password must be at least 6 characters"))]
    pub password: String,
    /// Arbitrary user metadata stored alongside the account.
    #[schema(value_type = Object)]
    pub metadata: Option<Value>,
}

/// Body for `POST /reset-password`.
#[derive(Debug, Deserialize, Validate, ToSchema)]
pub struct ResetPasswordRequest {
    #[validate(email(message = "invalid e-mail address"))]
    pub email: String,
}

/// Authenticates a user with email and password.
#[utoipa::path(
    post,
    path = "/api/v1/login",
    tag = "auth",
    request_body = LoginRequest,
    responses(
        (status = 200, description = "Authenticated; session payload returned"),
        (status = 401, description = "Invalid credentials"),
        (status = 422, description = "Payload failed validation"),
    )
)]
pub(crate) async fn login(
    State(state): State<AppState>,
    Json(payload): Json<LoginRequest>,
) -> Result<Json<Value>, (StatusCode, Json<Value>)> {
    validation::check(&payload)?;

    match state
        .upstream
        .sign_in_with_password(&payload.email, &payload.password)
        .await
    {
        Ok(session) => Ok(Json(session_body(&session))),
        Err(e) => Err(upstream_failure(
            StatusCode::UNAUTHORIZED,
            e,
            "Authentication failed",
        )),
    }
}

/// Registers a new user.
#[utoipa::path(
    post,
    path = "/api/v1/register",
    tag = "auth",
    request_body = RegisterRequest,
    responses(
        (status = 201, description = "User created"),
        (status = 400, description = "Upstream rejected the registration"),
        (status = 422, description = "Payload failed validation"),
    )
)]
pub(crate) async fn register(
    State(state): State<AppState>,
    Json(payload): Json<RegisterRequest>,
) -> Result<(StatusCode, Json<Value>), (StatusCode, Json<Value>)> {
    validation::check(&payload)?;

    match state
        .upstream
        .sign_up(&payload.email, &payload.password, payload.metadata)
        .await
    {
        Ok(user) => {
            let message = if state.settings.upstream.email_confirmation {
                "User created. A confirmation link has been sent by e-mail."
            } else {
                "User created successfully (e-mail confirmation disabled)."
            };
            let email = user
                .get("email")
                .and_then(Value::as_str)
                .unwrap_or(&payload.email)
                .to_string();
            Ok((
                StatusCode::CREATED,
                Json(json!({ "message": message, "email": email, "user": user })),
            ))
        }
        Err(e) => Err(upstream_failure(
            StatusCode::BAD_REQUEST,
            e,
            "Registration failed",
        )),
    }
}

/// Requests a password-recovery e-mail.
///
/// The response does not reveal whether the address exists.
#[utoipa::path(
    post,
    path = "/api/v1/reset-password",
    tag = "auth",
    request_body = ResetPasswordRequest,
    responses(
        (status = 200, description = "Recovery e-mail requested"),
        (status = 400, description = "Upstream rejected the request"),
        (status = 422, description = "Payload failed validation"),
    )
)]
pub(crate) async fn reset_password(
    State(state): State<AppState>,
    Json(payload): Json<ResetPasswordRequest>,
) -> Result<Json<Value>, (StatusCode, Json<Value>)> {
    validation::check(&payload)?;

    match state.upstream.recover_password(&payload.email).await {
        Ok(()) => Ok(Json(json!({
            "message": "If the e-mail exists, a recovery link has been sent.",
            "email": payload.email,
        }))),
        Err(e) => Err(upstream_failure(
            StatusCode::BAD_REQUEST,
            e,
            "Password recovery request failed",
        )),
    }
}

/// Returns the authenticated caller's identity record.
#[utoipa::path(
    post,
    path = "/api/v1/profile",
    tag = "auth",
    responses(
        (status = 200, description = "Caller identity returned"),
        (status = 401, description = "Missing or invalid bearer token"),
    ),
    security(("bearer_auth" = []))
)]
pub(crate) async fn profile(
    State(state): State<AppState>,
    headers: HeaderMap,
) -> Result<Json<Value>, (StatusCode, Json<Value>)> {
    let Some(token) = bearer_token(&headers) else {
        return Err((
            StatusCode::UNAUTHORIZED,
            Json(json!({ "error": "Token not provided" })),
        ));
    };

    match state.upstream.resolve_identity(&token).await {
        Ok(user) => Ok(Json(json!({ "user": user }))),
        Err(e) => Err(upstream_failure(
            StatusCode::UNAUTHORIZED,
            e,
            "Failed to fetch the authenticated user",
        )),
    }
}

#[derive(Debug, Deserialize)]
pub(crate) struct CallbackParams {
    #[serde(rename = "type")]
    kind: Option<String>,
}

/// Landing page for upstream e-mail verification links.
///
/// Kept so confirmation links have somewhere to land instead of a 404.
pub(crate) async fn auth_callback(Query(params): Query<CallbackParams>) -> Html<String> {
    let kind = params.kind.unwrap_or_else(|| "signup".to_string());
    Html(format!(
        "<!doctype html><html><head><meta charset=\"utf-8\">\
         <title>E-mail confirmed</title></head>\
         <body style=\"font-family:sans-serif;padding:24px\">\
         <h2>E-mail confirmed</h2>\
         <p>Your e-mail has been verified ({}). You can now sign in to your account.</p>\
         </body></html>",
        escape_html(&kind)
    ))
}

fn escape_html(input: &str) -> String {
    let mut escaped = String::with_capacity(input.len());
    for c in input.chars() {
        match c {
            '&' => escaped.push_str("&amp;"),
            '<' => escaped.push_str("&lt;"),
            '>' => escaped.push_str("&gt;"),
            '"' => escaped.push_str("&quot;"),
            '\'' => escaped.push_str("&#39;"),
            other => escaped.push(other),
        }
    }
    escaped
}
