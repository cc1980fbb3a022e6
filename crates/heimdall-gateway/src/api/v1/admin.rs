/*
 * Copyright (c) 2025 Dylan Storey
 * Licensed under the Elastic License 2.0.
 * See LICENSE file in the project root for full license text.
 */

//! Admin routes for user management.
//!
//! Every route in this module sits behind the admin authorization middleware
//! (see `middleware::admin_auth`); handlers can assume the caller has already
//! been verified as an administrator. The proxied upstream calls run with
//! the gateway's service credential, which is why the gate in front matters.

use crate::api::v1::upstream_failure;
use crate::api::AppState;
use crate::validation;
use axum::{
    extract::State,
    http::StatusCode,
    routing::{get, post},
    Json, Router,
};
use serde::Deserialize;
use serde_json::{json, Map, Value};
use utoipa::ToSchema;
use validator::Validate;

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/admin/users", post(list_users))
        .route("/admin/users/get", post(get_user))
        .route("/admin/users/update", post(update_user))
        .route("/admin/users/delete", post(delete_user))
        .route("/admin/users/ban", post(ban_user))
        .route("/admin/users/unban", post(unban_user))
        .route("/admin/maintenance", get(maintenance_rows))
}

/// Body for `POST /admin/users`.
#[derive(Debug, Default, Deserialize, ToSchema)]
pub struct ListUsersRequest {
    pub page: Option<u32>,
    pub per_page: Option<u32>,
}

/// Body for routes addressing a single user by id.
#[derive(Debug, Deserialize, Validate, ToSchema)]
pub struct UserIdRequest {
    #[validate(length(min = 1, message = "id is required"))]
    pub id: String,
}

/// Body for `POST /admin/users/update`. Only present fields are forwarded.
#[derive(Debug, Deserialize, Validate, ToSchema)]
pub struct AdminUpdateUserRequest {
    #[validate(length(min = 1, message = "id is required"))]
    pub id: String,
    #[validate(email(message = "invalid e-mail address"))]
    pub email: Option<String>,
    #[validate(length(min = 6, message = "password must be at least 6 characters"))]
    pub password: Option<String>,
    #[schema(value_type = Object)]
    pub user_metadata: Option<Value>,
    #[schema(value_type = Object)]
    pub app_metadata: Option<Value>,
    /// Ban duration, e.g. "24h", "7d", or "none" to lift a ban.
    pub ban_duration: Option<String>,
}

/// Body for `POST /admin/users/ban`.
#[derive(Debug, Deserialize, Validate, ToSchema)]
pub struct BanUserRequest {
    #[validate(length(min = 1, message = "id is required"))]
    pub id: String,
    /// Ban duration, e.g. "24h" or "7d". Defaults to "24h".
    pub duration: Option<String>,
}

/// Lists users with pagination.
#[utoipa::path(
    post,
    path = "/api/v1/admin/users",
    tag = "admin",
    request_body = ListUsersRequest,
    responses(
        (status = 200, description = "Paginated user listing"),
        (status = 400, description = "Upstream rejected the request"),
        (status = 403, description = "Caller is not an administrator"),
    ),
    security(("bearer_auth" = []))
)]
pub(crate) async fn list_users(
    State(state): State<AppState>,
    Json(payload): Json<ListUsersRequest>,
) -> Result<Json<Value>, (StatusCode, Json<Value>)> {
    let page = payload.page.unwrap_or(1).max(1);
    let per_page = payload.per_page.unwrap_or(50).clamp(1, 1000);

    match state.upstream.admin_list_users(page, per_page).await {
        Ok(data) => Ok(Json(json!({
            "page": page,
            "per_page": per_page,
            "data": data,
        }))),
        Err(e) => Err(upstream_failure(
            StatusCode::BAD_REQUEST,
            e,
            "Failed to list users",
        )),
    }
}

/// Fetches a user by id.
#[utoipa::path(
    post,
    path = "/api/v1/admin/users/get",
    tag = "admin",
    request_body = UserIdRequest,
    responses(
        (status = 200, description = "User returned"),
        (status = 400, description = "Upstream rejected the request"),
        (status = 403, description = "Caller is not an administrator"),
        (status = 422, description = "Payload failed validation"),
    ),
    security(("bearer_auth" = []))
)]
pub(crate) async fn get_user(
    State(state): State<AppState>,
    Json(payload): Json<UserIdRequest>,
) -> Result<Json<Value>, (StatusCode, Json<Value>)> {
    validation::check(&payload)?;

    match state.upstream.admin_get_user(&payload.id).await {
        Ok(user) => Ok(Json(json!({ "user": user }))),
        Err(e) => Err(upstream_failure(
            StatusCode::BAD_REQUEST,
            e,
            "Failed to fetch user",
        )),
    }
}

/// Applies a sparse update to a user by id.
#[utoipa::path(
    post,
    path = "/api/v1/admin/users/update",
    tag = "admin",
    request_body = AdminUpdateUserRequest,
    responses(
        (status = 200, description = "User updated"),
        (status = 400, description = "Upstream rejected the update"),
        (status = 403, description = "Caller is not an administrator"),
        (status = 422, description = "Payload failed validation"),
    ),
    security(("bearer_auth" = []))
)]
pub(crate) async fn update_user(
    State(state): State<AppState>,
    Json(payload): Json<AdminUpdateUserRequest>,
) -> Result<Json<Value>, (StatusCode, Json<Value>)> {
    validation::check(&payload)?;

    let mut changes = Map::new();
    if let Some(email) = payload.email {
        changes.insert("email".to_string(), Value::String(email));
    }
    if let Some(password) = payload.password {
        changes.insert("password".to_string(), Value::String(password));
    }
    if let Some(user_metadata) = payload.user_metadata {
        changes.insert("user_metadata".to_string(), user_metadata);
    }
    if let Some(app_metadata) = payload.app_metadata {
        changes.insert("app_metadata".to_string(), app_metadata);
    }
    if let Some(ban_duration) = payload.ban_duration {
        changes.insert("ban_duration".to_string(), Value::String(ban_duration));
    }

    match state
        .upstream
        .admin_update_user(&payload.id, Value::Object(changes))
        .await
    {
        Ok(user) => Ok(Json(json!({ "user": user }))),
        Err(e) => Err(upstream_failure(
            StatusCode::BAD_REQUEST,
            e,
            "Failed to update user",
        )),
    }
}

/// Deletes a user by id.
#[utoipa::path(
    post,
    path = "/api/v1/admin/users/delete",
    tag = "admin",
    request_body = UserIdRequest,
    responses(
        (status = 200, description = "User deleted"),
        (status = 400, description = "Upstream rejected the deletion"),
        (status = 403, description = "Caller is not an administrator"),
        (status = 422, description = "Payload failed validation"),
    ),
    security(("bearer_auth" = []))
)]
pub(crate) async fn delete_user(
    State(state): State<AppState>,
    Json(payload): Json<UserIdRequest>,
) -> Result<Json<Value>, (StatusCode, Json<Value>)> {
    validation::check(&payload)?;

    match state.upstream.admin_delete_user(&payload.id).await {
        Ok(()) => Ok(Json(json!({ "message": "User deleted successfully" }))),
        Err(e) => Err(upstream_failure(
            StatusCode::BAD_REQUEST,
            e,
            "Failed to delete user",
        )),
    }
}

/// Bans a user for the given duration.
#[utoipa::path(
    post,
    path = "/api/v1/admin/users/ban",
    tag = "admin",
    request_body = BanUserRequest,
    responses(
        (status = 200, description = "User banned"),
        (status = 400, description = "Upstream rejected the ban"),
        (status = 403, description = "Caller is not an administrator"),
        (status = 422, description = "Payload failed validation"),
    ),
    security(("bearer_auth" = []))
)]
pub(crate) async fn ban_user(
    State(state): State<AppState>,
    Json(payload): Json<BanUserRequest>,
) -> Result<Json<Value>, (StatusCode, Json<Value>)> {
    validation::check(&payload)?;
    let duration = payload.duration.unwrap_or_else(|| "24h".to_string());

    match state
        .upstream
        .admin_update_user(&payload.id, json!({ "ban_duration": duration }))
        .await
    {
        Ok(user) => Ok(Json(json!({ "user": user, "message": "User banned" }))),
        Err(e) => Err(upstream_failure(
            StatusCode::BAD_REQUEST,
            e,
            "Failed to ban user",
        )),
    }
}

/// Lifts a user's ban.
#[utoipa::path(
    post,
    path = "/api/v1/admin/users/unban",
    tag = "admin",
    request_body = UserIdRequest,
    responses(
        (status = 200, description = "Ban lifted"),
        (status = 400, description = "Upstream rejected the request"),
        (status = 403, description = "Caller is not an administrator"),
        (status = 422, description = "Payload failed validation"),
    ),
    security(("bearer_auth" = []))
)]
pub(crate) async fn unban_user(
    State(state): State<AppState>,
    Json(payload): Json<UserIdRequest>,
) -> Result<Json<Value>, (StatusCode, Json<Value>)> {
    validation::check(&payload)?;

    match state
        .upstream
        .admin_update_user(&payload.id, json!({ "ban_duration": "none" }))
        .await
    {
        Ok(user) => Ok(Json(json!({ "user": user, "message": "Ban lifted" }))),
        Err(e) => Err(upstream_failure(
            StatusCode::BAD_REQUEST,
            e,
            "Failed to lift ban",
        )),
    }
}

/// Reads the upstream maintenance table.
#[utoipa::path(
    get,
    path = "/api/v1/admin/maintenance",
    tag = "admin",
    responses(
        (status = 200, description = "Maintenance rows returned"),
        (status = 400, description = "Upstream rejected the request"),
        (status = 403, description = "Caller is not an administrator"),
    ),
    security(("bearer_auth" = []))
)]
pub(crate) async fn maintenance_rows(
    State(state): State<AppState>,
) -> Result<Json<Value>, (StatusCode, Json<Value>)> {
    match state.upstream.fetch_maintenance_rows().await {
        Ok(rows) => Ok(Json(Value::Array(rows))),
        Err(e) => Err(upstream_failure(
            StatusCode::BAD_REQUEST,
            e,
            "Failed to fetch maintenance status",
        )),
    }
}
