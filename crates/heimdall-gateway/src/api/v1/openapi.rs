/*
 * Copyright (c) 2025 Dylan Storey
 * Licensed under the Elastic License 2.0.
 * See LICENSE file in the project root for full license text.
 */

use crate::api::v1::admin::{
    AdminUpdateUserRequest, BanUserRequest, ListUsersRequest, UserIdRequest,
};
use crate::api::v1::auth::{LoginRequest, RegisterRequest, ResetPasswordRequest};
use crate::api::v1::users::{RefreshTokenRequest, UpdateUserRequest};
use crate::api::v1::{admin, app, auth, users};
use crate::api::AppState;
use axum::Router;
use utoipa::{
    openapi::security::{HttpAuthScheme, HttpBuilder, SecurityScheme},
    OpenApi,
};
use utoipa_swagger_ui::SwaggerUi;

#[derive(OpenApi)]
#[openapi(
    paths(
        auth::login,
        auth::register,
        auth::reset_password,
        auth::profile,
        users::me,
        users::update,
        users::logout,
        users::refresh_token,
        admin::list_users,
        admin::get_user,
        admin::update_user,
        admin::delete_user,
        admin::ban_user,
        admin::unban_user,
        admin::maintenance_rows,
        app::version,
        app::maintenance,
    ),
    components(
        schemas(
            LoginRequest,
            RegisterRequest,
            ResetPasswordRequest,
            UpdateUserRequest,
            RefreshTokenRequest,
            ListUsersRequest,
            UserIdRequest,
            AdminUpdateUserRequest,
            BanUserRequest,
        )
    ),
    tags(
        (name = "auth", description = "Authentication API"),
        (name = "users", description = "Authenticated user account API"),
        (name = "admin", description = "Admin user management API"),
        (name = "app", description = "App status API")
    ),
    modifiers(&SecurityAddon)
)]
pub struct ApiDoc;

struct SecurityAddon;

impl utoipa::Modify for SecurityAddon {
    fn modify(&self, openapi: &mut utoipa::openapi::OpenApi) {
        if let Some(components) = openapi.components.as_mut() {
            components.add_security_scheme(
                "bearer_auth",
                SecurityScheme::Http(
                    HttpBuilder::new()
                        .scheme(HttpAuthScheme::Bearer)
                        .bearer_format("JWT")
                        .build(),
                ),
            );
        }
    }
}

pub fn configure_openapi() -> Router<AppState> {
    Router::new().merge(
        SwaggerUi::new("/swagger-ui").url("/docs/openapi.json", ApiDoc::openapi()),
    )
}
