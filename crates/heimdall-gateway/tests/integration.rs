//! Router-level tests.
//!
//! The full router is exercised in-process with `tower::ServiceExt::oneshot`
//! against an in-memory upstream double, so request routing, the admin gate,
//! payload validation, and response shaping are all covered without a
//! network.

use async_trait::async_trait;
use axum::body::Body;
use axum::http::{Request, StatusCode};
use axum::Router;
use heimdall_gateway::api::{self, AppState};
use heimdall_gateway::upstream::{IdentityDataApi, UpstreamError};
use heimdall_utils::Settings;
use serde_json::{json, Value};
use serial_test::serial;
use std::sync::{Arc, Mutex};
use tower::util::ServiceExt;

/// In-memory upstream. Knows two tokens: `admin-tok` (admin profile) and
/// `user-tok` (denylisted role). Records the token used for each profile
/// lookup.
#[derive(Default)]
struct FakeUpstream {
    profile_tokens: Mutex<Vec<String>>,
    admin_list_calls: Mutex<u32>,
}

fn status_error(status: u16, body: &str) -> UpstreamError {
    UpstreamError::Status {
        status,
        body: body.to_string(),
    }
}

#[async_trait]
impl IdentityDataApi for FakeUpstream {
    async fn resolve_identity(&self, token: &str) -> Result<Value, UpstreamError> {
        match token {
            "admin-tok" => Ok(json!({"id": "admin-1", "email": "admin@example.com"})),
            "user-tok" => Ok(json!({"id": "user-1", "email": "user@example.com"})),
            _ => Err(status_error(401, r#"{"msg": "invalid JWT"}"#)),
        }
    }

    async fn query_profile(
        &self,
        token: &str,
        caller_id: &str,
    ) -> Result<Vec<Value>, UpstreamError> {
        self.profile_tokens.lock().unwrap().push(token.to_string());
        match caller_id {
            "admin-1" => Ok(vec![json!({"id": "admin-1", "is_admin": true})]),
            "user-1" => Ok(vec![json!({"id": "user-1", "role": "user"})]),
            _ => Ok(vec![]),
        }
    }

    async fn sign_in_with_password(
        &self,
        email: &str,
        password: &str,
    ) -> Result<Value, UpstreamError> {
        if email == "known@example.com" && password == "secret123" {
            Ok(json!({
                "access_token": "at-1",
                "refresh_token": "rt-1",
                "token_type": "bearer",
                "expires_in": 3600,
                "user": {"id": "user-1", "email": email}
            }))
        } else {
            Err(status_error(400, r#"{"msg": "Invalid login credentials"}"#))
        }
    }

    async fn sign_up(
        &self,
        email: &str,
        _password: &str,
        _metadata: Option<Value>,
    ) -> Result<Value, UpstreamError> {
        Ok(json!({"id": "new-user", "email": email}))
    }

    async fn recover_password(&self, _email: &str) -> Result<(), UpstreamError> {
        Ok(())
    }

    async fn refresh_session(&self, refresh_token: &str) -> Result<Value, UpstreamError> {
        if refresh_token == "rt-1" {
            Ok(json!({"access_token": "at-2", "refresh_token": "rt-2"}))
        } else {
            Err(status_error(400, r#"{"msg": "Invalid Refresh Token"}"#))
        }
    }

    async fn sign_out(&self, _token: &str) -> Result<(), UpstreamError> {
        Ok(())
    }

    async fn update_user(&self, _token: &str, changes: Value) -> Result<Value, UpstreamError> {
        Ok(json!({"id": "user-1", "applied": changes}))
    }

    async fn admin_list_users(&self, page: u32, per_page: u32) -> Result<Value, UpstreamError> {
        *self.admin_list_calls.lock().unwrap() += 1;
        Ok(json!({
            "users": [{"id": "user-1"}],
            "aud": "authenticated",
            "page": page,
            "per_page": per_page
        }))
    }

    async fn admin_get_user(&self, id: &str) -> Result<Value, UpstreamError> {
        Ok(json!({"id": id}))
    }

    async fn admin_update_user(&self, id: &str, changes: Value) -> Result<Value, UpstreamError> {
        Ok(json!({"id": id, "applied": changes}))
    }

    async fn admin_delete_user(&self, _id: &str) -> Result<(), UpstreamError> {
        Ok(())
    }

    async fn fetch_maintenance_rows(&self) -> Result<Vec<Value>, UpstreamError> {
        Ok(vec![json!({"maintenance": false})])
    }
}

fn test_app(upstream: Arc<FakeUpstream>) -> Router {
    let settings = Arc::new(Settings::new(None).expect("Failed to load default settings"));
    let state = AppState::new(upstream, settings);
    api::configure_api_routes(state.clone()).with_state(state)
}

fn post_json(uri: &str, body: Value) -> Request<Body> {
    Request::builder()
        .method("POST")
        .uri(uri)
        .header("content-type", "application/json")
        .body(Body::from(body.to_string()))
        .unwrap()
}

fn post_json_with_bearer(uri: &str, token: &str, body: Value) -> Request<Body> {
    Request::builder()
        .method("POST")
        .uri(uri)
        .header("content-type", "application/json")
        .header("authorization", format!("Bearer {}", token))
        .body(Body::from(body.to_string()))
        .unwrap()
}

async fn response_json(response: axum::response::Response) -> Value {
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    serde_json::from_slice(&bytes).unwrap()
}

#[tokio::test]
#[serial]
async fn test_login_returns_reshaped_session() {
    let app = test_app(Arc::new(FakeUpstream::default()));

    let response = app
        .oneshot(post_json(
            "/api/v1/login",
            json!({"email": "known@example.com", "password": "secret123"}),
        ))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let body = response_json(response).await;
    assert_eq!(body["access_token"], "at-1");
    assert_eq!(body["token_type"], "bearer");
    assert_eq!(body["user"]["email"], "known@example.com");
}

#[tokio::test]
#[serial]
async fn test_login_rejects_invalid_payload() {
    let app = test_app(Arc::new(FakeUpstream::default()));

    let response = app
        .oneshot(post_json(
            "/api/v1/login",
            json!({"email": "not-an-email", "password": "short"}),
        ))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::UNPROCESSABLE_ENTITY);
    let body = response_json(response).await;
    assert!(body["errors"]["email"].is_string());
    assert!(body["errors"]["password"].is_string());
}

#[tokio::test]
#[serial]
async fn test_login_maps_upstream_rejection_to_401() {
    let app = test_app(Arc::new(FakeUpstream::default()));

    let response = app
        .oneshot(post_json(
            "/api/v1/login",
            json!({"email": "known@example.com", "password": "wrong-password"}),
        ))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    let body = response_json(response).await;
    assert_eq!(body["error"], "Invalid login credentials");
}

#[tokio::test]
#[serial]
async fn test_register_returns_created() {
    let app = test_app(Arc::new(FakeUpstream::default()));

    let response = app
        .oneshot(post_json(
            "/api/v1/register",
            json!({"email": "new@example.com", "password": "secret123"}),
        ))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::CREATED);
    let body = response_json(response).await;
    assert_eq!(body["email"], "new@example.com");
    assert!(body["message"].is_string());
    assert_eq!(body["user"]["id"], "new-user");
}

#[tokio::test]
#[serial]
async fn test_refresh_token_requires_value() {
    let app = test_app(Arc::new(FakeUpstream::default()));

    let response = app
        .oneshot(post_json("/api/v1/refresh-token", json!({"refresh_token": ""})))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::UNPROCESSABLE_ENTITY);
    let body = response_json(response).await;
    assert_eq!(body["errors"]["refresh_token"], "refresh_token is required");
}

#[tokio::test]
#[serial]
async fn test_user_route_requires_bearer_token() {
    let app = test_app(Arc::new(FakeUpstream::default()));

    let response = app
        .oneshot(post_json("/api/v1/user", json!({})))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    let body = response_json(response).await;
    assert_eq!(body["error"], "Token not provided");
}

#[tokio::test]
#[serial]
async fn test_admin_route_without_token_is_forbidden() {
    let upstream = Arc::new(FakeUpstream::default());
    let app = test_app(upstream.clone());

    let response = app
        .oneshot(post_json("/api/v1/admin/users", json!({})))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::FORBIDDEN);
    let body = response_json(response).await;
    assert!(body["error"].is_string());
    assert_eq!(body["code"], "UNAUTHORIZED");
    // the handler must never have run
    assert_eq!(*upstream.admin_list_calls.lock().unwrap(), 0);
}

#[tokio::test]
#[serial]
async fn test_admin_route_with_non_admin_token_is_forbidden() {
    let upstream = Arc::new(FakeUpstream::default());
    let app = test_app(upstream.clone());

    let response = app
        .oneshot(post_json_with_bearer(
            "/api/v1/admin/users",
            "user-tok",
            json!({}),
        ))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::FORBIDDEN);
    let body = response_json(response).await;
    assert_eq!(body["code"], "UNAUTHORIZED");
    assert_eq!(*upstream.admin_list_calls.lock().unwrap(), 0);
}

#[tokio::test]
#[serial]
async fn test_admin_route_with_unknown_token_is_forbidden() {
    let app = test_app(Arc::new(FakeUpstream::default()));

    let response = app
        .oneshot(post_json_with_bearer(
            "/api/v1/admin/users",
            "bad-tok",
            json!({}),
        ))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::FORBIDDEN);
}

#[tokio::test]
#[serial]
async fn test_admin_listing_for_admin_caller() {
    let upstream = Arc::new(FakeUpstream::default());
    let app = test_app(upstream.clone());

    let response = app
        .oneshot(post_json_with_bearer(
            "/api/v1/admin/users",
            "admin-tok",
            json!({"page": 2, "per_page": 10}),
        ))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let body = response_json(response).await;
    assert_eq!(body["page"], 2);
    assert_eq!(body["per_page"], 10);
    assert_eq!(body["data"]["users"][0]["id"], "user-1");

    // the gate ran the profile lookup under the caller's own token
    assert_eq!(
        *upstream.profile_tokens.lock().unwrap(),
        vec!["admin-tok".to_string()]
    );
    assert_eq!(*upstream.admin_list_calls.lock().unwrap(), 1);
}

#[tokio::test]
#[serial]
async fn test_admin_pagination_is_clamped() {
    let app = test_app(Arc::new(FakeUpstream::default()));

    let response = app
        .oneshot(post_json_with_bearer(
            "/api/v1/admin/users",
            "admin-tok",
            json!({"page": 0, "per_page": 5000}),
        ))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let body = response_json(response).await;
    assert_eq!(body["page"], 1);
    assert_eq!(body["per_page"], 1000);
}

#[tokio::test]
#[serial]
async fn test_admin_ban_defaults_duration() {
    let app = test_app(Arc::new(FakeUpstream::default()));

    let response = app
        .oneshot(post_json_with_bearer(
            "/api/v1/admin/users/ban",
            "admin-tok",
            json!({"id": "user-1"}),
        ))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let body = response_json(response).await;
    assert_eq!(body["user"]["applied"]["ban_duration"], "24h");
    assert_eq!(body["message"], "User banned");
}

#[tokio::test]
#[serial]
async fn test_admin_unban_sets_duration_none() {
    let app = test_app(Arc::new(FakeUpstream::default()));

    let response = app
        .oneshot(post_json_with_bearer(
            "/api/v1/admin/users/unban",
            "admin-tok",
            json!({"id": "user-1"}),
        ))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let body = response_json(response).await;
    assert_eq!(body["user"]["applied"]["ban_duration"], "none");
}

#[tokio::test]
#[serial]
async fn test_admin_get_requires_id() {
    let app = test_app(Arc::new(FakeUpstream::default()));

    let response = app
        .oneshot(post_json_with_bearer(
            "/api/v1/admin/users/get",
            "admin-tok",
            json!({"id": ""}),
        ))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::UNPROCESSABLE_ENTITY);
    let body = response_json(response).await;
    assert_eq!(body["errors"]["id"], "id is required");
}

#[tokio::test]
#[serial]
async fn test_app_version_route() {
    let app = test_app(Arc::new(FakeUpstream::default()));

    let response = app
        .oneshot(
            Request::builder()
                .uri("/api/v1/app/version")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let body = response_json(response).await;
    assert_eq!(body["platform"], "android");
    assert_eq!(body["source"], "config");
}

#[tokio::test]
#[serial]
async fn test_healthz() {
    let app = test_app(Arc::new(FakeUpstream::default()));

    let response = app
        .oneshot(
            Request::builder()
                .uri("/healthz")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
}

#[tokio::test]
#[serial]
async fn test_unknown_route_returns_json_404() {
    let app = test_app(Arc::new(FakeUpstream::default()));

    let response = app
        .oneshot(
            Request::builder()
                .uri("/definitely/not/a/route")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::NOT_FOUND);
    let body = response_json(response).await;
    assert!(body["error"].is_string());
}
