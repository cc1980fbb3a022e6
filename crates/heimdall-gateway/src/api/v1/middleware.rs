/*
 * Copyright (c) 2025 Dylan Storey
 * Licensed under the Elastic License 2.0.
 * See LICENSE file in the project root for full license text.
 */

//! Admin authorization middleware for the API v1.
//!
//! Extracts the caller's bearer token from the Authorization header and runs
//! the admin authorization predicate against it. The predicate only ever
//! answers yes or no; writing the denial response happens here and nowhere
//! else. The denial body is the same regardless of the underlying reason.

use crate::api::AppState;
use crate::authz;
use axum::{
    body::Body,
    extract::State,
    http::{header, HeaderMap, Request, StatusCode},
    middleware::Next,
    response::Response,
    Json,
};
use heimdall_utils::logging::prelude::*;
use serde_json::{json, Value};

/// The verified caller's bearer token, made available to admin handlers via
/// request extensions.
#[derive(Clone, Debug)]
pub struct CallerToken(pub String);

/// Extracts a bearer token from the Authorization header.
///
/// The scheme match is case-insensitive; surrounding whitespace on the token
/// is trimmed. An empty token counts as absent.
pub fn bearer_token(headers: &HeaderMap) -> Option<String> {
    let value = headers.get(header::AUTHORIZATION)?.to_str().ok()?;
    let (scheme, token) = value.split_once(' ')?;
    if !scheme.eq_ignore_ascii_case("bearer") {
        return None;
    }
    let token = token.trim();
    if token.is_empty() {
        None
    } else {
        Some(token.to_string())
    }
}

/// Middleware function guarding the admin routes.
///
/// Requests without a valid bearer token, or whose token does not belong to
/// an administrator, are rejected with 403 and a generic error payload.
pub async fn admin_auth(
    State(state): State<AppState>,
    mut request: Request<Body>,
    next: Next,
) -> Result<Response, (StatusCode, Json<Value>)> {
    let Some(token) = bearer_token(request.headers()) else {
        warn!("Admin route called without a bearer token");
        return Err(denied());
    };

    if !authz::is_admin(state.upstream.as_ref(), &state.policy, &token).await {
        warn!("Admin route denied");
        return Err(denied());
    }

    request.extensions_mut().insert(CallerToken(token));
    Ok(next.run(request).await)
}

fn denied() -> (StatusCode, Json<Value>) {
    (
        StatusCode::FORBIDDEN,
        Json(json!({
            "error": "Access denied: caller is not an administrator.",
            "code": "UNAUTHORIZED"
        })),
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::HeaderValue;

    fn headers_with_auth(value: &str) -> HeaderMap {
        let mut headers = HeaderMap::new();
        headers.insert(header::AUTHORIZATION, HeaderValue::from_str(value).unwrap());
        headers
    }

    #[test]
    fn test_bearer_token_extracted() {
        let headers = headers_with_auth("Bearer tok-1");
        assert_eq!(bearer_token(&headers).as_deref(), Some("tok-1"));
    }

    #[test]
    fn test_bearer_scheme_is_case_insensitive() {
        let headers = headers_with_auth("bearer tok-1");
        assert_eq!(bearer_token(&headers).as_deref(), Some("tok-1"));
        let headers = headers_with_auth("BEARER tok-1");
        assert_eq!(bearer_token(&headers).as_deref(), Some("tok-1"));
    }

    #[test]
    fn test_bearer_token_trims_whitespace() {
        let headers = headers_with_auth("Bearer   tok-1  ");
        assert_eq!(bearer_token(&headers).as_deref(), Some("tok-1"));
    }

    #[test]
    fn test_missing_or_malformed_header_yields_none() {
        assert_eq!(bearer_token(&HeaderMap::new()), None);
        assert_eq!(bearer_token(&headers_with_auth("tok-1")), None);
        assert_eq!(bearer_token(&headers_with_auth("Basic dXNlcjpwdw==")), None);
        assert_eq!(bearer_token(&headers_with_auth("Bearer ")), None);
    }
}
