/*
 * Copyright (c) 2025 Dylan Storey
 * Licensed under the Elastic License 2.0.
 * See LICENSE file in the project root for full license text.
 */

//! Production implementation of [`IdentityDataApi`] backed by `reqwest`.
//!
//! One instance is built at startup from [`Settings`] and shared across all
//! requests. Every call carries the project `apikey` header; the bearer is
//! the caller's own token for user-scoped operations and the service
//! credential for admin operations.

use super::{IdentityDataApi, UpstreamError};
use async_trait::async_trait;
use heimdall_utils::config::Upstream;
use heimdall_utils::logging::prelude::*;
use reqwest::{Client, Method, RequestBuilder};
use serde_json::{json, Value};
use std::time::Duration;

/// HTTP client for the upstream Auth and REST APIs.
pub struct SupabaseApi {
    http: Client,
    base_url: String,
    api_key: String,
    service_key: Option<String>,
}

impl SupabaseApi {
    /// Builds the shared client from the upstream configuration section.
    pub fn new(config: &Upstream) -> Result<Self, UpstreamError> {
        let http = Client::builder()
            .timeout(Duration::from_secs(config.timeout_seconds))
            .build()?;

        Ok(Self {
            http,
            base_url: config.url.trim_end_matches('/').to_string(),
            api_key: config.api_key.clone(),
            service_key: config.service_key.clone(),
        })
    }

    /// Base URL the client was configured with, without a trailing slash.
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Probes the upstream auth health endpoint.
    pub async fn health_check(&self) -> Result<(), UpstreamError> {
        self.execute(self.request(Method::GET, "/auth/v1/health", &self.api_key))
            .await
            .map(|_| ())
    }

    fn service_key(&self) -> Result<&str, UpstreamError> {
        self.service_key
            .as_deref()
            .filter(|key| !key.is_empty())
            .ok_or(UpstreamError::ServiceCredentialMissing)
    }

    /// Starts a request with the `apikey` header and the given bearer set.
    fn request(&self, method: Method, path: &str, bearer: &str) -> RequestBuilder {
        let url = format!("{}{}", self.base_url, path);
        self.http
            .request(method, url)
            .header("apikey", &self.api_key)
            .header("Authorization", format!("Bearer {}", bearer))
    }

    async fn execute(&self, request: RequestBuilder) -> Result<Value, UpstreamError> {
        let response = request.send().await?;
        let status = response.status();

        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            debug!("Upstream call failed with status {}: {}", status, body);
            return Err(UpstreamError::Status {
                status: status.as_u16(),
                body,
            });
        }

        let text = response.text().await?;
        if text.is_empty() {
            // 204-style responses (logout, delete)
            return Ok(Value::Null);
        }
        Ok(serde_json::from_str(&text)?)
    }
}

/// Percent-encodes a value for use in a path or query segment.
fn encode(segment: &str) -> String {
    url::form_urlencoded::byte_serialize(segment.as_bytes()).collect()
}

#[async_trait]
impl IdentityDataApi for SupabaseApi {
    async fn resolve_identity(&self, token: &str) -> Result<Value, UpstreamError> {
        self.execute(self.request(Method::GET, "/auth/v1/user", token))
            .await
    }

    async fn query_profile(
        &self,
        token: &str,
        caller_id: &str,
    ) -> Result<Vec<Value>, UpstreamError> {
        // The caller's own token, not the service credential: the upstream
        // row-level security rules decide what this query may see.
        let path = format!("/rest/v1/profiles?id=eq.{}&select=*", encode(caller_id));
        let rows = self.execute(self.request(Method::GET, &path, token)).await?;
        Ok(serde_json::from_value(rows)?)
    }

    async fn sign_in_with_password(
        &self,
        email: &str,
        password: &str,
    ) -> Result<Value, UpstreamError> {
        let request = self
            .request(Method::POST, "/auth/v1/token?grant_type=password", &self.api_key)
            .json(&json!({ "email": email, "password": password }));
        self.execute(request).await
    }

    async fn sign_up(
        &self,
        email: &str,
        password: &str,
        metadata: Option<Value>,
    ) -> Result<Value, UpstreamError> {
        let mut body = json!({ "email": email, "password": password });
        if let Some(metadata) = metadata {
            body["data"] = metadata;
        }
        let request = self
            .request(Method::POST, "/auth/v1/signup", &self.api_key)
            .json(&body);
        self.execute(request).await
    }

    async fn recover_password(&self, email: &str) -> Result<(), UpstreamError> {
        let request = self
            .request(Method::POST, "/auth/v1/recover", &self.api_key)
            .json(&json!({ "email": email }));
        self.execute(request).await.map(|_| ())
    }

    async fn refresh_session(&self, refresh_token: &str) -> Result<Value, UpstreamError> {
        let request = self
            .request(
                Method::POST,
                "/auth/v1/token?grant_type=refresh_token",
                &self.api_key,
            )
            .json(&json!({ "refresh_token": refresh_token }));
        self.execute(request).await
    }

    async fn sign_out(&self, token: &str) -> Result<(), UpstreamError> {
        self.execute(self.request(Method::POST, "/auth/v1/logout", token))
            .await
            .map(|_| ())
    }

    async fn update_user(&self, token: &str, changes: Value) -> Result<Value, UpstreamError> {
        let request = self
            .request(Method::PUT, "/auth/v1/user", token)
            .json(&changes);
        self.execute(request).await
    }

    async fn admin_list_users(&self, page: u32, per_page: u32) -> Result<Value, UpstreamError> {
        let key = self.service_key()?;
        let path = format!("/auth/v1/admin/users?page={}&per_page={}", page, per_page);
        self.execute(self.request(Method::GET, &path, key)).await
    }

    async fn admin_get_user(&self, id: &str) -> Result<Value, UpstreamError> {
        let key = self.service_key()?;
        let path = format!("/auth/v1/admin/users/{}", encode(id));
        self.execute(self.request(Method::GET, &path, key)).await
    }

    async fn admin_update_user(&self, id: &str, changes: Value) -> Result<Value, UpstreamError> {
        let key = self.service_key()?;
        let path = format!("/auth/v1/admin/users/{}", encode(id));
        let request = self.request(Method::PUT, &path, key).json(&changes);
        self.execute(request).await
    }

    async fn admin_delete_user(&self, id: &str) -> Result<(), UpstreamError> {
        let key = self.service_key()?;
        let path = format!("/auth/v1/admin/users/{}", encode(id));
        self.execute(self.request(Method::DELETE, &path, key))
            .await
            .map(|_| ())
    }

    async fn fetch_maintenance_rows(&self) -> Result<Vec<Value>, UpstreamError> {
        let rows = self
            .execute(self.request(
                Method::GET,
                "/rest/v1/maintenance?select=*",
                &self.api_key,
            ))
            .await?;
        Ok(serde_json::from_value(rows)?)
    }
}
