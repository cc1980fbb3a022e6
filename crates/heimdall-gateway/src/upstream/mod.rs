/*
 * Copyright (c) 2025 Dylan Storey
 * Licensed under the Elastic License 2.0.
 * See LICENSE file in the project root for full license text.
 */

//! Upstream identity & data API access.
//!
//! The gateway owns no data: every operation is forwarded to the upstream
//! Auth and REST APIs. This module defines the [`IdentityDataApi`] capability
//! the rest of the gateway is written against, plus the production
//! implementation backed by `reqwest` ([`SupabaseApi`]). Handlers and the
//! admin authorization predicate receive the capability as a trait object, so
//! tests can substitute an in-memory double.

mod supabase;

pub use supabase::SupabaseApi;

use async_trait::async_trait;
use serde_json::Value;
use thiserror::Error;

/// Errors produced by upstream calls.
///
/// The admin authorization predicate collapses all of these into a denial;
/// the proxy handlers translate them into a generic `{"error": ...}` payload.
#[derive(Debug, Error)]
pub enum UpstreamError {
    /// The request never produced an HTTP response (connect, timeout, TLS).
    #[error("upstream request failed: {0}")]
    Transport(#[from] reqwest::Error),

    /// The upstream answered with a non-success status.
    #[error("upstream returned status {status}")]
    Status { status: u16, body: String },

    /// The upstream answered 2xx but the body was not the JSON we expected.
    #[error("failed to decode upstream response: {0}")]
    Decode(#[from] serde_json::Error),

    /// An admin operation was attempted without a configured service credential.
    #[error("upstream service credential is not configured")]
    ServiceCredentialMissing,
}

impl UpstreamError {
    /// Best-effort extraction of a human-readable message from an upstream
    /// error body. The Auth API uses `msg`/`error_description`, the REST API
    /// uses `message`; fall back to nothing and let the caller substitute a
    /// generic message.
    pub fn upstream_message(&self) -> Option<String> {
        let UpstreamError::Status { body, .. } = self else {
            return None;
        };
        let parsed: Value = serde_json::from_str(body).ok()?;
        for key in ["msg", "message", "error_description", "error"] {
            if let Some(text) = parsed.get(key).and_then(Value::as_str) {
                if !text.is_empty() {
                    return Some(text.to_string());
                }
            }
        }
        None
    }
}

/// The two capabilities the admin authorization predicate needs, plus the
/// pass-through operations the proxy routes forward.
///
/// Calls that act on behalf of a caller take that caller's bearer token and
/// must authenticate upstream with it (row-level security depends on this).
/// The `admin_*` operations authenticate with the gateway's service
/// credential instead.
#[async_trait]
pub trait IdentityDataApi: Send + Sync {
    /// Verifies a bearer token and returns the caller's identity record.
    async fn resolve_identity(&self, token: &str) -> Result<Value, UpstreamError>;

    /// Equality-filtered read of the caller's `profiles` row, authenticated
    /// with the caller's own token.
    async fn query_profile(&self, token: &str, caller_id: &str)
        -> Result<Vec<Value>, UpstreamError>;

    /// Password grant sign-in. Returns the upstream session payload.
    async fn sign_in_with_password(
        &self,
        email: &str,
        password: &str,
    ) -> Result<Value, UpstreamError>;

    /// Creates a new user, with optional caller-supplied metadata.
    async fn sign_up(
        &self,
        email: &str,
        password: &str,
        metadata: Option<Value>,
    ) -> Result<Value, UpstreamError>;

    /// Requests a password-recovery e-mail for the address.
    async fn recover_password(&self, email: &str) -> Result<(), UpstreamError>;

    /// Exchanges a refresh token for a fresh session payload.
    async fn refresh_session(&self, refresh_token: &str) -> Result<Value, UpstreamError>;

    /// Revokes the session behind the token.
    async fn sign_out(&self, token: &str) -> Result<(), UpstreamError>;

    /// Updates the authenticated user's own email/password/metadata.
    async fn update_user(&self, token: &str, changes: Value) -> Result<Value, UpstreamError>;

    /// Paginated user listing (service credential).
    async fn admin_list_users(&self, page: u32, per_page: u32) -> Result<Value, UpstreamError>;

    /// Fetches one user by id (service credential).
    async fn admin_get_user(&self, id: &str) -> Result<Value, UpstreamError>;

    /// Applies a sparse change set to a user by id (service credential).
    /// Ban and unban are expressed through the `ban_duration` field.
    async fn admin_update_user(&self, id: &str, changes: Value) -> Result<Value, UpstreamError>;

    /// Deletes a user by id (service credential).
    async fn admin_delete_user(&self, id: &str) -> Result<(), UpstreamError>;

    /// Reads the upstream `maintenance` table rows.
    async fn fetch_maintenance_rows(&self) -> Result<Vec<Value>, UpstreamError>;
}
