/*
 * Copyright (c) 2025 Dylan Storey
 * Licensed under the Elastic License 2.0.
 * See LICENSE file in the project root for full license text.
 */

//! Admin authorization predicate.
//!
//! Given a caller's bearer token, decides whether the caller may use the
//! administrative routes. The decision chain: resolve the token to an
//! identity, extract the caller id, fetch the caller's `profiles` row with
//! the caller's own token, then apply the role decision table. Every failure
//! along the chain denies. The predicate never surfaces an error to the
//! HTTP layer; writing the denial response is the middleware's job, not
//! this module's.

use crate::upstream::IdentityDataApi;
use heimdall_utils::config::Authz;
use heimdall_utils::logging::prelude::*;
use serde_json::Value;

/// Role policy applied to the caller's profile row.
///
/// Built once from the `[authz]` settings section and shared across requests.
#[derive(Debug, Clone)]
pub struct RolePolicy {
    /// Role names denied admin access.
    pub denylist: Vec<String>,
    /// Lowercase + trim role names before the denylist comparison. When
    /// false the comparison is raw and case-sensitive.
    pub normalize_roles: bool,
    /// Role id that marks an ordinary user.
    pub default_user_role_id: i64,
}

impl RolePolicy {
    pub fn from_settings(authz: &Authz) -> Self {
        Self {
            denylist: authz.role_denylist.clone(),
            normalize_roles: authz.normalize_roles,
            default_user_role_id: authz.default_user_role_id,
        }
    }

    fn role_denied(&self, role: &str) -> bool {
        self.denylist.iter().any(|denied| denied == role)
    }
}

/// Why an admin check denied. Used for debug logging only; callers of
/// [`is_admin`] see a plain `false`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Deny {
    TokenInvalid,
    IdentityUnresolvable,
    ProfileNotFound,
    RoleIndeterminate,
    Upstream,
}

/// Returns whether the holder of `token` may perform administrative
/// operations.
///
/// Fail-closed: invalid tokens, unresolvable identities, missing profiles,
/// indeterminate roles, and upstream errors all come back as `false`.
pub async fn is_admin(api: &dyn IdentityDataApi, policy: &RolePolicy, token: &str) -> bool {
    match evaluate(api, policy, token).await {
        Ok(admin) => admin,
        Err(reason) => {
            debug!("Admin check denied: {:?}", reason);
            false
        }
    }
}

async fn evaluate(
    api: &dyn IdentityDataApi,
    policy: &RolePolicy,
    token: &str,
) -> Result<bool, Deny> {
    let identity = api
        .resolve_identity(token)
        .await
        .map_err(|_| Deny::TokenInvalid)?;

    let caller_id = extract_caller_id(&identity).ok_or(Deny::IdentityUnresolvable)?;

    // The lookup runs under the caller's own token so the upstream row-level
    // security rules apply to it.
    let rows = api
        .query_profile(token, &caller_id)
        .await
        .map_err(|_| Deny::Upstream)?;

    let profile = rows.first().ok_or(Deny::ProfileNotFound)?;
    decide(policy, profile).ok_or(Deny::RoleIndeterminate)
}

/// Pulls the caller id out of an identity payload.
///
/// The upstream is not consistent about the payload shape: the id is either
/// at the top level or nested under `user`. Exactly these two shapes are
/// probed, in that order; anything else fails the extraction.
pub fn extract_caller_id(identity: &Value) -> Option<String> {
    if let Some(id) = identity.get("id").and_then(scalar_id) {
        return Some(id);
    }
    identity
        .get("user")
        .and_then(|user| user.get("id"))
        .and_then(scalar_id)
}

fn scalar_id(value: &Value) -> Option<String> {
    match value {
        Value::String(s) if !s.is_empty() => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}

/// Applies the role decision table to a profile row.
///
/// Priority order: `is_admin` flag, then `role_name`/`role` against the
/// denylist, then `role_id` against the default user role id. `None` means
/// no field yielded a decision.
fn decide(policy: &RolePolicy, profile: &Value) -> Option<bool> {
    // 1) is_admin flag is authoritative when present
    if let Some(flag) = profile.get("is_admin").filter(|v| !v.is_null()) {
        return Some(truthy(flag));
    }

    // 2) role string: role_name takes precedence over role
    let role = profile
        .get("role_name")
        .and_then(Value::as_str)
        .or_else(|| profile.get("role").and_then(Value::as_str));
    if let Some(raw) = role {
        let compared = if policy.normalize_roles {
            raw.trim().to_lowercase()
        } else {
            raw.to_string()
        };
        if !compared.is_empty() {
            return Some(!policy.role_denied(&compared));
        }
        // empty role string carries no information; fall through to role_id
    }

    // 3) integer role id
    if let Some(role_id) = integer_role_id(profile.get("role_id")) {
        return Some(role_id != policy.default_user_role_id);
    }

    None
}

fn truthy(value: &Value) -> bool {
    match value {
        Value::Bool(b) => *b,
        Value::Number(n) => n.as_i64().map(|v| v != 0).unwrap_or(false),
        _ => false,
    }
}

fn integer_role_id(value: Option<&Value>) -> Option<i64> {
    match value? {
        Value::Number(n) => n.as_i64(),
        Value::String(s) => s.parse().ok(),
        _ => None,
    }
}
