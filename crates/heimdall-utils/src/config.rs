/*
 * Copyright (c) 2025 Dylan Storey
 * Licensed under the Elastic License 2.0.
 * See LICENSE file in the project root for full license text.
 */

//! # Heimdall Config Module
//! This module provides a common configuration framework for our crates.
//!
//! # Variable Naming Convention
//!
//! Variables in this configuration framework follow these naming conventions:
//! - Struct fields use snake_case (e.g., `upstream`, `bind_address`)
//! - Environment variables use SCREAMING_SNAKE_CASE and are prefixed with "HEIMDALL__" (e.g., `HEIMDALL__UPSTREAM__URL`)
//! - Configuration file keys use snake_case (e.g., `upstream.url`, `log.level`)
//!
//! # Configuration Overriding
//!
//! The configuration values are loaded and overridden in the following order (later sources take precedence):
//!
//! 1. Default values from the embedded `default.toml` file
//! 2. Values from an optional external configuration file (if provided)
//! 3. Environment variables
//!
//! To override a configuration value:
//! - In a configuration file: Use the appropriate key (e.g., `upstream.url = "new_value"`)
//! - Using environment variables: Set the variable with the "HEIMDALL__" prefix and "__" as separators
//!   (e.g., `HEIMDALL__UPSTREAM__URL=new_value`)
//!
//! # Available Environment Variables
//!
//! The following environment variables can be used to configure Heimdall:
//!
//! - `HEIMDALL__GATEWAY__BIND_ADDRESS`: Address the HTTP listener binds to
//!   Default: "0.0.0.0:3000"
//!
//! - `HEIMDALL__LOG__LEVEL`: Sets the log level for the application
//!   Default: "info"
//!   Possible values: "trace", "debug", "info", "warn", "error"
//!
//! - `HEIMDALL__UPSTREAM__URL`: Base URL of the upstream identity & data API
//!   Default: "http://localhost:54321"
//!
//! - `HEIMDALL__UPSTREAM__API_KEY`: Publishable (anon) API key sent on every upstream call
//!
//! - `HEIMDALL__UPSTREAM__SERVICE_KEY`: Privileged service credential used for
//!   upstream admin operations. Unset by default; admin proxy routes fail
//!   without it.
//!
//! - `HEIMDALL__AUTHZ__DEFAULT_USER_ROLE_ID`: Role id that marks an ordinary user
//!   Default: 1
//!
//! - `HEIMDALL__AUTHZ__NORMALIZE_ROLES`: Lowercase + trim role names before the
//!   denylist comparison
//!   Default: true

use config::{Config, ConfigError, Environment, File};
use serde::Deserialize;

// Include the default settings file as a string constant
const DEFAULT_SETTINGS: &str = include_str!("../default.toml");

/// Represents the main settings structure for the application
#[derive(Debug, Deserialize, Clone)]
#[allow(unused)]
pub struct Settings {
    /// Gateway listener configuration
    pub gateway: Gateway,
    /// Logging configuration
    pub log: Log,
    /// Upstream identity & data API configuration
    pub upstream: Upstream,
    /// Admin authorization policy configuration
    pub authz: Authz,
    /// CORS configuration
    pub cors: Cors,
    /// Mobile app status configuration
    pub app: App,
}

/// Represents the gateway listener configuration
#[derive(Debug, Deserialize, Clone)]
pub struct Gateway {
    /// Socket address the HTTP server binds to
    pub bind_address: String,
}

/// Represents the logging configuration
#[derive(Debug, Deserialize, Clone)]
pub struct Log {
    /// Log level (e.g., "info", "debug", "warn", "error")
    pub level: String,
    /// Log format: "text" for human-readable, "json" for structured JSON
    #[serde(default = "default_log_format")]
    pub format: String,
}

fn default_log_format() -> String {
    "text".to_string()
}

/// Represents the upstream identity & data API configuration
#[derive(Debug, Deserialize, Clone)]
pub struct Upstream {
    /// Base URL of the upstream API (auth and REST endpoints hang off it)
    pub url: String,
    /// Publishable (anon) API key; sent as the `apikey` header on every call
    pub api_key: String,
    /// Privileged service credential for upstream admin operations
    pub service_key: Option<String>,
    /// Request timeout for outbound calls, in seconds
    pub timeout_seconds: u64,
    /// Whether the upstream project requires e-mail confirmation on sign-up.
    /// Only affects the registration response message.
    #[serde(default = "default_email_confirmation")]
    pub email_confirmation: bool,
}

fn default_email_confirmation() -> bool {
    true
}

/// Represents the admin authorization policy configuration
#[derive(Debug, Deserialize, Clone)]
pub struct Authz {
    /// Role id that marks an ordinary (non-admin) user
    pub default_user_role_id: i64,
    /// Role names that are denied admin access
    pub role_denylist: Vec<String>,
    /// Lowercase + trim role names before comparing against the denylist.
    /// When false the comparison is raw and case-sensitive.
    pub normalize_roles: bool,
}

/// Represents the CORS configuration
#[derive(Debug, Deserialize, Clone)]
pub struct Cors {
    /// Allowed origins for CORS requests
    /// Use "*" to allow all origins (not recommended for production)
    pub allowed_origins: Vec<String>,
    /// Allowed HTTP methods
    pub allowed_methods: Vec<String>,
    /// Allowed HTTP headers
    pub allowed_headers: Vec<String>,
    /// Max age for preflight cache in seconds
    pub max_age_seconds: u64,
}

/// Represents the mobile app status configuration
#[derive(Debug, Deserialize, Clone)]
pub struct App {
    /// Current released Android app version
    pub android_version: Option<String>,
    /// Whether the app is in maintenance mode
    pub maintenance: bool,
    /// Optional message shown while in maintenance
    pub maintenance_message: Option<String>,
}

impl Settings {
    /// Creates a new `Settings` instance
    ///
    /// # Arguments
    ///
    /// * `file` - An optional path to a configuration file
    ///
    /// # Returns
    ///
    /// Returns a `Result` containing the `Settings` instance or a `ConfigError`
    pub fn new(file: Option<String>) -> Result<Self, ConfigError> {
        // Start with default settings from the embedded TOML file
        let mut s = Config::builder()
            .add_source(File::from_str(DEFAULT_SETTINGS, config::FileFormat::Toml));

        // If a configuration file is provided, add it as a source
        s = match file {
            Some(x) => s.add_source(File::with_name(x.as_str())),
            None => s,
        };

        // Add environment variables as a source, prefixed with "HEIMDALL" and using "__" as a separator
        s = s.add_source(Environment::with_prefix("HEIMDALL").separator("__"));

        // Build the configuration
        let settings = s.build()?;

        // Deserialize the configuration into a Settings instance
        settings.try_deserialize()
    }
}
