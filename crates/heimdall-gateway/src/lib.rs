/*
 * Copyright (c) 2025 Dylan Storey
 * Licensed under the Elastic License 2.0.
 * See LICENSE file in the project root for full license text.
 */

//! # Heimdall Gateway
//!
//! `heimdall-gateway` is a backend-for-frontend gateway in front of a hosted
//! Postgres-as-a-service backend. It forwards authentication and
//! user-administration requests to the upstream Auth and REST APIs, validates
//! inbound payloads, and gates administrative routes behind a fail-closed
//! authorization check against the caller's `profiles` row.

pub mod api;
pub mod authz;
pub mod upstream;
pub mod validation;
