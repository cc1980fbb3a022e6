/*
 * Copyright (c) 2025 Dylan Storey
 * Licensed under the Elastic License 2.0.
 * See LICENSE file in the project root for full license text.
 */

//! Request payload validation.
//!
//! Request structs declare their constraints with `validator` derives; this
//! module turns validation failures into the 422 response shape the API
//! uses: `{"errors": {"<field>": "<message>"}}`.

use axum::{http::StatusCode, Json};
use serde_json::{json, Map, Value};
use validator::Validate;

/// Validates a payload, mapping failures to a 422 response.
///
/// One message per field: the first constraint violation wins, matching the
/// single-message-per-field shape clients already parse.
pub fn check(payload: &impl Validate) -> Result<(), (StatusCode, Json<Value>)> {
    payload.validate().map_err(|errors| {
        let mut fields = Map::new();
        for (field, field_errors) in errors.field_errors() {
            let message = field_errors
                .iter()
                .filter_map(|error| error.message.as_ref())
                .map(|message| message.to_string())
                .next()
                .unwrap_or_else(|| "invalid value".to_string());
            fields.insert(field.to_string(), Value::String(message));
        }
        (
            StatusCode::UNPROCESSABLE_ENTITY,
            Json(json!({ "errors": fields })),
        )
    })
}
