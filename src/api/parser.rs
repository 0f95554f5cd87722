// src/api/parser.rs
//! Parsing of listing pages and error bodies.
//!
//! Listings arrive as `{"value": [...], "@odata.nextLink": "..."}` (or with
//! `stages` instead of `value`). Errors arrive as
//! `{"error": {"code": "...", "message": "..."}}`, or as anything at all when
//! a proxy answered instead of the API.

use super::{ListingShape, PageCursor, ResourcePage};
use crate::constants::{ERROR_BODY_PREVIEW_LENGTH, LEGACY_NEXT_LINK_FIELD, NEXT_LINK_FIELD};
use crate::error::{ApiErrorCode, AppError};
use serde::Deserialize;
use serde_json::Value;

#[derive(Debug, Deserialize)]
struct ErrorEnvelope {
    error: ErrorBody,
}

#[derive(Debug, Deserialize)]
struct ErrorBody {
    code: String,
    #[serde(default)]
    message: String,
}

/// Parses a successful response body into a page.
pub fn parse_resource_page(
    body: &str,
    shape: ListingShape,
    locator: &str,
) -> Result<ResourcePage, AppError> {
    let json: Value = serde_json::from_str(body).map_err(|e| {
        log::error!("Failed to parse response from {}: {}", locator, e);
        AppError::MalformedResponse(format!(
            "Invalid JSON from {}: {} (body: {})",
            locator,
            e,
            preview(body)
        ))
    })?;
    page_from_value(json, shape, locator)
}

/// Extracts items and the continuation cursor from a decoded body.
///
/// A bare JSON array is a complete, single-page listing.
pub fn page_from_value(
    value: Value,
    shape: ListingShape,
    locator: &str,
) -> Result<ResourcePage, AppError> {
    let mut fields = match value {
        Value::Array(items) => {
            return Ok(ResourcePage {
                items,
                next_cursor: None,
            })
        }
        Value::Object(fields) => fields,
        other => {
            return Err(AppError::MalformedResponse(format!(
                "Expected a listing object from {}, got {}",
                locator,
                json_kind(&other)
            )))
        }
    };

    let items = match fields.remove(shape.items_field()) {
        Some(Value::Array(items)) => items,
        Some(Value::Null) | None => {
            log::debug!(
                "Response from {} has no '{}' field, treating it as an empty page",
                locator,
                shape.items_field()
            );
            Vec::new()
        }
        Some(other) => {
            return Err(AppError::MalformedResponse(format!(
                "Field '{}' from {} is {}, expected an array",
                shape.items_field(),
                locator,
                json_kind(&other)
            )))
        }
    };

    let next_cursor = [NEXT_LINK_FIELD, LEGACY_NEXT_LINK_FIELD]
        .iter()
        .find_map(|field| fields.get(*field).and_then(Value::as_str))
        .filter(|link| !link.is_empty())
        .map(PageCursor::new);

    Ok(ResourcePage { items, next_cursor })
}

/// Builds the typed error for a non-success response.
pub fn parse_error_response(body: &str, status: u16, locator: &str) -> AppError {
    // Try the API's error envelope first
    if let Ok(envelope) = serde_json::from_str::<ErrorEnvelope>(body) {
        let code = match ApiErrorCode::from_api_response(&envelope.error.code) {
            ApiErrorCode::Unknown(_) if status >= 400 => {
                log::debug!(
                    "Unrecognized error code '{}' from {}, classifying by HTTP {}",
                    envelope.error.code,
                    locator,
                    status
                );
                ApiErrorCode::from_http_status(status)
            }
            code => code,
        };
        let message = if envelope.error.message.is_empty() {
            envelope.error.code
        } else {
            envelope.error.message
        };
        return AppError::Api {
            code,
            status,
            message,
            locator: locator.to_string(),
        };
    }

    // Fallback to the HTTP status code
    AppError::Api {
        code: ApiErrorCode::from_http_status(status),
        status,
        message: format!("HTTP {} (body: {})", status, preview(body)),
        locator: locator.to_string(),
    }
}

fn preview(body: &str) -> String {
    if body.chars().count() > ERROR_BODY_PREVIEW_LENGTH {
        let head: String = body.chars().take(ERROR_BODY_PREVIEW_LENGTH).collect();
        format!("{}...", head)
    } else {
        body.to_string()
    }
}

fn json_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}
