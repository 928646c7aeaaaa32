//! HTTP error body classification

use crate::error::ChatError;
use reqwest::StatusCode;
use serde_json::Value;
use uuid::Uuid;

/// Describe a non-success response body.
///
/// JSON bodies of the form `{ "error": ..., "details": ... }` are preferred;
/// otherwise the raw text is used as the details. The result reads
/// `"<error> - <details>"`, or just `"<error>"` when there are no details.
pub fn describe_error_body(status: StatusCode, body: Option<&str>) -> String {
    let fallback = format!("HTTP error! status: {}", status.as_u16());
    let body = body.map(str::trim).filter(|b| !b.is_empty());

    let (error, details) = match body {
        None => (fallback, None),
        Some(text) => match serde_json::from_str::<Value>(text) {
            Ok(json) => extract_error_details(&json, fallback),
            Err(_) => (fallback, Some(text.to_string())),
        },
    };

    match details {
        Some(details) if !details.is_empty() => format!("{} - {}", error, details),
        _ => error,
    }
}

/// Pull `error` and `details` out of a JSON error document
fn extract_error_details(json: &Value, fallback: String) -> (String, Option<String>) {
    let error = json
        .get("error")
        .and_then(stringify_field)
        .unwrap_or(fallback);

    let details = match json.get("details") {
        Some(details) => stringify_field(details),
        None => Some(json.to_string()),
    };

    (error, details)
}

fn stringify_field(value: &Value) -> Option<String> {
    match value {
        Value::Null => None,
        Value::String(s) if s.is_empty() => None,
        Value::String(s) => Some(s.clone()),
        // vendor errors nest objects such as { "message": "..." }
        Value::Object(map) => map
            .get("message")
            .and_then(Value::as_str)
            .map(str::to_owned)
            .or_else(|| Some(value.to_string())),
        other => Some(other.to_string()),
    }
}

/// Map a non-success chat response to a [`ChatError::Transport`]
pub fn map_http_error(status: StatusCode, body: Option<String>, request_id: Uuid) -> ChatError {
    let message = describe_error_body(status, body.as_deref());
    tracing::debug!("{} [request_id: {}]", message, request_id);
    ChatError::Transport {
        status: status.as_u16(),
        message,
    }
}
