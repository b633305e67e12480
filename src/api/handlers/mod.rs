//! API handlers and the input helpers they share.
//!
//! The dashboard is loose about types: ids arrive as strings or numbers and
//! optional fields are sometimes `""`. The helpers below normalize that before
//! any upstream call is planned.

pub mod auth;
pub mod debug;
pub mod health;
pub mod root;
pub mod smv;

use axum::{
    http::{header::ORIGIN, HeaderMap},
    Json,
};
use once_cell::sync::Lazy;
use regex::Regex;
use serde_json::Value;

use crate::{api::error::ApiError, negotiate::UpstreamConfig};

static EMAIL: Lazy<Option<Regex>> =
    Lazy::new(|| Regex::new(r"^[^@\s]+@[^@\s]+\.[^@\s]+$").ok());

/// Lightweight email sanity check used before an identifier is sent upstream.
pub fn valid_email(email: &str) -> bool {
    EMAIL.as_ref().is_some_and(|re| re.is_match(email))
}

/// Unwrap an optional JSON payload. Malformed JSON, a wrong field type or a
/// missing `Content-Type` all become a JSON 400.
///
/// # Errors
/// Returns `ApiError::BadRequest` when the body could not be extracted.
pub fn json_payload<T>(payload: Option<Json<T>>) -> Result<T, ApiError> {
    match payload {
        Some(Json(request)) => Ok(request),
        None => Err(ApiError::BadRequest(
            "request body must be a JSON object".to_string(),
        )),
    }
}

/// Trimmed text of a string or number value; empty text is `None`.
pub fn loose_text(value: Option<&Value>) -> Option<String> {
    let text = match value? {
        Value::String(text) => text.trim().to_string(),
        Value::Number(number) => number.to_string(),
        _ => return None,
    };
    (!text.is_empty()).then_some(text)
}

/// First non-empty value in alias order.
pub fn first_text(values: &[Option<&Value>]) -> Option<String> {
    values.iter().find_map(|value| loose_text(*value))
}

/// Integer from a JSON number or a numeric string.
#[allow(clippy::cast_possible_truncation)]
pub fn loose_i64(value: Option<&Value>) -> Option<i64> {
    match value? {
        Value::Number(number) => number
            .as_i64()
            .or_else(|| number.as_f64().filter(|n| n.is_finite()).map(|n| n as i64)),
        Value::String(text) => text.trim().parse().ok(),
        _ => None,
    }
}

/// The browser's `Origin`, else the configured one.
pub fn request_origin(headers: &HeaderMap, config: &UpstreamConfig) -> String {
    headers
        .get(ORIGIN)
        .and_then(|value| value.to_str().ok())
        .map(str::trim)
        .filter(|origin| !origin.is_empty() && *origin != "null")
        .map_or_else(|| config.origin().to_string(), str::to_string)
}


#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::HeaderValue;
    use serde_json::json;

    #[test]
    fn missing_payload_is_bad_request() {
        let result = json_payload::<Value>(None);
        let status = result.err().map(|err| err.into_parts().0);
        assert_eq!(status, Some(axum::http::StatusCode::BAD_REQUEST));
        assert_eq!(
            json_payload(Some(Json(json!({"a": 1})))).ok(),
            Some(json!({"a": 1}))
        );
    }

    #[test]
    fn email_validation() {
        assert!(valid_email("agent@example.com"));
        assert!(!valid_email("agent@"));
        assert!(!valid_email("agent example@x.io"));
        assert!(!valid_email("+14155550123"));
    }

    #[test]
    fn loose_text_accepts_numbers_and_trims() {
        assert_eq!(loose_text(Some(&json!("  T855 "))), Some("T855".to_string()));
        assert_eq!(loose_text(Some(&json!(42))), Some("42".to_string()));
        assert_eq!(loose_text(Some(&json!("   "))), None);
        assert_eq!(loose_text(Some(&json!(null))), None);
        assert_eq!(loose_text(None), None);
    }

    #[test]
    fn first_text_follows_alias_order() {
        let body = json!({"passport": "", "orderId": "ORD-1", "order_id": "ORD-2"});
        let text = first_text(&[
            body.get("searchText"),
            body.get("passport"),
            body.get("passportNumber"),
            body.get("orderId"),
            body.get("order_id"),
        ]);
        assert_eq!(text.as_deref(), Some("ORD-1"));
    }

    #[test]
    fn loose_integers() {
        assert_eq!(loose_i64(Some(&json!(25))), Some(25));
        assert_eq!(loose_i64(Some(&json!("30"))), Some(30));
        assert_eq!(loose_i64(Some(&json!("ten"))), None);
        assert_eq!(loose_i64(Some(&json!([1]))), None);
    }

    #[test]
    fn origin_prefers_browser_header() {
        let config = UpstreamConfig::default();
        let mut headers = HeaderMap::new();
        assert_eq!(request_origin(&headers, &config), config.origin());

        headers.insert(ORIGIN, HeaderValue::from_static("https://console.example.com"));
        assert_eq!(
            request_origin(&headers, &config),
            "https://console.example.com"
        );
    }
}
