//! Turning accepted upstream responses into dashboard responses.
//!
//! Token and id lookups walk a fixed list of JSON pointers in priority order;
//! the first non-empty string wins.

use reqwest::header::{HeaderMap, HeaderValue, InvalidHeaderValue, AUTHORIZATION, COOKIE};
use secrecy::SecretString;
use serde_json::{json, Value};

use super::{caller::Negotiated, error::NegotiationError};

pub const TOKEN_COOKIE: &str = "smv_token";
pub const AUTH_COOKIE: &str = "smv_auth";
pub const DEFAULT_SESSION_TTL_SECONDS: i64 = 8 * 60 * 60;

const TOKEN_POINTERS: [&str; 4] = ["/access_token", "/token", "/data/access_token", "/data/token"];
const SESSION_ID_POINTERS: [&str; 3] = ["/sessionId", "/session_id", "/data/session_id"];
const MESSAGE_POINTERS: [&str; 2] = ["/message", "/data/status"];
const UPDATED_POINTERS: [&str; 4] = ["/updated", "/data/updated", "/data/ids", "/ids"];

fn first_string(body: &Value, pointers: &[&str]) -> Option<String> {
    pointers
        .iter()
        .filter_map(|pointer| body.pointer(pointer))
        .filter_map(Value::as_str)
        .map(str::trim)
        .find(|value| !value.is_empty())
        .map(str::to_string)
}

#[must_use]
pub fn extract_token(body: &Value) -> Option<String> {
    first_string(body, &TOKEN_POINTERS)
}

/// A verification is only useful if it produced a token.
///
/// # Errors
/// Returns [`NegotiationError::MissingToken`] when no token is present.
pub fn require_token(body: &Value) -> Result<SecretString, NegotiationError> {
    extract_token(body)
        .map(SecretString::from)
        .ok_or_else(|| NegotiationError::MissingToken { body: body.clone() })
}

#[must_use]
pub fn extract_session_id(body: &Value) -> Option<String> {
    first_string(body, &SESSION_ID_POINTERS)
}

#[must_use]
pub fn extract_message(body: &Value, fallback: &str) -> String {
    first_string(body, &MESSAGE_POINTERS).unwrap_or_else(|| fallback.to_string())
}

/// First array found among the known "updated ids" locations, else `[]`.
#[must_use]
pub fn extract_updated(body: &Value) -> Value {
    UPDATED_POINTERS
        .iter()
        .filter_map(|pointer| body.pointer(pointer))
        .find(|value| value.is_array())
        .cloned()
        .unwrap_or_else(|| json!([]))
}

/// Search responses keep the upstream rows untouched and add which variant
/// the upstream accepted.
#[must_use]
pub fn search_envelope(negotiated: &Negotiated) -> Value {
    json!({
        "ok": true,
        "result": negotiated.body,
        "sent": negotiated.variant.body,
        "variant": negotiated.variant.label,
        "attempts": negotiated.attempts,
    })
}

/// Cookie attributes for the browser session.
#[derive(Clone, Debug)]
pub struct SessionCookies {
    ttl_seconds: i64,
    secure: bool,
}

impl Default for SessionCookies {
    fn default() -> Self {
        Self::new(DEFAULT_SESSION_TTL_SECONDS, true)
    }
}

impl SessionCookies {
    #[must_use]
    pub fn new(ttl_seconds: i64, secure: bool) -> Self {
        Self {
            ttl_seconds,
            secure,
        }
    }

    #[must_use]
    pub fn ttl_seconds(&self) -> i64 {
        self.ttl_seconds
    }

    #[must_use]
    pub fn secure(&self) -> bool {
        self.secure
    }

    /// `Set-Cookie` values for a freshly verified session: the `HttpOnly`
    /// token and the presence marker.
    ///
    /// # Errors
    /// Returns an error if the token contains characters invalid in a header.
    pub fn issue(&self, token: &str) -> Result<[HeaderValue; 2], InvalidHeaderValue> {
        Ok([
            self.cookie(TOKEN_COOKIE, token, self.ttl_seconds)?,
            self.cookie(AUTH_COOKIE, "1", self.ttl_seconds)?,
        ])
    }

    /// `Set-Cookie` values expiring both cookies.
    ///
    /// # Errors
    /// Never in practice; the values are static.
    pub fn clear(&self) -> Result<[HeaderValue; 2], InvalidHeaderValue> {
        Ok([
            self.cookie(TOKEN_COOKIE, "", 0)?,
            self.cookie(AUTH_COOKIE, "", 0)?,
        ])
    }

    fn cookie(
        &self,
        name: &str,
        value: &str,
        max_age: i64,
    ) -> Result<HeaderValue, InvalidHeaderValue> {
        let mut cookie =
            format!("{name}={value}; Path=/; HttpOnly; SameSite=Lax; Max-Age={max_age}");
        // Plain-HTTP local development needs the cookie without `Secure`.
        if self.secure {
            cookie.push_str("; Secure");
        }
        HeaderValue::from_str(&cookie)
    }
}

/// Read a cookie value from the request headers.
#[must_use]
pub fn cookie_value(headers: &HeaderMap, name: &str) -> Option<String> {
    headers
        .get_all(COOKIE)
        .iter()
        .filter_map(|header| header.to_str().ok())
        .flat_map(|value| value.split(';'))
        .filter_map(|pair| {
            let mut parts = pair.trim().splitn(2, '=');
            let key = parts.next()?.trim();
            let val = parts.next()?.trim();
            (key == name && !val.is_empty()).then(|| val.to_string())
        })
        .next()
}

/// Session token from the `smv_token` cookie, falling back to an inbound
/// `Authorization: Bearer` header.
#[must_use]
pub fn session_token(headers: &HeaderMap) -> Option<SecretString> {
    cookie_value(headers, TOKEN_COOKIE)
        .or_else(|| extract_bearer_token(headers))
        .map(SecretString::from)
}

/// Whether the browser carries either session cookie.
#[must_use]
pub fn has_session(headers: &HeaderMap) -> bool {
    cookie_value(headers, TOKEN_COOKIE).is_some() || cookie_value(headers, AUTH_COOKIE).is_some()
}

fn extract_bearer_token(headers: &HeaderMap) -> Option<String> {
    let value = headers.get(AUTHORIZATION)?.to_str().ok()?;
    let trimmed = value.trim();
    let token = trimmed
        .strip_prefix("Bearer ")
        .or_else(|| trimmed.strip_prefix("bearer "))?
        .trim();
    if token.is_empty() {
        None
    } else {
        Some(token.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use secrecy::ExposeSecret;

    #[test]
    fn token_priority_prefers_direct_access_token() {
        let body = json!({
            "token": "second",
            "access_token": "first",
            "data": {"access_token": "third"}
        });
        assert_eq!(extract_token(&body).as_deref(), Some("first"));
    }

    #[test]
    fn token_falls_back_to_nested_data() {
        let body = json!({"data": {"token": "nested"}});
        assert_eq!(extract_token(&body).as_deref(), Some("nested"));

        let body = json!({"token": "", "data": {"access_token": "nested-access"}});
        assert_eq!(extract_token(&body).as_deref(), Some("nested-access"));
    }

    #[test]
    fn missing_token_is_an_error() {
        let body = json!({"message": "OTP verified", "data": {"status": "ok"}});
        match require_token(&body) {
            Err(NegotiationError::MissingToken { body: returned }) => assert_eq!(returned, body),
            other => panic!("expected missing token, got {other:?}"),
        }
    }

    #[test]
    fn require_token_wraps_secret() {
        let token = require_token(&json!({"access_token": "abc"}));
        assert_eq!(token.ok().map(|t| t.expose_secret().to_string()), Some("abc".to_string()));
    }

    #[test]
    fn session_id_and_message_lookups() {
        let body = json!({"data": {"session_id": "s-9", "status": "OTP sent"}});
        assert_eq!(extract_session_id(&body).as_deref(), Some("s-9"));
        assert_eq!(extract_message(&body, "fallback"), "OTP sent");
        assert_eq!(extract_message(&json!({}), "fallback"), "fallback");
    }

    #[test]
    fn updated_takes_first_array() {
        assert_eq!(
            extract_updated(&json!({"updated": 3, "data": {"ids": ["a", "b"]}})),
            json!(["a", "b"])
        );
        assert_eq!(extract_updated(&json!({"ok": true})), json!([]));
    }

    #[test]
    fn issued_cookies_carry_session_attributes() {
        let cookies = SessionCookies::default().issue("tok-1");
        let values: Vec<String> = cookies
            .map(|pair| pair.iter().filter_map(|v| v.to_str().ok()).map(str::to_string).collect())
            .unwrap_or_default();
        assert_eq!(
            values,
            vec![
                "smv_token=tok-1; Path=/; HttpOnly; SameSite=Lax; Max-Age=28800; Secure",
                "smv_auth=1; Path=/; HttpOnly; SameSite=Lax; Max-Age=28800; Secure",
            ]
        );
    }

    #[test]
    fn cleared_cookies_expire_immediately() {
        let cookies = SessionCookies::new(60, false).clear();
        let values: Vec<String> = cookies
            .map(|pair| pair.iter().filter_map(|v| v.to_str().ok()).map(str::to_string).collect())
            .unwrap_or_default();
        assert_eq!(
            values,
            vec![
                "smv_token=; Path=/; HttpOnly; SameSite=Lax; Max-Age=0",
                "smv_auth=; Path=/; HttpOnly; SameSite=Lax; Max-Age=0",
            ]
        );
    }

    #[test]
    fn session_token_reads_cookie_then_bearer() {
        let mut headers = HeaderMap::new();
        headers.insert(COOKIE, HeaderValue::from_static("theme=dark; smv_token=abc.def"));
        assert_eq!(
            session_token(&headers).map(|t| t.expose_secret().to_string()),
            Some("abc.def".to_string())
        );

        let mut headers = HeaderMap::new();
        headers.insert(AUTHORIZATION, HeaderValue::from_static("Bearer xyz"));
        assert_eq!(
            session_token(&headers).map(|t| t.expose_secret().to_string()),
            Some("xyz".to_string())
        );
    }

    #[test]
    fn empty_cookie_is_no_session() {
        let mut headers = HeaderMap::new();
        headers.insert(COOKIE, HeaderValue::from_static("smv_token=; smv_auth="));
        assert!(session_token(&headers).is_none());
        assert!(!has_session(&headers));

        headers.insert(COOKIE, HeaderValue::from_static("smv_auth=1"));
        assert!(has_session(&headers));
    }
}
