//! Token inspection for support staff.
//!
//! The JWT is decoded without verification; the proxy holds no key for it.

use axum::{http::HeaderMap, response::Json};
use base64ct::{Base64UrlUnpadded, Encoding};
use secrecy::ExposeSecret;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use utoipa::ToSchema;

use crate::{api::error::ApiError, negotiate::relay};

const SAMPLE_EDGE: usize = 6;

#[derive(ToSchema, Serialize, Deserialize, Debug)]
#[serde(rename_all = "camelCase")]
pub struct TokenInfo {
    pub ok: bool,
    pub token_sample: String,
    #[schema(value_type = Option<Object>)]
    pub header: Option<Value>,
    #[schema(value_type = Option<Object>)]
    pub payload: Option<Value>,
}

/// First and last characters of the token, enough to tell tokens apart.
fn sample(token: &str) -> String {
    let chars: Vec<char> = token.chars().collect();
    if chars.len() <= SAMPLE_EDGE * 2 {
        return "…".to_string();
    }
    let head: String = chars[..SAMPLE_EDGE].iter().collect();
    let tail: String = chars[chars.len() - SAMPLE_EDGE..].iter().collect();
    format!("{head}…{tail}")
}

fn decode_segment(segment: &str) -> Option<Value> {
    let bytes = Base64UrlUnpadded::decode_vec(segment.trim_end_matches('=')).ok()?;
    serde_json::from_slice(&bytes).ok()
}

#[utoipa::path(
    get,
    path = "/api/debug/token",
    responses(
        (status = 200, description = "Unverified token claims", body = TokenInfo),
        (status = 401, description = "No session cookie", body = crate::api::error::ErrorBody)
    ),
    tag = "smv-proxy"
)]
pub async fn token(headers: HeaderMap) -> Result<Json<TokenInfo>, ApiError> {
    let token = relay::session_token(&headers)
        .ok_or_else(|| ApiError::Unauthorized("no smv_token cookie".to_string()))?;
    let token = token.expose_secret();

    let mut segments = token.split('.');
    let header = segments.next().and_then(decode_segment);
    let payload = segments.next().and_then(decode_segment);

    Ok(Json(TokenInfo {
        ok: true,
        token_sample: sample(token),
        header,
        payload,
    }))
}
