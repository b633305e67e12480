//! JSON error responses.
//!
//! Every failure reaches the browser as `{"error": "<reason>", ...}` so the
//! dashboard can always render a message.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Json, Response},
};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use thiserror::Error;
use tracing::{error, warn};
use utoipa::ToSchema;

use crate::negotiate::NegotiationError;

#[derive(ToSchema, Serialize, Deserialize, Debug)]
pub struct ErrorBody {
    pub error: String,
}

#[derive(Debug, Error)]
pub enum ApiError {
    /// Missing or empty input, rejected before any upstream call.
    #[error("{0}")]
    BadRequest(String),
    #[error("{0}")]
    Unauthorized(String),
    #[error("{context}: {source}")]
    Upstream {
        context: &'static str,
        #[source]
        source: NegotiationError,
        /// Report terminal upstream rejections as 502 instead of mirroring them.
        gateway: bool,
    },
    #[error("{0}")]
    Internal(String),
}

impl ApiError {
    /// Mirror the upstream status for terminal rejections.
    #[must_use]
    pub fn upstream(context: &'static str, source: NegotiationError) -> Self {
        Self::Upstream {
            context,
            source,
            gateway: false,
        }
    }

    /// Report terminal rejections as `502 Bad Gateway`.
    #[must_use]
    pub fn gateway(context: &'static str, source: NegotiationError) -> Self {
        Self::Upstream {
            context,
            source,
            gateway: true,
        }
    }

    /// Status and JSON body for this error.
    #[must_use]
    pub fn into_parts(self) -> (StatusCode, Value) {
        match self {
            Self::BadRequest(message) => (StatusCode::BAD_REQUEST, json!({ "error": message })),
            Self::Unauthorized(message) => (StatusCode::UNAUTHORIZED, json!({ "error": message })),
            Self::Internal(message) => {
                error!("internal error: {message}");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    json!({ "error": "internal error", "detail": message }),
                )
            }
            Self::Upstream {
                context,
                source,
                gateway,
            } => {
                warn!("{context}: {source}");
                upstream_parts(context, source, gateway)
            }
        }
    }
}

fn upstream_parts(context: &str, source: NegotiationError, gateway: bool) -> (StatusCode, Value) {
    match source {
        NegotiationError::Network {
            url,
            variant,
            timeout,
            detail,
        } => {
            let status = if timeout {
                StatusCode::GATEWAY_TIMEOUT
            } else {
                StatusCode::BAD_GATEWAY
            };
            (
                status,
                json!({
                    "error": format!("{context}: upstream network error"),
                    "detail": detail,
                    "url": url,
                    "variant": variant,
                    "timeout": timeout,
                }),
            )
        }
        NegotiationError::Exhausted {
            status,
            body,
            attempts,
        } => (
            StatusCode::BAD_GATEWAY,
            json!({
                "error": format!("{context} (all variants)"),
                "upstreamStatus": status.as_u16(),
                "upstreamBody": body,
                "variant": attempts.last(),
                "attempts": attempts,
            }),
        ),
        NegotiationError::Upstream {
            status,
            body,
            variant,
            attempts,
        } => {
            let relayed = if gateway || !(status.is_client_error() || status.is_server_error()) {
                StatusCode::BAD_GATEWAY
            } else {
                status
            };
            (
                relayed,
                json!({
                    "error": context,
                    "upstreamStatus": status.as_u16(),
                    "upstreamBody": body,
                    "variant": variant,
                    "attempts": attempts,
                }),
            )
        }
        NegotiationError::MissingToken { body } => (
            StatusCode::BAD_GATEWAY,
            json!({
                "error": format!("{context}: upstream returned no session token"),
                "upstreamBody": body,
            }),
        ),
        NegotiationError::InvalidRequest(detail) => (
            StatusCode::INTERNAL_SERVER_ERROR,
            json!({
                "error": format!("{context}: invalid upstream request"),
                "detail": detail,
            }),
        ),
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, body) = self.into_parts();
        (status, Json(body)).into_response()
    }
}
