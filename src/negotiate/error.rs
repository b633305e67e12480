use reqwest::StatusCode;
use serde_json::Value;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum NegotiationError {
    /// No response was received; negotiation stopped at this variant.
    #[error("upstream unreachable at {url} (variant {variant}): {detail}")]
    Network {
        url: String,
        variant: String,
        timeout: bool,
        detail: String,
    },
    /// Every candidate was rejected with a schema mismatch.
    #[error("upstream rejected all {} variants, last status {status}", .attempts.len())]
    Exhausted {
        status: StatusCode,
        body: Value,
        attempts: Vec<String>,
    },
    /// A rejection unrelated to the guessed request shape.
    #[error("upstream returned {status} for variant {variant}")]
    Upstream {
        status: StatusCode,
        body: Value,
        variant: String,
        attempts: Vec<String>,
    },
    /// The upstream reported success but the response lacks a session token.
    #[error("upstream accepted the request but returned no session token")]
    MissingToken { body: Value },
    #[error("invalid upstream request: {0}")]
    InvalidRequest(String),
}

impl NegotiationError {
    /// Upstream status attached to the error, if a response was received.
    #[must_use]
    pub fn upstream_status(&self) -> Option<StatusCode> {
        match self {
            Self::Exhausted { status, .. } | Self::Upstream { status, .. } => Some(*status),
            _ => None,
        }
    }
}
