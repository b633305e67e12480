//! Logistics search and status handlers.

pub mod bulk_search;
pub mod search;
pub mod status;
pub mod types;

use axum::http::HeaderMap;
use secrecy::SecretString;

use crate::negotiate::{relay, UpstreamConfig};

/// Token used for upstream `Authorization`: the browser session first, then
/// the configured service bearer.
pub(crate) fn upstream_token(headers: &HeaderMap, config: &UpstreamConfig) -> Option<SecretString> {
    relay::session_token(headers).or_else(|| config.api_bearer().cloned())
}
