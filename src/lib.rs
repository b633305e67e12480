//! # smv-proxy (Visa Logistics Console Proxy)
//!
//! `smv-proxy` sits between the agents' logistics dashboard and the upstream
//! visa-processing API. It forwards OTP login, order search and logistics
//! status updates, and it owns the browser session cookie.
//!
//! ## Negotiation
//!
//! The upstream contract is loosely specified: field names, sort syntax, body
//! encoding and the `Authorization` scheme have all changed over time. Each
//! logical operation is therefore described as a [`negotiate::Plan`], which
//! expands into an ordered list of candidate variants. Candidates are sent one
//! at a time and every response is classified:
//!
//! - **2xx**: accepted, remaining candidates are skipped.
//! - **4xx complaining about a field shape** (e.g. `"sort must be an array"`):
//!   the next candidate is tried.
//! - **anything else**: reported to the caller immediately.
//!
//! ## Sessions
//!
//! After OTP verification the upstream token is stored in the `smv_token`
//! cookie (`HttpOnly`, `Secure`, `SameSite=Lax`) along with an `smv_auth`
//! presence marker. Nothing is persisted server-side.

pub mod api;
pub mod cli;
pub mod negotiate;

#[allow(clippy::doc_markdown, clippy::needless_raw_string_hashes)]
pub mod built_info {
    include!(concat!(env!("OUT_DIR"), "/built.rs"));
}

pub const GIT_COMMIT_HASH: &str = match built_info::GIT_COMMIT_HASH {
    Some(hash) => hash,
    None => "unknown",
};

pub const APP_USER_AGENT: &str = concat!(env!("CARGO_PKG_NAME"), "/", env!("CARGO_PKG_VERSION"),);
