//! Upstream request-shape negotiation.
//!
//! A [`Plan`] describes one logical upstream operation together with the
//! aspects of the request that are uncertain ([`Dimension`]s). The
//! [`UpstreamCaller`] expands the plan into candidate [`Variant`]s, sends them
//! in order and uses the [`classify`] rules to decide whether to stop or move
//! on. The [`relay`] helpers turn an accepted response into what the dashboard
//! expects.

pub mod caller;
pub mod classify;
pub mod config;
pub mod error;
pub mod relay;
pub mod variant;

pub use caller::{parse_body, Negotiated, UpstreamCaller};
pub use classify::{classify, Classification, MismatchRule, State};
pub use config::{UpstreamConfig, UpstreamPaths};
pub use error::NegotiationError;
pub use relay::SessionCookies;
pub use variant::{Choice, Dimension, Encoding, Patch, Plan, Variant};
