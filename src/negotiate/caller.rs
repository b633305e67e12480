//! Sequential execution of negotiated candidates against the upstream.

use reqwest::{
    header::{ACCEPT, CACHE_CONTROL, CONTENT_TYPE},
    Client, StatusCode,
};
use secrecy::ExposeSecret;
use serde_json::{json, Value};
use tracing::{debug, info_span, warn, Instrument};
use url::Url;

use super::{
    classify::{classify, Classification, MismatchRule, State},
    config::UpstreamConfig,
    error::NegotiationError,
    variant::{Plan, Variant},
};
use crate::APP_USER_AGENT;

const ACCEPT_ANY: &str = "application/json, text/plain, */*";

/// The accepted response of a negotiation.
#[derive(Debug, Clone)]
pub struct Negotiated {
    pub status: StatusCode,
    pub body: Value,
    /// The variant the upstream accepted.
    pub variant: Variant,
    /// Labels of every variant sent, in order, including the accepted one.
    pub attempts: Vec<String>,
}

#[derive(Debug, Clone)]
pub struct UpstreamCaller {
    client: Client,
    config: UpstreamConfig,
}

impl UpstreamCaller {
    /// Build the caller and its HTTP client.
    ///
    /// # Errors
    /// Returns an error if the HTTP client cannot be built.
    pub fn new(config: UpstreamConfig) -> Result<Self, NegotiationError> {
        let client = Client::builder()
            .user_agent(APP_USER_AGENT)
            .timeout(config.timeout())
            .build()
            .map_err(|err| NegotiationError::InvalidRequest(format!("http client: {err}")))?;

        Ok(Self { client, config })
    }

    #[must_use]
    pub fn config(&self) -> &UpstreamConfig {
        &self.config
    }

    /// Try the plan's variants in order until one is accepted or rejected for
    /// a reason other than a schema mismatch.
    ///
    /// # Errors
    /// - [`NegotiationError::Network`] when no response was received.
    /// - [`NegotiationError::Upstream`] on a terminal rejection.
    /// - [`NegotiationError::Exhausted`] when every variant hit a schema mismatch.
    pub async fn negotiate(
        &self,
        plan: &Plan,
        rule: &MismatchRule,
    ) -> Result<Negotiated, NegotiationError> {
        let url = self.config.endpoint(plan.path())?;
        let variants = plan.variants();
        let span = info_span!(
            "upstream.negotiate",
            operation = plan.operation(),
            url = %url,
            candidates = variants.len()
        );

        self.run(&url, variants, rule).instrument(span).await
    }

    async fn run(
        &self,
        url: &Url,
        variants: Vec<Variant>,
        rule: &MismatchRule,
    ) -> Result<Negotiated, NegotiationError> {
        let total = variants.len();
        let mut attempts = Vec::with_capacity(total);
        let mut state = State::Trying;

        for (index, variant) in variants.into_iter().enumerate() {
            let (status, text) = self.send(url, &variant).await?;
            attempts.push(variant.label.clone());

            let classification = classify(status, &text, rule);
            let has_more = index + 1 < total;
            debug!(
                variant = %variant.label,
                status = status.as_u16(),
                ?classification,
                "upstream attempt"
            );

            state = state.next(classification, has_more);
            match state {
                State::Trying => {}
                State::Success => {
                    return Ok(Negotiated {
                        status,
                        body: parse_body(&text),
                        variant,
                        attempts,
                    });
                }
                State::TerminalFailure if classification == Classification::Advance => {
                    warn!(status = status.as_u16(), "upstream rejected all variants");
                    return Err(NegotiationError::Exhausted {
                        status,
                        body: parse_body(&text),
                        attempts,
                    });
                }
                State::TerminalFailure => {
                    warn!(
                        variant = %variant.label,
                        status = status.as_u16(),
                        "upstream rejected request"
                    );
                    return Err(NegotiationError::Upstream {
                        status,
                        body: parse_body(&text),
                        variant: variant.label,
                        attempts,
                    });
                }
            }
        }

        // Plans always yield at least one variant.
        Err(NegotiationError::InvalidRequest(
            "plan produced no variants".to_string(),
        ))
    }

    async fn send(
        &self,
        url: &Url,
        variant: &Variant,
    ) -> Result<(StatusCode, String), NegotiationError> {
        let mut request = self
            .client
            .request(variant.method.clone(), url.clone())
            .header(ACCEPT, ACCEPT_ANY)
            .header(CACHE_CONTROL, "no-store");

        if let Some((header, key)) = self.config.api_key() {
            request = request.header(header, key.expose_secret());
        }
        for (name, value) in &variant.headers {
            request = request.header(name.as_str(), value.as_str());
        }
        if !variant.query.is_empty() {
            request = request.query(&variant.query);
        }
        if let Some(body) = variant.encoded_body() {
            request = request
                .header(CONTENT_TYPE, variant.encoding.content_type())
                .body(body);
        }

        let network_error = |err: reqwest::Error| {
            if err.is_builder() {
                return NegotiationError::InvalidRequest(err.to_string());
            }
            NegotiationError::Network {
                url: url.to_string(),
                variant: variant.label.clone(),
                timeout: err.is_timeout(),
                detail: err.to_string(),
            }
        };

        let response = request.send().await.map_err(network_error)?;
        let status = response.status();
        let text = response.text().await.map_err(network_error)?;

        Ok((status, text))
    }
}

/// Parse an upstream body as JSON, wrapping non-JSON text as `{"raw": text}`.
/// An empty body becomes `null`.
#[must_use]
pub fn parse_body(text: &str) -> Value {
    if text.trim().is_empty() {
        return Value::Null;
    }
    serde_json::from_str(text).unwrap_or_else(|_| json!({ "raw": text }))
}
