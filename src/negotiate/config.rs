//! Upstream endpoint configuration, built once at startup.

use secrecy::SecretString;
use std::time::Duration;
use url::Url;

use super::error::NegotiationError;

pub const DEFAULT_API_BASE: &str = "https://api.live.stampmyvisa.com";
pub const DEFAULT_ORIGIN: &str = "https://internal.stampmyvisa.com";
pub const DEFAULT_CONSUMER: &str = "nucleus";
pub const DEFAULT_CHECK_USER_PATH: &str = "/v1/auth/check-user";
pub const DEFAULT_SEND_OTP_PATH: &str = "/v1/auth/send-login-otp";
pub const DEFAULT_VERIFY_OTP_PATH: &str = "/v1/auth/verify-login-otp";
pub const DEFAULT_SEARCH_PATH: &str = "/v1/logistics/search";
pub const DEFAULT_ORDERS_SEARCH_PATH: &str = "/v1/orders/search";
pub const DEFAULT_BULK_UPDATE_PATH: &str = "/v1/logistics/bulk-update";
pub const DEFAULT_UPDATE_STATUS_PATH: &str = "/v1/logistics/update-status";
pub const DEFAULT_TIMEOUT_SECONDS: u64 = 15;

/// Per-operation upstream paths.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct UpstreamPaths {
    pub check_user: String,
    pub send_otp: String,
    pub verify_otp: String,
    pub search: String,
    pub search_order: String,
    pub search_passport: String,
    pub bulk_update: String,
    pub update_status: String,
}

impl Default for UpstreamPaths {
    fn default() -> Self {
        Self {
            check_user: DEFAULT_CHECK_USER_PATH.to_string(),
            send_otp: DEFAULT_SEND_OTP_PATH.to_string(),
            verify_otp: DEFAULT_VERIFY_OTP_PATH.to_string(),
            search: DEFAULT_SEARCH_PATH.to_string(),
            search_order: DEFAULT_ORDERS_SEARCH_PATH.to_string(),
            search_passport: DEFAULT_ORDERS_SEARCH_PATH.to_string(),
            bulk_update: DEFAULT_BULK_UPDATE_PATH.to_string(),
            update_status: DEFAULT_UPDATE_STATUS_PATH.to_string(),
        }
    }
}

#[derive(Clone, Debug)]
pub struct UpstreamConfig {
    base_url: String,
    paths: UpstreamPaths,
    consumer: String,
    default_retry: bool,
    origin: String,
    api_bearer: Option<SecretString>,
    api_key: Option<(String, SecretString)>,
    timeout: Duration,
}

impl Default for UpstreamConfig {
    fn default() -> Self {
        Self::new(DEFAULT_API_BASE.to_string())
    }
}

impl UpstreamConfig {
    #[must_use]
    pub fn new(base_url: String) -> Self {
        Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            paths: UpstreamPaths::default(),
            consumer: DEFAULT_CONSUMER.to_string(),
            default_retry: true,
            origin: DEFAULT_ORIGIN.to_string(),
            api_bearer: None,
            api_key: None,
            timeout: Duration::from_secs(DEFAULT_TIMEOUT_SECONDS),
        }
    }

    #[must_use]
    pub fn with_paths(mut self, paths: UpstreamPaths) -> Self {
        self.paths = paths;
        self
    }

    #[must_use]
    pub fn with_consumer(mut self, consumer: String) -> Self {
        self.consumer = consumer;
        self
    }

    #[must_use]
    pub fn with_default_retry(mut self, retry: bool) -> Self {
        self.default_retry = retry;
        self
    }

    #[must_use]
    pub fn with_origin(mut self, origin: String) -> Self {
        self.origin = origin.trim_end_matches('/').to_string();
        self
    }

    #[must_use]
    pub fn with_api_bearer(mut self, bearer: Option<SecretString>) -> Self {
        self.api_bearer = bearer;
        self
    }

    #[must_use]
    pub fn with_api_key(mut self, api_key: Option<(String, SecretString)>) -> Self {
        self.api_key = api_key;
        self
    }

    #[must_use]
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    #[must_use]
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    #[must_use]
    pub fn paths(&self) -> &UpstreamPaths {
        &self.paths
    }

    #[must_use]
    pub fn consumer(&self) -> &str {
        &self.consumer
    }

    #[must_use]
    pub fn default_retry(&self) -> bool {
        self.default_retry
    }

    #[must_use]
    pub fn origin(&self) -> &str {
        &self.origin
    }

    #[must_use]
    pub fn api_bearer(&self) -> Option<&SecretString> {
        self.api_bearer.as_ref()
    }

    #[must_use]
    pub fn api_key(&self) -> Option<(&str, &SecretString)> {
        self.api_key
            .as_ref()
            .map(|(header, key)| (header.as_str(), key))
    }

    #[must_use]
    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    /// Join the base URL and an operation path.
    ///
    /// # Errors
    /// Returns an error if the result is not a valid URL.
    pub fn endpoint(&self, path: &str) -> Result<Url, NegotiationError> {
        let path = if path.starts_with('/') || path.is_empty() {
            path.to_string()
        } else {
            format!("/{path}")
        };
        let raw = format!("{}{path}", self.base_url);
        Url::parse(&raw).map_err(|err| {
            NegotiationError::InvalidRequest(format!("invalid upstream URL {raw}: {err}"))
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use secrecy::ExposeSecret;

    #[test]
    fn defaults_match_production_upstream() {
        let config = UpstreamConfig::default();
        assert_eq!(config.base_url(), DEFAULT_API_BASE);
        assert_eq!(config.origin(), DEFAULT_ORIGIN);
        assert_eq!(config.consumer(), "nucleus");
        assert!(config.default_retry());
        assert_eq!(config.paths().verify_otp, "/v1/auth/verify-login-otp");
        assert!(config.api_bearer().is_none());
    }

    #[test]
    fn endpoint_joins_base_and_path() {
        let config = UpstreamConfig::new("http://127.0.0.1:9000/".to_string());
        let url = config.endpoint("/v1/logistics/search").map(|u| u.to_string());
        assert_eq!(
            url.ok().as_deref(),
            Some("http://127.0.0.1:9000/v1/logistics/search")
        );

        let url = config.endpoint("v1/orders/search").map(|u| u.to_string());
        assert_eq!(
            url.ok().as_deref(),
            Some("http://127.0.0.1:9000/v1/orders/search")
        );
    }

    #[test]
    fn endpoint_rejects_invalid_base() {
        let config = UpstreamConfig::new("not a url".to_string());
        assert!(config.endpoint("/v1/x").is_err());
    }

    #[test]
    fn api_key_is_exposed_only_on_demand() {
        let config = UpstreamConfig::default().with_api_key(Some((
            "x-api-key".to_string(),
            SecretString::from("k-123".to_string()),
        )));
        let rendered = format!("{config:?}");
        assert!(!rendered.contains("k-123"));
        let (header, key) = config
            .api_key()
            .map(|(h, k)| (h.to_string(), k.expose_secret().to_string()))
            .unwrap_or_default();
        assert_eq!(header, "x-api-key");
        assert_eq!(key, "k-123");
    }
}
