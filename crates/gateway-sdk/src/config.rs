//! Client configuration for the Gateway SDK.

use secrecy::{ExposeSecret, Secret};
use std::time::Duration;
use url::Url;

/// Configuration for the Gateway SDK client.
#[derive(Debug, Clone)]
pub struct ClientConfig {
    /// Base URL of the gateway server.
    pub(crate) base_url: Url,
    /// API key sent as a bearer token, for gateways behind an auth proxy.
    pub(crate) api_key: Option<Secret<String>>,
    /// Timeout for whole-result requests.
    ///
    /// Streaming requests are not bounded by it; dropping the stream ends them.
    pub(crate) timeout: Duration,
    /// Connection timeout duration.
    pub(crate) connect_timeout: Duration,
    /// User agent string.
    pub(crate) user_agent: String,
    /// Content type used when a request does not set one.
    pub(crate) default_content_type: Option<String>,
    /// Custom headers to include in requests.
    pub(crate) custom_headers: Vec<(String, String)>,
}

impl ClientConfig {
    /// Default request timeout (60 seconds), above the gateway's attempt timeout.
    pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(60);
    /// Default connection timeout (10 seconds).
    pub const DEFAULT_CONNECT_TIMEOUT: Duration = Duration::from_secs(10);
    /// Default gateway address.
    pub const DEFAULT_BASE_URL: &'static str = "http://localhost:8080";
    /// Default user agent.
    pub const DEFAULT_USER_AGENT: &'static str = concat!(
        "cardio-gateway-sdk/",
        env!("CARGO_PKG_VERSION")
    );

    /// Create a new configuration with default values.
    pub fn new(base_url: Url) -> Self {
        Self {
            base_url,
            api_key: None,
            timeout: Self::DEFAULT_TIMEOUT,
            connect_timeout: Self::DEFAULT_CONNECT_TIMEOUT,
            user_agent: Self::DEFAULT_USER_AGENT.to_string(),
            default_content_type: None,
            custom_headers: Vec::new(),
        }
    }

    /// Get the base URL.
    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    /// Check if an API key is configured.
    pub fn has_api_key(&self) -> bool {
        self.api_key.is_some()
    }

    pub(crate) fn api_key_value(&self) -> Option<&str> {
        self.api_key.as_ref().map(|s| s.expose_secret().as_str())
    }

    /// Get the request timeout.
    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    /// Get the connection timeout.
    pub fn connect_timeout(&self) -> Duration {
        self.connect_timeout
    }

    /// Get the user agent.
    pub fn user_agent(&self) -> &str {
        &self.user_agent
    }

    /// Get the default content type.
    pub fn default_content_type(&self) -> Option<&str> {
        self.default_content_type.as_deref()
    }

    /// Get custom headers.
    pub fn custom_headers(&self) -> &[(String, String)] {
        &self.custom_headers
    }
}
