//! HTTP client for the Gateway SDK.

use crate::config::ClientConfig;
use crate::error::{ApiErrorResponse, Error, Result};
use crate::response::{HealthResponse, ProviderStatus};
use crate::streaming::EventStream;
use gateway_core::{GenerationRequest, GenerationRequestBuilder, GenerationResult};
use reqwest::header::{
    HeaderMap, HeaderName, HeaderValue, ACCEPT, AUTHORIZATION, CONTENT_TYPE, USER_AGENT,
};
use secrecy::Secret;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, instrument};
use url::Url;

/// Client for the cardio generation gateway.
///
/// # Example
///
/// ```rust,no_run
/// use gateway_sdk::Client;
///
/// #[tokio::main]
/// async fn main() -> Result<(), gateway_sdk::Error> {
///     let client = Client::builder()
///         .base_url("http://localhost:8080")
///         .build()?;
///
///     let request = client.request("How much rest between sets?").build()?;
///     let result = client.generate(&request).await?;
///
///     println!("{}", result.text);
///     Ok(())
/// }
/// ```
#[derive(Clone)]
pub struct Client {
    /// HTTP client.
    http: reqwest::Client,
    /// Client configuration.
    config: Arc<ClientConfig>,
}

impl Client {
    /// Create a new client builder.
    pub fn builder() -> ClientBuilder {
        ClientBuilder::new()
    }

    /// Create a new client with the given configuration.
    pub fn new(config: ClientConfig) -> Result<Self> {
        let mut headers = HeaderMap::new();
        headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
        headers.insert(
            USER_AGENT,
            HeaderValue::from_str(&config.user_agent)
                .map_err(|e| Error::configuration(format!("Invalid user agent: {e}")))?,
        );

        if let Some(api_key) = config.api_key_value() {
            headers.insert(
                AUTHORIZATION,
                HeaderValue::from_str(&format!("Bearer {api_key}"))
                    .map_err(|e| Error::configuration(format!("Invalid API key: {e}")))?,
            );
        }

        for (name, value) in &config.custom_headers {
            let header_name = HeaderName::try_from(name.as_str())
                .map_err(|e| Error::configuration(format!("Invalid header name '{name}': {e}")))?;
            let header_value = HeaderValue::from_str(value).map_err(|e| {
                Error::configuration(format!("Invalid header value for '{name}': {e}"))
            })?;
            headers.insert(header_name, header_value);
        }

        // No client-wide timeout: it would also cut long streams short.
        let http = reqwest::Client::builder()
            .connect_timeout(config.connect_timeout)
            .default_headers(headers)
            .build()
            .map_err(|e| Error::configuration(format!("Failed to create HTTP client: {e}")))?;

        Ok(Self {
            http,
            config: Arc::new(config),
        })
    }

    /// Get the client configuration.
    pub fn config(&self) -> &ClientConfig {
        &self.config
    }

    /// Start a request for `prompt`, with the default content type applied.
    pub fn request(&self, prompt: impl Into<String>) -> GenerationRequestBuilder {
        let builder = GenerationRequest::builder(prompt);
        match self.config.default_content_type() {
            Some(content_type) => builder.content_type(content_type),
            None => builder,
        }
    }

    /// Generate a whole, guardrail-cleared result.
    #[instrument(skip(self, request), fields(request_id = %request.id()))]
    pub async fn generate(&self, request: &GenerationRequest) -> Result<GenerationResult> {
        let url = self.url("/v1/generate")?;

        debug!(%url, "Sending generate request");

        let response = self
            .http
            .post(url)
            .timeout(self.config.timeout)
            .json(request)
            .send()
            .await
            .map_err(|e| self.map_reqwest_error(e))?;

        self.handle_response(response).await
    }

    /// Open a streaming generation.
    ///
    /// Errors before the stream opens (validation, unreachable gateway) are
    /// returned here; failures after that arrive as an `Error` chunk.
    #[instrument(skip(self, request), fields(request_id = %request.id()))]
    pub async fn generate_stream(&self, request: &GenerationRequest) -> Result<EventStream> {
        let url = self.url("/v1/generate/stream")?;

        debug!(%url, "Opening generation stream");

        let response = self
            .http
            .post(url)
            .header(ACCEPT, "text/event-stream")
            .json(request)
            .send()
            .await
            .map_err(|e| self.map_reqwest_error(e))?;

        if !response.status().is_success() {
            return Err(self.handle_error_response(response).await);
        }

        Ok(EventStream::new(response.bytes_stream()))
    }

    /// Check the health of the gateway.
    #[instrument(skip(self))]
    pub async fn health(&self) -> Result<HealthResponse> {
        let url = self.url("/health")?;

        debug!(%url, "Checking health");

        let response = self
            .http
            .get(url)
            .timeout(self.config.timeout)
            .send()
            .await
            .map_err(|e| self.map_reqwest_error(e))?;

        self.handle_response(response).await
    }

    /// Check if the gateway is healthy.
    pub async fn is_healthy(&self) -> bool {
        self.health().await.map(|h| h.is_healthy()).unwrap_or(false)
    }

    /// Health of each configured provider.
    #[instrument(skip(self))]
    pub async fn providers(&self) -> Result<Vec<ProviderStatus>> {
        let url = self.url("/admin/providers")?;

        let response = self
            .http
            .get(url)
            .timeout(self.config.timeout)
            .send()
            .await
            .map_err(|e| self.map_reqwest_error(e))?;

        self.handle_response(response).await
    }

    /// Build a URL for the given path.
    fn url(&self, path: &str) -> Result<Url> {
        self.config
            .base_url
            .join(path)
            .map_err(|e| Error::configuration(format!("Invalid URL path '{path}': {e}")))
    }

    async fn handle_response<T: serde::de::DeserializeOwned>(
        &self,
        response: reqwest::Response,
    ) -> Result<T> {
        if response.status().is_success() {
            response
                .json()
                .await
                .map_err(|e| Error::parse_error(format!("Failed to parse response: {e}")))
        } else {
            Err(self.handle_error_response(response).await)
        }
    }

    async fn handle_error_response(&self, response: reqwest::Response) -> Error {
        let status = response.status().as_u16();
        let request_id = response
            .headers()
            .get("x-request-id")
            .and_then(|v| v.to_str().ok())
            .map(String::from);

        let body = response.text().await.unwrap_or_default();

        if let Ok(api_error) = serde_json::from_str::<ApiErrorResponse>(&body) {
            return Error::Api {
                status,
                message: api_error.error.message,
                error_type: api_error.error.error_type,
                provider: api_error.error.provider,
                request_id,
            };
        }

        Error::Api {
            status,
            message: if body.is_empty() {
                format!("HTTP {status}")
            } else {
                body
            },
            error_type: None,
            provider: None,
            request_id,
        }
    }

    fn map_reqwest_error(&self, error: reqwest::Error) -> Error {
        if error.is_timeout() {
            Error::Timeout {
                duration_ms: u64::try_from(self.config.timeout.as_millis()).unwrap_or(u64::MAX),
            }
        } else if error.is_connect() {
            Error::Connection {
                message: error.to_string(),
            }
        } else {
            Error::Http(error)
        }
    }
}

/// Builder for creating a Client.
#[derive(Debug, Default)]
pub struct ClientBuilder {
    base_url: Option<String>,
    api_key: Option<Secret<String>>,
    timeout: Option<Duration>,
    connect_timeout: Option<Duration>,
    user_agent: Option<String>,
    default_content_type: Option<String>,
    custom_headers: Vec<(String, String)>,
}

impl ClientBuilder {
    /// Create a new client builder.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the base URL.
    pub fn base_url(mut self, url: impl Into<String>) -> Self {
        self.base_url = Some(url.into());
        self
    }

    /// Set the API key.
    pub fn api_key(mut self, key: impl Into<String>) -> Self {
        self.api_key = Some(Secret::new(key.into()));
        self
    }

    /// Set the whole-result request timeout.
    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    /// Set the connection timeout.
    pub fn connect_timeout(mut self, timeout: Duration) -> Self {
        self.connect_timeout = Some(timeout);
        self
    }

    /// Set the user agent.
    pub fn user_agent(mut self, user_agent: impl Into<String>) -> Self {
        self.user_agent = Some(user_agent.into());
        self
    }

    /// Set the content type applied by [`Client::request`].
    pub fn default_content_type(mut self, content_type: impl Into<String>) -> Self {
        self.default_content_type = Some(content_type.into());
        self
    }

    /// Add a custom header.
    pub fn header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.custom_headers.push((name.into(), value.into()));
        self
    }

    /// Build the client.
    pub fn build(self) -> Result<Client> {
        let raw = self
            .base_url
            .as_deref()
            .unwrap_or(ClientConfig::DEFAULT_BASE_URL);
        let base_url = Url::parse(raw)
            .map_err(|e| Error::configuration(format!("Invalid base URL '{raw}': {e}")))?;

        let mut config = ClientConfig::new(base_url);
        config.api_key = self.api_key;
        config.timeout = self.timeout.unwrap_or(ClientConfig::DEFAULT_TIMEOUT);
        config.connect_timeout = self
            .connect_timeout
            .unwrap_or(ClientConfig::DEFAULT_CONNECT_TIMEOUT);
        if let Some(user_agent) = self.user_agent {
            config.user_agent = user_agent;
        }
        config.default_content_type = self.default_content_type;
        config.custom_headers = self.custom_headers;

        Client::new(config)
    }
}

impl std::fmt::Debug for Client {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Client")
            .field("base_url", &self.config.base_url)
            .field("has_api_key", &self.config.has_api_key())
            .finish()
    }
}
