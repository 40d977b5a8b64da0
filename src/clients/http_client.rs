//! Transport used for token endpoint calls and signed platform requests.

use crate::clients::errors::{HttpError, HttpResponseError};
use crate::clients::signer::SignedRequest;
use crate::config::AuthConfig;
use std::collections::HashMap;
use std::fmt;
use std::time::Duration;

/// SDK version from Cargo.toml.
pub const SDK_VERSION: &str = env!("CARGO_PKG_VERSION");

/// HTTP methods supported by signed requests.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum HttpMethod {
    /// HTTP GET method.
    Get,
    /// HTTP POST method.
    Post,
    /// HTTP PUT method.
    Put,
    /// HTTP DELETE method.
    Delete,
}

impl fmt::Display for HttpMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Get => write!(f, "get"),
            Self::Post => write!(f, "post"),
            Self::Put => write!(f, "put"),
            Self::Delete => write!(f, "delete"),
        }
    }
}

/// A successful (2xx) response.
#[derive(Clone, Debug)]
pub struct HttpResponse {
    /// HTTP status code.
    pub code: u16,
    /// Response headers, lowercase names.
    pub headers: HashMap<String, Vec<String>>,
    /// Raw response body.
    pub body: String,
}

impl HttpResponse {
    /// Returns the `X-Request-Id` header value, if present.
    #[must_use]
    pub fn request_id(&self) -> Option<&str> {
        self.headers
            .get("x-request-id")
            .and_then(|values| values.first())
            .map(String::as_str)
    }

    /// Parses the body as JSON.
    ///
    /// # Errors
    ///
    /// Returns the parse error if the body is not valid JSON for `T`.
    pub fn json<T: serde::de::DeserializeOwned>(&self) -> Result<T, serde_json::Error> {
        serde_json::from_str(&self.body)
    }
}

/// HTTP client honoring the configured timeout and TLS verification.
///
/// Every call is bounded by [`AuthConfig::timeout`]; there is no other
/// cancellation mechanism. Requests are never retried automatically.
///
/// # Example
///
/// ```rust
/// use flicksell_auth::clients::HttpClient;
/// use flicksell_auth::{ApiKey, ApiSecretKey, AuthConfig, Credential, Scope};
///
/// let config = AuthConfig::builder()
///     .credential(Credential::new(
///         Scope::Admin,
///         ApiKey::new("key").unwrap(),
///         ApiSecretKey::new("secret").unwrap(),
///     ))
///     .user_agent_prefix("MyApp/1.0")
///     .build()
///     .unwrap();
///
/// let client = HttpClient::new(&config).unwrap();
/// assert!(client.user_agent().starts_with("MyApp/1.0 | Flicksell Auth Library v"));
/// ```
#[derive(Clone, Debug)]
pub struct HttpClient {
    client: reqwest::Client,
    user_agent: String,
    timeout: Duration,
}

impl HttpClient {
    /// Creates a client from the configuration.
    ///
    /// # Errors
    ///
    /// Returns [`HttpError::Client`] if the TLS backend cannot be initialized.
    pub fn new(config: &AuthConfig) -> Result<Self, HttpError> {
        let user_agent_prefix = config
            .user_agent_prefix()
            .map_or(String::new(), |prefix| format!("{prefix} | "));
        let rust_version = env!("CARGO_PKG_RUST_VERSION");
        let user_agent =
            format!("{user_agent_prefix}Flicksell Auth Library v{SDK_VERSION} | Rust {rust_version}");

        if !config.ssl_verify() {
            tracing::warn!("TLS certificate verification is disabled");
        }

        let client = reqwest::Client::builder()
            .use_rustls_tls()
            .timeout(config.timeout())
            .danger_accept_invalid_certs(!config.ssl_verify())
            .build()
            .map_err(HttpError::Client)?;

        Ok(Self {
            client,
            user_agent,
            timeout: config.timeout(),
        })
    }

    /// Returns the `User-Agent` sent with every request.
    #[must_use]
    pub fn user_agent(&self) -> &str {
        &self.user_agent
    }

    /// Returns the per-request timeout.
    #[must_use]
    pub const fn timeout(&self) -> Duration {
        self.timeout
    }

    /// POSTs a form-encoded body to `url`.
    ///
    /// # Errors
    ///
    /// Returns [`HttpError::Response`] with the raw body for non-2xx
    /// responses, [`HttpError::Timeout`] or [`HttpError::Network`] otherwise.
    pub async fn post_form(
        &self,
        url: &str,
        form: &[(&str, &str)],
    ) -> Result<HttpResponse, HttpError> {
        let request = self
            .client
            .post(url)
            .header("User-Agent", &self.user_agent)
            .header("Accept", "application/json")
            .form(form);
        self.execute(request).await
    }

    /// Sends a request produced by the
    /// [`OutboundSigner`](crate::clients::OutboundSigner).
    ///
    /// # Errors
    ///
    /// Same as [`HttpClient::post_form`].
    pub async fn send(&self, request: SignedRequest) -> Result<HttpResponse, HttpError> {
        let mut builder = match request.method {
            HttpMethod::Get => self.client.get(&request.url),
            HttpMethod::Post => self.client.post(&request.url),
            HttpMethod::Put => self.client.put(&request.url),
            HttpMethod::Delete => self.client.delete(&request.url),
        };

        builder = builder
            .header("User-Agent", &self.user_agent)
            .header("Accept", "application/json");
        for (name, value) in &request.headers {
            builder = builder.header(name, value);
        }
        if let Some(body) = request.body {
            builder = builder.body(body);
        }

        self.execute(builder).await
    }

    async fn execute(&self, request: reqwest::RequestBuilder) -> Result<HttpResponse, HttpError> {
        let response = request.send().await.map_err(|e| self.map_transport(e))?;

        let code = response.status().as_u16();
        let headers = Self::parse_response_headers(response.headers());
        let body = response.text().await.map_err(|e| self.map_transport(e))?;

        if !(200..=299).contains(&code) {
            let error_reference = headers
                .get("x-request-id")
                .and_then(|values| values.first())
                .cloned();
            return Err(HttpError::Response(HttpResponseError {
                code,
                message: body,
                error_reference,
            }));
        }

        Ok(HttpResponse {
            code,
            headers,
            body,
        })
    }

    fn map_transport(&self, error: reqwest::Error) -> HttpError {
        if error.is_timeout() {
            HttpError::Timeout {
                after: self.timeout,
            }
        } else {
            HttpError::Network(error)
        }
    }

    /// Parses response headers into a `HashMap`.
    fn parse_response_headers(
        headers: &reqwest::header::HeaderMap,
    ) -> HashMap<String, Vec<String>> {
        let mut result: HashMap<String, Vec<String>> = HashMap::new();
        for (name, value) in headers {
            let key = name.as_str().to_lowercase();
            let value = value.to_str().unwrap_or_default().to_string();
            result.entry(key).or_default().push(value);
        }
        result
    }
}
