//! HTTP-specific error types for the Flicksell authentication SDK.
//!
//! - [`HttpResponseError`]: Non-2xx HTTP responses from the platform
//! - [`HttpError`]: Unified error type encompassing all HTTP-related errors
//!
//! # Example
//!
//! ```rust,ignore
//! use flicksell_auth::clients::HttpError;
//!
//! match client.send(request).await {
//!     Ok(response) => println!("Success: {}", response.body),
//!     Err(HttpError::Response(e)) => println!("API error {}: {}", e.code, e.message),
//!     Err(HttpError::Timeout { after }) => println!("Timed out after {after:?}"),
//!     Err(e) => println!("Transport error: {e}"),
//! }
//! ```

use std::time::Duration;
use thiserror::Error;

/// Error returned when an HTTP request receives a non-successful response.
///
/// The message is the raw response body, so the platform's own error
/// description reaches the caller unchanged.
///
/// # Example
///
/// ```rust
/// use flicksell_auth::clients::HttpResponseError;
///
/// let error = HttpResponseError {
///     code: 401,
///     message: r#"{"error":"invalid_client"}"#.to_string(),
///     error_reference: None,
/// };
/// assert_eq!(error.to_string(), r#"{"error":"invalid_client"}"#);
/// ```
#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[error("{message}")]
pub struct HttpResponseError {
    /// The HTTP status code of the response.
    pub code: u16,
    /// Raw response body.
    pub message: String,
    /// Reference ID for error reporting (from the `X-Request-Id` header).
    pub error_reference: Option<String>,
}

/// Unified error type for all HTTP-related errors.
#[derive(Debug, Error)]
pub enum HttpError {
    /// An HTTP response error (non-2xx status code).
    #[error(transparent)]
    Response(#[from] HttpResponseError),

    /// The request did not complete within the configured timeout.
    #[error("Request timed out after {after:?}")]
    Timeout {
        /// The configured timeout.
        after: Duration,
    },

    /// Network or connection error.
    #[error("Network error: {0}")]
    Network(#[from] reqwest::Error),

    /// The underlying HTTP client could not be constructed.
    #[error("Failed to create HTTP client: {0}")]
    Client(reqwest::Error),
}

// Verify HttpError is Send + Sync at compile time
const _: fn() = || {
    const fn assert_send_sync<T: Send + Sync>() {}
    assert_send_sync::<HttpError>();
};

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_http_response_error_displays_raw_body() {
        let error = HttpResponseError {
            code: 404,
            message: r#"{"error":"Not Found"}"#.to_string(),
            error_reference: None,
        };
        assert_eq!(error.to_string(), r#"{"error":"Not Found"}"#);
    }

    #[test]
    fn test_timeout_message_includes_duration() {
        let error = HttpError::Timeout {
            after: Duration::from_secs(30),
        };
        assert!(error.to_string().contains("30s"));
    }

    #[test]
    fn test_response_error_converts_into_http_error() {
        let error: HttpError = HttpResponseError {
            code: 500,
            message: "boom".to_string(),
            error_reference: Some("abc-123".to_string()),
        }
        .into();
        assert!(matches!(error, HttpError::Response(ref e) if e.code == 500));
        assert_eq!(error.to_string(), "boom");
    }
}
