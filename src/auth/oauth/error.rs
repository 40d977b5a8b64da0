//! OAuth-specific error types for the Flicksell authentication SDK.
//!
//! # Example
//!
//! ```rust
//! use flicksell_auth::auth::oauth::OAuthError;
//!
//! let error = OAuthError::TokenRefreshFailed {
//!     status: 400,
//!     message: r#"{"error":"invalid_grant"}"#.to_string(),
//! };
//! assert!(error.to_string().contains("invalid_grant"));
//! ```

use crate::clients::HttpError;
use crate::config::Scope;
use thiserror::Error;

/// Errors that can occur during OAuth operations.
///
/// Token endpoint failures carry the platform's raw error body in `message`.
/// A `status` of 0 means the request never produced a response (network
/// failure or timeout). Failed calls are never retried automatically.
///
/// # Example
///
/// ```rust
/// use flicksell_auth::auth::oauth::OAuthError;
///
/// fn needs_reauthorization(err: &OAuthError) -> bool {
///     matches!(
///         err,
///         OAuthError::TokenExpiredNoRefresh
///             | OAuthError::NotAuthenticated { .. }
///             | OAuthError::TokenRefreshFailed { .. }
///     )
/// }
/// ```
#[derive(Debug, Error)]
pub enum OAuthError {
    /// Code exchange or legacy authentication failed.
    #[error("Token exchange failed with status {status}: {message}")]
    TokenExchangeFailed {
        /// The HTTP status code returned, 0 for transport failures.
        status: u16,
        /// The raw error body, or a description of the transport failure.
        message: String,
    },

    /// Token refresh failed. The stored token has been discarded.
    #[error("Token refresh failed with status {status}: {message}")]
    TokenRefreshFailed {
        /// The HTTP status code returned, 0 for transport failures.
        status: u16,
        /// The raw error body, or a description of the transport failure.
        message: String,
    },

    /// The stored token expired and carries no refresh token.
    #[error("Access token expired and no refresh token is available")]
    TokenExpiredNoRefresh,

    /// No token is stored for the scope; run the authorization flow first.
    #[error("No access token for the {scope} scope; authorization is required")]
    NotAuthenticated {
        /// The scope without a token.
        scope: Scope,
    },

    /// No credential is configured for the scope.
    #[error("No credential configured for the {scope} scope")]
    MissingCredential {
        /// The scope without a credential.
        scope: Scope,
    },

    /// Legacy authentication needs a configured principal.
    #[error("A principal (site identifier) must be configured for legacy authentication")]
    MissingPrincipal,

    /// Callback parameters are invalid or malformed.
    #[error("Invalid callback: {reason}")]
    InvalidCallback {
        /// Description of what's invalid about the callback.
        reason: String,
    },

    /// OAuth state parameter mismatch.
    #[error("State parameter mismatch: expected '{expected}', received '{received}'")]
    StateMismatch {
        /// The expected state value that was generated.
        expected: String,
        /// The state value received in the callback.
        received: String,
    },

    /// Wrapped HTTP client error.
    #[error(transparent)]
    HttpError(#[from] HttpError),
}

// Verify OAuthError is Send + Sync at compile time
const _: fn() = || {
    const fn assert_send_sync<T: Send + Sync>() {}
    assert_send_sync::<OAuthError>();
};
