//! Error types for the Flicksell authentication SDK.
//!
//! This module contains the configuration error type used by the validated
//! newtypes and by [`AuthConfigBuilder::build`](crate::AuthConfigBuilder::build).
//!
//! # Error Handling
//!
//! All configuration constructors return `Result<T, ConfigError>` to enable
//! fail-fast validation. Error messages are designed to be clear and actionable.
//!
//! # Example
//!
//! ```rust
//! use flicksell_auth::{ApiKey, ConfigError};
//!
//! let result = ApiKey::new("");
//! assert!(matches!(result, Err(ConfigError::EmptyApiKey)));
//! ```

use thiserror::Error;

/// Errors that can occur during SDK configuration.
///
/// Each variant provides a clear, actionable error message. Configuration
/// errors are raised at construction time, never during request handling.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ConfigError {
    /// API key cannot be empty.
    #[error("API key cannot be empty. Please provide a valid Flicksell API key.")]
    EmptyApiKey,

    /// API secret key cannot be empty.
    #[error("API secret key cannot be empty. Please provide a valid Flicksell API secret.")]
    EmptyApiSecretKey,

    /// App handle cannot be empty.
    #[error("App handle cannot be empty.")]
    EmptyAppHandle,

    /// Principal (site identifier) is invalid.
    #[error("Invalid principal '{principal}'. Expected a non-empty site identifier without whitespace.")]
    InvalidPrincipal {
        /// The invalid principal that was provided.
        principal: String,
    },

    /// Base URL is invalid.
    #[error("Invalid base URL '{url}'. Please provide a valid URL with scheme (e.g., 'https://api.flicksell.com').")]
    InvalidBaseUrl {
        /// The invalid URL that was provided.
        url: String,
    },

    /// Scopes are invalid.
    #[error("Invalid scopes: {reason}")]
    InvalidScopes {
        /// The reason the scopes are invalid.
        reason: String,
    },

    /// A required field is missing.
    #[error("Missing required field: '{field}'. This field must be set before building the configuration.")]
    MissingRequiredField {
        /// The name of the missing field.
        field: &'static str,
    },

    /// No credential (key + secret pair) was configured.
    #[error("At least one credential pair (storefront or admin key + secret) must be configured.")]
    MissingCredentialPair,

    /// Two credentials were configured for the same scope.
    #[error("A credential for the {scope} scope is already configured.")]
    DuplicateScope {
        /// The scope configured twice.
        scope: &'static str,
    },

    /// The maximum timestamp age exceeds the hard ceiling.
    #[error("Maximum timestamp age of {seconds}s exceeds the ceiling of {ceiling}s.")]
    TimestampAgeTooLarge {
        /// The requested age in seconds.
        seconds: u64,
        /// The hard ceiling in seconds.
        ceiling: u64,
    },

    /// A duration that must be positive was set to zero.
    #[error("'{field}' must be greater than zero.")]
    ZeroDuration {
        /// The name of the zero field.
        field: &'static str,
    },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_api_key_error_message() {
        let error = ConfigError::EmptyApiKey;
        let message = error.to_string();
        assert!(message.contains("API key cannot be empty"));
    }

    #[test]
    fn test_missing_credential_pair_message() {
        let message = ConfigError::MissingCredentialPair.to_string();
        assert!(message.contains("credential pair"));
    }

    #[test]
    fn test_timestamp_age_too_large_includes_values() {
        let error = ConfigError::TimestampAgeTooLarge {
            seconds: 7200,
            ceiling: 3600,
        };
        let message = error.to_string();
        assert!(message.contains("7200"));
        assert!(message.contains("3600"));
    }

    #[test]
    fn test_zero_duration_names_the_field() {
        let message = ConfigError::ZeroDuration { field: "timeout" }.to_string();
        assert!(message.contains("'timeout'"));
    }

    #[test]
    fn test_error_implements_std_error() {
        let error = ConfigError::EmptyApiKey;
        let _: &dyn std::error::Error = &error;
    }
}
