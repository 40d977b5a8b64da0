//! Validated newtype wrappers for configuration values.
//!
//! This module provides type-safe wrappers around string values that validate
//! their contents on construction. Invalid values are rejected with clear error messages.

use crate::error::ConfigError;
use serde::{de, Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;

/// A validated Flicksell API key.
///
/// The key is public: it travels with every signed request so the platform
/// can pick the matching secret.
///
/// # Example
///
/// ```rust
/// use flicksell_auth::ApiKey;
///
/// let key = ApiKey::new("my-api-key").unwrap();
/// assert_eq!(key.as_ref(), "my-api-key");
/// ```
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct ApiKey(String);

impl ApiKey {
    /// Creates a new validated API key.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::EmptyApiKey`] if the key is empty.
    pub fn new(key: impl Into<String>) -> Result<Self, ConfigError> {
        let key = key.into();
        if key.is_empty() {
            return Err(ConfigError::EmptyApiKey);
        }
        Ok(Self(key))
    }
}

impl AsRef<str> for ApiKey {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

/// A validated Flicksell API secret.
///
/// # Security
///
/// The `Debug` implementation masks the secret value, displaying only
/// `ApiSecretKey(*****)` instead of the actual key.
///
/// # Example
///
/// ```rust
/// use flicksell_auth::ApiSecretKey;
///
/// let secret = ApiSecretKey::new("my-secret").unwrap();
/// assert_eq!(format!("{:?}", secret), "ApiSecretKey(*****)");
/// ```
#[derive(Clone, PartialEq, Eq)]
pub struct ApiSecretKey(String);

impl ApiSecretKey {
    /// Creates a new validated API secret key.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::EmptyApiSecretKey`] if the key is empty.
    pub fn new(key: impl Into<String>) -> Result<Self, ConfigError> {
        let key = key.into();
        if key.is_empty() {
            return Err(ConfigError::EmptyApiSecretKey);
        }
        Ok(Self(key))
    }
}

impl AsRef<str> for ApiSecretKey {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl fmt::Debug for ApiSecretKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("ApiSecretKey(*****)")
    }
}

/// Identifier of the embedding application.
///
/// Together with a [`Scope`](crate::Scope) it keys tokens in the
/// [`TokenVault`](crate::auth::TokenVault). It is always set explicitly at
/// configuration time and never derived from the shape of an API key.
#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct AppHandle(String);

impl AppHandle {
    /// Creates a new app handle.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::EmptyAppHandle`] if the handle is empty.
    pub fn new(handle: impl Into<String>) -> Result<Self, ConfigError> {
        let handle = handle.into();
        if handle.trim().is_empty() {
            return Err(ConfigError::EmptyAppHandle);
        }
        Ok(Self(handle))
    }
}

impl Default for AppHandle {
    fn default() -> Self {
        Self("default".to_string())
    }
}

impl AsRef<str> for AppHandle {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for AppHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// The store/site identifier bound into every signature.
///
/// The principal is one of the space-delimited fields of the canonical
/// signing message, so it may not contain whitespace.
///
/// # Example
///
/// ```rust
/// use flicksell_auth::Principal;
///
/// let site = Principal::new("store1").unwrap();
/// assert_eq!(site.as_ref(), "store1");
/// assert!(Principal::new("two words").is_err());
/// ```
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct Principal(String);

impl Principal {
    /// Creates a new validated principal.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::InvalidPrincipal`] if the value is empty or
    /// contains whitespace.
    pub fn new(principal: impl Into<String>) -> Result<Self, ConfigError> {
        let principal = principal.into();
        if principal.is_empty() || principal.chars().any(char::is_whitespace) {
            return Err(ConfigError::InvalidPrincipal { principal });
        }
        Ok(Self(principal))
    }
}

impl AsRef<str> for Principal {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl Serialize for Principal {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_str(&self.0)
    }
}

impl<'de> Deserialize<'de> for Principal {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let s = String::deserialize(deserializer)?;
        Self::new(s).map_err(de::Error::custom)
    }
}

/// A validated base URL for one of the platform APIs.
///
/// Trailing slashes are stripped so that endpoint paths can be appended
/// with [`BaseUrl::join`].
///
/// # Example
///
/// ```rust
/// use flicksell_auth::BaseUrl;
///
/// let url = BaseUrl::new("https://api.flicksell.com/").unwrap();
/// assert_eq!(url.as_ref(), "https://api.flicksell.com");
/// assert_eq!(url.host_name(), Some("api.flicksell.com"));
/// assert_eq!(url.join("/oauth/token"), "https://api.flicksell.com/oauth/token");
/// ```
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct BaseUrl {
    url: String,
    scheme_end: usize,
    host_start: usize,
    host_end: usize,
}

impl BaseUrl {
    /// Creates a new validated base URL.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::InvalidBaseUrl`] if the URL is invalid.
    pub fn new(url: impl Into<String>) -> Result<Self, ConfigError> {
        let url = url.into();
        let url = url.trim().trim_end_matches('/').to_string();

        let scheme_end = url
            .find("://")
            .ok_or_else(|| ConfigError::InvalidBaseUrl { url: url.clone() })?;

        let scheme = &url[..scheme_end];
        if scheme.is_empty() || !scheme.chars().all(|c| c.is_ascii_alphabetic()) {
            return Err(ConfigError::InvalidBaseUrl { url: url.clone() });
        }

        let host_start = scheme_end + 3;
        if host_start >= url.len() {
            return Err(ConfigError::InvalidBaseUrl { url: url.clone() });
        }

        // Host ends at port, path, query, or end of string
        let remainder = &url[host_start..];
        let host_end = remainder
            .find([':', '/', '?', '#'])
            .map_or(url.len(), |i| host_start + i);

        if host_end == host_start {
            return Err(ConfigError::InvalidBaseUrl { url: url.clone() });
        }

        Ok(Self {
            url,
            scheme_end,
            host_start,
            host_end,
        })
    }

    /// Returns the URL scheme (e.g., "https").
    #[must_use]
    pub fn scheme(&self) -> &str {
        &self.url[..self.scheme_end]
    }

    /// Returns the host name portion of the URL.
    #[must_use]
    pub fn host_name(&self) -> Option<&str> {
        let host = &self.url[self.host_start..self.host_end];
        if host.is_empty() {
            None
        } else {
            Some(host)
        }
    }

    /// Appends an endpoint path, inserting a `/` separator if needed.
    #[must_use]
    pub fn join(&self, path: &str) -> String {
        if path.is_empty() {
            self.url.clone()
        } else if path.starts_with('/') {
            format!("{}{path}", self.url)
        } else {
            format!("{}/{path}", self.url)
        }
    }
}

impl AsRef<str> for BaseUrl {
    fn as_ref(&self) -> &str {
        &self.url
    }
}

impl<'de> Deserialize<'de> for BaseUrl {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let s = String::deserialize(deserializer)?;
        Self::new(s).map_err(de::Error::custom)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_api_key_rejects_empty_string() {
        let result = ApiKey::new("");
        assert!(matches!(result, Err(ConfigError::EmptyApiKey)));
    }

    #[test]
    fn test_api_secret_key_masks_value_in_debug() {
        let secret = ApiSecretKey::new("super-secret-key").unwrap();
        let debug_output = format!("{:?}", secret);
        assert_eq!(debug_output, "ApiSecretKey(*****)");
        assert!(!debug_output.contains("super-secret-key"));
    }

    #[test]
    fn test_app_handle_rejects_blank() {
        assert!(matches!(AppHandle::new("  "), Err(ConfigError::EmptyAppHandle)));
        assert_eq!(AppHandle::new("shop-app").unwrap().as_ref(), "shop-app");
        assert_eq!(AppHandle::default().as_ref(), "default");
    }

    #[test]
    fn test_principal_rejects_whitespace_and_empty() {
        assert!(Principal::new("").is_err());
        assert!(Principal::new("my store").is_err());
        assert!(Principal::new("store\t1").is_err());
        assert!(Principal::new("store-1.example").is_ok());
    }

    #[test]
    fn test_principal_round_trip_serialization() {
        let original = Principal::new("store1").unwrap();
        let json = serde_json::to_string(&original).unwrap();
        assert_eq!(json, r#""store1""#);
        let restored: Principal = serde_json::from_str(&json).unwrap();
        assert_eq!(original, restored);
    }

    #[test]
    fn test_base_url_validates_format() {
        let url = BaseUrl::new("https://api.flicksell.com").unwrap();
        assert_eq!(url.scheme(), "https");
        assert_eq!(url.host_name(), Some("api.flicksell.com"));

        let url = BaseUrl::new("http://localhost:3000/").unwrap();
        assert_eq!(url.as_ref(), "http://localhost:3000");
        assert_eq!(url.host_name(), Some("localhost"));
    }

    #[test]
    fn test_base_url_rejects_invalid() {
        assert!(BaseUrl::new("api.flicksell.com").is_err());
        assert!(BaseUrl::new("https://").is_err());
        assert!(BaseUrl::new("://example.com").is_err());
    }

    #[test]
    fn test_base_url_join() {
        let url = BaseUrl::new("https://admin.example.com/v2").unwrap();
        assert_eq!(url.join("orders"), "https://admin.example.com/v2/orders");
        assert_eq!(url.join("/orders"), "https://admin.example.com/v2/orders");
        assert_eq!(url.join(""), "https://admin.example.com/v2");
    }
}
