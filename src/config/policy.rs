//! Closed enums for trust domains and signing policies.
//!
//! Every place that used to branch on a free-form string ("storefront",
//! "admin", "random", ...) matches on one of these enums instead.

use serde::{Deserialize, Serialize};
use std::fmt;

/// The trust domain a credential or token applies to.
///
/// # Example
///
/// ```rust
/// use flicksell_auth::Scope;
///
/// assert_eq!(Scope::Admin.as_str(), "admin");
/// assert_eq!(Scope::BY_PRIORITY, [Scope::Admin, Scope::Storefront]);
/// ```
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Scope {
    /// The public-facing storefront API.
    Storefront,
    /// The privileged admin API.
    Admin,
}

impl Scope {
    /// Resolution order for inbound credentials: admin is checked before storefront.
    pub const BY_PRIORITY: [Self; 2] = [Self::Admin, Self::Storefront];

    /// Returns the lowercase wire name of the scope.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Storefront => "storefront",
            Self::Admin => "admin",
        }
    }
}

impl fmt::Display for Scope {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// How outbound legacy requests pick their nonce.
///
/// Both policies exist in deployed integrations of the protocol.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum NoncePolicy {
    /// 16 cryptographically random bytes, hex encoded.
    #[default]
    Random,
    /// The decimal timestamp of the request doubles as its nonce.
    TimestampAsNonce,
}

/// Where the legacy signature parameters are attached to an outbound request.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum TransportMode {
    /// `apikey`, `timestamp`, `nonce`, `sitename` and `signature` body fields.
    #[default]
    Fields,
    /// A single `X-Platform-Auth` header holding the base64 JSON parameter set.
    Header,
    /// A compact signed token in the `flicksell_token` body field.
    SignedToken,
}

/// How outbound request bodies are encoded.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BodyEncoding {
    /// `application/x-www-form-urlencoded`.
    #[default]
    Form,
    /// `application/json`.
    Json,
}

impl BodyEncoding {
    /// Returns the `Content-Type` header value for this encoding.
    #[must_use]
    pub const fn content_type(self) -> &'static str {
        match self {
            Self::Form => "application/x-www-form-urlencoded",
            Self::Json => "application/json",
        }
    }
}

/// How outbound requests are authenticated.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AuthMode {
    /// Per-request HMAC parameters.
    #[default]
    Legacy,
    /// `Authorization: Bearer` with a token managed by the OAuth flow.
    OAuth,
}

/// What the verifier does when the nonce store cannot be reached.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum CacheFailurePolicy {
    /// Accept the request and report the outage through logging.
    #[default]
    FailOpen,
    /// Reject the request with `cache_unavailable`.
    FailClosed,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_scope_serializes_lowercase() {
        assert_eq!(serde_json::to_string(&Scope::Admin).unwrap(), r#""admin""#);
        let scope: Scope = serde_json::from_str(r#""storefront""#).unwrap();
        assert_eq!(scope, Scope::Storefront);
    }

    #[test]
    fn test_nonce_policy_wire_names() {
        let policy: NoncePolicy = serde_json::from_str(r#""timestamp-as-nonce""#).unwrap();
        assert_eq!(policy, NoncePolicy::TimestampAsNonce);
        assert_eq!(NoncePolicy::default(), NoncePolicy::Random);
    }

    #[test]
    fn test_body_encoding_content_types() {
        assert_eq!(
            BodyEncoding::Form.content_type(),
            "application/x-www-form-urlencoded"
        );
        assert_eq!(BodyEncoding::Json.content_type(), "application/json");
    }

    #[test]
    fn test_defaults() {
        assert_eq!(TransportMode::default(), TransportMode::Fields);
        assert_eq!(AuthMode::default(), AuthMode::Legacy);
        assert_eq!(CacheFailurePolicy::default(), CacheFailurePolicy::FailOpen);
    }
}
