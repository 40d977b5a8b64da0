//! Verification of inbound signed credentials.
//!
//! The [`CredentialVerifier`] accepts either shape the platform sends:
//!
//! - a compact token in the `flicksell_token` parameter, or
//! - the raw `apikey`, `timestamp`, `nonce`, `sitename`, `signature` set.
//!
//! Checks always run in this order, stopping at the first failure:
//!
//! 1. shape (`malformed`)
//! 2. credential resolution (`unknown_key`)
//! 3. timestamp freshness (`expired`)
//! 4. signature (`bad_signature`)
//! 5. nonce (`replay`)
//!
//! The nonce is only stored once every other check has passed, so a rejected
//! request never consumes a nonce.
//!
//! # Example
//!
//! ```rust
//! use flicksell_auth::auth::nonce::MemoryNonceStore;
//! use flicksell_auth::auth::signature::{sign, SigningContext};
//! use flicksell_auth::auth::{CredentialVerifier, InboundCredentials, RawSignedParams};
//! use flicksell_auth::{ApiKey, ApiSecretKey, AuthConfig, Credential, Scope};
//! use std::sync::Arc;
//!
//! # #[tokio::main]
//! # async fn main() {
//! let config = AuthConfig::builder()
//!     .credential(Credential::new(
//!         Scope::Storefront,
//!         ApiKey::new("sf-key").unwrap(),
//!         ApiSecretKey::new("abc").unwrap(),
//!     ))
//!     .build()
//!     .unwrap();
//! let verifier = CredentialVerifier::new(config, Arc::new(MemoryNonceStore::new()));
//!
//! let context = SigningContext::new(1_700_000_000, "n1", "store1", Scope::Storefront);
//! let input = InboundCredentials::Raw(RawSignedParams {
//!     apikey: "sf-key".to_string(),
//!     timestamp: 1_700_000_000,
//!     nonce: "n1".to_string(),
//!     sitename: "store1".to_string(),
//!     signature: sign(&context, "abc"),
//! });
//!
//! let claims = verifier.verify_at(&input, 1_700_000_000).await.unwrap();
//! assert_eq!(claims.issuer, "store1");
//! # }
//! ```

use crate::auth::nonce::NonceStore;
use crate::auth::signature::{self, SignedToken, SigningContext};
use crate::auth::Credential;
use crate::config::{AppHandle, AuthConfig, CacheFailurePolicy, Scope};
use serde_json::{Map, Value};
use std::collections::HashMap;
use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use thiserror::Error;

/// Parameter name carrying the compact token form.
pub const TOKEN_PARAM: &str = "flicksell_token";

/// The raw signed parameter set.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RawSignedParams {
    /// Public API key naming the credential.
    pub apikey: String,
    /// Unix seconds.
    pub timestamp: i64,
    /// Single-use value.
    pub nonce: String,
    /// Store/site identifier (the principal).
    pub sitename: String,
    /// Lowercase hex HMAC-SHA256.
    pub signature: String,
}

/// Inbound credentials in either accepted shape.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum InboundCredentials {
    /// `base64url(JSON(payload)) + "." + hex(signature)`.
    Token(String),
    /// The raw parameter set.
    Raw(RawSignedParams),
}

impl InboundCredentials {
    /// Extracts credentials from collected request parameters.
    ///
    /// A non-empty `flicksell_token` takes precedence over raw fields.
    ///
    /// # Errors
    ///
    /// Returns [`VerificationError::Malformed`] if neither shape is complete.
    pub fn from_params(params: &HashMap<String, String>) -> Result<Self, VerificationError> {
        if let Some(token) = params.get(TOKEN_PARAM).filter(|t| !t.is_empty()) {
            return Ok(Self::Token(token.clone()));
        }

        let field = |name: &'static str| {
            params
                .get(name)
                .filter(|value| !value.is_empty())
                .cloned()
                .ok_or_else(|| VerificationError::Malformed {
                    reason: format!("missing field '{name}'"),
                })
        };

        let timestamp = field("timestamp")?;
        let timestamp = timestamp
            .parse::<i64>()
            .map_err(|_| VerificationError::Malformed {
                reason: format!("timestamp '{timestamp}' is not an integer"),
            })?;

        Ok(Self::Raw(RawSignedParams {
            apikey: field("apikey")?,
            timestamp,
            nonce: field("nonce")?,
            sitename: field("sitename")?,
            signature: field("signature")?,
        }))
    }
}

/// Claims produced by a successful verification.
#[derive(Clone, Debug, PartialEq)]
pub struct VerifiedClaims {
    /// Issuer (site identifier).
    pub issuer: String,
    /// Unix seconds at which the credentials were signed.
    pub issued_at: i64,
    /// The consumed nonce.
    pub nonce: String,
    /// App handle named by the inbound payload, if any.
    pub app_handle: Option<AppHandle>,
    /// Scope of the credential whose secret verified the signature.
    pub scope: Scope,
    /// All inbound fields except the signature.
    pub raw: Map<String, Value>,
}

/// Machine-readable rejection reason.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum RejectionKind {
    /// Input did not match either accepted shape.
    Malformed,
    /// No configured credential matched.
    UnknownKey,
    /// Timestamp outside the accepted window.
    Expired,
    /// Signature did not verify.
    BadSignature,
    /// Nonce already used.
    Replay,
    /// Nonce store unreachable under the fail-closed policy.
    CacheUnavailable,
}

impl RejectionKind {
    /// Returns the stable snake_case name of the kind.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Malformed => "malformed",
            Self::UnknownKey => "unknown_key",
            Self::Expired => "expired",
            Self::BadSignature => "bad_signature",
            Self::Replay => "replay",
            Self::CacheUnavailable => "cache_unavailable",
        }
    }
}

impl fmt::Display for RejectionKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Reasons an inbound request is rejected.
///
/// Callers branch on [`VerificationError::kind`] rather than on messages.
/// A typical HTTP mapping is 401 for every kind except `cache_unavailable`,
/// which is better reported as 503.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum VerificationError {
    /// Input did not match either accepted shape.
    #[error("Malformed credentials: {reason}")]
    Malformed {
        /// What was wrong with the input.
        reason: String,
    },

    /// No configured credential matched the key or app handle.
    #[error("No configured credential matches the request")]
    UnknownCredential,

    /// The timestamp is outside the accepted window.
    #[error("Timestamp {timestamp} is outside the accepted window (now: {now})")]
    ExpiredTimestamp {
        /// The inbound timestamp.
        timestamp: i64,
        /// The verifier's clock.
        now: i64,
    },

    /// The signature did not verify against any candidate secret.
    #[error("Signature mismatch")]
    BadSignature,

    /// The nonce has already been used.
    #[error("Nonce has already been used")]
    ReplayedNonce,

    /// The nonce store is unreachable and the policy is fail-closed.
    #[error("Nonce store unavailable: {reason}")]
    CacheUnavailable {
        /// Backend-specific description.
        reason: String,
    },
}

impl VerificationError {
    /// Returns the machine-readable kind of this rejection.
    #[must_use]
    pub const fn kind(&self) -> RejectionKind {
        match self {
            Self::Malformed { .. } => RejectionKind::Malformed,
            Self::UnknownCredential => RejectionKind::UnknownKey,
            Self::ExpiredTimestamp { .. } => RejectionKind::Expired,
            Self::BadSignature => RejectionKind::BadSignature,
            Self::ReplayedNonce => RejectionKind::Replay,
            Self::CacheUnavailable { .. } => RejectionKind::CacheUnavailable,
        }
    }
}

/// Intermediate result of the side-effect-free checks.
struct Authenticated {
    issuer: String,
    issued_at: i64,
    nonce: String,
    app_handle: Option<AppHandle>,
    scope: Scope,
    raw: Map<String, Value>,
}

/// Verifies inbound signed requests against the configured credentials.
///
/// # Thread Safety
///
/// `CredentialVerifier` is `Send + Sync`; share one instance behind an `Arc`.
pub struct CredentialVerifier {
    config: AuthConfig,
    nonces: Arc<dyn NonceStore>,
    cache_failures: AtomicU64,
}

impl CredentialVerifier {
    /// Creates a verifier using `nonces` for replay protection.
    #[must_use]
    pub fn new(config: AuthConfig, nonces: Arc<dyn NonceStore>) -> Self {
        Self {
            config,
            nonces,
            cache_failures: AtomicU64::new(0),
        }
    }

    /// Returns the configuration.
    #[must_use]
    pub const fn config(&self) -> &AuthConfig {
        &self.config
    }

    /// Returns how many verifications found the nonce store unreachable.
    #[must_use]
    pub fn cache_failures(&self) -> u64 {
        self.cache_failures.load(Ordering::Relaxed)
    }

    /// Verifies `input` against the current time.
    ///
    /// # Errors
    ///
    /// Returns the first [`VerificationError`] encountered.
    pub async fn verify(
        &self,
        input: &InboundCredentials,
    ) -> Result<VerifiedClaims, VerificationError> {
        self.verify_at(input, chrono::Utc::now().timestamp()).await
    }

    /// Verifies `input` as if the current time were `now` (unix seconds).
    ///
    /// # Errors
    ///
    /// Returns the first [`VerificationError`] encountered.
    pub async fn verify_at(
        &self,
        input: &InboundCredentials,
        now: i64,
    ) -> Result<VerifiedClaims, VerificationError> {
        let result = self.run(input, now).await;
        if let Err(error) = &result {
            tracing::debug!(kind = error.kind().as_str(), "Inbound credentials rejected");
        }
        result
    }

    async fn run(
        &self,
        input: &InboundCredentials,
        now: i64,
    ) -> Result<VerifiedClaims, VerificationError> {
        let authenticated = match input {
            InboundCredentials::Token(token) => self.authenticate_token(token, now)?,
            InboundCredentials::Raw(params) => self.authenticate_raw(params, now)?,
        };

        self.consume_nonce(&authenticated.nonce, now).await?;

        Ok(VerifiedClaims {
            issuer: authenticated.issuer,
            issued_at: authenticated.issued_at,
            nonce: authenticated.nonce,
            app_handle: authenticated.app_handle,
            scope: authenticated.scope,
            raw: authenticated.raw,
        })
    }

    fn authenticate_token(&self, token: &str, now: i64) -> Result<Authenticated, VerificationError> {
        let parsed =
            SignedToken::parse(token).map_err(|error| VerificationError::Malformed {
                reason: error.to_string(),
            })?;
        let payload = parsed.payload();
        if payload.nonce.is_empty() {
            return Err(VerificationError::Malformed {
                reason: "token nonce is empty".to_string(),
            });
        }

        let app_handle = payload
            .app
            .as_deref()
            .map(AppHandle::new)
            .transpose()
            .map_err(|e| VerificationError::Malformed {
                reason: e.to_string(),
            })?;

        let candidates: Vec<&Credential> = self
            .config
            .credentials_by_priority()
            .filter(|credential| {
                app_handle
                    .as_ref()
                    .map_or(true, |app| credential.app_handle() == app)
            })
            .collect();
        if candidates.is_empty() {
            return Err(VerificationError::UnknownCredential);
        }

        self.check_timestamp(payload.iat, now)?;

        let scope = candidates
            .iter()
            .find(|credential| {
                credential
                    .verification_secrets()
                    .any(|secret| parsed.verify(secret.as_ref()))
            })
            .map(|credential| credential.scope())
            .ok_or(VerificationError::BadSignature)?;

        let payload = parsed.into_payload();
        let mut raw = payload.extra;
        raw.insert("iss".to_string(), Value::from(payload.iss.clone()));
        raw.insert("iat".to_string(), Value::from(payload.iat));
        raw.insert("nonce".to_string(), Value::from(payload.nonce.clone()));
        if let Some(app) = &payload.app {
            raw.insert("app".to_string(), Value::from(app.clone()));
        }

        Ok(Authenticated {
            issuer: payload.iss,
            issued_at: payload.iat,
            nonce: payload.nonce,
            app_handle,
            scope,
            raw,
        })
    }

    fn authenticate_raw(
        &self,
        params: &RawSignedParams,
        now: i64,
    ) -> Result<Authenticated, VerificationError> {
        if params.nonce.is_empty() || params.signature.is_empty() {
            return Err(VerificationError::Malformed {
                reason: "nonce and signature must be non-empty".to_string(),
            });
        }

        let credential = self
            .config
            .credentials_by_priority()
            .find(|credential| credential.key().as_ref() == params.apikey)
            .ok_or(VerificationError::UnknownCredential)?;

        self.check_timestamp(params.timestamp, now)?;

        let context = SigningContext::new(
            params.timestamp,
            params.nonce.clone(),
            params.sitename.clone(),
            credential.scope(),
        );
        let verified = credential
            .verification_secrets()
            .any(|secret| signature::verify(&context, secret.as_ref(), &params.signature));
        if !verified {
            return Err(VerificationError::BadSignature);
        }

        let mut raw = Map::new();
        raw.insert("apikey".to_string(), Value::from(params.apikey.clone()));
        raw.insert("timestamp".to_string(), Value::from(params.timestamp));
        raw.insert("nonce".to_string(), Value::from(params.nonce.clone()));
        raw.insert("sitename".to_string(), Value::from(params.sitename.clone()));

        Ok(Authenticated {
            issuer: params.sitename.clone(),
            issued_at: params.timestamp,
            nonce: params.nonce.clone(),
            app_handle: None,
            scope: credential.scope(),
            raw,
        })
    }

    fn check_timestamp(&self, timestamp: i64, now: i64) -> Result<(), VerificationError> {
        if now.abs_diff(timestamp) > self.config.max_timestamp_age().as_secs() {
            return Err(VerificationError::ExpiredTimestamp { timestamp, now });
        }
        Ok(())
    }

    async fn consume_nonce(&self, nonce: &str, now: i64) -> Result<(), VerificationError> {
        match self
            .nonces
            .check_and_store(nonce, now, self.config.nonce_ttl())
            .await
        {
            Ok(true) => Ok(()),
            Ok(false) => Err(VerificationError::ReplayedNonce),
            Err(error) => {
                self.cache_failures.fetch_add(1, Ordering::Relaxed);
                match self.config.cache_failure_policy() {
                    CacheFailurePolicy::FailOpen => {
                        tracing::warn!(
                            error = %error,
                            "Nonce store unavailable, accepting request without replay protection"
                        );
                        Ok(())
                    }
                    CacheFailurePolicy::FailClosed => {
                        tracing::warn!(error = %error, "Nonce store unavailable, rejecting request");
                        Err(VerificationError::CacheUnavailable {
                            reason: error.to_string(),
                        })
                    }
                }
            }
        }
    }
}

// Verify CredentialVerifier and VerificationError are Send + Sync at compile time
const _: fn() = || {
    const fn assert_send_sync<T: Send + Sync>() {}
    assert_send_sync::<CredentialVerifier>();
    assert_send_sync::<VerificationError>();
};
