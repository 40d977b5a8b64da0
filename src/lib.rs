//! # Flicksell Authentication SDK
//!
//! Authentication for apps talking to the Flicksell storefront and admin
//! APIs, and for verifying the signed requests Flicksell sends back.
//!
//! ## Overview
//!
//! This SDK provides:
//! - Type-safe configuration via [`AuthConfig`] and [`AuthConfigBuilder`]
//! - HMAC-SHA256 request signing with a versioned canonical message, plus
//!   compact signed tokens, via [`auth::signature`]
//! - Verification of inbound signed requests with replay protection via
//!   [`CredentialVerifier`] and [`auth::nonce`]
//! - Outbound request signing in legacy or OAuth mode via
//!   [`clients::OutboundSigner`]
//! - OAuth 2.0 authorization code, refresh and legacy token flows with
//!   single-flight refresh via [`auth::oauth::OAuthFlow`]
//! - Optional session binding of verified claims via [`auth::SessionBinder`]
//!
//! ## Quick Start
//!
//! ```rust
//! use flicksell_auth::{ApiKey, ApiSecretKey, AuthConfig, Credential, Principal, Scope};
//! use std::time::Duration;
//!
//! let config = AuthConfig::builder()
//!     .credential(Credential::new(
//!         Scope::Storefront,
//!         ApiKey::new("sf-key").unwrap(),
//!         ApiSecretKey::new("sf-secret").unwrap(),
//!     ))
//!     .credential(Credential::new(
//!         Scope::Admin,
//!         ApiKey::new("admin-key").unwrap(),
//!         ApiSecretKey::new("admin-secret").unwrap(),
//!     ))
//!     .principal(Principal::new("store1").unwrap())
//!     .max_timestamp_age(Duration::from_secs(120))
//!     .build()
//!     .unwrap();
//!
//! assert_eq!(config.nonce_ttl(), Duration::from_secs(241));
//! ```
//!
//! ## Options From JSON
//!
//! The recognized option names can be read from a configuration file:
//!
//! ```rust
//! use flicksell_auth::config::ConfigOptions;
//! use flicksell_auth::{ApiKey, ApiSecretKey, AuthConfig, Credential, NoncePolicy, Scope};
//!
//! let options: ConfigOptions = serde_json::from_str(
//!     r#"{ "maxTimestampAge": 600, "sslVerify": true, "noncePolicy": "timestamp-as-nonce" }"#,
//! )
//! .unwrap();
//!
//! let config = AuthConfig::builder()
//!     .credential(Credential::new(
//!         Scope::Admin,
//!         ApiKey::new("key").unwrap(),
//!         ApiSecretKey::new("secret").unwrap(),
//!     ))
//!     .options(options)
//!     .build()
//!     .unwrap();
//!
//! assert_eq!(config.nonce_policy(), NoncePolicy::TimestampAsNonce);
//! ```
//!
//! ## Verifying Inbound Requests
//!
//! ```rust
//! use flicksell_auth::auth::nonce::MemoryNonceStore;
//! use flicksell_auth::auth::signature::{generate_token, TokenPayload};
//! use flicksell_auth::{ApiKey, ApiSecretKey, AuthConfig, Credential, CredentialVerifier, Scope};
//! use flicksell_auth::auth::InboundCredentials;
//! use std::collections::HashMap;
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
//! let now = 1_700_000_000;
//! let token = generate_token("abc", &TokenPayload::new("store1", now, "n1")).unwrap();
//! let params = HashMap::from([("flicksell_token".to_string(), token)]);
//! let input = InboundCredentials::from_params(&params).unwrap();
//!
//! let claims = verifier.verify_at(&input, now).await.unwrap();
//! assert_eq!(claims.issuer, "store1");
//!
//! // The same request a second time is a replay.
//! assert!(verifier.verify_at(&input, now).await.is_err());
//! # }
//! ```
//!
//! ## Logging
//!
//! The crate emits [`tracing`] events and installs no subscriber. Secrets,
//! signatures and tokens are never logged.
//!
//! ## Design Principles
//!
//! - **No global state**: Configuration is instance-based and passed explicitly
//! - **Fail-fast validation**: All newtypes validate on construction
//! - **Thread-safe**: All types are `Send + Sync`
//! - **Async-first**: Designed for use with Tokio async runtime
//! - **Typed failures**: Every rejection is an enum variant, never a string

pub mod auth;
pub mod clients;
pub mod config;
pub mod error;

// Re-export public types at crate root for convenience
pub use auth::{AuthScopes, Credential, CredentialVerifier, TokenVault, VerifiedClaims};
pub use config::{
    ApiKey, ApiSecretKey, AppHandle, AuthConfig, AuthConfigBuilder, AuthMode, BaseUrl,
    BodyEncoding, CacheFailurePolicy, NoncePolicy, Principal, Scope, TransportMode,
};
pub use error::ConfigError;

// Re-export HTTP client types
pub use clients::{HttpClient, HttpError, HttpMethod, HttpResponse, OutboundSigner, SignedRequest};

// Re-export OAuth types for convenience
pub use auth::oauth::{FlowState, OAuthError, OAuthFlow, StateParam};
