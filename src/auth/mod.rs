//! Authentication types for the Flicksell authentication SDK.
//!
//! # Overview
//!
//! - [`Credential`]: a key/secret pair bound to a [`Scope`](crate::Scope)
//! - [`signature`]: canonical messages, HMAC-SHA256 signatures and compact tokens
//! - [`nonce`]: replay protection stores
//! - [`CredentialVerifier`]: checks inbound signed parameters or tokens
//! - [`TokenVault`]: access tokens keyed by app handle and scope
//! - [`oauth`]: authorization code, refresh and legacy token flows
//! - [`SessionBinder`]: binds verified claims to a local session
//!
//! # Inbound Requests
//!
//! ```text
//! params --InboundCredentials--> CredentialVerifier --VerifiedClaims--> SessionBinder
//!                                    |         |
//!                               signature   NonceStore
//! ```
//!
//! # Outbound Requests
//!
//! Outbound requests are built by
//! [`OutboundSigner`](crate::clients::OutboundSigner), which signs legacy
//! parameters itself or asks [`oauth::OAuthFlow`] for a bearer token.

mod credential;
pub mod nonce;
pub mod oauth;
mod scopes;
pub mod session;
pub mod signature;
mod token_vault;
mod verifier;

pub use credential::Credential;
pub use scopes::AuthScopes;
pub use session::{MemorySessionStore, Session, SessionBinder, SessionStore};
pub use token_vault::{Token, TokenVault, VaultKey, REFRESH_BUFFER_SECS};
pub use verifier::{
    CredentialVerifier, InboundCredentials, RawSignedParams, RejectionKind, VerificationError,
    VerifiedClaims, TOKEN_PARAM,
};
