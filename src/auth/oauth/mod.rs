//! OAuth 2.0 client side of the platform's token endpoint.
//!
//! # Grants
//!
//! - **Authorization code**: [`OAuthFlow::begin_authorization`] builds the
//!   redirect URL with a CSRF [`StateParam`]; the callback is handled by
//!   [`OAuthFlow::complete_authorization`], which checks the state and
//!   exchanges the code.
//! - **Refresh token**: [`OAuthFlow::get_valid_access_token`] refreshes a token
//!   within 60 seconds of expiry, once per `(app_handle, scope)` no matter how
//!   many callers ask concurrently.
//! - **Legacy authenticate**: [`OAuthFlow::authenticate_legacy`] trades a
//!   signed legacy parameter set for a token.
//!
//! Failed exchange or refresh calls are never retried; the returned
//! [`OAuthError`] carries the platform's error body.
//!
//! # Example
//!
//! ```rust
//! use flicksell_auth::auth::oauth::{FlowState, OAuthFlow};
//! use flicksell_auth::auth::TokenVault;
//! use flicksell_auth::{ApiKey, ApiSecretKey, AuthConfig, Credential, Scope};
//! use std::sync::Arc;
//!
//! let config = AuthConfig::builder()
//!     .credential(Credential::new(
//!         Scope::Storefront,
//!         ApiKey::new("client-id").unwrap(),
//!         ApiSecretKey::new("client-secret").unwrap(),
//!     ))
//!     .build()
//!     .unwrap();
//!
//! let flow = OAuthFlow::new(config, Arc::new(TokenVault::new())).unwrap();
//! let request = flow
//!     .begin_authorization(
//!         Scope::Storefront,
//!         "https://app.example.com/callback",
//!         &"products:read".parse().unwrap(),
//!     )
//!     .unwrap();
//!
//! assert!(request.url.starts_with("https://api.flicksell.com/oauth/authorize?"));
//! assert_eq!(flow.state(Scope::Storefront), FlowState::Authorizing);
//! ```

mod authorize;
mod error;
mod flow;
mod state;
mod token_request;

pub use authorize::{authorization_url, AUTHORIZE_PATH};
pub use error::OAuthError;
pub use flow::{AuthorizationRequest, FlowState, OAuthFlow};
pub use state::StateParam;
pub use token_request::{TokenResponse, DEFAULT_EXPIRES_IN, TOKEN_PATH};
