//! Transport and outbound signing.
//!
//! - [`HttpClient`]: thin `reqwest` wrapper honoring the configured timeout
//!   and TLS verification
//! - [`OutboundSigner`]: turns an endpoint plus parameters into a
//!   [`SignedRequest`] authenticated with legacy HMAC parameters, a compact
//!   signed token, or an OAuth bearer token
//! - [`HttpError`]: transport errors; non-2xx responses keep the raw body
//!
//! # Example
//!
//! ```rust,no_run
//! use flicksell_auth::clients::{HttpClient, HttpMethod, OutboundSigner};
//! use flicksell_auth::{ApiKey, ApiSecretKey, AuthConfig, Credential, Principal, Scope};
//!
//! # #[tokio::main]
//! # async fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let config = AuthConfig::builder()
//!     .credential(Credential::new(
//!         Scope::Storefront,
//!         ApiKey::new("key")?,
//!         ApiSecretKey::new("secret")?,
//!     ))
//!     .principal(Principal::new("store1")?)
//!     .build()?;
//!
//! let client = HttpClient::new(&config)?;
//! let signer = OutboundSigner::new(config);
//!
//! let request = signer
//!     .build_signed_request(Scope::Storefront, "/products", HttpMethod::Get, &[("page", "1")], &[])
//!     .await?;
//! let response = client.send(request).await?;
//! println!("{}", response.body);
//! # Ok(())
//! # }
//! ```

mod errors;
mod http_client;
pub(crate) mod signer;

pub use errors::{HttpError, HttpResponseError};
pub use http_client::{HttpClient, HttpMethod, HttpResponse, SDK_VERSION};
pub use signer::{OutboundSigner, SignedRequest, SignerError, AUTH_HEADER};
