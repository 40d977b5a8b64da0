//! Outbound request signing.
//!
//! [`OutboundSigner`] turns an endpoint plus its parameters into a
//! [`SignedRequest`] ready for [`HttpClient::send`](crate::clients::HttpClient::send).
//! How the request is authenticated follows the configuration:
//!
//! | [`AuthMode`] | [`TransportMode`] | Placement |
//! |---|---|---|
//! | `Legacy` | `Fields` | `apikey`, `timestamp`, `nonce`, `sitename`, `signature` added to the body |
//! | `Legacy` | `Header` | `X-Platform-Auth: base64(JSON{timestamp, nonce, sitename, apikey, signature})` |
//! | `Legacy` | `SignedToken` | `flicksell_token` added to the body |
//! | `OAuth` | any | `Authorization: Bearer <access_token>` |
//!
//! Every legacy request gets a fresh [`SigningContext`]; a nonce is never
//! reused. For `GET` and `DELETE` the body parameters travel in the query
//! string instead.

use crate::auth::oauth::{OAuthError, OAuthFlow};
use crate::auth::signature::{generate_token, sign, SigningContext, TokenPayload};
use crate::auth::{Credential, TOKEN_PARAM};
use crate::clients::HttpMethod;
use crate::config::{AuthConfig, AuthMode, BodyEncoding, NoncePolicy, Principal, Scope, TransportMode};
use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use chrono::Utc;
use serde::Serialize;
use std::fmt;
use std::sync::Arc;
use thiserror::Error;

/// Header carrying the legacy parameters in [`TransportMode::Header`].
pub const AUTH_HEADER: &str = "X-Platform-Auth";

/// Random nonce length in bytes, before hex encoding.
const NONCE_BYTES: usize = 16;

/// Errors raised while building a signed request.
#[derive(Debug, Error)]
pub enum SignerError {
    /// No credential is configured for the scope.
    #[error("No credential configured for the {scope} scope")]
    MissingCredential {
        /// The scope without a credential.
        scope: Scope,
    },

    /// Legacy signing needs a configured principal.
    #[error("A principal (site identifier) must be configured for legacy signing")]
    MissingPrincipal,

    /// OAuth mode is configured but the signer has no [`OAuthFlow`].
    #[error("OAuth mode requires an OAuthFlow; use OutboundSigner::with_oauth")]
    OAuthNotConfigured,

    /// No valid access token could be obtained.
    #[error(transparent)]
    OAuth(#[from] OAuthError),

    /// The request body could not be encoded.
    #[error("Failed to encode request: {reason}")]
    Encode {
        /// Encoder error message.
        reason: String,
    },
}

// Verify SignerError is Send + Sync at compile time
const _: fn() = || {
    const fn assert_send_sync<T: Send + Sync>() {}
    assert_send_sync::<SignerError>();
};

/// A fully authenticated request.
///
/// # Security
///
/// The `Debug` implementation prints header names and body length only.
#[derive(Clone, PartialEq, Eq)]
pub struct SignedRequest {
    /// Absolute URL including the query string.
    pub url: String,
    /// HTTP method.
    pub method: HttpMethod,
    /// Headers to send, in order.
    pub headers: Vec<(String, String)>,
    /// Encoded body, if any.
    pub body: Option<String>,
}

impl SignedRequest {
    /// Returns the value of the first header named `name` (case-insensitive).
    #[must_use]
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(header, _)| header.eq_ignore_ascii_case(name))
            .map(|(_, value)| value.as_str())
    }
}

impl fmt::Debug for SignedRequest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let header_names: Vec<&str> = self.headers.iter().map(|(name, _)| name.as_str()).collect();
        f.debug_struct("SignedRequest")
            .field("method", &self.method)
            .field("headers", &header_names)
            .field("body_len", &self.body.as_ref().map(String::len))
            .finish_non_exhaustive()
    }
}

/// Generates a nonce under `policy`.
pub(crate) fn generate_nonce(policy: NoncePolicy, timestamp: i64) -> String {
    match policy {
        NoncePolicy::Random => hex::encode(rand::random::<[u8; NONCE_BYTES]>()),
        NoncePolicy::TimestampAsNonce => timestamp.to_string(),
    }
}

/// Creates a new signing context for a single outbound call.
pub(crate) fn fresh_context(
    policy: NoncePolicy,
    principal: &Principal,
    scope: Scope,
    timestamp: i64,
) -> SigningContext {
    let principal: &str = principal.as_ref();
    SigningContext::new(timestamp, generate_nonce(policy, timestamp), principal, scope)
}

/// Returns the signed legacy parameters for `context`, followed by its extra parameters.
///
/// The signature covers only the canonical message; extras travel unsigned.
pub(crate) fn legacy_params(
    context: &SigningContext,
    credential: &Credential,
) -> Vec<(String, String)> {
    let mut params = vec![
        ("apikey".to_string(), credential.key().as_ref().to_string()),
        ("timestamp".to_string(), context.timestamp.to_string()),
        ("nonce".to_string(), context.nonce.clone()),
        ("sitename".to_string(), context.principal.clone()),
        (
            "signature".to_string(),
            sign(context, credential.secret().as_ref()),
        ),
    ];
    params.extend(context.extra.iter().cloned());
    params
}

#[derive(Serialize)]
struct HeaderPayload<'a> {
    timestamp: i64,
    nonce: &'a str,
    sitename: &'a str,
    apikey: &'a str,
    signature: &'a str,
}

fn encode_query(params: &[(String, String)]) -> String {
    params
        .iter()
        .map(|(name, value)| {
            format!(
                "{}={}",
                urlencoding::encode(name),
                urlencoding::encode(value)
            )
        })
        .collect::<Vec<_>>()
        .join("&")
}

/// Builds authenticated requests for either scope.
///
/// # Example
///
/// ```rust
/// use flicksell_auth::clients::{HttpMethod, OutboundSigner};
/// use flicksell_auth::{ApiKey, ApiSecretKey, AuthConfig, Credential, Principal, Scope};
///
/// # #[tokio::main]
/// # async fn main() {
/// let config = AuthConfig::builder()
///     .credential(Credential::new(
///         Scope::Admin,
///         ApiKey::new("key").unwrap(),
///         ApiSecretKey::new("secret").unwrap(),
///     ))
///     .principal(Principal::new("store1").unwrap())
///     .build()
///     .unwrap();
///
/// let signer = OutboundSigner::new(config);
/// let request = signer
///     .build_signed_request(Scope::Admin, "/orders", HttpMethod::Post, &[], &[("status", "open")])
///     .await
///     .unwrap();
///
/// assert_eq!(request.url, "https://api.flicksell.com/orders");
/// assert!(request.body.unwrap().contains("signature="));
/// # }
/// ```
#[derive(Clone, Debug)]
pub struct OutboundSigner {
    config: AuthConfig,
    oauth: Option<Arc<OAuthFlow>>,
}

impl OutboundSigner {
    /// Creates a signer for legacy mode.
    #[must_use]
    pub const fn new(config: AuthConfig) -> Self {
        Self {
            config,
            oauth: None,
        }
    }

    /// Attaches the [`OAuthFlow`] consulted in [`AuthMode::OAuth`].
    #[must_use]
    pub fn with_oauth(mut self, flow: Arc<OAuthFlow>) -> Self {
        self.oauth = Some(flow);
        self
    }

    /// Returns the configuration.
    #[must_use]
    pub const fn config(&self) -> &AuthConfig {
        &self.config
    }

    /// Builds an authenticated request signed at the current time.
    ///
    /// # Errors
    ///
    /// See [`OutboundSigner::build_signed_request_at`].
    pub async fn build_signed_request(
        &self,
        scope: Scope,
        endpoint: &str,
        method: HttpMethod,
        query: &[(&str, &str)],
        body: &[(&str, &str)],
    ) -> Result<SignedRequest, SignerError> {
        self.build_signed_request_at(scope, endpoint, method, query, body, Utc::now().timestamp())
            .await
    }

    /// Builds an authenticated request signed at `now` (unix seconds).
    ///
    /// # Errors
    ///
    /// - [`SignerError::MissingCredential`] if `scope` has no credential
    /// - [`SignerError::MissingPrincipal`] in legacy mode without a principal
    /// - [`SignerError::OAuthNotConfigured`] or [`SignerError::OAuth`] in OAuth mode
    /// - [`SignerError::Encode`] if the body cannot be encoded
    pub async fn build_signed_request_at(
        &self,
        scope: Scope,
        endpoint: &str,
        method: HttpMethod,
        query: &[(&str, &str)],
        body: &[(&str, &str)],
        now: i64,
    ) -> Result<SignedRequest, SignerError> {
        let credential = self
            .config
            .credential(scope)
            .ok_or(SignerError::MissingCredential { scope })?;

        let mut query_params: Vec<(String, String)> = query
            .iter()
            .map(|(name, value)| ((*name).to_string(), (*value).to_string()))
            .collect();
        let mut body_params: Vec<(String, String)> = body
            .iter()
            .map(|(name, value)| ((*name).to_string(), (*value).to_string()))
            .collect();
        let mut headers = Vec::new();

        match self.config.auth_mode() {
            AuthMode::OAuth => {
                let flow = self.oauth.as_ref().ok_or(SignerError::OAuthNotConfigured)?;
                let access_token = flow.get_valid_access_token(scope).await?;
                headers.push((
                    "Authorization".to_string(),
                    format!("Bearer {access_token}"),
                ));
            }
            AuthMode::Legacy => {
                let principal = self
                    .config
                    .principal()
                    .ok_or(SignerError::MissingPrincipal)?;
                let mut context = fresh_context(self.config.nonce_policy(), principal, scope, now);
                context.extra = std::mem::take(&mut body_params);
                body_params = self.attach_legacy(context, credential, &mut headers)?;
            }
        }

        let has_body = matches!(method, HttpMethod::Post | HttpMethod::Put);
        if !has_body {
            query_params.append(&mut body_params);
        }

        let mut url = self.config.base_url_for(scope).join(endpoint);
        if !query_params.is_empty() {
            url.push(if url.contains('?') { '&' } else { '?' });
            url.push_str(&encode_query(&query_params));
        }

        let body = if has_body {
            let encoding = self.config.body_encoding();
            headers.push(("Content-Type".to_string(), encoding.content_type().to_string()));
            Some(Self::encode_body(encoding, &body_params)?)
        } else {
            None
        };

        tracing::debug!(
            %scope,
            method = %method,
            endpoint,
            auth_mode = ?self.config.auth_mode(),
            transport = ?self.config.transport_mode(),
            "Built signed request"
        );

        Ok(SignedRequest {
            url,
            method,
            headers,
            body,
        })
    }

    /// Attaches the signature for `context` and returns the body parameters to send.
    fn attach_legacy(
        &self,
        context: SigningContext,
        credential: &Credential,
        headers: &mut Vec<(String, String)>,
    ) -> Result<Vec<(String, String)>, SignerError> {
        match self.config.transport_mode() {
            TransportMode::Fields => Ok(legacy_params(&context, credential)),
            TransportMode::Header => {
                let signature = sign(&context, credential.secret().as_ref());
                let payload = HeaderPayload {
                    timestamp: context.timestamp,
                    nonce: &context.nonce,
                    sitename: &context.principal,
                    apikey: credential.key().as_ref(),
                    signature: &signature,
                };
                let json = serde_json::to_vec(&payload).map_err(|e| SignerError::Encode {
                    reason: e.to_string(),
                })?;
                headers.push((AUTH_HEADER.to_string(), STANDARD.encode(json)));
                Ok(context.extra)
            }
            TransportMode::SignedToken => {
                let mut payload =
                    TokenPayload::new(&context.principal, context.timestamp, &context.nonce);
                payload.app = Some(credential.app_handle().to_string());
                let token = generate_token(credential.secret().as_ref(), &payload).map_err(
                    |e| SignerError::Encode {
                        reason: e.to_string(),
                    },
                )?;
                let mut params = context.extra;
                params.push((TOKEN_PARAM.to_string(), token));
                Ok(params)
            }
        }
    }

    fn encode_body(
        encoding: BodyEncoding,
        params: &[(String, String)],
    ) -> Result<String, SignerError> {
        match encoding {
            BodyEncoding::Form => Ok(encode_query(params)),
            BodyEncoding::Json => {
                let object: serde_json::Map<String, serde_json::Value> = params
                    .iter()
                    .map(|(name, value)| (name.clone(), serde_json::Value::String(value.clone())))
                    .collect();
                serde_json::to_string(&object).map_err(|e| SignerError::Encode {
                    reason: e.to_string(),
                })
            }
        }
    }
}
