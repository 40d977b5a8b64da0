//! HMAC-SHA256 signing for legacy requests and compact signed tokens.
//!
//! Two wire shapes share the same primitive:
//!
//! - **Raw parameters**: the signature covers the canonical message
//!   `timestamp + " " + nonce + " " + principal + " " + PROTOCOL_MARKER`.
//! - **Compact token**: `base64url(JSON(payload)) + "." + hex(signature)`,
//!   where the signature covers the base64 text, not the raw JSON.
//!
//! # Security
//!
//! All comparisons use constant-time comparison. Malformed candidates are
//! treated as a mismatch; nothing in this module panics on untrusted input.
//!
//! # Example
//!
//! ```rust
//! use flicksell_auth::auth::signature::{sign, verify, SigningContext};
//! use flicksell_auth::Scope;
//!
//! let context = SigningContext::new(1_700_000_000, "n1", "store1", Scope::Storefront);
//! let signature = sign(&context, "abc");
//! assert_eq!(
//!     signature,
//!     "e1d70f030ca064b028d205c8104f5f19625bdc66cf3d78be22aab3a5fa9ce126"
//! );
//! assert!(verify(&context, "abc", &signature));
//! ```

use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use base64::Engine;
use hmac::{Hmac, Mac};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use sha2::Sha256;
use subtle::ConstantTimeEq;
use thiserror::Error;

use crate::config::Scope;

type HmacSha256 = Hmac<Sha256>;

/// Versioned protocol constant appended to every canonical message.
///
/// It is part of the signed bytes and must match the platform exactly.
pub const PROTOCOL_MARKER: &str = "FLICKSELL_AUTH_V1";

const DELIMITER: char = ' ';
const TOKEN_SEPARATOR: char = '.';

/// The inputs of one legacy signature.
///
/// Outbound contexts are created fresh for every call and never reused.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SigningContext {
    /// Unix seconds.
    pub timestamp: i64,
    /// Single-use value.
    pub nonce: String,
    /// Store/site identifier.
    pub principal: String,
    /// Trust domain of the signing credential.
    pub scope: Scope,
    /// Additional ordered parameters sent alongside the signature.
    ///
    /// They travel with the request but are not part of the canonical message.
    pub extra: Vec<(String, String)>,
}

impl SigningContext {
    /// Creates a context without extra parameters.
    #[must_use]
    pub fn new(
        timestamp: i64,
        nonce: impl Into<String>,
        principal: impl Into<String>,
        scope: Scope,
    ) -> Self {
        Self {
            timestamp,
            nonce: nonce.into(),
            principal: principal.into(),
            scope,
            extra: Vec::new(),
        }
    }

    /// Returns the canonical message covered by the signature.
    #[must_use]
    pub fn canonical_message(&self) -> String {
        format!(
            "{}{DELIMITER}{}{DELIMITER}{}{DELIMITER}{PROTOCOL_MARKER}",
            self.timestamp, self.nonce, self.principal
        )
    }
}

/// Computes an HMAC-SHA256 signature as lowercase hex.
#[must_use]
#[allow(clippy::missing_panics_doc)] // HMAC accepts any key size, so this never panics
pub fn compute_signature(message: &str, secret: &str) -> String {
    let mut mac =
        HmacSha256::new_from_slice(secret.as_bytes()).expect("HMAC can take key of any size");
    mac.update(message.as_bytes());
    hex::encode(mac.finalize().into_bytes())
}

/// Performs constant-time comparison of two strings.
#[must_use]
pub fn constant_time_compare(a: &str, b: &str) -> bool {
    // ConstantTimeEq handles different lengths securely
    a.as_bytes().ct_eq(b.as_bytes()).into()
}

/// Signs a context. The same context and secret always yield the same signature.
#[must_use]
pub fn sign(context: &SigningContext, secret: &str) -> String {
    compute_signature(&context.canonical_message(), secret)
}

/// Checks `candidate` against the signature of `context`.
#[must_use]
pub fn verify(context: &SigningContext, secret: &str, candidate: &str) -> bool {
    constant_time_compare(&sign(context, secret), candidate)
}

/// The JSON payload of a compact signed token.
///
/// Unknown fields are preserved in [`TokenPayload::extra`].
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct TokenPayload {
    /// Issuer (site identifier).
    pub iss: String,
    /// Issued-at, unix seconds.
    pub iat: i64,
    /// Single-use value.
    pub nonce: String,
    /// Owning app handle, when the issuer names one.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub app: Option<String>,
    /// Any further fields.
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl TokenPayload {
    /// Creates a payload without app handle or extra fields.
    #[must_use]
    pub fn new(iss: impl Into<String>, iat: i64, nonce: impl Into<String>) -> Self {
        Self {
            iss: iss.into(),
            iat,
            nonce: nonce.into(),
            app: None,
            extra: Map::new(),
        }
    }
}

/// Why a compact token could not be split and decoded.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum TokenParseError {
    /// No `.` separates the payload from the signature.
    #[error("token has no signature part")]
    MissingSignature,

    /// The payload or the signature part is empty.
    #[error("token has an empty part")]
    EmptyPart,

    /// The payload part is not valid base64url.
    #[error("invalid token payload encoding: {reason}")]
    Encoding {
        /// Decoder error message.
        reason: String,
    },

    /// The decoded payload is not a JSON payload object.
    #[error("invalid token payload: {reason}")]
    Payload {
        /// Deserializer error message.
        reason: String,
    },
}

/// A compact token split into its parts but not yet verified.
#[derive(Clone, Debug)]
pub struct SignedToken<'a> {
    encoded_payload: &'a str,
    signature: &'a str,
    payload: TokenPayload,
}

impl<'a> SignedToken<'a> {
    /// Splits and decodes a token.
    ///
    /// The split happens at the last `.`; base64url never produces one, so the
    /// payload part is unambiguous.
    ///
    /// # Errors
    ///
    /// Returns a [`TokenParseError`] naming the defect when the token is malformed.
    pub fn parse(token: &'a str) -> Result<Self, TokenParseError> {
        let (encoded_payload, signature) = token
            .rsplit_once(TOKEN_SEPARATOR)
            .ok_or(TokenParseError::MissingSignature)?;
        if encoded_payload.is_empty() || signature.is_empty() {
            return Err(TokenParseError::EmptyPart);
        }

        let bytes = URL_SAFE_NO_PAD
            .decode(encoded_payload)
            .map_err(|e| TokenParseError::Encoding {
                reason: e.to_string(),
            })?;
        let payload: TokenPayload =
            serde_json::from_slice(&bytes).map_err(|e| TokenParseError::Payload {
                reason: e.to_string(),
            })?;

        Ok(Self {
            encoded_payload,
            signature,
            payload,
        })
    }

    /// Returns the decoded payload.
    #[must_use]
    pub const fn payload(&self) -> &TokenPayload {
        &self.payload
    }

    /// Consumes the token, returning the decoded payload.
    #[must_use]
    pub fn into_payload(self) -> TokenPayload {
        self.payload
    }

    /// Checks the signature against `secret` in constant time.
    #[must_use]
    pub fn verify(&self, secret: &str) -> bool {
        constant_time_compare(
            &compute_signature(self.encoded_payload, secret),
            self.signature,
        )
    }
}

/// Generates a compact signed token.
///
/// # Errors
///
/// Returns an error if the payload's extra fields cannot be serialized.
pub fn generate_token(secret: &str, payload: &TokenPayload) -> Result<String, serde_json::Error> {
    let json = serde_json::to_vec(payload)?;
    let encoded = URL_SAFE_NO_PAD.encode(json);
    let signature = compute_signature(&encoded, secret);
    Ok(format!("{encoded}{TOKEN_SEPARATOR}{signature}"))
}

/// Verifies a compact token, returning its payload when the signature matches.
#[must_use]
pub fn verify_token(token: &str, secret: &str) -> Option<TokenPayload> {
    let parsed = SignedToken::parse(token).ok()?;
    parsed.verify(secret).then(|| parsed.into_payload())
}
