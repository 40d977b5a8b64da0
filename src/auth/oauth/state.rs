//! CSRF state for the authorization code flow.
//!
//! A [`StateParam`] is generated when the user is sent to the authorization
//! URL and must come back unchanged on the callback. It is either a bare
//! 15-character alphanumeric nonce, or a URL-safe base64 JSON envelope
//! carrying that nonce plus caller data (for instance a return path).

use crate::auth::signature::constant_time_compare;
use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use base64::Engine;
use rand::distributions::Alphanumeric;
use rand::Rng;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::fmt;

const NONCE_LENGTH: usize = 15;

#[derive(Serialize, Deserialize)]
struct Envelope<T> {
    nonce: String,
    data: T,
}

/// OAuth state parameter.
///
/// # Example
///
/// ```rust
/// use flicksell_auth::auth::oauth::StateParam;
///
/// let state = StateParam::with_data(&"/dashboard");
/// assert!(state.matches(state.as_ref()));
/// assert_eq!(state.extract_data::<String>().as_deref(), Some("/dashboard"));
/// ```
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct StateParam {
    value: String,
}

fn random_nonce() -> String {
    rand::thread_rng()
        .sample_iter(&Alphanumeric)
        .take(NONCE_LENGTH)
        .map(char::from)
        .collect()
}

impl StateParam {
    /// Creates a state holding only a random nonce.
    #[must_use]
    pub fn new() -> Self {
        Self {
            value: random_nonce(),
        }
    }

    /// Creates a state carrying `data` alongside a random nonce.
    #[must_use]
    pub fn with_data<T: Serialize>(data: &T) -> Self {
        let envelope = Envelope {
            nonce: random_nonce(),
            data,
        };
        let json = serde_json::to_vec(&envelope).unwrap_or_default();
        Self {
            value: URL_SAFE_NO_PAD.encode(json),
        }
    }

    /// Wraps a state value received from, or persisted by, the caller.
    #[must_use]
    pub fn from_raw(raw: impl Into<String>) -> Self {
        Self { value: raw.into() }
    }

    /// Returns the embedded nonce, or the whole value for a bare state.
    #[must_use]
    pub fn nonce(&self) -> String {
        self.decode::<serde_json::Value>()
            .map_or_else(|| self.value.clone(), |envelope| envelope.nonce)
    }

    /// Returns the embedded data, if this state carries any of type `T`.
    #[must_use]
    pub fn extract_data<T: DeserializeOwned>(&self) -> Option<T> {
        self.decode::<T>().map(|envelope| envelope.data)
    }

    /// Compares a received state with this one in constant time.
    #[must_use]
    pub fn matches(&self, received: &str) -> bool {
        constant_time_compare(&self.value, received)
    }

    fn decode<T: DeserializeOwned>(&self) -> Option<Envelope<T>> {
        let bytes = URL_SAFE_NO_PAD.decode(self.value.as_bytes()).ok()?;
        serde_json::from_slice(&bytes).ok()
    }
}

impl Default for StateParam {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for StateParam {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.value)
    }
}

impl AsRef<str> for StateParam {
    fn as_ref(&self) -> &str {
        &self.value
    }
}

// Verify StateParam is Send + Sync at compile time
const _: fn() = || {
    const fn assert_send_sync<T: Send + Sync>() {}
    assert_send_sync::<StateParam>();
};
