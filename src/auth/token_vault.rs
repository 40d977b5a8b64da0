//! In-process storage for access tokens.
//!
//! The [`TokenVault`] exclusively owns every [`Token`], keyed by
//! `(AppHandle, Scope)`. Writes replace the whole entry under a lock, so a
//! reader never observes a partially written token.
//!
//! Each key also owns an async guard used to make refreshes single-flight:
//! the caller holding the guard performs the network call while the others
//! wait, then re-read the vault and find the fresh token.

use crate::config::{AppHandle, Scope};
use chrono::{DateTime, Utc};
use std::collections::HashMap;
use std::fmt;
use std::sync::{Arc, Mutex, PoisonError, RwLock};
use tokio::sync::Mutex as AsyncMutex;

/// Seconds before expiry at which a token is treated as stale.
pub const REFRESH_BUFFER_SECS: i64 = 60;

/// Identifies one vault entry.
pub type VaultKey = (AppHandle, Scope);

/// An access token issued by the platform.
///
/// # Security
///
/// The `Debug` implementation masks both the access and refresh token.
#[derive(Clone, PartialEq, Eq)]
pub struct Token {
    /// Bearer token sent in the `Authorization` header.
    pub access_token: String,
    /// Token used to obtain a new access token, if issued.
    pub refresh_token: Option<String>,
    /// Expiry instant.
    pub expires_at: DateTime<Utc>,
    /// Token type as reported by the platform, usually `Bearer`.
    pub token_type: String,
}

impl Token {
    /// Returns `true` if the token expires more than the refresh buffer after `now`.
    #[must_use]
    pub fn is_fresh_at(&self, now: DateTime<Utc>) -> bool {
        self.expires_at.timestamp() - now.timestamp() > REFRESH_BUFFER_SECS
    }

    /// Returns `true` if the token expires more than the refresh buffer from now.
    #[must_use]
    pub fn is_fresh(&self) -> bool {
        self.is_fresh_at(Utc::now())
    }
}

impl fmt::Debug for Token {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Token")
            .field("access_token", &"*****")
            .field("refresh_token_set", &self.refresh_token.is_some())
            .field("expires_at", &self.expires_at)
            .field("token_type", &self.token_type)
            .finish()
    }
}

/// Shared token cache with per-key refresh guards.
#[derive(Default)]
pub struct TokenVault {
    tokens: RwLock<HashMap<VaultKey, Token>>,
    guards: Mutex<HashMap<VaultKey, Arc<AsyncMutex<()>>>>,
}

impl TokenVault {
    /// Creates an empty vault.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns a copy of the token stored under `key`.
    #[must_use]
    pub fn get(&self, key: &VaultKey) -> Option<Token> {
        self.tokens
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(key)
            .cloned()
    }

    /// Replaces the token stored under `key`.
    pub fn store(&self, key: VaultKey, token: Token) {
        self.tokens
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(key, token);
    }

    /// Removes and returns the token stored under `key`.
    pub fn remove(&self, key: &VaultKey) -> Option<Token> {
        self.tokens
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .remove(key)
    }

    /// Returns the refresh guard for `key`, creating it on first use.
    #[must_use]
    pub fn guard(&self, key: &VaultKey) -> Arc<AsyncMutex<()>> {
        let mut guards = self.guards.lock().unwrap_or_else(PoisonError::into_inner);
        Arc::clone(guards.entry(key.clone()).or_default())
    }

    /// Returns the number of stored tokens.
    #[must_use]
    pub fn len(&self) -> usize {
        self.tokens
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    /// Returns `true` if no token is stored.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl fmt::Debug for TokenVault {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TokenVault")
            .field("tokens", &self.len())
            .finish_non_exhaustive()
    }
}

// Verify TokenVault and Token are Send + Sync at compile time
const _: fn() = || {
    const fn assert_send_sync<T: Send + Sync>() {}
    assert_send_sync::<TokenVault>();
    assert_send_sync::<Token>();
};
