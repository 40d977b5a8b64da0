//! Replay protection through single-use nonces.
//!
//! A [`NonceStore`] records every nonce accepted by the
//! [`CredentialVerifier`](crate::auth::CredentialVerifier) and refuses to
//! accept it a second time until it expires.
//!
//! # Available Implementations
//!
//! - [`MemoryNonceStore`]: always available, process-local
//! - `RedisNonceStore`: with the `redis-store` feature, shared across instances
//!
//! # Availability
//!
//! A store that cannot reach its backend returns
//! [`NonceStoreError::Unavailable`]. What happens next is decided by the
//! verifier's [`CacheFailurePolicy`](crate::CacheFailurePolicy), not by the store.

mod memory;
#[cfg(feature = "redis-store")]
mod redis;

pub use memory::{MemoryNonceStore, DEFAULT_SWEEP_INTERVAL};
#[cfg(feature = "redis-store")]
pub use self::redis::RedisNonceStore;

use async_trait::async_trait;
use std::time::Duration;
use thiserror::Error;

/// A stored nonce.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct NonceRecord {
    /// The nonce value.
    pub nonce: String,
    /// Unix seconds at which the nonce was first accepted.
    pub observed_at: i64,
}

/// Errors raised by a [`NonceStore`] backend.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum NonceStoreError {
    /// The backing store could not be reached in time.
    #[error("Nonce store unavailable: {reason}")]
    Unavailable {
        /// Backend-specific description.
        reason: String,
    },
}

/// Atomic check-and-set storage for nonces.
///
/// # Contract
///
/// `check_and_store` returns `Ok(true)` and records the nonce when it is not
/// present, or `Ok(false)` when it is (a replay). Under concurrent callers
/// racing on the same nonce, at most one receives `Ok(true)`.
///
/// # Example Implementation
///
/// ```rust
/// use async_trait::async_trait;
/// use flicksell_auth::auth::nonce::{NonceStore, NonceStoreError};
/// use std::collections::HashSet;
/// use std::sync::Mutex;
/// use std::time::Duration;
///
/// #[derive(Default)]
/// struct NeverExpiring(Mutex<HashSet<String>>);
///
/// #[async_trait]
/// impl NonceStore for NeverExpiring {
///     async fn check_and_store(
///         &self,
///         nonce: &str,
///         _observed_at: i64,
///         _ttl: Duration,
///     ) -> Result<bool, NonceStoreError> {
///         let mut seen = self.0.lock().map_err(|e| NonceStoreError::Unavailable {
///             reason: e.to_string(),
///         })?;
///         Ok(seen.insert(nonce.to_string()))
///     }
/// }
/// ```
#[async_trait]
pub trait NonceStore: Send + Sync {
    /// Records `nonce` if it has not been seen within its TTL.
    ///
    /// # Errors
    ///
    /// Returns [`NonceStoreError::Unavailable`] if the backend cannot be reached.
    async fn check_and_store(
        &self,
        nonce: &str,
        observed_at: i64,
        ttl: Duration,
    ) -> Result<bool, NonceStoreError>;
}

// Verify NonceStoreError is Send + Sync at compile time
const _: fn() = || {
    const fn assert_send_sync<T: Send + Sync>() {}
    assert_send_sync::<NonceStoreError>();
};
