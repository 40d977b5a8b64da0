//! Process-local nonce store.

use super::{NonceRecord, NonceStore, NonceStoreError};
use async_trait::async_trait;
use std::collections::hash_map::Entry;
use std::collections::HashMap;
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Mutex;

/// Number of accepted nonces between two automatic sweeps.
pub const DEFAULT_SWEEP_INTERVAL: u32 = 100;

#[derive(Debug)]
struct StoredNonce {
    record: NonceRecord,
    expires_at: i64,
}

/// An in-memory [`NonceStore`] for single-instance deployments and tests.
///
/// Every [`DEFAULT_SWEEP_INTERVAL`] accepted nonces the store drops the
/// entries that expired before the nonce being stored. An expired entry is
/// also replaced directly when the same nonce is presented again, and
/// [`MemoryNonceStore::purge_expired`] sweeps on demand. Cloning shares the
/// underlying map.
///
/// # Example
///
/// ```rust
/// use flicksell_auth::auth::nonce::{MemoryNonceStore, NonceStore};
/// use std::time::Duration;
///
/// # #[tokio::main]
/// # async fn main() {
/// let store = MemoryNonceStore::new();
/// let ttl = Duration::from_secs(600);
///
/// assert!(store.check_and_store("n1", 1_700_000_000, ttl).await.unwrap());
/// assert!(!store.check_and_store("n1", 1_700_000_001, ttl).await.unwrap());
/// # }
/// ```
#[derive(Clone, Debug)]
pub struct MemoryNonceStore {
    entries: Arc<Mutex<HashMap<String, StoredNonce>>>,
    accepted: Arc<AtomicU32>,
    sweep_interval: u32,
}

impl Default for MemoryNonceStore {
    fn default() -> Self {
        Self::with_sweep_interval(DEFAULT_SWEEP_INTERVAL)
    }
}

impl MemoryNonceStore {
    /// Creates an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates an empty store that sweeps expired entries every `interval` accepted nonces.
    ///
    /// An interval of zero is treated as one.
    #[must_use]
    pub fn with_sweep_interval(interval: u32) -> Self {
        Self {
            entries: Arc::default(),
            accepted: Arc::new(AtomicU32::new(0)),
            sweep_interval: interval.max(1),
        }
    }

    fn sweep_due(&self) -> bool {
        let count = self.accepted.fetch_add(1, Ordering::Relaxed) + 1;
        if count >= self.sweep_interval {
            self.accepted.store(0, Ordering::Relaxed);
            return true;
        }
        false
    }

    /// Removes every entry that expired at or before `now`, returning how many were removed.
    pub async fn purge_expired(&self, now: i64) -> usize {
        let mut entries = self.entries.lock().await;
        let before = entries.len();
        entries.retain(|_, stored| stored.expires_at > now);
        before - entries.len()
    }

    /// Returns the number of stored entries, expired or not.
    pub async fn len(&self) -> usize {
        self.entries.lock().await.len()
    }

    /// Returns `true` if nothing is stored.
    pub async fn is_empty(&self) -> bool {
        self.entries.lock().await.is_empty()
    }

    /// Returns the record for `nonce` if it is stored.
    pub async fn get(&self, nonce: &str) -> Option<NonceRecord> {
        self.entries
            .lock()
            .await
            .get(nonce)
            .map(|stored| stored.record.clone())
    }
}

#[async_trait]
impl NonceStore for MemoryNonceStore {
    async fn check_and_store(
        &self,
        nonce: &str,
        observed_at: i64,
        ttl: Duration,
    ) -> Result<bool, NonceStoreError> {
        let ttl_secs = i64::try_from(ttl.as_secs()).unwrap_or(i64::MAX);
        let fresh = StoredNonce {
            record: NonceRecord {
                nonce: nonce.to_string(),
                observed_at,
            },
            expires_at: observed_at.saturating_add(ttl_secs),
        };

        let mut entries = self.entries.lock().await;
        match entries.entry(nonce.to_string()) {
            Entry::Occupied(mut occupied) => {
                if occupied.get().expires_at > observed_at {
                    return Ok(false);
                }
                occupied.insert(fresh);
            }
            Entry::Vacant(vacant) => {
                vacant.insert(fresh);
            }
        }

        if self.sweep_due() {
            let before = entries.len();
            entries.retain(|_, stored| stored.expires_at > observed_at);
            tracing::debug!(removed = before - entries.len(), "Swept expired nonces");
        }
        Ok(true)
    }
}
