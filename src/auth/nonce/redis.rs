//! Redis-backed nonce store.
//!
//! Every nonce is written with `SET key value NX EX ttl`, which makes the
//! check-and-store a single atomic command on the server. Each call is bounded
//! by the configured timeout so an unreachable server surfaces as
//! [`NonceStoreError::Unavailable`] instead of hanging the request.

use super::{NonceStore, NonceStoreError};
use crate::config::CacheConfig;
use async_trait::async_trait;
use redis::{aio::MultiplexedConnection, AsyncCommands, Client};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Mutex;

/// A [`NonceStore`] shared across application instances through Redis.
///
/// # Example
///
/// ```rust,no_run
/// use flicksell_auth::auth::nonce::RedisNonceStore;
/// use flicksell_auth::config::CacheConfig;
/// use std::time::Duration;
///
/// let store = RedisNonceStore::from_config(
///     &CacheConfig::new("redis://localhost:6379/0"),
///     Duration::from_secs(2),
/// )
/// .unwrap();
/// ```
pub struct RedisNonceStore {
    client: Client,
    key_prefix: String,
    timeout: Duration,
    conn: Arc<Mutex<Option<MultiplexedConnection>>>,
}

impl RedisNonceStore {
    /// Creates a store for `redis_url`. No connection is made until first use.
    ///
    /// # Errors
    ///
    /// Returns [`NonceStoreError::Unavailable`] if the URL cannot be parsed.
    pub fn new(
        redis_url: &str,
        key_prefix: impl Into<String>,
        timeout: Duration,
    ) -> Result<Self, NonceStoreError> {
        let client = Client::open(redis_url).map_err(|e| NonceStoreError::Unavailable {
            reason: format!("Redis client error: {e}"),
        })?;

        Ok(Self {
            client,
            key_prefix: key_prefix.into(),
            timeout,
            conn: Arc::new(Mutex::new(None)),
        })
    }

    /// Creates a store from the configured cache parameters.
    ///
    /// # Errors
    ///
    /// Returns [`NonceStoreError::Unavailable`] if the URL cannot be parsed.
    pub fn from_config(cache: &CacheConfig, timeout: Duration) -> Result<Self, NonceStoreError> {
        Self::new(&cache.url, cache.key_prefix.clone(), timeout)
    }

    fn make_key(&self, nonce: &str) -> String {
        let mut key = String::with_capacity(self.key_prefix.len() + nonce.len() + 1);
        key.push_str(&self.key_prefix);
        key.push(':');
        key.push_str(nonce);
        key
    }

    async fn connection(&self) -> Result<MultiplexedConnection, NonceStoreError> {
        let mut guard = self.conn.lock().await;
        if let Some(conn) = guard.as_ref() {
            return Ok(conn.clone());
        }

        let conn = self
            .client
            .get_multiplexed_tokio_connection()
            .await
            .map_err(|e| NonceStoreError::Unavailable {
                reason: format!("Redis connection failed: {e}"),
            })?;
        *guard = Some(conn.clone());
        Ok(conn)
    }

    async fn set_if_absent(
        &self,
        key: &str,
        observed_at: i64,
        ttl: Duration,
    ) -> Result<bool, NonceStoreError> {
        let mut conn = self.connection().await?;
        // Redis requires TTL in seconds, minimum 1 second
        let ttl_secs = usize::try_from(ttl.as_secs().max(1)).unwrap_or(usize::MAX);

        let result: redis::RedisResult<Option<String>> = conn
            .set_options(
                key,
                observed_at.to_string(),
                redis::SetOptions::default()
                    .conditional_set(redis::ExistenceCheck::NX)
                    .with_expiration(redis::SetExpiry::EX(ttl_secs)),
            )
            .await;

        match result {
            Ok(Some(_)) => Ok(true),
            Ok(None) => Ok(false),
            Err(e) => {
                // Drop the cached connection so the next call reconnects
                *self.conn.lock().await = None;
                Err(NonceStoreError::Unavailable {
                    reason: e.to_string(),
                })
            }
        }
    }
}

#[async_trait]
impl NonceStore for RedisNonceStore {
    async fn check_and_store(
        &self,
        nonce: &str,
        observed_at: i64,
        ttl: Duration,
    ) -> Result<bool, NonceStoreError> {
        let key = self.make_key(nonce);
        tokio::time::timeout(self.timeout, self.set_if_absent(&key, observed_at, ttl))
            .await
            .map_err(|_| NonceStoreError::Unavailable {
                reason: format!("Redis call timed out after {:?}", self.timeout),
            })?
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_make_key_uses_prefix() {
        let store =
            RedisNonceStore::new("redis://127.0.0.1:6379", "app", Duration::from_secs(1)).unwrap();
        assert_eq!(store.make_key("n1"), "app:n1");
    }

    #[test]
    fn test_new_rejects_invalid_url() {
        let result = RedisNonceStore::new("not a url", "app", Duration::from_secs(1));
        assert!(matches!(result, Err(NonceStoreError::Unavailable { .. })));
    }

    #[tokio::test]
    async fn test_unreachable_server_is_unavailable() {
        // Port 1 is never a Redis server
        let store =
            RedisNonceStore::new("redis://127.0.0.1:1", "app", Duration::from_secs(2)).unwrap();
        let result = store
            .check_and_store("n1", 100, Duration::from_secs(600))
            .await;
        assert!(matches!(result, Err(NonceStoreError::Unavailable { .. })));
    }
}
