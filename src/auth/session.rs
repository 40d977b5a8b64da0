//! Binding verified claims to a local session.
//!
//! After a successful verification the embedding application may bind the
//! resulting [`VerifiedClaims`] to its own session identifier, so later
//! requests in the same session need not be re-signed. Storage is an injected
//! [`SessionStore`]; the binder never touches ambient process state.
//!
//! Sessions live under a namespace derived from the credential key, so two
//! credentials never share a session slot. A bound session stays fresh for
//! `min(12 * max_timestamp_age, 3600)` seconds.

use crate::auth::{Credential, VerifiedClaims};
use crate::config::AuthConfig;
use async_trait::async_trait;
use sha2::{Digest, Sha256};
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::RwLock;

const NAMESPACE_PREFIX: &str = "flicksell_";

/// Verified claims bound to a session identifier.
#[derive(Clone, Debug, PartialEq)]
pub struct Session {
    /// The embedding application's opaque session identifier.
    pub id: String,
    /// Claims from the verification that created the session.
    pub claims: VerifiedClaims,
    /// Unix seconds at which the claims were bound.
    pub bound_at: i64,
}

impl Session {
    /// Returns `true` if the session is older than `lifetime` at `now`.
    #[must_use]
    pub fn expired_at(&self, now: i64, lifetime: Duration) -> bool {
        let age = now.saturating_sub(self.bound_at);
        age < 0 || age.unsigned_abs() > lifetime.as_secs()
    }
}

/// Storage capability for sessions, partitioned by namespace.
#[async_trait]
pub trait SessionStore: Send + Sync {
    /// Stores `session`, replacing any session with the same id in `namespace`.
    async fn put(&self, namespace: &str, session: Session);

    /// Returns the session `id` in `namespace`.
    async fn get(&self, namespace: &str, id: &str) -> Option<Session>;

    /// Removes the session `id` from `namespace`.
    async fn remove(&self, namespace: &str, id: &str) -> Option<Session>;

    /// Removes every session in `namespace`, returning how many were removed.
    async fn clear(&self, namespace: &str) -> usize;
}

/// A process-local [`SessionStore`].
#[derive(Clone, Debug, Default)]
pub struct MemorySessionStore {
    namespaces: Arc<RwLock<HashMap<String, HashMap<String, Session>>>>,
}

impl MemorySessionStore {
    /// Creates an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl SessionStore for MemorySessionStore {
    async fn put(&self, namespace: &str, session: Session) {
        self.namespaces
            .write()
            .await
            .entry(namespace.to_string())
            .or_default()
            .insert(session.id.clone(), session);
    }

    async fn get(&self, namespace: &str, id: &str) -> Option<Session> {
        self.namespaces
            .read()
            .await
            .get(namespace)
            .and_then(|sessions| sessions.get(id))
            .cloned()
    }

    async fn remove(&self, namespace: &str, id: &str) -> Option<Session> {
        self.namespaces
            .write()
            .await
            .get_mut(namespace)
            .and_then(|sessions| sessions.remove(id))
    }

    async fn clear(&self, namespace: &str) -> usize {
        self.namespaces
            .write()
            .await
            .remove(namespace)
            .map_or(0, |sessions| sessions.len())
    }
}

/// Derives the session namespace for a credential.
///
/// The namespace is a short SHA-256 fingerprint of the API key, so the key
/// itself never appears in storage.
#[must_use]
pub fn session_namespace(credential: &Credential) -> String {
    let digest = Sha256::digest(credential.key().as_ref().as_bytes());
    let fingerprint = hex::encode(digest);
    format!("{NAMESPACE_PREFIX}{}", &fingerprint[..16])
}

/// Binds verified claims to sessions of one credential.
pub struct SessionBinder {
    store: Arc<dyn SessionStore>,
    namespace: String,
    lifetime: Duration,
    enabled: bool,
}

impl SessionBinder {
    /// Creates a binder for `credential`, honoring `session_enabled` from `config`.
    #[must_use]
    pub fn new(config: &AuthConfig, credential: &Credential, store: Arc<dyn SessionStore>) -> Self {
        Self {
            store,
            namespace: session_namespace(credential),
            lifetime: config.session_lifetime(),
            enabled: config.session_enabled(),
        }
    }

    /// Returns the namespace all sessions of this binder live under.
    #[must_use]
    pub fn namespace(&self) -> &str {
        &self.namespace
    }

    /// Returns how long a bound session stays fresh.
    #[must_use]
    pub const fn lifetime(&self) -> Duration {
        self.lifetime
    }

    /// Returns `false` when session binding is disabled by configuration.
    #[must_use]
    pub const fn is_enabled(&self) -> bool {
        self.enabled
    }

    /// Binds `claims` to `session_id` now.
    ///
    /// Returns `None` without storing anything when sessions are disabled.
    pub async fn bind(&self, session_id: &str, claims: VerifiedClaims) -> Option<Session> {
        self.bind_at(session_id, claims, chrono::Utc::now().timestamp())
            .await
    }

    /// Binds `claims` to `session_id` as of `now` (unix seconds).
    pub async fn bind_at(
        &self,
        session_id: &str,
        claims: VerifiedClaims,
        now: i64,
    ) -> Option<Session> {
        if !self.enabled {
            return None;
        }
        let session = Session {
            id: session_id.to_string(),
            claims,
            bound_at: now,
        };
        self.store.put(&self.namespace, session.clone()).await;
        tracing::debug!(namespace = %self.namespace, "Session bound");
        Some(session)
    }

    /// Returns `true` if `session_id` holds fresh claims.
    pub async fn is_bound(&self, session_id: &str) -> bool {
        self.is_bound_at(session_id, chrono::Utc::now().timestamp())
            .await
    }

    /// Returns `true` if `session_id` holds claims that are fresh at `now`.
    pub async fn is_bound_at(&self, session_id: &str, now: i64) -> bool {
        self.claims_at(session_id, now).await.is_some()
    }

    /// Returns the claims bound to `session_id` while fresh.
    pub async fn claims(&self, session_id: &str) -> Option<VerifiedClaims> {
        self.claims_at(session_id, chrono::Utc::now().timestamp())
            .await
    }

    /// Returns the claims bound to `session_id` if fresh at `now`.
    ///
    /// A stale session is removed from the store.
    pub async fn claims_at(&self, session_id: &str, now: i64) -> Option<VerifiedClaims> {
        if !self.enabled {
            return None;
        }
        let session = self.store.get(&self.namespace, session_id).await?;
        if session.expired_at(now, self.lifetime) {
            self.store.remove(&self.namespace, session_id).await;
            return None;
        }
        Some(session.claims)
    }

    /// Removes every session bound under this binder's namespace.
    pub async fn clear(&self) -> usize {
        self.store.clear(&self.namespace).await
    }
}

// Verify SessionBinder and Session are Send + Sync at compile time
const _: fn() = || {
    const fn assert_send_sync<T: Send + Sync>() {}
    assert_send_sync::<SessionBinder>();
    assert_send_sync::<Session>();
};

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{ApiKey, ApiSecretKey, Scope};
    use serde_json::Map;

    const NOW: i64 = 1_700_000_000;

    fn credential(key: &str) -> Credential {
        Credential::new(
            Scope::Storefront,
            ApiKey::new(key).unwrap(),
            ApiSecretKey::new("secret").unwrap(),
        )
    }

    fn config(enabled: bool) -> AuthConfig {
        AuthConfig::builder()
            .credential(credential("sf-key"))
            .session_enabled(enabled)
            .build()
            .unwrap()
    }

    fn claims() -> VerifiedClaims {
        VerifiedClaims {
            issuer: "store1".to_string(),
            issued_at: NOW,
            nonce: "n1".to_string(),
            app_handle: None,
            scope: Scope::Storefront,
            raw: Map::new(),
        }
    }

    #[test]
    fn test_namespace_is_derived_from_key() {
        let a = session_namespace(&credential("key-a"));
        let b = session_namespace(&credential("key-b"));
        assert!(a.starts_with("flicksell_"));
        assert_eq!(a.len(), "flicksell_".len() + 16);
        assert!(!a.contains("key-a"));
        assert_ne!(a, b);
        assert_eq!(a, session_namespace(&credential("key-a")));
    }

    #[tokio::test]
    async fn test_bind_then_expire() {
        let binder = SessionBinder::new(
            &config(true),
            &credential("sf-key"),
            Arc::new(MemorySessionStore::new()),
        );
        assert_eq!(binder.lifetime(), Duration::from_secs(3600));

        binder.bind_at("s1", claims(), NOW).await.unwrap();
        assert!(binder.is_bound_at("s1", NOW + 3600).await);
        assert!(!binder.is_bound_at("s1", NOW + 3601).await);
        // Stale sessions are destroyed on lookup
        assert!(!binder.is_bound_at("s1", NOW).await);
    }

    #[tokio::test]
    async fn test_claims_are_returned_while_fresh() {
        let binder = SessionBinder::new(
            &config(true),
            &credential("sf-key"),
            Arc::new(MemorySessionStore::new()),
        );
        binder.bind_at("s1", claims(), NOW).await;
        assert_eq!(binder.claims_at("s1", NOW + 10).await, Some(claims()));
        assert!(binder.claims_at("missing", NOW).await.is_none());
    }

    #[tokio::test]
    async fn test_credentials_do_not_share_sessions() {
        let store: Arc<dyn SessionStore> = Arc::new(MemorySessionStore::new());
        let first = SessionBinder::new(&config(true), &credential("key-a"), Arc::clone(&store));
        let second = SessionBinder::new(&config(true), &credential("key-b"), Arc::clone(&store));

        first.bind_at("s1", claims(), NOW).await;
        assert!(first.is_bound_at("s1", NOW).await);
        assert!(!second.is_bound_at("s1", NOW).await);

        assert_eq!(second.clear().await, 0);
        assert_eq!(first.clear().await, 1);
        assert!(!first.is_bound_at("s1", NOW).await);
    }

    #[tokio::test]
    async fn test_disabled_binder_stores_nothing() {
        let store = MemorySessionStore::new();
        let binder = SessionBinder::new(
            &config(false),
            &credential("sf-key"),
            Arc::new(store.clone()),
        );
        assert!(!binder.is_enabled());
        assert!(binder.bind_at("s1", claims(), NOW).await.is_none());
        assert!(store.get(binder.namespace(), "s1").await.is_none());
    }

    #[test]
    fn test_session_from_the_future_is_expired() {
        let session = Session {
            id: "s1".to_string(),
            claims: claims(),
            bound_at: NOW,
        };
        assert!(session.expired_at(NOW - 1, Duration::from_secs(60)));
        assert!(!session.expired_at(NOW + 60, Duration::from_secs(60)));
    }
}
