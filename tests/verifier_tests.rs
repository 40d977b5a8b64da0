//! Integration tests for inbound verification and replay protection.

use async_trait::async_trait;
use flicksell_auth::auth::nonce::{MemoryNonceStore, NonceStore, NonceStoreError};
use flicksell_auth::auth::session::MemorySessionStore;
use flicksell_auth::auth::signature::{
    compute_signature, generate_token, sign, verify_token, SigningContext, TokenPayload,
    PROTOCOL_MARKER,
};
use flicksell_auth::auth::{InboundCredentials, RawSignedParams, RejectionKind, SessionBinder};
use flicksell_auth::{
    ApiKey, ApiSecretKey, AuthConfig, CacheFailurePolicy, Credential, CredentialVerifier, Scope,
};
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

const NOW: i64 = 1_700_000_000;
const GOLDEN_SIGNATURE: &str = "e1d70f030ca064b028d205c8104f5f19625bdc66cf3d78be22aab3a5fa9ce126";

fn config(policy: CacheFailurePolicy) -> AuthConfig {
    AuthConfig::builder()
        .credential(Credential::new(
            Scope::Storefront,
            ApiKey::new("sf-key").unwrap(),
            ApiSecretKey::new("abc").unwrap(),
        ))
        .cache_failure_policy(policy)
        .build()
        .unwrap()
}

fn raw(timestamp: i64, nonce: &str) -> InboundCredentials {
    let context = SigningContext::new(timestamp, nonce, "store1", Scope::Storefront);
    InboundCredentials::Raw(RawSignedParams {
        apikey: "sf-key".to_string(),
        timestamp,
        nonce: nonce.to_string(),
        sitename: "store1".to_string(),
        signature: sign(&context, "abc"),
    })
}

struct DownStore;

#[async_trait]
impl NonceStore for DownStore {
    async fn check_and_store(
        &self,
        _nonce: &str,
        _observed_at: i64,
        _ttl: Duration,
    ) -> Result<bool, NonceStoreError> {
        Err(NonceStoreError::Unavailable {
            reason: "connection refused".to_string(),
        })
    }
}

// === Signature codec ===

#[test]
fn test_golden_vector() {
    let context = SigningContext::new(NOW, "n1", "store1", Scope::Storefront);
    assert_eq!(
        context.canonical_message(),
        format!("1700000000 n1 store1 {PROTOCOL_MARKER}")
    );
    assert_eq!(sign(&context, "abc"), GOLDEN_SIGNATURE);
    assert_eq!(
        compute_signature("1700000000 n1 store1 FLICKSELL_AUTH_V1", "abc"),
        GOLDEN_SIGNATURE
    );
}

#[test]
fn test_token_round_trip_keeps_custom_fields() {
    let mut payload = TokenPayload::new("store1", NOW, "n1");
    payload
        .extra
        .insert("custom".to_string(), serde_json::json!("x"));
    payload
        .extra
        .insert("user_id".to_string(), serde_json::json!(123));

    let token = generate_token("abc", &payload).unwrap();
    let decoded = verify_token(&token, "abc").unwrap();
    assert_eq!(decoded, payload);
    assert!(verify_token(&token, "wrong").is_none());
}

// === Verifier ===

#[tokio::test]
async fn test_raw_parameters_from_request() {
    let verifier = CredentialVerifier::new(
        config(CacheFailurePolicy::FailOpen),
        Arc::new(MemoryNonceStore::new()),
    );
    let params = HashMap::from([
        ("apikey".to_string(), "sf-key".to_string()),
        ("timestamp".to_string(), NOW.to_string()),
        ("nonce".to_string(), "n1".to_string()),
        ("sitename".to_string(), "store1".to_string()),
        ("signature".to_string(), GOLDEN_SIGNATURE.to_string()),
    ]);

    let input = InboundCredentials::from_params(&params).unwrap();
    let claims = verifier.verify_at(&input, NOW).await.unwrap();
    assert_eq!(claims.issuer, "store1");
    assert_eq!(claims.issued_at, NOW);
    assert_eq!(claims.nonce, "n1");
    assert_eq!(claims.scope, Scope::Storefront);
}

#[tokio::test]
async fn test_replay_is_rejected() {
    let verifier = CredentialVerifier::new(
        config(CacheFailurePolicy::FailOpen),
        Arc::new(MemoryNonceStore::new()),
    );
    let input = raw(NOW, "n1");

    assert!(verifier.verify_at(&input, NOW).await.is_ok());
    let error = verifier.verify_at(&input, NOW + 5).await.unwrap_err();
    assert_eq!(error.kind(), RejectionKind::Replay);
}

#[tokio::test]
async fn test_replay_rejected_until_window_closes() {
    let verifier = CredentialVerifier::new(
        config(CacheFailurePolicy::FailOpen),
        Arc::new(MemoryNonceStore::new()),
    );
    let input = raw(NOW + 300, "n1");

    assert!(verifier.verify_at(&input, NOW).await.is_ok());
    for now in [NOW + 1, NOW + 599, NOW + 600] {
        let error = verifier.verify_at(&input, now).await.unwrap_err();
        assert_eq!(error.kind(), RejectionKind::Replay);
    }
    let error = verifier.verify_at(&input, NOW + 601).await.unwrap_err();
    assert_eq!(error.kind(), RejectionKind::Expired);
}

#[tokio::test]
async fn test_timestamp_window_boundaries() {
    let verifier = CredentialVerifier::new(
        config(CacheFailurePolicy::FailOpen),
        Arc::new(MemoryNonceStore::new()),
    );

    let error = verifier
        .verify_at(&raw(NOW - 301, "old"), NOW)
        .await
        .unwrap_err();
    assert_eq!(error.kind(), RejectionKind::Expired);

    assert!(verifier.verify_at(&raw(NOW - 299, "recent"), NOW).await.is_ok());
    assert!(verifier.verify_at(&raw(NOW - 300, "edge"), NOW).await.is_ok());
}

#[tokio::test]
async fn test_rejected_request_does_not_burn_nonce() {
    let store = Arc::new(MemoryNonceStore::new());
    let verifier = CredentialVerifier::new(config(CacheFailurePolicy::FailOpen), store.clone());

    let InboundCredentials::Raw(mut params) = raw(NOW, "n1") else {
        unreachable!()
    };
    params.signature = "0".repeat(64);
    let error = verifier
        .verify_at(&InboundCredentials::Raw(params), NOW)
        .await
        .unwrap_err();
    assert_eq!(error.kind(), RejectionKind::BadSignature);
    assert!(store.is_empty().await);

    assert!(verifier.verify_at(&raw(NOW, "n1"), NOW).await.is_ok());
}

#[tokio::test]
async fn test_cache_outage_fails_open_by_default() {
    let verifier =
        CredentialVerifier::new(config(CacheFailurePolicy::FailOpen), Arc::new(DownStore));

    assert!(verifier.verify_at(&raw(NOW, "n1"), NOW).await.is_ok());
    assert!(verifier.verify_at(&raw(NOW, "n1"), NOW).await.is_ok());
    assert_eq!(verifier.cache_failures(), 2);
}

#[tokio::test]
async fn test_cache_outage_fails_closed_when_configured() {
    let verifier =
        CredentialVerifier::new(config(CacheFailurePolicy::FailClosed), Arc::new(DownStore));

    let error = verifier.verify_at(&raw(NOW, "n1"), NOW).await.unwrap_err();
    assert_eq!(error.kind(), RejectionKind::CacheUnavailable);
}

#[tokio::test]
async fn test_concurrent_replays_have_one_winner() {
    let verifier = Arc::new(CredentialVerifier::new(
        config(CacheFailurePolicy::FailOpen),
        Arc::new(MemoryNonceStore::new()),
    ));

    let handles: Vec<_> = (0..20)
        .map(|_| {
            let verifier = Arc::clone(&verifier);
            tokio::spawn(async move { verifier.verify_at(&raw(NOW, "shared"), NOW).await })
        })
        .collect();

    let mut accepted = 0;
    for handle in handles {
        if handle.await.unwrap().is_ok() {
            accepted += 1;
        }
    }
    assert_eq!(accepted, 1);
}

// === Session binding ===

#[tokio::test]
async fn test_verified_claims_bind_to_session() {
    let config = config(CacheFailurePolicy::FailOpen);
    let credential = config.credential(Scope::Storefront).unwrap().clone();
    let verifier = CredentialVerifier::new(config.clone(), Arc::new(MemoryNonceStore::new()));
    let binder = SessionBinder::new(&config, &credential, Arc::new(MemorySessionStore::new()));

    let claims = verifier.verify_at(&raw(NOW, "n1"), NOW).await.unwrap();
    binder.bind_at("session-1", claims.clone(), NOW).await.unwrap();

    assert_eq!(binder.claims_at("session-1", NOW).await, Some(claims));
    assert!(binder.is_bound_at("session-1", NOW + 3600).await);
    assert!(!binder.is_bound_at("session-1", NOW + 3601).await);
}
