//! Integration tests for outbound signing and the HTTP transport.
//!
//! Requests built by the signer are sent to a wiremock server, and legacy
//! requests are fed back through the verifier to check that both sides agree
//! on the wire format.

use chrono::{Duration, Utc};
use flicksell_auth::auth::nonce::MemoryNonceStore;
use flicksell_auth::auth::oauth::OAuthFlow;
use flicksell_auth::auth::{InboundCredentials, Token, TokenVault};
use flicksell_auth::clients::{HttpClient, HttpError, HttpMethod, OutboundSigner, SignerError};
use flicksell_auth::{
    ApiKey, ApiSecretKey, AuthConfig, AuthMode, BaseUrl, Credential, CredentialVerifier,
    NoncePolicy, Principal, Scope, TransportMode,
};
use std::collections::HashMap;
use std::sync::Arc;
use wiremock::matchers::{body_string_contains, header, header_exists, method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn builder(base_url: &str) -> flicksell_auth::AuthConfigBuilder {
    AuthConfig::builder()
        .credential(Credential::new(
            Scope::Storefront,
            ApiKey::new("sf-key").unwrap(),
            ApiSecretKey::new("sf-secret").unwrap(),
        ))
        .credential(Credential::new(
            Scope::Admin,
            ApiKey::new("admin-key").unwrap(),
            ApiSecretKey::new("admin-secret").unwrap(),
        ))
        .principal(Principal::new("store1").unwrap())
        .base_url(BaseUrl::new(base_url).unwrap())
        .timeout(std::time::Duration::from_secs(5))
}

fn form_to_params(body: &str) -> HashMap<String, String> {
    body.split('&')
        .filter_map(|pair| pair.split_once('='))
        .map(|(k, v)| {
            (
                urlencoding::decode(k).unwrap().into_owned(),
                urlencoding::decode(v).unwrap().into_owned(),
            )
        })
        .collect()
}

// === Legacy signing ===

#[tokio::test]
async fn test_signed_fields_are_accepted_by_the_verifier() {
    let config = builder("https://api.flicksell.com").build().unwrap();
    let signer = OutboundSigner::new(config.clone());
    let verifier = CredentialVerifier::new(config, Arc::new(MemoryNonceStore::new()));

    for scope in [Scope::Storefront, Scope::Admin] {
        let request = signer
            .build_signed_request(scope, "/orders", HttpMethod::Post, &[], &[("status", "open")])
            .await
            .unwrap();

        let params = form_to_params(request.body.as_deref().unwrap());
        let input = InboundCredentials::from_params(&params).unwrap();
        let claims = verifier.verify(&input).await.unwrap();

        assert_eq!(claims.issuer, "store1");
        assert_eq!(claims.scope, scope);
    }
}

#[tokio::test]
async fn test_signed_token_is_accepted_by_the_verifier() {
    let config = builder("https://api.flicksell.com")
        .transport_mode(TransportMode::SignedToken)
        .build()
        .unwrap();
    let signer = OutboundSigner::new(config.clone());
    let verifier = CredentialVerifier::new(config, Arc::new(MemoryNonceStore::new()));

    let request = signer
        .build_signed_request(Scope::Admin, "/orders", HttpMethod::Post, &[], &[])
        .await
        .unwrap();
    let params = form_to_params(request.body.as_deref().unwrap());
    let input = InboundCredentials::from_params(&params).unwrap();
    assert!(matches!(input, InboundCredentials::Token(_)));

    let claims = verifier.verify(&input).await.unwrap();
    assert_eq!(claims.scope, Scope::Admin);

    // Replaying the same request is rejected.
    let replay = verifier.verify(&input).await.unwrap_err();
    assert_eq!(replay.kind().as_str(), "replay");
}

#[tokio::test]
async fn test_timestamp_nonce_policy_sends_timestamp_twice() {
    let config = builder("https://api.flicksell.com")
        .nonce_policy(NoncePolicy::TimestampAsNonce)
        .build()
        .unwrap();
    let signer = OutboundSigner::new(config);

    let request = signer
        .build_signed_request(Scope::Storefront, "/cart", HttpMethod::Post, &[], &[])
        .await
        .unwrap();
    let params = form_to_params(request.body.as_deref().unwrap());
    assert_eq!(params["nonce"], params["timestamp"]);
}

// === Transport ===

#[tokio::test]
async fn test_send_posts_signed_form() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/orders"))
        .and(header("content-type", "application/x-www-form-urlencoded"))
        .and(body_string_contains("apikey=admin-key"))
        .and(body_string_contains("sitename=store1"))
        .respond_with(
            ResponseTemplate::new(200)
                .insert_header("x-request-id", "req-1")
                .set_body_string(r#"{"ok":true}"#),
        )
        .expect(1)
        .mount(&server)
        .await;

    let config = builder(&server.uri()).build().unwrap();
    let client = HttpClient::new(&config).unwrap();
    let signer = OutboundSigner::new(config);

    let request = signer
        .build_signed_request(Scope::Admin, "/orders", HttpMethod::Post, &[], &[("id", "7")])
        .await
        .unwrap();
    let response = client.send(request).await.unwrap();

    assert_eq!(response.code, 200);
    assert_eq!(response.request_id(), Some("req-1"));
    let body: serde_json::Value = response.json().unwrap();
    assert_eq!(body["ok"], true);
}

#[tokio::test]
async fn test_send_header_transport_with_query() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/products"))
        .and(query_param("page", "2"))
        .and(header_exists("x-platform-auth"))
        .respond_with(ResponseTemplate::new(200).set_body_string("[]"))
        .expect(1)
        .mount(&server)
        .await;

    let config = builder(&server.uri())
        .transport_mode(TransportMode::Header)
        .build()
        .unwrap();
    let client = HttpClient::new(&config).unwrap();
    let signer = OutboundSigner::new(config);

    let request = signer
        .build_signed_request(Scope::Storefront, "/products", HttpMethod::Get, &[("page", "2")], &[])
        .await
        .unwrap();
    assert!(request.body.is_none());
    client.send(request).await.unwrap();
}

#[tokio::test]
async fn test_error_response_keeps_raw_body() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/orders"))
        .respond_with(
            ResponseTemplate::new(403)
                .insert_header("x-request-id", "req-403")
                .set_body_string(r#"{"error":"forbidden"}"#),
        )
        .mount(&server)
        .await;

    let config = builder(&server.uri()).build().unwrap();
    let client = HttpClient::new(&config).unwrap();
    let request = OutboundSigner::new(config)
        .build_signed_request(Scope::Admin, "/orders", HttpMethod::Post, &[], &[])
        .await
        .unwrap();

    match client.send(request).await {
        Err(HttpError::Response(error)) => {
            assert_eq!(error.code, 403);
            assert_eq!(error.message, r#"{"error":"forbidden"}"#);
            assert_eq!(error.error_reference.as_deref(), Some("req-403"));
        }
        other => panic!("Expected Response error, got: {other:?}"),
    }
}

#[tokio::test]
async fn test_timeout_is_reported() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(200).set_delay(std::time::Duration::from_secs(3)))
        .mount(&server)
        .await;

    let config = builder(&server.uri())
        .timeout(std::time::Duration::from_millis(300))
        .build()
        .unwrap();
    let client = HttpClient::new(&config).unwrap();
    let request = OutboundSigner::new(config)
        .build_signed_request(Scope::Admin, "/slow", HttpMethod::Post, &[], &[])
        .await
        .unwrap();

    let result = client.send(request).await;
    assert!(matches!(result, Err(HttpError::Timeout { .. })));
}

// === OAuth mode ===

#[tokio::test]
async fn test_oauth_mode_sends_bearer_token() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/orders"))
        .and(header("authorization", "Bearer access-1"))
        .respond_with(ResponseTemplate::new(200).set_body_string("[]"))
        .expect(1)
        .mount(&server)
        .await;

    let config = builder(&server.uri())
        .auth_mode(AuthMode::OAuth)
        .build()
        .unwrap();
    let flow = Arc::new(OAuthFlow::new(config.clone(), Arc::new(TokenVault::new())).unwrap());
    flow.store_token(
        Scope::Admin,
        Token {
            access_token: "access-1".to_string(),
            refresh_token: None,
            expires_at: Utc::now() + Duration::hours(1),
            token_type: "Bearer".to_string(),
        },
    )
    .unwrap();

    let client = HttpClient::new(&config).unwrap();
    let signer = OutboundSigner::new(config).with_oauth(flow);
    let request = signer
        .build_signed_request(Scope::Admin, "/orders", HttpMethod::Get, &[], &[])
        .await
        .unwrap();

    assert!(!request.url.contains("signature"));
    client.send(request).await.unwrap();
}

#[tokio::test]
async fn test_oauth_mode_without_token_fails() {
    let config = builder("https://api.flicksell.com")
        .auth_mode(AuthMode::OAuth)
        .build()
        .unwrap();
    let flow = Arc::new(OAuthFlow::new(config.clone(), Arc::new(TokenVault::new())).unwrap());
    let signer = OutboundSigner::new(config).with_oauth(flow);

    let result = signer
        .build_signed_request(Scope::Storefront, "/orders", HttpMethod::Get, &[], &[])
        .await;
    assert!(matches!(result, Err(SignerError::OAuth(_))));
}
