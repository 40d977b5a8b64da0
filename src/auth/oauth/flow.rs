//! The OAuth token lifecycle.
//!
//! [`OAuthFlow`] drives one state machine per [`Scope`]:
//!
//! ```text
//! Unauthenticated -> Authorizing -> Authenticated -> Refreshing -> Authenticated
//!                                                              \-> Unauthenticated
//! ```
//!
//! Tokens live in the shared [`TokenVault`] under `(app_handle, scope)`.
//! Refreshes are single-flight per key: concurrent callers that find the same
//! stale token wait for the one refresh in progress and then read its result.

use crate::auth::oauth::authorize::authorization_url;
use crate::auth::oauth::token_request;
use crate::auth::oauth::{OAuthError, StateParam};
use crate::auth::token_vault::{Token, TokenVault, VaultKey};
use crate::auth::{AuthScopes, Credential};
use crate::clients::{signer, HttpClient};
use crate::config::{AuthConfig, Scope};
use chrono::Utc;
use std::collections::HashMap;
use std::sync::{Arc, Mutex, PoisonError};

/// Lifecycle state of one scope.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub enum FlowState {
    /// No usable token.
    #[default]
    Unauthenticated,
    /// The user was sent to the authorization URL.
    Authorizing,
    /// A token is stored.
    Authenticated,
    /// A refresh call is in flight.
    Refreshing,
}

/// An authorization URL together with the state it embeds.
///
/// The caller keeps `state` (for instance in its session) and hands it back
/// to [`OAuthFlow::complete_authorization`].
#[derive(Clone, Debug)]
pub struct AuthorizationRequest {
    /// URL to redirect the user to.
    pub url: String,
    /// The CSRF state embedded in `url`.
    pub state: StateParam,
}

/// OAuth client for the platform's token endpoint.
///
/// # Example
///
/// ```rust,no_run
/// use flicksell_auth::auth::oauth::OAuthFlow;
/// use flicksell_auth::auth::TokenVault;
/// use flicksell_auth::{ApiKey, ApiSecretKey, AuthConfig, Credential, Scope};
/// use std::sync::Arc;
///
/// # #[tokio::main]
/// # async fn main() -> Result<(), Box<dyn std::error::Error>> {
/// let config = AuthConfig::builder()
///     .credential(Credential::new(
///         Scope::Admin,
///         ApiKey::new("client-id")?,
///         ApiSecretKey::new("client-secret")?,
///     ))
///     .build()?;
///
/// let flow = OAuthFlow::new(config, Arc::new(TokenVault::new()))?;
/// let request = flow.begin_authorization(
///     Scope::Admin,
///     "https://app.example.com/callback",
///     &"orders:read".parse()?,
/// )?;
/// println!("Redirect to {}", request.url);
///
/// // ...later, in the callback handler
/// flow.complete_authorization(
///     Scope::Admin,
///     "code-from-callback",
///     "state-from-callback",
///     &request.state,
///     "https://app.example.com/callback",
/// )
/// .await?;
///
/// let access_token = flow.get_valid_access_token(Scope::Admin).await?;
/// # let _ = access_token;
/// # Ok(())
/// # }
/// ```
#[derive(Debug)]
pub struct OAuthFlow {
    config: AuthConfig,
    vault: Arc<TokenVault>,
    http: HttpClient,
    states: Mutex<HashMap<Scope, FlowState>>,
}

impl OAuthFlow {
    /// Creates a flow that stores tokens in `vault`.
    ///
    /// # Errors
    ///
    /// Returns [`OAuthError::HttpError`] if the HTTP client cannot be built.
    pub fn new(config: AuthConfig, vault: Arc<TokenVault>) -> Result<Self, OAuthError> {
        let http = HttpClient::new(&config)?;
        Ok(Self::with_http_client(config, vault, http))
    }

    /// Creates a flow with an existing HTTP client.
    #[must_use]
    pub fn with_http_client(config: AuthConfig, vault: Arc<TokenVault>, http: HttpClient) -> Self {
        Self {
            config,
            vault,
            http,
            states: Mutex::new(HashMap::new()),
        }
    }

    /// Returns the configuration.
    #[must_use]
    pub const fn config(&self) -> &AuthConfig {
        &self.config
    }

    /// Returns the vault tokens are stored in.
    #[must_use]
    pub const fn vault(&self) -> &Arc<TokenVault> {
        &self.vault
    }

    /// Returns the current lifecycle state of `scope`.
    #[must_use]
    pub fn state(&self, scope: Scope) -> FlowState {
        self.states
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .get(&scope)
            .copied()
            .unwrap_or_default()
    }

    fn set_state(&self, scope: Scope, state: FlowState) {
        self.states
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(scope, state);
    }

    fn credential(&self, scope: Scope) -> Result<&Credential, OAuthError> {
        self.config
            .credential(scope)
            .ok_or(OAuthError::MissingCredential { scope })
    }

    fn vault_key(&self, scope: Scope) -> Result<VaultKey, OAuthError> {
        Ok((self.credential(scope)?.app_handle().clone(), scope))
    }

    /// Stores a token obtained elsewhere and marks `scope` authenticated.
    ///
    /// # Errors
    ///
    /// Returns [`OAuthError::MissingCredential`] if `scope` has no credential.
    pub fn store_token(&self, scope: Scope, token: Token) -> Result<(), OAuthError> {
        let key = self.vault_key(scope)?;
        self.vault.store(key, token);
        self.set_state(scope, FlowState::Authenticated);
        Ok(())
    }

    /// Builds the authorization URL. No network call, no state change.
    ///
    /// # Errors
    ///
    /// Returns [`OAuthError::MissingCredential`] if `scope` has no credential.
    pub fn build_authorization_url(
        &self,
        scope: Scope,
        redirect_uri: &str,
        scopes: &AuthScopes,
        state: &str,
    ) -> Result<String, OAuthError> {
        let credential = self.credential(scope)?;
        Ok(authorization_url(
            self.config.base_url_for(scope),
            credential.key().as_ref(),
            redirect_uri,
            scopes,
            state,
        ))
    }

    /// Generates a fresh state, builds the authorization URL and moves
    /// `scope` to [`FlowState::Authorizing`].
    ///
    /// # Errors
    ///
    /// Returns [`OAuthError::MissingCredential`] if `scope` has no credential.
    pub fn begin_authorization(
        &self,
        scope: Scope,
        redirect_uri: &str,
        scopes: &AuthScopes,
    ) -> Result<AuthorizationRequest, OAuthError> {
        let state = StateParam::new();
        let url = self.build_authorization_url(scope, redirect_uri, scopes, state.as_ref())?;
        self.set_state(scope, FlowState::Authorizing);
        Ok(AuthorizationRequest { url, state })
    }

    /// Exchanges an authorization code and stores the resulting token.
    ///
    /// # Errors
    ///
    /// Returns [`OAuthError::TokenExchangeFailed`] with the platform's error
    /// body; `scope` is then [`FlowState::Unauthenticated`].
    pub async fn exchange_code(
        &self,
        scope: Scope,
        code: &str,
        redirect_uri: &str,
    ) -> Result<Token, OAuthError> {
        let credential = self.credential(scope)?;
        let base = self.config.base_url_for(scope);

        match token_request::exchange_code(&self.http, base, credential, code, redirect_uri).await
        {
            Ok(token) => {
                self.vault
                    .store((credential.app_handle().clone(), scope), token.clone());
                self.set_state(scope, FlowState::Authenticated);
                tracing::info!(%scope, app = %credential.app_handle(), "Authorization code exchanged");
                Ok(token)
            }
            Err(error) => {
                self.set_state(scope, FlowState::Unauthenticated);
                tracing::warn!(%scope, error = %error, "Authorization code exchange failed");
                Err(error)
            }
        }
    }

    /// Checks the callback state in constant time, then exchanges the code.
    ///
    /// # Errors
    ///
    /// Returns [`OAuthError::StateMismatch`] if `received_state` differs from
    /// `expected_state`, [`OAuthError::InvalidCallback`] for an empty code,
    /// otherwise as [`OAuthFlow::exchange_code`].
    pub async fn complete_authorization(
        &self,
        scope: Scope,
        code: &str,
        received_state: &str,
        expected_state: &StateParam,
        redirect_uri: &str,
    ) -> Result<Token, OAuthError> {
        if !expected_state.matches(received_state) {
            self.set_state(scope, FlowState::Unauthenticated);
            return Err(OAuthError::StateMismatch {
                expected: expected_state.to_string(),
                received: received_state.to_string(),
            });
        }
        if code.is_empty() {
            self.set_state(scope, FlowState::Unauthenticated);
            return Err(OAuthError::InvalidCallback {
                reason: "missing authorization code".to_string(),
            });
        }
        self.exchange_code(scope, code, redirect_uri).await
    }

    /// Obtains a token by presenting a freshly signed legacy parameter set.
    ///
    /// # Errors
    ///
    /// Returns [`OAuthError::MissingPrincipal`] if no principal is configured,
    /// or [`OAuthError::TokenExchangeFailed`] with the platform's error body.
    pub async fn authenticate_legacy(&self, scope: Scope) -> Result<Token, OAuthError> {
        let credential = self.credential(scope)?;
        let principal = self.config.principal().ok_or(OAuthError::MissingPrincipal)?;
        let context = signer::fresh_context(
            self.config.nonce_policy(),
            principal,
            scope,
            Utc::now().timestamp(),
        );
        let params = signer::legacy_params(&context, credential);
        let base = self.config.base_url_for(scope);

        match token_request::request_with_signed_params(&self.http, base, credential, &params).await
        {
            Ok(token) => {
                self.vault
                    .store((credential.app_handle().clone(), scope), token.clone());
                self.set_state(scope, FlowState::Authenticated);
                tracing::info!(%scope, app = %credential.app_handle(), "Legacy authentication succeeded");
                Ok(token)
            }
            Err(error) => {
                self.set_state(scope, FlowState::Unauthenticated);
                tracing::warn!(%scope, error = %error, "Legacy authentication failed");
                Err(error)
            }
        }
    }

    /// Returns a usable access token for `scope`, refreshing it at most once.
    ///
    /// A token is usable while it expires more than 60 seconds from now.
    /// Otherwise exactly one caller per `(app_handle, scope)` performs the
    /// refresh; the others wait for it and return its result. A failed
    /// refresh discards the token and leaves `scope` unauthenticated.
    ///
    /// # Errors
    ///
    /// - [`OAuthError::NotAuthenticated`] if no token is stored
    /// - [`OAuthError::TokenExpiredNoRefresh`] if the stale token has no refresh token
    /// - [`OAuthError::TokenRefreshFailed`] if the refresh call fails
    pub async fn get_valid_access_token(&self, scope: Scope) -> Result<String, OAuthError> {
        let key = self.vault_key(scope)?;

        match self.vault.get(&key) {
            Some(token) if token.is_fresh() => return Ok(token.access_token),
            Some(_) => {}
            None => return Err(OAuthError::NotAuthenticated { scope }),
        }

        let guard = self.vault.guard(&key);
        let _held = guard.lock().await;

        // Another caller may have refreshed (or dropped) the token while we waited.
        let Some(token) = self.vault.get(&key) else {
            return Err(OAuthError::NotAuthenticated { scope });
        };
        if token.is_fresh() {
            return Ok(token.access_token);
        }
        let Some(refresh_token) = token.refresh_token else {
            self.vault.remove(&key);
            self.set_state(scope, FlowState::Unauthenticated);
            return Err(OAuthError::TokenExpiredNoRefresh);
        };

        let credential = self.credential(scope)?;
        let base = self.config.base_url_for(scope);
        let mut in_flight = RefreshInFlight::start(self, scope);

        match token_request::refresh_token(&self.http, base, credential, &refresh_token).await {
            Ok(refreshed) => {
                let access_token = refreshed.access_token.clone();
                self.vault.store(key, refreshed);
                in_flight.finish(FlowState::Authenticated);
                tracing::info!(%scope, app = %credential.app_handle(), "Access token refreshed");
                Ok(access_token)
            }
            Err(error) => {
                self.vault.remove(&key);
                in_flight.finish(FlowState::Unauthenticated);
                tracing::warn!(%scope, error = %error, "Access token refresh failed");
                Err(error)
            }
        }
    }

    /// Discards the token for `scope`. Returns `true` if one was stored.
    ///
    /// # Errors
    ///
    /// Returns [`OAuthError::MissingCredential`] if `scope` has no credential.
    pub fn logout(&self, scope: Scope) -> Result<bool, OAuthError> {
        let key = self.vault_key(scope)?;
        let removed = self.vault.remove(&key).is_some();
        self.set_state(scope, FlowState::Unauthenticated);
        Ok(removed)
    }
}

/// Holds a scope in [`FlowState::Refreshing`] and sets its final state on drop.
///
/// A caller that abandons the refresh future leaves the stale token in the
/// vault, so the scope falls back to [`FlowState::Authenticated`].
struct RefreshInFlight<'a> {
    flow: &'a OAuthFlow,
    scope: Scope,
    outcome: FlowState,
}

impl<'a> RefreshInFlight<'a> {
    fn start(flow: &'a OAuthFlow, scope: Scope) -> Self {
        flow.set_state(scope, FlowState::Refreshing);
        Self {
            flow,
            scope,
            outcome: FlowState::Authenticated,
        }
    }

    fn finish(&mut self, outcome: FlowState) {
        self.outcome = outcome;
    }
}

impl Drop for RefreshInFlight<'_> {
    fn drop(&mut self) {
        self.flow.set_state(self.scope, self.outcome);
    }
}

// Verify OAuthFlow is Send + Sync at compile time
const _: fn() = || {
    const fn assert_send_sync<T: Send + Sync>() {}
    assert_send_sync::<OAuthFlow>();
};
