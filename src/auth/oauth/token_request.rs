//! Calls to the platform token endpoint.
//!
//! All grants POST a form body to `{base}/oauth/token`:
//!
//! | grant_type | extra fields |
//! |---|---|
//! | `authorization_code` | `client_secret`, `code`, `redirect_uri` |
//! | `refresh_token` | `client_secret`, `refresh_token` |
//! | `client_credentials` | signed legacy parameters instead of the secret |
//!
//! Every grant sends `client_id`. Responses are
//! `{ access_token, refresh_token?, expires_in?, token_type? }`.

use crate::auth::token_vault::Token;
use crate::auth::Credential;
use crate::clients::{HttpClient, HttpError};
use crate::config::BaseUrl;
use crate::auth::oauth::OAuthError;
use chrono::{DateTime, Duration, Utc};
use serde::Deserialize;

/// Path of the token endpoint.
pub const TOKEN_PATH: &str = "/oauth/token";

/// Lifetime assumed when the platform omits `expires_in`.
pub const DEFAULT_EXPIRES_IN: u64 = 3600;

/// A successful token endpoint response.
#[derive(Clone, Deserialize)]
pub struct TokenResponse {
    /// The access token.
    pub access_token: String,
    /// The refresh token, if issued.
    #[serde(default)]
    pub refresh_token: Option<String>,
    /// Lifetime in seconds.
    #[serde(default)]
    pub expires_in: Option<u64>,
    /// Token type, usually `Bearer`.
    #[serde(default)]
    pub token_type: Option<String>,
}

impl TokenResponse {
    /// Converts the response into a [`Token`] issued at `now`.
    #[must_use]
    pub fn into_token(self, now: DateTime<Utc>) -> Token {
        let expires_in = self.expires_in.unwrap_or(DEFAULT_EXPIRES_IN);
        let expires_in = i64::try_from(expires_in).unwrap_or(i64::MAX / 1000);
        Token {
            access_token: self.access_token,
            refresh_token: self.refresh_token,
            expires_at: now + Duration::seconds(expires_in),
            token_type: self.token_type.unwrap_or_else(|| "Bearer".to_string()),
        }
    }
}

#[derive(Clone, Copy)]
enum Grant {
    Exchange,
    Refresh,
}

impl Grant {
    fn failure(self, status: u16, message: String) -> OAuthError {
        match self {
            Self::Exchange => OAuthError::TokenExchangeFailed { status, message },
            Self::Refresh => OAuthError::TokenRefreshFailed { status, message },
        }
    }
}

async fn post_token_request(
    http: &HttpClient,
    base: &BaseUrl,
    form: &[(&str, &str)],
    grant: Grant,
) -> Result<Token, OAuthError> {
    let response = http
        .post_form(&base.join(TOKEN_PATH), form)
        .await
        .map_err(|error| match error {
            HttpError::Response(e) => grant.failure(e.code, e.message),
            other => grant.failure(0, other.to_string()),
        })?;

    let parsed: TokenResponse = response.json().map_err(|e| {
        grant.failure(
            response.code,
            format!("Failed to parse token response: {e}"),
        )
    })?;

    Ok(parsed.into_token(Utc::now()))
}

/// Exchanges an authorization code for a token.
///
/// # Errors
///
/// Returns [`OAuthError::TokenExchangeFailed`] carrying the platform's error body.
pub async fn exchange_code(
    http: &HttpClient,
    base: &BaseUrl,
    credential: &Credential,
    code: &str,
    redirect_uri: &str,
) -> Result<Token, OAuthError> {
    let form = [
        ("grant_type", "authorization_code"),
        ("client_id", credential.key().as_ref()),
        ("client_secret", credential.secret().as_ref()),
        ("code", code),
        ("redirect_uri", redirect_uri),
    ];
    post_token_request(http, base, &form, Grant::Exchange).await
}

/// Obtains a new access token with a refresh token.
///
/// If the platform does not rotate the refresh token, the one sent is kept.
///
/// # Errors
///
/// Returns [`OAuthError::TokenRefreshFailed`] carrying the platform's error body.
pub async fn refresh_token(
    http: &HttpClient,
    base: &BaseUrl,
    credential: &Credential,
    refresh_token: &str,
) -> Result<Token, OAuthError> {
    let form = [
        ("grant_type", "refresh_token"),
        ("client_id", credential.key().as_ref()),
        ("client_secret", credential.secret().as_ref()),
        ("refresh_token", refresh_token),
    ];
    let mut token = post_token_request(http, base, &form, Grant::Refresh).await?;
    if token.refresh_token.is_none() {
        token.refresh_token = Some(refresh_token.to_string());
    }
    Ok(token)
}

/// Obtains a token by presenting a signed legacy parameter set.
///
/// # Errors
///
/// Returns [`OAuthError::TokenExchangeFailed`] carrying the platform's error body.
pub async fn request_with_signed_params(
    http: &HttpClient,
    base: &BaseUrl,
    credential: &Credential,
    signed_params: &[(String, String)],
) -> Result<Token, OAuthError> {
    let mut form: Vec<(&str, &str)> = vec![
        ("grant_type", "client_credentials"),
        ("client_id", credential.key().as_ref()),
    ];
    form.extend(
        signed_params
            .iter()
            .map(|(name, value)| (name.as_str(), value.as_str())),
    );
    post_token_request(http, base, &form, Grant::Exchange).await
}
