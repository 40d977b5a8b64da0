//! Construction of the authorization URL.

use crate::auth::AuthScopes;
use crate::config::BaseUrl;

/// Path of the authorization endpoint.
pub const AUTHORIZE_PATH: &str = "/oauth/authorize";

/// Builds `{base}/oauth/authorize?...` for the authorization code grant.
///
/// Pure URL construction: no network call, no state change. Every value is
/// percent-encoded; scopes are space-separated.
///
/// # Example
///
/// ```rust
/// use flicksell_auth::auth::oauth::authorization_url;
/// use flicksell_auth::BaseUrl;
///
/// let url = authorization_url(
///     &BaseUrl::new("https://api.flicksell.com").unwrap(),
///     "client-1",
///     "https://app.example.com/callback",
///     &"orders:read".parse().unwrap(),
///     "xyz",
/// );
/// assert_eq!(
///     url,
///     "https://api.flicksell.com/oauth/authorize?client_id=client-1\
///      &redirect_uri=https%3A%2F%2Fapp.example.com%2Fcallback\
///      &response_type=code&scope=orders%3Aread&state=xyz"
/// );
/// ```
#[must_use]
pub fn authorization_url(
    base: &BaseUrl,
    client_id: &str,
    redirect_uri: &str,
    scopes: &AuthScopes,
    state: &str,
) -> String {
    let scope = scopes.to_string();
    let params = [
        ("client_id", client_id),
        ("redirect_uri", redirect_uri),
        ("response_type", "code"),
        ("scope", scope.as_str()),
        ("state", state),
    ];
    let query = params
        .iter()
        .map(|(name, value)| format!("{name}={}", urlencoding::encode(value)))
        .collect::<Vec<_>>()
        .join("&");

    format!("{}?{query}", base.join(AUTHORIZE_PATH))
}
