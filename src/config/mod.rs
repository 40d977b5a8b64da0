//! Configuration types for the Flicksell authentication SDK.
//!
//! # Overview
//!
//! - [`AuthConfig`]: The immutable configuration shared by every component
//! - [`AuthConfigBuilder`]: A builder for constructing [`AuthConfig`] instances
//! - [`ConfigOptions`]: A deserializable view of the recognized option names
//! - [`ApiKey`], [`ApiSecretKey`], [`AppHandle`], [`Principal`], [`BaseUrl`]: validated newtypes
//! - [`Scope`] and the policy enums selecting nonce, transport and auth behavior
//!
//! # Example
//!
//! ```rust
//! use flicksell_auth::{ApiKey, ApiSecretKey, AuthConfig, Credential, Scope};
//!
//! let config = AuthConfig::builder()
//!     .credential(Credential::new(
//!         Scope::Storefront,
//!         ApiKey::new("sf-key").unwrap(),
//!         ApiSecretKey::new("sf-secret").unwrap(),
//!     ))
//!     .build()
//!     .unwrap();
//!
//! assert_eq!(config.max_timestamp_age().as_secs(), 300);
//! ```

mod newtypes;
mod policy;

pub use newtypes::{ApiKey, ApiSecretKey, AppHandle, BaseUrl, Principal};
pub use policy::{AuthMode, BodyEncoding, CacheFailurePolicy, NoncePolicy, Scope, TransportMode};

use crate::auth::Credential;
use crate::error::ConfigError;
use serde::Deserialize;
use std::time::Duration;

/// Default accepted age of an inbound timestamp.
pub const DEFAULT_MAX_TIMESTAMP_AGE: Duration = Duration::from_secs(300);

/// Hard ceiling for the accepted timestamp age.
pub const MAX_TIMESTAMP_AGE_CEILING: Duration = Duration::from_secs(3600);

/// Default timeout for token endpoint and nonce store calls.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);

/// Base URL used when no override is configured.
pub const DEFAULT_BASE_URL: &str = "https://api.flicksell.com";

/// Connection parameters for a shared key-value cache backing the nonce store.
#[derive(Clone, Debug, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CacheConfig {
    /// Connection URL, e.g. `redis://localhost:6379/0`.
    pub url: String,
    /// Prefix applied to every key written by this crate.
    #[serde(default = "CacheConfig::default_key_prefix")]
    pub key_prefix: String,
}

impl CacheConfig {
    /// Creates cache parameters with the default key prefix.
    #[must_use]
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            key_prefix: Self::default_key_prefix(),
        }
    }

    fn default_key_prefix() -> String {
        "flicksell_nonce".to_string()
    }
}

/// Configuration for the Flicksell authentication SDK.
///
/// # Thread Safety
///
/// `AuthConfig` is `Clone`, `Send`, and `Sync`, making it safe to share
/// across threads and async tasks.
#[derive(Clone, Debug)]
pub struct AuthConfig {
    storefront: Option<Credential>,
    admin: Option<Credential>,
    principal: Option<Principal>,
    max_timestamp_age: Duration,
    timeout: Duration,
    ssl_verify: bool,
    session_enabled: bool,
    base_url: BaseUrl,
    storefront_base_url: Option<BaseUrl>,
    admin_base_url: Option<BaseUrl>,
    nonce_policy: NoncePolicy,
    transport_mode: TransportMode,
    body_encoding: BodyEncoding,
    auth_mode: AuthMode,
    cache: Option<CacheConfig>,
    cache_failure_policy: CacheFailurePolicy,
    user_agent_prefix: Option<String>,
}

impl AuthConfig {
    /// Creates a new builder for constructing an `AuthConfig`.
    #[must_use]
    pub fn builder() -> AuthConfigBuilder {
        AuthConfigBuilder::new()
    }

    /// Returns the credential configured for `scope`, if any.
    #[must_use]
    pub const fn credential(&self, scope: Scope) -> Option<&Credential> {
        match scope {
            Scope::Storefront => self.storefront.as_ref(),
            Scope::Admin => self.admin.as_ref(),
        }
    }

    /// Returns configured credentials in resolution order (admin first).
    pub fn credentials_by_priority(&self) -> impl Iterator<Item = &Credential> {
        Scope::BY_PRIORITY
            .into_iter()
            .filter_map(move |scope| self.credential(scope))
    }

    /// Returns the site identifier used when signing outbound requests.
    #[must_use]
    pub const fn principal(&self) -> Option<&Principal> {
        self.principal.as_ref()
    }

    /// Returns the maximum accepted distance between an inbound timestamp and now.
    #[must_use]
    pub const fn max_timestamp_age(&self) -> Duration {
        self.max_timestamp_age
    }

    /// Returns the TTL given to stored nonces: twice the accepted timestamp age plus one second.
    ///
    /// Timestamps are accepted on both sides of "now" with inclusive bounds, so
    /// a request first seen at `T` with timestamp `T + age` stays acceptable
    /// until `T + 2 * age`. The nonce must still be stored at that instant.
    #[must_use]
    pub fn nonce_ttl(&self) -> Duration {
        self.max_timestamp_age * 2 + Duration::from_secs(1)
    }

    /// Returns the freshness window of a bound session: `min(12 * max_age, 3600s)`.
    #[must_use]
    pub fn session_lifetime(&self) -> Duration {
        (self.max_timestamp_age * 12).min(MAX_TIMESTAMP_AGE_CEILING)
    }

    /// Returns the timeout applied to network and cache calls.
    #[must_use]
    pub const fn timeout(&self) -> Duration {
        self.timeout
    }

    /// Returns whether TLS certificates are verified.
    #[must_use]
    pub const fn ssl_verify(&self) -> bool {
        self.ssl_verify
    }

    /// Returns whether successful verifications are bound to a local session.
    #[must_use]
    pub const fn session_enabled(&self) -> bool {
        self.session_enabled
    }

    /// Returns the default base URL.
    #[must_use]
    pub const fn base_url(&self) -> &BaseUrl {
        &self.base_url
    }

    /// Returns the base URL for `scope`, honoring per-scope overrides.
    #[must_use]
    pub fn base_url_for(&self, scope: Scope) -> &BaseUrl {
        let override_url = match scope {
            Scope::Storefront => self.storefront_base_url.as_ref(),
            Scope::Admin => self.admin_base_url.as_ref(),
        };
        override_url.unwrap_or(&self.base_url)
    }

    /// Returns the outbound nonce policy.
    #[must_use]
    pub const fn nonce_policy(&self) -> NoncePolicy {
        self.nonce_policy
    }

    /// Returns where legacy signature parameters are attached.
    #[must_use]
    pub const fn transport_mode(&self) -> TransportMode {
        self.transport_mode
    }

    /// Returns the outbound body encoding.
    #[must_use]
    pub const fn body_encoding(&self) -> BodyEncoding {
        self.body_encoding
    }

    /// Returns how outbound requests are authenticated.
    #[must_use]
    pub const fn auth_mode(&self) -> AuthMode {
        self.auth_mode
    }

    /// Returns the shared cache parameters, if configured.
    #[must_use]
    pub const fn cache(&self) -> Option<&CacheConfig> {
        self.cache.as_ref()
    }

    /// Returns the behavior when the nonce store is unreachable.
    #[must_use]
    pub const fn cache_failure_policy(&self) -> CacheFailurePolicy {
        self.cache_failure_policy
    }

    /// Returns the user agent prefix, if configured.
    #[must_use]
    pub fn user_agent_prefix(&self) -> Option<&str> {
        self.user_agent_prefix.as_deref()
    }
}

// Verify AuthConfig is Send + Sync at compile time
const _: fn() = || {
    const fn assert_send_sync<T: Send + Sync>() {}
    assert_send_sync::<AuthConfig>();
};

/// The recognized configuration options, as found in a JSON or TOML settings file.
///
/// Every field is optional; present fields override builder defaults when
/// applied with [`AuthConfigBuilder::options`].
///
/// # Example
///
/// ```rust
/// use flicksell_auth::config::ConfigOptions;
///
/// let options: ConfigOptions = serde_json::from_str(r#"{
///     "maxTimestampAge": 120,
///     "noncePolicy": "timestamp-as-nonce",
///     "redisLikeCacheConfig": { "url": "redis://localhost:6379" }
/// }"#).unwrap();
///
/// assert_eq!(options.max_timestamp_age, Some(120));
/// ```
#[derive(Clone, Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ConfigOptions {
    /// Accepted timestamp age in seconds.
    pub max_timestamp_age: Option<u64>,
    /// Shared cache connection parameters.
    pub redis_like_cache_config: Option<CacheConfig>,
    /// Network timeout in seconds.
    pub timeout: Option<u64>,
    /// Whether TLS certificates are verified.
    pub ssl_verify: Option<bool>,
    /// Whether sessions are bound after verification.
    pub session_enabled: Option<bool>,
    /// Default base URL.
    pub base_url: Option<BaseUrl>,
    /// Storefront base URL override.
    pub storefront_base_url: Option<BaseUrl>,
    /// Admin base URL override.
    pub admin_base_url: Option<BaseUrl>,
    /// Outbound nonce policy.
    pub nonce_policy: Option<NoncePolicy>,
}

/// Builder for constructing [`AuthConfig`] instances.
///
/// At least one [`Credential`] is required. All other fields have defaults.
///
/// # Defaults
///
/// - `max_timestamp_age`: 300 seconds (ceiling 3600)
/// - `timeout`: 30 seconds
/// - `ssl_verify`: `true`
/// - `session_enabled`: `true`
/// - `base_url`: `https://api.flicksell.com`
/// - `nonce_policy`: [`NoncePolicy::Random`]
/// - `transport_mode`: [`TransportMode::Fields`]
/// - `body_encoding`: [`BodyEncoding::Form`]
/// - `auth_mode`: [`AuthMode::Legacy`]
/// - `cache_failure_policy`: [`CacheFailurePolicy::FailOpen`]
#[derive(Debug, Default)]
pub struct AuthConfigBuilder {
    credentials: Vec<Credential>,
    principal: Option<Principal>,
    max_timestamp_age: Option<Duration>,
    timeout: Option<Duration>,
    ssl_verify: Option<bool>,
    session_enabled: Option<bool>,
    base_url: Option<BaseUrl>,
    storefront_base_url: Option<BaseUrl>,
    admin_base_url: Option<BaseUrl>,
    nonce_policy: Option<NoncePolicy>,
    transport_mode: Option<TransportMode>,
    body_encoding: Option<BodyEncoding>,
    auth_mode: Option<AuthMode>,
    cache: Option<CacheConfig>,
    cache_failure_policy: Option<CacheFailurePolicy>,
    user_agent_prefix: Option<String>,
}

impl AuthConfigBuilder {
    /// Creates a new builder with default values.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a credential. At most one credential per scope is allowed.
    #[must_use]
    pub fn credential(mut self, credential: Credential) -> Self {
        self.credentials.push(credential);
        self
    }

    /// Sets the site identifier bound into outbound signatures.
    #[must_use]
    pub fn principal(mut self, principal: Principal) -> Self {
        self.principal = Some(principal);
        self
    }

    /// Sets the maximum accepted timestamp age.
    #[must_use]
    pub const fn max_timestamp_age(mut self, age: Duration) -> Self {
        self.max_timestamp_age = Some(age);
        self
    }

    /// Sets the network and cache timeout.
    #[must_use]
    pub const fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    /// Enables or disables TLS certificate verification.
    #[must_use]
    pub const fn ssl_verify(mut self, verify: bool) -> Self {
        self.ssl_verify = Some(verify);
        self
    }

    /// Enables or disables session binding.
    #[must_use]
    pub const fn session_enabled(mut self, enabled: bool) -> Self {
        self.session_enabled = Some(enabled);
        self
    }

    /// Sets the default base URL.
    #[must_use]
    pub fn base_url(mut self, url: BaseUrl) -> Self {
        self.base_url = Some(url);
        self
    }

    /// Overrides the base URL for the storefront scope.
    #[must_use]
    pub fn storefront_base_url(mut self, url: BaseUrl) -> Self {
        self.storefront_base_url = Some(url);
        self
    }

    /// Overrides the base URL for the admin scope.
    #[must_use]
    pub fn admin_base_url(mut self, url: BaseUrl) -> Self {
        self.admin_base_url = Some(url);
        self
    }

    /// Sets the outbound nonce policy.
    #[must_use]
    pub const fn nonce_policy(mut self, policy: NoncePolicy) -> Self {
        self.nonce_policy = Some(policy);
        self
    }

    /// Sets where legacy signature parameters are attached.
    #[must_use]
    pub const fn transport_mode(mut self, mode: TransportMode) -> Self {
        self.transport_mode = Some(mode);
        self
    }

    /// Sets the outbound body encoding.
    #[must_use]
    pub const fn body_encoding(mut self, encoding: BodyEncoding) -> Self {
        self.body_encoding = Some(encoding);
        self
    }

    /// Sets how outbound requests are authenticated.
    #[must_use]
    pub const fn auth_mode(mut self, mode: AuthMode) -> Self {
        self.auth_mode = Some(mode);
        self
    }

    /// Sets the shared cache connection parameters.
    #[must_use]
    pub fn cache(mut self, cache: CacheConfig) -> Self {
        self.cache = Some(cache);
        self
    }

    /// Sets the behavior when the nonce store is unreachable.
    #[must_use]
    pub const fn cache_failure_policy(mut self, policy: CacheFailurePolicy) -> Self {
        self.cache_failure_policy = Some(policy);
        self
    }

    /// Sets the user agent prefix for outbound HTTP requests.
    #[must_use]
    pub fn user_agent_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.user_agent_prefix = Some(prefix.into());
        self
    }

    /// Applies every option present in `options`.
    #[must_use]
    pub fn options(mut self, options: ConfigOptions) -> Self {
        if let Some(age) = options.max_timestamp_age {
            self.max_timestamp_age = Some(Duration::from_secs(age));
        }
        if let Some(cache) = options.redis_like_cache_config {
            self.cache = Some(cache);
        }
        if let Some(timeout) = options.timeout {
            self.timeout = Some(Duration::from_secs(timeout));
        }
        if options.ssl_verify.is_some() {
            self.ssl_verify = options.ssl_verify;
        }
        if options.session_enabled.is_some() {
            self.session_enabled = options.session_enabled;
        }
        if options.base_url.is_some() {
            self.base_url = options.base_url;
        }
        if options.storefront_base_url.is_some() {
            self.storefront_base_url = options.storefront_base_url;
        }
        if options.admin_base_url.is_some() {
            self.admin_base_url = options.admin_base_url;
        }
        if options.nonce_policy.is_some() {
            self.nonce_policy = options.nonce_policy;
        }
        self
    }

    /// Builds the [`AuthConfig`], validating required fields and limits.
    ///
    /// # Errors
    ///
    /// - [`ConfigError::MissingCredentialPair`] if no credential was added
    /// - [`ConfigError::DuplicateScope`] if two credentials share a scope
    /// - [`ConfigError::TimestampAgeTooLarge`] if the age exceeds 3600 seconds
    /// - [`ConfigError::ZeroDuration`] if the age or the timeout is zero
    pub fn build(self) -> Result<AuthConfig, ConfigError> {
        if self.credentials.is_empty() {
            return Err(ConfigError::MissingCredentialPair);
        }

        let mut storefront = None;
        let mut admin = None;
        for credential in self.credentials {
            let slot = match credential.scope() {
                Scope::Storefront => &mut storefront,
                Scope::Admin => &mut admin,
            };
            if slot.is_some() {
                return Err(ConfigError::DuplicateScope {
                    scope: credential.scope().as_str(),
                });
            }
            *slot = Some(credential);
        }

        let max_timestamp_age = self
            .max_timestamp_age
            .unwrap_or(DEFAULT_MAX_TIMESTAMP_AGE);
        if max_timestamp_age.is_zero() {
            return Err(ConfigError::ZeroDuration {
                field: "max_timestamp_age",
            });
        }
        if max_timestamp_age > MAX_TIMESTAMP_AGE_CEILING {
            return Err(ConfigError::TimestampAgeTooLarge {
                seconds: max_timestamp_age.as_secs(),
                ceiling: MAX_TIMESTAMP_AGE_CEILING.as_secs(),
            });
        }

        let timeout = self.timeout.unwrap_or(DEFAULT_TIMEOUT);
        if timeout.is_zero() {
            return Err(ConfigError::ZeroDuration { field: "timeout" });
        }

        let base_url = match self.base_url {
            Some(url) => url,
            None => BaseUrl::new(DEFAULT_BASE_URL)?,
        };

        Ok(AuthConfig {
            storefront,
            admin,
            principal: self.principal,
            max_timestamp_age,
            timeout,
            ssl_verify: self.ssl_verify.unwrap_or(true),
            session_enabled: self.session_enabled.unwrap_or(true),
            base_url,
            storefront_base_url: self.storefront_base_url,
            admin_base_url: self.admin_base_url,
            nonce_policy: self.nonce_policy.unwrap_or_default(),
            transport_mode: self.transport_mode.unwrap_or_default(),
            body_encoding: self.body_encoding.unwrap_or_default(),
            auth_mode: self.auth_mode.unwrap_or_default(),
            cache: self.cache,
            cache_failure_policy: self.cache_failure_policy.unwrap_or_default(),
            user_agent_prefix: self.user_agent_prefix,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn storefront() -> Credential {
        Credential::new(
            Scope::Storefront,
            ApiKey::new("sf-key").unwrap(),
            ApiSecretKey::new("sf-secret").unwrap(),
        )
    }

    fn admin() -> Credential {
        Credential::new(
            Scope::Admin,
            ApiKey::new("admin-key").unwrap(),
            ApiSecretKey::new("admin-secret").unwrap(),
        )
    }

    #[test]
    fn test_builder_requires_a_credential() {
        let result = AuthConfigBuilder::new().build();
        assert!(matches!(result, Err(ConfigError::MissingCredentialPair)));
    }

    #[test]
    fn test_builder_rejects_duplicate_scope() {
        let result = AuthConfig::builder()
            .credential(storefront())
            .credential(storefront())
            .build();
        assert!(matches!(
            result,
            Err(ConfigError::DuplicateScope {
                scope: "storefront"
            })
        ));
    }

    #[test]
    fn test_builder_provides_sensible_defaults() {
        let config = AuthConfig::builder().credential(admin()).build().unwrap();

        assert_eq!(config.max_timestamp_age(), Duration::from_secs(300));
        assert_eq!(config.timeout(), Duration::from_secs(30));
        assert!(config.ssl_verify());
        assert!(config.session_enabled());
        assert_eq!(config.base_url().as_ref(), DEFAULT_BASE_URL);
        assert_eq!(config.nonce_policy(), NoncePolicy::Random);
        assert_eq!(config.auth_mode(), AuthMode::Legacy);
        assert_eq!(config.cache_failure_policy(), CacheFailurePolicy::FailOpen);
        assert!(config.principal().is_none());
        assert!(config.cache().is_none());
    }

    #[test]
    fn test_max_timestamp_age_ceiling() {
        let at_ceiling = AuthConfig::builder()
            .credential(admin())
            .max_timestamp_age(Duration::from_secs(3600))
            .build();
        assert!(at_ceiling.is_ok());

        let above = AuthConfig::builder()
            .credential(admin())
            .max_timestamp_age(Duration::from_secs(3601))
            .build();
        assert!(matches!(
            above,
            Err(ConfigError::TimestampAgeTooLarge { seconds: 3601, .. })
        ));
    }

    #[test]
    fn test_zero_durations_are_rejected() {
        let zero_age = AuthConfig::builder()
            .credential(admin())
            .max_timestamp_age(Duration::ZERO)
            .build();
        assert!(matches!(
            zero_age,
            Err(ConfigError::ZeroDuration {
                field: "max_timestamp_age"
            })
        ));

        let zero_timeout = AuthConfig::builder()
            .credential(admin())
            .timeout(Duration::ZERO)
            .build();
        assert!(matches!(
            zero_timeout,
            Err(ConfigError::ZeroDuration { field: "timeout" })
        ));

        let options: ConfigOptions = serde_json::from_str(r#"{ "maxTimestampAge": 0 }"#).unwrap();
        let from_options = AuthConfig::builder()
            .credential(admin())
            .options(options)
            .build();
        assert!(matches!(from_options, Err(ConfigError::ZeroDuration { .. })));
    }

    #[test]
    fn test_credentials_by_priority_admin_first() {
        let config = AuthConfig::builder()
            .credential(storefront())
            .credential(admin())
            .build()
            .unwrap();

        let scopes: Vec<Scope> = config
            .credentials_by_priority()
            .map(Credential::scope)
            .collect();
        assert_eq!(scopes, vec![Scope::Admin, Scope::Storefront]);
    }

    #[test]
    fn test_base_url_for_uses_overrides() {
        let config = AuthConfig::builder()
            .credential(admin())
            .base_url(BaseUrl::new("https://base.example.com").unwrap())
            .admin_base_url(BaseUrl::new("https://admin.example.com").unwrap())
            .build()
            .unwrap();

        assert_eq!(
            config.base_url_for(Scope::Admin).as_ref(),
            "https://admin.example.com"
        );
        assert_eq!(
            config.base_url_for(Scope::Storefront).as_ref(),
            "https://base.example.com"
        );
    }

    #[test]
    fn test_derived_windows() {
        let config = AuthConfig::builder().credential(admin()).build().unwrap();
        assert_eq!(config.nonce_ttl(), Duration::from_secs(601));
        assert_eq!(config.session_lifetime(), Duration::from_secs(3600));

        let short = AuthConfig::builder()
            .credential(admin())
            .max_timestamp_age(Duration::from_secs(60))
            .build()
            .unwrap();
        assert_eq!(short.session_lifetime(), Duration::from_secs(720));
    }

    #[test]
    fn test_options_override_defaults() {
        let options: ConfigOptions = serde_json::from_str(
            r#"{
                "maxTimestampAge": 90,
                "timeout": 5,
                "sslVerify": false,
                "sessionEnabled": false,
                "storefrontBaseUrl": "https://shop.example.com/",
                "noncePolicy": "timestamp-as-nonce",
                "redisLikeCacheConfig": { "url": "redis://cache:6379", "keyPrefix": "app" }
            }"#,
        )
        .unwrap();

        let config = AuthConfig::builder()
            .credential(storefront())
            .options(options)
            .build()
            .unwrap();

        assert_eq!(config.max_timestamp_age(), Duration::from_secs(90));
        assert_eq!(config.timeout(), Duration::from_secs(5));
        assert!(!config.ssl_verify());
        assert!(!config.session_enabled());
        assert_eq!(
            config.base_url_for(Scope::Storefront).as_ref(),
            "https://shop.example.com"
        );
        assert_eq!(config.nonce_policy(), NoncePolicy::TimestampAsNonce);
        let cache = config.cache().unwrap();
        assert_eq!(cache.url, "redis://cache:6379");
        assert_eq!(cache.key_prefix, "app");
    }

    #[test]
    fn test_cache_config_default_prefix() {
        let cache: CacheConfig = serde_json::from_str(r#"{ "url": "redis://x" }"#).unwrap();
        assert_eq!(cache, CacheConfig::new("redis://x"));
    }

    #[test]
    fn test_config_is_send_sync() {
        fn assert_send_sync<T: Send + Sync>() {}
        assert_send_sync::<AuthConfig>();
    }
}
