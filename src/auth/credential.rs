//! Application credentials for the two trust domains.

use crate::config::{ApiKey, ApiSecretKey, AppHandle, Scope};

/// A key/secret pair for one [`Scope`].
///
/// Credentials are supplied by the embedding application, immutable once
/// constructed, and never persisted by this crate. The owning [`AppHandle`]
/// is carried explicitly instead of being inferred from the key.
///
/// # Key Rotation
///
/// A credential may carry the secret it replaced. Inbound signatures are
/// checked against the current secret first, then against the previous one,
/// so requests signed just before a rotation still verify.
///
/// # Example
///
/// ```rust
/// use flicksell_auth::{ApiKey, ApiSecretKey, AppHandle, Credential, Scope};
///
/// let credential = Credential::new(
///     Scope::Admin,
///     ApiKey::new("admin-key").unwrap(),
///     ApiSecretKey::new("admin-secret").unwrap(),
/// )
/// .with_app_handle(AppHandle::new("reports").unwrap());
///
/// assert_eq!(credential.scope(), Scope::Admin);
/// assert!(!format!("{credential:?}").contains("admin-secret"));
/// ```
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Credential {
    scope: Scope,
    key: ApiKey,
    secret: ApiSecretKey,
    previous_secret: Option<ApiSecretKey>,
    app_handle: AppHandle,
}

impl Credential {
    /// Creates a credential owned by the default app handle.
    #[must_use]
    pub fn new(scope: Scope, key: ApiKey, secret: ApiSecretKey) -> Self {
        Self {
            scope,
            key,
            secret,
            previous_secret: None,
            app_handle: AppHandle::default(),
        }
    }

    /// Sets the app handle owning this credential.
    #[must_use]
    pub fn with_app_handle(mut self, app_handle: AppHandle) -> Self {
        self.app_handle = app_handle;
        self
    }

    /// Sets the secret this credential replaced during a rotation.
    #[must_use]
    pub fn with_previous_secret(mut self, secret: ApiSecretKey) -> Self {
        self.previous_secret = Some(secret);
        self
    }

    /// Returns the trust domain of this credential.
    #[must_use]
    pub const fn scope(&self) -> Scope {
        self.scope
    }

    /// Returns the public API key.
    #[must_use]
    pub const fn key(&self) -> &ApiKey {
        &self.key
    }

    /// Returns the current secret.
    #[must_use]
    pub const fn secret(&self) -> &ApiSecretKey {
        &self.secret
    }

    /// Returns the pre-rotation secret, if any.
    #[must_use]
    pub const fn previous_secret(&self) -> Option<&ApiSecretKey> {
        self.previous_secret.as_ref()
    }

    /// Returns the app handle owning this credential.
    #[must_use]
    pub const fn app_handle(&self) -> &AppHandle {
        &self.app_handle
    }

    /// Returns the secrets to try during verification, current first.
    pub fn verification_secrets(&self) -> impl Iterator<Item = &ApiSecretKey> {
        std::iter::once(&self.secret).chain(self.previous_secret.iter())
    }
}

// Verify Credential is Send + Sync at compile time
const _: fn() = || {
    const fn assert_send_sync<T: Send + Sync>() {}
    assert_send_sync::<Credential>();
};

#[cfg(test)]
mod tests {
    use super::*;

    fn credential() -> Credential {
        Credential::new(
            Scope::Storefront,
            ApiKey::new("sf-key").unwrap(),
            ApiSecretKey::new("sf-secret").unwrap(),
        )
    }

    #[test]
    fn test_default_app_handle() {
        assert_eq!(credential().app_handle(), &AppHandle::default());
    }

    #[test]
    fn test_verification_secrets_order() {
        let credential =
            credential().with_previous_secret(ApiSecretKey::new("old-secret").unwrap());
        let secrets: Vec<&str> = credential
            .verification_secrets()
            .map(AsRef::as_ref)
            .collect();
        assert_eq!(secrets, vec!["sf-secret", "old-secret"]);
    }

    #[test]
    fn test_debug_masks_secrets() {
        let credential =
            credential().with_previous_secret(ApiSecretKey::new("old-secret").unwrap());
        let debug = format!("{credential:?}");
        assert!(!debug.contains("sf-secret"));
        assert!(!debug.contains("old-secret"));
        assert!(debug.contains("sf-key"));
    }
}
