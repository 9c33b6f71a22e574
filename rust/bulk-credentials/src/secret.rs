//! Account key retrieval.
//!
//! The signing key is never configured directly in production. It is read
//! from a secret store through the [`SecretProvider`] trait each time a token
//! is minted, so rotating the key in the store takes effect immediately.

mod backoff;
mod key_vault;

use std::sync::Arc;

use async_trait::async_trait;
use thiserror::Error;

pub use backoff::Backoff;
pub use key_vault::{KeyVault, KeyVaultAuth};

/// A secret value.
///
/// Debug output is redacted and there is no Display implementation, so a
/// secret cannot end up in a log line by accident.
#[derive(Clone, PartialEq, Eq)]
pub struct Secret(String);

impl Secret {
    /// Wrap a secret value.
    pub fn new(value: impl Into<String>) -> Self {
        Self(value.into())
    }

    /// Access the secret value.
    pub fn expose(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Debug for Secret {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("Secret(<redacted>)")
    }
}

/// Errors that can occur while fetching a secret.
#[derive(Error, Debug)]
pub enum SecretError {
    /// The store could not be reached, or answered with a retryable status.
    #[error("Secret store unavailable: {0}")]
    Transient(String),

    /// The store refused the request.
    #[error("Secret store rejected request ({status}): {message}")]
    Rejected {
        /// HTTP status returned by the store.
        status: u16,
        /// Error text from the response body.
        message: String,
    },

    /// No secret with the requested name.
    #[error("Secret not found: {0}")]
    NotFound(String),

    /// The store answered with something that is not a secret.
    #[error("Malformed secret store response: {0}")]
    Malformed(String),

    /// The provider itself is misconfigured.
    #[error("Secret provider misconfigured: {0}")]
    Configuration(String),
}

impl SecretError {
    /// Whether retrying the same request may succeed.
    pub fn is_transient(&self) -> bool {
        matches!(self, SecretError::Transient(_))
    }
}

/// Source of named secrets.
#[async_trait]
pub trait SecretProvider: Send + Sync {
    /// Fetch the current value of the named secret.
    async fn get_secret(&self, name: &str) -> Result<Secret, SecretError>;
}

#[async_trait]
impl<P: SecretProvider + ?Sized> SecretProvider for Arc<P> {
    async fn get_secret(&self, name: &str) -> Result<Secret, SecretError> {
        (**self).get_secret(name).await
    }
}

/// A provider that answers every request with the same value.
///
/// Intended for local development against a storage emulator whose key is
/// well known.
#[derive(Debug, Clone)]
pub struct StaticSecret(Secret);

impl StaticSecret {
    /// Answer every request with `value`.
    pub fn new(value: impl Into<String>) -> Self {
        Self(Secret::new(value))
    }
}

impl From<Secret> for StaticSecret {
    fn from(secret: Secret) -> Self {
        Self(secret)
    }
}

#[async_trait]
impl SecretProvider for StaticSecret {
    async fn get_secret(&self, _name: &str) -> Result<Secret, SecretError> {
        Ok(self.0.clone())
    }
}
