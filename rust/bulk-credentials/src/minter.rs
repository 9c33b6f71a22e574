//! Delegation minting.
//!
//! The [`Minter`] is the only place the account key is used. For each
//! [`Grant`] it fetches the key from its [`SecretProvider`], signs a
//! [`DelegationToken`] and returns the resulting presigned URL.

use std::net::IpAddr;

use chrono::{DateTime, Utc};
use thiserror::Error;
use tracing::debug;
use url::Url;

use crate::key::AccountKey;
use crate::{
    Address, DelegationToken, Origin, Protocol, Scope, SecretError, SecretProvider, TenantId,
};

/// Name of the secret holding the storage account key.
pub const DEFAULT_SECRET_NAME: &str = "Storage";

/// Errors that can occur while minting a delegation.
#[derive(Error, Debug)]
pub enum MintError {
    /// The account key could not be retrieved.
    #[error("Upstream unavailable: {0}")]
    UpstreamUnavailable(#[from] SecretError),

    /// The client origin is not a network address.
    #[error("Invalid client origin: {0}")]
    InvalidOrigin(String),

    /// The object name does not stay inside the tenant container.
    #[error("Invalid object name: {0}")]
    InvalidObject(String),

    /// The account key cannot be used for signing.
    #[error("Signing failed: {0}")]
    SigningFailure(String),

    /// The storage address is unusable.
    #[error("Invalid configuration: {0}")]
    Configuration(String),
}

/// A request for one delegation.
///
/// Read grants name a single object and are bound to the caller's address.
/// List grants cover the whole tenant container and carry no object or
/// address restriction.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Grant {
    tenant: TenantId,
    scope: Scope,
    origin: Origin,
    issued_at: Option<DateTime<Utc>>,
}

impl Grant {
    /// Read access to `object`, usable only from `origin`.
    pub fn read(tenant: &TenantId, origin: IpAddr, object: impl Into<String>) -> Self {
        Self {
            tenant: tenant.clone(),
            scope: Scope::Read {
                object: object.into(),
            },
            origin: Origin::Address(origin),
            issued_at: None,
        }
    }

    /// List access to the tenant's container, usable from anywhere.
    pub fn list(tenant: &TenantId) -> Self {
        Self {
            tenant: tenant.clone(),
            scope: Scope::List,
            origin: Origin::Any,
            issued_at: None,
        }
    }

    /// Issue the delegation as of `issued_at` instead of now.
    pub fn with_time(mut self, issued_at: DateTime<Utc>) -> Self {
        self.issued_at = Some(issued_at);
        self
    }

    /// Tenant whose container the grant reaches.
    pub fn tenant(&self) -> &TenantId {
        &self.tenant
    }

    /// What the grant allows inside the container.
    pub fn scope(&self) -> &Scope {
        &self.scope
    }

    /// Where the delegation may be presented from.
    pub fn origin(&self) -> Origin {
        self.origin
    }
}

/// A signed delegation and the URL that carries it.
#[derive(Debug, Clone)]
pub struct Delegation {
    /// What was signed.
    pub token: DelegationToken,
    /// Blob or container URL with the signature in its query string.
    pub url: Url,
}

/// Mints delegations for one storage account.
#[derive(Debug)]
pub struct Minter<P> {
    address: Address,
    provider: P,
    secret_name: String,
}

impl<P: SecretProvider> Minter<P> {
    /// Create a minter reading the account key from [`DEFAULT_SECRET_NAME`].
    pub fn new(address: Address, provider: P) -> Self {
        Self {
            address,
            provider,
            secret_name: DEFAULT_SECRET_NAME.to_string(),
        }
    }

    /// Read the account key from a differently named secret.
    pub fn with_secret_name(mut self, name: impl Into<String>) -> Self {
        self.secret_name = name.into();
        self
    }

    /// Storage account this minter signs for.
    pub fn address(&self) -> &Address {
        &self.address
    }

    /// Sign a delegation for `grant`.
    ///
    /// The account key is fetched on every call. Retries happen inside the
    /// provider; a failure here is final for the request.
    pub async fn mint(&self, grant: Grant) -> Result<Delegation, MintError> {
        let endpoint = self.address.endpoint_url()?;
        let partition = grant.tenant.partition();
        let mut url = self.address.locate(&partition, grant.scope.object())?;

        let secret = self.provider.get_secret(&self.secret_name).await?;
        let key = AccountKey::decode(&secret)?;

        let token = DelegationToken::new(
            partition,
            grant.scope,
            grant.origin,
            Protocol::for_scheme(endpoint.scheme()),
            grant.issued_at.unwrap_or_else(Utc::now),
        );
        let signature = key.sign(token.string_to_sign(self.address.account()).as_bytes());
        url.query_pairs_mut().extend_pairs(token.query(&signature));

        debug!(
            tenant = %grant.tenant,
            token = %token,
            "Minted delegation"
        );

        Ok(Delegation { token, url })
    }
}
