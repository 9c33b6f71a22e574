//! Access gate.
//!
//! The front door is the only network entry point, and it sets the identity
//! headers. Handlers never read those headers themselves: they take a
//! [`Tenant`] or a [`TrustedRequestContext`] extractor, and neither type can
//! be built any other way.

use std::net::IpAddr;

use axum::extract::FromRequestParts;
use axum::http::HeaderMap;
use axum::http::request::Parts;
use bulk_credentials::TenantId;

use crate::ApiError;

/// Header carrying the tenant identifier.
pub const CLIENT_ID_HEADER: &str = "client-id";

/// Header carrying the caller's network address.
pub const CLIENT_IP_HEADER: &str = "true-client-ip";

/// A tenant vouched for by the front door.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Tenant {
    id: TenantId,
}

impl Tenant {
    /// The tenant's identifier.
    pub fn id(&self) -> &TenantId {
        &self.id
    }
}

/// A tenant and the network address its request came from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TrustedRequestContext {
    tenant: TenantId,
    origin: IpAddr,
}

impl TrustedRequestContext {
    /// The calling tenant.
    pub fn tenant(&self) -> &TenantId {
        &self.tenant
    }

    /// The caller's network address.
    pub fn origin(&self) -> IpAddr {
        self.origin
    }
}

/// Establish the tenant of a request.
pub fn identify(headers: &HeaderMap) -> Result<Tenant, ApiError> {
    let id = headers
        .get(CLIENT_ID_HEADER)
        .and_then(|value| value.to_str().ok())
        .and_then(TenantId::parse)
        .ok_or(ApiError::Unauthenticated("missing client-id header"))?;
    Ok(Tenant { id })
}

/// Establish the tenant and network origin of a request.
pub fn authorize(headers: &HeaderMap) -> Result<TrustedRequestContext, ApiError> {
    let Tenant { id } = identify(headers)?;
    let origin = headers
        .get(CLIENT_IP_HEADER)
        .ok_or(ApiError::Unauthenticated("missing true-client-ip header"))?
        .to_str()
        .ok()
        .and_then(|value| value.trim().parse::<IpAddr>().ok())
        .ok_or(ApiError::Unauthenticated("invalid true-client-ip header"))?;
    Ok(TrustedRequestContext { tenant: id, origin })
}

impl<S> FromRequestParts<S> for Tenant
where
    S: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        identify(&parts.headers)
    }
}

impl<S> FromRequestParts<S> for TrustedRequestContext
where
    S: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        authorize(&parts.headers)
    }
}
