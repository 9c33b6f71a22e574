//! File listing for `GET /api/listFiles`.

use axum::Json;
use axum::extract::State;
use bulk_credentials::{Grant, Minter, SecretProvider, TenantId};
use bulk_storage::{FileDescriptor, Resolver};
use tracing::info;

use crate::{ApiError, Service, Tenant};

/// Describe every file in the tenant's container.
///
/// The listing uses a list delegation with no origin restriction.
pub async fn resolve_files<P: SecretProvider>(
    minter: &Minter<P>,
    resolver: &Resolver,
    tenant: &TenantId,
) -> Result<Vec<FileDescriptor>, ApiError> {
    let delegation = minter.mint(Grant::list(tenant)).await?;
    let files = resolver.resolve(delegation.url).await?;
    Ok(files)
}

/// List the calling tenant's files as JSON.
pub async fn list_files<P>(
    State(service): State<Service<P>>,
    tenant: Tenant,
) -> Result<Json<Vec<FileDescriptor>>, ApiError>
where
    P: SecretProvider + 'static,
{
    let files = resolve_files(service.minter(), service.resolver(), tenant.id()).await?;
    info!(tenant = %tenant.id(), count = files.len(), "Listed files");
    Ok(Json(files))
}
