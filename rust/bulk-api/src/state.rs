//! State shared by every handler.

use std::sync::Arc;

use bulk_credentials::{Minter, SecretProvider};
use bulk_storage::Resolver;

/// Shared handler state.
pub struct Service<P> {
    minter: Arc<Minter<P>>,
    resolver: Arc<Resolver>,
}

impl<P: SecretProvider> Service<P> {
    /// Share `minter` and `resolver` across requests.
    pub fn new(minter: Minter<P>, resolver: Resolver) -> Self {
        Self {
            minter: Arc::new(minter),
            resolver: Arc::new(resolver),
        }
    }

    /// Signs delegations for the storage account.
    pub fn minter(&self) -> &Minter<P> {
        &self.minter
    }

    /// Turns container listings into file descriptors.
    pub fn resolver(&self) -> &Resolver {
        &self.resolver
    }
}

// Derived Clone would require `P: Clone`.
impl<P> Clone for Service<P> {
    fn clone(&self) -> Self {
        Self {
            minter: self.minter.clone(),
            resolver: self.resolver.clone(),
        }
    }
}
