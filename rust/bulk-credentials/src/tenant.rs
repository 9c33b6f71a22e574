//! Tenant identity.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Identifier of a tenant as presented by the trusted front door.
///
/// Tenant identifiers are compared case-insensitively: every tenant owns the
/// storage container named after the lowercased identifier.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct TenantId(String);

impl TenantId {
    /// Parse a tenant identifier, returning `None` when it is empty.
    pub fn parse(value: &str) -> Option<Self> {
        if value.is_empty() {
            None
        } else {
            Some(Self(value.to_string()))
        }
    }

    /// The identifier exactly as presented.
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Name of the storage container holding this tenant's files.
    pub fn partition(&self) -> String {
        self.0.to_lowercase()
    }
}

impl fmt::Display for TenantId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}
