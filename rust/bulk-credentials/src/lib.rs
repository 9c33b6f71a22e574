#![warn(missing_docs)]

//! Shared access signatures for tenant-partitioned blob storage.
//!
//! This crate turns a long-lived storage account key into short-lived,
//! narrowly scoped delegation tokens. Every token is bound to exactly one
//! tenant container, carries exactly one permission, and is valid for a
//! fixed thirty minute window around the time it was issued.
//!
//! # Components
//!
//! - [`SecretProvider`] - where the account key comes from ([`KeyVault`] in
//!   production, [`StaticSecret`] for local development)
//! - [`Minter`] - fetches the key and signs a [`DelegationToken`] for a [`Grant`]
//! - [`Address`] - storage account name and blob endpoint
//!
//! # Example
//!
//! ```no_run
//! use bulk_credentials::{Address, Grant, Minter, StaticSecret, TenantId};
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let address = Address::new("myaccount", "myaccount.blob.core.windows.net");
//! let minter = Minter::new(address, StaticSecret::new("dGVzdC1rZXk="));
//!
//! let tenant = TenantId::parse("ClientA").ok_or("empty tenant")?;
//! let origin = "203.0.113.7".parse::<std::net::IpAddr>()?;
//!
//! // Read access to one object, usable only from the client's address
//! let delegation = minter.mint(Grant::read(&tenant, origin, "report.csv")).await?;
//!
//! println!("Presigned URL: {}", delegation.url);
//! # Ok(())
//! # }
//! ```

pub mod address;
pub mod key;
pub mod minter;
pub mod sas;
pub mod secret;
pub mod tenant;

pub use address::Address;
pub use minter::{DEFAULT_SECRET_NAME, Delegation, Grant, MintError, Minter};
pub use sas::{DelegationToken, Origin, Permission, Protocol, Scope};
pub use secret::{
    Backoff, KeyVault, KeyVaultAuth, Secret, SecretError, SecretProvider, StaticSecret,
};
pub use tenant::TenantId;
