#![warn(missing_docs)]

//! HTTP front end for tenant file access.
//!
//! Requests arrive through a trusted front door that stamps each one with the
//! caller's tenant (`client-id`) and network address (`true-client-ip`). The
//! service turns those into short-lived storage links:
//!
//! - `GET /api/getFile?path=<name>` redirects to a read-only link for one
//!   file, usable only from the caller's address
//! - `GET /api/listFiles` lists the tenant's files as JSON
//! - `GET /health` liveness probe

pub mod config;
pub mod error;
pub mod files;
pub mod gate;
pub mod observability;
pub mod redirect;
pub mod router;
pub mod state;

pub use config::{Config, ConfigError, SecretSource};
pub use error::ApiError;
pub use gate::{Tenant, TrustedRequestContext};
pub use router::router;
pub use state::Service;
