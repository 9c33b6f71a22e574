#![warn(missing_docs)]

//! Enumeration of tenant blob containers.
//!
//! Given a container URL that already carries a list-scoped shared access
//! signature, this crate walks the container's blobs page by page and
//! projects each one into a [`FileDescriptor`] suitable for handing to
//! clients.
//!
//! - [`Container`] - one page at a time ([`Container::list`]) or as a lazy
//!   stream across pages ([`Container::blobs`])
//! - [`Resolver`] - turns blobs into [`FileDescriptor`]s with client-facing
//!   links

pub mod container;
pub mod descriptor;
pub mod list;
pub mod resolver;

use thiserror::Error;

pub use container::Container;
pub use descriptor::{FileDescriptor, hex_encode};
pub use list::{BlobItem, ListResult};
pub use resolver::Resolver;

/// Errors that can occur when enumerating a container
#[derive(Error, Debug)]
pub enum StorageError {
    /// Error that occurs when the storage service cannot be reached
    #[error("Failed to connect to storage: {0}")]
    ConnectionFailed(String),

    /// Error reported by the storage service
    #[error("Storage service error: {0}")]
    ServiceError(String),

    /// Error that occurs when an API request fails
    #[error("Storage request failed: {0}")]
    RequestFailed(String),

    /// Error that occurs while reading the service's response
    #[error("Failed to deserialize response: {0}")]
    SerializationError(String),
}

impl From<reqwest::Error> for StorageError {
    fn from(error: reqwest::Error) -> Self {
        if error.is_connect() || error.is_timeout() {
            StorageError::ConnectionFailed(error.to_string())
        } else {
            StorageError::RequestFailed(error.to_string())
        }
    }
}
