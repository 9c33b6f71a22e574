//! Client-facing file descriptors.

use serde::Serialize;

use crate::BlobItem;

/// Timestamp format of [`FileDescriptor::created`].
const CREATED_FORMAT: &str = "%Y-%m-%dT%H:%M:%SZ";

/// Client-facing description of one file.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FileDescriptor {
    /// Blob name within the tenant container.
    pub file: String,
    /// Link the client follows to fetch the file.
    pub uri: String,
    /// Creation time in UTC, e.g. `2024-03-01T12:00:00Z`.
    pub created: Option<String>,
    /// Content MD5 as lowercase hex.
    pub md5: Option<String>,
}

impl FileDescriptor {
    /// Project a listed blob, linking it under `base_uri`.
    ///
    /// The link is `base_uri` followed directly by the blob name; it is not
    /// itself presigned.
    pub fn project(base_uri: &str, blob: BlobItem) -> Self {
        Self {
            uri: format!("{}{}", base_uri, blob.name),
            created: blob
                .created
                .map(|time| time.format(CREATED_FORMAT).to_string()),
            md5: blob.content_md5.as_deref().map(hex_encode),
            file: blob.name,
        }
    }
}

/// Hex-encode bytes in lowercase.
pub fn hex_encode(bytes: &[u8]) -> String {
    use std::fmt::Write;

    bytes
        .iter()
        .fold(String::with_capacity(bytes.len() * 2), |mut out, byte| {
            let _ = write!(out, "{:02x}", byte);
            out
        })
}
