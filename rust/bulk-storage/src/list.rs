//! Blob service List Blobs responses.
//!
//! This module provides the [`ListResult`] type produced from the
//! [List Blobs] XML response of a container.
//!
//! [List Blobs]: https://learn.microsoft.com/rest/api/storageservices/list-blobs

use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use chrono::{DateTime, Utc};
use serde::Deserialize;

use crate::StorageError;

/// One page of a container listing.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ListResult {
    /// Blobs returned in this page.
    pub blobs: Vec<BlobItem>,
    /// Marker for the next page, absent on the last page.
    pub next_marker: Option<String>,
}

/// A blob as reported by the listing.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BlobItem {
    /// Blob name within the container.
    pub name: String,
    /// When the blob was created.
    pub created: Option<DateTime<Utc>>,
    /// Raw MD5 digest of the content, when the service has one.
    pub content_md5: Option<Vec<u8>>,
}

/// Root element of the List Blobs XML response.
#[derive(Debug, Deserialize)]
#[serde(rename = "EnumerationResults")]
struct EnumerationResults {
    #[serde(rename = "Blobs", default)]
    blobs: Blobs,
    #[serde(rename = "NextMarker", default)]
    next_marker: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
struct Blobs {
    #[serde(rename = "Blob", default)]
    blob: Vec<Blob>,
}

#[derive(Debug, Deserialize)]
struct Blob {
    #[serde(rename = "Name")]
    name: String,
    #[serde(rename = "Properties", default)]
    properties: Properties,
}

#[derive(Debug, Default, Deserialize)]
struct Properties {
    #[serde(rename = "Creation-Time", default)]
    creation_time: Option<String>,
    #[serde(rename = "Content-MD5", default)]
    content_md5: Option<String>,
}

/// Blob service error response XML structure.
#[derive(Debug, Deserialize)]
#[serde(rename = "Error")]
struct ServiceError {
    #[serde(rename = "Code")]
    code: String,
    #[serde(rename = "Message")]
    message: Option<String>,
}

/// Interpret an error body, if it is one.
pub(crate) fn parse_error_response(xml: &str) -> Option<StorageError> {
    if !xml.contains("<Error") {
        return None;
    }
    let error = quick_xml::de::from_str::<ServiceError>(xml).ok()?;
    let message = error.message.unwrap_or_default();
    Some(StorageError::ServiceError(format!(
        "{}: {}",
        error.code,
        message.trim()
    )))
}

/// Parse a List Blobs XML response.
///
/// Returns an error if the XML is a service error response or if it does not
/// have the expected root element.
pub fn parse_list_response(xml: &str) -> Result<ListResult, StorageError> {
    if let Some(error) = parse_error_response(xml) {
        return Err(error);
    }

    // quick-xml is lenient and will parse any XML as defaults, so we need to validate.
    if !xml.contains("<EnumerationResults") {
        return Err(StorageError::SerializationError(
            "Unexpected XML response: missing EnumerationResults element".into(),
        ));
    }

    let result: EnumerationResults = quick_xml::de::from_str(xml)
        .map_err(|e| StorageError::SerializationError(format!("Failed to parse XML: {}", e)))?;

    let blobs = result
        .blobs
        .blob
        .into_iter()
        .map(BlobItem::try_from)
        .collect::<Result<Vec<_>, _>>()?;

    Ok(ListResult {
        blobs,
        next_marker: non_empty(result.next_marker),
    })
}

impl TryFrom<Blob> for BlobItem {
    type Error = StorageError;

    fn try_from(blob: Blob) -> Result<Self, Self::Error> {
        let created = non_empty(blob.properties.creation_time)
            .map(|value| {
                DateTime::parse_from_rfc2822(&value)
                    .map(|time| time.with_timezone(&Utc))
                    .map_err(|e| {
                        StorageError::SerializationError(format!(
                            "Invalid Creation-Time '{}' for {}: {}",
                            value, blob.name, e
                        ))
                    })
            })
            .transpose()?;

        let content_md5 = non_empty(blob.properties.content_md5)
            .map(|value| {
                STANDARD.decode(&value).map_err(|e| {
                    StorageError::SerializationError(format!(
                        "Invalid Content-MD5 '{}' for {}: {}",
                        value, blob.name, e
                    ))
                })
            })
            .transpose()?;

        Ok(BlobItem {
            name: blob.name,
            created,
            content_md5,
        })
    }
}

/// Empty elements (`<NextMarker />`) carry no value.
fn non_empty(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}
