//! Paged enumeration of one container.

use async_stream::try_stream;
use futures_util::Stream;
use tracing::{debug, trace};
use url::Url;

use crate::StorageError;
use crate::list::{BlobItem, ListResult, parse_error_response, parse_list_response};

/// A blob container reached through a presigned URL.
///
/// The URL's query string carries the authorization, so every request made
/// here is a plain unsigned GET.
#[derive(Debug, Clone)]
pub struct Container {
    url: Url,
    client: reqwest::Client,
}

impl Container {
    /// Open a container from its presigned URL.
    pub fn open(url: Url) -> Self {
        Self {
            url,
            client: reqwest::Client::new(),
        }
    }

    /// Use a specific HTTP client.
    pub fn with_client(mut self, client: reqwest::Client) -> Self {
        self.client = client;
        self
    }

    /// Build a list URL with query parameters.
    fn list_url(&self, marker: Option<&str>) -> Url {
        let mut url = self.url.clone();
        url.query_pairs_mut()
            .append_pair("restype", "container")
            .append_pair("comp", "list");
        if let Some(marker) = marker {
            url.query_pairs_mut().append_pair("marker", marker);
        }
        url
    }

    /// List one page of blobs, starting at `marker`.
    pub async fn list(&self, marker: Option<&str>) -> Result<ListResult, StorageError> {
        let response = self.client.get(self.list_url(marker)).send().await?;
        let status = response.status();

        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            if let Some(error) = parse_error_response(&body) {
                return Err(error);
            }
            return Err(StorageError::ServiceError(format!(
                "Failed to list blobs: {}",
                status
            )));
        }

        let body = response
            .text()
            .await
            .map_err(|e| StorageError::RequestFailed(e.to_string()))?;

        parse_list_response(&body)
    }

    /// Stream every blob in the container, fetching pages as needed.
    ///
    /// The stream ends with the first error; nothing after a failed page is
    /// produced.
    pub fn blobs(&self) -> impl Stream<Item = Result<BlobItem, StorageError>> + Send + use<> {
        let container = self.clone();

        try_stream! {
            let mut marker: Option<String> = None;
            let mut page = 0usize;

            loop {
                let result = container.list(marker.as_deref()).await?;
                page += 1;
                trace!(page, count = result.blobs.len(), "Listed blob page");

                for blob in result.blobs {
                    yield blob;
                }

                match result.next_marker {
                    Some(next) => marker = Some(next),
                    None => break,
                }
            }

            debug!(pages = page, "Finished container listing");
        }
    }
}
