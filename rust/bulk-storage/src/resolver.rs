//! Container listings projected into file descriptors.

use futures_util::{Stream, TryStreamExt};
use url::Url;

use crate::{Container, FileDescriptor, StorageError};

/// Projects container listings into [`FileDescriptor`]s.
#[derive(Debug, Clone)]
pub struct Resolver {
    base_uri: String,
    client: reqwest::Client,
}

impl Resolver {
    /// Create a resolver linking files under `base_uri`.
    pub fn new(base_uri: impl Into<String>) -> Self {
        Self {
            base_uri: base_uri.into(),
            client: reqwest::Client::new(),
        }
    }

    /// Use a specific HTTP client.
    pub fn with_client(mut self, client: reqwest::Client) -> Self {
        self.client = client;
        self
    }

    /// Prefix every descriptor's `uri` starts with.
    pub fn base_uri(&self) -> &str {
        &self.base_uri
    }

    /// Lazily describe every file in the container at the presigned `container` URL.
    pub fn files(
        &self,
        container: Url,
    ) -> impl Stream<Item = Result<FileDescriptor, StorageError>> + Send + use<> {
        let base_uri = self.base_uri.clone();
        Container::open(container)
            .with_client(self.client.clone())
            .blobs()
            .map_ok(move |blob| FileDescriptor::project(&base_uri, blob))
    }

    /// Describe every file in the container, or fail as a whole.
    pub async fn resolve(&self, container: Url) -> Result<Vec<FileDescriptor>, StorageError> {
        self.files(container).try_collect().await
    }
}
