//! Storage account address types.
//!
//! This module provides the [`Address`] type for locating a storage account's
//! blob endpoint, and the URL building used to address containers and blobs.

use serde::{Deserialize, Serialize};
use url::Url;

use crate::MintError;

/// Address of a blob storage account.
///
/// Combines the account name (used when signing) with the network endpoint
/// that serves its blobs. The endpoint may be a full URL or a bare host name,
/// in which case `https` is assumed.
///
/// This is a plain data type - URL validation happens when building request URLs.
///
/// # Examples
///
/// ```
/// use bulk_credentials::Address;
///
/// // Public cloud
/// let addr = Address::new("myaccount", "myaccount.blob.core.windows.net");
///
/// // Local emulator (path-style addressing)
/// let addr = Address::new("devstoreaccount1", "http://127.0.0.1:10000");
/// ```
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Address {
    /// Storage account name (e.g., "myaccount")
    account: String,
    /// Blob endpoint (e.g., "myaccount.blob.core.windows.net")
    endpoint: String,
}

impl Address {
    /// Create a new address with the given account name and endpoint.
    pub fn new(account: impl Into<String>, endpoint: impl Into<String>) -> Self {
        Self {
            account: account.into(),
            endpoint: endpoint.into(),
        }
    }

    /// Get the account name.
    pub fn account(&self) -> &str {
        &self.account
    }

    /// Get the endpoint as configured.
    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }

    /// Parse the endpoint into a URL, defaulting to `https` for bare hosts.
    pub fn endpoint_url(&self) -> Result<Url, MintError> {
        let endpoint = self.endpoint.trim_end_matches('/');
        let url = if endpoint.contains("://") {
            Url::parse(endpoint)
        } else {
            Url::parse(&format!("https://{}", endpoint))
        }
        .map_err(|e| MintError::Configuration(format!("invalid endpoint: {}", e)))?;

        if url.host_str().is_none() {
            return Err(MintError::Configuration("endpoint missing host".into()));
        }
        Ok(url)
    }

    /// Build the URL of a container, or of a blob within it.
    ///
    /// Hosted accounts address containers directly under the endpoint
    /// (`https://account.host/container/blob`). IP and localhost endpoints
    /// are emulators and put the account name first
    /// (`http://127.0.0.1:10000/account/container/blob`).
    ///
    /// Each `/`-separated part of the blob name is percent-encoded as its own
    /// segment. Names with `.` or `..` segments or a backslash are rejected.
    pub fn locate(&self, container: &str, blob: Option<&str>) -> Result<Url, MintError> {
        if let Some(blob) = blob {
            check_object(blob)?;
        }

        let mut url = self.endpoint_url()?;
        let path_style = is_path_style_default(&url);
        {
            let mut segments = url
                .path_segments_mut()
                .map_err(|_| MintError::Configuration("endpoint cannot hold a path".into()))?;
            segments.clear();
            if path_style {
                segments.push(&self.account);
            }
            segments.push(container);
            if let Some(blob) = blob {
                segments.extend(blob.split('/'));
            }
        }
        Ok(url)
    }
}

/// Reject blob names that would not stay inside their container.
fn check_object(object: &str) -> Result<(), MintError> {
    let escapes = object.contains('\\')
        || object
            .split('/')
            .any(|segment| segment == "." || segment == "..");
    if escapes {
        return Err(MintError::InvalidObject(object.to_string()));
    }
    Ok(())
}

/// Determine if path-style URLs should be used for this endpoint.
///
/// Returns true for IP addresses and localhost, which is how storage
/// emulators are reached.
pub fn is_path_style_default(endpoint: &Url) -> bool {
    use url::Host;
    match endpoint.host() {
        Some(Host::Ipv4(_)) | Some(Host::Ipv6(_)) => true,
        Some(Host::Domain(domain)) => domain == "localhost",
        None => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn it_creates_address() {
        let addr = Address::new("myaccount", "myaccount.blob.core.windows.net");

        assert_eq!(addr.account(), "myaccount");
        assert_eq!(addr.endpoint(), "myaccount.blob.core.windows.net");
    }

    #[test]
    fn it_defaults_bare_hosts_to_https() {
        let addr = Address::new("myaccount", "myaccount.blob.core.windows.net");
        let url = addr.endpoint_url().unwrap();

        assert_eq!(url.scheme(), "https");
        assert_eq!(url.host_str(), Some("myaccount.blob.core.windows.net"));
    }

    #[test]
    fn it_keeps_explicit_scheme() {
        let addr = Address::new("devstoreaccount1", "http://127.0.0.1:10000/");
        let url = addr.endpoint_url().unwrap();

        assert_eq!(url.scheme(), "http");
        assert_eq!(url.port(), Some(10000));
    }

    #[test]
    fn it_locates_blob_on_hosted_endpoint() {
        let addr = Address::new("myaccount", "https://myaccount.blob.core.windows.net");
        let url = addr.locate("clienta", Some("reports/2024.csv")).unwrap();

        assert_eq!(
            url.as_str(),
            "https://myaccount.blob.core.windows.net/clienta/reports/2024.csv"
        );
    }

    #[test]
    fn it_locates_container_on_hosted_endpoint() {
        let addr = Address::new("myaccount", "myaccount.blob.core.windows.net");
        let url = addr.locate("clienta", None).unwrap();

        assert_eq!(url.as_str(), "https://myaccount.blob.core.windows.net/clienta");
    }

    #[test]
    fn it_locates_with_path_style_on_emulator() {
        let addr = Address::new("devstoreaccount1", "http://127.0.0.1:10000");
        let url = addr.locate("clienta", Some("file.txt")).unwrap();

        assert_eq!(
            url.as_str(),
            "http://127.0.0.1:10000/devstoreaccount1/clienta/file.txt"
        );
    }

    #[test]
    fn it_percent_encodes_blob_names() {
        let addr = Address::new("myaccount", "myaccount.blob.core.windows.net");
        let url = addr.locate("clienta", Some("my file.txt")).unwrap();

        assert_eq!(
            url.as_str(),
            "https://myaccount.blob.core.windows.net/clienta/my%20file.txt"
        );
    }

    #[test]
    fn it_escapes_percent_in_blob_names() {
        let addr = Address::new("myaccount", "myaccount.blob.core.windows.net");
        let url = addr.locate("clienta", Some("100%.txt")).unwrap();

        assert_eq!(url.path(), "/clienta/100%25.txt");
    }

    #[test]
    fn it_keeps_query_characters_inside_the_path() {
        let addr = Address::new("myaccount", "myaccount.blob.core.windows.net");
        let url = addr.locate("clienta", Some("a?b#c.txt")).unwrap();

        assert_eq!(url.path(), "/clienta/a%3Fb%23c.txt");
        assert_eq!(url.query(), None);
        assert_eq!(url.fragment(), None);
    }

    #[test]
    fn it_rejects_names_leaving_the_container() {
        let addr = Address::new("myaccount", "myaccount.blob.core.windows.net");

        for name in ["../clientb/secret.txt", "a/../../clientb/x", "./x.txt", "a\\b.txt", ".."] {
            assert!(
                matches!(
                    addr.locate("clienta", Some(name)),
                    Err(MintError::InvalidObject(_))
                ),
                "{name} should be rejected"
            );
        }
    }

    #[test]
    fn it_allows_dots_inside_segment_names() {
        let addr = Address::new("myaccount", "myaccount.blob.core.windows.net");
        let url = addr.locate("clienta", Some("..hidden/v1..2.txt")).unwrap();

        assert_eq!(url.path(), "/clienta/..hidden/v1..2.txt");
    }

    #[test]
    fn it_rejects_unparseable_endpoint() {
        let addr = Address::new("myaccount", "http://[::1");
        assert!(matches!(
            addr.endpoint_url(),
            Err(MintError::Configuration(_))
        ));
    }

    #[test]
    fn it_detects_path_style_default() {
        let localhost = Url::parse("http://localhost:10000").unwrap();
        assert!(is_path_style_default(&localhost));

        let ipv4 = Url::parse("http://127.0.0.1:10000").unwrap();
        assert!(is_path_style_default(&ipv4));

        let remote = Url::parse("https://myaccount.blob.core.windows.net").unwrap();
        assert!(!is_path_style_default(&remote));
    }
}
