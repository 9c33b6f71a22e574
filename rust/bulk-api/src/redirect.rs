//! Redirect issuer for `GET /api/getFile`.

use axum::extract::{Query, State};
use axum::http::StatusCode;
use axum::http::header::LOCATION;
use axum::response::{IntoResponse, Response};
use bulk_credentials::{Grant, MintError, Minter, SecretProvider};
use tracing::{info, warn};
use url::Url;

use crate::{ApiError, Service, TrustedRequestContext};

/// Body returned when no file path was given.
pub const MISSING_PATH_MESSAGE: &str = "Pass a file path in the query string.";

/// Query string of `GET /api/getFile`.
#[derive(Debug, Default, PartialEq, Eq)]
pub struct FileQuery {
    /// Requested blob name within the caller's container.
    pub path: Option<String>,
}

impl FileQuery {
    /// Collect `path` from decoded query pairs. Repeated values are joined
    /// with `,`.
    pub fn from_pairs(pairs: Vec<(String, String)>) -> Self {
        let values: Vec<String> = pairs
            .into_iter()
            .filter(|(name, _)| name == "path")
            .map(|(_, value)| value)
            .collect();
        Self {
            path: (!values.is_empty()).then(|| values.join(",")),
        }
    }
}

/// Mint a read link for `path` in the caller's container.
pub async fn issue_redirect<P: SecretProvider>(
    minter: &Minter<P>,
    context: &TrustedRequestContext,
    path: &str,
) -> Result<Url, MintError> {
    let grant = Grant::read(context.tenant(), context.origin(), path);
    let delegation = minter.mint(grant).await?;
    Ok(delegation.url)
}

/// Redirect the caller to a read link for the requested file.
pub async fn get_file<P>(
    State(service): State<Service<P>>,
    context: TrustedRequestContext,
    Query(pairs): Query<Vec<(String, String)>>,
) -> Result<Response, ApiError>
where
    P: SecretProvider + 'static,
{
    let path = FileQuery::from_pairs(pairs).path.unwrap_or_default();
    if path.is_empty() {
        warn!(tenant = %context.tenant(), "Empty file path");
        return Ok((StatusCode::OK, MISSING_PATH_MESSAGE).into_response());
    }

    let url = issue_redirect(service.minter(), &context, &path).await?;
    info!(
        tenant = %context.tenant(),
        origin = %context.origin(),
        path = %path,
        "Issued file redirect"
    );

    Ok((StatusCode::FOUND, [(LOCATION, url.to_string())]).into_response())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn pairs(values: &[(&str, &str)]) -> Vec<(String, String)> {
        values
            .iter()
            .map(|(name, value)| (name.to_string(), value.to_string()))
            .collect()
    }

    #[test]
    fn it_reads_single_path() {
        let query = FileQuery::from_pairs(pairs(&[("path", "a.txt"), ("other", "x")]));
        assert_eq!(query.path.as_deref(), Some("a.txt"));
    }

    #[test]
    fn it_joins_repeated_paths() {
        let query = FileQuery::from_pairs(pairs(&[("path", "a.txt"), ("path", "b.txt")]));
        assert_eq!(query.path.as_deref(), Some("a.txt,b.txt"));
    }

    #[test]
    fn it_reports_absent_path() {
        assert_eq!(FileQuery::from_pairs(pairs(&[("other", "x")])), FileQuery::default());
    }
}
