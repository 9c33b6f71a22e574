//! Request failures and the status codes they map to.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use bulk_credentials::MintError;
use bulk_storage::StorageError;
use thiserror::Error;
use tracing::error;

/// Errors a request can end with.
///
/// Responses carry only a status code. The detail goes to the log.
#[derive(Error, Debug)]
pub enum ApiError {
    /// A required trusted header is missing or unusable.
    #[error("Unauthenticated: {0}")]
    Unauthenticated(&'static str),

    /// No delegation could be minted.
    #[error("Credential minting failed: {0}")]
    Mint(#[from] MintError),

    /// The tenant container could not be enumerated.
    #[error("File listing failed: {0}")]
    Listing(#[from] StorageError),
}

impl ApiError {
    /// Status code returned to the caller. Every backend failure is 418.
    pub fn status(&self) -> StatusCode {
        match self {
            ApiError::Unauthenticated(_) => StatusCode::UNAUTHORIZED,
            ApiError::Mint(MintError::InvalidOrigin(_)) => StatusCode::UNAUTHORIZED,
            ApiError::Mint(_) | ApiError::Listing(_) => StatusCode::IM_A_TEAPOT,
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        error!(status = status.as_u16(), error = %self, "Request failed");
        status.into_response()
    }
}
