//! Route table.

use axum::Router;
use axum::routing::get;
use bulk_credentials::SecretProvider;
use tower_http::trace::TraceLayer;

use crate::Service;
use crate::files::list_files;
use crate::redirect::get_file;

/// Build the application router over `service`.
pub fn router<P>(service: Service<P>) -> Router
where
    P: SecretProvider + 'static,
{
    Router::new()
        .route("/health", get(health))
        .route("/api/getFile", get(get_file::<P>))
        .route("/api/listFiles", get(list_files::<P>))
        .layer(TraceLayer::new_for_http())
        .with_state(service)
}

/// Liveness check.
pub async fn health() -> &'static str {
    "ok"
}
