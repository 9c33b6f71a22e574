use anyhow::Context;
use bulk_api::{Config, observability, router};
use tokio::net::TcpListener;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    observability::init_tracing();

    let config = Config::from_env().context("load configuration")?;
    let service = config.service().context("build service")?;
    let app = router(service);

    let listener = TcpListener::bind(config.bind)
        .await
        .with_context(|| format!("bind {}", config.bind))?;
    tracing::info!(
        addr = %config.bind,
        account = config.address.account(),
        endpoint = config.address.endpoint(),
        "bulk api listening"
    );

    axum::serve(listener, app.into_make_service())
        .with_graceful_shutdown(async {
            let _ = tokio::signal::ctrl_c().await;
        })
        .await?;
    Ok(())
}
