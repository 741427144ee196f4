use anyhow::Context;

use craftowl_api::config::ApiConfig;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let _ = dotenvy::dotenv();
    craftowl_observability::init();

    let config = ApiConfig::from_env().context("invalid configuration")?;
    let app = craftowl_api::app::build_app_from_config(&config).await?;

    let addr = config.socket_addr();
    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .with_context(|| format!("failed to bind {addr}"))?;

    tracing::info!(addr = %listener.local_addr()?, "listening to Craft Owl");

    axum::serve(listener, app).await.context("server error")?;
    Ok(())
}
