use anyhow::Context;

use shopfront_infra::config::AppConfig;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    shopfront_observability::init();

    let config = AppConfig::from_env().context("invalid configuration")?;
    let services = shopfront_api::app::services::build_services(&config.store)
        .await
        .context("failed to open store")?;
    let app = shopfront_api::app::build_app(services, &config.jwt_secret);

    let listener = tokio::net::TcpListener::bind(config.bind_addr)
        .await
        .with_context(|| format!("failed to bind {}", config.bind_addr))?;

    tracing::info!("listening on {}", listener.local_addr()?);

    axum::serve(listener, app).await?;
    Ok(())
}
