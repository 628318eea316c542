use anyhow::Context;
use deployment::PrintShopDeployment;
use services::services::config::Config;
use tracing::info;
use tracing_subscriber::{EnvFilter, layer::SubscriberExt, util::SubscriberInitExt};
use utils::sentry::{init_once, sentry_layer};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // A missing .env is normal outside development.
    let _ = dotenvy::dotenv();

    let config = Config::from_env().context("invalid configuration")?;
    init_once(config.sentry_dsn.as_deref());

    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with(tracing_subscriber::fmt::layer())
        .with(sentry_layer())
        .init();

    let addr = config.listen_addr();
    let deployment = PrintShopDeployment::new(config)
        .await
        .context("failed to open database")?;

    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .with_context(|| format!("failed to bind {addr}"))?;
    info!(%addr, "print shop server listening");
    axum::serve(listener, server::app(deployment)).await?;
    Ok(())
}
