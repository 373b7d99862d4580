use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use anyhow::Context;
use tracing::info;

mod app;
mod http;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| {
                "qflow_gateway=info,qflow_scheduler=info,qflow_queue=info,tower_http=debug".into()
            }),
        )
        .init();

    // load config: QFLOW_CONFIG env > ./qflow.toml, with QFLOW_* overrides
    let config_path = std::env::var("QFLOW_CONFIG").ok();
    let config = qflow_core::QflowConfig::load(config_path.as_deref())
        .context("failed to load configuration")?;

    let client = qflow_queue::HttpQueueClient::new(
        config.queue.backend_base_url.clone(),
        Duration::from_secs(config.queue.request_timeout_secs),
    )
    .context("failed to build queue client")?;
    info!(backend = %config.queue.backend_base_url, "queue client ready");

    let scheduler = qflow_scheduler::Scheduler::new(Arc::new(client));

    let bind = config.gateway.bind.clone();
    let port = config.gateway.port;
    let state = Arc::new(app::AppState::new(config, scheduler));
    let router = app::build_router(state);

    let addr: SocketAddr = format!("{bind}:{port}")
        .parse()
        .context("invalid bind address")?;
    info!(%addr, "gateway listening");

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, router).await?;
    Ok(())
}
