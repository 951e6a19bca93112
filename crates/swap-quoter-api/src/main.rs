use std::sync::Arc;

use swap_quoter::{api::ApiServer, config::AppConfig, SwapEngine};
use tokio::signal;
use tracing::info;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let config = AppConfig::load()?;
    let addr = config.listen_addr();
    let engine = Arc::new(SwapEngine::from_config(&config)?);
    let server = ApiServer::new(engine);

    let handle = tokio::spawn(async move { server.start(&addr).await });

    // Keep runtime alive until ctrl+c or the server gives up
    tokio::select! {
        res = signal::ctrl_c() => {
            res?;
            info!("shutting down");
        }
        res = handle => res??,
    }
    Ok(())
}
