use anyhow::Context;
use tracing::info;
use worker::WorkerAppConfig;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt().with_target(false).init();

    let config = WorkerAppConfig::load().context("Failed to load config")?;
    info!("Worker starting: {}", config.worker.id);

    worker::start(config).await.context("Worker stopped")?;
    Ok(())
}
