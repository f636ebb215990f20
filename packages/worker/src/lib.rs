pub mod comparator;
pub mod config;
pub mod consumer;
pub mod error;
pub mod orchestrator;
pub mod registry;
pub mod runner;

use std::sync::Arc;

use common::gateway::redis::RedisGateway;
use mq::{MqConfig, init_mq};
use tokio::task::JoinSet;
use tracing::{error, info};

pub use comparator::{Comparison, compare};
pub use config::{WorkerAppConfig, WorkerConfig};
pub use error::{JudgeError, Result, WorkerError};
pub use orchestrator::{JudgeDisposition, Orchestrator};
pub use registry::{RunnerRegistry, UnsupportedLanguage};
pub use runner::{ExecutionOutcome, RunOutput, Runner, RunnerLimits};

/// Connect to the store and the broker, then judge every enabled language's
/// topic until all consumers stop.
pub async fn start(config: WorkerAppConfig) -> Result<()> {
    let gateway =
        Arc::new(RedisGateway::connect(&config.gateway.url, config.gateway.key_prefix.clone()).await?);
    info!(url = %config.gateway.url, key_prefix = %config.gateway.key_prefix, "Gateway connected");

    let mq = Arc::new(
        init_mq(MqConfig {
            url: config.mq.url.clone(),
            pool_size: config.mq.pool_size,
        })
        .await?,
    );
    info!(url = %config.mq.url, "MQ connected");

    let registry = Arc::new(RunnerRegistry::from_config(&config.worker));
    let orchestrator = Arc::new(Orchestrator::new(
        gateway,
        Arc::clone(&registry),
        config.worker.run_deadline(),
    ));

    let mut consumers = JoinSet::new();
    for language in registry.languages() {
        let topic = language.topic(&config.mq.topic_prefix);
        consumers.spawn(consumer::consume_topic(
            Arc::clone(&mq),
            topic,
            config.worker.concurrency,
            Arc::clone(&orchestrator),
            config.retry.clone(),
        ));
    }
    info!(
        worker_id = %config.worker.id,
        languages = ?registry.languages(),
        deadline_ms = config.worker.run_timeout_ms,
        "Worker started"
    );

    while let Some(joined) = consumers.join_next().await {
        if let Err(e) = joined {
            error!(error = %e, "Consumer task failed");
        }
    }
    Ok(())
}
