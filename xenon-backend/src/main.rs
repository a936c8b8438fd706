use dotenv::dotenv;
use std::sync::Arc;
use std::time::Duration;

mod ai;
mod config;
mod db;
mod gateway;
mod memory;
mod orchestration;
mod tools;

use ai::AiClient;
use config::Config;
use db::Database;
use gateway::EventBroadcaster;
use orchestration::{
    AgentDeps, ExecutorAgent, ObserverAgent, ObserverSettings, Orchestrator, RestartPolicy,
    TaskManagerAgent,
};
use tools::builtin::{load_tokens, ExecutionAccount};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    dotenv().ok();
    env_logger::init();

    let config = Config::from_env()?;
    log::info!("Loaded configuration: {:?}", config);

    let token_count = load_tokens(config.tokens_config.as_deref())?;
    log::info!("Loaded {} token entries", token_count);

    log::info!("Initializing database at {}", config.database_url);
    let db = Arc::new(Database::new(&config.database_url)?);

    let broadcaster = Arc::new(EventBroadcaster::new());
    let (_subscriber_id, mut events) = broadcaster.subscribe();
    tokio::spawn(async move {
        while let Some(event) = events.recv().await {
            log::debug!("[EVENT] {} {}", event.event, event.data);
        }
    });

    let account = Arc::new(ExecutionAccount::from_private_key(
        &config.private_key,
        config.chain_id,
        &config.chain_name,
        &config.rpc_url,
        config.executor_dry_run,
    )?);
    log::info!(
        "Execution account {} on {} (chain {}, dry run: {})",
        account.address_string(),
        account.chain_name(),
        account.chain_id(),
        account.dry_run()
    );

    let ai = Arc::new(AiClient::openai(
        &config.ai_api_key,
        &config.ai_endpoint,
        &config.model_name,
        config.ai_max_tokens,
    )?);
    let report_ai = Arc::new(AiClient::openai(
        &config.ai_api_key,
        &config.ai_endpoint,
        &config.report_model_name,
        config.ai_max_tokens,
    )?);

    let deps = AgentDeps::new(ai, db.clone()).with_broadcaster(broadcaster.clone());

    let target = config
        .target_address
        .clone()
        .unwrap_or_else(|| account.address_string());
    let observer = Arc::new(ObserverAgent::new(
        deps.clone(),
        Arc::new(tools::observer_toolkit(&config)),
        target,
        ObserverSettings {
            network: config.chain_name.clone(),
            step_limit: config.observer_max_steps,
            idle_default: Duration::from_secs(config.idle_default_secs),
            idle_max: Duration::from_secs(config.idle_max_secs),
        },
    ));
    log::info!("Observer watching {}", observer.target());

    let task_manager = Arc::new(TaskManagerAgent::new(
        deps.clone(),
        report_ai,
        config.task_manager_max_steps,
    ));
    let executor = Arc::new(ExecutorAgent::new(
        deps,
        Arc::new(tools::executor_toolkit(&config)),
        account,
        config.executor_max_steps,
    ));

    let orchestrator = Arc::new(Orchestrator::new(
        observer,
        task_manager,
        executor,
        Some(broadcaster),
    )?);

    let shutdown = orchestrator.clone();
    tokio::spawn(async move {
        match tokio::signal::ctrl_c().await {
            Ok(()) => {
                log::info!("Received Ctrl-C");
                shutdown.shutdown();
            }
            Err(e) => log::error!("Failed to listen for Ctrl-C: {}", e),
        }
    });

    let policy = RestartPolicy {
        min_backoff: Duration::from_secs(config.restart_min_backoff_secs),
        max_backoff: Duration::from_secs(config.restart_max_backoff_secs),
        max_restarts: config.max_restarts,
    };

    log::info!("Starting Xenon agents");
    orchestrator.run_with_restarts(policy).await?;
    log::info!("Xenon stopped");
    Ok(())
}
