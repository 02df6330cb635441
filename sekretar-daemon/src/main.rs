mod config;

use std::{sync::Arc, time::Duration};

use log::{error, info};
use sekretar_billing::{
    collaborators::BillingEnv, gateway::HttpGateway, register_billing_actions,
    remote::BackendClient,
};
use sekretar_database::{
    initialize_store, interfaces::ActionStoreImpl, postgres::PostgresStore, sqlite::SqliteStore,
};
use sekretar_models::errors::{RuntimeError, SendableError};
use sekretar_scheduler::{ActionRegistry, Scheduler, SchedulerConfig};
use sekretar_utilities::startup;

use config::{parse_config, Config};

#[tokio::main]
async fn main() -> Result<(), SendableError> {
    let config = parse_config()?;
    startup::startup("Sekretar Scheduler", config.log_level())?;

    match config.store_backend.as_str() {
        "sqlite" => {
            let store = Arc::new(SqliteStore::new(&config.sqlite_path).await?);
            run_with_store(store, &config).await
        }
        "postgres" => {
            let store = Arc::new(PostgresStore::new(&config.postgres_url).await?);
            run_with_store(store, &config).await
        }
        other => Err(Box::new(RuntimeError::new(
            "daemon.unknown_store_backend",
            format!("Unknown store backend '{other}'"),
        )) as SendableError),
    }
}

async fn run_with_store(
    store: Arc<impl ActionStoreImpl>,
    config: &Config,
) -> Result<(), SendableError> {
    initialize_store(&store).await?;

    let env = build_billing_env(config)?;

    let mut registry = ActionRegistry::new();
    register_billing_actions(&mut registry, env)?;

    let scheduler = Scheduler::new(
        store,
        registry,
        SchedulerConfig {
            max_crash_attempts: config.max_crash_attempts,
        },
    );

    info!("Starting action scheduler");
    scheduler.start().await?;

    if let Err(err) = tokio::signal::ctrl_c().await {
        error!("Failed to listen for Ctrl+C: {}", err);
    }
    info!("Received shutdown signal. Shutting down...");

    // Timers are disarmed only; their rows stay pending for the next boot
    scheduler.shutdown().await;

    info!("Scheduler shutdown complete.");
    Ok(())
}

fn build_billing_env(config: &Config) -> Result<Arc<BillingEnv>, SendableError> {
    let api_timeout = Duration::from_secs(config.api_timeout_seconds);

    info!("Preparing backend API client");
    let backend = Arc::new(BackendClient::new(
        &config.backend_api_url,
        config.backend_api_token.clone(),
        api_timeout,
    )?);

    info!("Preparing payment gateway client");
    let gateway = Arc::new(HttpGateway::new(
        &config.gateway_url,
        config.gateway_public_id.clone(),
        config.gateway_api_secret.clone(),
        api_timeout,
    )?);

    Ok(Arc::new(BillingEnv {
        backend: backend.clone(),
        gateway,
        notifier: backend,
    }))
}
