//! Tradepost engine binary.
//!
//! Wires the economy service to the in-memory backend, replays a scripted
//! trading session, and drains background side effects before exiting.
//!
//! # Startup Sequence
//!
//! 1. Initialize structured logging (tracing)
//! 2. Load configuration from `tradepost-config.yaml`
//! 3. Seed the in-memory store from the `session` section
//! 4. Build the economy service with local job and quest collaborators
//! 5. Replay the scripted trades
//! 6. Wait for background tasks within the shutdown deadline

mod collaborators;
mod error;
mod session;

use std::path::Path;
use std::sync::Arc;

use anyhow::Context;
use tradepost_economy::{AliasResolver, EconomyConfig, EconomyService, InMemoryStore};
use tracing::info;
use tracing_subscriber::EnvFilter;

use crate::collaborators::{MerchantJobs, QuestLog};
use crate::error::EngineError;
use crate::session::SessionConfig;

/// Configuration file looked up in the working directory.
const CONFIG_PATH: &str = "tradepost-config.yaml";

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // 1. Initialize structured logging.
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_target(true)
        .init();

    info!("tradepost-engine starting");

    // 2. Load configuration.
    let config = load_config()?;
    info!(
        sell_price_ratio = %config.sell_price_ratio,
        max_transaction_quantity = config.max_transaction_quantity,
        sale_rotation_weeks = config.sale_rotation_weeks,
        weekly_sales = config.weekly_sales.len(),
        shutdown_timeout_ms = config.shutdown_timeout_ms,
        "Configuration loaded"
    );
    let session_config = load_session_config()?;

    // 3. Seed the store.
    let store = Arc::new(InMemoryStore::new());
    let trader = session::seed(&store, &session_config)
        .await
        .context("failed to seed the in-memory store")?;

    // 4. Build the service.
    let jobs = Arc::new(MerchantJobs::default());
    let service = EconomyService::new(config.clone(), store.clone(), store.clone())
        .with_name_resolver(Arc::new(AliasResolver::from_items(&session_config.catalog)))
        .with_experience_awarder(jobs.clone())
        .with_quest_tracker(Arc::new(QuestLog));
    info!("Economy service ready");

    // 5. Replay the script.
    let report = session::run(&service, &session_config).await;
    info!(
        succeeded = report.succeeded,
        failed = report.failed,
        "Scripted session finished"
    );

    // 6. Drain background side effects.
    service
        .shutdown(config.shutdown_timeout())
        .await
        .context("background tasks did not drain before the deadline")?;

    let balance = store.inventory(trader.id).await;
    info!(
        slots = balance.slots.len(),
        merchant_xp = jobs.experience(trader.id, &config.merchant_job_key).await,
        "tradepost-engine shutdown complete"
    );
    Ok(())
}

/// Load the economy configuration, falling back to defaults when the file is
/// absent.
fn load_config() -> Result<EconomyConfig, EngineError> {
    let config_path = Path::new(CONFIG_PATH);
    if config_path.exists() {
        Ok(EconomyConfig::from_file(config_path)?)
    } else {
        info!("Config file not found, using defaults");
        Ok(EconomyConfig::default())
    }
}

/// Load the `session` section of the config file.
///
/// A missing file or a missing section yields the built-in session.
fn load_session_config() -> Result<SessionConfig, EngineError> {
    let config_path = Path::new(CONFIG_PATH);
    if !config_path.exists() {
        return Ok(SessionConfig::default());
    }

    let contents = std::fs::read_to_string(config_path).map_err(|e| EngineError::Session {
        message: format!("failed to read config file: {e}"),
    })?;
    let raw: serde_yml::Value =
        serde_yml::from_str(&contents).map_err(|e| EngineError::Session {
            message: format!("failed to parse config YAML: {e}"),
        })?;

    raw.get("session").map_or_else(
        || Ok(SessionConfig::default()),
        |section| {
            serde_yml::from_value(section.clone()).map_err(|e| EngineError::Session {
                message: format!("failed to parse session config: {e}"),
            })
        },
    )
}
