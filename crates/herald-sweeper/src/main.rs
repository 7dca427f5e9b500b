//! Retention sweeper daemon for the Herald cluster event bus.
//!
//! Every node may run one of these. Sweepers on different nodes need no
//! coordination: they all apply the same cutoff rule and deletes are
//! idempotent.
//!
//! # Startup Sequence
//!
//! 1. Load configuration from `herald-config.yaml` (or `HERALD_CONFIG`)
//! 2. Initialize structured logging (tracing)
//! 3. Connect to `PostgreSQL` and run migrations
//! 4. Build the retention sweeper over the shared event store
//! 5. Run the scheduler until Ctrl-C
//! 6. Close the pool and log the summary

mod error;

use std::path::{Path, PathBuf};

use anyhow::Context as _;
use herald_core::config::LoggingConfig;
use herald_core::{HeraldConfig, RetentionSweeper, Schedule, run_periodically};
use herald_db::{EventStore as _, PostgresConfig, PostgresPool};
use tokio::sync::watch;
use tracing::{debug, info, warn};
use tracing_subscriber::EnvFilter;

use crate::error::SweeperError;

/// Default configuration file path, relative to the working directory.
const DEFAULT_CONFIG_PATH: &str = "herald-config.yaml";

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // 1. Load configuration.
    let config = load_config(
        std::env::var_os("HERALD_CONFIG").map(PathBuf::from),
        Path::new(DEFAULT_CONFIG_PATH),
        |key| std::env::var(key).ok(),
    )
    .context("loading configuration")?;

    // 2. Initialize structured logging.
    init_logging(&config.logging)?;
    info!(
        node_id = config.node.id,
        max_event_age_ms = config.retention.max_event_age_ms,
        sweep_interval_ms = config.retention.sweep_interval_ms,
        initial_delay_ms = config.retention.initial_delay_ms,
        "herald-sweeper starting"
    );

    // 3. Connect to PostgreSQL.
    let pg_config = PostgresConfig::new(&config.infrastructure.postgres_url)
        .with_max_connections(config.infrastructure.max_connections)
        .with_node_id(&config.node.id);
    let pool = PostgresPool::connect(&pg_config)
        .await
        .map_err(SweeperError::from)
        .context("connecting to PostgreSQL")?;
    pool.run_migrations()
        .await
        .map_err(SweeperError::from)
        .context("running migrations")?;

    // 4. Build the sweeper.
    let sweeper =
        RetentionSweeper::with_system_clock(pool.event_store(), config.retention.max_event_age())
            .map_err(SweeperError::from)?;
    match sweeper.store().count().await {
        Ok(stored) => info!(stored, "Shared event store ready"),
        Err(e) => warn!(error = %e, "could not count stored events"),
    }

    // 5. Run until Ctrl-C.
    let (shutdown_tx, shutdown_rx) = watch::channel(false);
    tokio::spawn(async move {
        match tokio::signal::ctrl_c().await {
            Ok(()) => info!("Shutdown signal received"),
            Err(e) => warn!(error = %e, "failed to listen for Ctrl-C, stopping"),
        }
        if shutdown_tx.send(true).is_err() {
            debug!("scheduler already stopped, shutdown signal dropped");
        }
    });

    let summary =
        run_periodically(&sweeper, Schedule::from(&config.retention), shutdown_rx).await;

    // 6. Clean up.
    pool.close().await;
    info!(
        runs = summary.runs,
        failures = summary.failures,
        deleted = summary.deleted,
        "herald-sweeper stopped"
    );
    Ok(())
}

/// Load configuration from `explicit` (the `HERALD_CONFIG` path), falling
/// back to `default_path`. A missing default file yields defaults plus
/// overrides; a missing explicit file is an error.
fn load_config<F>(
    explicit: Option<PathBuf>,
    default_path: &Path,
    lookup: F,
) -> Result<HeraldConfig, SweeperError>
where
    F: Fn(&str) -> Option<String>,
{
    let path = match explicit {
        Some(path) => path,
        None if default_path.exists() => default_path.to_path_buf(),
        None => {
            let mut config = HeraldConfig::default();
            config.apply_overrides(lookup)?;
            config.validate()?;
            return Ok(config);
        }
    };

    Ok(HeraldConfig::from_file_with_overrides(&path, lookup)?)
}

/// Build a filter from the configured level.
fn log_filter(level: &str) -> Result<EnvFilter, SweeperError> {
    EnvFilter::try_new(level).map_err(|e| SweeperError::Logging {
        message: format!("invalid log level {level:?}: {e}"),
    })
}

/// Install the global tracing subscriber. `RUST_LOG` takes precedence over
/// the configured level.
fn init_logging(logging: &LoggingConfig) -> Result<(), SweeperError> {
    let filter = match EnvFilter::try_from_default_env() {
        Ok(filter) => filter,
        Err(_) => log_filter(&logging.level)?,
    };

    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(true);
    if logging.json {
        builder.json().init();
    } else {
        builder.init();
    }
    Ok(())
}
