use std::sync::Arc;

use campusdesk_agent::llm::ModelError;
use campusdesk_agent::runtime::AssistantRuntime;
use campusdesk_core::config::{AppConfig, ConfigError, LoadOptions};
use campusdesk_db::{
    connect_with_config, migrations, seed_demo_data, DbPool, DirectoryCounts, RepositoryError,
    SqlDirectoryRepository,
};
use thiserror::Error;
use tracing::info;

pub struct Application {
    pub config: AppConfig,
    pub db_pool: DbPool,
    pub runtime: AssistantRuntime,
    pub seeded: Option<DirectoryCounts>,
}

#[derive(Debug, Error)]
pub enum BootstrapError {
    #[error(transparent)]
    Config(#[from] ConfigError),
    #[error("database connection failed: {0}")]
    DatabaseConnect(#[source] sqlx::Error),
    #[error("database migration failed: {0}")]
    Migration(#[source] sqlx::migrate::MigrateError),
    #[error("demo data seeding failed: {0}")]
    Seed(#[source] RepositoryError),
    #[error("model client setup failed: {0}")]
    ModelClient(#[source] ModelError),
}

#[cfg_attr(not(test), allow(dead_code))]
pub async fn bootstrap(options: LoadOptions) -> Result<Application, BootstrapError> {
    let config = AppConfig::load(options)?;
    bootstrap_with_config(config).await
}

pub async fn bootstrap_with_config(config: AppConfig) -> Result<Application, BootstrapError> {
    info!(
        event_name = "system.bootstrap.start",
        correlation_id = "bootstrap",
        strategy = ?config.router.strategy,
        "starting application bootstrap"
    );

    let db_pool =
        connect_with_config(&config.database).await.map_err(BootstrapError::DatabaseConnect)?;
    info!(
        event_name = "system.bootstrap.database_connected",
        correlation_id = "bootstrap",
        "database connection established"
    );

    migrations::run_pending(&db_pool).await.map_err(BootstrapError::Migration)?;
    info!(
        event_name = "system.bootstrap.migrations_applied",
        correlation_id = "bootstrap",
        "database migrations applied"
    );

    let seeded = if config.database.seed_demo_data {
        let counts = seed_demo_data(&db_pool).await.map_err(BootstrapError::Seed)?;
        info!(
            event_name = "system.bootstrap.demo_data_seeded",
            correlation_id = "bootstrap",
            rows = counts.total(),
            "demo directory data loaded"
        );
        Some(counts)
    } else {
        None
    };

    let directory = Arc::new(SqlDirectoryRepository::new(db_pool.clone()));
    let runtime =
        AssistantRuntime::from_config(&config, directory).map_err(BootstrapError::ModelClient)?;

    Ok(Application { config, db_pool, runtime, seeded })
}
