// Migration orchestrator
// Embedded in the application binary so deployments need no migration tooling

pub mod diesel;

use std::error::Error;
use tracing::{error, info};

use crate::app_config::{AppConfig, CacheBackend};

/// Configuration for migration execution
#[derive(Debug, Clone)]
pub struct MigrationConfig {
    pub database_url: String,
    pub skip_diesel: bool,
    pub environment: String,
}

impl From<&AppConfig> for MigrationConfig {
    fn from(config: &AppConfig) -> Self {
        Self {
            database_url: config.database.url.clone(),
            skip_diesel: !should_run_migrations(config),
            environment: config.environment.to_string(),
        }
    }
}

/// Runs the scan history schema migrations when the postgres backend is active
pub async fn run_all_migrations(config: MigrationConfig) -> Result<(), Box<dyn Error + Send + Sync>> {
    if config.skip_diesel {
        info!("[MIGRATIONS] Skipping Diesel migrations (disabled in config)");
        return Ok(());
    }

    info!(
        "[MIGRATIONS] Starting migration process for environment: {}",
        config.environment
    );

    match diesel::run_migrations(&config.database_url).await {
        Ok(0) => info!("[MIGRATIONS] Diesel migrations up to date"),
        Ok(applied_count) => info!("[MIGRATIONS] Applied {} Diesel migrations", applied_count),
        Err(e) => {
            error!("[MIGRATIONS] Diesel migration failed: {}", e);
            return Err(format!("Diesel migration failed: {}", e).into());
        },
    }

    Ok(())
}

/// Migrations only apply to the postgres backend and can be switched off
pub fn should_run_migrations(config: &AppConfig) -> bool {
    config.cache.backend == CacheBackend::Postgres && config.database.run_migrations
}
