// Application state and service wiring
use std::sync::Arc;
use tracing::info;

use crate::{
    app_config::{AppConfig, CacheBackend},
    collectors::Collectors,
    db::{
        create_diesel_pool, DieselDatabaseConfig, InMemoryVerdictStore, PostgresVerdictStore,
        RedisVerdictStore,
    },
    services::{AnalysisService, Aggregator, VerdictCache, VerdictEngine, VerdictStore},
};

// Application state shared across handlers
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<AppConfig>,
    pub analysis: AnalysisService,
}

impl AppState {
    pub fn new(config: AppConfig, analysis: AnalysisService) -> Self {
        Self {
            config: Arc::new(config),
            analysis,
        }
    }
}

/// Open the verdict store selected by `CACHE_BACKEND`
pub async fn build_verdict_store(
    config: &AppConfig,
) -> Result<Arc<dyn VerdictStore>, Box<dyn std::error::Error + Send + Sync>> {
    let store: Arc<dyn VerdictStore> = match config.cache.backend {
        CacheBackend::Postgres => {
            let pool = create_diesel_pool(DieselDatabaseConfig::from(&config.database)).await?;
            Arc::new(PostgresVerdictStore::new(pool))
        },
        CacheBackend::Redis => {
            Arc::new(RedisVerdictStore::connect(&config.redis, config.cache.ttl()).await?)
        },
        CacheBackend::Memory => {
            Arc::new(InMemoryVerdictStore::with_retention(config.cache.ttl()))
        },
    };

    info!(backend = store.backend_name(), "Verdict store initialized");
    Ok(store)
}

/// Wire collectors, engine and cache into the analysis service
pub fn build_analysis_service(config: &AppConfig, store: Arc<dyn VerdictStore>) -> AnalysisService {
    let aggregator = Aggregator::new(
        Collectors::from_config(&config.intel),
        config.intel.collector_timeout(),
    );
    let engine = VerdictEngine::new(config.scoring.clone());
    let cache = VerdictCache::new(store, config.cache.ttl());

    AnalysisService::new(aggregator, engine, cache)
}
