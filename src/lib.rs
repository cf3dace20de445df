// Library exports for the TrustScan backend
// This file exposes modules and the router for the binary and integration tests

pub mod app;
pub mod app_config;
pub mod collectors;
pub mod config;
pub mod db;
pub mod handlers;
pub mod migrations;
pub mod models;
pub mod schema;
pub mod services;
pub mod utils;

// Re-export commonly used types
pub use app::AppState;
pub use app_config::{AppConfig, CONFIG};
pub use models::{Classification, Confidence, EvidenceRecord, Indicator, Verdict};
pub use services::{
    AggregationError, AnalysisEnvelope, AnalysisService, Aggregator, CacheError, VerdictCache,
    VerdictEngine, VerdictStore,
};
pub use utils::analysis_errors::AnalysisError;

use axum::{http::HeaderValue, Router};
use tower_http::{
    cors::{Any, CorsLayer},
    trace::TraceLayer,
};
use tracing::warn;

/// Build the store, the analysis service and the shared state from configuration
pub async fn initialize_app_state(
    config: &AppConfig,
) -> Result<AppState, Box<dyn std::error::Error + Send + Sync>> {
    if migrations::should_run_migrations(config) {
        migrations::run_all_migrations(migrations::MigrationConfig::from(config)).await?;
    }

    let store = app::build_verdict_store(config).await?;
    let analysis = app::build_analysis_service(config, store);

    Ok(AppState::new(config.clone(), analysis))
}

/// Full HTTP router with CORS and request tracing
pub fn build_router(state: AppState) -> Router {
    let cors = cors_layer(&state.config.server.cors_allowed_origins);

    let api = Router::new()
        .merge(handlers::analysis_routes())
        .merge(handlers::system_routes())
        .nest("/docs", handlers::docs_routes());

    Router::new()
        .nest("/api/v1", api)
        .layer(TraceLayer::new_for_http())
        .layer(cors)
        .with_state(state)
}

fn cors_layer(origins: &[String]) -> CorsLayer {
    let base = CorsLayer::new().allow_methods(Any).allow_headers(Any);

    if origins.is_empty() || origins.iter().any(|o| o == "*") {
        return base.allow_origin(Any);
    }

    let parsed: Vec<HeaderValue> = origins
        .iter()
        .filter_map(|origin| match origin.parse::<HeaderValue>() {
            Ok(value) => Some(value),
            Err(_) => {
                warn!(origin = %origin, "Ignoring invalid CORS origin");
                None
            },
        })
        .collect();

    base.allow_origin(parsed)
}
