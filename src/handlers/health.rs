// Health check handler

use axum::{extract::State, http::StatusCode, response::IntoResponse, Json};
use serde::Serialize;
use std::time::Instant;
use tracing::warn;
use utoipa::ToSchema;

use crate::app::AppState;

#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct StoreHealth {
    pub backend: String,
    pub status: String,
    pub latency_ms: u64,
    pub error: Option<String>,
}

#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct HealthResponse {
    /// `healthy` or `degraded`
    pub status: String,
    pub service: String,
    pub version: String,
    pub environment: String,
    pub timestamp: String,
    pub intelligence_sources: Vec<String>,
    pub store: StoreHealth,
}

/// Service and verdict store health
/// GET /api/v1/health
#[utoipa::path(
    get,
    path = "/api/v1/health",
    tag = "System",
    operation_id = "healthCheck",
    responses(
        (status = 200, description = "Service is healthy", body = HealthResponse),
        (status = 503, description = "Verdict store is unreachable", body = HealthResponse)
    )
)]
pub async fn health_check(State(state): State<AppState>) -> impl IntoResponse {
    let store = state.analysis.cache().store();

    let started = Instant::now();
    let result = store.health_check().await;
    let latency_ms = started.elapsed().as_millis() as u64;

    let store_health = match result {
        Ok(()) => StoreHealth {
            backend: store.backend_name().to_string(),
            status: "healthy".to_string(),
            latency_ms,
            error: None,
        },
        Err(e) => {
            warn!(backend = store.backend_name(), error = %e, "Verdict store health check failed");
            StoreHealth {
                backend: store.backend_name().to_string(),
                status: "unhealthy".to_string(),
                latency_ms,
                error: Some("Verdict store is unreachable".to_string()),
            }
        },
    };

    let healthy = store_health.error.is_none();
    let response = HealthResponse {
        status: if healthy { "healthy" } else { "degraded" }.to_string(),
        service: "trustscan-backend".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
        environment: state.config.environment.to_string(),
        timestamp: chrono::Utc::now().to_rfc3339(),
        intelligence_sources: state
            .config
            .configured_sources()
            .into_iter()
            .map(String::from)
            .collect(),
        store: store_health,
    };

    if healthy {
        (StatusCode::OK, Json(response))
    } else {
        (StatusCode::SERVICE_UNAVAILABLE, Json(response))
    }
}
