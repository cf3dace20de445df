// HTTP surface for the trust verdict service

pub mod analysis;
pub mod docs;
pub mod health;

use crate::app::AppState;
use axum::{
    routing::{get, post},
    Router,
};

// Analysis routes
pub fn analysis_routes() -> Router<AppState> {
    Router::new().route("/analyze", post(analysis::analyze_url))
}

// Operational routes
pub fn system_routes() -> Router<AppState> {
    Router::new().route("/health", get(health::health_check))
}

// Documentation routes
pub fn docs_routes() -> Router<AppState> {
    Router::new().route("/openapi.json", get(docs::serve_openapi_spec))
}
