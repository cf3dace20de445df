// OpenAPI document, generated from the handler annotations

use axum::{extract::State, http::StatusCode, response::IntoResponse, Json};
use utoipa::OpenApi;

use super::{analysis, health};
use crate::{
    app::AppState,
    models::{
        BlocklistStatus, CertificateFacts, Classification, Confidence, EvidenceRecord, Indicator,
        RegistrationFacts, ReputationFacts, Verdict,
    },
    services::analysis::AnalysisEnvelope,
};

#[derive(OpenApi)]
#[openapi(
    info(
        title = "TrustScan API",
        description = "Trust verdicts for URLs, built from threat intelligence, registration and TLS evidence"
    ),
    paths(analysis::analyze_url, health::health_check),
    components(schemas(
        analysis::AnalyzeRequest,
        AnalysisEnvelope,
        Verdict,
        Classification,
        Confidence,
        Indicator,
        EvidenceRecord,
        CertificateFacts,
        RegistrationFacts,
        ReputationFacts,
        BlocklistStatus,
        health::HealthResponse,
        health::StoreHealth,
    )),
    tags(
        (name = "Analysis", description = "URL trust analysis"),
        (name = "System", description = "Operational endpoints")
    )
)]
pub struct ApiDoc;

/// Serve OpenAPI JSON specification at /api/v1/docs/openapi.json
pub async fn serve_openapi_spec(State(state): State<AppState>) -> impl IntoResponse {
    if !state.config.features.enable_openapi {
        return StatusCode::NOT_FOUND.into_response();
    }

    Json(ApiDoc::openapi()).into_response()
}
