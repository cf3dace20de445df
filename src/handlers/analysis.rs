// URL analysis endpoint
// Every outcome, including a malformed body, is reported through the envelope with HTTP 200

use axum::{
    extract::{rejection::JsonRejection, State},
    Json,
};
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};
use utoipa::ToSchema;
use validator::Validate;

use crate::{
    app::AppState,
    services::analysis::AnalysisEnvelope,
    utils::analysis_errors::AnalysisError,
};

const MALFORMED_BODY_MESSAGE: &str = "Request body must be a JSON object with a \"url\" field";

#[derive(Debug, Clone, Serialize, Deserialize, Validate, ToSchema)]
#[schema(example = json!({ "url": "https://example.com/login" }))]
pub struct AnalyzeRequest {
    /// URL to analyse. Only http and https are accepted.
    #[validate(length(min = 1, message = "URL is required"))]
    pub url: String,
}

/// Analyse a URL and return its trust verdict
/// POST /api/v1/analyze
#[utoipa::path(
    post,
    path = "/api/v1/analyze",
    tag = "Analysis",
    operation_id = "analyzeUrl",
    request_body = AnalyzeRequest,
    responses(
        (status = 200, description = "Verdict or error envelope", body = AnalysisEnvelope)
    )
)]
pub async fn analyze_url(
    State(state): State<AppState>,
    payload: Result<Json<AnalyzeRequest>, JsonRejection>,
) -> Json<AnalysisEnvelope> {
    let request = match payload {
        Ok(Json(request)) => request,
        Err(rejection) => {
            debug!(error = %rejection.body_text(), "Rejected analysis request body");
            return Json(AnalysisEnvelope::Error {
                message: MALFORMED_BODY_MESSAGE.to_string(),
            });
        },
    };

    if let Err(e) = request.validate() {
        let err = AnalysisError::from(e);
        warn!(code = err.error_code(), "Analysis request failed validation");
        return Json(AnalysisEnvelope::error(&err));
    }

    Json(state.analysis.respond(&request.url).await)
}
