// Error handling for URL analysis requests
// Only input errors and total intelligence loss reach the caller verbatim

use axum::http::StatusCode;
use serde::Serialize;
use thiserror::Error;

use crate::{services::aggregator::AggregationError, utils::url_validator::ValidationError};

// =============================================================================
// ERROR TYPES
// =============================================================================

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum AnalysisError {
    #[error("Invalid URL: {0}")]
    InvalidUrl(String),

    #[error("Threat intelligence services are currently unavailable. Please try again later.")]
    IntelligenceUnavailable,

    #[error("Analysis failed due to an internal error")]
    Internal,
}

// =============================================================================
// ERROR CONVERSIONS
// =============================================================================

impl From<ValidationError> for AnalysisError {
    fn from(err: ValidationError) -> Self {
        AnalysisError::InvalidUrl(err.to_string())
    }
}

impl From<AggregationError> for AnalysisError {
    fn from(err: AggregationError) -> Self {
        match err {
            AggregationError::NoThreatIntelligence => AnalysisError::IntelligenceUnavailable,
        }
    }
}

impl From<validator::ValidationErrors> for AnalysisError {
    fn from(err: validator::ValidationErrors) -> Self {
        let messages: Vec<String> = err
            .field_errors()
            .iter()
            .flat_map(|(field, errors)| {
                errors
                    .iter()
                    .map(move |e| format!("{}: {}", field, e.message.as_ref().unwrap_or(&e.code)))
            })
            .collect();

        AnalysisError::InvalidUrl(messages.join(", "))
    }
}

// =============================================================================
// ERROR RESPONSE
// =============================================================================

#[derive(Debug, Serialize)]
pub struct AnalysisErrorResponse {
    pub error: String,
    pub code: String,
}

impl AnalysisError {
    /// HTTP status this error would carry outside the envelope; used for logging
    pub fn status_code(&self) -> StatusCode {
        match self {
            AnalysisError::InvalidUrl(_) => StatusCode::BAD_REQUEST,
            AnalysisError::IntelligenceUnavailable => StatusCode::SERVICE_UNAVAILABLE,
            AnalysisError::Internal => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    pub fn error_code(&self) -> &'static str {
        match self {
            AnalysisError::InvalidUrl(_) => "INVALID_URL",
            AnalysisError::IntelligenceUnavailable => "INTELLIGENCE_UNAVAILABLE",
            AnalysisError::Internal => "INTERNAL_ERROR",
        }
    }

    /// Message that is safe to show to the caller
    pub fn message(&self) -> String {
        self.to_string()
    }

    pub fn is_client_error(&self) -> bool {
        self.status_code().is_client_error()
    }

    pub fn to_response(&self) -> AnalysisErrorResponse {
        AnalysisErrorResponse {
            error: self.message(),
            code: self.error_code().to_string(),
        }
    }
}

pub type AnalysisResult<T> = Result<T, AnalysisError>;
