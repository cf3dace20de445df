// Analysis boundary: validate, consult the cache, aggregate, score, persist.
// Nothing that goes wrong past validation escapes as anything but an AnalysisError.

use chrono::Utc;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, error, info, instrument, warn};
use utoipa::ToSchema;

use super::aggregator::{AggregationError, Aggregator};
use super::verdict_cache::VerdictCache;
use super::verdict_engine::VerdictEngine;
use crate::models::Verdict;
use crate::utils::analysis_errors::AnalysisError;
use crate::utils::url_validator::validate_and_normalize;

// =============================================================================
// RESPONSE ENVELOPE
// =============================================================================

/// `{ "status": "SUCCESS", "data": ... }` or `{ "status": "ERROR", "message": ... }`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
#[serde(tag = "status", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum AnalysisEnvelope {
    Success { data: Box<Verdict> },
    Error { message: String },
}

impl AnalysisEnvelope {
    pub fn success(verdict: Verdict) -> Self {
        AnalysisEnvelope::Success {
            data: Box::new(verdict),
        }
    }

    pub fn error(err: &AnalysisError) -> Self {
        AnalysisEnvelope::Error {
            message: err.message(),
        }
    }

    pub fn is_success(&self) -> bool {
        matches!(self, AnalysisEnvelope::Success { .. })
    }
}

impl From<Result<Verdict, AnalysisError>> for AnalysisEnvelope {
    fn from(result: Result<Verdict, AnalysisError>) -> Self {
        match result {
            Ok(verdict) => AnalysisEnvelope::success(verdict),
            Err(e) => AnalysisEnvelope::error(&e),
        }
    }
}

// =============================================================================
// ANALYSIS SERVICE
// =============================================================================

#[derive(Clone)]
pub struct AnalysisService {
    aggregator: Arc<Aggregator>,
    engine: Arc<VerdictEngine>,
    cache: VerdictCache,
}

impl AnalysisService {
    pub fn new(aggregator: Aggregator, engine: VerdictEngine, cache: VerdictCache) -> Self {
        Self {
            aggregator: Arc::new(aggregator),
            engine: Arc::new(engine),
            cache,
        }
    }

    pub fn cache(&self) -> &VerdictCache {
        &self.cache
    }

    pub fn aggregator(&self) -> &Aggregator {
        &self.aggregator
    }

    /// Analyse one caller-supplied URL
    #[instrument(skip(self, raw))]
    pub async fn analyze(&self, raw: &str) -> Result<Verdict, AnalysisError> {
        let target = validate_and_normalize(raw).map_err(|e| {
            debug!(error = %e, "Rejected analysis request");
            AnalysisError::from(e)
        })?;

        if let Some(verdict) = self.cache.get(&target.normalized).await {
            info!(
                url = %target.normalized,
                trust_score = verdict.trust_score,
                "Serving cached verdict"
            );
            return Ok(verdict);
        }

        let started = Instant::now();
        let aggregator = self.aggregator.clone();
        let engine = self.engine.clone();
        let task_target = target.clone();

        // Own task so a panic anywhere below becomes an internal error
        let handle = tokio::spawn(async move {
            let evidence = aggregator.collect(&task_target).await?;
            let assessment = engine.assess(&evidence);
            Ok::<_, AggregationError>(Verdict::from_assessment(
                assessment,
                evidence,
                Utc::now(),
                started.elapsed().as_millis() as u64,
            ))
        });

        let verdict = match handle.await {
            Ok(Ok(verdict)) => verdict,
            Ok(Err(e)) => {
                warn!(url = %target.normalized, error = %e, "Analysis aborted");
                return Err(e.into());
            },
            Err(e) => {
                error!(url = %target.normalized, error = %e, "Analysis task failed");
                return Err(AnalysisError::Internal);
            },
        };

        if let Err(e) = self.cache.put(&target.normalized, &verdict).await {
            warn!(url = %target.normalized, error = %e, "Failed to cache verdict");
        }

        info!(
            url = %target.normalized,
            trust_score = verdict.trust_score,
            classification = %verdict.classification,
            confidence = %verdict.confidence,
            took_ms = verdict.took_millis,
            "Analysis completed"
        );

        Ok(verdict)
    }

    /// Same as [`analyze`](Self::analyze) but always returns an envelope
    pub async fn respond(&self, raw: &str) -> AnalysisEnvelope {
        self.analyze(raw).await.into()
    }
}
