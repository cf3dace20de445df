// Result cache: freshest verdict per URL within a TTL, append-only writes

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;
use tracing::{debug, instrument, warn};

use crate::models::{NewScanRecord, ScanRecord, Verdict};

/// Ceiling for TTL arithmetic so cutoff computation cannot overflow
const MAX_TTL_SECS: u64 = 100 * 365 * 24 * 60 * 60;

// =============================================================================
// ERROR TYPES
// =============================================================================

#[derive(Error, Debug)]
pub enum CacheError {
    #[error("Database error: {0}")]
    Database(#[from] diesel::result::Error),

    #[error("Connection pool error: {0}")]
    Pool(String),

    #[error("Redis error: {0}")]
    Redis(#[from] redis::RedisError),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

// =============================================================================
// STORE TRAIT
// =============================================================================

/// Persistence collaborator behind the cache
#[async_trait]
pub trait VerdictStore: Send + Sync {
    async fn insert(&self, record: NewScanRecord) -> Result<(), CacheError>;

    /// Most recent record for the exact URL created within `ttl` of now
    async fn latest_within_ttl(
        &self,
        url: &str,
        ttl: Duration,
    ) -> Result<Option<ScanRecord>, CacheError>;

    async fn health_check(&self) -> Result<(), CacheError>;

    fn backend_name(&self) -> &'static str;
}

/// Oldest `created_at` still considered fresh
pub fn freshness_cutoff(ttl: Duration, now: DateTime<Utc>) -> DateTime<Utc> {
    now - ttl_to_chrono(ttl)
}

pub fn ttl_to_chrono(ttl: Duration) -> chrono::Duration {
    chrono::Duration::seconds(ttl.as_secs().min(MAX_TTL_SECS) as i64)
        + chrono::Duration::nanoseconds(i64::from(ttl.subsec_nanos()))
}

// =============================================================================
// VERDICT CACHE
// =============================================================================

#[derive(Clone)]
pub struct VerdictCache {
    store: Arc<dyn VerdictStore>,
    ttl: Duration,
}

impl VerdictCache {
    pub fn new(store: Arc<dyn VerdictStore>, ttl: Duration) -> Self {
        Self { store, ttl }
    }

    pub fn ttl(&self) -> Duration {
        self.ttl
    }

    pub fn store(&self) -> &Arc<dyn VerdictStore> {
        &self.store
    }

    /// Freshest cached verdict, marked as served from cache.
    /// Store failures and undecodable payloads are treated as a miss.
    #[instrument(skip(self))]
    pub async fn get(&self, url: &str) -> Option<Verdict> {
        let record = match self.store.latest_within_ttl(url, self.ttl).await {
            Ok(Some(record)) => record,
            Ok(None) => {
                debug!("Verdict cache miss");
                return None;
            },
            Err(e) => {
                warn!(backend = self.store.backend_name(), error = %e, "Verdict cache lookup failed");
                return None;
            },
        };

        match record.verdict() {
            Ok(verdict) => {
                debug!(record_id = %record.id, "Verdict cache hit");
                Some(verdict.as_cached())
            },
            Err(e) => {
                warn!(record_id = %record.id, error = %e, "Cached verdict could not be decoded");
                None
            },
        }
    }

    /// Append a new cache entry for this URL
    pub async fn put(&self, url: &str, verdict: &Verdict) -> Result<(), CacheError> {
        let record = NewScanRecord::from_verdict(url, verdict)?;
        self.store.insert(record).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn test_freshness_cutoff() {
        let now = Utc.with_ymd_and_hms(2024, 6, 1, 12, 0, 0).unwrap();
        assert_eq!(
            freshness_cutoff(Duration::from_secs(3600), now),
            Utc.with_ymd_and_hms(2024, 6, 1, 11, 0, 0).unwrap()
        );
    }

    #[test]
    fn test_huge_ttl_does_not_overflow() {
        let now = Utc::now();
        assert!(freshness_cutoff(Duration::from_secs(u64::MAX), now) < now);
    }
}
