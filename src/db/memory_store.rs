// In-process verdict store for development and tests

use async_trait::async_trait;
use chrono::Utc;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::RwLock;

use crate::models::{NewScanRecord, ScanRecord};
use crate::services::verdict_cache::{ttl_to_chrono, CacheError, VerdictStore};

#[derive(Clone, Default)]
pub struct InMemoryVerdictStore {
    records: Arc<RwLock<Vec<ScanRecord>>>,
    retention: Option<Duration>,
}

impl InMemoryVerdictStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Records older than `retention` are dropped on every write
    pub fn with_retention(retention: Duration) -> Self {
        Self {
            records: Arc::default(),
            retention: Some(retention),
        }
    }

    pub async fn len(&self) -> usize {
        self.records.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.records.read().await.is_empty()
    }

    /// Store a record as-is, keeping its timestamp
    pub async fn insert_record(&self, record: ScanRecord) {
        self.records.write().await.push(record);
    }
}

#[async_trait]
impl VerdictStore for InMemoryVerdictStore {
    async fn insert(&self, record: NewScanRecord) -> Result<(), CacheError> {
        let mut records = self.records.write().await;
        if let Some(retention) = self.retention {
            let retention = ttl_to_chrono(retention);
            let now = Utc::now();
            records.retain(|existing| existing.is_fresh(retention, now));
        }
        records.push(record.into_record());
        Ok(())
    }

    async fn latest_within_ttl(
        &self,
        url: &str,
        ttl: Duration,
    ) -> Result<Option<ScanRecord>, CacheError> {
        let ttl = ttl_to_chrono(ttl);
        let now = Utc::now();

        let records = self.records.read().await;
        Ok(records
            .iter()
            .filter(|record| record.scanned_url == url && record.is_fresh(ttl, now))
            .max_by_key(|record| record.created_at)
            .cloned())
    }

    async fn health_check(&self) -> Result<(), CacheError> {
        Ok(())
    }

    fn backend_name(&self) -> &'static str {
        "memory"
    }
}
