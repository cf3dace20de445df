// PostgreSQL verdict store backed by the scan_history table

use async_trait::async_trait;
use chrono::Utc;
use diesel::prelude::*;
use diesel_async::RunQueryDsl;
use std::time::Duration;
use tracing::debug;

use super::diesel_pool::{check_diesel_health, DieselPool};
use crate::models::{NewScanRecord, ScanRecord};
use crate::schema::scan_history;
use crate::services::verdict_cache::{freshness_cutoff, CacheError, VerdictStore};

pub struct PostgresVerdictStore {
    pool: DieselPool,
}

impl PostgresVerdictStore {
    pub fn new(pool: DieselPool) -> Self {
        Self { pool }
    }

    pub fn pool(&self) -> &DieselPool {
        &self.pool
    }
}

#[async_trait]
impl VerdictStore for PostgresVerdictStore {
    async fn insert(&self, record: NewScanRecord) -> Result<(), CacheError> {
        let mut conn = self
            .pool
            .get()
            .await
            .map_err(|e| CacheError::Pool(e.to_string()))?;

        diesel::insert_into(scan_history::table)
            .values(&record)
            .execute(&mut conn)
            .await?;

        debug!(record_id = %record.id, url = %record.scanned_url, "Scan record stored");
        Ok(())
    }

    async fn latest_within_ttl(
        &self,
        url: &str,
        ttl: Duration,
    ) -> Result<Option<ScanRecord>, CacheError> {
        let mut conn = self
            .pool
            .get()
            .await
            .map_err(|e| CacheError::Pool(e.to_string()))?;

        let cutoff = freshness_cutoff(ttl, Utc::now());

        let record = scan_history::table
            .filter(scan_history::scanned_url.eq(url))
            .filter(scan_history::created_at.ge(cutoff))
            .order(scan_history::created_at.desc())
            .select(ScanRecord::as_select())
            .first(&mut conn)
            .await
            .optional()?;

        Ok(record)
    }

    async fn health_check(&self) -> Result<(), CacheError> {
        check_diesel_health(&self.pool)
            .await
            .map_err(|e| CacheError::Pool(e.to_string()))
    }

    fn backend_name(&self) -> &'static str {
        "postgres"
    }
}
