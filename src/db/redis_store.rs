// Redis verdict store
// One list per URL, newest first, trimmed to a fixed depth and expired with the TTL

use async_trait::async_trait;
use chrono::Utc;
use redis::{aio::ConnectionManager, Client, RedisError};
use sha2::{Digest, Sha256};
use std::time::Duration;
use tracing::{debug, info, instrument};

use crate::app_config::RedisConfig;
use crate::models::{NewScanRecord, ScanRecord};
use crate::services::verdict_cache::{ttl_to_chrono, CacheError, VerdictStore};

const KEY_PREFIX: &str = "scan_history";

#[derive(Clone)]
pub struct RedisVerdictStore {
    conn: ConnectionManager,
    history_depth: u32,
    command_timeout: Duration,
    /// EXPIRE applied to each list on write
    ttl: Duration,
}

impl RedisVerdictStore {
    #[instrument(skip(config))]
    pub async fn connect(config: &RedisConfig, ttl: Duration) -> Result<Self, RedisError> {
        info!(redis = %mask_redis_url(&config.url), "Connecting verdict store to Redis");

        let client = Client::open(config.url.as_str())?;
        let connect = ConnectionManager::new(client);
        let conn = tokio::time::timeout(Duration::from_secs(config.connection_timeout), connect)
            .await
            .map_err(|_| {
                RedisError::from((redis::ErrorKind::IoError, "Redis connection timed out"))
            })??;

        Ok(Self {
            conn,
            history_depth: config.history_depth.max(1),
            command_timeout: Duration::from_secs(config.command_timeout),
            ttl,
        })
    }

    /// Bound a command by the configured timeout
    async fn with_timeout<T>(
        &self,
        command: impl std::future::Future<Output = Result<T, RedisError>>,
    ) -> Result<T, CacheError> {
        match tokio::time::timeout(self.command_timeout, command).await {
            Ok(result) => Ok(result?),
            Err(_) => Err(CacheError::Redis(RedisError::from((
                redis::ErrorKind::IoError,
                "Redis command timed out",
            )))),
        }
    }
}

#[async_trait]
impl VerdictStore for RedisVerdictStore {
    async fn insert(&self, record: NewScanRecord) -> Result<(), CacheError> {
        let key = history_key(&record.scanned_url);
        let payload = serde_json::to_string(&record.into_record())?;
        let expire_secs = self.ttl.as_secs().max(1) as i64;
        let mut conn = self.conn.clone();

        let mut pipe = redis::pipe();
        pipe.atomic()
            .lpush(&key, payload)
            .ignore()
            .ltrim(&key, 0, self.history_depth as isize - 1)
            .ignore()
            .expire(&key, expire_secs)
            .ignore();

        self.with_timeout(pipe.query_async::<()>(&mut conn)).await?;

        debug!(key = %key, "Scan record stored");
        Ok(())
    }

    async fn latest_within_ttl(
        &self,
        url: &str,
        ttl: Duration,
    ) -> Result<Option<ScanRecord>, CacheError> {
        let key = history_key(url);
        let mut conn = self.conn.clone();

        let raw: Option<String> = self
            .with_timeout(redis::cmd("LINDEX").arg(&key).arg(0).query_async(&mut conn))
            .await?;

        let Some(raw) = raw else {
            return Ok(None);
        };

        let record: ScanRecord = serde_json::from_str(&raw)?;
        // List expiry is refreshed on every write, so the head can still be stale
        if record.scanned_url != url || !record.is_fresh(ttl_to_chrono(ttl), Utc::now()) {
            return Ok(None);
        }

        Ok(Some(record))
    }

    async fn health_check(&self) -> Result<(), CacheError> {
        let mut conn = self.conn.clone();
        let _pong: String = self
            .with_timeout(redis::cmd("PING").query_async(&mut conn))
            .await?;
        Ok(())
    }

    fn backend_name(&self) -> &'static str {
        "redis"
    }
}

/// URLs can exceed sensible key lengths, so keys use the SHA-256 of the URL
pub fn history_key(url: &str) -> String {
    let digest = Sha256::digest(url.as_bytes());
    let hex: String = digest.iter().map(|b| format!("{:02x}", b)).collect();
    format!("{}:{}", KEY_PREFIX, hex)
}

/// Mask Redis URL for logging
fn mask_redis_url(url: &str) -> String {
    if let Ok(parsed) = url::Url::parse(url) {
        let host = parsed.host_str().unwrap_or("***");
        let port = parsed.port().unwrap_or(6379);

        if !parsed.username().is_empty() || parsed.password().is_some() {
            format!("redis://***:***@{}:{}", host, port)
        } else {
            format!("redis://{}:{}", host, port)
        }
    } else {
        "redis://***:***@***:***".to_string()
    }
}
