// IP abuse reputation via the AbuseIPDB v2 API

use async_trait::async_trait;
use serde_json::Value;
use std::net::IpAddr;
use tracing::{debug, warn};

use super::{json_u32, read_json, AbuseLookup, AbuseReport, CollectorError};
use crate::app_config::IntelConfig;

const VENDOR: &str = "AbuseIPDB";

pub struct AbuseIpDbLookup {
    client: reqwest::Client,
    base_url: String,
    api_key: Option<String>,
    max_age_days: u32,
}

impl AbuseIpDbLookup {
    pub fn new(client: reqwest::Client, config: &IntelConfig) -> Self {
        Self {
            client,
            base_url: config.abuseipdb_api_url.trim_end_matches('/').to_string(),
            api_key: config.abuseipdb_api_key.clone(),
            max_age_days: config.abuseipdb_max_age_days,
        }
    }

    async fn fetch_report(&self, ip: IpAddr) -> Result<AbuseReport, CollectorError> {
        let api_key = self
            .api_key
            .as_deref()
            .ok_or(CollectorError::MissingCredential(VENDOR))?;

        let response = self
            .client
            .get(format!("{}/check", self.base_url))
            .query(&[
                ("ipAddress", ip.to_string()),
                ("maxAgeInDays", self.max_age_days.to_string()),
            ])
            .header("Key", api_key)
            .header("Accept", "application/json")
            .send()
            .await?;

        let payload = read_json(VENDOR, response).await?;
        extract_abuse(&payload)
    }
}

#[async_trait]
impl AbuseLookup for AbuseIpDbLookup {
    fn is_configured(&self) -> bool {
        self.api_key.is_some()
    }

    async fn abuse_confidence(&self, ip: IpAddr) -> AbuseReport {
        match self.fetch_report(ip).await {
            Ok(report) => {
                debug!(%ip, confidence = ?report.confidence, "Abuse lookup finished");
                report
            },
            Err(e) => {
                warn!(%ip, error = %e, "Abuse lookup failed");
                AbuseReport::unknown()
            },
        }
    }
}

pub fn extract_abuse(payload: &Value) -> Result<AbuseReport, CollectorError> {
    let data = payload
        .get("data")
        .ok_or_else(|| CollectorError::malformed(VENDOR, "response has no data"))?;

    let confidence = data
        .get("abuseConfidenceScore")
        .and_then(Value::as_u64)
        .ok_or_else(|| CollectorError::malformed(VENDOR, "missing abuseConfidenceScore"))?;

    Ok(AbuseReport {
        confidence: Some(confidence.min(100) as u8),
        total_reports: data.get("totalReports").and_then(json_u32),
    })
}
