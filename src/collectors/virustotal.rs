// Multi-engine reputation scan via the VirusTotal v3 API
// Submit the URL, then poll the analysis until it completes or the budget runs out

use async_trait::async_trait;
use serde_json::Value;
use std::time::Duration;
use tracing::{debug, instrument, warn};

use super::{json_u32, read_json, CollectorError, ReputationScanner, ScanReport};
use crate::app_config::IntelConfig;
use crate::utils::poll::{poll_until_ready, PollOutcome, PollPolicy};

const VENDOR: &str = "VirusTotal";

/// Verdict categories counted as engines that looked at the URL
const ENGINE_CATEGORIES: [&str; 5] = ["harmless", "malicious", "suspicious", "undetected", "timeout"];

pub struct VirusTotalScanner {
    client: reqwest::Client,
    base_url: String,
    api_key: Option<String>,
    poll: PollPolicy,
}

impl VirusTotalScanner {
    pub fn new(client: reqwest::Client, config: &IntelConfig) -> Self {
        Self {
            client,
            base_url: config.virustotal_api_url.trim_end_matches('/').to_string(),
            api_key: config.virustotal_api_key.clone(),
            poll: PollPolicy::new(
                config.reputation_poll_attempts,
                Duration::from_millis(config.reputation_poll_interval_ms),
            ),
        }
    }

    async fn submit_url(&self, api_key: &str, url: &str) -> Result<String, CollectorError> {
        let response = self
            .client
            .post(format!("{}/urls", self.base_url))
            .header("x-apikey", api_key)
            .form(&[("url", url)])
            .send()
            .await?;

        let payload = read_json(VENDOR, response).await?;
        extract_analysis_id(&payload)
            .ok_or_else(|| CollectorError::malformed(VENDOR, "submission returned no analysis id"))
    }

    async fn fetch_analysis(
        &self,
        api_key: &str,
        analysis_id: &str,
    ) -> Result<Option<ScanReport>, CollectorError> {
        let response = self
            .client
            .get(format!("{}/analyses/{}", self.base_url, analysis_id))
            .header("x-apikey", api_key)
            .send()
            .await?;

        let payload = read_json(VENDOR, response).await?;
        extract_analysis(&payload)
    }

    async fn fetch_scan(&self, url: &str) -> Result<ScanReport, CollectorError> {
        let api_key = self
            .api_key
            .as_deref()
            .ok_or(CollectorError::MissingCredential(VENDOR))?;

        let analysis_id = self.submit_url(api_key, url).await?;
        debug!(analysis_id = %analysis_id, "URL submitted for analysis");

        let outcome =
            poll_until_ready(self.poll, |_| self.fetch_analysis(api_key, &analysis_id)).await?;

        match outcome {
            PollOutcome::Ready(report) => Ok(report),
            PollOutcome::Exhausted { attempts } => Err(CollectorError::NotReady {
                vendor: VENDOR,
                attempts,
            }),
        }
    }
}

#[async_trait]
impl ReputationScanner for VirusTotalScanner {
    fn is_configured(&self) -> bool {
        self.api_key.is_some()
    }

    #[instrument(skip(self))]
    async fn scan(&self, url: &str) -> ScanReport {
        match self.fetch_scan(url).await {
            Ok(report) => {
                debug!(
                    malicious = ?report.malicious,
                    suspicious = ?report.suspicious,
                    "Reputation scan finished"
                );
                report
            },
            // An unfinished analysis is unknown, never malicious
            Err(e) => {
                warn!(error = %e, "Reputation scan failed");
                ScanReport::unknown()
            },
        }
    }
}

pub fn extract_analysis_id(payload: &Value) -> Option<String> {
    payload
        .get("data")?
        .get("id")?
        .as_str()
        .filter(|id| !id.is_empty())
        .map(str::to_string)
}

/// `Some` when the analysis has completed, `None` while it is queued or running
pub fn extract_analysis(payload: &Value) -> Result<Option<ScanReport>, CollectorError> {
    let attributes = payload
        .get("data")
        .and_then(|d| d.get("attributes"))
        .ok_or_else(|| CollectorError::malformed(VENDOR, "analysis has no attributes"))?;

    if attributes.get("status").and_then(Value::as_str) != Some("completed") {
        return Ok(None);
    }

    let stats = attributes
        .get("stats")
        .ok_or_else(|| CollectorError::malformed(VENDOR, "completed analysis has no stats"))?;

    let count = |key: &str| stats.get(key).and_then(json_u32);
    let malicious = count("malicious")
        .ok_or_else(|| CollectorError::malformed(VENDOR, "stats missing malicious count"))?;
    let suspicious = count("suspicious").unwrap_or(0);
    let engines_total = ENGINE_CATEGORIES.iter().filter_map(|key| count(key)).sum();

    Ok(Some(ScanReport::completed(malicious, suspicious, engines_total)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_extracts_analysis_id() {
        let payload = json!({
            "data": { "type": "analysis", "id": "u-0f4a5b-1717200000" }
        });
        assert_eq!(
            extract_analysis_id(&payload).as_deref(),
            Some("u-0f4a5b-1717200000")
        );
        assert_eq!(extract_analysis_id(&json!({ "error": {} })), None);
    }

    #[test]
    fn test_completed_analysis() {
        let payload = json!({
            "data": {
                "attributes": {
                    "status": "completed",
                    "stats": {
                        "harmless": 70,
                        "malicious": 3,
                        "suspicious": 1,
                        "undetected": 20,
                        "timeout": 0
                    }
                }
            }
        });

        let report = extract_analysis(&payload).unwrap().unwrap();
        assert_eq!(report, ScanReport::completed(3, 1, 94));
    }

    #[test]
    fn test_queued_analysis_is_not_ready() {
        let payload = json!({
            "data": { "attributes": { "status": "queued", "stats": { "malicious": 0 } } }
        });
        assert_eq!(extract_analysis(&payload).unwrap(), None);
    }

    #[test]
    fn test_malformed_analysis() {
        assert!(extract_analysis(&json!({ "data": {} })).is_err());
        assert!(extract_analysis(&json!({
            "data": { "attributes": { "status": "completed" } }
        }))
        .is_err());
    }

    #[test]
    fn test_garbled_analysis_payloads() {
        for payload in [
            json!(null),
            json!("oops"),
            json!([1, 2]),
            json!({ "data": "analysis" }),
            json!({ "data": { "attributes": { "status": "completed", "stats": [] } } }),
            json!({ "data": { "attributes": { "status": "completed", "stats": { "malicious": "3" } } } }),
            json!({ "data": { "attributes": { "status": "completed", "stats": { "malicious": -1 } } } }),
        ] {
            assert!(
                matches!(
                    extract_analysis(&payload),
                    Err(CollectorError::MalformedPayload { .. })
                ),
                "payload {} should be malformed",
                payload
            );
        }

        // An unrecognised status is treated as still running, never as a result
        let payload = json!({ "data": { "attributes": { "status": 7, "stats": { "malicious": 0 } } } });
        assert_eq!(extract_analysis(&payload).unwrap(), None);
    }

    #[tokio::test]
    async fn test_missing_key_is_unknown() {
        let scanner = VirusTotalScanner::new(reqwest::Client::new(), &IntelConfig::default());
        assert!(!scanner.is_configured());
        assert_eq!(scanner.scan("https://example.com/").await, ScanReport::unknown());
    }
}
