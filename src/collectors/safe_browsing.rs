// Blocklist check via the Google Safe Browsing v4 Lookup API

use async_trait::async_trait;
use serde_json::{json, Value};
use tracing::{debug, instrument, warn};

use super::{read_json, BlocklistChecker, BlocklistReport, CollectorError};
use crate::app_config::IntelConfig;

const VENDOR: &str = "Safe Browsing";
const CLIENT_ID: &str = "trustscan";
const CLIENT_VERSION: &str = env!("CARGO_PKG_VERSION");

const THREAT_TYPES: [&str; 4] = [
    "MALWARE",
    "SOCIAL_ENGINEERING",
    "UNWANTED_SOFTWARE",
    "POTENTIALLY_HARMFUL_APPLICATION",
];

pub struct SafeBrowsingChecker {
    client: reqwest::Client,
    base_url: String,
    api_key: Option<String>,
}

impl SafeBrowsingChecker {
    pub fn new(client: reqwest::Client, config: &IntelConfig) -> Self {
        Self {
            client,
            base_url: config.safe_browsing_api_url.trim_end_matches('/').to_string(),
            api_key: config.safe_browsing_api_key.clone(),
        }
    }

    async fn fetch_matches(&self, url: &str) -> Result<Value, CollectorError> {
        let api_key = self
            .api_key
            .as_deref()
            .ok_or(CollectorError::MissingCredential(VENDOR))?;

        let response = self
            .client
            .post(format!("{}/threatMatches:find", self.base_url))
            .query(&[("key", api_key)])
            .json(&lookup_request(url))
            .send()
            .await?;

        read_json(VENDOR, response).await
    }
}

#[async_trait]
impl BlocklistChecker for SafeBrowsingChecker {
    fn is_configured(&self) -> bool {
        self.api_key.is_some()
    }

    #[instrument(skip(self))]
    async fn check(&self, url: &str) -> BlocklistReport {
        match self
            .fetch_matches(url)
            .await
            .and_then(|payload| extract_blocklist(&payload))
        {
            Ok(report) => {
                debug!(status = ?report.status, "Blocklist check finished");
                report
            },
            Err(e) => {
                warn!(error = %e, "Blocklist check failed");
                BlocklistReport::unknown()
            },
        }
    }
}

pub fn lookup_request(url: &str) -> Value {
    json!({
        "client": {
            "clientId": CLIENT_ID,
            "clientVersion": CLIENT_VERSION
        },
        "threatInfo": {
            "threatTypes": THREAT_TYPES,
            "platformTypes": ["ANY_PLATFORM"],
            "threatEntryTypes": ["URL"],
            "threatEntries": [{ "url": url }]
        }
    })
}

/// A non-empty `matches` array means the URL is listed. Only an object with no
/// `matches` or an empty `matches` array counts as not listed; anything else is malformed.
pub fn extract_blocklist(payload: &Value) -> Result<BlocklistReport, CollectorError> {
    let body = payload
        .as_object()
        .ok_or_else(|| CollectorError::malformed(VENDOR, "response is not a JSON object"))?;

    if let Some(error) = body.get("error") {
        return Err(CollectorError::malformed(
            VENDOR,
            format!("response carries an error: {}", error),
        ));
    }

    let matches = match body.get("matches") {
        None => return Ok(BlocklistReport::safe()),
        Some(Value::Array(matches)) if matches.is_empty() => return Ok(BlocklistReport::safe()),
        Some(Value::Array(matches)) => matches,
        Some(_) => return Err(CollectorError::malformed(VENDOR, "matches is not an array")),
    };

    let mut threats: Vec<String> = matches
        .iter()
        .filter_map(|m| m.get("threatType").and_then(Value::as_str))
        .map(str::to_string)
        .collect();
    threats.sort();
    threats.dedup();

    Ok(BlocklistReport::dangerous(threats))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::BlocklistStatus;

    #[test]
    fn test_empty_body_is_safe() {
        assert_eq!(extract_blocklist(&json!({})).unwrap(), BlocklistReport::safe());
        assert_eq!(
            extract_blocklist(&json!({ "matches": [] })).unwrap(),
            BlocklistReport::safe()
        );
    }

    #[test]
    fn test_matches_are_dangerous() {
        let payload = json!({
            "matches": [
                { "threatType": "SOCIAL_ENGINEERING", "platformType": "ANY_PLATFORM", "threat": { "url": "http://phish.test/" } },
                { "threatType": "MALWARE", "platformType": "WINDOWS", "threat": { "url": "http://phish.test/" } },
                { "threatType": "MALWARE", "platformType": "LINUX", "threat": { "url": "http://phish.test/" } }
            ]
        });

        let report = extract_blocklist(&payload).unwrap();
        assert_eq!(report.status, BlocklistStatus::Dangerous);
        assert_eq!(report.threats, vec!["MALWARE", "SOCIAL_ENGINEERING"]);
    }

    #[test]
    fn test_malformed_payload_is_never_safe() {
        for payload in [
            json!(null),
            json!("oops"),
            json!([1, 2]),
            json!(42),
            json!({ "matches": "garbage" }),
            json!({ "matches": { "threatType": "MALWARE" } }),
            json!({ "error": { "code": 400, "message": "API key not valid" } }),
        ] {
            assert!(
                matches!(
                    extract_blocklist(&payload),
                    Err(CollectorError::MalformedPayload { .. })
                ),
                "payload {} should be malformed",
                payload
            );
        }
    }

    #[test]
    fn test_lookup_request_shape() {
        let body = lookup_request("https://example.com/");
        assert_eq!(body["threatInfo"]["threatEntries"][0]["url"], "https://example.com/");
        assert_eq!(body["threatInfo"]["threatTypes"].as_array().unwrap().len(), 4);
    }

    #[tokio::test]
    async fn test_missing_key_is_unknown() {
        let checker = SafeBrowsingChecker::new(reqwest::Client::new(), &IntelConfig::default());
        assert!(!checker.is_configured());
        assert_eq!(
            checker.check("https://example.com/").await.status,
            BlocklistStatus::Unknown
        );
    }
}
