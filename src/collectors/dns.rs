// DNS-over-HTTPS resolver (JSON API)

use async_trait::async_trait;
use serde_json::Value;
use std::net::IpAddr;
use tracing::{debug, warn};

use super::{read_json, CollectorError, DnsResolver};
use crate::app_config::IntelConfig;

const VENDOR: &str = "DNS-over-HTTPS";

/// DNS record type code for A records
const RECORD_TYPE_A: u64 = 1;

pub struct DohResolver {
    client: reqwest::Client,
    endpoint: String,
}

impl DohResolver {
    pub fn new(client: reqwest::Client, config: &IntelConfig) -> Self {
        Self {
            client,
            endpoint: config.doh_resolver_url.clone(),
        }
    }

    async fn fetch_a_records(&self, domain: &str) -> Result<Value, CollectorError> {
        let response = self
            .client
            .get(&self.endpoint)
            .query(&[("name", domain), ("type", "A")])
            .header("Accept", "application/dns-json")
            .send()
            .await?;

        read_json(VENDOR, response).await
    }
}

#[async_trait]
impl DnsResolver for DohResolver {
    async fn resolve(&self, domain: &str) -> Option<IpAddr> {
        // IP literals need no lookup
        if let Ok(ip) = domain.parse::<IpAddr>() {
            return Some(ip);
        }

        match self.fetch_a_records(domain).await {
            Ok(payload) => {
                let ip = extract_first_a_record(&payload);
                debug!(domain, ip = ?ip, "DNS resolution finished");
                ip
            },
            Err(e) => {
                warn!(domain, error = %e, "DNS resolution failed");
                None
            },
        }
    }
}

/// First address in `Answer` that is an A record. CNAME hops are skipped.
pub fn extract_first_a_record(payload: &Value) -> Option<IpAddr> {
    payload
        .get("Answer")?
        .as_array()?
        .iter()
        .filter(|answer| {
            answer
                .get("type")
                .and_then(Value::as_u64)
                .map_or(true, |t| t == RECORD_TYPE_A)
        })
        .find_map(|answer| answer.get("data")?.as_str()?.trim().parse::<IpAddr>().ok())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_extracts_first_a_record_after_cname() {
        let payload = json!({
            "Status": 0,
            "Answer": [
                { "name": "www.example.com.", "type": 5, "TTL": 300, "data": "example.com." },
                { "name": "example.com.", "type": 1, "TTL": 300, "data": "93.184.216.34" },
                { "name": "example.com.", "type": 1, "TTL": 300, "data": "93.184.216.35" }
            ]
        });

        assert_eq!(
            extract_first_a_record(&payload),
            Some("93.184.216.34".parse().unwrap())
        );
    }

    #[test]
    fn test_nxdomain_has_no_answer() {
        let payload = json!({ "Status": 3, "Authority": [] });
        assert_eq!(extract_first_a_record(&payload), None);
    }

    #[test]
    fn test_garbage_data_is_ignored() {
        let payload = json!({ "Answer": [{ "type": 1, "data": "not-an-ip" }] });
        assert_eq!(extract_first_a_record(&payload), None);
    }

    #[tokio::test]
    async fn test_ip_literal_resolves_without_request() {
        let config = IntelConfig {
            doh_resolver_url: "http://127.0.0.1:9/unreachable".to_string(),
            ..IntelConfig::default()
        };
        let resolver = DohResolver::new(reqwest::Client::new(), &config);

        assert_eq!(
            resolver.resolve("10.1.2.3").await,
            Some("10.1.2.3".parse().unwrap())
        );
    }
}
