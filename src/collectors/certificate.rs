// TLS certificate inspection via the SSL Labs assessment API
// Assessments run asynchronously on the vendor side, so results are polled

use async_trait::async_trait;
use chrono::{DateTime, TimeZone, Utc};
use serde_json::Value;
use std::time::Duration;
use tracing::{debug, warn};

use super::{read_json, CertificateInspector, CollectorError};
use crate::app_config::IntelConfig;
use crate::models::CertificateFacts;
use crate::utils::poll::{poll_until_ready, PollOutcome, PollPolicy};

const VENDOR: &str = "SSL Labs";

/// Grades that mean the certificate cannot be trusted
const FAILING_GRADES: [&str; 2] = ["F", "T"];

/// Epoch values above this are milliseconds rather than seconds
const MILLIS_THRESHOLD: i64 = 100_000_000_000;

pub struct SslLabsInspector {
    client: reqwest::Client,
    base_url: String,
    poll: PollPolicy,
}

impl SslLabsInspector {
    pub fn new(client: reqwest::Client, config: &IntelConfig) -> Self {
        Self {
            client,
            base_url: config.ssllabs_api_url.trim_end_matches('/').to_string(),
            poll: PollPolicy::new(
                config.certificate_poll_attempts,
                Duration::from_millis(config.certificate_poll_interval_ms),
            ),
        }
    }

    async fn fetch_assessment(&self, domain: &str) -> Result<Option<Value>, CollectorError> {
        let response = self
            .client
            .get(format!("{}/analyze", self.base_url))
            .query(&[
                ("host", domain),
                ("fromCache", "on"),
                ("maxAge", "24"),
                ("all", "done"),
            ])
            .send()
            .await?;

        let payload = read_json(VENDOR, response).await?;
        assessment_state(payload)
    }

    async fn fetch_certificate(&self, domain: &str) -> Result<CertificateFacts, CollectorError> {
        let outcome = poll_until_ready(self.poll, |_| self.fetch_assessment(domain)).await?;

        match outcome {
            PollOutcome::Ready(payload) => extract_certificate(&payload, Utc::now()),
            PollOutcome::Exhausted { attempts } => Err(CollectorError::NotReady {
                vendor: VENDOR,
                attempts,
            }),
        }
    }
}

#[async_trait]
impl CertificateInspector for SslLabsInspector {
    async fn inspect(&self, domain: &str) -> CertificateFacts {
        match self.fetch_certificate(domain).await {
            Ok(facts) => {
                debug!(
                    domain,
                    valid = facts.is_valid,
                    days_to_expiry = ?facts.days_to_expiry,
                    "Certificate inspection finished"
                );
                facts
            },
            Err(e) => {
                warn!(domain, error = %e, "Certificate inspection failed");
                CertificateFacts::unavailable()
            },
        }
    }
}

/// `Some` once the assessment is `READY`, `None` while it is still running
fn assessment_state(payload: Value) -> Result<Option<Value>, CollectorError> {
    match payload.get("status").and_then(Value::as_str) {
        Some("READY") => Ok(Some(payload)),
        Some("ERROR") => {
            let message = payload
                .get("statusMessage")
                .and_then(Value::as_str)
                .unwrap_or("assessment failed");
            Err(CollectorError::malformed(VENDOR, message))
        },
        Some(_) => Ok(None),
        None => Err(CollectorError::malformed(VENDOR, "missing assessment status")),
    }
}

/// Convert a completed assessment into certificate facts
pub fn extract_certificate(
    payload: &Value,
    now: DateTime<Utc>,
) -> Result<CertificateFacts, CollectorError> {
    let endpoint = payload
        .get("endpoints")
        .and_then(Value::as_array)
        .and_then(|endpoints| endpoints.first())
        .ok_or_else(|| CollectorError::malformed(VENDOR, "no endpoints in assessment"))?;

    let details = endpoint.get("details");
    let cert = details
        .and_then(|d| d.get("cert"))
        .or_else(|| {
            payload
                .get("certs")
                .and_then(Value::as_array)
                .and_then(|certs| certs.first())
        })
        .ok_or_else(|| CollectorError::malformed(VENDOR, "no certificate found"))?;

    let valid_from = cert.get("notBefore").and_then(epoch_to_datetime);
    let valid_to = cert.get("notAfter").and_then(epoch_to_datetime);
    let days_to_expiry = valid_to.map(|to| (to - now).num_days());
    let age_days = valid_from.map(|from| (now - from).num_days());

    let failing_grade = endpoint
        .get("grade")
        .and_then(Value::as_str)
        .is_some_and(|grade| FAILING_GRADES.contains(&grade));
    let expired = days_to_expiry.is_some_and(|days| days <= 0);

    let issuer = cert
        .get("issuerLabel")
        .or_else(|| cert.get("issuerSubject"))
        .and_then(Value::as_str)
        .map(str::to_string);

    let protocols = details
        .and_then(|d| d.get("protocols"))
        .and_then(Value::as_array)
        .map(|protocols| {
            protocols
                .iter()
                .filter_map(|p| {
                    let name = p.get("name")?.as_str()?;
                    let version = p.get("version")?.as_str()?;
                    Some(format!("{} {}", name, version))
                })
                .collect()
        })
        .unwrap_or_default();

    Ok(CertificateFacts {
        available: true,
        is_valid: !failing_grade && !expired,
        issuer,
        valid_from,
        valid_to,
        days_to_expiry,
        signature_algorithm: cert.get("sigAlg").and_then(Value::as_str).map(str::to_string),
        protocols,
        extended_validation: cert.get("validationType").and_then(Value::as_str) == Some("E"),
        age_days,
    })
}

/// Vendor timestamps come in seconds or milliseconds since the epoch
fn epoch_to_datetime(value: &Value) -> Option<DateTime<Utc>> {
    let raw = value.as_i64()?;
    if raw >= MILLIS_THRESHOLD {
        Utc.timestamp_millis_opt(raw).single()
    } else {
        Utc.timestamp_opt(raw, 0).single()
    }
}
