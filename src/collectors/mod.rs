// Signal collectors
// Each collector turns one external source into typed facts. Faults never escape:
// a failed collector reports the explicit unknown state for its facts.

pub mod abuseipdb;
pub mod certificate;
pub mod dns;
pub mod safe_browsing;
pub mod virustotal;
pub mod whois;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::net::IpAddr;
use std::sync::Arc;
use thiserror::Error;

use crate::app_config::IntelConfig;
use crate::models::{BlocklistStatus, CertificateFacts, RegistrationFacts};

pub use abuseipdb::AbuseIpDbLookup;
pub use certificate::SslLabsInspector;
pub use dns::DohResolver;
pub use safe_browsing::SafeBrowsingChecker;
pub use virustotal::VirusTotalScanner;
pub use whois::WhoisJsonLookup;

// =============================================================================
// ERROR TYPES
// =============================================================================

/// Internal collector failure. Logged and converted to an unknown fact set.
#[derive(Error, Debug)]
pub enum CollectorError {
    #[error("{0} API key is not configured")]
    MissingCredential(&'static str),

    #[error("Network error: {0}")]
    Network(#[from] reqwest::Error),

    #[error("{vendor} returned HTTP {status}")]
    HttpStatus { vendor: &'static str, status: u16 },

    #[error("Malformed {vendor} payload: {reason}")]
    MalformedPayload { vendor: &'static str, reason: String },

    #[error("{vendor} result not ready after {attempts} attempts")]
    NotReady { vendor: &'static str, attempts: u32 },
}

impl CollectorError {
    pub fn malformed(vendor: &'static str, reason: impl Into<String>) -> Self {
        CollectorError::MalformedPayload {
            vendor,
            reason: reason.into(),
        }
    }
}

// =============================================================================
// REPORT TYPES
// =============================================================================

/// Outcome of a multi-engine reputation scan
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScanReport {
    pub malicious: Option<u32>,
    pub suspicious: Option<u32>,
    pub engines_total: Option<u32>,
}

impl ScanReport {
    pub fn unknown() -> Self {
        Self::default()
    }

    pub fn completed(malicious: u32, suspicious: u32, engines_total: u32) -> Self {
        Self {
            malicious: Some(malicious),
            suspicious: Some(suspicious),
            engines_total: Some(engines_total),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct BlocklistReport {
    pub status: BlocklistStatus,
    pub threats: Vec<String>,
}

impl BlocklistReport {
    pub fn unknown() -> Self {
        Self::default()
    }

    pub fn safe() -> Self {
        Self {
            status: BlocklistStatus::Safe,
            threats: Vec::new(),
        }
    }

    pub fn dangerous(threats: Vec<String>) -> Self {
        Self {
            status: BlocklistStatus::Dangerous,
            threats,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AbuseReport {
    pub confidence: Option<u8>,
    pub total_reports: Option<u32>,
}

impl AbuseReport {
    pub fn unknown() -> Self {
        Self::default()
    }
}

// =============================================================================
// CAPABILITY TRAITS
// =============================================================================

#[async_trait]
pub trait DnsResolver: Send + Sync {
    /// First IPv4 address of the host, `None` when unresolvable
    async fn resolve(&self, domain: &str) -> Option<IpAddr>;
}

#[async_trait]
pub trait RegistrationLookup: Send + Sync {
    async fn lookup(&self, domain: &str) -> RegistrationFacts;
}

#[async_trait]
pub trait CertificateInspector: Send + Sync {
    async fn inspect(&self, domain: &str) -> CertificateFacts;
}

#[async_trait]
pub trait ReputationScanner: Send + Sync {
    fn is_configured(&self) -> bool;

    async fn scan(&self, url: &str) -> ScanReport;
}

#[async_trait]
pub trait BlocklistChecker: Send + Sync {
    fn is_configured(&self) -> bool;

    async fn check(&self, url: &str) -> BlocklistReport;
}

#[async_trait]
pub trait AbuseLookup: Send + Sync {
    fn is_configured(&self) -> bool;

    async fn abuse_confidence(&self, ip: IpAddr) -> AbuseReport;
}

// =============================================================================
// COLLECTOR SET
// =============================================================================

/// Injected collector implementations, one per source
#[derive(Clone)]
pub struct Collectors {
    pub dns: Arc<dyn DnsResolver>,
    pub registration: Arc<dyn RegistrationLookup>,
    pub certificate: Arc<dyn CertificateInspector>,
    pub reputation: Arc<dyn ReputationScanner>,
    pub blocklist: Arc<dyn BlocklistChecker>,
    pub abuse: Arc<dyn AbuseLookup>,
}

impl Collectors {
    /// HTTP-backed collectors sharing a single client
    pub fn from_config(config: &IntelConfig) -> Self {
        let client = build_http_client(config);

        Self {
            dns: Arc::new(DohResolver::new(client.clone(), config)),
            registration: Arc::new(WhoisJsonLookup::new(client.clone(), config)),
            certificate: Arc::new(SslLabsInspector::new(client.clone(), config)),
            reputation: Arc::new(VirusTotalScanner::new(client.clone(), config)),
            blocklist: Arc::new(SafeBrowsingChecker::new(client.clone(), config)),
            abuse: Arc::new(AbuseIpDbLookup::new(client, config)),
        }
    }

    /// At least one of the two threat intelligence feeds has credentials
    pub fn has_threat_intelligence(&self) -> bool {
        self.reputation.is_configured() || self.blocklist.is_configured()
    }
}

pub fn build_http_client(config: &IntelConfig) -> reqwest::Client {
    reqwest::Client::builder()
        .timeout(config.http_timeout())
        .user_agent(config.user_agent.as_str())
        .build()
        .unwrap_or_default()
}

/// Reject non-2xx responses, then decode the body as untyped JSON
pub(crate) async fn read_json(
    vendor: &'static str,
    response: reqwest::Response,
) -> Result<serde_json::Value, CollectorError> {
    let status = response.status();
    if !status.is_success() {
        return Err(CollectorError::HttpStatus {
            vendor,
            status: status.as_u16(),
        });
    }

    let body = response.text().await?;
    if body.trim().is_empty() {
        return Ok(serde_json::Value::Object(Default::default()));
    }

    serde_json::from_str(&body).map_err(|e| CollectorError::malformed(vendor, e.to_string()))
}

/// Non-negative JSON integer as u32
pub(crate) fn json_u32(value: &serde_json::Value) -> Option<u32> {
    value.as_u64().and_then(|n| u32::try_from(n).ok())
}
