// Evidence record gathered by the signal collectors
// Every fact is either a concrete value or an explicit unknown

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::net::IpAddr;
use utoipa::ToSchema;

// =============================================================================
// CERTIFICATE FACTS
// =============================================================================

/// TLS certificate metadata for the analysed host.
///
/// A failed inspection is represented by [`CertificateFacts::unavailable`]
/// (`available == false`, `is_valid == false`), never by an absent value.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct CertificateFacts {
    pub available: bool,
    pub is_valid: bool,
    pub issuer: Option<String>,
    pub valid_from: Option<DateTime<Utc>>,
    pub valid_to: Option<DateTime<Utc>>,
    pub days_to_expiry: Option<i64>,
    pub signature_algorithm: Option<String>,
    /// Negotiated protocol versions, e.g. `"TLS 1.2"`
    pub protocols: Vec<String>,
    pub extended_validation: bool,
    pub age_days: Option<i64>,
}

impl CertificateFacts {
    pub fn unavailable() -> Self {
        Self {
            available: false,
            is_valid: false,
            issuer: None,
            valid_from: None,
            valid_to: None,
            days_to_expiry: None,
            signature_algorithm: None,
            protocols: Vec::new(),
            extended_validation: false,
            age_days: None,
        }
    }

    /// Expired certificates count as invalid even when the grade was acceptable
    pub fn is_invalid_or_expired(&self) -> bool {
        self.available && (!self.is_valid || self.days_to_expiry.is_some_and(|d| d <= 0))
    }

    /// True when at least one protocol was observed and every one of them is legacy
    pub fn only_legacy_protocols(&self) -> bool {
        self.available
            && !self.protocols.is_empty()
            && self.protocols.iter().all(|p| is_legacy_protocol(p))
    }
}

fn is_legacy_protocol(protocol: &str) -> bool {
    let p = protocol.to_ascii_uppercase();
    p.starts_with("SSL") || p.ends_with(" 1.0") || p.ends_with(" 1.1")
}

// =============================================================================
// REGISTRATION FACTS
// =============================================================================

/// Domain registration record plus the resolved address of the host.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct RegistrationFacts {
    /// `None` means unknown, which is not the same as a zero-day-old domain
    pub age_days: Option<i64>,
    pub registrar: Option<String>,
    pub privacy_protected: Option<bool>,
    #[schema(value_type = Option<String>, example = "93.184.216.34")]
    pub ip_address: Option<IpAddr>,
    pub created_at: Option<DateTime<Utc>>,
    pub updated_at: Option<DateTime<Utc>>,
    pub expires_at: Option<DateTime<Utc>>,
    pub nameservers: Vec<String>,
}

impl RegistrationFacts {
    pub fn unknown() -> Self {
        Self::default()
    }

    pub fn is_privacy_protected(&self) -> bool {
        self.privacy_protected.unwrap_or(false)
    }
}

// =============================================================================
// REPUTATION FACTS
// =============================================================================

/// Tri-state blocklist result. Transport failures map to `Unknown`,
/// never to `Safe` and never to `Dangerous`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum BlocklistStatus {
    Safe,
    Dangerous,
    #[default]
    Unknown,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct ReputationFacts {
    /// Engines reporting the URL as malicious
    pub malicious_count: Option<u32>,
    pub suspicious_count: Option<u32>,
    pub engines_total: Option<u32>,
    pub blocklist: BlocklistStatus,
    /// Threat categories reported by the blocklist when it matched
    pub blocklist_threats: Vec<String>,
    /// Abuse confidence of the resolved IP, 0-100
    pub abuse_confidence: Option<u8>,
    pub abuse_reports: Option<u32>,
}

// =============================================================================
// EVIDENCE RECORD
// =============================================================================

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct EvidenceRecord {
    pub domain: String,
    pub certificate: CertificateFacts,
    pub registration: RegistrationFacts,
    pub reputation: ReputationFacts,
}

impl EvidenceRecord {
    /// A record in which every source is unknown
    pub fn empty(domain: impl Into<String>) -> Self {
        Self {
            domain: domain.into(),
            certificate: CertificateFacts::unavailable(),
            registration: RegistrationFacts::unknown(),
            reputation: ReputationFacts::default(),
        }
    }

    /// Number of independent sources that returned usable data (out of 4)
    pub fn sources_available(&self) -> u8 {
        [
            self.reputation.malicious_count.is_some(),
            self.reputation.blocklist != BlocklistStatus::Unknown,
            self.reputation.abuse_confidence.is_some(),
            self.registration.age_days.is_some(),
        ]
        .iter()
        .filter(|&&available| available)
        .count() as u8
    }

    /// Neither the multi-engine scan nor the blocklist produced a signal
    pub fn lacks_threat_intelligence(&self) -> bool {
        self.reputation.malicious_count.is_none()
            && self.reputation.blocklist == BlocklistStatus::Unknown
    }
}
