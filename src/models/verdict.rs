// Verdict model - the scored, classified and explained result of one analysis

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use utoipa::ToSchema;

use super::evidence::EvidenceRecord;

// =============================================================================
// CLASSIFICATION & CONFIDENCE
// =============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Classification {
    Safe,
    Caution,
    Dangerous,
}

impl Classification {
    /// Lower-case label used by the scan history table
    pub fn as_threat_level(&self) -> &'static str {
        match self {
            Classification::Safe => "safe",
            Classification::Caution => "caution",
            Classification::Dangerous => "dangerous",
        }
    }
}

impl fmt::Display for Classification {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Classification::Safe => write!(f, "SAFE"),
            Classification::Caution => write!(f, "CAUTION"),
            Classification::Dangerous => write!(f, "DANGEROUS"),
        }
    }
}

/// How many independent sources contributed to the verdict.
/// Variant order is significant: `Low < Medium < High`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Confidence {
    Low,
    Medium,
    High,
}

impl fmt::Display for Confidence {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Confidence::Low => write!(f, "LOW"),
            Confidence::Medium => write!(f, "MEDIUM"),
            Confidence::High => write!(f, "HIGH"),
        }
    }
}

// =============================================================================
// INDICATORS
// =============================================================================

/// Severity tier of an indicator. Variant order is the reporting order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum IndicatorTier {
    Critical,
    High,
    Medium,
    Low,
    Informational,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Indicator {
    BlocklistFlagged,
    ReputationMaliciousDetection,
    ExtremelyNewDomain,
    RecentlyCreatedDomain,
    IpVeryHighAbuse,
    IpModerateAbuse,
    HighSuspiciousFlags,
    MultipleSuspiciousFlags,
    YoungDomain,
    InvalidCertificate,
    VeryNewCertificate,
    RecentlyIssuedCertificate,
    UsesDomainPrivacy,
    OutdatedTlsProtocol,
    LimitedIntelligenceData,
}

impl Indicator {
    pub fn tier(&self) -> IndicatorTier {
        match self {
            Indicator::BlocklistFlagged | Indicator::ReputationMaliciousDetection => {
                IndicatorTier::Critical
            },
            Indicator::ExtremelyNewDomain
            | Indicator::RecentlyCreatedDomain
            | Indicator::IpVeryHighAbuse
            | Indicator::IpModerateAbuse => IndicatorTier::High,
            Indicator::HighSuspiciousFlags
            | Indicator::MultipleSuspiciousFlags
            | Indicator::YoungDomain
            | Indicator::InvalidCertificate
            | Indicator::VeryNewCertificate
            | Indicator::RecentlyIssuedCertificate => IndicatorTier::Medium,
            Indicator::UsesDomainPrivacy | Indicator::OutdatedTlsProtocol => IndicatorTier::Low,
            Indicator::LimitedIntelligenceData => IndicatorTier::Informational,
        }
    }

    pub fn is_critical(&self) -> bool {
        self.tier() == IndicatorTier::Critical
    }

    /// Stable identifier, identical to the serialized form
    pub fn code(&self) -> &'static str {
        match self {
            Indicator::BlocklistFlagged => "BLOCKLIST_FLAGGED",
            Indicator::ReputationMaliciousDetection => "REPUTATION_MALICIOUS_DETECTION",
            Indicator::ExtremelyNewDomain => "EXTREMELY_NEW_DOMAIN",
            Indicator::RecentlyCreatedDomain => "RECENTLY_CREATED_DOMAIN",
            Indicator::IpVeryHighAbuse => "IP_VERY_HIGH_ABUSE",
            Indicator::IpModerateAbuse => "IP_MODERATE_ABUSE",
            Indicator::HighSuspiciousFlags => "HIGH_SUSPICIOUS_FLAGS",
            Indicator::MultipleSuspiciousFlags => "MULTIPLE_SUSPICIOUS_FLAGS",
            Indicator::YoungDomain => "YOUNG_DOMAIN",
            Indicator::InvalidCertificate => "INVALID_CERTIFICATE",
            Indicator::VeryNewCertificate => "VERY_NEW_CERTIFICATE",
            Indicator::RecentlyIssuedCertificate => "RECENTLY_ISSUED_CERTIFICATE",
            Indicator::UsesDomainPrivacy => "USES_DOMAIN_PRIVACY",
            Indicator::OutdatedTlsProtocol => "OUTDATED_TLS_PROTOCOL",
            Indicator::LimitedIntelligenceData => "LIMITED_INTELLIGENCE_DATA",
        }
    }

    /// Canonical one-line explanation used as the verdict summary
    pub fn explanation(&self) -> &'static str {
        match self {
            Indicator::BlocklistFlagged => {
                "This URL is listed on a malware and phishing blocklist. Avoid visiting this site."
            },
            Indicator::ReputationMaliciousDetection => {
                "This URL is flagged as malicious by multiple security vendors."
            },
            Indicator::ExtremelyNewDomain => {
                "This domain was registered only days ago, a strong indicator of malicious intent."
            },
            Indicator::RecentlyCreatedDomain => {
                "This domain was registered recently, which is a common indicator of malicious intent."
            },
            Indicator::IpVeryHighAbuse => {
                "This site is hosted on an IP address with a very high record of reported abuse."
            },
            Indicator::IpModerateAbuse => {
                "This site is hosted on an IP address with reported abusive activity."
            },
            Indicator::HighSuspiciousFlags => {
                "Many security vendors consider this URL suspicious."
            },
            Indicator::MultipleSuspiciousFlags => {
                "Several security vendors consider this URL suspicious."
            },
            Indicator::YoungDomain => {
                "This domain is only a few months old. Exercise caution when visiting."
            },
            Indicator::InvalidCertificate => {
                "This site does not present a valid TLS certificate. Your connection may not be secure."
            },
            Indicator::VeryNewCertificate => {
                "This site's TLS certificate was issued within the last week."
            },
            Indicator::RecentlyIssuedCertificate => {
                "This site's TLS certificate was issued recently."
            },
            Indicator::UsesDomainPrivacy => {
                "The owner of this domain is hidden behind a privacy protection service."
            },
            Indicator::OutdatedTlsProtocol => {
                "This site only supports outdated TLS protocol versions."
            },
            Indicator::LimitedIntelligenceData => {
                "Limited threat intelligence was available for this URL. Treat this result with care."
            },
        }
    }
}

impl fmt::Display for Indicator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.code())
    }
}

// =============================================================================
// ASSESSMENT & VERDICT
// =============================================================================

/// Pure output of the verdict engine, before evidence and bookkeeping are attached
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Assessment {
    pub trust_score: u8,
    pub confidence: Confidence,
    pub classification: Classification,
    pub summary: String,
    pub indicators: Vec<Indicator>,
    pub sources_available: u8,
}

impl Assessment {
    pub fn has_critical_indicator(&self) -> bool {
        self.indicators.iter().any(Indicator::is_critical)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
#[schema(example = json!({
    "trustScore": 100,
    "confidence": "HIGH",
    "classification": "SAFE",
    "summary": "This URL shows strong signs of legitimacy across every intelligence source we checked.",
    "indicators": [],
    "computedAt": "2024-01-01T12:00:00Z",
    "tookMillis": 2140,
    "servedFromCache": false
}))]
pub struct Verdict {
    pub trust_score: u8,
    pub confidence: Confidence,
    pub classification: Classification,
    pub summary: String,
    pub indicators: Vec<Indicator>,
    pub evidence: EvidenceRecord,
    pub computed_at: DateTime<Utc>,
    pub took_millis: u64,
    pub served_from_cache: bool,
}

impl Verdict {
    pub fn from_assessment(
        assessment: Assessment,
        evidence: EvidenceRecord,
        computed_at: DateTime<Utc>,
        took_millis: u64,
    ) -> Self {
        Self {
            trust_score: assessment.trust_score,
            confidence: assessment.confidence,
            classification: assessment.classification,
            summary: assessment.summary,
            indicators: assessment.indicators,
            evidence,
            computed_at,
            took_millis,
            served_from_cache: false,
        }
    }

    pub fn is_threat(&self) -> bool {
        self.classification == Classification::Dangerous
    }

    /// Copy of this verdict marked as served from the cache
    pub fn as_cached(&self) -> Self {
        Self {
            served_from_cache: true,
            ..self.clone()
        }
    }
}
