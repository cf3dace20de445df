// Trust scoring policy
// All weights, ceilings and thresholds used by the verdict engine live here

use serde::{Deserialize, Serialize};

/// Base score and confidence bands, keyed by how many sources were available
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BaseScores {
    /// 3 or more sources
    pub high_confidence: i32,
    /// exactly 2 sources
    pub medium_confidence: i32,
    /// 0 or 1 source
    pub low_confidence: i32,
    pub high_confidence_min_sources: u8,
    pub medium_confidence_min_sources: u8,
}

/// A penalty applied as `min(score - penalty, ceiling)`
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct CeilingPenalty {
    pub penalty: i32,
    pub ceiling: i32,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CriticalRules {
    pub blocklist: CeilingPenalty,
    /// Penalty is `per_detection * malicious + penalty`
    pub malicious: CeilingPenalty,
    pub malicious_per_detection: i32,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DomainAgeRules {
    pub extremely_new_days: i64,
    pub extremely_new_penalty: i32,
    pub recent_days: i64,
    pub recent_penalty: i32,
    pub young_days: i64,
    pub young_penalty: i32,
    /// (minimum age in days, bonus), strongest first
    pub age_bonuses: Vec<(i64, i32)>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AbuseRules {
    pub very_high_above: u8,
    pub very_high_penalty: i32,
    pub moderate_above: u8,
    pub moderate_penalty: i32,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SuspiciousRules {
    pub high_above: u32,
    pub high_penalty: i32,
    pub multiple_above: u32,
    pub multiple_penalty: i32,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CertificateRules {
    pub invalid_penalty: i32,
    pub very_new_days: i64,
    pub very_new_penalty: i32,
    pub recent_days: i64,
    pub recent_penalty: i32,
    pub outdated_protocol_penalty: i32,
    pub extended_validation_bonus: i32,
    pub trusted_issuer_bonus: i32,
    pub trusted_issuers: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClassificationThresholds {
    pub safe_min: u8,
    pub caution_min: u8,
    /// Maximal-trust summary applies at or above this score
    pub maximal_trust_min: u8,
}

/// Complete scoring policy. `Default` is the reference policy.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScoringPolicy {
    pub base: BaseScores,
    pub critical: CriticalRules,
    pub domain_age: DomainAgeRules,
    pub abuse: AbuseRules,
    pub suspicious: SuspiciousRules,
    pub certificate: CertificateRules,
    pub privacy_penalty: i32,
    pub clean_reputation_bonus: i32,
    pub thresholds: ClassificationThresholds,
}

impl Default for ScoringPolicy {
    fn default() -> Self {
        Self {
            base: BaseScores {
                high_confidence: 70,
                medium_confidence: 50,
                low_confidence: 30,
                high_confidence_min_sources: 3,
                medium_confidence_min_sources: 2,
            },
            critical: CriticalRules {
                blocklist: CeilingPenalty {
                    penalty: 60,
                    ceiling: 15,
                },
                malicious: CeilingPenalty {
                    penalty: 45,
                    ceiling: 20,
                },
                malicious_per_detection: 15,
            },
            domain_age: DomainAgeRules {
                extremely_new_days: 7,
                extremely_new_penalty: 35,
                recent_days: 30,
                recent_penalty: 25,
                young_days: 90,
                young_penalty: 15,
                age_bonuses: vec![(3650, 15), (1825, 10), (365, 5)],
            },
            abuse: AbuseRules {
                very_high_above: 75,
                very_high_penalty: 35,
                moderate_above: 25,
                moderate_penalty: 20,
            },
            suspicious: SuspiciousRules {
                high_above: 5,
                high_penalty: 25,
                multiple_above: 2,
                multiple_penalty: 15,
            },
            certificate: CertificateRules {
                invalid_penalty: 20,
                very_new_days: 7,
                very_new_penalty: 15,
                recent_days: 30,
                recent_penalty: 10,
                outdated_protocol_penalty: 10,
                extended_validation_bonus: 8,
                trusted_issuer_bonus: 5,
                trusted_issuers: vec![
                    "DigiCert".to_string(),
                    "Sectigo".to_string(),
                    "GlobalSign".to_string(),
                ],
            },
            privacy_penalty: 8,
            clean_reputation_bonus: 25,
            thresholds: ClassificationThresholds {
                safe_min: 75,
                caution_min: 40,
                maximal_trust_min: 85,
            },
        }
    }
}

impl ScoringPolicy {
    /// Reference policy with classification thresholds overridden
    pub fn with_thresholds(safe_min: u8, caution_min: u8) -> Self {
        let mut policy = Self::default();
        policy.thresholds.safe_min = safe_min;
        policy.thresholds.caution_min = caution_min;
        policy
    }

    pub fn validate(&self) -> Result<(), String> {
        let t = &self.thresholds;
        if t.safe_min > 100 || t.maximal_trust_min > 100 {
            return Err("Thresholds must be within 0-100".to_string());
        }
        if t.caution_min >= t.safe_min {
            return Err(format!(
                "Caution threshold ({}) must be below safe threshold ({})",
                t.caution_min, t.safe_min
            ));
        }
        if self.base.medium_confidence_min_sources >= self.base.high_confidence_min_sources {
            return Err("Medium confidence must require fewer sources than high".to_string());
        }
        if self
            .domain_age
            .age_bonuses
            .windows(2)
            .any(|pair| pair[0].0 <= pair[1].0)
        {
            return Err("Domain age bonuses must be ordered strongest first".to_string());
        }
        Ok(())
    }

    pub fn is_trusted_issuer(&self, issuer: &str) -> bool {
        let issuer = issuer.to_lowercase();
        self.certificate
            .trusted_issuers
            .iter()
            .any(|trusted| issuer.contains(&trusted.to_lowercase()))
    }
}
