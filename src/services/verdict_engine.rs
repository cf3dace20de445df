// Verdict engine: evidence in, scored and classified assessment out
// Pure and synchronous. No I/O, no clock, no randomness.

use crate::config::{CeilingPenalty, ScoringPolicy};
use crate::models::{
    Assessment, BlocklistStatus, Classification, Confidence, EvidenceRecord, Indicator,
};

pub const MAXIMAL_TRUST_SUMMARY: &str =
    "This URL shows strong signs of legitimacy across every intelligence source we checked.";

const SAFE_SUMMARY: &str = "No significant threats were detected for this URL.";
const CAUTION_SUMMARY: &str = "This URL shows some risk signals. Proceed with caution.";
const DANGEROUS_SUMMARY: &str =
    "This URL shows multiple signs of malicious activity. Avoid visiting this site.";

/// Running score plus the indicators that fired, in rule order.
/// All arithmetic saturates: detection counts are vendor-controlled.
struct Tally {
    score: i32,
    indicators: Vec<Indicator>,
}

impl Tally {
    fn new(base: i32) -> Self {
        Self {
            score: base,
            indicators: Vec::new(),
        }
    }

    fn flag(&mut self, indicator: Indicator) {
        if !self.indicators.contains(&indicator) {
            self.indicators.push(indicator);
        }
    }

    fn penalize(&mut self, indicator: Indicator, amount: i32) {
        self.score = self.score.saturating_sub(amount);
        self.flag(indicator);
    }

    /// Subtract, then cap at the ceiling so later bonuses cannot lift the score
    fn cap(&mut self, indicator: Indicator, rule: CeilingPenalty, extra: i32) {
        self.score = self
            .score
            .saturating_sub(rule.penalty)
            .saturating_sub(extra)
            .min(rule.ceiling);
        self.flag(indicator);
    }

    fn reward(&mut self, amount: i32) {
        self.score = self.score.saturating_add(amount);
    }

    fn has_critical(&self) -> bool {
        self.indicators.iter().any(Indicator::is_critical)
    }
}

#[derive(Debug, Clone, Default)]
pub struct VerdictEngine {
    policy: ScoringPolicy,
}

impl VerdictEngine {
    pub fn new(policy: ScoringPolicy) -> Self {
        Self { policy }
    }

    pub fn policy(&self) -> &ScoringPolicy {
        &self.policy
    }

    /// Score, classify and explain one evidence record
    pub fn assess(&self, evidence: &EvidenceRecord) -> Assessment {
        let sources_available = evidence.sources_available();
        let (confidence, base) = self.confidence_for(sources_available);

        let mut tally = Tally::new(base);
        if confidence == Confidence::Low {
            tally.flag(Indicator::LimitedIntelligenceData);
        }

        self.apply_critical(evidence, &mut tally);
        self.apply_high(evidence, &mut tally);
        self.apply_medium(evidence, &mut tally);
        self.apply_low(evidence, &mut tally);
        if !tally.has_critical() {
            self.apply_positive(evidence, &mut tally);
        }

        let trust_score = tally.score.clamp(0, 100) as u8;
        let classification = self.classify(trust_score);

        // Stable sort: rule order is kept inside a tier
        let mut indicators = tally.indicators;
        indicators.sort_by_key(Indicator::tier);

        let has_critical = indicators.iter().any(Indicator::is_critical);
        let summary = if confidence == Confidence::High
            && trust_score >= self.policy.thresholds.maximal_trust_min
            && !has_critical
        {
            MAXIMAL_TRUST_SUMMARY.to_string()
        } else {
            indicators
                .first()
                .map(|indicator| indicator.explanation())
                .unwrap_or_else(|| classification_summary(classification))
                .to_string()
        };

        Assessment {
            trust_score,
            confidence,
            classification,
            summary,
            indicators,
            sources_available,
        }
    }

    pub fn classify(&self, trust_score: u8) -> Classification {
        let thresholds = &self.policy.thresholds;
        if trust_score >= thresholds.safe_min {
            Classification::Safe
        } else if trust_score >= thresholds.caution_min {
            Classification::Caution
        } else {
            Classification::Dangerous
        }
    }

    fn confidence_for(&self, sources_available: u8) -> (Confidence, i32) {
        let base = &self.policy.base;
        if sources_available >= base.high_confidence_min_sources {
            (Confidence::High, base.high_confidence)
        } else if sources_available >= base.medium_confidence_min_sources {
            (Confidence::Medium, base.medium_confidence)
        } else {
            (Confidence::Low, base.low_confidence)
        }
    }

    // ===== CRITICAL =====

    fn apply_critical(&self, evidence: &EvidenceRecord, tally: &mut Tally) {
        let rules = &self.policy.critical;
        let reputation = &evidence.reputation;

        if reputation.blocklist == BlocklistStatus::Dangerous {
            tally.cap(Indicator::BlocklistFlagged, rules.blocklist, 0);
        }

        if let Some(malicious) = reputation.malicious_count.filter(|m| *m > 0) {
            let per_detection = i32::try_from(malicious)
                .unwrap_or(i32::MAX)
                .saturating_mul(rules.malicious_per_detection);
            tally.cap(
                Indicator::ReputationMaliciousDetection,
                rules.malicious,
                per_detection,
            );
        }
    }

    // ===== HIGH =====

    fn apply_high(&self, evidence: &EvidenceRecord, tally: &mut Tally) {
        let age = &self.policy.domain_age;
        if let Some(days) = evidence.registration.age_days {
            if days < age.extremely_new_days {
                tally.penalize(Indicator::ExtremelyNewDomain, age.extremely_new_penalty);
            } else if days < age.recent_days {
                tally.penalize(Indicator::RecentlyCreatedDomain, age.recent_penalty);
            }
        }

        let abuse = &self.policy.abuse;
        if let Some(confidence) = evidence.reputation.abuse_confidence {
            if confidence > abuse.very_high_above {
                tally.penalize(Indicator::IpVeryHighAbuse, abuse.very_high_penalty);
            } else if confidence > abuse.moderate_above {
                tally.penalize(Indicator::IpModerateAbuse, abuse.moderate_penalty);
            }
        }
    }

    // ===== MEDIUM =====

    fn apply_medium(&self, evidence: &EvidenceRecord, tally: &mut Tally) {
        let suspicious = &self.policy.suspicious;
        if let Some(count) = evidence.reputation.suspicious_count {
            if count > suspicious.high_above {
                tally.penalize(Indicator::HighSuspiciousFlags, suspicious.high_penalty);
            } else if count > suspicious.multiple_above {
                tally.penalize(Indicator::MultipleSuspiciousFlags, suspicious.multiple_penalty);
            }
        }

        let age = &self.policy.domain_age;
        if let Some(days) = evidence.registration.age_days {
            // Younger domains were already flagged by a stronger rule
            if days >= age.recent_days && days < age.young_days {
                tally.penalize(Indicator::YoungDomain, age.young_penalty);
            }
        }

        let certificate = &evidence.certificate;
        let rules = &self.policy.certificate;
        if !certificate.available {
            return;
        }

        if certificate.is_invalid_or_expired() {
            tally.penalize(Indicator::InvalidCertificate, rules.invalid_penalty);
        }

        if let Some(days) = certificate.age_days {
            if days < rules.very_new_days {
                tally.penalize(Indicator::VeryNewCertificate, rules.very_new_penalty);
            } else if days < rules.recent_days {
                tally.penalize(Indicator::RecentlyIssuedCertificate, rules.recent_penalty);
            }
        }
    }

    // ===== LOW =====

    fn apply_low(&self, evidence: &EvidenceRecord, tally: &mut Tally) {
        if evidence.registration.is_privacy_protected() {
            tally.penalize(Indicator::UsesDomainPrivacy, self.policy.privacy_penalty);
        }

        if evidence.certificate.only_legacy_protocols() {
            tally.penalize(
                Indicator::OutdatedTlsProtocol,
                self.policy.certificate.outdated_protocol_penalty,
            );
        }
    }

    // ===== POSITIVE =====

    fn apply_positive(&self, evidence: &EvidenceRecord, tally: &mut Tally) {
        let reputation = &evidence.reputation;
        if reputation.malicious_count == Some(0) && reputation.blocklist == BlocklistStatus::Safe {
            tally.reward(self.policy.clean_reputation_bonus);
        }

        if let Some(days) = evidence.registration.age_days {
            if let Some((_, bonus)) = self
                .policy
                .domain_age
                .age_bonuses
                .iter()
                .find(|(min_days, _)| days > *min_days)
            {
                tally.reward(*bonus);
            }
        }

        let certificate = &evidence.certificate;
        if certificate.available {
            if certificate.extended_validation {
                tally.reward(self.policy.certificate.extended_validation_bonus);
            }
            if certificate
                .issuer
                .as_deref()
                .is_some_and(|issuer| self.policy.is_trusted_issuer(issuer))
            {
                tally.reward(self.policy.certificate.trusted_issuer_bonus);
            }
        }
    }
}

fn classification_summary(classification: Classification) -> &'static str {
    match classification {
        Classification::Safe => SAFE_SUMMARY,
        Classification::Caution => CAUTION_SUMMARY,
        Classification::Dangerous => DANGEROUS_SUMMARY,
    }
}
