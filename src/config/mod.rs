// Configuration modules for the TrustScan backend

pub mod scoring;

pub use scoring::{
    AbuseRules, BaseScores, CeilingPenalty, CertificateRules, ClassificationThresholds,
    CriticalRules, DomainAgeRules, ScoringPolicy, SuspiciousRules,
};
