pub mod evidence;
pub mod scan_record;
pub mod verdict;

// Re-export common types
pub use evidence::{
    BlocklistStatus, CertificateFacts, EvidenceRecord, RegistrationFacts, ReputationFacts,
};
pub use scan_record::{NewScanRecord, ScanRecord, SCAN_TYPE_COMPREHENSIVE};
pub use verdict::{
    Assessment, Classification, Confidence, Indicator, IndicatorTier, Verdict,
};
