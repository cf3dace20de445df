// Common test utilities: fake collectors with call counters, evidence builders
// and a store that always fails. Shared across all test files.

#![allow(dead_code)]

use async_trait::async_trait;
use std::net::{IpAddr, Ipv4Addr};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use trustscan_backend_core::{
    collectors::{
        AbuseLookup, AbuseReport, BlocklistChecker, BlocklistReport, CertificateInspector,
        Collectors, DnsResolver, RegistrationLookup, ReputationScanner, ScanReport,
    },
    models::{
        BlocklistStatus, CertificateFacts, EvidenceRecord, NewScanRecord, RegistrationFacts,
        ScanRecord,
    },
    services::{
        Aggregator, AnalysisService, CacheError, VerdictCache, VerdictEngine, VerdictStore,
    },
};

pub const TEST_IP: IpAddr = IpAddr::V4(Ipv4Addr::new(93, 184, 216, 34));

// =============================================================================
// FAKE COLLECTORS
// =============================================================================

/// Number of invocations per collector
#[derive(Debug, Default)]
pub struct CallCounter {
    pub dns: AtomicUsize,
    pub registration: AtomicUsize,
    pub certificate: AtomicUsize,
    pub reputation: AtomicUsize,
    pub blocklist: AtomicUsize,
    pub abuse: AtomicUsize,
}

impl CallCounter {
    pub fn total(&self) -> usize {
        [
            &self.dns,
            &self.registration,
            &self.certificate,
            &self.reputation,
            &self.blocklist,
            &self.abuse,
        ]
        .iter()
        .map(|c| c.load(Ordering::SeqCst))
        .sum()
    }

    pub fn get(counter: &AtomicUsize) -> usize {
        counter.load(Ordering::SeqCst)
    }
}

/// Canned collector outputs plus failure knobs
#[derive(Debug, Clone)]
pub struct FakeIntel {
    pub ip: Option<IpAddr>,
    pub registration: RegistrationFacts,
    pub certificate: CertificateFacts,
    pub scan: ScanReport,
    pub blocklist: BlocklistReport,
    pub abuse: AbuseReport,
    pub threat_intel_configured: bool,
    pub abuse_configured: bool,
    pub panic_on_scan: bool,
    pub blocklist_delay: Option<Duration>,
}

impl FakeIntel {
    /// Old domain, clean reputation, valid certificate, low abuse
    pub fn clean() -> Self {
        Self {
            ip: Some(TEST_IP),
            registration: RegistrationFacts {
                age_days: Some(4000),
                registrar: Some("Example Registrar, Inc.".to_string()),
                privacy_protected: Some(false),
                ..RegistrationFacts::default()
            },
            certificate: valid_certificate(400),
            scan: ScanReport::completed(0, 0, 90),
            blocklist: BlocklistReport::safe(),
            abuse: AbuseReport {
                confidence: Some(2),
                total_reports: Some(1),
            },
            threat_intel_configured: true,
            abuse_configured: true,
            panic_on_scan: false,
            blocklist_delay: None,
        }
    }

    /// Blocklisted, several engine detections, registered two days ago
    pub fn malicious() -> Self {
        Self {
            registration: RegistrationFacts {
                age_days: Some(2),
                privacy_protected: Some(true),
                ..RegistrationFacts::default()
            },
            scan: ScanReport::completed(5, 3, 90),
            blocklist: BlocklistReport::dangerous(vec!["SOCIAL_ENGINEERING".to_string()]),
            abuse: AbuseReport::unknown(),
            ..Self::clean()
        }
    }

    /// Every collector reports its unknown state
    pub fn all_unknown() -> Self {
        Self {
            ip: None,
            registration: RegistrationFacts::unknown(),
            certificate: CertificateFacts::unavailable(),
            scan: ScanReport::unknown(),
            blocklist: BlocklistReport::unknown(),
            abuse: AbuseReport::unknown(),
            ..Self::clean()
        }
    }
}

pub struct FakeSource {
    intel: FakeIntel,
    calls: Arc<CallCounter>,
}

fn bump(counter: &AtomicUsize) {
    counter.fetch_add(1, Ordering::SeqCst);
}

#[async_trait]
impl DnsResolver for FakeSource {
    async fn resolve(&self, _domain: &str) -> Option<IpAddr> {
        bump(&self.calls.dns);
        self.intel.ip
    }
}

#[async_trait]
impl RegistrationLookup for FakeSource {
    async fn lookup(&self, _domain: &str) -> RegistrationFacts {
        bump(&self.calls.registration);
        self.intel.registration.clone()
    }
}

#[async_trait]
impl CertificateInspector for FakeSource {
    async fn inspect(&self, _domain: &str) -> CertificateFacts {
        bump(&self.calls.certificate);
        self.intel.certificate.clone()
    }
}

#[async_trait]
impl ReputationScanner for FakeSource {
    fn is_configured(&self) -> bool {
        self.intel.threat_intel_configured
    }

    async fn scan(&self, _url: &str) -> ScanReport {
        bump(&self.calls.reputation);
        if self.intel.panic_on_scan {
            panic!("reputation scanner exploded");
        }
        self.intel.scan.clone()
    }
}

#[async_trait]
impl BlocklistChecker for FakeSource {
    fn is_configured(&self) -> bool {
        self.intel.threat_intel_configured
    }

    async fn check(&self, _url: &str) -> BlocklistReport {
        bump(&self.calls.blocklist);
        if let Some(delay) = self.intel.blocklist_delay {
            tokio::time::sleep(delay).await;
        }
        self.intel.blocklist.clone()
    }
}

#[async_trait]
impl AbuseLookup for FakeSource {
    fn is_configured(&self) -> bool {
        self.intel.abuse_configured
    }

    async fn abuse_confidence(&self, _ip: IpAddr) -> AbuseReport {
        bump(&self.calls.abuse);
        self.intel.abuse.clone()
    }
}

/// Collector set backed by one fake, plus its call counters
pub fn fake_collectors(intel: FakeIntel) -> (Collectors, Arc<CallCounter>) {
    let calls = Arc::new(CallCounter::default());
    let source = Arc::new(FakeSource {
        intel,
        calls: calls.clone(),
    });

    let collectors = Collectors {
        dns: source.clone(),
        registration: source.clone(),
        certificate: source.clone(),
        reputation: source.clone(),
        blocklist: source.clone(),
        abuse: source,
    };

    (collectors, calls)
}

pub fn test_aggregator(intel: FakeIntel) -> (Aggregator, Arc<CallCounter>) {
    let (collectors, calls) = fake_collectors(intel);
    (Aggregator::new(collectors, Duration::from_secs(2)), calls)
}

/// Analysis service over fake collectors and the given store
pub fn test_service(
    intel: FakeIntel,
    store: Arc<dyn VerdictStore>,
) -> (AnalysisService, Arc<CallCounter>) {
    let (aggregator, calls) = test_aggregator(intel);
    let cache = VerdictCache::new(store, Duration::from_secs(3600));
    (
        AnalysisService::new(aggregator, VerdictEngine::default(), cache),
        calls,
    )
}

// =============================================================================
// EVIDENCE BUILDERS
// =============================================================================

pub fn valid_certificate(age_days: i64) -> CertificateFacts {
    CertificateFacts {
        available: true,
        is_valid: true,
        issuer: Some("R3".to_string()),
        valid_from: None,
        valid_to: None,
        days_to_expiry: Some(60),
        signature_algorithm: Some("SHA256withRSA".to_string()),
        protocols: vec!["TLS 1.2".to_string(), "TLS 1.3".to_string()],
        extended_validation: false,
        age_days: Some(age_days),
    }
}

/// Evidence for a long-established, clean site
pub fn safe_evidence() -> EvidenceRecord {
    let mut evidence = EvidenceRecord::empty("example.com");
    evidence.reputation.malicious_count = Some(0);
    evidence.reputation.suspicious_count = Some(0);
    evidence.reputation.engines_total = Some(90);
    evidence.reputation.blocklist = BlocklistStatus::Safe;
    evidence.reputation.abuse_confidence = Some(2);
    evidence.registration.age_days = Some(4000);
    evidence.registration.privacy_protected = Some(false);
    evidence.certificate = valid_certificate(400);
    evidence
}

/// Evidence for a freshly registered, blocklisted site
pub fn dangerous_evidence() -> EvidenceRecord {
    let mut evidence = EvidenceRecord::empty("examp1e-login.com");
    evidence.reputation.malicious_count = Some(5);
    evidence.reputation.suspicious_count = Some(0);
    evidence.reputation.blocklist = BlocklistStatus::Dangerous;
    evidence.registration.age_days = Some(2);
    evidence
}

// =============================================================================
// FAILING STORE
// =============================================================================

/// Store whose every operation fails
pub struct FailingStore;

#[async_trait]
impl VerdictStore for FailingStore {
    async fn insert(&self, _record: NewScanRecord) -> Result<(), CacheError> {
        Err(CacheError::Pool("store offline".to_string()))
    }

    async fn latest_within_ttl(
        &self,
        _url: &str,
        _ttl: Duration,
    ) -> Result<Option<ScanRecord>, CacheError> {
        Err(CacheError::Pool("store offline".to_string()))
    }

    async fn health_check(&self) -> Result<(), CacheError> {
        Err(CacheError::Pool("store offline".to_string()))
    }

    fn backend_name(&self) -> &'static str {
        "failing"
    }
}
