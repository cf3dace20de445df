// Evidence aggregation
// Fans out to every collector at once and merges whatever comes back.
// A collector that panics or overruns its budget contributes unknown facts.

use std::future::Future;
use std::net::IpAddr;
use std::time::{Duration, Instant};
use thiserror::Error;
use tracing::{debug, error, info, instrument, warn};

use crate::collectors::{AbuseReport, BlocklistReport, Collectors, ScanReport};
use crate::models::{
    CertificateFacts, EvidenceRecord, RegistrationFacts, ReputationFacts,
};
use crate::utils::url_validator::NormalizedUrl;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum AggregationError {
    #[error("Neither the reputation scanner nor the blocklist produced a result")]
    NoThreatIntelligence,
}

pub struct Aggregator {
    collectors: Collectors,
    collector_timeout: Duration,
}

impl Aggregator {
    pub fn new(collectors: Collectors, collector_timeout: Duration) -> Self {
        Self {
            collectors,
            collector_timeout,
        }
    }

    pub fn collectors(&self) -> &Collectors {
        &self.collectors
    }

    /// Gather evidence for one URL from every source concurrently
    #[instrument(skip(self, target), fields(domain = %target.domain))]
    pub async fn collect(&self, target: &NormalizedUrl) -> Result<EvidenceRecord, AggregationError> {
        if !self.collectors.has_threat_intelligence() {
            warn!("No reputation scanner or blocklist is configured");
            return Err(AggregationError::NoThreatIntelligence);
        }

        let started = Instant::now();
        let budget = self.collector_timeout;
        let domain = target.domain.clone();
        let url = target.normalized.clone();

        let registration = {
            let collector = self.collectors.registration.clone();
            let domain = domain.clone();
            settle("registration", budget, async move { collector.lookup(&domain).await })
        };

        let certificate = {
            let collector = self.collectors.certificate.clone();
            let domain = domain.clone();
            settle("certificate", budget, async move { collector.inspect(&domain).await })
        };

        let reputation = {
            let collector = self.collectors.reputation.clone();
            let url = url.clone();
            settle("reputation", budget, async move { collector.scan(&url).await })
        };

        let blocklist = {
            let collector = self.collectors.blocklist.clone();
            let url = url.clone();
            settle("blocklist", budget, async move { collector.check(&url).await })
        };

        let (registration, certificate, scan, blocklist, (ip, abuse)) = tokio::join!(
            registration,
            certificate,
            reputation,
            blocklist,
            self.resolve_and_check_abuse(domain.clone()),
        );

        let mut registration = registration.unwrap_or_else(RegistrationFacts::unknown);
        registration.ip_address = ip;

        let evidence = EvidenceRecord {
            domain,
            certificate: certificate.unwrap_or_else(CertificateFacts::unavailable),
            registration,
            reputation: merge_reputation(
                scan.unwrap_or_else(ScanReport::unknown),
                blocklist.unwrap_or_else(BlocklistReport::unknown),
                abuse,
            ),
        };

        debug!(
            sources_available = evidence.sources_available(),
            elapsed_ms = started.elapsed().as_millis() as u64,
            "Evidence collected"
        );

        if evidence.lacks_threat_intelligence() {
            warn!("Reputation scanner and blocklist both returned unknown");
            return Err(AggregationError::NoThreatIntelligence);
        }

        info!(
            sources_available = evidence.sources_available(),
            "Evidence aggregation completed"
        );
        Ok(evidence)
    }

    /// DNS first, then the abuse lookup for the resolved address
    async fn resolve_and_check_abuse(&self, domain: String) -> (Option<IpAddr>, AbuseReport) {
        let dns = self.collectors.dns.clone();
        let ip = settle("dns", self.collector_timeout, async move {
            dns.resolve(&domain).await
        })
        .await
        .flatten();

        let Some(ip) = ip else {
            debug!("No address resolved, skipping abuse lookup");
            return (None, AbuseReport::unknown());
        };

        if !self.collectors.abuse.is_configured() {
            return (Some(ip), AbuseReport::unknown());
        }

        let abuse = self.collectors.abuse.clone();
        let report = settle("abuse", self.collector_timeout, async move {
            abuse.abuse_confidence(ip).await
        })
        .await
        .unwrap_or_else(AbuseReport::unknown);

        (Some(ip), report)
    }
}

/// Run a collector in its own task under a time budget.
/// `None` means the task panicked or timed out; both are logged here.
async fn settle<T, F>(source: &'static str, budget: Duration, collector: F) -> Option<T>
where
    F: Future<Output = T> + Send + 'static,
    T: Send + 'static,
{
    let mut handle = tokio::spawn(collector);

    match tokio::time::timeout(budget, &mut handle).await {
        Ok(Ok(value)) => Some(value),
        Ok(Err(e)) => {
            error!(source, error = %e, "Collector task failed");
            None
        },
        Err(_) => {
            handle.abort();
            warn!(
                source,
                timeout_ms = budget.as_millis() as u64,
                "Collector timed out"
            );
            None
        },
    }
}

fn merge_reputation(
    scan: ScanReport,
    blocklist: BlocklistReport,
    abuse: AbuseReport,
) -> ReputationFacts {
    ReputationFacts {
        malicious_count: scan.malicious,
        suspicious_count: scan.suspicious,
        engines_total: scan.engines_total,
        blocklist: blocklist.status,
        blocklist_threats: blocklist.threats,
        abuse_confidence: abuse.confidence,
        abuse_reports: abuse.total_reports,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::BlocklistStatus;

    #[tokio::test(start_paused = true)]
    async fn test_settle_times_out() {
        let result = settle("slow", Duration::from_secs(1), async {
            tokio::time::sleep(Duration::from_secs(60)).await;
            42
        })
        .await;
        assert_eq!(result, None);
    }

    #[tokio::test]
    async fn test_settle_contains_panics() {
        let result: Option<u8> = settle("broken", Duration::from_secs(1), async {
            panic!("collector exploded");
        })
        .await;
        assert_eq!(result, None);
    }

    #[tokio::test]
    async fn test_settle_passes_values_through() {
        assert_eq!(
            settle("fast", Duration::from_secs(1), async { "ok" }).await,
            Some("ok")
        );
    }

    #[test]
    fn test_merge_reputation() {
        let merged = merge_reputation(
            ScanReport::completed(2, 1, 90),
            BlocklistReport::dangerous(vec!["MALWARE".to_string()]),
            AbuseReport {
                confidence: Some(40),
                total_reports: Some(12),
            },
        );

        assert_eq!(merged.malicious_count, Some(2));
        assert_eq!(merged.blocklist, BlocklistStatus::Dangerous);
        assert_eq!(merged.blocklist_threats, vec!["MALWARE"]);
        assert_eq!(merged.abuse_confidence, Some(40));
    }
}
