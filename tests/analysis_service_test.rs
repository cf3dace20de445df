// Analysis boundary: validation, caching and error mapping

mod common;

use common::{test_service, FailingStore, FakeIntel};
use std::sync::Arc;
use trustscan_backend_core::{
    db::InMemoryVerdictStore,
    models::{Classification, Confidence, Indicator},
    services::{AnalysisEnvelope, MAXIMAL_TRUST_SUMMARY},
    AnalysisError,
};

#[tokio::test]
async fn test_malformed_input_never_reaches_collectors() {
    let store = Arc::new(InMemoryVerdictStore::new());
    let (service, calls) = test_service(FakeIntel::clean(), store.clone());

    for raw in ["not a url", "", "   ", "ftp://example.com/file", "javascript:alert(1)"] {
        let result = service.analyze(raw).await;
        assert!(
            matches!(result, Err(AnalysisError::InvalidUrl(_))),
            "{:?} should be rejected",
            raw
        );
    }

    assert_eq!(calls.total(), 0);
    assert!(store.is_empty().await);
}

#[tokio::test]
async fn test_clean_site_end_to_end() {
    let store = Arc::new(InMemoryVerdictStore::new());
    let (service, _calls) = test_service(FakeIntel::clean(), store.clone());

    let verdict = service.analyze("https://example.com").await.unwrap();

    assert_eq!(verdict.classification, Classification::Safe);
    assert_eq!(verdict.confidence, Confidence::High);
    assert_eq!(verdict.trust_score, 100);
    assert_eq!(verdict.summary, MAXIMAL_TRUST_SUMMARY);
    assert!(!verdict.served_from_cache);
    assert_eq!(verdict.evidence.domain, "example.com");
    assert_eq!(store.len().await, 1);
}

#[tokio::test]
async fn test_malicious_site_end_to_end() {
    let store = Arc::new(InMemoryVerdictStore::new());
    let (service, _calls) = test_service(FakeIntel::malicious(), store);

    let verdict = service.analyze("http://examp1e-login.com/verify").await.unwrap();

    assert_eq!(verdict.classification, Classification::Dangerous);
    assert_eq!(verdict.trust_score, 0);
    assert_eq!(verdict.indicators[0], Indicator::BlocklistFlagged);
    assert!(verdict.is_threat());
}

#[tokio::test]
async fn test_second_request_is_served_from_cache() {
    let store = Arc::new(InMemoryVerdictStore::new());
    let (service, calls) = test_service(FakeIntel::clean(), store.clone());

    let first = service.analyze("https://example.com").await.unwrap();
    let calls_after_first = calls.total();
    assert!(calls_after_first > 0);

    // Same URL after normalization
    let second = service.analyze("  https://EXAMPLE.com/  ").await.unwrap();

    assert!(second.served_from_cache);
    assert_eq!(second.trust_score, first.trust_score);
    assert_eq!(second.indicators, first.indicators);
    assert_eq!(calls.total(), calls_after_first);
    assert_eq!(store.len().await, 1);
}

#[tokio::test]
async fn test_failing_store_does_not_fail_analysis() {
    let (service, calls) = test_service(FakeIntel::clean(), Arc::new(FailingStore));

    let verdict = service.analyze("https://example.com").await.unwrap();
    assert!(!verdict.served_from_cache);
    assert_eq!(verdict.classification, Classification::Safe);

    // Nothing was cached, so the collectors run again
    let before = calls.total();
    service.analyze("https://example.com").await.unwrap();
    assert!(calls.total() > before);
}

#[tokio::test]
async fn test_all_collectors_failing_reports_unavailable() {
    let store = Arc::new(InMemoryVerdictStore::new());
    let (service, _calls) = test_service(FakeIntel::all_unknown(), store.clone());

    let result = service.analyze("https://example.com").await;

    assert_eq!(result.unwrap_err(), AnalysisError::IntelligenceUnavailable);
    assert!(store.is_empty().await);
}

#[tokio::test]
async fn test_respond_wraps_errors_in_envelope() {
    let (service, _calls) = test_service(
        FakeIntel::all_unknown(),
        Arc::new(InMemoryVerdictStore::new()),
    );

    match service.respond("https://example.com").await {
        AnalysisEnvelope::Error { message } => {
            assert_eq!(message, AnalysisError::IntelligenceUnavailable.message());
        },
        other => panic!("expected error envelope, got {:?}", other),
    }
}
