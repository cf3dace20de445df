// Collectors against a local vendor stand-in: garbled responses must end as unknown

use axum::{
    http::{header, StatusCode},
    response::IntoResponse,
    routing::{get, post},
    Router,
};
use trustscan_backend_core::{
    app_config::IntelConfig,
    collectors::{
        BlocklistChecker, ReputationScanner, SafeBrowsingChecker, ScanReport, VirusTotalScanner,
    },
    models::BlocklistStatus,
};

/// Serve `router` on an ephemeral port and return its base URL
async fn spawn_vendor(router: Router) -> String {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, router).await.unwrap();
    });
    format!("http://{}", addr)
}

fn json_response(status: StatusCode, body: &'static str) -> impl IntoResponse {
    (status, [(header::CONTENT_TYPE, "application/json")], body)
}

fn intel_config() -> IntelConfig {
    IntelConfig {
        safe_browsing_api_key: Some("test-key".to_string()),
        virustotal_api_key: Some("test-key".to_string()),
        reputation_poll_attempts: 2,
        reputation_poll_interval_ms: 0,
        ..IntelConfig::default()
    }
}

async fn blocklist_status(status: StatusCode, body: &'static str) -> BlocklistStatus {
    let router = Router::new().fallback(move || async move { json_response(status, body) });
    let config = IntelConfig {
        safe_browsing_api_url: spawn_vendor(router).await,
        ..intel_config()
    };

    SafeBrowsingChecker::new(reqwest::Client::new(), &config)
        .check("https://example.com/")
        .await
        .status
}

async fn scan_with_analysis(body: &'static str) -> ScanReport {
    let router = Router::new()
        .route(
            "/urls",
            post(|| async { json_response(StatusCode::OK, r#"{"data":{"id":"analysis-1"}}"#) }),
        )
        .route(
            "/analyses/{id}",
            get(move || async move { json_response(StatusCode::OK, body) }),
        );
    let config = IntelConfig {
        virustotal_api_url: spawn_vendor(router).await,
        ..intel_config()
    };

    VirusTotalScanner::new(reqwest::Client::new(), &config)
        .scan("https://example.com/")
        .await
}

#[tokio::test]
async fn test_blocklist_well_formed_responses() {
    assert_eq!(blocklist_status(StatusCode::OK, "{}").await, BlocklistStatus::Safe);
    assert_eq!(
        blocklist_status(StatusCode::OK, r#"{"matches":[]}"#).await,
        BlocklistStatus::Safe
    );
    assert_eq!(
        blocklist_status(StatusCode::OK, r#"{"matches":[{"threatType":"MALWARE"}]}"#).await,
        BlocklistStatus::Dangerous
    );
}

#[tokio::test]
async fn test_blocklist_garbled_responses_are_unknown() {
    for body in [
        "null",
        r#""oops""#,
        "[1,2]",
        r#"{"matches":"garbage"}"#,
        r#"{"error":{"code":400,"message":"API key not valid"}}"#,
        "not json at all",
    ] {
        assert_eq!(
            blocklist_status(StatusCode::OK, body).await,
            BlocklistStatus::Unknown,
            "body {}",
            body
        );
    }
}

#[tokio::test]
async fn test_blocklist_http_failure_is_unknown() {
    assert_eq!(
        blocklist_status(StatusCode::INTERNAL_SERVER_ERROR, "{}").await,
        BlocklistStatus::Unknown
    );
}

#[tokio::test]
async fn test_reputation_completed_analysis() {
    let report = scan_with_analysis(
        r#"{"data":{"attributes":{"status":"completed","stats":{"harmless":60,"malicious":2,"suspicious":1,"undetected":7}}}}"#,
    )
    .await;
    assert_eq!(report, ScanReport::completed(2, 1, 70));
}

#[tokio::test]
async fn test_reputation_garbled_analysis_is_unknown() {
    for body in [
        "null",
        "[1,2]",
        r#"{"data":{}}"#,
        r#"{"data":{"attributes":{"status":"completed","stats":{"malicious":"3"}}}}"#,
        // Never completes within the poll budget
        r#"{"data":{"attributes":{"status":"queued"}}}"#,
    ] {
        assert_eq!(scan_with_analysis(body).await, ScanReport::unknown(), "body {}", body);
    }
}
