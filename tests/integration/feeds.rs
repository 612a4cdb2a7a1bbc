use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use axum::http::StatusCode;
use axum::routing::get;
use axum::Router;
use lay_arb::error::FetchError;
use lay_arb::feeds::{FileFeedFetcher, HttpFeedFetcher};
use lay_arb::notify::MockNotifier;
use lay_arb::scan::{CycleOutcome, Scanner, ScannerSettings};
use pretty_assertions::assert_eq;
use rust_decimal_macros::dec;

use crate::common::{COMPARATOR, REFERENCE, T0};

const REFERENCE_SNAPSHOT: &str = r#"[
    {"home": "Arsenal", "away": "Chelsea", "market": "1X2", "selection": "1", "kind": "LAY", "price": "2,00"},
    {"home": "Everton", "away": "Fulham", "market": "1X2", "selection": "2", "kind": "LAY", "price": 3.1},
    {"home": "Everton", "away": "Fulham", "market": "1X2", "selection": "X", "kind": "LAY"}
]"#;

const COMPARATOR_SNAPSHOT: &str = r#"{"quotes": [
    {"home": "Arsenal FC", "away": "Chelsea FC", "market": "Maç Sonucu", "selection": "MS 1", "odds": 2.2},
    {"home": "Everton", "away": "Fulham", "market": "1X2", "selection": "2", "odds": 3.2}
]}"#;

fn write_snapshot(name: &str, body: &str) -> PathBuf {
    let path = std::env::temp_dir().join(format!(
        "lay-arb-it-{}-{}.json",
        name,
        std::process::id()
    ));
    std::fs::write(&path, body).unwrap();
    path
}

/// Serve `/reference` and `/comparator` snapshots on an ephemeral port.
async fn serve_snapshots(comparator_status: StatusCode) -> String {
    let app = Router::new()
        .route("/reference", get(|| async { REFERENCE_SNAPSHOT }))
        .route(
            "/comparator",
            get(move || async move { (comparator_status, COMPARATOR_SNAPSHOT) }),
        );

    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });

    format!("http://{}", addr)
}

#[tokio::test]
async fn file_snapshots_drive_a_full_cycle() {
    let reference = write_snapshot("reference", REFERENCE_SNAPSHOT);
    let comparator = write_snapshot("comparator", COMPARATOR_SNAPSHOT);
    let notifier = MockNotifier::new();
    let scanner = Scanner::new(
        Arc::new(FileFeedFetcher::new(REFERENCE, &reference)),
        Arc::new(FileFeedFetcher::new(COMPARATOR, &comparator)),
        Arc::new(notifier.clone()),
        ScannerSettings::default(),
    );

    let report = scanner.run_cycle(T0).await;

    std::fs::remove_file(reference).ok();
    std::fs::remove_file(comparator).ok();

    assert_eq!(report.outcome, CycleOutcome::Completed);
    assert_eq!(report.reference_quotes, 2);
    assert_eq!(report.comparator_quotes, 2);
    assert_eq!(report.rejected, 1);
    assert_eq!(report.detected, 2);
    assert_eq!(report.alerted.len(), 2);
    assert_eq!(report.alerted[0].diff_pct, dec!(10));
    assert_eq!(report.alerted[0].comparator.source, COMPARATOR);
    assert_eq!(notifier.send_count(), 1);
}

#[tokio::test]
async fn http_snapshots_drive_a_full_cycle() {
    let base = serve_snapshots(StatusCode::OK).await;
    let timeout = Duration::from_secs(5);
    let notifier = MockNotifier::new();
    let scanner = Scanner::new(
        Arc::new(HttpFeedFetcher::new(REFERENCE, &format!("{}/reference", base), timeout)),
        Arc::new(HttpFeedFetcher::new(COMPARATOR, &format!("{}/comparator", base), timeout)),
        Arc::new(notifier.clone()),
        ScannerSettings::default(),
    );

    let report = scanner.run_cycle(T0).await;

    assert_eq!(report.outcome, CycleOutcome::Completed);
    let keys: Vec<_> = report.alerted.iter().map(|o| o.key.home.as_str()).collect();
    assert_eq!(keys, vec!["arsenal", "everton"]);
    assert_eq!(notifier.opportunities().len(), 2);
}

#[tokio::test]
async fn server_error_skips_the_cycle() {
    let base = serve_snapshots(StatusCode::INTERNAL_SERVER_ERROR).await;
    let timeout = Duration::from_secs(5);
    let notifier = MockNotifier::new();
    let scanner = Scanner::new(
        Arc::new(HttpFeedFetcher::new(REFERENCE, &format!("{}/reference", base), timeout)),
        Arc::new(HttpFeedFetcher::new(COMPARATOR, &format!("{}/comparator", base), timeout)),
        Arc::new(notifier.clone()),
        ScannerSettings::default(),
    );

    let report = scanner.run_cycle(T0).await;

    assert_eq!(report.outcome, CycleOutcome::Skipped);
    assert!(matches!(
        &report.fetch_errors[..],
        [FetchError::Status { source_name, status: 500 }] if source_name == COMPARATOR
    ));
    assert!(report.alerted.is_empty());
    assert_eq!(notifier.send_count(), 0);
}

#[tokio::test]
async fn wrongly_typed_record_does_not_sink_the_snapshot() {
    let reference = write_snapshot(
        "reference-mixed",
        r#"[
            {"home": "Arsenal", "away": "Chelsea", "market": "1X2", "selection": "1", "kind": "LAY", "price": "2.00"},
            {"home": "Everton", "away": "Fulham", "market": "1X2", "selection": "1", "kind": "LAY", "price": "2.00", "kickoff": 1709294400},
            {"home": "Brentford", "away": "Wolves", "market": "1X2", "selection": "1", "kind": "LAY", "price": true}
        ]"#,
    );
    let comparator = write_snapshot("comparator-mixed", COMPARATOR_SNAPSHOT);
    let notifier = MockNotifier::new();
    let scanner = Scanner::new(
        Arc::new(FileFeedFetcher::new(REFERENCE, &reference)),
        Arc::new(FileFeedFetcher::new(COMPARATOR, &comparator)),
        Arc::new(notifier.clone()),
        ScannerSettings::default(),
    );

    let report = scanner.run_cycle(T0).await;

    std::fs::remove_file(reference).ok();
    std::fs::remove_file(comparator).ok();

    assert_eq!(report.outcome, CycleOutcome::Completed);
    assert_eq!(report.reference_quotes, 1);
    assert_eq!(report.rejected, 2);
    assert_eq!(report.alerted.len(), 1);
    assert_eq!(report.alerted[0].diff_pct, dec!(10));
}
