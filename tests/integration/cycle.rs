use lay_arb::error::FetchError;
use lay_arb::feeds::{MockFetcher, MockResponse};
use lay_arb::matching::Selection;
use lay_arb::notify::MockNotifier;
use lay_arb::scan::{CycleOutcome, ScannerSettings};
use pretty_assertions::assert_eq;
use rust_decimal_macros::dec;
use time::Duration;

use crate::common::{back, lay, record, scanner, static_scanner, COMPARATOR, REFERENCE, T0};

#[tokio::test]
async fn failed_source_yields_nothing_and_next_cycle_runs() {
    let reference = MockFetcher::scripted(
        REFERENCE,
        vec![
            MockResponse::Fail("connection reset".to_string()),
            MockResponse::Quotes(vec![lay("Arsenal", "2.00")]),
        ],
    );
    let comparator = MockFetcher::new(COMPARATOR, vec![back("Arsenal", "2.20")]);
    let notifier = MockNotifier::new();
    let scanner = scanner(&reference, &comparator, &notifier, ScannerSettings::default());

    let first = scanner.run_cycle(T0).await;

    assert_eq!(first.outcome, CycleOutcome::Skipped);
    assert!(first.alerted.is_empty());
    assert!(matches!(&first.fetch_errors[..], [FetchError::Request { source_name, .. }] if source_name == REFERENCE));
    assert_eq!(notifier.send_count(), 0);

    let second = scanner.run_cycle(T0 + Duration::minutes(1)).await;

    assert_eq!(second.outcome, CycleOutcome::Completed);
    assert_eq!(second.alerted.len(), 1);
    assert_eq!(second.alerted[0].diff_pct, dec!(10));
    assert_eq!(scanner.stats().cycles_skipped(), 1);
    assert_eq!(scanner.stats().cycles_completed(), 1);
}

#[tokio::test]
async fn both_sources_failing_reports_both() {
    let notifier = MockNotifier::new();
    let scanner = scanner(
        &MockFetcher::failing(REFERENCE, "dns"),
        &MockFetcher::failing(COMPARATOR, "tls"),
        &notifier,
        ScannerSettings::default(),
    );

    let report = scanner.run_cycle(T0).await;

    let sources: Vec<_> = report.fetch_errors.iter().map(|e| e.source_name()).collect();
    assert_eq!(sources, vec![REFERENCE, COMPARATOR]);
}

#[tokio::test]
async fn opportunities_arrive_most_profitable_first() {
    let notifier = MockNotifier::new();
    let scanner = static_scanner(
        vec![lay("Arsenal", "2.00"), lay("Brentford", "2.00"), lay("Everton", "2.00")],
        vec![back("Arsenal", "2.10"), back("Brentford", "2.24"), back("Everton", "2.16")],
        &notifier,
    );

    scanner.run_cycle(T0).await;

    let reports = notifier.reports();
    assert_eq!(reports.len(), 1);
    let diffs: Vec<_> = reports[0].iter().map(|o| o.diff_pct).collect();
    assert_eq!(diffs, vec![dec!(12), dec!(8), dec!(5)]);
}

#[tokio::test]
async fn threshold_bounds_hold_through_the_pipeline() {
    let notifier = MockNotifier::new();
    let scanner = static_scanner(
        vec![
            lay("Arsenal", "2.00"),
            lay("Brentford", "2.00"),
            lay("Everton", "2.00"),
            lay("Fulham", "2.00"),
        ],
        vec![
            back("Arsenal", "1.98"),
            back("Brentford", "2.60"),
            back("Everton", "2.6002"),
            back("Fulham", "1.9798"),
        ],
        &notifier,
    );

    let report = scanner.run_cycle(T0).await;

    let homes: Vec<_> = report
        .alerted
        .iter()
        .map(|o| o.reference.event.home.as_str())
        .collect();
    assert_eq!(homes, vec!["Brentford", "Arsenal"]);
}

#[tokio::test]
async fn repeat_alerts_wait_out_the_window() {
    let notifier = MockNotifier::new();
    let scanner = static_scanner(vec![lay("Arsenal", "2.00")], vec![back("Arsenal", "2.20")], &notifier);

    let first = scanner.run_cycle(T0).await;
    let within = scanner.run_cycle(T0 + Duration::minutes(5)).await;
    let after = scanner.run_cycle(T0 + Duration::minutes(11)).await;

    assert_eq!(first.alerted.len(), 1);
    assert_eq!(within.detected, 1);
    assert!(within.alerted.is_empty());
    assert_eq!(after.alerted.len(), 1);
    assert_eq!(notifier.send_count(), 2);
}

#[tokio::test]
async fn small_price_jitter_does_not_realert() {
    let reference = MockFetcher::new(REFERENCE, vec![lay("Arsenal", "2.50")]);
    let comparator = MockFetcher::scripted(
        COMPARATOR,
        vec![
            MockResponse::Quotes(vec![back("Arsenal", "2.74")]),
            MockResponse::Quotes(vec![back("Arsenal", "2.7525")]),
        ],
    );
    let notifier = MockNotifier::new();
    let scanner = scanner(&reference, &comparator, &notifier, ScannerSettings::default());

    let first = scanner.run_cycle(T0).await;
    let second = scanner.run_cycle(T0 + Duration::minutes(1)).await;

    assert_eq!(first.alerted[0].diff_pct, dec!(9.6));
    assert_eq!(second.detected, 1);
    assert!(second.alerted.is_empty());
}

#[tokio::test]
async fn failed_delivery_still_marks_as_alerted() {
    let notifier = MockNotifier::failing();
    let scanner = static_scanner(vec![lay("Arsenal", "2.00")], vec![back("Arsenal", "2.20")], &notifier);

    let first = scanner.run_cycle(T0).await;
    notifier.set_failing(false);
    let second = scanner.run_cycle(T0 + Duration::minutes(2)).await;

    assert_eq!(first.outcome, CycleOutcome::Completed);
    assert_eq!(first.notify_failures, 1);
    assert_eq!(first.alerts_sent, 0);
    assert!(second.alerted.is_empty());
    assert_eq!(notifier.send_count(), 1);
}

#[tokio::test]
async fn spellings_from_both_sites_pair_up() {
    let mut reference = record("Arsenal FC", "X", "LAY", "3,40");
    reference.market = Some("Match Result".to_string());
    let mut comparator = record("arsenal", "Beraberlik", "BACK", "3.60");
    comparator.market = Some("Maç Sonucu".to_string());
    comparator.away = Some("Chelsea F.C.".to_string());

    let notifier = MockNotifier::new();
    let scanner = static_scanner(vec![reference], vec![comparator], &notifier);

    let report = scanner.run_cycle(T0).await;

    assert_eq!(report.alerted.len(), 1);
    let opportunity = &report.alerted[0];
    assert_eq!(opportunity.key.home, "arsenal");
    assert_eq!(opportunity.key.away, "chelsea");
    assert_eq!(opportunity.key.selection, Selection::Draw);
    assert_eq!(opportunity.diff_abs, dec!(0.20));
}

#[tokio::test]
async fn reference_back_quotes_never_alert() {
    let notifier = MockNotifier::new();
    let scanner = static_scanner(vec![back("Arsenal", "2.00")], vec![back("Arsenal", "2.20")], &notifier);

    let report = scanner.run_cycle(T0).await;

    assert_eq!(report.outcome, CycleOutcome::Completed);
    assert_eq!(report.detected, 0);
    assert_eq!(notifier.send_count(), 0);
}
