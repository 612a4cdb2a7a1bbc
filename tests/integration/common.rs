use std::sync::Arc;

use lay_arb::feeds::MockFetcher;
use lay_arb::notify::MockNotifier;
use lay_arb::quote::{RawPrice, RawQuote};
use lay_arb::scan::{Scanner, ScannerSettings};
use time::macros::datetime;
use time::OffsetDateTime;

pub const T0: OffsetDateTime = datetime!(2024-03-01 12:00 UTC);

pub const REFERENCE: &str = "orbit";
pub const COMPARATOR: &str = "golbet724";

/// A 1X2 record for `home` vs Chelsea.
pub fn record(home: &str, selection: &str, odds_type: &str, price: &str) -> RawQuote {
    RawQuote {
        home: Some(home.to_string()),
        away: Some("Chelsea".to_string()),
        league: Some("Premier League".to_string()),
        market: Some("1X2".to_string()),
        selection: Some(selection.to_string()),
        odds_type: Some(odds_type.to_string()),
        price: Some(RawPrice::Text(price.to_string())),
        ..RawQuote::default()
    }
}

pub fn lay(home: &str, price: &str) -> RawQuote {
    record(home, "1", "LAY", price)
}

pub fn back(home: &str, price: &str) -> RawQuote {
    record(home, "1", "BACK", price)
}

pub fn scanner(
    reference: &MockFetcher,
    comparator: &MockFetcher,
    notifier: &MockNotifier,
    settings: ScannerSettings,
) -> Scanner {
    Scanner::new(
        Arc::new(reference.clone()),
        Arc::new(comparator.clone()),
        Arc::new(notifier.clone()),
        settings,
    )
}

/// Scanner over two static snapshots with default settings.
pub fn static_scanner(
    reference: Vec<RawQuote>,
    comparator: Vec<RawQuote>,
    notifier: &MockNotifier,
) -> Scanner {
    scanner(
        &MockFetcher::new(REFERENCE, reference),
        &MockFetcher::new(COMPARATOR, comparator),
        notifier,
        ScannerSettings::default(),
    )
}
