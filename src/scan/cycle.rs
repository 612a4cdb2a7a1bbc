//! One scan cycle: fetch, validate, match, compare, dedupe, notify.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use serde::Serialize;
use strum::Display;
use time::OffsetDateTime;
use tracing::{error, info, instrument, warn, Span};

use crate::arbitrage::{compare_pairs, DedupeStore, Deduplicator, MemoryDedupeStore, Opportunity, Threshold};
use crate::config::{AlertMode, Config};
use crate::error::FetchError;
use crate::feeds::QuoteFetcher;
use crate::matching::MatchIndex;
use crate::metrics;
use crate::notify::Notifier;
use crate::quote::{ingest, RawRecord};
use crate::utils::Shutdown;

use super::stats::ScanStats;

/// Whether a cycle ran to the end.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Display, Serialize)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum CycleOutcome {
    /// Both snapshots arrived and the pipeline ran.
    Completed,
    /// A fetch failed; nothing was compared.
    Skipped,
}

/// What one cycle did.
#[derive(Debug)]
pub struct CycleReport {
    /// Clock value the cycle ran with.
    pub started_at: OffsetDateTime,
    /// Completed or skipped.
    pub outcome: CycleOutcome,
    /// Fetch failures (non-empty only for skipped cycles).
    pub fetch_errors: Vec<FetchError>,
    /// Valid reference quotes.
    pub reference_quotes: usize,
    /// Valid comparator quotes.
    pub comparator_quotes: usize,
    /// Records rejected at validation, both sources.
    pub rejected: usize,
    /// Opportunities inside the threshold.
    pub detected: usize,
    /// Opportunities that survived dedupe, most profitable first. These are
    /// marked as alerted whether or not delivery succeeded.
    pub alerted: Vec<Opportunity>,
    /// Opportunities delivered successfully.
    pub alerts_sent: usize,
    /// Failed notifier calls.
    pub notify_failures: usize,
}

impl CycleReport {
    fn skipped(started_at: OffsetDateTime, fetch_errors: Vec<FetchError>) -> Self {
        Self {
            started_at,
            outcome: CycleOutcome::Skipped,
            fetch_errors,
            reference_quotes: 0,
            comparator_quotes: 0,
            rejected: 0,
            detected: 0,
            alerted: Vec::new(),
            alerts_sent: 0,
            notify_failures: 0,
        }
    }
}

/// Tunables of the cycle.
#[derive(Debug, Clone)]
pub struct ScannerSettings {
    /// Per-fetch timeout.
    pub fetch_timeout: Duration,
    /// Extra time an in-flight fetch gets once shutdown is requested.
    pub shutdown_grace: Duration,
    /// Alert range.
    pub threshold: Threshold,
    /// Repeat-alert suppression window.
    pub dedupe_window: time::Duration,
    /// Batch or per-opportunity delivery.
    pub alert_mode: AlertMode,
}

impl ScannerSettings {
    /// Settings from config.
    pub fn from_config(config: &Config) -> Self {
        Self {
            fetch_timeout: Duration::from_secs(config.fetch_timeout_seconds),
            shutdown_grace: Duration::from_secs(config.shutdown_grace_seconds),
            threshold: Threshold::from_config(config),
            dedupe_window: config.dedupe_window(),
            alert_mode: config.alert_mode,
        }
    }
}

impl Default for ScannerSettings {
    fn default() -> Self {
        Self::from_config(&Config::default())
    }
}

/// Runs scan cycles against a reference and a comparator source.
pub struct Scanner<S = MemoryDedupeStore> {
    reference: Arc<dyn QuoteFetcher>,
    comparator: Arc<dyn QuoteFetcher>,
    notifier: Arc<dyn Notifier>,
    dedupe: Deduplicator<S>,
    settings: ScannerSettings,
    stats: Arc<ScanStats>,
    shutdown: Shutdown,
    cycle: AtomicU64,
}

impl Scanner<MemoryDedupeStore> {
    /// Create a scanner with an in-memory dedupe table.
    pub fn new(
        reference: Arc<dyn QuoteFetcher>,
        comparator: Arc<dyn QuoteFetcher>,
        notifier: Arc<dyn Notifier>,
        settings: ScannerSettings,
    ) -> Self {
        let store = MemoryDedupeStore::new();
        Self::with_store(reference, comparator, notifier, settings, store)
    }
}

impl<S: DedupeStore> Scanner<S> {
    /// Create a scanner over a caller-provided dedupe store.
    pub fn with_store(
        reference: Arc<dyn QuoteFetcher>,
        comparator: Arc<dyn QuoteFetcher>,
        notifier: Arc<dyn Notifier>,
        settings: ScannerSettings,
        store: S,
    ) -> Self {
        Self {
            reference,
            comparator,
            notifier,
            dedupe: Deduplicator::with_store(store, settings.dedupe_window),
            settings,
            stats: Arc::new(ScanStats::new()),
            shutdown: Shutdown::never(),
            cycle: AtomicU64::new(0),
        }
    }

    /// Share statistics with another component (the HTTP API).
    pub fn with_stats(mut self, stats: Arc<ScanStats>) -> Self {
        self.stats = stats;
        self
    }

    /// Observe `shutdown` while fetches are in flight.
    pub fn with_shutdown(mut self, shutdown: Shutdown) -> Self {
        self.shutdown = shutdown;
        self
    }

    /// Shared statistics.
    pub fn stats(&self) -> &Arc<ScanStats> {
        &self.stats
    }

    /// Run one cycle with `now` as the clock.
    ///
    /// Never fails: fetch problems skip the cycle and delivery problems are
    /// logged, so the caller can always schedule the next tick.
    #[instrument(skip(self, now), fields(cycle = tracing::field::Empty))]
    pub async fn run_cycle(&self, now: OffsetDateTime) -> CycleReport {
        let cycle = self.cycle.fetch_add(1, Ordering::Relaxed) + 1;
        Span::current().record("cycle", cycle);
        let _timer = metrics::timer_cycle();

        let (reference, comparator) = tokio::join!(
            self.fetch(self.reference.as_ref()),
            self.fetch(self.comparator.as_ref()),
        );

        let (reference_raw, comparator_raw) = match (reference, comparator) {
            (Ok(r), Ok(c)) => (r, c),
            (r, c) => {
                let errors: Vec<FetchError> =
                    [r.err(), c.err()].into_iter().flatten().collect();
                for e in &errors {
                    warn!(source = e.source_name(), error = %e, "Fetch failed, skipping cycle");
                    metrics::inc_fetch_failures(e.source_name());
                }
                metrics::inc_scan_cycles_skipped();

                let report = CycleReport::skipped(now, errors);
                self.stats.record(&report).await;
                return report;
            }
        };

        let reference = ingest(self.reference.source(), reference_raw, now);
        let comparator = ingest(self.comparator.source(), comparator_raw, now);

        let index = MatchIndex::build(&reference.quotes, &comparator.quotes);
        let opportunities = compare_pairs(index.pairs(), &self.settings.threshold, now);
        let detected = opportunities.len();

        let fresh = self.dedupe.filter(opportunities, now);
        let (alerts_sent, notify_failures) = self.deliver(&fresh).await;

        info!(
            reference_quotes = reference.quotes.len(),
            comparator_quotes = comparator.quotes.len(),
            rejected = reference.rejected.len() + comparator.rejected.len(),
            detected,
            alerted = fresh.len(),
            "Scan cycle complete"
        );
        metrics::inc_scan_cycles();

        let report = CycleReport {
            started_at: now,
            outcome: CycleOutcome::Completed,
            fetch_errors: Vec::new(),
            reference_quotes: reference.quotes.len(),
            comparator_quotes: comparator.quotes.len(),
            rejected: reference.rejected.len() + comparator.rejected.len(),
            detected,
            alerted: fresh,
            alerts_sent,
            notify_failures,
        };
        self.stats.record(&report).await;
        report
    }

    /// Fetch one snapshot under the per-fetch timeout. Once shutdown is
    /// requested the fetch gets the grace period, then is abandoned.
    async fn fetch(&self, fetcher: &dyn QuoteFetcher) -> Result<Vec<RawRecord>, FetchError> {
        let source = fetcher.source().to_string();
        let fetch = tokio::time::timeout(self.settings.fetch_timeout, fetcher.fetch_quotes());
        tokio::pin!(fetch);

        let outcome = tokio::select! {
            outcome = &mut fetch => outcome,
            _ = self.shutdown.requested() => {
                match tokio::time::timeout(self.settings.shutdown_grace, &mut fetch).await {
                    Ok(outcome) => outcome,
                    Err(_) => return Err(FetchError::Cancelled { source_name: source }),
                }
            }
        };

        match outcome {
            Ok(Ok(quotes)) if quotes.is_empty() => Err(FetchError::Empty { source_name: source }),
            Ok(result) => result,
            Err(_) => Err(FetchError::Timeout {
                source_name: source,
                timeout_secs: self.settings.fetch_timeout.as_secs(),
            }),
        }
    }

    /// Hand surviving opportunities to the notifier. Returns delivered and
    /// failed counts.
    async fn deliver(&self, fresh: &[Opportunity]) -> (usize, usize) {
        if fresh.is_empty() {
            return (0, 0);
        }

        let batches: Vec<&[Opportunity]> = match self.settings.alert_mode {
            AlertMode::Batch => vec![fresh],
            AlertMode::Each => fresh.chunks(1).collect(),
        };

        let mut sent = 0;
        let mut failed = 0;
        for batch in batches {
            match self.notifier.send(batch).await {
                Ok(()) => sent += batch.len(),
                Err(e) => {
                    // Entries stay marked; the next alert for these waits out the window.
                    error!(error = %e, opportunities = batch.len(), "Alert delivery failed");
                    metrics::inc_notify_failures();
                    failed += 1;
                }
            }
        }

        metrics::add_alerts_sent(sent as u64);
        (sent, failed)
    }
}
