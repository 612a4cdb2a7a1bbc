//! Running scan statistics for the status API.

use std::sync::atomic::{AtomicU64, Ordering};

use serde::Serialize;
use time::format_description::well_known::Rfc3339;
use tokio::sync::RwLock;

use super::cycle::{CycleOutcome, CycleReport};

/// Summary of the most recent cycle.
#[derive(Debug, Clone, Serialize)]
pub struct LastCycle {
    /// Cycle start (RFC 3339).
    pub started_at: String,
    /// Whether the cycle ran to the end.
    pub outcome: CycleOutcome,
    /// Opportunities inside the threshold.
    pub detected: usize,
    /// Opportunities handed to the notifier.
    pub alerted: usize,
    /// Fetch failures that skipped the cycle.
    pub fetch_errors: Vec<String>,
}

/// Point-in-time copy of [`ScanStats`].
#[derive(Debug, Clone, Serialize)]
pub struct StatsSnapshot {
    /// Cycles that ran to the end.
    pub cycles_completed: u64,
    /// Cycles skipped on fetch failure.
    pub cycles_skipped: u64,
    /// Opportunities inside the threshold, before dedupe.
    pub opportunities_detected: u64,
    /// Opportunities delivered.
    pub alerts_sent: u64,
    /// Failed deliveries.
    pub notify_failures: u64,
    /// Most recent cycle, if any.
    pub last_cycle: Option<LastCycle>,
}

/// Counters shared between the scheduler and the HTTP API.
#[derive(Debug, Default)]
pub struct ScanStats {
    cycles_completed: AtomicU64,
    cycles_skipped: AtomicU64,
    opportunities_detected: AtomicU64,
    alerts_sent: AtomicU64,
    notify_failures: AtomicU64,
    last_cycle: RwLock<Option<LastCycle>>,
}

impl ScanStats {
    /// Create zeroed statistics.
    pub fn new() -> Self {
        Self::default()
    }

    /// Fold a finished cycle into the counters.
    pub async fn record(&self, report: &CycleReport) {
        match report.outcome {
            CycleOutcome::Completed => self.cycles_completed.fetch_add(1, Ordering::Relaxed),
            CycleOutcome::Skipped => self.cycles_skipped.fetch_add(1, Ordering::Relaxed),
        };
        self.opportunities_detected
            .fetch_add(report.detected as u64, Ordering::Relaxed);
        self.alerts_sent
            .fetch_add(report.alerts_sent as u64, Ordering::Relaxed);
        self.notify_failures
            .fetch_add(report.notify_failures as u64, Ordering::Relaxed);

        let last = LastCycle {
            started_at: report
                .started_at
                .format(&Rfc3339)
                .unwrap_or_else(|_| report.started_at.to_string()),
            outcome: report.outcome,
            detected: report.detected,
            alerted: report.alerted.len(),
            fetch_errors: report.fetch_errors.iter().map(ToString::to_string).collect(),
        };
        *self.last_cycle.write().await = Some(last);
    }

    /// Number of completed cycles.
    pub fn cycles_completed(&self) -> u64 {
        self.cycles_completed.load(Ordering::Relaxed)
    }

    /// Number of skipped cycles.
    pub fn cycles_skipped(&self) -> u64 {
        self.cycles_skipped.load(Ordering::Relaxed)
    }

    /// Copy everything out.
    pub async fn snapshot(&self) -> StatsSnapshot {
        StatsSnapshot {
            cycles_completed: self.cycles_completed(),
            cycles_skipped: self.cycles_skipped(),
            opportunities_detected: self.opportunities_detected.load(Ordering::Relaxed),
            alerts_sent: self.alerts_sent.load(Ordering::Relaxed),
            notify_failures: self.notify_failures.load(Ordering::Relaxed),
            last_cycle: self.last_cycle.read().await.clone(),
        }
    }
}
