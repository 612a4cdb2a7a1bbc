//! Repeat-alert suppression.
//!
//! An opportunity is identified by its [`MatchKey`] plus its edge rounded to
//! the nearest whole percent, so a price flickering between 9.6% and 10.1%
//! does not re-alert. Each fingerprint alerts at most once per window.

use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use rust_decimal::prelude::ToPrimitive;
use rust_decimal::{Decimal, RoundingStrategy};
use time::{Duration, OffsetDateTime};
use tracing::debug;

use super::calculator::Opportunity;
use crate::matching::MatchKey;
use crate::metrics;

/// Identity used to suppress repeat alerts.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Fingerprint {
    /// Bet identity.
    pub key: MatchKey,
    /// Edge rounded to the nearest integer percent.
    pub bucket: i64,
}

impl Fingerprint {
    /// Fingerprint of an opportunity.
    pub fn of(opportunity: &Opportunity) -> Self {
        Self {
            key: opportunity.key.clone(),
            bucket: pct_bucket(opportunity.diff_pct),
        }
    }
}

/// Round an edge to its integer-percent bucket (half away from zero).
pub fn pct_bucket(diff_pct: Decimal) -> i64 {
    let rounded = diff_pct.round_dp_with_strategy(0, RoundingStrategy::MidpointAwayFromZero);
    rounded.to_i64().unwrap_or(if rounded.is_sign_negative() {
        i64::MIN
    } else {
        i64::MAX
    })
}

fn is_expired(last_alerted: OffsetDateTime, now: OffsetDateTime, window: Duration) -> bool {
    now - last_alerted > window
}

/// Storage for dedupe entries.
///
/// [`DedupeStore::try_claim`] must be atomic per fingerprint: two callers
/// racing on the same stale fingerprint must not both win.
pub trait DedupeStore: Send + Sync {
    /// Record `now` for `fingerprint` and return `true` if it was absent or
    /// expired; return `false` and leave the entry untouched otherwise.
    fn try_claim(&self, fingerprint: &Fingerprint, now: OffsetDateTime, window: Duration) -> bool;

    /// When `fingerprint` last alerted, if it is still tracked.
    fn last_alerted(&self, fingerprint: &Fingerprint) -> Option<OffsetDateTime>;

    /// Drop every entry expired at `now`. Returns how many were dropped.
    fn purge_expired(&self, now: OffsetDateTime, window: Duration) -> usize;

    /// Number of tracked fingerprints.
    fn len(&self) -> usize;

    /// Whether nothing is tracked.
    fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// In-process dedupe table.
#[derive(Debug, Default)]
pub struct MemoryDedupeStore {
    entries: DashMap<Fingerprint, OffsetDateTime>,
}

impl MemoryDedupeStore {
    /// Create an empty store.
    pub fn new() -> Self {
        Self::default()
    }
}

impl DedupeStore for MemoryDedupeStore {
    fn try_claim(&self, fingerprint: &Fingerprint, now: OffsetDateTime, window: Duration) -> bool {
        // The entry guard holds the shard lock for the whole read-then-write.
        match self.entries.entry(fingerprint.clone()) {
            Entry::Occupied(mut entry) => {
                if is_expired(*entry.get(), now, window) {
                    entry.insert(now);
                    true
                } else {
                    false
                }
            }
            Entry::Vacant(entry) => {
                entry.insert(now);
                true
            }
        }
    }

    fn last_alerted(&self, fingerprint: &Fingerprint) -> Option<OffsetDateTime> {
        self.entries.get(fingerprint).map(|at| *at)
    }

    fn purge_expired(&self, now: OffsetDateTime, window: Duration) -> usize {
        let before = self.entries.len();
        self.entries.retain(|_, last| !is_expired(*last, now, window));
        before.saturating_sub(self.entries.len())
    }

    fn len(&self) -> usize {
        self.entries.len()
    }
}

/// Filters opportunities already alerted within the trailing window.
#[derive(Debug)]
pub struct Deduplicator<S = MemoryDedupeStore> {
    store: S,
    window: Duration,
}

impl Deduplicator<MemoryDedupeStore> {
    /// Deduplicator over a fresh in-memory table.
    pub fn new(window: Duration) -> Self {
        Self::with_store(MemoryDedupeStore::new(), window)
    }
}

impl<S: DedupeStore> Deduplicator<S> {
    /// Deduplicator over a caller-provided store.
    pub fn with_store(store: S, window: Duration) -> Self {
        Self { store, window }
    }

    /// The backing store.
    pub fn store(&self) -> &S {
        &self.store
    }

    /// Keep the opportunities not alerted within the window and mark them as
    /// alerted at `now`. Input order is preserved.
    pub fn filter(&self, opportunities: Vec<Opportunity>, now: OffsetDateTime) -> Vec<Opportunity> {
        let purged = self.store.purge_expired(now, self.window);
        if purged > 0 {
            debug!(purged, "Expired dedupe entries dropped");
        }

        let total = opportunities.len();
        let fresh: Vec<Opportunity> = opportunities
            .into_iter()
            .filter(|opp| {
                let fingerprint = Fingerprint::of(opp);
                let claimed = self.store.try_claim(&fingerprint, now, self.window);
                if !claimed {
                    debug!(key = %fingerprint.key, bucket = fingerprint.bucket, "Suppressed repeat alert");
                    metrics::inc_alerts_suppressed();
                }
                claimed
            })
            .collect();

        debug!(
            total,
            fresh = fresh.len(),
            tracked = self.store.len(),
            "Dedupe applied"
        );

        fresh
    }
}
