//! Threshold filtering and ranking of matched pairs.

use rust_decimal::Decimal;
use strum::Display;
use time::OffsetDateTime;
use tracing::{debug, info, instrument, warn};

use super::calculator::{calculate_opportunity, Opportunity};
use crate::config::Config;
use crate::matching::QuotePair;
use crate::metrics;

/// Whether a pair's edge falls inside the alert range.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Display)]
#[strum(serialize_all = "UPPERCASE")]
pub enum Verdict {
    /// Inside `[min_pct, max_pct]`.
    Include,
    /// Outside the range.
    Exclude,
}

/// Inclusive percentage range an edge must fall in to alert.
///
/// Small negative edges are still worth a look because LAY and BACK prices
/// sit on opposite sides of the book; very large edges are almost always a
/// mismatched market or a stale scrape.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Threshold {
    /// Lowest edge that alerts.
    pub min_pct: Decimal,
    /// Highest edge that alerts.
    pub max_pct: Decimal,
}

impl Default for Threshold {
    fn default() -> Self {
        Self {
            min_pct: Decimal::new(-10, 1),
            max_pct: Decimal::new(300, 1),
        }
    }
}

impl Threshold {
    /// Create a threshold range.
    pub fn new(min_pct: Decimal, max_pct: Decimal) -> Self {
        Self { min_pct, max_pct }
    }

    /// Threshold range from config.
    pub fn from_config(config: &Config) -> Self {
        Self::new(config.min_diff_pct, config.max_diff_pct)
    }

    /// Classify an edge. Both bounds are inclusive.
    pub fn classify(&self, diff_pct: Decimal) -> Verdict {
        if self.min_pct <= diff_pct && diff_pct <= self.max_pct {
            Verdict::Include
        } else {
            Verdict::Exclude
        }
    }
}

/// Score every pair and keep the ones inside `threshold`, most profitable
/// first.
#[instrument(skip(pairs, threshold), fields(min_pct = %threshold.min_pct, max_pct = %threshold.max_pct))]
pub fn compare_pairs<'a>(
    pairs: impl IntoIterator<Item = QuotePair<'a>>,
    threshold: &Threshold,
    detected_at: OffsetDateTime,
) -> Vec<Opportunity> {
    let mut included = Vec::new();
    let mut scored = 0usize;

    for pair in pairs {
        scored += 1;

        let opportunity = match calculate_opportunity(&pair, detected_at) {
            Ok(opp) => opp,
            Err(e) => {
                warn!(key = %pair.key, error = %e, "Skipping pair with invalid reference price");
                continue;
            }
        };

        match threshold.classify(opportunity.diff_pct) {
            Verdict::Include => {
                info!(
                    key = %opportunity.key,
                    reference = %opportunity.reference.price,
                    comparator = %opportunity.comparator.price,
                    diff_pct = %opportunity.diff_pct.round_dp(2),
                    "Opportunity detected"
                );
                metrics::inc_opportunities_detected();
                included.push(opportunity);
            }
            Verdict::Exclude => {
                debug!(
                    key = %opportunity.key,
                    diff_pct = %opportunity.diff_pct.round_dp(2),
                    "Edge outside threshold"
                );
            }
        }
    }

    rank_opportunities(&mut included);

    debug!(scored, included = included.len(), "Pairs compared");
    included
}

/// Sort by descending edge; equal edges go to the earlier observation.
pub fn rank_opportunities(opportunities: &mut [Opportunity]) {
    opportunities.sort_by(|a, b| {
        b.diff_pct
            .cmp(&a.diff_pct)
            .then_with(|| a.observed_at().cmp(&b.observed_at()))
    });
}
