//! Edge scoring, threshold filtering and repeat-alert suppression.
//!
//! This module handles:
//! - Edge calculation for matched quote pairs
//! - Inclusive threshold classification and ranking
//! - Fingerprint dedupe over a trailing window

pub mod calculator;
pub mod comparator;
pub mod dedupe;

pub use calculator::{calculate_opportunity, compute_edge, Edge, Opportunity};
pub use comparator::{compare_pairs, rank_opportunities, Threshold, Verdict};
pub use dedupe::{pct_bucket, DedupeStore, Deduplicator, Fingerprint, MemoryDedupeStore};
