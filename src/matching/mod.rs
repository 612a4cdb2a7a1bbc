//! Matching module for pairing quotes across sites.
//!
//! This module handles:
//! - Team, market and selection normalization
//! - Match keys and the cross-source pairing index

pub mod matcher;
pub mod normalize;

pub use matcher::{MatchIndex, MatchKey, QuotePair};
pub use normalize::{canonical_market, canonical_selection, normalize_team, MarketKind, Selection};
