//! Cross-source pairing of quotes that describe the same bet.

use std::collections::BTreeMap;
use std::fmt;

use tracing::debug;

use super::normalize::{canonical_market, canonical_selection, normalize_team, MarketKind, Selection};
use crate::quote::{OddsType, Quote, Sport};

/// Identity of one bet across sites: who plays, which market, which outcome.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct MatchKey {
    /// Normalized home team.
    pub home: String,
    /// Normalized away team.
    pub away: String,
    /// Canonical market.
    pub market: MarketKind,
    /// Canonical selection.
    pub selection: Selection,
}

impl MatchKey {
    /// Derive the key for a quote.
    ///
    /// Returns `None` when the quote is not eligible for comparison:
    /// a non-football event, an unsupported market or an unresolvable
    /// selection.
    pub fn for_quote(quote: &Quote) -> Option<MatchKey> {
        if quote.event.sport != Sport::Football {
            return None;
        }

        let market = canonical_market(&quote.market)?;
        let selection = canonical_selection(&quote.selection, &quote.event)?;

        Some(MatchKey {
            home: normalize_team(&quote.event.home),
            away: normalize_team(&quote.event.away),
            market,
            selection,
        })
    }
}

impl fmt::Display for MatchKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}|{}|{}|{}", self.home, self.away, self.market, self.selection)
    }
}

/// A reference LAY quote and the comparator quote for the same [`MatchKey`].
#[derive(Debug, Clone, Copy)]
pub struct QuotePair<'a> {
    /// Shared identity.
    pub key: &'a MatchKey,
    /// LAY quote from the reference site.
    pub reference: &'a Quote,
    /// Quote from the comparator site.
    pub comparator: &'a Quote,
}

/// Eligible quotes of both sources, indexed by [`MatchKey`].
///
/// Building the index resolves conflicts within a source; [`Self::pairs`]
/// then yields the overlap lazily.
#[derive(Debug, Default)]
pub struct MatchIndex<'a> {
    reference: BTreeMap<MatchKey, &'a Quote>,
    comparator: BTreeMap<MatchKey, &'a Quote>,
}

impl<'a> MatchIndex<'a> {
    /// Index both sides of a scan.
    ///
    /// Reference side: LAY quotes only, most recent observation per key.
    /// Comparator side: BACK preferred over LAY, most recent observation
    /// within the preferred type.
    pub fn build(reference: &'a [Quote], comparator: &'a [Quote]) -> Self {
        let mut index = MatchIndex::default();
        let mut dropped = 0usize;

        for quote in reference.iter().filter(|q| q.odds_type == OddsType::Lay) {
            match MatchKey::for_quote(quote) {
                Some(key) => keep_latest(&mut index.reference, key, quote, |q| q.observed_at),
                None => dropped += 1,
            }
        }

        for quote in comparator {
            match MatchKey::for_quote(quote) {
                Some(key) => keep_latest(&mut index.comparator, key, quote, |q| {
                    (q.odds_type == OddsType::Back, q.observed_at)
                }),
                None => dropped += 1,
            }
        }

        debug!(
            reference_keys = index.reference.len(),
            comparator_keys = index.comparator.len(),
            dropped,
            "Match index built"
        );

        index
    }

    /// Pairs present on both sides, in key order.
    pub fn pairs(&self) -> impl Iterator<Item = QuotePair<'_>> + '_ {
        self.reference.iter().filter_map(move |(key, reference)| {
            let comparator = self.comparator.get(key)?;
            Some(QuotePair {
                key,
                reference: *reference,
                comparator: *comparator,
            })
        })
    }

    /// Number of keys on the reference side.
    pub fn reference_len(&self) -> usize {
        self.reference.len()
    }

    /// Number of keys on the comparator side.
    pub fn comparator_len(&self) -> usize {
        self.comparator.len()
    }
}

/// Insert `quote` unless an entry with a strictly higher rank is present.
/// Equal rank goes to the later input, which is the later scrape.
fn keep_latest<'a, R: Ord>(
    map: &mut BTreeMap<MatchKey, &'a Quote>,
    key: MatchKey,
    quote: &'a Quote,
    rank: impl Fn(&Quote) -> R,
) {
    match map.get(&key) {
        Some(existing) if rank(existing) > rank(quote) => {}
        _ => {
            map.insert(key, quote);
        }
    }
}
