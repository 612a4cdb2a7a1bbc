//! Edge calculations for matched quote pairs.

use rust_decimal::Decimal;
use time::OffsetDateTime;

use crate::error::ValidationError;
use crate::matching::{MatchKey, QuotePair};
use crate::quote::Quote;

/// Price difference between the comparator and the reference LAY price.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Edge {
    /// `comparator - reference`.
    pub diff_abs: Decimal,
    /// `diff_abs / reference * 100`.
    pub diff_pct: Decimal,
}

/// Compute the edge of `comparator_price` over `reference_price`.
///
/// A non-positive reference price has no meaningful percentage and is
/// rejected rather than silently mapped to zero.
pub fn compute_edge(
    reference_price: Decimal,
    comparator_price: Decimal,
) -> Result<Edge, ValidationError> {
    if reference_price <= Decimal::ZERO {
        return Err(ValidationError::NonPositivePrice(reference_price));
    }

    let diff_abs = comparator_price - reference_price;
    let diff_pct = diff_abs / reference_price * Decimal::ONE_HUNDRED;

    Ok(Edge { diff_abs, diff_pct })
}

/// A matched pair whose edge has been computed.
#[derive(Debug, Clone, PartialEq)]
pub struct Opportunity {
    /// Shared identity of both quotes.
    pub key: MatchKey,
    /// LAY quote from the reference site.
    pub reference: Quote,
    /// Quote from the comparator site.
    pub comparator: Quote,
    /// `comparator.price - reference.price`.
    pub diff_abs: Decimal,
    /// `diff_abs / reference.price * 100`.
    pub diff_pct: Decimal,
    /// When the scan cycle detected it.
    pub detected_at: OffsetDateTime,
}

impl Opportunity {
    /// Moment both prices were on screen: the later of the two observations.
    pub fn observed_at(&self) -> OffsetDateTime {
        self.reference.observed_at.max(self.comparator.observed_at)
    }

    /// Event display name as listed by the reference site.
    pub fn match_name(&self) -> String {
        self.reference.event.name()
    }
}

/// Build an [`Opportunity`] from a matched pair.
pub fn calculate_opportunity(
    pair: &QuotePair<'_>,
    detected_at: OffsetDateTime,
) -> Result<Opportunity, ValidationError> {
    let edge = compute_edge(pair.reference.price, pair.comparator.price)?;

    Ok(Opportunity {
        key: pair.key.clone(),
        reference: pair.reference.clone(),
        comparator: pair.comparator.clone(),
        diff_abs: edge.diff_abs,
        diff_pct: edge.diff_pct,
        detected_at,
    })
}
