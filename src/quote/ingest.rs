//! Validation of scraped records into [`Quote`]s.
//!
//! Nothing reaches the matcher without passing through here. A bad record is
//! rejected on its own; the rest of the batch carries on.

use std::str::FromStr;

use rust_decimal::Decimal;
use time::format_description::well_known::Rfc3339;
use time::OffsetDateTime;
use tracing::{debug, warn};

use super::types::{Event, OddsType, Quote, RawPrice, RawQuote, RawRecord, Sport};
use crate::error::ValidationError;
use crate::matching::normalize_team;
use crate::metrics;

/// Decimal odds must be strictly above this.
pub const MIN_DECIMAL_ODDS: Decimal = Decimal::ONE;

/// Scrapers occasionally emit placeholder prices like 1000 or 9999; anything
/// above this is treated as noise.
pub const MAX_DECIMAL_ODDS: Decimal = Decimal::ONE_THOUSAND;

/// Outcome of validating one source's snapshot.
#[derive(Debug, Clone, Default)]
pub struct IngestReport {
    /// Records that passed validation.
    pub quotes: Vec<Quote>,
    /// Rejected records with their reasons, in input order.
    pub rejected: Vec<ValidationError>,
}

impl RawQuote {
    /// Decode one snapshot element. Wrong JSON types (a boolean price, a
    /// numeric kickoff, a non-object entry) reject only this record.
    pub fn decode(record: RawRecord) -> Result<RawQuote, ValidationError> {
        serde_json::from_value(record).map_err(|e| ValidationError::Malformed(e.to_string()))
    }

    /// Encode back into a snapshot element.
    pub fn to_record(&self) -> RawRecord {
        serde_json::to_value(self).unwrap_or(RawRecord::Null)
    }
}

impl Quote {
    /// Validate a raw record from `source`.
    ///
    /// `fetched_at` stands in for `observed_at` when the scraper did not
    /// stamp the record.
    pub fn from_raw(
        source: &str,
        raw: RawQuote,
        fetched_at: OffsetDateTime,
    ) -> Result<Quote, ValidationError> {
        let home = required(raw.home, "home")?;
        let away = required(raw.away, "away")?;
        let market = required(raw.market, "market")?;
        let selection = required(raw.selection, "selection")?;

        let price = match raw.price {
            Some(price) => parse_price(&price)?,
            None => return Err(ValidationError::MissingField("price")),
        };
        validate_price(price)?;

        let odds_type = match raw.odds_type.as_deref().map(str::trim) {
            None | Some("") => OddsType::Back,
            Some(label) => OddsType::from_str(label)
                .map_err(|_| ValidationError::UnknownOddsType(label.to_string()))?,
        };

        let normalized_home = normalize_team(&home);
        if !normalized_home.is_empty() && normalized_home == normalize_team(&away) {
            return Err(ValidationError::SameParticipants(home));
        }

        let kickoff = raw
            .kickoff
            .as_deref()
            .map(|value| parse_timestamp(value, "kickoff"))
            .transpose()?;

        let observed_at = match raw.observed_at.as_deref() {
            Some(value) => parse_timestamp(value, "observed_at")?,
            None => fetched_at,
        };

        let sport = raw
            .sport
            .as_deref()
            .map(Sport::from_label)
            .unwrap_or_default();

        Ok(Quote {
            source: source.to_string(),
            event: Event {
                home,
                away,
                league: raw.league.map(|l| l.trim().to_string()).filter(|l| !l.is_empty()),
                kickoff,
                sport,
            },
            market,
            selection,
            odds_type,
            price,
            observed_at,
        })
    }
}

/// Decode and validate a whole snapshot, keeping every record that passes.
pub fn ingest(source: &str, records: Vec<RawRecord>, fetched_at: OffsetDateTime) -> IngestReport {
    let mut report = IngestReport::default();
    let total = records.len();

    for record in records {
        let quote = RawQuote::decode(record).and_then(|raw| Quote::from_raw(source, raw, fetched_at));
        match quote {
            Ok(quote) => report.quotes.push(quote),
            Err(e) => {
                warn!(source, error = %e, "Rejected scraped record");
                metrics::inc_quotes_rejected(source);
                report.rejected.push(e);
            }
        }
    }

    debug!(
        source,
        total,
        accepted = report.quotes.len(),
        rejected = report.rejected.len(),
        "Snapshot validated"
    );

    report
}

/// Check that a price is a usable decimal odd.
pub fn validate_price(price: Decimal) -> Result<(), ValidationError> {
    if price <= Decimal::ZERO {
        return Err(ValidationError::NonPositivePrice(price));
    }

    if price <= MIN_DECIMAL_ODDS || price > MAX_DECIMAL_ODDS {
        return Err(ValidationError::PriceOutOfRange {
            price,
            min: MIN_DECIMAL_ODDS,
            max: MAX_DECIMAL_ODDS,
        });
    }

    Ok(())
}

fn required(value: Option<String>, field: &'static str) -> Result<String, ValidationError> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
        .ok_or(ValidationError::MissingField(field))
}

fn parse_price(raw: &RawPrice) -> Result<Decimal, ValidationError> {
    let text = match raw {
        RawPrice::Number(n) => n.to_string(),
        // Turkish and most European sites use a comma separator.
        RawPrice::Text(s) => s.trim().replace(',', "."),
    };

    Decimal::from_str(&text)
        .or_else(|_| Decimal::from_scientific(&text))
        .map_err(|_| ValidationError::UnparseablePrice(text))
}

fn parse_timestamp(value: &str, field: &'static str) -> Result<OffsetDateTime, ValidationError> {
    OffsetDateTime::parse(value.trim(), &Rfc3339).map_err(|_| ValidationError::InvalidTimestamp {
        field,
        value: value.to_string(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;
    use time::macros::datetime;

    fn raw(price: RawPrice) -> RawQuote {
        RawQuote {
            home: Some("Arsenal FC".to_string()),
            away: Some("Chelsea".to_string()),
            league: Some("Premier League".to_string()),
            market: Some("1X2".to_string()),
            selection: Some("X".to_string()),
            odds_type: Some("LAY".to_string()),
            price: Some(price),
            ..RawQuote::default()
        }
    }

    fn text(s: &str) -> RawPrice {
        RawPrice::Text(s.to_string())
    }

    #[test]
    fn valid_record_becomes_quote() {
        let fetched_at = datetime!(2024-03-01 12:00 UTC);

        let quote = Quote::from_raw("orbit", raw(text("3,40")), fetched_at).unwrap();

        assert_eq!(quote.source, "orbit");
        assert_eq!(quote.price, dec!(3.40));
        assert_eq!(quote.odds_type, OddsType::Lay);
        assert_eq!(quote.event.sport, Sport::Football);
        assert_eq!(quote.observed_at, fetched_at);
    }

    #[test]
    fn number_price_is_parsed_exactly() {
        let number = serde_json::Number::from_f64(2.2).unwrap();
        let quote =
            Quote::from_raw("golbet724", raw(RawPrice::Number(number)), OffsetDateTime::now_utc())
                .unwrap();

        assert_eq!(quote.price, dec!(2.2));
    }

    #[test]
    fn non_positive_price_is_rejected() {
        let now = OffsetDateTime::now_utc();

        assert_eq!(
            Quote::from_raw("orbit", raw(text("0")), now),
            Err(ValidationError::NonPositivePrice(dec!(0)))
        );
        assert_eq!(
            Quote::from_raw("orbit", raw(text("-2.5")), now),
            Err(ValidationError::NonPositivePrice(dec!(-2.5)))
        );
    }

    #[test]
    fn out_of_range_prices_are_rejected() {
        let now = OffsetDateTime::now_utc();

        assert!(matches!(
            Quote::from_raw("orbit", raw(text("1.00")), now),
            Err(ValidationError::PriceOutOfRange { .. })
        ));
        assert!(matches!(
            Quote::from_raw("orbit", raw(text("1001")), now),
            Err(ValidationError::PriceOutOfRange { .. })
        ));
        assert!(Quote::from_raw("orbit", raw(text("1000")), now).is_ok());
    }

    #[test]
    fn garbage_price_is_rejected() {
        let result = Quote::from_raw("orbit", raw(text("SUSP")), OffsetDateTime::now_utc());
        assert!(matches!(result, Err(ValidationError::UnparseablePrice(_))));
    }

    #[test]
    fn missing_team_is_rejected() {
        let mut record = raw(text("2.0"));
        record.away = Some("   ".to_string());

        assert_eq!(
            Quote::from_raw("orbit", record, OffsetDateTime::now_utc()),
            Err(ValidationError::MissingField("away"))
        );
    }

    #[test]
    fn unknown_odds_type_is_rejected() {
        let mut record = raw(text("2.0"));
        record.odds_type = Some("EACH_WAY".to_string());

        assert_eq!(
            Quote::from_raw("orbit", record, OffsetDateTime::now_utc()),
            Err(ValidationError::UnknownOddsType("EACH_WAY".to_string()))
        );
    }

    #[test]
    fn scraper_timestamps_are_honoured() {
        let mut record = raw(text("2.0"));
        record.observed_at = Some("2024-03-01T11:59:30Z".to_string());
        record.kickoff = Some("2024-03-01T20:00:00+01:00".to_string());

        let quote = Quote::from_raw("orbit", record, datetime!(2024-03-01 12:00 UTC)).unwrap();

        assert_eq!(quote.observed_at, datetime!(2024-03-01 11:59:30 UTC));
        assert_eq!(quote.event.kickoff, Some(datetime!(2024-03-01 19:00 UTC)));
    }

    #[test]
    fn bad_timestamp_is_rejected() {
        let mut record = raw(text("2.0"));
        record.kickoff = Some("tomorrow".to_string());

        assert!(matches!(
            Quote::from_raw("orbit", record, OffsetDateTime::now_utc()),
            Err(ValidationError::InvalidTimestamp { field: "kickoff", .. })
        ));
    }

    #[test]
    fn ingest_keeps_good_records_and_reports_bad_ones() {
        let records = vec![
            raw(text("2.0")).to_record(),
            raw(text("0")).to_record(),
            raw(text("3.1")).to_record(),
        ];

        let report = ingest("orbit", records, OffsetDateTime::now_utc());

        assert_eq!(report.quotes.len(), 2);
        assert_eq!(report.rejected, vec![ValidationError::NonPositivePrice(dec!(0))]);
    }

    #[test]
    fn wrongly_typed_records_are_rejected_one_by_one() {
        let good = raw(text("2.0")).to_record();
        let mut bool_price = good.clone();
        bool_price["price"] = serde_json::json!(true);
        let mut numeric_kickoff = good.clone();
        numeric_kickoff["kickoff"] = serde_json::json!(1709294400);
        let records = vec![
            bool_price,
            good,
            numeric_kickoff,
            serde_json::json!({"home": 42}),
            serde_json::json!("Arsenal v Chelsea"),
        ];

        let report = ingest("orbit", records, OffsetDateTime::now_utc());

        assert_eq!(report.quotes.len(), 1);
        assert_eq!(report.quotes[0].event.home, "Arsenal FC");
        assert_eq!(report.rejected.len(), 4);
        assert!(report
            .rejected
            .iter()
            .all(|e| matches!(e, ValidationError::Malformed(_))));
    }

    #[test]
    fn decode_accepts_scraper_aliases() {
        let raw = RawQuote::decode(serde_json::json!({
            "home": "Arsenal",
            "kind": "LAY",
            "odds": "2,10"
        }))
        .unwrap();

        assert_eq!(raw.odds_type.as_deref(), Some("LAY"));
        assert_eq!(raw.price, Some(RawPrice::Text("2,10".to_string())));
    }
}
