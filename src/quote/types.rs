//! Odds observation types shared by every stage of the scan pipeline.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use strum::{Display, EnumString};
use time::OffsetDateTime;

/// Side of the book a price was taken from.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Display, EnumString, Default,
)]
pub enum OddsType {
    /// Price at which the bettor acts as bookmaker.
    #[strum(serialize = "LAY", serialize = "lay", serialize = "Lay")]
    Lay,
    /// Ordinary backing price.
    #[strum(serialize = "BACK", serialize = "back", serialize = "Back")]
    #[default]
    Back,
}

/// Sport an event belongs to. Only football is eligible for matching.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Display, EnumString, Default)]
#[strum(ascii_case_insensitive)]
pub enum Sport {
    /// Association football.
    #[strum(serialize = "football", serialize = "soccer", serialize = "futbol")]
    #[default]
    Football,
    /// Basketball.
    #[strum(serialize = "basketball")]
    Basketball,
    /// Tennis.
    #[strum(serialize = "tennis")]
    Tennis,
    /// Anything the scanner does not recognize.
    #[strum(serialize = "other")]
    Other,
}

impl Sport {
    /// Parse a scraped sport label, falling back to [`Sport::Other`].
    pub fn from_label(label: &str) -> Self {
        label.trim().parse().unwrap_or(Sport::Other)
    }
}

/// A sporting event as listed by one site.
#[derive(Debug, Clone, PartialEq)]
pub struct Event {
    /// Home participant, as scraped.
    pub home: String,
    /// Away participant, as scraped.
    pub away: String,
    /// League or competition name.
    pub league: Option<String>,
    /// Scheduled kickoff.
    pub kickoff: Option<OffsetDateTime>,
    /// Sport of the event.
    pub sport: Sport,
}

impl Event {
    /// Display name, e.g. "Arsenal vs Chelsea".
    pub fn name(&self) -> String {
        format!("{} vs {}", self.home, self.away)
    }
}

/// One validated odds observation.
///
/// Constructed only through [`Quote::from_raw`], so `price` is always a
/// decimal odd above 1.0.
#[derive(Debug, Clone, PartialEq)]
pub struct Quote {
    /// Site the quote was scraped from.
    pub source: String,
    /// Event the quote belongs to.
    pub event: Event,
    /// Market label as scraped (e.g. "1X2").
    pub market: String,
    /// Selection label as scraped (e.g. "Draw").
    pub selection: String,
    /// LAY or BACK.
    pub odds_type: OddsType,
    /// Decimal odds.
    pub price: Decimal,
    /// When the price was captured.
    pub observed_at: OffsetDateTime,
}

/// Price as it arrives from a scraper: a JSON number or a string.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(untagged)]
pub enum RawPrice {
    /// JSON number.
    Number(serde_json::Number),
    /// Text such as "2.10" or "2,10".
    Text(String),
}

/// One element of a snapshot, still undecoded. Decoding happens per record
/// so one malformed entry cannot sink the rest of the batch.
pub type RawRecord = serde_json::Value;

/// Loosely-typed record published by a scraper.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct RawQuote {
    /// Home participant.
    #[serde(default)]
    pub home: Option<String>,
    /// Away participant.
    #[serde(default)]
    pub away: Option<String>,
    /// League name.
    #[serde(default)]
    pub league: Option<String>,
    /// Kickoff, RFC 3339.
    #[serde(default)]
    pub kickoff: Option<String>,
    /// Sport label; football when absent.
    #[serde(default)]
    pub sport: Option<String>,
    /// Market label.
    #[serde(default)]
    pub market: Option<String>,
    /// Selection label.
    #[serde(default)]
    pub selection: Option<String>,
    /// "LAY" or "BACK"; BACK when absent.
    #[serde(default, alias = "kind")]
    pub odds_type: Option<String>,
    /// Price.
    #[serde(default, alias = "odds")]
    pub price: Option<RawPrice>,
    /// Capture time, RFC 3339; fetch time when absent.
    #[serde(default)]
    pub observed_at: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::str::FromStr;

    #[test]
    fn odds_type_from_string_works() {
        assert_eq!(OddsType::from_str("LAY").unwrap(), OddsType::Lay);
        assert_eq!(OddsType::from_str("back").unwrap(), OddsType::Back);
        assert!(OddsType::from_str("PLACE").is_err());
    }

    #[test]
    fn sport_label_falls_back_to_other() {
        assert_eq!(Sport::from_label("Soccer"), Sport::Football);
        assert_eq!(Sport::from_label(" football "), Sport::Football);
        assert_eq!(Sport::from_label("curling"), Sport::Other);
    }

    #[test]
    fn raw_quote_accepts_number_and_string_prices() {
        let json = r#"[
            {"home": "Arsenal", "away": "Chelsea", "market": "1X2", "selection": "1", "odds": 2.1},
            {"home": "Arsenal", "away": "Chelsea", "market": "1X2", "selection": "X", "price": "3,40", "kind": "LAY"}
        ]"#;

        let raws: Vec<RawQuote> = serde_json::from_str(json).unwrap();

        assert!(matches!(raws[0].price, Some(RawPrice::Number(_))));
        assert_eq!(raws[1].price, Some(RawPrice::Text("3,40".to_string())));
        assert_eq!(raws[1].odds_type.as_deref(), Some("LAY"));
    }

    #[test]
    fn event_name_joins_participants() {
        let event = Event {
            home: "Arsenal".to_string(),
            away: "Chelsea".to_string(),
            league: None,
            kickoff: None,
            sport: Sport::Football,
        };
        assert_eq!(event.name(), "Arsenal vs Chelsea");
    }
}
