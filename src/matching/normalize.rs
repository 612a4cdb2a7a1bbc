//! Name normalization for cross-site matching.
//!
//! Sites spell the same team and market differently ("Arsenal FC" vs
//! "arsenal", "Maç Sonucu" vs "1X2"). Everything here maps those spellings to
//! a single canonical form; equality on the canonical form is the match rule.

use std::collections::HashMap;

use once_cell::sync::Lazy;
use regex::Regex;
use strum::{Display, EnumString};

use crate::quote::Event;

/// Runs of anything that is not a letter or digit.
static NON_ALNUM: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"[^\p{L}\p{N}]+").expect("valid regex"));

/// Club-form suffixes and prefixes that carry no identity.
const NOISE_TOKENS: &[&str] = &[
    "fc", "afc", "cf", "sc", "fk", "sk", "jk", "cd", "club", "football",
];

/// Colloquial and localized team names mapped to one canonical spelling.
/// Keys and values are already in normalized form.
static TEAM_ALIASES: Lazy<HashMap<&'static str, &'static str>> = Lazy::new(|| {
    HashMap::from([
        ("man utd", "manchester united"),
        ("man united", "manchester united"),
        ("manchester utd", "manchester united"),
        ("man city", "manchester city"),
        ("spurs", "tottenham hotspur"),
        ("tottenham", "tottenham hotspur"),
        ("wolves", "wolverhampton wanderers"),
        ("wolverhampton", "wolverhampton wanderers"),
        ("newcastle", "newcastle united"),
        ("psg", "paris saint germain"),
        ("paris sg", "paris saint germain"),
        ("inter", "internazionale"),
        ("inter milan", "internazionale"),
        ("ac milan", "milan"),
        ("bayern", "bayern munich"),
        ("bayern munchen", "bayern munich"),
        ("dortmund", "borussia dortmund"),
        ("bvb", "borussia dortmund"),
        ("atletico", "atletico madrid"),
        ("atl madrid", "atletico madrid"),
        ("ajax amsterdam", "ajax"),
        ("dinamo kiev", "dinamo kyiv"),
        ("dynamo kyiv", "dinamo kyiv"),
        ("shakhtar", "shakhtar donetsk"),
        ("red star belgrade", "crvena zvezda"),
        ("rapid vienna", "rapid wien"),
        ("austria vienna", "austria wien"),
        ("red bull salzburg", "salzburg"),
        ("rb salzburg", "salzburg"),
        ("slavia prague", "slavia praha"),
        ("sparta prague", "sparta praha"),
        ("legia warsaw", "legia warszawa"),
        ("paok thessaloniki", "paok"),
        ("olympiakos", "olympiacos"),
        ("fener", "fenerbahce"),
        ("gala", "galatasaray"),
        ("bjk", "besiktas"),
    ])
});

/// Market families the scanner can compare.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Display, EnumString,
)]
pub enum MarketKind {
    /// Three-way full-time result: home, draw, away.
    #[strum(serialize = "1X2")]
    MatchResult,
}

/// Outcome within a 1X2 market.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Display, EnumString,
)]
pub enum Selection {
    /// Home win.
    Home,
    /// Draw.
    Draw,
    /// Away win.
    Away,
}

static MARKET_ALIASES: Lazy<HashMap<&'static str, MarketKind>> = Lazy::new(|| {
    use MarketKind::MatchResult;
    HashMap::from([
        ("1x2", MatchResult),
        ("1 x 2", MatchResult),
        ("1/x/2", MatchResult),
        ("home/draw/away", MatchResult),
        ("match result", MatchResult),
        ("match odds", MatchResult),
        ("full time result", MatchResult),
        ("fulltime result", MatchResult),
        ("ft result", MatchResult),
        ("three way", MatchResult),
        ("3way", MatchResult),
        ("mac sonucu", MatchResult),
    ])
});

static SELECTION_ALIASES: Lazy<HashMap<&'static str, Selection>> = Lazy::new(|| {
    use Selection::{Away, Draw, Home};
    HashMap::from([
        ("1", Home),
        ("home", Home),
        ("home win", Home),
        ("ms 1", Home),
        ("x", Draw),
        ("draw", Draw),
        ("tie", Draw),
        ("the draw", Draw),
        ("ms x", Draw),
        ("beraberlik", Draw),
        ("2", Away),
        ("away", Away),
        ("away win", Away),
        ("ms 2", Away),
    ])
});

/// Strip diacritics the scraped sites actually use, so "Beşiktaş" and
/// "Besiktas" compare equal.
fn fold_char(c: char) -> Option<char> {
    let folded = match c {
        'á' | 'à' | 'â' | 'ä' | 'ã' | 'å' => 'a',
        'ç' | 'ć' | 'č' => 'c',
        'đ' => 'd',
        'é' | 'è' | 'ê' | 'ë' => 'e',
        'ğ' => 'g',
        'í' | 'ì' | 'î' | 'ï' | 'ı' => 'i',
        'ł' => 'l',
        'ñ' => 'n',
        'ó' | 'ò' | 'ô' | 'ö' | 'õ' | 'ø' => 'o',
        'ř' => 'r',
        'ş' | 'š' => 's',
        'ú' | 'ù' | 'û' | 'ü' => 'u',
        'ý' => 'y',
        'ž' => 'z',
        // Combining marks left over from lowercasing 'İ'.
        '\u{0300}'..='\u{036f}' => return None,
        // "F.C." and "Nott'm" read as single tokens.
        '.' | '\'' => return None,
        other => other,
    };
    Some(folded)
}

/// Lowercase, fold accents, turn punctuation into spaces and collapse runs of
/// whitespace.
fn fold(label: &str) -> String {
    let lowered: String = label.to_lowercase().chars().filter_map(fold_char).collect();
    NON_ALNUM.replace_all(&lowered, " ").trim().to_string()
}

/// Canonical form of a team name.
pub fn normalize_team(name: &str) -> String {
    let folded = fold(name);
    let stripped = folded
        .split_whitespace()
        .filter(|token| !NOISE_TOKENS.contains(token))
        .collect::<Vec<_>>()
        .join(" ");

    match TEAM_ALIASES.get(stripped.as_str()) {
        Some(canonical) => (*canonical).to_string(),
        None => stripped,
    }
}

/// Resolve a scraped market label.
pub fn canonical_market(label: &str) -> Option<MarketKind> {
    let lowered = label.trim().to_lowercase();
    let compact = lowered.split_whitespace().collect::<Vec<_>>().join(" ");
    if let Some(kind) = MARKET_ALIASES.get(compact.as_str()) {
        return Some(*kind);
    }
    MARKET_ALIASES.get(fold(label).as_str()).copied()
}

/// Resolve a scraped selection label. Sites that label outcomes by team name
/// are resolved against the event's participants.
pub fn canonical_selection(label: &str, event: &Event) -> Option<Selection> {
    let folded = fold(label);
    if let Some(selection) = SELECTION_ALIASES.get(folded.as_str()) {
        return Some(*selection);
    }

    let team = normalize_team(label);
    if team.is_empty() {
        None
    } else if team == normalize_team(&event.home) {
        Some(Selection::Home)
    } else if team == normalize_team(&event.away) {
        Some(Selection::Away)
    } else {
        None
    }
}
