//! Plain-text alert rendering.

use rust_decimal::{Decimal, RoundingStrategy};
use time::macros::format_description;
use time::{OffsetDateTime, UtcOffset};

use crate::arbitrage::Opportunity;

/// Telegram rejects messages longer than this many characters.
pub const MAX_MESSAGE_CHARS: usize = 4096;

/// Render a timestamp in the alert offset.
pub fn format_timestamp(at: OffsetDateTime, offset: UtcOffset) -> String {
    let local = at.to_offset(offset);
    local
        .format(format_description!(
            "[year]-[month]-[day] [hour]:[minute]:[second] UTC[offset_hour sign:mandatory]:[offset_minute]"
        ))
        .unwrap_or_else(|_| local.to_string())
}

fn two_dp(value: Decimal) -> Decimal {
    value.round_dp_with_strategy(2, RoundingStrategy::MidpointAwayFromZero)
}

fn signed(value: Decimal) -> String {
    let rounded = two_dp(value);
    if rounded.is_sign_negative() && !rounded.is_zero() {
        format!("{:.2}", rounded)
    } else {
        format!("+{:.2}", rounded.abs())
    }
}

/// Render one opportunity.
///
/// ```text
/// ARBITRAGE SIGNAL (orbit LAY <= golbet724)
/// Match: Arsenal vs Chelsea (Premier League)
/// Market: 1X2 - Home
/// orbit LAY: 2.00
/// Other: 2.20 (golbet724)
/// Diff: +0.20 (+10.00%)
/// Detected: 2024-03-01 12:00:00 UTC+00:00
/// Kickoff: 2024-03-01 20:00:00 UTC+00:00
/// ```
pub fn format_alert(opportunity: &Opportunity, offset: UtcOffset) -> String {
    let reference = &opportunity.reference;
    let comparator = &opportunity.comparator;

    let mut lines = Vec::with_capacity(8);
    lines.push(format!(
        "ARBITRAGE SIGNAL ({} LAY <= {})",
        reference.source, comparator.source
    ));
    lines.push(match &reference.event.league {
        Some(league) => format!("Match: {} ({})", opportunity.match_name(), league),
        None => format!("Match: {}", opportunity.match_name()),
    });
    lines.push(format!(
        "Market: {} - {}",
        opportunity.key.market, opportunity.key.selection
    ));
    lines.push(format!("{} LAY: {:.2}", reference.source, two_dp(reference.price)));
    lines.push(format!(
        "Other: {:.2} ({})",
        two_dp(comparator.price),
        comparator.source
    ));
    lines.push(format!(
        "Diff: {} ({}%)",
        signed(opportunity.diff_abs),
        signed(opportunity.diff_pct)
    ));
    lines.push(format!(
        "Detected: {}",
        format_timestamp(opportunity.detected_at, offset)
    ));
    if let Some(kickoff) = reference.event.kickoff.or(comparator.event.kickoff) {
        lines.push(format!("Kickoff: {}", format_timestamp(kickoff, offset)));
    }

    lines.join("\n")
}

/// Render a cycle's opportunities as one or more messages.
///
/// A single opportunity is sent as a bare alert. Larger batches get a header
/// and are split between alerts so no message exceeds
/// [`MAX_MESSAGE_CHARS`]; the order of the input is kept.
pub fn format_report(opportunities: &[Opportunity], offset: UtcOffset) -> Vec<String> {
    match opportunities {
        [] => Vec::new(),
        [single] => vec![format_alert(single, offset)],
        many => {
            let header = format!("ARBITRAGE OPPORTUNITIES: {}", many.len());
            let alerts = many.iter().map(|opp| format_alert(opp, offset));
            pack_messages(header, alerts, MAX_MESSAGE_CHARS)
        }
    }
}

/// Pack `blocks` under `header`, splitting between blocks so no message
/// exceeds `limit` characters. A block too long to share a message with the
/// header is cut short and ends in an ellipsis.
fn pack_messages(
    header: String,
    blocks: impl Iterator<Item = String>,
    limit: usize,
) -> Vec<String> {
    let room = limit.saturating_sub(header.chars().count() + 2);
    let mut messages = Vec::new();
    let mut current = header;

    for block in blocks {
        let block = truncate_chars(block, room);
        let needed = current.chars().count() + 2 + block.chars().count();
        if needed > limit && !current.is_empty() {
            messages.push(std::mem::take(&mut current));
        }
        if !current.is_empty() {
            current.push_str("\n\n");
        }
        current.push_str(&block);
    }

    if !current.is_empty() {
        messages.push(current);
    }
    messages
}

fn truncate_chars(text: String, max: usize) -> String {
    if text.chars().count() <= max {
        return text;
    }
    let mut cut: String = text.chars().take(max.saturating_sub(1)).collect();
    if max > 0 {
        cut.push('\u{2026}');
    }
    cut
}
