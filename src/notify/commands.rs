//! Chat commands that manage alert subscriptions.

use std::sync::Arc;

use rust_decimal::Decimal;
use strum::{Display, EnumString};
use time::{OffsetDateTime, UtcOffset};
use tracing::{debug, warn};

use super::format::format_timestamp;
use super::subscribers::SubscriberStore;
use crate::config::Config;

/// A recognized bot command.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Display, EnumString)]
#[strum(serialize_all = "lowercase", ascii_case_insensitive)]
pub enum Command {
    /// Subscribe the chat to alerts.
    Start,
    /// Unsubscribe the chat.
    Stop,
    /// Show the chat's subscription.
    Status,
    /// List commands.
    Help,
    /// Describe what the scanner watches.
    Info,
}

impl Command {
    /// Parse the first word of a message. The leading slash and a trailing
    /// `@botname` are optional.
    pub fn parse(text: &str) -> Option<Self> {
        let word = text.split_whitespace().next()?;
        let word = word.strip_prefix('/').unwrap_or(word);
        let word = word.split('@').next().unwrap_or(word);
        word.parse().ok()
    }
}

const COMMAND_LIST: &str = "/start - receive arbitrage alerts\n\
                            /stop - stop receiving alerts\n\
                            /status - show your subscription\n\
                            /help - list commands\n\
                            /info - what the scanner watches";

/// Scanner facts quoted by `/info`.
#[derive(Debug, Clone, PartialEq)]
pub struct BotInfo {
    /// LAY site.
    pub reference_site: String,
    /// Comparator site.
    pub comparator_site: String,
    /// Lowest alerting edge, percent.
    pub min_diff_pct: Decimal,
    /// Highest alerting edge, percent.
    pub max_diff_pct: Decimal,
    /// Seconds between cycles.
    pub scan_interval_seconds: u64,
}

impl BotInfo {
    /// Take the facts from the running configuration.
    pub fn from_config(config: &Config) -> Self {
        Self {
            reference_site: config.reference_site.clone(),
            comparator_site: config.comparator_site.clone(),
            min_diff_pct: config.min_diff_pct,
            max_diff_pct: config.max_diff_pct,
            scan_interval_seconds: config.scan_interval_seconds,
        }
    }
}

impl Default for BotInfo {
    fn default() -> Self {
        Self::from_config(&Config::default())
    }
}

/// Turns incoming chat messages into subscription changes and replies.
#[derive(Debug, Clone)]
pub struct CommandHandler {
    subscribers: Arc<SubscriberStore>,
    info: BotInfo,
    offset: UtcOffset,
}

impl CommandHandler {
    /// Create a handler over `subscribers`.
    pub fn new(subscribers: Arc<SubscriberStore>, info: BotInfo, offset: UtcOffset) -> Self {
        Self {
            subscribers,
            info,
            offset,
        }
    }

    /// Handle one message from `chat_id` and return the reply text.
    pub async fn handle(&self, chat_id: i64, name: Option<&str>, text: &str, now: OffsetDateTime) -> String {
        let command = Command::parse(text);
        debug!(chat_id, command = ?command, "Chat message received");

        match command {
            Some(Command::Start) => self.start(chat_id, name, now).await,
            Some(Command::Stop) => self.stop(chat_id).await,
            Some(Command::Status) => self.status(chat_id).await,
            Some(Command::Help) => format!("Commands:\n{}", COMMAND_LIST),
            Some(Command::Info) => self.info(),
            None => format!("Unknown command.\n\n{}", COMMAND_LIST),
        }
    }

    async fn start(&self, chat_id: i64, name: Option<&str>, now: OffsetDateTime) -> String {
        match self.subscribers.register(chat_id, name, now).await {
            Ok(true) => format!(
                "Welcome{}! You are now registered for arbitrage alerts.\n\
                 Alerts arrive when {} pays more than the {} LAY price.\n\n{}",
                name.map(|n| format!(", {}", n)).unwrap_or_default(),
                self.info.comparator_site,
                self.info.reference_site,
                COMMAND_LIST
            ),
            Ok(false) => "You are already registered. Send /status for details.".to_string(),
            Err(e) => {
                warn!(chat_id, error = %e, "Failed to register subscriber");
                "Registration failed, please try again later.".to_string()
            }
        }
    }

    async fn stop(&self, chat_id: i64) -> String {
        match self.subscribers.unregister(chat_id).await {
            Ok(true) => "Alerts stopped. Send /start to register again.".to_string(),
            Ok(false) => "You are not registered. Send /start to receive alerts.".to_string(),
            Err(e) => {
                warn!(chat_id, error = %e, "Failed to remove subscriber");
                "Could not stop alerts, please try again later.".to_string()
            }
        }
    }

    async fn status(&self, chat_id: i64) -> String {
        let Some(subscriber) = self.subscribers.get(chat_id).await else {
            return "You are not registered. Send /start to receive alerts.".to_string();
        };

        format!(
            "Status: registered\n\
             Registered: {}\n\
             Last alert: {}\n\
             Alerts received: {}",
            format_timestamp(subscriber.registered_at, self.offset),
            subscriber
                .last_notified
                .map(|at| format_timestamp(at, self.offset))
                .unwrap_or_else(|| "never".to_string()),
            subscriber.notifications
        )
    }

    fn info(&self) -> String {
        format!(
            "LAY-odds scanner\n\
             Compares {} LAY prices against {}.\n\
             Alert range: [{}%, {}%]\n\
             Scan interval: {}s",
            self.info.reference_site,
            self.info.comparator_site,
            self.info.min_diff_pct,
            self.info.max_diff_pct,
            self.info.scan_interval_seconds
        )
    }
}
