//! Alert delivery.

pub mod commands;
pub mod format;
pub mod mock;
pub mod subscribers;
pub mod telegram;

use std::sync::Arc;

use async_trait::async_trait;
use time::{OffsetDateTime, UtcOffset};
use tracing::info;

use crate::arbitrage::Opportunity;
use crate::config::Config;
use crate::error::NotifyError;
use crate::utils::Shutdown;

pub use commands::{BotInfo, Command, CommandHandler};
pub use format::{format_alert, format_report};
pub use mock::MockNotifier;
pub use subscribers::{Subscriber, SubscriberStore};
pub use telegram::{CommandPoller, TelegramApi, TelegramNotifier};

/// Destination for a cycle's surviving opportunities.
#[async_trait]
pub trait Notifier: Send + Sync {
    /// Deliver `report`, already ordered most profitable first.
    async fn send(&self, report: &[Opportunity]) -> Result<(), NotifyError>;
}

/// Writes rendered alerts to the log. Used when no chat is configured.
#[derive(Debug, Clone)]
pub struct LogNotifier {
    offset: UtcOffset,
}

impl LogNotifier {
    /// Create a log notifier rendering timestamps at `offset`.
    pub fn new(offset: UtcOffset) -> Self {
        Self { offset }
    }
}

impl Default for LogNotifier {
    fn default() -> Self {
        Self::new(UtcOffset::UTC)
    }
}

#[async_trait]
impl Notifier for LogNotifier {
    async fn send(&self, report: &[Opportunity]) -> Result<(), NotifyError> {
        for message in format_report(report, self.offset) {
            info!("Alert:\n{}", message);
        }
        Ok(())
    }
}

/// Pick the notifier for `config`: Telegram when a bot token is present,
/// the log otherwise.
///
/// With Telegram this opens the subscriber list, registers
/// `TELEGRAM_CHAT_ID` when set and spawns the command poller, which runs
/// until `shutdown` fires.
pub async fn notifier_from_config(config: &Config, shutdown: Shutdown) -> crate::Result<Arc<dyn Notifier>> {
    let Some(token) = &config.telegram_bot_token else {
        info!("Telegram not configured, alerts go to the log");
        return Ok(Arc::new(LogNotifier::new(config.alert_offset())));
    };

    let subscribers = Arc::new(SubscriberStore::open(&config.subscribers_file).await?);
    if let Some(chat_id) = config.telegram_chat_id {
        subscribers.register(chat_id, None, OffsetDateTime::now_utc()).await?;
    }

    let api = TelegramApi::new(token);
    let handler = CommandHandler::new(subscribers.clone(), BotInfo::from_config(config), config.alert_offset());
    tokio::spawn(CommandPoller::new(api.clone(), handler).run(shutdown));

    info!(subscribers = subscribers.len().await, "Telegram alerts enabled");
    Ok(Arc::new(TelegramNotifier::new(api, subscribers, config.alert_offset())))
}
