//! Telegram Bot API: alert broadcast and command polling.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use time::{OffsetDateTime, UtcOffset};
use tracing::{debug, info, instrument, warn};

use super::commands::CommandHandler;
use super::format::format_report;
use super::subscribers::SubscriberStore;
use super::Notifier;
use crate::arbitrage::Opportunity;
use crate::error::NotifyError;
use crate::utils::Shutdown;

/// Public Bot API endpoint.
pub const TELEGRAM_API_URL: &str = "https://api.telegram.org";

/// Long-poll wait passed to `getUpdates`.
pub const POLL_TIMEOUT_SECS: u64 = 5;

/// Pause after a failed `getUpdates` call.
const POLL_RETRY_DELAY: Duration = Duration::from_secs(5);

/// Request timeout for calls that do not long-poll.
const REQUEST_TIMEOUT: Duration = Duration::from_secs(10);

/// `sendMessage` request body.
#[derive(Debug, Serialize)]
struct SendMessage<'a> {
    chat_id: i64,
    text: &'a str,
    disable_web_page_preview: bool,
}

/// `getUpdates` request body.
#[derive(Debug, Serialize)]
struct GetUpdates {
    offset: i64,
    timeout: u64,
    allowed_updates: [&'static str; 1],
}

/// Bot API envelope. Errors come back with `ok: false` and a description,
/// usually alongside a 4xx status.
#[derive(Debug, Deserialize)]
#[serde(bound(deserialize = "T: Deserialize<'de>"))]
struct ApiResponse<T> {
    ok: bool,
    #[serde(default)]
    description: Option<String>,
    #[serde(default)]
    result: Option<T>,
}

/// One entry of a `getUpdates` result.
#[derive(Debug, Clone, Deserialize)]
pub struct Update {
    /// Monotonic update id.
    pub update_id: i64,
    /// Present for new text messages.
    #[serde(default)]
    pub message: Option<Message>,
}

/// Incoming chat message.
#[derive(Debug, Clone, Deserialize)]
pub struct Message {
    /// Chat the message was posted in.
    pub chat: Chat,
    /// Sender, absent for channel posts.
    #[serde(default)]
    pub from: Option<User>,
    /// Message text.
    #[serde(default)]
    pub text: Option<String>,
}

/// Chat reference.
#[derive(Debug, Clone, Deserialize)]
pub struct Chat {
    /// Chat id, negative for groups.
    pub id: i64,
}

/// Message sender.
#[derive(Debug, Clone, Deserialize)]
pub struct User {
    /// Telegram username.
    #[serde(default)]
    pub username: Option<String>,
    /// First name.
    #[serde(default)]
    pub first_name: Option<String>,
}

impl User {
    /// Username, falling back to the first name.
    pub fn display_name(&self) -> Option<&str> {
        self.username.as_deref().or(self.first_name.as_deref())
    }
}

/// Thin Bot API client.
#[derive(Debug, Clone)]
pub struct TelegramApi {
    /// HTTP client for Bot API requests.
    http: reqwest::Client,
    /// API base URL.
    base_url: String,
    /// Bot token.
    token: String,
}

impl TelegramApi {
    /// Client for the public Bot API.
    pub fn new(token: &str) -> Self {
        Self::with_base_url(TELEGRAM_API_URL, token)
    }

    /// Client for a custom API host.
    pub fn with_base_url(base_url: &str, token: &str) -> Self {
        Self {
            http: reqwest::Client::new(),
            base_url: base_url.trim_end_matches('/').to_string(),
            token: token.to_string(),
        }
    }

    /// Post `text` into `chat_id`.
    pub async fn send_message(&self, chat_id: i64, text: &str) -> Result<(), NotifyError> {
        let body = SendMessage {
            chat_id,
            text,
            disable_web_page_preview: true,
        };
        self.call::<_, serde_json::Value>("sendMessage", &body, REQUEST_TIMEOUT)
            .await
            .map(|_| ())
    }

    /// Fetch updates from `offset` on, waiting up to `timeout_secs` for one
    /// to arrive.
    pub async fn get_updates(&self, offset: i64, timeout_secs: u64) -> Result<Vec<Update>, NotifyError> {
        let body = GetUpdates {
            offset,
            timeout: timeout_secs,
            allowed_updates: ["message"],
        };
        let updates: Option<Vec<Update>> = self
            .call("getUpdates", &body, REQUEST_TIMEOUT + Duration::from_secs(timeout_secs))
            .await?;
        Ok(updates.unwrap_or_default())
    }

    async fn call<B, T>(&self, method: &str, body: &B, timeout: Duration) -> Result<Option<T>, NotifyError>
    where
        B: Serialize + ?Sized,
        T: DeserializeOwned,
    {
        let url = format!("{}/bot{}/{}", self.base_url, self.token, method);

        let response = self.http.post(&url).timeout(timeout).json(body).send().await?;
        let status = response.status();
        let api: ApiResponse<T> = match response.json().await {
            Ok(api) => api,
            Err(_) if !status.is_success() => {
                return Err(NotifyError::Rejected(format!("HTTP {}", status)));
            }
            Err(e) => return Err(NotifyError::Request(e)),
        };

        if !api.ok {
            return Err(NotifyError::Rejected(
                api.description
                    .unwrap_or_else(|| format!("HTTP {}", status)),
            ));
        }

        Ok(api.result)
    }
}

/// Broadcasts alerts to every registered chat.
///
/// Each chat gets the full report. A failure for one chat does not stop
/// delivery to the others: when only some chats were reached the call
/// returns [`NotifyError::Partial`], and when none were reached it returns
/// the last failure.
#[derive(Debug, Clone)]
pub struct TelegramNotifier {
    api: TelegramApi,
    subscribers: Arc<SubscriberStore>,
    /// Offset for rendered timestamps.
    offset: UtcOffset,
}

impl TelegramNotifier {
    /// Create a notifier delivering through `api` to `subscribers`.
    pub fn new(api: TelegramApi, subscribers: Arc<SubscriberStore>, offset: UtcOffset) -> Self {
        Self {
            api,
            subscribers,
            offset,
        }
    }

    async fn deliver(&self, chat_id: i64, messages: &[String]) -> Result<(), NotifyError> {
        for message in messages {
            self.api.send_message(chat_id, message).await?;
        }
        Ok(())
    }
}

#[async_trait]
impl Notifier for TelegramNotifier {
    #[instrument(skip(self, report), fields(opportunities = report.len()))]
    async fn send(&self, report: &[Opportunity]) -> Result<(), NotifyError> {
        let messages = format_report(report, self.offset);
        if messages.is_empty() {
            return Ok(());
        }

        let chat_ids = self.subscribers.chat_ids().await;
        if chat_ids.is_empty() {
            warn!("No subscribers, alert dropped");
            return Ok(());
        }

        let mut delivered = Vec::with_capacity(chat_ids.len());
        let mut last_error = None;
        for &chat_id in &chat_ids {
            match self.deliver(chat_id, &messages).await {
                Ok(()) => delivered.push(chat_id),
                Err(e) => {
                    warn!(chat_id, error = %e, "Alert delivery to chat failed");
                    last_error = Some(e);
                }
            }
        }

        if !delivered.is_empty() {
            if let Err(e) = self
                .subscribers
                .record_deliveries(&delivered, OffsetDateTime::now_utc())
                .await
            {
                warn!(error = %e, "Failed to save delivery counts");
            }
        }

        match last_error {
            None => {
                debug!(messages = messages.len(), chats = delivered.len(), "Telegram alert delivered");
                Ok(())
            }
            Some(e) if delivered.is_empty() => Err(e),
            Some(e) => Err(NotifyError::Partial {
                delivered: delivered.len(),
                attempted: chat_ids.len(),
                last_error: e.to_string(),
            }),
        }
    }
}

/// Long-polls `getUpdates` and answers chat commands.
#[derive(Debug)]
pub struct CommandPoller {
    api: TelegramApi,
    handler: CommandHandler,
    /// Next update id to ask for.
    next_update: i64,
}

impl CommandPoller {
    /// Create a poller starting from the oldest pending update.
    pub fn new(api: TelegramApi, handler: CommandHandler) -> Self {
        Self {
            api,
            handler,
            next_update: 0,
        }
    }

    /// Fetch one batch of updates and reply to every text message in it.
    /// Returns the number of messages answered.
    pub async fn poll_once(&mut self, timeout_secs: u64) -> Result<usize, NotifyError> {
        let updates = self.api.get_updates(self.next_update, timeout_secs).await?;

        let mut answered = 0;
        for update in updates {
            self.next_update = self.next_update.max(update.update_id + 1);

            let Some(message) = update.message else {
                continue;
            };
            let Some(text) = message.text.as_deref() else {
                continue;
            };

            let name = message.from.as_ref().and_then(User::display_name);
            let reply = self
                .handler
                .handle(message.chat.id, name, text, OffsetDateTime::now_utc())
                .await;
            match self.api.send_message(message.chat.id, &reply).await {
                Ok(()) => answered += 1,
                Err(e) => warn!(chat_id = message.chat.id, error = %e, "Failed to answer command"),
            }
        }

        Ok(answered)
    }

    /// Poll until `shutdown` fires. Failed polls are retried after a pause.
    pub async fn run(mut self, shutdown: Shutdown) {
        info!("Command poller started");

        loop {
            let result = tokio::select! {
                result = self.poll_once(POLL_TIMEOUT_SECS) => result,
                _ = shutdown.requested() => break,
            };

            if let Err(e) = result {
                warn!(error = %e, "getUpdates failed, retrying");
                tokio::select! {
                    _ = tokio::time::sleep(POLL_RETRY_DELAY) => {}
                    _ = shutdown.requested() => break,
                }
            }
        }

        info!("Command poller stopped");
    }
}
