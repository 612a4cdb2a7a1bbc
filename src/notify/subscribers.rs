//! Chats registered for alerts, persisted as a JSON file.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use time::OffsetDateTime;
use tokio::sync::RwLock;
use tracing::{debug, info};

use crate::error::Result;

/// One chat that receives alerts.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Subscriber {
    /// Telegram chat id.
    pub chat_id: i64,
    /// Username or first name seen at registration.
    #[serde(default)]
    pub name: Option<String>,
    /// When the chat registered.
    #[serde(with = "time::serde::rfc3339")]
    pub registered_at: OffsetDateTime,
    /// Last successful alert delivery.
    #[serde(default, with = "time::serde::rfc3339::option")]
    pub last_notified: Option<OffsetDateTime>,
    /// Successful alert deliveries so far.
    #[serde(default)]
    pub notifications: u64,
}

/// On-disk layout.
#[derive(Debug, Default, Serialize, Deserialize)]
struct SubscriberFile {
    #[serde(default)]
    subscribers: Vec<Subscriber>,
}

/// Registry of alert recipients.
///
/// Every change is written through to the backing file (when there is one)
/// before the call returns, so a restart picks up exactly the chats that
/// were registered.
#[derive(Debug, Default)]
pub struct SubscriberStore {
    path: Option<PathBuf>,
    subscribers: RwLock<BTreeMap<i64, Subscriber>>,
}

impl SubscriberStore {
    /// A store that lives only in memory.
    pub fn in_memory() -> Self {
        Self::default()
    }

    /// Load the store at `path`. A missing file starts an empty store.
    pub async fn open(path: impl Into<PathBuf>) -> Result<Self> {
        let path = path.into();
        let subscribers: BTreeMap<i64, Subscriber> = match tokio::fs::read(&path).await {
            Ok(bytes) => {
                let file: SubscriberFile = serde_json::from_slice(&bytes)?;
                file.subscribers
                    .into_iter()
                    .map(|s| (s.chat_id, s))
                    .collect()
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => BTreeMap::new(),
            Err(e) => return Err(e.into()),
        };

        info!(path = %path.display(), subscribers = subscribers.len(), "Subscriber list loaded");

        Ok(Self {
            path: Some(path),
            subscribers: RwLock::new(subscribers),
        })
    }

    /// Register `chat_id`. Returns false if it was already registered.
    pub async fn register(&self, chat_id: i64, name: Option<&str>, now: OffsetDateTime) -> Result<bool> {
        let mut subscribers = self.subscribers.write().await;
        if subscribers.contains_key(&chat_id) {
            return Ok(false);
        }

        subscribers.insert(
            chat_id,
            Subscriber {
                chat_id,
                name: name.map(str::to_string),
                registered_at: now,
                last_notified: None,
                notifications: 0,
            },
        );
        self.persist(&subscribers).await?;

        info!(chat_id, name = name.unwrap_or("-"), total = subscribers.len(), "Subscriber registered");
        Ok(true)
    }

    /// Remove `chat_id`. Returns false if it was not registered.
    pub async fn unregister(&self, chat_id: i64) -> Result<bool> {
        let mut subscribers = self.subscribers.write().await;
        if subscribers.remove(&chat_id).is_none() {
            return Ok(false);
        }
        self.persist(&subscribers).await?;

        info!(chat_id, total = subscribers.len(), "Subscriber removed");
        Ok(true)
    }

    /// Registration record for `chat_id`.
    pub async fn get(&self, chat_id: i64) -> Option<Subscriber> {
        self.subscribers.read().await.get(&chat_id).cloned()
    }

    /// Every registered chat, ascending.
    pub async fn chat_ids(&self) -> Vec<i64> {
        self.subscribers.read().await.keys().copied().collect()
    }

    /// Number of registered chats.
    pub async fn len(&self) -> usize {
        self.subscribers.read().await.len()
    }

    /// Whether nobody is registered.
    pub async fn is_empty(&self) -> bool {
        self.subscribers.read().await.is_empty()
    }

    /// Count one successful alert for each of `chat_ids`. Chats that
    /// unregistered in the meantime are skipped.
    pub async fn record_deliveries(&self, chat_ids: &[i64], now: OffsetDateTime) -> Result<()> {
        let mut subscribers = self.subscribers.write().await;
        for chat_id in chat_ids {
            if let Some(subscriber) = subscribers.get_mut(chat_id) {
                subscriber.last_notified = Some(now);
                subscriber.notifications += 1;
            }
        }
        self.persist(&subscribers).await
    }

    /// Write the list next to the target and rename it into place.
    async fn persist(&self, subscribers: &BTreeMap<i64, Subscriber>) -> Result<()> {
        let Some(path) = &self.path else {
            return Ok(());
        };

        let file = SubscriberFile {
            subscribers: subscribers.values().cloned().collect(),
        };
        let body = serde_json::to_vec_pretty(&file)?;
        let tmp = temp_path(path);
        tokio::fs::write(&tmp, body).await?;
        tokio::fs::rename(&tmp, path).await?;

        debug!(path = %path.display(), subscribers = subscribers.len(), "Subscriber list saved");
        Ok(())
    }
}

fn temp_path(path: &Path) -> PathBuf {
    let mut name = path.file_name().map(|n| n.to_os_string()).unwrap_or_default();
    name.push(".tmp");
    path.with_file_name(name)
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use time::macros::datetime;

    const T0: OffsetDateTime = datetime!(2024-03-01 12:00 UTC);

    fn scratch_file(name: &str) -> PathBuf {
        std::env::temp_dir().join(format!("lay-arb-subscribers-{}-{}.json", name, std::process::id()))
    }

    #[tokio::test]
    async fn register_is_idempotent() {
        let store = SubscriberStore::in_memory();

        assert!(store.register(42, Some("alice"), T0).await.unwrap());
        assert!(!store.register(42, Some("alice"), T0).await.unwrap());

        assert_eq!(store.len().await, 1);
        assert_eq!(store.get(42).await.unwrap().name.as_deref(), Some("alice"));
    }

    #[tokio::test]
    async fn unregister_reports_unknown_chats() {
        let store = SubscriberStore::in_memory();
        store.register(42, None, T0).await.unwrap();

        assert!(store.unregister(42).await.unwrap());
        assert!(!store.unregister(42).await.unwrap());
        assert!(store.is_empty().await);
    }

    #[tokio::test]
    async fn deliveries_are_counted_per_chat() {
        let store = SubscriberStore::in_memory();
        store.register(1, None, T0).await.unwrap();
        store.register(2, None, T0).await.unwrap();

        store.record_deliveries(&[1, 3], T0 + time::Duration::minutes(1)).await.unwrap();

        let first = store.get(1).await.unwrap();
        assert_eq!(first.notifications, 1);
        assert_eq!(first.last_notified, Some(datetime!(2024-03-01 12:01 UTC)));
        assert_eq!(store.get(2).await.unwrap().notifications, 0);
        assert_eq!(store.chat_ids().await, vec![1, 2]);
    }

    #[tokio::test]
    async fn list_survives_a_reopen() {
        let path = scratch_file("reopen");
        tokio::fs::remove_file(&path).await.ok();

        let store = SubscriberStore::open(&path).await.unwrap();
        assert!(store.is_empty().await);
        store.register(-1001, Some("desk"), T0).await.unwrap();
        store.register(42, None, T0).await.unwrap();
        store.record_deliveries(&[42], T0).await.unwrap();
        store.unregister(-1001).await.unwrap();
        drop(store);

        let reopened = SubscriberStore::open(&path).await.unwrap();
        tokio::fs::remove_file(&path).await.ok();

        assert_eq!(reopened.chat_ids().await, vec![42]);
        let subscriber = reopened.get(42).await.unwrap();
        assert_eq!(subscriber.registered_at, T0);
        assert_eq!(subscriber.notifications, 1);
    }

    #[tokio::test]
    async fn corrupt_file_is_an_error() {
        let path = scratch_file("corrupt");
        tokio::fs::write(&path, b"not json").await.unwrap();

        let result = SubscriberStore::open(&path).await;
        tokio::fs::remove_file(&path).await.ok();

        assert!(matches!(result, Err(crate::BotError::Json(_))));
    }
}
