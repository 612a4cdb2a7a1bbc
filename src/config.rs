//! Application configuration loaded from environment variables.

use rust_decimal::Decimal;
use serde::Deserialize;
use strum::{Display, EnumString};

use crate::error::ConfigError;

/// Longest accepted dedupe window: one week.
pub const MAX_DEDUPE_MINUTES: u64 = 7 * 24 * 60;

/// How surviving opportunities are handed to the notifier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Display, EnumString, Default)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase", ascii_case_insensitive)]
pub enum AlertMode {
    /// One report per cycle, most profitable first.
    #[default]
    Batch,
    /// One message per opportunity, most profitable first.
    Each,
}

/// Application configuration loaded from environment variables.
#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    // === Scan Cadence ===
    /// Seconds between scan cycles.
    #[serde(default = "default_scan_interval")]
    pub scan_interval_seconds: u64,

    /// Per-fetch timeout in seconds.
    #[serde(default = "default_fetch_timeout")]
    pub fetch_timeout_seconds: u64,

    /// Grace period for in-flight fetches after shutdown is requested.
    #[serde(default = "default_shutdown_grace")]
    pub shutdown_grace_seconds: u64,

    // === Thresholds ===
    /// Lowest edge (percent) that still alerts, inclusive.
    #[serde(default = "default_min_diff_pct")]
    pub min_diff_pct: Decimal,

    /// Highest edge (percent) that still alerts, inclusive.
    #[serde(default = "default_max_diff_pct")]
    pub max_diff_pct: Decimal,

    /// Minutes an alerted opportunity stays suppressed.
    #[serde(default = "default_dedupe_minutes")]
    pub alert_dedupe_minutes: u64,

    // === Sources ===
    /// Identifier of the LAY (reference) site.
    #[serde(default = "default_reference_site")]
    pub reference_site: String,

    /// Identifier of the comparator site.
    #[serde(default = "default_comparator_site")]
    pub comparator_site: String,

    /// Snapshot feed of the reference scraper (http(s):// or file://).
    #[serde(default)]
    pub reference_feed_url: Option<String>,

    /// Snapshot feed of the comparator scraper (http(s):// or file://).
    #[serde(default)]
    pub comparator_feed_url: Option<String>,

    // === Alerts ===
    /// Batch or per-opportunity delivery.
    #[serde(default)]
    pub alert_mode: AlertMode,

    /// Telegram bot token; alerts are logged when unset.
    #[serde(default)]
    pub telegram_bot_token: Option<String>,

    /// Chat registered for alerts at startup, in addition to chats that
    /// sent `/start`.
    #[serde(default)]
    pub telegram_chat_id: Option<i64>,

    /// JSON file holding the registered chats.
    #[serde(default = "default_subscribers_file")]
    pub subscribers_file: String,

    /// Hour offset from UTC used when rendering timestamps in alerts.
    #[serde(default)]
    pub alert_utc_offset_hours: i8,

    // === Server Configuration ===
    /// HTTP server port for health/metrics endpoints.
    #[serde(default = "default_port")]
    pub port: u16,

    /// Log level (trace, debug, info, warn, error).
    #[serde(default = "default_log_level")]
    pub rust_log: String,

    /// Emit logs as JSON lines.
    #[serde(default)]
    pub log_json: bool,

    /// Enable verbose logging.
    #[serde(default)]
    pub verbose: bool,
}

fn default_scan_interval() -> u64 {
    60
}

fn default_fetch_timeout() -> u64 {
    20
}

fn default_shutdown_grace() -> u64 {
    5
}

fn default_min_diff_pct() -> Decimal {
    Decimal::new(-10, 1) // -1.0
}

fn default_max_diff_pct() -> Decimal {
    Decimal::new(300, 1) // 30.0
}

fn default_dedupe_minutes() -> u64 {
    10
}

fn default_reference_site() -> String {
    "orbit".to_string()
}

fn default_comparator_site() -> String {
    "golbet724".to_string()
}

fn default_subscribers_file() -> String {
    "subscribers.json".to_string()
}

fn default_port() -> u16 {
    8080
}

fn default_log_level() -> String {
    "info".to_string()
}

impl Default for Config {
    fn default() -> Self {
        Self {
            scan_interval_seconds: default_scan_interval(),
            fetch_timeout_seconds: default_fetch_timeout(),
            shutdown_grace_seconds: default_shutdown_grace(),
            min_diff_pct: default_min_diff_pct(),
            max_diff_pct: default_max_diff_pct(),
            alert_dedupe_minutes: default_dedupe_minutes(),
            reference_site: default_reference_site(),
            comparator_site: default_comparator_site(),
            reference_feed_url: None,
            comparator_feed_url: None,
            alert_mode: AlertMode::default(),
            telegram_bot_token: None,
            telegram_chat_id: None,
            subscribers_file: default_subscribers_file(),
            alert_utc_offset_hours: 0,
            port: default_port(),
            rust_log: default_log_level(),
            log_json: false,
            verbose: false,
        }
    }
}

impl Config {
    /// Load configuration from environment, reading .env file first.
    pub fn load() -> Result<Self, envy::Error> {
        dotenvy::dotenv().ok();
        envy::from_env()
    }

    /// Check if the configuration is valid.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.scan_interval_seconds == 0 {
            return Err(ConfigError::NotPositive("SCAN_INTERVAL_SECONDS"));
        }

        if self.alert_dedupe_minutes == 0 {
            return Err(ConfigError::NotPositive("ALERT_DEDUPE_MINUTES"));
        }

        if self.alert_dedupe_minutes > MAX_DEDUPE_MINUTES {
            return Err(ConfigError::TooLarge {
                name: "ALERT_DEDUPE_MINUTES",
                max: MAX_DEDUPE_MINUTES,
            });
        }

        if self.fetch_timeout_seconds == 0 {
            return Err(ConfigError::NotPositive("FETCH_TIMEOUT_SECONDS"));
        }

        if self.min_diff_pct > self.max_diff_pct {
            return Err(ConfigError::InvertedRange {
                min: self.min_diff_pct,
                max: self.max_diff_pct,
            });
        }

        if self.telegram_chat_id.is_some() && self.telegram_bot_token.is_none() {
            return Err(ConfigError::PartialTelegram);
        }

        if time::UtcOffset::from_hms(self.alert_utc_offset_hours, 0, 0).is_err() {
            return Err(ConfigError::BadUtcOffset(self.alert_utc_offset_hours));
        }

        Ok(())
    }

    /// Scan interval as a [`std::time::Duration`].
    pub fn scan_interval(&self) -> std::time::Duration {
        std::time::Duration::from_secs(self.scan_interval_seconds)
    }

    /// Dedupe window as a [`time::Duration`], capped at [`MAX_DEDUPE_MINUTES`].
    pub fn dedupe_window(&self) -> time::Duration {
        time::Duration::minutes(self.alert_dedupe_minutes.min(MAX_DEDUPE_MINUTES) as i64)
    }

    /// Offset used to render alert timestamps.
    pub fn alert_offset(&self) -> time::UtcOffset {
        time::UtcOffset::from_hms(self.alert_utc_offset_hours, 0, 0).unwrap_or(time::UtcOffset::UTC)
    }

    /// Check if Telegram delivery is configured.
    pub fn telegram_enabled(&self) -> bool {
        self.telegram_bot_token.is_some()
    }
}
