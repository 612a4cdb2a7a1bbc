//! Unified error types for the odds scanner.

use rust_decimal::Decimal;
use thiserror::Error;

/// Unified error type for the odds scanner.
#[derive(Error, Debug)]
pub enum BotError {
    /// Configuration loading error.
    #[error("configuration error: {0}")]
    Config(#[from] envy::Error),

    /// Configuration values failed validation.
    #[error("invalid configuration: {0}")]
    InvalidConfig(#[from] ConfigError),

    /// Scraped record rejected at ingestion.
    #[error("validation error: {0}")]
    Validation(#[from] ValidationError),

    /// Source fetch error.
    #[error("fetch error: {0}")]
    Fetch(#[from] FetchError),

    /// Alert delivery error.
    #[error("notify error: {0}")]
    Notify(#[from] NotifyError),

    /// HTTP request error.
    #[error("http error: {0}")]
    Http(#[from] reqwest::Error),

    /// JSON parsing error.
    #[error("json error: {0}")]
    Json(#[from] serde_json::Error),

    /// IO error.
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

/// A scraped record that cannot become a [`Quote`](crate::quote::Quote).
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ValidationError {
    /// The record is not an object of the expected shape (wrong JSON types).
    #[error("malformed record: {0}")]
    Malformed(String),

    /// A required field was missing or blank.
    #[error("missing field: {0}")]
    MissingField(&'static str),

    /// Price was zero or negative.
    #[error("non-positive price: {0}")]
    NonPositivePrice(Decimal),

    /// Price outside the decimal odds range.
    #[error("price {price} outside ({min}, {max}]")]
    PriceOutOfRange {
        /// Offending price.
        price: Decimal,
        /// Exclusive lower bound.
        min: Decimal,
        /// Inclusive upper bound.
        max: Decimal,
    },

    /// Price could not be parsed as a decimal.
    #[error("unparseable price: {0}")]
    UnparseablePrice(String),

    /// Odds type was neither LAY nor BACK.
    #[error("unknown odds type: {0}")]
    UnknownOddsType(String),

    /// Timestamp was not RFC 3339.
    #[error("invalid timestamp for {field}: {value}")]
    InvalidTimestamp {
        /// Field holding the timestamp.
        field: &'static str,
        /// Raw value.
        value: String,
    },

    /// Both participants normalize to the same name.
    #[error("home and away are the same team: {0}")]
    SameParticipants(String),
}

/// Failure to obtain a snapshot from one source.
#[derive(Error, Debug)]
pub enum FetchError {
    /// Network request failed.
    #[error("request to {source_name} failed: {reason}")]
    Request {
        /// Source identifier.
        source_name: String,
        /// Reason for failure.
        reason: String,
    },

    /// Non-success HTTP status.
    #[error("{source_name} returned status {status}")]
    Status {
        /// Source identifier.
        source_name: String,
        /// HTTP status code.
        status: u16,
    },

    /// Snapshot body could not be parsed.
    #[error("failed to parse {source_name} snapshot: {reason}")]
    Parse {
        /// Source identifier.
        source_name: String,
        /// Reason for failure.
        reason: String,
    },

    /// Fetch did not finish within the per-fetch timeout.
    #[error("{source_name} fetch timed out after {timeout_secs}s")]
    Timeout {
        /// Source identifier.
        source_name: String,
        /// Timeout in seconds.
        timeout_secs: u64,
    },

    /// Fetch abandoned after shutdown grace elapsed.
    #[error("{source_name} fetch cancelled by shutdown")]
    Cancelled {
        /// Source identifier.
        source_name: String,
    },

    /// Source returned no usable records.
    #[error("{source_name} returned an empty snapshot")]
    Empty {
        /// Source identifier.
        source_name: String,
    },
}

impl FetchError {
    /// Source identifier the error belongs to.
    pub fn source_name(&self) -> &str {
        match self {
            FetchError::Request { source_name, .. }
            | FetchError::Status { source_name, .. }
            | FetchError::Parse { source_name, .. }
            | FetchError::Timeout { source_name, .. }
            | FetchError::Cancelled { source_name }
            | FetchError::Empty { source_name } => source_name,
        }
    }
}

/// Alert delivery failure.
#[derive(Error, Debug)]
pub enum NotifyError {
    /// Transport failure.
    #[error("notification request failed: {0}")]
    Request(#[from] reqwest::Error),

    /// The channel API rejected the message.
    #[error("notification rejected: {0}")]
    Rejected(String),

    /// Some subscribers got the alert and some did not.
    #[error("delivered to {delivered} of {attempted} chats, last failure: {last_error}")]
    Partial {
        /// Chats that received every message.
        delivered: usize,
        /// Chats attempted.
        attempted: usize,
        /// Most recent per-chat failure.
        last_error: String,
    },

    /// Anything else (used by test doubles).
    #[error("notification failed: {0}")]
    Other(String),
}

/// Configuration values that are present but unusable.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ConfigError {
    /// A value that must be positive was zero.
    #[error("{0} must be greater than 0")]
    NotPositive(&'static str),

    /// A value exceeded its upper bound.
    #[error("{name} must not exceed {max}")]
    TooLarge {
        /// Variable name.
        name: &'static str,
        /// Largest accepted value.
        max: u64,
    },

    /// Threshold range is inverted.
    #[error("MIN_DIFF_PCT ({min}) must not exceed MAX_DIFF_PCT ({max})")]
    InvertedRange {
        /// Lower bound.
        min: Decimal,
        /// Upper bound.
        max: Decimal,
    },

    /// A chat id was given without a bot token to reach it.
    #[error("TELEGRAM_CHAT_ID requires TELEGRAM_BOT_TOKEN")]
    PartialTelegram,

    /// UTC offset outside what `time` accepts.
    #[error("ALERT_UTC_OFFSET_HOURS out of range: {0}")]
    BadUtcOffset(i8),

    /// Feed URL is neither http(s):// nor file://.
    #[error("unsupported feed url: {0}")]
    BadFeedUrl(String),

    /// A feed URL needed to run was not set.
    #[error("{0} must be set")]
    MissingFeed(&'static str),
}

/// Convenient Result type alias.
pub type Result<T> = std::result::Result<T, BotError>;
