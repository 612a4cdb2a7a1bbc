//! Snapshot sources.
//!
//! Each site is scraped by an external process that publishes its current
//! odds as a JSON array of raw records. A [`QuoteFetcher`] pulls one snapshot
//! per scan cycle and only checks its outer shape; every record is decoded
//! and validated later in [`crate::quote::ingest`].

pub mod file;
pub mod http;
pub mod mock;

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use serde::Deserialize;

use crate::error::{ConfigError, FetchError};
use crate::quote::RawRecord;

pub use file::FileFeedFetcher;
pub use http::HttpFeedFetcher;
pub use mock::{MockFetcher, MockResponse};

/// One odds source.
///
/// A failed fetch leaves no trace: implementations must not cache partial
/// snapshots or mutate shared state on the error path.
#[async_trait]
pub trait QuoteFetcher: Send + Sync {
    /// Site identifier stamped on every quote from this source.
    fn source(&self) -> &str;

    /// Pull the current snapshot.
    async fn fetch_quotes(&self) -> Result<Vec<RawRecord>, FetchError>;
}

/// Accepted snapshot shapes: a bare array or `{"quotes": [...]}`.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum Snapshot {
    List(Vec<RawRecord>),
    Wrapped { quotes: Vec<RawRecord> },
}

/// Split a snapshot body into its records. Only the envelope is checked here.
pub fn parse_snapshot(source: &str, body: &[u8]) -> Result<Vec<RawRecord>, FetchError> {
    let snapshot: Snapshot = serde_json::from_slice(body).map_err(|e| FetchError::Parse {
        source_name: source.to_string(),
        reason: e.to_string(),
    })?;

    Ok(match snapshot {
        Snapshot::List(quotes) | Snapshot::Wrapped { quotes } => quotes,
    })
}

/// Build a fetcher for `url`: `http(s)://` feeds go over the network,
/// `file://` feeds are read from disk.
pub fn fetcher_from_url(
    source: &str,
    url: &str,
    timeout: Duration,
) -> Result<Arc<dyn QuoteFetcher>, ConfigError> {
    if let Some(path) = url.strip_prefix("file://") {
        return Ok(Arc::new(FileFeedFetcher::new(source, path)));
    }

    if url.starts_with("http://") || url.starts_with("https://") {
        return Ok(Arc::new(HttpFeedFetcher::new(source, url, timeout)));
    }

    Err(ConfigError::BadFeedUrl(url.to_string()))
}
