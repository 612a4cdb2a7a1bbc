//! On-disk snapshot feed, for scrapers that write to a shared volume and for
//! one-off scans.

use std::path::{Path, PathBuf};
use std::time::Instant;

use async_trait::async_trait;
use tracing::debug;

use super::{parse_snapshot, QuoteFetcher};
use crate::error::FetchError;
use crate::metrics;
use crate::quote::RawRecord;

/// Reads a JSON snapshot from a file on every fetch.
#[derive(Debug, Clone)]
pub struct FileFeedFetcher {
    source: String,
    path: PathBuf,
}

impl FileFeedFetcher {
    /// Create a fetcher for `path`.
    pub fn new(source: &str, path: impl AsRef<Path>) -> Self {
        Self {
            source: source.to_string(),
            path: path.as_ref().to_path_buf(),
        }
    }
}

#[async_trait]
impl QuoteFetcher for FileFeedFetcher {
    fn source(&self) -> &str {
        &self.source
    }

    async fn fetch_quotes(&self) -> Result<Vec<RawRecord>, FetchError> {
        let start = Instant::now();

        let body = tokio::fs::read(&self.path)
            .await
            .map_err(|e| FetchError::Request {
                source_name: self.source.clone(),
                reason: format!("{}: {}", self.path.display(), e),
            })?;
        let quotes = parse_snapshot(&self.source, &body)?;

        metrics::record_fetch_latency(start, &self.source);
        debug!(source = %self.source, path = %self.path.display(), records = quotes.len(), "Snapshot read");

        Ok(quotes)
    }
}
