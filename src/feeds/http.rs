//! HTTP snapshot feed.

use std::time::{Duration, Instant};

use async_trait::async_trait;
use tracing::{debug, instrument};

use super::{parse_snapshot, QuoteFetcher};
use crate::error::FetchError;
use crate::metrics;
use crate::quote::RawRecord;

/// Pulls a JSON snapshot with a GET request.
#[derive(Debug, Clone)]
pub struct HttpFeedFetcher {
    /// HTTP client for feed requests.
    http: reqwest::Client,
    /// Site identifier.
    source: String,
    /// Snapshot URL.
    url: String,
}

impl HttpFeedFetcher {
    /// Create a fetcher with a pooled client bounded by `timeout`.
    pub fn new(source: &str, url: &str, timeout: Duration) -> Self {
        let http = reqwest::Client::builder()
            .timeout(timeout)
            .connect_timeout(Duration::from_secs(5))
            .tcp_keepalive(Duration::from_secs(30))
            .pool_idle_timeout(Duration::from_secs(90))
            .build()
            .unwrap_or_default();

        Self::with_client(source, url, http)
    }

    /// Create a fetcher over an existing client.
    pub fn with_client(source: &str, url: &str, http: reqwest::Client) -> Self {
        Self {
            http,
            source: source.to_string(),
            url: url.to_string(),
        }
    }

    fn request_error(&self, e: reqwest::Error) -> FetchError {
        FetchError::Request {
            source_name: self.source.clone(),
            reason: e.to_string(),
        }
    }
}

#[async_trait]
impl QuoteFetcher for HttpFeedFetcher {
    fn source(&self) -> &str {
        &self.source
    }

    #[instrument(skip(self), fields(source = %self.source))]
    async fn fetch_quotes(&self) -> Result<Vec<RawRecord>, FetchError> {
        let start = Instant::now();

        let response = self
            .http
            .get(&self.url)
            .header(reqwest::header::ACCEPT, "application/json")
            .send()
            .await
            .map_err(|e| self.request_error(e))?;

        let status = response.status();
        if !status.is_success() {
            return Err(FetchError::Status {
                source_name: self.source.clone(),
                status: status.as_u16(),
            });
        }

        let body = response.bytes().await.map_err(|e| self.request_error(e))?;
        let quotes = parse_snapshot(&self.source, &body)?;

        metrics::record_fetch_latency(start, &self.source);
        debug!(records = quotes.len(), bytes = body.len(), "Snapshot fetched");

        Ok(quotes)
    }
}
