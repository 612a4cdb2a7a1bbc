//! Scripted fetcher for tests.
//!
//! Responses are served in order; the last one repeats once the script runs
//! out, so a single-entry script behaves like a static feed.

use std::collections::VecDeque;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;

use super::QuoteFetcher;
use crate::error::FetchError;
use crate::quote::{RawQuote, RawRecord};

/// One scripted fetch outcome.
#[derive(Debug, Clone)]
pub enum MockResponse {
    /// Return these records.
    Quotes(Vec<RawQuote>),
    /// Return these records verbatim, malformed ones included.
    Records(Vec<RawRecord>),
    /// Fail with a request error carrying this reason.
    Fail(String),
}

/// Mock quote source.
#[derive(Debug, Clone)]
pub struct MockFetcher {
    source: String,
    script: Arc<Mutex<VecDeque<MockResponse>>>,
    latency: Duration,
    calls: Arc<AtomicUsize>,
}

impl MockFetcher {
    /// A source that always returns `quotes`.
    pub fn new(source: &str, quotes: Vec<RawQuote>) -> Self {
        Self::scripted(source, vec![MockResponse::Quotes(quotes)])
    }

    /// A source that always fails.
    pub fn failing(source: &str, reason: &str) -> Self {
        Self::scripted(source, vec![MockResponse::Fail(reason.to_string())])
    }

    /// A source that plays `responses` in order.
    pub fn scripted(source: &str, responses: Vec<MockResponse>) -> Self {
        Self {
            source: source.to_string(),
            script: Arc::new(Mutex::new(responses.into())),
            latency: Duration::ZERO,
            calls: Arc::new(AtomicUsize::new(0)),
        }
    }

    /// Delay every fetch by `latency`.
    pub fn with_latency(mut self, latency: Duration) -> Self {
        self.latency = latency;
        self
    }

    /// Number of fetches started so far.
    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    fn next_response(&self) -> MockResponse {
        let mut script = self.script.lock().unwrap();
        if script.len() > 1 {
            script.pop_front().unwrap_or(MockResponse::Quotes(Vec::new()))
        } else {
            script.front().cloned().unwrap_or(MockResponse::Quotes(Vec::new()))
        }
    }
}

#[async_trait]
impl QuoteFetcher for MockFetcher {
    fn source(&self) -> &str {
        &self.source
    }

    async fn fetch_quotes(&self) -> Result<Vec<RawRecord>, FetchError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        let response = self.next_response();

        if !self.latency.is_zero() {
            tokio::time::sleep(self.latency).await;
        }

        match response {
            MockResponse::Quotes(quotes) => Ok(quotes.iter().map(RawQuote::to_record).collect()),
            MockResponse::Records(records) => Ok(records),
            MockResponse::Fail(reason) => Err(FetchError::Request {
                source_name: self.source.clone(),
                reason,
            }),
        }
    }
}
