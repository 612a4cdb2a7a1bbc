//! LAY-odds scanner.
//!
//! Pulls odds snapshots from a betting exchange (the reference site, LAY
//! prices) and a bookmaker (the comparator site), pairs quotes that describe
//! the same bet and alerts when the comparator pays more than the LAY price
//! by an amount inside a configurable range.
//!
//! # Edge
//!
//! ```text
//! reference LAY:    2.00
//! comparator BACK:  2.20
//! ─────────────────────
//! diff_abs:  +0.20
//! diff_pct:  +10.00%   (inside [-1%, 30%] → alert)
//! ```
//!
//! # Modules
//!
//! - [`config`]: Configuration loading from environment
//! - [`error`]: Unified error types
//! - [`quote`]: Quote model and validation of scraped records
//! - [`matching`]: Name normalization and cross-site pairing
//! - [`arbitrage`]: Edge scoring, thresholds and dedupe
//! - [`feeds`]: Snapshot sources
//! - [`notify`]: Alert rendering and delivery
//! - [`scan`]: Scan cycle and scheduler
//! - [`api`]: HTTP API for health/metrics
//! - [`metrics`]: Prometheus counters and histograms
//! - [`utils`]: Signal handling and shutdown

pub mod api;
pub mod arbitrage;
pub mod config;
pub mod error;
pub mod feeds;
pub mod matching;
pub mod metrics;
pub mod notify;
pub mod quote;
pub mod scan;
pub mod utils;

pub use config::Config;
pub use error::{BotError, Result};
