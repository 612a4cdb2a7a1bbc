//! Quote module: the canonical odds observation.
//!
//! This module handles:
//! - Quote, event and odds types
//! - Raw scraper records
//! - Ingestion-time validation

pub mod ingest;
pub mod types;

pub use ingest::{ingest, validate_price, IngestReport};
pub use types::{Event, OddsType, Quote, RawPrice, RawQuote, RawRecord, Sport};
