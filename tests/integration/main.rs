//! Integration tests for the LAY-odds scanner.
//!
//! Every test drives [`Scanner::run_cycle`](lay_arb::scan::Scanner) end to
//! end with scripted sources and a recording notifier or a local fake Bot
//! API; the clock is passed in
//! explicitly so dedupe windows are deterministic.

mod common;
mod cycle;
mod feeds;
mod telegram;
