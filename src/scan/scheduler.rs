//! Fixed-cadence driver for [`Scanner::run_cycle`].

use std::time::Duration;

use time::OffsetDateTime;
use tokio::time::MissedTickBehavior;
use tracing::{debug, info};

use super::cycle::Scanner;
use crate::arbitrage::DedupeStore;
use crate::utils::Shutdown;

/// Run cycles every `interval` until `shutdown` fires. Returns the number of
/// cycles run.
///
/// The first cycle starts immediately. Each cycle is awaited before the next
/// tick is taken, so cycles never overlap; ticks missed while a slow cycle
/// runs are dropped rather than bunched up.
pub async fn run_scheduler<S: DedupeStore>(
    scanner: &Scanner<S>,
    interval: Duration,
    shutdown: Shutdown,
) -> u64 {
    let mut ticker = tokio::time::interval(interval);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);

    info!(interval_secs = interval.as_secs_f64(), "Scheduler started");

    let mut cycles = 0u64;
    loop {
        tokio::select! {
            _ = ticker.tick() => {}
            _ = shutdown.requested() => break,
        }
        if shutdown.is_requested() {
            break;
        }

        let report = scanner.run_cycle(OffsetDateTime::now_utc()).await;
        cycles += 1;
        debug!(cycles, outcome = %report.outcome, "Tick done");
    }

    info!(cycles, "Scheduler stopped");
    cycles
}
