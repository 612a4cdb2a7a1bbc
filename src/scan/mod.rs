//! Scan cycle orchestration and scheduling.

pub mod cycle;
pub mod scheduler;
pub mod stats;

pub use cycle::{CycleOutcome, CycleReport, Scanner, ScannerSettings};
pub use scheduler::run_scheduler;
pub use stats::{LastCycle, ScanStats, StatsSnapshot};
