//! Recording notifier for tests.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;

use super::Notifier;
use crate::arbitrage::Opportunity;
use crate::error::NotifyError;

/// Records every report it is handed; can be told to fail.
#[derive(Debug, Clone, Default)]
pub struct MockNotifier {
    reports: Arc<Mutex<Vec<Vec<Opportunity>>>>,
    fail: Arc<AtomicBool>,
}

impl MockNotifier {
    /// A notifier that accepts everything.
    pub fn new() -> Self {
        Self::default()
    }

    /// A notifier that rejects everything (reports are still recorded).
    pub fn failing() -> Self {
        let notifier = Self::default();
        notifier.set_failing(true);
        notifier
    }

    /// Toggle failure.
    pub fn set_failing(&self, fail: bool) {
        self.fail.store(fail, Ordering::SeqCst);
    }

    /// Every `send` call so far, in order.
    pub fn reports(&self) -> Vec<Vec<Opportunity>> {
        self.reports.lock().unwrap().clone()
    }

    /// All delivered opportunities flattened, in send order.
    pub fn opportunities(&self) -> Vec<Opportunity> {
        self.reports().into_iter().flatten().collect()
    }

    /// Number of `send` calls.
    pub fn send_count(&self) -> usize {
        self.reports.lock().unwrap().len()
    }
}

#[async_trait]
impl Notifier for MockNotifier {
    async fn send(&self, report: &[Opportunity]) -> Result<(), NotifyError> {
        self.reports.lock().unwrap().push(report.to_vec());

        if self.fail.load(Ordering::SeqCst) {
            return Err(NotifyError::Other("mock notifier failure".to_string()));
        }
        Ok(())
    }
}
