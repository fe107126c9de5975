//! Shared run counters.
//!
//! RULE: Workers hold a StatsRecorder, which can only increment.
//! Reading the totals is reserved for the coordinator, which owns the
//! RunStatistics itself.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

#[derive(Debug, Default)]
pub struct RunStatistics {
    transactions: AtomicU64,
    failed:       AtomicU64,
}

impl RunStatistics {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    /// An increment-only handle for one worker.
    pub fn recorder(self: &Arc<Self>) -> StatsRecorder {
        StatsRecorder { stats: Arc::clone(self) }
    }

    pub fn transaction_count(&self) -> u64 {
        self.transactions.load(Ordering::Acquire)
    }

    pub fn failed_transaction_count(&self) -> u64 {
        self.failed.load(Ordering::Acquire)
    }

    pub fn successful_transaction_count(&self) -> u64 {
        self.transaction_count()
            .saturating_sub(self.failed_transaction_count())
    }
}

#[derive(Debug, Clone)]
pub struct StatsRecorder {
    stats: Arc<RunStatistics>,
}

impl StatsRecorder {
    /// Count one attempted transaction, successful or not.
    pub fn record_attempt(&self) {
        self.stats.transactions.fetch_add(1, Ordering::AcqRel);
    }

    pub fn record_failure(&self) {
        self.stats.failed.fetch_add(1, Ordering::AcqRel);
    }
}
