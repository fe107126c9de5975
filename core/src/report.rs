//! End-of-run report.

use crate::{
    client::ClientSummary,
    config::QueryStrategy,
    sampler::MemorySample,
};
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::fmt;
use std::time::Duration;

#[derive(Debug, Clone, Serialize)]
pub struct RunReport {
    pub run_id:                   String,
    pub started_at:               DateTime<Utc>,
    pub clients:                  usize,
    pub transactions_per_client:  u64,
    pub strategy:                 QueryStrategy,
    pub select_only:              bool,
    pub transaction_blocks:       bool,
    pub elapsed_secs:             f64,
    pub transaction_count:        u64,
    pub failed_transaction_count: u64,
    pub transactions_per_second:  f64,
    pub failure_ratio:            f64,
    pub memory:                   MemorySample,
    pub per_client:               Vec<ClientSummary>,
}

impl RunReport {
    pub fn successful_transaction_count(&self) -> u64 {
        self.transaction_count
            .saturating_sub(self.failed_transaction_count)
    }
}

/// Committed transactions per second. Zero when nothing ran or no time
/// elapsed.
pub fn throughput(total: u64, failed: u64, elapsed: Duration) -> f64 {
    let secs = elapsed.as_secs_f64();
    if total == 0 || secs <= 0.0 {
        return 0.0;
    }
    total.saturating_sub(failed) as f64 / secs
}

/// Fraction of attempted transactions that failed. Zero when nothing ran.
pub fn failure_ratio(total: u64, failed: u64) -> f64 {
    if total == 0 {
        return 0.0;
    }
    failed as f64 / total as f64
}

impl fmt::Display for RunReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "* Benchmark Report *")?;
        writeln!(f, "--------------------")?;
        writeln!(f)?;
        writeln!(
            f,
            "Time to execute {} transactions: {:.3} seconds.",
            self.transaction_count, self.elapsed_secs
        )?;
        writeln!(
            f,
            "Max/Min memory usage: {} / {} kb",
            self.memory.max_kb(),
            self.memory.min_kb()
        )?;
        writeln!(
            f,
            "{} / {} failed to complete.",
            self.failed_transaction_count, self.transaction_count
        )?;
        write!(f, "Transaction rate: {:.2} txn/sec.", self.transactions_per_second)
    }
}
