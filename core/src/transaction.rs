//! One TPC-B transaction.
//!
//! ORDER (fixed, never reordered, no step skipped):
//!   1. account balance += delta
//!   2. read the account balance back
//!   3. teller balance  += delta
//!   4. branch balance  += delta
//!   5. append a history row
//!   6. commit (transaction blocks only)
//!
//! Select-only mode runs a single balance read and never opens a
//! transaction scope.

use crate::{
    config::RunConfig,
    error::BenchResult,
    query::QueryExecutor,
    types::{Balance, Delta, EntityId},
};
use rusqlite::{Transaction, TransactionBehavior};

/// The random inputs of one transaction.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TransactionInputs {
    pub aid:   EntityId,
    pub bid:   EntityId,
    pub tid:   EntityId,
    pub delta: Delta,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TxnOutcome {
    /// Account balance read during the transaction.
    pub balance: Balance,
    /// Whether a transaction scope was opened and committed.
    pub framed:  bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TransactionProtocol {
    select_only:        bool,
    transaction_blocks: bool,
}

impl TransactionProtocol {
    pub fn new(select_only: bool, transaction_blocks: bool) -> Self {
        Self { select_only, transaction_blocks }
    }

    pub fn from_config(config: &RunConfig) -> Self {
        Self::new(config.select_only, config.transaction_blocks)
    }

    /// Run one transaction. Any error aborts the remaining steps; an open
    /// scope is rolled back when it is dropped on the error path.
    pub fn execute(
        &self,
        exec: &mut QueryExecutor<'_>,
        inputs: &TransactionInputs,
    ) -> BenchResult<TxnOutcome> {
        if self.select_only {
            let balance = exec.read_account_balance(inputs.aid)?;
            return Ok(TxnOutcome { balance, framed: false });
        }

        let scope = if self.transaction_blocks {
            Some(Transaction::new_unchecked(
                exec.connection(),
                TransactionBehavior::Immediate,
            )?)
        } else {
            None
        };

        let balance = Self::mutate(exec, inputs)?;

        let framed = match scope {
            Some(tx) => {
                tx.commit()?;
                true
            }
            None => false,
        };
        Ok(TxnOutcome { balance, framed })
    }

    fn mutate(exec: &mut QueryExecutor<'_>, inputs: &TransactionInputs) -> BenchResult<Balance> {
        let TransactionInputs { aid, bid, tid, delta } = *inputs;

        if !exec.apply_account_delta(delta, aid)? {
            log::debug!("account {aid} update changed no row");
        }
        let balance = exec.read_account_balance(aid)?;
        if !exec.apply_teller_delta(delta, tid)? {
            log::debug!("teller {tid} update changed no row");
        }
        if !exec.apply_branch_delta(delta, bid)? {
            log::debug!("branch {bid} update changed no row");
        }
        if !exec.append_history(tid, bid, aid, delta)? {
            log::debug!("history insert for account {aid} changed no row");
        }
        Ok(balance)
    }
}
