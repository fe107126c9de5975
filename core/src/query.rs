//! The five TPC-B statements and the three ways of sending them.
//!
//! RULE: Every strategy runs the same template with the same arguments in
//! the same order. Strategies differ only in what goes over the wire:
//!   - Inline:            literal SQL text, no parameters
//!   - ParameterizedOnce: template + bound parameters, prepared per call
//!   - PreparedReused:    template prepared once per connection, re-bound

use crate::{
    config::QueryStrategy,
    error::BenchResult,
    types::{Balance, Delta, EntityId},
};
use rusqlite::{params_from_iter, Connection, OptionalExtension, Statement};
use std::fmt::Write as _;

pub const SELECT_ACCOUNT_BALANCE: &str = "SELECT abalance FROM pgbench_accounts WHERE  aid = ?";
// delta, aid
pub const UPDATE_ACCOUNTS: &str = "update pgbench_accounts SET abalance = abalance + ? WHERE aid = ?";
// delta, tid
pub const UPDATE_TELLERS: &str = "UPDATE pgbench_tellers SET tbalance = tbalance + ? WHERE  tid = ?";
// delta, bid
pub const UPDATE_BRANCHES: &str = "UPDATE pgbench_branches SET bbalance = bbalance + ? WHERE  bid = ?";
pub const INSERT_HISTORY: &str = "INSERT INTO pgbench_history(tid, bid, aid, delta) values (?,?,?,?)";

/// Returned by `read_account_balance` when the account does not exist.
pub const MISSING_BALANCE: Balance = -1;

/// One slot per statement the workload issues.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Operation {
    ReadAccountBalance,
    ApplyAccountDelta,
    ApplyTellerDelta,
    ApplyBranchDelta,
    AppendHistory,
}

impl Operation {
    pub fn template(&self) -> &'static str {
        match self {
            Self::ReadAccountBalance => SELECT_ACCOUNT_BALANCE,
            Self::ApplyAccountDelta  => UPDATE_ACCOUNTS,
            Self::ApplyTellerDelta   => UPDATE_TELLERS,
            Self::ApplyBranchDelta   => UPDATE_BRANCHES,
            Self::AppendHistory      => INSERT_HISTORY,
        }
    }

    fn slot(&self) -> usize {
        *self as usize
    }
}

/// Replace each `?` in `template`, left to right, with the next argument.
///
/// Placeholders beyond the last argument are left untouched; surplus
/// arguments are ignored.
pub fn prepare_query(template: &str, args: &[i64]) -> String {
    let mut out = String::with_capacity(template.len() + args.len() * 4);
    let mut args = args.iter();
    for ch in template.chars() {
        if ch == '?' {
            if let Some(value) = args.next() {
                let _ = write!(out, "{value}");
                continue;
            }
        }
        out.push(ch);
    }
    out
}

/// Prepared statements for one connection, created on first use.
///
/// The cache borrows the connection, so it can never outlive it and the
/// connection cannot be closed while handles are alive.
pub struct StatementCache<'conn> {
    conn:     &'conn Connection,
    slots:    [Option<Statement<'conn>>; 5],
    prepared: usize,
}

impl<'conn> StatementCache<'conn> {
    pub fn new(conn: &'conn Connection) -> Self {
        Self {
            conn,
            slots: Default::default(),
            prepared: 0,
        }
    }

    /// The handle for `op`, preparing it if this is the first call.
    pub fn statement(&mut self, op: Operation) -> BenchResult<&mut Statement<'conn>> {
        let slot = &mut self.slots[op.slot()];
        let stmt = match slot.take() {
            Some(stmt) => stmt,
            None => {
                self.prepared += 1;
                log::debug!("preparing {op:?}");
                self.conn.prepare(op.template())?
            }
        };
        Ok(slot.insert(stmt))
    }

    /// How many statements have been compiled so far.
    pub fn prepared(&self) -> usize {
        self.prepared
    }
}

/// Runs the workload statements on one connection with one strategy.
pub struct QueryExecutor<'conn> {
    conn:     &'conn Connection,
    strategy: QueryStrategy,
    cache:    StatementCache<'conn>,
}

impl<'conn> QueryExecutor<'conn> {
    pub fn new(conn: &'conn Connection, strategy: QueryStrategy) -> Self {
        Self {
            conn,
            strategy,
            cache: StatementCache::new(conn),
        }
    }

    pub fn connection(&self) -> &'conn Connection {
        self.conn
    }

    pub fn cache(&self) -> &StatementCache<'conn> {
        &self.cache
    }

    pub fn read_account_balance(&mut self, aid: EntityId) -> BenchResult<Balance> {
        let op = Operation::ReadAccountBalance;
        let balance = match self.strategy {
            QueryStrategy::Inline => self
                .conn
                .query_row(&prepare_query(op.template(), &[aid]), (), |row| row.get(0))
                .optional()?,
            QueryStrategy::ParameterizedOnce => self
                .conn
                .query_row(op.template(), [aid], |row| row.get(0))
                .optional()?,
            QueryStrategy::PreparedReused => self
                .cache
                .statement(op)?
                .query_row([aid], |row| row.get(0))
                .optional()?,
        };
        Ok(balance.unwrap_or(MISSING_BALANCE))
    }

    pub fn apply_account_delta(&mut self, delta: Delta, aid: EntityId) -> BenchResult<bool> {
        self.execute(Operation::ApplyAccountDelta, &[delta, aid])
    }

    pub fn apply_teller_delta(&mut self, delta: Delta, tid: EntityId) -> BenchResult<bool> {
        self.execute(Operation::ApplyTellerDelta, &[delta, tid])
    }

    pub fn apply_branch_delta(&mut self, delta: Delta, bid: EntityId) -> BenchResult<bool> {
        self.execute(Operation::ApplyBranchDelta, &[delta, bid])
    }

    pub fn append_history(
        &mut self,
        tid: EntityId,
        bid: EntityId,
        aid: EntityId,
        delta: Delta,
    ) -> BenchResult<bool> {
        self.execute(Operation::AppendHistory, &[tid, bid, aid, delta])
    }

    /// Run a row-changing statement. True when exactly one row changed.
    fn execute(&mut self, op: Operation, args: &[i64]) -> BenchResult<bool> {
        let changed = match self.strategy {
            QueryStrategy::Inline => self.conn.execute(&prepare_query(op.template(), args), ())?,
            QueryStrategy::ParameterizedOnce => {
                self.conn.execute(op.template(), params_from_iter(args))?
            }
            QueryStrategy::PreparedReused => {
                self.cache.statement(op)?.execute(params_from_iter(args))?
            }
        };
        Ok(changed == 1)
    }
}
