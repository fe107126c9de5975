//! SQLite persistence layer for setup and inspection.
//!
//! RULE: Schema, seeding and maintenance SQL lives here.
//! The timed workload goes through query.rs, never through BenchStore.

pub mod schema;

use crate::{
    config::{InitOptions, Maintenance},
    error::BenchResult,
    scaling::{EntityKind, ScaleConfig},
    types::{Balance, EntityId},
};
use rusqlite::{params, Connection, OpenFlags, OptionalExtension};
use schema::{ACCOUNTS, BRANCHES, HISTORY, TEARDOWN_ORDER, TELLERS};
use std::time::Duration;

/// Open one connection to the benchmark database.
///
/// Accepts plain paths and `file:` URIs, so several connections can share a
/// named in-memory database (`file:bench?mode=memory&cache=shared`).
pub fn open_connection(path: &str, busy_timeout: Duration) -> BenchResult<Connection> {
    let conn = Connection::open_with_flags(
        path,
        OpenFlags::SQLITE_OPEN_READ_WRITE
            | OpenFlags::SQLITE_OPEN_CREATE
            | OpenFlags::SQLITE_OPEN_URI
            | OpenFlags::SQLITE_OPEN_NO_MUTEX,
    )?;
    conn.busy_timeout(busy_timeout)?;
    // WAL only applies to real files; in-memory databases ignore it.
    if let Err(e) = conn.execute_batch("PRAGMA journal_mode=WAL;") {
        log::debug!("{path}: WAL not enabled: {e}");
    }
    conn.execute_batch("PRAGMA foreign_keys=ON;")?;
    Ok(conn)
}

/// Sums over every balance column plus the history table.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct BalanceTotals {
    pub accounts:      Balance,
    pub tellers:       Balance,
    pub branches:      Balance,
    pub history_delta: Balance,
    pub history_rows:  i64,
}

pub struct BenchStore {
    conn:         Connection,
    path:         String,
    busy_timeout: Duration,
}

impl BenchStore {
    pub fn open(path: &str, busy_timeout: Duration) -> BenchResult<Self> {
        let conn = open_connection(path, busy_timeout)?;
        Ok(Self {
            conn,
            path: path.to_string(),
            busy_timeout,
        })
    }

    /// Open a fresh connection to the same database.
    pub fn reopen(&self) -> BenchResult<Connection> {
        open_connection(&self.path, self.busy_timeout)
    }

    pub fn path(&self) -> &str {
        &self.path
    }

    pub fn connection(&self) -> &Connection {
        &self.conn
    }

    /// Give up the store and keep its connection (handed to client 0).
    pub fn into_connection(self) -> Connection {
        self.conn
    }

    // ── Setup ─────────────────────────────────────────────────

    /// Drop, create, empty and seed the tables as `opts` asks.
    pub fn initialize(&self, opts: &InitOptions, scale: &ScaleConfig) -> BenchResult<()> {
        if opts.drop_tables {
            self.drop_tables()?;
        }
        self.create_tables(opts)?;
        if opts.truncate {
            self.truncate_tables()?;
        }
        self.seed(scale)?;
        Ok(())
    }

    pub fn drop_tables(&self) -> BenchResult<()> {
        for table in TEARDOWN_ORDER {
            self.conn.execute_batch(&format!("DROP TABLE IF EXISTS {table}"))?;
        }
        log::debug!("dropped benchmark tables");
        Ok(())
    }

    pub fn create_tables(&self, opts: &InitOptions) -> BenchResult<()> {
        for table in schema::standard_tables(opts) {
            self.conn.execute_batch(&table.create_statement())?;
        }
        Ok(())
    }

    pub fn truncate_tables(&self) -> BenchResult<()> {
        for table in TEARDOWN_ORDER {
            self.conn.execute_batch(&format!("DELETE FROM {table}"))?;
        }
        Ok(())
    }

    /// Populate branches, tellers and accounts with zero balances.
    /// One transaction, one prepared insert per table.
    pub fn seed(&self, scale: &ScaleConfig) -> BenchResult<()> {
        let tx = self.conn.unchecked_transaction()?;
        {
            let mut insert = tx.prepare(&format!(
                "INSERT INTO {BRANCHES}(bid, bbalance) VALUES (?1, 0)"
            ))?;
            for bid in 0..scale.total_branches() {
                insert.execute(params![bid])?;
            }

            let mut insert = tx.prepare(&format!(
                "INSERT INTO {TELLERS}(tid, bid, tbalance) VALUES (?1, ?2, 0)"
            ))?;
            for tid in 0..scale.total_tellers() {
                insert.execute(params![tid, scale.teller_owner_branch(tid)])?;
            }

            let mut insert = tx.prepare(&format!(
                "INSERT INTO {ACCOUNTS}(aid, bid, abalance) VALUES (?1, ?2, 0)"
            ))?;
            for aid in 0..scale.total_accounts() {
                insert.execute(params![aid, scale.account_owner_branch(aid)])?;
            }
        }
        tx.commit()?;
        log::info!(
            "seeded {} branches, {} tellers, {} accounts",
            scale.total_branches(),
            scale.total_tellers(),
            scale.total_accounts()
        );
        Ok(())
    }

    pub fn maintain(&self, mode: Maintenance) -> BenchResult<()> {
        match mode {
            Maintenance::Skip => {}
            Maintenance::Standard => {
                self.conn.execute_batch(&format!(
                    "DELETE FROM {HISTORY}; ANALYZE {TELLERS}; ANALYZE {BRANCHES};"
                ))?;
            }
            Maintenance::Full => {
                self.conn.execute_batch("VACUUM; ANALYZE;")?;
            }
        }
        log::debug!("maintenance {mode:?} done");
        Ok(())
    }

    // ── Inspection ────────────────────────────────────────────

    pub fn row_count(&self, table: &str) -> BenchResult<i64> {
        let count = self
            .conn
            .query_row(&format!("SELECT COUNT(*) FROM {table}"), [], |row| row.get(0))?;
        Ok(count)
    }

    pub fn history_count(&self) -> BenchResult<i64> {
        self.row_count(HISTORY)
    }

    pub fn account_balance(&self, aid: EntityId) -> BenchResult<Option<Balance>> {
        let balance = self
            .conn
            .query_row(
                &format!("SELECT abalance FROM {ACCOUNTS} WHERE aid = ?1"),
                params![aid],
                |row| row.get(0),
            )
            .optional()?;
        Ok(balance)
    }

    pub fn account_owner(&self, aid: EntityId) -> BenchResult<Option<EntityId>> {
        let bid = self
            .conn
            .query_row(
                &format!("SELECT bid FROM {ACCOUNTS} WHERE aid = ?1"),
                params![aid],
                |row| row.get(0),
            )
            .optional()?;
        Ok(bid)
    }

    pub fn teller_owner(&self, tid: EntityId) -> BenchResult<Option<EntityId>> {
        let bid = self
            .conn
            .query_row(
                &format!("SELECT bid FROM {TELLERS} WHERE tid = ?1"),
                params![tid],
                |row| row.get(0),
            )
            .optional()?;
        Ok(bid)
    }

    /// Every `(id, balance)` pair of one entity table, ordered by id.
    pub fn balances(&self, kind: EntityKind) -> BenchResult<Vec<(EntityId, Balance)>> {
        let (table, id, balance) = match kind {
            EntityKind::Branch  => (BRANCHES, "bid", "bbalance"),
            EntityKind::Teller  => (TELLERS, "tid", "tbalance"),
            EntityKind::Account => (ACCOUNTS, "aid", "abalance"),
        };
        let mut stmt = self
            .conn
            .prepare(&format!("SELECT {id}, {balance} FROM {table} ORDER BY {id}"))?;
        let rows = stmt.query_map([], |row| Ok((row.get(0)?, row.get(1)?)))?;
        rows.collect::<Result<Vec<_>, _>>().map_err(Into::into)
    }

    pub fn totals(&self) -> BenchResult<BalanceTotals> {
        let sum = |sql: String| -> BenchResult<i64> {
            Ok(self.conn.query_row(&sql, [], |row| row.get(0))?)
        };
        Ok(BalanceTotals {
            accounts:      sum(format!("SELECT COALESCE(SUM(abalance), 0) FROM {ACCOUNTS}"))?,
            tellers:       sum(format!("SELECT COALESCE(SUM(tbalance), 0) FROM {TELLERS}"))?,
            branches:      sum(format!("SELECT COALESCE(SUM(bbalance), 0) FROM {BRANCHES}"))?,
            history_delta: sum(format!("SELECT COALESCE(SUM(delta), 0) FROM {HISTORY}"))?,
            history_rows:  sum(format!("SELECT COUNT(*) FROM {HISTORY}"))?,
        })
    }
}
