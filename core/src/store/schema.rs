//! Table definitions for the four pgbench tables.
//!
//! Keys are declared inline because SQLite cannot add a primary key or a
//! foreign key to an existing table.

use crate::config::InitOptions;

pub const BRANCHES: &str = "pgbench_branches";
pub const TELLERS: &str = "pgbench_tellers";
pub const ACCOUNTS: &str = "pgbench_accounts";
pub const HISTORY: &str = "pgbench_history";

/// Child tables first, so drops and deletes never orphan a row.
pub const TEARDOWN_ORDER: [&str; 4] = [HISTORY, ACCOUNTS, TELLERS, BRANCHES];

#[derive(Debug, Clone)]
pub struct ColumnDdl {
    pub name: &'static str,
    pub ty:   String,
}

#[derive(Debug, Clone)]
pub struct TableDdl {
    pub name:    &'static str,
    pub columns: Vec<ColumnDdl>,
}

impl TableDdl {
    fn new(name: &'static str) -> Self {
        Self { name, columns: Vec::new() }
    }

    fn column(mut self, name: &'static str, ty: impl Into<String>) -> Self {
        self.columns.push(ColumnDdl { name, ty: ty.into() });
        self
    }

    pub fn create_statement(&self) -> String {
        let columns = self
            .columns
            .iter()
            .map(|c| format!("{} {}", c.name, c.ty))
            .collect::<Vec<_>>()
            .join(", ");
        format!("CREATE TABLE IF NOT EXISTS {} ({columns})", self.name)
    }
}

/// The standard tables in creation order (parents first).
pub fn standard_tables(opts: &InitOptions) -> Vec<TableDdl> {
    let keyed = opts.primary_keys || opts.foreign_keys;
    let id = |base: &str| {
        if keyed {
            format!("{base} not null primary key")
        } else {
            format!("{base} not null")
        }
    };
    let parent = |base: &str, table: &str, column: &str| {
        if opts.foreign_keys {
            format!("{base} references {table}({column})")
        } else {
            base.to_string()
        }
    };
    let aid_type = if opts.big_integers { "bigint" } else { "int" };

    vec![
        TableDdl::new(BRANCHES)
            .column("bid", id("int"))
            .column("bbalance", "int")
            .column("filler", "char(88)"),
        TableDdl::new(TELLERS)
            .column("tid", id("int"))
            .column("bid", parent("int", BRANCHES, "bid"))
            .column("tbalance", "int")
            .column("filler", "char(84)"),
        TableDdl::new(ACCOUNTS)
            .column("aid", id(aid_type))
            .column("bid", parent("int", BRANCHES, "bid"))
            .column("abalance", "int")
            .column("filler", "char(84)"),
        TableDdl::new(HISTORY)
            .column("tid", parent("int", TELLERS, "tid"))
            .column("bid", parent("int", BRANCHES, "bid"))
            .column("aid", parent(aid_type, ACCOUNTS, "aid"))
            .column("delta", "int")
            .column("mtime", "timestamp default current_timestamp")
            .column("filler", "char(22)"),
    ]
}
