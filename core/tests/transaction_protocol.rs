//! Query executor and transaction protocol tests against a seeded database.
//!
//! Faults are injected with SQLite triggers that RAISE(ABORT), so every
//! failure path runs through the real driver.

use std::time::Duration;
use tpcb_core::{
    client::run_transaction,
    config::{InitOptions, QueryStrategy},
    query::{QueryExecutor, MISSING_BALANCE},
    scaling::ScaleConfig,
    stats::RunStatistics,
    store::BenchStore,
    transaction::{TransactionInputs, TransactionProtocol},
};

const ALL_STRATEGIES: [QueryStrategy; 3] = [
    QueryStrategy::Inline,
    QueryStrategy::ParameterizedOnce,
    QueryStrategy::PreparedReused,
];

const REJECT_TELLER_UPDATES: &str = "
    CREATE TRIGGER reject_teller_updates BEFORE UPDATE ON pgbench_tellers
    BEGIN
        SELECT RAISE(ABORT, 'teller update rejected');
    END;";

fn seeded_store(dir: &tempfile::TempDir) -> BenchStore {
    let path = dir.path().join("protocol.db");
    let store = BenchStore::open(path.to_str().unwrap(), Duration::from_secs(5)).unwrap();
    let opts = InitOptions { initialize: true, primary_keys: true, ..InitOptions::default() };
    store.initialize(&opts, &ScaleConfig::new(1)).unwrap();
    store
}

fn inputs(aid: i64, tid: i64, delta: i64) -> TransactionInputs {
    TransactionInputs { aid, bid: 0, tid, delta }
}

#[test]
fn every_strategy_reads_and_updates_the_same_rows() {
    let dir = tempfile::tempdir().unwrap();
    let store = seeded_store(&dir);

    for (i, strategy) in ALL_STRATEGIES.into_iter().enumerate() {
        let aid = 100 + i as i64;
        let mut exec = QueryExecutor::new(store.connection(), strategy);
        assert_eq!(exec.read_account_balance(aid).unwrap(), 0, "{strategy:?}");
        assert!(exec.apply_account_delta(-250, aid).unwrap(), "{strategy:?}");
        assert!(exec.apply_account_delta(40, aid).unwrap(), "{strategy:?}");
        assert_eq!(exec.read_account_balance(aid).unwrap(), -210, "{strategy:?}");
        assert!(exec.apply_teller_delta(7, 3).unwrap(), "{strategy:?}");
        assert!(exec.apply_branch_delta(7, 0).unwrap(), "{strategy:?}");
        assert!(exec.append_history(3, 0, aid, 7).unwrap(), "{strategy:?}");
    }

    let totals = store.totals().unwrap();
    assert_eq!(totals.accounts, -630);
    assert_eq!(totals.tellers, 21);
    assert_eq!(totals.branches, 21);
    assert_eq!(totals.history_rows, 3);
}

#[test]
fn missing_rows_are_reported_not_raised() {
    let dir = tempfile::tempdir().unwrap();
    let store = seeded_store(&dir);

    for strategy in ALL_STRATEGIES {
        let mut exec = QueryExecutor::new(store.connection(), strategy);
        assert_eq!(exec.read_account_balance(1_000_000).unwrap(), MISSING_BALANCE);
        assert!(!exec.apply_account_delta(5, 1_000_000).unwrap());
        assert!(!exec.apply_teller_delta(5, 99).unwrap());
        assert!(!exec.apply_branch_delta(5, 1).unwrap());
    }
}

#[test]
fn prepared_strategy_compiles_each_statement_once() {
    let dir = tempfile::tempdir().unwrap();
    let store = seeded_store(&dir);
    let protocol = TransactionProtocol::new(false, true);

    let mut exec = QueryExecutor::new(store.connection(), QueryStrategy::PreparedReused);
    for aid in 0..25 {
        protocol.execute(&mut exec, &inputs(aid, aid % 10, 1)).unwrap();
    }
    assert_eq!(exec.cache().prepared(), 5);

    let mut exec = QueryExecutor::new(store.connection(), QueryStrategy::Inline);
    protocol.execute(&mut exec, &inputs(1, 1, 1)).unwrap();
    assert_eq!(exec.cache().prepared(), 0);
}

#[test]
fn mutation_returns_post_update_balance() {
    let dir = tempfile::tempdir().unwrap();
    let store = seeded_store(&dir);

    for transaction_blocks in [true, false] {
        let protocol = TransactionProtocol::new(false, transaction_blocks);
        let mut exec = QueryExecutor::new(store.connection(), QueryStrategy::ParameterizedOnce);
        let aid = if transaction_blocks { 10 } else { 20 };

        let first = protocol.execute(&mut exec, &inputs(aid, 2, 300)).unwrap();
        let second = protocol.execute(&mut exec, &inputs(aid, 2, -120)).unwrap();
        assert_eq!(first.balance, 300);
        assert_eq!(second.balance, 180);
        assert_eq!(second.framed, transaction_blocks);
    }
    assert_eq!(store.history_count().unwrap(), 4);
}

#[test]
fn select_only_never_writes_or_opens_a_scope() {
    let dir = tempfile::tempdir().unwrap();
    let store = seeded_store(&dir);
    store.connection().execute("UPDATE pgbench_accounts SET abalance = 42 WHERE aid = 7", ()).unwrap();

    for transaction_blocks in [true, false] {
        let protocol = TransactionProtocol::new(true, transaction_blocks);
        for strategy in ALL_STRATEGIES {
            let mut exec = QueryExecutor::new(store.connection(), strategy);
            for _ in 0..10 {
                let outcome = protocol.execute(&mut exec, &inputs(7, 1, 500)).unwrap();
                assert_eq!(outcome.balance, 42);
                assert!(!outcome.framed);
                assert!(store.connection().is_autocommit());
            }
        }
    }

    let totals = store.totals().unwrap();
    assert_eq!(totals.history_rows, 0);
    assert_eq!(totals.accounts, 42);
    assert_eq!(totals.tellers, 0);
}

#[test]
fn teller_fault_rolls_back_a_framed_transaction() {
    let dir = tempfile::tempdir().unwrap();
    let store = seeded_store(&dir);
    store.connection().execute_batch(REJECT_TELLER_UPDATES).unwrap();

    let protocol = TransactionProtocol::new(false, true);
    let mut exec = QueryExecutor::new(store.connection(), QueryStrategy::PreparedReused);
    let result = protocol.execute(&mut exec, &inputs(5, 1, 77));
    assert!(result.is_err());

    // Step 1 was undone with the rest of the transaction.
    assert_eq!(store.account_balance(5).unwrap(), Some(0));
    assert_eq!(store.history_count().unwrap(), 0);
    assert!(store.connection().is_autocommit(), "scope must be closed after the fault");

    // The connection is still usable for the next transaction.
    assert_eq!(exec.read_account_balance(5).unwrap(), 0);
}

#[test]
fn teller_fault_without_blocks_keeps_earlier_steps() {
    let dir = tempfile::tempdir().unwrap();
    let store = seeded_store(&dir);
    store.connection().execute_batch(REJECT_TELLER_UPDATES).unwrap();

    let protocol = TransactionProtocol::new(false, false);
    let mut exec = QueryExecutor::new(store.connection(), QueryStrategy::Inline);
    assert!(protocol.execute(&mut exec, &inputs(5, 1, 77)).is_err());

    // Autocommit: step 1 stuck, steps 4 and 5 never ran.
    assert_eq!(store.account_balance(5).unwrap(), Some(77));
    let totals = store.totals().unwrap();
    assert_eq!(totals.branches, 0);
    assert_eq!(totals.history_rows, 0);
}

#[test]
fn each_faulting_attempt_counts_exactly_once() {
    let dir = tempfile::tempdir().unwrap();
    let store = seeded_store(&dir);
    store
        .connection()
        .execute_batch(
            "CREATE TRIGGER reject_teller_three BEFORE UPDATE ON pgbench_tellers
             WHEN OLD.tid = 3
             BEGIN
                 SELECT RAISE(ABORT, 'teller 3 is closed');
             END;",
        )
        .unwrap();

    let stats = RunStatistics::new();
    let recorder = stats.recorder();
    let protocol = TransactionProtocol::new(false, true);
    let mut exec = QueryExecutor::new(store.connection(), QueryStrategy::ParameterizedOnce);

    for (n, tid) in [1, 3, 2, 3, 3, 4].into_iter().enumerate() {
        let outcome = run_transaction(&protocol, &mut exec, &inputs(n as i64, tid, 10), &recorder, 0, true);
        assert_eq!(outcome.is_none(), tid == 3, "attempt {n} on teller {tid}");
        recorder.record_attempt();
    }

    assert_eq!(stats.transaction_count(), 6);
    assert_eq!(stats.failed_transaction_count(), 3);
    assert_eq!(store.history_count().unwrap(), 3);
    assert_eq!(store.totals().unwrap().accounts, 30);
}
