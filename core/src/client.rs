//! Simulated client: one connection, a fixed number of transactions.

use crate::{
    config::{QueryStrategy, RunConfig},
    query::QueryExecutor,
    rng::ClientRng,
    scaling::ScaleConfig,
    stats::StatsRecorder,
    transaction::{TransactionInputs, TransactionProtocol, TxnOutcome},
    types::{Balance, ClientId},
};
use rusqlite::Connection;
use serde::Serialize;

/// Balance reported for a transaction that failed.
pub const FAILED_BALANCE: Balance = 0;

/// What one client did, returned when its thread is joined.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct ClientSummary {
    pub client:    ClientId,
    pub attempted: u64,
    pub failed:    u64,
}

pub struct ClientWorker {
    id:           ClientId,
    transactions: u64,
    conn:         Connection,
    rng:          ClientRng,
    scale:        ScaleConfig,
    protocol:     TransactionProtocol,
    strategy:     QueryStrategy,
    verbose:      bool,
    recorder:     StatsRecorder,
}

impl ClientWorker {
    pub fn new(
        id: ClientId,
        conn: Connection,
        config: &RunConfig,
        rng: ClientRng,
        recorder: StatsRecorder,
    ) -> Self {
        Self {
            id,
            transactions: config.transactions_per_client,
            conn,
            rng,
            scale: config.scale_config(),
            protocol: TransactionProtocol::from_config(config),
            strategy: config.strategy,
            verbose: config.verbose,
            recorder,
        }
    }

    pub fn id(&self) -> ClientId {
        self.id
    }

    /// Run every transaction, then close the connection.
    pub fn run(self) -> ClientSummary {
        let Self {
            id,
            transactions,
            conn,
            mut rng,
            scale,
            protocol,
            strategy,
            verbose,
            recorder,
        } = self;

        let mut summary = ClientSummary { client: id, attempted: 0, failed: 0 };
        {
            let mut exec = QueryExecutor::new(&conn, strategy);
            let mut remaining = transactions;
            while remaining > 0 {
                remaining -= 1;
                let inputs = rng.next_inputs(&scale);
                let outcome = run_transaction(&protocol, &mut exec, &inputs, &recorder, id, verbose);
                if outcome.is_none() {
                    summary.failed += 1;
                }
                let balance = outcome.map_or(FAILED_BALANCE, |o| o.balance);
                log::trace!("client {id}: {inputs:?} -> balance {balance}");
                summary.attempted += 1;
                recorder.record_attempt();
            }
        }

        if let Err((_, e)) = conn.close() {
            log::warn!("client {id}: error closing connection: {e}");
        }
        log::debug!("client {id} done: {summary:?}");
        summary
    }
}

/// Run one transaction, absorbing any failure into the failed counter.
///
/// None means the transaction failed; its remaining steps were abandoned
/// and the connection stays usable for the next one.
pub fn run_transaction(
    protocol: &TransactionProtocol,
    exec: &mut QueryExecutor<'_>,
    inputs: &TransactionInputs,
    recorder: &StatsRecorder,
    client: ClientId,
    verbose: bool,
) -> Option<TxnOutcome> {
    match protocol.execute(exec, inputs) {
        Ok(outcome) => Some(outcome),
        Err(e) => {
            recorder.record_failure();
            if verbose {
                log::warn!("client {client}: transaction failed: {e}");
            } else {
                log::debug!("client {client}: transaction failed: {e}");
            }
            None
        }
    }
}
