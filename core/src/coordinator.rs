//! The run coordinator: setup, fan-out, completion, report.
//!
//! SEQUENCE (strict):
//!   1. Validate config, open the primary connection, initialize and
//!      maintain the dataset if asked.
//!   2. Construct every client worker, each with its own connection.
//!      Client 0 reuses the primary connection.
//!   3. Start the resource sampler.
//!   4. Record the start instant.
//!   5. Spawn one thread per worker.
//!   6. Join every worker; the last join marks the end of the run.
//!   7. Stop the sampler, record the end instant, build the report.
//!
//! All workers exist before any starts, so a fast client can never observe
//! the run as finished while others are still being set up.

use crate::{
    client::{ClientSummary, ClientWorker},
    config::RunConfig,
    error::{BenchError, BenchResult},
    report::{failure_ratio, throughput, RunReport},
    rng::RngBank,
    sampler::{MemoryProbe, ProcessMemoryProbe, ResourceSampler},
    stats::RunStatistics,
    store::BenchStore,
    types::ClientId,
};
use chrono::Utc;
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::Instant;
use uuid::Uuid;

/// Run the benchmark described by `config`, sampling this process's memory.
pub fn run_benchmark(config: &RunConfig) -> BenchResult<RunReport> {
    run_benchmark_with_probe(config, ProcessMemoryProbe::new())
}

/// Run the benchmark with a caller-supplied memory probe.
pub fn run_benchmark_with_probe<P>(config: &RunConfig, probe: P) -> BenchResult<RunReport>
where
    P: MemoryProbe + Send + 'static,
{
    config.validate()?;
    let scale = config.scale_config();
    let run_id = Uuid::new_v4().to_string();

    let store = BenchStore::open(&config.database, config.busy_timeout())?;
    if config.init.initialize {
        log::info!("initializing {} at scale {}", store.path(), scale.scale_factor);
        store.initialize(&config.init, &scale)?;
    }
    store.maintain(config.init.maintenance)?;

    let rng_bank = match config.seed {
        Some(seed) => RngBank::new(seed),
        None => RngBank::from_entropy(),
    };
    log::debug!("run {run_id}: master seed {:#x}", rng_bank.master_seed());

    let stats = RunStatistics::new();
    let workers = build_workers(config, store, &rng_bank, &stats)?;

    let sampler = ResourceSampler::spawn(probe, config.sample_interval())?;
    let started_at = Utc::now();
    let start = Instant::now();

    let joined = spawn_workers(workers).and_then(join_workers);
    let memory = sampler.cancel();
    let elapsed = start.elapsed();
    let per_client = joined?;

    let total = stats.transaction_count();
    let failed = stats.failed_transaction_count();
    log::info!("run {run_id} finished: {total} transactions, {failed} failed");

    Ok(RunReport {
        run_id,
        started_at,
        clients: config.clients,
        transactions_per_client: config.transactions_per_client,
        strategy: config.strategy,
        select_only: config.select_only,
        transaction_blocks: config.transaction_blocks,
        elapsed_secs: elapsed.as_secs_f64(),
        transaction_count: total,
        failed_transaction_count: failed,
        transactions_per_second: throughput(total, failed, elapsed),
        failure_ratio: failure_ratio(total, failed),
        memory,
        per_client,
    })
}

/// Open every client connection before any client runs.
fn build_workers(
    config: &RunConfig,
    store: BenchStore,
    rng_bank: &RngBank,
    stats: &Arc<RunStatistics>,
) -> BenchResult<Vec<ClientWorker>> {
    let mut connections = Vec::with_capacity(config.clients);
    for _ in 1..config.clients {
        connections.push(store.reopen()?);
    }
    connections.insert(0, store.into_connection());

    let workers = connections
        .into_iter()
        .enumerate()
        .map(|(id, conn)| {
            ClientWorker::new(id, conn, config, rng_bank.for_client(id), stats.recorder())
        })
        .collect();
    Ok(workers)
}

struct RunningClient {
    id:     ClientId,
    handle: JoinHandle<ClientSummary>,
}

/// Start every worker. If a thread cannot be spawned, the clients already
/// started are joined before the error is returned.
fn spawn_workers(workers: Vec<ClientWorker>) -> BenchResult<Vec<RunningClient>> {
    let mut running = Vec::with_capacity(workers.len());
    for worker in workers {
        let id = worker.id();
        let name = format!("client-{id}");
        log::debug!("starting client {}", id + 1);
        match thread::Builder::new().name(name.clone()).spawn(move || worker.run()) {
            Ok(handle) => running.push(RunningClient { id, handle }),
            Err(source) => {
                let _ = join_workers(running);
                return Err(BenchError::WorkerSpawn { name, source });
            }
        }
    }
    Ok(running)
}

fn join_workers(running: Vec<RunningClient>) -> BenchResult<Vec<ClientSummary>> {
    let mut remaining = running.len();
    let mut summaries = Vec::with_capacity(remaining);
    let mut panicked = None;
    for RunningClient { id, handle } in running {
        remaining -= 1;
        match handle.join() {
            Ok(summary) => {
                log::info!("client {} finished ({remaining} remaining)", id + 1);
                summaries.push(summary);
            }
            Err(_) => {
                log::error!("client {} panicked", id + 1);
                panicked.get_or_insert(id);
            }
        }
    }
    match panicked {
        Some(client) => Err(BenchError::WorkerPanicked { client }),
        None => Ok(summaries),
    }
}
