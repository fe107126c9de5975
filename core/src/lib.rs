//! TPC-B style load benchmark for SQLite.
//!
//! Seeds a scaled branches/tellers/accounts dataset, runs N concurrent
//! clients of fixed-length transaction loops and reports throughput.

pub mod client;
pub mod config;
pub mod coordinator;
pub mod error;
pub mod query;
pub mod report;
pub mod rng;
pub mod sampler;
pub mod scaling;
pub mod service_file;
pub mod stats;
pub mod store;
pub mod transaction;
pub mod types;

pub use coordinator::run_benchmark;
pub use error::{BenchError, BenchResult};
