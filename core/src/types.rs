//! Shared primitive types used across the benchmark.

/// Identifier of a branch, teller or account row.
pub type EntityId = i64;

/// A balance column value (`abalance`, `tbalance`, `bbalance`).
pub type Balance = i64;

/// The signed amount moved by one transaction.
pub type Delta = i64;

/// Zero-based index of a simulated client.
pub type ClientId = usize;
