//! Deterministic workload randomness.
//!
//! RULE: Workers never call a platform RNG directly.
//! Every client draws from its own ClientRng, seeded from the run's
//! master seed XOR a spread of the client index. This means:
//!   - Adding clients never changes the streams of existing clients.
//!   - A single-client run is fully reproducible from its seed.

use crate::{
    scaling::{EntityKind, ScaleConfig},
    transaction::TransactionInputs,
    types::{ClientId, Delta, EntityId},
};
use rand::{Rng, SeedableRng};
use rand_pcg::Pcg64Mcg;

pub const MIN_DELTA: Delta = -500;
pub const MAX_DELTA: Delta = 500;

/// The random stream owned by one client worker.
pub struct ClientRng {
    pub client: ClientId,
    inner: Pcg64Mcg,
}

impl ClientRng {
    pub fn new(master_seed: u64, client: ClientId) -> Self {
        let derived_seed = master_seed ^ (client as u64).wrapping_mul(0x9e37_79b9_7f4a_7c15);
        Self {
            client,
            inner: Pcg64Mcg::seed_from_u64(derived_seed),
        }
    }

    /// Uniform delta in [MIN_DELTA, MAX_DELTA], both ends inclusive.
    pub fn random_delta(&mut self) -> Delta {
        self.inner.gen_range(MIN_DELTA..=MAX_DELTA)
    }

    /// Uniform id in [0, count - 1] for the given entity table.
    pub fn random_id(&mut self, kind: EntityKind, scale: &ScaleConfig) -> EntityId {
        let count = scale.count(kind);
        assert!(count > 0, "no {kind:?} rows at scale {}", scale.scale_factor);
        self.inner.gen_range(0..count)
    }

    /// Draw the inputs of one transaction. Each id is independent.
    pub fn next_inputs(&mut self, scale: &ScaleConfig) -> TransactionInputs {
        TransactionInputs {
            aid:   self.random_id(EntityKind::Account, scale),
            bid:   self.random_id(EntityKind::Branch, scale),
            tid:   self.random_id(EntityKind::Teller, scale),
            delta: self.random_delta(),
        }
    }
}

/// Hands out per-client streams for a single run.
pub struct RngBank {
    master_seed: u64,
}

impl RngBank {
    pub fn new(master_seed: u64) -> Self {
        Self { master_seed }
    }

    /// A bank seeded from OS entropy, for runs without a fixed seed.
    pub fn from_entropy() -> Self {
        Self::new(rand::random())
    }

    pub fn master_seed(&self) -> u64 {
        self.master_seed
    }

    pub fn for_client(&self, client: ClientId) -> ClientRng {
        ClientRng::new(self.master_seed, client)
    }
}
