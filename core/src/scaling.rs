//! TPC-B scaling rules.
//!
//! RULE: Every row count and ownership mapping derives from ScaleConfig.
//! Nothing here touches the database.
//!
//! For each branch and teller:
//!   branch_id = teller_id  / tellers_per_scale
//!   branch_id = account_id / accounts_per_scale

use crate::types::EntityId;
use serde::{Deserialize, Serialize};

pub const BRANCHES_PER_SCALE: i64 = 1;
pub const TELLERS_PER_SCALE: i64 = 10;
pub const ACCOUNTS_PER_SCALE: i64 = 10_000;

/// The three entity tables that carry a balance.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EntityKind {
    Branch,
    Teller,
    Account,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScaleConfig {
    pub scale_factor:       u32,
    pub branches_per_scale: i64,
    pub tellers_per_scale:  i64,
    pub accounts_per_scale: i64,
}

impl ScaleConfig {
    pub fn new(scale_factor: u32) -> Self {
        Self {
            scale_factor,
            branches_per_scale: BRANCHES_PER_SCALE,
            tellers_per_scale:  TELLERS_PER_SCALE,
            accounts_per_scale: ACCOUNTS_PER_SCALE,
        }
    }

    pub fn total_branches(&self) -> i64 {
        self.branches_per_scale * i64::from(self.scale_factor)
    }

    pub fn total_tellers(&self) -> i64 {
        self.tellers_per_scale * i64::from(self.scale_factor)
    }

    pub fn total_accounts(&self) -> i64 {
        self.accounts_per_scale * i64::from(self.scale_factor)
    }

    pub fn count(&self, kind: EntityKind) -> i64 {
        match kind {
            EntityKind::Branch  => self.total_branches(),
            EntityKind::Teller  => self.total_tellers(),
            EntityKind::Account => self.total_accounts(),
        }
    }

    pub fn teller_owner_branch(&self, tid: EntityId) -> EntityId {
        tid / self.tellers_per_scale
    }

    pub fn account_owner_branch(&self, aid: EntityId) -> EntityId {
        aid / self.accounts_per_scale
    }
}

impl Default for ScaleConfig {
    fn default() -> Self {
        Self::new(1)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn counts_scale_linearly() {
        for s in [1u32, 2, 7, 100] {
            let scale = ScaleConfig::new(s);
            let s = i64::from(s);
            assert_eq!(scale.total_branches(), s);
            assert_eq!(scale.total_tellers(), 10 * s);
            assert_eq!(scale.total_accounts(), 10_000 * s);
            assert_eq!(scale.count(EntityKind::Account), scale.total_accounts());
        }
    }

    #[test]
    fn owners_follow_division_rule() {
        let scale = ScaleConfig::new(3);
        assert_eq!(scale.account_owner_branch(0), 0);
        assert_eq!(scale.account_owner_branch(9_999), 0);
        assert_eq!(scale.account_owner_branch(10_000), 1);
        assert_eq!(scale.account_owner_branch(29_999), 2);
        assert_eq!(scale.teller_owner_branch(9), 0);
        assert_eq!(scale.teller_owner_branch(10), 1);
        assert_eq!(scale.teller_owner_branch(29), 2);
    }

    #[test]
    fn every_owner_is_a_valid_branch() {
        let scale = ScaleConfig::new(4);
        let last_account = scale.total_accounts() - 1;
        let last_teller = scale.total_tellers() - 1;
        assert!(scale.account_owner_branch(last_account) < scale.total_branches());
        assert!(scale.teller_owner_branch(last_teller) < scale.total_branches());
    }
}
