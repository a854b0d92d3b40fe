//! Pool, vault and lifecycle structures.

use serde::{Deserialize, Serialize};

use crate::{PoolId, Principal, Timestamp, TokenId};

/// The asset a pool pays out in.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "token_id", rename_all = "snake_case")]
pub enum Currency {
    /// The ledger's native unit.
    Native,
    /// A fungible token identified by its mint.
    Fungible(TokenId),
}

/// Formula used to turn a performance record into an eligible amount.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum DistributionStrategy {
    /// `total_funds / expected_participants`, independent of performance.
    EqualShare {
        /// Must be non-zero.
        expected_participants: u32,
    },
    /// Score band multiplier and completion-time bonus, capped at 10%.
    PerformanceBased,
    /// Daily allocation per full day staked, capped at 10%.
    StakingRewards,
    /// 1% per unlocked achievement, capped at 20%.
    AchievementBased,
    /// 10% chance of a 2% drop.
    RandomDrop,
}

impl DistributionStrategy {
    pub fn name(&self) -> &'static str {
        match self {
            Self::EqualShare { .. } => "equal_share",
            Self::PerformanceBased => "performance_based",
            Self::StakingRewards => "staking_rewards",
            Self::AchievementBased => "achievement_based",
            Self::RandomDrop => "random_drop",
        }
    }
}

/// Operator-supplied pool configuration.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct PoolConfig {
    pub id: PoolId,
    /// At most 50 characters.
    pub name: String,
    pub currency: Currency,
    pub strategy: DistributionStrategy,
    /// Intended allocation. Must be non-zero; deposits are tracked separately.
    pub declared_rewards: u64,
    pub start_time: Timestamp,
    /// Must be strictly after `start_time`.
    pub end_time: Timestamp,
    /// Grace period after `end_time` during which claims are honored.
    /// `None` keeps claims open until the pool is closed.
    #[serde(default)]
    pub claim_window_secs: Option<u64>,
}

/// Lifecycle state, derived from the clock and the `active` flag.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PoolStatus {
    Pending,
    Active,
    Ended,
    Closed,
}

/// A reward pool.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Pool {
    pub id: PoolId,
    pub owner: Principal,
    pub name: String,
    pub currency: Currency,
    pub strategy: DistributionStrategy,
    pub declared_rewards: u64,
    /// Sum of all deposits. Never decreases.
    pub total_funds: u64,
    /// Sum of all payouts, including the close-out. Never decreases.
    pub distributed_funds: u64,
    /// Portion of `distributed_funds` returned to the owner on close.
    pub reclaimed_funds: u64,
    pub start_time: Timestamp,
    pub end_time: Timestamp,
    pub claim_window_secs: Option<u64>,
    /// False once closed.
    pub active: bool,
    pub created_at: Timestamp,
}

impl Pool {
    /// Lifecycle state at `now`.
    pub fn status(&self, now: Timestamp) -> PoolStatus {
        if !self.active {
            PoolStatus::Closed
        } else if now < self.start_time {
            PoolStatus::Pending
        } else if now < self.end_time {
            PoolStatus::Active
        } else {
            PoolStatus::Ended
        }
    }

    /// Last second at which claims are honored, if bounded.
    pub fn claim_deadline(&self) -> Option<Timestamp> {
        self.claim_window_secs
            .map(|window| self.end_time.saturating_add(window))
    }
}

/// Composite key of a pool's vault.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct VaultKey {
    pub pool_id: PoolId,
}

impl VaultKey {
    pub const NAMESPACE: &'static str = "reward_vault";

    pub fn new(pool_id: PoolId) -> Self {
        Self { pool_id }
    }

    /// Stable string form, e.g. `reward_vault/42`.
    pub fn storage_key(&self) -> String {
        format!("{}/{}", Self::NAMESPACE, self.pool_id)
    }
}

/// Direction and purpose of a vault balance change.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MovementKind {
    Deposit,
    Payout,
    CloseOut,
}

impl MovementKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Deposit => "deposit",
            Self::Payout => "payout",
            Self::CloseOut => "close_out",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "deposit" => Some(Self::Deposit),
            "payout" => Some(Self::Payout),
            "close_out" => Some(Self::CloseOut),
            _ => None,
        }
    }
}

/// One journaled vault balance change.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct VaultMovement {
    pub pool_id: PoolId,
    pub kind: MovementKind,
    /// Funder for deposits, recipient for payouts and close-outs.
    pub counterparty: Principal,
    pub amount: u64,
    pub at: Timestamp,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn pool() -> Pool {
        Pool {
            id: 1,
            owner: Principal::new([1; 32]),
            name: "weekly".to_string(),
            currency: Currency::Native,
            strategy: DistributionStrategy::PerformanceBased,
            declared_rewards: 1000,
            total_funds: 1000,
            distributed_funds: 250,
            reclaimed_funds: 0,
            start_time: 100,
            end_time: 200,
            claim_window_secs: Some(50),
            active: true,
            created_at: 50,
        }
    }

    #[test]
    fn test_status_transitions() {
        let mut p = pool();
        assert_eq!(p.status(99), PoolStatus::Pending);
        assert_eq!(p.status(100), PoolStatus::Active);
        assert_eq!(p.status(199), PoolStatus::Active);
        assert_eq!(p.status(200), PoolStatus::Ended);
        p.active = false;
        assert_eq!(p.status(150), PoolStatus::Closed);
    }

    #[test]
    fn test_claim_deadline() {
        let mut p = pool();
        assert_eq!(p.claim_deadline(), Some(250));
        p.claim_window_secs = None;
        assert_eq!(p.claim_deadline(), None);
    }

    #[test]
    fn test_vault_storage_key() {
        assert_eq!(VaultKey::new(42).storage_key(), "reward_vault/42");
    }

    #[test]
    fn test_movement_kind_parse() {
        for kind in [MovementKind::Deposit, MovementKind::Payout, MovementKind::CloseOut] {
            assert_eq!(MovementKind::parse(kind.as_str()), Some(kind));
        }
        assert_eq!(MovementKind::parse("mint"), None);
    }

    #[test]
    fn test_strategy_json_shape() {
        let s = DistributionStrategy::EqualShare {
            expected_participants: 3,
        };
        let json = serde_json::to_value(&s).expect("serialize");
        assert_eq!(
            json,
            serde_json::json!({"kind": "equal_share", "expected_participants": 3})
        );

        let c: Currency = serde_json::from_value(serde_json::json!({"kind": "native"}))
            .expect("native");
        assert_eq!(c, Currency::Native);
    }
}
