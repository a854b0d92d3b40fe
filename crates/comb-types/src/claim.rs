//! Per-user claim bookkeeping.

use serde::{Deserialize, Serialize};

use crate::{PoolId, Timestamp, UserId};

/// Eligibility and cumulative payout for one user in one pool.
///
/// `amount_claimed <= total_eligible` always holds.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClaimRecord {
    pub pool_id: PoolId,
    pub user: UserId,
    /// Entitlement as of the last calculation.
    pub total_eligible: u64,
    /// Cumulative amount paid. Never decreases.
    pub amount_claimed: u64,
    /// `None` until the first payout.
    pub last_claim_time: Option<Timestamp>,
    pub created_at: Timestamp,
}

impl ClaimRecord {
    pub fn new(pool_id: PoolId, user: UserId, created_at: Timestamp) -> Self {
        Self {
            pool_id,
            user,
            total_eligible: 0,
            amount_claimed: 0,
            last_claim_time: None,
            created_at,
        }
    }

    /// Amount owed but not yet paid.
    pub fn claimable(&self) -> u64 {
        self.total_eligible.saturating_sub(self.amount_claimed)
    }
}
