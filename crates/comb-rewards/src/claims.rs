//! Eligibility bookkeeping and payouts.
//!
//! A claim record holds what a user is entitled to (`total_eligible`) and
//! what has been paid (`amount_claimed`). Payout always settles the whole
//! outstanding delta, so a second claim without a new calculation finds
//! nothing to pay.

use comb_types::claim::ClaimRecord;
use comb_types::pool::{Pool, PoolStatus, VaultMovement};
use comb_types::Timestamp;

use crate::store::PoolAccount;
use crate::vault::Withdrawal;
use crate::{Result, RewardError};

/// Check that new eligibility may be computed for `pool` at `now`.
///
/// # Errors
///
/// - [`RewardError::PoolNotActive`] if the pool is closed
/// - [`RewardError::ClaimPeriodNotStarted`] before `start_time`
/// - [`RewardError::ClaimPeriodEnded`] at or after `end_time`
pub fn ensure_calculation_open(pool: &Pool, now: Timestamp) -> Result<()> {
    match pool.status(now) {
        PoolStatus::Active => Ok(()),
        PoolStatus::Pending => Err(RewardError::ClaimPeriodNotStarted),
        PoolStatus::Ended => Err(RewardError::ClaimPeriodEnded),
        PoolStatus::Closed => Err(RewardError::PoolNotActive),
    }
}

/// Check that claims against `pool` are honored at `now`.
///
/// Claims stay open after `end_time` until the pool is closed or its claim
/// window elapses.
///
/// # Errors
///
/// - [`RewardError::PoolNotActive`] if the pool is closed
/// - [`RewardError::ClaimPeriodNotStarted`] before `start_time`
/// - [`RewardError::ClaimPeriodEnded`] after the claim window
pub fn ensure_claim_open(pool: &Pool, now: Timestamp) -> Result<()> {
    match pool.status(now) {
        PoolStatus::Closed => Err(RewardError::PoolNotActive),
        PoolStatus::Pending => Err(RewardError::ClaimPeriodNotStarted),
        PoolStatus::Active | PoolStatus::Ended => match pool.claim_deadline() {
            Some(deadline) if now > deadline => Err(RewardError::ClaimPeriodEnded),
            _ => Ok(()),
        },
    }
}

/// Store a freshly computed amount as the claim's entitlement.
///
/// The entitlement never drops below what has already been paid. Returns the
/// new `total_eligible`.
pub fn record_eligibility(claim: &mut ClaimRecord, computed: u64) -> u64 {
    claim.total_eligible = computed.max(claim.amount_claimed);
    claim.total_eligible
}

/// Pay the outstanding delta of `claim` out of the pool's vault.
///
/// # Errors
///
/// - [`RewardError::NothingToClaim`] if nothing is outstanding
/// - [`RewardError::InsufficientPoolFunds`] if the vault cannot cover it
/// - [`RewardError::Overflow`] if the distributed total would overflow
pub(crate) fn settle(
    account: &mut PoolAccount,
    claim: &mut ClaimRecord,
    now: Timestamp,
) -> Result<VaultMovement> {
    let claimable = claim
        .total_eligible
        .checked_sub(claim.amount_claimed)
        .ok_or_else(|| {
            RewardError::LedgerInvariant("claimed amount exceeds eligibility".to_string())
        })?;
    if claimable == 0 {
        return Err(RewardError::NothingToClaim);
    }

    let distributed = account
        .pool
        .distributed_funds
        .checked_add(claimable)
        .ok_or(RewardError::Overflow)?;
    account.vault.withdraw(claimable, Withdrawal::Payout)?;

    account.pool.distributed_funds = distributed;
    claim.amount_claimed = claim.total_eligible;
    claim.last_claim_time = Some(now);

    Ok(VaultMovement {
        pool_id: account.pool.id,
        kind: Withdrawal::Payout.kind(),
        counterparty: claim.user,
        amount: claimable,
        at: now,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use comb_types::pool::{Currency, DistributionStrategy, MovementKind};
    use comb_types::Principal;

    use crate::vault::Vault;

    fn account(funds: u64) -> PoolAccount {
        PoolAccount {
            pool: Pool {
                id: 3,
                owner: Principal::new([1; 32]),
                name: "claims".to_string(),
                currency: Currency::Native,
                strategy: DistributionStrategy::EqualShare {
                    expected_participants: 3,
                },
                declared_rewards: funds.max(1),
                total_funds: funds,
                distributed_funds: 0,
                reclaimed_funds: 0,
                start_time: 100,
                end_time: 200,
                claim_window_secs: None,
                active: true,
                created_at: 0,
            },
            vault: Vault::restore(3, funds),
        }
    }

    fn user() -> Principal {
        Principal::new([9; 32])
    }

    #[test]
    fn test_calculation_window() {
        let acc = account(100);
        assert_eq!(
            ensure_calculation_open(&acc.pool, 99),
            Err(RewardError::ClaimPeriodNotStarted)
        );
        ensure_calculation_open(&acc.pool, 100).expect("active");
        assert_eq!(
            ensure_calculation_open(&acc.pool, 200),
            Err(RewardError::ClaimPeriodEnded)
        );
    }

    #[test]
    fn test_claim_window() {
        let mut acc = account(100);
        ensure_claim_open(&acc.pool, 150).expect("active");
        ensure_claim_open(&acc.pool, 10_000).expect("ended, unbounded window");

        acc.pool.claim_window_secs = Some(50);
        ensure_claim_open(&acc.pool, 250).expect("last second of window");
        assert_eq!(
            ensure_claim_open(&acc.pool, 251),
            Err(RewardError::ClaimPeriodEnded)
        );

        acc.pool.active = false;
        assert_eq!(
            ensure_claim_open(&acc.pool, 150),
            Err(RewardError::PoolNotActive)
        );
    }

    #[test]
    fn test_recalculation_never_below_claimed() {
        let mut claim = ClaimRecord::new(3, user(), 100);
        assert_eq!(record_eligibility(&mut claim, 300), 300);
        claim.amount_claimed = 300;
        assert_eq!(record_eligibility(&mut claim, 100), 300);
        assert_eq!(claim.claimable(), 0);
        assert_eq!(record_eligibility(&mut claim, 450), 450);
        assert_eq!(claim.claimable(), 150);
    }

    #[test]
    fn test_settle_pays_delta() {
        let mut acc = account(1_000);
        let mut claim = ClaimRecord::new(3, user(), 100);
        record_eligibility(&mut claim, 333);

        let movement = settle(&mut acc, &mut claim, 150).expect("settle");
        assert_eq!(movement.amount, 333);
        assert_eq!(movement.kind, MovementKind::Payout);
        assert_eq!(movement.counterparty, user());
        assert_eq!(claim.amount_claimed, 333);
        assert_eq!(claim.last_claim_time, Some(150));
        assert_eq!(acc.vault.balance(), 667);
        assert_eq!(acc.pool.distributed_funds, 333);
        acc.check_conservation().expect("balanced");

        assert_eq!(
            settle(&mut acc, &mut claim, 151),
            Err(RewardError::NothingToClaim)
        );
    }

    #[test]
    fn test_settle_insufficient_funds() {
        let mut acc = account(100);
        let mut claim = ClaimRecord::new(3, user(), 100);
        record_eligibility(&mut claim, 101);
        assert_eq!(
            settle(&mut acc, &mut claim, 150),
            Err(RewardError::InsufficientPoolFunds {
                available: 100,
                required: 101
            })
        );
        assert_eq!(claim.amount_claimed, 0);
        assert_eq!(acc.pool.distributed_funds, 0);
    }
}
