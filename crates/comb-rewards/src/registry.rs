//! Pool creation, funding, reconfiguration and close-out.
//!
//! These functions operate on the working copy inside a [`Txn`](crate::Txn);
//! the engine wraps each one in a store transaction.

use comb_types::pool::{
    Currency, DistributionStrategy, MovementKind, Pool, PoolConfig, PoolStatus, VaultMovement,
};
use comb_types::{Principal, Timestamp, MAX_POOL_NAME_LEN};

use crate::store::PoolAccount;
use crate::vault::Withdrawal;
use crate::{Result, RewardError};

/// Validate an operator-supplied pool configuration.
///
/// # Errors
///
/// - [`RewardError::InvalidPoolName`] if the name is longer than 50 characters
/// - [`RewardError::InvalidStartTime`] if `start_time` is before `now`
/// - [`RewardError::InvalidEndTime`] if `end_time <= start_time`
/// - [`RewardError::InvalidRewardAmount`] if `declared_rewards` is zero
/// - [`RewardError::InvalidCurrency`] if a fungible currency has a null token id
/// - [`RewardError::InvalidStrategy`] if strategy parameters are unusable
pub fn validate_config(config: &PoolConfig, now: Timestamp) -> Result<()> {
    let len = config.name.chars().count();
    if len > MAX_POOL_NAME_LEN {
        return Err(RewardError::InvalidPoolName { len });
    }
    if config.start_time < now {
        return Err(RewardError::InvalidStartTime {
            start_time: config.start_time,
            now,
        });
    }
    if config.end_time <= config.start_time {
        return Err(RewardError::InvalidEndTime {
            start_time: config.start_time,
            end_time: config.end_time,
        });
    }
    if config.declared_rewards == 0 {
        return Err(RewardError::InvalidRewardAmount);
    }
    if let Currency::Fungible(token) = &config.currency {
        if token.is_null() {
            return Err(RewardError::InvalidCurrency(
                "fungible pool requires a token identifier".to_string(),
            ));
        }
    }
    validate_strategy(&config.strategy)
}

/// # Errors
///
/// - [`RewardError::InvalidStrategy`] if EqualShare expects zero participants
pub fn validate_strategy(strategy: &DistributionStrategy) -> Result<()> {
    match strategy {
        DistributionStrategy::EqualShare {
            expected_participants: 0,
        } => Err(RewardError::InvalidStrategy(
            "equal share requires at least one expected participant".to_string(),
        )),
        _ => Ok(()),
    }
}

/// Build a new, unfunded pool owned by `owner`.
pub fn open_pool(owner: Principal, config: PoolConfig, now: Timestamp) -> Result<Pool> {
    validate_config(&config, now)?;
    Ok(Pool {
        id: config.id,
        owner,
        name: config.name,
        currency: config.currency,
        strategy: config.strategy,
        declared_rewards: config.declared_rewards,
        total_funds: 0,
        distributed_funds: 0,
        reclaimed_funds: 0,
        start_time: config.start_time,
        end_time: config.end_time,
        claim_window_secs: config.claim_window_secs,
        active: true,
        created_at: now,
    })
}

/// Deposit `amount` from `funder` into the pool's vault.
///
/// # Errors
///
/// - [`RewardError::PoolNotActive`] if the pool is closed
/// - [`RewardError::InvalidRewardAmount`] if `amount` is zero
/// - [`RewardError::Overflow`] if the total would overflow
pub(crate) fn fund(
    account: &mut PoolAccount,
    funder: Principal,
    amount: u64,
    now: Timestamp,
) -> Result<VaultMovement> {
    if !account.pool.active {
        return Err(RewardError::PoolNotActive);
    }
    if amount == 0 {
        return Err(RewardError::InvalidRewardAmount);
    }

    let total = account
        .pool
        .total_funds
        .checked_add(amount)
        .ok_or(RewardError::Overflow)?;
    account.vault.deposit(amount)?;
    account.pool.total_funds = total;

    Ok(VaultMovement {
        pool_id: account.pool.id,
        kind: MovementKind::Deposit,
        counterparty: funder,
        amount,
        at: now,
    })
}

/// Replace the distribution strategy of a pool that has not started.
///
/// # Errors
///
/// - [`RewardError::Unauthorized`] if `caller` is not the owner
/// - [`RewardError::PoolNotActive`] if the pool is closed
/// - [`RewardError::CannotUpdateActivePool`] if `now >= start_time`
/// - [`RewardError::InvalidStrategy`] if the new strategy is unusable
pub(crate) fn set_strategy(
    pool: &mut Pool,
    caller: &Principal,
    strategy: DistributionStrategy,
    now: Timestamp,
) -> Result<()> {
    ensure_owner(pool, caller)?;
    match pool.status(now) {
        PoolStatus::Closed => return Err(RewardError::PoolNotActive),
        PoolStatus::Pending => {}
        PoolStatus::Active | PoolStatus::Ended => {
            return Err(RewardError::CannotUpdateActivePool)
        }
    }
    validate_strategy(&strategy)?;
    pool.strategy = strategy;
    Ok(())
}

/// Return the residual vault balance to the owner and close the pool.
///
/// The residual counts toward `distributed_funds` so that the vault and the
/// pool totals stay balanced after close.
///
/// # Errors
///
/// - [`RewardError::Unauthorized`] if `caller` is not the owner
/// - [`RewardError::PoolNotActive`] if the pool is already closed
/// - [`RewardError::PoolStillActive`] if `now < end_time`
pub(crate) fn close(
    account: &mut PoolAccount,
    caller: &Principal,
    now: Timestamp,
) -> Result<VaultMovement> {
    ensure_owner(&account.pool, caller)?;
    match account.pool.status(now) {
        PoolStatus::Closed => return Err(RewardError::PoolNotActive),
        PoolStatus::Pending | PoolStatus::Active => return Err(RewardError::PoolStillActive),
        PoolStatus::Ended => {}
    }

    let residual = account.vault.balance();
    let distributed = account
        .pool
        .distributed_funds
        .checked_add(residual)
        .ok_or(RewardError::Overflow)?;
    account.vault.withdraw(residual, Withdrawal::CloseOut)?;
    account.pool.distributed_funds = distributed;
    account.pool.reclaimed_funds = residual;
    account.pool.active = false;

    Ok(VaultMovement {
        pool_id: account.pool.id,
        kind: Withdrawal::CloseOut.kind(),
        counterparty: account.pool.owner,
        amount: residual,
        at: now,
    })
}

pub(crate) fn ensure_owner(pool: &Pool, caller: &Principal) -> Result<()> {
    if &pool.owner != caller {
        tracing::warn!(pool_id = pool.id, caller = %caller, "owner-only operation rejected");
        return Err(RewardError::Unauthorized);
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use comb_types::TokenId;

    const NOW: Timestamp = 1_700_000_000;

    fn owner() -> Principal {
        Principal::new([0x0A; 32])
    }

    fn config() -> PoolConfig {
        PoolConfig {
            id: 1,
            name: "Weekly trivia".to_string(),
            currency: Currency::Native,
            strategy: DistributionStrategy::PerformanceBased,
            declared_rewards: 1_000,
            start_time: NOW + 100,
            end_time: NOW + 1_000,
            claim_window_secs: None,
        }
    }

    fn funded_account(amount: u64) -> PoolAccount {
        let pool = open_pool(owner(), config(), NOW).expect("open");
        let mut account = PoolAccount::new(pool);
        if amount > 0 {
            fund(&mut account, owner(), amount, NOW).expect("fund");
        }
        account
    }

    #[test]
    fn test_open_pool_defaults() {
        let pool = open_pool(owner(), config(), NOW).expect("open");
        assert_eq!(pool.total_funds, 0);
        assert_eq!(pool.distributed_funds, 0);
        assert!(pool.active);
        assert_eq!(pool.status(NOW), PoolStatus::Pending);
    }

    #[test]
    fn test_name_length_limit() {
        let mut cfg = config();
        cfg.name = "x".repeat(50);
        validate_config(&cfg, NOW).expect("50 chars allowed");
        cfg.name = "x".repeat(51);
        assert_eq!(
            validate_config(&cfg, NOW),
            Err(RewardError::InvalidPoolName { len: 51 })
        );
    }

    #[test]
    fn test_name_length_counts_characters() {
        let mut cfg = config();
        cfg.name = "é".repeat(50);
        validate_config(&cfg, NOW).expect("50 multibyte chars allowed");
    }

    #[test]
    fn test_time_validation() {
        let mut cfg = config();
        cfg.start_time = NOW - 1;
        assert!(matches!(
            validate_config(&cfg, NOW),
            Err(RewardError::InvalidStartTime { .. })
        ));

        let mut cfg = config();
        cfg.start_time = NOW;
        validate_config(&cfg, NOW).expect("starting now is allowed");

        let mut cfg = config();
        cfg.end_time = cfg.start_time;
        assert!(matches!(
            validate_config(&cfg, NOW),
            Err(RewardError::InvalidEndTime { .. })
        ));
    }

    #[test]
    fn test_declared_rewards_must_be_positive() {
        let mut cfg = config();
        cfg.declared_rewards = 0;
        assert_eq!(
            validate_config(&cfg, NOW),
            Err(RewardError::InvalidRewardAmount)
        );
    }

    #[test]
    fn test_fungible_requires_token() {
        let mut cfg = config();
        cfg.currency = Currency::Fungible(TokenId::NULL);
        assert!(matches!(
            validate_config(&cfg, NOW),
            Err(RewardError::InvalidCurrency(_))
        ));
        cfg.currency = Currency::Fungible(TokenId([5; 32]));
        validate_config(&cfg, NOW).expect("concrete token");
    }

    #[test]
    fn test_fund_updates_total_and_vault() {
        let mut account = funded_account(500);
        let movement = fund(&mut account, Principal::new([2; 32]), 250, NOW).expect("fund");
        assert_eq!(movement.kind, MovementKind::Deposit);
        assert_eq!(account.pool.total_funds, 750);
        assert_eq!(account.vault.balance(), 750);
        account.check_conservation().expect("balanced");
    }

    #[test]
    fn test_fund_zero_rejected() {
        let mut account = funded_account(0);
        assert_eq!(
            fund(&mut account, owner(), 0, NOW),
            Err(RewardError::InvalidRewardAmount)
        );
    }

    #[test]
    fn test_fund_closed_pool_rejected() {
        let mut account = funded_account(10);
        account.pool.active = false;
        assert_eq!(
            fund(&mut account, owner(), 5, NOW),
            Err(RewardError::PoolNotActive)
        );
    }

    #[test]
    fn test_set_strategy_rules() {
        let mut pool = open_pool(owner(), config(), NOW).expect("open");
        let stranger = Principal::new([0xFF; 32]);
        assert_eq!(
            set_strategy(&mut pool, &stranger, DistributionStrategy::RandomDrop, NOW),
            Err(RewardError::Unauthorized)
        );

        set_strategy(&mut pool, &owner(), DistributionStrategy::RandomDrop, NOW).expect("pending");
        assert_eq!(pool.strategy, DistributionStrategy::RandomDrop);

        assert_eq!(
            set_strategy(
                &mut pool,
                &owner(),
                DistributionStrategy::StakingRewards,
                NOW + 100
            ),
            Err(RewardError::CannotUpdateActivePool)
        );
    }

    #[test]
    fn test_close_returns_residual() {
        let mut account = funded_account(1_000);
        assert_eq!(
            close(&mut account, &owner(), NOW + 999),
            Err(RewardError::PoolStillActive)
        );

        let movement = close(&mut account, &owner(), NOW + 1_000).expect("close");
        assert_eq!(movement.amount, 1_000);
        assert_eq!(movement.kind, MovementKind::CloseOut);
        assert_eq!(account.vault.balance(), 0);
        assert_eq!(account.pool.reclaimed_funds, 1_000);
        assert!(!account.pool.active);
        account.check_conservation().expect("balanced after close");

        assert_eq!(
            close(&mut account, &owner(), NOW + 2_000),
            Err(RewardError::PoolNotActive)
        );
    }

    #[test]
    fn test_close_requires_owner() {
        let mut account = funded_account(10);
        assert_eq!(
            close(&mut account, &Principal::new([3; 32]), NOW + 5_000),
            Err(RewardError::Unauthorized)
        );
    }
}
