//! Operations exposed to collaborators.
//!
//! [`RewardEngine`] ties the registry, distribution formulas, claim ledger
//! and verifier to a [`LedgerStore`]. Each mutating call is a single store
//! transaction against one pool.

use std::sync::Arc;

use comb_types::achievement::AchievementBatch;
use comb_types::claim::ClaimRecord;
use comb_types::performance::PerformanceRecord;
use comb_types::pool::{DistributionStrategy, Pool, PoolConfig, PoolStatus, VaultMovement};
use comb_types::{PoolId, Principal, Timestamp, UserId};

use crate::clock::Clock;
use crate::store::{LedgerStore, MemoryStore, PoolAccount};
use crate::{claims, distribution, registry, verifier, Result, RewardError};

/// The authenticated caller of an operation, supplied by the identity layer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AuthContext {
    pub caller: Principal,
}

impl AuthContext {
    pub fn new(caller: Principal) -> Self {
        Self { caller }
    }
}

/// Reward pool engine over a ledger store.
pub struct RewardEngine<S: LedgerStore> {
    store: S,
    clock: Arc<dyn Clock>,
}

impl RewardEngine<MemoryStore> {
    /// Engine backed by a fresh in-process store.
    pub fn in_memory(clock: Arc<dyn Clock>) -> Self {
        Self::new(MemoryStore::new(), clock)
    }
}

impl<S: LedgerStore> RewardEngine<S> {
    pub fn new(store: S, clock: Arc<dyn Clock>) -> Self {
        Self { store, clock }
    }

    pub fn now(&self) -> Timestamp {
        self.clock.now()
    }

    /// Create a pool owned by the caller and deposit `initial_funding` if
    /// non-zero.
    ///
    /// # Errors
    ///
    /// - any configuration error from [`registry::validate_config`]
    /// - [`RewardError::PoolAlreadyExists`] if the id is taken
    pub fn create_pool(
        &self,
        auth: &AuthContext,
        config: PoolConfig,
        initial_funding: u64,
    ) -> Result<PoolId> {
        let now = self.now();
        let pool = registry::open_pool(auth.caller, config, now)?;
        let mut account = PoolAccount::new(pool);

        let mut journal = Vec::new();
        if initial_funding > 0 {
            journal.push(registry::fund(&mut account, auth.caller, initial_funding, now)?);
        }

        let pool_id = account.pool.id;
        let strategy = account.pool.strategy.name();
        self.store.insert_pool(account, &journal)?;

        tracing::info!(
            pool_id,
            owner = %auth.caller,
            strategy,
            initial_funding,
            "reward pool created"
        );
        Ok(pool_id)
    }

    /// Deposit `amount` from the caller into the pool's vault. Returns the
    /// pool's `total_funds` as committed by this deposit.
    ///
    /// # Errors
    ///
    /// - [`RewardError::PoolNotFound`] if the pool does not exist
    /// - [`RewardError::PoolNotActive`] if the pool is closed
    /// - [`RewardError::InvalidRewardAmount`] if `amount` is zero
    /// - [`RewardError::Overflow`] if `total_funds` would overflow
    pub fn fund_pool(&self, auth: &AuthContext, pool_id: PoolId, amount: u64) -> Result<u64> {
        let now = self.now();
        let total = self.store.transact(pool_id, None, |txn| {
            let movement = registry::fund(&mut txn.account, auth.caller, amount, now)?;
            txn.record(movement);
            Ok(txn.account.pool.total_funds)
        })?;

        tracing::info!(pool_id, funder = %auth.caller, amount, total, "reward pool funded");
        Ok(total)
    }

    /// Compute `user`'s eligibility from `performance` and store it as the
    /// claim's new entitlement. Returns the stored `total_eligible`.
    ///
    /// May be called by the pool owner or by the user.
    ///
    /// # Errors
    ///
    /// - [`RewardError::Unauthorized`] if the caller is neither owner nor user
    /// - [`RewardError::ClaimPeriodNotStarted`] / [`RewardError::ClaimPeriodEnded`]
    ///   outside the pool's active window
    /// - [`RewardError::PoolNotActive`] if the pool is closed
    /// - [`RewardError::InvalidPerformanceData`] if the record is out of range
    pub fn calculate_user_rewards(
        &self,
        auth: &AuthContext,
        pool_id: PoolId,
        user: UserId,
        performance: &PerformanceRecord,
    ) -> Result<u64> {
        let now = self.now();
        let eligible = self.store.transact(pool_id, Some(user), |txn| {
            let pool = &txn.account.pool;
            if auth.caller != pool.owner && auth.caller != user {
                tracing::warn!(pool_id, caller = %auth.caller, user = %user, "eligibility submission rejected");
                return Err(RewardError::Unauthorized);
            }
            if pool.strategy == DistributionStrategy::AchievementBased
                && performance.achievement_profile.is_some_and(|profile| profile != user)
            {
                tracing::warn!(pool_id, user = %user, "achievement profile belongs to another principal");
                return Err(RewardError::InvalidHoneycombProfile);
            }
            claims::ensure_calculation_open(pool, now)?;
            let computed = distribution::calculate_eligibility(pool, performance)?;

            let claim = txn
                .claim
                .get_or_insert_with(|| ClaimRecord::new(pool_id, user, now));
            Ok(claims::record_eligibility(claim, computed))
        })?;

        tracing::info!(pool_id, user = %user, eligible, "rewards calculated");
        Ok(eligible)
    }

    /// Amount `user` could claim now; zero if no eligibility was computed.
    ///
    /// # Errors
    ///
    /// - [`RewardError::PoolNotFound`] if the pool does not exist
    pub fn get_claimable_amount(&self, pool_id: PoolId, user: UserId) -> Result<u64> {
        match self.store.load_claim(pool_id, &user)? {
            Some(claim) => Ok(claim.claimable()),
            None => {
                self.get_pool(pool_id)?;
                Ok(0)
            }
        }
    }

    /// Pay out everything `user` is owed. Only the user may claim.
    ///
    /// # Errors
    ///
    /// - [`RewardError::Unauthorized`] if the caller is not `user`
    /// - [`RewardError::PoolNotActive`] if the pool is closed
    /// - [`RewardError::ClaimPeriodNotStarted`] / [`RewardError::ClaimPeriodEnded`]
    ///   outside the claim window
    /// - [`RewardError::NothingToClaim`] if nothing is outstanding
    /// - [`RewardError::InsufficientPoolFunds`] if the vault cannot cover it
    pub fn claim_rewards(&self, auth: &AuthContext, pool_id: PoolId, user: UserId) -> Result<u64> {
        let now = self.now();
        let (amount, total_claimed) = self.store.transact(pool_id, Some(user), |txn| {
            if auth.caller != user {
                tracing::warn!(pool_id, caller = %auth.caller, user = %user, "claim for another user rejected");
                return Err(RewardError::Unauthorized);
            }
            claims::ensure_claim_open(&txn.account.pool, now)?;
            let Some(claim) = txn.claim.as_mut() else {
                return Err(RewardError::NothingToClaim);
            };
            let movement = claims::settle(&mut txn.account, claim, now)?;
            let total_claimed = claim.amount_claimed;
            let amount = movement.amount;
            txn.record(movement);
            Ok((amount, total_claimed))
        })?;

        tracing::info!(pool_id, user = %user, amount, total_claimed, "rewards claimed");
        Ok(amount)
    }

    /// Replace the strategy of a pool that has not started. Owner only.
    ///
    /// # Errors
    ///
    /// - [`RewardError::Unauthorized`] if the caller is not the owner
    /// - [`RewardError::CannotUpdateActivePool`] at or after `start_time`
    /// - [`RewardError::InvalidStrategy`] if the strategy is unusable
    pub fn update_distribution_strategy(
        &self,
        auth: &AuthContext,
        pool_id: PoolId,
        strategy: DistributionStrategy,
    ) -> Result<()> {
        let now = self.now();
        let name = strategy.name();
        self.store.transact(pool_id, None, |txn| {
            registry::set_strategy(&mut txn.account.pool, &auth.caller, strategy, now)
        })?;

        tracing::info!(pool_id, strategy = name, "distribution strategy updated");
        Ok(())
    }

    /// Close an ended pool and return its residual balance to the owner.
    /// Returns the amount returned.
    ///
    /// # Errors
    ///
    /// - [`RewardError::Unauthorized`] if the caller is not the owner
    /// - [`RewardError::PoolStillActive`] before `end_time`
    /// - [`RewardError::PoolNotActive`] if already closed
    pub fn close_pool(&self, auth: &AuthContext, pool_id: PoolId) -> Result<u64> {
        let now = self.now();
        let reclaimed = self.store.transact(pool_id, None, |txn| {
            let movement = registry::close(&mut txn.account, &auth.caller, now)?;
            let amount = movement.amount;
            txn.record(movement);
            Ok(amount)
        })?;

        tracing::info!(pool_id, reclaimed, "reward pool closed");
        Ok(reclaimed)
    }

    /// Validate an achievement batch submitted by the caller for `pool_id`.
    ///
    /// # Errors
    ///
    /// - [`RewardError::PoolNotFound`] if the pool does not exist
    /// - any error from [`verifier::verify_batch`]
    pub fn verify_achievements(
        &self,
        auth: &AuthContext,
        pool_id: PoolId,
        batch: &AchievementBatch,
    ) -> Result<bool> {
        self.get_pool(pool_id)?;
        let verified = verifier::verify_batch(&auth.caller, batch)?;
        tracing::debug!(
            pool_id,
            caller = %auth.caller,
            entries = batch.achievements.len(),
            unlocked = batch.unlocked_count(),
            verified,
            "achievement batch checked"
        );
        Ok(verified)
    }

    /// # Errors
    ///
    /// - [`RewardError::PoolNotFound`] if the pool does not exist
    pub fn get_pool(&self, pool_id: PoolId) -> Result<Pool> {
        self.store
            .load_pool(pool_id)?
            .map(|account| account.pool)
            .ok_or(RewardError::PoolNotFound { pool_id })
    }

    /// Lifecycle state of a pool at the current time.
    pub fn pool_status(&self, pool_id: PoolId) -> Result<PoolStatus> {
        Ok(self.get_pool(pool_id)?.status(self.now()))
    }

    pub fn get_claim(&self, pool_id: PoolId, user: UserId) -> Result<Option<ClaimRecord>> {
        self.store.load_claim(pool_id, &user)
    }

    pub fn vault_balance(&self, pool_id: PoolId) -> Result<u64> {
        self.store
            .load_pool(pool_id)?
            .map(|account| account.vault.balance())
            .ok_or(RewardError::PoolNotFound { pool_id })
    }

    /// Deposit, payout and close-out history of a pool, oldest first.
    pub fn pool_movements(&self, pool_id: PoolId) -> Result<Vec<VaultMovement>> {
        self.store.movements(pool_id)
    }
}
