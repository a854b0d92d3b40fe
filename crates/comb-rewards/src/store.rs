//! Atomic ledger storage.
//!
//! Every mutating operation runs as one [`Txn`] against a single pool (and
//! at most one claim in it). The store hands the closure working copies; the
//! copies are written back only if the closure succeeds and the result still
//! satisfies the ledger invariants. A failed transaction leaves no trace.
//!
//! Records are locked per pool, so transactions on different pools never
//! contend.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard, RwLock};

use comb_types::claim::ClaimRecord;
use comb_types::pool::{Pool, VaultMovement};
use comb_types::{PoolId, UserId};

use crate::vault::Vault;
use crate::{Result, RewardError};

/// A pool together with the vault that backs it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PoolAccount {
    pub pool: Pool,
    pub vault: Vault,
}

impl PoolAccount {
    /// Pair a new pool with an empty vault.
    pub fn new(pool: Pool) -> Self {
        let vault = Vault::open(pool.id);
        Self { pool, vault }
    }

    /// Check `distributed <= total` and `vault == total - distributed`.
    ///
    /// # Errors
    ///
    /// - [`RewardError::LedgerInvariant`] describing the mismatch
    pub fn check_conservation(&self) -> Result<()> {
        let pool = &self.pool;
        if self.vault.pool_id() != pool.id {
            return Err(RewardError::LedgerInvariant(format!(
                "vault {} attached to pool {}",
                self.vault.pool_id(),
                pool.id
            )));
        }
        if pool.distributed_funds > pool.total_funds {
            return Err(RewardError::LedgerInvariant(format!(
                "distributed {} exceeds total {}",
                pool.distributed_funds, pool.total_funds
            )));
        }
        let expected = pool.total_funds - pool.distributed_funds;
        if self.vault.balance() != expected {
            return Err(RewardError::LedgerInvariant(format!(
                "vault balance {} != total {} - distributed {}",
                self.vault.balance(),
                pool.total_funds,
                pool.distributed_funds
            )));
        }
        Ok(())
    }
}

/// Working state of one transaction.
#[derive(Debug)]
pub struct Txn {
    /// Working copy of the pool and its vault.
    pub account: PoolAccount,
    /// Working copy of the claim for the transaction's user, if any.
    pub claim: Option<ClaimRecord>,
    user: Option<UserId>,
    original: PoolAccount,
    original_claim: Option<ClaimRecord>,
    journal: Vec<VaultMovement>,
}

impl Txn {
    pub fn new(account: PoolAccount, user: Option<UserId>, claim: Option<ClaimRecord>) -> Self {
        Self {
            original: account.clone(),
            original_claim: claim.clone(),
            account,
            claim,
            user,
            journal: Vec::new(),
        }
    }

    /// Append a vault movement to be journaled on commit.
    pub fn record(&mut self, movement: VaultMovement) {
        self.journal.push(movement);
    }

    /// Validate the working copies and release them for write-back.
    ///
    /// Stores must call this before persisting anything.
    ///
    /// # Errors
    ///
    /// - [`RewardError::LedgerInvariant`] if conservation fails, a closed pool
    ///   was modified, a claim belongs to another key, or a claim went backwards
    pub fn finish(self) -> Result<(PoolAccount, Option<ClaimRecord>, Vec<VaultMovement>)> {
        self.account.check_conservation()?;

        if !self.original.pool.active && self.account != self.original {
            return Err(RewardError::LedgerInvariant(
                "closed pool is immutable".to_string(),
            ));
        }

        let pool = &self.account.pool;
        let before = &self.original.pool;
        if pool.total_funds < before.total_funds || pool.distributed_funds < before.distributed_funds
        {
            return Err(RewardError::LedgerInvariant(
                "pool totals must not decrease".to_string(),
            ));
        }

        if let Some(claim) = &self.claim {
            if claim.pool_id != pool.id || Some(claim.user) != self.user {
                return Err(RewardError::LedgerInvariant(
                    "claim does not match transaction key".to_string(),
                ));
            }
            if claim.amount_claimed > claim.total_eligible {
                return Err(RewardError::LedgerInvariant(format!(
                    "claimed {} exceeds eligible {}",
                    claim.amount_claimed, claim.total_eligible
                )));
            }
            let previously_claimed = self
                .original_claim
                .as_ref()
                .map_or(0, |c| c.amount_claimed);
            if claim.amount_claimed < previously_claimed {
                return Err(RewardError::LedgerInvariant(
                    "amount claimed must not decrease".to_string(),
                ));
            }
        }

        Ok((self.account, self.claim, self.journal))
    }
}

/// Backing storage for pools, vaults, claims and the movement journal.
pub trait LedgerStore: Send + Sync {
    /// Insert a freshly created pool and its initial journal entries.
    ///
    /// # Errors
    ///
    /// - [`RewardError::PoolAlreadyExists`] if the id is taken
    fn insert_pool(&self, account: PoolAccount, journal: &[VaultMovement]) -> Result<()>;

    /// Snapshot of a pool and its vault.
    fn load_pool(&self, pool_id: PoolId) -> Result<Option<PoolAccount>>;

    /// Snapshot of one claim record.
    fn load_claim(&self, pool_id: PoolId, user: &UserId) -> Result<Option<ClaimRecord>>;

    /// Journal of a pool, oldest first.
    fn movements(&self, pool_id: PoolId) -> Result<Vec<VaultMovement>>;

    /// Run `f` as one atomic transaction on `pool_id` and, if given, the
    /// claim of `user` in that pool.
    ///
    /// # Errors
    ///
    /// - [`RewardError::PoolNotFound`] if the pool does not exist
    /// - any error returned by `f` or by [`Txn::finish`]
    fn transact<T, F>(&self, pool_id: PoolId, user: Option<UserId>, f: F) -> Result<T>
    where
        F: FnOnce(&mut Txn) -> Result<T>;
}

#[derive(Debug)]
struct PoolSlot {
    account: PoolAccount,
    claims: HashMap<UserId, ClaimRecord>,
    journal: Vec<VaultMovement>,
}

/// In-process ledger store.
#[derive(Debug, Default)]
pub struct MemoryStore {
    pools: RwLock<HashMap<PoolId, Arc<Mutex<PoolSlot>>>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn slot(&self, pool_id: PoolId) -> Result<Option<Arc<Mutex<PoolSlot>>>> {
        let pools = self
            .pools
            .read()
            .map_err(|_| RewardError::Storage("pool index lock poisoned".to_string()))?;
        Ok(pools.get(&pool_id).cloned())
    }
}

fn lock_slot(slot: &Mutex<PoolSlot>) -> Result<MutexGuard<'_, PoolSlot>> {
    slot.lock()
        .map_err(|_| RewardError::Storage("pool lock poisoned".to_string()))
}

impl LedgerStore for MemoryStore {
    fn insert_pool(&self, account: PoolAccount, journal: &[VaultMovement]) -> Result<()> {
        account.check_conservation()?;
        let mut pools = self
            .pools
            .write()
            .map_err(|_| RewardError::Storage("pool index lock poisoned".to_string()))?;
        let pool_id = account.pool.id;
        if pools.contains_key(&pool_id) {
            return Err(RewardError::PoolAlreadyExists { pool_id });
        }
        pools.insert(
            pool_id,
            Arc::new(Mutex::new(PoolSlot {
                account,
                claims: HashMap::new(),
                journal: journal.to_vec(),
            })),
        );
        Ok(())
    }

    fn load_pool(&self, pool_id: PoolId) -> Result<Option<PoolAccount>> {
        let Some(slot) = self.slot(pool_id)? else {
            return Ok(None);
        };
        let guard = lock_slot(&slot)?;
        Ok(Some(guard.account.clone()))
    }

    fn load_claim(&self, pool_id: PoolId, user: &UserId) -> Result<Option<ClaimRecord>> {
        let Some(slot) = self.slot(pool_id)? else {
            return Ok(None);
        };
        let guard = lock_slot(&slot)?;
        Ok(guard.claims.get(user).cloned())
    }

    fn movements(&self, pool_id: PoolId) -> Result<Vec<VaultMovement>> {
        let slot = self
            .slot(pool_id)?
            .ok_or(RewardError::PoolNotFound { pool_id })?;
        let guard = lock_slot(&slot)?;
        Ok(guard.journal.clone())
    }

    fn transact<T, F>(&self, pool_id: PoolId, user: Option<UserId>, f: F) -> Result<T>
    where
        F: FnOnce(&mut Txn) -> Result<T>,
    {
        let slot = self
            .slot(pool_id)?
            .ok_or(RewardError::PoolNotFound { pool_id })?;
        let mut guard = lock_slot(&slot)?;

        let claim = user.and_then(|u| guard.claims.get(&u).cloned());
        let mut txn = Txn::new(guard.account.clone(), user, claim);
        let out = f(&mut txn)?;
        let (account, claim, journal) = txn.finish()?;

        guard.account = account;
        if let Some(claim) = claim {
            guard.claims.insert(claim.user, claim);
        }
        guard.journal.extend(journal);
        Ok(out)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use comb_types::pool::{Currency, DistributionStrategy, MovementKind};
    use comb_types::Principal;

    fn account(id: PoolId, funds: u64) -> PoolAccount {
        let pool = Pool {
            id,
            owner: Principal::new([1; 32]),
            name: "store".to_string(),
            currency: Currency::Native,
            strategy: DistributionStrategy::RandomDrop,
            declared_rewards: funds.max(1),
            total_funds: funds,
            distributed_funds: 0,
            reclaimed_funds: 0,
            start_time: 0,
            end_time: 10,
            claim_window_secs: None,
            active: true,
            created_at: 0,
        };
        PoolAccount {
            vault: Vault::restore(id, funds),
            pool,
        }
    }

    #[test]
    fn test_conservation_check() {
        let mut acc = account(1, 100);
        acc.check_conservation().expect("balanced");
        acc.pool.distributed_funds = 10;
        assert!(matches!(
            acc.check_conservation(),
            Err(RewardError::LedgerInvariant(_))
        ));
    }

    #[test]
    fn test_insert_duplicate_rejected() {
        let store = MemoryStore::new();
        store.insert_pool(account(1, 0), &[]).expect("insert");
        assert_eq!(
            store.insert_pool(account(1, 0), &[]),
            Err(RewardError::PoolAlreadyExists { pool_id: 1 })
        );
    }

    #[test]
    fn test_transact_unknown_pool() {
        let store = MemoryStore::new();
        let result = store.transact(5, None, |_| Ok(()));
        assert_eq!(result, Err(RewardError::PoolNotFound { pool_id: 5 }));
    }

    #[test]
    fn test_failed_transaction_leaves_no_trace() {
        let store = MemoryStore::new();
        store.insert_pool(account(1, 100), &[]).expect("insert");
        let result: Result<()> = store.transact(1, None, |txn| {
            txn.account.pool.total_funds += 50;
            txn.account.vault.deposit(50)?;
            Err(RewardError::Unauthorized)
        });
        assert_eq!(result, Err(RewardError::Unauthorized));
        let acc = store.load_pool(1).expect("load").expect("exists");
        assert_eq!(acc.pool.total_funds, 100);
        assert_eq!(acc.vault.balance(), 100);
    }

    #[test]
    fn test_unbalanced_commit_rejected() {
        let store = MemoryStore::new();
        store.insert_pool(account(1, 100), &[]).expect("insert");
        let result = store.transact(1, None, |txn| {
            txn.account.pool.total_funds += 50;
            Ok(())
        });
        assert!(matches!(result, Err(RewardError::LedgerInvariant(_))));
        let acc = store.load_pool(1).expect("load").expect("exists");
        assert_eq!(acc.pool.total_funds, 100);
    }

    #[test]
    fn test_claim_and_journal_written_on_commit() {
        let store = MemoryStore::new();
        store.insert_pool(account(1, 100), &[]).expect("insert");
        let user = Principal::new([7; 32]);
        store
            .transact(1, Some(user), |txn| {
                let mut claim = ClaimRecord::new(1, user, 3);
                claim.total_eligible = 40;
                txn.claim = Some(claim);
                txn.record(VaultMovement {
                    pool_id: 1,
                    kind: MovementKind::Deposit,
                    counterparty: user,
                    amount: 0,
                    at: 3,
                });
                Ok(())
            })
            .expect("commit");

        let claim = store.load_claim(1, &user).expect("load").expect("exists");
        assert_eq!(claim.total_eligible, 40);
        assert_eq!(store.movements(1).expect("journal").len(), 1);
    }

    #[test]
    fn test_claim_for_other_user_rejected() {
        let store = MemoryStore::new();
        store.insert_pool(account(1, 100), &[]).expect("insert");
        let user = Principal::new([7; 32]);
        let other = Principal::new([8; 32]);
        let result = store.transact(1, Some(user), |txn| {
            txn.claim = Some(ClaimRecord::new(1, other, 3));
            Ok(())
        });
        assert!(matches!(result, Err(RewardError::LedgerInvariant(_))));
        assert!(store.load_claim(1, &other).expect("load").is_none());
    }

    #[test]
    fn test_closed_pool_is_immutable() {
        let store = MemoryStore::new();
        let mut acc = account(1, 0);
        acc.pool.active = false;
        store.insert_pool(acc, &[]).expect("insert");
        let result = store.transact(1, None, |txn| {
            txn.account.pool.name = "renamed".to_string();
            Ok(())
        });
        assert!(matches!(result, Err(RewardError::LedgerInvariant(_))));
    }
}
