//! SQLite-backed ledger store.

use std::path::Path;
use std::sync::{Mutex, MutexGuard};

use rusqlite::{Connection, TransactionBehavior};

use comb_rewards::{LedgerStore, PoolAccount, RewardError, Txn};
use comb_types::claim::ClaimRecord;
use comb_types::pool::VaultMovement;
use comb_types::{PoolId, UserId};

use crate::queries::{claims, movements, pools};
use crate::DbError;

/// Ledger store over a single SQLite connection.
///
/// Each [`LedgerStore::transact`] call runs in a `BEGIN IMMEDIATE`
/// transaction, so the read of the pool and claim and the write-back are
/// atomic with respect to other writers on the same database file. A failed
/// closure or invariant check rolls the transaction back.
pub struct SqliteStore {
    conn: Mutex<Connection>,
}

impl SqliteStore {
    /// Open or create the database at `path`.
    pub fn open(path: &Path) -> crate::Result<Self> {
        Ok(Self::from_connection(crate::open(path)?))
    }

    /// In-memory database (for testing).
    pub fn open_memory() -> crate::Result<Self> {
        Ok(Self::from_connection(crate::open_memory()?))
    }

    /// Wrap an already configured and migrated connection.
    pub fn from_connection(conn: Connection) -> Self {
        Self {
            conn: Mutex::new(conn),
        }
    }

    /// All pool ids, ascending.
    pub fn pool_ids(&self) -> comb_rewards::Result<Vec<PoolId>> {
        let conn = self.lock()?;
        Ok(pools::list_ids(&conn)?)
    }

    /// All claims recorded for a pool.
    pub fn claims(&self, pool_id: PoolId) -> comb_rewards::Result<Vec<ClaimRecord>> {
        let conn = self.lock()?;
        Ok(claims::list_for_pool(&conn, pool_id)?)
    }

    fn lock(&self) -> comb_rewards::Result<MutexGuard<'_, Connection>> {
        self.conn
            .lock()
            .map_err(|_| RewardError::Storage("connection lock poisoned".to_string()))
    }
}

fn sqlite(err: rusqlite::Error) -> RewardError {
    DbError::Sqlite(err).into()
}

impl LedgerStore for SqliteStore {
    fn insert_pool(
        &self,
        account: PoolAccount,
        journal: &[VaultMovement],
    ) -> comb_rewards::Result<()> {
        account.check_conservation()?;
        let pool_id = account.pool.id;

        let mut conn = self.lock()?;
        let tx = conn
            .transaction_with_behavior(TransactionBehavior::Immediate)
            .map_err(sqlite)?;
        if pools::exists(&tx, pool_id)? {
            return Err(RewardError::PoolAlreadyExists { pool_id });
        }
        pools::insert(&tx, &account)?;
        for movement in journal {
            movements::append(&tx, movement)?;
        }
        tx.commit().map_err(sqlite)?;

        tracing::debug!(pool_id, "pool persisted");
        Ok(())
    }

    fn load_pool(&self, pool_id: PoolId) -> comb_rewards::Result<Option<PoolAccount>> {
        let conn = self.lock()?;
        Ok(pools::get(&conn, pool_id)?)
    }

    fn load_claim(
        &self,
        pool_id: PoolId,
        user: &UserId,
    ) -> comb_rewards::Result<Option<ClaimRecord>> {
        let conn = self.lock()?;
        Ok(claims::get(&conn, pool_id, user)?)
    }

    fn movements(&self, pool_id: PoolId) -> comb_rewards::Result<Vec<VaultMovement>> {
        let conn = self.lock()?;
        if !pools::exists(&conn, pool_id)? {
            return Err(RewardError::PoolNotFound { pool_id });
        }
        Ok(movements::list(&conn, pool_id)?)
    }

    fn transact<T, F>(
        &self,
        pool_id: PoolId,
        user: Option<UserId>,
        f: F,
    ) -> comb_rewards::Result<T>
    where
        F: FnOnce(&mut Txn) -> comb_rewards::Result<T>,
    {
        let mut conn = self.lock()?;
        let tx = conn
            .transaction_with_behavior(TransactionBehavior::Immediate)
            .map_err(sqlite)?;

        let account = pools::get(&tx, pool_id)?.ok_or(RewardError::PoolNotFound { pool_id })?;
        let claim = match &user {
            Some(u) => claims::get(&tx, pool_id, u)?,
            None => None,
        };

        let mut txn = Txn::new(account, user, claim);
        let out = f(&mut txn)?;
        let (account, claim, journal) = txn.finish()?;

        pools::update(&tx, &account)?;
        if let Some(claim) = &claim {
            claims::upsert(&tx, claim)?;
        }
        for movement in &journal {
            movements::append(&tx, movement)?;
        }
        tx.commit().map_err(sqlite)?;
        Ok(out)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use comb_rewards::Vault;
    use comb_types::pool::{Currency, DistributionStrategy, MovementKind, Pool};
    use comb_types::Principal;

    fn account(id: PoolId, funds: u64) -> PoolAccount {
        let pool = Pool {
            id,
            owner: Principal::new([1; 32]),
            name: "sqlite".to_string(),
            currency: Currency::Native,
            strategy: DistributionStrategy::PerformanceBased,
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

    fn store() -> SqliteStore {
        SqliteStore::open_memory().expect("open store")
    }

    #[test]
    fn test_insert_duplicate_rejected() {
        let store = store();
        store.insert_pool(account(1, 10), &[]).expect("insert");
        assert_eq!(
            store.insert_pool(account(1, 10), &[]),
            Err(RewardError::PoolAlreadyExists { pool_id: 1 })
        );
        assert_eq!(store.pool_ids().expect("ids"), vec![1]);
    }

    #[test]
    fn test_unknown_pool() {
        let store = store();
        assert!(store.load_pool(3).expect("load").is_none());
        assert_eq!(
            store.movements(3),
            Err(RewardError::PoolNotFound { pool_id: 3 })
        );
        assert_eq!(
            store.transact(3, None, |_| Ok(())),
            Err(RewardError::PoolNotFound { pool_id: 3 })
        );
    }

    #[test]
    fn test_commit_writes_everything() {
        let store = store();
        store.insert_pool(account(1, 100), &[]).expect("insert");
        let user = Principal::new([8; 32]);

        store
            .transact(1, Some(user), |txn| {
                let mut claim = ClaimRecord::new(1, user, 2);
                claim.total_eligible = 30;
                txn.claim = Some(claim);
                txn.account.pool.total_funds += 20;
                txn.account.vault = Vault::restore(1, 120);
                txn.record(VaultMovement {
                    pool_id: 1,
                    kind: MovementKind::Deposit,
                    counterparty: user,
                    amount: 20,
                    at: 2,
                });
                Ok(())
            })
            .expect("commit");

        let acc = store.load_pool(1).expect("load").expect("present");
        assert_eq!(acc.pool.total_funds, 120);
        assert_eq!(acc.vault.balance(), 120);
        assert_eq!(
            store
                .load_claim(1, &user)
                .expect("load")
                .expect("present")
                .total_eligible,
            30
        );
        assert_eq!(store.movements(1).expect("journal").len(), 1);
        assert_eq!(store.claims(1).expect("claims").len(), 1);
    }

    #[test]
    fn test_rollback_on_error() {
        let store = store();
        store.insert_pool(account(1, 100), &[]).expect("insert");
        let user = Principal::new([8; 32]);

        let result: comb_rewards::Result<()> = store.transact(1, Some(user), |txn| {
            txn.claim = Some(ClaimRecord::new(1, user, 2));
            txn.account.pool.total_funds += 1;
            Ok(())
        });
        assert!(matches!(result, Err(RewardError::LedgerInvariant(_))));

        assert!(store.load_claim(1, &user).expect("load").is_none());
        assert_eq!(
            store.load_pool(1).expect("load").expect("present").pool.total_funds,
            100
        );
    }
}
