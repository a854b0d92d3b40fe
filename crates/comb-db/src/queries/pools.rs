//! Pool and vault rows.

use rusqlite::{Connection, OptionalExtension, Row};

use comb_rewards::{PoolAccount, Vault};
use comb_types::pool::{Pool, VaultKey};
use comb_types::PoolId;

use super::principal_from_blob;
use crate::{DbError, Result};

/// Whether a pool row exists.
pub fn exists(conn: &Connection, pool_id: PoolId) -> Result<bool> {
    let found: Option<i64> = conn
        .query_row(
            "SELECT 1 FROM pools WHERE pool_id = ?1",
            [pool_id as i64],
            |row| row.get(0),
        )
        .optional()?;
    Ok(found.is_some())
}

/// Insert a pool and its vault.
pub fn insert(conn: &Connection, account: &PoolAccount) -> Result<()> {
    let pool = &account.pool;
    conn.execute(
        "INSERT INTO pools (pool_id, owner, name, currency, strategy, declared_rewards,
                            total_funds, distributed_funds, reclaimed_funds,
                            start_time, end_time, claim_window_secs, active, created_at)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?14)",
        rusqlite::params![
            pool.id as i64,
            pool.owner.as_bytes().as_slice(),
            pool.name,
            to_json(&pool.currency)?,
            to_json(&pool.strategy)?,
            pool.declared_rewards as i64,
            pool.total_funds as i64,
            pool.distributed_funds as i64,
            pool.reclaimed_funds as i64,
            pool.start_time as i64,
            pool.end_time as i64,
            pool.claim_window_secs.map(|w| w as i64),
            pool.active,
            pool.created_at as i64,
        ],
    )?;
    conn.execute(
        "INSERT INTO vaults (namespace, pool_id, balance) VALUES (?1, ?2, ?3)",
        rusqlite::params![
            VaultKey::NAMESPACE,
            account.vault.pool_id() as i64,
            account.vault.balance() as i64,
        ],
    )?;
    Ok(())
}

/// Write back the mutable fields of a pool and its vault balance.
pub fn update(conn: &Connection, account: &PoolAccount) -> Result<()> {
    let pool = &account.pool;
    let updated = conn.execute(
        "UPDATE pools SET strategy = ?1, total_funds = ?2, distributed_funds = ?3,
                          reclaimed_funds = ?4, active = ?5
         WHERE pool_id = ?6",
        rusqlite::params![
            to_json(&pool.strategy)?,
            pool.total_funds as i64,
            pool.distributed_funds as i64,
            pool.reclaimed_funds as i64,
            pool.active,
            pool.id as i64,
        ],
    )?;
    if updated == 0 {
        return Err(DbError::NotFound(format!("pool {}", pool.id)));
    }

    let updated = conn.execute(
        "UPDATE vaults SET balance = ?1 WHERE namespace = ?2 AND pool_id = ?3",
        rusqlite::params![
            account.vault.balance() as i64,
            VaultKey::NAMESPACE,
            pool.id as i64,
        ],
    )?;
    if updated == 0 {
        return Err(DbError::NotFound(
            VaultKey::new(pool.id).storage_key(),
        ));
    }
    Ok(())
}

/// Load a pool together with its vault.
pub fn get(conn: &Connection, pool_id: PoolId) -> Result<Option<PoolAccount>> {
    let raw = conn
        .query_row(
            "SELECT p.pool_id, p.owner, p.name, p.currency, p.strategy, p.declared_rewards,
                    p.total_funds, p.distributed_funds, p.reclaimed_funds,
                    p.start_time, p.end_time, p.claim_window_secs, p.active, p.created_at,
                    v.balance
             FROM pools p
             JOIN vaults v ON v.pool_id = p.pool_id AND v.namespace = ?2
             WHERE p.pool_id = ?1",
            rusqlite::params![pool_id as i64, VaultKey::NAMESPACE],
            PoolRow::read,
        )
        .optional()?;

    raw.map(PoolRow::into_account).transpose()
}

/// List pool ids, ascending.
pub fn list_ids(conn: &Connection) -> Result<Vec<PoolId>> {
    let mut stmt = conn.prepare("SELECT pool_id FROM pools ORDER BY pool_id")?;
    let ids = stmt
        .query_map([], |row| Ok(row.get::<_, i64>(0)? as u64))?
        .collect::<std::result::Result<Vec<_>, _>>()?;
    Ok(ids)
}

struct PoolRow {
    id: u64,
    owner: Vec<u8>,
    name: String,
    currency: String,
    strategy: String,
    declared_rewards: u64,
    total_funds: u64,
    distributed_funds: u64,
    reclaimed_funds: u64,
    start_time: u64,
    end_time: u64,
    claim_window_secs: Option<u64>,
    active: bool,
    created_at: u64,
    balance: u64,
}

impl PoolRow {
    fn read(row: &Row<'_>) -> rusqlite::Result<Self> {
        Ok(Self {
            id: row.get::<_, i64>(0)? as u64,
            owner: row.get(1)?,
            name: row.get(2)?,
            currency: row.get(3)?,
            strategy: row.get(4)?,
            declared_rewards: row.get::<_, i64>(5)? as u64,
            total_funds: row.get::<_, i64>(6)? as u64,
            distributed_funds: row.get::<_, i64>(7)? as u64,
            reclaimed_funds: row.get::<_, i64>(8)? as u64,
            start_time: row.get::<_, i64>(9)? as u64,
            end_time: row.get::<_, i64>(10)? as u64,
            claim_window_secs: row.get::<_, Option<i64>>(11)?.map(|w| w as u64),
            active: row.get(12)?,
            created_at: row.get::<_, i64>(13)? as u64,
            balance: row.get::<_, i64>(14)? as u64,
        })
    }

    fn into_account(self) -> Result<PoolAccount> {
        let pool = Pool {
            id: self.id,
            owner: principal_from_blob("pools.owner", self.owner)?,
            name: self.name,
            currency: from_json("pools.currency", &self.currency)?,
            strategy: from_json("pools.strategy", &self.strategy)?,
            declared_rewards: self.declared_rewards,
            total_funds: self.total_funds,
            distributed_funds: self.distributed_funds,
            reclaimed_funds: self.reclaimed_funds,
            start_time: self.start_time,
            end_time: self.end_time,
            claim_window_secs: self.claim_window_secs,
            active: self.active,
            created_at: self.created_at,
        };
        Ok(PoolAccount {
            vault: Vault::restore(pool.id, self.balance),
            pool,
        })
    }
}

fn to_json<T: serde::Serialize>(value: &T) -> Result<String> {
    serde_json::to_string(value).map_err(|e| DbError::Serialization(e.to_string()))
}

fn from_json<T: serde::de::DeserializeOwned>(column: &str, text: &str) -> Result<T> {
    serde_json::from_str(text).map_err(|e| DbError::Serialization(format!("{column}: {e}")))
}
