//! Claim rows.

use rusqlite::{Connection, OptionalExtension};

use comb_types::claim::ClaimRecord;
use comb_types::{PoolId, UserId};

use super::principal_from_blob;
use crate::Result;

/// Insert or replace the claim for `(pool_id, user)`.
pub fn upsert(conn: &Connection, claim: &ClaimRecord) -> Result<()> {
    conn.execute(
        "INSERT INTO claims (pool_id, user_id, total_eligible, amount_claimed,
                             last_claim_time, created_at)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6)
         ON CONFLICT(pool_id, user_id) DO UPDATE SET
             total_eligible = excluded.total_eligible,
             amount_claimed = excluded.amount_claimed,
             last_claim_time = excluded.last_claim_time",
        rusqlite::params![
            claim.pool_id as i64,
            claim.user.as_bytes().as_slice(),
            claim.total_eligible as i64,
            claim.amount_claimed as i64,
            claim.last_claim_time.map(|t| t as i64),
            claim.created_at as i64,
        ],
    )?;
    Ok(())
}

pub fn get(conn: &Connection, pool_id: PoolId, user: &UserId) -> Result<Option<ClaimRecord>> {
    let row = conn
        .query_row(
            "SELECT total_eligible, amount_claimed, last_claim_time, created_at
             FROM claims WHERE pool_id = ?1 AND user_id = ?2",
            rusqlite::params![pool_id as i64, user.as_bytes().as_slice()],
            |row| {
                Ok(ClaimRecord {
                    pool_id,
                    user: *user,
                    total_eligible: row.get::<_, i64>(0)? as u64,
                    amount_claimed: row.get::<_, i64>(1)? as u64,
                    last_claim_time: row.get::<_, Option<i64>>(2)?.map(|t| t as u64),
                    created_at: row.get::<_, i64>(3)? as u64,
                })
            },
        )
        .optional()?;
    Ok(row)
}

/// All claims in a pool.
pub fn list_for_pool(conn: &Connection, pool_id: PoolId) -> Result<Vec<ClaimRecord>> {
    let mut stmt = conn.prepare(
        "SELECT user_id, total_eligible, amount_claimed, last_claim_time, created_at
         FROM claims WHERE pool_id = ?1 ORDER BY created_at, user_id",
    )?;
    let rows = stmt
        .query_map([pool_id as i64], |row| {
            Ok((
                row.get::<_, Vec<u8>>(0)?,
                row.get::<_, i64>(1)? as u64,
                row.get::<_, i64>(2)? as u64,
                row.get::<_, Option<i64>>(3)?.map(|t| t as u64),
                row.get::<_, i64>(4)? as u64,
            ))
        })?
        .collect::<std::result::Result<Vec<_>, _>>()?;

    rows.into_iter()
        .map(|(user, total_eligible, amount_claimed, last_claim_time, created_at)| {
            Ok(ClaimRecord {
                pool_id,
                user: principal_from_blob("claims.user_id", user)?,
                total_eligible,
                amount_claimed,
                last_claim_time,
                created_at,
            })
        })
        .collect()
}
