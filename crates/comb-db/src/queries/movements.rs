//! Vault movement journal.

use rusqlite::Connection;

use comb_types::pool::{MovementKind, VaultMovement};
use comb_types::PoolId;

use super::principal_from_blob;
use crate::{DbError, Result};

pub fn append(conn: &Connection, movement: &VaultMovement) -> Result<()> {
    conn.execute(
        "INSERT INTO vault_movements (pool_id, kind, counterparty, amount, at)
         VALUES (?1, ?2, ?3, ?4, ?5)",
        rusqlite::params![
            movement.pool_id as i64,
            movement.kind.as_str(),
            movement.counterparty.as_bytes().as_slice(),
            movement.amount as i64,
            movement.at as i64,
        ],
    )?;
    Ok(())
}

/// Journal of one pool, oldest first.
pub fn list(conn: &Connection, pool_id: PoolId) -> Result<Vec<VaultMovement>> {
    let mut stmt = conn.prepare(
        "SELECT kind, counterparty, amount, at
         FROM vault_movements WHERE pool_id = ?1 ORDER BY seq",
    )?;
    let rows = stmt
        .query_map([pool_id as i64], |row| {
            Ok((
                row.get::<_, String>(0)?,
                row.get::<_, Vec<u8>>(1)?,
                row.get::<_, i64>(2)? as u64,
                row.get::<_, i64>(3)? as u64,
            ))
        })?
        .collect::<std::result::Result<Vec<_>, _>>()?;

    rows.into_iter()
        .map(|(kind, counterparty, amount, at)| {
            Ok(VaultMovement {
                pool_id,
                kind: MovementKind::parse(&kind)
                    .ok_or_else(|| DbError::Serialization(format!("movement kind {kind}")))?,
                counterparty: principal_from_blob("vault_movements.counterparty", counterparty)?,
                amount,
                at,
            })
        })
        .collect()
}
