//! Database migration system.
//!
//! Schema version stored in `PRAGMA user_version`. Migrations are forward-only.

use rusqlite::Connection;

use crate::{schema, DbError, Result, SCHEMA_VERSION};

/// Migration scripts in version order; entry `n` upgrades to version `n + 1`.
const MIGRATIONS: &[&str] = &[schema::SCHEMA_V1];

/// Bring the database up to [`SCHEMA_VERSION`].
///
/// Each step runs in its own transaction together with its `user_version`
/// bump, so a failed step leaves the previous version intact.
pub fn run(conn: &Connection) -> Result<()> {
    let current: u32 = conn.pragma_query_value(None, "user_version", |row| row.get(0))?;
    if current > SCHEMA_VERSION {
        return Err(DbError::Migration(format!(
            "ledger database is v{current}, newest supported is v{SCHEMA_VERSION}"
        )));
    }

    for version in (current + 1)..=SCHEMA_VERSION {
        let script = MIGRATIONS
            .get(version as usize - 1)
            .ok_or_else(|| DbError::Migration(format!("no script for v{version}")))?;
        tracing::info!(version, "applying ledger schema migration");
        let tx = conn.unchecked_transaction()?;
        tx.execute_batch(script)?;
        tx.pragma_update(None, "user_version", version)?;
        tx.commit()?;
    }

    Ok(())
}
