//! # comb-db
//!
//! SQLite persistence for the reward ledger.
//!
//! - WAL mode, foreign keys enforced
//! - All timestamps are Unix epoch seconds (u64, stored as INTEGER)
//! - Schema version stored in `PRAGMA user_version`
//!
//! [`SqliteStore`] implements [`comb_rewards::LedgerStore`]; every ledger
//! transaction runs inside one `BEGIN IMMEDIATE` SQLite transaction.

pub mod migrations;
pub mod queries;
pub mod schema;
pub mod store;

pub use store::SqliteStore;

use std::path::Path;

use comb_rewards::RewardError;
use rusqlite::Connection;

/// Ledger schema version this build writes.
pub const SCHEMA_VERSION: u32 = 1;

/// Connection pragmas. `synchronous = FULL` so a committed payout survives
/// power loss.
const PRAGMAS: &[(&str, &str)] = &[
    ("journal_mode", "WAL"),
    ("foreign_keys", "ON"),
    ("busy_timeout", "5000"),
    ("synchronous", "FULL"),
];

#[derive(Debug, thiserror::Error)]
pub enum DbError {
    #[error("SQLite error: {0}")]
    Sqlite(#[from] rusqlite::Error),

    #[error("migration failed: {0}")]
    Migration(String),

    #[error("not found: {0}")]
    NotFound(String),

    /// A stored value could not be decoded into its domain type.
    #[error("corrupt column: {0}")]
    Serialization(String),
}

pub type Result<T> = std::result::Result<T, DbError>;

impl From<DbError> for RewardError {
    fn from(err: DbError) -> Self {
        tracing::error!(error = %err, "ledger storage failure");
        RewardError::Storage(err.to_string())
    }
}

/// Open (creating if needed) the ledger database at `path` and migrate it.
pub fn open(path: &Path) -> Result<Connection> {
    prepare(Connection::open(path)?)
}

/// Private in-memory ledger, used by tests and ephemeral daemons.
pub fn open_memory() -> Result<Connection> {
    prepare(Connection::open_in_memory()?)
}

fn prepare(conn: Connection) -> Result<Connection> {
    let batch: String = PRAGMAS
        .iter()
        .map(|(name, value)| format!("PRAGMA {name} = {value};\n"))
        .collect();
    conn.execute_batch(&batch)?;
    migrations::run(&conn)?;
    Ok(conn)
}
