//! SQL schema definitions.

/// Complete schema for the v1 ledger database.
pub const SCHEMA_V1: &str = r#"
-- Pools. Currency and strategy are tagged JSON objects.
CREATE TABLE IF NOT EXISTS pools (
    pool_id INTEGER PRIMARY KEY,
    owner BLOB NOT NULL,
    name TEXT NOT NULL,
    currency TEXT NOT NULL,
    strategy TEXT NOT NULL,
    declared_rewards INTEGER NOT NULL,
    total_funds INTEGER NOT NULL DEFAULT 0,
    distributed_funds INTEGER NOT NULL DEFAULT 0,
    reclaimed_funds INTEGER NOT NULL DEFAULT 0,
    start_time INTEGER NOT NULL,
    end_time INTEGER NOT NULL,
    claim_window_secs INTEGER,
    active INTEGER NOT NULL DEFAULT 1,
    created_at INTEGER NOT NULL
);

-- One vault per pool, keyed by (namespace, pool_id).
CREATE TABLE IF NOT EXISTS vaults (
    namespace TEXT NOT NULL DEFAULT 'reward_vault',
    pool_id INTEGER NOT NULL REFERENCES pools(pool_id),
    balance INTEGER NOT NULL DEFAULT 0,
    PRIMARY KEY (namespace, pool_id)
);

CREATE TABLE IF NOT EXISTS claims (
    pool_id INTEGER NOT NULL REFERENCES pools(pool_id),
    user_id BLOB NOT NULL,
    total_eligible INTEGER NOT NULL DEFAULT 0,
    amount_claimed INTEGER NOT NULL DEFAULT 0,
    last_claim_time INTEGER,
    created_at INTEGER NOT NULL,
    PRIMARY KEY (pool_id, user_id)
);

-- Append-only journal of vault balance changes.
CREATE TABLE IF NOT EXISTS vault_movements (
    seq INTEGER PRIMARY KEY AUTOINCREMENT,
    pool_id INTEGER NOT NULL REFERENCES pools(pool_id),
    kind TEXT NOT NULL CHECK (kind IN ('deposit', 'payout', 'close_out')),
    counterparty BLOB NOT NULL,
    amount INTEGER NOT NULL,
    at INTEGER NOT NULL
);

CREATE INDEX IF NOT EXISTS idx_vault_movements_pool ON vault_movements(pool_id, seq);
CREATE INDEX IF NOT EXISTS idx_claims_user ON claims(user_id);
"#;
