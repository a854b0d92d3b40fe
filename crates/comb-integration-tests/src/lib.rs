//! Integration test crate for the reward ledger.
//!
//! Holds fixtures shared by the scenario tests under `tests/`, which
//! exercise the engine end to end over both the in-memory and the SQLite
//! ledger stores.
//!
//! ```sh
//! cargo test -p comb-integration-tests
//! ```

use std::path::{Path, PathBuf};
use std::sync::Arc;

use comb_rewards::{AuthContext, ManualClock};
use comb_types::pool::{Currency, DistributionStrategy, PoolConfig};
use comb_types::{PoolId, Principal, Timestamp};

/// Clock value every scenario starts at.
pub const T0: Timestamp = 1_700_000_000;
pub const START: Timestamp = T0 + 60;
pub const END: Timestamp = T0 + 86_400;

pub fn clock() -> Arc<ManualClock> {
    Arc::new(ManualClock::new(T0))
}

pub fn operator() -> AuthContext {
    AuthContext::new(Principal::new([0x0F; 32]))
}

/// Deterministic participant principal.
pub fn participant(n: u8) -> Principal {
    let mut bytes = [0xAA; 32];
    bytes[0] = n;
    Principal::new(bytes)
}

pub fn pool_config(id: PoolId, strategy: DistributionStrategy) -> PoolConfig {
    PoolConfig {
        id,
        name: format!("scenario {id}"),
        currency: Currency::Native,
        strategy,
        declared_rewards: 1,
        start_time: START,
        end_time: END,
        claim_window_secs: None,
    }
}

/// Fresh database path under the system temp directory.
pub fn temp_db_path(tag: &str) -> PathBuf {
    let nonce: u64 = rand::random();
    std::env::temp_dir().join(format!("comb-{tag}-{}-{nonce:016x}.db", std::process::id()))
}

/// Remove a database file and its WAL side files.
pub fn remove_db(path: &Path) {
    for suffix in ["", "-wal", "-shm"] {
        let mut p = path.as_os_str().to_owned();
        p.push(suffix);
        let _ = std::fs::remove_file(p);
    }
}
