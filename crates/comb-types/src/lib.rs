//! # comb-types
//!
//! Shared domain types for the reward distribution workspace: pools and
//! their vaults, per-user claim records, and the inputs supplied by external
//! collaborators (performance records and achievement batches).

pub mod achievement;
pub mod claim;
pub mod identity;
pub mod performance;
pub mod pool;

pub use identity::{Principal, TokenId};

/// Pool identifier, chosen by the operator at creation time.
pub type PoolId = u64;

/// Participants are identified by their principal.
pub type UserId = Principal;

/// Unix timestamp in seconds.
pub type Timestamp = u64;

/// Seconds per day.
pub const SECONDS_PER_DAY: u64 = 86_400;

/// Maximum pool name length in characters.
pub const MAX_POOL_NAME_LEN: usize = 50;

/// Maximum number of entries in one achievement batch.
pub const MAX_ACHIEVEMENTS_PER_BATCH: usize = 100;

/// Upper bound on `PerformanceRecord::score`.
pub const MAX_SCORE: u32 = 100;

/// Upper bound on `PerformanceRecord::achievements_unlocked`.
pub const MAX_ACHIEVEMENTS_UNLOCKED: u32 = 100;
