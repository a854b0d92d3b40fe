//! # comb-rewards
//!
//! Reward pool distribution and claims.
//!
//! Pools are created and funded by an operator, participants become eligible
//! for an amount computed from their contest performance, and each eligible
//! amount is paid out at most once.
//!
//! ## Modules
//!
//! - [`vault`]: Per-pool custodial balance
//! - [`registry`]: Pool creation, funding, reconfiguration and close-out
//! - [`distribution`]: Eligibility formulas
//! - [`claims`]: Eligibility bookkeeping and payouts
//! - [`verifier`]: Achievement batch validation
//! - [`store`]: Atomic ledger storage
//! - [`engine`]: Operations exposed to collaborators
//! - [`clock`]: Time source

pub mod claims;
pub mod clock;
pub mod distribution;
pub mod engine;
pub mod registry;
pub mod store;
pub mod vault;
pub mod verifier;

pub use clock::{Clock, ManualClock, SystemClock};
pub use engine::{AuthContext, RewardEngine};
pub use store::{LedgerStore, MemoryStore, PoolAccount, Txn};
pub use vault::Vault;

use comb_types::PoolId;

/// Broad category of a [`RewardError`], used by callers to decide how to
/// surface it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorClass {
    Validation,
    Authorization,
    Lifecycle,
    Ledger,
    Arithmetic,
    Storage,
}

/// Error types for reward operations.
///
/// Every error leaves ledger state untouched.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum RewardError {
    /// No pool with this id.
    #[error("pool {pool_id} not found")]
    PoolNotFound {
        /// The requested pool.
        pool_id: PoolId,
    },

    /// A pool with this id already exists.
    #[error("pool {pool_id} already exists")]
    PoolAlreadyExists {
        /// The duplicate id.
        pool_id: PoolId,
    },

    /// Pool name exceeds the length limit.
    #[error("invalid pool name: {len} characters (max 50)")]
    InvalidPoolName {
        /// Name length in characters.
        len: usize,
    },

    /// Start time lies in the past.
    #[error("start time {start_time} is before current time {now}")]
    InvalidStartTime {
        /// Requested start.
        start_time: u64,
        /// Current time.
        now: u64,
    },

    /// End time is not after start time.
    #[error("end time {end_time} must be after start time {start_time}")]
    InvalidEndTime {
        /// Requested start.
        start_time: u64,
        /// Requested end.
        end_time: u64,
    },

    /// Zero reward or funding amount.
    #[error("reward amount must be non-zero")]
    InvalidRewardAmount,

    /// Currency does not name a usable asset.
    #[error("invalid currency: {0}")]
    InvalidCurrency(String),

    /// Strategy parameters are unusable.
    #[error("invalid distribution strategy: {0}")]
    InvalidStrategy(String),

    /// Performance record field out of range.
    #[error("invalid performance data: {0}")]
    InvalidPerformanceData(String),

    /// Caller may not perform this operation.
    #[error("caller is not authorized for this operation")]
    Unauthorized,

    /// Pool has been closed.
    #[error("pool is not active")]
    PoolNotActive,

    /// Pool has not reached its end time.
    #[error("pool is still active")]
    PoolStillActive,

    /// Pool has not reached its start time.
    #[error("claim period has not started yet")]
    ClaimPeriodNotStarted,

    /// Calculation or claim window has passed.
    #[error("claim period has ended")]
    ClaimPeriodEnded,

    /// Strategy can only change before the pool starts.
    #[error("cannot update a pool after its start time")]
    CannotUpdateActivePool,

    /// Claimable amount is zero.
    #[error("nothing to claim")]
    NothingToClaim,

    /// Vault cannot cover the withdrawal.
    #[error("insufficient pool funds: have {available}, need {required}")]
    InsufficientPoolFunds {
        /// Vault balance.
        available: u64,
        /// Requested withdrawal.
        required: u64,
    },

    /// Achievement batch is too large.
    #[error("too many achievements: {count} (max 100)")]
    TooManyAchievements {
        /// Entries in the batch.
        count: usize,
    },

    /// Batch profile does not belong to the caller.
    #[error("achievement profile does not belong to caller")]
    InvalidHoneycombProfile,

    /// Achievement entry failed structural validation.
    #[error("invalid achievement data: {0}")]
    InvalidAchievementData(String),

    /// Arithmetic overflow in a reward or balance computation.
    #[error("arithmetic overflow in reward calculation")]
    Overflow,

    /// A ledger invariant would be violated; the transaction is rejected.
    #[error("ledger invariant violated: {0}")]
    LedgerInvariant(String),

    /// Backing store failure.
    #[error("storage error: {0}")]
    Storage(String),
}

impl RewardError {
    pub fn class(&self) -> ErrorClass {
        match self {
            Self::PoolNotFound { .. }
            | Self::PoolAlreadyExists { .. }
            | Self::InvalidPoolName { .. }
            | Self::InvalidStartTime { .. }
            | Self::InvalidEndTime { .. }
            | Self::InvalidRewardAmount
            | Self::InvalidCurrency(_)
            | Self::InvalidStrategy(_)
            | Self::InvalidPerformanceData(_)
            | Self::TooManyAchievements { .. }
            | Self::InvalidAchievementData(_) => ErrorClass::Validation,
            Self::Unauthorized | Self::InvalidHoneycombProfile => ErrorClass::Authorization,
            Self::PoolNotActive
            | Self::PoolStillActive
            | Self::ClaimPeriodNotStarted
            | Self::ClaimPeriodEnded
            | Self::CannotUpdateActivePool => ErrorClass::Lifecycle,
            Self::NothingToClaim
            | Self::InsufficientPoolFunds { .. }
            | Self::LedgerInvariant(_) => ErrorClass::Ledger,
            Self::Overflow => ErrorClass::Arithmetic,
            Self::Storage(_) => ErrorClass::Storage,
        }
    }

    /// Stable machine-readable name.
    pub fn name(&self) -> &'static str {
        match self {
            Self::PoolNotFound { .. } => "POOL_NOT_FOUND",
            Self::PoolAlreadyExists { .. } => "POOL_ALREADY_EXISTS",
            Self::InvalidPoolName { .. } => "INVALID_POOL_NAME",
            Self::InvalidStartTime { .. } => "INVALID_START_TIME",
            Self::InvalidEndTime { .. } => "INVALID_END_TIME",
            Self::InvalidRewardAmount => "INVALID_REWARD_AMOUNT",
            Self::InvalidCurrency(_) => "INVALID_CURRENCY",
            Self::InvalidStrategy(_) => "INVALID_STRATEGY",
            Self::InvalidPerformanceData(_) => "INVALID_PERFORMANCE_DATA",
            Self::Unauthorized => "UNAUTHORIZED",
            Self::PoolNotActive => "POOL_NOT_ACTIVE",
            Self::PoolStillActive => "POOL_STILL_ACTIVE",
            Self::ClaimPeriodNotStarted => "CLAIM_PERIOD_NOT_STARTED",
            Self::ClaimPeriodEnded => "CLAIM_PERIOD_ENDED",
            Self::CannotUpdateActivePool => "CANNOT_UPDATE_ACTIVE_POOL",
            Self::NothingToClaim => "NOTHING_TO_CLAIM",
            Self::InsufficientPoolFunds { .. } => "INSUFFICIENT_POOL_FUNDS",
            Self::TooManyAchievements { .. } => "TOO_MANY_ACHIEVEMENTS",
            Self::InvalidHoneycombProfile => "INVALID_HONEYCOMB_PROFILE",
            Self::InvalidAchievementData(_) => "INVALID_ACHIEVEMENT_DATA",
            Self::Overflow => "OVERFLOW",
            Self::LedgerInvariant(_) => "LEDGER_INVARIANT",
            Self::Storage(_) => "STORAGE_ERROR",
        }
    }
}

/// Convenience result type for reward operations.
pub type Result<T> = std::result::Result<T, RewardError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_classes() {
        assert_eq!(RewardError::InvalidRewardAmount.class(), ErrorClass::Validation);
        assert_eq!(RewardError::Unauthorized.class(), ErrorClass::Authorization);
        assert_eq!(RewardError::PoolStillActive.class(), ErrorClass::Lifecycle);
        assert_eq!(RewardError::NothingToClaim.class(), ErrorClass::Ledger);
        assert_eq!(RewardError::Overflow.class(), ErrorClass::Arithmetic);
    }

    #[test]
    fn test_error_display() {
        let err = RewardError::InsufficientPoolFunds {
            available: 10,
            required: 20,
        };
        assert_eq!(err.to_string(), "insufficient pool funds: have 10, need 20");
        assert_eq!(err.name(), "INSUFFICIENT_POOL_FUNDS");
    }
}
