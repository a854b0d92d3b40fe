//! Eligibility formulas.
//!
//! Pure functions from a pool's funding and strategy plus one performance
//! record to an eligible amount. All intermediate products are computed in
//! `u128` with checked arithmetic and capped before narrowing back to `u64`.
//!
//! ## Formulas
//!
//! ```text
//! EqualShare        total / expected_participants
//! PerformanceBased  min((total / 1000) * multiplier(score) * time_bonus / 100, total / 10)
//! StakingRewards    min((total / 365) * (staking_duration / 86400),            total / 10)
//! AchievementBased  min((total / 100) * achievements_unlocked,                 total / 5)
//! RandomDrop        total / 50 if random_seed % 100 < 10, else 0
//! ```

use comb_types::performance::PerformanceRecord;
use comb_types::pool::{DistributionStrategy, Pool};
use comb_types::{
    PoolId, UserId, MAX_ACHIEVEMENTS_UNLOCKED, MAX_SCORE, SECONDS_PER_DAY,
};

use crate::{Result, RewardError};

/// PerformanceBased base allocation is 0.1% of the pool.
pub const PERFORMANCE_BASE_DIVISOR: u64 = 1000;

/// Completion-time bonus starts at this many points, minus one per minute.
pub const TIME_BONUS_CEILING: u64 = 120;

/// StakingRewards pays one 365th of the pool per full day staked.
pub const STAKING_DAYS_PER_YEAR: u64 = 365;

/// AchievementBased pays 1% of the pool per achievement.
pub const ACHIEVEMENT_DIVISOR: u64 = 100;

/// Per-user cap for PerformanceBased and StakingRewards (10%).
pub const STANDARD_CAP_DIVISOR: u64 = 10;

/// Per-user cap for AchievementBased (20%).
pub const ACHIEVEMENT_CAP_DIVISOR: u64 = 5;

/// RandomDrop rolls below this out of 100 win.
pub const DROP_WIN_THRESHOLD: u64 = 10;

/// RandomDrop prize is 2% of the pool.
pub const DROP_PRIZE_DIVISOR: u64 = 50;

const DROP_SEED_CONTEXT: &str = "comb-rewards v1 random-drop-seed";

/// Range-check a performance record.
///
/// # Errors
///
/// - [`RewardError::InvalidPerformanceData`] naming the first offending field
pub fn validate_performance(record: &PerformanceRecord) -> Result<()> {
    if record.score > MAX_SCORE {
        return Err(RewardError::InvalidPerformanceData(format!(
            "score {} exceeds {MAX_SCORE}",
            record.score
        )));
    }
    if record.completion_time < 0 {
        return Err(RewardError::InvalidPerformanceData(format!(
            "completion_time {} is negative",
            record.completion_time
        )));
    }
    if record.staking_duration < 0 {
        return Err(RewardError::InvalidPerformanceData(format!(
            "staking_duration {} is negative",
            record.staking_duration
        )));
    }
    if record.achievements_unlocked > MAX_ACHIEVEMENTS_UNLOCKED {
        return Err(RewardError::InvalidPerformanceData(format!(
            "achievements_unlocked {} exceeds {MAX_ACHIEVEMENTS_UNLOCKED}",
            record.achievements_unlocked
        )));
    }
    Ok(())
}

/// Compute the eligible amount for `record` under the pool's strategy.
///
/// # Errors
///
/// - [`RewardError::InvalidPerformanceData`] if the record is out of range
/// - [`RewardError::InvalidStrategy`] if EqualShare expects zero participants
/// - [`RewardError::Overflow`] on arithmetic overflow
pub fn calculate_eligibility(pool: &Pool, record: &PerformanceRecord) -> Result<u64> {
    validate_performance(record)?;

    let total = pool.total_funds;
    let amount = match &pool.strategy {
        DistributionStrategy::EqualShare {
            expected_participants,
        } => equal_share(total, *expected_participants)?,
        DistributionStrategy::PerformanceBased => performance_based(total, record)?,
        DistributionStrategy::StakingRewards => staking_rewards(total, record)?,
        DistributionStrategy::AchievementBased => achievement_based(total, record)?,
        DistributionStrategy::RandomDrop => random_drop(total, record.random_seed),
    };

    tracing::debug!(
        pool_id = pool.id,
        strategy = pool.strategy.name(),
        total,
        amount,
        "eligibility computed"
    );

    Ok(amount)
}

/// Score band multiplier: `[0,50]`→1, `(50,75]`→2, `(75,90]`→3, `(90,99]`→4, `100`→5.
pub fn score_multiplier(score: u32) -> u64 {
    match score {
        0..=50 => 1,
        51..=75 => 2,
        76..=90 => 3,
        91..=99 => 4,
        _ => 5,
    }
}

/// Bonus for finishing quickly: `max(1, 120 - minutes)`.
///
/// A completion time of zero means "not recorded" and earns no bonus.
pub fn time_bonus(completion_time: i64) -> u64 {
    if completion_time <= 0 {
        return 1;
    }
    let minutes = completion_time as u64 / 60;
    TIME_BONUS_CEILING.saturating_sub(minutes).max(1)
}

/// Derive a RandomDrop seed from a beacon revealed after submissions close.
///
/// The seed is bound to the pool and the user so one beacon cannot be
/// replayed across participants.
pub fn drop_seed(beacon: &[u8; 32], pool_id: PoolId, user: &UserId) -> u64 {
    let mut hasher = blake3::Hasher::new_derive_key(DROP_SEED_CONTEXT);
    hasher.update(beacon);
    hasher.update(&pool_id.to_le_bytes());
    hasher.update(user.as_bytes());
    let digest = hasher.finalize();
    let mut seed = [0u8; 8];
    seed.copy_from_slice(&digest.as_bytes()[..8]);
    u64::from_le_bytes(seed)
}

fn equal_share(total: u64, expected_participants: u32) -> Result<u64> {
    if expected_participants == 0 {
        return Err(RewardError::InvalidStrategy(
            "equal share requires at least one expected participant".to_string(),
        ));
    }
    Ok(total / u64::from(expected_participants))
}

fn performance_based(total: u64, record: &PerformanceRecord) -> Result<u64> {
    let base = u128::from(total / PERFORMANCE_BASE_DIVISOR);
    let raw = base
        .checked_mul(u128::from(score_multiplier(record.score)))
        .and_then(|v| v.checked_mul(u128::from(time_bonus(record.completion_time))))
        .ok_or(RewardError::Overflow)?
        / 100;
    capped(raw, total / STANDARD_CAP_DIVISOR)
}

fn staking_rewards(total: u64, record: &PerformanceRecord) -> Result<u64> {
    let daily = u128::from(total / STAKING_DAYS_PER_YEAR);
    let days = u128::from(record.staking_duration as u64 / SECONDS_PER_DAY);
    let raw = daily.checked_mul(days).ok_or(RewardError::Overflow)?;
    capped(raw, total / STANDARD_CAP_DIVISOR)
}

fn achievement_based(total: u64, record: &PerformanceRecord) -> Result<u64> {
    let per_achievement = u128::from(total / ACHIEVEMENT_DIVISOR);
    let raw = per_achievement
        .checked_mul(u128::from(record.achievements_unlocked))
        .ok_or(RewardError::Overflow)?;
    capped(raw, total / ACHIEVEMENT_CAP_DIVISOR)
}

fn random_drop(total: u64, seed: u64) -> u64 {
    if seed % 100 < DROP_WIN_THRESHOLD {
        total / DROP_PRIZE_DIVISOR
    } else {
        0
    }
}

fn capped(raw: u128, cap: u64) -> Result<u64> {
    u64::try_from(raw.min(u128::from(cap))).map_err(|_| RewardError::Overflow)
}
