//! Achievement batch validation.
//!
//! Checks a batch from the achievement service before its unlocked count is
//! trusted as input to an achievement-based calculation. The result is
//! advisory: the engine does not require a verified batch before computing
//! eligibility.

use std::collections::HashSet;

use comb_types::achievement::AchievementBatch;
use comb_types::{Principal, MAX_ACHIEVEMENTS_PER_BATCH};

use crate::{Result, RewardError};

/// Validate `batch` on behalf of `caller`.
///
/// Returns `true` when every entry is attested by the issuing service and
/// `false` when the batch is well-formed but carries unattested entries.
///
/// # Errors
///
/// - [`RewardError::TooManyAchievements`] if the batch has more than 100 entries
/// - [`RewardError::InvalidHoneycombProfile`] if the profile is not the caller's
/// - [`RewardError::InvalidAchievementData`] if an entry is malformed
pub fn verify_batch(caller: &Principal, batch: &AchievementBatch) -> Result<bool> {
    let count = batch.achievements.len();
    if count > MAX_ACHIEVEMENTS_PER_BATCH {
        return Err(RewardError::TooManyAchievements { count });
    }
    if &batch.profile_owner != caller {
        tracing::warn!(
            caller = %caller,
            profile = %batch.profile_owner,
            "achievement batch for foreign profile"
        );
        return Err(RewardError::InvalidHoneycombProfile);
    }
    if batch.completion_rate > 100 {
        return Err(RewardError::InvalidAchievementData(format!(
            "completion rate {} exceeds 100",
            batch.completion_rate
        )));
    }

    let mut seen = HashSet::with_capacity(count);
    for (i, a) in batch.achievements.iter().enumerate() {
        if a.id.trim().is_empty() {
            return Err(RewardError::InvalidAchievementData(format!(
                "entry {i}: empty id"
            )));
        }
        if a.name.trim().is_empty() {
            return Err(RewardError::InvalidAchievementData(format!(
                "entry {i}: empty name"
            )));
        }
        if a.points < 0 {
            return Err(RewardError::InvalidAchievementData(format!(
                "entry {i}: negative points"
            )));
        }
        if a.timestamp < 0 {
            return Err(RewardError::InvalidAchievementData(format!(
                "entry {i}: negative timestamp"
            )));
        }
        if !seen.insert(a.id.as_str()) {
            return Err(RewardError::InvalidAchievementData(format!(
                "entry {i}: duplicate id {}",
                a.id
            )));
        }
    }

    Ok(batch.achievements.iter().all(|a| a.verified))
}
