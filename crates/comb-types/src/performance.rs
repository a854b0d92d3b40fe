//! Contest performance input, supplied by the tournament component.

use serde::{Deserialize, Serialize};

use crate::Principal;

/// One participant's results for a finished contest.
///
/// Range checks live in the distribution engine so that every strategy
/// rejects malformed input the same way.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PerformanceRecord {
    /// 0-100.
    pub score: u32,
    /// Seconds taken to finish; 0 when not recorded.
    pub completion_time: i64,
    /// Seconds staked.
    pub staking_duration: i64,
    /// 0-100.
    pub achievements_unlocked: u32,
    pub random_seed: u64,
    /// Achievement profile the unlocked count was attested against.
    #[serde(default)]
    pub achievement_profile: Option<Principal>,
}
