//! Achievement batches issued by the achievement service.

use serde::{Deserialize, Serialize};

use crate::Principal;

/// A single attested accomplishment.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Achievement {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub description: String,
    pub points: i64,
    /// Unix seconds when unlocked.
    pub timestamp: i64,
    /// Set by the issuing service once attested.
    pub verified: bool,
}

/// A batch of achievements for one profile.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct AchievementBatch {
    pub profile_owner: Principal,
    pub achievements: Vec<Achievement>,
    #[serde(default)]
    pub total_score: u64,
    /// Percentage, 0-100.
    #[serde(default)]
    pub completion_rate: u32,
}

impl AchievementBatch {
    /// Number of attested entries, suitable for
    /// `PerformanceRecord::achievements_unlocked`.
    pub fn unlocked_count(&self) -> u32 {
        let n = self.achievements.iter().filter(|a| a.verified).count();
        u32::try_from(n).unwrap_or(u32::MAX)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn entry(id: &str, verified: bool) -> Achievement {
        Achievement {
            id: id.to_string(),
            name: format!("achievement {id}"),
            description: String::new(),
            points: 10,
            timestamp: 1_700_000_000,
            verified,
        }
    }

    #[test]
    fn test_unlocked_count_ignores_unverified() {
        let batch = AchievementBatch {
            profile_owner: Principal::new([3; 32]),
            achievements: vec![entry("a", true), entry("b", false), entry("c", true)],
            total_score: 30,
            completion_rate: 60,
        };
        assert_eq!(batch.unlocked_count(), 2);
    }
}
