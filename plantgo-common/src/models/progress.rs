// File: plantgo-common/src/models/progress.rs

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::level::Level;

/// Per (user, level) completion row. Never reverts once `is_completed` is set.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, sqlx::FromRow)]
pub struct ProgressRecord {
    pub progress_id: i64,
    pub user_id: i64,
    pub level_id: i64,
    pub is_completed: bool,
    pub completed_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// A progress row together with the level it refers to.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProgressEntry {
    #[serde(flatten)]
    pub progress: ProgressRecord,
    pub level: Level,
}

/// Per-user aggregate: accrued points and the unlock watermark.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, sqlx::FromRow)]
pub struct RewardAccount {
    pub user_id: i64,
    pub total_rewards: i64,
    pub level_reached: i32,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl RewardAccount {
    pub const FIRST_LEVEL: i32 = 1;

    pub fn fresh(user_id: i64, now: DateTime<Utc>) -> Self {
        Self {
            user_id,
            total_rewards: 0,
            level_reached: Self::FIRST_LEVEL,
            created_at: now,
            updated_at: now,
        }
    }

    pub fn is_unlocked(&self, level_number: i32) -> bool {
        level_number <= self.level_reached
    }

    /// Adds a level's reward and moves the watermark forward, never back.
    pub fn accrue(&mut self, reward: i32, level_number: i32, now: DateTime<Utc>) {
        self.total_rewards += i64::from(reward);
        self.level_reached = self.level_reached.max(level_number);
        self.updated_at = now;
    }
}
