// File: plantgo-common/src/models/game.rs
//
// Typed results for the progression and query operations.

use std::collections::HashSet;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::level::Level;
use super::progress::RewardAccount;

/// Returned by a successful completion, with the post-commit totals.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CompletionReceipt {
    pub user_id: i64,
    pub level_id: i64,
    pub level_number: i32,
    pub reward: i32,
    pub completed_at: DateTime<Utc>,
    pub total_rewards: i64,
    pub level_reached: i32,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AnswerOutcome {
    pub is_correct: bool,
    pub message: String,
    pub reward_gained: i32,
    pub level_completed: bool,
    pub total_rewards: i64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub correct_answer: Option<String>,
}

impl AnswerOutcome {
    pub fn correct(receipt: &CompletionReceipt) -> Self {
        Self {
            is_correct: true,
            message: format!(
                "Correct! Level {} completed, +{} points",
                receipt.level_number, receipt.reward
            ),
            reward_gained: receipt.reward,
            level_completed: true,
            total_rewards: receipt.total_rewards,
            correct_answer: None,
        }
    }

    /// The correct answer is revealed on a miss.
    pub fn incorrect(correct_answer: &str, total_rewards: i64) -> Self {
        Self {
            is_correct: false,
            message: "Incorrect answer, try again".to_string(),
            reward_gained: 0,
            level_completed: false,
            total_rewards,
            correct_answer: Some(correct_answer.to_string()),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct RewardSummary {
    pub total_rewards: i64,
    pub level_reached: i32,
}

impl From<&RewardAccount> for RewardSummary {
    fn from(account: &RewardAccount) -> Self {
        Self {
            total_rewards: account.total_rewards,
            level_reached: account.level_reached,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GameLevelView {
    pub level_id: i64,
    pub level_number: i32,
    pub reward: i32,
    pub is_completed: bool,
    pub is_unlocked: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GameDataView {
    pub user_reward: RewardSummary,
    pub levels: Vec<GameLevelView>,
    pub completed_levels: usize,
    pub total_levels: usize,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LevelDetailsView {
    pub level_id: i64,
    pub level_number: i32,
    pub riddle: String,
    pub plant_name: String,
    pub reward: i32,
    pub is_completed: bool,
    pub is_unlocked: bool,
    pub user_reward: RewardSummary,
}

/// Catalog, ledger and account as read in one consistent snapshot.
#[derive(Debug, Clone)]
pub struct GameSnapshot {
    pub account: RewardAccount,
    /// Ordered by level number.
    pub levels: Vec<Level>,
    pub completed_level_ids: HashSet<i64>,
}

impl GameSnapshot {
    pub fn into_view(self) -> GameDataView {
        let levels: Vec<GameLevelView> = self
            .levels
            .iter()
            .map(|level| GameLevelView {
                level_id: level.level_id,
                level_number: level.level_number,
                reward: level.reward,
                is_completed: self.completed_level_ids.contains(&level.level_id),
                is_unlocked: self.account.is_unlocked(level.level_number),
            })
            .collect();

        let completed_levels = levels.iter().filter(|l| l.is_completed).count();
        let total_levels = levels.len();

        GameDataView {
            user_reward: RewardSummary::from(&self.account),
            levels,
            completed_levels,
            total_levels,
        }
    }
}

/// One level plus this user's standing on it, read together.
#[derive(Debug, Clone)]
pub struct LevelSnapshot {
    pub level: Level,
    pub account: RewardAccount,
    pub is_completed: bool,
}

impl LevelSnapshot {
    pub fn is_unlocked(&self) -> bool {
        self.account.is_unlocked(self.level.level_number)
    }

    pub fn into_view(self) -> LevelDetailsView {
        let is_unlocked = self.is_unlocked();
        LevelDetailsView {
            level_id: self.level.level_id,
            level_number: self.level.level_number,
            riddle: self.level.riddle,
            plant_name: self.level.plant_name,
            reward: self.level.reward,
            is_completed: self.is_completed,
            is_unlocked,
            user_reward: RewardSummary::from(&self.account),
        }
    }
}
