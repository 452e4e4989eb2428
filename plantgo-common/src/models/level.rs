// File: plantgo-common/src/models/level.rs

use std::fmt;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// One riddle in the catalog. `level_number` is the ordering key the game
/// logic speaks in; `level_id` is the storage identity.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, sqlx::FromRow)]
pub struct Level {
    pub level_id: i64,
    pub level_number: i32,
    pub riddle: String,
    pub plant_name: String,
    pub reward: i32,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Fields an admin supplies when creating a level.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewLevel {
    pub level_number: i32,
    pub riddle: String,
    pub plant_name: String,
    #[serde(default)]
    pub reward: i32,
}

/// Partial update; `None` leaves the stored value untouched.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct LevelUpdate {
    pub level_number: Option<i32>,
    pub riddle: Option<String>,
    pub plant_name: Option<String>,
    pub reward: Option<i32>,
}

impl LevelUpdate {
    pub fn is_empty(&self) -> bool {
        self.level_number.is_none()
            && self.riddle.is_none()
            && self.plant_name.is_none()
            && self.reward.is_none()
    }
}

/// Callers may address a level either way; both resolve to the same row.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum LevelRef {
    Id(i64),
    Number(i32),
}

impl fmt::Display for LevelRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LevelRef::Id(id) => write!(f, "level id {}", id),
            LevelRef::Number(n) => write!(f, "level number {}", n),
        }
    }
}
