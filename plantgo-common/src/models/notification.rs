// File: plantgo-common/src/models/notification.rs

use std::fmt;
use std::str::FromStr;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Stored as TEXT.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NotificationKind {
    LevelComplete,
    PlantIdentified,
}

impl fmt::Display for NotificationKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            NotificationKind::LevelComplete => write!(f, "level_complete"),
            NotificationKind::PlantIdentified => write!(f, "plant_identified"),
        }
    }
}

impl FromStr for NotificationKind {
    type Err = String;
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "level_complete" => Ok(NotificationKind::LevelComplete),
            "plant_identified" => Ok(NotificationKind::PlantIdentified),
            _ => Err(format!("Unknown notification kind: {}", s)),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum NotificationStatus {
    Pending,
    Sent,
    Failed,
}

impl fmt::Display for NotificationStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            NotificationStatus::Pending => write!(f, "pending"),
            NotificationStatus::Sent => write!(f, "sent"),
            NotificationStatus::Failed => write!(f, "failed"),
        }
    }
}

impl FromStr for NotificationStatus {
    type Err = String;
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "pending" => Ok(NotificationStatus::Pending),
            "sent" => Ok(NotificationStatus::Sent),
            "failed" => Ok(NotificationStatus::Failed),
            _ => Err(format!("Unknown notification status: {}", s)),
        }
    }
}

/// An event the game asks the notifier to relay to a user.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum NotifyEvent {
    LevelComplete { level_number: i32, reward: i32 },
    PlantIdentified { plant_name: String, confidence: f64 },
}

impl NotifyEvent {
    pub fn kind(&self) -> NotificationKind {
        match self {
            NotifyEvent::LevelComplete { .. } => NotificationKind::LevelComplete,
            NotifyEvent::PlantIdentified { .. } => NotificationKind::PlantIdentified,
        }
    }

    pub fn title(&self) -> String {
        match self {
            NotifyEvent::LevelComplete { .. } => "Level Complete! 🎉".to_string(),
            NotifyEvent::PlantIdentified { .. } => "Plant Identified! 🌿".to_string(),
        }
    }

    pub fn message(&self) -> String {
        match self {
            NotifyEvent::LevelComplete { level_number, reward } => format!(
                "Congratulations! You completed level {} and earned {} coins!",
                level_number, reward
            ),
            NotifyEvent::PlantIdentified { plant_name, confidence } => format!(
                "We identified your plant as {} ({:.0}% confidence).",
                plant_name,
                confidence * 100.0
            ),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Notification {
    pub notification_id: i64,
    pub user_id: i64,
    pub kind: NotificationKind,
    pub title: String,
    pub message: String,
    pub data: serde_json::Value,
    pub status: NotificationStatus,
    pub is_read: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub read_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::FromRow)]
pub struct NotificationPreferences {
    pub user_id: i64,
    pub level_completes: bool,
    pub plant_identified: bool,
}

impl NotificationPreferences {
    pub fn all_enabled(user_id: i64) -> Self {
        Self {
            user_id,
            level_completes: true,
            plant_identified: true,
        }
    }

    pub fn allows(&self, kind: NotificationKind) -> bool {
        match kind {
            NotificationKind::LevelComplete => self.level_completes,
            NotificationKind::PlantIdentified => self.plant_identified,
        }
    }

    pub fn apply(&mut self, update: &PreferencesUpdate) {
        if let Some(v) = update.level_completes {
            self.level_completes = v;
        }
        if let Some(v) = update.plant_identified {
            self.plant_identified = v;
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PreferencesUpdate {
    pub level_completes: Option<bool>,
    pub plant_identified: Option<bool>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, sqlx::FromRow)]
pub struct FcmToken {
    pub user_id: i64,
    pub token: String,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Listing parameters as a caller supplies them; unset fields take defaults.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct NotificationQuery {
    pub kind: Option<NotificationKind>,
    #[serde(default)]
    pub unread_only: bool,
    pub limit: Option<i64>,
    pub offset: Option<i64>,
}

/// A resolved, bounded listing request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct NotificationFilter {
    pub kind: Option<NotificationKind>,
    pub unread_only: bool,
    pub limit: i64,
    pub offset: i64,
}

impl NotificationFilter {
    pub const DEFAULT_LIMIT: i64 = 20;
    pub const MAX_LIMIT: i64 = 100;
}

impl Default for NotificationFilter {
    fn default() -> Self {
        Self {
            kind: None,
            unread_only: false,
            limit: Self::DEFAULT_LIMIT,
            offset: 0,
        }
    }
}

/// One page of a user's notifications, newest first. `total` counts every
/// row matching the filter, not just this page.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NotificationPage {
    pub notifications: Vec<Notification>,
    pub total: i64,
    pub limit: i64,
    pub offset: i64,
    pub has_more: bool,
}

impl NotificationPage {
    pub fn new(notifications: Vec<Notification>, total: i64, filter: &NotificationFilter) -> Self {
        Self {
            has_more: filter.offset + (notifications.len() as i64) < total,
            notifications,
            total,
            limit: filter.limit,
            offset: filter.offset,
        }
    }
}
