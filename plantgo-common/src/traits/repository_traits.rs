use async_trait::async_trait;
use chrono::{DateTime, Utc};
use crate::error::Error;
use crate::models::{
    CompletionReceipt, FcmToken, GameSnapshot, Level, LevelRef, LevelSnapshot, NewLevel,
    Notification, NotificationFilter, NotificationKind, NotificationPage, NotificationPreferences,
    NotificationStatus, ProgressEntry, RewardAccount,
};

#[async_trait]
pub trait LevelRepository: Send + Sync {
    /// Fails with `Conflict` if the level number is already taken.
    async fn create_level(&self, level: &NewLevel, now: DateTime<Utc>) -> Result<Level, Error>;
    async fn get_level_by_id(&self, level_id: i64) -> Result<Option<Level>, Error>;
    async fn get_level_by_number(&self, level_number: i32) -> Result<Option<Level>, Error>;
    /// Ordered by level number.
    async fn list_levels(&self) -> Result<Vec<Level>, Error>;
    /// Saves every mutable column of `level`; `NotFound` if the row is gone.
    async fn update_level(&self, level: &Level) -> Result<Level, Error>;
    /// Returns false if nothing was deleted.
    async fn delete_level(&self, level_id: i64) -> Result<bool, Error>;
    async fn count_levels(&self) -> Result<i64, Error>;

    async fn get_level(&self, level_ref: LevelRef) -> Result<Option<Level>, Error> {
        match level_ref {
            LevelRef::Id(id) => self.get_level_by_id(id).await,
            LevelRef::Number(n) => self.get_level_by_number(n).await,
        }
    }
}

/// Ledger and reward account. Both are written together, so they share one
/// repository and one transaction boundary.
#[async_trait]
pub trait ProgressRepository: Send + Sync {
    /// Returns the user's account, creating `{0 points, level 1}` on first access.
    async fn get_or_create_account(
        &self,
        user_id: i64,
        now: DateTime<Utc>,
    ) -> Result<RewardAccount, Error>;

    /// Every progress row of the user, ordered by level number.
    async fn list_progress(&self, user_id: i64) -> Result<Vec<ProgressEntry>, Error>;

    /// Completed rows only, ordered by level number.
    async fn list_completed(&self, user_id: i64) -> Result<Vec<ProgressEntry>, Error>;

    /// Marks the level completed, accrues its reward and advances the
    /// watermark as one atomic unit.
    ///
    /// Errors: `NotFound` if the level does not exist, `Conflict` if this user
    /// already completed it. On any error nothing is written.
    async fn complete_level(
        &self,
        user_id: i64,
        level_id: i64,
        now: DateTime<Utc>,
    ) -> Result<CompletionReceipt, Error>;

    /// Account, catalog and completed set read under one snapshot.
    async fn game_snapshot(&self, user_id: i64, now: DateTime<Utc>) -> Result<GameSnapshot, Error>;

    /// One level and the user's standing on it, read under one snapshot.
    /// `None` if the level does not exist.
    async fn level_snapshot(
        &self,
        user_id: i64,
        level_ref: LevelRef,
        now: DateTime<Utc>,
    ) -> Result<Option<LevelSnapshot>, Error>;
}

#[async_trait]
pub trait NotificationRepository: Send + Sync {
    async fn create_notification(
        &self,
        user_id: i64,
        kind: NotificationKind,
        title: &str,
        message: &str,
        data: &serde_json::Value,
        now: DateTime<Utc>,
    ) -> Result<Notification, Error>;
    async fn get_notification(&self, notification_id: i64) -> Result<Option<Notification>, Error>;
    /// Newest first, one page of the rows matching `filter`.
    async fn list_for_user(
        &self,
        user_id: i64,
        filter: &NotificationFilter,
    ) -> Result<NotificationPage, Error>;
    async fn unread_count(&self, user_id: i64) -> Result<i64, Error>;
    async fn update_status(
        &self,
        notification_id: i64,
        status: NotificationStatus,
        now: DateTime<Utc>,
    ) -> Result<(), Error>;
    /// Returns false if the notification does not exist.
    async fn mark_read(&self, notification_id: i64, now: DateTime<Utc>) -> Result<bool, Error>;
    /// Returns the number of rows flipped to read.
    async fn mark_all_read(&self, user_id: i64, now: DateTime<Utc>) -> Result<u64, Error>;
    async fn delete_notification(&self, notification_id: i64) -> Result<bool, Error>;

    async fn get_preferences(&self, user_id: i64) -> Result<NotificationPreferences, Error>;
    async fn save_preferences(
        &self,
        prefs: &NotificationPreferences,
        now: DateTime<Utc>,
    ) -> Result<(), Error>;

    /// Registers `token` as the user's only active token.
    async fn register_fcm_token(
        &self,
        user_id: i64,
        token: &str,
        now: DateTime<Utc>,
    ) -> Result<FcmToken, Error>;
    async fn active_fcm_token(&self, user_id: i64) -> Result<Option<FcmToken>, Error>;
}
