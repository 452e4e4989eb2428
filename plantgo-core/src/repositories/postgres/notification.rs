// File: plantgo-core/src/repositories/postgres/notification.rs

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::postgres::PgRow;
use sqlx::{Pool, Postgres, Row};
use plantgo_common::models::{
    FcmToken, Notification, NotificationFilter, NotificationKind, NotificationPage,
    NotificationPreferences, NotificationStatus,
};
use plantgo_common::traits::repository_traits::NotificationRepository;
use crate::Error;

#[derive(Clone)]
pub struct PostgresNotificationRepository {
    pool: Pool<Postgres>,
}

impl PostgresNotificationRepository {
    pub fn new(pool: Pool<Postgres>) -> Self {
        Self { pool }
    }
}

fn notification_from_row(r: &PgRow) -> Result<Notification, Error> {
    let kind: String = r.try_get("kind")?;
    let status: String = r.try_get("status")?;
    Ok(Notification {
        notification_id: r.try_get("notification_id")?,
        user_id: r.try_get("user_id")?,
        kind: kind.parse::<NotificationKind>().map_err(|e| Error::Database(sqlx::Error::Decode(e.into())))?,
        title: r.try_get("title")?,
        message: r.try_get("message")?,
        data: r.try_get("data")?,
        status: status.parse::<NotificationStatus>().map_err(|e| Error::Database(sqlx::Error::Decode(e.into())))?,
        is_read: r.try_get("is_read")?,
        created_at: r.try_get("created_at")?,
        updated_at: r.try_get("updated_at")?,
        read_at: r.try_get("read_at")?,
    })
}

#[async_trait]
impl NotificationRepository for PostgresNotificationRepository {
    async fn create_notification(
        &self,
        user_id: i64,
        kind: NotificationKind,
        title: &str,
        message: &str,
        data: &serde_json::Value,
        now: DateTime<Utc>,
    ) -> Result<Notification, Error> {
        let row = sqlx::query(
            r#"
            INSERT INTO notifications (
                user_id, kind, title, message, data, status, is_read, created_at, updated_at
            )
            VALUES ($1, $2, $3, $4, $5, $6, FALSE, $7, $7)
            RETURNING notification_id, user_id, kind, title, message, data, status,
                      is_read, created_at, updated_at, read_at
            "#,
        )
            .bind(user_id)
            .bind(kind.to_string())
            .bind(title)
            .bind(message)
            .bind(data)
            .bind(NotificationStatus::Pending.to_string())
            .bind(now)
            .fetch_one(&self.pool)
            .await?;

        notification_from_row(&row)
    }

    async fn get_notification(&self, notification_id: i64) -> Result<Option<Notification>, Error> {
        let row_opt = sqlx::query(
            r#"
            SELECT notification_id, user_id, kind, title, message, data, status,
                   is_read, created_at, updated_at, read_at
            FROM notifications
            WHERE notification_id = $1
            "#,
        )
            .bind(notification_id)
            .fetch_optional(&self.pool)
            .await?;

        row_opt.as_ref().map(notification_from_row).transpose()
    }

    async fn list_for_user(
        &self,
        user_id: i64,
        filter: &NotificationFilter,
    ) -> Result<NotificationPage, Error> {
        let kind = filter.kind.map(|k| k.to_string());

        let rows = sqlx::query(
            r#"
            SELECT notification_id, user_id, kind, title, message, data, status,
                   is_read, created_at, updated_at, read_at
            FROM notifications
            WHERE user_id = $1
              AND ($2 = FALSE OR is_read = FALSE)
              AND ($3::TEXT IS NULL OR kind = $3)
            ORDER BY created_at DESC, notification_id DESC
            LIMIT $4 OFFSET $5
            "#,
        )
            .bind(user_id)
            .bind(filter.unread_only)
            .bind(kind.as_deref())
            .bind(filter.limit)
            .bind(filter.offset)
            .fetch_all(&self.pool)
            .await?;

        let total_row = sqlx::query(
            r#"
            SELECT COUNT(*) AS total
            FROM notifications
            WHERE user_id = $1
              AND ($2 = FALSE OR is_read = FALSE)
              AND ($3::TEXT IS NULL OR kind = $3)
            "#,
        )
            .bind(user_id)
            .bind(filter.unread_only)
            .bind(kind.as_deref())
            .fetch_one(&self.pool)
            .await?;

        let notifications = rows
            .iter()
            .map(notification_from_row)
            .collect::<Result<Vec<_>, Error>>()?;
        Ok(NotificationPage::new(notifications, total_row.try_get("total")?, filter))
    }

    async fn unread_count(&self, user_id: i64) -> Result<i64, Error> {
        let row = sqlx::query(
            "SELECT COUNT(*) AS count FROM notifications WHERE user_id = $1 AND is_read = FALSE",
        )
            .bind(user_id)
            .fetch_one(&self.pool)
            .await?;
        Ok(row.try_get("count")?)
    }

    async fn update_status(
        &self,
        notification_id: i64,
        status: NotificationStatus,
        now: DateTime<Utc>,
    ) -> Result<(), Error> {
        sqlx::query(
            r#"
            UPDATE notifications
            SET status = $1,
                updated_at = $2
            WHERE notification_id = $3
            "#,
        )
            .bind(status.to_string())
            .bind(now)
            .bind(notification_id)
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    async fn mark_read(&self, notification_id: i64, now: DateTime<Utc>) -> Result<bool, Error> {
        let result = sqlx::query(
            r#"
            UPDATE notifications
            SET is_read = TRUE,
                read_at = COALESCE(read_at, $1),
                updated_at = $1
            WHERE notification_id = $2
            "#,
        )
            .bind(now)
            .bind(notification_id)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }

    async fn mark_all_read(&self, user_id: i64, now: DateTime<Utc>) -> Result<u64, Error> {
        let result = sqlx::query(
            r#"
            UPDATE notifications
            SET is_read = TRUE,
                read_at = $1,
                updated_at = $1
            WHERE user_id = $2 AND is_read = FALSE
            "#,
        )
            .bind(now)
            .bind(user_id)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected())
    }

    async fn delete_notification(&self, notification_id: i64) -> Result<bool, Error> {
        let result = sqlx::query("DELETE FROM notifications WHERE notification_id = $1")
            .bind(notification_id)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }

    async fn get_preferences(&self, user_id: i64) -> Result<NotificationPreferences, Error> {
        let prefs = sqlx::query_as::<_, NotificationPreferences>(
            r#"
            SELECT user_id, level_completes, plant_identified
            FROM user_notification_preferences
            WHERE user_id = $1
            "#,
        )
            .bind(user_id)
            .fetch_optional(&self.pool)
            .await?;

        Ok(prefs.unwrap_or_else(|| NotificationPreferences::all_enabled(user_id)))
    }

    async fn save_preferences(
        &self,
        prefs: &NotificationPreferences,
        now: DateTime<Utc>,
    ) -> Result<(), Error> {
        sqlx::query(
            r#"
            INSERT INTO user_notification_preferences (
                user_id, level_completes, plant_identified, created_at, updated_at
            )
            VALUES ($1, $2, $3, $4, $4)
            ON CONFLICT (user_id) DO UPDATE
            SET level_completes = EXCLUDED.level_completes,
                plant_identified = EXCLUDED.plant_identified,
                updated_at = EXCLUDED.updated_at
            "#,
        )
            .bind(prefs.user_id)
            .bind(prefs.level_completes)
            .bind(prefs.plant_identified)
            .bind(now)
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    async fn register_fcm_token(
        &self,
        user_id: i64,
        token: &str,
        now: DateTime<Utc>,
    ) -> Result<FcmToken, Error> {
        let mut tx = self.pool.begin().await?;

        // registrations of one user queue here until this tx ends
        sqlx::query("SELECT pg_advisory_xact_lock($1)")
            .bind(user_id)
            .execute(&mut *tx)
            .await?;

        sqlx::query(
            r#"
            UPDATE user_fcm_tokens
            SET is_active = FALSE,
                updated_at = $2
            WHERE user_id = $1 AND token <> $3 AND is_active = TRUE
            "#,
        )
            .bind(user_id)
            .bind(now)
            .bind(token)
            .execute(&mut *tx)
            .await?;

        let stored = sqlx::query_as::<_, FcmToken>(
            r#"
            INSERT INTO user_fcm_tokens (user_id, token, is_active, created_at, updated_at)
            VALUES ($1, $2, TRUE, $3, $3)
            ON CONFLICT (user_id, token) DO UPDATE
            SET is_active = TRUE,
                updated_at = EXCLUDED.updated_at
            RETURNING user_id, token, is_active, created_at, updated_at
            "#,
        )
            .bind(user_id)
            .bind(token)
            .bind(now)
            .fetch_one(&mut *tx)
            .await?;

        tx.commit().await?;
        Ok(stored)
    }

    async fn active_fcm_token(&self, user_id: i64) -> Result<Option<FcmToken>, Error> {
        let token = sqlx::query_as::<_, FcmToken>(
            r#"
            SELECT user_id, token, is_active, created_at, updated_at
            FROM user_fcm_tokens
            WHERE user_id = $1 AND is_active = TRUE
            ORDER BY updated_at DESC
            LIMIT 1
            "#,
        )
            .bind(user_id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(token)
    }
}
