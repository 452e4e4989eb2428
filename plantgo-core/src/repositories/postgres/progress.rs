// File: plantgo-core/src/repositories/postgres/progress.rs
//
// Progress ledger + reward account. Every completion goes through one
// transaction that first locks the user's `user_rewards` row, so completions
// of the same user serialise while different users never contend.

use std::collections::HashSet;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::postgres::PgRow;
use sqlx::{PgConnection, Pool, Postgres, Row};
use tracing::debug;
use plantgo_common::models::{
    CompletionReceipt, GameSnapshot, Level, LevelRef, LevelSnapshot, ProgressEntry,
    ProgressRecord, RewardAccount,
};
use plantgo_common::traits::repository_traits::ProgressRepository;
use crate::Error;
use super::level_from_row;

#[derive(Clone)]
pub struct PostgresProgressRepository {
    pool: Pool<Postgres>,
}

impl PostgresProgressRepository {
    pub fn new(pool: Pool<Postgres>) -> Self {
        Self { pool }
    }
}

/// Inserts the default account if missing. Relies on the primary key so two
/// racing first requests end up with one row.
async fn ensure_account(
    conn: &mut PgConnection,
    user_id: i64,
    now: DateTime<Utc>,
) -> Result<(), Error> {
    sqlx::query(
        r#"
        INSERT INTO user_rewards (user_id, total_rewards, level_reached, created_at, updated_at)
        VALUES ($1, 0, $2, $3, $3)
        ON CONFLICT (user_id) DO NOTHING
        "#,
    )
        .bind(user_id)
        .bind(RewardAccount::FIRST_LEVEL)
        .bind(now)
        .execute(&mut *conn)
        .await?;
    Ok(())
}

async fn fetch_account(conn: &mut PgConnection, user_id: i64) -> Result<RewardAccount, Error> {
    let account = sqlx::query_as::<_, RewardAccount>(
        r#"
        SELECT user_id, total_rewards, level_reached, created_at, updated_at
        FROM user_rewards
        WHERE user_id = $1
        "#,
    )
        .bind(user_id)
        .fetch_one(&mut *conn)
        .await?;
    Ok(account)
}

async fn begin_snapshot(pool: &Pool<Postgres>) -> Result<sqlx::Transaction<'static, Postgres>, Error> {
    let mut tx = pool.begin().await?;
    sqlx::query("SET TRANSACTION ISOLATION LEVEL REPEATABLE READ, READ ONLY")
        .execute(&mut *tx)
        .await?;
    Ok(tx)
}

fn entry_from_row(r: &PgRow) -> Result<ProgressEntry, Error> {
    Ok(ProgressEntry {
        progress: ProgressRecord {
            progress_id: r.try_get("progress_id")?,
            user_id: r.try_get("user_id")?,
            level_id: r.try_get("level_id")?,
            is_completed: r.try_get("is_completed")?,
            completed_at: r.try_get("completed_at")?,
            created_at: r.try_get("created_at")?,
            updated_at: r.try_get("updated_at")?,
        },
        level: Level {
            level_id: r.try_get("level_id")?,
            level_number: r.try_get("level_number")?,
            riddle: r.try_get("riddle")?,
            plant_name: r.try_get("plant_name")?,
            reward: r.try_get("reward")?,
            created_at: r.try_get("level_created_at")?,
            updated_at: r.try_get("level_updated_at")?,
        },
    })
}

impl PostgresProgressRepository {
    async fn list_entries(&self, user_id: i64, completed_only: bool) -> Result<Vec<ProgressEntry>, Error> {
        let rows = sqlx::query(
            r#"
            SELECT p.progress_id,
                   p.user_id,
                   p.level_id,
                   p.is_completed,
                   p.completed_at,
                   p.created_at,
                   p.updated_at,
                   l.level_number,
                   l.riddle,
                   l.plant_name,
                   l.reward,
                   l.created_at AS level_created_at,
                   l.updated_at AS level_updated_at
            FROM user_level_progress p
            JOIN levels l ON l.level_id = p.level_id
            WHERE p.user_id = $1
              AND ($2 = FALSE OR p.is_completed = TRUE)
            ORDER BY l.level_number ASC
            "#,
        )
            .bind(user_id)
            .bind(completed_only)
            .fetch_all(&self.pool)
            .await?;

        rows.iter().map(entry_from_row).collect()
    }
}

#[async_trait]
impl ProgressRepository for PostgresProgressRepository {
    async fn get_or_create_account(
        &self,
        user_id: i64,
        now: DateTime<Utc>,
    ) -> Result<RewardAccount, Error> {
        let mut conn = self.pool.acquire().await?;
        ensure_account(&mut conn, user_id, now).await?;
        fetch_account(&mut conn, user_id).await
    }

    async fn list_progress(&self, user_id: i64) -> Result<Vec<ProgressEntry>, Error> {
        self.list_entries(user_id, false).await
    }

    async fn list_completed(&self, user_id: i64) -> Result<Vec<ProgressEntry>, Error> {
        self.list_entries(user_id, true).await
    }

    async fn complete_level(
        &self,
        user_id: i64,
        level_id: i64,
        now: DateTime<Utc>,
    ) -> Result<CompletionReceipt, Error> {
        let mut tx = self.pool.begin().await?;

        // 1) account row: create if needed, then hold its lock until commit
        ensure_account(&mut tx, user_id, now).await?;
        sqlx::query("SELECT user_id FROM user_rewards WHERE user_id = $1 FOR UPDATE")
            .bind(user_id)
            .execute(&mut *tx)
            .await?;

        // 2) the level must still exist
        let level_row = sqlx::query(
            r#"
            SELECT level_id, level_number, riddle, plant_name, reward, created_at, updated_at
            FROM levels
            WHERE level_id = $1
            FOR SHARE
            "#,
        )
            .bind(level_id)
            .fetch_optional(&mut *tx)
            .await?;
        let level = match level_row {
            Some(r) => level_from_row(&r)?,
            None => return Err(Error::NotFound(format!("Level with ID {} not found", level_id))),
        };

        // 3) replay guard, checked under the account lock
        let existing = sqlx::query(
            r#"
            SELECT is_completed
            FROM user_level_progress
            WHERE user_id = $1 AND level_id = $2
            FOR UPDATE
            "#,
        )
            .bind(user_id)
            .bind(level_id)
            .fetch_optional(&mut *tx)
            .await?;
        if let Some(r) = existing {
            if r.try_get::<bool, _>("is_completed")? {
                return Err(Error::Conflict(format!(
                    "Level {} already completed",
                    level.level_number
                )));
            }
        }

        // 4) ledger row
        sqlx::query(
            r#"
            INSERT INTO user_level_progress (
                user_id, level_id, is_completed, completed_at, created_at, updated_at
            )
            VALUES ($1, $2, TRUE, $3, $3, $3)
            ON CONFLICT (user_id, level_id) DO UPDATE
            SET is_completed = TRUE,
                completed_at = EXCLUDED.completed_at,
                updated_at = EXCLUDED.updated_at
            "#,
        )
            .bind(user_id)
            .bind(level_id)
            .bind(now)
            .execute(&mut *tx)
            .await?;

        // 5) accrue + forward-only watermark
        let totals = sqlx::query(
            r#"
            UPDATE user_rewards
            SET total_rewards = total_rewards + $2,
                level_reached = GREATEST(level_reached, $3),
                updated_at = $4
            WHERE user_id = $1
            RETURNING total_rewards, level_reached
            "#,
        )
            .bind(user_id)
            .bind(i64::from(level.reward))
            .bind(level.level_number)
            .bind(now)
            .fetch_one(&mut *tx)
            .await?;

        let receipt = CompletionReceipt {
            user_id,
            level_id: level.level_id,
            level_number: level.level_number,
            reward: level.reward,
            completed_at: now,
            total_rewards: totals.try_get("total_rewards")?,
            level_reached: totals.try_get("level_reached")?,
        };

        tx.commit().await?;
        debug!(
            "user {} completed level {} (total_rewards={}, level_reached={})",
            user_id, receipt.level_number, receipt.total_rewards, receipt.level_reached
        );
        Ok(receipt)
    }

    async fn game_snapshot(&self, user_id: i64, now: DateTime<Utc>) -> Result<GameSnapshot, Error> {
        self.get_or_create_account(user_id, now).await?;

        let mut tx = begin_snapshot(&self.pool).await?;
        let account = fetch_account(&mut tx, user_id).await?;

        let levels = sqlx::query_as::<_, Level>(
            r#"
            SELECT level_id, level_number, riddle, plant_name, reward, created_at, updated_at
            FROM levels
            ORDER BY level_number ASC
            "#,
        )
            .fetch_all(&mut *tx)
            .await?;

        let completed_rows = sqlx::query(
            r#"
            SELECT level_id
            FROM user_level_progress
            WHERE user_id = $1 AND is_completed = TRUE
            "#,
        )
            .bind(user_id)
            .fetch_all(&mut *tx)
            .await?;
        tx.commit().await?;

        let mut completed_level_ids = HashSet::with_capacity(completed_rows.len());
        for r in completed_rows {
            completed_level_ids.insert(r.try_get::<i64, _>("level_id")?);
        }

        Ok(GameSnapshot {
            account,
            levels,
            completed_level_ids,
        })
    }

    async fn level_snapshot(
        &self,
        user_id: i64,
        level_ref: LevelRef,
        now: DateTime<Utc>,
    ) -> Result<Option<LevelSnapshot>, Error> {
        self.get_or_create_account(user_id, now).await?;

        let mut tx = begin_snapshot(&self.pool).await?;
        let level_row = match level_ref {
            LevelRef::Id(id) => {
                sqlx::query(
                    r#"
                    SELECT level_id, level_number, riddle, plant_name, reward, created_at, updated_at
                    FROM levels
                    WHERE level_id = $1
                    "#,
                )
                    .bind(id)
                    .fetch_optional(&mut *tx)
                    .await?
            }
            LevelRef::Number(n) => {
                sqlx::query(
                    r#"
                    SELECT level_id, level_number, riddle, plant_name, reward, created_at, updated_at
                    FROM levels
                    WHERE level_number = $1
                    "#,
                )
                    .bind(n)
                    .fetch_optional(&mut *tx)
                    .await?
            }
        };
        let level = match level_row {
            Some(r) => level_from_row(&r)?,
            None => {
                tx.commit().await?;
                return Ok(None);
            }
        };

        let account = fetch_account(&mut tx, user_id).await?;
        let completed_row = sqlx::query(
            r#"
            SELECT EXISTS (
                SELECT 1 FROM user_level_progress
                WHERE user_id = $1 AND level_id = $2 AND is_completed = TRUE
            ) AS completed
            "#,
        )
            .bind(user_id)
            .bind(level.level_id)
            .fetch_one(&mut *tx)
            .await?;
        tx.commit().await?;

        Ok(Some(LevelSnapshot {
            level,
            account,
            is_completed: completed_row.try_get("completed")?,
        }))
    }
}
