// File: plantgo-core/src/repositories/postgres/level.rs

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::{Pool, Postgres, Row};
use plantgo_common::models::{Level, NewLevel};
use plantgo_common::traits::repository_traits::LevelRepository;
use crate::Error;
use super::{is_unique_violation, level_from_row};

#[derive(Clone)]
pub struct PostgresLevelRepository {
    pool: Pool<Postgres>,
}

impl PostgresLevelRepository {
    pub fn new(pool: Pool<Postgres>) -> Self {
        Self { pool }
    }
}

fn map_level_number_conflict(err: sqlx::Error, level_number: i32) -> Error {
    if is_unique_violation(&err) {
        Error::Conflict(format!("Level number {} already exists", level_number))
    } else {
        Error::Database(err)
    }
}

#[async_trait]
impl LevelRepository for PostgresLevelRepository {
    async fn create_level(&self, level: &NewLevel, now: DateTime<Utc>) -> Result<Level, Error> {
        let row = sqlx::query(
            r#"
            INSERT INTO levels (
                level_number,
                riddle,
                plant_name,
                reward,
                created_at,
                updated_at
            )
            VALUES ($1, $2, $3, $4, $5, $5)
            RETURNING level_id, level_number, riddle, plant_name, reward, created_at, updated_at
            "#,
        )
            .bind(level.level_number)
            .bind(&level.riddle)
            .bind(&level.plant_name)
            .bind(level.reward)
            .bind(now)
            .fetch_one(&self.pool)
            .await
            .map_err(|e| map_level_number_conflict(e, level.level_number))?;

        level_from_row(&row)
    }

    async fn get_level_by_id(&self, level_id: i64) -> Result<Option<Level>, Error> {
        let row_opt = sqlx::query(
            r#"
            SELECT level_id, level_number, riddle, plant_name, reward, created_at, updated_at
            FROM levels
            WHERE level_id = $1
            "#,
        )
            .bind(level_id)
            .fetch_optional(&self.pool)
            .await?;

        row_opt.as_ref().map(level_from_row).transpose()
    }

    async fn get_level_by_number(&self, level_number: i32) -> Result<Option<Level>, Error> {
        let row_opt = sqlx::query(
            r#"
            SELECT level_id, level_number, riddle, plant_name, reward, created_at, updated_at
            FROM levels
            WHERE level_number = $1
            "#,
        )
            .bind(level_number)
            .fetch_optional(&self.pool)
            .await?;

        row_opt.as_ref().map(level_from_row).transpose()
    }

    async fn list_levels(&self) -> Result<Vec<Level>, Error> {
        let rows = sqlx::query_as::<_, Level>(
            r#"
            SELECT level_id, level_number, riddle, plant_name, reward, created_at, updated_at
            FROM levels
            ORDER BY level_number ASC
            "#,
        )
            .fetch_all(&self.pool)
            .await?;

        Ok(rows)
    }

    async fn update_level(&self, level: &Level) -> Result<Level, Error> {
        let row_opt = sqlx::query(
            r#"
            UPDATE levels
            SET level_number = $1,
                riddle = $2,
                plant_name = $3,
                reward = $4,
                updated_at = $5
            WHERE level_id = $6
            RETURNING level_id, level_number, riddle, plant_name, reward, created_at, updated_at
            "#,
        )
            .bind(level.level_number)
            .bind(&level.riddle)
            .bind(&level.plant_name)
            .bind(level.reward)
            .bind(level.updated_at)
            .bind(level.level_id)
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| map_level_number_conflict(e, level.level_number))?;

        match row_opt {
            Some(row) => level_from_row(&row),
            None => Err(Error::NotFound(format!("Level with ID {} not found", level.level_id))),
        }
    }

    async fn delete_level(&self, level_id: i64) -> Result<bool, Error> {
        let result = sqlx::query("DELETE FROM levels WHERE level_id = $1")
            .bind(level_id)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }

    async fn count_levels(&self) -> Result<i64, Error> {
        let row = sqlx::query("SELECT COUNT(*) AS count FROM levels")
            .fetch_one(&self.pool)
            .await?;
        Ok(row.try_get("count")?)
    }
}
