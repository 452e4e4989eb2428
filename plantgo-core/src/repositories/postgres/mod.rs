// src/repositories/postgres/mod.rs

use sqlx::postgres::PgRow;
use sqlx::Row;
use plantgo_common::models::Level;
use crate::Error;

pub mod level;
pub mod progress;
pub mod notification;

pub use level::PostgresLevelRepository;
pub use progress::PostgresProgressRepository;
pub use notification::PostgresNotificationRepository;

/// 23505 unique_violation
pub(crate) fn is_unique_violation(err: &sqlx::Error) -> bool {
    err.as_database_error()
        .and_then(|db_err| db_err.code())
        .map(|code| code == "23505")
        .unwrap_or(false)
}

/// Reads the `levels` columns out of a row that selected them (possibly joined).
pub(crate) fn level_from_row(r: &PgRow) -> Result<Level, Error> {
    Ok(Level {
        level_id: r.try_get("level_id")?,
        level_number: r.try_get("level_number")?,
        riddle: r.try_get("riddle")?,
        plant_name: r.try_get("plant_name")?,
        reward: r.try_get("reward")?,
        created_at: r.try_get("created_at")?,
        updated_at: r.try_get("updated_at")?,
    })
}
