// src/repositories/mod.rs

pub mod postgres;

pub use plantgo_common::traits::repository_traits::{
    LevelRepository, NotificationRepository, ProgressRepository,
};
pub use postgres::{
    PostgresLevelRepository, PostgresNotificationRepository, PostgresProgressRepository,
};
