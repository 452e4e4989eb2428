// File: plantgo-core/src/services/catalog_service.rs
//
// Admin-facing level catalog. Input validation for levels lives here, at the
// boundary, rather than inside the progression transaction.

use std::sync::Arc;
use std::time::Duration;
use chrono::Utc;
use tracing::info;
use plantgo_common::models::{Level, LevelRef, LevelUpdate, NewLevel};
use plantgo_common::traits::repository_traits::LevelRepository;
use crate::Error;
use super::{with_deadline, DEFAULT_REQUEST_TIMEOUT};

pub struct CatalogService {
    level_repo: Arc<dyn LevelRepository>,
    timeout: Duration,
}

fn validate_level_number(level_number: i32) -> Result<(), Error> {
    if level_number <= 0 {
        return Err(Error::Validation("Level number must be greater than 0".to_string()));
    }
    Ok(())
}

fn validate_reward(reward: i32) -> Result<(), Error> {
    if reward < 0 {
        return Err(Error::Validation("Reward cannot be negative".to_string()));
    }
    Ok(())
}

fn required_text(field: &str, value: &str) -> Result<String, Error> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return Err(Error::Validation(format!("{} cannot be empty", field)));
    }
    Ok(trimmed.to_string())
}

pub(crate) fn validate_level_ref(level_ref: LevelRef) -> Result<(), Error> {
    match level_ref {
        LevelRef::Id(id) if id <= 0 => Err(Error::Validation("Invalid level ID".to_string())),
        LevelRef::Number(n) => validate_level_number(n),
        LevelRef::Id(_) => Ok(()),
    }
}

impl CatalogService {
    pub fn new(level_repo: Arc<dyn LevelRepository>) -> Self {
        Self {
            level_repo,
            timeout: DEFAULT_REQUEST_TIMEOUT,
        }
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub async fn create_level(&self, req: NewLevel) -> Result<Level, Error> {
        validate_level_number(req.level_number)?;
        validate_reward(req.reward)?;
        let clean = NewLevel {
            level_number: req.level_number,
            riddle: required_text("Riddle", &req.riddle)?,
            plant_name: required_text("Plant name", &req.plant_name)?,
            reward: req.reward,
        };

        let level = with_deadline(self.timeout, self.level_repo.create_level(&clean, Utc::now())).await?;
        info!("Created level {} (id={}, reward={})", level.level_number, level.level_id, level.reward);
        Ok(level)
    }

    pub async fn get_level(&self, level_ref: LevelRef) -> Result<Level, Error> {
        validate_level_ref(level_ref)?;
        with_deadline(self.timeout, self.level_repo.get_level(level_ref))
            .await?
            .ok_or_else(|| Error::NotFound(format!("No level with {}", level_ref)))
    }

    pub async fn list_levels(&self) -> Result<Vec<Level>, Error> {
        with_deadline(self.timeout, self.level_repo.list_levels()).await
    }

    pub async fn count_levels(&self) -> Result<i64, Error> {
        with_deadline(self.timeout, self.level_repo.count_levels()).await
    }

    /// Applies only the supplied fields.
    pub async fn update_level(&self, level_id: i64, update: LevelUpdate) -> Result<Level, Error> {
        let mut level = self.get_level(LevelRef::Id(level_id)).await?;
        if update.is_empty() {
            return Ok(level);
        }

        if let Some(n) = update.level_number {
            validate_level_number(n)?;
            level.level_number = n;
        }
        if let Some(riddle) = update.riddle.as_deref() {
            level.riddle = required_text("Riddle", riddle)?;
        }
        if let Some(name) = update.plant_name.as_deref() {
            level.plant_name = required_text("Plant name", name)?;
        }
        if let Some(reward) = update.reward {
            validate_reward(reward)?;
            level.reward = reward;
        }
        level.updated_at = Utc::now();

        let saved = with_deadline(self.timeout, self.level_repo.update_level(&level)).await?;
        info!("Updated level id={} (number={})", saved.level_id, saved.level_number);
        Ok(saved)
    }

    pub async fn delete_level(&self, level_id: i64) -> Result<(), Error> {
        validate_level_ref(LevelRef::Id(level_id))?;
        let deleted = with_deadline(self.timeout, self.level_repo.delete_level(level_id)).await?;
        if !deleted {
            return Err(Error::NotFound(format!("Level with ID {} not found", level_id)));
        }
        info!("Deleted level id={}", level_id);
        Ok(())
    }
}
