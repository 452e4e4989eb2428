// File: plantgo-core/src/services/progression_service.rs
//
// Level completion, answer submission and the read views that combine the
// catalog, the progress ledger and the reward account.

use std::sync::Arc;
use std::time::Duration;
use chrono::Utc;
use tracing::{debug, info, warn};
use plantgo_common::models::{
    AnswerOutcome, CompletionReceipt, GameDataView, LevelDetailsView, LevelRef, LevelSnapshot,
    NotifyEvent, ProgressEntry, RewardAccount,
};
use plantgo_common::traits::notifier_traits::Notifier;
use plantgo_common::traits::repository_traits::{LevelRepository, ProgressRepository};
use crate::Error;
use super::catalog_service::validate_level_ref;
use super::{validate_user, with_deadline, DEFAULT_REQUEST_TIMEOUT};

/// Case-insensitive exact match, ignoring surrounding whitespace.
pub fn answers_match(submitted: &str, expected: &str) -> bool {
    submitted.trim().to_lowercase() == expected.trim().to_lowercase()
}

pub struct ProgressionService {
    level_repo: Arc<dyn LevelRepository>,
    progress_repo: Arc<dyn ProgressRepository>,
    notifier: Arc<dyn Notifier>,
    timeout: Duration,
}

impl ProgressionService {
    pub fn new(
        level_repo: Arc<dyn LevelRepository>,
        progress_repo: Arc<dyn ProgressRepository>,
        notifier: Arc<dyn Notifier>,
    ) -> Self {
        Self {
            level_repo,
            progress_repo,
            notifier,
            timeout: DEFAULT_REQUEST_TIMEOUT,
        }
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Marks a level completed for `user_id`, addressed by id or number.
    ///
    /// `Conflict` if the user already completed it. Does not check the unlock
    /// watermark.
    pub async fn complete_level(
        &self,
        user_id: i64,
        level_ref: LevelRef,
    ) -> Result<CompletionReceipt, Error> {
        validate_user(user_id)?;
        validate_level_ref(level_ref)?;

        let receipt = with_deadline(self.timeout, async {
            let level = self
                .level_repo
                .get_level(level_ref)
                .await?
                .ok_or_else(|| Error::NotFound(format!("No level with {}", level_ref)))?;
            self.progress_repo
                .complete_level(user_id, level.level_id, Utc::now())
                .await
        })
        .await?;

        info!(
            "User {} completed level {} (+{} points, total={}, level_reached={})",
            user_id, receipt.level_number, receipt.reward, receipt.total_rewards, receipt.level_reached
        );
        self.dispatch_level_complete(&receipt);
        Ok(receipt)
    }

    /// Riddle-guessing path: completes the level only if the answer matches
    /// and the level is unlocked. A wrong answer changes nothing.
    pub async fn submit_answer(
        &self,
        user_id: i64,
        level_id: i64,
        answer: &str,
    ) -> Result<AnswerOutcome, Error> {
        validate_user(user_id)?;
        validate_level_ref(LevelRef::Id(level_id))?;
        if answer.trim().is_empty() {
            return Err(Error::Validation("Answer cannot be empty".to_string()));
        }

        let snapshot = self.require_level_snapshot(user_id, LevelRef::Id(level_id)).await?;
        if snapshot.is_completed {
            return Err(Error::Validation("Level already completed".to_string()));
        }
        if !snapshot.is_unlocked() {
            return Err(Error::Forbidden(format!(
                "Level {} is not unlocked yet",
                snapshot.level.level_number
            )));
        }

        if !answers_match(answer, &snapshot.level.plant_name) {
            debug!("User {} missed level {}", user_id, snapshot.level.level_number);
            return Ok(AnswerOutcome::incorrect(
                &snapshot.level.plant_name,
                snapshot.account.total_rewards,
            ));
        }

        let receipt = with_deadline(
            self.timeout,
            self.progress_repo.complete_level(user_id, level_id, Utc::now()),
        )
        .await
        .map_err(|e| match e {
            // lost a race with another submission for the same level
            Error::Conflict(_) => Error::Validation("Level already completed".to_string()),
            other => other,
        })?;

        info!(
            "User {} answered level {} correctly (+{} points, total={})",
            user_id, receipt.level_number, receipt.reward, receipt.total_rewards
        );
        self.dispatch_level_complete(&receipt);
        Ok(AnswerOutcome::correct(&receipt))
    }

    /// Every level with this user's completed/unlocked flags and totals.
    pub async fn get_game_data(&self, user_id: i64) -> Result<GameDataView, Error> {
        validate_user(user_id)?;
        let snapshot = with_deadline(
            self.timeout,
            self.progress_repo.game_snapshot(user_id, Utc::now()),
        )
        .await?;
        Ok(snapshot.into_view())
    }

    /// Level content and flags, regardless of unlock state.
    pub async fn get_level_details(
        &self,
        user_id: i64,
        level_ref: LevelRef,
    ) -> Result<LevelDetailsView, Error> {
        validate_user(user_id)?;
        validate_level_ref(level_ref)?;
        Ok(self.require_level_snapshot(user_id, level_ref).await?.into_view())
    }

    /// Level content for play; `Forbidden` until the level is unlocked.
    pub async fn reveal_riddle(
        &self,
        user_id: i64,
        level_ref: LevelRef,
    ) -> Result<LevelDetailsView, Error> {
        validate_user(user_id)?;
        validate_level_ref(level_ref)?;
        let snapshot = self.require_level_snapshot(user_id, level_ref).await?;
        if !snapshot.is_unlocked() {
            return Err(Error::Forbidden(format!(
                "Level {} is not unlocked yet",
                snapshot.level.level_number
            )));
        }
        Ok(snapshot.into_view())
    }

    pub async fn get_user_progress(&self, user_id: i64) -> Result<Vec<ProgressEntry>, Error> {
        validate_user(user_id)?;
        with_deadline(self.timeout, self.progress_repo.list_progress(user_id)).await
    }

    pub async fn get_completed_levels(&self, user_id: i64) -> Result<Vec<ProgressEntry>, Error> {
        validate_user(user_id)?;
        with_deadline(self.timeout, self.progress_repo.list_completed(user_id)).await
    }

    pub async fn get_user_reward(&self, user_id: i64) -> Result<RewardAccount, Error> {
        validate_user(user_id)?;
        with_deadline(
            self.timeout,
            self.progress_repo.get_or_create_account(user_id, Utc::now()),
        )
        .await
    }

    async fn require_level_snapshot(
        &self,
        user_id: i64,
        level_ref: LevelRef,
    ) -> Result<LevelSnapshot, Error> {
        with_deadline(
            self.timeout,
            self.progress_repo.level_snapshot(user_id, level_ref, Utc::now()),
        )
        .await?
        .ok_or_else(|| Error::NotFound(format!("No level with {}", level_ref)))
    }

    /// Detached from the request; failures are only logged.
    fn dispatch_level_complete(&self, receipt: &CompletionReceipt) {
        let notifier = Arc::clone(&self.notifier);
        let user_id = receipt.user_id;
        let event = NotifyEvent::LevelComplete {
            level_number: receipt.level_number,
            reward: receipt.reward,
        };
        tokio::spawn(async move {
            if let Err(e) = notifier.notify(user_id, event).await {
                warn!("Failed to send level completion notification to user {}: {}", user_id, e);
            }
        });
    }
}
