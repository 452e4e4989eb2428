// File: plantgo-core/src/test_utils/memory.rs
//
// In-memory implementation of every repository trait. Each call takes one
// lock over the whole state, so a completion is as atomic here as it is in
// the Postgres transaction.

use std::collections::{HashMap, HashSet};
use std::sync::{Mutex, MutexGuard};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use plantgo_common::models::{
    CompletionReceipt, FcmToken, GameSnapshot, Level, LevelRef, LevelSnapshot, NewLevel,
    Notification, NotificationFilter, NotificationKind, NotificationPage, NotificationPreferences,
    NotificationStatus, ProgressEntry, ProgressRecord, RewardAccount,
};
use plantgo_common::traits::repository_traits::{
    LevelRepository, NotificationRepository, ProgressRepository,
};
use crate::Error;

#[derive(Default)]
struct MemoryState {
    next_level_id: i64,
    next_progress_id: i64,
    next_notification_id: i64,
    levels: HashMap<i64, Level>,
    progress: HashMap<(i64, i64), ProgressRecord>,
    accounts: HashMap<i64, RewardAccount>,
    notifications: HashMap<i64, Notification>,
    preferences: HashMap<i64, NotificationPreferences>,
    tokens: Vec<FcmToken>,
}

impl MemoryState {
    fn level_by_ref(&self, level_ref: LevelRef) -> Option<&Level> {
        match level_ref {
            LevelRef::Id(id) => self.levels.get(&id),
            LevelRef::Number(n) => self.levels.values().find(|l| l.level_number == n),
        }
    }

    fn account_mut(&mut self, user_id: i64, now: DateTime<Utc>) -> &mut RewardAccount {
        self.accounts
            .entry(user_id)
            .or_insert_with(|| RewardAccount::fresh(user_id, now))
    }

    fn is_completed(&self, user_id: i64, level_id: i64) -> bool {
        self.progress
            .get(&(user_id, level_id))
            .map(|p| p.is_completed)
            .unwrap_or(false)
    }

    fn sorted_levels(&self) -> Vec<Level> {
        let mut levels: Vec<Level> = self.levels.values().cloned().collect();
        levels.sort_by_key(|l| l.level_number);
        levels
    }

    fn entries(&self, user_id: i64, completed_only: bool) -> Vec<ProgressEntry> {
        let mut out: Vec<ProgressEntry> = self
            .progress
            .values()
            .filter(|p| p.user_id == user_id && (!completed_only || p.is_completed))
            .filter_map(|p| {
                self.levels.get(&p.level_id).map(|level| ProgressEntry {
                    progress: p.clone(),
                    level: level.clone(),
                })
            })
            .collect();
        out.sort_by_key(|e| e.level.level_number);
        out
    }

    fn number_taken(&self, level_number: i32, except_id: Option<i64>) -> bool {
        self.levels
            .values()
            .any(|l| l.level_number == level_number && Some(l.level_id) != except_id)
    }
}

#[derive(Default)]
pub struct MemoryStore {
    state: Mutex<MemoryState>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, MemoryState> {
        // a panic while holding the lock only happens inside a failing test
        self.state.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

#[async_trait]
impl LevelRepository for MemoryStore {
    async fn create_level(&self, level: &NewLevel, now: DateTime<Utc>) -> Result<Level, Error> {
        let mut state = self.lock();
        if state.number_taken(level.level_number, None) {
            return Err(Error::Conflict(format!(
                "Level number {} already exists",
                level.level_number
            )));
        }
        state.next_level_id += 1;
        let created = Level {
            level_id: state.next_level_id,
            level_number: level.level_number,
            riddle: level.riddle.clone(),
            plant_name: level.plant_name.clone(),
            reward: level.reward,
            created_at: now,
            updated_at: now,
        };
        state.levels.insert(created.level_id, created.clone());
        Ok(created)
    }

    async fn get_level_by_id(&self, level_id: i64) -> Result<Option<Level>, Error> {
        Ok(self.lock().levels.get(&level_id).cloned())
    }

    async fn get_level_by_number(&self, level_number: i32) -> Result<Option<Level>, Error> {
        Ok(self.lock().level_by_ref(LevelRef::Number(level_number)).cloned())
    }

    async fn list_levels(&self) -> Result<Vec<Level>, Error> {
        Ok(self.lock().sorted_levels())
    }

    async fn update_level(&self, level: &Level) -> Result<Level, Error> {
        let mut state = self.lock();
        if !state.levels.contains_key(&level.level_id) {
            return Err(Error::NotFound(format!("Level with ID {} not found", level.level_id)));
        }
        if state.number_taken(level.level_number, Some(level.level_id)) {
            return Err(Error::Conflict(format!(
                "Level number {} already exists",
                level.level_number
            )));
        }
        state.levels.insert(level.level_id, level.clone());
        Ok(level.clone())
    }

    async fn delete_level(&self, level_id: i64) -> Result<bool, Error> {
        let mut state = self.lock();
        let removed = state.levels.remove(&level_id).is_some();
        if removed {
            state.progress.retain(|(_, lid), _| *lid != level_id);
        }
        Ok(removed)
    }

    async fn count_levels(&self) -> Result<i64, Error> {
        Ok(self.lock().levels.len() as i64)
    }
}

#[async_trait]
impl ProgressRepository for MemoryStore {
    async fn get_or_create_account(
        &self,
        user_id: i64,
        now: DateTime<Utc>,
    ) -> Result<RewardAccount, Error> {
        Ok(self.lock().account_mut(user_id, now).clone())
    }

    async fn list_progress(&self, user_id: i64) -> Result<Vec<ProgressEntry>, Error> {
        Ok(self.lock().entries(user_id, false))
    }

    async fn list_completed(&self, user_id: i64) -> Result<Vec<ProgressEntry>, Error> {
        Ok(self.lock().entries(user_id, true))
    }

    async fn complete_level(
        &self,
        user_id: i64,
        level_id: i64,
        now: DateTime<Utc>,
    ) -> Result<CompletionReceipt, Error> {
        let mut state = self.lock();

        let level = state
            .levels
            .get(&level_id)
            .cloned()
            .ok_or_else(|| Error::NotFound(format!("Level with ID {} not found", level_id)))?;
        if state.is_completed(user_id, level_id) {
            return Err(Error::Conflict(format!(
                "Level {} already completed",
                level.level_number
            )));
        }

        state.next_progress_id += 1;
        let progress_id = state.next_progress_id;
        let record = state
            .progress
            .entry((user_id, level_id))
            .or_insert_with(|| ProgressRecord {
                progress_id,
                user_id,
                level_id,
                is_completed: false,
                completed_at: None,
                created_at: now,
                updated_at: now,
            });
        record.is_completed = true;
        record.completed_at = Some(now);
        record.updated_at = now;

        let account = state.account_mut(user_id, now);
        account.accrue(level.reward, level.level_number, now);

        Ok(CompletionReceipt {
            user_id,
            level_id,
            level_number: level.level_number,
            reward: level.reward,
            completed_at: now,
            total_rewards: account.total_rewards,
            level_reached: account.level_reached,
        })
    }

    async fn game_snapshot(&self, user_id: i64, now: DateTime<Utc>) -> Result<GameSnapshot, Error> {
        let mut state = self.lock();
        let account = state.account_mut(user_id, now).clone();
        let completed_level_ids: HashSet<i64> = state
            .progress
            .values()
            .filter(|p| p.user_id == user_id && p.is_completed)
            .map(|p| p.level_id)
            .collect();
        Ok(GameSnapshot {
            account,
            levels: state.sorted_levels(),
            completed_level_ids,
        })
    }

    async fn level_snapshot(
        &self,
        user_id: i64,
        level_ref: LevelRef,
        now: DateTime<Utc>,
    ) -> Result<Option<LevelSnapshot>, Error> {
        let mut state = self.lock();
        let level = match state.level_by_ref(level_ref) {
            Some(l) => l.clone(),
            None => return Ok(None),
        };
        let account = state.account_mut(user_id, now).clone();
        let is_completed = state.is_completed(user_id, level.level_id);
        Ok(Some(LevelSnapshot {
            level,
            account,
            is_completed,
        }))
    }
}

#[async_trait]
impl NotificationRepository for MemoryStore {
    async fn create_notification(
        &self,
        user_id: i64,
        kind: NotificationKind,
        title: &str,
        message: &str,
        data: &serde_json::Value,
        now: DateTime<Utc>,
    ) -> Result<Notification, Error> {
        let mut state = self.lock();
        state.next_notification_id += 1;
        let n = Notification {
            notification_id: state.next_notification_id,
            user_id,
            kind,
            title: title.to_string(),
            message: message.to_string(),
            data: data.clone(),
            status: NotificationStatus::Pending,
            is_read: false,
            created_at: now,
            updated_at: now,
            read_at: None,
        };
        state.notifications.insert(n.notification_id, n.clone());
        Ok(n)
    }

    async fn get_notification(&self, notification_id: i64) -> Result<Option<Notification>, Error> {
        Ok(self.lock().notifications.get(&notification_id).cloned())
    }

    async fn list_for_user(
        &self,
        user_id: i64,
        filter: &NotificationFilter,
    ) -> Result<NotificationPage, Error> {
        let state = self.lock();
        let mut matching: Vec<Notification> = state
            .notifications
            .values()
            .filter(|n| n.user_id == user_id)
            .filter(|n| !filter.unread_only || !n.is_read)
            .filter(|n| filter.kind.is_none_or(|k| n.kind == k))
            .cloned()
            .collect();
        matching.sort_by(|a, b| {
            b.created_at
                .cmp(&a.created_at)
                .then(b.notification_id.cmp(&a.notification_id))
        });

        let total = matching.len() as i64;
        let page = matching
            .into_iter()
            .skip(filter.offset as usize)
            .take(filter.limit as usize)
            .collect();
        Ok(NotificationPage::new(page, total, filter))
    }

    async fn unread_count(&self, user_id: i64) -> Result<i64, Error> {
        let state = self.lock();
        Ok(state
            .notifications
            .values()
            .filter(|n| n.user_id == user_id && !n.is_read)
            .count() as i64)
    }

    async fn update_status(
        &self,
        notification_id: i64,
        status: NotificationStatus,
        now: DateTime<Utc>,
    ) -> Result<(), Error> {
        if let Some(n) = self.lock().notifications.get_mut(&notification_id) {
            n.status = status;
            n.updated_at = now;
        }
        Ok(())
    }

    async fn mark_read(&self, notification_id: i64, now: DateTime<Utc>) -> Result<bool, Error> {
        match self.lock().notifications.get_mut(&notification_id) {
            Some(n) => {
                n.is_read = true;
                n.read_at.get_or_insert(now);
                n.updated_at = now;
                Ok(true)
            }
            None => Ok(false),
        }
    }

    async fn mark_all_read(&self, user_id: i64, now: DateTime<Utc>) -> Result<u64, Error> {
        let mut state = self.lock();
        let mut flipped = 0;
        for n in state.notifications.values_mut() {
            if n.user_id == user_id && !n.is_read {
                n.is_read = true;
                n.read_at = Some(now);
                n.updated_at = now;
                flipped += 1;
            }
        }
        Ok(flipped)
    }

    async fn delete_notification(&self, notification_id: i64) -> Result<bool, Error> {
        Ok(self.lock().notifications.remove(&notification_id).is_some())
    }

    async fn get_preferences(&self, user_id: i64) -> Result<NotificationPreferences, Error> {
        Ok(self
            .lock()
            .preferences
            .get(&user_id)
            .copied()
            .unwrap_or_else(|| NotificationPreferences::all_enabled(user_id)))
    }

    async fn save_preferences(
        &self,
        prefs: &NotificationPreferences,
        _now: DateTime<Utc>,
    ) -> Result<(), Error> {
        self.lock().preferences.insert(prefs.user_id, *prefs);
        Ok(())
    }

    async fn register_fcm_token(
        &self,
        user_id: i64,
        token: &str,
        now: DateTime<Utc>,
    ) -> Result<FcmToken, Error> {
        let mut state = self.lock();
        for t in state.tokens.iter_mut().filter(|t| t.user_id == user_id) {
            if t.token != token && t.is_active {
                t.is_active = false;
                t.updated_at = now;
            }
        }
        if let Some(existing) = state
            .tokens
            .iter_mut()
            .find(|t| t.user_id == user_id && t.token == token)
        {
            existing.is_active = true;
            existing.updated_at = now;
            return Ok(existing.clone());
        }
        let stored = FcmToken {
            user_id,
            token: token.to_string(),
            is_active: true,
            created_at: now,
            updated_at: now,
        };
        state.tokens.push(stored.clone());
        Ok(stored)
    }

    async fn active_fcm_token(&self, user_id: i64) -> Result<Option<FcmToken>, Error> {
        Ok(self
            .lock()
            .tokens
            .iter()
            .filter(|t| t.user_id == user_id && t.is_active)
            .max_by_key(|t| t.updated_at)
            .cloned())
    }
}
