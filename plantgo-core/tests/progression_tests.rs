// File: plantgo-core/tests/progression_tests.rs

use std::sync::Arc;
use std::time::Duration;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use tokio::sync::mpsc;

use plantgo_common::models::{
    CompletionReceipt, GameSnapshot, LevelRef, LevelSnapshot, NewLevel, NotifyEvent,
    ProgressEntry, RewardAccount,
};
use plantgo_common::traits::notifier_traits::Notifier;
use plantgo_common::traits::repository_traits::{LevelRepository, ProgressRepository};
use plantgo_common::ErrorKind;
use plantgo_core::services::ProgressionService;
use plantgo_core::test_utils::memory::MemoryStore;
use plantgo_core::Error;

/// Forwards every event to a channel so tests can await delivery.
struct RecordingNotifier {
    tx: mpsc::UnboundedSender<(i64, NotifyEvent)>,
}

#[async_trait]
impl Notifier for RecordingNotifier {
    async fn notify(&self, user_id: i64, event: NotifyEvent) -> Result<(), Error> {
        let _ = self.tx.send((user_id, event));
        Ok(())
    }
}

struct FailingNotifier;

#[async_trait]
impl Notifier for FailingNotifier {
    async fn notify(&self, _user_id: i64, _event: NotifyEvent) -> Result<(), Error> {
        Err(Error::Push("device unreachable".to_string()))
    }
}

/// Delegates to the memory store after stalling on completions.
struct SlowProgressRepo {
    inner: Arc<MemoryStore>,
    delay: Duration,
}

#[async_trait]
impl ProgressRepository for SlowProgressRepo {
    async fn get_or_create_account(&self, user_id: i64, now: DateTime<Utc>) -> Result<RewardAccount, Error> {
        self.inner.get_or_create_account(user_id, now).await
    }

    async fn list_progress(&self, user_id: i64) -> Result<Vec<ProgressEntry>, Error> {
        self.inner.list_progress(user_id).await
    }

    async fn list_completed(&self, user_id: i64) -> Result<Vec<ProgressEntry>, Error> {
        self.inner.list_completed(user_id).await
    }

    async fn complete_level(
        &self,
        user_id: i64,
        level_id: i64,
        now: DateTime<Utc>,
    ) -> Result<CompletionReceipt, Error> {
        tokio::time::sleep(self.delay).await;
        self.inner.complete_level(user_id, level_id, now).await
    }

    async fn game_snapshot(&self, user_id: i64, now: DateTime<Utc>) -> Result<GameSnapshot, Error> {
        self.inner.game_snapshot(user_id, now).await
    }

    async fn level_snapshot(
        &self,
        user_id: i64,
        level_ref: LevelRef,
        now: DateTime<Utc>,
    ) -> Result<Option<LevelSnapshot>, Error> {
        self.inner.level_snapshot(user_id, level_ref, now).await
    }
}

async fn seed_levels(store: &MemoryStore, levels: &[(i32, i32, &str)]) -> Result<Vec<i64>, Error> {
    let mut ids = Vec::new();
    for (number, reward, plant) in levels {
        let level = store
            .create_level(
                &NewLevel {
                    level_number: *number,
                    riddle: format!("Riddle for level {}", number),
                    plant_name: plant.to_string(),
                    reward: *reward,
                },
                Utc::now(),
            )
            .await?;
        ids.push(level.level_id);
    }
    Ok(ids)
}

fn build_service(store: &Arc<MemoryStore>) -> (ProgressionService, mpsc::UnboundedReceiver<(i64, NotifyEvent)>) {
    let (tx, rx) = mpsc::unbounded_channel();
    let service = ProgressionService::new(
        store.clone(),
        store.clone(),
        Arc::new(RecordingNotifier { tx }),
    );
    (service, rx)
}

#[tokio::test]
async fn test_fresh_user_walkthrough() -> Result<(), Error> {
    let store = Arc::new(MemoryStore::new());
    seed_levels(&store, &[(1, 5, "Monstera"), (2, 10, "Ficus"), (3, 15, "Aloe vera")]).await?;
    let (service, _rx) = build_service(&store);

    let data = service.get_game_data(42).await?;
    assert_eq!(data.user_reward.total_rewards, 0);
    assert_eq!(data.user_reward.level_reached, 1);
    assert_eq!(data.total_levels, 3);
    assert_eq!(data.completed_levels, 0);
    let unlocked: Vec<bool> = data.levels.iter().map(|l| l.is_unlocked).collect();
    assert_eq!(unlocked, vec![true, false, false]);
    assert!(data.levels.iter().all(|l| !l.is_completed));

    let receipt = service.complete_level(42, LevelRef::Number(1)).await?;
    assert_eq!(receipt.total_rewards, 5);
    assert_eq!(receipt.level_reached, 1);

    let receipt = service.complete_level(42, LevelRef::Number(3)).await?;
    assert_eq!(receipt.total_rewards, 20);
    assert_eq!(receipt.level_reached, 3);

    let data = service.get_game_data(42).await?;
    assert_eq!(data.completed_levels, 2);
    let level2 = &data.levels[1];
    assert_eq!(level2.level_number, 2);
    assert!(level2.is_unlocked);
    assert!(!level2.is_completed);

    Ok(())
}

#[tokio::test]
async fn test_watermark_is_max_regardless_of_order() -> Result<(), Error> {
    let store = Arc::new(MemoryStore::new());
    seed_levels(&store, &[(1, 1, "a"), (2, 2, "b"), (5, 5, "c"), (7, 7, "d")]).await?;
    let (service, _rx) = build_service(&store);

    for number in [5, 2, 7, 1] {
        service.complete_level(8, LevelRef::Number(number)).await?;
    }

    let account = service.get_user_reward(8).await?;
    assert_eq!(account.level_reached, 7);
    assert_eq!(account.total_rewards, 15);
    Ok(())
}

#[tokio::test]
async fn test_duplicate_completion_conflicts_without_side_effects() -> Result<(), Error> {
    let store = Arc::new(MemoryStore::new());
    let ids = seed_levels(&store, &[(1, 5, "Monstera"), (2, 10, "Ficus")]).await?;
    let (service, _rx) = build_service(&store);

    service.complete_level(3, LevelRef::Id(ids[1])).await?;
    let before = service.get_user_reward(3).await?;

    // same level, addressed by number this time
    let err = service.complete_level(3, LevelRef::Number(2)).await.unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Conflict);

    let after = service.get_user_reward(3).await?;
    assert_eq!(before.total_rewards, after.total_rewards);
    assert_eq!(before.level_reached, after.level_reached);
    Ok(())
}

#[tokio::test]
async fn test_unknown_level_is_not_found() -> Result<(), Error> {
    let store = Arc::new(MemoryStore::new());
    seed_levels(&store, &[(1, 5, "Monstera")]).await?;
    let (service, _rx) = build_service(&store);

    let err = service.complete_level(3, LevelRef::Number(99)).await.unwrap_err();
    assert_eq!(err.kind(), ErrorKind::NotFound);
    let err = service.complete_level(3, LevelRef::Id(12345)).await.unwrap_err();
    assert_eq!(err.kind(), ErrorKind::NotFound);
    let err = service.submit_answer(3, 12345, "anything").await.unwrap_err();
    assert_eq!(err.kind(), ErrorKind::NotFound);

    assert!(store.list_progress(3).await?.is_empty());
    Ok(())
}

#[tokio::test]
async fn test_malformed_input_is_validation() -> Result<(), Error> {
    let store = Arc::new(MemoryStore::new());
    let ids = seed_levels(&store, &[(1, 5, "Monstera")]).await?;
    let (service, _rx) = build_service(&store);

    let err = service.complete_level(3, LevelRef::Number(0)).await.unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Validation);
    let err = service.complete_level(0, LevelRef::Id(ids[0])).await.unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Validation);
    let err = service.submit_answer(3, ids[0], "   ").await.unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Validation);
    Ok(())
}

#[tokio::test]
async fn test_locked_level_rejects_correct_answer() -> Result<(), Error> {
    let store = Arc::new(MemoryStore::new());
    let ids = seed_levels(&store, &[(1, 5, "Monstera"), (2, 10, "Ficus")]).await?;
    let (service, _rx) = build_service(&store);

    let err = service.submit_answer(11, ids[1], "Ficus").await.unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Forbidden);

    let account = service.get_user_reward(11).await?;
    assert_eq!(account.total_rewards, 0);
    assert_eq!(account.level_reached, 1);
    assert!(store.list_progress(11).await?.is_empty());
    Ok(())
}

#[tokio::test]
async fn test_submit_answer_paths() -> Result<(), Error> {
    let store = Arc::new(MemoryStore::new());
    let ids = seed_levels(&store, &[(1, 5, "Monstera deliciosa")]).await?;
    let (service, _rx) = build_service(&store);

    let miss = service.submit_answer(4, ids[0], "Fern").await?;
    assert!(!miss.is_correct);
    assert!(!miss.level_completed);
    assert_eq!(miss.reward_gained, 0);
    assert_eq!(miss.correct_answer.as_deref(), Some("Monstera deliciosa"));
    assert_eq!(service.get_user_reward(4).await?.total_rewards, 0);

    let hit = service.submit_answer(4, ids[0], "  monstera DELICIOSA ").await?;
    assert!(hit.is_correct);
    assert!(hit.level_completed);
    assert_eq!(hit.reward_gained, 5);
    assert_eq!(hit.total_rewards, 5);
    assert!(hit.correct_answer.is_none());

    let err = service.submit_answer(4, ids[0], "Monstera deliciosa").await.unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Validation);
    assert_eq!(service.get_user_reward(4).await?.total_rewards, 5);
    Ok(())
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_concurrent_completions_converge() -> Result<(), Error> {
    let store = Arc::new(MemoryStore::new());
    seed_levels(&store, &[(1, 5, "a"), (2, 10, "b"), (3, 15, "c"), (4, 20, "d")]).await?;
    let (service, _rx) = build_service(&store);
    let service = Arc::new(service);

    let a = {
        let service = service.clone();
        tokio::spawn(async move { service.complete_level(21, LevelRef::Number(2)).await })
    };
    let b = {
        let service = service.clone();
        tokio::spawn(async move { service.complete_level(21, LevelRef::Number(4)).await })
    };
    a.await.expect("task panicked")?;
    b.await.expect("task panicked")?;

    let account = service.get_user_reward(21).await?;
    assert_eq!(account.level_reached, 4);
    assert_eq!(account.total_rewards, 30);
    Ok(())
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_racing_duplicates_accrue_once() -> Result<(), Error> {
    let store = Arc::new(MemoryStore::new());
    seed_levels(&store, &[(1, 5, "a")]).await?;
    let (service, _rx) = build_service(&store);
    let service = Arc::new(service);

    let mut handles = Vec::new();
    for _ in 0..8 {
        let service = service.clone();
        handles.push(tokio::spawn(async move {
            service.complete_level(30, LevelRef::Number(1)).await
        }));
    }
    let mut successes = 0;
    for h in handles {
        match h.await.expect("task panicked") {
            Ok(_) => successes += 1,
            Err(e) => assert_eq!(e.kind(), ErrorKind::Conflict),
        }
    }
    assert_eq!(successes, 1);
    assert_eq!(service.get_user_reward(30).await?.total_rewards, 5);
    Ok(())
}

#[tokio::test]
async fn test_completion_notifies_level_complete() -> Result<(), Error> {
    let store = Arc::new(MemoryStore::new());
    seed_levels(&store, &[(1, 5, "Monstera")]).await?;
    let (service, mut rx) = build_service(&store);

    service.complete_level(6, LevelRef::Number(1)).await?;

    let (user_id, event) = tokio::time::timeout(Duration::from_secs(2), rx.recv())
        .await
        .expect("notification not dispatched")
        .expect("channel closed");
    assert_eq!(user_id, 6);
    assert_eq!(event, NotifyEvent::LevelComplete { level_number: 1, reward: 5 });
    Ok(())
}

#[tokio::test]
async fn test_notifier_failure_does_not_fail_completion() -> Result<(), Error> {
    let store = Arc::new(MemoryStore::new());
    seed_levels(&store, &[(1, 5, "Monstera")]).await?;
    let service = ProgressionService::new(store.clone(), store.clone(), Arc::new(FailingNotifier));

    let receipt = service.complete_level(6, LevelRef::Number(1)).await?;
    assert_eq!(receipt.total_rewards, 5);
    Ok(())
}

#[tokio::test]
async fn test_details_and_gated_reveal() -> Result<(), Error> {
    let store = Arc::new(MemoryStore::new());
    seed_levels(&store, &[(1, 5, "Monstera"), (2, 10, "Ficus")]).await?;
    let (service, _rx) = build_service(&store);

    let details = service.get_level_details(9, LevelRef::Number(2)).await?;
    assert_eq!(details.plant_name, "Ficus");
    assert!(!details.is_unlocked);
    assert!(!details.is_completed);

    let err = service.reveal_riddle(9, LevelRef::Number(2)).await.unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Forbidden);

    let open = service.reveal_riddle(9, LevelRef::Number(1)).await?;
    assert!(open.is_unlocked);
    assert_eq!(open.user_reward.level_reached, 1);

    let err = service.get_level_details(9, LevelRef::Number(3)).await.unwrap_err();
    assert_eq!(err.kind(), ErrorKind::NotFound);
    Ok(())
}

#[tokio::test]
async fn test_progress_and_completed_lists() -> Result<(), Error> {
    let store = Arc::new(MemoryStore::new());
    seed_levels(&store, &[(1, 5, "a"), (2, 10, "b"), (3, 15, "c")]).await?;
    let (service, _rx) = build_service(&store);

    service.complete_level(2, LevelRef::Number(3)).await?;
    service.complete_level(2, LevelRef::Number(1)).await?;

    let completed = service.get_completed_levels(2).await?;
    let numbers: Vec<i32> = completed.iter().map(|e| e.level.level_number).collect();
    assert_eq!(numbers, vec![1, 3]);
    assert!(completed.iter().all(|e| e.progress.completed_at.is_some()));

    assert_eq!(service.get_user_progress(2).await?.len(), 2);
    assert!(service.get_user_progress(77).await?.is_empty());
    Ok(())
}

#[tokio::test]
async fn test_timeout_is_retryable_and_leaves_no_trace() -> Result<(), Error> {
    let store = Arc::new(MemoryStore::new());
    seed_levels(&store, &[(1, 5, "Monstera")]).await?;
    let slow = Arc::new(SlowProgressRepo {
        inner: store.clone(),
        delay: Duration::from_millis(500),
    });
    let (tx, _rx) = mpsc::unbounded_channel();
    let service = ProgressionService::new(store.clone(), slow, Arc::new(RecordingNotifier { tx }))
        .with_timeout(Duration::from_millis(20));

    let err = service.complete_level(5, LevelRef::Number(1)).await.unwrap_err();
    assert!(matches!(err, Error::Timeout(_)));
    assert!(err.is_retryable());
    assert_eq!(err.kind(), ErrorKind::Internal);

    let account = store.get_or_create_account(5, Utc::now()).await?;
    assert_eq!(account.total_rewards, 0);
    assert!(store.list_completed(5).await?.is_empty());
    Ok(())
}
