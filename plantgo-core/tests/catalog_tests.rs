// File: plantgo-core/tests/catalog_tests.rs

use std::sync::Arc;
use plantgo_common::models::{LevelRef, LevelUpdate, NewLevel};
use plantgo_common::traits::repository_traits::ProgressRepository;
use plantgo_common::ErrorKind;
use plantgo_core::services::CatalogService;
use plantgo_core::test_utils::memory::MemoryStore;
use plantgo_core::Error;

fn new_level(number: i32, plant: &str, reward: i32) -> NewLevel {
    NewLevel {
        level_number: number,
        riddle: format!("I am level {}", number),
        plant_name: plant.to_string(),
        reward,
    }
}

#[tokio::test]
async fn test_create_and_lookup_both_ways() -> Result<(), Error> {
    let store = Arc::new(MemoryStore::new());
    let catalog = CatalogService::new(store.clone());

    let created = catalog
        .create_level(NewLevel {
            level_number: 4,
            riddle: "  Green and tall  ".to_string(),
            plant_name: " Bamboo ".to_string(),
            reward: 12,
        })
        .await?;
    assert_eq!(created.riddle, "Green and tall");
    assert_eq!(created.plant_name, "Bamboo");

    let by_id = catalog.get_level(LevelRef::Id(created.level_id)).await?;
    let by_number = catalog.get_level(LevelRef::Number(4)).await?;
    assert_eq!(by_id, by_number);
    assert_eq!(catalog.count_levels().await?, 1);
    Ok(())
}

#[tokio::test]
async fn test_list_is_ordered_by_number() -> Result<(), Error> {
    let store = Arc::new(MemoryStore::new());
    let catalog = CatalogService::new(store.clone());
    for n in [3, 1, 2] {
        catalog.create_level(new_level(n, "Fern", n * 5)).await?;
    }
    let numbers: Vec<i32> = catalog.list_levels().await?.iter().map(|l| l.level_number).collect();
    assert_eq!(numbers, vec![1, 2, 3]);
    Ok(())
}

#[tokio::test]
async fn test_create_validation_and_conflict() -> Result<(), Error> {
    let store = Arc::new(MemoryStore::new());
    let catalog = CatalogService::new(store.clone());

    let err = catalog.create_level(new_level(0, "Fern", 5)).await.unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Validation);
    let err = catalog.create_level(new_level(1, "   ", 5)).await.unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Validation);
    let err = catalog.create_level(new_level(1, "Fern", -1)).await.unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Validation);

    catalog.create_level(new_level(1, "Fern", 5)).await?;
    let err = catalog.create_level(new_level(1, "Cactus", 5)).await.unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Conflict);
    assert_eq!(catalog.count_levels().await?, 1);
    Ok(())
}

#[tokio::test]
async fn test_partial_update() -> Result<(), Error> {
    let store = Arc::new(MemoryStore::new());
    let catalog = CatalogService::new(store.clone());
    let level = catalog.create_level(new_level(1, "Fern", 5)).await?;
    catalog.create_level(new_level(2, "Cactus", 10)).await?;

    let updated = catalog
        .update_level(
            level.level_id,
            LevelUpdate {
                reward: Some(8),
                ..Default::default()
            },
        )
        .await?;
    assert_eq!(updated.reward, 8);
    assert_eq!(updated.plant_name, "Fern");
    assert_eq!(updated.level_number, 1);

    let unchanged = catalog.update_level(level.level_id, LevelUpdate::default()).await?;
    assert_eq!(unchanged.reward, 8);

    let err = catalog
        .update_level(
            level.level_id,
            LevelUpdate {
                level_number: Some(2),
                ..Default::default()
            },
        )
        .await
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Conflict);

    let err = catalog
        .update_level(
            level.level_id,
            LevelUpdate {
                plant_name: Some("".to_string()),
                ..Default::default()
            },
        )
        .await
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Validation);

    let err = catalog.update_level(999, LevelUpdate::default()).await.unwrap_err();
    assert_eq!(err.kind(), ErrorKind::NotFound);
    Ok(())
}

#[tokio::test]
async fn test_delete_removes_progress_rows() -> Result<(), Error> {
    let store = Arc::new(MemoryStore::new());
    let catalog = CatalogService::new(store.clone());
    let level = catalog.create_level(new_level(1, "Fern", 5)).await?;

    store.complete_level(7, level.level_id, chrono::Utc::now()).await?;
    assert_eq!(store.list_progress(7).await?.len(), 1);

    catalog.delete_level(level.level_id).await?;
    assert!(store.list_progress(7).await?.is_empty());
    // accrued points stay with the account
    assert_eq!(store.get_or_create_account(7, chrono::Utc::now()).await?.total_rewards, 5);

    let err = catalog.delete_level(level.level_id).await.unwrap_err();
    assert_eq!(err.kind(), ErrorKind::NotFound);
    let err = catalog.get_level(LevelRef::Number(1)).await.unwrap_err();
    assert_eq!(err.kind(), ErrorKind::NotFound);
    Ok(())
}
