// File: plantgo-core/tests/api_tests.rs

use std::sync::Arc;
use std::time::Duration;
use axum::body::Body;
use axum::http::{Request, StatusCode};
use axum::Router;
use http_body_util::BodyExt;
use serde_json::{json, Value};
use tower::ServiceExt;

use plantgo_common::traits::notifier_traits::Notifier;
use plantgo_core::api::{self, AppState};
use plantgo_core::push::DisabledPushSender;
use plantgo_core::services::{CatalogService, NotificationService, ProgressionService};
use plantgo_core::test_utils::memory::MemoryStore;

fn build_app() -> Router {
    let store = Arc::new(MemoryStore::new());
    let notifications = Arc::new(NotificationService::new(store.clone(), Arc::new(DisabledPushSender)));
    let notifier: Arc<dyn Notifier> = notifications.clone();
    api::router(AppState {
        catalog: Arc::new(CatalogService::new(store.clone())),
        progression: Arc::new(ProgressionService::new(store.clone(), store, notifier)),
        notifications,
    })
}

async fn send(app: &Router, method: &str, uri: &str, body: Option<Value>) -> (StatusCode, Value) {
    let builder = Request::builder().method(method).uri(uri);
    let req = match body {
        Some(b) => builder
            .header("content-type", "application/json")
            .body(Body::from(b.to_string())),
        None => builder.body(Body::empty()),
    }
    .expect("valid request");

    let resp = app.clone().oneshot(req).await.expect("router is infallible");
    let status = resp.status();
    let bytes = resp.into_body().collect().await.expect("body").to_bytes();
    let value = if bytes.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&bytes).expect("json body")
    };
    (status, value)
}

async fn seed(app: &Router) {
    for (number, plant, reward) in [(1, "Monstera", 5), (2, "Ficus", 10), (3, "Aloe", 15)] {
        let (status, _) = send(
            app,
            "POST",
            "/api/v1/admin/levels",
            Some(json!({
                "level_number": number,
                "riddle": format!("Riddle {}", number),
                "plant_name": plant,
                "reward": reward,
            })),
        )
        .await;
        assert_eq!(status, StatusCode::CREATED);
    }
}

#[tokio::test]
async fn test_health_reports_level_count() {
    let app = build_app();
    seed(&app).await;
    let (status, body) = send(&app, "GET", "/health", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["success"], true);
    assert_eq!(body["data"]["levels"], 3);
}

#[tokio::test]
async fn test_catalog_routes() {
    let app = build_app();
    seed(&app).await;

    let (status, body) = send(&app, "GET", "/api/v1/levels", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"].as_array().map(Vec::len), Some(3));

    let (status, body) = send(&app, "GET", "/api/v1/levels/number/2", None).await;
    assert_eq!(status, StatusCode::OK);
    let id = body["data"]["level_id"].as_i64().expect("level id");

    let (status, body) = send(&app, "GET", &format!("/api/v1/levels/{}", id), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["plant_name"], "Ficus");

    let (status, body) = send(
        &app,
        "PUT",
        &format!("/api/v1/admin/levels/{}", id),
        Some(json!({ "reward": 11 })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["reward"], 11);

    let (status, _) = send(&app, "DELETE", &format!("/api/v1/admin/levels/{}", id), None).await;
    assert_eq!(status, StatusCode::OK);
    let (status, body) = send(&app, "GET", &format!("/api/v1/levels/{}", id), None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["success"], false);
    assert_eq!(body["error"]["kind"], "not_found");
}

#[tokio::test]
async fn test_duplicate_level_number_is_409() {
    let app = build_app();
    seed(&app).await;
    let (status, body) = send(
        &app,
        "POST",
        "/api/v1/admin/levels",
        Some(json!({ "level_number": 1, "riddle": "again", "plant_name": "Fern", "reward": 1 })),
    )
    .await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(body["error"]["kind"], "conflict");
}

#[tokio::test]
async fn test_malformed_body_is_400() {
    let app = build_app();
    let (status, body) = send(&app, "POST", "/api/v1/game/complete", Some(json!({ "user_id": 1 }))).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"]["kind"], "validation");
}

#[tokio::test]
async fn test_malformed_path_is_400() {
    let app = build_app();
    for uri in [
        "/api/v1/game/data/abc",
        "/api/v1/levels/abc",
        "/api/v1/game/level/7/first",
        "/api/v1/notifications/abc/unread/count",
    ] {
        let (status, body) = send(&app, "GET", uri, None).await;
        assert_eq!(status, StatusCode::BAD_REQUEST, "{}", uri);
        assert_eq!(body["success"], false, "{}", uri);
        assert_eq!(body["error"]["kind"], "validation", "{}", uri);
        assert_eq!(body["error"]["retryable"], false, "{}", uri);
    }
}

#[tokio::test]
async fn test_non_positive_user_id_is_400() {
    let app = build_app();
    let (status, body) = send(&app, "GET", "/api/v1/notifications/0", None).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"]["kind"], "validation");
}

#[tokio::test]
async fn test_completion_flow() {
    let app = build_app();
    seed(&app).await;

    let (status, body) = send(
        &app,
        "POST",
        "/api/v1/game/complete-by-number",
        Some(json!({ "user_id": 5, "level_number": 3 })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["total_rewards"], 15);
    assert_eq!(body["data"]["level_reached"], 3);

    let (status, body) = send(
        &app,
        "POST",
        "/api/v1/game/complete-by-number",
        Some(json!({ "user_id": 5, "level_number": 3 })),
    )
    .await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(body["error"]["kind"], "conflict");

    let (status, body) = send(&app, "GET", "/api/v1/game/data/5", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["completed_levels"], 1);
    assert_eq!(body["data"]["total_levels"], 3);
    assert_eq!(body["data"]["levels"][1]["is_unlocked"], true);
    assert_eq!(body["data"]["levels"][1]["is_completed"], false);

    let (_, body) = send(&app, "GET", "/api/v1/game/completed/5", None).await;
    assert_eq!(body["data"][0]["level"]["level_number"], 3);

    let (_, body) = send(&app, "GET", "/api/v1/game/rewards/5", None).await;
    assert_eq!(body["data"]["total_rewards"], 15);
}

#[tokio::test]
async fn test_answer_and_riddle_gating() {
    let app = build_app();
    seed(&app).await;
    let (_, body) = send(&app, "GET", "/api/v1/levels/number/2", None).await;
    let level2 = body["data"]["level_id"].as_i64().expect("level id");
    let (_, body) = send(&app, "GET", "/api/v1/levels/number/1", None).await;
    let level1 = body["data"]["level_id"].as_i64().expect("level id");

    let (status, body) = send(&app, "GET", "/api/v1/game/riddle/8/2", None).await;
    assert_eq!(status, StatusCode::FORBIDDEN);
    assert_eq!(body["error"]["kind"], "forbidden");

    let (status, body) = send(&app, "GET", "/api/v1/game/level/8/2", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["is_unlocked"], false);

    let (status, _) = send(
        &app,
        "POST",
        "/api/v1/game/answer",
        Some(json!({ "user_id": 8, "level_id": level2, "answer": "Ficus" })),
    )
    .await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let (status, body) = send(
        &app,
        "POST",
        "/api/v1/game/answer",
        Some(json!({ "user_id": 8, "level_id": level1, "answer": "cactus" })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["is_correct"], false);
    assert_eq!(body["data"]["correct_answer"], "Monstera");

    let (status, body) = send(
        &app,
        "POST",
        "/api/v1/game/answer",
        Some(json!({ "user_id": 8, "level_id": level1, "answer": "MONSTERA" })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["is_correct"], true);
    assert_eq!(body["data"]["reward_gained"], 5);
}

#[tokio::test]
async fn test_completion_creates_notification() {
    let app = build_app();
    seed(&app).await;
    send(
        &app,
        "POST",
        "/api/v1/game/complete-by-number",
        Some(json!({ "user_id": 12, "level_number": 1 })),
    )
    .await;

    // delivery runs detached from the request
    let mut unread = 0;
    for _ in 0..50 {
        let (_, body) = send(&app, "GET", "/api/v1/notifications/12/unread/count", None).await;
        unread = body["data"]["unread_count"].as_i64().unwrap_or(0);
        if unread > 0 {
            break;
        }
        tokio::time::sleep(Duration::from_millis(20)).await;
    }
    assert_eq!(unread, 1);

    let (_, body) = send(&app, "GET", "/api/v1/notifications/12", None).await;
    assert_eq!(body["data"]["total"], 1);
    let notification = &body["data"]["notifications"][0];
    assert_eq!(notification["kind"], "level_complete");
    let id = notification["notification_id"].as_i64().expect("notification id");

    let (status, _) = send(&app, "PUT", &format!("/api/v1/notifications/{}/read", id), None).await;
    assert_eq!(status, StatusCode::OK);
    let (_, body) = send(&app, "GET", "/api/v1/notifications/12/unread", None).await;
    assert_eq!(body["data"]["notifications"].as_array().map(Vec::len), Some(0));
    assert_eq!(body["data"]["total"], 0);

    let (status, _) = send(&app, "DELETE", &format!("/api/v1/notifications/{}", id), None).await;
    assert_eq!(status, StatusCode::OK);
    let (status, _) = send(&app, "DELETE", &format!("/api/v1/notifications/{}", id), None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_preferences_and_token_routes() {
    let app = build_app();

    let (status, body) = send(&app, "GET", "/api/v1/notifications/4/preferences", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["level_completes"], true);

    let (status, body) = send(
        &app,
        "PUT",
        "/api/v1/notifications/4/preferences",
        Some(json!({ "plant_identified": false })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["plant_identified"], false);
    assert_eq!(body["data"]["level_completes"], true);

    let (status, _) = send(
        &app,
        "POST",
        "/api/v1/notifications/plant-identified",
        Some(json!({ "user_id": 4, "plant_name": "Fern", "confidence": 0.93 })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    let (_, body) = send(&app, "GET", "/api/v1/notifications/4/unread/count", None).await;
    assert_eq!(body["data"]["unread_count"], 0);

    let (status, body) = send(
        &app,
        "POST",
        "/api/v1/notifications/fcm-token",
        Some(json!({ "user_id": 4, "fcm_token": "device-abc" })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["is_active"], true);

    let (status, _) = send(
        &app,
        "POST",
        "/api/v1/notifications/fcm-token",
        Some(json!({ "user_id": 4, "fcm_token": "  " })),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, body) = send(&app, "PUT", "/api/v1/notifications/4/read-all", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["marked"], 0);
}

#[tokio::test]
async fn test_notification_listing_is_paged() {
    let app = build_app();
    for plant in ["Fern", "Basil", "Cactus"] {
        let (status, _) = send(
            &app,
            "POST",
            "/api/v1/notifications/plant-identified",
            Some(json!({ "user_id": 21, "plant_name": plant, "confidence": 0.9 })),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
    }

    let (status, body) = send(&app, "GET", "/api/v1/notifications/21", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["limit"], 20);
    assert_eq!(body["data"]["offset"], 0);
    assert_eq!(body["data"]["total"], 3);
    assert_eq!(body["data"]["has_more"], false);

    let (_, body) = send(&app, "GET", "/api/v1/notifications/21?limit=2", None).await;
    assert_eq!(body["data"]["notifications"].as_array().map(Vec::len), Some(2));
    assert_eq!(body["data"]["total"], 3);
    assert_eq!(body["data"]["has_more"], true);

    let (_, body) = send(&app, "GET", "/api/v1/notifications/21?limit=2&offset=2", None).await;
    assert_eq!(body["data"]["notifications"].as_array().map(Vec::len), Some(1));
    assert_eq!(body["data"]["has_more"], false);

    let (_, body) = send(&app, "GET", "/api/v1/notifications/21?kind=level_complete", None).await;
    assert_eq!(body["data"]["total"], 0);
    let (_, body) = send(&app, "GET", "/api/v1/notifications/21/unread?kind=plant_identified", None).await;
    assert_eq!(body["data"]["total"], 3);

    let (_, body) = send(&app, "GET", "/api/v1/notifications/21?limit=1000", None).await;
    assert_eq!(body["data"]["limit"], 100);

    for bad in ["limit=0", "offset=-5", "limit=abc", "kind=weekly_digest"] {
        let (status, body) = send(&app, "GET", &format!("/api/v1/notifications/21?{}", bad), None).await;
        assert_eq!(status, StatusCode::BAD_REQUEST, "{}", bad);
        assert_eq!(body["error"]["kind"], "validation", "{}", bad);
    }
}
