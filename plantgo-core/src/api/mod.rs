// File: plantgo-core/src/api/mod.rs
//
// axum router over the three services. Handlers only translate between
// HTTP and service calls.

pub mod response;
pub mod levels;
pub mod game;
pub mod notifications;

use std::sync::Arc;
use axum::extract::State;
use axum::routing::{get, post, put};
use axum::{Json, Router};
use serde::Serialize;
use tower::ServiceBuilder;
use tower_http::trace::TraceLayer;
use tracing::debug;
use crate::services::{CatalogService, NotificationService, ProgressionService};
use self::response::{ApiResponse, ApiResult};

pub use self::response::ApiError;

#[derive(Clone)]
pub struct AppState {
    pub catalog: Arc<CatalogService>,
    pub progression: Arc<ProgressionService>,
    pub notifications: Arc<NotificationService>,
}

#[derive(Debug, Serialize)]
pub struct HealthStatus {
    pub status: &'static str,
    pub version: &'static str,
    pub levels: i64,
}

async fn health(State(state): State<AppState>) -> ApiResult<Json<ApiResponse<HealthStatus>>> {
    let levels = state.catalog.count_levels().await?;
    debug!("Health check ok ({} levels)", levels);
    Ok(ApiResponse::ok(
        "PlantGo backend is running",
        HealthStatus {
            status: "ok",
            version: env!("CARGO_PKG_VERSION"),
            levels,
        },
    ))
}

pub fn router(state: AppState) -> Router {
    let levels = Router::new()
        .route("/levels", get(levels::list_levels))
        .route("/levels/{id}", get(levels::get_level))
        .route("/levels/number/{number}", get(levels::get_level_by_number))
        .route("/admin/levels", post(levels::create_level))
        .route(
            "/admin/levels/{id}",
            put(levels::update_level).delete(levels::delete_level),
        );

    let game = Router::new()
        .route("/game/complete", post(game::complete_level))
        .route("/game/complete-by-number", post(game::complete_level_by_number))
        .route("/game/answer", post(game::submit_answer))
        .route("/game/data/{user_id}", get(game::game_data))
        .route("/game/level/{user_id}/{number}", get(game::level_details))
        .route("/game/riddle/{user_id}/{number}", get(game::reveal_riddle))
        .route("/game/progress/{user_id}", get(game::user_progress))
        .route("/game/completed/{user_id}", get(game::completed_levels))
        .route("/game/rewards/{user_id}", get(game::user_rewards));

    // `{id}` is a user id on the user-scoped routes and a notification id on
    // the rest; the router requires one name per segment.
    let notifications = Router::new()
        .route("/notifications/fcm-token", post(notifications::register_fcm_token))
        .route("/notifications/plant-identified", post(notifications::plant_identified))
        .route(
            "/notifications/{id}",
            get(notifications::list_notifications).delete(notifications::delete_notification),
        )
        .route("/notifications/{id}/unread", get(notifications::list_unread))
        .route("/notifications/{id}/unread/count", get(notifications::unread_count))
        .route("/notifications/{id}/read", put(notifications::mark_read))
        .route("/notifications/{id}/read-all", put(notifications::mark_all_read))
        .route(
            "/notifications/{id}/preferences",
            get(notifications::get_preferences).put(notifications::update_preferences),
        );

    Router::new()
        .route("/health", get(health))
        .nest("/api/v1", levels.merge(game).merge(notifications))
        .with_state(state)
        .layer(ServiceBuilder::new().layer(TraceLayer::new_for_http()))
}
