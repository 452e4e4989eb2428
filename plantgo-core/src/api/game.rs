// File: plantgo-core/src/api/game.rs
//
// Player-facing progression routes. The caller's user id arrives already
// authenticated, either in the path or in the body.

use axum::extract::rejection::{JsonRejection, PathRejection};
use axum::extract::{Path, State};
use axum::Json;
use serde::Deserialize;
use plantgo_common::models::{
    AnswerOutcome, CompletionReceipt, GameDataView, LevelDetailsView, LevelRef, ProgressEntry,
    RewardAccount,
};
use super::response::{ApiResponse, ApiResult};
use super::AppState;

#[derive(Debug, Deserialize)]
pub struct CompleteLevelRequest {
    pub user_id: i64,
    pub level_id: i64,
}

#[derive(Debug, Deserialize)]
pub struct CompleteByNumberRequest {
    pub user_id: i64,
    pub level_number: i32,
}

#[derive(Debug, Deserialize)]
pub struct SubmitAnswerRequest {
    pub user_id: i64,
    pub level_id: i64,
    pub answer: String,
}

pub async fn complete_level(
    State(state): State<AppState>,
    body: Result<Json<CompleteLevelRequest>, JsonRejection>,
) -> ApiResult<Json<ApiResponse<CompletionReceipt>>> {
    let Json(req) = body?;
    let receipt = state
        .progression
        .complete_level(req.user_id, LevelRef::Id(req.level_id))
        .await?;
    Ok(ApiResponse::ok("Level completed successfully", receipt))
}

pub async fn complete_level_by_number(
    State(state): State<AppState>,
    body: Result<Json<CompleteByNumberRequest>, JsonRejection>,
) -> ApiResult<Json<ApiResponse<CompletionReceipt>>> {
    let Json(req) = body?;
    let receipt = state
        .progression
        .complete_level(req.user_id, LevelRef::Number(req.level_number))
        .await?;
    Ok(ApiResponse::ok("Level completed successfully", receipt))
}

pub async fn submit_answer(
    State(state): State<AppState>,
    body: Result<Json<SubmitAnswerRequest>, JsonRejection>,
) -> ApiResult<Json<ApiResponse<AnswerOutcome>>> {
    let Json(req) = body?;
    let outcome = state
        .progression
        .submit_answer(req.user_id, req.level_id, &req.answer)
        .await?;
    let message = outcome.message.clone();
    Ok(ApiResponse::ok(message, outcome))
}

pub async fn game_data(
    State(state): State<AppState>,
    path: Result<Path<i64>, PathRejection>,
) -> ApiResult<Json<ApiResponse<GameDataView>>> {
    let Path(user_id) = path?;
    let view = state.progression.get_game_data(user_id).await?;
    Ok(ApiResponse::ok("Game data retrieved successfully", view))
}

pub async fn level_details(
    State(state): State<AppState>,
    path: Result<Path<(i64, i32)>, PathRejection>,
) -> ApiResult<Json<ApiResponse<LevelDetailsView>>> {
    let Path((user_id, level_number)) = path?;
    let view = state
        .progression
        .get_level_details(user_id, LevelRef::Number(level_number))
        .await?;
    Ok(ApiResponse::ok("Level details retrieved successfully", view))
}

pub async fn reveal_riddle(
    State(state): State<AppState>,
    path: Result<Path<(i64, i32)>, PathRejection>,
) -> ApiResult<Json<ApiResponse<LevelDetailsView>>> {
    let Path((user_id, level_number)) = path?;
    let view = state
        .progression
        .reveal_riddle(user_id, LevelRef::Number(level_number))
        .await?;
    Ok(ApiResponse::ok("Riddle retrieved successfully", view))
}

pub async fn user_progress(
    State(state): State<AppState>,
    path: Result<Path<i64>, PathRejection>,
) -> ApiResult<Json<ApiResponse<Vec<ProgressEntry>>>> {
    let Path(user_id) = path?;
    let entries = state.progression.get_user_progress(user_id).await?;
    Ok(ApiResponse::ok("User progress retrieved successfully", entries))
}

pub async fn completed_levels(
    State(state): State<AppState>,
    path: Result<Path<i64>, PathRejection>,
) -> ApiResult<Json<ApiResponse<Vec<ProgressEntry>>>> {
    let Path(user_id) = path?;
    let entries = state.progression.get_completed_levels(user_id).await?;
    Ok(ApiResponse::ok("Completed levels retrieved successfully", entries))
}

pub async fn user_rewards(
    State(state): State<AppState>,
    path: Result<Path<i64>, PathRejection>,
) -> ApiResult<Json<ApiResponse<RewardAccount>>> {
    let Path(user_id) = path?;
    let account = state.progression.get_user_reward(user_id).await?;
    Ok(ApiResponse::ok("User rewards retrieved successfully", account))
}
