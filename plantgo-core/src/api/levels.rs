// File: plantgo-core/src/api/levels.rs

use axum::extract::rejection::{JsonRejection, PathRejection};
use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::Json;
use plantgo_common::models::{Level, LevelRef, LevelUpdate, NewLevel};
use super::response::{ApiResponse, ApiResult};
use super::AppState;

pub async fn list_levels(State(state): State<AppState>) -> ApiResult<Json<ApiResponse<Vec<Level>>>> {
    let levels = state.catalog.list_levels().await?;
    Ok(ApiResponse::ok("Levels retrieved successfully", levels))
}

pub async fn get_level(
    State(state): State<AppState>,
    path: Result<Path<i64>, PathRejection>,
) -> ApiResult<Json<ApiResponse<Level>>> {
    let Path(level_id) = path?;
    let level = state.catalog.get_level(LevelRef::Id(level_id)).await?;
    Ok(ApiResponse::ok("Level retrieved successfully", level))
}

pub async fn get_level_by_number(
    State(state): State<AppState>,
    path: Result<Path<i32>, PathRejection>,
) -> ApiResult<Json<ApiResponse<Level>>> {
    let Path(level_number) = path?;
    let level = state.catalog.get_level(LevelRef::Number(level_number)).await?;
    Ok(ApiResponse::ok("Level retrieved successfully", level))
}

pub async fn create_level(
    State(state): State<AppState>,
    body: Result<Json<NewLevel>, JsonRejection>,
) -> ApiResult<(StatusCode, Json<ApiResponse<Level>>)> {
    let Json(req) = body?;
    let level = state.catalog.create_level(req).await?;
    Ok((StatusCode::CREATED, ApiResponse::ok("Level created successfully", level)))
}

pub async fn update_level(
    State(state): State<AppState>,
    path: Result<Path<i64>, PathRejection>,
    body: Result<Json<LevelUpdate>, JsonRejection>,
) -> ApiResult<Json<ApiResponse<Level>>> {
    let Path(level_id) = path?;
    let Json(update) = body?;
    let level = state.catalog.update_level(level_id, update).await?;
    Ok(ApiResponse::ok("Level updated successfully", level))
}

pub async fn delete_level(
    State(state): State<AppState>,
    path: Result<Path<i64>, PathRejection>,
) -> ApiResult<Json<ApiResponse<()>>> {
    let Path(level_id) = path?;
    state.catalog.delete_level(level_id).await?;
    Ok(ApiResponse::done("Level deleted successfully"))
}
