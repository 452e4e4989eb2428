// File: plantgo-core/src/api/notifications.rs

use axum::extract::rejection::{JsonRejection, PathRejection, QueryRejection};
use axum::extract::{Path, Query, State};
use axum::Json;
use serde::{Deserialize, Serialize};
use plantgo_common::models::{
    FcmToken, NotificationPage, NotificationPreferences, NotificationQuery, PreferencesUpdate,
};
use super::response::{ApiResponse, ApiResult};
use super::AppState;

#[derive(Debug, Deserialize)]
pub struct RegisterTokenRequest {
    pub user_id: i64,
    pub fcm_token: String,
}

#[derive(Debug, Deserialize)]
pub struct PlantIdentifiedRequest {
    pub user_id: i64,
    pub plant_name: String,
    pub confidence: f64,
}

#[derive(Debug, Serialize)]
pub struct UnreadCount {
    pub unread_count: i64,
}

#[derive(Debug, Serialize)]
pub struct MarkedRead {
    pub marked: u64,
}

/// `?limit=&offset=&kind=&unread_only=`; limit defaults to 20, capped at 100.
pub async fn list_notifications(
    State(state): State<AppState>,
    path: Result<Path<i64>, PathRejection>,
    query: Result<Query<NotificationQuery>, QueryRejection>,
) -> ApiResult<Json<ApiResponse<NotificationPage>>> {
    let Path(user_id) = path?;
    let Query(query) = query?;
    let page = state.notifications.list_notifications(user_id, &query).await?;
    Ok(ApiResponse::ok("Notifications retrieved successfully", page))
}

pub async fn list_unread(
    State(state): State<AppState>,
    path: Result<Path<i64>, PathRejection>,
    query: Result<Query<NotificationQuery>, QueryRejection>,
) -> ApiResult<Json<ApiResponse<NotificationPage>>> {
    let Path(user_id) = path?;
    let Query(query) = query?;
    let query = NotificationQuery { unread_only: true, ..query };
    let page = state.notifications.list_notifications(user_id, &query).await?;
    Ok(ApiResponse::ok("Unread notifications retrieved successfully", page))
}

pub async fn unread_count(
    State(state): State<AppState>,
    path: Result<Path<i64>, PathRejection>,
) -> ApiResult<Json<ApiResponse<UnreadCount>>> {
    let Path(user_id) = path?;
    let unread_count = state.notifications.unread_count(user_id).await?;
    Ok(ApiResponse::ok("Unread count retrieved successfully", UnreadCount { unread_count }))
}

pub async fn mark_read(
    State(state): State<AppState>,
    path: Result<Path<i64>, PathRejection>,
) -> ApiResult<Json<ApiResponse<()>>> {
    let Path(notification_id) = path?;
    state.notifications.mark_read(notification_id).await?;
    Ok(ApiResponse::done("Notification marked as read"))
}

pub async fn mark_all_read(
    State(state): State<AppState>,
    path: Result<Path<i64>, PathRejection>,
) -> ApiResult<Json<ApiResponse<MarkedRead>>> {
    let Path(user_id) = path?;
    let marked = state.notifications.mark_all_read(user_id).await?;
    Ok(ApiResponse::ok("All notifications marked as read", MarkedRead { marked }))
}

pub async fn delete_notification(
    State(state): State<AppState>,
    path: Result<Path<i64>, PathRejection>,
) -> ApiResult<Json<ApiResponse<()>>> {
    let Path(notification_id) = path?;
    state.notifications.delete_notification(notification_id).await?;
    Ok(ApiResponse::done("Notification deleted successfully"))
}

pub async fn register_fcm_token(
    State(state): State<AppState>,
    body: Result<Json<RegisterTokenRequest>, JsonRejection>,
) -> ApiResult<Json<ApiResponse<FcmToken>>> {
    let Json(req) = body?;
    let token = state
        .notifications
        .register_fcm_token(req.user_id, &req.fcm_token)
        .await?;
    Ok(ApiResponse::ok("FCM token registered successfully", token))
}

pub async fn get_preferences(
    State(state): State<AppState>,
    path: Result<Path<i64>, PathRejection>,
) -> ApiResult<Json<ApiResponse<NotificationPreferences>>> {
    let Path(user_id) = path?;
    let prefs = state.notifications.get_preferences(user_id).await?;
    Ok(ApiResponse::ok("Preferences retrieved successfully", prefs))
}

pub async fn update_preferences(
    State(state): State<AppState>,
    path: Result<Path<i64>, PathRejection>,
    body: Result<Json<PreferencesUpdate>, JsonRejection>,
) -> ApiResult<Json<ApiResponse<NotificationPreferences>>> {
    let Path(user_id) = path?;
    let Json(update) = body?;
    let prefs = state.notifications.update_preferences(user_id, update).await?;
    Ok(ApiResponse::ok("Preferences updated successfully", prefs))
}

/// Hook for the scanning service once it has a confident match.
pub async fn plant_identified(
    State(state): State<AppState>,
    body: Result<Json<PlantIdentifiedRequest>, JsonRejection>,
) -> ApiResult<Json<ApiResponse<()>>> {
    let Json(req) = body?;
    state
        .notifications
        .notify_plant_identified(req.user_id, &req.plant_name, req.confidence)
        .await?;
    Ok(ApiResponse::done("Notification sent"))
}
