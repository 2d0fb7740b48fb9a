//! In-app notification handlers

use axum::{
    extract::{Path, Query, State},
    Json,
};
use serde::{Deserialize, Serialize};
use shared::ApiResponse;

use crate::error::AppResult;
use crate::middleware::CurrentUser;
use crate::services::notification::InAppNotification;
use crate::AppState;

#[derive(Debug, Deserialize)]
pub struct NotificationsQuery {
    pub unread_only: Option<bool>,
    pub limit: Option<i64>,
}

#[derive(Serialize)]
pub struct NotificationList {
    pub notifications: Vec<InAppNotification>,
    pub unread_count: i64,
}

/// The current user's notifications
pub async fn list_notifications(
    State(state): State<AppState>,
    current_user: CurrentUser,
    Query(query): Query<NotificationsQuery>,
) -> AppResult<Json<ApiResponse<NotificationList>>> {
    let service = state.notifier();
    let user_id = current_user.0.user_id;
    let limit = query.limit.unwrap_or(50).clamp(1, 200);

    let notifications = service
        .list_for_user(user_id, query.unread_only.unwrap_or(false), limit)
        .await?;
    let unread_count = service.unread_count(user_id).await?;

    Ok(Json(ApiResponse::ok(
        "Notifications retrieved",
        NotificationList {
            notifications,
            unread_count,
        },
    )))
}

pub async fn mark_notification_read(
    State(state): State<AppState>,
    current_user: CurrentUser,
    Path(notification_id): Path<i64>,
) -> AppResult<Json<ApiResponse<()>>> {
    state
        .notifier()
        .mark_read(current_user.0.user_id, notification_id)
        .await?;
    Ok(Json(ApiResponse::message("Notification marked as read")))
}
