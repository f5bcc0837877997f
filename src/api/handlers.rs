use axum::{
    extract::{Path, Query, State},
    Json,
};
use serde::Deserialize;
use serde_json::{json, Value};

use super::ApiState;
use crate::errors::AppError;
use crate::models::notification::Notification;

const DEFAULT_LIMIT: i64 = 20;
const MAX_LIMIT: i64 = 100;

#[derive(Deserialize)]
pub struct ListParams {
    pub limit: Option<i64>,
}

// ── Notification Handlers ────────────────────────────────────

/// GET /api/v1/users/:recipient/notifications: most recent first
pub async fn list_notifications(
    State(state): State<ApiState>,
    Path(recipient): Path<String>,
    Query(params): Query<ListParams>,
) -> Result<Json<Vec<Notification>>, AppError> {
    let limit = match params.limit {
        None => DEFAULT_LIMIT,
        Some(n) if n > 0 => n.min(MAX_LIMIT),
        Some(n) => {
            return Err(AppError::BadRequest(format!(
                "limit must be positive, got {}",
                n
            )))
        }
    };

    let notifs = state.store.list_by_recipient(&recipient, limit).await?;
    Ok(Json(notifs))
}

/// GET /api/v1/users/:recipient/notifications/unread: count unread
pub async fn count_unread_notifications(
    State(state): State<ApiState>,
    Path(recipient): Path<String>,
) -> Result<Json<Value>, AppError> {
    let count = state.store.count_unread(&recipient).await?;
    Ok(Json(json!({ "count": count })))
}

/// POST /api/v1/users/:recipient/notifications/:action_key/read: mark as read
pub async fn mark_notification_read(
    State(state): State<ApiState>,
    Path((recipient, action_key)): Path<(String, String)>,
) -> Result<Json<Value>, AppError> {
    let updated = state.store.mark_read(&recipient, &action_key).await?;
    if !updated {
        return Err(AppError::NotificationNotFound);
    }

    tracing::debug!(recipient = %recipient, action_key = %action_key, "notification marked read");
    Ok(Json(json!({ "updated": true })))
}
