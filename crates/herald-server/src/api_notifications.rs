//! Notification read endpoints.

use crate::api::ApiError;
use crate::AppState;
use axum::{
    extract::{Extension, Path},
    Json,
};
use herald_store::{list_notifications, mark_read, DEFAULT_PAGE_SIZE};
use herald_types::Notification;
use std::sync::Arc;

/// Handler for `GET /api/notifications/{userId}`.
///
/// Returns the recipient's newest notifications first, one page.
pub async fn list_notifications_handler(
    Extension(state): Extension<Arc<AppState>>,
    Path(user_id): Path<i64>,
) -> Result<Json<Vec<Notification>>, ApiError> {
    let pool = state.pool.clone();
    let notifications = tokio::task::spawn_blocking(move || -> Result<Vec<Notification>, ApiError> {
        let conn = pool.get()?;
        Ok(list_notifications(&conn, user_id, DEFAULT_PAGE_SIZE)?)
    })
    .await??;

    Ok(Json(notifications))
}

/// Handler for `PUT /api/notifications/{notificationId}/read`.
pub async fn mark_read_handler(
    Extension(state): Extension<Arc<AppState>>,
    Path(notification_id): Path<String>,
) -> Result<Json<Notification>, ApiError> {
    let pool = state.pool.clone();
    let notification = tokio::task::spawn_blocking(move || -> Result<Notification, ApiError> {
        let conn = pool.get()?;
        Ok(mark_read(&conn, &notification_id)?)
    })
    .await??;

    Ok(Json(notification))
}
