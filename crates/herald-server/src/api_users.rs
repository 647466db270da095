//! Directory listing.

use crate::api::ApiError;
use crate::AppState;
use axum::{extract::Extension, Json};
use herald_store::list_users;
use herald_types::User;
use std::sync::Arc;

/// Handler for `GET /api/users`.
pub async fn list_users_handler(
    Extension(state): Extension<Arc<AppState>>,
) -> Result<Json<Vec<User>>, ApiError> {
    let pool = state.pool.clone();
    let users = tokio::task::spawn_blocking(move || -> Result<Vec<User>, ApiError> {
        let conn = pool.get()?;
        Ok(list_users(&conn)?)
    })
    .await??;

    Ok(Json(users))
}
