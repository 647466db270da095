//! Event ingestion endpoint.

use crate::api::ApiError;
use crate::ingest::submit_event;
use crate::AppState;
use axum::{
    extract::{rejection::JsonRejection, Extension},
    http::StatusCode,
    Json,
};
use herald_types::{Event, NewEvent, Payload};
use serde::Deserialize;
use serde_json::Value;
use std::sync::Arc;

/// Request body for `POST /api/events`. Fields are optional here so a
/// missing one becomes a 400 with a readable message.
#[derive(Debug, Deserialize)]
pub struct SubmitEventRequest {
    #[serde(rename = "type")]
    pub event_type: Option<String>,
    pub actor_id: Option<i64>,
    pub target_id: Option<i64>,
    #[serde(default)]
    pub data: Option<Value>,
}

impl TryFrom<SubmitEventRequest> for NewEvent {
    type Error = ApiError;

    fn try_from(req: SubmitEventRequest) -> Result<Self, Self::Error> {
        let (Some(event_type), Some(actor_id), Some(target_id)) =
            (req.event_type, req.actor_id, req.target_id)
        else {
            return Err(ApiError::BadRequest(
                "missing required fields: type, actor_id, target_id".to_string(),
            ));
        };

        let data = match req.data {
            None | Some(Value::Null) => Payload::new(),
            Some(Value::Object(map)) => map,
            Some(_) => return Err(ApiError::BadRequest("data must be an object".to_string())),
        };

        Ok(NewEvent {
            event_type,
            actor_id,
            target_id,
            data,
        })
    }
}

/// Handler for `POST /api/events`.
///
/// Responds `201 Created` with the stored event once it is enqueued; the
/// notification follows asynchronously.
pub async fn submit_event_handler(
    Extension(state): Extension<Arc<AppState>>,
    payload: Result<Json<SubmitEventRequest>, JsonRejection>,
) -> Result<(StatusCode, Json<Event>), ApiError> {
    let Json(request) = payload.map_err(|e| ApiError::BadRequest(e.body_text()))?;
    let new_event = NewEvent::try_from(request)?;

    let event = submit_event(&state.pool, state.queue.as_ref(), new_event).await?;
    Ok((StatusCode::CREATED, Json(event)))
}
