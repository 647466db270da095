//! WebSocket endpoint for live notification push.
//!
//! A client connects to `/ws`, then joins the group of the user whose
//! notifications it wants, either with `?userId=N` on the URL or by sending
//! `{"type":"join","userId":N}`. From then on every notification created
//! for that user arrives as `{"event":"newNotification","payload":{...}}`.

use crate::registry::CONNECTION_BUFFER;
use crate::AppState;
use axum::{
    extract::{
        ws::{Message as AxumMessage, WebSocket},
        Extension, Query, WebSocketUpgrade,
    },
    response::IntoResponse,
};
use futures_util::{SinkExt, StreamExt};
use herald_types::LiveFrame;
use serde::Deserialize;
use std::sync::Arc;
use tokio::sync::mpsc;
use uuid::Uuid;

/// Query parameters for the WebSocket connection.
#[derive(Debug, Deserialize)]
pub struct WsConnectParams {
    /// Joins this user's group immediately on connect.
    #[serde(rename = "userId")]
    pub user_id: Option<i64>,
}

/// Incoming WebSocket frames.
#[derive(Debug, Deserialize)]
#[serde(tag = "type")]
pub enum ClientFrame {
    #[serde(rename = "join")]
    Join {
        #[serde(rename = "userId")]
        user_id: i64,
    },
    #[serde(rename = "leave")]
    Leave,
}

/// WebSocket handler: `GET /ws` or `GET /ws?userId=N`.
pub async fn ws_handler(
    Extension(state): Extension<Arc<AppState>>,
    ws: WebSocketUpgrade,
    Query(params): Query<WsConnectParams>,
) -> impl IntoResponse {
    ws.on_upgrade(move |socket| handle_socket(socket, state, params.user_id))
}

async fn join(state: &AppState, connection_id: Uuid, user_id: i64) {
    if state.registry.register(user_id, connection_id).await {
        tracing::info!(connection_id = %connection_id, recipient_id = user_id, "connection joined");
        state
            .registry
            .send(connection_id, &LiveFrame::Joined { user_id })
            .await;
    }
}

async fn handle_socket(socket: WebSocket, state: Arc<AppState>, initial_user: Option<i64>) {
    let (mut sender, mut receiver) = socket.split();

    // Frames beyond the buffer are dropped by the registry rather than
    // queued without bound.
    let (tx, mut rx) = mpsc::channel::<String>(CONNECTION_BUFFER);
    let connection_id = state.registry.connect(tx).await;
    tracing::debug!(connection_id = %connection_id, "websocket connected");

    let send_task = tokio::spawn(async move {
        while let Some(msg) = rx.recv().await {
            if sender.send(AxumMessage::Text(msg.into())).await.is_err() {
                break;
            }
        }
    });

    if let Some(user_id) = initial_user {
        join(&state, connection_id, user_id).await;
    }

    while let Some(Ok(msg)) = receiver.next().await {
        match msg {
            AxumMessage::Text(text) => match serde_json::from_str::<ClientFrame>(text.as_str()) {
                Ok(ClientFrame::Join { user_id }) => join(&state, connection_id, user_id).await,
                Ok(ClientFrame::Leave) => {
                    if let Some(previous) = state.registry.leave(connection_id).await {
                        tracing::info!(
                            connection_id = %connection_id,
                            recipient_id = previous,
                            "connection left"
                        );
                    }
                    state.registry.send(connection_id, &LiveFrame::Left).await;
                }
                Err(e) => {
                    tracing::debug!(connection_id = %connection_id, "unparseable client frame: {}", e);
                    state
                        .registry
                        .send(
                            connection_id,
                            &LiveFrame::Error {
                                message: "invalid message format".to_string(),
                            },
                        )
                        .await;
                }
            },
            AxumMessage::Close(_) => break,
            _ => {}
        }
    }

    state.registry.unregister(connection_id).await;
    send_task.abort();
    tracing::debug!(connection_id = %connection_id, "websocket disconnected");
}
