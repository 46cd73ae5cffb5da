//! Per-workspace WebSocket push endpoint.

use axum::{
    extract::{
        ws::{Message, WebSocket},
        Path, Query, State, WebSocketUpgrade,
    },
    response::IntoResponse,
    routing::get,
    Extension, Router,
};
use axum_helpers::{require_org, AppError, Principal};
use chrono::{DateTime, Utc};
use serde::Deserialize;
use uuid::Uuid;

use crate::events::{EventHub, WorkspaceEvent};

#[derive(Debug, Deserialize)]
pub struct SubscribeParams {
    /// Replay backlog newer than this instant on reconnect
    pub since: Option<DateTime<Utc>>,
}

pub fn router(hub: EventHub) -> Router {
    Router::new()
        .route(
            "/{org_id}/workspaces/{ws_id}/events",
            get(workspace_events),
        )
        .with_state(hub)
}

async fn workspace_events(
    State(hub): State<EventHub>,
    Extension(principal): Extension<Principal>,
    Path((org_id, ws_id)): Path<(Uuid, Uuid)>,
    Query(params): Query<SubscribeParams>,
    upgrade: WebSocketUpgrade,
) -> Result<impl IntoResponse, AppError> {
    require_org(&principal, org_id)?;

    Ok(upgrade.on_upgrade(move |socket| stream_events(socket, hub, ws_id, params.since)))
}

async fn stream_events(
    mut socket: WebSocket,
    hub: EventHub,
    workspace_id: Uuid,
    since: Option<DateTime<Utc>>,
) {
    let (backlog, mut receiver) = hub.subscribe(workspace_id, since).await;

    for event in backlog {
        if send_event(&mut socket, &event).await.is_err() {
            return;
        }
    }

    loop {
        tokio::select! {
            event = receiver.recv() => {
                match event {
                    Ok(event) => {
                        if send_event(&mut socket, &event).await.is_err() {
                            break;
                        }
                    }
                    // Slow consumer fell behind the ring buffer; it can
                    // reconnect with `since` for the gap
                    Err(tokio::sync::broadcast::error::RecvError::Lagged(skipped)) => {
                        tracing::debug!(workspace_id = %workspace_id, skipped, "ws client lagged");
                    }
                    Err(tokio::sync::broadcast::error::RecvError::Closed) => break,
                }
            }
            incoming = socket.recv() => {
                match incoming {
                    Some(Ok(Message::Close(_))) | None => break,
                    Some(Ok(_)) => {} // pings and client chatter are ignored
                    Some(Err(_)) => break,
                }
            }
        }
    }
}

async fn send_event(socket: &mut WebSocket, event: &WorkspaceEvent) -> Result<(), axum::Error> {
    let text = serde_json::to_string(event).unwrap_or_else(|_| "{}".to_string());
    socket.send(Message::Text(text.into())).await
}
