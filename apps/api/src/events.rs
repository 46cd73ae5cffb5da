//! In-process event hub backing the per-workspace WebSocket push.
//!
//! Clients subscribe per workspace; a status watcher publishes workspace,
//! node, and function state changes as they land in the store. A bounded
//! backlog per workspace serves reconnecting clients that pass `since`.

use chrono::{DateTime, Utc};
use serde::Serialize;
use std::collections::{HashMap, VecDeque};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{broadcast, RwLock};
use uuid::Uuid;

use domain_nodes::repository::NodeRepository;
use domain_workspaces::repository::TenancyRepository;

const CHANNEL_CAPACITY: usize = 64;
const BACKLOG_CAPACITY: usize = 256;
const WATCH_INTERVAL: Duration = Duration::from_secs(5);

/// Message pushed to WebSocket subscribers
#[derive(Debug, Clone, Serialize)]
pub struct WorkspaceEvent {
    #[serde(rename = "type")]
    pub event_type: String,
    pub entity_id: String,
    pub payload: serde_json::Value,
    pub timestamp: DateTime<Utc>,
}

impl WorkspaceEvent {
    pub fn new(event_type: &str, entity_id: String, payload: serde_json::Value) -> Self {
        Self {
            event_type: event_type.to_string(),
            entity_id,
            payload,
            timestamp: Utc::now(),
        }
    }
}

struct Channel {
    sender: broadcast::Sender<WorkspaceEvent>,
    backlog: VecDeque<WorkspaceEvent>,
}

/// Process-wide hub: one broadcast channel + backlog per workspace.
#[derive(Clone, Default)]
pub struct EventHub {
    channels: Arc<RwLock<HashMap<Uuid, Channel>>>,
}

impl EventHub {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn publish(&self, workspace_id: Uuid, event: WorkspaceEvent) {
        let mut channels = self.channels.write().await;
        let channel = channels.entry(workspace_id).or_insert_with(|| Channel {
            sender: broadcast::channel(CHANNEL_CAPACITY).0,
            backlog: VecDeque::new(),
        });

        channel.backlog.push_back(event.clone());
        if channel.backlog.len() > BACKLOG_CAPACITY {
            channel.backlog.pop_front();
        }

        // No subscribers is fine; the backlog still records the event
        let _ = channel.sender.send(event);
    }

    /// Subscribe to a workspace; `since` replays the matching backlog tail.
    pub async fn subscribe(
        &self,
        workspace_id: Uuid,
        since: Option<DateTime<Utc>>,
    ) -> (Vec<WorkspaceEvent>, broadcast::Receiver<WorkspaceEvent>) {
        let mut channels = self.channels.write().await;
        let channel = channels.entry(workspace_id).or_insert_with(|| Channel {
            sender: broadcast::channel(CHANNEL_CAPACITY).0,
            backlog: VecDeque::new(),
        });

        let backlog = match since {
            Some(since) => channel
                .backlog
                .iter()
                .filter(|e| e.timestamp > since)
                .cloned()
                .collect(),
            None => Vec::new(),
        };

        (backlog, channel.sender.subscribe())
    }

    async fn watched_workspaces(&self) -> Vec<Uuid> {
        self.channels.read().await.keys().copied().collect()
    }
}

/// Poll store state for subscribed workspaces and publish changes.
///
/// Workspace status, node status, and rollout progress all funnel through
/// the same hub, so one watcher is enough.
pub fn spawn_status_watcher<T, N>(hub: EventHub, tenancy: Arc<T>, nodes: Arc<N>)
where
    T: TenancyRepository + 'static,
    N: NodeRepository + 'static,
{
    tokio::spawn(async move {
        let mut last_seen: HashMap<String, String> = HashMap::new();
        let mut interval = tokio::time::interval(WATCH_INTERVAL);

        loop {
            interval.tick().await;

            for workspace_id in hub.watched_workspaces().await {
                // Workspace lifecycle
                match tenancy.get_workspace(workspace_id).await {
                    Ok(Some(workspace)) => {
                        let key = format!("ws:{workspace_id}");
                        let status = workspace.vcluster_status.to_string();
                        if last_seen.get(&key) != Some(&status) {
                            last_seen.insert(key, status.clone());
                            hub.publish(
                                workspace_id,
                                WorkspaceEvent::new(
                                    "workspace_status",
                                    workspace_id.to_string(),
                                    serde_json::json!({ "vcluster_status": status }),
                                ),
                            )
                            .await;
                        }
                    }
                    Ok(None) => continue,
                    Err(e) => {
                        tracing::debug!(workspace_id = %workspace_id, "watcher read failed: {}", e);
                        continue;
                    }
                }

                // Node lifecycle
                if let Ok(workspace_nodes) = nodes.list_nodes(workspace_id).await {
                    for node in workspace_nodes {
                        let key = format!("node:{}", node.id);
                        let status = node.status.to_string();
                        if last_seen.get(&key) != Some(&status) {
                            last_seen.insert(key, status.clone());
                            hub.publish(
                                workspace_id,
                                WorkspaceEvent::new(
                                    "node_status",
                                    node.id.to_string(),
                                    serde_json::json!({
                                        "name": node.name,
                                        "status": status,
                                    }),
                                ),
                            )
                            .await;
                        }
                    }
                }
            }
        }
    });
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_publish_then_subscribe_replays_backlog_since() {
        let hub = EventHub::new();
        let ws = Uuid::new_v4();
        let cutoff = Utc::now();

        hub.publish(ws, WorkspaceEvent::new("node_status", "n1".to_string(), serde_json::json!({})))
            .await;

        let (backlog, _rx) = hub.subscribe(ws, Some(cutoff)).await;
        assert_eq!(backlog.len(), 1);
        assert_eq!(backlog[0].event_type, "node_status");

        let (empty, _rx) = hub.subscribe(ws, Some(Utc::now())).await;
        assert!(empty.is_empty());
    }

    #[tokio::test]
    async fn test_live_subscribers_receive_events() {
        let hub = EventHub::new();
        let ws = Uuid::new_v4();

        let (_backlog, mut rx) = hub.subscribe(ws, None).await;
        hub.publish(
            ws,
            WorkspaceEvent::new("workspace_status", ws.to_string(), serde_json::json!({})),
        )
        .await;

        let event = rx.recv().await.unwrap();
        assert_eq!(event.event_type, "workspace_status");
    }
}
