use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::RwLock;
use uuid::Uuid;

use crate::error::{NodeError, NodeResult};
use crate::models::{DedicatedNode, NodeEvent, NodeStatus, WorkspaceNodeAllocation};
use crate::state::transition_allowed;

/// Repository for dedicated nodes, workspace allocations, and node events.
#[async_trait]
pub trait NodeRepository: Send + Sync {
    async fn create_node(&self, node: &DedicatedNode) -> NodeResult<()>;

    async fn get_node(&self, id: Uuid) -> NodeResult<Option<DedicatedNode>>;

    async fn update_node(&self, node: &DedicatedNode) -> NodeResult<()>;

    /// Guarded status write: succeeds only when the stored status still equals
    /// `from` and `from → to` is a legal edge. Returns `false` when another
    /// writer got there first.
    async fn transition_status(
        &self,
        id: Uuid,
        from: NodeStatus,
        to: NodeStatus,
    ) -> NodeResult<bool>;

    /// Non-deleted nodes of a workspace.
    async fn list_nodes(&self, workspace_id: Uuid) -> NodeResult<Vec<DedicatedNode>>;

    /// Every node of a workspace, soft-deleted included (billing needs them).
    async fn list_nodes_with_deleted(&self, workspace_id: Uuid)
        -> NodeResult<Vec<DedicatedNode>>;

    async fn get_allocation(
        &self,
        workspace_id: Uuid,
    ) -> NodeResult<Option<WorkspaceNodeAllocation>>;

    async fn upsert_allocation(&self, allocation: &WorkspaceNodeAllocation) -> NodeResult<()>;

    /// Append-only; callers treat failures as best-effort.
    async fn append_event(&self, event: &NodeEvent) -> NodeResult<()>;

    async fn list_events(&self, node_id: Uuid) -> NodeResult<Vec<NodeEvent>>;
}

/// In-memory implementation (development and tests)
#[derive(Default)]
pub struct InMemoryNodeRepository {
    nodes: RwLock<HashMap<Uuid, DedicatedNode>>,
    allocations: RwLock<HashMap<Uuid, WorkspaceNodeAllocation>>,
    events: RwLock<Vec<NodeEvent>>,
}

impl InMemoryNodeRepository {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }
}

#[async_trait]
impl NodeRepository for InMemoryNodeRepository {
    async fn create_node(&self, node: &DedicatedNode) -> NodeResult<()> {
        let mut nodes = self.nodes.write().await;
        if nodes.contains_key(&node.id) {
            return Err(NodeError::AlreadyExists(format!("node {}", node.id)));
        }
        nodes.insert(node.id, node.clone());
        Ok(())
    }

    async fn get_node(&self, id: Uuid) -> NodeResult<Option<DedicatedNode>> {
        Ok(self.nodes.read().await.get(&id).cloned())
    }

    async fn update_node(&self, node: &DedicatedNode) -> NodeResult<()> {
        let mut nodes = self.nodes.write().await;
        if !nodes.contains_key(&node.id) {
            return Err(NodeError::NotFound(format!("node {}", node.id)));
        }
        nodes.insert(node.id, node.clone());
        Ok(())
    }

    async fn transition_status(
        &self,
        id: Uuid,
        from: NodeStatus,
        to: NodeStatus,
    ) -> NodeResult<bool> {
        if !transition_allowed(from, to) {
            return Err(NodeError::InvalidState(format!(
                "transition {from} -> {to} is not allowed"
            )));
        }

        let mut nodes = self.nodes.write().await;
        let node = nodes
            .get_mut(&id)
            .ok_or_else(|| NodeError::NotFound(format!("node {}", id)))?;

        if node.status != from {
            return Ok(false);
        }
        node.status = to;
        node.updated_at = chrono::Utc::now();
        Ok(true)
    }

    async fn list_nodes(&self, workspace_id: Uuid) -> NodeResult<Vec<DedicatedNode>> {
        Ok(self
            .list_nodes_with_deleted(workspace_id)
            .await?
            .into_iter()
            .filter(|n| n.deleted_at.is_none())
            .collect())
    }

    async fn list_nodes_with_deleted(
        &self,
        workspace_id: Uuid,
    ) -> NodeResult<Vec<DedicatedNode>> {
        let nodes = self.nodes.read().await;
        let mut result: Vec<DedicatedNode> = nodes
            .values()
            .filter(|n| n.workspace_id == workspace_id)
            .cloned()
            .collect();
        result.sort_by(|a, b| a.created_at.cmp(&b.created_at));
        Ok(result)
    }

    async fn get_allocation(
        &self,
        workspace_id: Uuid,
    ) -> NodeResult<Option<WorkspaceNodeAllocation>> {
        Ok(self.allocations.read().await.get(&workspace_id).cloned())
    }

    async fn upsert_allocation(&self, allocation: &WorkspaceNodeAllocation) -> NodeResult<()> {
        self.allocations
            .write()
            .await
            .insert(allocation.workspace_id, allocation.clone());
        Ok(())
    }

    async fn append_event(&self, event: &NodeEvent) -> NodeResult<()> {
        self.events.write().await.push(event.clone());
        Ok(())
    }

    async fn list_events(&self, node_id: Uuid) -> NodeResult<Vec<NodeEvent>> {
        let events = self.events.read().await;
        let mut result: Vec<NodeEvent> = events
            .iter()
            .filter(|e| e.node_id == node_id)
            .cloned()
            .collect();
        result.sort_by(|a, b| a.created_at.cmp(&b.created_at));
        Ok(result)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{NodePlan, NodeType};

    fn node(workspace_id: Uuid, status: NodeStatus) -> DedicatedNode {
        let now = chrono::Utc::now();
        DedicatedNode {
            id: Uuid::now_v7(),
            workspace_id,
            name: "n1".to_string(),
            specification: NodePlan::for_type(NodeType::SType),
            status,
            proxmox_vm_id: None,
            proxmox_node: None,
            ip_address: None,
            ssh_public_key: "ssh-rsa AAAA".to_string(),
            created_at: now,
            updated_at: now,
            deleted_at: None,
        }
    }

    #[tokio::test]
    async fn test_transition_guard_rejects_illegal_edge() {
        let repo = InMemoryNodeRepository::new();
        let n = node(Uuid::new_v4(), NodeStatus::Stopped);
        repo.create_node(&n).await.unwrap();

        let result = repo
            .transition_status(n.id, NodeStatus::Stopped, NodeStatus::Stopping)
            .await;
        assert!(matches!(result, Err(NodeError::InvalidState(_))));
    }

    #[tokio::test]
    async fn test_transition_guard_detects_concurrent_writer() {
        let repo = InMemoryNodeRepository::new();
        let n = node(Uuid::new_v4(), NodeStatus::Ready);
        repo.create_node(&n).await.unwrap();

        // First writer wins
        assert!(repo
            .transition_status(n.id, NodeStatus::Ready, NodeStatus::Stopping)
            .await
            .unwrap());
        // Second writer sees a stale `from` and loses
        assert!(!repo
            .transition_status(n.id, NodeStatus::Ready, NodeStatus::Rebooting)
            .await
            .unwrap());
    }

    #[tokio::test]
    async fn test_list_nodes_excludes_soft_deleted() {
        let repo = InMemoryNodeRepository::new();
        let ws = Uuid::new_v4();

        let mut a = node(ws, NodeStatus::Ready);
        a.deleted_at = Some(chrono::Utc::now());
        a.status = NodeStatus::Deleted;
        let b = node(ws, NodeStatus::Ready);
        repo.create_node(&a).await.unwrap();
        repo.create_node(&b).await.unwrap();

        assert_eq!(repo.list_nodes(ws).await.unwrap().len(), 1);
        assert_eq!(repo.list_nodes_with_deleted(ws).await.unwrap().len(), 2);
    }
}
