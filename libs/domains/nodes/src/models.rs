use chrono::{DateTime, Utc};
use sea_orm::{DeriveActiveEnum, EnumIter};
use serde::{Deserialize, Serialize};
use strum::{Display, EnumString};
use utoipa::ToSchema;
use uuid::Uuid;
use validator::Validate;

/// Fixed dedicated-node catalog entry types
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Display, EnumString, ToSchema,
)]
pub enum NodeType {
    #[serde(rename = "S-Type")]
    #[strum(serialize = "S-Type")]
    SType,
    #[serde(rename = "M-Type")]
    #[strum(serialize = "M-Type")]
    MType,
    #[serde(rename = "L-Type")]
    #[strum(serialize = "L-Type")]
    LType,
}

/// Catalog entry backing a dedicated node
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct NodePlan {
    pub node_type: NodeType,
    pub cpu_cores: u32,
    pub memory_gb: u64,
    pub storage_gb: u64,
    pub network_mbps: u32,
    pub monthly_price: f64,
    /// Virtualization template the node is cloned from
    pub template_id: u32,
}

impl NodePlan {
    pub fn for_type(node_type: NodeType) -> Self {
        match node_type {
            NodeType::SType => Self {
                node_type,
                cpu_cores: 4,
                memory_gb: 16,
                storage_gb: 200,
                network_mbps: 1000,
                monthly_price: 99.99,
                template_id: 9000,
            },
            NodeType::MType => Self {
                node_type,
                cpu_cores: 8,
                memory_gb: 32,
                storage_gb: 500,
                network_mbps: 2000,
                monthly_price: 199.99,
                template_id: 9001,
            },
            NodeType::LType => Self {
                node_type,
                cpu_cores: 16,
                memory_gb: 64,
                storage_gb: 1000,
                network_mbps: 4000,
                monthly_price: 399.99,
                template_id: 9002,
            },
        }
    }

    pub fn catalog() -> Vec<NodePlan> {
        vec![
            Self::for_type(NodeType::SType),
            Self::for_type(NodeType::MType),
            Self::for_type(NodeType::LType),
        ]
    }

    /// Hourly proration of the fixed monthly price (30-day month).
    pub fn hourly_rate(&self) -> f64 {
        self.monthly_price / (24.0 * 30.0)
    }
}

/// Dedicated-node lifecycle status; transitions are governed by
/// [`crate::state`].
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Serialize,
    Deserialize,
    Display,
    Default,
    DeriveActiveEnum,
    EnumIter,
    ToSchema,
)]
#[sea_orm(rs_type = "String", db_type = "Enum", enum_name = "node_status")]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum NodeStatus {
    #[default]
    #[sea_orm(string_value = "provisioning")]
    Provisioning,
    #[sea_orm(string_value = "ready")]
    Ready,
    #[sea_orm(string_value = "starting")]
    Starting,
    #[sea_orm(string_value = "stopping")]
    Stopping,
    #[sea_orm(string_value = "stopped")]
    Stopped,
    #[sea_orm(string_value = "rebooting")]
    Rebooting,
    #[sea_orm(string_value = "deleting")]
    Deleting,
    #[sea_orm(string_value = "failed")]
    Failed,
    #[sea_orm(string_value = "deleted")]
    Deleted,
}

impl NodeStatus {
    pub fn is_terminal(&self) -> bool {
        matches!(self, NodeStatus::Deleted)
    }

    /// Whether the scheduler may place workloads on a node in this state.
    pub fn can_schedule_workload(&self) -> bool {
        matches!(self, NodeStatus::Ready | NodeStatus::Starting)
    }
}

/// Resource plan of a workspace allocation; maps onto the same database enum
/// as the workspace's plan column.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Serialize,
    Deserialize,
    Display,
    Default,
    DeriveActiveEnum,
    EnumIter,
    ToSchema,
)]
#[sea_orm(rs_type = "String", db_type = "Enum", enum_name = "workspace_plan")]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum PlanType {
    #[default]
    #[sea_orm(string_value = "shared")]
    Shared,
    #[sea_orm(string_value = "dedicated")]
    Dedicated,
}

/// VM-backed node exclusive to one workspace
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct DedicatedNode {
    pub id: Uuid,
    pub workspace_id: Uuid,
    pub name: String,
    pub specification: NodePlan,
    pub status: NodeStatus,
    pub proxmox_vm_id: Option<u32>,
    pub proxmox_node: Option<String>,
    pub ip_address: Option<String>,
    pub ssh_public_key: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub deleted_at: Option<DateTime<Utc>>,
}

/// Quota slice of the shared pool; only present on shared-plan workspaces
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct SharedQuota {
    pub cpu_limit: f64,
    pub memory_limit: f64,
    pub cpu_used: f64,
    pub memory_used: f64,
}

impl SharedQuota {
    /// Platform default applied on transition back to the shared plan.
    pub fn default_quota() -> Self {
        Self {
            cpu_limit: 2.0,
            memory_limit: 4.0,
            cpu_used: 0.0,
            memory_used: 0.0,
        }
    }
}

/// Per-workspace resource allocation.
///
/// Exactly one of `shared_quota` (shared plan) and the dedicated node list
/// (dedicated plan, stored in the nodes table) is populated at any committed
/// state; plan transitions clear the other side atomically.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct WorkspaceNodeAllocation {
    pub workspace_id: Uuid,
    pub plan_type: PlanType,
    pub shared_quota: Option<SharedQuota>,
    pub updated_at: DateTime<Utc>,
}

impl WorkspaceNodeAllocation {
    pub fn shared(workspace_id: Uuid, quota: SharedQuota) -> Self {
        Self {
            workspace_id,
            plan_type: PlanType::Shared,
            shared_quota: Some(quota),
            updated_at: Utc::now(),
        }
    }

    pub fn dedicated(workspace_id: Uuid) -> Self {
        Self {
            workspace_id,
            plan_type: PlanType::Dedicated,
            shared_quota: None,
            updated_at: Utc::now(),
        }
    }
}

/// Requested capacity for a workload placement check
#[derive(Debug, Clone, Copy, Deserialize, ToSchema)]
pub struct ResourceRequest {
    pub cpu: f64,
    pub memory: f64,
}

/// Append-only per-node event
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct NodeEvent {
    pub id: Uuid,
    pub workspace_id: Uuid,
    pub node_id: Uuid,
    pub event_type: String,
    pub description: String,
    pub metadata: Option<serde_json::Value>,
    pub created_at: DateTime<Utc>,
}

impl NodeEvent {
    pub fn new(
        workspace_id: Uuid,
        node_id: Uuid,
        event_type: &str,
        description: impl Into<String>,
    ) -> Self {
        Self {
            id: Uuid::now_v7(),
            workspace_id,
            node_id,
            event_type: event_type.to_string(),
            description: description.into(),
            metadata: None,
            created_at: Utc::now(),
        }
    }

    /// Partition key (`YYYY-MM`) for the append-only table.
    pub fn month(&self) -> String {
        self.created_at.format("%Y-%m").to_string()
    }
}

/// Request to provision a dedicated node
#[derive(Debug, Clone, Deserialize, Validate, ToSchema)]
pub struct ProvisionNodeRequest {
    #[validate(length(min = 1, max = 63))]
    pub name: String,
    /// Catalog type; one of `S-Type`, `M-Type`, `L-Type`
    pub node_type: String,
    #[validate(length(min = 1))]
    pub ssh_public_key: String,
}

/// Half-open billing window `[start, end]`
#[derive(Debug, Clone, Copy, Deserialize, ToSchema)]
pub struct BillingPeriod {
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct NodeCost {
    pub node_id: Uuid,
    pub name: String,
    pub node_type: NodeType,
    /// Hours the node was active within the period (floating)
    pub hours: f64,
    pub hourly_rate: f64,
    pub cost: f64,
}

/// Billing-period cost breakdown; values keep floating precision, rounding is
/// the presentation layer's concern.
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct CostReport {
    pub workspace_id: Uuid,
    pub period_start: DateTime<Utc>,
    pub period_end: DateTime<Utc>,
    pub nodes: Vec<NodeCost>,
    pub total_usd: f64,
}

/// Live usage sample for one node (best-effort)
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct NodeLiveUsage {
    pub node_id: Uuid,
    pub name: String,
    pub cpu_percent: f64,
    pub memory_used_mb: u64,
    pub memory_total_mb: u64,
    pub disk_used_gb: f64,
    pub disk_total_gb: f64,
}

#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct DedicatedUsage {
    pub node_count: usize,
    /// Nodes currently able to take workloads
    pub active_nodes: usize,
    pub total_cpu_cores: u32,
    pub total_memory_gb: u64,
    pub total_storage_gb: u64,
    /// Missing samples are skipped, not errors
    pub live: Vec<NodeLiveUsage>,
}

/// Snapshot of a workspace's resource situation
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct WorkspaceResourceUsage {
    pub workspace_id: Uuid,
    pub plan_type: PlanType,
    pub shared: Option<SharedQuota>,
    pub dedicated: Option<DedicatedUsage>,
}

/// K3s agent view of a node
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Display, ToSchema)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum AgentStatus {
    Ready,
    NotReady,
    NotFound,
    Provisioning,
    /// Ready=True but the last heartbeat is older than five minutes
    Stale,
}

#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct AgentCondition {
    pub condition_type: String,
    pub status: String,
    pub reason: Option<String>,
    pub message: Option<String>,
    pub since: Option<DateTime<Utc>>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::str::FromStr;

    #[test]
    fn test_catalog_matches_price_list() {
        let s = NodePlan::for_type(NodeType::SType);
        assert_eq!((s.cpu_cores, s.memory_gb, s.storage_gb), (4, 16, 200));
        assert_eq!(s.template_id, 9000);
        assert!((s.monthly_price - 99.99).abs() < f64::EPSILON);

        let m = NodePlan::for_type(NodeType::MType);
        assert_eq!((m.cpu_cores, m.memory_gb, m.storage_gb), (8, 32, 500));
        assert_eq!(m.template_id, 9001);

        let l = NodePlan::for_type(NodeType::LType);
        assert_eq!((l.cpu_cores, l.memory_gb, l.storage_gb), (16, 64, 1000));
        assert_eq!(l.network_mbps, 4000);
    }

    #[test]
    fn test_node_type_wire_format() {
        assert_eq!(NodeType::from_str("S-Type").unwrap(), NodeType::SType);
        assert!(NodeType::from_str("XL-Type").is_err());
        assert_eq!(
            serde_json::to_value(NodeType::MType).unwrap(),
            serde_json::json!("M-Type")
        );
    }

    #[test]
    fn test_hourly_rate_is_monthly_over_720() {
        let plan = NodePlan::for_type(NodeType::SType);
        assert!((plan.hourly_rate() - 99.99 / 720.0).abs() < 1e-9);
    }

    #[test]
    fn test_schedulable_states() {
        assert!(NodeStatus::Ready.can_schedule_workload());
        assert!(NodeStatus::Starting.can_schedule_workload());
        assert!(!NodeStatus::Stopped.can_schedule_workload());
        assert!(!NodeStatus::Provisioning.can_schedule_workload());
    }
}
