//! Node allocation engine: dedicated-node lifecycle, per-workspace quota
//! arithmetic, plan transitions, and billing-period cost computation.
//!
//! Every node status write goes through the central transition table in
//! [`state`]; hypervisor side effects happen after the transient state is
//! committed, with the domain status reverted when the hypervisor call fails.

pub mod entity;
pub mod error;
pub mod handlers;
pub mod models;
pub mod postgres;
pub mod repository;
pub mod service;
pub mod state;

pub use error::{NodeError, NodeResult};
pub use models::{
    AgentCondition, AgentStatus, BillingPeriod, CostReport, DedicatedNode, NodeCost, NodeEvent,
    NodePlan, NodeStatus, NodeType, PlanType, ProvisionNodeRequest, ResourceRequest, SharedQuota,
    WorkspaceNodeAllocation, WorkspaceResourceUsage,
};
pub use postgres::PgNodeRepository;
pub use repository::{InMemoryNodeRepository, NodeRepository};
pub use service::NodeAllocationService;
pub use state::{action_transition, transition_allowed, NodeAction};
