use chrono::Utc;
use kubernetes::{ready_state, ClusterProvider, NodeReadyState, NodeTaint};
use proxmox::{CloudInitConfig, VirtualizationProvider, VmSpec};
use std::str::FromStr;
use std::sync::Arc;
use std::time::Duration;
use uuid::Uuid;
use validator::Validate;

use crate::error::{NodeError, NodeResult};
use crate::models::{
    AgentCondition, AgentStatus, BillingPeriod, CostReport, DedicatedNode, DedicatedUsage,
    NodeCost, NodeEvent, NodeLiveUsage, NodePlan, NodeStatus, NodeType, PlanType,
    ProvisionNodeRequest, ResourceRequest, SharedQuota, WorkspaceNodeAllocation,
    WorkspaceResourceUsage,
};
use crate::repository::NodeRepository;
use crate::state::{action_transition, NodeAction};

/// Outer bound for node provisioning.
pub const PROVISION_TIMEOUT: Duration = Duration::from_secs(10 * 60);

const NETWORK_BRIDGE: &str = "vmbr0";

/// Output of the prepare half of provisioning
struct ProvisionPlan {
    node: DedicatedNode,
    spec: VmSpec,
    was_shared: bool,
}

/// Node allocation engine.
///
/// Owns the dedicated-node state machine, quota arithmetic, plan
/// transitions, and cost computation. Hypervisor calls happen after the
/// transient state is committed; on failure the domain status is reverted
/// and an `error` event recorded.
pub struct NodeAllocationService<R: NodeRepository> {
    repository: Arc<R>,
    virt: Arc<dyn VirtualizationProvider>,
    cluster: Arc<dyn ClusterProvider>,
    provision_timeout: Duration,
}

impl<R: NodeRepository> Clone for NodeAllocationService<R> {
    fn clone(&self) -> Self {
        Self {
            repository: self.repository.clone(),
            virt: self.virt.clone(),
            cluster: self.cluster.clone(),
            provision_timeout: self.provision_timeout,
        }
    }
}

impl<R: NodeRepository> NodeAllocationService<R> {
    pub fn new(
        repository: Arc<R>,
        virt: Arc<dyn VirtualizationProvider>,
        cluster: Arc<dyn ClusterProvider>,
    ) -> Self {
        Self {
            repository,
            virt,
            cluster,
            provision_timeout: PROVISION_TIMEOUT,
        }
    }

    pub fn with_provision_timeout(mut self, timeout: Duration) -> Self {
        self.provision_timeout = timeout;
        self
    }

    pub fn node_plans(&self) -> Vec<NodePlan> {
        NodePlan::catalog()
    }

    /// Cluster-visible name of a node's VM and its K3s agent.
    fn vm_name(node_id: Uuid) -> String {
        format!("hxb-node-{}", &node_id.simple().to_string()[..12])
    }

    /// Best-effort event append; failures never fail the operation.
    async fn emit(&self, event: NodeEvent) {
        if let Err(e) = self.repository.append_event(&event).await {
            tracing::warn!(node_id = %event.node_id, event_type = %event.event_type,
                "failed to append node event: {}", e);
        }
    }

    async fn load(&self, id: Uuid) -> NodeResult<DedicatedNode> {
        self.repository
            .get_node(id)
            .await?
            .ok_or_else(|| NodeError::NotFound(format!("node {}", id)))
    }

    // ---- provisioning ----

    /// Provision a dedicated node and, on the first one, flip the workspace
    /// to the dedicated plan (best-effort; a failed flip is surfaced for the
    /// reconciler, the node keeps existing).
    pub async fn provision_dedicated_node(
        &self,
        workspace_id: Uuid,
        request: ProvisionNodeRequest,
    ) -> NodeResult<DedicatedNode> {
        let plan = self.prepare_provision(workspace_id, request).await?;
        self.complete_provision(plan).await
    }

    /// Validate, persist the `provisioning` row, and emit the first event;
    /// the hypervisor work happens in [`Self::complete_provision`].
    async fn prepare_provision(
        &self,
        workspace_id: Uuid,
        request: ProvisionNodeRequest,
    ) -> NodeResult<ProvisionPlan> {
        request
            .validate()
            .map_err(|e| NodeError::Validation(e.to_string()))?;
        let node_type = NodeType::from_str(&request.node_type).map_err(|_| {
            NodeError::Validation(format!(
                "unknown node type '{}'; expected S-Type, M-Type or L-Type",
                request.node_type
            ))
        })?;

        let allocation = self
            .repository
            .get_allocation(workspace_id)
            .await?
            .ok_or_else(|| {
                NodeError::NotFound(format!("allocation for workspace {}", workspace_id))
            })?;

        let plan = NodePlan::for_type(node_type);
        let node_id = Uuid::now_v7();
        let vm_name = Self::vm_name(node_id);
        let now = Utc::now();

        let user_data = format!(
            "#cloud-config\n\
             hostname: {vm_name}\n\
             write_files:\n\
             - path: /etc/hexabase/node.env\n\
             \x20 content: |\n\
             \x20   HEXABASE_WORKSPACE_ID={workspace_id}\n\
             \x20   HEXABASE_NODE_ID={node_id}\n\
             runcmd:\n\
             - [/opt/hexabase/join-vcluster.sh]\n"
        );
        let spec = VmSpec {
            name: vm_name.clone(),
            node_type: node_type.to_string(),
            template_id: plan.template_id,
            target_node: String::new(),
            cpu_cores: plan.cpu_cores,
            memory_mb: plan.memory_gb * 1024,
            disk_gb: plan.storage_gb,
            network_bridge: NETWORK_BRIDGE.to_string(),
            cloud_init: CloudInitConfig {
                ssh_keys: vec![request.ssh_public_key.clone()],
                user_data: Some(user_data),
            },
            tags: vec!["hexabase".to_string(), format!("workspace:{workspace_id}")],
        };

        let node = DedicatedNode {
            id: node_id,
            workspace_id,
            name: request.name,
            specification: plan,
            status: NodeStatus::Provisioning,
            proxmox_vm_id: None,
            proxmox_node: None,
            ip_address: None,
            ssh_public_key: request.ssh_public_key,
            created_at: now,
            updated_at: now,
            deleted_at: None,
        };
        self.repository.create_node(&node).await?;

        self.emit(NodeEvent::new(
            workspace_id,
            node_id,
            "provisioning",
            format!("provisioning {} node '{}'", node_type, node.name),
        ))
        .await;

        Ok(ProvisionPlan {
            node,
            spec,
            was_shared: allocation.plan_type == PlanType::Shared,
        })
    }

    /// Hypervisor half of provisioning: create the VM, record its identity,
    /// move the row to `ready`, and flip the plan when needed.
    async fn complete_provision(&self, plan: ProvisionPlan) -> NodeResult<DedicatedNode> {
        let ProvisionPlan {
            mut node,
            spec,
            was_shared,
        } = plan;
        let workspace_id = node.workspace_id;
        let node_id = node.id;
        let vm_name = spec.name.clone();

        let vm = match tokio::time::timeout(self.provision_timeout, self.virt.create_vm(&spec))
            .await
        {
            Ok(Ok(vm)) => vm,
            Ok(Err(e)) => {
                self.repository
                    .transition_status(node_id, NodeStatus::Provisioning, NodeStatus::Failed)
                    .await?;
                self.emit(NodeEvent::new(
                    workspace_id,
                    node_id,
                    "error",
                    format!("VM creation failed: {e}"),
                ))
                .await;
                return Err(e.into());
            }
            Err(_) => {
                // Never leave the row in a transient state on cancellation
                self.repository
                    .transition_status(node_id, NodeStatus::Provisioning, NodeStatus::Failed)
                    .await?;
                self.emit(NodeEvent::new(
                    workspace_id,
                    node_id,
                    "error",
                    "VM creation exceeded the provisioning deadline",
                ))
                .await;
                return Err(NodeError::Timeout(format!(
                    "node provisioning exceeded {}s",
                    self.provision_timeout.as_secs()
                )));
            }
        };

        node.proxmox_vm_id = Some(vm.vm_id);
        node.proxmox_node = Some(vm.node);
        node.ip_address = vm.ip_address;
        node.updated_at = Utc::now();
        self.repository.update_node(&node).await?;
        self.repository
            .transition_status(node_id, NodeStatus::Provisioning, NodeStatus::Ready)
            .await?;
        node.status = NodeStatus::Ready;

        if was_shared {
            // Best-effort: the node exists either way; a failed flip is
            // repaired later by reconcile_plan
            if let Err(e) = self.transition_to_dedicated(workspace_id).await {
                tracing::error!(workspace_id = %workspace_id,
                    "plan flip to dedicated failed, reconciliation required: {}", e);
                self.emit(NodeEvent::new(
                    workspace_id,
                    node_id,
                    "error",
                    format!("plan transition to dedicated failed: {e}"),
                ))
                .await;
            }
        }

        // The agent joins asynchronously; taints apply once it registers
        let taints = [NodeTaint {
            key: "hexabase.ai/workspace".to_string(),
            value: workspace_id.to_string(),
            effect: "NoSchedule".to_string(),
        }];
        if let Err(e) = self.cluster.apply_node_taints(&vm_name, &taints).await {
            tracing::debug!(node = %vm_name, "taints not applied yet: {}", e);
        }

        self.emit(NodeEvent::new(
            workspace_id,
            node_id,
            "status_change",
            format!("node '{}' is ready (vm {})", node.name, vm.vm_id),
        ))
        .await;

        Ok(node)
    }

    // ---- power actions ----

    pub async fn start_node(&self, id: Uuid) -> NodeResult<DedicatedNode> {
        self.power(id, NodeAction::Start).await
    }

    pub async fn stop_node(&self, id: Uuid) -> NodeResult<DedicatedNode> {
        self.power(id, NodeAction::Stop).await
    }

    pub async fn reboot_node(&self, id: Uuid) -> NodeResult<DedicatedNode> {
        self.power(id, NodeAction::Reboot).await
    }

    async fn power(&self, id: Uuid, action: NodeAction) -> NodeResult<DedicatedNode> {
        let node = self.load(id).await?;

        let Some(transient) = action_transition(node.status, action)? else {
            return Ok(node); // already in the requested state
        };

        let moved = self
            .repository
            .transition_status(id, node.status, transient)
            .await?;
        if !moved {
            return Err(NodeError::Conflict(format!(
                "node {} is being transitioned by another request",
                id
            )));
        }

        self.emit(NodeEvent::new(
            node.workspace_id,
            id,
            "status_change",
            format!("{action}: {} -> {transient}", node.status),
        ))
        .await;

        let vm_id = node.proxmox_vm_id.ok_or_else(|| {
            NodeError::Internal(format!("node {} has no VM attached", id))
        })?;

        let outcome = match action {
            NodeAction::Start => self.virt.start_vm(vm_id).await,
            NodeAction::Stop => self.virt.stop_vm(vm_id).await,
            NodeAction::Reboot => self.virt.reboot_vm(vm_id).await,
            NodeAction::Delete => unreachable!("delete goes through delete_node"),
        };

        match outcome {
            Ok(()) => {
                let settled = match action {
                    NodeAction::Start | NodeAction::Reboot => NodeStatus::Ready,
                    NodeAction::Stop => NodeStatus::Stopped,
                    NodeAction::Delete => unreachable!(),
                };
                self.repository
                    .transition_status(id, transient, settled)
                    .await?;
                self.emit(NodeEvent::new(
                    node.workspace_id,
                    id,
                    "status_change",
                    format!("{action} completed: {transient} -> {settled}"),
                ))
                .await;
                self.load(id).await
            }
            Err(e) => {
                // Restore the pre-action state (start failure leaves the VM
                // stopped, stop failure leaves it running); reboot failures
                // are unrecoverable
                let reverted = match action {
                    NodeAction::Start => NodeStatus::Stopped,
                    NodeAction::Stop => NodeStatus::Ready,
                    NodeAction::Reboot | NodeAction::Delete => NodeStatus::Failed,
                };
                let mut current = self.load(id).await?;
                current.status = reverted;
                current.updated_at = Utc::now();
                self.repository.update_node(&current).await?;

                self.emit(NodeEvent::new(
                    node.workspace_id,
                    id,
                    "error",
                    format!("{action} failed, status reverted to {reverted}: {e}"),
                ))
                .await;
                Err(e.into())
            }
        }
    }

    // ---- deletion ----

    /// Delete transition → `deletion` event → VM delete → soft delete.
    pub async fn delete_node(&self, id: Uuid) -> NodeResult<()> {
        let node = self.load(id).await?;

        let transient = action_transition(node.status, NodeAction::Delete)?
            .expect("delete is never a no-op");
        let moved = self
            .repository
            .transition_status(id, node.status, transient)
            .await?;
        if !moved {
            return Err(NodeError::Conflict(format!(
                "node {} is being transitioned by another request",
                id
            )));
        }

        self.emit(NodeEvent::new(
            node.workspace_id,
            id,
            "deletion",
            format!("deleting node '{}'", node.name),
        ))
        .await;

        if let Some(vm_id) = node.proxmox_vm_id {
            if let Err(e) = self.virt.delete_vm(vm_id).await {
                self.repository
                    .transition_status(id, NodeStatus::Deleting, NodeStatus::Failed)
                    .await?;
                self.emit(NodeEvent::new(
                    node.workspace_id,
                    id,
                    "error",
                    format!("VM deletion failed: {e}"),
                ))
                .await;
                return Err(e.into());
            }
        }

        let mut node = self.load(id).await?;
        node.status = NodeStatus::Deleted;
        node.deleted_at = Some(Utc::now());
        node.updated_at = Utc::now();
        self.repository.update_node(&node).await?;
        Ok(())
    }

    // ---- reads ----

    pub async fn get_node(&self, id: Uuid) -> NodeResult<DedicatedNode> {
        self.load(id).await
    }

    pub async fn list_nodes(&self, workspace_id: Uuid) -> NodeResult<Vec<DedicatedNode>> {
        self.repository.list_nodes(workspace_id).await
    }

    pub async fn list_events(&self, node_id: Uuid) -> NodeResult<Vec<NodeEvent>> {
        self.load(node_id).await?;
        self.repository.list_events(node_id).await
    }

    pub async fn get_allocation(
        &self,
        workspace_id: Uuid,
    ) -> NodeResult<WorkspaceNodeAllocation> {
        self.repository
            .get_allocation(workspace_id)
            .await?
            .ok_or_else(|| {
                NodeError::NotFound(format!("allocation for workspace {}", workspace_id))
            })
    }

    // ---- quota arithmetic ----

    /// Whether the workspace can take a workload of the requested size.
    ///
    /// Shared: the quota must have room on both axes. Dedicated: at least one
    /// node is ready (per-node residual capacity is the scheduler's concern).
    pub async fn can_allocate(
        &self,
        workspace_id: Uuid,
        request: ResourceRequest,
    ) -> NodeResult<bool> {
        let allocation = self.get_allocation(workspace_id).await?;

        match allocation.plan_type {
            PlanType::Shared => {
                let quota = allocation.shared_quota.ok_or_else(|| {
                    NodeError::Internal("shared allocation without quota".to_string())
                })?;
                Ok(quota.cpu_used + request.cpu <= quota.cpu_limit
                    && quota.memory_used + request.memory <= quota.memory_limit)
            }
            PlanType::Dedicated => {
                let nodes = self.repository.list_nodes(workspace_id).await?;
                Ok(nodes.iter().any(|n| n.status == NodeStatus::Ready))
            }
        }
    }

    // ---- plan transitions ----

    /// Back to the shared plan with the default quota. Fails while any
    /// non-deleted dedicated node remains. Idempotent.
    pub async fn transition_to_shared(&self, workspace_id: Uuid) -> NodeResult<()> {
        let nodes = self.repository.list_nodes(workspace_id).await?;
        if !nodes.is_empty() {
            return Err(NodeError::InvalidState(format!(
                "{} dedicated node(s) still exist",
                nodes.len()
            )));
        }

        let allocation =
            WorkspaceNodeAllocation::shared(workspace_id, SharedQuota::default_quota());
        self.repository.upsert_allocation(&allocation).await?;
        tracing::info!(workspace_id = %workspace_id, "workspace on shared plan");
        Ok(())
    }

    /// To the dedicated plan, clearing the shared quota. Idempotent.
    pub async fn transition_to_dedicated(&self, workspace_id: Uuid) -> NodeResult<()> {
        let allocation = WorkspaceNodeAllocation::dedicated(workspace_id);
        self.repository.upsert_allocation(&allocation).await?;
        tracing::info!(workspace_id = %workspace_id, "workspace on dedicated plan");
        Ok(())
    }

    /// Repair a workspace whose plan and node list disagree (e.g. after a
    /// best-effort flip failed during provisioning).
    pub async fn reconcile_plan(&self, workspace_id: Uuid) -> NodeResult<WorkspaceNodeAllocation> {
        let allocation = self.get_allocation(workspace_id).await?;
        let nodes = self.repository.list_nodes(workspace_id).await?;

        match (allocation.plan_type, nodes.is_empty()) {
            (PlanType::Shared, false) => self.transition_to_dedicated(workspace_id).await?,
            (PlanType::Dedicated, true) => self.transition_to_shared(workspace_id).await?,
            _ => return Ok(allocation),
        }
        self.get_allocation(workspace_id).await
    }

    // ---- billing ----

    /// Per-node cost over a billing period, hourly-prorated from the fixed
    /// monthly price. Soft-deleted nodes contribute up to their deletion.
    pub async fn cost_report(
        &self,
        workspace_id: Uuid,
        period: BillingPeriod,
    ) -> NodeResult<CostReport> {
        let nodes = self.repository.list_nodes_with_deleted(workspace_id).await?;

        let mut items = Vec::new();
        let mut total = 0.0;
        for node in nodes {
            let active_start = node.created_at.max(period.start);
            let active_end = node.deleted_at.unwrap_or(period.end).min(period.end);
            if active_end <= active_start {
                continue;
            }

            let hours = (active_end - active_start).num_seconds() as f64 / 3600.0;
            let hourly_rate = node.specification.hourly_rate();
            let cost = hours * hourly_rate;
            total += cost;

            items.push(NodeCost {
                node_id: node.id,
                name: node.name,
                node_type: node.specification.node_type,
                hours,
                hourly_rate,
                cost,
            });
        }

        Ok(CostReport {
            workspace_id,
            period_start: period.start,
            period_end: period.end,
            nodes: items,
            total_usd: total,
        })
    }

    // ---- usage ----

    pub async fn resource_usage(&self, workspace_id: Uuid) -> NodeResult<WorkspaceResourceUsage> {
        let allocation = self.get_allocation(workspace_id).await?;

        match allocation.plan_type {
            PlanType::Shared => Ok(WorkspaceResourceUsage {
                workspace_id,
                plan_type: PlanType::Shared,
                shared: allocation.shared_quota,
                dedicated: None,
            }),
            PlanType::Dedicated => {
                let nodes = self.repository.list_nodes(workspace_id).await?;
                let mut usage = DedicatedUsage {
                    node_count: nodes.len(),
                    active_nodes: nodes
                        .iter()
                        .filter(|n| n.status.can_schedule_workload())
                        .count(),
                    total_cpu_cores: nodes.iter().map(|n| n.specification.cpu_cores).sum(),
                    total_memory_gb: nodes.iter().map(|n| n.specification.memory_gb).sum(),
                    total_storage_gb: nodes.iter().map(|n| n.specification.storage_gb).sum(),
                    live: Vec::new(),
                };

                for node in &nodes {
                    let Some(vm_id) = node.proxmox_vm_id else { continue };
                    if !node.status.can_schedule_workload() {
                        continue;
                    }
                    // Best-effort: a node that doesn't answer is skipped
                    match self.virt.get_resource_usage(vm_id).await {
                        Ok(sample) => usage.live.push(NodeLiveUsage {
                            node_id: node.id,
                            name: node.name.clone(),
                            cpu_percent: sample.cpu_percent,
                            memory_used_mb: sample.memory_used_mb,
                            memory_total_mb: sample.memory_total_mb,
                            disk_used_gb: sample.disk_used_gb,
                            disk_total_gb: sample.disk_total_gb,
                        }),
                        Err(e) => {
                            tracing::debug!(node_id = %node.id, "no usage sample: {}", e);
                        }
                    }
                }

                Ok(WorkspaceResourceUsage {
                    workspace_id,
                    plan_type: PlanType::Dedicated,
                    shared: None,
                    dedicated: Some(usage),
                })
            }
        }
    }

    // ---- agent status ----

    /// K3s agent status with the 5-minute heartbeat staleness rule.
    pub async fn check_agent_status(&self, node_id: Uuid) -> NodeResult<AgentStatus> {
        let node = self.load(node_id).await?;

        if node.status == NodeStatus::Provisioning {
            return Ok(AgentStatus::Provisioning);
        }

        let conditions = self
            .cluster
            .get_node_conditions(&Self::vm_name(node_id))
            .await?;
        let Some(conditions) = conditions else {
            return Ok(AgentStatus::NotFound);
        };

        Ok(match ready_state(&conditions, Utc::now()) {
            NodeReadyState::Ready => AgentStatus::Ready,
            NodeReadyState::Stale => AgentStatus::Stale,
            NodeReadyState::NotReady => AgentStatus::NotReady,
        })
    }

    /// The agent node's condition list (empty when the node is unknown).
    pub async fn agent_conditions(&self, node_id: Uuid) -> NodeResult<Vec<AgentCondition>> {
        self.load(node_id).await?;

        let conditions = self
            .cluster
            .get_node_conditions(&Self::vm_name(node_id))
            .await?
            .unwrap_or_default();

        Ok(conditions
            .into_iter()
            .map(|c| AgentCondition {
                condition_type: c.condition_type,
                status: c.status,
                reason: c.reason,
                message: c.message,
                since: c.last_heartbeat,
            })
            .collect())
    }
}

impl<R: NodeRepository + 'static> NodeAllocationService<R> {
    /// Accept a provisioning request and run the hypervisor work in a
    /// background task; returns the `provisioning` row immediately so the
    /// API can answer 202.
    pub async fn provision_dedicated_node_detached(
        &self,
        workspace_id: Uuid,
        request: ProvisionNodeRequest,
    ) -> NodeResult<DedicatedNode> {
        let plan = self.prepare_provision(workspace_id, request).await?;
        let node = plan.node.clone();

        let this = self.clone();
        let node_id = node.id;
        tokio::spawn(async move {
            if let Err(e) = this.complete_provision(plan).await {
                tracing::error!(node_id = %node_id, "background provisioning failed: {}", e);
            }
        });

        Ok(node)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::repository::InMemoryNodeRepository;
    use async_trait::async_trait;
    use chrono::{Duration as ChronoDuration, TimeZone};
    use kubernetes::{
        AccessReview, ClusterResult, NodeCondition, ResourceQuotas, VClusterSpec,
        WorkloadManifest,
    };
    use proxmox::{
        VirtError, VirtResult, VmConfigUpdate, VmInfo, VmResourceUsage, VmTemplate,
    };
    use std::sync::atomic::{AtomicBool, AtomicU32, Ordering};
    use tokio::sync::RwLock as TokioRwLock;

    #[derive(Default)]
    struct StubVirt {
        create_calls: AtomicU32,
        fail_create: AtomicBool,
        fail_start: AtomicBool,
        fail_stop: AtomicBool,
        fail_delete: AtomicBool,
    }

    #[async_trait]
    impl VirtualizationProvider for StubVirt {
        async fn create_vm(&self, spec: &VmSpec) -> VirtResult<VmInfo> {
            self.create_calls.fetch_add(1, Ordering::SeqCst);
            if self.fail_create.load(Ordering::SeqCst) {
                return Err(VirtError::Unavailable("hypervisor down".to_string()));
            }
            Ok(VmInfo {
                vm_id: 100,
                node: "hv1".to_string(),
                name: spec.name.clone(),
                status: "running".to_string(),
                ip_address: Some("10.0.0.5".to_string()),
            })
        }

        async fn get_vm(&self, vm_id: u32) -> VirtResult<VmInfo> {
            Ok(VmInfo {
                vm_id,
                node: "hv1".to_string(),
                name: "n".to_string(),
                status: "running".to_string(),
                ip_address: None,
            })
        }

        async fn start_vm(&self, _vm_id: u32) -> VirtResult<()> {
            if self.fail_start.load(Ordering::SeqCst) {
                return Err(VirtError::Api {
                    status: 500,
                    message: "start failed".to_string(),
                });
            }
            Ok(())
        }

        async fn stop_vm(&self, _vm_id: u32) -> VirtResult<()> {
            if self.fail_stop.load(Ordering::SeqCst) {
                return Err(VirtError::Api {
                    status: 500,
                    message: "stop failed".to_string(),
                });
            }
            Ok(())
        }

        async fn reboot_vm(&self, _vm_id: u32) -> VirtResult<()> {
            Ok(())
        }

        async fn delete_vm(&self, _vm_id: u32) -> VirtResult<()> {
            if self.fail_delete.load(Ordering::SeqCst) {
                return Err(VirtError::Api {
                    status: 500,
                    message: "delete failed".to_string(),
                });
            }
            Ok(())
        }

        async fn update_config(&self, _vm_id: u32, _config: &VmConfigUpdate) -> VirtResult<()> {
            Ok(())
        }

        async fn get_status(&self, _vm_id: u32) -> VirtResult<String> {
            Ok("running".to_string())
        }

        async fn set_cloud_init(
            &self,
            _vm_id: u32,
            _config: &CloudInitConfig,
        ) -> VirtResult<()> {
            Ok(())
        }

        async fn get_resource_usage(&self, _vm_id: u32) -> VirtResult<VmResourceUsage> {
            Ok(VmResourceUsage {
                cpu_percent: 12.5,
                memory_used_mb: 2048,
                memory_total_mb: 16384,
                disk_used_gb: 20.0,
                disk_total_gb: 200.0,
                uptime_secs: 3600,
            })
        }

        async fn clone_template(&self, _template_id: u32, _name: &str) -> VirtResult<u32> {
            Ok(100)
        }

        async fn list_templates(&self) -> VirtResult<Vec<VmTemplate>> {
            Ok(vec![])
        }
    }

    #[derive(Default)]
    struct StubCluster {
        conditions: TokioRwLock<Option<Vec<NodeCondition>>>,
    }

    impl StubCluster {
        async fn set_conditions(&self, conditions: Option<Vec<NodeCondition>>) {
            *self.conditions.write().await = conditions;
        }
    }

    #[async_trait]
    impl ClusterProvider for StubCluster {
        async fn provision_vcluster(&self, _spec: &VClusterSpec) -> ClusterResult<()> {
            Ok(())
        }
        async fn teardown_vcluster(&self, _instance_name: &str) -> ClusterResult<()> {
            Ok(())
        }
        async fn get_node_conditions(
            &self,
            _node_name: &str,
        ) -> ClusterResult<Option<Vec<NodeCondition>>> {
            Ok(self.conditions.read().await.clone())
        }
        async fn apply_node_taints(
            &self,
            _node_name: &str,
            _taints: &[NodeTaint],
        ) -> ClusterResult<()> {
            Ok(())
        }
        async fn run_subject_access_review(&self, _review: &AccessReview) -> ClusterResult<bool> {
            Ok(true)
        }
        async fn create_project_namespace(
            &self,
            _vcluster: &str,
            _namespace: &str,
            _quotas: Option<&ResourceQuotas>,
        ) -> ClusterResult<()> {
            Ok(())
        }
        async fn delete_project_namespace(
            &self,
            _vcluster: &str,
            _namespace: &str,
        ) -> ClusterResult<()> {
            Ok(())
        }
        async fn apply_workload(
            &self,
            _vcluster: &str,
            _namespace: &str,
            _workload: &WorkloadManifest,
        ) -> ClusterResult<()> {
            Ok(())
        }
        async fn delete_workload(
            &self,
            _vcluster: &str,
            _namespace: &str,
            _kind: &str,
            _name: &str,
        ) -> ClusterResult<()> {
            Ok(())
        }
        async fn restart_workload(
            &self,
            _vcluster: &str,
            _namespace: &str,
            _name: &str,
        ) -> ClusterResult<()> {
            Ok(())
        }
        async fn run_cronjob_now(
            &self,
            _vcluster: &str,
            _namespace: &str,
            _cronjob_name: &str,
            _job_name: &str,
        ) -> ClusterResult<()> {
            Ok(())
        }
    }

    struct Fixture {
        service: NodeAllocationService<InMemoryNodeRepository>,
        repo: Arc<InMemoryNodeRepository>,
        virt: Arc<StubVirt>,
        cluster: Arc<StubCluster>,
        workspace_id: Uuid,
    }

    async fn fixture_shared() -> Fixture {
        let repo = InMemoryNodeRepository::new();
        let virt = Arc::new(StubVirt::default());
        let cluster = Arc::new(StubCluster::default());
        let workspace_id = Uuid::new_v4();

        let allocation = WorkspaceNodeAllocation::shared(
            workspace_id,
            SharedQuota {
                cpu_limit: 2.0,
                memory_limit: 4.0,
                cpu_used: 0.0,
                memory_used: 0.0,
            },
        );
        repo.upsert_allocation(&allocation).await.unwrap();

        Fixture {
            service: NodeAllocationService::new(repo.clone(), virt.clone(), cluster.clone()),
            repo,
            virt,
            cluster,
            workspace_id,
        }
    }

    fn request(name: &str, node_type: &str) -> ProvisionNodeRequest {
        ProvisionNodeRequest {
            name: name.to_string(),
            node_type: node_type.to_string(),
            ssh_public_key: "ssh-rsa AAAA".to_string(),
        }
    }

    #[tokio::test]
    async fn test_provision_first_node_flips_plan() {
        let f = fixture_shared().await;

        let node = f
            .service
            .provision_dedicated_node(f.workspace_id, request("n1", "S-Type"))
            .await
            .unwrap();

        assert_eq!(node.status, NodeStatus::Ready);
        assert_eq!(node.proxmox_vm_id, Some(100));
        assert_eq!(node.proxmox_node.as_deref(), Some("hv1"));
        assert_eq!(node.ip_address.as_deref(), Some("10.0.0.5"));
        let spec = node.specification;
        assert_eq!(
            (spec.cpu_cores, spec.memory_gb, spec.storage_gb),
            (4, 16, 200)
        );

        let allocation = f.service.get_allocation(f.workspace_id).await.unwrap();
        assert_eq!(allocation.plan_type, PlanType::Dedicated);
        assert!(allocation.shared_quota.is_none());

        let events = f.service.list_events(node.id).await.unwrap();
        let types: Vec<&str> = events.iter().map(|e| e.event_type.as_str()).collect();
        assert_eq!(types, vec!["provisioning", "status_change"]);
    }

    #[tokio::test]
    async fn test_provision_rejects_unknown_type_before_any_external_call() {
        let f = fixture_shared().await;

        let result = f
            .service
            .provision_dedicated_node(f.workspace_id, request("n1", "XL-Type"))
            .await;

        assert!(matches!(result, Err(NodeError::Validation(_))));
        assert_eq!(f.virt.create_calls.load(Ordering::SeqCst), 0);
        assert!(f.repo.list_nodes(f.workspace_id).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_provision_vm_failure_marks_node_failed_without_plan_flip() {
        let f = fixture_shared().await;
        f.virt.fail_create.store(true, Ordering::SeqCst);

        let result = f
            .service
            .provision_dedicated_node(f.workspace_id, request("n1", "M-Type"))
            .await;
        assert!(result.is_err());

        let nodes = f.repo.list_nodes(f.workspace_id).await.unwrap();
        assert_eq!(nodes.len(), 1);
        assert_eq!(nodes[0].status, NodeStatus::Failed);

        let allocation = f.service.get_allocation(f.workspace_id).await.unwrap();
        assert_eq!(allocation.plan_type, PlanType::Shared);

        let events = f.service.list_events(nodes[0].id).await.unwrap();
        assert_eq!(events.last().unwrap().event_type, "error");
    }

    #[tokio::test]
    async fn test_stop_start_round_trip() {
        let f = fixture_shared().await;
        let node = f
            .service
            .provision_dedicated_node(f.workspace_id, request("n1", "S-Type"))
            .await
            .unwrap();

        let stopped = f.service.stop_node(node.id).await.unwrap();
        assert_eq!(stopped.status, NodeStatus::Stopped);

        let started = f.service.start_node(node.id).await.unwrap();
        assert_eq!(started.status, NodeStatus::Ready);
    }

    #[tokio::test]
    async fn test_start_on_ready_is_noop() {
        let f = fixture_shared().await;
        let node = f
            .service
            .provision_dedicated_node(f.workspace_id, request("n1", "S-Type"))
            .await
            .unwrap();

        let events_before = f.service.list_events(node.id).await.unwrap().len();
        let same = f.service.start_node(node.id).await.unwrap();
        assert_eq!(same.status, NodeStatus::Ready);
        assert_eq!(f.service.list_events(node.id).await.unwrap().len(), events_before);
    }

    #[tokio::test]
    async fn test_start_failure_reverts_to_stopped() {
        let f = fixture_shared().await;
        let node = f
            .service
            .provision_dedicated_node(f.workspace_id, request("n1", "S-Type"))
            .await
            .unwrap();
        f.service.stop_node(node.id).await.unwrap();

        f.virt.fail_start.store(true, Ordering::SeqCst);
        let result = f.service.start_node(node.id).await;
        assert!(result.is_err());

        let after = f.service.get_node(node.id).await.unwrap();
        assert_eq!(after.status, NodeStatus::Stopped);

        let events = f.service.list_events(node.id).await.unwrap();
        assert_eq!(events.last().unwrap().event_type, "error");
    }

    #[tokio::test]
    async fn test_stop_failure_reverts_to_ready() {
        let f = fixture_shared().await;
        let node = f
            .service
            .provision_dedicated_node(f.workspace_id, request("n1", "S-Type"))
            .await
            .unwrap();

        f.virt.fail_stop.store(true, Ordering::SeqCst);
        assert!(f.service.stop_node(node.id).await.is_err());
        assert_eq!(
            f.service.get_node(node.id).await.unwrap().status,
            NodeStatus::Ready
        );
    }

    #[tokio::test]
    async fn test_delete_soft_deletes_and_records_events() {
        let f = fixture_shared().await;
        let node = f
            .service
            .provision_dedicated_node(f.workspace_id, request("n1", "S-Type"))
            .await
            .unwrap();

        f.service.delete_node(node.id).await.unwrap();

        let after = f.service.get_node(node.id).await.unwrap();
        assert_eq!(after.status, NodeStatus::Deleted);
        assert!(after.deleted_at.is_some());
        assert!(f.repo.list_nodes(f.workspace_id).await.unwrap().is_empty());

        let events = f.service.list_events(node.id).await.unwrap();
        assert!(events.iter().any(|e| e.event_type == "deletion"));
    }

    #[tokio::test]
    async fn test_delete_allowed_from_failed() {
        let f = fixture_shared().await;
        f.virt.fail_create.store(true, Ordering::SeqCst);
        let _ = f
            .service
            .provision_dedicated_node(f.workspace_id, request("n1", "S-Type"))
            .await;
        f.virt.fail_create.store(false, Ordering::SeqCst);

        let failed = &f.repo.list_nodes(f.workspace_id).await.unwrap()[0];
        f.service.delete_node(failed.id).await.unwrap();
        assert_eq!(
            f.service.get_node(failed.id).await.unwrap().status,
            NodeStatus::Deleted
        );
    }

    #[tokio::test]
    async fn test_can_allocate_shared_quota_boundaries() {
        let f = fixture_shared().await;

        assert!(f
            .service
            .can_allocate(f.workspace_id, ResourceRequest { cpu: 2.0, memory: 4.0 })
            .await
            .unwrap());
        assert!(!f
            .service
            .can_allocate(f.workspace_id, ResourceRequest { cpu: 2.1, memory: 1.0 })
            .await
            .unwrap());
        assert!(!f
            .service
            .can_allocate(f.workspace_id, ResourceRequest { cpu: 1.0, memory: 4.5 })
            .await
            .unwrap());
    }

    #[tokio::test]
    async fn test_can_allocate_dedicated_requires_ready_node() {
        let f = fixture_shared().await;
        let node = f
            .service
            .provision_dedicated_node(f.workspace_id, request("n1", "S-Type"))
            .await
            .unwrap();

        assert!(f
            .service
            .can_allocate(f.workspace_id, ResourceRequest { cpu: 8.0, memory: 32.0 })
            .await
            .unwrap());

        f.service.stop_node(node.id).await.unwrap();
        assert!(!f
            .service
            .can_allocate(f.workspace_id, ResourceRequest { cpu: 1.0, memory: 1.0 })
            .await
            .unwrap());
    }

    #[tokio::test]
    async fn test_transition_to_shared_blocked_by_nodes_then_succeeds() {
        let f = fixture_shared().await;
        let node = f
            .service
            .provision_dedicated_node(f.workspace_id, request("n1", "S-Type"))
            .await
            .unwrap();

        assert!(matches!(
            f.service.transition_to_shared(f.workspace_id).await,
            Err(NodeError::InvalidState(_))
        ));

        f.service.delete_node(node.id).await.unwrap();
        f.service.transition_to_shared(f.workspace_id).await.unwrap();
        // Idempotent
        f.service.transition_to_shared(f.workspace_id).await.unwrap();

        let allocation = f.service.get_allocation(f.workspace_id).await.unwrap();
        assert_eq!(allocation.plan_type, PlanType::Shared);
        let quota = allocation.shared_quota.unwrap();
        assert!((quota.cpu_limit - 2.0).abs() < f64::EPSILON);
        assert!((quota.memory_limit - 4.0).abs() < f64::EPSILON);
    }

    #[tokio::test]
    async fn test_cost_report_mid_period_deletion() {
        let f = fixture_shared().await;
        let node = f
            .service
            .provision_dedicated_node(f.workspace_id, request("n1", "S-Type"))
            .await
            .unwrap();

        // Rewrite the lifecycle window to a known billing scenario
        let created = chrono::Utc.with_ymd_and_hms(2026, 6, 10, 0, 0, 0).unwrap();
        let deleted = chrono::Utc.with_ymd_and_hms(2026, 6, 20, 0, 0, 0).unwrap();
        let mut n = f.service.get_node(node.id).await.unwrap();
        n.created_at = created;
        n.deleted_at = Some(deleted);
        f.repo.update_node(&n).await.unwrap();

        let period = BillingPeriod {
            start: chrono::Utc.with_ymd_and_hms(2026, 6, 1, 0, 0, 0).unwrap(),
            end: chrono::Utc.with_ymd_and_hms(2026, 7, 1, 0, 0, 0).unwrap(),
        };
        let report = f.service.cost_report(f.workspace_id, period).await.unwrap();

        assert_eq!(report.nodes.len(), 1);
        let item = &report.nodes[0];
        assert!((item.hours - 240.0).abs() < 1e-9);
        let expected = 240.0 * (99.99 / 720.0);
        assert!((item.cost - expected).abs() < 1e-9);
        assert!((report.total_usd - expected).abs() < 1e-9);
    }

    #[tokio::test]
    async fn test_cost_report_clips_to_period_start() {
        let f = fixture_shared().await;
        let node = f
            .service
            .provision_dedicated_node(f.workspace_id, request("n1", "L-Type"))
            .await
            .unwrap();

        let mut n = f.service.get_node(node.id).await.unwrap();
        n.created_at = chrono::Utc.with_ymd_and_hms(2026, 5, 1, 0, 0, 0).unwrap();
        f.repo.update_node(&n).await.unwrap();

        let period = BillingPeriod {
            start: chrono::Utc.with_ymd_and_hms(2026, 6, 1, 0, 0, 0).unwrap(),
            end: chrono::Utc.with_ymd_and_hms(2026, 6, 2, 0, 0, 0).unwrap(),
        };
        let report = f.service.cost_report(f.workspace_id, period).await.unwrap();
        assert!((report.nodes[0].hours - 24.0).abs() < 1e-9);
    }

    #[tokio::test]
    async fn test_resource_usage_dedicated_sums_and_samples() {
        let f = fixture_shared().await;
        f.service
            .provision_dedicated_node(f.workspace_id, request("n1", "S-Type"))
            .await
            .unwrap();
        f.service
            .provision_dedicated_node(f.workspace_id, request("n2", "M-Type"))
            .await
            .unwrap();

        let usage = f.service.resource_usage(f.workspace_id).await.unwrap();
        assert_eq!(usage.plan_type, PlanType::Dedicated);
        let dedicated = usage.dedicated.unwrap();
        assert_eq!(dedicated.node_count, 2);
        assert_eq!(dedicated.active_nodes, 2);
        assert_eq!(dedicated.total_cpu_cores, 12);
        assert_eq!(dedicated.total_memory_gb, 48);
        assert_eq!(dedicated.live.len(), 2);
    }

    fn ready_condition(age_minutes: i64) -> NodeCondition {
        NodeCondition {
            condition_type: "Ready".to_string(),
            status: "True".to_string(),
            reason: Some("KubeletReady".to_string()),
            message: None,
            last_heartbeat: Some(Utc::now() - ChronoDuration::minutes(age_minutes)),
        }
    }

    #[tokio::test]
    async fn test_agent_status_stale_heartbeat() {
        let f = fixture_shared().await;
        let node = f
            .service
            .provision_dedicated_node(f.workspace_id, request("n1", "S-Type"))
            .await
            .unwrap();

        f.cluster.set_conditions(Some(vec![ready_condition(10)])).await;
        assert_eq!(
            f.service.check_agent_status(node.id).await.unwrap(),
            AgentStatus::Stale
        );

        f.cluster.set_conditions(Some(vec![ready_condition(1)])).await;
        assert_eq!(
            f.service.check_agent_status(node.id).await.unwrap(),
            AgentStatus::Ready
        );

        f.cluster.set_conditions(None).await;
        assert_eq!(
            f.service.check_agent_status(node.id).await.unwrap(),
            AgentStatus::NotFound
        );
    }

    #[tokio::test]
    async fn test_agent_status_provisioning_short_circuits() {
        let f = fixture_shared().await;
        f.virt.fail_create.store(true, Ordering::SeqCst);
        let _ = f
            .service
            .provision_dedicated_node(f.workspace_id, request("n1", "S-Type"))
            .await;

        // Re-create a provisioning row directly
        let mut node = f.repo.list_nodes(f.workspace_id).await.unwrap()[0].clone();
        node.status = NodeStatus::Provisioning;
        f.repo.update_node(&node).await.unwrap();

        assert_eq!(
            f.service.check_agent_status(node.id).await.unwrap(),
            AgentStatus::Provisioning
        );
    }

    #[tokio::test]
    async fn test_agent_conditions_mapping() {
        let f = fixture_shared().await;
        let node = f
            .service
            .provision_dedicated_node(f.workspace_id, request("n1", "S-Type"))
            .await
            .unwrap();

        f.cluster.set_conditions(Some(vec![ready_condition(1)])).await;
        let conditions = f.service.agent_conditions(node.id).await.unwrap();
        assert_eq!(conditions.len(), 1);
        assert_eq!(conditions[0].condition_type, "Ready");
        assert!(conditions[0].since.is_some());

        f.cluster.set_conditions(None).await;
        assert!(f.service.agent_conditions(node.id).await.unwrap().is_empty());
    }
}
