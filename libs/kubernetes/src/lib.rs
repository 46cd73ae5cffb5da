//! Kubernetes port: vCluster lifecycle, node inspection, and workload
//! application on the host cluster.
//!
//! [`ClusterProvider`] is the interface the orchestration core composes;
//! [`KubeClusterProvider`] is the kube-rs adapter against the host cluster.

mod client;
mod error;
mod models;

pub use client::KubeClusterProvider;
pub use error::{ClusterError, ClusterResult};
pub use models::{
    ready_state, AccessReview, NodeCondition, NodeReadyState, NodeTaint, OidcSettings,
    ResourceQuotas, VClusterSpec, WorkloadManifest, STALE_HEARTBEAT,
};

use async_trait::async_trait;

#[async_trait]
pub trait ClusterProvider: Send + Sync {
    /// Provision a vCluster instance with OIDC and quota settings applied.
    async fn provision_vcluster(&self, spec: &VClusterSpec) -> ClusterResult<()>;

    /// Tear down a vCluster instance and everything inside it.
    async fn teardown_vcluster(&self, instance_name: &str) -> ClusterResult<()>;

    /// Conditions of a host-cluster node; `None` when the node is unknown.
    async fn get_node_conditions(
        &self,
        node_name: &str,
    ) -> ClusterResult<Option<Vec<NodeCondition>>>;

    async fn apply_node_taints(&self, node_name: &str, taints: &[NodeTaint]) -> ClusterResult<()>;

    /// SubjectAccessReview against the host cluster; returns `allowed`.
    async fn run_subject_access_review(&self, review: &AccessReview) -> ClusterResult<bool>;

    /// Create a project namespace inside a vCluster, with optional quotas.
    async fn create_project_namespace(
        &self,
        vcluster: &str,
        namespace: &str,
        quotas: Option<&ResourceQuotas>,
    ) -> ClusterResult<()>;

    async fn delete_project_namespace(&self, vcluster: &str, namespace: &str)
        -> ClusterResult<()>;

    /// Apply an opaque workload manifest into a project namespace.
    async fn apply_workload(
        &self,
        vcluster: &str,
        namespace: &str,
        workload: &WorkloadManifest,
    ) -> ClusterResult<()>;

    async fn delete_workload(
        &self,
        vcluster: &str,
        namespace: &str,
        kind: &str,
        name: &str,
    ) -> ClusterResult<()>;

    /// Rolling restart of a deployment-backed workload.
    async fn restart_workload(
        &self,
        vcluster: &str,
        namespace: &str,
        name: &str,
    ) -> ClusterResult<()>;

    /// Run an ad-hoc job cloned from a CronJob's template.
    async fn run_cronjob_now(
        &self,
        vcluster: &str,
        namespace: &str,
        cronjob_name: &str,
        job_name: &str,
    ) -> ClusterResult<()>;
}
