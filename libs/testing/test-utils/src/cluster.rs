use async_trait::async_trait;
use kubernetes::{
    AccessReview, ClusterProvider, ClusterResult, NodeCondition, NodeTaint, ResourceQuotas,
    VClusterSpec, WorkloadManifest,
};

/// No-op cluster provider for tests that do not care about Kubernetes.
#[derive(Debug, Default, Clone)]
pub struct NullCluster;

#[async_trait]
impl ClusterProvider for NullCluster {
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
        Ok(None)
    }

    async fn apply_node_taints(&self, _node_name: &str, _taints: &[NodeTaint]) -> ClusterResult<()> {
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
