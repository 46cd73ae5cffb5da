use axum_helpers::pagination::{ListParams, Page};
use kubernetes::{ClusterProvider, OidcSettings, VClusterSpec};
use std::sync::Arc;
use std::time::Duration;
use uuid::Uuid;
use validator::Validate;

use crate::error::{WorkspaceError, WorkspaceResult};
use crate::models::{CreateWorkspace, UpdateWorkspace, VClusterStatus, Workspace};
use crate::repository::TenancyRepository;

/// Default outer bound for vCluster provisioning.
pub const PROVISION_TIMEOUT: Duration = Duration::from_secs(5 * 60);

/// Workspace lifecycle orchestrator.
///
/// Creation persists the workspace as `pending` and provisions the vCluster
/// from a background task; the status row always reflects the last committed
/// lifecycle step.
pub struct WorkspaceService<R: TenancyRepository> {
    repository: Arc<R>,
    cluster: Arc<dyn ClusterProvider>,
    oidc: OidcSettings,
    provision_timeout: Duration,
}

impl<R: TenancyRepository> Clone for WorkspaceService<R> {
    fn clone(&self) -> Self {
        Self {
            repository: self.repository.clone(),
            cluster: self.cluster.clone(),
            oidc: self.oidc.clone(),
            provision_timeout: self.provision_timeout,
        }
    }
}

impl<R: TenancyRepository + 'static> WorkspaceService<R> {
    pub fn new(repository: Arc<R>, cluster: Arc<dyn ClusterProvider>, oidc: OidcSettings) -> Self {
        Self {
            repository,
            cluster,
            oidc,
            provision_timeout: PROVISION_TIMEOUT,
        }
    }

    pub fn with_provision_timeout(mut self, timeout: Duration) -> Self {
        self.provision_timeout = timeout;
        self
    }

    /// Create a workspace and kick off vCluster provisioning in the background.
    pub async fn create(
        &self,
        organization_id: Uuid,
        input: CreateWorkspace,
    ) -> WorkspaceResult<Workspace> {
        input
            .validate()
            .map_err(|e| WorkspaceError::Validation(e.to_string()))?;

        self.repository
            .get_organization(organization_id)
            .await?
            .ok_or_else(|| {
                WorkspaceError::NotFound(format!("organization {}", organization_id))
            })?;

        let workspace = Workspace::new(organization_id, input);
        self.repository.create_workspace(&workspace).await?;

        let this = self.clone();
        let id = workspace.id;
        tokio::spawn(async move {
            if let Err(e) = this.provision(id).await {
                tracing::error!(workspace_id = %id, "workspace provisioning failed: {}", e);
            }
        });

        Ok(workspace)
    }

    /// Provision the vCluster for a pending workspace.
    ///
    /// Runs in a background task after [`Self::create`]; public so operators
    /// (and tests) can re-drive a failed workspace deterministically.
    pub async fn provision(&self, workspace_id: Uuid) -> WorkspaceResult<Workspace> {
        let mut workspace = self.get_any(workspace_id).await?;

        let instance_name = workspace
            .vcluster_instance_name
            .clone()
            .unwrap_or_else(|| format!("vc-{}", &workspace_id.simple().to_string()[..12]));

        workspace.vcluster_status = VClusterStatus::Creating;
        workspace.vcluster_instance_name = Some(instance_name.clone());
        workspace.updated_at = chrono::Utc::now();
        self.repository.update_workspace(&workspace).await?;

        let spec = VClusterSpec {
            workspace_id,
            instance_name,
            oidc: self.oidc.clone(),
            quotas: None,
        };

        let outcome =
            tokio::time::timeout(self.provision_timeout, self.cluster.provision_vcluster(&spec))
                .await;

        match outcome {
            Ok(Ok(())) => {
                workspace.vcluster_status = VClusterStatus::Running;
                workspace.updated_at = chrono::Utc::now();
                self.repository.update_workspace(&workspace).await?;
                tracing::info!(workspace_id = %workspace_id, "vCluster provisioned");
                Ok(workspace)
            }
            Ok(Err(e)) => {
                workspace.vcluster_status = VClusterStatus::Failed;
                workspace.updated_at = chrono::Utc::now();
                self.repository.update_workspace(&workspace).await?;
                Err(e.into())
            }
            Err(_) => {
                workspace.vcluster_status = VClusterStatus::Failed;
                workspace.updated_at = chrono::Utc::now();
                self.repository.update_workspace(&workspace).await?;
                Err(WorkspaceError::Timeout(format!(
                    "vCluster provisioning exceeded {:?}",
                    self.provision_timeout
                )))
            }
        }
    }

    /// Fetch a workspace scoped to an organization.
    pub async fn get(&self, organization_id: Uuid, id: Uuid) -> WorkspaceResult<Workspace> {
        let workspace = self.get_any(id).await?;
        if workspace.organization_id != organization_id {
            // Do not leak existence across tenants
            return Err(WorkspaceError::NotFound(format!("workspace {}", id)));
        }
        Ok(workspace)
    }

    async fn get_any(&self, id: Uuid) -> WorkspaceResult<Workspace> {
        self.repository
            .get_workspace(id)
            .await?
            .ok_or_else(|| WorkspaceError::NotFound(format!("workspace {}", id)))
    }

    pub async fn list(
        &self,
        organization_id: Uuid,
        params: ListParams,
    ) -> WorkspaceResult<Page<Workspace>> {
        let (items, total) = self
            .repository
            .list_workspaces(organization_id, &params)
            .await?;
        Ok(Page::new(items, total, &params))
    }

    pub async fn update(
        &self,
        organization_id: Uuid,
        id: Uuid,
        input: UpdateWorkspace,
    ) -> WorkspaceResult<Workspace> {
        input
            .validate()
            .map_err(|e| WorkspaceError::Validation(e.to_string()))?;

        let mut workspace = self.get(organization_id, id).await?;
        if let Some(name) = input.name {
            workspace.name = name;
        }
        workspace.updated_at = chrono::Utc::now();
        self.repository.update_workspace(&workspace).await?;
        Ok(workspace)
    }

    /// Check whether a user may perform a verb on a resource inside the
    /// workspace's vCluster, via a SubjectAccessReview on the host cluster.
    pub async fn review_access(
        &self,
        organization_id: Uuid,
        id: Uuid,
        user_id: Uuid,
        verb: &str,
        resource: &str,
    ) -> WorkspaceResult<bool> {
        let workspace = self.get(organization_id, id).await?;

        let review = kubernetes::AccessReview {
            user: user_id.to_string(),
            groups: vec![format!("hexabase:org:{organization_id}")],
            namespace: workspace.vcluster_instance_name.clone(),
            verb: verb.to_string(),
            resource: resource.to_string(),
        };
        Ok(self.cluster.run_subject_access_review(&review).await?)
    }

    /// Delete a workspace: tear down the vCluster, then remove the rows.
    ///
    /// Children are removed by cascading foreign keys when the workspace row
    /// goes; the `deleting` status is visible while teardown runs.
    pub async fn delete(&self, organization_id: Uuid, id: Uuid) -> WorkspaceResult<()> {
        let mut workspace = self.get(organization_id, id).await?;

        if workspace.vcluster_status == VClusterStatus::Deleting {
            return Err(WorkspaceError::InvalidState(
                "workspace is already being deleted".to_string(),
            ));
        }

        workspace.vcluster_status = VClusterStatus::Deleting;
        workspace.updated_at = chrono::Utc::now();
        self.repository.update_workspace(&workspace).await?;

        if let Some(ref instance) = workspace.vcluster_instance_name {
            if let Err(e) = self.cluster.teardown_vcluster(instance).await {
                workspace.vcluster_status = VClusterStatus::Failed;
                workspace.updated_at = chrono::Utc::now();
                self.repository.update_workspace(&workspace).await?;
                return Err(e.into());
            }
        }

        self.repository.delete_workspace(id).await?;
        tracing::info!(workspace_id = %id, "Deleted workspace");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::CreateOrganization;
    use crate::repository::InMemoryTenancyRepository;
    use async_trait::async_trait;
    use axum_helpers::OrgRole;
    use kubernetes::{
        AccessReview, ClusterResult, NodeCondition, NodeTaint, ResourceQuotas, WorkloadManifest,
    };
    use std::sync::atomic::{AtomicBool, AtomicU32, Ordering};

    #[derive(Default)]
    struct StubCluster {
        fail_provision: AtomicBool,
        provisioned: AtomicU32,
        torn_down: AtomicU32,
    }

    #[async_trait]
    impl ClusterProvider for StubCluster {
        async fn provision_vcluster(&self, _spec: &VClusterSpec) -> ClusterResult<()> {
            if self.fail_provision.load(Ordering::SeqCst) {
                return Err(kubernetes::ClusterError::Unavailable("boom".to_string()));
            }
            self.provisioned.fetch_add(1, Ordering::SeqCst);
            Ok(())
        }

        async fn teardown_vcluster(&self, _instance_name: &str) -> ClusterResult<()> {
            self.torn_down.fetch_add(1, Ordering::SeqCst);
            Ok(())
        }

        async fn get_node_conditions(
            &self,
            _node_name: &str,
        ) -> ClusterResult<Option<Vec<NodeCondition>>> {
            Ok(None)
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

    fn oidc() -> OidcSettings {
        OidcSettings {
            issuer_url: "https://auth.test".to_string(),
            client_id: "hexabase".to_string(),
            groups_claim: None,
        }
    }

    async fn seeded_service(
        cluster: Arc<StubCluster>,
    ) -> (WorkspaceService<InMemoryTenancyRepository>, Uuid) {
        let repo = Arc::new(InMemoryTenancyRepository::new());
        let owner = Uuid::new_v4();
        let org = crate::models::Organization::new(
            CreateOrganization {
                name: "acme".to_string(),
            },
            owner,
        );
        let member = crate::models::OrganizationMember {
            organization_id: org.id,
            user_id: owner,
            role: OrgRole::Owner,
        };
        repo.create_organization(&org, &member).await.unwrap();

        (
            WorkspaceService::new(repo, cluster, oidc()),
            org.id,
        )
    }

    #[tokio::test]
    async fn test_create_starts_pending_then_provision_runs_it() {
        let cluster = Arc::new(StubCluster::default());
        let (service, org_id) = seeded_service(cluster.clone()).await;

        let ws = service
            .create(org_id, CreateWorkspace { name: "dev".to_string() })
            .await
            .unwrap();
        assert_eq!(ws.vcluster_status, VClusterStatus::Pending);
        assert_eq!(ws.plan, crate::models::WorkspacePlan::Shared);

        let provisioned = service.provision(ws.id).await.unwrap();
        assert_eq!(provisioned.vcluster_status, VClusterStatus::Running);
        assert!(provisioned.vcluster_instance_name.is_some());
    }

    #[tokio::test]
    async fn test_provision_failure_marks_workspace_failed() {
        let cluster = Arc::new(StubCluster::default());
        cluster.fail_provision.store(true, Ordering::SeqCst);
        let (service, org_id) = seeded_service(cluster.clone()).await;

        let ws = service
            .create(org_id, CreateWorkspace { name: "dev".to_string() })
            .await
            .unwrap();

        assert!(service.provision(ws.id).await.is_err());
        let after = service.get(org_id, ws.id).await.unwrap();
        assert_eq!(after.vcluster_status, VClusterStatus::Failed);
    }

    #[tokio::test]
    async fn test_delete_tears_down_and_removes_row() {
        let cluster = Arc::new(StubCluster::default());
        let (service, org_id) = seeded_service(cluster.clone()).await;

        let ws = service
            .create(org_id, CreateWorkspace { name: "dev".to_string() })
            .await
            .unwrap();
        service.provision(ws.id).await.unwrap();

        service.delete(org_id, ws.id).await.unwrap();
        assert_eq!(cluster.torn_down.load(Ordering::SeqCst), 1);
        assert!(matches!(
            service.get(org_id, ws.id).await,
            Err(WorkspaceError::NotFound(_))
        ));
    }

    #[tokio::test]
    async fn test_get_scoped_to_organization() {
        let cluster = Arc::new(StubCluster::default());
        let (service, org_id) = seeded_service(cluster).await;

        let ws = service
            .create(org_id, CreateWorkspace { name: "dev".to_string() })
            .await
            .unwrap();

        let other_org = Uuid::new_v4();
        assert!(matches!(
            service.get(other_org, ws.id).await,
            Err(WorkspaceError::NotFound(_))
        ));
    }
}
