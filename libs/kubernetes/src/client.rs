use crate::error::{ClusterError, ClusterResult};
use crate::models::{
    AccessReview, NodeCondition, NodeTaint, ResourceQuotas, VClusterSpec, WorkloadManifest,
};
use crate::ClusterProvider;
use async_trait::async_trait;
use k8s_openapi::api::apps::v1::{Deployment, StatefulSet};
use k8s_openapi::api::authorization::v1::{
    ResourceAttributes, SubjectAccessReview, SubjectAccessReviewSpec,
};
use k8s_openapi::api::batch::v1::{CronJob, Job};
use k8s_openapi::api::core::v1::{Namespace, Node, ResourceQuota};
use k8s_openapi::apimachinery::pkg::api::resource::Quantity;
use kube::api::{Api, DeleteParams, ObjectMeta, Patch, PatchParams, PostParams};
use kube::Client;
use serde_json::json;
use std::collections::BTreeMap;

const MANAGED_BY: &str = "hexabase-api";

/// kube-rs adapter against the host cluster.
///
/// vClusters run in dedicated host namespaces; project namespaces inside a
/// vCluster follow the `<instance>-<namespace>` sync convention, so the host
/// client can reach them without a per-vCluster kubeconfig.
pub struct KubeClusterProvider {
    client: Client,
}

impl KubeClusterProvider {
    pub async fn try_default() -> ClusterResult<Self> {
        let client = Client::try_default()
            .await
            .map_err(|e| ClusterError::Unavailable(e.to_string()))?;
        Ok(Self { client })
    }

    pub fn new(client: Client) -> Self {
        Self { client }
    }

    fn synced_namespace(vcluster: &str, namespace: &str) -> String {
        format!("{}-{}", vcluster, namespace)
    }

    fn quota_hard(quotas: &ResourceQuotas) -> BTreeMap<String, Quantity> {
        BTreeMap::from([
            ("requests.cpu".to_string(), Quantity(format!("{}m", quotas.cpu_millis))),
            ("requests.memory".to_string(), Quantity(format!("{}Mi", quotas.memory_mib))),
            ("requests.storage".to_string(), Quantity(format!("{}Gi", quotas.storage_gib))),
            ("pods".to_string(), Quantity(quotas.pods.to_string())),
        ])
    }

    async fn ensure_namespace(
        &self,
        name: &str,
        labels: BTreeMap<String, String>,
        annotations: BTreeMap<String, String>,
    ) -> ClusterResult<()> {
        let api: Api<Namespace> = Api::all(self.client.clone());
        let ns = Namespace {
            metadata: ObjectMeta {
                name: Some(name.to_string()),
                labels: Some(labels),
                annotations: Some(annotations),
                ..Default::default()
            },
            ..Default::default()
        };

        match api.create(&PostParams::default(), &ns).await {
            Ok(_) => Ok(()),
            Err(kube::Error::Api(ae)) if ae.code == 409 => Ok(()), // already provisioned
            Err(e) => Err(e.into()),
        }
    }

    async fn apply_quota(
        &self,
        namespace: &str,
        quotas: &ResourceQuotas,
    ) -> ClusterResult<()> {
        let api: Api<ResourceQuota> = Api::namespaced(self.client.clone(), namespace);
        // Server-side apply wants apiVersion/kind, which typed objects omit
        let manifest = json!({
            "apiVersion": "v1",
            "kind": "ResourceQuota",
            "metadata": { "name": "hexabase-quota" },
            "spec": { "hard": Self::quota_hard(quotas) },
        });

        api.patch(
            "hexabase-quota",
            &PatchParams::apply(MANAGED_BY).force(),
            &Patch::Apply(&manifest),
        )
        .await?;
        Ok(())
    }
}

#[async_trait]
impl ClusterProvider for KubeClusterProvider {
    async fn provision_vcluster(&self, spec: &VClusterSpec) -> ClusterResult<()> {
        let labels = BTreeMap::from([
            ("app.kubernetes.io/managed-by".to_string(), MANAGED_BY.to_string()),
            ("hexabase.ai/vcluster".to_string(), spec.instance_name.clone()),
            ("hexabase.ai/workspace".to_string(), spec.workspace_id.to_string()),
        ]);
        let oidc = serde_json::to_string(&spec.oidc)
            .map_err(|e| ClusterError::InvalidManifest(e.to_string()))?;
        let annotations = BTreeMap::from([
            ("hexabase.ai/oidc-settings".to_string(), oidc),
        ]);

        self.ensure_namespace(&spec.instance_name, labels, annotations)
            .await?;

        if let Some(ref quotas) = spec.quotas {
            self.apply_quota(&spec.instance_name, quotas).await?;
        }

        tracing::info!(instance = %spec.instance_name, "vCluster namespace provisioned");
        Ok(())
    }

    async fn teardown_vcluster(&self, instance_name: &str) -> ClusterResult<()> {
        let api: Api<Namespace> = Api::all(self.client.clone());
        match api.delete(instance_name, &DeleteParams::default()).await {
            Ok(_) => Ok(()),
            Err(kube::Error::Api(ae)) if ae.code == 404 => Ok(()), // already gone
            Err(e) => Err(e.into()),
        }
    }

    async fn get_node_conditions(
        &self,
        node_name: &str,
    ) -> ClusterResult<Option<Vec<NodeCondition>>> {
        let api: Api<Node> = Api::all(self.client.clone());
        let Some(node) = api.get_opt(node_name).await? else {
            return Ok(None);
        };

        let conditions = node
            .status
            .and_then(|s| s.conditions)
            .unwrap_or_default()
            .into_iter()
            .map(|c| NodeCondition {
                condition_type: c.type_,
                status: c.status,
                reason: c.reason,
                message: c.message,
                last_heartbeat: c.last_heartbeat_time.map(|t| t.0),
            })
            .collect();

        Ok(Some(conditions))
    }

    async fn apply_node_taints(&self, node_name: &str, taints: &[NodeTaint]) -> ClusterResult<()> {
        let api: Api<Node> = Api::all(self.client.clone());
        let taints: Vec<serde_json::Value> = taints
            .iter()
            .map(|t| {
                json!({
                    "key": t.key,
                    "value": t.value,
                    "effect": t.effect,
                })
            })
            .collect();

        api.patch(
            node_name,
            &PatchParams::default(),
            &Patch::Merge(json!({ "spec": { "taints": taints } })),
        )
        .await?;
        Ok(())
    }

    async fn run_subject_access_review(&self, review: &AccessReview) -> ClusterResult<bool> {
        let api: Api<SubjectAccessReview> = Api::all(self.client.clone());
        let sar = SubjectAccessReview {
            metadata: ObjectMeta::default(),
            spec: SubjectAccessReviewSpec {
                user: Some(review.user.clone()),
                groups: Some(review.groups.clone()),
                resource_attributes: Some(ResourceAttributes {
                    namespace: review.namespace.clone(),
                    verb: Some(review.verb.clone()),
                    resource: Some(review.resource.clone()),
                    ..Default::default()
                }),
                ..Default::default()
            },
            ..Default::default()
        };

        let created = api.create(&PostParams::default(), &sar).await?;
        Ok(created.status.map(|s| s.allowed).unwrap_or(false))
    }

    async fn create_project_namespace(
        &self,
        vcluster: &str,
        namespace: &str,
        quotas: Option<&ResourceQuotas>,
    ) -> ClusterResult<()> {
        let name = Self::synced_namespace(vcluster, namespace);
        let labels = BTreeMap::from([
            ("app.kubernetes.io/managed-by".to_string(), MANAGED_BY.to_string()),
            ("hexabase.ai/vcluster".to_string(), vcluster.to_string()),
        ]);
        self.ensure_namespace(&name, labels, BTreeMap::new()).await?;

        if let Some(quotas) = quotas {
            self.apply_quota(&name, quotas).await?;
        }
        Ok(())
    }

    async fn delete_project_namespace(
        &self,
        vcluster: &str,
        namespace: &str,
    ) -> ClusterResult<()> {
        let api: Api<Namespace> = Api::all(self.client.clone());
        let name = Self::synced_namespace(vcluster, namespace);
        match api.delete(&name, &DeleteParams::default()).await {
            Ok(_) => Ok(()),
            Err(kube::Error::Api(ae)) if ae.code == 404 => Ok(()),
            Err(e) => Err(e.into()),
        }
    }

    async fn apply_workload(
        &self,
        vcluster: &str,
        namespace: &str,
        workload: &WorkloadManifest,
    ) -> ClusterResult<()> {
        let ns = Self::synced_namespace(vcluster, namespace);
        let params = PatchParams::apply(MANAGED_BY).force();

        match workload.kind.as_str() {
            "Deployment" => {
                let api: Api<Deployment> = Api::namespaced(self.client.clone(), &ns);
                api.patch(&workload.name, &params, &Patch::Apply(&workload.manifest))
                    .await?;
            }
            "StatefulSet" => {
                let api: Api<StatefulSet> = Api::namespaced(self.client.clone(), &ns);
                api.patch(&workload.name, &params, &Patch::Apply(&workload.manifest))
                    .await?;
            }
            "CronJob" => {
                let api: Api<CronJob> = Api::namespaced(self.client.clone(), &ns);
                api.patch(&workload.name, &params, &Patch::Apply(&workload.manifest))
                    .await?;
            }
            other => {
                return Err(ClusterError::InvalidManifest(format!(
                    "unsupported workload kind '{other}'"
                )))
            }
        }
        Ok(())
    }

    async fn delete_workload(
        &self,
        vcluster: &str,
        namespace: &str,
        kind: &str,
        name: &str,
    ) -> ClusterResult<()> {
        let ns = Self::synced_namespace(vcluster, namespace);
        let dp = DeleteParams::default();

        let result = match kind {
            "Deployment" => {
                let api: Api<Deployment> = Api::namespaced(self.client.clone(), &ns);
                api.delete(name, &dp).await.map(|_| ())
            }
            "StatefulSet" => {
                let api: Api<StatefulSet> = Api::namespaced(self.client.clone(), &ns);
                api.delete(name, &dp).await.map(|_| ())
            }
            "CronJob" => {
                let api: Api<CronJob> = Api::namespaced(self.client.clone(), &ns);
                api.delete(name, &dp).await.map(|_| ())
            }
            other => {
                return Err(ClusterError::InvalidManifest(format!(
                    "unsupported workload kind '{other}'"
                )))
            }
        };

        match result {
            Ok(()) => Ok(()),
            Err(kube::Error::Api(ae)) if ae.code == 404 => Ok(()),
            Err(e) => Err(e.into()),
        }
    }

    async fn restart_workload(
        &self,
        vcluster: &str,
        namespace: &str,
        name: &str,
    ) -> ClusterResult<()> {
        let ns = Self::synced_namespace(vcluster, namespace);
        let api: Api<Deployment> = Api::namespaced(self.client.clone(), &ns);

        api.patch(
            name,
            &PatchParams::default(),
            &Patch::Merge(json!({
                "spec": {
                    "template": {
                        "metadata": {
                            "annotations": {
                                "hexabase.ai/restarted-at": chrono::Utc::now().to_rfc3339(),
                            }
                        }
                    }
                }
            })),
        )
        .await?;
        Ok(())
    }

    async fn run_cronjob_now(
        &self,
        vcluster: &str,
        namespace: &str,
        cronjob_name: &str,
        job_name: &str,
    ) -> ClusterResult<()> {
        let ns = Self::synced_namespace(vcluster, namespace);
        let cronjobs: Api<CronJob> = Api::namespaced(self.client.clone(), &ns);
        let cronjob = cronjobs
            .get_opt(cronjob_name)
            .await?
            .ok_or_else(|| ClusterError::NotFound(format!("cronjob {cronjob_name}")))?;

        let job_spec = cronjob
            .spec
            .map(|s| s.job_template)
            .and_then(|t| t.spec)
            .ok_or_else(|| {
                ClusterError::InvalidManifest(format!("cronjob {cronjob_name} has no job template"))
            })?;

        let job = Job {
            metadata: ObjectMeta {
                name: Some(job_name.to_string()),
                labels: Some(BTreeMap::from([(
                    "hexabase.ai/triggered-from".to_string(),
                    cronjob_name.to_string(),
                )])),
                ..Default::default()
            },
            spec: Some(job_spec),
            ..Default::default()
        };

        let jobs: Api<Job> = Api::namespaced(self.client.clone(), &ns);
        jobs.create(&PostParams::default(), &job).await?;
        Ok(())
    }
}
