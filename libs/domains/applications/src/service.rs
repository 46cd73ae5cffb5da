use axum_helpers::pagination::{ListParams, Page};
use chrono::Utc;
use domain_workspaces::repository::TenancyRepository;
use domain_workspaces::models::{Project, Workspace, WorkspacePlan};
use kubernetes::{ClusterProvider, WorkloadManifest};
use serde_json::json;
use std::collections::HashMap;
use std::sync::Arc;
use uuid::Uuid;
use validator::Validate;

use crate::error::{ApplicationError, ApplicationResult};
use crate::models::{
    validate_cron_expression, AppKind, AppSource, AppStatus, Application, BackupPolicy,
    CreateApplication, CreateBackupPolicy, CronJobExecution, ExecutionStatus,
    SaveAsTemplateRequest, Toleration, UpdateApplication, UpdateBackupPolicy,
    UpdateScheduleRequest,
};
use crate::repository::ApplicationRepository;

const WORKSPACE_POOL_KEY: &str = "hexabase.ai/workspace";

/// Application and CronJob service.
///
/// Composes the tenancy repository for plan-aware scheduling decisions: in a
/// dedicated workspace every workload is pinned to the workspace's node pool;
/// users cannot target an individual node.
pub struct ApplicationService<R: ApplicationRepository> {
    repository: Arc<R>,
    tenancy: Arc<dyn TenancyRepository>,
    cluster: Arc<dyn ClusterProvider>,
}

impl<R: ApplicationRepository> Clone for ApplicationService<R> {
    fn clone(&self) -> Self {
        Self {
            repository: self.repository.clone(),
            tenancy: self.tenancy.clone(),
            cluster: self.cluster.clone(),
        }
    }
}

impl<R: ApplicationRepository> ApplicationService<R> {
    pub fn new(
        repository: Arc<R>,
        tenancy: Arc<dyn TenancyRepository>,
        cluster: Arc<dyn ClusterProvider>,
    ) -> Self {
        Self {
            repository,
            tenancy,
            cluster,
        }
    }

    async fn load_scope(
        &self,
        workspace_id: Uuid,
        project_id: Uuid,
    ) -> ApplicationResult<(Workspace, Project)> {
        let workspace = self
            .tenancy
            .get_workspace(workspace_id)
            .await
            .map_err(|e| ApplicationError::Internal(e.to_string()))?
            .ok_or_else(|| ApplicationError::NotFound(format!("workspace {}", workspace_id)))?;

        let project = self
            .tenancy
            .get_project(project_id)
            .await
            .map_err(|e| ApplicationError::Internal(e.to_string()))?
            .filter(|p| p.workspace_id == workspace_id)
            .ok_or_else(|| ApplicationError::NotFound(format!("project {}", project_id)))?;

        Ok((workspace, project))
    }

    async fn load_app(&self, workspace_id: Uuid, id: Uuid) -> ApplicationResult<Application> {
        self.repository
            .get_application(workspace_id, id)
            .await?
            .ok_or_else(|| ApplicationError::NotFound(format!("application {}", id)))
    }

    /// Apply (or re-apply) the application's manifest into its namespace.
    async fn deploy(&self, workspace: &Workspace, project: &Project, app: &Application)
        -> ApplicationResult<()>
    {
        // Templates are never deployed
        if app.is_template {
            return Ok(());
        }
        let Some(ref instance) = workspace.vcluster_instance_name else {
            return Ok(()); // vCluster still provisioning; picked up on next deploy
        };

        let manifest = build_manifest(app, &project.namespace);
        self.cluster
            .apply_workload(instance, &project.namespace, &manifest)
            .await?;
        Ok(())
    }

    // ---- CRUD ----

    pub async fn create(
        &self,
        workspace_id: Uuid,
        project_id: Uuid,
        mut input: CreateApplication,
    ) -> ApplicationResult<Application> {
        input
            .validate()
            .map_err(|e| ApplicationError::Validation(e.to_string()))?;

        let (workspace, project) = self.load_scope(workspace_id, project_id).await?;

        // Instantiating from a template copies the workload shape
        let template_id = input.template_app_id;
        if let Some(template_id) = template_id {
            let template = self.load_app(workspace_id, template_id).await?;
            if !template.is_template {
                return Err(ApplicationError::Validation(format!(
                    "application {} is not a template",
                    template_id
                )));
            }
            input.kind = template.kind;
            input.cron_schedule = input.cron_schedule.or(template.cron_schedule);
            input.command = input.command.or(template.command);
            input.args = input.args.or(template.args);
            if input.env.is_empty() {
                input.env = template.env;
            }
        }

        match input.kind {
            AppKind::Cronjob => {
                let schedule = input.cron_schedule.as_deref().ok_or_else(|| {
                    ApplicationError::Validation("cronjob needs a cron_schedule".to_string())
                })?;
                validate_cron_expression(schedule).map_err(ApplicationError::Validation)?;
            }
            _ => {
                if input.cron_schedule.is_some() {
                    return Err(ApplicationError::Validation(
                        "cron_schedule is only valid for cronjobs".to_string(),
                    ));
                }
                if input.replicas < 0 {
                    return Err(ApplicationError::Validation(
                        "replicas cannot be negative".to_string(),
                    ));
                }
            }
        }

        // Dedicated plans pin workloads to the workspace pool
        let (node_selector, tolerations) = placement_for(&workspace);

        let now = Utc::now();
        let app = Application {
            id: Uuid::now_v7(),
            workspace_id,
            project_id,
            name: input.name,
            kind: input.kind,
            source: input.source,
            replicas: input.replicas,
            env: input.env,
            ports: input.ports,
            strategy: input.strategy,
            status: AppStatus::Pending,
            cron_schedule: input.cron_schedule,
            command: input.command,
            args: input.args,
            template_app_id: template_id,
            is_template: false,
            node_selector,
            tolerations,
            created_at: now,
            updated_at: now,
        };
        self.repository.create_application(&app).await?;

        self.deploy(&workspace, &project, &app).await?;

        let mut app = app;
        app.status = AppStatus::Running;
        self.repository.update_application(&app).await?;

        tracing::info!(application_id = %app.id, kind = %app.kind, "Created application");
        Ok(app)
    }

    pub async fn get(&self, workspace_id: Uuid, id: Uuid) -> ApplicationResult<Application> {
        self.load_app(workspace_id, id).await
    }

    pub async fn list(
        &self,
        project_id: Uuid,
        params: ListParams,
    ) -> ApplicationResult<Page<Application>> {
        let (items, total) = self.repository.list_applications(project_id, &params).await?;
        Ok(Page::new(items, total, &params))
    }

    pub async fn update(
        &self,
        workspace_id: Uuid,
        id: Uuid,
        input: UpdateApplication,
    ) -> ApplicationResult<Application> {
        input
            .validate()
            .map_err(|e| ApplicationError::Validation(e.to_string()))?;

        let mut app = self.load_app(workspace_id, id).await?;

        if let Some(ref schedule) = input.cron_schedule {
            if app.kind != AppKind::Cronjob {
                return Err(ApplicationError::Validation(
                    "cron_schedule is only valid for cronjobs".to_string(),
                ));
            }
            // A linked backup policy owns the schedule
            if self.repository.get_backup_policy(id).await?.is_some() {
                return Err(ApplicationError::InvalidState(
                    "schedule is managed by the linked backup policy".to_string(),
                ));
            }
            validate_cron_expression(schedule).map_err(ApplicationError::Validation)?;
        }

        if let Some(source) = input.source {
            app.source = source;
        }
        if let Some(replicas) = input.replicas {
            if replicas < 0 {
                return Err(ApplicationError::Validation(
                    "replicas cannot be negative".to_string(),
                ));
            }
            app.replicas = replicas;
        }
        if let Some(env) = input.env {
            app.env = env;
        }
        if let Some(ports) = input.ports {
            app.ports = ports;
        }
        if let Some(strategy) = input.strategy {
            app.strategy = strategy;
        }
        if let Some(schedule) = input.cron_schedule {
            app.cron_schedule = Some(schedule);
        }
        if let Some(command) = input.command {
            app.command = Some(command);
        }
        if let Some(args) = input.args {
            app.args = Some(args);
        }
        app.updated_at = Utc::now();
        self.repository.update_application(&app).await?;

        let (workspace, project) = self.load_scope(workspace_id, app.project_id).await?;
        self.deploy(&workspace, &project, &app).await?;
        Ok(app)
    }

    pub async fn delete(&self, workspace_id: Uuid, id: Uuid) -> ApplicationResult<()> {
        let app = self.load_app(workspace_id, id).await?;
        let (workspace, project) = self.load_scope(workspace_id, app.project_id).await?;

        if let Some(ref instance) = workspace.vcluster_instance_name {
            if !app.is_template {
                self.cluster
                    .delete_workload(instance, &project.namespace, workload_kind(app.kind), &app.name)
                    .await?;
            }
        }

        self.repository.delete_application(workspace_id, id).await?;
        tracing::info!(application_id = %id, "Deleted application");
        Ok(())
    }

    // ---- operations ----

    pub async fn scale(
        &self,
        workspace_id: Uuid,
        id: Uuid,
        replicas: i32,
    ) -> ApplicationResult<Application> {
        if replicas < 0 {
            return Err(ApplicationError::Validation(
                "replicas cannot be negative".to_string(),
            ));
        }

        let mut app = self.load_app(workspace_id, id).await?;
        if app.kind == AppKind::Cronjob {
            return Err(ApplicationError::InvalidState(
                "cronjobs cannot be scaled".to_string(),
            ));
        }

        app.replicas = replicas;
        app.updated_at = Utc::now();
        self.repository.update_application(&app).await?;

        let (workspace, project) = self.load_scope(workspace_id, app.project_id).await?;
        self.deploy(&workspace, &project, &app).await?;

        tracing::info!(application_id = %id, replicas, "Scaled application");
        Ok(app)
    }

    pub async fn restart(&self, workspace_id: Uuid, id: Uuid) -> ApplicationResult<()> {
        let app = self.load_app(workspace_id, id).await?;
        if app.kind == AppKind::Cronjob {
            return Err(ApplicationError::InvalidState(
                "cronjobs run to completion; use trigger instead".to_string(),
            ));
        }

        let (workspace, project) = self.load_scope(workspace_id, app.project_id).await?;
        if let Some(ref instance) = workspace.vcluster_instance_name {
            self.cluster
                .restart_workload(instance, &project.namespace, &app.name)
                .await?;
        }
        Ok(())
    }

    // ---- cronjob operations ----

    /// Run a CronJob immediately with a generated job name.
    pub async fn trigger_now(
        &self,
        workspace_id: Uuid,
        id: Uuid,
    ) -> ApplicationResult<CronJobExecution> {
        let app = self.load_app(workspace_id, id).await?;
        if app.kind != AppKind::Cronjob {
            return Err(ApplicationError::InvalidState(
                "only cronjobs can be triggered".to_string(),
            ));
        }

        let job_name = format!(
            "{}-manual-{}",
            app.name,
            &Uuid::new_v4().simple().to_string()[..8]
        );

        let (workspace, project) = self.load_scope(workspace_id, app.project_id).await?;
        if let Some(ref instance) = workspace.vcluster_instance_name {
            self.cluster
                .run_cronjob_now(instance, &project.namespace, &app.name, &job_name)
                .await?;
        }

        let execution = CronJobExecution {
            id: Uuid::now_v7(),
            application_id: id,
            job_name,
            started_at: Utc::now(),
            completed_at: None,
            status: ExecutionStatus::Running,
            exit_code: None,
            logs: None,
        };
        self.repository.create_execution(&execution).await?;

        tracing::info!(application_id = %id, job_name = %execution.job_name, "Triggered cronjob");
        Ok(execution)
    }

    /// Record a run's outcome (invoked by the execution watcher).
    pub async fn record_execution_result(
        &self,
        workspace_id: Uuid,
        execution: CronJobExecution,
    ) -> ApplicationResult<()> {
        self.load_app(workspace_id, execution.application_id).await?;
        self.repository.update_execution(&execution).await
    }

    pub async fn list_executions(
        &self,
        workspace_id: Uuid,
        id: Uuid,
        params: ListParams,
    ) -> ApplicationResult<Page<CronJobExecution>> {
        self.load_app(workspace_id, id).await?;
        let (items, total) = self.repository.list_executions(id, &params).await?;
        Ok(Page::new(items, total, &params))
    }

    /// Direct schedule edit; rejected while a backup policy owns the schedule.
    pub async fn update_schedule(
        &self,
        workspace_id: Uuid,
        id: Uuid,
        request: UpdateScheduleRequest,
    ) -> ApplicationResult<Application> {
        self.update(
            workspace_id,
            id,
            UpdateApplication {
                cron_schedule: Some(request.cron_schedule),
                ..Default::default()
            },
        )
        .await
    }

    /// Clone an application into a reusable template.
    pub async fn save_as_template(
        &self,
        workspace_id: Uuid,
        id: Uuid,
        request: SaveAsTemplateRequest,
    ) -> ApplicationResult<Application> {
        request
            .validate()
            .map_err(|e| ApplicationError::Validation(e.to_string()))?;

        let app = self.load_app(workspace_id, id).await?;
        let now = Utc::now();
        let template = Application {
            id: Uuid::now_v7(),
            name: request.name,
            status: AppStatus::Pending,
            is_template: true,
            template_app_id: None,
            node_selector: HashMap::new(),
            tolerations: Vec::new(),
            created_at: now,
            updated_at: now,
            ..app
        };
        self.repository.create_application(&template).await?;

        tracing::info!(template_id = %template.id, from = %id, "Saved application as template");
        Ok(template)
    }

    // ---- backup policies ----

    pub async fn create_backup_policy(
        &self,
        workspace_id: Uuid,
        id: Uuid,
        input: CreateBackupPolicy,
    ) -> ApplicationResult<BackupPolicy> {
        input
            .validate()
            .map_err(|e| ApplicationError::Validation(e.to_string()))?;
        validate_cron_expression(&input.schedule).map_err(ApplicationError::Validation)?;

        let app = self.load_app(workspace_id, id).await?;

        let now = Utc::now();
        let policy = BackupPolicy {
            id: Uuid::now_v7(),
            application_id: id,
            storage_id: input.storage_id,
            schedule: input.schedule,
            retention_days: input.retention_days,
            include_volumes: input.include_volumes,
            include_database: input.include_database,
            compression: input.compression,
            encryption: input.encryption,
            created_at: now,
            updated_at: now,
        };
        self.repository.create_backup_policy(&policy).await?;

        // A linked CronJob immediately follows the policy's schedule
        if app.kind == AppKind::Cronjob {
            self.sync_schedule_from_policy(workspace_id, &app, &policy.schedule)
                .await?;
        }
        Ok(policy)
    }

    pub async fn get_backup_policy(
        &self,
        workspace_id: Uuid,
        id: Uuid,
    ) -> ApplicationResult<BackupPolicy> {
        self.load_app(workspace_id, id).await?;
        self.repository
            .get_backup_policy(id)
            .await?
            .ok_or_else(|| {
                ApplicationError::NotFound(format!("backup policy for application {}", id))
            })
    }

    /// Update the policy; a schedule change propagates to the linked CronJob
    /// (the policy is the source of truth).
    pub async fn update_backup_policy(
        &self,
        workspace_id: Uuid,
        id: Uuid,
        input: UpdateBackupPolicy,
    ) -> ApplicationResult<BackupPolicy> {
        input
            .validate()
            .map_err(|e| ApplicationError::Validation(e.to_string()))?;

        let app = self.load_app(workspace_id, id).await?;
        let mut policy = self.get_backup_policy(workspace_id, id).await?;

        let schedule_changed = match input.schedule {
            Some(ref schedule) => {
                validate_cron_expression(schedule).map_err(ApplicationError::Validation)?;
                policy.schedule = schedule.clone();
                true
            }
            None => false,
        };
        if let Some(retention_days) = input.retention_days {
            policy.retention_days = retention_days;
        }
        if let Some(include_volumes) = input.include_volumes {
            policy.include_volumes = include_volumes;
        }
        if let Some(include_database) = input.include_database {
            policy.include_database = include_database;
        }
        if let Some(compression) = input.compression {
            policy.compression = compression;
        }
        if let Some(encryption) = input.encryption {
            policy.encryption = encryption;
        }
        policy.updated_at = Utc::now();
        self.repository.update_backup_policy(&policy).await?;

        if schedule_changed && app.kind == AppKind::Cronjob {
            self.sync_schedule_from_policy(workspace_id, &app, &policy.schedule)
                .await?;
        }
        Ok(policy)
    }

    pub async fn delete_backup_policy(&self, workspace_id: Uuid, id: Uuid) -> ApplicationResult<()> {
        self.load_app(workspace_id, id).await?;
        if !self.repository.delete_backup_policy(id).await? {
            return Err(ApplicationError::NotFound(format!(
                "backup policy for application {}",
                id
            )));
        }
        Ok(())
    }

    async fn sync_schedule_from_policy(
        &self,
        workspace_id: Uuid,
        app: &Application,
        schedule: &str,
    ) -> ApplicationResult<()> {
        let mut app = app.clone();
        app.cron_schedule = Some(schedule.to_string());
        app.updated_at = Utc::now();
        self.repository.update_application(&app).await?;

        let (workspace, project) = self.load_scope(workspace_id, app.project_id).await?;
        self.deploy(&workspace, &project, &app).await?;
        Ok(())
    }
}

/// Placement for a workspace: dedicated plans pin onto the workspace pool.
fn placement_for(workspace: &Workspace) -> (HashMap<String, String>, Vec<Toleration>) {
    match workspace.plan {
        WorkspacePlan::Dedicated => (
            HashMap::from([(WORKSPACE_POOL_KEY.to_string(), workspace.id.to_string())]),
            vec![Toleration {
                key: WORKSPACE_POOL_KEY.to_string(),
                value: workspace.id.to_string(),
                effect: "NoSchedule".to_string(),
            }],
        ),
        WorkspacePlan::Shared => (HashMap::new(), Vec::new()),
    }
}

fn workload_kind(kind: AppKind) -> &'static str {
    match kind {
        AppKind::Stateless => "Deployment",
        AppKind::Stateful => "StatefulSet",
        AppKind::Cronjob => "CronJob",
    }
}

fn container_image(app: &Application, namespace: &str) -> String {
    match &app.source {
        AppSource::Image { image } => image.clone(),
        // Git sources are built by the pipeline into the workspace registry
        AppSource::Git { .. } => {
            format!("registry.hexabase.ai/{}/{}:latest", namespace, app.name)
        }
    }
}

/// Compose the opaque workload manifest handed to the cluster port.
fn build_manifest(app: &Application, namespace: &str) -> WorkloadManifest {
    let kind = workload_kind(app.kind);
    let image = container_image(app, namespace);

    let env: Vec<serde_json::Value> = app
        .env
        .iter()
        .map(|(k, v)| json!({ "name": k, "value": v }))
        .collect();
    let ports: Vec<serde_json::Value> = app
        .ports
        .iter()
        .map(|p| json!({ "name": p.name, "containerPort": p.container_port, "protocol": p.protocol }))
        .collect();
    let tolerations: Vec<serde_json::Value> = app
        .tolerations
        .iter()
        .map(|t| json!({ "key": t.key, "value": t.value, "effect": t.effect }))
        .collect();

    let mut container = json!({
        "name": app.name,
        "image": image,
        "env": env,
        "ports": ports,
    });
    if let Some(ref command) = app.command {
        container["command"] = json!(command);
    }
    if let Some(ref args) = app.args {
        container["args"] = json!(args);
    }

    let pod_spec = json!({
        "containers": [container],
        "nodeSelector": app.node_selector,
        "tolerations": tolerations,
    });

    let metadata = json!({
        "name": app.name,
        "namespace": namespace,
        "labels": { "app": app.name, "hexabase.ai/application": app.id.to_string() },
        "annotations": { "hexabase.ai/strategy": app.strategy.to_string() },
    });

    let manifest = match app.kind {
        AppKind::Stateless => json!({
            "apiVersion": "apps/v1",
            "kind": "Deployment",
            "metadata": metadata,
            "spec": {
                "replicas": app.replicas,
                "selector": { "matchLabels": { "app": app.name } },
                "template": {
                    "metadata": { "labels": { "app": app.name } },
                    "spec": pod_spec,
                },
            },
        }),
        AppKind::Stateful => json!({
            "apiVersion": "apps/v1",
            "kind": "StatefulSet",
            "metadata": metadata,
            "spec": {
                "replicas": app.replicas,
                "serviceName": app.name,
                "selector": { "matchLabels": { "app": app.name } },
                "template": {
                    "metadata": { "labels": { "app": app.name } },
                    "spec": pod_spec,
                },
            },
        }),
        AppKind::Cronjob => json!({
            "apiVersion": "batch/v1",
            "kind": "CronJob",
            "metadata": metadata,
            "spec": {
                "schedule": app.cron_schedule,
                "jobTemplate": {
                    "spec": {
                        "template": {
                            "spec": {
                                "containers": [container],
                                "nodeSelector": app.node_selector,
                                "tolerations": tolerations,
                                "restartPolicy": "OnFailure",
                            },
                        },
                    },
                },
            },
        }),
    };

    WorkloadManifest {
        name: app.name.clone(),
        kind: kind.to_string(),
        manifest,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::DeploymentStrategy;
    use crate::repository::InMemoryApplicationRepository;
    use domain_workspaces::models::{CreateProject, CreateWorkspace, VClusterStatus};
    use domain_workspaces::repository::InMemoryTenancyRepository;
    use test_utils::NullCluster;

    struct Fixture {
        service: ApplicationService<InMemoryApplicationRepository>,
        tenancy: Arc<InMemoryTenancyRepository>,
        workspace_id: Uuid,
        project_id: Uuid,
    }

    async fn fixture(plan: WorkspacePlan) -> Fixture {
        let repo = InMemoryApplicationRepository::new();
        let tenancy = Arc::new(InMemoryTenancyRepository::new());
        let cluster = Arc::new(NullCluster);

        let org_id = Uuid::new_v4();
        let mut workspace = domain_workspaces::models::Workspace::new(
            org_id,
            CreateWorkspace {
                name: "dev".to_string(),
            },
        );
        workspace.plan = plan;
        workspace.vcluster_status = VClusterStatus::Running;
        workspace.vcluster_instance_name = Some("vc-test".to_string());
        tenancy.create_workspace(&workspace).await.unwrap();

        let project = Project::new(
            workspace.id,
            CreateProject {
                name: "app".to_string(),
                parent_id: None,
                quotas: None,
            },
        );
        tenancy.create_project(&project).await.unwrap();

        Fixture {
            service: ApplicationService::new(repo, tenancy.clone(), cluster),
            tenancy,
            workspace_id: workspace.id,
            project_id: project.id,
        }
    }

    fn stateless(name: &str) -> CreateApplication {
        CreateApplication {
            name: name.to_string(),
            kind: AppKind::Stateless,
            source: AppSource::Image {
                image: "nginx:1.27".to_string(),
            },
            replicas: 2,
            env: HashMap::new(),
            ports: vec![],
            strategy: DeploymentStrategy::Rolling,
            cron_schedule: None,
            command: None,
            args: None,
            template_app_id: None,
        }
    }

    fn cronjob(name: &str, schedule: &str) -> CreateApplication {
        CreateApplication {
            name: name.to_string(),
            kind: AppKind::Cronjob,
            source: AppSource::Image {
                image: "backup-runner:2".to_string(),
            },
            replicas: 1,
            env: HashMap::new(),
            ports: vec![],
            strategy: DeploymentStrategy::Rolling,
            cron_schedule: Some(schedule.to_string()),
            command: Some(vec!["/bin/backup".to_string()]),
            args: None,
            template_app_id: None,
        }
    }

    #[tokio::test]
    async fn test_create_stateless_application() {
        let f = fixture(WorkspacePlan::Shared).await;
        let app = f
            .service
            .create(f.workspace_id, f.project_id, stateless("web"))
            .await
            .unwrap();

        assert_eq!(app.status, AppStatus::Running);
        assert!(app.node_selector.is_empty());
        assert!(app.tolerations.is_empty());
    }

    #[tokio::test]
    async fn test_dedicated_workspace_pins_workloads_to_pool() {
        let f = fixture(WorkspacePlan::Dedicated).await;
        let app = f
            .service
            .create(f.workspace_id, f.project_id, stateless("web"))
            .await
            .unwrap();

        assert_eq!(
            app.node_selector.get(WORKSPACE_POOL_KEY),
            Some(&f.workspace_id.to_string())
        );
        assert_eq!(app.tolerations.len(), 1);
        assert_eq!(app.tolerations[0].effect, "NoSchedule");
    }

    #[tokio::test]
    async fn test_cronjob_requires_valid_schedule() {
        let f = fixture(WorkspacePlan::Shared).await;

        let result = f
            .service
            .create(f.workspace_id, f.project_id, cronjob("backup", "whenever"))
            .await;
        assert!(matches!(result, Err(ApplicationError::Validation(_))));

        let mut missing = cronjob("backup", "0 3 * * *");
        missing.cron_schedule = None;
        let result = f.service.create(f.workspace_id, f.project_id, missing).await;
        assert!(matches!(result, Err(ApplicationError::Validation(_))));

        assert!(f
            .service
            .create(f.workspace_id, f.project_id, cronjob("backup", "0 3 * * *"))
            .await
            .is_ok());
    }

    #[tokio::test]
    async fn test_scale_rejected_for_cronjob() {
        let f = fixture(WorkspacePlan::Shared).await;
        let app = f
            .service
            .create(f.workspace_id, f.project_id, cronjob("backup", "0 3 * * *"))
            .await
            .unwrap();

        let result = f.service.scale(f.workspace_id, app.id, 3).await;
        assert!(matches!(result, Err(ApplicationError::InvalidState(_))));
    }

    #[tokio::test]
    async fn test_scale_updates_replicas() {
        let f = fixture(WorkspacePlan::Shared).await;
        let app = f
            .service
            .create(f.workspace_id, f.project_id, stateless("web"))
            .await
            .unwrap();

        let scaled = f.service.scale(f.workspace_id, app.id, 5).await.unwrap();
        assert_eq!(scaled.replicas, 5);
    }

    #[tokio::test]
    async fn test_trigger_now_records_execution() {
        let f = fixture(WorkspacePlan::Shared).await;
        let app = f
            .service
            .create(f.workspace_id, f.project_id, cronjob("backup", "0 3 * * *"))
            .await
            .unwrap();

        let execution = f.service.trigger_now(f.workspace_id, app.id).await.unwrap();
        assert!(execution.job_name.starts_with("backup-manual-"));
        assert_eq!(execution.status, ExecutionStatus::Running);

        let page = f
            .service
            .list_executions(f.workspace_id, app.id, ListParams::default())
            .await
            .unwrap();
        assert_eq!(page.total, 1);
    }

    #[tokio::test]
    async fn test_trigger_now_rejected_for_non_cronjob() {
        let f = fixture(WorkspacePlan::Shared).await;
        let app = f
            .service
            .create(f.workspace_id, f.project_id, stateless("web"))
            .await
            .unwrap();

        let result = f.service.trigger_now(f.workspace_id, app.id).await;
        assert!(matches!(result, Err(ApplicationError::InvalidState(_))));
    }

    #[tokio::test]
    async fn test_schedule_edit_rejected_while_policy_linked() {
        let f = fixture(WorkspacePlan::Shared).await;
        let app = f
            .service
            .create(f.workspace_id, f.project_id, cronjob("backup", "0 3 * * *"))
            .await
            .unwrap();

        f.service
            .create_backup_policy(
                f.workspace_id,
                app.id,
                CreateBackupPolicy {
                    storage_id: "s3-main".to_string(),
                    schedule: "30 2 * * *".to_string(),
                    retention_days: 14,
                    include_volumes: true,
                    include_database: false,
                    compression: true,
                    encryption: false,
                },
            )
            .await
            .unwrap();

        // Policy creation already synced the CronJob schedule
        let app_now = f.service.get(f.workspace_id, app.id).await.unwrap();
        assert_eq!(app_now.cron_schedule.as_deref(), Some("30 2 * * *"));

        let result = f
            .service
            .update_schedule(
                f.workspace_id,
                app.id,
                UpdateScheduleRequest {
                    cron_schedule: "0 4 * * *".to_string(),
                },
            )
            .await;
        assert!(matches!(result, Err(ApplicationError::InvalidState(_))));
    }

    #[tokio::test]
    async fn test_policy_schedule_update_syncs_cronjob() {
        let f = fixture(WorkspacePlan::Shared).await;
        let app = f
            .service
            .create(f.workspace_id, f.project_id, cronjob("backup", "0 3 * * *"))
            .await
            .unwrap();

        f.service
            .create_backup_policy(
                f.workspace_id,
                app.id,
                CreateBackupPolicy {
                    storage_id: "s3-main".to_string(),
                    schedule: "0 3 * * *".to_string(),
                    retention_days: 14,
                    include_volumes: true,
                    include_database: false,
                    compression: true,
                    encryption: false,
                },
            )
            .await
            .unwrap();

        f.service
            .update_backup_policy(
                f.workspace_id,
                app.id,
                UpdateBackupPolicy {
                    schedule: Some("15 1 * * 0".to_string()),
                    ..Default::default()
                },
            )
            .await
            .unwrap();

        let app_now = f.service.get(f.workspace_id, app.id).await.unwrap();
        assert_eq!(app_now.cron_schedule.as_deref(), Some("15 1 * * 0"));
    }

    #[tokio::test]
    async fn test_save_as_template_and_instantiate() {
        let f = fixture(WorkspacePlan::Shared).await;
        let app = f
            .service
            .create(f.workspace_id, f.project_id, cronjob("backup", "0 3 * * *"))
            .await
            .unwrap();

        let template = f
            .service
            .save_as_template(
                f.workspace_id,
                app.id,
                SaveAsTemplateRequest {
                    name: "nightly-backup".to_string(),
                    description: "standard nightly backup".to_string(),
                },
            )
            .await
            .unwrap();
        assert!(template.is_template);
        assert_eq!(template.cron_schedule.as_deref(), Some("0 3 * * *"));

        let mut from_template = cronjob("backup-2", "0 3 * * *");
        from_template.cron_schedule = None;
        from_template.template_app_id = Some(template.id);
        let created = f
            .service
            .create(f.workspace_id, f.project_id, from_template)
            .await
            .unwrap();
        assert_eq!(created.template_app_id, Some(template.id));
        assert_eq!(created.cron_schedule.as_deref(), Some("0 3 * * *"));
        assert!(!created.is_template);
    }

    #[tokio::test]
    async fn test_manifest_kind_mapping() {
        let f = fixture(WorkspacePlan::Shared).await;
        let app = f
            .service
            .create(f.workspace_id, f.project_id, stateless("web"))
            .await
            .unwrap();

        let manifest = build_manifest(&app, "ns");
        assert_eq!(manifest.kind, "Deployment");
        assert_eq!(manifest.manifest["spec"]["replicas"], serde_json::json!(2));
        assert_eq!(
            manifest.manifest["metadata"]["annotations"]["hexabase.ai/strategy"],
            serde_json::json!("rolling")
        );
    }

    #[tokio::test]
    async fn test_delete_removes_children() {
        let f = fixture(WorkspacePlan::Shared).await;
        let app = f
            .service
            .create(f.workspace_id, f.project_id, cronjob("backup", "0 3 * * *"))
            .await
            .unwrap();
        f.service.trigger_now(f.workspace_id, app.id).await.unwrap();

        f.service.delete(f.workspace_id, app.id).await.unwrap();
        assert!(f.service.get(f.workspace_id, app.id).await.is_err());

        // The owning project is untouched
        let (projects, _) = f
            .tenancy
            .list_projects(f.workspace_id, &ListParams::default())
            .await
            .unwrap();
        assert_eq!(projects.len(), 1);
    }
}
