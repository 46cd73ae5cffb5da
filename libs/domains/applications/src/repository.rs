use async_trait::async_trait;
use axum_helpers::pagination::ListParams;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::RwLock;
use uuid::Uuid;

use crate::error::{ApplicationError, ApplicationResult};
use crate::models::{Application, BackupPolicy, CronJobExecution};

/// Repository for applications, cronjob executions, and backup policies.
#[async_trait]
pub trait ApplicationRepository: Send + Sync {
    async fn create_application(&self, app: &Application) -> ApplicationResult<()>;

    async fn get_application(
        &self,
        workspace_id: Uuid,
        id: Uuid,
    ) -> ApplicationResult<Option<Application>>;

    async fn update_application(&self, app: &Application) -> ApplicationResult<()>;

    async fn delete_application(&self, workspace_id: Uuid, id: Uuid) -> ApplicationResult<bool>;

    async fn list_applications(
        &self,
        project_id: Uuid,
        params: &ListParams,
    ) -> ApplicationResult<(Vec<Application>, u64)>;

    /// Execution history is append-per-run
    async fn create_execution(&self, execution: &CronJobExecution) -> ApplicationResult<()>;

    async fn update_execution(&self, execution: &CronJobExecution) -> ApplicationResult<()>;

    async fn list_executions(
        &self,
        application_id: Uuid,
        params: &ListParams,
    ) -> ApplicationResult<(Vec<CronJobExecution>, u64)>;

    async fn create_backup_policy(&self, policy: &BackupPolicy) -> ApplicationResult<()>;

    /// At most one policy per application
    async fn get_backup_policy(
        &self,
        application_id: Uuid,
    ) -> ApplicationResult<Option<BackupPolicy>>;

    async fn update_backup_policy(&self, policy: &BackupPolicy) -> ApplicationResult<()>;

    async fn delete_backup_policy(&self, application_id: Uuid) -> ApplicationResult<bool>;
}

/// In-memory implementation (development and tests)
#[derive(Default)]
pub struct InMemoryApplicationRepository {
    applications: RwLock<HashMap<Uuid, Application>>,
    executions: RwLock<HashMap<Uuid, CronJobExecution>>,
    policies: RwLock<HashMap<Uuid, BackupPolicy>>, // keyed by application id
}

impl InMemoryApplicationRepository {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }
}

fn paginate<T: Clone>(items: Vec<T>, params: &ListParams) -> (Vec<T>, u64) {
    let total = items.len() as u64;
    let (offset, limit) = params.to_offset_limit();
    (
        items
            .into_iter()
            .skip(offset as usize)
            .take(limit as usize)
            .collect(),
        total,
    )
}

#[async_trait]
impl ApplicationRepository for InMemoryApplicationRepository {
    async fn create_application(&self, app: &Application) -> ApplicationResult<()> {
        let mut applications = self.applications.write().await;
        if applications.contains_key(&app.id) {
            return Err(ApplicationError::AlreadyExists(format!("application {}", app.id)));
        }
        let name_taken = applications
            .values()
            .any(|a| a.project_id == app.project_id && a.name == app.name);
        if name_taken {
            return Err(ApplicationError::AlreadyExists(format!(
                "application '{}'",
                app.name
            )));
        }
        applications.insert(app.id, app.clone());
        Ok(())
    }

    async fn get_application(
        &self,
        workspace_id: Uuid,
        id: Uuid,
    ) -> ApplicationResult<Option<Application>> {
        Ok(self
            .applications
            .read()
            .await
            .get(&id)
            .filter(|a| a.workspace_id == workspace_id)
            .cloned())
    }

    async fn update_application(&self, app: &Application) -> ApplicationResult<()> {
        let mut applications = self.applications.write().await;
        if !applications.contains_key(&app.id) {
            return Err(ApplicationError::NotFound(format!("application {}", app.id)));
        }
        applications.insert(app.id, app.clone());
        Ok(())
    }

    async fn delete_application(&self, workspace_id: Uuid, id: Uuid) -> ApplicationResult<bool> {
        let mut applications = self.applications.write().await;
        match applications.get(&id) {
            Some(a) if a.workspace_id == workspace_id => {
                applications.remove(&id);
                self.executions
                    .write()
                    .await
                    .retain(|_, e| e.application_id != id);
                self.policies.write().await.remove(&id);
                Ok(true)
            }
            _ => Ok(false),
        }
    }

    async fn list_applications(
        &self,
        project_id: Uuid,
        params: &ListParams,
    ) -> ApplicationResult<(Vec<Application>, u64)> {
        let applications = self.applications.read().await;
        let mut result: Vec<Application> = applications
            .values()
            .filter(|a| a.project_id == project_id)
            .cloned()
            .collect();
        result.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(paginate(result, params))
    }

    async fn create_execution(&self, execution: &CronJobExecution) -> ApplicationResult<()> {
        self.executions
            .write()
            .await
            .insert(execution.id, execution.clone());
        Ok(())
    }

    async fn update_execution(&self, execution: &CronJobExecution) -> ApplicationResult<()> {
        let mut executions = self.executions.write().await;
        if !executions.contains_key(&execution.id) {
            return Err(ApplicationError::NotFound(format!("execution {}", execution.id)));
        }
        executions.insert(execution.id, execution.clone());
        Ok(())
    }

    async fn list_executions(
        &self,
        application_id: Uuid,
        params: &ListParams,
    ) -> ApplicationResult<(Vec<CronJobExecution>, u64)> {
        let executions = self.executions.read().await;
        let mut result: Vec<CronJobExecution> = executions
            .values()
            .filter(|e| e.application_id == application_id)
            .cloned()
            .collect();
        result.sort_by(|a, b| b.started_at.cmp(&a.started_at));
        Ok(paginate(result, params))
    }

    async fn create_backup_policy(&self, policy: &BackupPolicy) -> ApplicationResult<()> {
        let mut policies = self.policies.write().await;
        if policies.contains_key(&policy.application_id) {
            return Err(ApplicationError::AlreadyExists(format!(
                "backup policy for application {}",
                policy.application_id
            )));
        }
        policies.insert(policy.application_id, policy.clone());
        Ok(())
    }

    async fn get_backup_policy(
        &self,
        application_id: Uuid,
    ) -> ApplicationResult<Option<BackupPolicy>> {
        Ok(self.policies.read().await.get(&application_id).cloned())
    }

    async fn update_backup_policy(&self, policy: &BackupPolicy) -> ApplicationResult<()> {
        let mut policies = self.policies.write().await;
        if !policies.contains_key(&policy.application_id) {
            return Err(ApplicationError::NotFound(format!(
                "backup policy for application {}",
                policy.application_id
            )));
        }
        policies.insert(policy.application_id, policy.clone());
        Ok(())
    }

    async fn delete_backup_policy(&self, application_id: Uuid) -> ApplicationResult<bool> {
        Ok(self.policies.write().await.remove(&application_id).is_some())
    }
}
