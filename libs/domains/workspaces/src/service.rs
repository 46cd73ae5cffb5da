use axum_helpers::pagination::{ListParams, Page};
use kubernetes::ClusterProvider;
use std::sync::Arc;
use uuid::Uuid;
use validator::Validate;

use crate::error::{WorkspaceError, WorkspaceResult};
use crate::models::{
    CreateOrganization, CreateProject, Organization, OrganizationMember, Project,
    UpdateOrganization, UpdateProject,
};
use crate::repository::TenancyRepository;
use axum_helpers::OrgRole;

/// Organization CRUD.
#[derive(Clone)]
pub struct OrganizationService<R: TenancyRepository> {
    repository: Arc<R>,
}

impl<R: TenancyRepository> OrganizationService<R> {
    pub fn new(repository: Arc<R>) -> Self {
        Self { repository }
    }

    /// Create an organization owned by the calling user.
    pub async fn create(
        &self,
        input: CreateOrganization,
        owner_user_id: Uuid,
    ) -> WorkspaceResult<Organization> {
        input
            .validate()
            .map_err(|e| WorkspaceError::Validation(e.to_string()))?;

        let org = Organization::new(input, owner_user_id);
        let owner = OrganizationMember {
            organization_id: org.id,
            user_id: owner_user_id,
            role: OrgRole::Owner,
        };
        self.repository.create_organization(&org, &owner).await?;
        Ok(org)
    }

    pub async fn get(&self, id: Uuid) -> WorkspaceResult<Organization> {
        self.repository
            .get_organization(id)
            .await?
            .ok_or_else(|| WorkspaceError::NotFound(format!("organization {}", id)))
    }

    pub async fn update(
        &self,
        id: Uuid,
        input: UpdateOrganization,
    ) -> WorkspaceResult<Organization> {
        input
            .validate()
            .map_err(|e| WorkspaceError::Validation(e.to_string()))?;

        let mut org = self.get(id).await?;
        if let Some(name) = input.name {
            org.name = name;
        }
        org.updated_at = chrono::Utc::now();
        self.repository.update_organization(&org).await?;
        Ok(org)
    }

    pub async fn delete(&self, id: Uuid) -> WorkspaceResult<()> {
        if !self.repository.delete_organization(id).await? {
            return Err(WorkspaceError::NotFound(format!("organization {}", id)));
        }
        Ok(())
    }

    pub async fn members(&self, id: Uuid) -> WorkspaceResult<Vec<OrganizationMember>> {
        self.get(id).await?;
        self.repository.list_members(id).await
    }
}

/// Project CRUD with quota-inheritance validation.
#[derive(Clone)]
pub struct ProjectService<R: TenancyRepository> {
    repository: Arc<R>,
    cluster: Arc<dyn ClusterProvider>,
}

impl<R: TenancyRepository> ProjectService<R> {
    pub fn new(repository: Arc<R>, cluster: Arc<dyn ClusterProvider>) -> Self {
        Self {
            repository,
            cluster,
        }
    }

    pub async fn create(
        &self,
        workspace_id: Uuid,
        input: CreateProject,
    ) -> WorkspaceResult<Project> {
        input
            .validate()
            .map_err(|e| WorkspaceError::Validation(e.to_string()))?;

        let workspace = self
            .repository
            .get_workspace(workspace_id)
            .await?
            .ok_or_else(|| WorkspaceError::NotFound(format!("workspace {}", workspace_id)))?;

        if let Some(parent_id) = input.parent_id {
            let parent = self
                .repository
                .get_project(parent_id)
                .await?
                .ok_or_else(|| WorkspaceError::NotFound(format!("project {}", parent_id)))?;
            if parent.workspace_id != workspace_id {
                return Err(WorkspaceError::Validation(
                    "parent project belongs to a different workspace".to_string(),
                ));
            }
            self.check_inheritance(&input.quotas, &parent)?;
        }

        let project = Project::new(workspace_id, input);
        self.repository.create_project(&project).await?;

        if let Some(ref instance) = workspace.vcluster_instance_name {
            self.cluster
                .create_project_namespace(instance, &project.namespace, project.quotas.as_ref())
                .await?;
        }

        tracing::info!(project_id = %project.id, workspace_id = %workspace_id, "Created project");
        Ok(project)
    }

    pub async fn get(&self, workspace_id: Uuid, id: Uuid) -> WorkspaceResult<Project> {
        let project = self
            .repository
            .get_project(id)
            .await?
            .ok_or_else(|| WorkspaceError::NotFound(format!("project {}", id)))?;
        if project.workspace_id != workspace_id {
            return Err(WorkspaceError::NotFound(format!("project {}", id)));
        }
        Ok(project)
    }

    pub async fn list(
        &self,
        workspace_id: Uuid,
        params: ListParams,
    ) -> WorkspaceResult<Page<Project>> {
        let (items, total) = self.repository.list_projects(workspace_id, &params).await?;
        Ok(Page::new(items, total, &params))
    }

    pub async fn update(
        &self,
        workspace_id: Uuid,
        id: Uuid,
        input: UpdateProject,
    ) -> WorkspaceResult<Project> {
        input
            .validate()
            .map_err(|e| WorkspaceError::Validation(e.to_string()))?;

        let mut project = self.get(workspace_id, id).await?;

        if let Some(quotas) = input.quotas {
            // New quotas must still fit the parent and contain the children
            if let Some(parent_id) = project.parent_id {
                if let Some(parent) = self.repository.get_project(parent_id).await? {
                    self.check_inheritance(&Some(quotas), &parent)?;
                }
            }
            for child in self.repository.list_child_projects(id).await? {
                if let Some(child_quotas) = child.quotas {
                    if !child_quotas.fits_within(&quotas) {
                        return Err(WorkspaceError::Validation(format!(
                            "quotas would no longer contain child project '{}'",
                            child.name
                        )));
                    }
                }
            }
            project.quotas = Some(quotas);
        }
        if let Some(name) = input.name {
            project.name = name;
        }
        project.updated_at = chrono::Utc::now();
        self.repository.update_project(&project).await?;

        // Keep the namespace quota in sync
        let workspace = self.repository.get_workspace(workspace_id).await?;
        if let Some(instance) = workspace.and_then(|w| w.vcluster_instance_name) {
            self.cluster
                .create_project_namespace(&instance, &project.namespace, project.quotas.as_ref())
                .await?;
        }

        Ok(project)
    }

    pub async fn delete(&self, workspace_id: Uuid, id: Uuid) -> WorkspaceResult<()> {
        let project = self.get(workspace_id, id).await?;

        let children = self.repository.list_child_projects(id).await?;
        if !children.is_empty() {
            return Err(WorkspaceError::InvalidState(format!(
                "project has {} child projects",
                children.len()
            )));
        }

        self.repository.delete_project(id).await?;

        let workspace = self.repository.get_workspace(workspace_id).await?;
        if let Some(instance) = workspace.and_then(|w| w.vcluster_instance_name) {
            self.cluster
                .delete_project_namespace(&instance, &project.namespace)
                .await?;
        }
        Ok(())
    }

    fn check_inheritance(
        &self,
        quotas: &Option<kubernetes::ResourceQuotas>,
        parent: &Project,
    ) -> WorkspaceResult<()> {
        if let (Some(child), Some(parent_quotas)) = (quotas, &parent.quotas) {
            if !child.fits_within(parent_quotas) {
                return Err(WorkspaceError::Validation(format!(
                    "quotas exceed parent project '{}'",
                    parent.name
                )));
            }
        }
        Ok(())
    }
}
