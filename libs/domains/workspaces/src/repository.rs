use async_trait::async_trait;
use axum_helpers::pagination::{ListParams, SortOrder};
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::RwLock;
use uuid::Uuid;

use crate::error::{WorkspaceError, WorkspaceResult};
use crate::models::{Organization, OrganizationMember, Project, Workspace};

/// Repository for the tenancy aggregates.
///
/// Creates fail with `AlreadyExists` on duplicate ids or duplicate names
/// within the owning scope, so provisioning retries must reuse the same id.
#[async_trait]
pub trait TenancyRepository: Send + Sync {
    /// Persist an organization and its owner membership atomically.
    async fn create_organization(
        &self,
        org: &Organization,
        owner: &OrganizationMember,
    ) -> WorkspaceResult<()>;

    async fn get_organization(&self, id: Uuid) -> WorkspaceResult<Option<Organization>>;

    async fn update_organization(&self, org: &Organization) -> WorkspaceResult<()>;

    async fn delete_organization(&self, id: Uuid) -> WorkspaceResult<bool>;

    async fn list_members(&self, organization_id: Uuid)
        -> WorkspaceResult<Vec<OrganizationMember>>;

    async fn create_workspace(&self, workspace: &Workspace) -> WorkspaceResult<()>;

    async fn get_workspace(&self, id: Uuid) -> WorkspaceResult<Option<Workspace>>;

    async fn update_workspace(&self, workspace: &Workspace) -> WorkspaceResult<()>;

    /// Hard delete; children are removed by cascading foreign keys.
    async fn delete_workspace(&self, id: Uuid) -> WorkspaceResult<bool>;

    async fn list_workspaces(
        &self,
        organization_id: Uuid,
        params: &ListParams,
    ) -> WorkspaceResult<(Vec<Workspace>, u64)>;

    async fn create_project(&self, project: &Project) -> WorkspaceResult<()>;

    async fn get_project(&self, id: Uuid) -> WorkspaceResult<Option<Project>>;

    async fn update_project(&self, project: &Project) -> WorkspaceResult<()>;

    async fn delete_project(&self, id: Uuid) -> WorkspaceResult<bool>;

    async fn list_projects(
        &self,
        workspace_id: Uuid,
        params: &ListParams,
    ) -> WorkspaceResult<(Vec<Project>, u64)>;

    async fn list_child_projects(&self, parent_id: Uuid) -> WorkspaceResult<Vec<Project>>;
}

/// In-memory implementation (development and tests)
#[derive(Debug, Default, Clone)]
pub struct InMemoryTenancyRepository {
    organizations: Arc<RwLock<HashMap<Uuid, Organization>>>,
    members: Arc<RwLock<Vec<OrganizationMember>>>,
    workspaces: Arc<RwLock<HashMap<Uuid, Workspace>>>,
    projects: Arc<RwLock<HashMap<Uuid, Project>>>,
}

impl InMemoryTenancyRepository {
    pub fn new() -> Self {
        Self::default()
    }
}

fn paginate<T: Clone>(mut items: Vec<T>, params: &ListParams, total: u64) -> (Vec<T>, u64) {
    let (offset, limit) = params.to_offset_limit();
    items = items
        .into_iter()
        .skip(offset as usize)
        .take(limit as usize)
        .collect();
    (items, total)
}

#[async_trait]
impl TenancyRepository for InMemoryTenancyRepository {
    async fn create_organization(
        &self,
        org: &Organization,
        owner: &OrganizationMember,
    ) -> WorkspaceResult<()> {
        let mut orgs = self.organizations.write().await;
        if orgs.contains_key(&org.id) {
            return Err(WorkspaceError::AlreadyExists(format!("organization {}", org.id)));
        }
        orgs.insert(org.id, org.clone());
        self.members.write().await.push(owner.clone());
        Ok(())
    }

    async fn get_organization(&self, id: Uuid) -> WorkspaceResult<Option<Organization>> {
        Ok(self.organizations.read().await.get(&id).cloned())
    }

    async fn update_organization(&self, org: &Organization) -> WorkspaceResult<()> {
        let mut orgs = self.organizations.write().await;
        if !orgs.contains_key(&org.id) {
            return Err(WorkspaceError::NotFound(format!("organization {}", org.id)));
        }
        orgs.insert(org.id, org.clone());
        Ok(())
    }

    async fn delete_organization(&self, id: Uuid) -> WorkspaceResult<bool> {
        let removed = self.organizations.write().await.remove(&id).is_some();
        if removed {
            self.members
                .write()
                .await
                .retain(|m| m.organization_id != id);
        }
        Ok(removed)
    }

    async fn list_members(
        &self,
        organization_id: Uuid,
    ) -> WorkspaceResult<Vec<OrganizationMember>> {
        Ok(self
            .members
            .read()
            .await
            .iter()
            .filter(|m| m.organization_id == organization_id)
            .cloned()
            .collect())
    }

    async fn create_workspace(&self, workspace: &Workspace) -> WorkspaceResult<()> {
        let mut workspaces = self.workspaces.write().await;
        if workspaces.contains_key(&workspace.id) {
            return Err(WorkspaceError::AlreadyExists(format!("workspace {}", workspace.id)));
        }
        let name_taken = workspaces.values().any(|w| {
            w.organization_id == workspace.organization_id && w.name == workspace.name
        });
        if name_taken {
            return Err(WorkspaceError::AlreadyExists(format!(
                "workspace '{}'",
                workspace.name
            )));
        }
        workspaces.insert(workspace.id, workspace.clone());
        Ok(())
    }

    async fn get_workspace(&self, id: Uuid) -> WorkspaceResult<Option<Workspace>> {
        Ok(self.workspaces.read().await.get(&id).cloned())
    }

    async fn update_workspace(&self, workspace: &Workspace) -> WorkspaceResult<()> {
        let mut workspaces = self.workspaces.write().await;
        if !workspaces.contains_key(&workspace.id) {
            return Err(WorkspaceError::NotFound(format!("workspace {}", workspace.id)));
        }
        workspaces.insert(workspace.id, workspace.clone());
        Ok(())
    }

    async fn delete_workspace(&self, id: Uuid) -> WorkspaceResult<bool> {
        let removed = self.workspaces.write().await.remove(&id).is_some();
        if removed {
            // Mirror the database's cascading foreign keys
            self.projects
                .write()
                .await
                .retain(|_, p| p.workspace_id != id);
        }
        Ok(removed)
    }

    async fn list_workspaces(
        &self,
        organization_id: Uuid,
        params: &ListParams,
    ) -> WorkspaceResult<(Vec<Workspace>, u64)> {
        let workspaces = self.workspaces.read().await;
        let mut result: Vec<Workspace> = workspaces
            .values()
            .filter(|w| w.organization_id == organization_id)
            .cloned()
            .collect();

        let descending = matches!(params.sort_order, Some(SortOrder::Desc) | None);
        match params.sort_by.as_deref() {
            Some("name") => result.sort_by(|a, b| a.name.cmp(&b.name)),
            _ => result.sort_by(|a, b| a.created_at.cmp(&b.created_at)),
        }
        if descending {
            result.reverse();
        }

        let total = result.len() as u64;
        Ok(paginate(result, params, total))
    }

    async fn create_project(&self, project: &Project) -> WorkspaceResult<()> {
        let mut projects = self.projects.write().await;
        if projects.contains_key(&project.id) {
            return Err(WorkspaceError::AlreadyExists(format!("project {}", project.id)));
        }
        let name_taken = projects
            .values()
            .any(|p| p.workspace_id == project.workspace_id && p.name == project.name);
        if name_taken {
            return Err(WorkspaceError::AlreadyExists(format!("project '{}'", project.name)));
        }
        projects.insert(project.id, project.clone());
        Ok(())
    }

    async fn get_project(&self, id: Uuid) -> WorkspaceResult<Option<Project>> {
        Ok(self.projects.read().await.get(&id).cloned())
    }

    async fn update_project(&self, project: &Project) -> WorkspaceResult<()> {
        let mut projects = self.projects.write().await;
        if !projects.contains_key(&project.id) {
            return Err(WorkspaceError::NotFound(format!("project {}", project.id)));
        }
        projects.insert(project.id, project.clone());
        Ok(())
    }

    async fn delete_project(&self, id: Uuid) -> WorkspaceResult<bool> {
        Ok(self.projects.write().await.remove(&id).is_some())
    }

    async fn list_projects(
        &self,
        workspace_id: Uuid,
        params: &ListParams,
    ) -> WorkspaceResult<(Vec<Project>, u64)> {
        let projects = self.projects.read().await;
        let mut result: Vec<Project> = projects
            .values()
            .filter(|p| p.workspace_id == workspace_id)
            .cloned()
            .collect();
        result.sort_by(|a, b| b.created_at.cmp(&a.created_at));

        let total = result.len() as u64;
        Ok(paginate(result, params, total))
    }

    async fn list_child_projects(&self, parent_id: Uuid) -> WorkspaceResult<Vec<Project>> {
        Ok(self
            .projects
            .read()
            .await
            .values()
            .filter(|p| p.parent_id == Some(parent_id))
            .cloned()
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{CreateOrganization, CreateWorkspace};
    use axum_helpers::OrgRole;

    fn org() -> (Organization, OrganizationMember) {
        let owner_id = Uuid::new_v4();
        let org = Organization::new(
            CreateOrganization {
                name: "acme".to_string(),
            },
            owner_id,
        );
        let member = OrganizationMember {
            organization_id: org.id,
            user_id: owner_id,
            role: OrgRole::Owner,
        };
        (org, member)
    }

    #[tokio::test]
    async fn test_create_organization_records_owner_membership() {
        let repo = InMemoryTenancyRepository::new();
        let (org, member) = org();

        repo.create_organization(&org, &member).await.unwrap();

        let members = repo.list_members(org.id).await.unwrap();
        assert_eq!(members.len(), 1);
        assert_eq!(members[0].role, OrgRole::Owner);
    }

    #[tokio::test]
    async fn test_duplicate_workspace_name_rejected() {
        let repo = InMemoryTenancyRepository::new();
        let (org, member) = org();
        repo.create_organization(&org, &member).await.unwrap();

        let ws1 = Workspace::new(org.id, CreateWorkspace { name: "dev".to_string() });
        let ws2 = Workspace::new(org.id, CreateWorkspace { name: "dev".to_string() });

        repo.create_workspace(&ws1).await.unwrap();
        let result = repo.create_workspace(&ws2).await;
        assert!(matches!(result, Err(WorkspaceError::AlreadyExists(_))));
    }

    #[tokio::test]
    async fn test_delete_workspace_cascades_projects() {
        let repo = InMemoryTenancyRepository::new();
        let ws = Workspace::new(Uuid::new_v4(), CreateWorkspace { name: "dev".to_string() });
        repo.create_workspace(&ws).await.unwrap();

        let project = Project::new(
            ws.id,
            crate::models::CreateProject {
                name: "app".to_string(),
                parent_id: None,
                quotas: None,
            },
        );
        repo.create_project(&project).await.unwrap();

        assert!(repo.delete_workspace(ws.id).await.unwrap());
        assert!(repo.get_project(project.id).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_list_workspaces_pagination() {
        let repo = InMemoryTenancyRepository::new();
        let org_id = Uuid::new_v4();
        for i in 0..5 {
            let ws = Workspace::new(org_id, CreateWorkspace { name: format!("ws-{i}") });
            repo.create_workspace(&ws).await.unwrap();
        }

        let params = ListParams {
            page: 2,
            page_size: 2,
            ..Default::default()
        };
        let (items, total) = repo.list_workspaces(org_id, &params).await.unwrap();
        assert_eq!(total, 5);
        assert_eq!(items.len(), 2);
    }
}
