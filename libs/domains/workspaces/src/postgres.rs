use async_trait::async_trait;
use axum_helpers::pagination::{ListParams, SortOrder};
use database::BaseRepository;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, DatabaseConnection, EntityTrait, PaginatorTrait, QueryFilter,
    QueryOrder, QuerySelect, TransactionTrait,
};
use uuid::Uuid;

use crate::{
    entity,
    error::{WorkspaceError, WorkspaceResult},
    models::{Organization, OrganizationMember, Project, Workspace},
    repository::TenancyRepository,
};

pub struct PgTenancyRepository {
    base: BaseRepository<entity::workspaces::Entity>,
}

impl PgTenancyRepository {
    pub fn new(db: DatabaseConnection) -> Self {
        Self {
            base: BaseRepository::new(db),
        }
    }

    fn db(&self) -> &DatabaseConnection {
        self.base.db()
    }
}

fn db_err(e: sea_orm::DbErr) -> WorkspaceError {
    WorkspaceError::Internal(format!("Database error: {}", e))
}

#[async_trait]
impl TenancyRepository for PgTenancyRepository {
    async fn create_organization(
        &self,
        org: &Organization,
        owner: &OrganizationMember,
    ) -> WorkspaceResult<()> {
        let existing = entity::organizations::Entity::find_by_id(org.id)
            .one(self.db())
            .await
            .map_err(db_err)?;
        if existing.is_some() {
            return Err(WorkspaceError::AlreadyExists(format!("organization {}", org.id)));
        }

        // Organization row and owner membership commit together
        let txn = self.db().begin().await.map_err(db_err)?;
        let org_model: entity::organizations::ActiveModel = org.into();
        org_model.insert(&txn).await.map_err(db_err)?;
        let member_model: entity::organization_users::ActiveModel = owner.into();
        member_model.insert(&txn).await.map_err(db_err)?;
        txn.commit().await.map_err(db_err)?;

        tracing::info!(organization_id = %org.id, "Created organization");
        Ok(())
    }

    async fn get_organization(&self, id: Uuid) -> WorkspaceResult<Option<Organization>> {
        let model = entity::organizations::Entity::find_by_id(id)
            .one(self.db())
            .await
            .map_err(db_err)?;
        Ok(model.map(Into::into))
    }

    async fn update_organization(&self, org: &Organization) -> WorkspaceResult<()> {
        let model: entity::organizations::ActiveModel = org.into();
        model.update(self.db()).await.map_err(db_err)?;
        Ok(())
    }

    async fn delete_organization(&self, id: Uuid) -> WorkspaceResult<bool> {
        let result = entity::organizations::Entity::delete_by_id(id)
            .exec(self.db())
            .await
            .map_err(db_err)?;
        Ok(result.rows_affected > 0)
    }

    async fn list_members(
        &self,
        organization_id: Uuid,
    ) -> WorkspaceResult<Vec<OrganizationMember>> {
        let models = entity::organization_users::Entity::find()
            .filter(entity::organization_users::Column::OrganizationId.eq(organization_id))
            .all(self.db())
            .await
            .map_err(db_err)?;
        Ok(models.into_iter().map(Into::into).collect())
    }

    async fn create_workspace(&self, workspace: &Workspace) -> WorkspaceResult<()> {
        let name_taken = entity::workspaces::Entity::find()
            .filter(entity::workspaces::Column::OrganizationId.eq(workspace.organization_id))
            .filter(entity::workspaces::Column::Name.eq(workspace.name.clone()))
            .one(self.db())
            .await
            .map_err(db_err)?
            .is_some();
        if name_taken {
            return Err(WorkspaceError::AlreadyExists(format!(
                "workspace '{}'",
                workspace.name
            )));
        }

        let model: entity::workspaces::ActiveModel = workspace.into();
        self.base.insert(model).await.map_err(db_err)?;
        tracing::info!(workspace_id = %workspace.id, "Created workspace");
        Ok(())
    }

    async fn get_workspace(&self, id: Uuid) -> WorkspaceResult<Option<Workspace>> {
        let model = self.base.find_by_id(id).await.map_err(db_err)?;
        Ok(model.map(Into::into))
    }

    async fn update_workspace(&self, workspace: &Workspace) -> WorkspaceResult<()> {
        let model: entity::workspaces::ActiveModel = workspace.into();
        self.base.update(model).await.map_err(db_err)?;
        Ok(())
    }

    async fn delete_workspace(&self, id: Uuid) -> WorkspaceResult<bool> {
        let rows = self.base.delete_by_id(id).await.map_err(db_err)?;
        Ok(rows > 0)
    }

    async fn list_workspaces(
        &self,
        organization_id: Uuid,
        params: &ListParams,
    ) -> WorkspaceResult<(Vec<Workspace>, u64)> {
        let base = entity::workspaces::Entity::find()
            .filter(entity::workspaces::Column::OrganizationId.eq(organization_id));

        let total = base.clone().count(self.db()).await.map_err(db_err)?;

        let ascending = matches!(params.sort_order, Some(SortOrder::Asc));
        let column = match params.sort_by.as_deref() {
            Some("name") => entity::workspaces::Column::Name,
            _ => entity::workspaces::Column::CreatedAt,
        };
        let query = if ascending {
            base.order_by_asc(column)
        } else {
            base.order_by_desc(column)
        };

        let (offset, limit) = params.to_offset_limit();
        let models = query
            .offset(offset)
            .limit(limit)
            .all(self.db())
            .await
            .map_err(db_err)?;

        Ok((models.into_iter().map(Into::into).collect(), total))
    }

    async fn create_project(&self, project: &Project) -> WorkspaceResult<()> {
        let name_taken = entity::projects::Entity::find()
            .filter(entity::projects::Column::WorkspaceId.eq(project.workspace_id))
            .filter(entity::projects::Column::Name.eq(project.name.clone()))
            .one(self.db())
            .await
            .map_err(db_err)?
            .is_some();
        if name_taken {
            return Err(WorkspaceError::AlreadyExists(format!("project '{}'", project.name)));
        }

        let model: entity::projects::ActiveModel = project.into();
        model.insert(self.db()).await.map_err(db_err)?;
        tracing::info!(project_id = %project.id, "Created project");
        Ok(())
    }

    async fn get_project(&self, id: Uuid) -> WorkspaceResult<Option<Project>> {
        let model = entity::projects::Entity::find_by_id(id)
            .one(self.db())
            .await
            .map_err(db_err)?;
        Ok(model.map(Into::into))
    }

    async fn update_project(&self, project: &Project) -> WorkspaceResult<()> {
        let model: entity::projects::ActiveModel = project.into();
        model.update(self.db()).await.map_err(db_err)?;
        Ok(())
    }

    async fn delete_project(&self, id: Uuid) -> WorkspaceResult<bool> {
        let result = entity::projects::Entity::delete_by_id(id)
            .exec(self.db())
            .await
            .map_err(db_err)?;
        Ok(result.rows_affected > 0)
    }

    async fn list_projects(
        &self,
        workspace_id: Uuid,
        params: &ListParams,
    ) -> WorkspaceResult<(Vec<Project>, u64)> {
        let base = entity::projects::Entity::find()
            .filter(entity::projects::Column::WorkspaceId.eq(workspace_id));

        let total = base.clone().count(self.db()).await.map_err(db_err)?;

        let (offset, limit) = params.to_offset_limit();
        let models = base
            .order_by_desc(entity::projects::Column::CreatedAt)
            .offset(offset)
            .limit(limit)
            .all(self.db())
            .await
            .map_err(db_err)?;

        Ok((models.into_iter().map(Into::into).collect(), total))
    }

    async fn list_child_projects(&self, parent_id: Uuid) -> WorkspaceResult<Vec<Project>> {
        let models = entity::projects::Entity::find()
            .filter(entity::projects::Column::ParentId.eq(parent_id))
            .all(self.db())
            .await
            .map_err(db_err)?;
        Ok(models.into_iter().map(Into::into).collect())
    }
}
