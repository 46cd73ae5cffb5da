use async_trait::async_trait;
use axum_helpers::pagination::ListParams;
use database::BaseRepository;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, DatabaseConnection, EntityTrait, PaginatorTrait, QueryFilter,
    QueryOrder, QuerySelect,
};
use uuid::Uuid;

use crate::{
    entity,
    error::{ApplicationError, ApplicationResult},
    models::{Application, BackupPolicy, CronJobExecution},
    repository::ApplicationRepository,
};

pub struct PgApplicationRepository {
    base: BaseRepository<entity::applications::Entity>,
}

impl PgApplicationRepository {
    pub fn new(db: DatabaseConnection) -> Self {
        Self {
            base: BaseRepository::new(db),
        }
    }

    fn db(&self) -> &DatabaseConnection {
        self.base.db()
    }
}

fn db_err(e: sea_orm::DbErr) -> ApplicationError {
    ApplicationError::Internal(format!("Database error: {}", e))
}

fn decode_err(e: serde_json::Error) -> ApplicationError {
    ApplicationError::Internal(format!("Stored application is invalid: {}", e))
}

#[async_trait]
impl ApplicationRepository for PgApplicationRepository {
    async fn create_application(&self, app: &Application) -> ApplicationResult<()> {
        let name_taken = entity::applications::Entity::find()
            .filter(entity::applications::Column::ProjectId.eq(app.project_id))
            .filter(entity::applications::Column::Name.eq(app.name.clone()))
            .one(self.db())
            .await
            .map_err(db_err)?
            .is_some();
        if name_taken {
            return Err(ApplicationError::AlreadyExists(format!(
                "application '{}'",
                app.name
            )));
        }

        let model: entity::applications::ActiveModel = app.into();
        self.base.insert(model).await.map_err(db_err)?;
        tracing::info!(application_id = %app.id, "Created application");
        Ok(())
    }

    async fn get_application(
        &self,
        workspace_id: Uuid,
        id: Uuid,
    ) -> ApplicationResult<Option<Application>> {
        let model = entity::applications::Entity::find_by_id(id)
            .filter(entity::applications::Column::WorkspaceId.eq(workspace_id))
            .one(self.db())
            .await
            .map_err(db_err)?;

        model
            .map(|m| Application::try_from(m).map_err(decode_err))
            .transpose()
    }

    async fn update_application(&self, app: &Application) -> ApplicationResult<()> {
        let model: entity::applications::ActiveModel = app.into();
        self.base.update(model).await.map_err(db_err)?;
        Ok(())
    }

    async fn delete_application(&self, workspace_id: Uuid, id: Uuid) -> ApplicationResult<bool> {
        let result = entity::applications::Entity::delete_many()
            .filter(entity::applications::Column::Id.eq(id))
            .filter(entity::applications::Column::WorkspaceId.eq(workspace_id))
            .exec(self.db())
            .await
            .map_err(db_err)?;
        Ok(result.rows_affected > 0)
    }

    async fn list_applications(
        &self,
        project_id: Uuid,
        params: &ListParams,
    ) -> ApplicationResult<(Vec<Application>, u64)> {
        let base = entity::applications::Entity::find()
            .filter(entity::applications::Column::ProjectId.eq(project_id));

        let total = base.clone().count(self.db()).await.map_err(db_err)?;

        let (offset, limit) = params.to_offset_limit();
        let models = base
            .order_by_desc(entity::applications::Column::CreatedAt)
            .offset(offset)
            .limit(limit)
            .all(self.db())
            .await
            .map_err(db_err)?;

        models
            .into_iter()
            .map(|m| Application::try_from(m).map_err(decode_err))
            .collect::<ApplicationResult<Vec<_>>>()
            .map(|items| (items, total))
    }

    async fn create_execution(&self, execution: &CronJobExecution) -> ApplicationResult<()> {
        let model: entity::cronjob_executions::ActiveModel = execution.into();
        model.insert(self.db()).await.map_err(db_err)?;
        Ok(())
    }

    async fn update_execution(&self, execution: &CronJobExecution) -> ApplicationResult<()> {
        let model: entity::cronjob_executions::ActiveModel = execution.into();
        model.update(self.db()).await.map_err(db_err)?;
        Ok(())
    }

    async fn list_executions(
        &self,
        application_id: Uuid,
        params: &ListParams,
    ) -> ApplicationResult<(Vec<CronJobExecution>, u64)> {
        let base = entity::cronjob_executions::Entity::find()
            .filter(entity::cronjob_executions::Column::ApplicationId.eq(application_id));

        let total = base.clone().count(self.db()).await.map_err(db_err)?;

        let (offset, limit) = params.to_offset_limit();
        let models = base
            .order_by_desc(entity::cronjob_executions::Column::StartedAt)
            .offset(offset)
            .limit(limit)
            .all(self.db())
            .await
            .map_err(db_err)?;

        Ok((models.into_iter().map(Into::into).collect(), total))
    }

    async fn create_backup_policy(&self, policy: &BackupPolicy) -> ApplicationResult<()> {
        let exists = entity::backup_policies::Entity::find()
            .filter(entity::backup_policies::Column::ApplicationId.eq(policy.application_id))
            .one(self.db())
            .await
            .map_err(db_err)?
            .is_some();
        if exists {
            return Err(ApplicationError::AlreadyExists(format!(
                "backup policy for application {}",
                policy.application_id
            )));
        }

        let model: entity::backup_policies::ActiveModel = policy.into();
        model.insert(self.db()).await.map_err(db_err)?;
        Ok(())
    }

    async fn get_backup_policy(
        &self,
        application_id: Uuid,
    ) -> ApplicationResult<Option<BackupPolicy>> {
        let model = entity::backup_policies::Entity::find()
            .filter(entity::backup_policies::Column::ApplicationId.eq(application_id))
            .one(self.db())
            .await
            .map_err(db_err)?;
        Ok(model.map(Into::into))
    }

    async fn update_backup_policy(&self, policy: &BackupPolicy) -> ApplicationResult<()> {
        let model: entity::backup_policies::ActiveModel = policy.into();
        model.update(self.db()).await.map_err(db_err)?;
        Ok(())
    }

    async fn delete_backup_policy(&self, application_id: Uuid) -> ApplicationResult<bool> {
        let result = entity::backup_policies::Entity::delete_many()
            .filter(entity::backup_policies::Column::ApplicationId.eq(application_id))
            .exec(self.db())
            .await
            .map_err(db_err)?;
        Ok(result.rows_affected > 0)
    }
}
