use async_trait::async_trait;
use axum_helpers::pagination::ListParams;
use database::BaseRepository;
use sea_orm::{
    ActiveModelTrait, ActiveValue::Set, ColumnTrait, DatabaseConnection, EntityTrait,
    PaginatorTrait, QueryFilter, QueryOrder, QuerySelect, TransactionTrait,
};
use uuid::Uuid;

use crate::{
    entity,
    error::{FunctionError, FunctionResult},
    models::{
        FunctionAuditEvent, FunctionDef, FunctionTrigger, FunctionVersion, InvocationStatus,
        ProviderConfig,
    },
    repository::FunctionRepository,
};

pub struct PgFunctionRepository {
    base: BaseRepository<entity::functions::Entity>,
}

impl PgFunctionRepository {
    pub fn new(db: DatabaseConnection) -> Self {
        Self {
            base: BaseRepository::new(db),
        }
    }

    fn db(&self) -> &DatabaseConnection {
        self.base.db()
    }
}

fn db_err(e: sea_orm::DbErr) -> FunctionError {
    FunctionError::Internal(format!("Database error: {}", e))
}

fn decode_err(e: serde_json::Error) -> FunctionError {
    FunctionError::Internal(format!("Stored trigger config is invalid: {}", e))
}

#[async_trait]
impl FunctionRepository for PgFunctionRepository {
    async fn create_function(&self, function: &FunctionDef) -> FunctionResult<()> {
        let name_taken = entity::functions::Entity::find()
            .filter(entity::functions::Column::ProjectId.eq(function.project_id))
            .filter(entity::functions::Column::Name.eq(function.name.clone()))
            .one(self.db())
            .await
            .map_err(db_err)?
            .is_some();
        if name_taken {
            return Err(FunctionError::AlreadyExists(format!(
                "function '{}'",
                function.name
            )));
        }

        let model: entity::functions::ActiveModel = function.into();
        self.base.insert(model).await.map_err(db_err)?;
        tracing::info!(function_id = %function.id, "Created function");
        Ok(())
    }

    async fn get_function(
        &self,
        workspace_id: Uuid,
        id: Uuid,
    ) -> FunctionResult<Option<FunctionDef>> {
        let model = entity::functions::Entity::find_by_id(id)
            .filter(entity::functions::Column::WorkspaceId.eq(workspace_id))
            .one(self.db())
            .await
            .map_err(db_err)?;
        Ok(model.map(Into::into))
    }

    async fn update_function(&self, function: &FunctionDef) -> FunctionResult<()> {
        let model: entity::functions::ActiveModel = function.into();
        self.base.update(model).await.map_err(db_err)?;
        Ok(())
    }

    async fn delete_function(&self, workspace_id: Uuid, id: Uuid) -> FunctionResult<bool> {
        let result = entity::functions::Entity::delete_many()
            .filter(entity::functions::Column::Id.eq(id))
            .filter(entity::functions::Column::WorkspaceId.eq(workspace_id))
            .exec(self.db())
            .await
            .map_err(db_err)?;
        Ok(result.rows_affected > 0)
    }

    async fn list_functions(
        &self,
        workspace_id: Uuid,
        params: &ListParams,
    ) -> FunctionResult<(Vec<FunctionDef>, u64)> {
        let base = entity::functions::Entity::find()
            .filter(entity::functions::Column::WorkspaceId.eq(workspace_id));

        let total = base.clone().count(self.db()).await.map_err(db_err)?;

        let (offset, limit) = params.to_offset_limit();
        let models = base
            .order_by_desc(entity::functions::Column::CreatedAt)
            .offset(offset)
            .limit(limit)
            .all(self.db())
            .await
            .map_err(db_err)?;

        Ok((models.into_iter().map(Into::into).collect(), total))
    }

    async fn create_version(&self, version: &FunctionVersion) -> FunctionResult<()> {
        let model: entity::function_versions::ActiveModel = version.into();
        model.insert(self.db()).await.map_err(db_err)?;
        Ok(())
    }

    async fn get_version(&self, id: Uuid) -> FunctionResult<Option<FunctionVersion>> {
        let model = entity::function_versions::Entity::find_by_id(id)
            .one(self.db())
            .await
            .map_err(db_err)?;
        Ok(model.map(Into::into))
    }

    async fn list_versions(&self, function_id: Uuid) -> FunctionResult<Vec<FunctionVersion>> {
        let models = entity::function_versions::Entity::find()
            .filter(entity::function_versions::Column::FunctionId.eq(function_id))
            .order_by_asc(entity::function_versions::Column::Version)
            .all(self.db())
            .await
            .map_err(db_err)?;
        Ok(models.into_iter().map(Into::into).collect())
    }

    async fn activate_version(&self, function_id: Uuid, version_id: Uuid) -> FunctionResult<()> {
        let txn = self.db().begin().await.map_err(db_err)?;

        let function = entity::functions::Entity::find_by_id(function_id)
            .one(&txn)
            .await
            .map_err(db_err)?
            .ok_or_else(|| FunctionError::NotFound(format!("function {}", function_id)))?;

        let version = entity::function_versions::Entity::find_by_id(version_id)
            .one(&txn)
            .await
            .map_err(db_err)?
            .filter(|v| v.function_id == function_id)
            .ok_or_else(|| FunctionError::NotFound(format!("version {}", version_id)))?;

        // Clear the previous flag and set the new one in the same transaction
        if let Some(previous_id) = function.active_version_id {
            if previous_id != version_id {
                if let Some(previous) = entity::function_versions::Entity::find_by_id(previous_id)
                    .one(&txn)
                    .await
                    .map_err(db_err)?
                {
                    let mut active: entity::function_versions::ActiveModel = previous.into();
                    active.is_active = Set(false);
                    active.update(&txn).await.map_err(db_err)?;
                }
            }
        }

        let mut version_active: entity::function_versions::ActiveModel = version.into();
        version_active.is_active = Set(true);
        version_active.update(&txn).await.map_err(db_err)?;

        let mut function_active: entity::functions::ActiveModel = function.into();
        function_active.active_version_id = Set(Some(version_id));
        function_active.updated_at = Set(chrono::Utc::now().into());
        function_active.update(&txn).await.map_err(db_err)?;

        txn.commit().await.map_err(db_err)?;
        Ok(())
    }

    async fn create_trigger(&self, trigger: &FunctionTrigger) -> FunctionResult<()> {
        let name_taken = entity::function_triggers::Entity::find()
            .filter(entity::function_triggers::Column::FunctionId.eq(trigger.function_id))
            .filter(entity::function_triggers::Column::Name.eq(trigger.name.clone()))
            .one(self.db())
            .await
            .map_err(db_err)?
            .is_some();
        if name_taken {
            return Err(FunctionError::AlreadyExists(format!(
                "trigger '{}'",
                trigger.name
            )));
        }

        let model: entity::function_triggers::ActiveModel = trigger.into();
        model.insert(self.db()).await.map_err(db_err)?;
        Ok(())
    }

    async fn get_trigger(&self, id: Uuid) -> FunctionResult<Option<FunctionTrigger>> {
        let model = entity::function_triggers::Entity::find_by_id(id)
            .one(self.db())
            .await
            .map_err(db_err)?;
        model
            .map(|m| FunctionTrigger::try_from(m).map_err(decode_err))
            .transpose()
    }

    async fn update_trigger(&self, trigger: &FunctionTrigger) -> FunctionResult<()> {
        let model: entity::function_triggers::ActiveModel = trigger.into();
        model.update(self.db()).await.map_err(db_err)?;
        Ok(())
    }

    async fn delete_trigger(&self, id: Uuid) -> FunctionResult<bool> {
        let result = entity::function_triggers::Entity::delete_by_id(id)
            .exec(self.db())
            .await
            .map_err(db_err)?;
        Ok(result.rows_affected > 0)
    }

    async fn list_triggers(&self, function_id: Uuid) -> FunctionResult<Vec<FunctionTrigger>> {
        let models = entity::function_triggers::Entity::find()
            .filter(entity::function_triggers::Column::FunctionId.eq(function_id))
            .order_by_asc(entity::function_triggers::Column::CreatedAt)
            .all(self.db())
            .await
            .map_err(db_err)?;

        models
            .into_iter()
            .map(|m| FunctionTrigger::try_from(m).map_err(decode_err))
            .collect()
    }

    async fn record_invocation(&self, invocation: &InvocationStatus) -> FunctionResult<()> {
        let model: entity::invocations::ActiveModel = invocation.into();
        model.insert(self.db()).await.map_err(db_err)?;
        Ok(())
    }

    async fn get_invocation(
        &self,
        invocation_id: &str,
    ) -> FunctionResult<Option<InvocationStatus>> {
        let model = entity::invocations::Entity::find_by_id(invocation_id.to_string())
            .one(self.db())
            .await
            .map_err(db_err)?;
        Ok(model.map(Into::into))
    }

    async fn update_invocation(&self, invocation: &InvocationStatus) -> FunctionResult<()> {
        let model: entity::invocations::ActiveModel = invocation.into();
        model.update(self.db()).await.map_err(db_err)?;
        Ok(())
    }

    async fn list_invocations(
        &self,
        function_id: Uuid,
        params: &ListParams,
    ) -> FunctionResult<(Vec<InvocationStatus>, u64)> {
        let base = entity::invocations::Entity::find()
            .filter(entity::invocations::Column::FunctionId.eq(function_id));

        let total = base.clone().count(self.db()).await.map_err(db_err)?;

        let (offset, limit) = params.to_offset_limit();
        let models = base
            .order_by_desc(entity::invocations::Column::StartedAt)
            .offset(offset)
            .limit(limit)
            .all(self.db())
            .await
            .map_err(db_err)?;

        Ok((models.into_iter().map(Into::into).collect(), total))
    }

    async fn get_provider_config(
        &self,
        workspace_id: Uuid,
    ) -> FunctionResult<Option<ProviderConfig>> {
        let model = entity::provider_configs::Entity::find_by_id(workspace_id)
            .one(self.db())
            .await
            .map_err(db_err)?;
        Ok(model.map(Into::into))
    }

    async fn upsert_provider_config(&self, config: &ProviderConfig) -> FunctionResult<()> {
        let existing = entity::provider_configs::Entity::find_by_id(config.workspace_id)
            .one(self.db())
            .await
            .map_err(db_err)?;

        let model: entity::provider_configs::ActiveModel = config.into();
        if existing.is_some() {
            model.update(self.db()).await.map_err(db_err)?;
        } else {
            model.insert(self.db()).await.map_err(db_err)?;
        }
        Ok(())
    }

    async fn append_audit_event(&self, event: &FunctionAuditEvent) -> FunctionResult<()> {
        let model: entity::function_audit_events::ActiveModel = event.into();
        model.insert(self.db()).await.map_err(db_err)?;
        Ok(())
    }

    async fn list_audit_events(&self, subject_id: Uuid) -> FunctionResult<Vec<FunctionAuditEvent>> {
        let models = entity::function_audit_events::Entity::find()
            .filter(entity::function_audit_events::Column::SubjectId.eq(subject_id))
            .order_by_asc(entity::function_audit_events::Column::CreatedAt)
            .all(self.db())
            .await
            .map_err(db_err)?;
        Ok(models.into_iter().map(Into::into).collect())
    }
}
