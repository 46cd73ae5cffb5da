use crate::models::FunctionStatus;
use sea_orm::entity::prelude::*;
use sea_orm::ActiveValue::Set;

#[derive(Clone, Debug, PartialEq, DeriveEntityModel)]
#[sea_orm(table_name = "functions")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,
    pub workspace_id: Uuid,
    pub project_id: Uuid,
    pub name: String,
    pub runtime: String,
    pub handler: String,
    pub active_version_id: Option<Uuid>,
    pub status: FunctionStatus,
    pub provider_metadata: Json,
    pub created_at: DateTimeWithTimeZone,
    pub updated_at: DateTimeWithTimeZone,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}

impl From<Model> for crate::models::FunctionDef {
    fn from(model: Model) -> Self {
        Self {
            id: model.id,
            workspace_id: model.workspace_id,
            project_id: model.project_id,
            name: model.name,
            runtime: model.runtime,
            handler: model.handler,
            active_version_id: model.active_version_id,
            status: model.status,
            provider_metadata: model.provider_metadata,
            created_at: model.created_at.into(),
            updated_at: model.updated_at.into(),
        }
    }
}

impl From<&crate::models::FunctionDef> for ActiveModel {
    fn from(function: &crate::models::FunctionDef) -> Self {
        ActiveModel {
            id: Set(function.id),
            workspace_id: Set(function.workspace_id),
            project_id: Set(function.project_id),
            name: Set(function.name.clone()),
            runtime: Set(function.runtime.clone()),
            handler: Set(function.handler.clone()),
            active_version_id: Set(function.active_version_id),
            status: Set(function.status),
            provider_metadata: Set(function.provider_metadata.clone()),
            created_at: Set(function.created_at.into()),
            updated_at: Set(function.updated_at.into()),
        }
    }
}
