use crate::models::InvocationState;
use sea_orm::entity::prelude::*;
use sea_orm::ActiveValue::Set;

#[derive(Clone, Debug, PartialEq, DeriveEntityModel)]
#[sea_orm(table_name = "invocations")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub invocation_id: String,
    pub function_id: Uuid,
    pub workspace_id: Uuid,
    pub status: InvocationState,
    pub started_at: DateTimeWithTimeZone,
    pub completed_at: Option<DateTimeWithTimeZone>,
    pub result: Option<Json>,
    #[sea_orm(column_type = "Text", nullable)]
    pub error: Option<String>,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}

impl From<Model> for crate::models::InvocationStatus {
    fn from(model: Model) -> Self {
        Self {
            invocation_id: model.invocation_id,
            function_id: model.function_id,
            workspace_id: model.workspace_id,
            status: model.status,
            started_at: model.started_at.into(),
            completed_at: model.completed_at.map(Into::into),
            result: model.result,
            error: model.error,
        }
    }
}

impl From<&crate::models::InvocationStatus> for ActiveModel {
    fn from(invocation: &crate::models::InvocationStatus) -> Self {
        ActiveModel {
            invocation_id: Set(invocation.invocation_id.clone()),
            function_id: Set(invocation.function_id),
            workspace_id: Set(invocation.workspace_id),
            status: Set(invocation.status),
            started_at: Set(invocation.started_at.into()),
            completed_at: Set(invocation.completed_at.map(Into::into)),
            result: Set(invocation.result.clone()),
            error: Set(invocation.error.clone()),
        }
    }
}
