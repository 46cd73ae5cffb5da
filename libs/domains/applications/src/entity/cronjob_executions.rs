use crate::models::ExecutionStatus;
use sea_orm::entity::prelude::*;
use sea_orm::ActiveValue::Set;

#[derive(Clone, Debug, PartialEq, DeriveEntityModel)]
#[sea_orm(table_name = "cronjob_executions")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,
    pub application_id: Uuid,
    pub job_name: String,
    pub started_at: DateTimeWithTimeZone,
    pub completed_at: Option<DateTimeWithTimeZone>,
    pub status: ExecutionStatus,
    pub exit_code: Option<i32>,
    #[sea_orm(column_type = "Text", nullable)]
    pub logs: Option<String>,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}

impl From<Model> for crate::models::CronJobExecution {
    fn from(model: Model) -> Self {
        Self {
            id: model.id,
            application_id: model.application_id,
            job_name: model.job_name,
            started_at: model.started_at.into(),
            completed_at: model.completed_at.map(Into::into),
            status: model.status,
            exit_code: model.exit_code,
            logs: model.logs,
        }
    }
}

impl From<&crate::models::CronJobExecution> for ActiveModel {
    fn from(execution: &crate::models::CronJobExecution) -> Self {
        ActiveModel {
            id: Set(execution.id),
            application_id: Set(execution.application_id),
            job_name: Set(execution.job_name.clone()),
            started_at: Set(execution.started_at.into()),
            completed_at: Set(execution.completed_at.map(Into::into)),
            status: Set(execution.status),
            exit_code: Set(execution.exit_code),
            logs: Set(execution.logs.clone()),
        }
    }
}
