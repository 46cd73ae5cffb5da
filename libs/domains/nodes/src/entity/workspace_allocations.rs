use crate::models::{PlanType, SharedQuota};
use sea_orm::entity::prelude::*;
use sea_orm::ActiveValue::Set;

#[derive(Clone, Debug, PartialEq, DeriveEntityModel)]
#[sea_orm(table_name = "workspace_allocations")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub workspace_id: Uuid,
    pub plan_type: PlanType,
    /// Present only on the shared plan
    pub shared_quota: Option<Json>,
    pub updated_at: DateTimeWithTimeZone,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}

impl From<Model> for crate::models::WorkspaceNodeAllocation {
    fn from(model: Model) -> Self {
        let shared_quota: Option<SharedQuota> = model
            .shared_quota
            .and_then(|q| serde_json::from_value(q).ok());

        Self {
            workspace_id: model.workspace_id,
            plan_type: model.plan_type,
            shared_quota,
            updated_at: model.updated_at.into(),
        }
    }
}

impl From<&crate::models::WorkspaceNodeAllocation> for ActiveModel {
    fn from(allocation: &crate::models::WorkspaceNodeAllocation) -> Self {
        let shared_quota = allocation
            .shared_quota
            .map(|q| serde_json::to_value(q).expect("quota always serializes"));

        ActiveModel {
            workspace_id: Set(allocation.workspace_id),
            plan_type: Set(allocation.plan_type),
            shared_quota: Set(shared_quota),
            updated_at: Set(allocation.updated_at.into()),
        }
    }
}
