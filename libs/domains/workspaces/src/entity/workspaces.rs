use crate::models::{VClusterStatus, WorkspacePlan};
use sea_orm::entity::prelude::*;
use sea_orm::ActiveValue::Set;

#[derive(Clone, Debug, PartialEq, DeriveEntityModel)]
#[sea_orm(table_name = "workspaces")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,
    pub organization_id: Uuid,
    pub name: String,
    pub plan: WorkspacePlan,
    pub vcluster_status: VClusterStatus,
    pub vcluster_instance_name: Option<String>,
    pub created_at: DateTimeWithTimeZone,
    pub updated_at: DateTimeWithTimeZone,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}

impl From<Model> for crate::models::Workspace {
    fn from(model: Model) -> Self {
        Self {
            id: model.id,
            organization_id: model.organization_id,
            name: model.name,
            plan: model.plan,
            vcluster_status: model.vcluster_status,
            vcluster_instance_name: model.vcluster_instance_name,
            created_at: model.created_at.into(),
            updated_at: model.updated_at.into(),
        }
    }
}

impl From<&crate::models::Workspace> for ActiveModel {
    fn from(ws: &crate::models::Workspace) -> Self {
        ActiveModel {
            id: Set(ws.id),
            organization_id: Set(ws.organization_id),
            name: Set(ws.name.clone()),
            plan: Set(ws.plan),
            vcluster_status: Set(ws.vcluster_status),
            vcluster_instance_name: Set(ws.vcluster_instance_name.clone()),
            created_at: Set(ws.created_at.into()),
            updated_at: Set(ws.updated_at.into()),
        }
    }
}
