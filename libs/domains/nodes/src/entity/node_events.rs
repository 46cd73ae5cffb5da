use sea_orm::entity::prelude::*;
use sea_orm::ActiveValue::Set;

#[derive(Clone, Debug, PartialEq, DeriveEntityModel)]
#[sea_orm(table_name = "node_events")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,
    pub workspace_id: Uuid,
    pub node_id: Uuid,
    pub event_type: String,
    #[sea_orm(column_type = "Text")]
    pub description: String,
    pub metadata: Option<Json>,
    /// Partition key (`YYYY-MM`)
    pub month: String,
    pub created_at: DateTimeWithTimeZone,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}

impl From<Model> for crate::models::NodeEvent {
    fn from(model: Model) -> Self {
        Self {
            id: model.id,
            workspace_id: model.workspace_id,
            node_id: model.node_id,
            event_type: model.event_type,
            description: model.description,
            metadata: model.metadata,
            created_at: model.created_at.into(),
        }
    }
}

impl From<&crate::models::NodeEvent> for ActiveModel {
    fn from(event: &crate::models::NodeEvent) -> Self {
        ActiveModel {
            id: Set(event.id),
            workspace_id: Set(event.workspace_id),
            node_id: Set(event.node_id),
            event_type: Set(event.event_type.clone()),
            description: Set(event.description.clone()),
            metadata: Set(event.metadata.clone()),
            month: Set(event.month()),
            created_at: Set(event.created_at.into()),
        }
    }
}
