use sea_orm::entity::prelude::*;
use sea_orm::ActiveValue::Set;

#[derive(Clone, Debug, PartialEq, DeriveEntityModel)]
#[sea_orm(table_name = "projects")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,
    pub workspace_id: Uuid,
    pub parent_id: Option<Uuid>,
    pub name: String,
    pub namespace: String,
    /// JSONB snapshot of the project quotas
    pub quotas: Option<Json>,
    pub created_at: DateTimeWithTimeZone,
    pub updated_at: DateTimeWithTimeZone,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}

impl From<Model> for crate::models::Project {
    fn from(model: Model) -> Self {
        let quotas = model
            .quotas
            .and_then(|q| serde_json::from_value(q).ok());

        Self {
            id: model.id,
            workspace_id: model.workspace_id,
            parent_id: model.parent_id,
            name: model.name,
            namespace: model.namespace,
            quotas,
            created_at: model.created_at.into(),
            updated_at: model.updated_at.into(),
        }
    }
}

impl From<&crate::models::Project> for ActiveModel {
    fn from(project: &crate::models::Project) -> Self {
        let quotas = project
            .quotas
            .as_ref()
            .map(|q| serde_json::to_value(q).expect("quotas always serialize"));

        ActiveModel {
            id: Set(project.id),
            workspace_id: Set(project.workspace_id),
            parent_id: Set(project.parent_id),
            name: Set(project.name.clone()),
            namespace: Set(project.namespace.clone()),
            quotas: Set(quotas),
            created_at: Set(project.created_at.into()),
            updated_at: Set(project.updated_at.into()),
        }
    }
}
