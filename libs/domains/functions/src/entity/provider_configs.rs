use crate::models::ProviderKind;
use sea_orm::entity::prelude::*;
use sea_orm::ActiveValue::Set;

#[derive(Clone, Debug, PartialEq, DeriveEntityModel)]
#[sea_orm(table_name = "provider_configs")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub workspace_id: Uuid,
    pub kind: ProviderKind,
    pub config: Json,
    pub updated_at: DateTimeWithTimeZone,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}

impl From<Model> for crate::models::ProviderConfig {
    fn from(model: Model) -> Self {
        Self {
            workspace_id: model.workspace_id,
            kind: model.kind,
            config: model.config,
            updated_at: model.updated_at.into(),
        }
    }
}

impl From<&crate::models::ProviderConfig> for ActiveModel {
    fn from(config: &crate::models::ProviderConfig) -> Self {
        ActiveModel {
            workspace_id: Set(config.workspace_id),
            kind: Set(config.kind),
            config: Set(config.config.clone()),
            updated_at: Set(config.updated_at.into()),
        }
    }
}
