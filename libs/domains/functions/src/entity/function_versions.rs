use sea_orm::entity::prelude::*;
use sea_orm::ActiveValue::Set;

#[derive(Clone, Debug, PartialEq, DeriveEntityModel)]
#[sea_orm(table_name = "function_versions")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,
    pub function_id: Uuid,
    pub version: i32,
    #[sea_orm(column_type = "Text", nullable)]
    pub source_code: Option<String>,
    pub image: Option<String>,
    pub is_active: bool,
    pub created_at: DateTimeWithTimeZone,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}

impl From<Model> for crate::models::FunctionVersion {
    fn from(model: Model) -> Self {
        Self {
            id: model.id,
            function_id: model.function_id,
            version: model.version,
            source_code: model.source_code,
            image: model.image,
            is_active: model.is_active,
            created_at: model.created_at.into(),
        }
    }
}

impl From<&crate::models::FunctionVersion> for ActiveModel {
    fn from(version: &crate::models::FunctionVersion) -> Self {
        ActiveModel {
            id: Set(version.id),
            function_id: Set(version.function_id),
            version: Set(version.version),
            source_code: Set(version.source_code.clone()),
            image: Set(version.image.clone()),
            is_active: Set(version.is_active),
            created_at: Set(version.created_at.into()),
        }
    }
}
