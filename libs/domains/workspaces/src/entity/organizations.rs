use sea_orm::entity::prelude::*;
use sea_orm::ActiveValue::Set;

#[derive(Clone, Debug, PartialEq, DeriveEntityModel)]
#[sea_orm(table_name = "organizations")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,
    pub name: String,
    pub owner_user_id: Uuid,
    pub created_at: DateTimeWithTimeZone,
    pub updated_at: DateTimeWithTimeZone,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}

impl From<Model> for crate::models::Organization {
    fn from(model: Model) -> Self {
        Self {
            id: model.id,
            name: model.name,
            owner_user_id: model.owner_user_id,
            created_at: model.created_at.into(),
            updated_at: model.updated_at.into(),
        }
    }
}

impl From<&crate::models::Organization> for ActiveModel {
    fn from(org: &crate::models::Organization) -> Self {
        ActiveModel {
            id: Set(org.id),
            name: Set(org.name.clone()),
            owner_user_id: Set(org.owner_user_id),
            created_at: Set(org.created_at.into()),
            updated_at: Set(org.updated_at.into()),
        }
    }
}
