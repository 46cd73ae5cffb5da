use sea_orm::entity::prelude::*;
use sea_orm::ActiveValue::Set;

#[derive(Clone, Debug, PartialEq, DeriveEntityModel)]
#[sea_orm(table_name = "users")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,
    pub external_id: String,
    pub provider: String,
    pub email: String,
    pub display_name: String,
    pub created_at: DateTimeWithTimeZone,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}

impl From<Model> for crate::models::User {
    fn from(model: Model) -> Self {
        Self {
            id: model.id,
            external_id: model.external_id,
            provider: model.provider,
            email: model.email,
            display_name: model.display_name,
            created_at: model.created_at.into(),
        }
    }
}

impl From<&crate::models::User> for ActiveModel {
    fn from(user: &crate::models::User) -> Self {
        ActiveModel {
            id: Set(user.id),
            external_id: Set(user.external_id.clone()),
            provider: Set(user.provider.clone()),
            email: Set(user.email.clone()),
            display_name: Set(user.display_name.clone()),
            created_at: Set(user.created_at.into()),
        }
    }
}
