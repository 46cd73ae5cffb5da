use axum_helpers::OrgRole;
use sea_orm::entity::prelude::*;
use sea_orm::ActiveValue::Set;
use std::str::FromStr;

#[derive(Clone, Debug, PartialEq, DeriveEntityModel)]
#[sea_orm(table_name = "organization_users")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub organization_id: Uuid,
    #[sea_orm(primary_key, auto_increment = false)]
    pub user_id: Uuid,
    pub role: String,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}

impl From<Model> for crate::models::OrganizationMember {
    fn from(model: Model) -> Self {
        Self {
            organization_id: model.organization_id,
            user_id: model.user_id,
            // Unknown roles degrade to member rather than failing the read
            role: OrgRole::from_str(&model.role).unwrap_or(OrgRole::Member),
        }
    }
}

impl From<&crate::models::OrganizationMember> for ActiveModel {
    fn from(member: &crate::models::OrganizationMember) -> Self {
        ActiveModel {
            organization_id: Set(member.organization_id),
            user_id: Set(member.user_id),
            role: Set(member.role.to_string()),
        }
    }
}
