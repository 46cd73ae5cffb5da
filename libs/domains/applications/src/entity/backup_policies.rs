use sea_orm::entity::prelude::*;
use sea_orm::ActiveValue::Set;

#[derive(Clone, Debug, PartialEq, DeriveEntityModel)]
#[sea_orm(table_name = "backup_policies")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,
    pub application_id: Uuid,
    pub storage_id: String,
    pub schedule: String,
    pub retention_days: i32,
    pub include_volumes: bool,
    pub include_database: bool,
    pub compression: bool,
    pub encryption: bool,
    pub created_at: DateTimeWithTimeZone,
    pub updated_at: DateTimeWithTimeZone,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}

impl From<Model> for crate::models::BackupPolicy {
    fn from(model: Model) -> Self {
        Self {
            id: model.id,
            application_id: model.application_id,
            storage_id: model.storage_id,
            schedule: model.schedule,
            retention_days: model.retention_days,
            include_volumes: model.include_volumes,
            include_database: model.include_database,
            compression: model.compression,
            encryption: model.encryption,
            created_at: model.created_at.into(),
            updated_at: model.updated_at.into(),
        }
    }
}

impl From<&crate::models::BackupPolicy> for ActiveModel {
    fn from(policy: &crate::models::BackupPolicy) -> Self {
        ActiveModel {
            id: Set(policy.id),
            application_id: Set(policy.application_id),
            storage_id: Set(policy.storage_id.clone()),
            schedule: Set(policy.schedule.clone()),
            retention_days: Set(policy.retention_days),
            include_volumes: Set(policy.include_volumes),
            include_database: Set(policy.include_database),
            compression: Set(policy.compression),
            encryption: Set(policy.encryption),
            created_at: Set(policy.created_at.into()),
            updated_at: Set(policy.updated_at.into()),
        }
    }
}
