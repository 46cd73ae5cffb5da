use crate::models::{TriggerConfig, TriggerType};
use sea_orm::entity::prelude::*;
use sea_orm::ActiveValue::Set;

#[derive(Clone, Debug, PartialEq, DeriveEntityModel)]
#[sea_orm(table_name = "function_triggers")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,
    pub function_id: Uuid,
    pub name: String,
    pub trigger_type: TriggerType,
    /// Tagged config variant stored as JSONB
    pub config: Json,
    pub created_at: DateTimeWithTimeZone,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}

impl TryFrom<Model> for crate::models::FunctionTrigger {
    type Error = serde_json::Error;

    fn try_from(model: Model) -> Result<Self, Self::Error> {
        let config: TriggerConfig = serde_json::from_value(model.config)?;
        Ok(Self {
            id: model.id,
            function_id: model.function_id,
            name: model.name,
            config,
            created_at: model.created_at.into(),
        })
    }
}

impl From<&crate::models::FunctionTrigger> for ActiveModel {
    fn from(trigger: &crate::models::FunctionTrigger) -> Self {
        let config =
            serde_json::to_value(&trigger.config).expect("trigger config always serializes");
        ActiveModel {
            id: Set(trigger.id),
            function_id: Set(trigger.function_id),
            name: Set(trigger.name.clone()),
            trigger_type: Set(trigger.config.trigger_type()),
            config: Set(config),
            created_at: Set(trigger.created_at.into()),
        }
    }
}
