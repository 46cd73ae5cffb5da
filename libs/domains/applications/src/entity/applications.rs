use crate::models::{AppKind, AppSource, AppStatus, DeploymentStrategy, Port, Toleration};
use sea_orm::entity::prelude::*;
use sea_orm::ActiveValue::Set;
use std::collections::HashMap;

#[derive(Clone, Debug, PartialEq, DeriveEntityModel)]
#[sea_orm(table_name = "applications")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,
    pub workspace_id: Uuid,
    pub project_id: Uuid,
    pub name: String,
    pub kind: AppKind,
    /// Tagged source variant stored as JSONB
    pub source: Json,
    pub replicas: i32,
    pub env: Json,
    pub ports: Json,
    pub strategy: DeploymentStrategy,
    pub status: AppStatus,
    pub cron_schedule: Option<String>,
    pub command: Option<Json>,
    pub args: Option<Json>,
    pub template_app_id: Option<Uuid>,
    pub is_template: bool,
    pub node_selector: Json,
    pub tolerations: Json,
    pub created_at: DateTimeWithTimeZone,
    pub updated_at: DateTimeWithTimeZone,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}

impl TryFrom<Model> for crate::models::Application {
    type Error = serde_json::Error;

    fn try_from(model: Model) -> Result<Self, Self::Error> {
        let source: AppSource = serde_json::from_value(model.source)?;
        let env: HashMap<String, String> =
            serde_json::from_value(model.env).unwrap_or_default();
        let ports: Vec<Port> = serde_json::from_value(model.ports).unwrap_or_default();
        let node_selector: HashMap<String, String> =
            serde_json::from_value(model.node_selector).unwrap_or_default();
        let tolerations: Vec<Toleration> =
            serde_json::from_value(model.tolerations).unwrap_or_default();
        let command = model
            .command
            .and_then(|c| serde_json::from_value(c).ok());
        let args = model.args.and_then(|a| serde_json::from_value(a).ok());

        Ok(Self {
            id: model.id,
            workspace_id: model.workspace_id,
            project_id: model.project_id,
            name: model.name,
            kind: model.kind,
            source,
            replicas: model.replicas,
            env,
            ports,
            strategy: model.strategy,
            status: model.status,
            cron_schedule: model.cron_schedule,
            command,
            args,
            template_app_id: model.template_app_id,
            is_template: model.is_template,
            node_selector,
            tolerations,
            created_at: model.created_at.into(),
            updated_at: model.updated_at.into(),
        })
    }
}

impl From<&crate::models::Application> for ActiveModel {
    fn from(app: &crate::models::Application) -> Self {
        ActiveModel {
            id: Set(app.id),
            workspace_id: Set(app.workspace_id),
            project_id: Set(app.project_id),
            name: Set(app.name.clone()),
            kind: Set(app.kind),
            source: Set(serde_json::to_value(&app.source).expect("source always serializes")),
            replicas: Set(app.replicas),
            env: Set(serde_json::to_value(&app.env).expect("env always serializes")),
            ports: Set(serde_json::to_value(&app.ports).expect("ports always serialize")),
            strategy: Set(app.strategy),
            status: Set(app.status),
            cron_schedule: Set(app.cron_schedule.clone()),
            command: Set(app
                .command
                .as_ref()
                .map(|c| serde_json::to_value(c).expect("command always serializes"))),
            args: Set(app
                .args
                .as_ref()
                .map(|a| serde_json::to_value(a).expect("args always serialize"))),
            template_app_id: Set(app.template_app_id),
            is_template: Set(app.is_template),
            node_selector: Set(serde_json::to_value(&app.node_selector)
                .expect("node selector always serializes")),
            tolerations: Set(serde_json::to_value(&app.tolerations)
                .expect("tolerations always serialize")),
            created_at: Set(app.created_at.into()),
            updated_at: Set(app.updated_at.into()),
        }
    }
}
