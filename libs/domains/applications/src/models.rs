use chrono::{DateTime, Utc};
use sea_orm::{DeriveActiveEnum, EnumIter};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::str::FromStr;
use strum::Display;
use utoipa::ToSchema;
use uuid::Uuid;
use validator::Validate;

/// Workload variant of an application
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Serialize,
    Deserialize,
    Display,
    DeriveActiveEnum,
    EnumIter,
    ToSchema,
)]
#[sea_orm(rs_type = "String", db_type = "Enum", enum_name = "app_kind")]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum AppKind {
    #[sea_orm(string_value = "stateless")]
    Stateless,
    #[sea_orm(string_value = "stateful")]
    Stateful,
    #[sea_orm(string_value = "cronjob")]
    Cronjob,
}

/// Rollout strategy, recorded on the application and passed through opaquely
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Serialize,
    Deserialize,
    Display,
    Default,
    DeriveActiveEnum,
    EnumIter,
    ToSchema,
)]
#[sea_orm(rs_type = "String", db_type = "Enum", enum_name = "deployment_strategy")]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum DeploymentStrategy {
    #[default]
    #[sea_orm(string_value = "rolling")]
    Rolling,
    #[sea_orm(string_value = "blue_green")]
    BlueGreen,
    #[sea_orm(string_value = "canary")]
    Canary,
}

#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Serialize,
    Deserialize,
    Display,
    Default,
    DeriveActiveEnum,
    EnumIter,
    ToSchema,
)]
#[sea_orm(rs_type = "String", db_type = "Enum", enum_name = "app_status")]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum AppStatus {
    #[default]
    #[sea_orm(string_value = "pending")]
    Pending,
    #[sea_orm(string_value = "deploying")]
    Deploying,
    #[sea_orm(string_value = "running")]
    Running,
    #[sea_orm(string_value = "failed")]
    Failed,
}

#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Serialize,
    Deserialize,
    Display,
    Default,
    DeriveActiveEnum,
    EnumIter,
    ToSchema,
)]
#[sea_orm(rs_type = "String", db_type = "Enum", enum_name = "execution_status")]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum ExecutionStatus {
    #[default]
    #[sea_orm(string_value = "running")]
    Running,
    #[sea_orm(string_value = "succeeded")]
    Succeeded,
    #[sea_orm(string_value = "failed")]
    Failed,
}

/// Workload source (tagged variant; unknown types fail at the boundary)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum AppSource {
    Image {
        image: String,
    },
    Git {
        repository: String,
        #[serde(default = "default_branch")]
        branch: String,
    },
}

fn default_branch() -> String {
    "main".to_string()
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct Port {
    pub name: String,
    pub container_port: u16,
    #[serde(default = "default_protocol")]
    pub protocol: String,
}

fn default_protocol() -> String {
    "TCP".to_string()
}

/// Toleration pinning a workload onto the dedicated pool
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct Toleration {
    pub key: String,
    pub value: String,
    pub effect: String,
}

/// Deployable workload record under a project
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct Application {
    pub id: Uuid,
    pub workspace_id: Uuid,
    pub project_id: Uuid,
    pub name: String,
    pub kind: AppKind,
    pub source: AppSource,
    pub replicas: i32,
    pub env: HashMap<String, String>,
    pub ports: Vec<Port>,
    pub strategy: DeploymentStrategy,
    pub status: AppStatus,
    /// 5-field cron expression; required for the cronjob kind
    pub cron_schedule: Option<String>,
    pub command: Option<Vec<String>>,
    pub args: Option<Vec<String>>,
    /// Template this application was created from
    pub template_app_id: Option<Uuid>,
    pub is_template: bool,
    /// Placement attached by the orchestrator on dedicated plans; never
    /// client input
    pub node_selector: HashMap<String, String>,
    pub tolerations: Vec<Toleration>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Deserialize, Validate, ToSchema)]
pub struct CreateApplication {
    #[validate(length(min = 1, max = 63))]
    pub name: String,
    pub kind: AppKind,
    pub source: AppSource,
    #[serde(default = "default_replicas")]
    pub replicas: i32,
    #[serde(default)]
    pub env: HashMap<String, String>,
    #[serde(default)]
    pub ports: Vec<Port>,
    #[serde(default)]
    pub strategy: DeploymentStrategy,
    pub cron_schedule: Option<String>,
    pub command: Option<Vec<String>>,
    pub args: Option<Vec<String>>,
    /// Create from an existing template
    pub template_app_id: Option<Uuid>,
}

fn default_replicas() -> i32 {
    1
}

#[derive(Debug, Clone, Default, Deserialize, Validate, ToSchema)]
pub struct UpdateApplication {
    pub source: Option<AppSource>,
    pub replicas: Option<i32>,
    pub env: Option<HashMap<String, String>>,
    pub ports: Option<Vec<Port>>,
    pub strategy: Option<DeploymentStrategy>,
    pub cron_schedule: Option<String>,
    pub command: Option<Vec<String>>,
    pub args: Option<Vec<String>>,
}

#[derive(Debug, Clone, Deserialize, ToSchema)]
pub struct ScaleRequest {
    pub replicas: i32,
}

#[derive(Debug, Clone, Deserialize, ToSchema)]
pub struct UpdateScheduleRequest {
    pub cron_schedule: String,
}

#[derive(Debug, Clone, Deserialize, Validate, ToSchema)]
pub struct SaveAsTemplateRequest {
    #[validate(length(min = 1, max = 63))]
    pub name: String,
    #[serde(default)]
    pub description: String,
}

/// One run of a CronJob application
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct CronJobExecution {
    pub id: Uuid,
    pub application_id: Uuid,
    pub job_name: String,
    pub started_at: DateTime<Utc>,
    pub completed_at: Option<DateTime<Utc>>,
    pub status: ExecutionStatus,
    pub exit_code: Option<i32>,
    pub logs: Option<String>,
}

/// Backup policy linked to an application.
///
/// When a CronJob is linked to a policy, the policy's schedule is the source
/// of truth; direct schedule edits on the CronJob are rejected.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct BackupPolicy {
    pub id: Uuid,
    pub application_id: Uuid,
    pub storage_id: String,
    pub schedule: String,
    pub retention_days: i32,
    pub include_volumes: bool,
    pub include_database: bool,
    pub compression: bool,
    pub encryption: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Deserialize, Validate, ToSchema)]
pub struct CreateBackupPolicy {
    #[validate(length(min = 1))]
    pub storage_id: String,
    pub schedule: String,
    #[validate(range(min = 1, max = 3650))]
    pub retention_days: i32,
    #[serde(default = "default_true")]
    pub include_volumes: bool,
    #[serde(default)]
    pub include_database: bool,
    #[serde(default = "default_true")]
    pub compression: bool,
    #[serde(default)]
    pub encryption: bool,
}

fn default_true() -> bool {
    true
}

#[derive(Debug, Clone, Default, Deserialize, Validate, ToSchema)]
pub struct UpdateBackupPolicy {
    pub schedule: Option<String>,
    #[validate(range(min = 1, max = 3650))]
    pub retention_days: Option<i32>,
    pub include_volumes: Option<bool>,
    pub include_database: Option<bool>,
    pub compression: Option<bool>,
    pub encryption: Option<bool>,
}

/// Validate a 5-field cron expression (minute hour day-of-month month
/// day-of-week). The `cron` crate wants a seconds field, so one is prepended
/// for parsing only.
pub fn validate_cron_expression(expr: &str) -> Result<(), String> {
    let fields = expr.split_whitespace().count();
    if fields != 5 {
        return Err(format!("cron expression must have 5 fields, got {fields}"));
    }
    cron::Schedule::from_str(&format!("0 {expr}"))
        .map(|_| ())
        .map_err(|e| format!("invalid cron expression: {e}"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cron_validation() {
        assert!(validate_cron_expression("0 3 * * *").is_ok());
        assert!(validate_cron_expression("*/15 * * * 1-5").is_ok());
        assert!(validate_cron_expression("0 3 * *").is_err());
        assert!(validate_cron_expression("61 3 * * *").is_err());
    }

    #[test]
    fn test_source_tagging() {
        let raw = serde_json::json!({ "type": "image", "image": "nginx:1.27" });
        let source: AppSource = serde_json::from_value(raw).unwrap();
        assert!(matches!(source, AppSource::Image { .. }));

        let raw = serde_json::json!({ "type": "git", "repository": "https://git.example/app" });
        let source: AppSource = serde_json::from_value(raw).unwrap();
        assert!(matches!(source, AppSource::Git { ref branch, .. } if branch == "main"));

        let raw = serde_json::json!({ "type": "helm", "chart": "x" });
        assert!(serde_json::from_value::<AppSource>(raw).is_err());
    }
}
