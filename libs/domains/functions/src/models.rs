use chrono::{DateTime, Utc};
use sea_orm::{DeriveActiveEnum, EnumIter};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::str::FromStr;
use strum::Display;
use utoipa::ToSchema;
use uuid::Uuid;
use validator::Validate;

/// Build/deploy status of a function definition
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
#[sea_orm(rs_type = "String", db_type = "Enum", enum_name = "function_status")]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum FunctionStatus {
    #[default]
    #[sea_orm(string_value = "pending")]
    Pending,
    #[sea_orm(string_value = "building")]
    Building,
    #[sea_orm(string_value = "ready")]
    Ready,
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
    DeriveActiveEnum,
    EnumIter,
    ToSchema,
)]
#[sea_orm(rs_type = "String", db_type = "Enum", enum_name = "trigger_type")]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum TriggerType {
    #[sea_orm(string_value = "http")]
    Http,
    #[sea_orm(string_value = "schedule")]
    Schedule,
    #[sea_orm(string_value = "event")]
    Event,
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
#[sea_orm(rs_type = "String", db_type = "Enum", enum_name = "invocation_state")]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum InvocationState {
    #[default]
    #[sea_orm(string_value = "running")]
    Running,
    #[sea_orm(string_value = "completed")]
    Completed,
    #[sea_orm(string_value = "failed")]
    Failed,
}

/// Serverless backend variant
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
#[sea_orm(rs_type = "String", db_type = "Enum", enum_name = "provider_kind")]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum ProviderKind {
    #[default]
    #[sea_orm(string_value = "fission")]
    Fission,
    #[sea_orm(string_value = "knative")]
    Knative,
    #[sea_orm(string_value = "mock")]
    Mock,
}

/// Function definition owned by a workspace + project
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct FunctionDef {
    pub id: Uuid,
    pub workspace_id: Uuid,
    pub project_id: Uuid,
    /// Unique within the project namespace
    pub name: String,
    pub runtime: String,
    pub handler: String,
    pub active_version_id: Option<Uuid>,
    pub status: FunctionStatus,
    /// Provider-assigned fields, opaque to the core
    pub provider_metadata: serde_json::Value,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// One deployed revision of a function; version numbers are monotonic per
/// function and assigned by the provider.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct FunctionVersion {
    pub id: Uuid,
    pub function_id: Uuid,
    pub version: i32,
    pub source_code: Option<String>,
    pub image: Option<String>,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
}

/// Type-specific trigger configuration (tagged variant; unknown types fail
/// deserialization at the boundary).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum TriggerConfig {
    Http { method: String, path: String },
    Schedule { cron: String },
    Event { event_type: String, source: String },
}

impl TriggerConfig {
    pub fn trigger_type(&self) -> TriggerType {
        match self {
            TriggerConfig::Http { .. } => TriggerType::Http,
            TriggerConfig::Schedule { .. } => TriggerType::Schedule,
            TriggerConfig::Event { .. } => TriggerType::Event,
        }
    }

    pub fn validate_config(&self) -> Result<(), String> {
        match self {
            TriggerConfig::Http { method, path } => {
                const METHODS: [&str; 5] = ["GET", "POST", "PUT", "DELETE", "PATCH"];
                if !METHODS.contains(&method.to_uppercase().as_str()) {
                    return Err(format!("unsupported HTTP method '{method}'"));
                }
                if !path.starts_with('/') {
                    return Err("HTTP trigger path must start with '/'".to_string());
                }
                Ok(())
            }
            TriggerConfig::Schedule { cron } => validate_cron_expression(cron),
            TriggerConfig::Event { event_type, source } => {
                if event_type.trim().is_empty() || source.trim().is_empty() {
                    return Err("event trigger needs event_type and source".to_string());
                }
                Ok(())
            }
        }
    }
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

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct FunctionTrigger {
    pub id: Uuid,
    pub function_id: Uuid,
    /// Unique per function
    pub name: String,
    pub config: TriggerConfig,
    pub created_at: DateTime<Utc>,
}

/// Create/update input for a trigger
#[derive(Debug, Clone, Deserialize, Validate, ToSchema)]
pub struct TriggerSpec {
    #[validate(length(min = 1, max = 63))]
    pub name: String,
    pub config: TriggerConfig,
}

/// Provider-facing function specification
#[derive(Debug, Clone, Serialize, Deserialize, Validate, ToSchema)]
pub struct FunctionSpec {
    #[validate(length(min = 1, max = 63))]
    pub name: String,
    #[validate(length(min = 1))]
    pub runtime: String,
    #[validate(length(min = 1))]
    pub handler: String,
    /// Set by the service to the owning project's id; client values ignored
    #[serde(default)]
    pub namespace: Option<String>,
    #[serde(default)]
    pub env: HashMap<String, String>,
}

/// Deploy input for a new version
#[derive(Debug, Clone, Serialize, Deserialize, Default, ToSchema)]
pub struct VersionSpec {
    /// Assigned by the service before the provider call
    #[serde(default)]
    pub function_name: Option<String>,
    #[serde(default)]
    pub namespace: Option<String>,
    pub source_code: Option<String>,
    pub image: Option<String>,
}

/// Synchronous or asynchronous invocation request
#[derive(Debug, Clone, Default, Serialize, Deserialize, ToSchema)]
pub struct InvokeRequest {
    #[serde(default)]
    pub method: Option<String>,
    #[serde(default)]
    pub headers: HashMap<String, String>,
    pub payload: Option<serde_json::Value>,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct InvokeResponse {
    pub status_code: u16,
    pub body: serde_json::Value,
    pub duration_ms: u64,
}

/// Invocation record; retained independently of the function's lifetime.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct InvocationStatus {
    pub invocation_id: String,
    pub function_id: Uuid,
    pub workspace_id: Uuid,
    pub status: InvocationState,
    pub started_at: DateTime<Utc>,
    pub completed_at: Option<DateTime<Utc>>,
    pub result: Option<serde_json::Value>,
    pub error: Option<String>,
}

/// Per-workspace provider selection
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct ProviderConfig {
    pub workspace_id: Uuid,
    pub kind: ProviderKind,
    /// Provider-specific settings (endpoints, credentials references)
    pub config: serde_json::Value,
    pub updated_at: DateTime<Utc>,
}

impl ProviderConfig {
    /// Default when a workspace has no stored configuration: Fission against
    /// the conventional controller endpoint.
    pub fn default_for(workspace_id: Uuid, fission_endpoint: &str) -> Self {
        Self {
            workspace_id,
            kind: ProviderKind::Fission,
            config: serde_json::json!({ "endpoint": fission_endpoint }),
            updated_at: Utc::now(),
        }
    }

    pub fn endpoint(&self) -> Option<String> {
        self.config
            .get("endpoint")
            .and_then(|v| v.as_str())
            .map(|s| s.to_string())
    }
}

/// Capabilities a provider advertises
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct ProviderCapabilities {
    pub name: String,
    pub version: String,
    pub supported_runtimes: Vec<String>,
    pub supported_trigger_types: Vec<TriggerType>,
    pub typical_cold_start_ms: u64,
    pub supports_async: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct ProviderHealth {
    pub healthy: bool,
    pub message: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize, ToSchema)]
pub struct LogsQuery {
    pub since: Option<DateTime<Utc>>,
    pub limit: Option<u32>,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct LogEntry {
    pub timestamp: DateTime<Utc>,
    pub message: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct FunctionMetrics {
    pub invocations_total: u64,
    pub errors_total: u64,
    pub avg_duration_ms: f64,
    pub cold_starts_total: u64,
}

/// Append-only audit record for function operations
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct FunctionAuditEvent {
    pub id: Uuid,
    pub workspace_id: Uuid,
    pub subject_id: Uuid,
    pub event_type: String,
    pub description: String,
    pub metadata: Option<serde_json::Value>,
    pub created_at: DateTime<Utc>,
}

impl FunctionAuditEvent {
    pub fn new(
        workspace_id: Uuid,
        subject_id: Uuid,
        event_type: &str,
        description: impl Into<String>,
    ) -> Self {
        Self {
            id: Uuid::now_v7(),
            workspace_id,
            subject_id,
            event_type: event_type.to_string(),
            description: description.into(),
            metadata: None,
            created_at: Utc::now(),
        }
    }

    /// Partition key (`YYYY-MM`) for the append-only table.
    pub fn month(&self) -> String {
        self.created_at.format("%Y-%m").to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cron_validation_accepts_five_fields() {
        assert!(validate_cron_expression("*/5 * * * *").is_ok());
        assert!(validate_cron_expression("0 3 * * 1").is_ok());
    }

    #[test]
    fn test_cron_validation_rejects_wrong_arity() {
        assert!(validate_cron_expression("* * * *").is_err());
        assert!(validate_cron_expression("0 * * * * *").is_err());
    }

    #[test]
    fn test_cron_validation_rejects_garbage() {
        assert!(validate_cron_expression("not a cron at all").is_err());
    }

    #[test]
    fn test_trigger_config_tagging() {
        let raw = serde_json::json!({ "type": "http", "method": "GET", "path": "/hello" });
        let config: TriggerConfig = serde_json::from_value(raw).unwrap();
        assert_eq!(config.trigger_type(), TriggerType::Http);
        assert!(config.validate_config().is_ok());
    }

    #[test]
    fn test_unknown_trigger_type_fails_deserialization() {
        let raw = serde_json::json!({ "type": "webhook", "url": "http://x" });
        assert!(serde_json::from_value::<TriggerConfig>(raw).is_err());
    }

    #[test]
    fn test_http_trigger_rejects_bad_method() {
        let config = TriggerConfig::Http {
            method: "FETCH".to_string(),
            path: "/x".to_string(),
        };
        assert!(config.validate_config().is_err());
    }
}
