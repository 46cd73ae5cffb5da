use crate::models::{
    FunctionMetrics, FunctionSpec, InvocationState, InvokeRequest, InvokeResponse, LogEntry,
    LogsQuery, ProviderCapabilities, ProviderHealth, TriggerSpec, VersionSpec,
};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use thiserror::Error;

/// Errors a provider may raise. Callers must degrade gracefully on
/// `NotSupported` rather than treating it as a failure.
#[derive(Debug, Error)]
pub enum ProviderError {
    #[error("function or resource not found: {0}")]
    NotFound(String),

    #[error("already exists: {0}")]
    AlreadyExists(String),

    #[error("invalid spec: {0}")]
    InvalidSpec(String),

    #[error("provider unavailable: {0}")]
    Unavailable(String),

    #[error("operation not supported by this provider: {0}")]
    NotSupported(String),

    #[error("provider internal error: {0}")]
    Internal(String),
}

pub type ProviderResult<T> = Result<T, ProviderError>;

/// Provider's view of a function after create/update
#[derive(Debug, Clone)]
pub struct ProviderFunction {
    pub name: String,
    pub namespace: String,
    /// Provider-assigned metadata the core persists opaquely
    pub metadata: serde_json::Value,
}

/// Provider's view of an async invocation
#[derive(Debug, Clone)]
pub struct ProviderInvocationStatus {
    pub status: InvocationState,
    pub completed_at: Option<DateTime<Utc>>,
    pub result: Option<serde_json::Value>,
    pub error: Option<String>,
}

/// Pluggable serverless backend.
///
/// Implementations hold no workspace identity; the function service composes
/// them per workspace through the provider registry.
#[async_trait]
pub trait FunctionProvider: Send + Sync {
    async fn create_function(&self, spec: &FunctionSpec) -> ProviderResult<ProviderFunction>;

    async fn update_function(&self, spec: &FunctionSpec) -> ProviderResult<ProviderFunction>;

    async fn delete_function(&self, name: &str, namespace: &str) -> ProviderResult<()>;

    async fn get_function(&self, name: &str, namespace: &str) -> ProviderResult<ProviderFunction>;

    /// Create a new version; returns the monotonic version number the
    /// provider assigned.
    async fn create_version(&self, spec: &VersionSpec) -> ProviderResult<i32>;

    async fn set_active_version(
        &self,
        name: &str,
        namespace: &str,
        version: i32,
    ) -> ProviderResult<()>;

    async fn create_trigger(
        &self,
        function: &str,
        namespace: &str,
        trigger: &TriggerSpec,
    ) -> ProviderResult<()>;

    async fn update_trigger(
        &self,
        function: &str,
        namespace: &str,
        trigger: &TriggerSpec,
    ) -> ProviderResult<()>;

    async fn delete_trigger(
        &self,
        function: &str,
        namespace: &str,
        trigger_name: &str,
    ) -> ProviderResult<()>;

    async fn invoke(
        &self,
        name: &str,
        namespace: &str,
        request: &InvokeRequest,
    ) -> ProviderResult<InvokeResponse>;

    /// Fire-and-forget invocation; returns the provider's invocation id.
    async fn invoke_async(
        &self,
        name: &str,
        namespace: &str,
        request: &InvokeRequest,
    ) -> ProviderResult<String>;

    async fn invocation_status(
        &self,
        invocation_id: &str,
    ) -> ProviderResult<ProviderInvocationStatus>;

    async fn get_logs(
        &self,
        name: &str,
        namespace: &str,
        query: &LogsQuery,
    ) -> ProviderResult<Vec<LogEntry>>;

    async fn get_metrics(&self, name: &str, namespace: &str) -> ProviderResult<FunctionMetrics>;

    fn capabilities(&self) -> ProviderCapabilities;

    async fn health(&self) -> ProviderResult<ProviderHealth>;
}
