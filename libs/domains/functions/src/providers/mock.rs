use crate::models::{
    FunctionMetrics, FunctionSpec, InvocationState, InvokeRequest, InvokeResponse, LogEntry,
    LogsQuery, ProviderCapabilities, ProviderHealth, TriggerSpec, TriggerType, VersionSpec,
};
use crate::provider::{
    FunctionProvider, ProviderError, ProviderFunction, ProviderInvocationStatus, ProviderResult,
};
use async_trait::async_trait;
use chrono::Utc;
use std::collections::HashMap;
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Arc;
use tokio::sync::RwLock;

/// In-memory provider for tests.
///
/// Fully supports the capability set and exposes call counters plus a
/// completion hook so tests can drive async invocation state transitions.
#[derive(Default)]
pub struct MockProvider {
    functions: RwLock<HashMap<(String, String), FunctionSpec>>,
    versions: RwLock<HashMap<String, Vec<i32>>>,
    active_versions: RwLock<HashMap<(String, String), i32>>,
    triggers: RwLock<HashMap<(String, String), HashMap<String, TriggerSpec>>>,
    invocations: RwLock<HashMap<String, ProviderInvocationStatus>>,
    invocation_counter: AtomicU32,
    pub create_function_calls: AtomicU32,
    pub delete_function_calls: AtomicU32,
}

impl MockProvider {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    fn key(namespace: &str, name: &str) -> (String, String) {
        (namespace.to_string(), name.to_string())
    }

    /// Number of functions currently known to the provider.
    pub async fn function_count(&self) -> usize {
        self.functions.read().await.len()
    }

    /// Flip an async invocation to `completed` with the given result.
    pub async fn complete_invocation(&self, invocation_id: &str, result: serde_json::Value) {
        let mut invocations = self.invocations.write().await;
        invocations.insert(
            invocation_id.to_string(),
            ProviderInvocationStatus {
                status: InvocationState::Completed,
                completed_at: Some(Utc::now()),
                result: Some(result),
                error: None,
            },
        );
    }
}

#[async_trait]
impl FunctionProvider for MockProvider {
    async fn create_function(&self, spec: &FunctionSpec) -> ProviderResult<ProviderFunction> {
        self.create_function_calls.fetch_add(1, Ordering::SeqCst);
        let namespace = spec.namespace.clone().unwrap_or_default();
        let mut functions = self.functions.write().await;
        let key = Self::key(&namespace, &spec.name);
        if functions.contains_key(&key) {
            return Err(ProviderError::AlreadyExists(spec.name.clone()));
        }
        functions.insert(key, spec.clone());

        Ok(ProviderFunction {
            name: spec.name.clone(),
            namespace,
            metadata: serde_json::json!({ "provider": "mock" }),
        })
    }

    async fn update_function(&self, spec: &FunctionSpec) -> ProviderResult<ProviderFunction> {
        let namespace = spec.namespace.clone().unwrap_or_default();
        let mut functions = self.functions.write().await;
        let key = Self::key(&namespace, &spec.name);
        if !functions.contains_key(&key) {
            return Err(ProviderError::NotFound(spec.name.clone()));
        }
        functions.insert(key, spec.clone());

        Ok(ProviderFunction {
            name: spec.name.clone(),
            namespace,
            metadata: serde_json::json!({ "provider": "mock" }),
        })
    }

    async fn delete_function(&self, name: &str, namespace: &str) -> ProviderResult<()> {
        self.delete_function_calls.fetch_add(1, Ordering::SeqCst);
        let mut functions = self.functions.write().await;
        functions
            .remove(&Self::key(namespace, name))
            .map(|_| ())
            .ok_or_else(|| ProviderError::NotFound(name.to_string()))
    }

    async fn get_function(&self, name: &str, namespace: &str) -> ProviderResult<ProviderFunction> {
        let functions = self.functions.read().await;
        functions
            .get(&Self::key(namespace, name))
            .map(|spec| ProviderFunction {
                name: spec.name.clone(),
                namespace: namespace.to_string(),
                metadata: serde_json::json!({ "provider": "mock" }),
            })
            .ok_or_else(|| ProviderError::NotFound(name.to_string()))
    }

    async fn create_version(&self, spec: &VersionSpec) -> ProviderResult<i32> {
        let function_name = spec
            .function_name
            .clone()
            .ok_or_else(|| ProviderError::InvalidSpec("missing function name".to_string()))?;

        let mut versions = self.versions.write().await;
        let list = versions.entry(function_name).or_default();
        let next = list.last().copied().unwrap_or(0) + 1;
        list.push(next);
        Ok(next)
    }

    async fn set_active_version(
        &self,
        name: &str,
        namespace: &str,
        version: i32,
    ) -> ProviderResult<()> {
        self.active_versions
            .write()
            .await
            .insert(Self::key(namespace, name), version);
        Ok(())
    }

    async fn create_trigger(
        &self,
        function: &str,
        namespace: &str,
        trigger: &TriggerSpec,
    ) -> ProviderResult<()> {
        let mut triggers = self.triggers.write().await;
        let entry = triggers.entry(Self::key(namespace, function)).or_default();
        if entry.contains_key(&trigger.name) {
            return Err(ProviderError::AlreadyExists(trigger.name.clone()));
        }
        entry.insert(trigger.name.clone(), trigger.clone());
        Ok(())
    }

    async fn update_trigger(
        &self,
        function: &str,
        namespace: &str,
        trigger: &TriggerSpec,
    ) -> ProviderResult<()> {
        let mut triggers = self.triggers.write().await;
        let entry = triggers.entry(Self::key(namespace, function)).or_default();
        if !entry.contains_key(&trigger.name) {
            return Err(ProviderError::NotFound(trigger.name.clone()));
        }
        entry.insert(trigger.name.clone(), trigger.clone());
        Ok(())
    }

    async fn delete_trigger(
        &self,
        function: &str,
        namespace: &str,
        trigger_name: &str,
    ) -> ProviderResult<()> {
        let mut triggers = self.triggers.write().await;
        triggers
            .get_mut(&Self::key(namespace, function))
            .and_then(|t| t.remove(trigger_name))
            .map(|_| ())
            .ok_or_else(|| ProviderError::NotFound(trigger_name.to_string()))
    }

    async fn invoke(
        &self,
        name: &str,
        namespace: &str,
        request: &InvokeRequest,
    ) -> ProviderResult<InvokeResponse> {
        self.get_function(name, namespace).await?;
        Ok(InvokeResponse {
            status_code: 200,
            body: serde_json::json!({ "echo": request.payload }),
            duration_ms: 5,
        })
    }

    async fn invoke_async(
        &self,
        name: &str,
        namespace: &str,
        _request: &InvokeRequest,
    ) -> ProviderResult<String> {
        self.get_function(name, namespace).await?;
        let id = format!(
            "mock-inv-{}",
            self.invocation_counter.fetch_add(1, Ordering::SeqCst)
        );
        self.invocations.write().await.insert(
            id.clone(),
            ProviderInvocationStatus {
                status: InvocationState::Running,
                completed_at: None,
                result: None,
                error: None,
            },
        );
        Ok(id)
    }

    async fn invocation_status(
        &self,
        invocation_id: &str,
    ) -> ProviderResult<ProviderInvocationStatus> {
        self.invocations
            .read()
            .await
            .get(invocation_id)
            .cloned()
            .ok_or_else(|| ProviderError::NotFound(invocation_id.to_string()))
    }

    async fn get_logs(
        &self,
        name: &str,
        namespace: &str,
        _query: &LogsQuery,
    ) -> ProviderResult<Vec<LogEntry>> {
        self.get_function(name, namespace).await?;
        Ok(vec![LogEntry {
            timestamp: Utc::now(),
            message: format!("{name}: mock log line"),
        }])
    }

    async fn get_metrics(&self, name: &str, namespace: &str) -> ProviderResult<FunctionMetrics> {
        self.get_function(name, namespace).await?;
        Ok(FunctionMetrics {
            invocations_total: 0,
            errors_total: 0,
            avg_duration_ms: 0.0,
            cold_starts_total: 0,
        })
    }

    fn capabilities(&self) -> ProviderCapabilities {
        ProviderCapabilities {
            name: "mock".to_string(),
            version: "1.0".to_string(),
            supported_runtimes: vec![
                "python".to_string(),
                "nodejs".to_string(),
                "go".to_string(),
            ],
            supported_trigger_types: vec![
                TriggerType::Http,
                TriggerType::Schedule,
                TriggerType::Event,
            ],
            typical_cold_start_ms: 10,
            supports_async: true,
        }
    }

    async fn health(&self) -> ProviderResult<ProviderHealth> {
        Ok(ProviderHealth {
            healthy: true,
            message: None,
        })
    }
}
