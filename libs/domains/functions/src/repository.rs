use async_trait::async_trait;
use axum_helpers::pagination::ListParams;
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicU32, Ordering};
use std::sync::Arc;
use tokio::sync::RwLock;
use uuid::Uuid;

use crate::error::{FunctionError, FunctionResult};
use crate::models::{
    FunctionAuditEvent, FunctionDef, FunctionTrigger, FunctionVersion, InvocationStatus,
    ProviderConfig,
};

/// Repository for functions, versions, triggers, invocations, provider
/// configuration, and audit events.
///
/// `list_versions` returns versions ordered by `version` ascending; rollback
/// depends on that order and it must not change.
#[async_trait]
pub trait FunctionRepository: Send + Sync {
    async fn create_function(&self, function: &FunctionDef) -> FunctionResult<()>;

    async fn get_function(
        &self,
        workspace_id: Uuid,
        id: Uuid,
    ) -> FunctionResult<Option<FunctionDef>>;

    async fn update_function(&self, function: &FunctionDef) -> FunctionResult<()>;

    async fn delete_function(&self, workspace_id: Uuid, id: Uuid) -> FunctionResult<bool>;

    async fn list_functions(
        &self,
        workspace_id: Uuid,
        params: &ListParams,
    ) -> FunctionResult<(Vec<FunctionDef>, u64)>;

    async fn create_version(&self, version: &FunctionVersion) -> FunctionResult<()>;

    async fn get_version(&self, id: Uuid) -> FunctionResult<Option<FunctionVersion>>;

    /// Ordered by `version` ascending.
    async fn list_versions(&self, function_id: Uuid) -> FunctionResult<Vec<FunctionVersion>>;

    /// Point the function at `version_id` and flip the `is_active` flags, all
    /// in one transaction, so the flag and `active_version_id` never disagree
    /// in a committed state.
    async fn activate_version(&self, function_id: Uuid, version_id: Uuid) -> FunctionResult<()>;

    async fn create_trigger(&self, trigger: &FunctionTrigger) -> FunctionResult<()>;

    async fn get_trigger(&self, id: Uuid) -> FunctionResult<Option<FunctionTrigger>>;

    async fn update_trigger(&self, trigger: &FunctionTrigger) -> FunctionResult<()>;

    async fn delete_trigger(&self, id: Uuid) -> FunctionResult<bool>;

    async fn list_triggers(&self, function_id: Uuid) -> FunctionResult<Vec<FunctionTrigger>>;

    async fn record_invocation(&self, invocation: &InvocationStatus) -> FunctionResult<()>;

    async fn get_invocation(&self, invocation_id: &str)
        -> FunctionResult<Option<InvocationStatus>>;

    async fn update_invocation(&self, invocation: &InvocationStatus) -> FunctionResult<()>;

    async fn list_invocations(
        &self,
        function_id: Uuid,
        params: &ListParams,
    ) -> FunctionResult<(Vec<InvocationStatus>, u64)>;

    async fn get_provider_config(
        &self,
        workspace_id: Uuid,
    ) -> FunctionResult<Option<ProviderConfig>>;

    async fn upsert_provider_config(&self, config: &ProviderConfig) -> FunctionResult<()>;

    /// Append-only; callers treat failures as best-effort.
    async fn append_audit_event(&self, event: &FunctionAuditEvent) -> FunctionResult<()>;

    async fn list_audit_events(&self, subject_id: Uuid) -> FunctionResult<Vec<FunctionAuditEvent>>;
}

/// In-memory implementation (development and tests).
///
/// Exposes counters and failure knobs so service tests can assert caching
/// behavior and exercise compensation paths.
#[derive(Default)]
pub struct InMemoryFunctionRepository {
    functions: RwLock<HashMap<Uuid, FunctionDef>>,
    versions: RwLock<HashMap<Uuid, FunctionVersion>>,
    triggers: RwLock<HashMap<Uuid, FunctionTrigger>>,
    invocations: RwLock<HashMap<String, InvocationStatus>>,
    provider_configs: RwLock<HashMap<Uuid, ProviderConfig>>,
    audit_events: RwLock<Vec<FunctionAuditEvent>>,
    pub provider_config_reads: AtomicU32,
    pub fail_function_creates: AtomicBool,
    pub fail_audit_appends: AtomicBool,
}

impl InMemoryFunctionRepository {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub async fn audit_event_count(&self) -> usize {
        self.audit_events.read().await.len()
    }
}

fn paginate<T: Clone>(items: Vec<T>, params: &ListParams) -> (Vec<T>, u64) {
    let total = items.len() as u64;
    let (offset, limit) = params.to_offset_limit();
    (
        items
            .into_iter()
            .skip(offset as usize)
            .take(limit as usize)
            .collect(),
        total,
    )
}

#[async_trait]
impl FunctionRepository for InMemoryFunctionRepository {
    async fn create_function(&self, function: &FunctionDef) -> FunctionResult<()> {
        if self.fail_function_creates.load(Ordering::SeqCst) {
            return Err(FunctionError::Internal("injected store failure".to_string()));
        }
        let mut functions = self.functions.write().await;
        if functions.contains_key(&function.id) {
            return Err(FunctionError::AlreadyExists(format!("function {}", function.id)));
        }
        let name_taken = functions
            .values()
            .any(|f| f.project_id == function.project_id && f.name == function.name);
        if name_taken {
            return Err(FunctionError::AlreadyExists(format!("function '{}'", function.name)));
        }
        functions.insert(function.id, function.clone());
        Ok(())
    }

    async fn get_function(
        &self,
        workspace_id: Uuid,
        id: Uuid,
    ) -> FunctionResult<Option<FunctionDef>> {
        Ok(self
            .functions
            .read()
            .await
            .get(&id)
            .filter(|f| f.workspace_id == workspace_id)
            .cloned())
    }

    async fn update_function(&self, function: &FunctionDef) -> FunctionResult<()> {
        let mut functions = self.functions.write().await;
        if !functions.contains_key(&function.id) {
            return Err(FunctionError::NotFound(format!("function {}", function.id)));
        }
        functions.insert(function.id, function.clone());
        Ok(())
    }

    async fn delete_function(&self, workspace_id: Uuid, id: Uuid) -> FunctionResult<bool> {
        let mut functions = self.functions.write().await;
        match functions.get(&id) {
            Some(f) if f.workspace_id == workspace_id => {
                functions.remove(&id);
                self.versions
                    .write()
                    .await
                    .retain(|_, v| v.function_id != id);
                self.triggers
                    .write()
                    .await
                    .retain(|_, t| t.function_id != id);
                Ok(true)
            }
            _ => Ok(false),
        }
    }

    async fn list_functions(
        &self,
        workspace_id: Uuid,
        params: &ListParams,
    ) -> FunctionResult<(Vec<FunctionDef>, u64)> {
        let functions = self.functions.read().await;
        let mut result: Vec<FunctionDef> = functions
            .values()
            .filter(|f| f.workspace_id == workspace_id)
            .cloned()
            .collect();
        result.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(paginate(result, params))
    }

    async fn create_version(&self, version: &FunctionVersion) -> FunctionResult<()> {
        let mut versions = self.versions.write().await;
        if versions.contains_key(&version.id) {
            return Err(FunctionError::AlreadyExists(format!("version {}", version.id)));
        }
        versions.insert(version.id, version.clone());
        Ok(())
    }

    async fn get_version(&self, id: Uuid) -> FunctionResult<Option<FunctionVersion>> {
        Ok(self.versions.read().await.get(&id).cloned())
    }

    async fn list_versions(&self, function_id: Uuid) -> FunctionResult<Vec<FunctionVersion>> {
        let versions = self.versions.read().await;
        let mut result: Vec<FunctionVersion> = versions
            .values()
            .filter(|v| v.function_id == function_id)
            .cloned()
            .collect();
        result.sort_by_key(|v| v.version);
        Ok(result)
    }

    async fn activate_version(&self, function_id: Uuid, version_id: Uuid) -> FunctionResult<()> {
        let mut functions = self.functions.write().await;
        let function = functions
            .get_mut(&function_id)
            .ok_or_else(|| FunctionError::NotFound(format!("function {}", function_id)))?;

        let mut versions = self.versions.write().await;
        if !versions
            .get(&version_id)
            .map(|v| v.function_id == function_id)
            .unwrap_or(false)
        {
            return Err(FunctionError::NotFound(format!("version {}", version_id)));
        }

        for version in versions.values_mut() {
            if version.function_id == function_id {
                version.is_active = version.id == version_id;
            }
        }
        function.active_version_id = Some(version_id);
        function.updated_at = chrono::Utc::now();
        Ok(())
    }

    async fn create_trigger(&self, trigger: &FunctionTrigger) -> FunctionResult<()> {
        let mut triggers = self.triggers.write().await;
        let name_taken = triggers
            .values()
            .any(|t| t.function_id == trigger.function_id && t.name == trigger.name);
        if name_taken {
            return Err(FunctionError::AlreadyExists(format!("trigger '{}'", trigger.name)));
        }
        triggers.insert(trigger.id, trigger.clone());
        Ok(())
    }

    async fn get_trigger(&self, id: Uuid) -> FunctionResult<Option<FunctionTrigger>> {
        Ok(self.triggers.read().await.get(&id).cloned())
    }

    async fn update_trigger(&self, trigger: &FunctionTrigger) -> FunctionResult<()> {
        let mut triggers = self.triggers.write().await;
        if !triggers.contains_key(&trigger.id) {
            return Err(FunctionError::NotFound(format!("trigger {}", trigger.id)));
        }
        triggers.insert(trigger.id, trigger.clone());
        Ok(())
    }

    async fn delete_trigger(&self, id: Uuid) -> FunctionResult<bool> {
        Ok(self.triggers.write().await.remove(&id).is_some())
    }

    async fn list_triggers(&self, function_id: Uuid) -> FunctionResult<Vec<FunctionTrigger>> {
        let triggers = self.triggers.read().await;
        let mut result: Vec<FunctionTrigger> = triggers
            .values()
            .filter(|t| t.function_id == function_id)
            .cloned()
            .collect();
        result.sort_by(|a, b| a.created_at.cmp(&b.created_at));
        Ok(result)
    }

    async fn record_invocation(&self, invocation: &InvocationStatus) -> FunctionResult<()> {
        self.invocations
            .write()
            .await
            .insert(invocation.invocation_id.clone(), invocation.clone());
        Ok(())
    }

    async fn get_invocation(
        &self,
        invocation_id: &str,
    ) -> FunctionResult<Option<InvocationStatus>> {
        Ok(self.invocations.read().await.get(invocation_id).cloned())
    }

    async fn update_invocation(&self, invocation: &InvocationStatus) -> FunctionResult<()> {
        let mut invocations = self.invocations.write().await;
        if !invocations.contains_key(&invocation.invocation_id) {
            return Err(FunctionError::NotFound(format!(
                "invocation {}",
                invocation.invocation_id
            )));
        }
        invocations.insert(invocation.invocation_id.clone(), invocation.clone());
        Ok(())
    }

    async fn list_invocations(
        &self,
        function_id: Uuid,
        params: &ListParams,
    ) -> FunctionResult<(Vec<InvocationStatus>, u64)> {
        let invocations = self.invocations.read().await;
        let mut result: Vec<InvocationStatus> = invocations
            .values()
            .filter(|i| i.function_id == function_id)
            .cloned()
            .collect();
        result.sort_by(|a, b| b.started_at.cmp(&a.started_at));
        Ok(paginate(result, params))
    }

    async fn get_provider_config(
        &self,
        workspace_id: Uuid,
    ) -> FunctionResult<Option<ProviderConfig>> {
        self.provider_config_reads.fetch_add(1, Ordering::SeqCst);
        Ok(self.provider_configs.read().await.get(&workspace_id).cloned())
    }

    async fn upsert_provider_config(&self, config: &ProviderConfig) -> FunctionResult<()> {
        self.provider_configs
            .write()
            .await
            .insert(config.workspace_id, config.clone());
        Ok(())
    }

    async fn append_audit_event(&self, event: &FunctionAuditEvent) -> FunctionResult<()> {
        if self.fail_audit_appends.load(Ordering::SeqCst) {
            return Err(FunctionError::Internal("injected audit failure".to_string()));
        }
        self.audit_events.write().await.push(event.clone());
        Ok(())
    }

    async fn list_audit_events(&self, subject_id: Uuid) -> FunctionResult<Vec<FunctionAuditEvent>> {
        let events = self.audit_events.read().await;
        let mut result: Vec<FunctionAuditEvent> = events
            .iter()
            .filter(|e| e.subject_id == subject_id)
            .cloned()
            .collect();
        result.sort_by(|a, b| a.created_at.cmp(&b.created_at));
        Ok(result)
    }
}
