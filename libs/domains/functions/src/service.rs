use axum_helpers::pagination::{ListParams, Page};
use chrono::Utc;
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;
use uuid::Uuid;
use validator::Validate;

use crate::error::{FunctionError, FunctionResult};
use crate::models::{
    FunctionAuditEvent, FunctionDef, FunctionMetrics, FunctionSpec, FunctionStatus,
    FunctionTrigger, FunctionVersion, InvocationState, InvocationStatus, InvokeRequest,
    InvokeResponse, LogEntry, LogsQuery, ProviderCapabilities, ProviderConfig, ProviderHealth,
    ProviderKind, TriggerSpec, VersionSpec,
};
use crate::provider::{FunctionProvider, ProviderError, ProviderResult};
use crate::registry::{ProviderFactory, ProviderRegistry};
use crate::repository::FunctionRepository;

/// Outer bound for provider CRUD calls.
pub const FUNCTION_CRUD_TIMEOUT: Duration = Duration::from_secs(30);
/// Outer bound for synchronous invocation.
pub const INVOKE_TIMEOUT: Duration = Duration::from_secs(120);

/// Function service: CRUD, versions, triggers, invocation, provider caching.
///
/// Side effects on the provider happen outside store transactions; when the
/// store write fails after a provider write succeeded, a compensating
/// provider call runs before the error surfaces.
pub struct FunctionService<R: FunctionRepository> {
    repository: Arc<R>,
    registry: Arc<ProviderRegistry>,
    factory: Arc<dyn ProviderFactory>,
    default_fission_endpoint: String,
}

impl<R: FunctionRepository> Clone for FunctionService<R> {
    fn clone(&self) -> Self {
        Self {
            repository: self.repository.clone(),
            registry: self.registry.clone(),
            factory: self.factory.clone(),
            default_fission_endpoint: self.default_fission_endpoint.clone(),
        }
    }
}

impl<R: FunctionRepository> FunctionService<R> {
    pub fn new(
        repository: Arc<R>,
        factory: Arc<dyn ProviderFactory>,
        default_fission_endpoint: String,
    ) -> Self {
        Self {
            repository,
            registry: Arc::new(ProviderRegistry::new()),
            factory,
            default_fission_endpoint,
        }
    }

    /// Resolve the provider for a workspace.
    ///
    /// Single-flight per workspace: config read and factory construction run
    /// at most once until the entry is invalidated.
    async fn provider(&self, workspace_id: Uuid) -> FunctionResult<Arc<dyn FunctionProvider>> {
        let cell = self.registry.entry(workspace_id).await;
        let provider = cell
            .get_or_try_init(|| async {
                let config = self
                    .repository
                    .get_provider_config(workspace_id)
                    .await?
                    .unwrap_or_else(|| {
                        ProviderConfig::default_for(workspace_id, &self.default_fission_endpoint)
                    });
                self.factory
                    .create_provider(&config)
                    .await
                    .map_err(FunctionError::from)
            })
            .await?;
        Ok(provider.clone())
    }

    async fn bounded<T>(
        &self,
        limit: Duration,
        what: &str,
        fut: impl Future<Output = ProviderResult<T>>,
    ) -> FunctionResult<T> {
        match tokio::time::timeout(limit, fut).await {
            Ok(result) => result.map_err(FunctionError::from),
            Err(_) => Err(FunctionError::Timeout(format!(
                "{what} exceeded {}s",
                limit.as_secs()
            ))),
        }
    }

    /// Best-effort audit write: failures are logged, never propagated.
    async fn audit(&self, event: FunctionAuditEvent) {
        if let Err(e) = self.repository.append_audit_event(&event).await {
            tracing::warn!(
                subject_id = %event.subject_id,
                event_type = %event.event_type,
                "failed to append audit event: {}",
                e
            );
        }
    }

    async fn load_function(&self, workspace_id: Uuid, id: Uuid) -> FunctionResult<FunctionDef> {
        self.repository
            .get_function(workspace_id, id)
            .await?
            .ok_or_else(|| FunctionError::NotFound(format!("function {}", id)))
    }

    // ---- function CRUD ----

    pub async fn create_function(
        &self,
        workspace_id: Uuid,
        project_id: Uuid,
        mut spec: FunctionSpec,
    ) -> FunctionResult<FunctionDef> {
        spec.validate()
            .map_err(|e| FunctionError::Validation(e.to_string()))?;
        // The namespace is always the owning project, never client input
        spec.namespace = Some(project_id.to_string());

        let provider = self.provider(workspace_id).await?;
        let created = self
            .bounded(
                FUNCTION_CRUD_TIMEOUT,
                "create function",
                provider.create_function(&spec),
            )
            .await?;

        let now = Utc::now();
        let function = FunctionDef {
            id: Uuid::now_v7(),
            workspace_id,
            project_id,
            name: spec.name.clone(),
            runtime: spec.runtime.clone(),
            handler: spec.handler.clone(),
            active_version_id: None,
            status: FunctionStatus::Ready,
            provider_metadata: created.metadata,
            created_at: now,
            updated_at: now,
        };

        if let Err(store_err) = self.repository.create_function(&function).await {
            // Roll the provider back so no half-created function lingers
            let namespace = project_id.to_string();
            if let Err(comp_err) = provider.delete_function(&spec.name, &namespace).await {
                return Err(FunctionError::Internal(format!(
                    "store write failed ({store_err}) and provider compensation failed ({comp_err})"
                )));
            }
            return Err(store_err);
        }

        self.audit(FunctionAuditEvent::new(
            workspace_id,
            function.id,
            "created",
            format!("function '{}' created", function.name),
        ))
        .await;

        Ok(function)
    }

    pub async fn update_function(
        &self,
        workspace_id: Uuid,
        function_id: Uuid,
        mut spec: FunctionSpec,
    ) -> FunctionResult<FunctionDef> {
        spec.validate()
            .map_err(|e| FunctionError::Validation(e.to_string()))?;

        let existing = self.load_function(workspace_id, function_id).await?;
        spec.namespace = Some(existing.project_id.to_string());

        let provider = self.provider(workspace_id).await?;
        let updated = self
            .bounded(
                FUNCTION_CRUD_TIMEOUT,
                "update function",
                provider.update_function(&spec),
            )
            .await?;

        let function = FunctionDef {
            name: spec.name,
            runtime: spec.runtime,
            handler: spec.handler,
            provider_metadata: updated.metadata,
            updated_at: Utc::now(),
            ..existing
        };
        self.repository.update_function(&function).await?;

        self.audit(FunctionAuditEvent::new(
            workspace_id,
            function.id,
            "updated",
            format!("function '{}' updated", function.name),
        ))
        .await;

        Ok(function)
    }

    /// Delete from the provider first, then the store.
    ///
    /// A store failure after provider success orphans the row; the periodic
    /// [`Self::sweep_orphaned_functions`] pass reconciles it.
    pub async fn delete_function(
        &self,
        workspace_id: Uuid,
        function_id: Uuid,
    ) -> FunctionResult<()> {
        let function = self.load_function(workspace_id, function_id).await?;
        let provider = self.provider(workspace_id).await?;

        let namespace = function.project_id.to_string();
        match provider.delete_function(&function.name, &namespace).await {
            Ok(()) | Err(ProviderError::NotFound(_)) => {}
            Err(e) => return Err(e.into()),
        }

        if let Err(store_err) = self.repository.delete_function(workspace_id, function_id).await {
            return Err(FunctionError::Internal(format!(
                "provider delete succeeded but store delete failed ({store_err}); \
                 row will be reconciled by the orphan sweep"
            )));
        }

        self.audit(FunctionAuditEvent::new(
            workspace_id,
            function_id,
            "deleted",
            format!("function '{}' deleted", function.name),
        ))
        .await;

        Ok(())
    }

    pub async fn get_function(
        &self,
        workspace_id: Uuid,
        function_id: Uuid,
    ) -> FunctionResult<FunctionDef> {
        self.load_function(workspace_id, function_id).await
    }

    pub async fn list_functions(
        &self,
        workspace_id: Uuid,
        params: ListParams,
    ) -> FunctionResult<Page<FunctionDef>> {
        let (items, total) = self.repository.list_functions(workspace_id, &params).await?;
        Ok(Page::new(items, total, &params))
    }

    /// Remove store rows whose provider-side function no longer exists.
    pub async fn sweep_orphaned_functions(&self, workspace_id: Uuid) -> FunctionResult<u32> {
        let provider = self.provider(workspace_id).await?;
        let params = ListParams {
            page_size: axum_helpers::pagination::MAX_PAGE_SIZE,
            ..Default::default()
        };
        let (functions, _) = self.repository.list_functions(workspace_id, &params).await?;

        let mut swept = 0;
        for function in functions {
            let namespace = function.project_id.to_string();
            if let Err(ProviderError::NotFound(_)) =
                provider.get_function(&function.name, &namespace).await
            {
                self.repository
                    .delete_function(workspace_id, function.id)
                    .await?;
                swept += 1;
                tracing::info!(function_id = %function.id, "swept orphaned function row");
            }
        }
        Ok(swept)
    }

    // ---- versions ----

    pub async fn deploy_version(
        &self,
        workspace_id: Uuid,
        function_id: Uuid,
        mut spec: VersionSpec,
    ) -> FunctionResult<FunctionVersion> {
        let function = self.load_function(workspace_id, function_id).await?;
        spec.function_name = Some(function.name.clone());
        spec.namespace = Some(function.project_id.to_string());

        let provider = self.provider(workspace_id).await?;
        let version_number = self
            .bounded(
                FUNCTION_CRUD_TIMEOUT,
                "deploy version",
                provider.create_version(&spec),
            )
            .await?;

        let version = FunctionVersion {
            id: Uuid::now_v7(),
            function_id,
            version: version_number,
            source_code: spec.source_code,
            image: spec.image,
            is_active: false,
            created_at: Utc::now(),
        };
        self.repository.create_version(&version).await?;

        self.audit(FunctionAuditEvent::new(
            workspace_id,
            function_id,
            "deployed",
            format!("version {} deployed for '{}'", version.version, function.name),
        ))
        .await;

        Ok(version)
    }

    pub async fn list_versions(
        &self,
        workspace_id: Uuid,
        function_id: Uuid,
    ) -> FunctionResult<Vec<FunctionVersion>> {
        self.load_function(workspace_id, function_id).await?;
        self.repository.list_versions(function_id).await
    }

    /// Switch the active version: provider first, then the store.
    ///
    /// With this ordering a store failure leaves the provider already pointing
    /// at the intended version, so a retry restores consistency.
    pub async fn set_active_version(
        &self,
        workspace_id: Uuid,
        function_id: Uuid,
        version_id: Uuid,
    ) -> FunctionResult<FunctionDef> {
        let function = self.load_function(workspace_id, function_id).await?;
        let version = self
            .repository
            .get_version(version_id)
            .await?
            .filter(|v| v.function_id == function_id)
            .ok_or_else(|| FunctionError::NotFound(format!("version {}", version_id)))?;

        let provider = self.provider(workspace_id).await?;
        self.bounded(
            FUNCTION_CRUD_TIMEOUT,
            "set active version",
            provider.set_active_version(
                &function.name,
                &function.project_id.to_string(),
                version.version,
            ),
        )
        .await?;

        self.repository
            .activate_version(function_id, version_id)
            .await?;

        self.audit(FunctionAuditEvent::new(
            workspace_id,
            function_id,
            "version_activated",
            format!("version {} ({}) activated", version.version, version_id),
        ))
        .await;

        self.load_function(workspace_id, function_id).await
    }

    /// Roll back to the version adjacent below the active one.
    ///
    /// Versions are ordered by `version` ascending (the repository's
    /// documented order); with fewer than two versions, or the active version
    /// first in that order, there is nothing to roll back to.
    pub async fn rollback_version(
        &self,
        workspace_id: Uuid,
        function_id: Uuid,
    ) -> FunctionResult<FunctionDef> {
        let function = self.load_function(workspace_id, function_id).await?;
        let versions = self.repository.list_versions(function_id).await?;

        if versions.len() < 2 {
            return Err(FunctionError::InvalidState(
                "rollback needs at least two versions".to_string(),
            ));
        }

        let active_id = function.active_version_id.ok_or_else(|| {
            FunctionError::InvalidState("function has no active version".to_string())
        })?;
        let active_index = versions
            .iter()
            .position(|v| v.id == active_id)
            .ok_or_else(|| {
                FunctionError::InvalidState("active version is not in the version list".to_string())
            })?;

        if active_index == 0 {
            return Err(FunctionError::InvalidState(
                "active version has no predecessor".to_string(),
            ));
        }

        let target = versions[active_index - 1].id;
        self.set_active_version(workspace_id, function_id, target)
            .await
    }

    // ---- triggers ----

    pub async fn create_trigger(
        &self,
        workspace_id: Uuid,
        function_id: Uuid,
        spec: TriggerSpec,
    ) -> FunctionResult<FunctionTrigger> {
        spec.validate()
            .map_err(|e| FunctionError::Validation(e.to_string()))?;
        spec.config
            .validate_config()
            .map_err(FunctionError::Validation)?;

        let function = self.load_function(workspace_id, function_id).await?;
        let namespace = function.project_id.to_string();

        let provider = self.provider(workspace_id).await?;
        self.bounded(
            FUNCTION_CRUD_TIMEOUT,
            "create trigger",
            provider.create_trigger(&function.name, &namespace, &spec),
        )
        .await?;

        let trigger = FunctionTrigger {
            id: Uuid::now_v7(),
            function_id,
            name: spec.name.clone(),
            config: spec.config.clone(),
            created_at: Utc::now(),
        };

        if let Err(store_err) = self.repository.create_trigger(&trigger).await {
            if let Err(comp_err) = provider
                .delete_trigger(&function.name, &namespace, &spec.name)
                .await
            {
                return Err(FunctionError::Internal(format!(
                    "store write failed ({store_err}) and provider compensation failed ({comp_err})"
                )));
            }
            return Err(store_err);
        }

        Ok(trigger)
    }

    pub async fn update_trigger(
        &self,
        workspace_id: Uuid,
        function_id: Uuid,
        trigger_id: Uuid,
        spec: TriggerSpec,
    ) -> FunctionResult<FunctionTrigger> {
        spec.validate()
            .map_err(|e| FunctionError::Validation(e.to_string()))?;
        spec.config
            .validate_config()
            .map_err(FunctionError::Validation)?;

        let function = self.load_function(workspace_id, function_id).await?;
        let existing = self
            .repository
            .get_trigger(trigger_id)
            .await?
            .filter(|t| t.function_id == function_id)
            .ok_or_else(|| FunctionError::NotFound(format!("trigger {}", trigger_id)))?;

        let namespace = function.project_id.to_string();
        let provider = self.provider(workspace_id).await?;
        self.bounded(
            FUNCTION_CRUD_TIMEOUT,
            "update trigger",
            provider.update_trigger(&function.name, &namespace, &spec),
        )
        .await?;

        let updated = FunctionTrigger {
            name: spec.name.clone(),
            config: spec.config.clone(),
            ..existing.clone()
        };

        if let Err(store_err) = self.repository.update_trigger(&updated).await {
            // Put the provider back on the previous definition
            let previous = TriggerSpec {
                name: existing.name.clone(),
                config: existing.config.clone(),
            };
            if let Err(comp_err) = provider
                .update_trigger(&function.name, &namespace, &previous)
                .await
            {
                return Err(FunctionError::Internal(format!(
                    "store write failed ({store_err}) and provider compensation failed ({comp_err})"
                )));
            }
            return Err(store_err);
        }

        Ok(updated)
    }

    pub async fn delete_trigger(
        &self,
        workspace_id: Uuid,
        function_id: Uuid,
        trigger_id: Uuid,
    ) -> FunctionResult<()> {
        let function = self.load_function(workspace_id, function_id).await?;
        let trigger = self
            .repository
            .get_trigger(trigger_id)
            .await?
            .filter(|t| t.function_id == function_id)
            .ok_or_else(|| FunctionError::NotFound(format!("trigger {}", trigger_id)))?;

        let provider = self.provider(workspace_id).await?;
        let namespace = function.project_id.to_string();
        match provider
            .delete_trigger(&function.name, &namespace, &trigger.name)
            .await
        {
            Ok(()) | Err(ProviderError::NotFound(_)) => {}
            Err(e) => return Err(e.into()),
        }

        self.repository.delete_trigger(trigger_id).await?;
        Ok(())
    }

    pub async fn list_triggers(
        &self,
        workspace_id: Uuid,
        function_id: Uuid,
    ) -> FunctionResult<Vec<FunctionTrigger>> {
        self.load_function(workspace_id, function_id).await?;
        self.repository.list_triggers(function_id).await
    }

    // ---- invocation ----

    pub async fn invoke_function(
        &self,
        workspace_id: Uuid,
        function_id: Uuid,
        request: InvokeRequest,
    ) -> FunctionResult<InvokeResponse> {
        let function = self.load_function(workspace_id, function_id).await?;
        let provider = self.provider(workspace_id).await?;

        let response = self
            .bounded(
                INVOKE_TIMEOUT,
                "invoke function",
                provider.invoke(&function.name, &function.project_id.to_string(), &request),
            )
            .await?;

        let now = Utc::now();
        let record = InvocationStatus {
            invocation_id: format!("inv-{}", Uuid::now_v7().simple()),
            function_id,
            workspace_id,
            status: InvocationState::Completed,
            started_at: now - chrono::Duration::milliseconds(response.duration_ms as i64),
            completed_at: Some(now),
            result: Some(response.body.clone()),
            error: None,
        };
        self.repository.record_invocation(&record).await?;

        self.audit(FunctionAuditEvent::new(
            workspace_id,
            function_id,
            "invoked",
            format!("function '{}' invoked", function.name),
        ))
        .await;

        Ok(response)
    }

    pub async fn invoke_function_async(
        &self,
        workspace_id: Uuid,
        function_id: Uuid,
        request: InvokeRequest,
    ) -> FunctionResult<String> {
        let function = self.load_function(workspace_id, function_id).await?;
        let provider = self.provider(workspace_id).await?;

        let invocation_id = self
            .bounded(
                INVOKE_TIMEOUT,
                "async invoke",
                provider.invoke_async(&function.name, &function.project_id.to_string(), &request),
            )
            .await?;

        let record = InvocationStatus {
            invocation_id: invocation_id.clone(),
            function_id,
            workspace_id,
            status: InvocationState::Running,
            started_at: Utc::now(),
            completed_at: None,
            result: None,
            error: None,
        };
        self.repository.record_invocation(&record).await?;

        self.audit(FunctionAuditEvent::new(
            workspace_id,
            function_id,
            "invoked",
            format!("function '{}' invoked asynchronously", function.name),
        ))
        .await;

        Ok(invocation_id)
    }

    /// Store-first status lookup; a still-running record is refreshed from
    /// the provider and persisted on change.
    pub async fn get_invocation_status(
        &self,
        workspace_id: Uuid,
        invocation_id: &str,
    ) -> FunctionResult<InvocationStatus> {
        let mut record = self
            .repository
            .get_invocation(invocation_id)
            .await?
            .filter(|i| i.workspace_id == workspace_id)
            .ok_or_else(|| FunctionError::NotFound(format!("invocation {}", invocation_id)))?;

        if record.status != InvocationState::Running {
            return Ok(record);
        }

        let provider = self.provider(workspace_id).await?;
        match provider.invocation_status(invocation_id).await {
            Ok(fresh) if fresh.status != InvocationState::Running => {
                record.status = fresh.status;
                record.completed_at = fresh.completed_at;
                record.result = fresh.result;
                record.error = fresh.error;
                self.repository.update_invocation(&record).await?;
                Ok(record)
            }
            Ok(_) => Ok(record),
            // Providers without invocation tracking can't refresh; the stored
            // record remains authoritative
            Err(ProviderError::NotSupported(_)) => Ok(record),
            Err(e) => Err(e.into()),
        }
    }

    pub async fn list_invocations(
        &self,
        workspace_id: Uuid,
        function_id: Uuid,
        params: ListParams,
    ) -> FunctionResult<Page<InvocationStatus>> {
        self.load_function(workspace_id, function_id).await?;
        let (items, total) = self.repository.list_invocations(function_id, &params).await?;
        Ok(Page::new(items, total, &params))
    }

    // ---- pass-throughs ----

    pub async fn get_logs(
        &self,
        workspace_id: Uuid,
        function_id: Uuid,
        query: LogsQuery,
    ) -> FunctionResult<Vec<LogEntry>> {
        let function = self.load_function(workspace_id, function_id).await?;
        let provider = self.provider(workspace_id).await?;
        provider
            .get_logs(&function.name, &function.project_id.to_string(), &query)
            .await
            .map_err(Into::into)
    }

    pub async fn get_metrics(
        &self,
        workspace_id: Uuid,
        function_id: Uuid,
    ) -> FunctionResult<FunctionMetrics> {
        let function = self.load_function(workspace_id, function_id).await?;
        let provider = self.provider(workspace_id).await?;
        provider
            .get_metrics(&function.name, &function.project_id.to_string())
            .await
            .map_err(Into::into)
    }

    pub async fn get_capabilities(
        &self,
        workspace_id: Uuid,
    ) -> FunctionResult<ProviderCapabilities> {
        let provider = self.provider(workspace_id).await?;
        Ok(provider.capabilities())
    }

    pub async fn get_health(&self, workspace_id: Uuid) -> FunctionResult<ProviderHealth> {
        let provider = self.provider(workspace_id).await?;
        provider.health().await.map_err(Into::into)
    }

    pub async fn list_audit_events(
        &self,
        workspace_id: Uuid,
        function_id: Uuid,
    ) -> FunctionResult<Vec<FunctionAuditEvent>> {
        self.load_function(workspace_id, function_id).await?;
        self.repository.list_audit_events(function_id).await
    }

    // ---- provider configuration ----

    pub async fn set_provider_config(
        &self,
        workspace_id: Uuid,
        kind: ProviderKind,
        config: serde_json::Value,
    ) -> FunctionResult<ProviderConfig> {
        let config = ProviderConfig {
            workspace_id,
            kind,
            config,
            updated_at: Utc::now(),
        };
        self.repository.upsert_provider_config(&config).await?;
        // The cached provider is stale the moment the config changes
        self.registry.invalidate(workspace_id).await;
        Ok(config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::TriggerConfig;
    use crate::providers::{FissionProvider, KnativeProvider, MockProvider};
    use crate::registry::ProviderFactory;
    use crate::repository::InMemoryFunctionRepository;
    use async_trait::async_trait;
    use std::sync::atomic::{AtomicU32, Ordering};

    struct SharedMockFactory {
        provider: Arc<MockProvider>,
        calls: AtomicU32,
    }

    #[async_trait]
    impl ProviderFactory for SharedMockFactory {
        async fn create_provider(
            &self,
            _config: &ProviderConfig,
        ) -> ProviderResult<Arc<dyn FunctionProvider>> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            Ok(self.provider.clone())
        }
    }

    struct Fixture {
        service: FunctionService<InMemoryFunctionRepository>,
        repo: Arc<InMemoryFunctionRepository>,
        provider: Arc<MockProvider>,
        factory: Arc<SharedMockFactory>,
        workspace_id: Uuid,
        project_id: Uuid,
    }

    fn fixture() -> Fixture {
        let repo = InMemoryFunctionRepository::new();
        let provider = MockProvider::new();
        let factory = Arc::new(SharedMockFactory {
            provider: provider.clone(),
            calls: AtomicU32::new(0),
        });
        let service = FunctionService::new(
            repo.clone(),
            factory.clone(),
            "http://controller.fission".to_string(),
        );

        Fixture {
            service,
            repo,
            provider,
            factory,
            workspace_id: Uuid::new_v4(),
            project_id: Uuid::new_v4(),
        }
    }

    fn spec(name: &str) -> FunctionSpec {
        FunctionSpec {
            name: name.to_string(),
            runtime: "python".to_string(),
            handler: "main.handler".to_string(),
            namespace: None,
            env: Default::default(),
        }
    }

    #[tokio::test]
    async fn test_create_then_delete_leaves_no_residue() {
        let f = fixture();

        let function = f
            .service
            .create_function(f.workspace_id, f.project_id, spec("hello"))
            .await
            .unwrap();
        assert_eq!(f.provider.function_count().await, 1);

        f.service
            .delete_function(f.workspace_id, function.id)
            .await
            .unwrap();

        assert_eq!(f.provider.function_count().await, 0);
        assert!(f
            .service
            .get_function(f.workspace_id, function.id)
            .await
            .is_err());
    }

    #[tokio::test]
    async fn test_create_compensates_provider_on_store_failure() {
        let f = fixture();
        f.repo.fail_function_creates.store(true, Ordering::SeqCst);

        let result = f
            .service
            .create_function(f.workspace_id, f.project_id, spec("hello"))
            .await;

        assert!(result.is_err());
        // Compensating delete removed the provider-side function
        assert_eq!(f.provider.function_count().await, 0);
    }

    #[tokio::test]
    async fn test_namespace_is_forced_to_project() {
        let f = fixture();
        let mut s = spec("hello");
        s.namespace = Some("attacker-controlled".to_string());

        f.service
            .create_function(f.workspace_id, f.project_id, s)
            .await
            .unwrap();

        // The mock stored the function under the project namespace
        assert!(f
            .provider
            .get_function("hello", &f.project_id.to_string())
            .await
            .is_ok());
    }

    #[tokio::test]
    async fn test_provider_cache_single_flight() {
        let f = fixture();

        for i in 0..3 {
            f.service
                .create_function(f.workspace_id, f.project_id, spec(&format!("fn-{i}")))
                .await
                .unwrap();
        }

        assert_eq!(f.repo.provider_config_reads.load(Ordering::SeqCst), 1);
        assert_eq!(f.factory.calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_provider_config_change_evicts_cache() {
        let f = fixture();
        f.service
            .create_function(f.workspace_id, f.project_id, spec("fn-a"))
            .await
            .unwrap();

        f.service
            .set_provider_config(
                f.workspace_id,
                ProviderKind::Mock,
                serde_json::json!({}),
            )
            .await
            .unwrap();

        f.service
            .create_function(f.workspace_id, f.project_id, spec("fn-b"))
            .await
            .unwrap();

        assert_eq!(f.factory.calls.load(Ordering::SeqCst), 2);
    }

    async fn deploy_n_versions(f: &Fixture, function_id: Uuid, n: usize) -> Vec<FunctionVersion> {
        let mut versions = Vec::new();
        for i in 0..n {
            let version = f
                .service
                .deploy_version(
                    f.workspace_id,
                    function_id,
                    VersionSpec {
                        source_code: Some(format!("print({i})")),
                        ..Default::default()
                    },
                )
                .await
                .unwrap();
            versions.push(version);
        }
        versions
    }

    #[tokio::test]
    async fn test_rollback_picks_previous_version() {
        let f = fixture();
        let function = f
            .service
            .create_function(f.workspace_id, f.project_id, spec("hello"))
            .await
            .unwrap();

        let versions = deploy_n_versions(&f, function.id, 3).await;
        f.service
            .set_active_version(f.workspace_id, function.id, versions[2].id)
            .await
            .unwrap();

        let rolled_back = f
            .service
            .rollback_version(f.workspace_id, function.id)
            .await
            .unwrap();

        assert_eq!(rolled_back.active_version_id, Some(versions[1].id));

        // Audit trail references the activated version
        let events = f
            .service
            .list_audit_events(f.workspace_id, function.id)
            .await
            .unwrap();
        let activated: Vec<_> = events
            .iter()
            .filter(|e| e.event_type == "version_activated")
            .collect();
        assert_eq!(activated.len(), 2);
        assert!(activated
            .last()
            .unwrap()
            .description
            .contains(&versions[1].id.to_string()));
    }

    #[tokio::test]
    async fn test_rollback_with_single_version_is_invalid_state() {
        let f = fixture();
        let function = f
            .service
            .create_function(f.workspace_id, f.project_id, spec("hello"))
            .await
            .unwrap();
        let versions = deploy_n_versions(&f, function.id, 1).await;
        f.service
            .set_active_version(f.workspace_id, function.id, versions[0].id)
            .await
            .unwrap();

        let result = f.service.rollback_version(f.workspace_id, function.id).await;
        assert!(matches!(result, Err(FunctionError::InvalidState(_))));
    }

    #[tokio::test]
    async fn test_rollback_from_first_version_is_invalid_state() {
        let f = fixture();
        let function = f
            .service
            .create_function(f.workspace_id, f.project_id, spec("hello"))
            .await
            .unwrap();
        let versions = deploy_n_versions(&f, function.id, 2).await;
        f.service
            .set_active_version(f.workspace_id, function.id, versions[0].id)
            .await
            .unwrap();

        let result = f.service.rollback_version(f.workspace_id, function.id).await;
        assert!(matches!(result, Err(FunctionError::InvalidState(_))));
    }

    #[tokio::test]
    async fn test_exactly_one_version_active_after_switches() {
        let f = fixture();
        let function = f
            .service
            .create_function(f.workspace_id, f.project_id, spec("hello"))
            .await
            .unwrap();
        let versions = deploy_n_versions(&f, function.id, 3).await;

        f.service
            .set_active_version(f.workspace_id, function.id, versions[0].id)
            .await
            .unwrap();
        f.service
            .set_active_version(f.workspace_id, function.id, versions[2].id)
            .await
            .unwrap();

        let all = f
            .service
            .list_versions(f.workspace_id, function.id)
            .await
            .unwrap();
        let active: Vec<_> = all.iter().filter(|v| v.is_active).collect();
        assert_eq!(active.len(), 1);
        assert_eq!(active[0].id, versions[2].id);

        let function = f
            .service
            .get_function(f.workspace_id, function.id)
            .await
            .unwrap();
        assert_eq!(function.active_version_id, Some(versions[2].id));
    }

    #[tokio::test]
    async fn test_sync_invoke_records_completed_invocation() {
        let f = fixture();
        let function = f
            .service
            .create_function(f.workspace_id, f.project_id, spec("hello"))
            .await
            .unwrap();

        let response = f
            .service
            .invoke_function(
                f.workspace_id,
                function.id,
                InvokeRequest {
                    payload: Some(serde_json::json!({ "x": 1 })),
                    ..Default::default()
                },
            )
            .await
            .unwrap();
        assert_eq!(response.status_code, 200);

        let (invocations, total) = f
            .repo
            .list_invocations(function.id, &ListParams::default())
            .await
            .unwrap();
        assert_eq!(total, 1);
        let record = &invocations[0];
        assert_eq!(record.status, InvocationState::Completed);
        let completed_at = record.completed_at.unwrap();
        let elapsed = completed_at - record.started_at;
        assert_eq!(elapsed.num_milliseconds(), response.duration_ms as i64);
    }

    #[tokio::test]
    async fn test_async_invoke_then_status_refresh() {
        let f = fixture();
        let function = f
            .service
            .create_function(f.workspace_id, f.project_id, spec("hello"))
            .await
            .unwrap();

        let invocation_id = f
            .service
            .invoke_function_async(f.workspace_id, function.id, InvokeRequest::default())
            .await
            .unwrap();

        let status = f
            .service
            .get_invocation_status(f.workspace_id, &invocation_id)
            .await
            .unwrap();
        assert_eq!(status.status, InvocationState::Running);

        // Provider finishes; the next poll refreshes and persists the change
        f.provider
            .complete_invocation(&invocation_id, serde_json::json!({ "ok": true }))
            .await;

        let status = f
            .service
            .get_invocation_status(f.workspace_id, &invocation_id)
            .await
            .unwrap();
        assert_eq!(status.status, InvocationState::Completed);
        assert!(status.completed_at.is_some());
        assert_eq!(status.result, Some(serde_json::json!({ "ok": true })));

        let stored = f
            .repo
            .get_invocation(&invocation_id)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(stored.status, InvocationState::Completed);
    }

    #[tokio::test]
    async fn test_audit_failure_does_not_fail_operation() {
        let f = fixture();
        f.repo.fail_audit_appends.store(true, Ordering::SeqCst);

        let result = f
            .service
            .create_function(f.workspace_id, f.project_id, spec("hello"))
            .await;
        assert!(result.is_ok());
        assert_eq!(f.repo.audit_event_count().await, 0);
    }

    #[tokio::test]
    async fn test_trigger_create_update_delete() {
        let f = fixture();
        let function = f
            .service
            .create_function(f.workspace_id, f.project_id, spec("hello"))
            .await
            .unwrap();

        let trigger = f
            .service
            .create_trigger(
                f.workspace_id,
                function.id,
                TriggerSpec {
                    name: "web".to_string(),
                    config: TriggerConfig::Http {
                        method: "GET".to_string(),
                        path: "/hello".to_string(),
                    },
                },
            )
            .await
            .unwrap();

        let updated = f
            .service
            .update_trigger(
                f.workspace_id,
                function.id,
                trigger.id,
                TriggerSpec {
                    name: "web".to_string(),
                    config: TriggerConfig::Http {
                        method: "POST".to_string(),
                        path: "/hello".to_string(),
                    },
                },
            )
            .await
            .unwrap();
        assert!(matches!(updated.config, TriggerConfig::Http { ref method, .. } if method == "POST"));

        f.service
            .delete_trigger(f.workspace_id, function.id, trigger.id)
            .await
            .unwrap();
        assert!(f
            .service
            .list_triggers(f.workspace_id, function.id)
            .await
            .unwrap()
            .is_empty());
    }

    #[tokio::test]
    async fn test_invalid_trigger_config_rejected_before_provider_call() {
        let f = fixture();
        let function = f
            .service
            .create_function(f.workspace_id, f.project_id, spec("hello"))
            .await
            .unwrap();

        let result = f
            .service
            .create_trigger(
                f.workspace_id,
                function.id,
                TriggerSpec {
                    name: "bad".to_string(),
                    config: TriggerConfig::Schedule {
                        cron: "every tuesday".to_string(),
                    },
                },
            )
            .await;
        assert!(matches!(result, Err(FunctionError::Validation(_))));
    }

    #[test]
    fn test_cold_start_ranking_prefers_fission() {
        let fission = FissionProvider::new("http://controller".to_string(), None)
            .unwrap()
            .capabilities();
        let knative = KnativeProvider::new("http://kn".to_string(), None)
            .unwrap()
            .capabilities();

        assert_eq!(fission.typical_cold_start_ms, 100);
        assert_eq!(knative.typical_cold_start_ms, 2000);

        let mut ranked = [&fission, &knative];
        ranked.sort_by_key(|c| c.typical_cold_start_ms);
        assert_eq!(ranked[0].name, "fission");
        assert!(!knative.supports_async);
    }
}
