use crate::models::{ProviderConfig, ProviderKind};
use crate::provider::{FunctionProvider, ProviderError, ProviderResult};
use crate::providers::{FissionProvider, KnativeProvider, MockProvider};
use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::{OnceCell, RwLock};
use uuid::Uuid;

/// Builds a provider from a workspace's configuration.
#[async_trait]
pub trait ProviderFactory: Send + Sync {
    async fn create_provider(
        &self,
        config: &ProviderConfig,
    ) -> ProviderResult<Arc<dyn FunctionProvider>>;
}

/// Factory for the shipped provider variants.
pub struct DefaultProviderFactory;

#[async_trait]
impl ProviderFactory for DefaultProviderFactory {
    async fn create_provider(
        &self,
        config: &ProviderConfig,
    ) -> ProviderResult<Arc<dyn FunctionProvider>> {
        let provider: Arc<dyn FunctionProvider> = match config.kind {
            ProviderKind::Fission => {
                let endpoint = config.endpoint().ok_or_else(|| {
                    ProviderError::InvalidSpec("fission config needs an endpoint".to_string())
                })?;
                let router = config
                    .config
                    .get("router_endpoint")
                    .and_then(|v| v.as_str())
                    .map(|s| s.to_string());
                Arc::new(FissionProvider::new(endpoint, router)?)
            }
            ProviderKind::Knative => {
                let endpoint = config.endpoint().ok_or_else(|| {
                    ProviderError::InvalidSpec("knative config needs an endpoint".to_string())
                })?;
                let domain = config
                    .config
                    .get("ingress_domain")
                    .and_then(|v| v.as_str())
                    .map(|s| s.to_string());
                Arc::new(KnativeProvider::new(endpoint, domain)?)
            }
            ProviderKind::Mock => MockProvider::new(),
        };

        tracing::info!(workspace_id = %config.workspace_id, kind = %config.kind, "provider constructed");
        Ok(provider)
    }
}

type ProviderCell = Arc<OnceCell<Arc<dyn FunctionProvider>>>;

/// Process-wide provider registry keyed by workspace id.
///
/// Each workspace gets a `OnceCell`: concurrent first access for the same
/// workspace runs the factory at most once (single-flight). Configuration
/// changes evict the entry explicitly.
#[derive(Default)]
pub struct ProviderRegistry {
    entries: RwLock<HashMap<Uuid, ProviderCell>>,
}

impl ProviderRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// The cell for a workspace, creating an empty one on first access.
    pub async fn entry(&self, workspace_id: Uuid) -> ProviderCell {
        {
            let entries = self.entries.read().await;
            if let Some(cell) = entries.get(&workspace_id) {
                return cell.clone();
            }
        }

        let mut entries = self.entries.write().await;
        entries
            .entry(workspace_id)
            .or_insert_with(|| Arc::new(OnceCell::new()))
            .clone()
    }

    /// Drop the cached provider; the next access rebuilds it.
    pub async fn invalidate(&self, workspace_id: Uuid) {
        let removed = self.entries.write().await.remove(&workspace_id).is_some();
        if removed {
            tracing::info!(workspace_id = %workspace_id, "provider cache entry evicted");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicU32, Ordering};

    struct CountingFactory {
        calls: AtomicU32,
    }

    #[async_trait]
    impl ProviderFactory for CountingFactory {
        async fn create_provider(
            &self,
            _config: &ProviderConfig,
        ) -> ProviderResult<Arc<dyn FunctionProvider>> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            Ok(MockProvider::new())
        }
    }

    #[tokio::test]
    async fn test_single_flight_construction() {
        let registry = ProviderRegistry::new();
        let factory = Arc::new(CountingFactory {
            calls: AtomicU32::new(0),
        });
        let ws = Uuid::new_v4();
        let config = ProviderConfig::default_for(ws, "http://controller");

        for _ in 0..3 {
            let cell = registry.entry(ws).await;
            let factory = factory.clone();
            let config = config.clone();
            cell.get_or_try_init(|| async move { factory.create_provider(&config).await })
                .await
                .unwrap();
        }

        assert_eq!(factory.calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_invalidate_forces_rebuild() {
        let registry = ProviderRegistry::new();
        let factory = Arc::new(CountingFactory {
            calls: AtomicU32::new(0),
        });
        let ws = Uuid::new_v4();
        let config = ProviderConfig::default_for(ws, "http://controller");

        for _ in 0..2 {
            let cell = registry.entry(ws).await;
            let f = factory.clone();
            let c = config.clone();
            cell.get_or_try_init(|| async move { f.create_provider(&c).await })
                .await
                .unwrap();
            registry.invalidate(ws).await;
        }

        assert_eq!(factory.calls.load(Ordering::SeqCst), 2);
    }
}
