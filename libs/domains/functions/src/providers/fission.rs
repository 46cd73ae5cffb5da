use crate::models::{
    FunctionMetrics, FunctionSpec, InvocationState, InvokeRequest, InvokeResponse, LogEntry,
    LogsQuery, ProviderCapabilities, ProviderHealth, TriggerSpec, TriggerType, VersionSpec,
};
use crate::provider::{
    FunctionProvider, ProviderError, ProviderFunction, ProviderInvocationStatus, ProviderResult,
};
use async_trait::async_trait;
use reqwest::{Method, StatusCode};
use serde::Deserialize;
use serde_json::json;
use std::time::{Duration, Instant};

/// Default backend: Fission controller + router.
///
/// The controller endpoint comes from the workspace's provider config; the
/// router defaults to the conventional in-cluster service next to it.
pub struct FissionProvider {
    http: reqwest::Client,
    controller_url: String,
    router_url: String,
}

impl FissionProvider {
    pub fn new(controller_url: String, router_url: Option<String>) -> ProviderResult<Self> {
        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(30))
            .build()
            .map_err(|e| ProviderError::Internal(e.to_string()))?;

        let router_url = router_url
            .unwrap_or_else(|| "http://router.fission.svc.cluster.local".to_string());

        Ok(Self {
            http,
            controller_url,
            router_url,
        })
    }

    async fn request<T: serde::de::DeserializeOwned>(
        &self,
        method: Method,
        path: &str,
        body: Option<serde_json::Value>,
    ) -> ProviderResult<T> {
        let url = format!("{}{}", self.controller_url, path);
        let mut req = self.http.request(method, &url);
        if let Some(ref b) = body {
            req = req.json(b);
        }

        let response = req
            .send()
            .await
            .map_err(|e| ProviderError::Unavailable(e.to_string()))?;

        let status = response.status();
        if status.is_success() {
            return response
                .json::<T>()
                .await
                .map_err(|e| ProviderError::Internal(format!("decode failure: {e}")));
        }

        let message = response.text().await.unwrap_or_default();
        Err(match status {
            StatusCode::NOT_FOUND => ProviderError::NotFound(message),
            StatusCode::CONFLICT => ProviderError::AlreadyExists(message),
            StatusCode::BAD_REQUEST | StatusCode::UNPROCESSABLE_ENTITY => {
                ProviderError::InvalidSpec(message)
            }
            s if s.is_server_error() => ProviderError::Unavailable(message),
            _ => ProviderError::Internal(format!("{status}: {message}")),
        })
    }

    fn function_body(spec: &FunctionSpec) -> serde_json::Value {
        json!({
            "metadata": {
                "name": spec.name,
                "namespace": spec.namespace,
            },
            "spec": {
                "runtime": spec.runtime,
                "handler": spec.handler,
                "env": spec.env,
            },
        })
    }
}

#[derive(Deserialize)]
struct FnMetadata {
    metadata: serde_json::Value,
}

#[derive(Deserialize)]
struct VersionReply {
    version: i32,
}

#[derive(Deserialize)]
struct AsyncReply {
    invocation_id: String,
}

#[derive(Deserialize)]
struct InvocationReply {
    status: String,
    completed_at: Option<chrono::DateTime<chrono::Utc>>,
    result: Option<serde_json::Value>,
    error: Option<String>,
}

#[async_trait]
impl FunctionProvider for FissionProvider {
    async fn create_function(&self, spec: &FunctionSpec) -> ProviderResult<ProviderFunction> {
        let reply: FnMetadata = self
            .request(Method::POST, "/v2/functions", Some(Self::function_body(spec)))
            .await?;

        Ok(ProviderFunction {
            name: spec.name.clone(),
            namespace: spec.namespace.clone().unwrap_or_default(),
            metadata: reply.metadata,
        })
    }

    async fn update_function(&self, spec: &FunctionSpec) -> ProviderResult<ProviderFunction> {
        let namespace = spec.namespace.clone().unwrap_or_default();
        let path = format!("/v2/functions/{}?namespace={}", spec.name, namespace);
        let reply: FnMetadata = self
            .request(Method::PUT, &path, Some(Self::function_body(spec)))
            .await?;

        Ok(ProviderFunction {
            name: spec.name.clone(),
            namespace,
            metadata: reply.metadata,
        })
    }

    async fn delete_function(&self, name: &str, namespace: &str) -> ProviderResult<()> {
        let path = format!("/v2/functions/{}?namespace={}", name, namespace);
        let _: serde_json::Value = self.request(Method::DELETE, &path, None).await?;
        Ok(())
    }

    async fn get_function(&self, name: &str, namespace: &str) -> ProviderResult<ProviderFunction> {
        let path = format!("/v2/functions/{}?namespace={}", name, namespace);
        let reply: FnMetadata = self.request(Method::GET, &path, None).await?;

        Ok(ProviderFunction {
            name: name.to_string(),
            namespace: namespace.to_string(),
            metadata: reply.metadata,
        })
    }

    async fn create_version(&self, spec: &VersionSpec) -> ProviderResult<i32> {
        let function_name = spec
            .function_name
            .as_deref()
            .ok_or_else(|| ProviderError::InvalidSpec("missing function name".to_string()))?;
        let namespace = spec.namespace.clone().unwrap_or_default();

        let path = format!("/v2/functions/{}/versions?namespace={}", function_name, namespace);
        let reply: VersionReply = self
            .request(
                Method::POST,
                &path,
                Some(json!({
                    "source_code": spec.source_code,
                    "image": spec.image,
                })),
            )
            .await?;

        Ok(reply.version)
    }

    async fn set_active_version(
        &self,
        name: &str,
        namespace: &str,
        version: i32,
    ) -> ProviderResult<()> {
        let path = format!("/v2/functions/{}/active-version?namespace={}", name, namespace);
        let _: serde_json::Value = self
            .request(Method::PUT, &path, Some(json!({ "version": version })))
            .await?;
        Ok(())
    }

    async fn create_trigger(
        &self,
        function: &str,
        namespace: &str,
        trigger: &TriggerSpec,
    ) -> ProviderResult<()> {
        let path = format!("/v2/triggers/{}?namespace={}", function, namespace);
        let _: serde_json::Value = self
            .request(
                Method::POST,
                &path,
                Some(json!({ "name": trigger.name, "config": trigger.config })),
            )
            .await?;
        Ok(())
    }

    async fn update_trigger(
        &self,
        function: &str,
        namespace: &str,
        trigger: &TriggerSpec,
    ) -> ProviderResult<()> {
        let path = format!(
            "/v2/triggers/{}/{}?namespace={}",
            function, trigger.name, namespace
        );
        let _: serde_json::Value = self
            .request(
                Method::PUT,
                &path,
                Some(json!({ "config": trigger.config })),
            )
            .await?;
        Ok(())
    }

    async fn delete_trigger(
        &self,
        function: &str,
        namespace: &str,
        trigger_name: &str,
    ) -> ProviderResult<()> {
        let path = format!(
            "/v2/triggers/{}/{}?namespace={}",
            function, trigger_name, namespace
        );
        let _: serde_json::Value = self.request(Method::DELETE, &path, None).await?;
        Ok(())
    }

    async fn invoke(
        &self,
        name: &str,
        namespace: &str,
        request: &InvokeRequest,
    ) -> ProviderResult<InvokeResponse> {
        let url = format!("{}/fission-function/{}/{}", self.router_url, namespace, name);
        let started = Instant::now();

        let mut req = self
            .http
            .request(
                request
                    .method
                    .as_deref()
                    .and_then(|m| Method::from_bytes(m.as_bytes()).ok())
                    .unwrap_or(Method::POST),
                &url,
            )
            .json(&request.payload);
        for (key, value) in &request.headers {
            req = req.header(key, value);
        }

        let response = req
            .send()
            .await
            .map_err(|e| ProviderError::Unavailable(e.to_string()))?;
        let status_code = response.status().as_u16();
        let body = response
            .json::<serde_json::Value>()
            .await
            .unwrap_or(serde_json::Value::Null);

        Ok(InvokeResponse {
            status_code,
            body,
            duration_ms: started.elapsed().as_millis() as u64,
        })
    }

    async fn invoke_async(
        &self,
        name: &str,
        namespace: &str,
        request: &InvokeRequest,
    ) -> ProviderResult<String> {
        let url = format!("{}/fission-function/{}/{}", self.router_url, namespace, name);
        let response = self
            .http
            .post(&url)
            .header("X-Fission-Async", "true")
            .json(&request.payload)
            .send()
            .await
            .map_err(|e| ProviderError::Unavailable(e.to_string()))?;

        if !response.status().is_success() {
            return Err(ProviderError::Unavailable(format!(
                "async dispatch failed with {}",
                response.status()
            )));
        }

        let reply: AsyncReply = response
            .json()
            .await
            .map_err(|e| ProviderError::Internal(format!("decode failure: {e}")))?;
        Ok(reply.invocation_id)
    }

    async fn invocation_status(
        &self,
        invocation_id: &str,
    ) -> ProviderResult<ProviderInvocationStatus> {
        let path = format!("/v2/invocations/{}", invocation_id);
        let reply: InvocationReply = self.request(Method::GET, &path, None).await?;

        let status = match reply.status.as_str() {
            "completed" => InvocationState::Completed,
            "failed" => InvocationState::Failed,
            _ => InvocationState::Running,
        };

        Ok(ProviderInvocationStatus {
            status,
            completed_at: reply.completed_at,
            result: reply.result,
            error: reply.error,
        })
    }

    async fn get_logs(
        &self,
        name: &str,
        namespace: &str,
        query: &LogsQuery,
    ) -> ProviderResult<Vec<LogEntry>> {
        let mut path = format!("/v2/functions/{}/logs?namespace={}", name, namespace);
        if let Some(limit) = query.limit {
            path.push_str(&format!("&limit={limit}"));
        }
        if let Some(since) = query.since {
            path.push_str(&format!("&since={}", since.to_rfc3339()));
        }
        self.request(Method::GET, &path, None).await
    }

    async fn get_metrics(&self, name: &str, namespace: &str) -> ProviderResult<FunctionMetrics> {
        let path = format!("/v2/functions/{}/metrics?namespace={}", name, namespace);
        self.request(Method::GET, &path, None).await
    }

    fn capabilities(&self) -> ProviderCapabilities {
        ProviderCapabilities {
            name: "fission".to_string(),
            version: "1.20".to_string(),
            supported_runtimes: vec![
                "nodejs".to_string(),
                "python".to_string(),
                "go".to_string(),
                "binary".to_string(),
            ],
            supported_trigger_types: vec![
                TriggerType::Http,
                TriggerType::Schedule,
                TriggerType::Event,
            ],
            typical_cold_start_ms: 100,
            supports_async: true,
        }
    }

    async fn health(&self) -> ProviderResult<ProviderHealth> {
        let url = format!("{}/healthz", self.controller_url);
        match self.http.get(&url).send().await {
            Ok(r) if r.status().is_success() => Ok(ProviderHealth {
                healthy: true,
                message: None,
            }),
            Ok(r) => Ok(ProviderHealth {
                healthy: false,
                message: Some(format!("controller returned {}", r.status())),
            }),
            Err(e) => Ok(ProviderHealth {
                healthy: false,
                message: Some(e.to_string()),
            }),
        }
    }
}
