use crate::models::{
    FunctionMetrics, FunctionSpec, InvokeRequest, InvokeResponse, LogEntry, LogsQuery,
    ProviderCapabilities, ProviderHealth, TriggerSpec, TriggerType, VersionSpec,
};
use crate::provider::{
    FunctionProvider, ProviderError, ProviderFunction, ProviderInvocationStatus, ProviderResult,
};
use async_trait::async_trait;
use reqwest::{Method, StatusCode};
use serde_json::json;
use std::time::{Duration, Instant};

/// Legacy backend: Knative Serving.
///
/// Functions are container-image Services; versions map onto revisions.
/// Async invocation and invocation status are not part of Knative's surface,
/// so those operations fail with `NotSupported`.
pub struct KnativeProvider {
    http: reqwest::Client,
    api_url: String,
    ingress_domain: String,
}

impl KnativeProvider {
    pub fn new(api_url: String, ingress_domain: Option<String>) -> ProviderResult<Self> {
        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(30))
            .build()
            .map_err(|e| ProviderError::Internal(e.to_string()))?;

        Ok(Self {
            http,
            api_url,
            ingress_domain: ingress_domain.unwrap_or_else(|| "example.com".to_string()),
        })
    }

    fn services_path(&self, namespace: &str) -> String {
        format!(
            "{}/apis/serving.knative.dev/v1/namespaces/{}/services",
            self.api_url, namespace
        )
    }

    fn service_body(spec: &FunctionSpec) -> ProviderResult<serde_json::Value> {
        // Knative runs container images only; source-based runtimes belong to
        // the build pipeline, which this adapter does not own.
        Ok(json!({
            "apiVersion": "serving.knative.dev/v1",
            "kind": "Service",
            "metadata": { "name": spec.name, "namespace": spec.namespace },
            "spec": {
                "template": {
                    "spec": {
                        "containers": [{
                            "image": spec.handler,
                            "env": spec.env.iter()
                                .map(|(k, v)| json!({ "name": k, "value": v }))
                                .collect::<Vec<_>>(),
                        }]
                    }
                }
            }
        }))
    }

    async fn send(
        &self,
        method: Method,
        url: &str,
        body: Option<serde_json::Value>,
    ) -> ProviderResult<serde_json::Value> {
        let mut req = self.http.request(method, url);
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
                .json()
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

    fn latest_revision_number(service: &serde_json::Value) -> i32 {
        service
            .pointer("/status/latestCreatedRevisionName")
            .and_then(|v| v.as_str())
            .and_then(|name| name.rsplit('-').next())
            .and_then(|n| n.parse::<i32>().ok())
            .unwrap_or(1)
    }
}

#[async_trait]
impl FunctionProvider for KnativeProvider {
    async fn create_function(&self, spec: &FunctionSpec) -> ProviderResult<ProviderFunction> {
        let namespace = spec.namespace.clone().unwrap_or_default();
        let body = Self::service_body(spec)?;
        let service = self
            .send(Method::POST, &self.services_path(&namespace), Some(body))
            .await?;

        Ok(ProviderFunction {
            name: spec.name.clone(),
            namespace,
            metadata: service.get("metadata").cloned().unwrap_or_default(),
        })
    }

    async fn update_function(&self, spec: &FunctionSpec) -> ProviderResult<ProviderFunction> {
        let namespace = spec.namespace.clone().unwrap_or_default();
        let url = format!("{}/{}", self.services_path(&namespace), spec.name);
        let body = Self::service_body(spec)?;
        let service = self.send(Method::PUT, &url, Some(body)).await?;

        Ok(ProviderFunction {
            name: spec.name.clone(),
            namespace,
            metadata: service.get("metadata").cloned().unwrap_or_default(),
        })
    }

    async fn delete_function(&self, name: &str, namespace: &str) -> ProviderResult<()> {
        let url = format!("{}/{}", self.services_path(namespace), name);
        self.send(Method::DELETE, &url, None).await.map(|_| ())
    }

    async fn get_function(&self, name: &str, namespace: &str) -> ProviderResult<ProviderFunction> {
        let url = format!("{}/{}", self.services_path(namespace), name);
        let service = self.send(Method::GET, &url, None).await?;

        Ok(ProviderFunction {
            name: name.to_string(),
            namespace: namespace.to_string(),
            metadata: service.get("metadata").cloned().unwrap_or_default(),
        })
    }

    async fn create_version(&self, spec: &VersionSpec) -> ProviderResult<i32> {
        let function_name = spec
            .function_name
            .as_deref()
            .ok_or_else(|| ProviderError::InvalidSpec("missing function name".to_string()))?;
        let image = spec
            .image
            .as_deref()
            .ok_or_else(|| ProviderError::InvalidSpec("knative versions need an image".to_string()))?;
        let namespace = spec.namespace.clone().unwrap_or_default();

        // Updating the template creates a new revision
        let url = format!("{}/{}", self.services_path(&namespace), function_name);
        let service = self
            .send(
                Method::PATCH,
                &url,
                Some(json!({
                    "spec": { "template": { "spec": { "containers": [{ "image": image }] } } }
                })),
            )
            .await?;

        Ok(Self::latest_revision_number(&service))
    }

    async fn set_active_version(
        &self,
        name: &str,
        namespace: &str,
        version: i32,
    ) -> ProviderResult<()> {
        let url = format!("{}/{}", self.services_path(namespace), name);
        let revision = format!("{}-{:05}", name, version);
        self.send(
            Method::PATCH,
            &url,
            Some(json!({
                "spec": { "traffic": [{ "revisionName": revision, "percent": 100 }] }
            })),
        )
        .await
        .map(|_| ())
    }

    async fn create_trigger(
        &self,
        _function: &str,
        _namespace: &str,
        trigger: &TriggerSpec,
    ) -> ProviderResult<()> {
        match trigger.config.trigger_type() {
            // HTTP routing is implicit in Knative Serving
            TriggerType::Http => Ok(()),
            other => Err(ProviderError::NotSupported(format!(
                "knative adapter does not manage {other} triggers"
            ))),
        }
    }

    async fn update_trigger(
        &self,
        function: &str,
        namespace: &str,
        trigger: &TriggerSpec,
    ) -> ProviderResult<()> {
        self.create_trigger(function, namespace, trigger).await
    }

    async fn delete_trigger(
        &self,
        _function: &str,
        _namespace: &str,
        _trigger_name: &str,
    ) -> ProviderResult<()> {
        Ok(())
    }

    async fn invoke(
        &self,
        name: &str,
        namespace: &str,
        request: &InvokeRequest,
    ) -> ProviderResult<InvokeResponse> {
        let url = format!("http://{}.{}.{}", name, namespace, self.ingress_domain);
        let started = Instant::now();

        let response = self
            .http
            .post(&url)
            .json(&request.payload)
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
        _name: &str,
        _namespace: &str,
        _request: &InvokeRequest,
    ) -> ProviderResult<String> {
        Err(ProviderError::NotSupported(
            "knative serving has no async invocation".to_string(),
        ))
    }

    async fn invocation_status(
        &self,
        _invocation_id: &str,
    ) -> ProviderResult<ProviderInvocationStatus> {
        Err(ProviderError::NotSupported(
            "knative serving has no invocation tracking".to_string(),
        ))
    }

    async fn get_logs(
        &self,
        _name: &str,
        _namespace: &str,
        _query: &LogsQuery,
    ) -> ProviderResult<Vec<LogEntry>> {
        Err(ProviderError::NotSupported(
            "logs come from the cluster logging stack".to_string(),
        ))
    }

    async fn get_metrics(&self, _name: &str, _namespace: &str) -> ProviderResult<FunctionMetrics> {
        Err(ProviderError::NotSupported(
            "metrics come from the cluster metrics stack".to_string(),
        ))
    }

    fn capabilities(&self) -> ProviderCapabilities {
        ProviderCapabilities {
            name: "knative".to_string(),
            version: "1.14".to_string(),
            supported_runtimes: vec!["container".to_string()],
            supported_trigger_types: vec![TriggerType::Http, TriggerType::Event],
            typical_cold_start_ms: 2000,
            supports_async: false,
        }
    }

    async fn health(&self) -> ProviderResult<ProviderHealth> {
        let url = format!("{}/apis/serving.knative.dev/v1", self.api_url);
        match self.http.get(&url).send().await {
            Ok(r) if r.status().is_success() => Ok(ProviderHealth {
                healthy: true,
                message: None,
            }),
            Ok(r) => Ok(ProviderHealth {
                healthy: false,
                message: Some(format!("api server returned {}", r.status())),
            }),
            Err(e) => Ok(ProviderHealth {
                healthy: false,
                message: Some(e.to_string()),
            }),
        }
    }
}
