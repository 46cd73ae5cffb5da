use eyre::{eyre, WrapErr};
use serde_json::{json, Value};
use uuid::Uuid;

/// Request scope resolved from the environment.
pub struct Scope {
    pub api_url: String,
    pub token: String,
    pub organization_id: Uuid,
    pub workspace_id: Uuid,
    pub project_id: Uuid,
}

impl Scope {
    pub fn from_env() -> eyre::Result<Self> {
        fn required(key: &str) -> eyre::Result<String> {
            std::env::var(key).map_err(|_| eyre!("{key} is not set"))
        }
        fn required_uuid(key: &str) -> eyre::Result<Uuid> {
            required(key)?
                .parse()
                .wrap_err_with(|| format!("{key} is not a valid id"))
        }

        Ok(Self {
            api_url: std::env::var("HKS_API_URL")
                .unwrap_or_else(|_| "http://localhost:8080".to_string()),
            token: required("HKS_TOKEN")?,
            organization_id: required_uuid("HKS_ORG")?,
            workspace_id: required_uuid("HKS_WORKSPACE")?,
            project_id: required_uuid("HKS_PROJECT")?,
        })
    }
}

pub struct ApiClient {
    http: reqwest::Client,
    scope: Scope,
}

impl ApiClient {
    pub fn new(scope: Scope) -> eyre::Result<Self> {
        let http = reqwest::Client::builder()
            .timeout(std::time::Duration::from_secs(130))
            .build()?;
        Ok(Self { http, scope })
    }

    fn functions_url(&self) -> String {
        format!(
            "{}/api/v1/organizations/{}/workspaces/{}/projects/{}/functions",
            self.scope.api_url,
            self.scope.organization_id,
            self.scope.workspace_id,
            self.scope.project_id
        )
    }

    async fn send(&self, request: reqwest::RequestBuilder) -> eyre::Result<Value> {
        let response = request
            .bearer_auth(&self.scope.token)
            .send()
            .await
            .wrap_err("request failed")?;

        let status = response.status();
        if status == reqwest::StatusCode::NO_CONTENT {
            return Ok(Value::Null);
        }

        let body: Value = response.json().await.unwrap_or(Value::Null);
        if status.is_success() {
            Ok(body)
        } else {
            let message = body["message"].as_str().unwrap_or("unknown error");
            Err(eyre!("{status}: {message}"))
        }
    }

    pub async fn list_functions(&self) -> eyre::Result<Value> {
        self.send(self.http.get(self.functions_url())).await
    }

    pub async fn get_function(&self, id: Uuid) -> eyre::Result<Value> {
        self.send(self.http.get(format!("{}/{}", self.functions_url(), id)))
            .await
    }

    pub async fn create_function(&self, spec: Value) -> eyre::Result<Value> {
        self.send(self.http.post(self.functions_url()).json(&spec))
            .await
    }

    pub async fn delete_function(&self, id: Uuid) -> eyre::Result<()> {
        self.send(self.http.delete(format!("{}/{}", self.functions_url(), id)))
            .await
            .map(|_| ())
    }

    pub async fn deploy_version(&self, id: Uuid, source_code: String) -> eyre::Result<Value> {
        let url = format!("{}/{}/versions", self.functions_url(), id);
        self.send(
            self.http
                .post(url)
                .json(&json!({ "source_code": source_code })),
        )
        .await
    }

    pub async fn invoke(&self, id: Uuid, payload: Value) -> eyre::Result<Value> {
        let url = format!("{}/{}/invoke", self.functions_url(), id);
        self.send(self.http.post(url).json(&json!({ "payload": payload })))
            .await
    }

    pub async fn logs(&self, id: Uuid, limit: u32) -> eyre::Result<Vec<Value>> {
        let url = format!("{}/{}/logs?limit={}", self.functions_url(), id, limit);
        let body = self.send(self.http.get(url)).await?;
        Ok(body.as_array().cloned().unwrap_or_default())
    }

    pub async fn rollback(&self, id: Uuid) -> eyre::Result<Value> {
        let url = format!("{}/{}/rollback", self.functions_url(), id);
        self.send(self.http.post(url)).await
    }
}
