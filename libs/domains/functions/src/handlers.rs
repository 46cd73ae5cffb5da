use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::IntoResponse,
    routing::{get, post, put},
    Extension, Json, Router,
};
use axum_helpers::{pagination::ListParams, require_org, AppError, Principal};
use serde::Deserialize;
use serde_json::json;
use std::sync::Arc;
use utoipa::ToSchema;
use uuid::Uuid;

use crate::models::{FunctionSpec, InvokeRequest, LogsQuery, ProviderKind, TriggerSpec, VersionSpec};
use crate::repository::FunctionRepository;
use crate::service::FunctionService;

#[derive(Debug, Deserialize, ToSchema)]
pub struct ProviderConfigInput {
    pub kind: ProviderKind,
    #[serde(default)]
    pub config: serde_json::Value,
}

/// Router for `/organizations/{org_id}/workspaces/{ws_id}/projects/{project_id}/functions`
pub fn functions_router<R: FunctionRepository + 'static>(service: FunctionService<R>) -> Router {
    let service = Arc::new(service);

    Router::new()
        .route("/", get(list_functions).post(create_function))
        .route("/capabilities", get(get_capabilities))
        .route("/health", get(get_health))
        .route("/provider-config", put(set_provider_config))
        .route("/invocations/{invocation_id}", get(get_invocation_status))
        .route(
            "/{fn_id}",
            get(get_function).put(update_function).delete(delete_function),
        )
        .route("/{fn_id}/versions", get(list_versions).post(deploy_version))
        .route("/{fn_id}/versions/{version_id}/activate", post(activate_version))
        .route("/{fn_id}/rollback", post(rollback_version))
        .route("/{fn_id}/invoke", post(invoke_function))
        .route("/{fn_id}/invoke-async", post(invoke_function_async))
        .route("/{fn_id}/invocations", get(list_invocations))
        .route("/{fn_id}/logs", get(get_logs))
        .route("/{fn_id}/metrics", get(get_metrics))
        .route("/{fn_id}/events", get(list_events))
        .route("/{fn_id}/triggers", get(list_triggers).post(create_trigger))
        .route(
            "/{fn_id}/triggers/{trigger_id}",
            put(update_trigger).delete(delete_trigger),
        )
        .with_state(service)
}

type Ctx = (Uuid, Uuid, Uuid);
type FnCtx = (Uuid, Uuid, Uuid, Uuid);

async fn create_function<R: FunctionRepository>(
    State(service): State<Arc<FunctionService<R>>>,
    Extension(principal): Extension<Principal>,
    Path((org_id, ws_id, project_id)): Path<Ctx>,
    Json(spec): Json<FunctionSpec>,
) -> Result<impl IntoResponse, AppError> {
    require_org(&principal, org_id)?;
    let function = service.create_function(ws_id, project_id, spec).await?;
    Ok((StatusCode::CREATED, Json(function)))
}

async fn list_functions<R: FunctionRepository>(
    State(service): State<Arc<FunctionService<R>>>,
    Extension(principal): Extension<Principal>,
    Path((org_id, ws_id, _project_id)): Path<Ctx>,
    Query(params): Query<ListParams>,
) -> Result<impl IntoResponse, AppError> {
    require_org(&principal, org_id)?;
    Ok(Json(service.list_functions(ws_id, params).await?))
}

async fn get_function<R: FunctionRepository>(
    State(service): State<Arc<FunctionService<R>>>,
    Extension(principal): Extension<Principal>,
    Path((org_id, ws_id, _project_id, fn_id)): Path<FnCtx>,
) -> Result<impl IntoResponse, AppError> {
    require_org(&principal, org_id)?;
    Ok(Json(service.get_function(ws_id, fn_id).await?))
}

async fn update_function<R: FunctionRepository>(
    State(service): State<Arc<FunctionService<R>>>,
    Extension(principal): Extension<Principal>,
    Path((org_id, ws_id, _project_id, fn_id)): Path<FnCtx>,
    Json(spec): Json<FunctionSpec>,
) -> Result<impl IntoResponse, AppError> {
    require_org(&principal, org_id)?;
    Ok(Json(service.update_function(ws_id, fn_id, spec).await?))
}

async fn delete_function<R: FunctionRepository>(
    State(service): State<Arc<FunctionService<R>>>,
    Extension(principal): Extension<Principal>,
    Path((org_id, ws_id, _project_id, fn_id)): Path<FnCtx>,
) -> Result<impl IntoResponse, AppError> {
    require_org(&principal, org_id)?;
    service.delete_function(ws_id, fn_id).await?;
    Ok(StatusCode::NO_CONTENT)
}

async fn deploy_version<R: FunctionRepository>(
    State(service): State<Arc<FunctionService<R>>>,
    Extension(principal): Extension<Principal>,
    Path((org_id, ws_id, _project_id, fn_id)): Path<FnCtx>,
    Json(spec): Json<VersionSpec>,
) -> Result<impl IntoResponse, AppError> {
    require_org(&principal, org_id)?;
    let version = service.deploy_version(ws_id, fn_id, spec).await?;
    Ok((StatusCode::CREATED, Json(version)))
}

async fn list_versions<R: FunctionRepository>(
    State(service): State<Arc<FunctionService<R>>>,
    Extension(principal): Extension<Principal>,
    Path((org_id, ws_id, _project_id, fn_id)): Path<FnCtx>,
) -> Result<impl IntoResponse, AppError> {
    require_org(&principal, org_id)?;
    Ok(Json(service.list_versions(ws_id, fn_id).await?))
}

async fn activate_version<R: FunctionRepository>(
    State(service): State<Arc<FunctionService<R>>>,
    Extension(principal): Extension<Principal>,
    Path((org_id, ws_id, _project_id, fn_id, version_id)): Path<(Uuid, Uuid, Uuid, Uuid, Uuid)>,
) -> Result<impl IntoResponse, AppError> {
    require_org(&principal, org_id)?;
    Ok(Json(service.set_active_version(ws_id, fn_id, version_id).await?))
}

async fn rollback_version<R: FunctionRepository>(
    State(service): State<Arc<FunctionService<R>>>,
    Extension(principal): Extension<Principal>,
    Path((org_id, ws_id, _project_id, fn_id)): Path<FnCtx>,
) -> Result<impl IntoResponse, AppError> {
    require_org(&principal, org_id)?;
    Ok(Json(service.rollback_version(ws_id, fn_id).await?))
}

async fn invoke_function<R: FunctionRepository>(
    State(service): State<Arc<FunctionService<R>>>,
    Extension(principal): Extension<Principal>,
    Path((org_id, ws_id, _project_id, fn_id)): Path<FnCtx>,
    Json(request): Json<InvokeRequest>,
) -> Result<impl IntoResponse, AppError> {
    require_org(&principal, org_id)?;
    Ok(Json(service.invoke_function(ws_id, fn_id, request).await?))
}

async fn invoke_function_async<R: FunctionRepository>(
    State(service): State<Arc<FunctionService<R>>>,
    Extension(principal): Extension<Principal>,
    Path((org_id, ws_id, _project_id, fn_id)): Path<FnCtx>,
    Json(request): Json<InvokeRequest>,
) -> Result<impl IntoResponse, AppError> {
    require_org(&principal, org_id)?;
    let invocation_id = service.invoke_function_async(ws_id, fn_id, request).await?;
    Ok((
        StatusCode::ACCEPTED,
        Json(json!({ "invocation_id": invocation_id })),
    ))
}

async fn get_invocation_status<R: FunctionRepository>(
    State(service): State<Arc<FunctionService<R>>>,
    Extension(principal): Extension<Principal>,
    Path((org_id, ws_id, _project_id, invocation_id)): Path<(Uuid, Uuid, Uuid, String)>,
) -> Result<impl IntoResponse, AppError> {
    require_org(&principal, org_id)?;
    Ok(Json(service.get_invocation_status(ws_id, &invocation_id).await?))
}

async fn list_invocations<R: FunctionRepository>(
    State(service): State<Arc<FunctionService<R>>>,
    Extension(principal): Extension<Principal>,
    Path((org_id, ws_id, _project_id, fn_id)): Path<FnCtx>,
    Query(params): Query<ListParams>,
) -> Result<impl IntoResponse, AppError> {
    require_org(&principal, org_id)?;
    Ok(Json(service.list_invocations(ws_id, fn_id, params).await?))
}

async fn get_logs<R: FunctionRepository>(
    State(service): State<Arc<FunctionService<R>>>,
    Extension(principal): Extension<Principal>,
    Path((org_id, ws_id, _project_id, fn_id)): Path<FnCtx>,
    Query(query): Query<LogsQuery>,
) -> Result<impl IntoResponse, AppError> {
    require_org(&principal, org_id)?;
    Ok(Json(service.get_logs(ws_id, fn_id, query).await?))
}

async fn get_metrics<R: FunctionRepository>(
    State(service): State<Arc<FunctionService<R>>>,
    Extension(principal): Extension<Principal>,
    Path((org_id, ws_id, _project_id, fn_id)): Path<FnCtx>,
) -> Result<impl IntoResponse, AppError> {
    require_org(&principal, org_id)?;
    Ok(Json(service.get_metrics(ws_id, fn_id).await?))
}

async fn list_events<R: FunctionRepository>(
    State(service): State<Arc<FunctionService<R>>>,
    Extension(principal): Extension<Principal>,
    Path((org_id, ws_id, _project_id, fn_id)): Path<FnCtx>,
) -> Result<impl IntoResponse, AppError> {
    require_org(&principal, org_id)?;
    Ok(Json(service.list_audit_events(ws_id, fn_id).await?))
}

async fn get_capabilities<R: FunctionRepository>(
    State(service): State<Arc<FunctionService<R>>>,
    Extension(principal): Extension<Principal>,
    Path((org_id, ws_id, _project_id)): Path<Ctx>,
) -> Result<impl IntoResponse, AppError> {
    require_org(&principal, org_id)?;
    Ok(Json(service.get_capabilities(ws_id).await?))
}

async fn get_health<R: FunctionRepository>(
    State(service): State<Arc<FunctionService<R>>>,
    Extension(principal): Extension<Principal>,
    Path((org_id, ws_id, _project_id)): Path<Ctx>,
) -> Result<impl IntoResponse, AppError> {
    require_org(&principal, org_id)?;
    Ok(Json(service.get_health(ws_id).await?))
}

async fn set_provider_config<R: FunctionRepository>(
    State(service): State<Arc<FunctionService<R>>>,
    Extension(principal): Extension<Principal>,
    Path((org_id, ws_id, _project_id)): Path<Ctx>,
    Json(input): Json<ProviderConfigInput>,
) -> Result<impl IntoResponse, AppError> {
    require_org(&principal, org_id)?;
    if !principal.is_admin() {
        return Err(AppError::Forbidden(
            "only owners and admins can change the function provider".to_string(),
        ));
    }
    Ok(Json(
        service
            .set_provider_config(ws_id, input.kind, input.config)
            .await?,
    ))
}

async fn create_trigger<R: FunctionRepository>(
    State(service): State<Arc<FunctionService<R>>>,
    Extension(principal): Extension<Principal>,
    Path((org_id, ws_id, _project_id, fn_id)): Path<FnCtx>,
    Json(spec): Json<TriggerSpec>,
) -> Result<impl IntoResponse, AppError> {
    require_org(&principal, org_id)?;
    let trigger = service.create_trigger(ws_id, fn_id, spec).await?;
    Ok((StatusCode::CREATED, Json(trigger)))
}

async fn list_triggers<R: FunctionRepository>(
    State(service): State<Arc<FunctionService<R>>>,
    Extension(principal): Extension<Principal>,
    Path((org_id, ws_id, _project_id, fn_id)): Path<FnCtx>,
) -> Result<impl IntoResponse, AppError> {
    require_org(&principal, org_id)?;
    Ok(Json(service.list_triggers(ws_id, fn_id).await?))
}

async fn update_trigger<R: FunctionRepository>(
    State(service): State<Arc<FunctionService<R>>>,
    Extension(principal): Extension<Principal>,
    Path((org_id, ws_id, _project_id, fn_id, trigger_id)): Path<(Uuid, Uuid, Uuid, Uuid, Uuid)>,
    Json(spec): Json<TriggerSpec>,
) -> Result<impl IntoResponse, AppError> {
    require_org(&principal, org_id)?;
    Ok(Json(service.update_trigger(ws_id, fn_id, trigger_id, spec).await?))
}

async fn delete_trigger<R: FunctionRepository>(
    State(service): State<Arc<FunctionService<R>>>,
    Extension(principal): Extension<Principal>,
    Path((org_id, ws_id, _project_id, fn_id, trigger_id)): Path<(Uuid, Uuid, Uuid, Uuid, Uuid)>,
) -> Result<impl IntoResponse, AppError> {
    require_org(&principal, org_id)?;
    service.delete_trigger(ws_id, fn_id, trigger_id).await?;
    Ok(StatusCode::NO_CONTENT)
}
