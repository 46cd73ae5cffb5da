use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::IntoResponse,
    routing::{get, post, put},
    Extension, Json, Router,
};
use axum_helpers::{pagination::ListParams, require_org, AppError, Principal};
use std::sync::Arc;
use uuid::Uuid;

use crate::models::{
    CreateApplication, CreateBackupPolicy, SaveAsTemplateRequest, ScaleRequest,
    UpdateApplication, UpdateBackupPolicy, UpdateScheduleRequest,
};
use crate::repository::ApplicationRepository;
use crate::service::ApplicationService;

/// Router for `/organizations/{org_id}/workspaces/{ws_id}/projects/{project_id}/applications`
pub fn applications_router<R: ApplicationRepository + 'static>(
    service: ApplicationService<R>,
) -> Router {
    let service = Arc::new(service);

    Router::new()
        .route("/", get(list_applications).post(create_application))
        .route(
            "/{app_id}",
            get(get_application)
                .put(update_application)
                .delete(delete_application),
        )
        .route("/{app_id}/scale", post(scale_application))
        .route("/{app_id}/restart", post(restart_application))
        .route("/{app_id}/trigger", post(trigger_cronjob))
        .route("/{app_id}/schedule", put(update_schedule))
        .route("/{app_id}/executions", get(list_executions))
        .route("/{app_id}/save-as-template", post(save_as_template))
        .route(
            "/{app_id}/backup-policy",
            get(get_backup_policy)
                .post(create_backup_policy)
                .put(update_backup_policy)
                .delete(delete_backup_policy),
        )
        .with_state(service)
}

type Ctx = (Uuid, Uuid, Uuid);
type AppCtx = (Uuid, Uuid, Uuid, Uuid);

async fn create_application<R: ApplicationRepository>(
    State(service): State<Arc<ApplicationService<R>>>,
    Extension(principal): Extension<Principal>,
    Path((org_id, ws_id, project_id)): Path<Ctx>,
    Json(input): Json<CreateApplication>,
) -> Result<impl IntoResponse, AppError> {
    require_org(&principal, org_id)?;
    let app = service.create(ws_id, project_id, input).await?;
    Ok((StatusCode::CREATED, Json(app)))
}

async fn list_applications<R: ApplicationRepository>(
    State(service): State<Arc<ApplicationService<R>>>,
    Extension(principal): Extension<Principal>,
    Path((org_id, _ws_id, project_id)): Path<Ctx>,
    Query(params): Query<ListParams>,
) -> Result<impl IntoResponse, AppError> {
    require_org(&principal, org_id)?;
    Ok(Json(service.list(project_id, params).await?))
}

async fn get_application<R: ApplicationRepository>(
    State(service): State<Arc<ApplicationService<R>>>,
    Extension(principal): Extension<Principal>,
    Path((org_id, ws_id, _project_id, app_id)): Path<AppCtx>,
) -> Result<impl IntoResponse, AppError> {
    require_org(&principal, org_id)?;
    Ok(Json(service.get(ws_id, app_id).await?))
}

async fn update_application<R: ApplicationRepository>(
    State(service): State<Arc<ApplicationService<R>>>,
    Extension(principal): Extension<Principal>,
    Path((org_id, ws_id, _project_id, app_id)): Path<AppCtx>,
    Json(input): Json<UpdateApplication>,
) -> Result<impl IntoResponse, AppError> {
    require_org(&principal, org_id)?;
    Ok(Json(service.update(ws_id, app_id, input).await?))
}

async fn delete_application<R: ApplicationRepository>(
    State(service): State<Arc<ApplicationService<R>>>,
    Extension(principal): Extension<Principal>,
    Path((org_id, ws_id, _project_id, app_id)): Path<AppCtx>,
) -> Result<impl IntoResponse, AppError> {
    require_org(&principal, org_id)?;
    service.delete(ws_id, app_id).await?;
    Ok(StatusCode::NO_CONTENT)
}

async fn scale_application<R: ApplicationRepository>(
    State(service): State<Arc<ApplicationService<R>>>,
    Extension(principal): Extension<Principal>,
    Path((org_id, ws_id, _project_id, app_id)): Path<AppCtx>,
    Json(request): Json<ScaleRequest>,
) -> Result<impl IntoResponse, AppError> {
    require_org(&principal, org_id)?;
    Ok(Json(service.scale(ws_id, app_id, request.replicas).await?))
}

async fn restart_application<R: ApplicationRepository>(
    State(service): State<Arc<ApplicationService<R>>>,
    Extension(principal): Extension<Principal>,
    Path((org_id, ws_id, _project_id, app_id)): Path<AppCtx>,
) -> Result<impl IntoResponse, AppError> {
    require_org(&principal, org_id)?;
    service.restart(ws_id, app_id).await?;
    Ok(StatusCode::ACCEPTED)
}

async fn trigger_cronjob<R: ApplicationRepository>(
    State(service): State<Arc<ApplicationService<R>>>,
    Extension(principal): Extension<Principal>,
    Path((org_id, ws_id, _project_id, app_id)): Path<AppCtx>,
) -> Result<impl IntoResponse, AppError> {
    require_org(&principal, org_id)?;
    let execution = service.trigger_now(ws_id, app_id).await?;
    Ok((StatusCode::CREATED, Json(execution)))
}

async fn update_schedule<R: ApplicationRepository>(
    State(service): State<Arc<ApplicationService<R>>>,
    Extension(principal): Extension<Principal>,
    Path((org_id, ws_id, _project_id, app_id)): Path<AppCtx>,
    Json(request): Json<UpdateScheduleRequest>,
) -> Result<impl IntoResponse, AppError> {
    require_org(&principal, org_id)?;
    Ok(Json(service.update_schedule(ws_id, app_id, request).await?))
}

async fn list_executions<R: ApplicationRepository>(
    State(service): State<Arc<ApplicationService<R>>>,
    Extension(principal): Extension<Principal>,
    Path((org_id, ws_id, _project_id, app_id)): Path<AppCtx>,
    Query(params): Query<ListParams>,
) -> Result<impl IntoResponse, AppError> {
    require_org(&principal, org_id)?;
    Ok(Json(service.list_executions(ws_id, app_id, params).await?))
}

async fn save_as_template<R: ApplicationRepository>(
    State(service): State<Arc<ApplicationService<R>>>,
    Extension(principal): Extension<Principal>,
    Path((org_id, ws_id, _project_id, app_id)): Path<AppCtx>,
    Json(request): Json<SaveAsTemplateRequest>,
) -> Result<impl IntoResponse, AppError> {
    require_org(&principal, org_id)?;
    let template = service.save_as_template(ws_id, app_id, request).await?;
    Ok((StatusCode::CREATED, Json(template)))
}

async fn create_backup_policy<R: ApplicationRepository>(
    State(service): State<Arc<ApplicationService<R>>>,
    Extension(principal): Extension<Principal>,
    Path((org_id, ws_id, _project_id, app_id)): Path<AppCtx>,
    Json(input): Json<CreateBackupPolicy>,
) -> Result<impl IntoResponse, AppError> {
    require_org(&principal, org_id)?;
    let policy = service.create_backup_policy(ws_id, app_id, input).await?;
    Ok((StatusCode::CREATED, Json(policy)))
}

async fn get_backup_policy<R: ApplicationRepository>(
    State(service): State<Arc<ApplicationService<R>>>,
    Extension(principal): Extension<Principal>,
    Path((org_id, ws_id, _project_id, app_id)): Path<AppCtx>,
) -> Result<impl IntoResponse, AppError> {
    require_org(&principal, org_id)?;
    Ok(Json(service.get_backup_policy(ws_id, app_id).await?))
}

async fn update_backup_policy<R: ApplicationRepository>(
    State(service): State<Arc<ApplicationService<R>>>,
    Extension(principal): Extension<Principal>,
    Path((org_id, ws_id, _project_id, app_id)): Path<AppCtx>,
    Json(input): Json<UpdateBackupPolicy>,
) -> Result<impl IntoResponse, AppError> {
    require_org(&principal, org_id)?;
    Ok(Json(service.update_backup_policy(ws_id, app_id, input).await?))
}

async fn delete_backup_policy<R: ApplicationRepository>(
    State(service): State<Arc<ApplicationService<R>>>,
    Extension(principal): Extension<Principal>,
    Path((org_id, ws_id, _project_id, app_id)): Path<AppCtx>,
) -> Result<impl IntoResponse, AppError> {
    require_org(&principal, org_id)?;
    service.delete_backup_policy(ws_id, app_id).await?;
    Ok(StatusCode::NO_CONTENT)
}
