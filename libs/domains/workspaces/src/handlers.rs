use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::IntoResponse,
    routing::get,
    Extension, Json, Router,
};
use axum_helpers::{pagination::ListParams, require_org, AppError, Principal};
use serde_json::json;
use std::sync::Arc;
use uuid::Uuid;

use crate::models::{
    CreateOrganization, CreateProject, CreateWorkspace, UpdateOrganization, UpdateProject,
    UpdateWorkspace,
};
use crate::orchestrator::WorkspaceService;
use crate::repository::TenancyRepository;
use crate::service::{OrganizationService, ProjectService};

/// Router for `/organizations`
pub fn organizations_router<R: TenancyRepository + 'static>(
    service: OrganizationService<R>,
) -> Router {
    let service = Arc::new(service);

    Router::new()
        .route("/", axum::routing::post(create_organization))
        .route(
            "/{org_id}",
            get(get_organization)
                .put(update_organization)
                .delete(delete_organization),
        )
        .route("/{org_id}/members", get(list_members))
        .with_state(service)
}

async fn create_organization<R: TenancyRepository>(
    State(service): State<Arc<OrganizationService<R>>>,
    Extension(principal): Extension<Principal>,
    Json(input): Json<CreateOrganization>,
) -> Result<impl IntoResponse, AppError> {
    let org = service.create(input, principal.user_id).await?;
    Ok((StatusCode::CREATED, Json(org)))
}

async fn get_organization<R: TenancyRepository>(
    State(service): State<Arc<OrganizationService<R>>>,
    Extension(principal): Extension<Principal>,
    Path(org_id): Path<Uuid>,
) -> Result<impl IntoResponse, AppError> {
    require_org(&principal, org_id)?;
    Ok(Json(service.get(org_id).await?))
}

async fn update_organization<R: TenancyRepository>(
    State(service): State<Arc<OrganizationService<R>>>,
    Extension(principal): Extension<Principal>,
    Path(org_id): Path<Uuid>,
    Json(input): Json<UpdateOrganization>,
) -> Result<impl IntoResponse, AppError> {
    require_org(&principal, org_id)?;
    Ok(Json(service.update(org_id, input).await?))
}

async fn delete_organization<R: TenancyRepository>(
    State(service): State<Arc<OrganizationService<R>>>,
    Extension(principal): Extension<Principal>,
    Path(org_id): Path<Uuid>,
) -> Result<impl IntoResponse, AppError> {
    require_org(&principal, org_id)?;
    if !principal.is_admin() {
        return Err(AppError::Forbidden(
            "only owners and admins can delete an organization".to_string(),
        ));
    }
    service.delete(org_id).await?;
    Ok(StatusCode::NO_CONTENT)
}

async fn list_members<R: TenancyRepository>(
    State(service): State<Arc<OrganizationService<R>>>,
    Extension(principal): Extension<Principal>,
    Path(org_id): Path<Uuid>,
) -> Result<impl IntoResponse, AppError> {
    require_org(&principal, org_id)?;
    Ok(Json(service.members(org_id).await?))
}

/// Router for `/organizations/{org_id}/workspaces`
pub fn workspaces_router<R: TenancyRepository + 'static>(
    service: WorkspaceService<R>,
) -> Router {
    let service = Arc::new(service);

    Router::new()
        .route("/", get(list_workspaces).post(create_workspace))
        .route(
            "/{ws_id}",
            get(get_workspace).put(update_workspace).delete(delete_workspace),
        )
        .route("/{ws_id}/vcluster/health", get(vcluster_health))
        .route("/{ws_id}/vcluster/access-review", get(vcluster_access_review))
        .with_state(service)
}

#[derive(serde::Deserialize)]
struct AccessReviewParams {
    verb: String,
    resource: String,
}

async fn create_workspace<R: TenancyRepository + 'static>(
    State(service): State<Arc<WorkspaceService<R>>>,
    Extension(principal): Extension<Principal>,
    Path(org_id): Path<Uuid>,
    Json(input): Json<CreateWorkspace>,
) -> Result<impl IntoResponse, AppError> {
    require_org(&principal, org_id)?;
    let workspace = service.create(org_id, input).await?;
    Ok((StatusCode::CREATED, Json(workspace)))
}

async fn list_workspaces<R: TenancyRepository + 'static>(
    State(service): State<Arc<WorkspaceService<R>>>,
    Extension(principal): Extension<Principal>,
    Path(org_id): Path<Uuid>,
    Query(params): Query<ListParams>,
) -> Result<impl IntoResponse, AppError> {
    require_org(&principal, org_id)?;
    Ok(Json(service.list(org_id, params).await?))
}

async fn get_workspace<R: TenancyRepository + 'static>(
    State(service): State<Arc<WorkspaceService<R>>>,
    Extension(principal): Extension<Principal>,
    Path((org_id, ws_id)): Path<(Uuid, Uuid)>,
) -> Result<impl IntoResponse, AppError> {
    require_org(&principal, org_id)?;
    Ok(Json(service.get(org_id, ws_id).await?))
}

async fn update_workspace<R: TenancyRepository + 'static>(
    State(service): State<Arc<WorkspaceService<R>>>,
    Extension(principal): Extension<Principal>,
    Path((org_id, ws_id)): Path<(Uuid, Uuid)>,
    Json(input): Json<UpdateWorkspace>,
) -> Result<impl IntoResponse, AppError> {
    require_org(&principal, org_id)?;
    Ok(Json(service.update(org_id, ws_id, input).await?))
}

async fn delete_workspace<R: TenancyRepository + 'static>(
    State(service): State<Arc<WorkspaceService<R>>>,
    Extension(principal): Extension<Principal>,
    Path((org_id, ws_id)): Path<(Uuid, Uuid)>,
) -> Result<impl IntoResponse, AppError> {
    require_org(&principal, org_id)?;
    service.delete(org_id, ws_id).await?;
    Ok(StatusCode::NO_CONTENT)
}

async fn vcluster_access_review<R: TenancyRepository + 'static>(
    State(service): State<Arc<WorkspaceService<R>>>,
    Extension(principal): Extension<Principal>,
    Path((org_id, ws_id)): Path<(Uuid, Uuid)>,
    Query(params): Query<AccessReviewParams>,
) -> Result<impl IntoResponse, AppError> {
    require_org(&principal, org_id)?;
    let allowed = service
        .review_access(org_id, ws_id, principal.user_id, &params.verb, &params.resource)
        .await?;
    Ok(Json(json!({ "allowed": allowed })))
}

async fn vcluster_health<R: TenancyRepository + 'static>(
    State(service): State<Arc<WorkspaceService<R>>>,
    Extension(principal): Extension<Principal>,
    Path((org_id, ws_id)): Path<(Uuid, Uuid)>,
) -> Result<impl IntoResponse, AppError> {
    require_org(&principal, org_id)?;
    let workspace = service.get(org_id, ws_id).await?;
    Ok(Json(json!({
        "vcluster_status": workspace.vcluster_status,
        "vcluster_instance_name": workspace.vcluster_instance_name,
    })))
}

/// Router for `/organizations/{org_id}/workspaces/{ws_id}/projects`
pub fn projects_router<R: TenancyRepository + 'static>(service: ProjectService<R>) -> Router {
    let service = Arc::new(service);

    Router::new()
        .route("/", get(list_projects).post(create_project))
        .route(
            "/{project_id}",
            get(get_project).put(update_project).delete(delete_project),
        )
        .with_state(service)
}

async fn create_project<R: TenancyRepository>(
    State(service): State<Arc<ProjectService<R>>>,
    Extension(principal): Extension<Principal>,
    Path((org_id, ws_id)): Path<(Uuid, Uuid)>,
    Json(input): Json<CreateProject>,
) -> Result<impl IntoResponse, AppError> {
    require_org(&principal, org_id)?;
    let project = service.create(ws_id, input).await?;
    Ok((StatusCode::CREATED, Json(project)))
}

async fn list_projects<R: TenancyRepository>(
    State(service): State<Arc<ProjectService<R>>>,
    Extension(principal): Extension<Principal>,
    Path((org_id, ws_id)): Path<(Uuid, Uuid)>,
    Query(params): Query<ListParams>,
) -> Result<impl IntoResponse, AppError> {
    require_org(&principal, org_id)?;
    Ok(Json(service.list(ws_id, params).await?))
}

async fn get_project<R: TenancyRepository>(
    State(service): State<Arc<ProjectService<R>>>,
    Extension(principal): Extension<Principal>,
    Path((org_id, ws_id, project_id)): Path<(Uuid, Uuid, Uuid)>,
) -> Result<impl IntoResponse, AppError> {
    require_org(&principal, org_id)?;
    Ok(Json(service.get(ws_id, project_id).await?))
}

async fn update_project<R: TenancyRepository>(
    State(service): State<Arc<ProjectService<R>>>,
    Extension(principal): Extension<Principal>,
    Path((org_id, ws_id, project_id)): Path<(Uuid, Uuid, Uuid)>,
    Json(input): Json<UpdateProject>,
) -> Result<impl IntoResponse, AppError> {
    require_org(&principal, org_id)?;
    Ok(Json(service.update(ws_id, project_id, input).await?))
}

async fn delete_project<R: TenancyRepository>(
    State(service): State<Arc<ProjectService<R>>>,
    Extension(principal): Extension<Principal>,
    Path((org_id, ws_id, project_id)): Path<(Uuid, Uuid, Uuid)>,
) -> Result<impl IntoResponse, AppError> {
    require_org(&principal, org_id)?;
    service.delete(ws_id, project_id).await?;
    Ok(StatusCode::NO_CONTENT)
}
