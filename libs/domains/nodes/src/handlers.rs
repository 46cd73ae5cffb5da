use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::IntoResponse,
    routing::{get, post},
    Extension, Json, Router,
};
use axum_helpers::{require_org, AppError, Principal};
use std::sync::Arc;
use uuid::Uuid;

use crate::models::{BillingPeriod, NodePlan, ProvisionNodeRequest, ResourceRequest};
use crate::repository::NodeRepository;
use crate::service::NodeAllocationService;

/// Router for `/node-plans` (catalog is global, auth only)
pub fn plans_router() -> Router {
    Router::new().route("/", get(list_plans))
}

async fn list_plans(Extension(_principal): Extension<Principal>) -> Json<Vec<NodePlan>> {
    Json(NodePlan::catalog())
}

/// Router for `/organizations/{org_id}/workspaces/{ws_id}/nodes`
pub fn nodes_router<R: NodeRepository + 'static>(service: NodeAllocationService<R>) -> Router {
    let service = Arc::new(service);

    Router::new()
        .route("/", get(list_nodes).post(provision_node))
        .route("/allocation", get(get_allocation))
        .route("/allocation/can-allocate", get(can_allocate))
        .route("/allocation/reconcile", post(reconcile_plan))
        .route("/usage", get(resource_usage))
        .route("/costs", get(cost_report))
        .route("/{node_id}", get(get_node).delete(delete_node))
        .route("/{node_id}/start", post(start_node))
        .route("/{node_id}/stop", post(stop_node))
        .route("/{node_id}/reboot", post(reboot_node))
        .route("/{node_id}/status", get(agent_status))
        .route("/{node_id}/conditions", get(agent_conditions))
        .route("/{node_id}/metrics", get(node_metrics))
        .route("/{node_id}/events", get(node_events))
        .with_state(service)
}

type WsCtx = (Uuid, Uuid);
type NodeCtx = (Uuid, Uuid, Uuid);

async fn provision_node<R: NodeRepository + 'static>(
    State(service): State<Arc<NodeAllocationService<R>>>,
    Extension(principal): Extension<Principal>,
    Path((org_id, ws_id)): Path<WsCtx>,
    Json(request): Json<ProvisionNodeRequest>,
) -> Result<impl IntoResponse, AppError> {
    require_org(&principal, org_id)?;
    if !principal.is_admin() {
        return Err(AppError::Forbidden(
            "only owners and admins can provision dedicated nodes".to_string(),
        ));
    }
    let node = service
        .provision_dedicated_node_detached(ws_id, request)
        .await?;
    Ok((StatusCode::ACCEPTED, Json(node)))
}

async fn list_nodes<R: NodeRepository>(
    State(service): State<Arc<NodeAllocationService<R>>>,
    Extension(principal): Extension<Principal>,
    Path((org_id, ws_id)): Path<WsCtx>,
) -> Result<impl IntoResponse, AppError> {
    require_org(&principal, org_id)?;
    Ok(Json(service.list_nodes(ws_id).await?))
}

async fn get_node<R: NodeRepository>(
    State(service): State<Arc<NodeAllocationService<R>>>,
    Extension(principal): Extension<Principal>,
    Path((org_id, _ws_id, node_id)): Path<NodeCtx>,
) -> Result<impl IntoResponse, AppError> {
    require_org(&principal, org_id)?;
    Ok(Json(service.get_node(node_id).await?))
}

async fn delete_node<R: NodeRepository>(
    State(service): State<Arc<NodeAllocationService<R>>>,
    Extension(principal): Extension<Principal>,
    Path((org_id, _ws_id, node_id)): Path<NodeCtx>,
) -> Result<impl IntoResponse, AppError> {
    require_org(&principal, org_id)?;
    if !principal.is_admin() {
        return Err(AppError::Forbidden(
            "only owners and admins can delete dedicated nodes".to_string(),
        ));
    }
    service.delete_node(node_id).await?;
    Ok(StatusCode::NO_CONTENT)
}

async fn start_node<R: NodeRepository>(
    State(service): State<Arc<NodeAllocationService<R>>>,
    Extension(principal): Extension<Principal>,
    Path((org_id, _ws_id, node_id)): Path<NodeCtx>,
) -> Result<impl IntoResponse, AppError> {
    require_org(&principal, org_id)?;
    Ok(Json(service.start_node(node_id).await?))
}

async fn stop_node<R: NodeRepository>(
    State(service): State<Arc<NodeAllocationService<R>>>,
    Extension(principal): Extension<Principal>,
    Path((org_id, _ws_id, node_id)): Path<NodeCtx>,
) -> Result<impl IntoResponse, AppError> {
    require_org(&principal, org_id)?;
    Ok(Json(service.stop_node(node_id).await?))
}

async fn reboot_node<R: NodeRepository>(
    State(service): State<Arc<NodeAllocationService<R>>>,
    Extension(principal): Extension<Principal>,
    Path((org_id, _ws_id, node_id)): Path<NodeCtx>,
) -> Result<impl IntoResponse, AppError> {
    require_org(&principal, org_id)?;
    Ok(Json(service.reboot_node(node_id).await?))
}

async fn agent_status<R: NodeRepository>(
    State(service): State<Arc<NodeAllocationService<R>>>,
    Extension(principal): Extension<Principal>,
    Path((org_id, _ws_id, node_id)): Path<NodeCtx>,
) -> Result<impl IntoResponse, AppError> {
    require_org(&principal, org_id)?;
    let status = service.check_agent_status(node_id).await?;
    Ok(Json(serde_json::json!({ "status": status })))
}

async fn agent_conditions<R: NodeRepository>(
    State(service): State<Arc<NodeAllocationService<R>>>,
    Extension(principal): Extension<Principal>,
    Path((org_id, _ws_id, node_id)): Path<NodeCtx>,
) -> Result<impl IntoResponse, AppError> {
    require_org(&principal, org_id)?;
    Ok(Json(service.agent_conditions(node_id).await?))
}

async fn node_metrics<R: NodeRepository>(
    State(service): State<Arc<NodeAllocationService<R>>>,
    Extension(principal): Extension<Principal>,
    Path((org_id, ws_id, node_id)): Path<NodeCtx>,
) -> Result<impl IntoResponse, AppError> {
    require_org(&principal, org_id)?;
    // Per-node slice of the workspace usage snapshot
    let usage = service.resource_usage(ws_id).await?;
    let live = usage
        .dedicated
        .and_then(|d| d.live.into_iter().find(|l| l.node_id == node_id));
    match live {
        Some(sample) => Ok(Json(sample)),
        None => Err(AppError::NotFound(format!(
            "no live metrics for node {}",
            node_id
        ))),
    }
}

async fn node_events<R: NodeRepository>(
    State(service): State<Arc<NodeAllocationService<R>>>,
    Extension(principal): Extension<Principal>,
    Path((org_id, _ws_id, node_id)): Path<NodeCtx>,
) -> Result<impl IntoResponse, AppError> {
    require_org(&principal, org_id)?;
    Ok(Json(service.list_events(node_id).await?))
}

async fn get_allocation<R: NodeRepository>(
    State(service): State<Arc<NodeAllocationService<R>>>,
    Extension(principal): Extension<Principal>,
    Path((org_id, ws_id)): Path<WsCtx>,
) -> Result<impl IntoResponse, AppError> {
    require_org(&principal, org_id)?;
    Ok(Json(service.get_allocation(ws_id).await?))
}

async fn can_allocate<R: NodeRepository>(
    State(service): State<Arc<NodeAllocationService<R>>>,
    Extension(principal): Extension<Principal>,
    Path((org_id, ws_id)): Path<WsCtx>,
    Query(request): Query<ResourceRequest>,
) -> Result<impl IntoResponse, AppError> {
    require_org(&principal, org_id)?;
    let allowed = service.can_allocate(ws_id, request).await?;
    Ok(Json(serde_json::json!({ "can_allocate": allowed })))
}

async fn reconcile_plan<R: NodeRepository>(
    State(service): State<Arc<NodeAllocationService<R>>>,
    Extension(principal): Extension<Principal>,
    Path((org_id, ws_id)): Path<WsCtx>,
) -> Result<impl IntoResponse, AppError> {
    require_org(&principal, org_id)?;
    if !principal.is_admin() {
        return Err(AppError::Forbidden(
            "only owners and admins can reconcile the plan".to_string(),
        ));
    }
    Ok(Json(service.reconcile_plan(ws_id).await?))
}

async fn resource_usage<R: NodeRepository>(
    State(service): State<Arc<NodeAllocationService<R>>>,
    Extension(principal): Extension<Principal>,
    Path((org_id, ws_id)): Path<WsCtx>,
) -> Result<impl IntoResponse, AppError> {
    require_org(&principal, org_id)?;
    Ok(Json(service.resource_usage(ws_id).await?))
}

async fn cost_report<R: NodeRepository>(
    State(service): State<Arc<NodeAllocationService<R>>>,
    Extension(principal): Extension<Principal>,
    Path((org_id, ws_id)): Path<WsCtx>,
    Query(period): Query<BillingPeriod>,
) -> Result<impl IntoResponse, AppError> {
    require_org(&principal, org_id)?;
    Ok(Json(service.cost_report(ws_id, period).await?))
}
