//! Route composition: every `/api/v1` resource router plus the app-level
//! readiness endpoint. Authentication wraps the whole v1 surface; handlers
//! read the principal from request extensions only.

use axum::{extract::State, http::StatusCode, middleware, routing::get, Json, Router};
use axum_helpers::{auth_middleware, JwtVerifier};
use serde_json::json;
use std::sync::Arc;

use domain_applications::{handlers::applications_router, ApplicationService, PgApplicationRepository};
use domain_functions::{handlers::functions_router, FunctionService, PgFunctionRepository};
use domain_nodes::{
    handlers::{nodes_router, plans_router},
    NodeAllocationService, PgNodeRepository,
};
use domain_workspaces::{
    handlers::{organizations_router, projects_router, workspaces_router},
    OrganizationService, PgTenancyRepository, ProjectService, WorkspaceService,
};

use crate::events::EventHub;
use crate::state::AppState;
use crate::ws;

/// Fully constructed domain services, wired in `main`.
pub struct AppServices {
    pub organizations: OrganizationService<PgTenancyRepository>,
    pub workspaces: WorkspaceService<PgTenancyRepository>,
    pub projects: ProjectService<PgTenancyRepository>,
    pub applications: ApplicationService<PgApplicationRepository>,
    pub functions: FunctionService<PgFunctionRepository>,
    pub nodes: NodeAllocationService<PgNodeRepository>,
}

pub fn routes(services: AppServices, verifier: Arc<JwtVerifier>, hub: EventHub) -> Router {
    let v1 = Router::new()
        .nest("/organizations", organizations_router(services.organizations))
        .nest(
            "/organizations/{org_id}/workspaces",
            workspaces_router(services.workspaces),
        )
        .nest(
            "/organizations/{org_id}/workspaces/{ws_id}/projects",
            projects_router(services.projects),
        )
        .nest(
            "/organizations/{org_id}/workspaces/{ws_id}/projects/{project_id}/applications",
            applications_router(services.applications),
        )
        .nest(
            "/organizations/{org_id}/workspaces/{ws_id}/projects/{project_id}/functions",
            functions_router(services.functions),
        )
        .nest(
            "/organizations/{org_id}/workspaces/{ws_id}/nodes",
            nodes_router(services.nodes),
        )
        .nest("/node-plans", plans_router())
        .nest("/organizations", ws::router(hub));

    Router::new()
        .nest("/v1", v1)
        .layer(middleware::from_fn_with_state(verifier, auth_middleware))
}

/// Readiness: answers 200 only when the database responds.
pub fn ready_router(state: AppState) -> Router {
    Router::new()
        .route("/ready", get(ready))
        .with_state(state)
}

async fn ready(State(state): State<AppState>) -> (StatusCode, Json<serde_json::Value>) {
    match state.db.ping().await {
        Ok(_) => (
            StatusCode::OK,
            Json(json!({ "ready": true, "database": "connected" })),
        ),
        Err(e) => {
            tracing::error!("readiness check failed: {}", e);
            (
                StatusCode::SERVICE_UNAVAILABLE,
                Json(json!({ "ready": false, "database": "disconnected" })),
            )
        }
    }
}
