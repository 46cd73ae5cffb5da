//! Handler tests for the tenancy routers.
//!
//! These exercise the HTTP surface only: status codes, org scoping, and
//! body round-trips, against in-memory repositories. The auth middleware is
//! replaced by a fixed principal injected as an extension layer.

use axum::body::Body;
use axum::http::{Request, StatusCode};
use axum::Extension;
use axum_helpers::{OrgRole, Principal};
use domain_workspaces::*;
use http_body_util::BodyExt;
use kubernetes::OidcSettings;
use serde_json::json;
use std::sync::Arc;
use test_utils::NullCluster;
use tower::ServiceExt; // for oneshot()
use uuid::Uuid;

async fn json_body<T: serde::de::DeserializeOwned>(body: Body) -> T {
    let bytes = body.collect().await.unwrap().to_bytes();
    serde_json::from_slice(&bytes).unwrap()
}

fn principal(org_id: Uuid, role: OrgRole) -> Principal {
    Principal {
        user_id: Uuid::new_v4(),
        organization_id: org_id,
        role,
    }
}

fn oidc() -> OidcSettings {
    OidcSettings {
        issuer_url: "https://auth.test".to_string(),
        client_id: "hexabase".to_string(),
        groups_claim: None,
    }
}

async fn seeded_org(repo: &Arc<InMemoryTenancyRepository>) -> Organization {
    let owner = Uuid::new_v4();
    let org = Organization::new(
        CreateOrganization {
            name: "acme".to_string(),
        },
        owner,
    );
    let member = OrganizationMember {
        organization_id: org.id,
        user_id: owner,
        role: OrgRole::Owner,
    };
    repo.create_organization(&org, &member).await.unwrap();
    org
}

#[tokio::test]
async fn test_create_organization_returns_201() {
    let repo = Arc::new(InMemoryTenancyRepository::new());
    let service = OrganizationService::new(repo);
    let me = principal(Uuid::new_v4(), OrgRole::Owner);
    let app = handlers::organizations_router(service).layer(Extension(me));

    let request = Request::builder()
        .method("POST")
        .uri("/")
        .header("content-type", "application/json")
        .body(Body::from(
            serde_json::to_string(&json!({ "name": "acme" })).unwrap(),
        ))
        .unwrap();

    let response = app.oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::CREATED);

    let org: Organization = json_body(response.into_body()).await;
    assert_eq!(org.name, "acme");
}

#[tokio::test]
async fn test_get_organization_cross_org_is_403() {
    let repo = Arc::new(InMemoryTenancyRepository::new());
    let org = seeded_org(&repo).await;
    let service = OrganizationService::new(repo);

    // Token scoped to a different organization
    let me = principal(Uuid::new_v4(), OrgRole::Member);
    let app = handlers::organizations_router(service).layer(Extension(me));

    let request = Request::builder()
        .method("GET")
        .uri(format!("/{}", org.id))
        .body(Body::empty())
        .unwrap();

    let response = app.oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::FORBIDDEN);
}

#[tokio::test]
async fn test_get_unknown_organization_is_404() {
    let repo = Arc::new(InMemoryTenancyRepository::new());
    let service = OrganizationService::new(repo);
    let missing = Uuid::new_v4();
    let me = principal(missing, OrgRole::Member);
    let app = handlers::organizations_router(service).layer(Extension(me));

    let request = Request::builder()
        .method("GET")
        .uri(format!("/{}", missing))
        .body(Body::empty())
        .unwrap();

    let response = app.oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_delete_organization_requires_admin() {
    let repo = Arc::new(InMemoryTenancyRepository::new());
    let org = seeded_org(&repo).await;
    let service = OrganizationService::new(repo);
    let me = principal(org.id, OrgRole::Member);
    let app = handlers::organizations_router(service).layer(Extension(me));

    let request = Request::builder()
        .method("DELETE")
        .uri(format!("/{}", org.id))
        .body(Body::empty())
        .unwrap();

    let response = app.oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::FORBIDDEN);
}

#[tokio::test]
async fn test_workspace_create_and_duplicate_conflict() {
    let repo = Arc::new(InMemoryTenancyRepository::new());
    let org = seeded_org(&repo).await;
    let service = WorkspaceService::new(repo, Arc::new(NullCluster), oidc());
    let me = principal(org.id, OrgRole::Admin);
    // Mounted the way the API composes it
    let app = axum::Router::new()
        .nest("/{org_id}/workspaces", handlers::workspaces_router(service))
        .layer(Extension(me));

    let make_request = || {
        Request::builder()
            .method("POST")
            .uri(format!("/{}/workspaces", org.id))
            .header("content-type", "application/json")
            .body(Body::from(
                serde_json::to_string(&json!({ "name": "dev" })).unwrap(),
            ))
            .unwrap()
    };

    let response = app.clone().oneshot(make_request()).await.unwrap();
    assert_eq!(response.status(), StatusCode::CREATED);
    let ws: Workspace = json_body(response.into_body()).await;
    assert_eq!(ws.vcluster_status, VClusterStatus::Pending);
    assert_eq!(ws.plan, WorkspacePlan::Shared);

    let response = app.oneshot(make_request()).await.unwrap();
    assert_eq!(response.status(), StatusCode::CONFLICT);
}
