//! Handler tests for the node routers: status codes, role checks, and the
//! provisioning accept path.

use axum::body::Body;
use axum::http::{Request, StatusCode};
use axum::Extension;
use axum_helpers::{OrgRole, Principal};
use domain_nodes::*;
use http_body_util::BodyExt;
use serde_json::json;
use std::sync::Arc;
use test_utils::{NullCluster, NullVirt};
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

struct Fixture {
    app: axum::Router,
    org_id: Uuid,
    workspace_id: Uuid,
}

async fn fixture(role: OrgRole) -> Fixture {
    let repo = InMemoryNodeRepository::new();
    let org_id = Uuid::new_v4();
    let workspace_id = Uuid::new_v4();

    repo.upsert_allocation(&WorkspaceNodeAllocation::shared(
        workspace_id,
        SharedQuota::default_quota(),
    ))
    .await
    .unwrap();

    let service = NodeAllocationService::new(repo, Arc::new(NullVirt), Arc::new(NullCluster));
    let app = axum::Router::new()
        .nest(
            "/{org_id}/workspaces/{ws_id}/nodes",
            handlers::nodes_router(service),
        )
        .layer(Extension(principal(org_id, role)));

    Fixture {
        app,
        org_id,
        workspace_id,
    }
}

fn provision_request(org_id: Uuid, ws_id: Uuid, node_type: &str) -> Request<Body> {
    Request::builder()
        .method("POST")
        .uri(format!("/{}/workspaces/{}/nodes", org_id, ws_id))
        .header("content-type", "application/json")
        .body(Body::from(
            serde_json::to_string(&json!({
                "name": "n1",
                "node_type": node_type,
                "ssh_public_key": "ssh-rsa AAAA",
            }))
            .unwrap(),
        ))
        .unwrap()
}

#[tokio::test]
async fn test_provision_returns_202_with_provisioning_node() {
    let f = fixture(OrgRole::Admin).await;

    let response = f
        .app
        .oneshot(provision_request(f.org_id, f.workspace_id, "S-Type"))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::ACCEPTED);

    let node: DedicatedNode = json_body(response.into_body()).await;
    assert_eq!(node.status, NodeStatus::Provisioning);
    assert_eq!(node.specification.cpu_cores, 4);
}

#[tokio::test]
async fn test_provision_rejected_for_members() {
    let f = fixture(OrgRole::Member).await;

    let response = f
        .app
        .oneshot(provision_request(f.org_id, f.workspace_id, "S-Type"))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::FORBIDDEN);
}

#[tokio::test]
async fn test_provision_unknown_type_is_400() {
    let f = fixture(OrgRole::Admin).await;

    let response = f
        .app
        .oneshot(provision_request(f.org_id, f.workspace_id, "XL-Type"))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_cross_org_request_is_403() {
    let f = fixture(OrgRole::Admin).await;
    let other_org = Uuid::new_v4();

    let response = f
        .app
        .oneshot(provision_request(other_org, f.workspace_id, "S-Type"))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::FORBIDDEN);
}

#[tokio::test]
async fn test_unknown_node_is_404() {
    let f = fixture(OrgRole::Member).await;

    let request = Request::builder()
        .method("GET")
        .uri(format!(
            "/{}/workspaces/{}/nodes/{}",
            f.org_id,
            f.workspace_id,
            Uuid::new_v4()
        ))
        .body(Body::empty())
        .unwrap();

    let response = f.app.oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}
