//! Integration tests for the role-request API surface.

use std::sync::Arc;

use axum::{
    body::Body,
    http::{header::CONTENT_TYPE, Method, Request, StatusCode},
    Router,
};
use serde_json::{json, Value};
use tower::ServiceExt;
use uuid::Uuid;

use ryvos_api_governance::{governance_router, GovernanceState, InMemoryStores};
use ryvos_governance::types::{ContractId, IdentityId, RoleId};
use ryvos_governance::SynchronousApprovalEngine;

struct TestApp {
    router: Router,
    state: GovernanceState,
    stores: InMemoryStores,
}

fn test_app() -> TestApp {
    let (state, stores) =
        GovernanceState::new_in_memory(Arc::new(SynchronousApprovalEngine::new()));
    TestApp {
        router: governance_router(state.clone()),
        state,
        stores,
    }
}

async fn seed_applicant(app: &TestApp, username: &str) -> (IdentityId, ContractId, RoleId) {
    let identity = app.stores.identities.add_named(username).await;
    let contract = app.stores.contracts.add_main(identity).await;
    let role = app.stores.roles.add_named("auditor").await;
    (identity, contract, role)
}

async fn send(
    app: &TestApp,
    method: Method,
    uri: &str,
    caller: Option<(Uuid, bool)>,
    body: Option<Value>,
) -> (StatusCode, Value) {
    let mut builder = Request::builder().method(method).uri(uri);
    if let Some((identity_id, admin)) = caller {
        builder = builder.header("x-identity-id", identity_id.to_string());
        if admin {
            builder = builder.header("x-identity-admin", "true");
        }
    }

    let request = match body {
        Some(value) => builder
            .header(CONTENT_TYPE, "application/json")
            .body(Body::from(value.to_string()))
            .unwrap(),
        None => builder.body(Body::empty()).unwrap(),
    };

    let response = app.router.clone().oneshot(request).await.unwrap();
    let status = response.status();
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    let value = if bytes.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&bytes).unwrap()
    };
    (status, value)
}

#[tokio::test]
async fn test_missing_identity_header_is_unauthorized() {
    let app = test_app();

    let (status, body) = send(
        &app,
        Method::POST,
        "/role-requests",
        None,
        Some(json!({ "applicant_id": Uuid::new_v4() })),
    )
    .await;

    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["error"], "unauthorized");
}

#[tokio::test]
async fn test_create_and_start_request_flow() {
    let app = test_app();
    let (identity, contract, role) = seed_applicant(&app, "alice").await;
    let caller = Some((identity.into_inner(), false));

    let (status, created) = send(
        &app,
        Method::POST,
        "/role-requests",
        caller,
        Some(json!({
            "applicant_id": identity.into_inner(),
            "description": "new auditor access"
        })),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(created["state"], "concept");
    let request_id = created["id"].as_str().unwrap().to_string();

    let (status, concept) = send(
        &app,
        Method::POST,
        "/concept-role-requests",
        caller,
        Some(json!({
            "role_request_id": request_id,
            "operation": "add",
            "role_id": role.into_inner(),
            "contract_id": contract.into_inner()
        })),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(concept["state"], "concept");
    assert_eq!(concept["result"]["state"], "created");

    // Synchronous engine resolves on start, so the facade answers 200.
    let (status, resolved) = send(
        &app,
        Method::PUT,
        &format!("/role-requests/{request_id}/start"),
        caller,
        None,
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(resolved["state"], "executed");
    assert_eq!(resolved["executed"], true);

    let (status, concepts) = send(
        &app,
        Method::GET,
        &format!("/role-requests/{request_id}/concepts"),
        caller,
        None,
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(concepts["total"], 1);
    assert_eq!(concepts["items"][0]["state"], "executed");
}

#[tokio::test]
async fn test_automatic_creation_is_rejected() {
    let app = test_app();
    let (identity, _, _) = seed_applicant(&app, "alice").await;

    let (status, body) = send(
        &app,
        Method::POST,
        "/role-requests",
        Some((identity.into_inner(), false)),
        Some(json!({
            "applicant_id": identity.into_inner(),
            "requested_by_type": "automatically"
        })),
    )
    .await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "validation_error");
}

#[tokio::test]
async fn test_unknown_request_is_not_found() {
    let app = test_app();
    let (identity, _, _) = seed_applicant(&app, "alice").await;

    let (status, body) = send(
        &app,
        Method::GET,
        &format!("/role-requests/{}", Uuid::new_v4()),
        Some((identity.into_inner(), false)),
        None,
    )
    .await;

    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["error"], "not_found");
}

#[tokio::test]
async fn test_stranger_cannot_list_concepts() {
    let app = test_app();
    let (identity, _, _) = seed_applicant(&app, "alice").await;

    let (_, created) = send(
        &app,
        Method::POST,
        "/role-requests",
        Some((identity.into_inner(), false)),
        Some(json!({ "applicant_id": identity.into_inner() })),
    )
    .await;
    let request_id = created["id"].as_str().unwrap().to_string();

    let (status, body) = send(
        &app,
        Method::GET,
        &format!("/role-requests/{request_id}/concepts"),
        Some((Uuid::new_v4(), false)),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::FORBIDDEN);
    assert_eq!(body["error"], "forbidden");

    // An admin caller is allowed regardless of ownership.
    let (status, _) = send(
        &app,
        Method::GET,
        &format!("/role-requests/{request_id}/concepts"),
        Some((Uuid::new_v4(), true)),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::OK);
}

#[tokio::test]
async fn test_stranger_cannot_read_or_list_requests() {
    let app = test_app();
    let (identity, _, _) = seed_applicant(&app, "alice").await;

    let (_, created) = send(
        &app,
        Method::POST,
        "/role-requests",
        Some((identity.into_inner(), false)),
        Some(json!({ "applicant_id": identity.into_inner() })),
    )
    .await;
    let request_id = created["id"].as_str().unwrap().to_string();

    let stranger = Some((Uuid::new_v4(), false));
    let (status, body) = send(
        &app,
        Method::GET,
        &format!("/role-requests/{request_id}"),
        stranger,
        None,
    )
    .await;
    assert_eq!(status, StatusCode::FORBIDDEN);
    assert_eq!(body["error"], "forbidden");

    let (status, body) = send(
        &app,
        Method::GET,
        &format!("/role-requests?applicant_id={}", identity.into_inner()),
        stranger,
        None,
    )
    .await;
    assert_eq!(status, StatusCode::FORBIDDEN);
    assert_eq!(body["error"], "forbidden");

    // The owner and admins still read the request.
    let (status, _) = send(
        &app,
        Method::GET,
        &format!("/role-requests/{request_id}"),
        Some((identity.into_inner(), false)),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::OK);

    let (status, _) = send(
        &app,
        Method::GET,
        &format!("/role-requests/{request_id}"),
        Some((Uuid::new_v4(), true)),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::OK);
}

#[tokio::test]
async fn test_delete_draft_cascades_and_executed_conflicts() {
    let app = test_app();
    let (identity, contract, role) = seed_applicant(&app, "alice").await;
    let caller = Some((identity.into_inner(), false));

    let (_, created) = send(
        &app,
        Method::POST,
        "/role-requests",
        caller,
        Some(json!({ "applicant_id": identity.into_inner() })),
    )
    .await;
    let request_id = created["id"].as_str().unwrap().to_string();
    send(
        &app,
        Method::POST,
        "/concept-role-requests",
        caller,
        Some(json!({
            "role_request_id": request_id,
            "operation": "add",
            "role_id": role.into_inner(),
            "contract_id": contract.into_inner()
        })),
    )
    .await;

    let (status, stats) = send(
        &app,
        Method::DELETE,
        &format!("/role-requests/{request_id}"),
        caller,
        None,
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(stats["request_removed"], true);
    assert_eq!(stats["concepts_removed"], 1);

    // Executed requests refuse deletion.
    let (_, created) = send(
        &app,
        Method::POST,
        "/role-requests",
        caller,
        Some(json!({ "applicant_id": identity.into_inner() })),
    )
    .await;
    let request_id = created["id"].as_str().unwrap().to_string();
    send(
        &app,
        Method::PUT,
        &format!("/role-requests/{request_id}/start"),
        caller,
        None,
    )
    .await;

    let (status, body) = send(
        &app,
        Method::DELETE,
        &format!("/role-requests/{request_id}"),
        caller,
        None,
    )
    .await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(body["error"], "conflict");
}

#[tokio::test]
async fn test_request_incompatibility_check() {
    let app = test_app();
    let (identity, contract, auditor) = seed_applicant(&app, "alice").await;
    let caller = Some((identity.into_inner(), true));
    let payroll = app.stores.roles.add_named("payroll").await;
    app.stores
        .assignments
        .assign(identity, contract, auditor)
        .await;

    let (status, pair) = send(
        &app,
        Method::POST,
        "/incompatible-roles",
        caller,
        Some(json!({
            "superior_id": payroll.into_inner(),
            "sub_id": auditor.into_inner()
        })),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
    assert!(pair["id"].is_string());

    let (_, created) = send(
        &app,
        Method::POST,
        "/role-requests",
        caller,
        Some(json!({ "applicant_id": identity.into_inner() })),
    )
    .await;
    let request_id = created["id"].as_str().unwrap().to_string();
    send(
        &app,
        Method::POST,
        "/concept-role-requests",
        caller,
        Some(json!({
            "role_request_id": request_id,
            "operation": "add",
            "role_id": payroll.into_inner(),
            "contract_id": contract.into_inner()
        })),
    )
    .await;

    let (status, violations) = send(
        &app,
        Method::GET,
        &format!("/role-requests/{request_id}/incompatible-roles"),
        caller,
        None,
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(violations["total"], 1);
}

#[tokio::test]
async fn test_list_endpoints() {
    let app = test_app();
    let (identity, _, auditor) = seed_applicant(&app, "alice").await;
    let caller = Some((identity.into_inner(), true));
    let read_hr = app.stores.roles.add_named("read-hr").await;
    let payroll = app.stores.roles.add_named("payroll").await;

    for _ in 0..2 {
        send(
            &app,
            Method::POST,
            "/role-requests",
            caller,
            Some(json!({ "applicant_id": identity.into_inner() })),
        )
        .await;
    }
    let (status, listed) = send(
        &app,
        Method::GET,
        &format!("/role-requests?applicant_id={}", identity.into_inner()),
        caller,
        None,
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(listed["total"], 2);

    send(
        &app,
        Method::POST,
        "/role-compositions",
        caller,
        Some(json!({
            "superior_id": auditor.into_inner(),
            "sub_id": read_hr.into_inner()
        })),
    )
    .await;
    let (status, edges) = send(
        &app,
        Method::GET,
        &format!("/roles/{}/sub-roles", auditor.into_inner()),
        caller,
        None,
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(edges["total"], 1);
    assert_eq!(
        edges["items"][0]["sub_id"],
        read_hr.into_inner().to_string()
    );

    send(
        &app,
        Method::POST,
        "/incompatible-roles",
        caller,
        Some(json!({
            "superior_id": payroll.into_inner(),
            "sub_id": auditor.into_inner()
        })),
    )
    .await;
    let (status, pairs) = send(&app, Method::GET, "/incompatible-roles", caller, None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(pairs["total"], 1);
}

#[tokio::test]
async fn test_long_poll_disabled_resolves_blocked() {
    let app = test_app();
    let (identity, _, _) = seed_applicant(&app, "alice").await;
    app.state.long_polling.set_enabled(false);

    let (status, body) = send(
        &app,
        Method::GET,
        &format!(
            "/identities/{}/check-unresolved-request",
            identity.into_inner()
        ),
        Some((identity.into_inner(), false)),
        None,
    )
    .await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["state"], "blocked");
}

#[tokio::test]
async fn test_concept_delete_outcome_for_draft() {
    let app = test_app();
    let (identity, contract, role) = seed_applicant(&app, "alice").await;
    let caller = Some((identity.into_inner(), false));

    let (_, created) = send(
        &app,
        Method::POST,
        "/role-requests",
        caller,
        Some(json!({ "applicant_id": identity.into_inner() })),
    )
    .await;
    let request_id = created["id"].as_str().unwrap().to_string();
    let (_, concept) = send(
        &app,
        Method::POST,
        "/concept-role-requests",
        caller,
        Some(json!({
            "role_request_id": request_id,
            "operation": "add",
            "role_id": role.into_inner(),
            "contract_id": contract.into_inner()
        })),
    )
    .await;
    let concept_id = concept["id"].as_str().unwrap().to_string();

    let (status, outcome) = send(
        &app,
        Method::DELETE,
        &format!("/concept-role-requests/{concept_id}"),
        caller,
        None,
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(outcome["outcome"], "hard_delete");

    let (status, _) = send(
        &app,
        Method::GET,
        &format!("/concept-role-requests/{concept_id}"),
        caller,
        None,
    )
    .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}
