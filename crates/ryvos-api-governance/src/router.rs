//! Router configuration for the role-request API.

use std::sync::Arc;

use axum::{
    extract::Request,
    middleware::{self, Next},
    response::{IntoResponse, Response},
    routing::{delete, get, post, put},
    Router,
};
use uuid::Uuid;

use ryvos_governance::audit::InMemoryAuditStore;
use ryvos_governance::services::{
    ApplicantAccessChecker, ConceptService, IncompatibleRoleService, InMemoryAssignedRoleStore,
    InMemoryConceptStore, InMemoryContractStore, InMemoryIdentityStore,
    InMemoryIncompatibleRoleStore, InMemoryRoleCompositionStore, InMemoryRoleRequestStore,
    InMemoryRoleStore, LongPollingManager, RequestLockRegistry, RoleCompositionService,
    RoleRequestService, Subject,
};
use ryvos_governance::types::IdentityId;
use ryvos_governance::ApprovalEngine;

use crate::error::ApiGovernanceError;
use crate::handlers::{concepts, identities, role_requests, roles};

/// Authenticated caller attached to every request by the identity
/// middleware.
#[derive(Debug, Clone, Copy)]
pub struct CallerIdentity(pub Subject);

/// Shared state for governance handlers.
#[derive(Clone)]
pub struct GovernanceState {
    pub request_service: Arc<RoleRequestService>,
    pub concept_service: Arc<ConceptService>,
    pub composition_service: Arc<RoleCompositionService>,
    pub incompatible_service: Arc<IncompatibleRoleService>,
    pub long_polling: Arc<LongPollingManager>,
}

/// Handles to the in-memory stores backing a [`GovernanceState`], used by
/// embedders and tests to seed data.
#[derive(Clone)]
pub struct InMemoryStores {
    pub requests: Arc<InMemoryRoleRequestStore>,
    pub concepts: Arc<InMemoryConceptStore>,
    pub roles: Arc<InMemoryRoleStore>,
    pub identities: Arc<InMemoryIdentityStore>,
    pub contracts: Arc<InMemoryContractStore>,
    pub assignments: Arc<InMemoryAssignedRoleStore>,
    pub audit: Arc<InMemoryAuditStore>,
}

impl GovernanceState {
    /// Build a state wired entirely against in-memory stores.
    pub fn new_in_memory(engine: Arc<dyn ApprovalEngine>) -> (Self, InMemoryStores) {
        let stores = InMemoryStores {
            requests: Arc::new(InMemoryRoleRequestStore::new()),
            concepts: Arc::new(InMemoryConceptStore::new()),
            roles: Arc::new(InMemoryRoleStore::new()),
            identities: Arc::new(InMemoryIdentityStore::new()),
            contracts: Arc::new(InMemoryContractStore::new()),
            assignments: Arc::new(InMemoryAssignedRoleStore::new()),
            audit: Arc::new(InMemoryAuditStore::new()),
        };

        let composition_service = Arc::new(RoleCompositionService::new(
            Arc::new(InMemoryRoleCompositionStore::new()),
            stores.roles.clone(),
            stores.audit.clone(),
        ));
        let incompatible_service = Arc::new(IncompatibleRoleService::new(
            Arc::new(InMemoryIncompatibleRoleStore::new()),
            stores.roles.clone(),
            stores.identities.clone(),
            stores.assignments.clone(),
            stores.concepts.clone(),
            composition_service.clone(),
            stores.audit.clone(),
        ));
        let access_checker = Arc::new(ApplicantAccessChecker::new());
        let concept_locks = Arc::new(RequestLockRegistry::new());
        let request_service = Arc::new(RoleRequestService::new(
            stores.requests.clone(),
            stores.concepts.clone(),
            stores.identities.clone(),
            stores.contracts.clone(),
            stores.assignments.clone(),
            engine,
            stores.audit.clone(),
            access_checker.clone(),
            concept_locks.clone(),
        ));
        let concept_service = Arc::new(ConceptService::new(
            stores.concepts.clone(),
            stores.requests.clone(),
            access_checker,
            stores.audit.clone(),
            concept_locks,
        ));
        let long_polling = Arc::new(LongPollingManager::new(stores.requests.clone()));

        let state = Self {
            request_service,
            concept_service,
            composition_service,
            incompatible_service,
            long_polling,
        };
        (state, stores)
    }
}

/// Resolve the caller from the `x-identity-id` and `x-identity-admin`
/// headers.
///
/// Stands in for the platform authentication layer; requests without a
/// parseable identity are rejected outright.
pub async fn caller_identity_middleware(mut request: Request, next: Next) -> Response {
    let identity_id = request
        .headers()
        .get("x-identity-id")
        .and_then(|v| v.to_str().ok())
        .and_then(|v| Uuid::parse_str(v).ok());
    let Some(identity_id) = identity_id else {
        return ApiGovernanceError::Unauthorized.into_response();
    };

    let admin = request
        .headers()
        .get("x-identity-admin")
        .and_then(|v| v.to_str().ok())
        .is_some_and(|v| v.eq_ignore_ascii_case("true"));

    let subject = if admin {
        Subject::admin(IdentityId::from(identity_id))
    } else {
        Subject::user(IdentityId::from(identity_id))
    };
    request.extensions_mut().insert(CallerIdentity(subject));
    next.run(request).await
}

/// Build the governance API router.
pub fn governance_router(state: GovernanceState) -> Router {
    Router::new()
        // Role requests
        .route(
            "/role-requests",
            post(role_requests::create_role_request).get(role_requests::list_role_requests),
        )
        .route(
            "/role-requests/:id",
            get(role_requests::get_role_request).delete(role_requests::delete_role_request),
        )
        .route(
            "/role-requests/:id/start",
            put(role_requests::start_role_request),
        )
        .route(
            "/role-requests/:id/concepts",
            get(role_requests::list_request_concepts),
        )
        .route(
            "/role-requests/:id/incompatible-roles",
            get(role_requests::get_request_incompatible_roles),
        )
        .route(
            "/role-requests/:id/copy-roles",
            post(role_requests::copy_roles),
        )
        // Concepts
        .route("/concept-role-requests", post(concepts::upsert_concept))
        .route(
            "/concept-role-requests/:id",
            get(concepts::get_concept).delete(concepts::delete_concept),
        )
        // Role compositions
        .route("/role-compositions", post(roles::create_composition))
        .route("/role-compositions/:id", delete(roles::delete_composition))
        .route("/roles/:id/sub-roles", get(roles::list_sub_roles))
        // Incompatible roles
        .route(
            "/incompatible-roles",
            post(roles::create_incompatible_role).get(roles::list_incompatible_roles),
        )
        .route(
            "/incompatible-roles/:id",
            delete(roles::delete_incompatible_role),
        )
        // Identities
        .route(
            "/identities/:id/incompatible-roles",
            get(identities::get_identity_incompatible_roles),
        )
        .route(
            "/identities/:id/check-unresolved-request",
            get(identities::check_unresolved_request),
        )
        .layer(middleware::from_fn(caller_identity_middleware))
        .with_state(state)
}
