//! Shared test harness wiring every service against in-memory stores.

pub mod fixtures;

use std::sync::Arc;

use ryvos_governance::audit::InMemoryAuditStore;
use ryvos_governance::services::{
    AllowAllAccessChecker, ConceptService, IncompatibleRoleService, InMemoryAssignedRoleStore,
    InMemoryConceptStore, InMemoryContractStore, InMemoryIdentityStore,
    InMemoryIncompatibleRoleStore, InMemoryRoleCompositionStore, InMemoryRoleRequestStore,
    InMemoryRoleStore, LongPollingManager, RequestLockRegistry, RoleCompositionService,
    RoleRequestService,
};
use ryvos_governance::{ApprovalEngine, SynchronousApprovalEngine};

/// Full in-memory service stack used by the integration tests.
pub struct TestContext {
    pub requests: Arc<InMemoryRoleRequestStore>,
    pub concepts: Arc<InMemoryConceptStore>,
    pub roles: Arc<InMemoryRoleStore>,
    pub identities: Arc<InMemoryIdentityStore>,
    pub contracts: Arc<InMemoryContractStore>,
    pub assignments: Arc<InMemoryAssignedRoleStore>,
    pub audit: Arc<InMemoryAuditStore>,
    pub request_service: RoleRequestService,
    pub concept_service: ConceptService,
    pub composition_service: Arc<RoleCompositionService>,
    pub incompatible_service: IncompatibleRoleService,
    pub long_polling: Arc<LongPollingManager>,
}

impl TestContext {
    /// Stack with the synchronous approval engine (requests execute
    /// immediately on start).
    pub fn new() -> Self {
        Self::with_engine(Arc::new(SynchronousApprovalEngine::new()))
    }

    /// Stack with an explicit approval engine.
    pub fn with_engine(engine: Arc<dyn ApprovalEngine>) -> Self {
        let requests = Arc::new(InMemoryRoleRequestStore::new());
        let concepts = Arc::new(InMemoryConceptStore::new());
        let roles = Arc::new(InMemoryRoleStore::new());
        let identities = Arc::new(InMemoryIdentityStore::new());
        let contracts = Arc::new(InMemoryContractStore::new());
        let assignments = Arc::new(InMemoryAssignedRoleStore::new());
        let audit = Arc::new(InMemoryAuditStore::new());

        let composition_service = Arc::new(RoleCompositionService::new(
            Arc::new(InMemoryRoleCompositionStore::new()),
            roles.clone(),
            audit.clone(),
        ));
        let incompatible_service = IncompatibleRoleService::new(
            Arc::new(InMemoryIncompatibleRoleStore::new()),
            roles.clone(),
            identities.clone(),
            assignments.clone(),
            concepts.clone(),
            composition_service.clone(),
            audit.clone(),
        );
        let access_checker = Arc::new(AllowAllAccessChecker::new());
        let concept_locks = Arc::new(RequestLockRegistry::new());
        let request_service = RoleRequestService::new(
            requests.clone(),
            concepts.clone(),
            identities.clone(),
            contracts.clone(),
            assignments.clone(),
            engine,
            audit.clone(),
            access_checker.clone(),
            concept_locks.clone(),
        );
        let concept_service = ConceptService::new(
            concepts.clone(),
            requests.clone(),
            access_checker,
            audit.clone(),
            concept_locks,
        );
        let long_polling = Arc::new(LongPollingManager::new(requests.clone()));

        Self {
            requests,
            concepts,
            roles,
            identities,
            contracts,
            assignments,
            audit,
            request_service,
            concept_service,
            composition_service,
            incompatible_service,
            long_polling,
        }
    }
}
