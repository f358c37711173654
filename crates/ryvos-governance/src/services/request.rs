//! Role request state machine.
//!
//! Owns the lifecycle of a request from draft through execution or
//! cancellation. Validation re-runs before every start attempt; the start
//! itself is a compare-and-set so two concurrent callers can never
//! double-dispatch the same request to the approval engine.

use std::collections::HashMap;
use std::sync::Arc;

use chrono::Utc;
use serde::{Deserialize, Serialize};
use tokio::sync::RwLock;
use tracing::{info, warn};
use uuid::Uuid;

use crate::audit::{AuditStore, RoleRequestAuditAction, RoleRequestAuditEventInput};
use crate::error::{GovernanceError, Result};
use crate::events::{ApprovalEngine, RoleRequestEvent};
use crate::services::access::{AccessChecker, RoleRequestPermission, Subject};
use crate::services::concept::{
    deletion_policy, ConceptStore, DeletionPolicy, RequestLockRegistry,
};
use crate::services::identity::{AssignedRoleStore, ContractStore, IdentityStore};
use crate::types::{
    ApplicantType, ConceptId, ConceptOperation, ConceptRoleRequest, ConceptState, ContractId,
    IdentityId, OperationResult, OperationState, RequestPriority, RequestedByType, RoleRequest,
    RoleRequestId, RoleRequestState,
};

// ============================================================================
// Store Trait
// ============================================================================

/// Trait for role-request storage backends.
#[async_trait::async_trait]
pub trait RoleRequestStore: Send + Sync {
    /// Get a request by ID.
    async fn get(&self, id: RoleRequestId) -> Result<Option<RoleRequest>>;

    /// Insert a request.
    async fn insert(&self, request: RoleRequest) -> Result<()>;

    /// Update a request.
    async fn update(&self, request: RoleRequest) -> Result<()>;

    /// Physically delete a request.
    async fn delete(&self, id: RoleRequestId) -> Result<bool>;

    /// List all requests of an applicant.
    async fn list_by_applicant(&self, applicant_id: IdentityId) -> Result<Vec<RoleRequest>>;

    /// List the applicant's requests that are not yet terminal.
    async fn list_unresolved_by_applicant(
        &self,
        applicant_id: IdentityId,
    ) -> Result<Vec<RoleRequest>>;

    /// Atomically move a request from `from` to `to`.
    ///
    /// Fails with [`GovernanceError::InvalidRequestState`] when the current
    /// state differs, so the second of two racing callers loses.
    async fn transition(
        &self,
        id: RoleRequestId,
        from: RoleRequestState,
        to: RoleRequestState,
    ) -> Result<RoleRequest>;
}

// ============================================================================
// In-Memory Store
// ============================================================================

/// In-memory role-request store for testing and embedded use.
#[derive(Debug, Default)]
pub struct InMemoryRoleRequestStore {
    requests: Arc<RwLock<HashMap<RoleRequestId, RoleRequest>>>,
}

impl InMemoryRoleRequestStore {
    /// Create a new in-memory store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of stored requests.
    pub async fn count(&self) -> usize {
        self.requests.read().await.len()
    }
}

#[async_trait::async_trait]
impl RoleRequestStore for InMemoryRoleRequestStore {
    async fn get(&self, id: RoleRequestId) -> Result<Option<RoleRequest>> {
        Ok(self.requests.read().await.get(&id).cloned())
    }

    async fn insert(&self, request: RoleRequest) -> Result<()> {
        self.requests.write().await.insert(request.id, request);
        Ok(())
    }

    async fn update(&self, request: RoleRequest) -> Result<()> {
        self.requests.write().await.insert(request.id, request);
        Ok(())
    }

    async fn delete(&self, id: RoleRequestId) -> Result<bool> {
        Ok(self.requests.write().await.remove(&id).is_some())
    }

    async fn list_by_applicant(&self, applicant_id: IdentityId) -> Result<Vec<RoleRequest>> {
        let mut requests: Vec<RoleRequest> = self
            .requests
            .read()
            .await
            .values()
            .filter(|r| r.applicant_id == applicant_id)
            .cloned()
            .collect();
        requests.sort_by_key(|r| r.created_at);
        Ok(requests)
    }

    async fn list_unresolved_by_applicant(
        &self,
        applicant_id: IdentityId,
    ) -> Result<Vec<RoleRequest>> {
        let mut requests: Vec<RoleRequest> = self
            .requests
            .read()
            .await
            .values()
            .filter(|r| r.applicant_id == applicant_id && r.state.is_unresolved())
            .cloned()
            .collect();
        requests.sort_by_key(|r| r.id);
        Ok(requests)
    }

    async fn transition(
        &self,
        id: RoleRequestId,
        from: RoleRequestState,
        to: RoleRequestState,
    ) -> Result<RoleRequest> {
        let mut requests = self.requests.write().await;
        let request = requests
            .get_mut(&id)
            .ok_or(GovernanceError::RoleRequestNotFound(id.into_inner()))?;

        if request.state != from {
            return Err(GovernanceError::InvalidRequestState {
                request_id: id.into_inner(),
                expected: from,
                actual: request.state,
            });
        }

        request.state = to;
        request.updated_at = Utc::now();
        Ok(request.clone())
    }
}

// ============================================================================
// Service
// ============================================================================

/// Input for creating a request draft.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateRoleRequestInput {
    /// Applicant the request is for.
    pub applicant_id: IdentityId,
    /// Kind of applicant.
    pub applicant_type: ApplicantType,
    /// Origin of the request.
    pub requested_by_type: RequestedByType,
    /// Optional free-text description.
    pub description: Option<String>,
    /// Who is creating the draft.
    pub actor_id: Option<Uuid>,
}

/// Input for replicating an identity's roles into a request.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CopyRolesInput {
    /// Identity whose current roles are copied.
    pub source_identity_id: IdentityId,
    /// Contract the copies are assigned to.
    pub target_contract_id: ContractId,
    /// Validity start for the copies.
    pub valid_from: Option<chrono::DateTime<Utc>>,
    /// Validity end for the copies.
    pub valid_till: Option<chrono::DateTime<Utc>>,
    /// Who is copying.
    pub actor_id: Option<Uuid>,
}

/// Outcome of the cascading request delete.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RequestDeleteStats {
    /// Concepts physically removed.
    pub concepts_removed: usize,
    /// Concepts soft-canceled.
    pub concepts_canceled: usize,
    /// Whether the request row itself was removed (drafts) rather than
    /// marked canceled (mid-flight).
    pub request_removed: bool,
}

/// Service owning the role-request lifecycle.
pub struct RoleRequestService {
    store: Arc<dyn RoleRequestStore>,
    concept_store: Arc<dyn ConceptStore>,
    identity_store: Arc<dyn IdentityStore>,
    contract_store: Arc<dyn ContractStore>,
    assigned_role_store: Arc<dyn AssignedRoleStore>,
    engine: Arc<dyn ApprovalEngine>,
    audit_store: Arc<dyn AuditStore>,
    access_checker: Arc<dyn AccessChecker>,
    concept_locks: Arc<RequestLockRegistry>,
}

impl RoleRequestService {
    /// Create a new role-request service.
    ///
    /// The lock registry must be the same instance the [`ConceptService`]
    /// of this request store uses, so the per-request lock entry can be
    /// dropped when the request goes away.
    ///
    /// [`ConceptService`]: crate::services::concept::ConceptService
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        store: Arc<dyn RoleRequestStore>,
        concept_store: Arc<dyn ConceptStore>,
        identity_store: Arc<dyn IdentityStore>,
        contract_store: Arc<dyn ContractStore>,
        assigned_role_store: Arc<dyn AssignedRoleStore>,
        engine: Arc<dyn ApprovalEngine>,
        audit_store: Arc<dyn AuditStore>,
        access_checker: Arc<dyn AccessChecker>,
        concept_locks: Arc<RequestLockRegistry>,
    ) -> Self {
        Self {
            store,
            concept_store,
            identity_store,
            contract_store,
            assigned_role_store,
            engine,
            audit_store,
            access_checker,
            concept_locks,
        }
    }

    /// Create a request draft.
    ///
    /// Automatic processes must reuse an existing request; creating a fresh
    /// one automatically is rejected outright.
    pub async fn create_request(&self, input: CreateRoleRequestInput) -> Result<RoleRequest> {
        if input.requested_by_type == RequestedByType::Automatically {
            return Err(GovernanceError::AutomaticRequestNotAllowed);
        }

        if input.applicant_type == ApplicantType::Identity {
            self.identity_store
                .get(input.applicant_id)
                .await?
                .ok_or(GovernanceError::IdentityNotFound(
                    input.applicant_id.into_inner(),
                ))?;
        }

        let now = Utc::now();
        let request = RoleRequest {
            id: RoleRequestId::new(),
            applicant_id: input.applicant_id,
            applicant_type: input.applicant_type,
            state: RoleRequestState::Concept,
            executed: false,
            priority: RequestPriority::Normal,
            requested_by_type: input.requested_by_type,
            description: input.description,
            result: None,
            created_at: now,
            updated_at: now,
        };
        self.store.insert(request.clone()).await?;

        self.audit_store
            .log_event(RoleRequestAuditEventInput {
                action: RoleRequestAuditAction::RequestCreated,
                actor_id: input.actor_id,
                request_id: Some(request.id),
                after_state: Some(serde_json::to_value(&request)?),
                ..Default::default()
            })
            .await?;

        Ok(request)
    }

    /// Get a request by ID.
    pub async fn get_request(&self, id: RoleRequestId) -> Result<RoleRequest> {
        self.store
            .get(id)
            .await?
            .ok_or(GovernanceError::RoleRequestNotFound(id.into_inner()))
    }

    /// Get a request on behalf of a caller, checking read access.
    pub async fn get_request_for(
        &self,
        id: RoleRequestId,
        subject: &Subject,
    ) -> Result<RoleRequest> {
        let request = self.get_request(id).await?;
        if !subject.admin {
            self.access_checker
                .check(subject, &request, RoleRequestPermission::Read)?;
        }
        Ok(request)
    }

    /// List all requests of an applicant.
    pub async fn list_by_applicant(&self, applicant_id: IdentityId) -> Result<Vec<RoleRequest>> {
        self.store.list_by_applicant(applicant_id).await
    }

    /// List an applicant's requests on behalf of a caller.
    ///
    /// Non-admin callers may only list their own requests.
    pub async fn list_by_applicant_for(
        &self,
        applicant_id: IdentityId,
        subject: &Subject,
    ) -> Result<Vec<RoleRequest>> {
        if !subject.admin && subject.identity_id != applicant_id {
            return Err(GovernanceError::Forbidden(format!(
                "subject {} may not list requests of applicant {applicant_id}",
                subject.identity_id
            )));
        }
        self.list_by_applicant(applicant_id).await
    }

    /// Structural validation; re-run before every start attempt.
    ///
    /// Checks that the request is still a draft, that the applicant exists
    /// and is active, and that no other unresolved request exists for the
    /// same applicant.
    pub async fn validate(&self, request: &RoleRequest) -> Result<()> {
        if !request.state.is_editable() {
            return Err(GovernanceError::RequestNotEditable {
                request_id: request.id.into_inner(),
                state: request.state,
            });
        }

        if request.applicant_type == ApplicantType::Identity {
            let identity = self
                .identity_store
                .get(request.applicant_id)
                .await?
                .ok_or(GovernanceError::IdentityNotFound(
                    request.applicant_id.into_inner(),
                ))?;
            if identity.disabled {
                return Err(GovernanceError::ApplicantDisabled(
                    request.applicant_id.into_inner(),
                ));
            }
        }

        let unresolved = self
            .store
            .list_unresolved_by_applicant(request.applicant_id)
            .await?;
        if let Some(conflicting) = unresolved
            .iter()
            .find(|r| r.id != request.id && !r.state.is_editable())
        {
            return Err(GovernanceError::ConcurrentRequestInProgress {
                applicant_id: request.applicant_id.into_inner(),
                existing_request_id: conflicting.id.into_inner(),
            });
        }

        Ok(())
    }

    /// Validate and dispatch a request to the approval engine.
    ///
    /// The transition Concept -> InProgress is a compare-and-set; the second
    /// of two racing starts fails instead of double-dispatching. Interactive
    /// callers pass high priority so they jump batch-started work; batch
    /// callers keep normal priority. The returned request may be
    /// non-terminal; callers treat that as "accepted, pending" rather than
    /// failure.
    pub async fn start_request(
        &self,
        id: RoleRequestId,
        check_right: bool,
        priority: RequestPriority,
    ) -> Result<RoleRequest> {
        let request = self.get_request(id).await?;

        if let Err(err) = self.validate(&request).await {
            // A failed validation of a draft parks the request in
            // Exception without ever reaching the engine.
            if request.state == RoleRequestState::Concept {
                let mut failed = request.clone();
                failed.state = RoleRequestState::Exception;
                failed.result = Some(OperationResult::exception(
                    "request_validation_failed",
                    err.to_string(),
                ));
                failed.updated_at = Utc::now();
                self.store.update(failed.clone()).await?;
                self.audit_store
                    .log_event(RoleRequestAuditEventInput {
                        action: RoleRequestAuditAction::RequestUpdated,
                        request_id: Some(id),
                        before_state: Some(serde_json::to_value(&request)?),
                        after_state: Some(serde_json::to_value(&failed)?),
                        metadata: Some(serde_json::json!({
                            "validation_error": err.to_string(),
                        })),
                        ..Default::default()
                    })
                    .await?;
            }
            return Err(err);
        }

        let mut started = self
            .store
            .transition(id, RoleRequestState::Concept, RoleRequestState::InProgress)
            .await?;
        started.priority = priority;
        self.store.update(started.clone()).await?;

        self.audit_store
            .log_event(RoleRequestAuditEventInput {
                action: RoleRequestAuditAction::RequestStarted,
                request_id: Some(id),
                after_state: Some(serde_json::to_value(&started)?),
                ..Default::default()
            })
            .await?;

        info!(request_id = %id, check_right, "Dispatching role request to approval engine");
        let event = RoleRequestEvent::execute(started.clone(), priority, check_right);

        let resolved = match self.engine.dispatch(event).await {
            Ok(resolved) => resolved,
            Err(err) => {
                // Engine failures surface as request state Exception with
                // the error payload attached, never silently swallowed.
                warn!(request_id = %id, error = %err, "Approval engine failed");
                let result =
                    OperationResult::exception("approval_engine_failed", err.to_string());
                let mut failed = started;
                failed.state = RoleRequestState::Exception;
                failed.result = Some(result.clone());
                failed.updated_at = Utc::now();
                self.store.update(failed.clone()).await?;
                self.mark_live_concepts(id, &result).await?;
                return Ok(failed);
            }
        };

        let mut updated = resolved;
        updated.updated_at = Utc::now();
        self.store.update(updated.clone()).await?;

        if updated.state == RoleRequestState::Executed {
            self.mark_concepts_executed(id).await?;
            self.audit_store
                .log_event(RoleRequestAuditEventInput {
                    action: RoleRequestAuditAction::RequestExecuted,
                    request_id: Some(id),
                    after_state: Some(serde_json::to_value(&updated)?),
                    ..Default::default()
                })
                .await?;
        }

        Ok(updated)
    }

    /// Replicate a source identity's current roles onto a target contract as
    /// ADD concepts in the request.
    ///
    /// Roles already assigned to the target contract, or already present in
    /// the request as a live non-REMOVE concept, are skipped.
    pub async fn copy_roles_by_identity(
        &self,
        request_id: RoleRequestId,
        input: CopyRolesInput,
    ) -> Result<Vec<ConceptRoleRequest>> {
        let request = self.get_request(request_id).await?;
        if !request.state.is_editable() {
            return Err(GovernanceError::RequestNotEditable {
                request_id: request.id.into_inner(),
                state: request.state,
            });
        }

        self.identity_store
            .get(input.source_identity_id)
            .await?
            .ok_or(GovernanceError::IdentityNotFound(
                input.source_identity_id.into_inner(),
            ))?;
        self.contract_store
            .get(input.target_contract_id)
            .await?
            .ok_or(GovernanceError::ContractNotFound(
                input.target_contract_id.into_inner(),
            ))?;

        let mut skip_roles: std::collections::HashSet<crate::types::RoleId> = self
            .assigned_role_store
            .list_by_contract(input.target_contract_id)
            .await?
            .into_iter()
            .map(|a| a.role_id)
            .collect();
        for concept in self.concept_store.list_by_request(request_id).await? {
            if concept.state.is_live() && concept.operation != ConceptOperation::Remove {
                skip_roles.insert(concept.role_id);
            }
        }

        let mut created = Vec::new();
        let now = Utc::now();
        for assignment in self
            .assigned_role_store
            .list_by_identity(input.source_identity_id)
            .await?
        {
            if !skip_roles.insert(assignment.role_id) {
                continue;
            }

            let concept = ConceptRoleRequest {
                id: ConceptId::new(),
                role_request_id: request_id,
                operation: ConceptOperation::Add,
                role_id: assignment.role_id,
                contract_id: Some(input.target_contract_id),
                assigned_role_id: None,
                valid_from: input.valid_from,
                valid_till: input.valid_till,
                attributes: serde_json::Value::Null,
                state: ConceptState::Concept,
                result: OperationResult::from_state(OperationState::Created),
                created_at: now,
                updated_at: now,
            };
            self.concept_store.insert(concept.clone()).await?;

            self.audit_store
                .log_event(RoleRequestAuditEventInput {
                    action: RoleRequestAuditAction::ConceptCreated,
                    actor_id: input.actor_id,
                    request_id: Some(request_id),
                    after_state: Some(serde_json::to_value(&concept)?),
                    metadata: Some(serde_json::json!({
                        "copied_from": input.source_identity_id.to_string(),
                    })),
                    ..Default::default()
                })
                .await?;
            created.push(concept);
        }

        Ok(created)
    }

    /// Cascading delete action.
    ///
    /// Concepts are resolved first (hard-delete for drafts, soft-cancel
    /// mid-flight), only then is the request removed or marked canceled.
    /// The ordering guarantees a request is never terminal while concepts
    /// remain in the Concept state. Executed requests cannot be deleted.
    pub async fn delete_request(
        &self,
        id: RoleRequestId,
        actor_id: Option<Uuid>,
    ) -> Result<RequestDeleteStats> {
        let request = self.get_request(id).await?;

        let policy = deletion_policy(request.state);
        if policy == DeletionPolicy::Reject {
            return Err(GovernanceError::RequestExecutedCannotDelete(
                id.into_inner(),
            ));
        }

        let mut stats = RequestDeleteStats::default();
        for concept in self.concept_store.list_by_request(id).await? {
            match policy {
                DeletionPolicy::HardDelete => {
                    self.concept_store.delete(concept.id).await?;
                    stats.concepts_removed += 1;
                }
                DeletionPolicy::SoftCancel => {
                    if concept.state.is_live() {
                        let mut canceled = concept;
                        canceled.state = ConceptState::Canceled;
                        canceled.result =
                            OperationResult::from_state(OperationState::Canceled);
                        canceled.updated_at = Utc::now();
                        self.concept_store.update(canceled).await?;
                        stats.concepts_canceled += 1;
                    }
                }
                DeletionPolicy::Reject => {}
            }
        }

        if request.state == RoleRequestState::Concept {
            self.store.delete(id).await?;
            stats.request_removed = true;
            self.audit_store
                .log_event(RoleRequestAuditEventInput {
                    action: RoleRequestAuditAction::RequestDeleted,
                    actor_id,
                    request_id: Some(id),
                    before_state: Some(serde_json::to_value(&request)?),
                    ..Default::default()
                })
                .await?;
        } else {
            let mut canceled = request.clone();
            canceled.state = RoleRequestState::Canceled;
            canceled.result = Some(OperationResult::from_state(OperationState::Canceled));
            canceled.updated_at = Utc::now();
            self.store.update(canceled.clone()).await?;
            self.audit_store
                .log_event(RoleRequestAuditEventInput {
                    action: RoleRequestAuditAction::RequestCanceled,
                    actor_id,
                    request_id: Some(id),
                    before_state: Some(serde_json::to_value(&request)?),
                    after_state: Some(serde_json::to_value(&canceled)?),
                    ..Default::default()
                })
                .await?;
        }

        // Concept mutations are over either way, so the per-request lock
        // entry must not outlive the request.
        self.concept_locks.release(id).await;

        Ok(stats)
    }

    async fn mark_concepts_executed(&self, request_id: RoleRequestId) -> Result<()> {
        for concept in self.concept_store.list_by_request(request_id).await? {
            if concept.state == ConceptState::Concept {
                let mut executed = concept;
                executed.state = ConceptState::Executed;
                executed.result = OperationResult::from_state(OperationState::Executed);
                executed.updated_at = Utc::now();
                self.concept_store.update(executed).await?;
            }
        }
        Ok(())
    }

    /// Attach an operation result to every live concept of a request,
    /// leaving the concept state untouched.
    async fn mark_live_concepts(
        &self,
        request_id: RoleRequestId,
        result: &OperationResult,
    ) -> Result<()> {
        for concept in self.concept_store.list_by_request(request_id).await? {
            if concept.state == ConceptState::Concept {
                let mut updated = concept;
                updated.result = result.clone();
                updated.updated_at = Utc::now();
                self.concept_store.update(updated).await?;
            }
        }
        Ok(())
    }
}
