//! Concept store and deduplicator.
//!
//! Concepts are the individual change-operations attached to a role request.
//! The service enforces the at-most-one-live-non-ADD-concept-per-target
//! invariant (delete-before-insert) and the tri-state delete behavior
//! derived from the owning request's state.

use std::collections::HashMap;
use std::sync::Arc;

use chrono::Utc;
use serde::{Deserialize, Serialize};
use tokio::sync::{Mutex, RwLock};
use uuid::Uuid;

use crate::audit::{AuditStore, RoleRequestAuditAction, RoleRequestAuditEventInput};
use crate::error::{GovernanceError, Result};
use crate::services::access::{AccessChecker, RoleRequestPermission, Subject};
use crate::services::request::RoleRequestStore;
use crate::types::{
    AssignedRoleId, ConceptId, ConceptOperation, ConceptRoleRequest, ConceptState, ContractId,
    OperationResult, OperationState, RoleId, RoleRequestId, RoleRequestState,
};

// ============================================================================
// Store Trait
// ============================================================================

/// Trait for concept storage backends.
#[async_trait::async_trait]
pub trait ConceptStore: Send + Sync {
    /// Get a concept by ID.
    async fn get(&self, id: ConceptId) -> Result<Option<ConceptRoleRequest>>;

    /// Insert a concept.
    async fn insert(&self, concept: ConceptRoleRequest) -> Result<()>;

    /// Update a concept.
    async fn update(&self, concept: ConceptRoleRequest) -> Result<()>;

    /// Physically delete a concept.
    async fn delete(&self, id: ConceptId) -> Result<bool>;

    /// List all concepts of a request.
    async fn list_by_request(&self, request_id: RoleRequestId) -> Result<Vec<ConceptRoleRequest>>;

    /// Find concepts in a request matching the dedup tuple
    /// (assigned role, operation, contract).
    async fn find_conflicting(
        &self,
        request_id: RoleRequestId,
        assigned_role_id: AssignedRoleId,
        operation: ConceptOperation,
        contract_id: ContractId,
    ) -> Result<Vec<ConceptRoleRequest>>;
}

// ============================================================================
// In-Memory Store
// ============================================================================

/// In-memory concept store for testing and embedded use.
#[derive(Debug, Default)]
pub struct InMemoryConceptStore {
    concepts: Arc<RwLock<HashMap<ConceptId, ConceptRoleRequest>>>,
}

impl InMemoryConceptStore {
    /// Create a new in-memory store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of stored concepts.
    pub async fn count(&self) -> usize {
        self.concepts.read().await.len()
    }
}

#[async_trait::async_trait]
impl ConceptStore for InMemoryConceptStore {
    async fn get(&self, id: ConceptId) -> Result<Option<ConceptRoleRequest>> {
        Ok(self.concepts.read().await.get(&id).cloned())
    }

    async fn insert(&self, concept: ConceptRoleRequest) -> Result<()> {
        self.concepts.write().await.insert(concept.id, concept);
        Ok(())
    }

    async fn update(&self, concept: ConceptRoleRequest) -> Result<()> {
        self.concepts.write().await.insert(concept.id, concept);
        Ok(())
    }

    async fn delete(&self, id: ConceptId) -> Result<bool> {
        Ok(self.concepts.write().await.remove(&id).is_some())
    }

    async fn list_by_request(&self, request_id: RoleRequestId) -> Result<Vec<ConceptRoleRequest>> {
        let mut concepts: Vec<ConceptRoleRequest> = self
            .concepts
            .read()
            .await
            .values()
            .filter(|c| c.role_request_id == request_id)
            .cloned()
            .collect();
        concepts.sort_by_key(|c| c.created_at);
        Ok(concepts)
    }

    async fn find_conflicting(
        &self,
        request_id: RoleRequestId,
        assigned_role_id: AssignedRoleId,
        operation: ConceptOperation,
        contract_id: ContractId,
    ) -> Result<Vec<ConceptRoleRequest>> {
        Ok(self
            .concepts
            .read()
            .await
            .values()
            .filter(|c| {
                c.role_request_id == request_id
                    && c.operation == operation
                    && c.assigned_role_id == Some(assigned_role_id)
                    && c.contract_id == Some(contract_id)
            })
            .cloned()
            .collect())
    }
}

// ============================================================================
// Deletion Policy
// ============================================================================

/// What deleting a concept means, given the owning request's state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeletionPolicy {
    /// Remove the row.
    HardDelete,
    /// Set the concept to canceled, keep the row for audit.
    SoftCancel,
    /// Refuse: executed requests are immutable history.
    Reject,
}

/// Deletion policy as a pure function of the owning request's state.
pub fn deletion_policy(request_state: RoleRequestState) -> DeletionPolicy {
    match request_state {
        RoleRequestState::Executed => DeletionPolicy::Reject,
        RoleRequestState::Concept => DeletionPolicy::HardDelete,
        _ => DeletionPolicy::SoftCancel,
    }
}

// ============================================================================
// Per-request mutation locks
// ============================================================================

/// Registry of per-request async locks.
///
/// The dedup step reads the concept set before it writes, so concurrent
/// submissions for the same request must be serialized.
#[derive(Default)]
pub struct RequestLockRegistry {
    locks: Mutex<HashMap<RoleRequestId, Arc<Mutex<()>>>>,
}

impl RequestLockRegistry {
    /// Create a new registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Get (or create) the lock for a request.
    pub async fn lock_for(&self, request_id: RoleRequestId) -> Arc<Mutex<()>> {
        let mut locks = self.locks.lock().await;
        locks
            .entry(request_id)
            .or_insert_with(|| Arc::new(Mutex::new(())))
            .clone()
    }

    /// Drop the lock entry of a removed request.
    pub async fn release(&self, request_id: RoleRequestId) {
        self.locks.lock().await.remove(&request_id);
    }

    /// Number of registered lock entries.
    pub async fn count(&self) -> usize {
        self.locks.lock().await.len()
    }
}

// ============================================================================
// Service
// ============================================================================

/// Input for creating or updating a concept.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UpsertConceptInput {
    /// Existing concept to update; `None` creates a new one.
    pub id: Option<ConceptId>,
    /// Owning request.
    pub role_request_id: RoleRequestId,
    /// Kind of change.
    pub operation: ConceptOperation,
    /// Target role.
    pub role_id: RoleId,
    /// Target contract (required for add).
    pub contract_id: Option<ContractId>,
    /// Existing assignment (required for update/remove).
    pub assigned_role_id: Option<AssignedRoleId>,
    /// Validity start.
    pub valid_from: Option<chrono::DateTime<Utc>>,
    /// Validity end.
    pub valid_till: Option<chrono::DateTime<Utc>>,
    /// Extended-attribute values.
    pub attributes: Option<serde_json::Value>,
    /// Who is submitting the change.
    pub actor_id: Option<Uuid>,
}

/// Service managing the concepts of a role request.
pub struct ConceptService {
    store: Arc<dyn ConceptStore>,
    request_store: Arc<dyn RoleRequestStore>,
    access_checker: Arc<dyn AccessChecker>,
    audit_store: Arc<dyn AuditStore>,
    locks: Arc<RequestLockRegistry>,
}

impl ConceptService {
    /// Create a new concept service.
    pub fn new(
        store: Arc<dyn ConceptStore>,
        request_store: Arc<dyn RoleRequestStore>,
        access_checker: Arc<dyn AccessChecker>,
        audit_store: Arc<dyn AuditStore>,
        locks: Arc<RequestLockRegistry>,
    ) -> Self {
        Self {
            store,
            request_store,
            access_checker,
            audit_store,
            locks,
        }
    }

    /// Create or update a concept.
    ///
    /// For a new non-ADD concept with both targets set, every existing
    /// concept in the same request with the same
    /// (assigned role, operation, contract) tuple is deleted first, so at
    /// most one live concept per target assignment reaches the approval
    /// engine.
    pub async fn upsert_concept(&self, input: UpsertConceptInput) -> Result<ConceptRoleRequest> {
        let request = self
            .request_store
            .get(input.role_request_id)
            .await?
            .ok_or(GovernanceError::RoleRequestNotFound(
                input.role_request_id.into_inner(),
            ))?;

        if !request.state.is_editable() {
            return Err(GovernanceError::RequestNotEditable {
                request_id: request.id.into_inner(),
                state: request.state,
            });
        }

        Self::validate_targets(&input)?;

        let lock = self.locks.lock_for(request.id).await;
        let _guard = lock.lock().await;

        if input.id.is_none() && input.operation != ConceptOperation::Add {
            if let (Some(assigned_role_id), Some(contract_id)) =
                (input.assigned_role_id, input.contract_id)
            {
                let conflicting = self
                    .store
                    .find_conflicting(
                        request.id,
                        assigned_role_id,
                        input.operation,
                        contract_id,
                    )
                    .await?;
                for duplicate in conflicting {
                    self.store.delete(duplicate.id).await?;
                    self.audit_store
                        .log_event(RoleRequestAuditEventInput {
                            action: RoleRequestAuditAction::ConceptDeleted,
                            actor_id: input.actor_id,
                            request_id: Some(request.id),
                            before_state: Some(serde_json::to_value(&duplicate)?),
                            metadata: Some(serde_json::json!({"reason": "superseded"})),
                            ..Default::default()
                        })
                        .await?;
                }
            }
        }

        let now = Utc::now();
        let concept = match input.id {
            Some(id) => {
                let mut existing = self
                    .store
                    .get(id)
                    .await?
                    .ok_or(GovernanceError::ConceptNotFound(id.into_inner()))?;
                let before = serde_json::to_value(&existing)?;

                existing.operation = input.operation;
                existing.role_id = input.role_id;
                existing.contract_id = input.contract_id;
                existing.assigned_role_id = input.assigned_role_id;
                existing.valid_from = input.valid_from;
                existing.valid_till = input.valid_till;
                if let Some(attributes) = input.attributes {
                    existing.attributes = attributes;
                }
                existing.updated_at = now;
                self.store.update(existing.clone()).await?;

                self.audit_store
                    .log_event(RoleRequestAuditEventInput {
                        action: RoleRequestAuditAction::ConceptUpdated,
                        actor_id: input.actor_id,
                        request_id: Some(request.id),
                        before_state: Some(before),
                        after_state: Some(serde_json::to_value(&existing)?),
                        ..Default::default()
                    })
                    .await?;
                existing
            }
            None => {
                let concept = ConceptRoleRequest {
                    id: ConceptId::new(),
                    role_request_id: request.id,
                    operation: input.operation,
                    role_id: input.role_id,
                    contract_id: input.contract_id,
                    assigned_role_id: input.assigned_role_id,
                    valid_from: input.valid_from,
                    valid_till: input.valid_till,
                    attributes: input.attributes.unwrap_or(serde_json::Value::Null),
                    state: ConceptState::Concept,
                    result: OperationResult::from_state(OperationState::Created),
                    created_at: now,
                    updated_at: now,
                };
                self.store.insert(concept.clone()).await?;

                self.audit_store
                    .log_event(RoleRequestAuditEventInput {
                        action: RoleRequestAuditAction::ConceptCreated,
                        actor_id: input.actor_id,
                        request_id: Some(request.id),
                        after_state: Some(serde_json::to_value(&concept)?),
                        ..Default::default()
                    })
                    .await?;
                concept
            }
        };

        Ok(concept)
    }

    /// Get a concept by ID.
    pub async fn get_concept(&self, id: ConceptId) -> Result<ConceptRoleRequest> {
        self.store
            .get(id)
            .await?
            .ok_or(GovernanceError::ConceptNotFound(id.into_inner()))
    }

    /// Delete a concept, applying the tri-state policy of the owning
    /// request: reject for executed requests, hard-delete for drafts,
    /// soft-cancel mid-flight.
    pub async fn delete_concept(
        &self,
        id: ConceptId,
        actor_id: Option<Uuid>,
    ) -> Result<DeletionPolicy> {
        let concept = self.get_concept(id).await?;
        let request = self
            .request_store
            .get(concept.role_request_id)
            .await?
            .ok_or(GovernanceError::RoleRequestNotFound(
                concept.role_request_id.into_inner(),
            ))?;

        let policy = deletion_policy(request.state);
        match policy {
            DeletionPolicy::Reject => {
                return Err(GovernanceError::RequestExecutedCannotDelete(
                    request.id.into_inner(),
                ));
            }
            DeletionPolicy::HardDelete => {
                self.store.delete(id).await?;
                self.audit_store
                    .log_event(RoleRequestAuditEventInput {
                        action: RoleRequestAuditAction::ConceptDeleted,
                        actor_id,
                        request_id: Some(request.id),
                        before_state: Some(serde_json::to_value(&concept)?),
                        ..Default::default()
                    })
                    .await?;
            }
            DeletionPolicy::SoftCancel => {
                let mut canceled = concept.clone();
                canceled.state = ConceptState::Canceled;
                canceled.result = OperationResult::from_state(OperationState::Canceled);
                canceled.updated_at = Utc::now();
                self.store.update(canceled.clone()).await?;
                self.audit_store
                    .log_event(RoleRequestAuditEventInput {
                        action: RoleRequestAuditAction::ConceptCanceled,
                        actor_id,
                        request_id: Some(request.id),
                        before_state: Some(serde_json::to_value(&concept)?),
                        after_state: Some(serde_json::to_value(&canceled)?),
                        ..Default::default()
                    })
                    .await?;
            }
        }

        Ok(policy)
    }

    /// List the concepts of a request.
    ///
    /// The permission is checked against the owning request: the caller
    /// needs the administer-all authority or read access to the request
    /// itself.
    pub async fn list_by_request(
        &self,
        request_id: RoleRequestId,
        subject: &Subject,
    ) -> Result<Vec<ConceptRoleRequest>> {
        let request = self
            .request_store
            .get(request_id)
            .await?
            .ok_or(GovernanceError::RoleRequestNotFound(request_id.into_inner()))?;

        if !subject.admin {
            self.access_checker
                .check(subject, &request, RoleRequestPermission::Read)?;
        }

        self.store.list_by_request(request_id).await
    }

    fn validate_targets(input: &UpsertConceptInput) -> Result<()> {
        match input.operation {
            ConceptOperation::Add => {
                if input.contract_id.is_none() {
                    return Err(GovernanceError::ConceptTargetMissing(
                        "add requires a contract".to_string(),
                    ));
                }
            }
            ConceptOperation::Update | ConceptOperation::Remove => {
                if input.assigned_role_id.is_none() {
                    return Err(GovernanceError::ConceptTargetMissing(
                        "update/remove requires an existing assignment".to_string(),
                    ));
                }
            }
        }
        Ok(())
    }
}
