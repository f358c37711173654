//! Incompatible role evaluation.
//!
//! An incompatible pair marks two atomic roles that must never both be held
//! by the same subject, directly or through business-role composition. The
//! relation is symmetric; a pair is stored once and evaluated in both
//! directions.

use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use chrono::Utc;
use serde::{Deserialize, Serialize};
use tokio::sync::RwLock;
use uuid::Uuid;

use crate::audit::{AuditStore, RoleRequestAuditAction, RoleRequestAuditEventInput};
use crate::error::{GovernanceError, Result};
use crate::services::composition::RoleCompositionService;
use crate::services::concept::ConceptStore;
use crate::services::identity::{AssignedRoleStore, IdentityStore, RoleStore};
use crate::types::{ConceptOperation, IdentityId, IncompatibleRole, IncompatibleRoleId, RoleId};

// ============================================================================
// Store Trait
// ============================================================================

/// Trait for incompatible-role storage backends.
#[async_trait::async_trait]
pub trait IncompatibleRoleStore: Send + Sync {
    /// Get a pair by ID.
    async fn get(&self, id: IncompatibleRoleId) -> Result<Option<IncompatibleRole>>;

    /// Insert a pair.
    async fn insert(&self, pair: IncompatibleRole) -> Result<()>;

    /// Delete a pair.
    async fn delete(&self, id: IncompatibleRoleId) -> Result<bool>;

    /// List every registered pair.
    async fn list_all(&self) -> Result<Vec<IncompatibleRole>>;

    /// Whether the pair is registered, in either direction.
    async fn exists(&self, a: RoleId, b: RoleId) -> Result<bool>;
}

// ============================================================================
// In-Memory Store
// ============================================================================

/// In-memory incompatible-role store for testing and embedded use.
#[derive(Debug, Default)]
pub struct InMemoryIncompatibleRoleStore {
    pairs: Arc<RwLock<HashMap<IncompatibleRoleId, IncompatibleRole>>>,
}

impl InMemoryIncompatibleRoleStore {
    /// Create a new in-memory store.
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait::async_trait]
impl IncompatibleRoleStore for InMemoryIncompatibleRoleStore {
    async fn get(&self, id: IncompatibleRoleId) -> Result<Option<IncompatibleRole>> {
        Ok(self.pairs.read().await.get(&id).cloned())
    }

    async fn insert(&self, pair: IncompatibleRole) -> Result<()> {
        self.pairs.write().await.insert(pair.id, pair);
        Ok(())
    }

    async fn delete(&self, id: IncompatibleRoleId) -> Result<bool> {
        Ok(self.pairs.write().await.remove(&id).is_some())
    }

    async fn list_all(&self) -> Result<Vec<IncompatibleRole>> {
        let mut pairs: Vec<IncompatibleRole> =
            self.pairs.read().await.values().cloned().collect();
        pairs.sort_by_key(|p| p.id);
        Ok(pairs)
    }

    async fn exists(&self, a: RoleId, b: RoleId) -> Result<bool> {
        Ok(self.pairs.read().await.values().any(|p| p.matches(a, b)))
    }
}

// ============================================================================
// Service
// ============================================================================

/// Input for registering an incompatible pair.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateIncompatibleRoleInput {
    /// One side of the pair.
    pub superior_id: RoleId,
    /// The other side.
    pub sub_id: RoleId,
    /// Who is registering the pair.
    pub created_by: Option<Uuid>,
}

/// A detected violation: both roles of a registered pair are effectively
/// held.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IncompatibleRoleViolation {
    /// The violated pair.
    pub pair: IncompatibleRole,
    /// The first held role, in the stored orientation.
    pub first: RoleId,
    /// The second held role.
    pub second: RoleId,
}

/// Service registering incompatible pairs and evaluating role sets against
/// them.
pub struct IncompatibleRoleService {
    store: Arc<dyn IncompatibleRoleStore>,
    role_store: Arc<dyn RoleStore>,
    identity_store: Arc<dyn IdentityStore>,
    assigned_role_store: Arc<dyn AssignedRoleStore>,
    concept_store: Arc<dyn ConceptStore>,
    compositions: Arc<RoleCompositionService>,
    audit_store: Arc<dyn AuditStore>,
}

impl IncompatibleRoleService {
    /// Create a new incompatible-role service.
    pub fn new(
        store: Arc<dyn IncompatibleRoleStore>,
        role_store: Arc<dyn RoleStore>,
        identity_store: Arc<dyn IdentityStore>,
        assigned_role_store: Arc<dyn AssignedRoleStore>,
        concept_store: Arc<dyn ConceptStore>,
        compositions: Arc<RoleCompositionService>,
        audit_store: Arc<dyn AuditStore>,
    ) -> Self {
        Self {
            store,
            role_store,
            identity_store,
            assigned_role_store,
            concept_store,
            compositions,
            audit_store,
        }
    }

    /// Register an incompatible pair.
    pub async fn create_incompatible_role(
        &self,
        input: CreateIncompatibleRoleInput,
    ) -> Result<IncompatibleRole> {
        if input.superior_id == input.sub_id {
            return Err(GovernanceError::SelfIncompatiblePair(
                input.superior_id.into_inner(),
            ));
        }

        self.verify_role_exists(input.superior_id).await?;
        self.verify_role_exists(input.sub_id).await?;

        if self.store.exists(input.superior_id, input.sub_id).await? {
            return Err(GovernanceError::IncompatibleRoleAlreadyExists(
                input.superior_id.into_inner(),
                input.sub_id.into_inner(),
            ));
        }

        let pair = IncompatibleRole {
            id: IncompatibleRoleId::new(),
            superior_id: input.superior_id,
            sub_id: input.sub_id,
            created_at: Utc::now(),
        };
        self.store.insert(pair.clone()).await?;

        self.audit_store
            .log_event(RoleRequestAuditEventInput {
                action: RoleRequestAuditAction::IncompatibleRoleCreated,
                actor_id: input.created_by,
                after_state: Some(serde_json::to_value(&pair)?),
                ..Default::default()
            })
            .await?;

        Ok(pair)
    }

    /// Remove a registered pair.
    pub async fn delete_incompatible_role(&self, id: IncompatibleRoleId) -> Result<()> {
        let existing = self
            .store
            .get(id)
            .await?
            .ok_or(GovernanceError::IncompatibleRoleNotFound(id.into_inner()))?;

        self.store.delete(id).await?;

        self.audit_store
            .log_event(RoleRequestAuditEventInput {
                action: RoleRequestAuditAction::IncompatibleRoleDeleted,
                before_state: Some(serde_json::to_value(&existing)?),
                ..Default::default()
            })
            .await?;

        Ok(())
    }

    /// List every registered pair.
    pub async fn list_incompatible_roles(&self) -> Result<Vec<IncompatibleRole>> {
        self.store.list_all().await
    }

    /// Evaluate an already-flattened role set against the registered pairs.
    ///
    /// Returns each registered pair whose both sides are present. The check
    /// is symmetric, so the stored orientation does not matter.
    pub async fn resolve_incompatible_roles(
        &self,
        roles: &HashSet<RoleId>,
    ) -> Result<Vec<IncompatibleRoleViolation>> {
        let mut violations = Vec::new();
        for pair in self.store.list_all().await? {
            if roles.contains(&pair.superior_id) && roles.contains(&pair.sub_id) {
                violations.push(IncompatibleRoleViolation {
                    first: pair.superior_id,
                    second: pair.sub_id,
                    pair,
                });
            }
        }
        Ok(violations)
    }

    /// Informational identity-level check over the identity's currently
    /// assigned roles, flattened through composition.
    pub async fn check_identity(
        &self,
        identity_id: IdentityId,
    ) -> Result<Vec<IncompatibleRoleViolation>> {
        self.verify_identity_exists(identity_id).await?;
        let assigned: Vec<RoleId> = self
            .assigned_role_store
            .list_by_identity(identity_id)
            .await?
            .into_iter()
            .map(|a| a.role_id)
            .collect();
        let flattened = self.flatten_all(&assigned).await?;
        self.resolve_incompatible_roles(&flattened).await
    }

    /// Request-level check over the applicant's effective role set after the
    /// request's live concepts are applied.
    ///
    /// A role targeted by a live REMOVE concept is subtracted before ADDed
    /// roles are unioned in, so a request swapping one role for an
    /// incompatible one still reads as a single consistent end state.
    pub async fn check_request(
        &self,
        applicant_id: IdentityId,
        request_id: crate::types::RoleRequestId,
    ) -> Result<Vec<IncompatibleRoleViolation>> {
        self.verify_identity_exists(applicant_id).await?;

        let mut effective: HashSet<RoleId> = self
            .assigned_role_store
            .list_by_identity(applicant_id)
            .await?
            .into_iter()
            .map(|a| a.role_id)
            .collect();

        let concepts = self.concept_store.list_by_request(request_id).await?;
        for concept in concepts.iter().filter(|c| c.state.is_live()) {
            if concept.operation == ConceptOperation::Remove {
                effective.remove(&concept.role_id);
            }
        }
        for concept in concepts.iter().filter(|c| c.state.is_live()) {
            if concept.operation == ConceptOperation::Add {
                effective.insert(concept.role_id);
            }
        }

        let roles: Vec<RoleId> = effective.into_iter().collect();
        let flattened = self.flatten_all(&roles).await?;
        self.resolve_incompatible_roles(&flattened).await
    }

    async fn flatten_all(&self, roles: &[RoleId]) -> Result<HashSet<RoleId>> {
        let mut flattened = HashSet::new();
        for role in roles {
            // A role already in the set had its whole closure traversed when
            // it was reached, so resolving it again cannot add anything.
            if flattened.contains(role) {
                continue;
            }
            flattened.extend(self.compositions.resolve_distinct_roles(*role).await?);
        }
        Ok(flattened)
    }

    async fn verify_role_exists(&self, role_id: RoleId) -> Result<()> {
        self.role_store
            .get(role_id)
            .await?
            .ok_or(GovernanceError::RoleNotFound(role_id.into_inner()))?;
        Ok(())
    }

    async fn verify_identity_exists(&self, identity_id: IdentityId) -> Result<()> {
        self.identity_store
            .get(identity_id)
            .await?
            .ok_or(GovernanceError::IdentityNotFound(identity_id.into_inner()))?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::audit::InMemoryAuditStore;
    use crate::services::composition::{
        CreateCompositionInput, InMemoryRoleCompositionStore,
    };
    use crate::services::concept::InMemoryConceptStore;
    use crate::services::identity::{
        InMemoryAssignedRoleStore, InMemoryContractStore, InMemoryIdentityStore,
        InMemoryRoleStore,
    };
    use crate::types::{
        ConceptId, ConceptRoleRequest, ConceptState, ContractId, OperationResult,
        OperationState, RoleRequestId,
    };

    struct TestContext {
        service: IncompatibleRoleService,
        compositions: Arc<RoleCompositionService>,
        roles: Arc<InMemoryRoleStore>,
        identities: Arc<InMemoryIdentityStore>,
        contracts: Arc<InMemoryContractStore>,
        assignments: Arc<InMemoryAssignedRoleStore>,
        concepts: Arc<InMemoryConceptStore>,
    }

    async fn setup() -> TestContext {
        let roles = Arc::new(InMemoryRoleStore::new());
        let identities = Arc::new(InMemoryIdentityStore::new());
        let contracts = Arc::new(InMemoryContractStore::new());
        let assignments = Arc::new(InMemoryAssignedRoleStore::new());
        let concepts = Arc::new(InMemoryConceptStore::new());
        let audit = Arc::new(InMemoryAuditStore::new());
        let compositions = Arc::new(RoleCompositionService::new(
            Arc::new(InMemoryRoleCompositionStore::new()),
            roles.clone(),
            audit.clone(),
        ));
        let service = IncompatibleRoleService::new(
            Arc::new(InMemoryIncompatibleRoleStore::new()),
            roles.clone(),
            identities.clone(),
            assignments.clone(),
            concepts.clone(),
            compositions.clone(),
            audit,
        );
        TestContext {
            service,
            compositions,
            roles,
            identities,
            contracts,
            assignments,
            concepts,
        }
    }

    fn pair_input(a: RoleId, b: RoleId) -> CreateIncompatibleRoleInput {
        CreateIncompatibleRoleInput {
            superior_id: a,
            sub_id: b,
            created_by: None,
        }
    }

    async fn live_concept(
        ctx: &TestContext,
        request_id: RoleRequestId,
        operation: ConceptOperation,
        role_id: RoleId,
    ) {
        let now = Utc::now();
        ctx.concepts
            .insert(ConceptRoleRequest {
                id: ConceptId::new(),
                role_request_id: request_id,
                operation,
                role_id,
                contract_id: Some(ContractId::new()),
                assigned_role_id: None,
                valid_from: None,
                valid_till: None,
                attributes: serde_json::Value::Null,
                state: ConceptState::Concept,
                result: OperationResult::from_state(OperationState::Created),
                created_at: now,
                updated_at: now,
            })
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn test_symmetry() {
        let ctx = setup().await;
        let a = ctx.roles.add_named("a").await;
        let b = ctx.roles.add_named("b").await;
        ctx.service
            .create_incompatible_role(pair_input(a, b))
            .await
            .unwrap();

        // Presence of both roles matches regardless of stored orientation.
        let held = HashSet::from([b, a]);
        let violations = ctx.service.resolve_incompatible_roles(&held).await.unwrap();
        assert_eq!(violations.len(), 1);
        assert!(violations[0].pair.matches(b, a));

        let only_one = HashSet::from([a]);
        let violations = ctx
            .service
            .resolve_incompatible_roles(&only_one)
            .await
            .unwrap();
        assert!(violations.is_empty());
    }

    #[tokio::test]
    async fn test_duplicate_pair_rejected_in_both_directions() {
        let ctx = setup().await;
        let a = ctx.roles.add_named("a").await;
        let b = ctx.roles.add_named("b").await;
        ctx.service
            .create_incompatible_role(pair_input(a, b))
            .await
            .unwrap();

        let reversed = ctx.service.create_incompatible_role(pair_input(b, a)).await;
        assert!(matches!(
            reversed,
            Err(GovernanceError::IncompatibleRoleAlreadyExists(_, _))
        ));
    }

    #[tokio::test]
    async fn test_self_pair_rejected() {
        let ctx = setup().await;
        let a = ctx.roles.add_named("a").await;

        let result = ctx.service.create_incompatible_role(pair_input(a, a)).await;
        assert!(matches!(
            result,
            Err(GovernanceError::SelfIncompatiblePair(_))
        ));
    }

    #[tokio::test]
    async fn test_request_check_flattens_business_roles() {
        // Manager composes {read-hr, approve-leave}; approve-leave is
        // incompatible with auditor. An auditor requesting manager violates.
        let ctx = setup().await;
        let manager = ctx.roles.add_named("manager").await;
        let read_hr = ctx.roles.add_named("read-hr").await;
        let approve_leave = ctx.roles.add_named("approve-leave").await;
        let auditor = ctx.roles.add_named("auditor").await;

        ctx.compositions
            .create_composition(CreateCompositionInput {
                superior_id: manager,
                sub_id: read_hr,
                created_by: None,
            })
            .await
            .unwrap();
        ctx.compositions
            .create_composition(CreateCompositionInput {
                superior_id: manager,
                sub_id: approve_leave,
                created_by: None,
            })
            .await
            .unwrap();
        ctx.service
            .create_incompatible_role(pair_input(approve_leave, auditor))
            .await
            .unwrap();

        let alice = ctx.identities.add_named("alice").await;
        let contract = ctx.contracts.add_main(alice).await;
        ctx.assignments.assign(alice, contract, auditor).await;

        let request_id = RoleRequestId::new();
        live_concept(&ctx, request_id, ConceptOperation::Add, manager).await;

        let violations = ctx
            .service
            .check_request(alice, request_id)
            .await
            .unwrap();
        assert_eq!(violations.len(), 1);
        assert!(violations[0].pair.matches(approve_leave, auditor));
    }

    #[tokio::test]
    async fn test_request_check_remove_concept_subtracts() {
        let ctx = setup().await;
        let a = ctx.roles.add_named("a").await;
        let b = ctx.roles.add_named("b").await;
        ctx.service
            .create_incompatible_role(pair_input(a, b))
            .await
            .unwrap();

        let alice = ctx.identities.add_named("alice").await;
        let contract = ctx.contracts.add_main(alice).await;
        ctx.assignments.assign(alice, contract, a).await;

        // Swap a for b inside one request: no violation in the end state.
        let request_id = RoleRequestId::new();
        live_concept(&ctx, request_id, ConceptOperation::Remove, a).await;
        live_concept(&ctx, request_id, ConceptOperation::Add, b).await;

        let violations = ctx
            .service
            .check_request(alice, request_id)
            .await
            .unwrap();
        assert!(violations.is_empty());

        // Without the REMOVE, the same ADD violates.
        let other_request = RoleRequestId::new();
        live_concept(&ctx, other_request, ConceptOperation::Add, b).await;
        let violations = ctx
            .service
            .check_request(alice, other_request)
            .await
            .unwrap();
        assert_eq!(violations.len(), 1);
    }

    #[tokio::test]
    async fn test_identity_check_is_informational_over_current_roles() {
        let ctx = setup().await;
        let a = ctx.roles.add_named("a").await;
        let b = ctx.roles.add_named("b").await;
        ctx.service
            .create_incompatible_role(pair_input(a, b))
            .await
            .unwrap();

        let alice = ctx.identities.add_named("alice").await;
        let contract = ctx.contracts.add_main(alice).await;
        ctx.assignments.assign(alice, contract, a).await;
        ctx.assignments.assign(alice, contract, b).await;

        let violations = ctx.service.check_identity(alice).await.unwrap();
        assert_eq!(violations.len(), 1);
    }

    #[tokio::test]
    async fn test_delete_pair_clears_violation() {
        let ctx = setup().await;
        let a = ctx.roles.add_named("a").await;
        let b = ctx.roles.add_named("b").await;
        let pair = ctx
            .service
            .create_incompatible_role(pair_input(a, b))
            .await
            .unwrap();

        ctx.service.delete_incompatible_role(pair.id).await.unwrap();

        let held = HashSet::from([a, b]);
        let violations = ctx.service.resolve_incompatible_roles(&held).await.unwrap();
        assert!(violations.is_empty());

        let again = ctx.service.delete_incompatible_role(pair.id).await;
        assert!(matches!(
            again,
            Err(GovernanceError::IncompatibleRoleNotFound(_))
        ));
    }
}
