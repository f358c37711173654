//! Type definitions for the role-request domain.
//!
//! Includes newtype wrappers for IDs, lifecycle enums and the core
//! request/concept entities.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use utoipa::ToSchema;
use uuid::Uuid;

// ============================================================================
// ID Types (Newtype Pattern)
// ============================================================================

/// Unique identifier for a role.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RoleId(pub Uuid);

impl RoleId {
    /// Create a new random RoleId.
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }

    /// Get the inner UUID.
    pub fn into_inner(self) -> Uuid {
        self.0
    }
}

impl Default for RoleId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for RoleId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<Uuid> for RoleId {
    fn from(id: Uuid) -> Self {
        Self(id)
    }
}

impl From<RoleId> for Uuid {
    fn from(id: RoleId) -> Self {
        id.0
    }
}

/// Unique identifier for an identity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct IdentityId(pub Uuid);

impl IdentityId {
    /// Create a new random IdentityId.
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }

    /// Get the inner UUID.
    pub fn into_inner(self) -> Uuid {
        self.0
    }
}

impl Default for IdentityId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for IdentityId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<Uuid> for IdentityId {
    fn from(id: Uuid) -> Self {
        Self(id)
    }
}

impl From<IdentityId> for Uuid {
    fn from(id: IdentityId) -> Self {
        id.0
    }
}

/// Unique identifier for an identity contract (work position).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ContractId(pub Uuid);

impl ContractId {
    /// Create a new random ContractId.
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }

    /// Get the inner UUID.
    pub fn into_inner(self) -> Uuid {
        self.0
    }
}

impl Default for ContractId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for ContractId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<Uuid> for ContractId {
    fn from(id: Uuid) -> Self {
        Self(id)
    }
}

impl From<ContractId> for Uuid {
    fn from(id: ContractId) -> Self {
        id.0
    }
}

/// Unique identifier for an existing role assignment on a contract.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct AssignedRoleId(pub Uuid);

impl AssignedRoleId {
    /// Create a new random AssignedRoleId.
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }

    /// Get the inner UUID.
    pub fn into_inner(self) -> Uuid {
        self.0
    }
}

impl Default for AssignedRoleId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for AssignedRoleId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<Uuid> for AssignedRoleId {
    fn from(id: Uuid) -> Self {
        Self(id)
    }
}

impl From<AssignedRoleId> for Uuid {
    fn from(id: AssignedRoleId) -> Self {
        id.0
    }
}

/// Unique identifier for a role request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RoleRequestId(pub Uuid);

impl RoleRequestId {
    /// Create a new random RoleRequestId.
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }

    /// Get the inner UUID.
    pub fn into_inner(self) -> Uuid {
        self.0
    }
}

impl Default for RoleRequestId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for RoleRequestId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<Uuid> for RoleRequestId {
    fn from(id: Uuid) -> Self {
        Self(id)
    }
}

impl From<RoleRequestId> for Uuid {
    fn from(id: RoleRequestId) -> Self {
        id.0
    }
}

/// Unique identifier for a concept (a proposed role-assignment change).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ConceptId(pub Uuid);

impl ConceptId {
    /// Create a new random ConceptId.
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }

    /// Get the inner UUID.
    pub fn into_inner(self) -> Uuid {
        self.0
    }
}

impl Default for ConceptId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for ConceptId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<Uuid> for ConceptId {
    fn from(id: Uuid) -> Self {
        Self(id)
    }
}

impl From<ConceptId> for Uuid {
    fn from(id: ConceptId) -> Self {
        id.0
    }
}

/// Unique identifier for a role composition edge.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct CompositionId(pub Uuid);

impl CompositionId {
    /// Create a new random CompositionId.
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }

    /// Get the inner UUID.
    pub fn into_inner(self) -> Uuid {
        self.0
    }
}

impl Default for CompositionId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for CompositionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<Uuid> for CompositionId {
    fn from(id: Uuid) -> Self {
        Self(id)
    }
}

impl From<CompositionId> for Uuid {
    fn from(id: CompositionId) -> Self {
        id.0
    }
}

/// Unique identifier for an incompatible-role rule.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct IncompatibleRoleId(pub Uuid);

impl IncompatibleRoleId {
    /// Create a new random IncompatibleRoleId.
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }

    /// Get the inner UUID.
    pub fn into_inner(self) -> Uuid {
        self.0
    }
}

impl Default for IncompatibleRoleId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for IncompatibleRoleId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<Uuid> for IncompatibleRoleId {
    fn from(id: Uuid) -> Self {
        Self(id)
    }
}

impl From<IncompatibleRoleId> for Uuid {
    fn from(id: IncompatibleRoleId) -> Self {
        id.0
    }
}

// ============================================================================
// Lifecycle Enums
// ============================================================================

/// Lifecycle state of a role request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum RoleRequestState {
    /// Draft state; the request and its concepts can still be modified.
    Concept,
    /// Dispatched to the approval engine, waiting for a decision.
    InProgress,
    /// Approved but not yet executed.
    Approved,
    /// All concepts were applied.
    Executed,
    /// Withdrawn before execution.
    Canceled,
    /// The approval engine or validation failed.
    Exception,
    /// Superseded by another request for the same applicant.
    Duplicated,
}

impl RoleRequestState {
    /// Whether the request reached a final state.
    pub fn is_terminal(self) -> bool {
        matches!(
            self,
            Self::Executed | Self::Canceled | Self::Exception | Self::Duplicated
        )
    }

    /// Whether the request (and its concepts) may still be modified.
    pub fn is_editable(self) -> bool {
        matches!(self, Self::Concept)
    }

    /// Whether the request still awaits a resolution.
    pub fn is_unresolved(self) -> bool {
        !self.is_terminal()
    }
}

impl fmt::Display for RoleRequestState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::Concept => "concept",
            Self::InProgress => "in_progress",
            Self::Approved => "approved",
            Self::Executed => "executed",
            Self::Canceled => "canceled",
            Self::Exception => "exception",
            Self::Duplicated => "duplicated",
        };
        write!(f, "{s}")
    }
}

/// Lifecycle state of a single concept.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum ConceptState {
    /// Pending change, still part of the draft.
    Concept,
    /// The change was applied.
    Executed,
    /// The change was withdrawn.
    Canceled,
}

impl ConceptState {
    /// Whether the concept is still live (not withdrawn).
    pub fn is_live(self) -> bool {
        !matches!(self, Self::Canceled)
    }
}

/// Kind of change a concept proposes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum ConceptOperation {
    /// Assign a role to a contract.
    Add,
    /// Modify an existing assignment (validity, attributes).
    Update,
    /// Remove an existing assignment.
    Remove,
}

/// State of an asynchronous operation result.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum OperationState {
    /// Freshly created, nothing dispatched yet.
    Created,
    /// Work detected but not finished.
    Running,
    /// Finished successfully.
    Executed,
    /// Nothing happened within the observed window.
    NotExecuted,
    /// Withdrawn.
    Canceled,
    /// Failed with an error payload.
    Exception,
    /// The mechanism is administratively disabled.
    Blocked,
}

/// Execution priority of a request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum RequestPriority {
    /// Batch priority.
    Normal,
    /// Interactive priority; jumps the execution queue.
    High,
}

/// How a request came into existence.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum RequestedByType {
    /// Created by a user (or on a user's behalf).
    Manually,
    /// Created by an automated process; must reuse an existing request.
    Automatically,
}

/// Kind of subject a request is filed for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum ApplicantType {
    /// A person.
    Identity,
    /// A technical / non-human account.
    Technical,
}

/// Entity namespace a long-poll subscriber watches.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WatchedEntityType {
    /// Watch the unresolved requests of an applicant identity.
    Identity,
}

// ============================================================================
// Operation Result
// ============================================================================

/// Outcome attached to requests, concepts and long-poll checks.
///
/// Error payloads from the approval engine land here; they are carried with
/// the entity instead of being swallowed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct OperationResult {
    /// Result state.
    pub state: OperationState,
    /// Machine-readable error or status code.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub code: Option<String>,
    /// Human-readable message.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

impl OperationResult {
    /// Result with just a state and no payload.
    pub fn from_state(state: OperationState) -> Self {
        Self {
            state,
            code: None,
            message: None,
        }
    }

    /// Exception result carrying an error payload.
    pub fn exception(code: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            state: OperationState::Exception,
            code: Some(code.into()),
            message: Some(message.into()),
        }
    }
}

// ============================================================================
// Entities
// ============================================================================

/// A mutable draft of role-assignment changes and its lifecycle record.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RoleRequest {
    /// Unique identifier.
    pub id: RoleRequestId,
    /// Applicant the requested changes are for.
    pub applicant_id: IdentityId,
    /// Kind of applicant.
    pub applicant_type: ApplicantType,
    /// Lifecycle state.
    pub state: RoleRequestState,
    /// Whether the request's concepts were applied.
    pub executed: bool,
    /// Execution priority.
    pub priority: RequestPriority,
    /// Origin of the request.
    pub requested_by_type: RequestedByType,
    /// Optional free-text description.
    pub description: Option<String>,
    /// Outcome of the last start attempt, if any.
    pub result: Option<OperationResult>,
    /// When created.
    pub created_at: DateTime<Utc>,
    /// When last updated.
    pub updated_at: DateTime<Utc>,
}

/// A single proposed change (add/update/remove) to a role assignment.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConceptRoleRequest {
    /// Unique identifier.
    pub id: ConceptId,
    /// Owning role request.
    pub role_request_id: RoleRequestId,
    /// Kind of change.
    pub operation: ConceptOperation,
    /// Target role.
    pub role_id: RoleId,
    /// Target contract (required for add).
    pub contract_id: Option<ContractId>,
    /// Existing assignment (required for update/remove).
    pub assigned_role_id: Option<AssignedRoleId>,
    /// Assignment validity start.
    pub valid_from: Option<DateTime<Utc>>,
    /// Assignment validity end.
    pub valid_till: Option<DateTime<Utc>>,
    /// Extended-attribute values, carried opaquely.
    pub attributes: serde_json::Value,
    /// Lifecycle state.
    pub state: ConceptState,
    /// Processing result.
    pub result: OperationResult,
    /// When created.
    pub created_at: DateTime<Utc>,
    /// When last updated.
    pub updated_at: DateTime<Utc>,
}

/// Directed composition edge: the superior role grants the sub role.
///
/// The edge set must stay acyclic; violating edges are rejected when the
/// composition is created.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RoleComposition {
    /// Unique identifier.
    pub id: CompositionId,
    /// Superior (business) role.
    pub superior_id: RoleId,
    /// Granted sub role.
    pub sub_id: RoleId,
    /// When created.
    pub created_at: DateTime<Utc>,
}

/// Unordered pair of roles that must never be held together.
///
/// Stored once, evaluated in both directions.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IncompatibleRole {
    /// Unique identifier.
    pub id: IncompatibleRoleId,
    /// First member of the pair.
    pub superior_id: RoleId,
    /// Second member of the pair.
    pub sub_id: RoleId,
    /// When created.
    pub created_at: DateTime<Utc>,
}

impl IncompatibleRole {
    /// Whether the rule covers the given unordered pair.
    pub fn matches(&self, a: RoleId, b: RoleId) -> bool {
        (self.superior_id == a && self.sub_id == b) || (self.superior_id == b && self.sub_id == a)
    }
}

// ============================================================================
// Read-side entities
// ============================================================================

/// A role definition (atomic or composite).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Role {
    /// Unique identifier.
    pub id: RoleId,
    /// Role code / name.
    pub name: String,
}

/// An identity (user) record.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Identity {
    /// Unique identifier.
    pub id: IdentityId,
    /// Login name.
    pub username: String,
    /// Disabled identities cannot have requests started for them.
    pub disabled: bool,
}

/// A work position of an identity; role assignments hang off contracts.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IdentityContract {
    /// Unique identifier.
    pub id: ContractId,
    /// Owning identity.
    pub identity_id: IdentityId,
    /// Whether this is the identity's primary contract.
    pub main: bool,
}

/// An existing role assignment on a contract.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AssignedRole {
    /// Unique identifier.
    pub id: AssignedRoleId,
    /// Owning identity.
    pub identity_id: IdentityId,
    /// Contract the role is assigned to.
    pub contract_id: ContractId,
    /// The assigned role.
    pub role_id: RoleId,
    /// Validity start.
    pub valid_from: Option<DateTime<Utc>>,
    /// Validity end.
    pub valid_till: Option<DateTime<Utc>>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_request_state_terminality() {
        assert!(RoleRequestState::Executed.is_terminal());
        assert!(RoleRequestState::Canceled.is_terminal());
        assert!(RoleRequestState::Exception.is_terminal());
        assert!(RoleRequestState::Duplicated.is_terminal());
        assert!(!RoleRequestState::Concept.is_terminal());
        assert!(!RoleRequestState::InProgress.is_terminal());
        assert!(!RoleRequestState::Approved.is_terminal());
    }

    #[test]
    fn test_request_state_editability() {
        assert!(RoleRequestState::Concept.is_editable());
        assert!(!RoleRequestState::InProgress.is_editable());
        assert!(!RoleRequestState::Executed.is_editable());
    }

    #[test]
    fn test_concept_state_liveness() {
        assert!(ConceptState::Concept.is_live());
        assert!(ConceptState::Executed.is_live());
        assert!(!ConceptState::Canceled.is_live());
    }

    #[test]
    fn test_incompatible_role_matches_both_directions() {
        let a = RoleId::new();
        let b = RoleId::new();
        let rule = IncompatibleRole {
            id: IncompatibleRoleId::new(),
            superior_id: a,
            sub_id: b,
            created_at: Utc::now(),
        };

        assert!(rule.matches(a, b));
        assert!(rule.matches(b, a));
        assert!(!rule.matches(a, RoleId::new()));
    }

    #[test]
    fn test_operation_result_exception_payload() {
        let result = OperationResult::exception("engine_failed", "boom");
        assert_eq!(result.state, OperationState::Exception);
        assert_eq!(result.code.as_deref(), Some("engine_failed"));
        assert_eq!(result.message.as_deref(), Some("boom"));
    }

    #[test]
    fn test_id_serde_transparent() {
        let id = RoleRequestId::new();
        let json = serde_json::to_string(&id).unwrap();
        assert_eq!(json, format!("\"{}\"", id.into_inner()));
    }
}
