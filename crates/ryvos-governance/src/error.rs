//! Error types for the role-request domain.

use thiserror::Error;
use uuid::Uuid;

use crate::types::RoleRequestState;

/// Domain error for role-request orchestration.
#[derive(Debug, Error)]
pub enum GovernanceError {
    // ------------------------------------------------------------------
    // Not-found family
    // ------------------------------------------------------------------
    /// Role request not found.
    #[error("Role request not found: {0}")]
    RoleRequestNotFound(Uuid),

    /// Concept not found.
    #[error("Concept not found: {0}")]
    ConceptNotFound(Uuid),

    /// Role not found.
    #[error("Role not found: {0}")]
    RoleNotFound(Uuid),

    /// Identity not found.
    #[error("Identity not found: {0}")]
    IdentityNotFound(Uuid),

    /// Identity contract not found.
    #[error("Identity contract not found: {0}")]
    ContractNotFound(Uuid),

    /// Role assignment not found.
    #[error("Assigned role not found: {0}")]
    AssignedRoleNotFound(Uuid),

    /// Role composition not found.
    #[error("Role composition not found: {0}")]
    CompositionNotFound(Uuid),

    /// Incompatible-role rule not found.
    #[error("Incompatible role not found: {0}")]
    IncompatibleRoleNotFound(Uuid),

    // ------------------------------------------------------------------
    // Validation family
    // ------------------------------------------------------------------
    /// A new request cannot be created automatically through the public API.
    #[error("Automatic creation of a new role request is not allowed; modify an existing request")]
    AutomaticRequestNotAllowed,

    /// The concept is missing a required target.
    #[error("Concept target missing: {0}")]
    ConceptTargetMissing(String),

    /// A role cannot compose itself.
    #[error("Role {0} cannot be composed with itself")]
    SelfComposition(Uuid),

    /// A role cannot be incompatible with itself.
    #[error("Role {0} cannot be incompatible with itself")]
    SelfIncompatiblePair(Uuid),

    /// Generic validation error.
    #[error("Validation error: {0}")]
    Validation(String),

    // ------------------------------------------------------------------
    // Conflict family
    // ------------------------------------------------------------------
    /// Concepts of an executed request are immutable history.
    #[error("Request {0} is executed; its concepts cannot be deleted")]
    RequestExecutedCannotDelete(Uuid),

    /// The request left the draft state and cannot be modified directly.
    #[error("Request {request_id} is in state {state} and cannot be modified")]
    RequestNotEditable {
        /// Offending request.
        request_id: Uuid,
        /// Its current state.
        state: RoleRequestState,
    },

    /// Compare-and-set state transition failed.
    #[error("Request {request_id} is in state {actual}, expected {expected}")]
    InvalidRequestState {
        /// Offending request.
        request_id: Uuid,
        /// State required for the transition.
        expected: RoleRequestState,
        /// State actually found.
        actual: RoleRequestState,
    },

    /// Another unresolved request exists for the same applicant.
    #[error("Applicant {applicant_id} already has request {existing_request_id} in progress")]
    ConcurrentRequestInProgress {
        /// The applicant.
        applicant_id: Uuid,
        /// The conflicting request.
        existing_request_id: Uuid,
    },

    /// The composition edge already exists.
    #[error("Composition {superior_id} -> {sub_id} already exists")]
    CompositionAlreadyExists {
        /// Superior role.
        superior_id: Uuid,
        /// Sub role.
        sub_id: Uuid,
    },

    /// The incompatible-role pair is already registered (in either direction).
    #[error("Incompatible role pair ({0}, {1}) already exists")]
    IncompatibleRoleAlreadyExists(Uuid, Uuid),

    /// Creating the composition would close a cycle, or a cycle was found
    /// in the stored graph during resolution.
    #[error("Role composition cycle detected: {0}")]
    CompositionCycleDetected(String),

    /// The applicant is disabled and cannot have requests started.
    #[error("Applicant {0} is disabled")]
    ApplicantDisabled(Uuid),

    // ------------------------------------------------------------------
    // Authorization / infrastructure
    // ------------------------------------------------------------------
    /// Access denied.
    #[error("Access denied: {0}")]
    Forbidden(String),

    /// Serialization failure.
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl GovernanceError {
    /// Whether the error maps to a missing entity.
    pub fn is_not_found(&self) -> bool {
        matches!(
            self,
            Self::RoleRequestNotFound(_)
                | Self::ConceptNotFound(_)
                | Self::RoleNotFound(_)
                | Self::IdentityNotFound(_)
                | Self::ContractNotFound(_)
                | Self::AssignedRoleNotFound(_)
                | Self::CompositionNotFound(_)
                | Self::IncompatibleRoleNotFound(_)
        )
    }

    /// Whether the error maps to a state conflict.
    pub fn is_conflict(&self) -> bool {
        matches!(
            self,
            Self::RequestExecutedCannotDelete(_)
                | Self::RequestNotEditable { .. }
                | Self::InvalidRequestState { .. }
                | Self::ConcurrentRequestInProgress { .. }
                | Self::CompositionAlreadyExists { .. }
                | Self::IncompatibleRoleAlreadyExists(_, _)
                | Self::CompositionCycleDetected(_)
        )
    }

    /// Whether the error maps to an authorization failure.
    pub fn is_forbidden(&self) -> bool {
        matches!(self, Self::Forbidden(_))
    }

    /// Whether the error maps to a failed precondition.
    pub fn is_precondition_failed(&self) -> bool {
        matches!(self, Self::ApplicantDisabled(_))
    }
}

/// Result type alias for domain operations.
pub type Result<T> = std::result::Result<T, GovernanceError>;
