//! Request and response models for concept endpoints.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;
use validator::Validate;

use ryvos_governance::services::DeletionPolicy;
use ryvos_governance::types::{
    ConceptOperation, ConceptRoleRequest, ConceptState, OperationResult,
};

/// Request to create or update a concept.
///
/// A missing `id` creates a new concept; non-ADD creations targeting an
/// existing assignment replace any matching concept in the same request.
#[derive(Debug, Clone, Serialize, Deserialize, Validate, ToSchema)]
pub struct UpsertConceptRequest {
    /// Existing concept to update; omit to create.
    pub id: Option<Uuid>,

    /// Owning role request.
    pub role_request_id: Uuid,

    /// Kind of change.
    pub operation: ConceptOperation,

    /// Target role.
    pub role_id: Uuid,

    /// Target contract (required for add).
    pub contract_id: Option<Uuid>,

    /// Existing assignment (required for update/remove).
    pub assigned_role_id: Option<Uuid>,

    /// Validity start.
    pub valid_from: Option<DateTime<Utc>>,

    /// Validity end.
    pub valid_till: Option<DateTime<Utc>>,

    /// Extended-attribute values.
    pub attributes: Option<serde_json::Value>,
}

/// Concept response.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct ConceptResponse {
    /// Unique identifier.
    pub id: Uuid,

    /// Owning role request.
    pub role_request_id: Uuid,

    /// Kind of change.
    pub operation: ConceptOperation,

    /// Target role.
    pub role_id: Uuid,

    /// Target contract.
    pub contract_id: Option<Uuid>,

    /// Target assignment.
    pub assigned_role_id: Option<Uuid>,

    /// Validity start.
    pub valid_from: Option<DateTime<Utc>>,

    /// Validity end.
    pub valid_till: Option<DateTime<Utc>>,

    /// Extended-attribute values.
    pub attributes: serde_json::Value,

    /// Concept state.
    pub state: ConceptState,

    /// Last operation outcome.
    pub result: OperationResult,

    /// Creation timestamp.
    pub created_at: DateTime<Utc>,

    /// Last update timestamp.
    pub updated_at: DateTime<Utc>,
}

impl From<ConceptRoleRequest> for ConceptResponse {
    fn from(concept: ConceptRoleRequest) -> Self {
        Self {
            id: concept.id.into_inner(),
            role_request_id: concept.role_request_id.into_inner(),
            operation: concept.operation,
            role_id: concept.role_id.into_inner(),
            contract_id: concept.contract_id.map(|c| c.into_inner()),
            assigned_role_id: concept.assigned_role_id.map(|a| a.into_inner()),
            valid_from: concept.valid_from,
            valid_till: concept.valid_till,
            attributes: concept.attributes,
            state: concept.state,
            result: concept.result,
            created_at: concept.created_at,
            updated_at: concept.updated_at,
        }
    }
}

/// Concept list response.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct ConceptListResponse {
    /// Concepts of the request, oldest first.
    pub items: Vec<ConceptResponse>,

    /// Total number of items.
    pub total: usize,
}

/// Outcome of a concept delete.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct ConceptDeleteResponse {
    /// Applied outcome: `hard_delete` or `soft_cancel`.
    pub outcome: String,
}

impl From<DeletionPolicy> for ConceptDeleteResponse {
    fn from(policy: DeletionPolicy) -> Self {
        let outcome = match policy {
            DeletionPolicy::HardDelete => "hard_delete",
            DeletionPolicy::SoftCancel => "soft_cancel",
            DeletionPolicy::Reject => "reject",
        };
        Self {
            outcome: outcome.to_string(),
        }
    }
}
