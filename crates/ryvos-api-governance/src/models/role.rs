//! Request and response models for composition and incompatible-role
//! endpoints.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;
use validator::Validate;

use ryvos_governance::services::IncompatibleRoleViolation;
use ryvos_governance::types::{IncompatibleRole, RoleComposition};

/// Request to create a composition edge.
#[derive(Debug, Clone, Serialize, Deserialize, Validate, ToSchema)]
pub struct CreateCompositionRequest {
    /// Superior (business) role.
    pub superior_id: Uuid,

    /// Granted sub role.
    pub sub_id: Uuid,
}

/// Composition edge response.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct CompositionResponse {
    /// Unique identifier.
    pub id: Uuid,

    /// Superior role.
    pub superior_id: Uuid,

    /// Sub role.
    pub sub_id: Uuid,

    /// Creation timestamp.
    pub created_at: DateTime<Utc>,
}

impl From<RoleComposition> for CompositionResponse {
    fn from(edge: RoleComposition) -> Self {
        Self {
            id: edge.id.into_inner(),
            superior_id: edge.superior_id.into_inner(),
            sub_id: edge.sub_id.into_inner(),
            created_at: edge.created_at,
        }
    }
}

/// Composition edge list response.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct CompositionListResponse {
    /// Edges reachable from the role, direct and transitive.
    pub items: Vec<CompositionResponse>,

    /// Total number of items.
    pub total: usize,
}

/// Request to register an incompatible pair.
#[derive(Debug, Clone, Serialize, Deserialize, Validate, ToSchema)]
pub struct CreateIncompatibleRoleRequest {
    /// One side of the pair.
    pub superior_id: Uuid,

    /// The other side.
    pub sub_id: Uuid,
}

/// Incompatible pair response.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct IncompatibleRoleResponse {
    /// Unique identifier.
    pub id: Uuid,

    /// One side of the pair.
    pub superior_id: Uuid,

    /// The other side.
    pub sub_id: Uuid,

    /// Creation timestamp.
    pub created_at: DateTime<Utc>,
}

impl From<IncompatibleRole> for IncompatibleRoleResponse {
    fn from(pair: IncompatibleRole) -> Self {
        Self {
            id: pair.id.into_inner(),
            superior_id: pair.superior_id.into_inner(),
            sub_id: pair.sub_id.into_inner(),
            created_at: pair.created_at,
        }
    }
}

/// Incompatible pair list response.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct IncompatibleRoleListResponse {
    /// Registered pairs.
    pub items: Vec<IncompatibleRoleResponse>,

    /// Total number of items.
    pub total: usize,
}

/// A detected incompatibility violation.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct ViolationResponse {
    /// The violated pair.
    pub incompatible_role_id: Uuid,

    /// First effectively held role.
    pub first_role_id: Uuid,

    /// Second effectively held role.
    pub second_role_id: Uuid,
}

impl From<IncompatibleRoleViolation> for ViolationResponse {
    fn from(violation: IncompatibleRoleViolation) -> Self {
        Self {
            incompatible_role_id: violation.pair.id.into_inner(),
            first_role_id: violation.first.into_inner(),
            second_role_id: violation.second.into_inner(),
        }
    }
}

/// Violation list response.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct ViolationListResponse {
    /// Detected violations.
    pub items: Vec<ViolationResponse>,

    /// Total number of items.
    pub total: usize,
}

impl ViolationListResponse {
    /// Build from domain violations.
    pub fn from_violations(violations: Vec<IncompatibleRoleViolation>) -> Self {
        let items: Vec<ViolationResponse> =
            violations.into_iter().map(Into::into).collect();
        let total = items.len();
        Self { items, total }
    }
}
