//! Request and response models for role-request endpoints.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::{IntoParams, ToSchema};
use uuid::Uuid;
use validator::Validate;

use ryvos_governance::services::RequestDeleteStats;
use ryvos_governance::types::{
    ApplicantType, OperationResult, RequestPriority, RequestedByType, RoleRequest,
    RoleRequestState,
};

/// Request to create a role-request draft.
#[derive(Debug, Clone, Serialize, Deserialize, Validate, ToSchema)]
pub struct CreateRoleRequestRequest {
    /// Applicant the request is for.
    pub applicant_id: Uuid,

    /// Kind of applicant (defaults to identity).
    pub applicant_type: Option<ApplicantType>,

    /// Origin of the request (defaults to manually; automatic creation is
    /// rejected).
    pub requested_by_type: Option<RequestedByType>,

    /// Optional free-text description.
    #[validate(length(max = 2000, message = "Description must not exceed 2000 characters"))]
    pub description: Option<String>,
}

/// Query parameters for starting a request.
#[derive(Debug, Clone, Default, Deserialize, IntoParams)]
pub struct StartRoleRequestQuery {
    /// Whether the approval engine re-verifies the starter's authorization
    /// (default: true).
    pub check_right: Option<bool>,
}

/// Query parameters for listing role requests.
#[derive(Debug, Clone, Deserialize, IntoParams)]
pub struct ListRoleRequestsQuery {
    /// Applicant whose requests are listed.
    pub applicant_id: Uuid,
}

/// Request to replicate an identity's roles into a draft.
#[derive(Debug, Clone, Serialize, Deserialize, Validate, ToSchema)]
pub struct CopyRolesRequest {
    /// Identity whose current roles are copied.
    pub source_identity_id: Uuid,

    /// Contract the copies are assigned to.
    pub target_contract_id: Uuid,

    /// Validity start for the copies.
    pub valid_from: Option<DateTime<Utc>>,

    /// Validity end for the copies.
    pub valid_till: Option<DateTime<Utc>>,
}

/// Role-request response.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct RoleRequestResponse {
    /// Unique identifier.
    pub id: Uuid,

    /// Applicant the request is for.
    pub applicant_id: Uuid,

    /// Kind of applicant.
    pub applicant_type: ApplicantType,

    /// Lifecycle state.
    pub state: RoleRequestState,

    /// Whether execution finished.
    pub executed: bool,

    /// Execution priority.
    pub priority: RequestPriority,

    /// Origin of the request.
    pub requested_by_type: RequestedByType,

    /// Free-text description.
    pub description: Option<String>,

    /// Last operation outcome, including error payloads.
    pub result: Option<OperationResult>,

    /// Creation timestamp.
    pub created_at: DateTime<Utc>,

    /// Last update timestamp.
    pub updated_at: DateTime<Utc>,
}

impl From<RoleRequest> for RoleRequestResponse {
    fn from(request: RoleRequest) -> Self {
        Self {
            id: request.id.into_inner(),
            applicant_id: request.applicant_id.into_inner(),
            applicant_type: request.applicant_type,
            state: request.state,
            executed: request.executed,
            priority: request.priority,
            requested_by_type: request.requested_by_type,
            description: request.description,
            result: request.result,
            created_at: request.created_at,
            updated_at: request.updated_at,
        }
    }
}

/// Role-request list response.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct RoleRequestListResponse {
    /// Requests of the applicant, oldest first.
    pub items: Vec<RoleRequestResponse>,

    /// Total number of items.
    pub total: usize,
}

/// Outcome of a cascading request delete.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct RequestDeleteResponse {
    /// Concepts physically removed.
    pub concepts_removed: usize,

    /// Concepts soft-canceled.
    pub concepts_canceled: usize,

    /// Whether the request row itself was removed.
    pub request_removed: bool,
}

impl From<RequestDeleteStats> for RequestDeleteResponse {
    fn from(stats: RequestDeleteStats) -> Self {
        Self {
            concepts_removed: stats.concepts_removed,
            concepts_canceled: stats.concepts_canceled,
            request_removed: stats.request_removed,
        }
    }
}
