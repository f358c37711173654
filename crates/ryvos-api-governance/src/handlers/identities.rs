//! Identity-scoped handlers: informational incompatibility check and the
//! long-poll endpoint.

use axum::{
    extract::{Path, State},
    Json,
};
use uuid::Uuid;

use ryvos_governance::types::IdentityId;

use crate::error::ApiResult;
use crate::models::{UnresolvedCheckResponse, ViolationListResponse};
use crate::router::GovernanceState;

/// Evaluate incompatibilities over an identity's currently assigned roles.
#[utoipa::path(
    get,
    path = "/identities/{id}/incompatible-roles",
    tag = "Identities",
    params(
        ("id" = Uuid, Path, description = "Identity ID")
    ),
    responses(
        (status = 200, description = "Detected violations", body = ViolationListResponse),
        (status = 404, description = "Identity not found")
    )
)]
pub async fn get_identity_incompatible_roles(
    State(state): State<GovernanceState>,
    Path(id): Path<Uuid>,
) -> ApiResult<Json<ViolationListResponse>> {
    let violations = state
        .incompatible_service
        .check_identity(IdentityId::from(id))
        .await?;
    Ok(Json(ViolationListResponse::from_violations(violations)))
}

/// Long-poll for changes to an identity's unresolved role requests.
///
/// Blocks up to the configured timeout. Resolves `blocked` when long
/// polling is administratively off, `executed` when all requests resolved,
/// `running` when something changed but work remains and `not_executed` on
/// timeout (the client re-issues the call).
#[utoipa::path(
    get,
    path = "/identities/{id}/check-unresolved-request",
    tag = "Identities",
    params(
        ("id" = Uuid, Path, description = "Identity ID")
    ),
    responses(
        (status = 200, description = "Aggregate check outcome", body = UnresolvedCheckResponse)
    )
)]
pub async fn check_unresolved_request(
    State(state): State<GovernanceState>,
    Path(id): Path<Uuid>,
) -> ApiResult<Json<UnresolvedCheckResponse>> {
    let result = state
        .long_polling
        .check_unresolved_requests(IdentityId::from(id))
        .await?;
    Ok(Json(result.into()))
}
