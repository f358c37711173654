//! Role-request handlers.

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Extension, Json,
};
use uuid::Uuid;
use validator::Validate;

use ryvos_governance::services::{CopyRolesInput, CreateRoleRequestInput};
use ryvos_governance::types::{
    ApplicantType, ContractId, IdentityId, RequestPriority, RequestedByType, RoleRequestId,
};

use crate::error::ApiResult;
use crate::models::{
    ConceptListResponse, ConceptResponse, CopyRolesRequest, CreateRoleRequestRequest,
    ListRoleRequestsQuery, RequestDeleteResponse, RoleRequestListResponse, RoleRequestResponse,
    StartRoleRequestQuery, ViolationListResponse,
};
use crate::router::{CallerIdentity, GovernanceState};

/// Create a role-request draft.
#[utoipa::path(
    post,
    path = "/role-requests",
    tag = "Role Requests",
    request_body = CreateRoleRequestRequest,
    responses(
        (status = 201, description = "Draft created", body = RoleRequestResponse),
        (status = 400, description = "Invalid request or automatic creation"),
        (status = 404, description = "Applicant not found")
    )
)]
pub async fn create_role_request(
    State(state): State<GovernanceState>,
    Extension(caller): Extension<CallerIdentity>,
    Json(request): Json<CreateRoleRequestRequest>,
) -> ApiResult<(StatusCode, Json<RoleRequestResponse>)> {
    request.validate()?;

    let created = state
        .request_service
        .create_request(CreateRoleRequestInput {
            applicant_id: IdentityId::from(request.applicant_id),
            applicant_type: request.applicant_type.unwrap_or(ApplicantType::Identity),
            requested_by_type: request
                .requested_by_type
                .unwrap_or(RequestedByType::Manually),
            description: request.description,
            actor_id: Some(caller.0.identity_id.into_inner()),
        })
        .await?;

    Ok((StatusCode::CREATED, Json(created.into())))
}

/// Get a role request by ID.
#[utoipa::path(
    get,
    path = "/role-requests/{id}",
    tag = "Role Requests",
    params(
        ("id" = Uuid, Path, description = "Role request ID")
    ),
    responses(
        (status = 200, description = "Role request details", body = RoleRequestResponse),
        (status = 403, description = "Caller may not read this request"),
        (status = 404, description = "Role request not found")
    )
)]
pub async fn get_role_request(
    State(state): State<GovernanceState>,
    Extension(caller): Extension<CallerIdentity>,
    Path(id): Path<Uuid>,
) -> ApiResult<Json<RoleRequestResponse>> {
    let request = state
        .request_service
        .get_request_for(RoleRequestId::from(id), &caller.0)
        .await?;
    Ok(Json(request.into()))
}

/// List an applicant's role requests, oldest first.
#[utoipa::path(
    get,
    path = "/role-requests",
    tag = "Role Requests",
    params(ListRoleRequestsQuery),
    responses(
        (status = 200, description = "Requests of the applicant", body = RoleRequestListResponse),
        (status = 403, description = "Caller may not list this applicant's requests")
    )
)]
pub async fn list_role_requests(
    State(state): State<GovernanceState>,
    Extension(caller): Extension<CallerIdentity>,
    Query(query): Query<ListRoleRequestsQuery>,
) -> ApiResult<Json<RoleRequestListResponse>> {
    let requests = state
        .request_service
        .list_by_applicant_for(IdentityId::from(query.applicant_id), &caller.0)
        .await?;

    let items: Vec<RoleRequestResponse> = requests.into_iter().map(Into::into).collect();
    let total = items.len();
    Ok(Json(RoleRequestListResponse { items, total }))
}

/// Validate and start a role request.
///
/// Returns 200 with the request body when the resulting state is terminal,
/// 202 when the approval engine left it pending.
#[utoipa::path(
    put,
    path = "/role-requests/{id}/start",
    tag = "Role Requests",
    params(
        ("id" = Uuid, Path, description = "Role request ID"),
        StartRoleRequestQuery
    ),
    responses(
        (status = 200, description = "Request reached a terminal state", body = RoleRequestResponse),
        (status = 202, description = "Request accepted, approval pending", body = RoleRequestResponse),
        (status = 404, description = "Role request not found"),
        (status = 409, description = "Request already started"),
        (status = 412, description = "Applicant disabled")
    )
)]
pub async fn start_role_request(
    State(state): State<GovernanceState>,
    Path(id): Path<Uuid>,
    Query(query): Query<StartRoleRequestQuery>,
) -> ApiResult<(StatusCode, Json<RoleRequestResponse>)> {
    let check_right = query.check_right.unwrap_or(true);
    let resolved = state
        .request_service
        .start_request(RoleRequestId::from(id), check_right, RequestPriority::High)
        .await?;

    let status = if resolved.state.is_terminal() {
        StatusCode::OK
    } else {
        StatusCode::ACCEPTED
    };
    Ok((status, Json(resolved.into())))
}

/// Delete a role request, cascading over its concepts.
#[utoipa::path(
    delete,
    path = "/role-requests/{id}",
    tag = "Role Requests",
    params(
        ("id" = Uuid, Path, description = "Role request ID")
    ),
    responses(
        (status = 200, description = "Delete outcome", body = RequestDeleteResponse),
        (status = 404, description = "Role request not found"),
        (status = 409, description = "Request already executed")
    )
)]
pub async fn delete_role_request(
    State(state): State<GovernanceState>,
    Extension(caller): Extension<CallerIdentity>,
    Path(id): Path<Uuid>,
) -> ApiResult<Json<RequestDeleteResponse>> {
    let stats = state
        .request_service
        .delete_request(
            RoleRequestId::from(id),
            Some(caller.0.identity_id.into_inner()),
        )
        .await?;
    Ok(Json(stats.into()))
}

/// List the concepts of a role request.
#[utoipa::path(
    get,
    path = "/role-requests/{id}/concepts",
    tag = "Role Requests",
    params(
        ("id" = Uuid, Path, description = "Role request ID")
    ),
    responses(
        (status = 200, description = "Concepts of the request", body = ConceptListResponse),
        (status = 403, description = "Caller may not read this request"),
        (status = 404, description = "Role request not found")
    )
)]
pub async fn list_request_concepts(
    State(state): State<GovernanceState>,
    Extension(caller): Extension<CallerIdentity>,
    Path(id): Path<Uuid>,
) -> ApiResult<Json<ConceptListResponse>> {
    let concepts = state
        .concept_service
        .list_by_request(RoleRequestId::from(id), &caller.0)
        .await?;

    let items: Vec<ConceptResponse> = concepts.into_iter().map(Into::into).collect();
    let total = items.len();
    Ok(Json(ConceptListResponse { items, total }))
}

/// Evaluate the request-level incompatibility check.
#[utoipa::path(
    get,
    path = "/role-requests/{id}/incompatible-roles",
    tag = "Role Requests",
    params(
        ("id" = Uuid, Path, description = "Role request ID")
    ),
    responses(
        (status = 200, description = "Detected violations", body = ViolationListResponse),
        (status = 404, description = "Role request not found")
    )
)]
pub async fn get_request_incompatible_roles(
    State(state): State<GovernanceState>,
    Path(id): Path<Uuid>,
) -> ApiResult<Json<ViolationListResponse>> {
    let request_id = RoleRequestId::from(id);
    let request = state.request_service.get_request(request_id).await?;
    let violations = state
        .incompatible_service
        .check_request(request.applicant_id, request_id)
        .await?;
    Ok(Json(ViolationListResponse::from_violations(violations)))
}

/// Replicate a source identity's roles into the request as ADD concepts.
#[utoipa::path(
    post,
    path = "/role-requests/{id}/copy-roles",
    tag = "Role Requests",
    params(
        ("id" = Uuid, Path, description = "Role request ID")
    ),
    request_body = CopyRolesRequest,
    responses(
        (status = 201, description = "Created concepts", body = ConceptListResponse),
        (status = 404, description = "Request, identity or contract not found"),
        (status = 409, description = "Request is not editable")
    )
)]
pub async fn copy_roles(
    State(state): State<GovernanceState>,
    Extension(caller): Extension<CallerIdentity>,
    Path(id): Path<Uuid>,
    Json(request): Json<CopyRolesRequest>,
) -> ApiResult<(StatusCode, Json<ConceptListResponse>)> {
    request.validate()?;

    let created = state
        .request_service
        .copy_roles_by_identity(
            RoleRequestId::from(id),
            CopyRolesInput {
                source_identity_id: IdentityId::from(request.source_identity_id),
                target_contract_id: ContractId::from(request.target_contract_id),
                valid_from: request.valid_from,
                valid_till: request.valid_till,
                actor_id: Some(caller.0.identity_id.into_inner()),
            },
        )
        .await?;

    let items: Vec<ConceptResponse> = created.into_iter().map(Into::into).collect();
    let total = items.len();
    Ok((StatusCode::CREATED, Json(ConceptListResponse { items, total })))
}
