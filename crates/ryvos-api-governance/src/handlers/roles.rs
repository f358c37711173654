//! Composition and incompatible-role handlers.

use axum::{
    extract::{Path, State},
    http::StatusCode,
    Extension, Json,
};
use uuid::Uuid;
use validator::Validate;

use ryvos_governance::services::{CreateCompositionInput, CreateIncompatibleRoleInput};
use ryvos_governance::types::{CompositionId, IncompatibleRoleId, RoleId};

use crate::error::ApiResult;
use crate::models::{
    CompositionListResponse, CompositionResponse, CreateCompositionRequest,
    CreateIncompatibleRoleRequest, IncompatibleRoleListResponse, IncompatibleRoleResponse,
};
use crate::router::{CallerIdentity, GovernanceState};

/// Create a role-composition edge.
#[utoipa::path(
    post,
    path = "/role-compositions",
    tag = "Roles",
    request_body = CreateCompositionRequest,
    responses(
        (status = 201, description = "Edge created", body = CompositionResponse),
        (status = 400, description = "Self-composition"),
        (status = 404, description = "Role not found"),
        (status = 409, description = "Duplicate edge or cycle")
    )
)]
pub async fn create_composition(
    State(state): State<GovernanceState>,
    Extension(caller): Extension<CallerIdentity>,
    Json(request): Json<CreateCompositionRequest>,
) -> ApiResult<(StatusCode, Json<CompositionResponse>)> {
    request.validate()?;

    let edge = state
        .composition_service
        .create_composition(CreateCompositionInput {
            superior_id: RoleId::from(request.superior_id),
            sub_id: RoleId::from(request.sub_id),
            created_by: Some(caller.0.identity_id.into_inner()),
        })
        .await?;

    Ok((StatusCode::CREATED, Json(edge.into())))
}

/// Delete a role-composition edge.
#[utoipa::path(
    delete,
    path = "/role-compositions/{id}",
    tag = "Roles",
    params(
        ("id" = Uuid, Path, description = "Composition ID")
    ),
    responses(
        (status = 204, description = "Edge deleted"),
        (status = 404, description = "Composition not found")
    )
)]
pub async fn delete_composition(
    State(state): State<GovernanceState>,
    Path(id): Path<Uuid>,
) -> ApiResult<StatusCode> {
    state
        .composition_service
        .delete_composition(CompositionId::from(id))
        .await?;
    Ok(StatusCode::NO_CONTENT)
}

/// List the composition edges reachable from a role, direct and
/// transitive.
#[utoipa::path(
    get,
    path = "/roles/{id}/sub-roles",
    tag = "Roles",
    params(
        ("id" = Uuid, Path, description = "Role ID")
    ),
    responses(
        (status = 200, description = "Reachable edges", body = CompositionListResponse),
        (status = 409, description = "Stored graph contains a cycle")
    )
)]
pub async fn list_sub_roles(
    State(state): State<GovernanceState>,
    Path(id): Path<Uuid>,
) -> ApiResult<Json<CompositionListResponse>> {
    let edges = state
        .composition_service
        .resolve_sub_roles(RoleId::from(id))
        .await?;

    let items: Vec<CompositionResponse> = edges.into_iter().map(Into::into).collect();
    let total = items.len();
    Ok(Json(CompositionListResponse { items, total }))
}

/// Register an incompatible-role pair.
#[utoipa::path(
    post,
    path = "/incompatible-roles",
    tag = "Roles",
    request_body = CreateIncompatibleRoleRequest,
    responses(
        (status = 201, description = "Pair registered", body = IncompatibleRoleResponse),
        (status = 400, description = "Self-pair"),
        (status = 404, description = "Role not found"),
        (status = 409, description = "Pair already registered")
    )
)]
pub async fn create_incompatible_role(
    State(state): State<GovernanceState>,
    Extension(caller): Extension<CallerIdentity>,
    Json(request): Json<CreateIncompatibleRoleRequest>,
) -> ApiResult<(StatusCode, Json<IncompatibleRoleResponse>)> {
    request.validate()?;

    let pair = state
        .incompatible_service
        .create_incompatible_role(CreateIncompatibleRoleInput {
            superior_id: RoleId::from(request.superior_id),
            sub_id: RoleId::from(request.sub_id),
            created_by: Some(caller.0.identity_id.into_inner()),
        })
        .await?;

    Ok((StatusCode::CREATED, Json(pair.into())))
}

/// List every registered incompatible-role pair.
#[utoipa::path(
    get,
    path = "/incompatible-roles",
    tag = "Roles",
    responses(
        (status = 200, description = "Registered pairs", body = IncompatibleRoleListResponse)
    )
)]
pub async fn list_incompatible_roles(
    State(state): State<GovernanceState>,
) -> ApiResult<Json<IncompatibleRoleListResponse>> {
    let pairs = state.incompatible_service.list_incompatible_roles().await?;

    let items: Vec<IncompatibleRoleResponse> = pairs.into_iter().map(Into::into).collect();
    let total = items.len();
    Ok(Json(IncompatibleRoleListResponse { items, total }))
}

/// Remove an incompatible-role pair.
#[utoipa::path(
    delete,
    path = "/incompatible-roles/{id}",
    tag = "Roles",
    params(
        ("id" = Uuid, Path, description = "Incompatible role ID")
    ),
    responses(
        (status = 204, description = "Pair removed"),
        (status = 404, description = "Pair not found")
    )
)]
pub async fn delete_incompatible_role(
    State(state): State<GovernanceState>,
    Path(id): Path<Uuid>,
) -> ApiResult<StatusCode> {
    state
        .incompatible_service
        .delete_incompatible_role(IncompatibleRoleId::from(id))
        .await?;
    Ok(StatusCode::NO_CONTENT)
}
