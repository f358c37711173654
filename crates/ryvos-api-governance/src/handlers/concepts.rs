//! Concept handlers.

use axum::{
    extract::{Path, State},
    http::StatusCode,
    Extension, Json,
};
use uuid::Uuid;
use validator::Validate;

use ryvos_governance::services::UpsertConceptInput;
use ryvos_governance::types::{AssignedRoleId, ConceptId, ContractId, RoleId, RoleRequestId};

use crate::error::ApiResult;
use crate::models::{ConceptDeleteResponse, ConceptResponse, UpsertConceptRequest};
use crate::router::{CallerIdentity, GovernanceState};

/// Create or update a concept, deduplicating non-ADD operations against the
/// same target.
#[utoipa::path(
    post,
    path = "/concept-role-requests",
    tag = "Concepts",
    request_body = UpsertConceptRequest,
    responses(
        (status = 201, description = "Concept stored", body = ConceptResponse),
        (status = 400, description = "Missing target for the operation"),
        (status = 404, description = "Request or concept not found"),
        (status = 409, description = "Owning request is not editable")
    )
)]
pub async fn upsert_concept(
    State(state): State<GovernanceState>,
    Extension(caller): Extension<CallerIdentity>,
    Json(request): Json<UpsertConceptRequest>,
) -> ApiResult<(StatusCode, Json<ConceptResponse>)> {
    request.validate()?;

    let concept = state
        .concept_service
        .upsert_concept(UpsertConceptInput {
            id: request.id.map(ConceptId::from),
            role_request_id: RoleRequestId::from(request.role_request_id),
            operation: request.operation,
            role_id: RoleId::from(request.role_id),
            contract_id: request.contract_id.map(ContractId::from),
            assigned_role_id: request.assigned_role_id.map(AssignedRoleId::from),
            valid_from: request.valid_from,
            valid_till: request.valid_till,
            attributes: request.attributes,
            actor_id: Some(caller.0.identity_id.into_inner()),
        })
        .await?;

    Ok((StatusCode::CREATED, Json(concept.into())))
}

/// Get a concept by ID.
#[utoipa::path(
    get,
    path = "/concept-role-requests/{id}",
    tag = "Concepts",
    params(
        ("id" = Uuid, Path, description = "Concept ID")
    ),
    responses(
        (status = 200, description = "Concept details", body = ConceptResponse),
        (status = 404, description = "Concept not found")
    )
)]
pub async fn get_concept(
    State(state): State<GovernanceState>,
    Path(id): Path<Uuid>,
) -> ApiResult<Json<ConceptResponse>> {
    let concept = state
        .concept_service
        .get_concept(ConceptId::from(id))
        .await?;
    Ok(Json(concept.into()))
}

/// Delete a concept.
///
/// Drafts are removed, mid-flight concepts are soft-canceled and concepts
/// of executed requests are rejected with a conflict.
#[utoipa::path(
    delete,
    path = "/concept-role-requests/{id}",
    tag = "Concepts",
    params(
        ("id" = Uuid, Path, description = "Concept ID")
    ),
    responses(
        (status = 200, description = "Applied outcome", body = ConceptDeleteResponse),
        (status = 404, description = "Concept not found"),
        (status = 409, description = "Owning request is executed")
    )
)]
pub async fn delete_concept(
    State(state): State<GovernanceState>,
    Extension(caller): Extension<CallerIdentity>,
    Path(id): Path<Uuid>,
) -> ApiResult<Json<ConceptDeleteResponse>> {
    let policy = state
        .concept_service
        .delete_concept(
            ConceptId::from(id),
            Some(caller.0.identity_id.into_inner()),
        )
        .await?;
    Ok(Json(policy.into()))
}
