//! API error types for role-request endpoints.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;
use thiserror::Error;
use ryvos_governance::error::GovernanceError;

/// API error response body.
#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    /// Error code for client handling.
    pub error: String,
    /// Human-readable error message.
    pub message: String,
    /// Optional additional details.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<serde_json::Value>,
}

/// Role-request API error type.
#[derive(Debug, Error)]
pub enum ApiGovernanceError {
    /// Domain error from the governance crate.
    #[error(transparent)]
    Governance(#[from] GovernanceError),

    /// Validation error.
    #[error("Validation error: {0}")]
    Validation(String),

    /// Authentication required.
    #[error("Authentication required")]
    Unauthorized,

    /// Internal server error.
    #[error("Internal server error: {0}")]
    Internal(String),
}

impl IntoResponse for ApiGovernanceError {
    fn into_response(self) -> Response {
        let (status, error_code, message) = match &self {
            Self::Governance(e) => {
                if e.is_not_found() {
                    (StatusCode::NOT_FOUND, "not_found", e.to_string())
                } else if e.is_conflict() {
                    (StatusCode::CONFLICT, "conflict", e.to_string())
                } else if e.is_forbidden() {
                    (StatusCode::FORBIDDEN, "forbidden", e.to_string())
                } else if e.is_precondition_failed() {
                    (
                        StatusCode::PRECONDITION_FAILED,
                        "precondition_failed",
                        e.to_string(),
                    )
                } else {
                    match e {
                        GovernanceError::AutomaticRequestNotAllowed
                        | GovernanceError::ConceptTargetMissing(_)
                        | GovernanceError::SelfComposition(_)
                        | GovernanceError::SelfIncompatiblePair(_)
                        | GovernanceError::Validation(_) => {
                            (StatusCode::BAD_REQUEST, "validation_error", e.to_string())
                        }
                        _ => (
                            StatusCode::INTERNAL_SERVER_ERROR,
                            "internal_error",
                            e.to_string(),
                        ),
                    }
                }
            }
            Self::Validation(msg) => {
                (StatusCode::BAD_REQUEST, "validation_error", msg.clone())
            }
            Self::Unauthorized => (
                StatusCode::UNAUTHORIZED,
                "unauthorized",
                self.to_string(),
            ),
            Self::Internal(msg) => (
                StatusCode::INTERNAL_SERVER_ERROR,
                "internal_error",
                msg.clone(),
            ),
        };

        let body = ErrorResponse {
            error: error_code.to_string(),
            message,
            details: None,
        };
        (status, Json(body)).into_response()
    }
}

impl From<validator::ValidationErrors> for ApiGovernanceError {
    fn from(errors: validator::ValidationErrors) -> Self {
        Self::Validation(errors.to_string())
    }
}

/// Result type for API handlers.
pub type ApiResult<T> = std::result::Result<T, ApiGovernanceError>;
