//! Response models for the long-poll check endpoint.

use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use ryvos_governance::types::{OperationResult, OperationState};

/// Result of a check-unresolved-request long poll.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct UnresolvedCheckResponse {
    /// Aggregate outcome: `executed`, `running`, `not_executed` or
    /// `blocked`.
    pub state: OperationState,

    /// Optional machine-readable code.
    pub code: Option<String>,

    /// Optional human-readable message.
    pub message: Option<String>,
}

impl From<OperationResult> for UnresolvedCheckResponse {
    fn from(result: OperationResult) -> Self {
        Self {
            state: result.state,
            code: result.code,
            message: result.message,
        }
    }
}
