//! Event contract between the state machine and the approval engine.
//!
//! The engine is an external collaborator: it receives a typed event and
//! returns the request in whatever state resulted. Non-terminal results mean
//! "accepted, pending" and are observed later through long polling.

use serde::{Deserialize, Serialize};

use crate::error::Result;
use crate::types::{RequestPriority, RoleRequest, RoleRequestState};

/// Kind of event dispatched to the approval engine.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
#[non_exhaustive]
pub enum EventType {
    /// Validate and execute the request's concepts.
    Execute,
}

/// A typed event carrying a role request to the approval engine.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RoleRequestEvent {
    /// What the engine should do.
    pub event_type: EventType,
    /// The request payload.
    pub content: RoleRequest,
    /// Queue priority.
    pub priority: RequestPriority,
    /// Whether the engine must re-verify the starter's authorization.
    pub check_right: bool,
}

impl RoleRequestEvent {
    /// Build an execute event.
    pub fn execute(content: RoleRequest, priority: RequestPriority, check_right: bool) -> Self {
        Self {
            event_type: EventType::Execute,
            content,
            priority,
            check_right,
        }
    }
}

/// External approval/execution collaborator.
#[async_trait::async_trait]
pub trait ApprovalEngine: Send + Sync {
    /// Process an event, returning the request in its resulting state.
    async fn dispatch(&self, event: RoleRequestEvent) -> Result<RoleRequest>;
}

/// Engine that approves and executes immediately, with no approval steps.
///
/// Used where no workflow is configured: the request goes straight to
/// `Executed` in the dispatch call.
#[derive(Debug, Default)]
pub struct SynchronousApprovalEngine;

impl SynchronousApprovalEngine {
    /// Create a new engine.
    pub fn new() -> Self {
        Self
    }
}

#[async_trait::async_trait]
impl ApprovalEngine for SynchronousApprovalEngine {
    async fn dispatch(&self, event: RoleRequestEvent) -> Result<RoleRequest> {
        let mut request = event.content;
        request.state = RoleRequestState::Executed;
        request.executed = true;
        Ok(request)
    }
}

/// Engine that accepts the event and leaves the request pending.
///
/// Models a deployment where approval happens out of band; the request stays
/// `InProgress` until some external actor resolves it.
#[derive(Debug, Default)]
pub struct DeferredApprovalEngine;

impl DeferredApprovalEngine {
    /// Create a new engine.
    pub fn new() -> Self {
        Self
    }
}

#[async_trait::async_trait]
impl ApprovalEngine for DeferredApprovalEngine {
    async fn dispatch(&self, event: RoleRequestEvent) -> Result<RoleRequest> {
        Ok(event.content)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{
        ApplicantType, IdentityId, RequestedByType, RoleRequestId, RoleRequestState,
    };
    use chrono::Utc;

    fn draft_request() -> RoleRequest {
        RoleRequest {
            id: RoleRequestId::new(),
            applicant_id: IdentityId::new(),
            applicant_type: ApplicantType::Identity,
            state: RoleRequestState::InProgress,
            executed: false,
            priority: RequestPriority::Normal,
            requested_by_type: RequestedByType::Manually,
            description: None,
            result: None,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }

    #[tokio::test]
    async fn test_synchronous_engine_executes() {
        let engine = SynchronousApprovalEngine::new();
        let event = RoleRequestEvent::execute(draft_request(), RequestPriority::High, true);

        let result = engine.dispatch(event).await.unwrap();
        assert_eq!(result.state, RoleRequestState::Executed);
        assert!(result.executed);
    }

    #[tokio::test]
    async fn test_deferred_engine_leaves_request_pending() {
        let engine = DeferredApprovalEngine::new();
        let event = RoleRequestEvent::execute(draft_request(), RequestPriority::High, false);

        let result = engine.dispatch(event).await.unwrap();
        assert_eq!(result.state, RoleRequestState::InProgress);
        assert!(!result.executed);
    }
}
