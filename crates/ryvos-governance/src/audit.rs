//! Audit logging for role-request changes.
//!
//! Every mutating service operation records an event through [`AuditStore`].
//! The store trait keeps the backend pluggable; [`InMemoryAuditStore`] backs
//! tests and embedded deployments.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tokio::sync::RwLock;
use uuid::Uuid;

use crate::error::Result;
use crate::types::RoleRequestId;

/// Kind of audited change.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RoleRequestAuditAction {
    /// A request draft was created.
    #[default]
    RequestCreated,
    /// A request was updated.
    RequestUpdated,
    /// A request was dispatched to the approval engine.
    RequestStarted,
    /// A request finished execution.
    RequestExecuted,
    /// A request was canceled.
    RequestCanceled,
    /// A request draft was removed.
    RequestDeleted,
    /// A concept was created.
    ConceptCreated,
    /// A concept was updated.
    ConceptUpdated,
    /// A concept was physically removed.
    ConceptDeleted,
    /// A concept was soft-canceled.
    ConceptCanceled,
    /// A composition edge was created.
    CompositionCreated,
    /// A composition edge was removed.
    CompositionDeleted,
    /// An incompatible-role rule was created.
    IncompatibleRoleCreated,
    /// An incompatible-role rule was removed.
    IncompatibleRoleDeleted,
}

/// A recorded audit event.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RoleRequestAuditEvent {
    /// Unique identifier.
    pub id: Uuid,
    /// What happened.
    pub action: RoleRequestAuditAction,
    /// Who did it, when known.
    pub actor_id: Option<Uuid>,
    /// Affected request, when applicable.
    pub request_id: Option<RoleRequestId>,
    /// Entity snapshot before the change.
    pub before_state: Option<serde_json::Value>,
    /// Entity snapshot after the change.
    pub after_state: Option<serde_json::Value>,
    /// Free-form context.
    pub metadata: Option<serde_json::Value>,
    /// When the event happened.
    pub occurred_at: DateTime<Utc>,
}

/// Input for recording an audit event.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RoleRequestAuditEventInput {
    /// What happened.
    pub action: RoleRequestAuditAction,
    /// Who did it, when known.
    pub actor_id: Option<Uuid>,
    /// Affected request, when applicable.
    pub request_id: Option<RoleRequestId>,
    /// Entity snapshot before the change.
    pub before_state: Option<serde_json::Value>,
    /// Entity snapshot after the change.
    pub after_state: Option<serde_json::Value>,
    /// Free-form context.
    pub metadata: Option<serde_json::Value>,
}

/// Trait for audit storage backends.
#[async_trait::async_trait]
pub trait AuditStore: Send + Sync {
    /// Record an event.
    async fn log_event(&self, input: RoleRequestAuditEventInput) -> Result<RoleRequestAuditEvent>;
}

/// In-memory audit store for testing and embedded use.
#[derive(Debug, Default)]
pub struct InMemoryAuditStore {
    events: Arc<RwLock<Vec<RoleRequestAuditEvent>>>,
}

impl InMemoryAuditStore {
    /// Create a new in-memory store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of recorded events.
    pub async fn count(&self) -> usize {
        self.events.read().await.len()
    }

    /// Clear all recorded events.
    pub async fn clear(&self) {
        self.events.write().await.clear();
    }

    /// Events recorded for a request, oldest first.
    pub async fn by_request(&self, request_id: RoleRequestId) -> Vec<RoleRequestAuditEvent> {
        self.events
            .read()
            .await
            .iter()
            .filter(|e| e.request_id == Some(request_id))
            .cloned()
            .collect()
    }
}

#[async_trait::async_trait]
impl AuditStore for InMemoryAuditStore {
    async fn log_event(&self, input: RoleRequestAuditEventInput) -> Result<RoleRequestAuditEvent> {
        let event = RoleRequestAuditEvent {
            id: Uuid::new_v4(),
            action: input.action,
            actor_id: input.actor_id,
            request_id: input.request_id,
            before_state: input.before_state,
            after_state: input.after_state,
            metadata: input.metadata,
            occurred_at: Utc::now(),
        };

        self.events.write().await.push(event.clone());
        Ok(event)
    }
}
