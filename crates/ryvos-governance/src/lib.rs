//! Role-request orchestration domain logic.
//!
//! This crate provides the core domain logic for requesting role
//! assignments: a draft request collects proposed change-operations
//! (concepts), which are validated, deduplicated and dispatched to an
//! approval engine as one unit.
//!
//! # Features
//!
//! - Role request lifecycle from draft through execution or cancellation
//! - Concept change-operations (add/update/remove) with per-target
//!   deduplication
//! - Business-role flattening through an acyclic composition graph
//! - Incompatible-role pair registration and evaluation
//! - Long-poll notification of request state changes
//! - Audit logging for all request changes
//!
//! # Services
//!
//! The [`services`] module provides business logic for:
//! - [`services::RoleRequestService`] - Request lifecycle and cascading delete
//! - [`services::ConceptService`] - Concept upsert, dedup and tri-state delete
//! - [`services::RoleCompositionService`] - Business-role resolution
//! - [`services::IncompatibleRoleService`] - Incompatibility checks
//! - [`services::LongPollingManager`] - Blocking change notification
//!
//! # Audit
//!
//! The [`audit`] module provides audit logging:
//! - [`audit::AuditStore`] trait for pluggable storage backends
//! - [`audit::InMemoryAuditStore`] for testing
//! - [`audit::RoleRequestAuditEvent`] for tracking changes

pub mod audit;
pub mod error;
pub mod events;
pub mod services;
pub mod types;

// Re-export commonly used types
pub use error::{GovernanceError, Result};
pub use events::{
    ApprovalEngine, DeferredApprovalEngine, EventType, RoleRequestEvent,
    SynchronousApprovalEngine,
};
pub use types::{
    ApplicantType,
    AssignedRole,
    AssignedRoleId,
    CompositionId,
    ConceptId,
    ConceptOperation,
    ConceptRoleRequest,
    ConceptState,
    ContractId,
    Identity,
    IdentityContract,
    IdentityId,
    IncompatibleRole,
    IncompatibleRoleId,
    OperationResult,
    OperationState,
    RequestPriority,
    RequestedByType,
    Role,
    RoleComposition,
    RoleId,
    RoleRequest,
    RoleRequestId,
    RoleRequestState,
    WatchedEntityType,
};

// Re-export service types
pub use services::{
    AccessChecker,
    ApplicantAccessChecker,
    ConceptService,
    ConceptStore,
    CopyRolesInput,
    CreateCompositionInput,
    CreateIncompatibleRoleInput,
    CreateRoleRequestInput,
    DeletionPolicy,
    IncompatibleRoleService,
    IncompatibleRoleViolation,
    LongPollingManager,
    RequestDeleteStats,
    RoleCompositionService,
    RoleRequestService,
    RoleRequestStore,
    Subject,
    UpsertConceptInput,
};
