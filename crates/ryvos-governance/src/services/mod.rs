//! Service layer for role-request orchestration.
//!
//! This module provides the business logic around role requests: draft
//! concepts with deduplication, business-role composition, incompatible-role
//! evaluation, the request state machine and long-poll notification.

pub mod access;
pub mod composition;
pub mod concept;
pub mod identity;
pub mod incompatible;
pub mod long_polling;
pub mod request;

// Re-export commonly used types
pub use access::{
    AccessChecker, AllowAllAccessChecker, ApplicantAccessChecker, RoleRequestPermission, Subject,
};
pub use composition::{
    CreateCompositionInput, InMemoryRoleCompositionStore, RoleCompositionService,
    RoleCompositionStore,
};
pub use concept::{
    deletion_policy, ConceptService, ConceptStore, DeletionPolicy, InMemoryConceptStore,
    RequestLockRegistry, UpsertConceptInput,
};
pub use identity::{
    AssignedRoleStore, ContractStore, IdentityStore, InMemoryAssignedRoleStore,
    InMemoryContractStore, InMemoryIdentityStore, InMemoryRoleStore, RoleStore,
};
pub use incompatible::{
    CreateIncompatibleRoleInput, IncompatibleRoleService, IncompatibleRoleStore,
    IncompatibleRoleViolation, InMemoryIncompatibleRoleStore,
};
pub use long_polling::{
    LongPollingManager, SubscriberKey, SweepStats, DEFAULT_TIMEOUT_SECS,
};
pub use request::{
    CopyRolesInput, CreateRoleRequestInput, InMemoryRoleRequestStore, RequestDeleteStats,
    RoleRequestService, RoleRequestStore,
};
