//! REST facade for role-request orchestration.
//!
//! Exposes the [`ryvos_governance`] services over HTTP:
//!
//! - Role-request drafts, start and cascading delete
//! - Concept upsert with deduplication and tri-state delete
//! - Role-composition and incompatible-role administration
//! - Request- and identity-level incompatibility checks
//! - Long-poll change notification with a periodic sweep job
//!
//! The caller is resolved from the `x-identity-id` / `x-identity-admin`
//! headers by [`router::caller_identity_middleware`], standing in for the
//! platform authentication layer.

pub mod error;
pub mod handlers;
pub mod jobs;
pub mod models;
pub mod router;

pub use error::{ApiGovernanceError, ApiResult, ErrorResponse};
pub use jobs::{LongPollSweepJob, DEFAULT_SWEEP_INTERVAL_SECS};
pub use router::{governance_router, CallerIdentity, GovernanceState, InMemoryStores};
