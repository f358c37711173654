//! Authorization seam for request-scoped permission checks.
//!
//! Concepts have no independent ownership semantics, so every permission
//! check runs against the owning request. The checker is a collaborator the
//! core does not own; deployments plug in their own policy.

use crate::error::{GovernanceError, Result};
use crate::types::{IdentityId, RoleRequest};

/// Permission evaluated against a role request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RoleRequestPermission {
    /// Read the request and its concepts.
    Read,
    /// Modify the draft.
    Update,
    /// Delete / cancel the request.
    Delete,
    /// Start the request.
    Execute,
}

/// The authenticated caller.
#[derive(Debug, Clone, Copy)]
pub struct Subject {
    /// Caller identity.
    pub identity_id: IdentityId,
    /// Whether the caller holds the administer-all-requests authority.
    pub admin: bool,
}

impl Subject {
    /// Regular subject.
    pub fn user(identity_id: IdentityId) -> Self {
        Self {
            identity_id,
            admin: false,
        }
    }

    /// Subject with the administer-all-requests authority.
    pub fn admin(identity_id: IdentityId) -> Self {
        Self {
            identity_id,
            admin: true,
        }
    }
}

/// Permission/authorization checker.
pub trait AccessChecker: Send + Sync {
    /// Check a permission, failing with [`GovernanceError::Forbidden`].
    fn check(
        &self,
        subject: &Subject,
        request: &RoleRequest,
        permission: RoleRequestPermission,
    ) -> Result<()>;
}

/// Default policy: admins may do anything, applicants may act on their own
/// requests.
#[derive(Debug, Default)]
pub struct ApplicantAccessChecker;

impl ApplicantAccessChecker {
    /// Create a new checker.
    pub fn new() -> Self {
        Self
    }
}

impl AccessChecker for ApplicantAccessChecker {
    fn check(
        &self,
        subject: &Subject,
        request: &RoleRequest,
        permission: RoleRequestPermission,
    ) -> Result<()> {
        if subject.admin || subject.identity_id == request.applicant_id {
            return Ok(());
        }
        Err(GovernanceError::Forbidden(format!(
            "subject {} lacks {permission:?} on request {}",
            subject.identity_id, request.id
        )))
    }
}

/// Checker that allows everything; test wiring only.
#[derive(Debug, Default)]
pub struct AllowAllAccessChecker;

impl AllowAllAccessChecker {
    /// Create a new checker.
    pub fn new() -> Self {
        Self
    }
}

impl AccessChecker for AllowAllAccessChecker {
    fn check(&self, _: &Subject, _: &RoleRequest, _: RoleRequestPermission) -> Result<()> {
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{
        ApplicantType, RequestPriority, RequestedByType, RoleRequestId, RoleRequestState,
    };
    use chrono::Utc;

    fn request_for(applicant_id: IdentityId) -> RoleRequest {
        RoleRequest {
            id: RoleRequestId::new(),
            applicant_id,
            applicant_type: ApplicantType::Identity,
            state: RoleRequestState::Concept,
            executed: false,
            priority: RequestPriority::Normal,
            requested_by_type: RequestedByType::Manually,
            description: None,
            result: None,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }

    #[test]
    fn test_applicant_may_read_own_request() {
        let checker = ApplicantAccessChecker::new();
        let applicant = IdentityId::new();
        let request = request_for(applicant);

        assert!(checker
            .check(
                &Subject::user(applicant),
                &request,
                RoleRequestPermission::Read
            )
            .is_ok());
    }

    #[test]
    fn test_stranger_is_rejected_admin_is_not() {
        let checker = ApplicantAccessChecker::new();
        let request = request_for(IdentityId::new());
        let stranger = IdentityId::new();

        let denied = checker.check(
            &Subject::user(stranger),
            &request,
            RoleRequestPermission::Read,
        );
        assert!(matches!(denied, Err(GovernanceError::Forbidden(_))));

        assert!(checker
            .check(
                &Subject::admin(stranger),
                &request,
                RoleRequestPermission::Delete
            )
            .is_ok());
    }
}
