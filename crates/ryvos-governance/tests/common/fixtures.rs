//! Test fixtures factory for integration tests.
//!
//! Factory functions for creating test data with predictable names for
//! easier debugging.

use std::collections::HashMap;

use uuid::Uuid;
use ryvos_governance::services::{CreateRoleRequestInput, UpsertConceptInput};
use ryvos_governance::types::{
    ApplicantType, ConceptOperation, ContractId, IdentityId, RequestedByType, RoleId,
    RoleRequestId,
};

use super::TestContext;

/// Created entity IDs, keyed by the names used to create them.
#[derive(Debug, Default)]
pub struct TestFixtures {
    /// Created roles by name.
    pub roles: HashMap<String, RoleId>,
    /// Created identities by username.
    pub identities: HashMap<String, IdentityId>,
    /// Main contract per identity username.
    pub contracts: HashMap<String, ContractId>,
}

impl TestFixtures {
    /// Create a new empty fixtures container.
    pub fn new() -> Self {
        Self::default()
    }

    /// Get role ID by name, panics if not found.
    pub fn role(&self, name: &str) -> RoleId {
        *self.roles.get(name).unwrap_or_else(|| {
            panic!("Role '{}' not found in fixtures", name);
        })
    }

    /// Get identity ID by username, panics if not found.
    pub fn identity(&self, username: &str) -> IdentityId {
        *self.identities.get(username).unwrap_or_else(|| {
            panic!("Identity '{}' not found in fixtures", username);
        })
    }

    /// Get the main contract of an identity, panics if not found.
    pub fn contract(&self, username: &str) -> ContractId {
        *self.contracts.get(username).unwrap_or_else(|| {
            panic!("Contract for '{}' not found in fixtures", username);
        })
    }
}

/// Create roles and identities (each with a main contract) by name.
pub async fn seed(ctx: &TestContext, roles: &[&str], identities: &[&str]) -> TestFixtures {
    let mut fixtures = TestFixtures::new();
    for name in roles {
        let id = ctx.roles.add_named(name).await;
        fixtures.roles.insert((*name).to_string(), id);
    }
    for username in identities {
        let id = ctx.identities.add_named(username).await;
        let contract = ctx.contracts.add_main(id).await;
        fixtures.identities.insert((*username).to_string(), id);
        fixtures.contracts.insert((*username).to_string(), contract);
    }
    fixtures
}

/// Manual request-draft input for an applicant.
pub fn draft_input(applicant_id: IdentityId) -> CreateRoleRequestInput {
    CreateRoleRequestInput {
        applicant_id,
        applicant_type: ApplicantType::Identity,
        requested_by_type: RequestedByType::Manually,
        description: Some("integration test request".to_string()),
        actor_id: Some(Uuid::new_v4()),
    }
}

/// ADD-concept input targeting a contract.
pub fn add_concept_input(
    request_id: RoleRequestId,
    role_id: RoleId,
    contract_id: ContractId,
) -> UpsertConceptInput {
    UpsertConceptInput {
        id: None,
        role_request_id: request_id,
        operation: ConceptOperation::Add,
        role_id,
        contract_id: Some(contract_id),
        assigned_role_id: None,
        valid_from: None,
        valid_till: None,
        attributes: None,
        actor_id: None,
    }
}
