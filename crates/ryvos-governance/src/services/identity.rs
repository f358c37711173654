//! Read-side stores for roles, identities, contracts and assignments.
//!
//! These model the identity/role read services the orchestration core
//! consumes. Only lookups are part of the contract; the in-memory
//! implementations expose inherent mutators for wiring and tests.

use std::collections::HashMap;
use std::sync::Arc;

use tokio::sync::RwLock;

use crate::error::Result;
use crate::types::{
    AssignedRole, AssignedRoleId, ContractId, Identity, IdentityContract, IdentityId, Role, RoleId,
};

// ============================================================================
// Store Traits
// ============================================================================

/// Role lookups.
#[async_trait::async_trait]
pub trait RoleStore: Send + Sync {
    /// Get a role by ID.
    async fn get(&self, id: RoleId) -> Result<Option<Role>>;
}

/// Identity lookups.
#[async_trait::async_trait]
pub trait IdentityStore: Send + Sync {
    /// Get an identity by ID.
    async fn get(&self, id: IdentityId) -> Result<Option<Identity>>;
}

/// Contract lookups.
#[async_trait::async_trait]
pub trait ContractStore: Send + Sync {
    /// Get a contract by ID.
    async fn get(&self, id: ContractId) -> Result<Option<IdentityContract>>;

    /// List an identity's contracts.
    async fn list_by_identity(&self, identity_id: IdentityId) -> Result<Vec<IdentityContract>>;
}

/// Role-assignment lookups.
#[async_trait::async_trait]
pub trait AssignedRoleStore: Send + Sync {
    /// Get an assignment by ID.
    async fn get(&self, id: AssignedRoleId) -> Result<Option<AssignedRole>>;

    /// List all assignments of an identity.
    async fn list_by_identity(&self, identity_id: IdentityId) -> Result<Vec<AssignedRole>>;

    /// List all assignments on a contract.
    async fn list_by_contract(&self, contract_id: ContractId) -> Result<Vec<AssignedRole>>;
}

// ============================================================================
// In-Memory Stores
// ============================================================================

/// In-memory role store.
#[derive(Debug, Default)]
pub struct InMemoryRoleStore {
    roles: Arc<RwLock<HashMap<RoleId, Role>>>,
}

impl InMemoryRoleStore {
    /// Create a new in-memory store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Add or replace a role.
    pub async fn add(&self, role: Role) {
        self.roles.write().await.insert(role.id, role);
    }

    /// Convenience: create and add a named role, returning its ID.
    pub async fn add_named(&self, name: &str) -> RoleId {
        let role = Role {
            id: RoleId::new(),
            name: name.to_string(),
        };
        let id = role.id;
        self.add(role).await;
        id
    }
}

#[async_trait::async_trait]
impl RoleStore for InMemoryRoleStore {
    async fn get(&self, id: RoleId) -> Result<Option<Role>> {
        Ok(self.roles.read().await.get(&id).cloned())
    }
}

/// In-memory identity store.
#[derive(Debug, Default)]
pub struct InMemoryIdentityStore {
    identities: Arc<RwLock<HashMap<IdentityId, Identity>>>,
}

impl InMemoryIdentityStore {
    /// Create a new in-memory store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Add or replace an identity.
    pub async fn add(&self, identity: Identity) {
        self.identities
            .write()
            .await
            .insert(identity.id, identity);
    }

    /// Convenience: create and add an enabled identity, returning its ID.
    pub async fn add_named(&self, username: &str) -> IdentityId {
        let identity = Identity {
            id: IdentityId::new(),
            username: username.to_string(),
            disabled: false,
        };
        let id = identity.id;
        self.add(identity).await;
        id
    }

    /// Flip an identity's disabled flag.
    pub async fn set_disabled(&self, id: IdentityId, disabled: bool) {
        if let Some(identity) = self.identities.write().await.get_mut(&id) {
            identity.disabled = disabled;
        }
    }
}

#[async_trait::async_trait]
impl IdentityStore for InMemoryIdentityStore {
    async fn get(&self, id: IdentityId) -> Result<Option<Identity>> {
        Ok(self.identities.read().await.get(&id).cloned())
    }
}

/// In-memory contract store.
#[derive(Debug, Default)]
pub struct InMemoryContractStore {
    contracts: Arc<RwLock<HashMap<ContractId, IdentityContract>>>,
}

impl InMemoryContractStore {
    /// Create a new in-memory store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Add or replace a contract.
    pub async fn add(&self, contract: IdentityContract) {
        self.contracts.write().await.insert(contract.id, contract);
    }

    /// Convenience: create and add a main contract for an identity.
    pub async fn add_main(&self, identity_id: IdentityId) -> ContractId {
        let contract = IdentityContract {
            id: ContractId::new(),
            identity_id,
            main: true,
        };
        let id = contract.id;
        self.add(contract).await;
        id
    }
}

#[async_trait::async_trait]
impl ContractStore for InMemoryContractStore {
    async fn get(&self, id: ContractId) -> Result<Option<IdentityContract>> {
        Ok(self.contracts.read().await.get(&id).cloned())
    }

    async fn list_by_identity(&self, identity_id: IdentityId) -> Result<Vec<IdentityContract>> {
        Ok(self
            .contracts
            .read()
            .await
            .values()
            .filter(|c| c.identity_id == identity_id)
            .cloned()
            .collect())
    }
}

/// In-memory assigned-role store.
#[derive(Debug, Default)]
pub struct InMemoryAssignedRoleStore {
    assignments: Arc<RwLock<HashMap<AssignedRoleId, AssignedRole>>>,
}

impl InMemoryAssignedRoleStore {
    /// Create a new in-memory store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Add or replace an assignment.
    pub async fn add(&self, assignment: AssignedRole) {
        self.assignments
            .write()
            .await
            .insert(assignment.id, assignment);
    }

    /// Convenience: assign a role to a contract, returning the assignment ID.
    pub async fn assign(
        &self,
        identity_id: IdentityId,
        contract_id: ContractId,
        role_id: RoleId,
    ) -> AssignedRoleId {
        let assignment = AssignedRole {
            id: AssignedRoleId::new(),
            identity_id,
            contract_id,
            role_id,
            valid_from: None,
            valid_till: None,
        };
        let id = assignment.id;
        self.add(assignment).await;
        id
    }

    /// Remove an assignment.
    pub async fn remove(&self, id: AssignedRoleId) -> bool {
        self.assignments.write().await.remove(&id).is_some()
    }
}

#[async_trait::async_trait]
impl AssignedRoleStore for InMemoryAssignedRoleStore {
    async fn get(&self, id: AssignedRoleId) -> Result<Option<AssignedRole>> {
        Ok(self.assignments.read().await.get(&id).cloned())
    }

    async fn list_by_identity(&self, identity_id: IdentityId) -> Result<Vec<AssignedRole>> {
        Ok(self
            .assignments
            .read()
            .await
            .values()
            .filter(|a| a.identity_id == identity_id)
            .cloned()
            .collect())
    }

    async fn list_by_contract(&self, contract_id: ContractId) -> Result<Vec<AssignedRole>> {
        Ok(self
            .assignments
            .read()
            .await
            .values()
            .filter(|a| a.contract_id == contract_id)
            .cloned()
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_assignment_lookup_by_identity_and_contract() {
        let identities = InMemoryIdentityStore::new();
        let contracts = InMemoryContractStore::new();
        let roles = InMemoryRoleStore::new();
        let assignments = InMemoryAssignedRoleStore::new();

        let alice = identities.add_named("alice").await;
        let contract = contracts.add_main(alice).await;
        let role = roles.add_named("auditor").await;
        let assignment_id = assignments.assign(alice, contract, role).await;

        let by_identity = assignments.list_by_identity(alice).await.unwrap();
        assert_eq!(by_identity.len(), 1);
        assert_eq!(by_identity[0].id, assignment_id);

        let by_contract = assignments.list_by_contract(contract).await.unwrap();
        assert_eq!(by_contract.len(), 1);

        let other = assignments
            .list_by_identity(IdentityId::new())
            .await
            .unwrap();
        assert!(other.is_empty());
    }

    #[tokio::test]
    async fn test_set_disabled() {
        let identities = InMemoryIdentityStore::new();
        let alice = identities.add_named("alice").await;

        identities.set_disabled(alice, true).await;
        let found = identities.get(alice).await.unwrap().unwrap();
        assert!(found.disabled);
    }
}
