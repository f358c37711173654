//! Role composition resolver.
//!
//! Business roles are composed of sub roles through a directed acyclic
//! graph of composition edges. Acyclicity is enforced when an edge is
//! created; resolution still re-checks defensively, because a cycle in the
//! stored graph means the data is corrupted.

use std::collections::{HashMap, HashSet, VecDeque};
use std::sync::Arc;

use chrono::Utc;
use serde::{Deserialize, Serialize};
use tokio::sync::RwLock;
use uuid::Uuid;

use crate::audit::{AuditStore, RoleRequestAuditAction, RoleRequestAuditEventInput};
use crate::error::{GovernanceError, Result};
use crate::services::identity::RoleStore;
use crate::types::{CompositionId, RoleComposition, RoleId};

// ============================================================================
// Store Trait
// ============================================================================

/// Trait for role-composition storage backends.
#[async_trait::async_trait]
pub trait RoleCompositionStore: Send + Sync {
    /// Get an edge by ID.
    async fn get(&self, id: CompositionId) -> Result<Option<RoleComposition>>;

    /// Insert an edge.
    async fn insert(&self, composition: RoleComposition) -> Result<()>;

    /// Delete an edge.
    async fn delete(&self, id: CompositionId) -> Result<bool>;

    /// List direct sub-role edges of a superior role.
    async fn list_by_superior(&self, superior_id: RoleId) -> Result<Vec<RoleComposition>>;

    /// Whether the exact directed edge exists.
    async fn exists(&self, superior_id: RoleId, sub_id: RoleId) -> Result<bool>;
}

// ============================================================================
// In-Memory Store
// ============================================================================

/// In-memory composition store for testing and embedded use.
#[derive(Debug, Default)]
pub struct InMemoryRoleCompositionStore {
    edges: Arc<RwLock<HashMap<CompositionId, RoleComposition>>>,
}

impl InMemoryRoleCompositionStore {
    /// Create a new in-memory store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of stored edges.
    pub async fn count(&self) -> usize {
        self.edges.read().await.len()
    }
}

#[async_trait::async_trait]
impl RoleCompositionStore for InMemoryRoleCompositionStore {
    async fn get(&self, id: CompositionId) -> Result<Option<RoleComposition>> {
        Ok(self.edges.read().await.get(&id).cloned())
    }

    async fn insert(&self, composition: RoleComposition) -> Result<()> {
        self.edges
            .write()
            .await
            .insert(composition.id, composition);
        Ok(())
    }

    async fn delete(&self, id: CompositionId) -> Result<bool> {
        Ok(self.edges.write().await.remove(&id).is_some())
    }

    async fn list_by_superior(&self, superior_id: RoleId) -> Result<Vec<RoleComposition>> {
        let mut edges: Vec<RoleComposition> = self
            .edges
            .read()
            .await
            .values()
            .filter(|e| e.superior_id == superior_id)
            .cloned()
            .collect();
        edges.sort_by_key(|e| e.sub_id);
        Ok(edges)
    }

    async fn exists(&self, superior_id: RoleId, sub_id: RoleId) -> Result<bool> {
        Ok(self
            .edges
            .read()
            .await
            .values()
            .any(|e| e.superior_id == superior_id && e.sub_id == sub_id))
    }
}

// ============================================================================
// Service
// ============================================================================

/// Input for creating a composition edge.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateCompositionInput {
    /// Superior (business) role.
    pub superior_id: RoleId,
    /// Granted sub role.
    pub sub_id: RoleId,
    /// Who is creating the edge.
    pub created_by: Option<Uuid>,
}

/// Service resolving business roles through the composition graph.
pub struct RoleCompositionService {
    store: Arc<dyn RoleCompositionStore>,
    role_store: Arc<dyn RoleStore>,
    audit_store: Arc<dyn AuditStore>,
}

impl RoleCompositionService {
    /// Create a new composition service.
    pub fn new(
        store: Arc<dyn RoleCompositionStore>,
        role_store: Arc<dyn RoleStore>,
        audit_store: Arc<dyn AuditStore>,
    ) -> Self {
        Self {
            store,
            role_store,
            audit_store,
        }
    }

    /// Create a composition edge.
    ///
    /// Rejects self-composition, duplicates and edges that would close a
    /// cycle. The cycle check runs here, at creation time, so resolution can
    /// rely on an acyclic graph.
    pub async fn create_composition(
        &self,
        input: CreateCompositionInput,
    ) -> Result<RoleComposition> {
        if input.superior_id == input.sub_id {
            return Err(GovernanceError::SelfComposition(
                input.superior_id.into_inner(),
            ));
        }

        self.verify_role_exists(input.superior_id).await?;
        self.verify_role_exists(input.sub_id).await?;

        if self.store.exists(input.superior_id, input.sub_id).await? {
            return Err(GovernanceError::CompositionAlreadyExists {
                superior_id: input.superior_id.into_inner(),
                sub_id: input.sub_id.into_inner(),
            });
        }

        if let Some(path) = self
            .find_path(input.sub_id, input.superior_id)
            .await?
        {
            let mut cycle: Vec<String> = Vec::with_capacity(path.len() + 1);
            cycle.push(input.superior_id.to_string());
            cycle.extend(path.iter().map(ToString::to_string));
            return Err(GovernanceError::CompositionCycleDetected(
                cycle.join(" -> "),
            ));
        }

        let composition = RoleComposition {
            id: CompositionId::new(),
            superior_id: input.superior_id,
            sub_id: input.sub_id,
            created_at: Utc::now(),
        };
        self.store.insert(composition.clone()).await?;

        self.audit_store
            .log_event(RoleRequestAuditEventInput {
                action: RoleRequestAuditAction::CompositionCreated,
                actor_id: input.created_by,
                after_state: Some(serde_json::to_value(&composition)?),
                ..Default::default()
            })
            .await?;

        Ok(composition)
    }

    /// Delete a composition edge.
    pub async fn delete_composition(&self, id: CompositionId) -> Result<()> {
        let existing = self
            .store
            .get(id)
            .await?
            .ok_or(GovernanceError::CompositionNotFound(id.into_inner()))?;

        self.store.delete(id).await?;

        self.audit_store
            .log_event(RoleRequestAuditEventInput {
                action: RoleRequestAuditAction::CompositionDeleted,
                before_state: Some(serde_json::to_value(&existing)?),
                ..Default::default()
            })
            .await?;

        Ok(())
    }

    /// Resolve every composition edge transitively reachable from a role.
    ///
    /// Deterministic and side-effect free. Fails fast with
    /// [`GovernanceError::CompositionCycleDetected`] if the stored graph
    /// contains a cycle reachable from the role.
    pub async fn resolve_sub_roles(&self, role_id: RoleId) -> Result<Vec<RoleComposition>> {
        let mut edges = Vec::new();
        let mut visited: HashSet<RoleId> = HashSet::new();
        let mut queue = VecDeque::from([role_id]);

        while let Some(current) = queue.pop_front() {
            if !visited.insert(current) {
                continue;
            }
            for edge in self.store.list_by_superior(current).await? {
                queue.push_back(edge.sub_id);
                edges.push(edge);
            }
        }

        Self::ensure_acyclic(&edges)?;
        Ok(edges)
    }

    /// Distinct role ids referenced by either end of the edges, plus the
    /// original role, so a composite role is part of its own flattened set.
    pub fn flatten_distinct_roles(
        role_id: RoleId,
        compositions: &[RoleComposition],
    ) -> HashSet<RoleId> {
        let mut roles = HashSet::with_capacity(compositions.len() + 1);
        roles.insert(role_id);
        for edge in compositions {
            roles.insert(edge.superior_id);
            roles.insert(edge.sub_id);
        }
        roles
    }

    /// Resolve and flatten in one step.
    pub async fn resolve_distinct_roles(&self, role_id: RoleId) -> Result<HashSet<RoleId>> {
        let edges = self.resolve_sub_roles(role_id).await?;
        Ok(Self::flatten_distinct_roles(role_id, &edges))
    }

    /// Kahn's algorithm over the collected subgraph; any leftover node sits
    /// on a cycle, which can only mean the store was corrupted out of band.
    fn ensure_acyclic(edges: &[RoleComposition]) -> Result<()> {
        let mut in_degree: HashMap<RoleId, usize> = HashMap::new();
        let mut adjacency: HashMap<RoleId, Vec<RoleId>> = HashMap::new();

        for edge in edges {
            in_degree.entry(edge.superior_id).or_insert(0);
            *in_degree.entry(edge.sub_id).or_insert(0) += 1;
            adjacency
                .entry(edge.superior_id)
                .or_default()
                .push(edge.sub_id);
        }

        let mut queue: VecDeque<RoleId> = in_degree
            .iter()
            .filter(|(_, d)| **d == 0)
            .map(|(r, _)| *r)
            .collect();
        let mut processed = 0usize;

        while let Some(role) = queue.pop_front() {
            processed += 1;
            if let Some(subs) = adjacency.get(&role) {
                for sub in subs {
                    if let Some(degree) = in_degree.get_mut(sub) {
                        *degree -= 1;
                        if *degree == 0 {
                            queue.push_back(*sub);
                        }
                    }
                }
            }
        }

        if processed != in_degree.len() {
            let mut stuck: Vec<String> = in_degree
                .iter()
                .filter(|(_, d)| **d > 0)
                .map(|(r, _)| r.to_string())
                .collect();
            stuck.sort();
            return Err(GovernanceError::CompositionCycleDetected(stuck.join(", ")));
        }
        Ok(())
    }

    /// Path from `start` to `target` through the composition graph, if any.
    async fn find_path(&self, start: RoleId, target: RoleId) -> Result<Option<Vec<RoleId>>> {
        let mut parents: HashMap<RoleId, RoleId> = HashMap::new();
        let mut visited: HashSet<RoleId> = HashSet::from([start]);
        let mut queue = VecDeque::from([start]);

        while let Some(current) = queue.pop_front() {
            if current == target {
                let mut path = vec![current];
                let mut cursor = current;
                while let Some(parent) = parents.get(&cursor) {
                    path.push(*parent);
                    cursor = *parent;
                }
                path.reverse();
                return Ok(Some(path));
            }
            for edge in self.store.list_by_superior(current).await? {
                if visited.insert(edge.sub_id) {
                    parents.insert(edge.sub_id, current);
                    queue.push_back(edge.sub_id);
                }
            }
        }
        Ok(None)
    }

    async fn verify_role_exists(&self, role_id: RoleId) -> Result<()> {
        self.role_store
            .get(role_id)
            .await?
            .ok_or(GovernanceError::RoleNotFound(role_id.into_inner()))?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::audit::InMemoryAuditStore;
    use crate::services::identity::InMemoryRoleStore;

    async fn setup() -> (RoleCompositionService, Arc<InMemoryRoleStore>) {
        let store = Arc::new(InMemoryRoleCompositionStore::new());
        let roles = Arc::new(InMemoryRoleStore::new());
        let audit = Arc::new(InMemoryAuditStore::new());
        let service = RoleCompositionService::new(store, roles.clone(), audit);
        (service, roles)
    }

    fn edge_input(superior: RoleId, sub: RoleId) -> CreateCompositionInput {
        CreateCompositionInput {
            superior_id: superior,
            sub_id: sub,
            created_by: None,
        }
    }

    #[tokio::test]
    async fn test_resolve_transitive_closure() {
        let (service, roles) = setup().await;
        let manager = roles.add_named("manager").await;
        let read_hr = roles.add_named("read-hr").await;
        let approve_leave = roles.add_named("approve-leave").await;
        let payroll = roles.add_named("payroll").await;

        service
            .create_composition(edge_input(manager, read_hr))
            .await
            .unwrap();
        service
            .create_composition(edge_input(manager, approve_leave))
            .await
            .unwrap();
        service
            .create_composition(edge_input(approve_leave, payroll))
            .await
            .unwrap();

        let edges = service.resolve_sub_roles(manager).await.unwrap();
        assert_eq!(edges.len(), 3);

        let flattened = RoleCompositionService::flatten_distinct_roles(manager, &edges);
        assert_eq!(flattened.len(), 4);
        assert!(flattened.contains(&manager));
        assert!(flattened.contains(&payroll));
    }

    #[tokio::test]
    async fn test_atomic_role_flattens_to_itself() {
        let (service, roles) = setup().await;
        let atomic = roles.add_named("atomic").await;

        let flattened = service.resolve_distinct_roles(atomic).await.unwrap();
        assert_eq!(flattened, HashSet::from([atomic]));
    }

    #[tokio::test]
    async fn test_cycle_rejected_at_creation() {
        let (service, roles) = setup().await;
        let a = roles.add_named("a").await;
        let b = roles.add_named("b").await;
        let c = roles.add_named("c").await;

        service.create_composition(edge_input(a, b)).await.unwrap();
        service.create_composition(edge_input(b, c)).await.unwrap();

        // c -> a would close the loop a -> b -> c -> a
        let result = service.create_composition(edge_input(c, a)).await;
        assert!(matches!(
            result,
            Err(GovernanceError::CompositionCycleDetected(_))
        ));
    }

    #[tokio::test]
    async fn test_self_composition_rejected() {
        let (service, roles) = setup().await;
        let a = roles.add_named("a").await;

        let result = service.create_composition(edge_input(a, a)).await;
        assert!(matches!(result, Err(GovernanceError::SelfComposition(_))));
    }

    #[tokio::test]
    async fn test_duplicate_edge_rejected() {
        let (service, roles) = setup().await;
        let a = roles.add_named("a").await;
        let b = roles.add_named("b").await;

        service.create_composition(edge_input(a, b)).await.unwrap();
        let result = service.create_composition(edge_input(a, b)).await;
        assert!(matches!(
            result,
            Err(GovernanceError::CompositionAlreadyExists { .. })
        ));
    }

    #[tokio::test]
    async fn test_unknown_role_rejected() {
        let (service, roles) = setup().await;
        let a = roles.add_named("a").await;

        let result = service
            .create_composition(edge_input(a, RoleId::new()))
            .await;
        assert!(matches!(result, Err(GovernanceError::RoleNotFound(_))));
    }

    #[tokio::test]
    async fn test_corrupted_graph_fails_fast_at_resolution() {
        // Insert a cycle directly into the store, bypassing the service
        // invariant, to model out-of-band corruption.
        let store = Arc::new(InMemoryRoleCompositionStore::new());
        let roles = Arc::new(InMemoryRoleStore::new());
        let audit = Arc::new(InMemoryAuditStore::new());
        let a = roles.add_named("a").await;
        let b = roles.add_named("b").await;

        store
            .insert(RoleComposition {
                id: CompositionId::new(),
                superior_id: a,
                sub_id: b,
                created_at: Utc::now(),
            })
            .await
            .unwrap();
        store
            .insert(RoleComposition {
                id: CompositionId::new(),
                superior_id: b,
                sub_id: a,
                created_at: Utc::now(),
            })
            .await
            .unwrap();

        let service = RoleCompositionService::new(store, roles, audit);
        let result = service.resolve_sub_roles(a).await;
        assert!(matches!(
            result,
            Err(GovernanceError::CompositionCycleDetected(_))
        ));
    }

    #[tokio::test]
    async fn test_delete_composition() {
        let (service, roles) = setup().await;
        let a = roles.add_named("a").await;
        let b = roles.add_named("b").await;

        let edge = service.create_composition(edge_input(a, b)).await.unwrap();
        service.delete_composition(edge.id).await.unwrap();

        let edges = service.resolve_sub_roles(a).await.unwrap();
        assert!(edges.is_empty());

        let again = service.delete_composition(edge.id).await;
        assert!(matches!(
            again,
            Err(GovernanceError::CompositionNotFound(_))
        ));
    }
}
