use async_trait::async_trait;
use pkg_constants::paths;
use pkg_quotas::{QuotaError, ScopeDirectory, ScopeGraph};
use pkg_state::StateStore;
use pkg_types::instance::Instance;
use pkg_types::project::Project;
use pkg_types::scope::{ScopeKind, ScopeRef};
use pkg_types::service_link::ServiceLink;

/// Scope directory over the registry key space. The kind-level hierarchy
/// is validated (acyclic) at construction; concrete parents come from the
/// persisted records themselves.
pub struct StoreDirectory {
    store: StateStore,
    graph: ScopeGraph,
}

impl StoreDirectory {
    pub fn new(store: StateStore, graph: ScopeGraph) -> Self {
        Self { store, graph }
    }

    pub fn graph(&self) -> &ScopeGraph {
        &self.graph
    }
}

#[async_trait]
impl ScopeDirectory for StoreDirectory {
    async fn parents_of(&self, scope: &ScopeRef) -> Result<Vec<ScopeRef>, QuotaError> {
        // A scope whose record is already gone has no parents to resolve.
        let key = scope.registry_key();
        let parent = match scope.kind {
            ScopeKind::Customer => None,
            ScopeKind::Project => self
                .store
                .load::<Project>(&key)
                .await
                .map_err(QuotaError::from)?
                .map(|(_, p)| ScopeRef::new(ScopeKind::Customer, p.customer_id)),
            ScopeKind::ServiceLink => self
                .store
                .load::<ServiceLink>(&key)
                .await
                .map_err(QuotaError::from)?
                .map(|(_, l)| ScopeRef::new(ScopeKind::Project, l.project_id)),
            ScopeKind::Instance => self
                .store
                .load::<Instance>(&key)
                .await
                .map_err(QuotaError::from)?
                .map(|(_, i)| ScopeRef::new(ScopeKind::ServiceLink, i.service_link_id)),
        };
        Ok(parent.into_iter().collect())
    }

    async fn children_of(
        &self,
        scope: &ScopeRef,
        kinds: &[ScopeKind],
    ) -> Result<Vec<ScopeRef>, QuotaError> {
        let mut children = Vec::new();
        for kind in kinds {
            // Only kinds that actually roll up to this scope's kind can
            // have children here.
            if !self.graph.parent_kinds(*kind).contains(&scope.kind) {
                continue;
            }
            match kind {
                ScopeKind::Customer => {}
                ScopeKind::Project => {
                    let rows: Vec<(String, u64, Project)> = self
                        .store
                        .list_prefix(paths::PROJECTS_PREFIX)
                        .await
                        .map_err(QuotaError::from)?;
                    children.extend(
                        rows.into_iter()
                            .filter(|(_, _, p)| p.customer_id == scope.id)
                            .map(|(_, _, p)| ScopeRef::new(ScopeKind::Project, p.id)),
                    );
                }
                ScopeKind::ServiceLink => {
                    let rows: Vec<(String, u64, ServiceLink)> = self
                        .store
                        .list_prefix(paths::SERVICE_LINKS_PREFIX)
                        .await
                        .map_err(QuotaError::from)?;
                    children.extend(
                        rows.into_iter()
                            .filter(|(_, _, l)| l.project_id == scope.id)
                            .map(|(_, _, l)| ScopeRef::new(ScopeKind::ServiceLink, l.id)),
                    );
                }
                ScopeKind::Instance => {
                    let rows: Vec<(String, u64, Instance)> = self
                        .store
                        .list_prefix(paths::INSTANCES_PREFIX)
                        .await
                        .map_err(QuotaError::from)?;
                    children.extend(
                        rows.into_iter()
                            .filter(|(_, _, i)| i.service_link_id == scope.id)
                            .map(|(_, _, i)| ScopeRef::new(ScopeKind::Instance, i.id)),
                    );
                }
            }
        }
        Ok(children)
    }
}
