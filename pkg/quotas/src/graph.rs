use crate::error::QuotaError;
use async_trait::async_trait;
use pkg_types::scope::{ScopeKind, ScopeRef};
use std::collections::HashMap;

/// Host-supplied resolution of concrete scope relationships. The quota
/// engine does not know how scopes are stored; the hosting registry
/// implements this over its own key space.
#[async_trait]
pub trait ScopeDirectory: Send + Sync {
    /// Immediate parent scopes of `scope` (empty for a root scope).
    async fn parents_of(&self, scope: &ScopeRef) -> Result<Vec<ScopeRef>, QuotaError>;

    /// Immediate child scopes of `scope` whose kind is in `kinds`.
    async fn children_of(
        &self,
        scope: &ScopeRef,
        kinds: &[ScopeKind],
    ) -> Result<Vec<ScopeRef>, QuotaError>;
}

/// Kind-level parent edges of the scope hierarchy, registered once at
/// startup. An edge that would close a cycle is refused immediately so a
/// bad configuration never reaches runtime propagation.
#[derive(Debug, Default, Clone)]
pub struct ScopeGraph {
    parents: HashMap<ScopeKind, Vec<ScopeKind>>,
}

impl ScopeGraph {
    pub fn new() -> Self {
        Self::default()
    }

    /// The built-in hierarchy: instance -> service link -> project -> customer.
    pub fn default_hierarchy() -> Result<Self, QuotaError> {
        let mut graph = Self::new();
        graph.register_parent(ScopeKind::Instance, ScopeKind::ServiceLink)?;
        graph.register_parent(ScopeKind::ServiceLink, ScopeKind::Project)?;
        graph.register_parent(ScopeKind::Project, ScopeKind::Customer)?;
        Ok(graph)
    }

    /// Declare that scopes of kind `child` roll up to scopes of kind
    /// `parent`. Fails fast if the edge would create a cycle.
    pub fn register_parent(
        &mut self,
        child: ScopeKind,
        parent: ScopeKind,
    ) -> Result<(), QuotaError> {
        if child == parent || self.reaches(parent, child) {
            return Err(QuotaError::CyclicScopeGraph { child, parent });
        }
        let parents = self.parents.entry(child).or_default();
        if !parents.contains(&parent) {
            parents.push(parent);
        }
        Ok(())
    }

    /// Registered parent kinds of `kind`.
    pub fn parent_kinds(&self, kind: ScopeKind) -> &[ScopeKind] {
        self.parents.get(&kind).map(Vec::as_slice).unwrap_or(&[])
    }

    /// True if walking parent edges from `from` can reach `target`.
    fn reaches(&self, from: ScopeKind, target: ScopeKind) -> bool {
        let mut stack = vec![from];
        let mut seen = Vec::new();
        while let Some(kind) = stack.pop() {
            if kind == target {
                return true;
            }
            if seen.contains(&kind) {
                continue;
            }
            seen.push(kind);
            stack.extend(self.parent_kinds(kind).iter().copied());
        }
        false
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_hierarchy_is_a_chain() {
        let graph = ScopeGraph::default_hierarchy().unwrap();
        assert_eq!(
            graph.parent_kinds(ScopeKind::Instance),
            [ScopeKind::ServiceLink]
        );
        assert_eq!(
            graph.parent_kinds(ScopeKind::Project),
            [ScopeKind::Customer]
        );
        assert!(graph.parent_kinds(ScopeKind::Customer).is_empty());
    }

    #[test]
    fn cycles_are_refused_at_registration() {
        let mut graph = ScopeGraph::default_hierarchy().unwrap();
        let err = graph
            .register_parent(ScopeKind::Customer, ScopeKind::Instance)
            .unwrap_err();
        assert!(matches!(err, QuotaError::CyclicScopeGraph { .. }));

        let err = graph
            .register_parent(ScopeKind::Project, ScopeKind::Project)
            .unwrap_err();
        assert!(matches!(err, QuotaError::CyclicScopeGraph { .. }));
    }

    #[test]
    fn duplicate_edges_are_collapsed() {
        let mut graph = ScopeGraph::new();
        graph
            .register_parent(ScopeKind::Project, ScopeKind::Customer)
            .unwrap();
        graph
            .register_parent(ScopeKind::Project, ScopeKind::Customer)
            .unwrap();
        assert_eq!(graph.parent_kinds(ScopeKind::Project).len(), 1);
    }
}
