use pkg_constants::quotas::{
    MAX_INSTANCES, NC_RESOURCE_COUNT, NC_SERVICE_COUNT, RAM, STORAGE, VCPU,
};
use pkg_types::scope::ScopeKind;

/// Declares that `quota` on scopes of kind `parent` is the sum of the
/// same-named quota across children of the listed kinds.
#[derive(Debug, Clone)]
pub struct AggregateRule {
    pub parent: ScopeKind,
    pub quota: String,
    pub children: Vec<ScopeKind>,
}

/// Startup-time table of aggregate quota rules. Consulted on every usage
/// delta to decide which ancestors the delta propagates to; a plain data
/// table, no reflection.
#[derive(Debug, Default, Clone)]
pub struct AggregateRegistry {
    rules: Vec<AggregateRule>,
}

impl AggregateRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// The built-in rules: a project sums its service links' sizing and
    /// resource-count quotas; a customer sums its projects' resource and
    /// service counts.
    pub fn default_rules() -> Self {
        let mut registry = Self::new();
        for quota in [VCPU, RAM, STORAGE, MAX_INSTANCES, NC_RESOURCE_COUNT] {
            registry.register(ScopeKind::Project, quota, &[ScopeKind::ServiceLink]);
        }
        for quota in [NC_RESOURCE_COUNT, NC_SERVICE_COUNT] {
            registry.register(ScopeKind::Customer, quota, &[ScopeKind::Project]);
        }
        registry
    }

    pub fn register(&mut self, parent: ScopeKind, quota: &str, children: &[ScopeKind]) {
        self.rules.push(AggregateRule {
            parent,
            quota: quota.to_string(),
            children: children.to_vec(),
        });
    }

    /// The rule maintaining `quota` on scopes of kind `parent`, if any.
    pub fn rule_for(&self, parent: ScopeKind, quota: &str) -> Option<&AggregateRule> {
        self.rules
            .iter()
            .find(|r| r.parent == parent && r.quota == quota)
    }
}
