use pkg_constants::paths;
use serde::{Deserialize, Serialize};

/// Kind of an entity participating in the quota hierarchy.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ScopeKind {
    Customer,
    Project,
    ServiceLink,
    Instance,
}

impl ScopeKind {
    /// Short identifier used in quota row keys.
    pub fn as_str(&self) -> &'static str {
        match self {
            ScopeKind::Customer => "customer",
            ScopeKind::Project => "project",
            ScopeKind::ServiceLink => "service-link",
            ScopeKind::Instance => "instance",
        }
    }

    /// Registry key prefix under which records of this kind are stored.
    pub fn registry_prefix(&self) -> &'static str {
        match self {
            ScopeKind::Customer => paths::CUSTOMERS_PREFIX,
            ScopeKind::Project => paths::PROJECTS_PREFIX,
            ScopeKind::ServiceLink => paths::SERVICE_LINKS_PREFIX,
            ScopeKind::Instance => paths::INSTANCES_PREFIX,
        }
    }
}

impl std::fmt::Display for ScopeKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Opaque reference to a scope entity: its kind plus identifier.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ScopeRef {
    pub kind: ScopeKind,
    pub id: String,
}

impl ScopeRef {
    pub fn new(kind: ScopeKind, id: impl Into<String>) -> Self {
        Self {
            kind,
            id: id.into(),
        }
    }

    /// Key of the scope's own record in the registry.
    pub fn registry_key(&self) -> String {
        format!("{}{}", self.kind.registry_prefix(), self.id)
    }

    /// Key of one named quota row owned by this scope.
    pub fn quota_key(&self, name: &str) -> String {
        format!("{}{}/{}/{}", paths::QUOTAS_PREFIX, self.kind.as_str(), self.id, name)
    }

    /// Prefix covering every quota row owned by this scope.
    pub fn quota_prefix(&self) -> String {
        format!("{}{}/{}/", paths::QUOTAS_PREFIX, self.kind.as_str(), self.id)
    }
}

impl std::fmt::Display for ScopeRef {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}/{}", self.kind, self.id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn quota_keys_are_namespaced_by_kind_and_id() {
        let scope = ScopeRef::new(ScopeKind::Project, "p1");
        assert_eq!(scope.registry_key(), "/registry/projects/p1");
        assert_eq!(scope.quota_key("vcpu"), "/registry/quotas/project/p1/vcpu");
        assert!(scope.quota_key("vcpu").starts_with(&scope.quota_prefix()));
    }
}
