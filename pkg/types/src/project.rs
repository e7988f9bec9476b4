use crate::scope::{ScopeKind, ScopeRef};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A customer's project. Its sizing quotas are aggregates over the
/// project's service links.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Project {
    pub id: String,
    pub customer_id: String,
    pub name: String,
    #[serde(default)]
    pub description: String,
    pub created_at: DateTime<Utc>,
}

impl Project {
    pub fn scope(&self) -> ScopeRef {
        ScopeRef::new(ScopeKind::Project, self.id.clone())
    }

    pub fn customer_scope(&self) -> ScopeRef {
        ScopeRef::new(ScopeKind::Customer, self.customer_id.clone())
    }
}
