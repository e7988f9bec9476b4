use crate::scope::{ScopeKind, ScopeRef};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Top-level billing entity. Root of the quota hierarchy.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Customer {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub abbreviation: String,
    pub created_at: DateTime<Utc>,
}

impl Customer {
    pub fn scope(&self) -> ScopeRef {
        ScopeRef::new(ScopeKind::Customer, self.id.clone())
    }
}
