use crate::scope::{ScopeKind, ScopeRef};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Association of a provisioning account ("service") with a project.
/// Instances hang off a service link, and the link owns the sizing
/// quotas their deltas land on.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServiceLink {
    pub id: String,
    pub project_id: String,
    pub service_name: String,
    pub created_at: DateTime<Utc>,
}

impl ServiceLink {
    pub fn scope(&self) -> ScopeRef {
        ScopeRef::new(ScopeKind::ServiceLink, self.id.clone())
    }

    pub fn project_scope(&self) -> ScopeRef {
        ScopeRef::new(ScopeKind::Project, self.project_id.clone())
    }
}
