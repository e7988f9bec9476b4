use chrono::{DateTime, Utc};
use pkg_constants::quotas::UNLIMITED;
use serde::{Deserialize, Serialize};

/// A named (limit, usage) pair owned by one scope.
///
/// `limit == -1` means unlimited. `usage` never goes negative; the ledger
/// rejects any delta that would violate that instead of clamping.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Quota {
    pub name: String,
    pub limit: i64,
    pub usage: i64,
    pub created_at: DateTime<Utc>,
}

impl Quota {
    pub fn new(name: impl Into<String>, limit: i64) -> Self {
        Self {
            name: name.into(),
            limit,
            usage: 0,
            created_at: Utc::now(),
        }
    }

    pub fn is_unlimited(&self) -> bool {
        self.limit == UNLIMITED
    }

    /// True if applying `delta` would push usage past the limit.
    pub fn is_exceeded(&self, delta: i64) -> bool {
        !self.is_unlimited() && self.usage + delta > self.limit
    }
}
