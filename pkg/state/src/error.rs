use thiserror::Error;

/// Failures surfaced by the state store.
#[derive(Debug, Error)]
pub enum StoreError {
    /// A version guard did not match the persisted record: the record was
    /// created, changed, or deleted since the caller read it. Retryable
    /// from a fresh read.
    #[error("concurrent update on '{key}': expected version {expected}, found {found}")]
    Conflict {
        key: String,
        expected: u64,
        found: u64,
    },

    #[error("record serialization failed")]
    Serde(#[from] serde_json::Error),

    #[error("state store backend failed")]
    Backend(#[from] anyhow::Error),
}

impl StoreError {
    pub fn is_conflict(&self) -> bool {
        matches!(self, StoreError::Conflict { .. })
    }
}
