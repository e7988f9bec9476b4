use pkg_state::StoreError;
use pkg_types::scope::{ScopeKind, ScopeRef};
use thiserror::Error;

/// Failures surfaced by the quota subsystem.
#[derive(Debug, Error)]
pub enum QuotaError {
    /// The (scope, name) pair was never initialized.
    #[error("quota '{name}' not found on {scope}")]
    NotFound { scope: ScopeRef, name: String },

    /// A delta would drive usage below zero. This signals a caller bug;
    /// usage is left unchanged rather than clamped.
    #[error(
        "quota '{name}' on {scope} cannot go negative: usage {usage}, delta {delta}"
    )]
    NegativeUsage {
        scope: ScopeRef,
        name: String,
        usage: i64,
        delta: i64,
    },

    /// Limits must be non-negative or the -1 unlimited sentinel.
    #[error("invalid quota limit {limit}: must be >= 0 or -1 for unlimited")]
    InvalidLimit { limit: i64 },

    /// Optimistic-concurrency conflict on a quota write. Retryable from
    /// a fresh read; never retried internally.
    #[error("concurrent quota update on '{key}'")]
    Conflict { key: String },

    /// A scope-kind edge would make the graph cyclic. Fatal configuration
    /// error, detected at registration time.
    #[error("scope graph cycle: {child} -> {parent}")]
    CyclicScopeGraph { child: ScopeKind, parent: ScopeKind },

    /// No aggregate rule is registered for this (scope kind, quota name).
    #[error("no aggregate rule for quota '{name}' on scope kind {kind}")]
    UnknownAggregate { kind: ScopeKind, name: String },

    #[error("quota storage failed")]
    Store(#[source] StoreError),
}

impl From<StoreError> for QuotaError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::Conflict { key, .. } => QuotaError::Conflict { key },
            other => QuotaError::Store(other),
        }
    }
}
