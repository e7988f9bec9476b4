use crate::transitions::Trigger;
use pkg_state::StoreError;
use pkg_types::instance::InstanceState;
use thiserror::Error;

/// Failures surfaced by the lifecycle engine.
#[derive(Debug, Error)]
pub enum LifecycleError {
    #[error("instance '{id}' not found")]
    NotFound { id: String },

    /// The current state has no edge for this trigger. The operation is
    /// rejected with no state change.
    #[error("transition {trigger} is not allowed from state '{state}'")]
    IllegalTransition {
        state: InstanceState,
        trigger: Trigger,
    },

    /// Lost an optimistic-concurrency race on the state write. Exactly one
    /// of two racing callers wins; the loser may retry from a fresh read.
    #[error("concurrent update on instance '{id}'")]
    Conflict { id: String },

    #[error("instance storage failed")]
    Store(#[source] StoreError),
}
