use pkg_quotas::QuotaError;
use pkg_state::StoreError;
use thiserror::Error;

/// Failures surfaced by the structure registry.
#[derive(Debug, Error)]
pub enum RegistryError {
    #[error("{entity} '{id}' not found")]
    NotFound { entity: &'static str, id: String },

    #[error("invalid input: {0}")]
    Invalid(String),

    /// Deletion refused while dependent entities still exist.
    #[error("{entity} '{id}' still has {dependents}")]
    NotEmpty {
        entity: &'static str,
        id: String,
        dependents: &'static str,
    },

    /// One or more quotas would go over limit. The hosting layer is
    /// expected to reject the request with these messages.
    #[error("one or more quotas are over limit: {}", .0.join("; "))]
    QuotaViolation(Vec<String>),

    #[error(transparent)]
    Quota(#[from] QuotaError),

    #[error(transparent)]
    Store(#[from] StoreError),
}
