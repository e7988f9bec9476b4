//! Registry key layout in the state store.

/// Key prefix for customer records.
pub const CUSTOMERS_PREFIX: &str = "/registry/customers/";

/// Key prefix for project records.
pub const PROJECTS_PREFIX: &str = "/registry/projects/";

/// Key prefix for service-project-link records.
pub const SERVICE_LINKS_PREFIX: &str = "/registry/service-links/";

/// Key prefix for instance records.
pub const INSTANCES_PREFIX: &str = "/registry/instances/";

/// Key prefix for quota rows: `/registry/quotas/{scope_kind}/{scope_id}/{name}`.
pub const QUOTAS_PREFIX: &str = "/registry/quotas/";
