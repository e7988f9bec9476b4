//! Well-known quota names and their default limits.

/// Sentinel limit meaning "unlimited".
pub const UNLIMITED: i64 = -1;

/// Number of projects under a customer.
pub const NC_PROJECT_COUNT: &str = "nc_project_count";

/// Number of provisioned instances under a scope.
pub const NC_RESOURCE_COUNT: &str = "nc_resource_count";

/// Number of service links under a scope.
pub const NC_SERVICE_COUNT: &str = "nc_service_count";

/// Total virtual CPU cores.
pub const VCPU: &str = "vcpu";

/// Total memory in MiB.
pub const RAM: &str = "ram";

/// Total disk in MiB.
pub const STORAGE: &str = "storage";

/// Instance count bound on a service link.
pub const MAX_INSTANCES: &str = "max_instances";

/// Quota names seeded on every new customer.
pub const CUSTOMER_QUOTAS: &[&str] = &[
    NC_PROJECT_COUNT,
    NC_RESOURCE_COUNT,
    NC_SERVICE_COUNT,
];

/// Quota names seeded on every new project. The sizing quotas are
/// aggregates over the project's service links.
pub const PROJECT_QUOTAS: &[&str] = &[
    NC_RESOURCE_COUNT,
    NC_SERVICE_COUNT,
    VCPU,
    RAM,
    STORAGE,
    MAX_INSTANCES,
];

/// Quota names seeded on every new service link.
pub const SERVICE_LINK_QUOTAS: &[&str] = &[
    VCPU,
    RAM,
    STORAGE,
    MAX_INSTANCES,
    NC_RESOURCE_COUNT,
];
