use crate::scope::{ScopeKind, ScopeRef};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Lifecycle state of an instance.
///
/// Scheduled states mark an operation that is queued but not yet picked up
/// by a worker; the matching bare state marks the operation in progress.
/// `Erred` is a sink: recovery is an operator action, not a modeled edge.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum InstanceState {
    ProvisioningScheduled,
    Provisioning,
    Online,
    Offline,
    StartingScheduled,
    Starting,
    StoppingScheduled,
    Stopping,
    DeletionScheduled,
    Deleting,
    ResizingScheduled,
    Resizing,
    RestartingScheduled,
    Restarting,
    Erred,
}

impl InstanceState {
    /// Every state, for exhaustive table checks.
    pub const ALL: [InstanceState; 15] = [
        InstanceState::ProvisioningScheduled,
        InstanceState::Provisioning,
        InstanceState::Online,
        InstanceState::Offline,
        InstanceState::StartingScheduled,
        InstanceState::Starting,
        InstanceState::StoppingScheduled,
        InstanceState::Stopping,
        InstanceState::DeletionScheduled,
        InstanceState::Deleting,
        InstanceState::ResizingScheduled,
        InstanceState::Resizing,
        InstanceState::RestartingScheduled,
        InstanceState::Restarting,
        InstanceState::Erred,
    ];

    /// Stable states are the ones with no task scheduled or in progress.
    pub fn is_stable(&self) -> bool {
        matches!(self, InstanceState::Online | InstanceState::Offline)
    }
}

impl std::fmt::Display for InstanceState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let label = match self {
            InstanceState::ProvisioningScheduled => "Provisioning Scheduled",
            InstanceState::Provisioning => "Provisioning",
            InstanceState::Online => "Online",
            InstanceState::Offline => "Offline",
            InstanceState::StartingScheduled => "Starting Scheduled",
            InstanceState::Starting => "Starting",
            InstanceState::StoppingScheduled => "Stopping Scheduled",
            InstanceState::Stopping => "Stopping",
            InstanceState::DeletionScheduled => "Deletion Scheduled",
            InstanceState::Deleting => "Deleting",
            InstanceState::ResizingScheduled => "Resizing Scheduled",
            InstanceState::Resizing => "Resizing",
            InstanceState::RestartingScheduled => "Restarting Scheduled",
            InstanceState::Restarting => "Restarting",
            InstanceState::Erred => "Erred",
        };
        f.write_str(label)
    }
}

/// A provisioned entity (a VM) whose sizing attributes drive quota deltas
/// and whose `state` only ever changes through the lifecycle engine.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Instance {
    pub id: String,
    pub service_link_id: String,
    pub name: String,
    pub state: InstanceState,
    /// External system correlation key; empty until provisioned.
    #[serde(default)]
    pub backend_id: String,
    pub cores: u32,
    pub ram_mb: u64,
    pub disk_mb: u64,
    /// Cloud-init style payload handed to the backend on provisioning.
    #[serde(default)]
    pub user_data: String,
    pub created_at: DateTime<Utc>,
}

impl Instance {
    pub fn scope(&self) -> ScopeRef {
        ScopeRef::new(ScopeKind::Instance, self.id.clone())
    }

    pub fn service_link_scope(&self) -> ScopeRef {
        ScopeRef::new(ScopeKind::ServiceLink, self.service_link_id.clone())
    }
}

/// Caller-supplied sizing and naming for a new instance.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InstanceSpec {
    pub name: String,
    pub cores: u32,
    pub ram_mb: u64,
    pub disk_mb: u64,
    #[serde(default)]
    pub user_data: String,
}
