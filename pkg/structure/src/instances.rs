use crate::error::RegistryError;
use crate::Registry;
use chrono::Utc;
use pkg_constants::paths;
use pkg_constants::quotas::{MAX_INSTANCES, NC_RESOURCE_COUNT, RAM, STORAGE, VCPU};
use pkg_state::Transaction;
use pkg_types::instance::{Instance, InstanceSpec, InstanceState};
use pkg_types::scope::{ScopeKind, ScopeRef};
use pkg_types::validate::{validate_name, validate_user_data};
use tracing::info;
use uuid::Uuid;

/// The quota batch one instance contributes to its service link.
fn creation_deltas(spec: &InstanceSpec) -> Vec<(&'static str, i64)> {
    vec![
        (VCPU, spec.cores as i64),
        (RAM, spec.ram_mb as i64),
        (STORAGE, spec.disk_mb as i64),
        (MAX_INSTANCES, 1),
        (NC_RESOURCE_COUNT, 1),
    ]
}

impl Registry {
    /// Provision request: validate quota headroom on the service link and
    /// the scopes its usage rolls up to, then persist the instance in
    /// `ProvisioningScheduled` and account its sizing as one quota batch.
    ///
    /// Validation is advisory: it runs before the usage batch, and a
    /// concurrent creation racing between the two can still push usage
    /// over limit.
    pub async fn create_instance(
        &self,
        service_link_id: &str,
        spec: &InstanceSpec,
    ) -> Result<Instance, RegistryError> {
        validate_name(&spec.name).map_err(|e| RegistryError::Invalid(e.to_string()))?;
        validate_user_data(&spec.user_data)
            .map_err(|e| RegistryError::Invalid(e.to_string()))?;
        let link = self.get_service_link(service_link_id).await?;

        let deltas = creation_deltas(spec);
        let violations = self
            .ledger
            .validate_quota_change(&link.scope(), &deltas)
            .await?;
        if !violations.is_empty() {
            return Err(RegistryError::QuotaViolation(violations));
        }

        let instance = Instance {
            id: Uuid::new_v4().to_string(),
            service_link_id: link.id.clone(),
            name: spec.name.clone(),
            state: InstanceState::ProvisioningScheduled,
            backend_id: String::new(),
            cores: spec.cores,
            ram_mb: spec.ram_mb,
            disk_mb: spec.disk_mb,
            user_data: spec.user_data.clone(),
            created_at: Utc::now(),
        };
        // Record and quota batch land in one guarded commit.
        let txn = Transaction::new().put(instance.scope().registry_key(), 0, &instance)?;
        let txn = self
            .ledger
            .stage_usage_batch(txn, &link.scope(), &deltas)
            .await?;
        self.store.commit(txn).await?;
        info!(
            "Instance {} scheduled for provisioning on link {}",
            instance.name, link.id
        );
        Ok(instance)
    }

    pub async fn get_instance(&self, id: &str) -> Result<Instance, RegistryError> {
        let key = ScopeRef::new(ScopeKind::Instance, id).registry_key();
        self.store
            .load::<Instance>(&key)
            .await?
            .map(|(_, i)| i)
            .ok_or(RegistryError::NotFound {
                entity: "instance",
                id: id.to_string(),
            })
    }

    pub async fn list_instances_of(
        &self,
        service_link_id: &str,
    ) -> Result<Vec<Instance>, RegistryError> {
        let rows: Vec<(String, u64, Instance)> =
            self.store.list_prefix(paths::INSTANCES_PREFIX).await?;
        Ok(rows
            .into_iter()
            .filter(|(_, _, i)| i.service_link_id == service_link_id)
            .map(|(_, _, i)| i)
            .collect())
    }

    /// Apply new sizing to an instance mid-resize. Only legal while the
    /// lifecycle engine holds the instance in `Resizing`.
    pub async fn resize_instance(
        &self,
        id: &str,
        cores: u32,
        ram_mb: u64,
        disk_mb: u64,
    ) -> Result<Instance, RegistryError> {
        let key = ScopeRef::new(ScopeKind::Instance, id).registry_key();
        let (version, mut instance) = self
            .store
            .load::<Instance>(&key)
            .await?
            .ok_or(RegistryError::NotFound {
                entity: "instance",
                id: id.to_string(),
            })?;
        if instance.state != InstanceState::Resizing {
            return Err(RegistryError::Invalid(format!(
                "instance '{}' must be resizing to change sizing, is '{}'",
                id, instance.state
            )));
        }

        let deltas: Vec<(&'static str, i64)> = [
            (VCPU, cores as i64 - instance.cores as i64),
            (RAM, ram_mb as i64 - instance.ram_mb as i64),
            (STORAGE, disk_mb as i64 - instance.disk_mb as i64),
        ]
        .into_iter()
        .filter(|(_, delta)| *delta != 0)
        .collect();

        let link_scope = instance.service_link_scope();
        let violations = self
            .ledger
            .validate_quota_change(&link_scope, &deltas)
            .await?;
        if !violations.is_empty() {
            return Err(RegistryError::QuotaViolation(violations));
        }

        instance.cores = cores;
        instance.ram_mb = ram_mb;
        instance.disk_mb = disk_mb;
        // New sizing and quota deltas commit together: a lost race on the
        // record leaves the quotas untouched, so a retry never double-charges.
        let txn = self
            .ledger
            .stage_usage_batch(Transaction::new(), &link_scope, &deltas)
            .await?;
        let txn = txn.put(&key, version, &instance)?;
        self.store.commit(txn).await?;
        info!(
            "Instance {} resized to cores={} ram={}MiB disk={}MiB",
            id, cores, ram_mb, disk_mb
        );
        Ok(instance)
    }

    /// Remove an instance and release its quota batch. Legal once the
    /// lifecycle has brought it to `Offline`, `Deleting`, or `Erred`.
    pub async fn delete_instance(&self, id: &str) -> Result<(), RegistryError> {
        let key = ScopeRef::new(ScopeKind::Instance, id).registry_key();
        let (version, instance) = self
            .store
            .load::<Instance>(&key)
            .await?
            .ok_or(RegistryError::NotFound {
                entity: "instance",
                id: id.to_string(),
            })?;
        match instance.state {
            InstanceState::Offline | InstanceState::Deleting | InstanceState::Erred => {}
            other => {
                return Err(RegistryError::Invalid(format!(
                    "instance '{}' cannot be deleted from state '{}'",
                    id, other
                )));
            }
        }

        let deltas = [
            (VCPU, -(instance.cores as i64)),
            (RAM, -(instance.ram_mb as i64)),
            (STORAGE, -(instance.disk_mb as i64)),
            (MAX_INSTANCES, -1),
            (NC_RESOURCE_COUNT, -1),
        ];
        // Release and record delete share one commit: a version conflict on
        // the row rolls the release back too, so a retry frees the sizing
        // exactly once.
        let txn = self
            .ledger
            .stage_usage_batch(Transaction::new(), &instance.service_link_scope(), &deltas)
            .await?;
        self.store.commit(txn.delete(key, version)).await?;
        info!("Instance {} ({}) deleted", instance.name, id);
        Ok(())
    }
}
