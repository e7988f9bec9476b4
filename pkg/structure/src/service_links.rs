use crate::error::RegistryError;
use crate::{Registry, unlimited};
use chrono::Utc;
use pkg_constants::paths;
use pkg_constants::quotas::{NC_SERVICE_COUNT, SERVICE_LINK_QUOTAS};
use pkg_state::Transaction;
use pkg_types::scope::{ScopeKind, ScopeRef};
use pkg_types::service_link::ServiceLink;
use pkg_types::validate::validate_name;
use tracing::info;
use uuid::Uuid;

impl Registry {
    /// Bind a provisioning service to a project. Seeds the link's sizing
    /// quotas and bumps the service counters up the chain.
    pub async fn create_service_link(
        &self,
        project_id: &str,
        service_name: &str,
    ) -> Result<ServiceLink, RegistryError> {
        validate_name(service_name).map_err(|e| RegistryError::Invalid(e.to_string()))?;
        let project = self.get_project(project_id).await?;

        let link = ServiceLink {
            id: Uuid::new_v4().to_string(),
            project_id: project.id.clone(),
            service_name: service_name.to_string(),
            created_at: Utc::now(),
        };
        // Record, quota seeding, and the service counters (project and, via
        // propagation, customer) are one guarded commit.
        let txn = Transaction::new().put(link.scope().registry_key(), 0, &link)?;
        let txn = self
            .ledger
            .stage_init_quotas(txn, &link.scope(), &unlimited(SERVICE_LINK_QUOTAS))
            .await?;
        let txn = self
            .ledger
            .stage_usage_batch(txn, &project.scope(), &[(NC_SERVICE_COUNT, 1)])
            .await?;
        self.store.commit(txn).await?;
        info!(
            "Service link {} | {} created",
            link.service_name, project.name
        );
        Ok(link)
    }

    pub async fn get_service_link(&self, id: &str) -> Result<ServiceLink, RegistryError> {
        let key = ScopeRef::new(ScopeKind::ServiceLink, id).registry_key();
        self.store
            .load::<ServiceLink>(&key)
            .await?
            .map(|(_, l)| l)
            .ok_or(RegistryError::NotFound {
                entity: "service link",
                id: id.to_string(),
            })
    }

    pub async fn list_service_links_of(
        &self,
        project_id: &str,
    ) -> Result<Vec<ServiceLink>, RegistryError> {
        let rows: Vec<(String, u64, ServiceLink)> =
            self.store.list_prefix(paths::SERVICE_LINKS_PREFIX).await?;
        Ok(rows
            .into_iter()
            .filter(|(_, _, l)| l.project_id == project_id)
            .map(|(_, _, l)| l)
            .collect())
    }

    /// Unbind a service from a project. Refused while instances exist.
    pub async fn delete_service_link(&self, id: &str) -> Result<(), RegistryError> {
        let scope = ScopeRef::new(ScopeKind::ServiceLink, id);
        let key = scope.registry_key();
        let (version, link) = self
            .store
            .load::<ServiceLink>(&key)
            .await?
            .ok_or(RegistryError::NotFound {
                entity: "service link",
                id: id.to_string(),
            })?;

        if !self.list_instances_of(id).await?.is_empty() {
            return Err(RegistryError::NotEmpty {
                entity: "service link",
                id: id.to_string(),
                dependents: "instances",
            });
        }

        let txn = self
            .ledger
            .stage_usage_batch(
                Transaction::new(),
                &link.project_scope(),
                &[(NC_SERVICE_COUNT, -1)],
            )
            .await?;
        let txn = self.ledger.stage_drop_quotas(txn, &scope).await?;
        self.store.commit(txn.delete(key, version)).await?;
        info!("Service link {} ({}) deleted", link.service_name, id);
        Ok(())
    }
}
