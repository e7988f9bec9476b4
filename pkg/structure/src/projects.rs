use crate::error::RegistryError;
use crate::{Registry, unlimited};
use chrono::Utc;
use pkg_constants::paths;
use pkg_constants::quotas::{NC_PROJECT_COUNT, PROJECT_QUOTAS};
use pkg_state::Transaction;
use pkg_types::project::Project;
use pkg_types::scope::{ScopeKind, ScopeRef};
use pkg_types::validate::validate_name;
use tracing::info;
use uuid::Uuid;

impl Registry {
    /// Create a project under a customer. Seeds the project's quotas and
    /// bumps the customer's project counter.
    pub async fn create_project(
        &self,
        customer_id: &str,
        name: &str,
        description: &str,
    ) -> Result<Project, RegistryError> {
        validate_name(name).map_err(|e| RegistryError::Invalid(e.to_string()))?;
        let customer = self.get_customer(customer_id).await?;

        let project = Project {
            id: Uuid::new_v4().to_string(),
            customer_id: customer.id.clone(),
            name: name.to_string(),
            description: description.to_string(),
            created_at: Utc::now(),
        };
        // Record, quota seeding, and the customer's counter bump are one
        // guarded commit.
        let txn = Transaction::new().put(project.scope().registry_key(), 0, &project)?;
        let txn = self
            .ledger
            .stage_init_quotas(txn, &project.scope(), &unlimited(PROJECT_QUOTAS))
            .await?;
        let txn = self
            .ledger
            .stage_usage_batch(txn, &customer.scope(), &[(NC_PROJECT_COUNT, 1)])
            .await?;
        self.store.commit(txn).await?;
        info!(
            "Project {} created under customer {}",
            project.name, customer.name
        );
        Ok(project)
    }

    pub async fn get_project(&self, id: &str) -> Result<Project, RegistryError> {
        let key = ScopeRef::new(ScopeKind::Project, id).registry_key();
        self.store
            .load::<Project>(&key)
            .await?
            .map(|(_, p)| p)
            .ok_or(RegistryError::NotFound {
                entity: "project",
                id: id.to_string(),
            })
    }

    pub async fn list_projects_of(&self, customer_id: &str) -> Result<Vec<Project>, RegistryError> {
        let rows: Vec<(String, u64, Project)> =
            self.store.list_prefix(paths::PROJECTS_PREFIX).await?;
        Ok(rows
            .into_iter()
            .filter(|(_, _, p)| p.customer_id == customer_id)
            .map(|(_, _, p)| p)
            .collect())
    }

    /// Delete a project, cascade its quota rows, and release the
    /// customer's project counter. Refused while service links exist.
    pub async fn delete_project(&self, id: &str) -> Result<(), RegistryError> {
        let scope = ScopeRef::new(ScopeKind::Project, id);
        let key = scope.registry_key();
        let (version, project) = self
            .store
            .load::<Project>(&key)
            .await?
            .ok_or(RegistryError::NotFound {
                entity: "project",
                id: id.to_string(),
            })?;

        if !self.list_service_links_of(id).await?.is_empty() {
            return Err(RegistryError::NotEmpty {
                entity: "project",
                id: id.to_string(),
                dependents: "service links",
            });
        }

        let txn = self
            .ledger
            .stage_usage_batch(
                Transaction::new(),
                &project.customer_scope(),
                &[(NC_PROJECT_COUNT, -1)],
            )
            .await?;
        let txn = self.ledger.stage_drop_quotas(txn, &scope).await?;
        self.store.commit(txn.delete(key, version)).await?;
        info!("Project {} ({}) deleted", project.name, id);
        Ok(())
    }
}
