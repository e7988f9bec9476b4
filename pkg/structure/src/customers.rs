use crate::error::RegistryError;
use crate::{Registry, unlimited};
use chrono::Utc;
use pkg_constants::quotas::CUSTOMER_QUOTAS;
use pkg_state::Transaction;
use pkg_types::customer::Customer;
use pkg_types::scope::{ScopeKind, ScopeRef};
use pkg_types::validate::validate_name;
use tracing::info;
use uuid::Uuid;

impl Registry {
    /// Create a customer and seed its counter quotas.
    pub async fn create_customer(
        &self,
        name: &str,
        abbreviation: &str,
    ) -> Result<Customer, RegistryError> {
        validate_name(name).map_err(|e| RegistryError::Invalid(e.to_string()))?;
        let customer = Customer {
            id: Uuid::new_v4().to_string(),
            name: name.to_string(),
            abbreviation: abbreviation.to_string(),
            created_at: Utc::now(),
        };
        let txn = Transaction::new().put(customer.scope().registry_key(), 0, &customer)?;
        let txn = self
            .ledger
            .stage_init_quotas(txn, &customer.scope(), &unlimited(CUSTOMER_QUOTAS))
            .await?;
        self.store.commit(txn).await?;
        info!("Customer {} ({}) created", customer.name, customer.id);
        Ok(customer)
    }

    pub async fn get_customer(&self, id: &str) -> Result<Customer, RegistryError> {
        let key = ScopeRef::new(ScopeKind::Customer, id).registry_key();
        self.store
            .load::<Customer>(&key)
            .await?
            .map(|(_, c)| c)
            .ok_or(RegistryError::NotFound {
                entity: "customer",
                id: id.to_string(),
            })
    }

    /// Delete a customer and cascade its quota rows. Refused while the
    /// customer still has projects.
    pub async fn delete_customer(&self, id: &str) -> Result<(), RegistryError> {
        let scope = ScopeRef::new(ScopeKind::Customer, id);
        let key = scope.registry_key();
        let (version, customer) = self
            .store
            .load::<Customer>(&key)
            .await?
            .ok_or(RegistryError::NotFound {
                entity: "customer",
                id: id.to_string(),
            })?;

        if !self.list_projects_of(id).await?.is_empty() {
            return Err(RegistryError::NotEmpty {
                entity: "customer",
                id: id.to_string(),
                dependents: "projects",
            });
        }

        let txn = self.ledger.stage_drop_quotas(Transaction::new(), &scope).await?;
        self.store.commit(txn.delete(key, version)).await?;
        info!("Customer {} ({}) deleted", customer.name, id);
        Ok(())
    }
}
