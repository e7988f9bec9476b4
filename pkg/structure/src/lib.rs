//! Structure registry: customers, projects, service links, and instances,
//! with quota side effects inlined into each mutation (no hidden event-bus
//! dispatch). Also provides the scope directory the quota engine uses to
//! resolve concrete parent/child relationships.

pub mod customers;
pub mod directory;
pub mod error;
pub mod instances;
pub mod projects;
pub mod service_links;


pub use directory::StoreDirectory;
pub use error::RegistryError;

use pkg_constants::quotas::UNLIMITED;
use pkg_quotas::{AggregateRegistry, QuotaLedger, ScopeGraph};
use pkg_state::StateStore;
use std::sync::Arc;

/// Entry point for structure mutations. Owns the quota ledger wired to a
/// store-backed scope directory and the built-in aggregate rules.
pub struct Registry {
    store: StateStore,
    ledger: QuotaLedger,
}

impl Registry {
    pub fn new(store: StateStore) -> Result<Self, RegistryError> {
        let graph = ScopeGraph::default_hierarchy()?;
        let directory = Arc::new(StoreDirectory::new(store.clone(), graph));
        let ledger = QuotaLedger::new(
            store.clone(),
            directory,
            AggregateRegistry::default_rules(),
        );
        Ok(Self { store, ledger })
    }

    pub fn store(&self) -> &StateStore {
        &self.store
    }

    pub fn ledger(&self) -> &QuotaLedger {
        &self.ledger
    }
}

/// Seed descriptor: every listed quota name at usage 0, unlimited.
pub(crate) fn unlimited(names: &[&'static str]) -> Vec<(&'static str, i64)> {
    names.iter().map(|n| (*n, UNLIMITED)).collect()
}
