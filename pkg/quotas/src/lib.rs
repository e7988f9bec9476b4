//! Hierarchical quota accounting: a ledger of named (limit, usage) pairs
//! per scope, with synchronous propagation of usage deltas to ancestor
//! scopes that carry a matching aggregate rule.
//!
//! Every multi-name usage change lands as one store transaction: either
//! the whole batch (including all propagated ancestor updates) commits,
//! or none of it does.

pub mod aggregates;
pub mod error;
pub mod graph;
pub mod ledger;

pub use aggregates::{AggregateRegistry, AggregateRule};
pub use error::QuotaError;
pub use graph::{ScopeDirectory, ScopeGraph};
pub use ledger::QuotaLedger;
