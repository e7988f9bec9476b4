//! Versioned, transactional state store on SlateDB.
//!
//! Records are JSON documents wrapped in a version envelope. A commit is a
//! batch of writes, each guarded by the version the caller read; guards are
//! verified under a store-wide commit lock and the batch is applied through
//! a single SlateDB write, so a commit is all-or-nothing.

pub mod client;
pub mod error;
pub mod events;

pub use client::{StateStore, Transaction};
pub use error::StoreError;
pub use events::{CommitEvent, CommitKind, CommitLog};
