//! Typed records for the quota and lifecycle engine: scopes, quota rows,
//! structure entities, and the instance lifecycle state enum.

pub mod customer;
pub mod instance;
pub mod project;
pub mod quota;
pub mod scope;
pub mod service_link;
pub mod validate;
