//! Instance lifecycle engine: a strict transition table over
//! [`pkg_types::instance::InstanceState`], compare-and-swap state writes,
//! and the tracked-processing shim that brackets a background operation
//! with guaranteed before/after transitions.

pub mod error;
pub mod machine;
pub mod tracking;
pub mod transitions;

pub use error::LifecycleError;
pub use machine::apply_transition;
pub use tracking::tracked_processing;
pub use transitions::{Trigger, target_for};
