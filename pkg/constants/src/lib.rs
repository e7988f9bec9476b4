//! Centralized constants for the quota and lifecycle engine.
//!
//! All project-wide constant values live here.
//! Change a value in one place and it applies everywhere.

pub mod paths;
pub mod quotas;
