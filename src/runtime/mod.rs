//! # Runtime Module
//!
//! Process-level setup for the CLI and watch error handling.

pub mod error_policy;
pub mod initialization;

pub use error_policy::*;
pub use initialization::*;
