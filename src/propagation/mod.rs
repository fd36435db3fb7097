//! # Secret Propagation
//!
//! Replicates cluster CA secrets between member clusters as they become ready.

pub mod controller;
pub mod handler;
pub mod state;

pub use controller::{PropagationController, RunSummary};
pub use handler::{embedded_secret, PropagationReport, Propagator};
pub use state::{CredentialCache, DeployedMatrix, ReadinessTracker, Transition};
