//! # SkyCluster CLI Core
//!
//! Library behind `skyctl`, the command-line companion of SkyCluster.
//!
//! ## Overview
//!
//! 1. **Name resolution** - Locates Crossplane-generated objects from the name declared in their manifest
//! 2. **Readiness waits** - Polls resources until a status condition is true, with per-resource timeouts and progress events
//! 3. **Secret propagation** - Watches `XKube` cluster memberships and copies cluster CA secrets to every other ready cluster
//! 4. **Kubeconfig distribution** - Fetches and merges member-cluster kubeconfigs
//! 5. **Mesh enablement** - Maintains the `XKubeMesh` interconnect object
//!
//! All cluster access goes through the traits in [`client`], so every component can be
//! driven by in-memory fakes.

pub mod client;
pub mod condition;
pub mod config;
pub mod constants;
pub mod document;
pub mod error;
pub mod kubeconfig;
pub mod mesh;
pub mod progress;
pub mod propagation;
pub mod resource;
pub mod runtime;
pub mod wait;

pub use condition::is_condition_true;
pub use document::Document;
pub use resource::{ResourceDescriptor, ResourceType};
