//! # Readiness Waits
//!
//! Resolves generated resource names, then waits for each resource's readiness
//! condition in order, reporting progress along the way.

pub mod resolver;
pub mod waiter;
pub mod watchlist;

pub use resolver::{fingerprint_path, resolve_names};
pub use waiter::ReadinessWaiter;
pub use watchlist::{default_setup_watch_list, parse_kubernetes_duration, WatchList};
