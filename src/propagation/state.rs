//! # Propagation State
//!
//! Bookkeeping shared by the propagation worker:
//! - [`ReadinessTracker`]: last known readiness per cluster; owned by the worker
//! - [`DeployedMatrix`]: (source, target) pairs already served
//! - [`CredentialCache`]: credentials of clusters observed ready

use crate::client::Credential;
use std::collections::{HashMap, HashSet};
use std::sync::{Mutex, MutexGuard, PoisonError};

/// Readiness change produced by one observation
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Transition {
    /// Not tracked or not ready before, ready now
    BecameReady,
    /// Ready before, not ready now
    BecameNotReady,
    Unchanged,
}

/// Per-cluster readiness keyed by `namespace/name`
///
/// Completion only considers the clusters of the initial listing. Clusters that
/// appear later are tracked for transitions but never counted.
#[derive(Debug, Default)]
pub struct ReadinessTracker {
    states: HashMap<String, bool>,
    listed: HashSet<String>,
    ready: usize,
}

impl ReadinessTracker {
    /// Track the keys of the initial listing
    pub fn new<I, S>(listed: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            states: HashMap::new(),
            listed: listed.into_iter().map(Into::into).collect(),
            ready: 0,
        }
    }

    /// Record the current readiness of `key`
    pub fn observe(&mut self, key: &str, ready: bool) -> Transition {
        let previous = self.states.insert(key.to_string(), ready);
        let counted = self.listed.contains(key);
        match (previous, ready) {
            (Some(true), true) | (None | Some(false), false) => Transition::Unchanged,
            (None | Some(false), true) => {
                if counted {
                    self.ready += 1;
                }
                Transition::BecameReady
            }
            (Some(true), false) => {
                if counted {
                    self.ready = self.ready.saturating_sub(1);
                }
                Transition::BecameNotReady
            }
        }
    }

    /// Ready clusters of the initial listing
    pub fn ready(&self) -> usize {
        self.ready
    }

    pub fn total(&self) -> usize {
        self.listed.len()
    }

    /// At least one cluster was listed and all listed clusters are ready
    pub fn is_complete(&self) -> bool {
        !self.listed.is_empty() && self.ready >= self.listed.len()
    }
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

/// Source cluster to the set of target clusters its secrets were delivered to
#[derive(Debug, Default)]
pub struct DeployedMatrix {
    pairs: Mutex<HashMap<String, HashSet<String>>>,
}

impl DeployedMatrix {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_deployed(&self, source: &str, target: &str) -> bool {
        lock(&self.pairs)
            .get(source)
            .is_some_and(|targets| targets.contains(target))
    }

    pub fn mark_deployed(&self, source: &str, target: &str) {
        lock(&self.pairs)
            .entry(source.to_string())
            .or_default()
            .insert(target.to_string());
    }

    /// Forget every delivery from `source` so its secrets are sent again
    pub fn clear_source(&self, source: &str) {
        lock(&self.pairs).remove(source);
    }

    /// Number of delivered pairs
    pub fn len(&self) -> usize {
        lock(&self.pairs).values().map(HashSet::len).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Cluster id to credential
#[derive(Debug, Default)]
pub struct CredentialCache {
    entries: Mutex<HashMap<String, Credential>>,
}

impl CredentialCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&self, cluster_id: &str, credential: Credential) {
        lock(&self.entries).insert(cluster_id.to_string(), credential);
    }

    pub fn get(&self, cluster_id: &str) -> Option<Credential> {
        lock(&self.entries).get(cluster_id).cloned()
    }
}
