//! # CLI Configuration
//!
//! Settings loaded from environment variables.
//!
//! All settings have sensible defaults and can be overridden via environment variables.
//! Command-line flags take precedence over the values loaded here.

use crate::constants::{
    DEFAULT_HOME_NAMESPACE, DEFAULT_REMOTE_APPLY_TIMEOUT_SECS, DEFAULT_WATCH_QUEUE_CAPACITY,
};
use std::time::Duration;
use tracing::warn;

/// Runtime settings for the waiter and the propagation controller
#[derive(Debug, Clone)]
pub struct Settings {
    /// Namespace holding kubeconfig and cacert secrets
    pub home_namespace: String,
    /// Upper bound for a single remote secret apply (seconds)
    pub remote_apply_timeout_secs: u64,
    /// Capacity of the bounded queue between the watch stream and the propagation worker
    pub watch_queue_capacity: usize,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            home_namespace: DEFAULT_HOME_NAMESPACE.to_string(),
            remote_apply_timeout_secs: DEFAULT_REMOTE_APPLY_TIMEOUT_SECS,
            watch_queue_capacity: DEFAULT_WATCH_QUEUE_CAPACITY,
        }
    }
}

impl Settings {
    /// Load configuration from environment variables with defaults
    pub fn from_env() -> Self {
        Self {
            home_namespace: env_var_or_default(
                "SKYCLUSTER_NAMESPACE",
                DEFAULT_HOME_NAMESPACE.to_string(),
            ),
            remote_apply_timeout_secs: env_var_or_default(
                "SKYCLUSTER_REMOTE_APPLY_TIMEOUT_SECS",
                DEFAULT_REMOTE_APPLY_TIMEOUT_SECS,
            ),
            watch_queue_capacity: env_var_or_default(
                "SKYCLUSTER_WATCH_QUEUE_CAPACITY",
                DEFAULT_WATCH_QUEUE_CAPACITY,
            )
            .max(1),
        }
    }

    /// Override the home namespace (from the `--namespace` flag)
    #[must_use]
    pub fn with_home_namespace(mut self, namespace: Option<String>) -> Self {
        if let Some(ns) = namespace.filter(|ns| !ns.is_empty()) {
            self.home_namespace = ns;
        }
        self
    }

    /// Remote apply timeout as a `Duration`
    pub fn remote_apply_timeout(&self) -> Duration {
        Duration::from_secs(self.remote_apply_timeout_secs)
    }
}

/// Read environment variable or return default value
fn env_var_or_default<T: std::str::FromStr>(key: &str, default: T) -> T
where
    <T as std::str::FromStr>::Err: std::fmt::Debug,
{
    parse_or_default(key, std::env::var(key).ok(), default)
}

/// Parse `raw`, warning and falling back to `default` when it is malformed
fn parse_or_default<T: std::str::FromStr>(key: &str, raw: Option<String>, default: T) -> T
where
    <T as std::str::FromStr>::Err: std::fmt::Debug,
{
    let Some(raw) = raw else {
        return default;
    };
    match raw.parse() {
        Ok(value) => value,
        Err(e) => {
            warn!("ignoring invalid value {:?} for {}: {:?}", raw, key, e);
            default
        }
    }
}
