//! # Error Policy
//!
//! Classification of watch stream errors.
//!
//! The watcher restarts itself with backoff, so errors are only classified and logged
//! here; the watch loop keeps consuming the stream.

use crate::error::ReaderError;
use tracing::{error, warn};

/// Category of a watch stream error
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WatchErrorClass {
    /// 401: credentials expired or RBAC revoked
    Unauthorized,
    /// 410: resource version too old, the watcher relists
    Expired,
    /// 429: API server storage is (re)initializing
    Throttled,
    /// The watched object or type disappeared
    NotFound,
    Other,
}

/// Classify a watch error from its message
pub fn classify_watch_error(error_string: &str) -> WatchErrorClass {
    let is_401 = error_string.contains("401")
        || error_string.contains("Unauthorized")
        || error_string.contains("WatchFailed");
    let is_410 = error_string.contains("410")
        || error_string.contains("too old resource version")
        || error_string.contains("Expired")
        || error_string.contains("Gone");
    let is_429 = error_string.contains("429")
        || error_string.contains("storage is (re)initializing")
        || error_string.contains("TooManyRequests");
    let is_not_found = error_string.contains("ObjectNotFound")
        || (error_string.contains("404") && error_string.contains("not found"));

    if is_401 {
        WatchErrorClass::Unauthorized
    } else if is_410 {
        WatchErrorClass::Expired
    } else if is_429 {
        WatchErrorClass::Throttled
    } else if is_not_found {
        WatchErrorClass::NotFound
    } else {
        WatchErrorClass::Other
    }
}

/// Log a watch stream error according to its class
pub fn handle_watch_stream_error(err: &ReaderError) -> WatchErrorClass {
    let error_string = err.to_string();
    let error_span = tracing::span!(
        tracing::Level::WARN,
        "watch.error",
        error = %error_string
    );
    let _error_guard = error_span.enter();

    let class = classify_watch_error(&error_string);
    match class {
        WatchErrorClass::Unauthorized => {
            error!("❌ Watch authentication failed (401 Unauthorized) - kubeconfig credentials may have expired");
            error!("   Verify access with: kubectl auth can-i watch xkubes.skycluster.io");
        }
        WatchErrorClass::Expired => {
            warn!(error_type = "410", "watch resource version expired, relisting");
        }
        WatchErrorClass::Throttled => {
            warn!(error_type = "429", "API server storage reinitializing, watch will back off");
        }
        WatchErrorClass::NotFound => {
            warn!("watched resource not found (CRD missing or object deleted), continuing watch...");
        }
        WatchErrorClass::Other => {
            error!("watch stream error: {}", error_string);
        }
    }
    class
}
