//! # Progress Reporting
//!
//! Events emitted while waiting for resources, and the sinks that consume them.
//!
//! A sink is any `Fn(&ProgressEvent)`; [`NoopSink`], [`PlainSink`] and [`LogSink`]
//! cover the common cases.

use crate::error::display_namespace;
use std::io::Write;
use tracing::{info, warn};

/// Snapshot of a wait run, emitted before and after each resource
#[derive(Debug, Clone, PartialEq)]
pub struct ProgressEvent {
    pub message: String,
    /// 1-based position of the resource in the run
    pub current_index: usize,
    pub total: usize,
    /// `completed / total * 100`, never decreasing within one run
    pub overall_percent: f64,
    pub kind_description: String,
    pub namespace: String,
    pub name: String,
    /// Plural resource name
    pub resource: String,
    pub resource_completed: bool,
    /// Error text when the wait for this resource failed
    pub error: Option<String>,
}

impl ProgressEvent {
    fn status_label(&self) -> &'static str {
        if self.error.is_some() {
            "FAILED"
        } else if self.resource_completed {
            "READY"
        } else {
            "WAIT"
        }
    }
}

/// Consumer of progress events
pub trait ProgressSink: Send + Sync {
    fn notify(&self, event: &ProgressEvent);
}

impl<F> ProgressSink for F
where
    F: Fn(&ProgressEvent) + Send + Sync,
{
    fn notify(&self, event: &ProgressEvent) {
        self(event);
    }
}

/// Discards every event
#[derive(Debug, Clone, Copy, Default)]
pub struct NoopSink;

impl ProgressSink for NoopSink {
    fn notify(&self, _event: &ProgressEvent) {}
}

/// Prints one line per event to stderr
#[derive(Debug, Clone, Copy, Default)]
pub struct PlainSink;

impl PlainSink {
    /// Render the line printed for `event`
    pub fn format(event: &ProgressEvent) -> String {
        let mut line = format!(
            "[{:.0}%] ({}/{}) {:<30} {:<6} {}/{} {}",
            event.overall_percent,
            event.current_index,
            event.total,
            event.kind_description,
            event.status_label(),
            display_namespace(&event.namespace),
            event.name,
            event.message,
        );
        if let Some(err) = &event.error {
            line.push_str(": ");
            line.push_str(err);
        }
        line
    }
}

impl ProgressSink for PlainSink {
    fn notify(&self, event: &ProgressEvent) {
        let mut stderr = std::io::stderr().lock();
        // Output errors on stderr are not actionable
        let _ = writeln!(stderr, "{}", Self::format(event));
    }
}

/// Forwards events to `tracing`
#[derive(Debug, Clone, Copy, Default)]
pub struct LogSink;

impl ProgressSink for LogSink {
    fn notify(&self, event: &ProgressEvent) {
        if let Some(err) = &event.error {
            warn!(
                kind = %event.kind_description,
                resource = %event.resource,
                namespace = %event.namespace,
                name = %event.name,
                error = %err,
                "{}",
                event.message
            );
        } else {
            info!(
                kind = %event.kind_description,
                resource = %event.resource,
                namespace = %event.namespace,
                name = %event.name,
                percent = event.overall_percent,
                index = event.current_index,
                total = event.total,
                "{}",
                event.message
            );
        }
    }
}
