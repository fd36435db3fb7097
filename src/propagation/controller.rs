//! # Propagation Controller
//!
//! Watches cluster-membership objects and hands readiness transitions to the
//! [`Propagator`]. The caller's task forwards watch events into a bounded queue; a
//! single spawned worker owns all readiness state and runs the ready handler inline.
//! Once every cluster from the initial listing is ready the worker cancels the run's
//! child token, the forwarder stops and the worker is joined.

use super::handler::Propagator;
use super::state::{ReadinessTracker, Transition};
use crate::client::{ChangeKind, ResourceReader, WatchEvent};
use crate::condition::is_condition_true;
use crate::constants::{READY_CONDITION, XKUBE_KIND, XKUBE_RESOURCE};
use crate::document::Document;
use crate::error::PropagationError;
use crate::progress::{NoopSink, ProgressEvent, ProgressSink};
use crate::resource::ResourceType;
use crate::runtime::handle_watch_stream_error;
use futures::StreamExt;
use std::sync::Arc;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, info_span, warn, Instrument};

/// Readiness counts at the end of a run
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RunSummary {
    pub ready: usize,
    pub total: usize,
}

/// List + watch loop over `XKube` objects
pub struct PropagationController {
    reader: Arc<dyn ResourceReader>,
    propagator: Arc<Propagator>,
    resource_type: ResourceType,
    queue_capacity: usize,
    sink: Arc<dyn ProgressSink>,
}

impl std::fmt::Debug for PropagationController {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PropagationController")
            .field("resource_type", &self.resource_type)
            .field("queue_capacity", &self.queue_capacity)
            .finish_non_exhaustive()
    }
}

enum StreamEnd {
    Completed,
    Closed,
}

impl PropagationController {
    pub fn new(
        reader: Arc<dyn ResourceReader>,
        propagator: Arc<Propagator>,
        queue_capacity: usize,
    ) -> Self {
        Self {
            reader,
            propagator,
            resource_type: ResourceType::xkube(),
            queue_capacity: queue_capacity.max(1),
            sink: Arc::new(NoopSink),
        }
    }

    /// Report each cluster that becomes ready to `sink`
    #[must_use]
    pub fn with_sink(mut self, sink: Arc<dyn ProgressSink>) -> Self {
        self.sink = sink;
        self
    }

    /// Run until all listed clusters are ready or `cancel` fires
    ///
    /// With an empty initial listing the run only ends through `cancel`. A watch stream
    /// that ends before completion is an error.
    pub async fn run(&self, cancel: &CancellationToken) -> Result<RunSummary, PropagationError> {
        let child = cancel.child_token();

        let initial = self
            .reader
            .list(&self.resource_type, "")
            .await
            .map_err(|source| PropagationError::Listing {
                resource: self.resource_type.to_string(),
                source,
            })?;
        let listed: Vec<String> = initial.iter().map(Document::key).collect();
        let total = listed.len();
        info!("tracking readiness of {} clusters", total);

        let (tx, rx) = mpsc::channel(self.queue_capacity);
        let worker = tokio::spawn(
            consume(
                rx,
                Arc::clone(&self.propagator),
                Arc::clone(&self.sink),
                listed,
                child.clone(),
            )
            .instrument(info_span!("propagation.worker", total)),
        );

        let mut stream = self.reader.watch(&self.resource_type, "");
        let end = loop {
            tokio::select! {
                biased;
                () = child.cancelled() => break StreamEnd::Completed,
                next = stream.next() => match next {
                    Some(Ok(event)) => {
                        tokio::select! {
                            biased;
                            () = child.cancelled() => break StreamEnd::Completed,
                            sent = tx.send(event) => {
                                if sent.is_err() {
                                    break StreamEnd::Completed;
                                }
                            }
                        }
                    }
                    Some(Err(e)) => {
                        handle_watch_stream_error(&e);
                    }
                    None => break StreamEnd::Closed,
                },
            }
        };

        drop(stream);
        drop(tx);
        let tracker = worker.await?;
        child.cancel();

        let summary = RunSummary {
            ready: tracker.ready(),
            total: tracker.total(),
        };
        match end {
            StreamEnd::Closed if !tracker.is_complete() => Err(PropagationError::WatchClosed {
                resource: self.resource_type.to_string(),
                ready: summary.ready,
                total: summary.total,
            }),
            _ => {
                info!("propagation finished ({}/{} clusters ready)", summary.ready, summary.total);
                Ok(summary)
            }
        }
    }
}

/// Worker: owns the readiness tracker and runs the ready handler on transitions
async fn consume(
    mut rx: mpsc::Receiver<WatchEvent>,
    propagator: Arc<Propagator>,
    sink: Arc<dyn ProgressSink>,
    listed: Vec<String>,
    done: CancellationToken,
) -> ReadinessTracker {
    let mut tracker = ReadinessTracker::new(listed);

    loop {
        let event = tokio::select! {
            biased;
            () = done.cancelled() => break,
            received = rx.recv() => match received {
                Some(event) => event,
                None => break,
            },
        };
        let key = event.document.key();
        if event.change == ChangeKind::Deleted {
            debug!("{} deleted, readiness unchanged", key);
            continue;
        }

        let ready = is_condition_true(Some(&event.document), READY_CONDITION);
        match tracker.observe(&key, ready) {
            Transition::BecameReady => {
                info!("{} is ready ({}/{})", key, tracker.ready(), tracker.total());
                sink.notify(&cluster_event(&event, &tracker));
                match propagator.handle_ready_cluster(&event.document).await {
                    Ok(report) => debug!(
                        target_cluster = %report.target,
                        applied = report.applied,
                        skipped = report.skipped,
                        failed = report.failed,
                        "propagation.pass"
                    ),
                    Err(e) => warn!("propagation to {} failed: {}", key, e),
                }
            }
            Transition::BecameNotReady => {
                info!("{} is no longer ready ({}/{})", key, tracker.ready(), tracker.total());
            }
            Transition::Unchanged => {}
        }

        if tracker.is_complete() {
            info!("all {} clusters are ready", tracker.total());
            done.cancel();
            break;
        }
    }
    tracker
}

#[expect(clippy::cast_precision_loss, reason = "cluster counts are tiny")]
fn cluster_event(event: &WatchEvent, tracker: &ReadinessTracker) -> ProgressEvent {
    let percent = if tracker.total() == 0 {
        0.0
    } else {
        (tracker.ready().min(tracker.total()) as f64 / tracker.total() as f64) * 100.0
    };
    ProgressEvent {
        message: "cluster ready".to_string(),
        current_index: tracker.ready(),
        total: tracker.total(),
        overall_percent: percent,
        kind_description: XKUBE_KIND.to_string(),
        namespace: event.document.namespace().to_string(),
        name: event.document.name().to_string(),
        resource: XKUBE_RESOURCE.to_string(),
        resource_completed: true,
        error: None,
    }
}
