//! # Readiness Waiter
//!
//! Waits for resources one after another. Each resource is read immediately and then
//! polled at its own interval until its condition is true, its timeout elapses or the
//! parent token is cancelled. The first failure ends the run; later resources are never
//! read.

use crate::client::ResourceReader;
use crate::condition::is_condition_true;
use crate::error::{display_namespace, WaitError};
use crate::progress::{ProgressEvent, ProgressSink};
use crate::resource::ResourceDescriptor;
use std::sync::Arc;
use std::time::Duration;
use tokio::time::{interval_at, Instant, MissedTickBehavior};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, info_span, warn, Instrument};

const MIN_POLL_INTERVAL: Duration = Duration::from_millis(1);

/// Sequential readiness waiter
#[derive(Clone)]
pub struct ReadinessWaiter {
    reader: Arc<dyn ResourceReader>,
    cancel: CancellationToken,
}

impl std::fmt::Debug for ReadinessWaiter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ReadinessWaiter")
            .field("cancelled", &self.cancel.is_cancelled())
            .finish_non_exhaustive()
    }
}

impl ReadinessWaiter {
    /// Create a waiter whose waits are aborted when `cancel` fires
    pub fn new(reader: Arc<dyn ResourceReader>, cancel: CancellationToken) -> Self {
        Self { reader, cancel }
    }

    /// Wait for every descriptor in order
    ///
    /// Emits a "waiting" event before and a "ready" event after each resource, or a
    /// single event carrying the error text when a wait fails.
    pub async fn wait_all(
        &self,
        descriptors: &[ResourceDescriptor],
        sink: &dyn ProgressSink,
    ) -> Result<(), WaitError> {
        let total = descriptors.len();
        let mut completed = 0;

        for (position, descriptor) in descriptors.iter().enumerate() {
            let index = position + 1;

            if descriptor.name.is_empty() {
                let err = WaitError::Unnamed {
                    kind: descriptor.kind_description.clone(),
                    resource: descriptor.resource_type.resource.clone(),
                };
                sink.notify(&event(descriptor, index, total, completed, "name unresolved").failed(&err));
                return Err(err);
            }

            sink.notify(&event(
                descriptor,
                index,
                total,
                completed,
                &format!("waiting for {}", descriptor.condition),
            ));

            let span = info_span!(
                "wait.resource",
                kind = %descriptor.kind_description,
                resource = %descriptor.resource_type.resource,
                namespace = %descriptor.namespace,
                name = %descriptor.name,
            );
            if let Err(err) = self.wait_one(descriptor).instrument(span).await {
                sink.notify(&event(descriptor, index, total, completed, "wait failed").failed(&err));
                return Err(err);
            }

            completed += 1;
            info!(
                "{} {}/{} is {} ({}/{})",
                descriptor.kind_description,
                display_namespace(&descriptor.namespace),
                descriptor.name,
                descriptor.condition,
                completed,
                total
            );
            sink.notify(&event(descriptor, index, total, completed, "ready").completed());
        }
        Ok(())
    }

    async fn wait_one(&self, descriptor: &ResourceDescriptor) -> Result<(), WaitError> {
        let poll_interval = descriptor.poll_interval.max(MIN_POLL_INTERVAL);
        let poll = async {
            if self.check(descriptor).await {
                return;
            }
            let mut ticker = interval_at(Instant::now() + poll_interval, poll_interval);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
            loop {
                ticker.tick().await;
                if self.check(descriptor).await {
                    return;
                }
            }
        };

        tokio::select! {
            biased;
            () = self.cancel.cancelled() => Err(WaitError::Cancelled {
                kind: descriptor.kind_description.clone(),
                resource: descriptor.resource_type.resource.clone(),
                namespace: display_namespace(&descriptor.namespace).to_string(),
                name: descriptor.name.clone(),
            }),
            result = tokio::time::timeout(descriptor.timeout, poll) => {
                result.map_err(|_elapsed| WaitError::Timeout {
                    kind: descriptor.kind_description.clone(),
                    resource: descriptor.resource_type.resource.clone(),
                    namespace: display_namespace(&descriptor.namespace).to_string(),
                    name: descriptor.name.clone(),
                    condition: descriptor.condition.clone(),
                    timeout: descriptor.timeout,
                })
            }
        }
    }

    /// One read; not-found and read errors count as "not yet"
    async fn check(&self, descriptor: &ResourceDescriptor) -> bool {
        match self
            .reader
            .get(
                &descriptor.resource_type,
                &descriptor.namespace,
                &descriptor.name,
            )
            .await
        {
            Ok(Some(doc)) => is_condition_true(Some(&doc), &descriptor.condition),
            Ok(None) => {
                debug!("{} not found yet", descriptor.name);
                false
            }
            Err(e) => {
                warn!("reading {} failed, will retry: {}", descriptor.name, e);
                false
            }
        }
    }
}

#[expect(clippy::cast_precision_loss, reason = "resource counts are tiny")]
fn percent(completed: usize, total: usize) -> f64 {
    if total == 0 {
        return 0.0;
    }
    completed as f64 / total as f64 * 100.0
}

fn event(
    descriptor: &ResourceDescriptor,
    index: usize,
    total: usize,
    completed: usize,
    message: &str,
) -> ProgressEvent {
    ProgressEvent {
        message: message.to_string(),
        current_index: index,
        total,
        overall_percent: percent(completed, total),
        kind_description: descriptor.kind_description.clone(),
        namespace: descriptor.namespace.clone(),
        name: descriptor.name.clone(),
        resource: descriptor.resource_type.resource.clone(),
        resource_completed: false,
        error: None,
    }
}

impl ProgressEvent {
    fn completed(mut self) -> Self {
        self.resource_completed = true;
        self
    }

    fn failed(mut self, err: &WaitError) -> Self {
        self.error = Some(err.to_string());
        self
    }
}
