//! # Secret Propagation Tests
//!
//! Ready handler bookkeeping and the watch-driven propagation controller.

mod common;

use common::{cacert_secret, xkube, FakeApplier, FakeCredentials, FakeReader, FakeSecrets};
use skycluster_ctl::client::WatchEvent;
use skycluster_ctl::error::PropagationError;
use skycluster_ctl::progress::ProgressEvent;
use skycluster_ctl::propagation::{PropagationController, Propagator};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio_util::sync::CancellationToken;

struct Harness {
    reader: Arc<FakeReader>,
    secrets: Arc<FakeSecrets>,
    credentials: Arc<FakeCredentials>,
    applier: Arc<FakeApplier>,
    propagator: Arc<Propagator>,
}

impl Harness {
    fn new(reader: FakeReader, secrets: Vec<k8s_openapi::api::core::v1::Secret>) -> Self {
        Self::with_applier(reader, secrets, FakeApplier::default())
    }

    fn with_applier(
        reader: FakeReader,
        secrets: Vec<k8s_openapi::api::core::v1::Secret>,
        applier: FakeApplier,
    ) -> Self {
        let secrets = Arc::new(FakeSecrets::new(secrets));
        let credentials = Arc::new(FakeCredentials::default());
        let applier = Arc::new(applier);
        let propagator = Arc::new(Propagator::new(
            Arc::clone(&secrets) as _,
            Arc::clone(&credentials) as _,
            Arc::clone(&applier) as _,
            "skycluster-system",
            Duration::from_secs(20),
        ));
        Self {
            reader: Arc::new(reader),
            secrets,
            credentials,
            applier,
            propagator,
        }
    }

    fn controller(&self) -> PropagationController {
        PropagationController::new(
            Arc::clone(&self.reader) as _,
            Arc::clone(&self.propagator),
            8,
        )
    }
}

#[tokio::test]
async fn test_second_ready_pass_does_not_reapply() {
    let h = Harness::new(
        FakeReader::new(),
        vec![cacert_secret("cacert-a", "cluster-a", "istio-system", "cacerts")],
    );
    let target = xkube("xk-b", "cluster-b", true);

    let first = h.propagator.handle_ready_cluster(&target).await.unwrap();
    let second = h.propagator.handle_ready_cluster(&target).await.unwrap();

    assert_eq!(first.applied, 1);
    assert_eq!(second.applied, 0);
    assert_eq!(second.skipped, 1);
    assert_eq!(h.applier.count(), 1);
    assert!(h.propagator.deployed().is_deployed("cluster-a", "cluster-b"));

    let applied = h.applier.applied.lock().unwrap().clone();
    assert_eq!(
        applied,
        vec![(
            "kubeconfig-cluster-b".to_string(),
            "istio-system/cacerts".to_string()
        )]
    );
}

#[tokio::test]
async fn test_skips_own_and_unlabelled_secrets() {
    let mut unlabelled = cacert_secret("cacert-x", "", "istio-system", "cacerts");
    unlabelled
        .metadata
        .labels
        .as_mut()
        .unwrap()
        .remove("skycluster.io/cluster-name");
    let h = Harness::new(
        FakeReader::new(),
        vec![
            cacert_secret("cacert-b", "cluster-b", "istio-system", "cacerts"),
            unlabelled,
        ],
    );

    let report = h
        .propagator
        .handle_ready_cluster(&xkube("xk-b", "cluster-b", true))
        .await
        .unwrap();

    assert_eq!(report.applied, 0);
    assert_eq!(report.skipped, 2);
    assert_eq!(h.applier.count(), 0);
    assert!(h.propagator.credentials().get("cluster-b").is_some());
}

#[tokio::test]
async fn test_missing_cluster_name_is_skipped_silently() {
    let h = Harness::new(FakeReader::new(), vec![]);
    let pending = xkube("xk-c", "", true);

    let report = h.propagator.handle_ready_cluster(&pending).await.unwrap();
    assert_eq!(report.target, "");
    assert_eq!(h.credentials.fetch_count(), 0);
}

#[tokio::test]
async fn test_credential_failure_skips_cluster() {
    let h = Harness::new(
        FakeReader::new(),
        vec![cacert_secret("cacert-a", "cluster-a", "istio-system", "cacerts")],
    );
    h.credentials.fail_for("cluster-b");

    let report = h
        .propagator
        .handle_ready_cluster(&xkube("xk-b", "cluster-b", true))
        .await
        .unwrap();

    assert_eq!(report.applied, 0);
    assert_eq!(h.secrets.list_calls.load(Ordering::SeqCst), 0);
    assert!(h.propagator.credentials().get("cluster-b").is_none());
}

#[tokio::test]
async fn test_failed_apply_is_isolated_and_retried() {
    let applier = FakeApplier::default();
    applier.fail_for("istio-system/cacerts-a");
    let h = Harness::with_applier(
        FakeReader::new(),
        vec![
            cacert_secret("cacert-a", "cluster-a", "istio-system", "cacerts-a"),
            cacert_secret("cacert-c", "cluster-c", "istio-system", "cacerts-c"),
        ],
        applier,
    );
    let target = xkube("xk-b", "cluster-b", true);

    let report = h.propagator.handle_ready_cluster(&target).await.unwrap();
    assert_eq!(report.applied, 1);
    assert_eq!(report.failed, 1);
    assert!(!h.propagator.deployed().is_deployed("cluster-a", "cluster-b"));
    assert!(h.propagator.deployed().is_deployed("cluster-c", "cluster-b"));

    let retry = h.propagator.handle_ready_cluster(&target).await.unwrap();
    assert_eq!(retry.failed, 1);
    assert_eq!(retry.skipped, 1);
}

#[tokio::test]
async fn test_delivered_pair_is_not_reapplied_after_partial_failure() {
    let applier = FakeApplier::default();
    applier.fail_for("submariner/broker-ca");
    let h = Harness::with_applier(
        FakeReader::new(),
        vec![
            cacert_secret("cacert-a-1", "cluster-a", "istio-system", "cacerts"),
            cacert_secret("cacert-a-2", "cluster-a", "submariner", "broker-ca"),
        ],
        applier,
    );
    let target = xkube("xk-b", "cluster-b", true);

    let first = h.propagator.handle_ready_cluster(&target).await.unwrap();
    assert_eq!(first.applied, 1);
    assert_eq!(first.failed, 1);
    assert!(h.propagator.deployed().is_deployed("cluster-a", "cluster-b"));

    let second = h.propagator.handle_ready_cluster(&target).await.unwrap();
    assert_eq!(second.applied, 0);
    assert_eq!(second.failed, 0);
    assert_eq!(second.skipped, 2);

    let applied = h.applier.applied.lock().unwrap().clone();
    assert_eq!(
        applied,
        vec![(
            "kubeconfig-cluster-b".to_string(),
            "istio-system/cacerts".to_string()
        )]
    );
}

#[tokio::test]
async fn test_all_secrets_of_a_source_are_delivered() {
    let h = Harness::new(
        FakeReader::new(),
        vec![
            cacert_secret("cacert-a-1", "cluster-a", "istio-system", "cacerts"),
            cacert_secret("cacert-a-2", "cluster-a", "submariner", "broker-ca"),
        ],
    );

    let report = h
        .propagator
        .handle_ready_cluster(&xkube("xk-b", "cluster-b", true))
        .await
        .unwrap();
    assert_eq!(report.applied, 2);
    assert_eq!(h.propagator.deployed().len(), 1);
}

#[tokio::test]
async fn test_cleared_source_is_redelivered() {
    let h = Harness::new(
        FakeReader::new(),
        vec![cacert_secret("cacert-a", "cluster-a", "istio-system", "cacerts")],
    );
    let target = xkube("xk-b", "cluster-b", true);

    h.propagator.handle_ready_cluster(&target).await.unwrap();
    h.propagator.deployed().clear_source("cluster-a");
    h.propagator.handle_ready_cluster(&target).await.unwrap();

    assert_eq!(h.applier.count(), 2);
}

#[tokio::test(start_paused = true)]
async fn test_apply_is_time_bounded() {
    let h = Harness::with_applier(
        FakeReader::new(),
        vec![cacert_secret("cacert-a", "cluster-a", "istio-system", "cacerts")],
        FakeApplier::slow(Duration::from_secs(60)),
    );

    let report = h
        .propagator
        .handle_ready_cluster(&xkube("xk-b", "cluster-b", true))
        .await
        .unwrap();
    assert_eq!(report.failed, 1);
    assert_eq!(h.applier.count(), 0);
    assert!(!h.propagator.deployed().is_deployed("cluster-a", "cluster-b"));
}

#[tokio::test]
async fn test_controller_stops_when_all_clusters_ready() {
    let reader = FakeReader::with_open_watch();
    reader.set_list(
        "xkubes",
        vec![
            xkube("xk-a", "cluster-a", false),
            xkube("xk-b", "cluster-b", false),
            xkube("xk-c", "cluster-c", false),
        ],
    );
    reader.push_watch_event(WatchEvent::added(xkube("xk-a", "cluster-a", true)));
    reader.push_watch_event(WatchEvent::added(xkube("xk-b", "cluster-b", false)));
    reader.push_watch_error("410 Gone: too old resource version");
    reader.push_watch_event(WatchEvent::added(xkube("xk-c", "cluster-c", true)));
    reader.push_watch_event(WatchEvent::modified(xkube("xk-a", "cluster-a", true)));
    reader.push_watch_event(WatchEvent::modified(xkube("xk-b", "cluster-b", true)));
    // after completion; never consumed
    reader.push_watch_event(WatchEvent::modified(xkube("xk-a", "cluster-a", false)));
    reader.push_watch_event(WatchEvent::modified(xkube("xk-a", "cluster-a", true)));
    let h = Harness::new(
        reader,
        vec![
            cacert_secret("cacert-a", "cluster-a", "istio-system", "cacerts-a"),
            cacert_secret("cacert-b", "cluster-b", "istio-system", "cacerts-b"),
            cacert_secret("cacert-c", "cluster-c", "istio-system", "cacerts-c"),
        ],
    );
    let ready_events = Arc::new(AtomicUsize::new(0));
    let counter = Arc::clone(&ready_events);
    let controller = h.controller().with_sink(Arc::new(move |_: &ProgressEvent| {
        counter.fetch_add(1, Ordering::SeqCst);
    }));
    let parent = CancellationToken::new();

    let summary = tokio::time::timeout(Duration::from_secs(5), controller.run(&parent))
        .await
        .expect("controller should stop on its own")
        .unwrap();

    assert_eq!(summary.ready, 3);
    assert_eq!(summary.total, 3);
    assert_eq!(ready_events.load(Ordering::SeqCst), 3);
    assert_eq!(h.credentials.fetch_count(), 3);
    assert!(!parent.is_cancelled());
    // every cluster receives the secrets of the two others
    assert_eq!(h.applier.count(), 6);
}

#[tokio::test(start_paused = true)]
async fn test_clusters_created_later_do_not_complete_the_run() {
    let reader = FakeReader::with_open_watch();
    reader.set_list(
        "xkubes",
        vec![
            xkube("xk-a", "cluster-a", false),
            xkube("xk-b", "cluster-b", false),
        ],
    );
    reader.push_watch_event(WatchEvent::added(xkube("xk-a", "cluster-a", true)));
    reader.push_watch_event(WatchEvent::added(xkube("xk-new", "cluster-new", true)));
    reader.push_watch_event(WatchEvent::added(xkube("xk-b", "cluster-b", false)));
    let h = Harness::new(
        reader,
        vec![cacert_secret("cacert-a", "cluster-a", "istio-system", "cacerts")],
    );
    let cancel = CancellationToken::new();

    let trigger = cancel.clone();
    tokio::spawn(async move {
        tokio::time::sleep(Duration::from_secs(1)).await;
        trigger.cancel();
    });

    let summary = h.controller().run(&cancel).await.unwrap();
    assert_eq!(summary.ready, 1);
    assert_eq!(summary.total, 2);
    // the new cluster is still served
    assert_eq!(h.credentials.fetch_count(), 2);
    assert!(h.propagator.deployed().is_deployed("cluster-a", "cluster-new"));
}

#[tokio::test]
async fn test_flapping_cluster_reruns_handler_without_reapplying() {
    let reader = FakeReader::with_open_watch();
    reader.set_list(
        "xkubes",
        vec![
            xkube("xk-a", "cluster-a", false),
            xkube("xk-b", "cluster-b", false),
        ],
    );
    reader.push_watch_event(WatchEvent::added(xkube("xk-b", "cluster-b", true)));
    reader.push_watch_event(WatchEvent::modified(xkube("xk-b", "cluster-b", false)));
    reader.push_watch_event(WatchEvent::deleted(xkube("xk-b", "cluster-b", false)));
    reader.push_watch_event(WatchEvent::modified(xkube("xk-b", "cluster-b", true)));
    reader.push_watch_event(WatchEvent::added(xkube("xk-a", "cluster-a", true)));
    let h = Harness::new(
        reader,
        vec![cacert_secret("cacert-a", "cluster-a", "istio-system", "cacerts")],
    );

    let summary = h.controller().run(&CancellationToken::new()).await.unwrap();

    assert_eq!(summary.ready, 2);
    assert_eq!(h.credentials.fetch_count(), 3);
    assert_eq!(h.applier.count(), 1);
}

#[tokio::test]
async fn test_watch_closed_before_completion_is_an_error() {
    let reader = FakeReader::new();
    reader.set_list(
        "xkubes",
        vec![
            xkube("xk-a", "cluster-a", false),
            xkube("xk-b", "cluster-b", false),
        ],
    );
    reader.push_watch_event(WatchEvent::added(xkube("xk-a", "cluster-a", true)));
    let h = Harness::new(reader, vec![]);

    let err = h.controller().run(&CancellationToken::new()).await.unwrap_err();
    assert!(matches!(
        err,
        PropagationError::WatchClosed {
            ready: 1,
            total: 2,
            ..
        }
    ));
}

#[tokio::test(start_paused = true)]
async fn test_parent_cancel_stops_empty_run() {
    let reader = FakeReader::with_open_watch();
    let h = Harness::new(reader, vec![]);
    let cancel = CancellationToken::new();

    let trigger = cancel.clone();
    tokio::spawn(async move {
        tokio::time::sleep(Duration::from_secs(1)).await;
        trigger.cancel();
    });

    let summary = h.controller().run(&cancel).await.unwrap();
    assert_eq!(summary.total, 0);
    assert_eq!(h.reader.list_calls.load(Ordering::SeqCst), 1);
}
