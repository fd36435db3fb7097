//! In-memory collaborators shared by the integration tests.

#![allow(dead_code, reason = "each test binary uses a different subset")]

use async_trait::async_trait;
use futures::stream::{self, StreamExt};
use k8s_openapi::api::core::v1::Secret;
use k8s_openapi::ByteString;
use kube::api::ObjectMeta;
use serde_json::json;
use skycluster_ctl::client::{
    ClusterIdentity, Credential, CredentialProvider, RemoteApplier, ResourceReader, SecretStore,
    WatchEvent, WatchStream,
};
use skycluster_ctl::error::{ApplyError, CredentialError, ReaderError};
use skycluster_ctl::{Document, ResourceType};
use std::collections::{BTreeMap, HashMap, VecDeque};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;
use std::time::Duration;

/// Scripted answer to a `get`
#[derive(Debug, Clone)]
pub enum Reply {
    Missing,
    Fail,
    Found(Document),
}

/// Reader answering `get` from per-name scripts (the last reply repeats)
#[derive(Default)]
pub struct FakeReader {
    replies: Mutex<HashMap<String, VecDeque<Reply>>>,
    lists: Mutex<HashMap<String, Vec<Document>>>,
    watch_events: Mutex<Vec<Result<WatchEvent, ReaderError>>>,
    keep_watch_open: bool,
    pub reads: Mutex<Vec<String>>,
    pub list_calls: AtomicUsize,
}

impl FakeReader {
    pub fn new() -> Self {
        Self::default()
    }

    /// Watch stream stays open after the scripted events
    pub fn with_open_watch() -> Self {
        Self {
            keep_watch_open: true,
            ..Self::default()
        }
    }

    pub fn script(&self, name: &str, replies: Vec<Reply>) {
        self.replies
            .lock()
            .unwrap()
            .insert(name.to_string(), replies.into());
    }

    pub fn set_list(&self, resource: &str, documents: Vec<Document>) {
        self.lists
            .lock()
            .unwrap()
            .insert(resource.to_string(), documents);
    }

    pub fn push_watch_event(&self, event: WatchEvent) {
        self.watch_events.lock().unwrap().push(Ok(event));
    }

    pub fn push_watch_error(&self, message: &str) {
        self.watch_events
            .lock()
            .unwrap()
            .push(Err(ReaderError::Watch(message.to_string())));
    }

    pub fn reads_of(&self, name: &str) -> usize {
        self.reads.lock().unwrap().iter().filter(|n| *n == name).count()
    }
}

#[async_trait]
impl ResourceReader for FakeReader {
    async fn get(
        &self,
        _resource_type: &ResourceType,
        _namespace: &str,
        name: &str,
    ) -> Result<Option<Document>, ReaderError> {
        self.reads.lock().unwrap().push(name.to_string());
        let reply = {
            let mut replies = self.replies.lock().unwrap();
            match replies.get_mut(name) {
                Some(queue) if queue.len() > 1 => queue.pop_front(),
                Some(queue) => queue.front().cloned(),
                None => None,
            }
        };
        match reply {
            Some(Reply::Found(doc)) => Ok(Some(doc)),
            Some(Reply::Fail) => Err(ReaderError::Watch("connection refused".to_string())),
            Some(Reply::Missing) | None => Ok(None),
        }
    }

    async fn list(
        &self,
        resource_type: &ResourceType,
        _namespace: &str,
    ) -> Result<Vec<Document>, ReaderError> {
        self.list_calls.fetch_add(1, Ordering::SeqCst);
        Ok(self
            .lists
            .lock()
            .unwrap()
            .get(&resource_type.resource)
            .cloned()
            .unwrap_or_default())
    }

    fn watch(&self, _resource_type: &ResourceType, _namespace: &str) -> WatchStream {
        let events: Vec<_> = self.watch_events.lock().unwrap().drain(..).collect();
        let scripted = stream::iter(events);
        if self.keep_watch_open {
            scripted.chain(stream::pending()).boxed()
        } else {
            scripted.boxed()
        }
    }
}

/// Secret store over a fixed set of secrets
#[derive(Default)]
pub struct FakeSecrets {
    secrets: Mutex<Vec<Secret>>,
    pub list_calls: AtomicUsize,
}

impl FakeSecrets {
    pub fn new(secrets: Vec<Secret>) -> Self {
        Self {
            secrets: Mutex::new(secrets),
            list_calls: AtomicUsize::new(0),
        }
    }
}

#[async_trait]
impl SecretStore for FakeSecrets {
    async fn list_secrets(
        &self,
        _namespace: &str,
        _label_selector: &str,
    ) -> Result<Vec<Secret>, ReaderError> {
        self.list_calls.fetch_add(1, Ordering::SeqCst);
        Ok(self.secrets.lock().unwrap().clone())
    }

    async fn get_secret(&self, namespace: &str, name: &str) -> Result<Option<Secret>, ReaderError> {
        Ok(self
            .secrets
            .lock()
            .unwrap()
            .iter()
            .find(|s| {
                s.metadata.namespace.as_deref() == Some(namespace)
                    && s.metadata.name.as_deref() == Some(name)
            })
            .cloned())
    }
}

/// Credential provider returning `kubeconfig-<cluster id>` unless told to fail
#[derive(Default)]
pub struct FakeCredentials {
    failing: Mutex<Vec<String>>,
    pub fetches: AtomicUsize,
}

impl FakeCredentials {
    pub fn fail_for(&self, cluster_id: &str) {
        self.failing.lock().unwrap().push(cluster_id.to_string());
    }

    pub fn fetch_count(&self) -> usize {
        self.fetches.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl CredentialProvider for FakeCredentials {
    async fn fetch(&self, cluster: &ClusterIdentity) -> Result<Credential, CredentialError> {
        self.fetches.fetch_add(1, Ordering::SeqCst);
        if self.failing.lock().unwrap().contains(&cluster.cluster_id) {
            return Err(CredentialError::MembershipNotFound {
                name: cluster.member.clone(),
            });
        }
        Ok(Credential::new(format!("kubeconfig-{}", cluster.cluster_id)))
    }
}

/// Records every apply as `(credential, namespace/name)`
#[derive(Default)]
pub struct FakeApplier {
    pub applied: Mutex<Vec<(String, String)>>,
    failing: Mutex<Vec<String>>,
    delay: Option<Duration>,
}

impl FakeApplier {
    pub fn slow(delay: Duration) -> Self {
        Self {
            delay: Some(delay),
            ..Self::default()
        }
    }

    /// Fail applies of the secret `namespace/name`
    pub fn fail_for(&self, key: &str) {
        self.failing.lock().unwrap().push(key.to_string());
    }

    pub fn count(&self) -> usize {
        self.applied.lock().unwrap().len()
    }
}

#[async_trait]
impl RemoteApplier for FakeApplier {
    async fn apply(&self, credential: &Credential, secret: &Secret) -> Result<(), ApplyError> {
        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }
        let key = format!(
            "{}/{}",
            secret.metadata.namespace.as_deref().unwrap_or_default(),
            secret.metadata.name.as_deref().unwrap_or_default()
        );
        if self.failing.lock().unwrap().contains(&key) {
            return Err(ApplyError::InvalidKubeconfig("rejected".to_string()));
        }
        self.applied
            .lock()
            .unwrap()
            .push((credential.expose().to_string(), key));
        Ok(())
    }
}

/// Membership object with the given readiness
pub fn xkube(name: &str, cluster_id: &str, ready: bool) -> Document {
    Document::new(json!({
        "apiVersion": "skycluster.io/v1alpha1",
        "kind": "XKube",
        "metadata": {"name": name},
        "status": {
            "clusterName": cluster_id,
            "conditions": [{"type": "Ready", "status": if ready { "True" } else { "False" }}]
        }
    }))
}

/// Crossplane `Object` whose manifest declares `fingerprint`
pub fn crossplane_object(name: &str, namespace: &str, fingerprint: &str, ready: bool) -> Document {
    Document::new(json!({
        "metadata": {"name": name, "namespace": namespace},
        "spec": {"forProvider": {"manifest": {"metadata": {"name": fingerprint}}}},
        "status": {
            "conditions": [{"type": "Ready", "status": if ready { "True" } else { "False" }}]
        }
    }))
}

/// Propagatable CA secret from `source` embedding `target_namespace/target_name`
pub fn cacert_secret(name: &str, source: &str, target_namespace: &str, target_name: &str) -> Secret {
    let manifest = format!(
        "apiVersion: v1\nkind: Secret\nmetadata:\n  name: {target_name}\n  namespace: {target_namespace}\nstringData:\n  ca.crt: cert-of-{source}\n"
    );
    Secret {
        metadata: ObjectMeta {
            name: Some(name.to_string()),
            namespace: Some("skycluster-system".to_string()),
            labels: Some(BTreeMap::from([
                (
                    "skycluster.io/secret-type".to_string(),
                    "cluster-cacert".to_string(),
                ),
                ("skycluster.io/cluster-name".to_string(), source.to_string()),
            ])),
            ..ObjectMeta::default()
        },
        data: Some(BTreeMap::from([(
            "remote-secret.yaml".to_string(),
            ByteString(manifest.into_bytes()),
        )])),
        ..Secret::default()
    }
}
