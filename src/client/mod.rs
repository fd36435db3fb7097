//! # Cluster Access
//!
//! Collaborator traits through which the waiter and the propagation controller reach
//! Kubernetes API servers, with `kube`-backed implementations.
//!
//! - [`ResourceReader`]: get, list and watch generic custom resources
//! - [`SecretStore`]: read `Secret`s on the management cluster
//! - [`CredentialProvider`]: fetch the kubeconfig of a member cluster
//! - [`RemoteApplier`]: create-or-update a `Secret` on a member cluster

pub mod credentials;
pub mod reader;
pub mod remote;

pub use self::credentials::KubeconfigProvider;
pub use self::reader::KubeReader;
pub use self::remote::KubeRemoteApplier;

use crate::document::Document;
use crate::error::{ApplyError, CredentialError, ReaderError};
use crate::resource::ResourceType;
use async_trait::async_trait;
use futures::stream::BoxStream;
use k8s_openapi::api::core::v1::Secret;
use std::fmt;
use zeroize::Zeroizing;

/// Kind of change reported by a watch
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChangeKind {
    Added,
    Modified,
    Deleted,
}

/// One change observed on a watched resource type
#[derive(Debug, Clone, PartialEq)]
pub struct WatchEvent {
    pub change: ChangeKind,
    pub document: Document,
}

impl WatchEvent {
    pub fn added(document: Document) -> Self {
        Self {
            change: ChangeKind::Added,
            document,
        }
    }

    pub fn modified(document: Document) -> Self {
        Self {
            change: ChangeKind::Modified,
            document,
        }
    }

    pub fn deleted(document: Document) -> Self {
        Self {
            change: ChangeKind::Deleted,
            document,
        }
    }
}

/// Stream of watch events; individual errors do not end the stream
pub type WatchStream = BoxStream<'static, Result<WatchEvent, ReaderError>>;

/// Read access to generic resources
///
/// An empty namespace addresses cluster-scoped objects (or all namespaces for lists).
#[async_trait]
pub trait ResourceReader: Send + Sync {
    /// Fetch one object; a missing object is `Ok(None)`
    async fn get(
        &self,
        resource_type: &ResourceType,
        namespace: &str,
        name: &str,
    ) -> Result<Option<Document>, ReaderError>;

    async fn list(
        &self,
        resource_type: &ResourceType,
        namespace: &str,
    ) -> Result<Vec<Document>, ReaderError>;

    /// Start watching; the initial state is delivered as `Added` events
    fn watch(&self, resource_type: &ResourceType, namespace: &str) -> WatchStream;
}

/// Read access to `Secret`s
#[async_trait]
pub trait SecretStore: Send + Sync {
    async fn list_secrets(
        &self,
        namespace: &str,
        label_selector: &str,
    ) -> Result<Vec<Secret>, ReaderError>;

    /// Fetch one secret; a missing secret is `Ok(None)`
    async fn get_secret(&self, namespace: &str, name: &str) -> Result<Option<Secret>, ReaderError>;
}

/// Names a member cluster
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ClusterIdentity {
    /// Name of the `XKube` object
    pub member: String,
    /// External cluster identifier from `status.clusterName`
    pub cluster_id: String,
}

/// Opaque credential blob (a kubeconfig), wiped from memory on drop
#[derive(Clone)]
pub struct Credential(Zeroizing<String>);

impl Credential {
    pub fn new(blob: impl Into<String>) -> Self {
        Self(Zeroizing::new(blob.into()))
    }

    /// Borrow the raw blob
    pub fn expose(&self) -> &str {
        self.0.as_str()
    }

    pub fn is_blank(&self) -> bool {
        self.0.trim().is_empty()
    }
}

impl fmt::Debug for Credential {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("Credential(<redacted>)")
    }
}

/// Fetches the credential of a member cluster
#[async_trait]
pub trait CredentialProvider: Send + Sync {
    async fn fetch(&self, cluster: &ClusterIdentity) -> Result<Credential, CredentialError>;
}

/// Creates or updates a `Secret` on a remote cluster
#[async_trait]
pub trait RemoteApplier: Send + Sync {
    async fn apply(&self, credential: &Credential, secret: &Secret) -> Result<(), ApplyError>;
}
