//! # Error Types
//!
//! Error taxonomy for name resolution, readiness waits, credential fetches,
//! remote applies and secret propagation.
//!
//! Not-found reads are not errors: readers return `Ok(None)` and the waiter keeps polling.

use std::time::Duration;
use thiserror::Error;

/// Placeholder printed instead of an empty namespace
pub const CLUSTER_SCOPE: &str = "<cluster-scope>";

/// Render a namespace for messages, substituting the cluster-scope placeholder
pub fn display_namespace(namespace: &str) -> &str {
    if namespace.is_empty() {
        CLUSTER_SCOPE
    } else {
        namespace
    }
}

/// Path-based access into a structured document failed
#[derive(Debug, Error, PartialEq, Eq)]
pub enum DocumentError {
    /// An intermediate path segment is not an object
    #[error("the {field} field is not an object")]
    NotAnObject { field: String },
    /// The leaf value has an unexpected type
    #[error("the {field} field is not a {expected}")]
    UnexpectedType {
        field: String,
        expected: &'static str,
    },
}

/// Transient failure while reading resources from an API server
#[derive(Debug, Error)]
pub enum ReaderError {
    /// Error returned by the Kubernetes API client
    #[error("kubernetes API error: {0}")]
    Kube(#[from] kube::Error),
    /// The watch stream reported an error
    #[error("watch error: {0}")]
    Watch(String),
    /// The returned object could not be converted into a document
    #[error("failed to decode {what}: {message}")]
    Decode { what: String, message: String },
}

/// Pre-watch name resolution failed; fatal to the whole resolution pass
#[derive(Debug, Error)]
pub enum ResolveError {
    /// No fingerprint field path is known for this resource type
    #[error("unsupported resource {resource} for resolving manifest fingerprint of {kind}")]
    UnsupportedResourceType { kind: String, resource: String },
    /// Listing candidates failed
    #[error("listing {resource} for {kind}: {source}")]
    Listing {
        kind: String,
        resource: String,
        #[source]
        source: ReaderError,
    },
    /// No candidate carried the requested fingerprint
    #[error(
        "could not resolve object name for {kind} (resource={resource}, ns={namespace}, fingerprint={fingerprint:?})"
    )]
    Unresolved {
        kind: String,
        resource: String,
        namespace: String,
        fingerprint: String,
    },
}

/// Readiness wait failed; fatal to the current `wait_all` call
#[derive(Debug, Error)]
pub enum WaitError {
    /// Condition did not become true before the per-resource deadline
    #[error(
        "resource {kind} ({resource} {namespace}/{name}) did not become {condition}=True within {timeout:?}"
    )]
    Timeout {
        kind: String,
        resource: String,
        namespace: String,
        name: String,
        condition: String,
        timeout: Duration,
    },
    /// The parent cancellation token fired while waiting
    #[error("wait for {kind} ({resource} {namespace}/{name}) was cancelled")]
    Cancelled {
        kind: String,
        resource: String,
        namespace: String,
        name: String,
    },
    /// Descriptor reached the waiter without a resolved name
    #[error("resource {kind} ({resource}) has no name; resolve names before waiting")]
    Unnamed { kind: String, resource: String },
}

/// Fetching cluster credentials failed
#[derive(Debug, Error)]
pub enum CredentialError {
    /// The membership object does not exist
    #[error("cluster membership {name} not found")]
    MembershipNotFound { name: String },
    /// A required status field is absent
    #[error("{field} not present on {name}")]
    MissingField { name: String, field: String },
    /// The referenced secret does not exist
    #[error("secret {namespace}/{name} not found")]
    SecretNotFound { namespace: String, name: String },
    /// The referenced secret has no kubeconfig data
    #[error("secret {namespace}/{name} has no {key:?} data")]
    MissingData {
        namespace: String,
        name: String,
        key: String,
    },
    /// The kubeconfig bytes are not valid UTF-8
    #[error("kubeconfig in secret {namespace}/{name} is not valid UTF-8")]
    InvalidEncoding { namespace: String, name: String },
    /// Reading from the management cluster failed
    #[error(transparent)]
    Read(#[from] ReaderError),
}

/// Applying a secret on a remote cluster failed
#[derive(Debug, Error)]
pub enum ApplyError {
    /// The credential blob is blank
    #[error("empty kubeconfig for target cluster")]
    EmptyCredential,
    /// The credential blob is not a usable kubeconfig
    #[error("invalid kubeconfig for target cluster: {0}")]
    InvalidKubeconfig(String),
    /// Reading the current remote object failed
    #[error("getting remote secret {namespace}/{name}: {source}")]
    Get {
        namespace: String,
        name: String,
        #[source]
        source: kube::Error,
    },
    /// Creating the remote object failed
    #[error("creating secret {namespace}/{name} on remote cluster: {source}")]
    Create {
        namespace: String,
        name: String,
        #[source]
        source: kube::Error,
    },
    /// Updating the remote object failed
    #[error("updating secret {namespace}/{name} on remote cluster: {source}")]
    Update {
        namespace: String,
        name: String,
        #[source]
        source: kube::Error,
    },
}

/// Propagation failure; per-secret variants are logged and isolated
#[derive(Debug, Error)]
pub enum PropagationError {
    /// Initial listing of membership objects failed
    #[error("listing {resource}: {source}")]
    Listing {
        resource: String,
        #[source]
        source: ReaderError,
    },
    /// Listing propagatable secrets failed
    #[error("listing propagatable secrets in {namespace}: {source}")]
    SecretListing {
        namespace: String,
        #[source]
        source: ReaderError,
    },
    /// The source secret does not carry the embedded manifest
    #[error("secret {namespace}/{name} missing key {key:?}")]
    MissingManifest {
        namespace: String,
        name: String,
        key: String,
    },
    /// The embedded manifest is not a valid Secret
    #[error("failed to decode embedded secret from {namespace}/{name}: {source}")]
    InvalidManifest {
        namespace: String,
        name: String,
        #[source]
        source: serde_yaml::Error,
    },
    /// The embedded manifest lacks a name or namespace
    #[error(
        "embedded secret from {namespace}/{name} must include metadata.name and metadata.namespace"
    )]
    IncompleteManifest { namespace: String, name: String },
    /// No credential has been cached for the target cluster
    #[error("no credential cached for target cluster {cluster}")]
    MissingCredential { cluster: String },
    /// The remote apply failed
    #[error("applying {namespace}/{name} to {target}: {source}")]
    Apply {
        namespace: String,
        name: String,
        target: String,
        #[source]
        source: ApplyError,
    },
    /// The remote apply exceeded its time bound
    #[error("applying {namespace}/{name} to {target} timed out after {timeout:?}")]
    ApplyTimeout {
        namespace: String,
        name: String,
        target: String,
        timeout: Duration,
    },
    /// The watch stream ended before every cluster became ready
    #[error("watch on {resource} closed before all clusters became ready ({ready}/{total})")]
    WatchClosed {
        resource: String,
        ready: usize,
        total: usize,
    },
    /// The background worker panicked or was aborted
    #[error("propagation worker failed: {0}")]
    Worker(#[from] tokio::task::JoinError),
}
