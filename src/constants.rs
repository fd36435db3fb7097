//! # Constants
//!
//! API groups, label keys, data keys and defaults shared across the crate.

/// API group of the SkyCluster custom resources
pub const SKYCLUSTER_GROUP: &str = "skycluster.io";

/// API version of the SkyCluster custom resources
pub const SKYCLUSTER_VERSION: &str = "v1alpha1";

/// Plural resource name of the cluster-membership custom resource
pub const XKUBE_RESOURCE: &str = "xkubes";

/// Kind of the cluster-membership custom resource
pub const XKUBE_KIND: &str = "XKube";

/// Plural resource name of the interconnect custom resource
pub const XKUBE_MESH_RESOURCE: &str = "xkubemeshes";

/// Kind of the interconnect custom resource
pub const XKUBE_MESH_KIND: &str = "XKubeMesh";

/// Name of the single interconnect object managed by the CLI
pub const XKUBE_MESH_NAME: &str = "xkube-cluster-mesh";

/// Namespace holding kubeconfig and cacert secrets
pub const DEFAULT_HOME_NAMESPACE: &str = "skycluster-system";

/// Condition type that marks a resource as ready
pub const READY_CONDITION: &str = "Ready";

/// Label selector identifying secrets that must be propagated between clusters
pub const CACERT_SECRET_SELECTOR: &str = "skycluster.io/secret-type=cluster-cacert";

/// Label carrying the cluster a propagatable secret originates from
pub const SOURCE_CLUSTER_LABEL: &str = "skycluster.io/cluster-name";

/// Data key holding the embedded Secret manifest to apply on remote clusters
pub const REMOTE_SECRET_KEY: &str = "remote-secret.yaml";

/// Data key holding a kubeconfig inside a credentials secret
pub const KUBECONFIG_KEY: &str = "kubeconfig";

/// Annotation carrying the expiry (RFC3339) of a static kubeconfig secret
pub const EXPIRY_ANNOTATION: &str = "skycluster.io/expiry";

/// Suffix of the secret caching a static kubeconfig for a cluster
pub const STATIC_KUBECONFIG_SUFFIX: &str = "-static-kubeconfig";

/// Status path of the external cluster identifier on an XKube
pub const CLUSTER_NAME_PATH: &[&str] = &["status", "clusterName"];

/// Status path of the kubeconfig secret name on an XKube
pub const CLUSTER_SECRET_NAME_PATH: &[&str] = &["status", "clusterSecretName"];

/// Default upper bound for a single remote secret apply (seconds)
pub const DEFAULT_REMOTE_APPLY_TIMEOUT_SECS: u64 = 20;

/// Default capacity of the watch event queue feeding the propagation worker
pub const DEFAULT_WATCH_QUEUE_CAPACITY: usize = 64;

/// Default pod CIDR of the local cluster when enabling the mesh
pub const DEFAULT_POD_CIDR: &str = "10.0.0.0/19";

/// Default service CIDR of the local cluster when enabling the mesh
pub const DEFAULT_SERVICE_CIDR: &str = "10.0.32.0/19";

/// Field manager used for writes issued by the CLI
pub const FIELD_MANAGER: &str = "skyctl";
