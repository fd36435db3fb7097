//! # Resource Types and Descriptors
//!
//! Identifies the custom resources the CLI reads, and describes the resources whose
//! readiness a wait run tracks.

use crate::constants::{
    READY_CONDITION, SKYCLUSTER_GROUP, SKYCLUSTER_VERSION, XKUBE_KIND, XKUBE_MESH_KIND,
    XKUBE_MESH_RESOURCE, XKUBE_RESOURCE,
};
use kube::api::{ApiResource, GroupVersionKind};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::time::Duration;

/// Group, version, plural resource and kind of a Kubernetes API type
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ResourceType {
    pub group: String,
    pub version: String,
    /// Plural resource name, e.g. `objects`
    pub resource: String,
    pub kind: String,
}

impl ResourceType {
    pub fn new(group: &str, version: &str, resource: &str, kind: &str) -> Self {
        Self {
            group: group.to_string(),
            version: version.to_string(),
            resource: resource.to_string(),
            kind: kind.to_string(),
        }
    }

    /// Cluster-membership objects (`XKube`)
    pub fn xkube() -> Self {
        Self::new(SKYCLUSTER_GROUP, SKYCLUSTER_VERSION, XKUBE_RESOURCE, XKUBE_KIND)
    }

    /// Interconnect object (`XKubeMesh`)
    pub fn xkube_mesh() -> Self {
        Self::new(
            SKYCLUSTER_GROUP,
            SKYCLUSTER_VERSION,
            XKUBE_MESH_RESOURCE,
            XKUBE_MESH_KIND,
        )
    }

    /// Crossplane provider-kubernetes `Object`
    pub fn crossplane_object() -> Self {
        Self::new("kubernetes.crossplane.io", "v1alpha2", "objects", "Object")
    }

    /// Crossplane provider-helm `Release`
    pub fn helm_release() -> Self {
        Self::new("helm.crossplane.io", "v1beta1", "releases", "Release")
    }

    /// `group/version`, or just `version` for the core group
    pub fn api_version(&self) -> String {
        if self.group.is_empty() {
            self.version.clone()
        } else {
            format!("{}/{}", self.group, self.version)
        }
    }

    /// Discovery-free `ApiResource` for dynamic API access
    pub fn api_resource(&self) -> ApiResource {
        let gvk = GroupVersionKind::gvk(&self.group, &self.version, &self.kind);
        ApiResource::from_gvk_with_plural(&gvk, &self.resource)
    }
}

impl fmt::Display for ResourceType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.group.is_empty() {
            write!(f, "{}", self.resource)
        } else {
            write!(f, "{}.{}", self.resource, self.group)
        }
    }
}

/// One resource whose readiness condition should be awaited
#[derive(Debug, Clone, PartialEq)]
pub struct ResourceDescriptor {
    /// Human-readable label used in progress output
    pub kind_description: String,
    pub resource_type: ResourceType,
    /// Empty for cluster-scoped resources
    pub namespace: String,
    /// Concrete object name; empty until resolved from `fingerprint`
    pub name: String,
    /// Declarative name the generated object carries in its spec
    pub fingerprint: String,
    pub condition: String,
    pub timeout: Duration,
    pub poll_interval: Duration,
}

impl ResourceDescriptor {
    /// Descriptor for an object whose name is already known
    pub fn named(
        kind_description: &str,
        resource_type: ResourceType,
        namespace: &str,
        name: &str,
    ) -> Self {
        Self {
            kind_description: kind_description.to_string(),
            resource_type,
            namespace: namespace.to_string(),
            name: name.to_string(),
            fingerprint: String::new(),
            condition: READY_CONDITION.to_string(),
            timeout: Duration::from_secs(60),
            poll_interval: Duration::from_secs(5),
        }
    }

    /// Descriptor for a generated object located through its manifest fingerprint
    pub fn fingerprinted(
        kind_description: &str,
        resource_type: ResourceType,
        namespace: &str,
        fingerprint: &str,
    ) -> Self {
        Self {
            fingerprint: fingerprint.to_string(),
            ..Self::named(kind_description, resource_type, namespace, "")
        }
    }

    #[must_use]
    pub fn with_timing(mut self, timeout: Duration, poll_interval: Duration) -> Self {
        self.timeout = timeout;
        self.poll_interval = poll_interval;
        self
    }

    /// Whether the name resolver still has to fill in `name`
    pub fn needs_resolution(&self) -> bool {
        self.name.is_empty() && !self.fingerprint.is_empty()
    }
}
