//! # Ready Handler
//!
//! Runs when a cluster becomes ready: caches its credential and delivers every
//! propagatable secret that originates from another cluster.
//!
//! A (source, target) pair is marked deployed as soon as one secret from that source is
//! applied. Pairs marked by an earlier pass are skipped; the remaining secrets of a
//! source first served in the current pass are still delivered.

use super::state::{CredentialCache, DeployedMatrix};
use crate::client::{ClusterIdentity, CredentialProvider, RemoteApplier, SecretStore};
use crate::constants::{
    CACERT_SECRET_SELECTOR, CLUSTER_NAME_PATH, REMOTE_SECRET_KEY, SOURCE_CLUSTER_LABEL,
};
use crate::document::Document;
use crate::error::PropagationError;
use k8s_openapi::api::core::v1::Secret;
use std::collections::BTreeSet;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, error, info, warn};

/// Outcome of one ready-handler pass
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PropagationReport {
    /// Target cluster id; empty when the cluster was skipped
    pub target: String,
    pub applied: usize,
    pub skipped: usize,
    pub failed: usize,
}

/// Delivers propagatable secrets to clusters as they become ready
pub struct Propagator {
    secrets: Arc<dyn SecretStore>,
    credentials: Arc<dyn CredentialProvider>,
    applier: Arc<dyn RemoteApplier>,
    deployed: Arc<DeployedMatrix>,
    cache: Arc<CredentialCache>,
    namespace: String,
    apply_timeout: Duration,
}

impl std::fmt::Debug for Propagator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Propagator")
            .field("namespace", &self.namespace)
            .field("apply_timeout", &self.apply_timeout)
            .field("deployed", &self.deployed)
            .finish_non_exhaustive()
    }
}

impl Propagator {
    pub fn new(
        secrets: Arc<dyn SecretStore>,
        credentials: Arc<dyn CredentialProvider>,
        applier: Arc<dyn RemoteApplier>,
        namespace: impl Into<String>,
        apply_timeout: Duration,
    ) -> Self {
        Self {
            secrets,
            credentials,
            applier,
            deployed: Arc::new(DeployedMatrix::new()),
            cache: Arc::new(CredentialCache::new()),
            namespace: namespace.into(),
            apply_timeout,
        }
    }

    /// Delivered (source, target) pairs
    pub fn deployed(&self) -> &Arc<DeployedMatrix> {
        &self.deployed
    }

    /// Credentials of clusters observed ready
    pub fn credentials(&self) -> &Arc<CredentialCache> {
        &self.cache
    }

    /// Handle a membership object that just became ready
    ///
    /// Clusters without `status.clusterName` are skipped silently; credential failures
    /// are logged and skip the cluster until its next ready transition. Per-secret
    /// failures are logged and counted. Only a failure to list secrets is returned.
    pub async fn handle_ready_cluster(
        &self,
        xkube: &Document,
    ) -> Result<PropagationReport, PropagationError> {
        let Some(target) = xkube
            .nested_str(CLUSTER_NAME_PATH)
            .ok()
            .flatten()
            .filter(|id| !id.is_empty())
        else {
            debug!("{} has no cluster name yet, skipping", xkube.name());
            return Ok(PropagationReport::default());
        };
        info!("handling ready cluster {} ({})", target, xkube.name());

        let identity = ClusterIdentity {
            member: xkube.name().to_string(),
            cluster_id: target.to_string(),
        };
        let credential = match self.credentials.fetch(&identity).await {
            Ok(credential) if !credential.is_blank() => credential,
            Ok(_) => {
                warn!("kubeconfig for {} is empty, skipping", identity.member);
                return Ok(PropagationReport::default());
            }
            Err(e) => {
                warn!("fetching kubeconfig for {} failed, skipping: {}", identity.member, e);
                return Ok(PropagationReport::default());
            }
        };
        self.cache.insert(target, credential);

        let secrets = self
            .secrets
            .list_secrets(&self.namespace, CACERT_SECRET_SELECTOR)
            .await
            .map_err(|source| PropagationError::SecretListing {
                namespace: self.namespace.clone(),
                source,
            })?;

        let mut report = PropagationReport {
            target: target.to_string(),
            ..PropagationReport::default()
        };
        let mut served_now = BTreeSet::new();

        for secret in &secrets {
            let source = secret
                .metadata
                .labels
                .as_ref()
                .and_then(|labels| labels.get(SOURCE_CLUSTER_LABEL))
                .map(String::as_str)
                .unwrap_or_default();
            let served_before =
                !served_now.contains(source) && self.deployed.is_deployed(source, target);
            if source.is_empty() || source == target || served_before {
                report.skipped += 1;
                continue;
            }

            match self.deliver(secret, target).await {
                Ok(()) => {
                    report.applied += 1;
                    self.deployed.mark_deployed(source, target);
                    served_now.insert(source);
                    info!("propagated secret (source={}) to target={}", source, target);
                }
                Err(e) => {
                    report.failed += 1;
                    error!(
                        source_cluster = source,
                        target_cluster = target,
                        error = %e,
                        "propagation.error"
                    );
                }
            }
        }

        Ok(report)
    }

    /// Apply the manifest embedded in `secret` to the `target` cluster
    async fn deliver(&self, secret: &Secret, target: &str) -> Result<(), PropagationError> {
        let manifest = embedded_secret(secret)?;
        let namespace = manifest.metadata.namespace.clone().unwrap_or_default();
        let name = manifest.metadata.name.clone().unwrap_or_default();

        let credential =
            self.cache
                .get(target)
                .ok_or_else(|| PropagationError::MissingCredential {
                    cluster: target.to_string(),
                })?;

        match tokio::time::timeout(self.apply_timeout, self.applier.apply(&credential, &manifest))
            .await
        {
            Ok(Ok(())) => Ok(()),
            Ok(Err(source)) => Err(PropagationError::Apply {
                namespace,
                name,
                target: target.to_string(),
                source,
            }),
            Err(_elapsed) => Err(PropagationError::ApplyTimeout {
                namespace,
                name,
                target: target.to_string(),
                timeout: self.apply_timeout,
            }),
        }
    }
}

/// Decode the Secret manifest stored under `remote-secret.yaml`
///
/// The manifest must carry both `metadata.name` and `metadata.namespace`.
pub fn embedded_secret(secret: &Secret) -> Result<Secret, PropagationError> {
    let origin_namespace = secret.metadata.namespace.clone().unwrap_or_default();
    let origin_name = secret.metadata.name.clone().unwrap_or_default();

    let raw: Option<&[u8]> = secret
        .data
        .as_ref()
        .and_then(|data| data.get(REMOTE_SECRET_KEY))
        .map(|bytes| bytes.0.as_slice())
        .or_else(|| {
            secret
                .string_data
                .as_ref()
                .and_then(|data| data.get(REMOTE_SECRET_KEY))
                .map(String::as_bytes)
        });
    let Some(raw) = raw else {
        return Err(PropagationError::MissingManifest {
            namespace: origin_namespace,
            name: origin_name,
            key: REMOTE_SECRET_KEY.to_string(),
        });
    };

    let manifest: Secret =
        serde_yaml::from_slice(raw).map_err(|source| PropagationError::InvalidManifest {
            namespace: origin_namespace.clone(),
            name: origin_name.clone(),
            source,
        })?;

    let has_name = manifest.metadata.name.as_deref().is_some_and(|n| !n.is_empty());
    let has_namespace = manifest
        .metadata
        .namespace
        .as_deref()
        .is_some_and(|n| !n.is_empty());
    if !has_name || !has_namespace {
        return Err(PropagationError::IncompleteManifest {
            namespace: origin_namespace,
            name: origin_name,
        });
    }
    Ok(manifest)
}
