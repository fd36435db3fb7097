//! # Kubeconfig Credentials
//!
//! Resolves the kubeconfig of a member cluster from the management cluster.
//!
//! Lookup order:
//! 1. a cached static kubeconfig secret `<member>-static-kubeconfig` in the home namespace,
//!    used only while its `skycluster.io/expiry` annotation lies in the future
//! 2. the secret named by the `XKube` object's `status.clusterSecretName`

use super::{ClusterIdentity, Credential, CredentialProvider, ResourceReader, SecretStore};
use crate::constants::{
    CLUSTER_SECRET_NAME_PATH, EXPIRY_ANNOTATION, KUBECONFIG_KEY, STATIC_KUBECONFIG_SUFFIX,
};
use crate::error::CredentialError;
use crate::resource::ResourceType;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use k8s_openapi::api::core::v1::Secret;
use std::sync::Arc;
use tracing::debug;

/// Fetches kubeconfigs stored as secrets on the management cluster
#[derive(Clone)]
pub struct KubeconfigProvider {
    reader: Arc<dyn ResourceReader>,
    secrets: Arc<dyn SecretStore>,
    namespace: String,
}

impl std::fmt::Debug for KubeconfigProvider {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("KubeconfigProvider")
            .field("namespace", &self.namespace)
            .finish_non_exhaustive()
    }
}

impl KubeconfigProvider {
    pub fn new(
        reader: Arc<dyn ResourceReader>,
        secrets: Arc<dyn SecretStore>,
        namespace: impl Into<String>,
    ) -> Self {
        Self {
            reader,
            secrets,
            namespace: namespace.into(),
        }
    }

    async fn cached_static(&self, member: &str) -> Result<Option<Credential>, CredentialError> {
        let name = format!("{member}{STATIC_KUBECONFIG_SUFFIX}");
        let Some(secret) = self.secrets.get_secret(&self.namespace, &name).await? else {
            return Ok(None);
        };
        if !is_unexpired(&secret, Utc::now()) {
            debug!("static kubeconfig {}/{} is expired or undated", self.namespace, name);
            return Ok(None);
        }
        match secret_data(&secret, &self.namespace, &name, KUBECONFIG_KEY) {
            Ok(credential) => Ok(Some(credential)),
            Err(e) => {
                debug!("ignoring static kubeconfig {}/{}: {}", self.namespace, name, e);
                Ok(None)
            }
        }
    }
}

#[async_trait]
impl CredentialProvider for KubeconfigProvider {
    async fn fetch(&self, cluster: &ClusterIdentity) -> Result<Credential, CredentialError> {
        if let Some(credential) = self.cached_static(&cluster.member).await? {
            debug!("using static kubeconfig for {}", cluster.member);
            return Ok(credential);
        }

        let xkube = self
            .reader
            .get(&ResourceType::xkube(), "", &cluster.member)
            .await?
            .ok_or_else(|| CredentialError::MembershipNotFound {
                name: cluster.member.clone(),
            })?;
        let secret_name = xkube
            .nested_str(CLUSTER_SECRET_NAME_PATH)
            .ok()
            .flatten()
            .filter(|s| !s.is_empty())
            .ok_or_else(|| CredentialError::MissingField {
                name: cluster.member.clone(),
                field: CLUSTER_SECRET_NAME_PATH.join("."),
            })?;

        let secret = self
            .secrets
            .get_secret(&self.namespace, secret_name)
            .await?
            .ok_or_else(|| CredentialError::SecretNotFound {
                namespace: self.namespace.clone(),
                name: secret_name.to_string(),
            })?;
        secret_data(&secret, &self.namespace, secret_name, KUBECONFIG_KEY)
    }
}

/// Whether the secret's expiry annotation parses and lies after `now`
pub fn is_unexpired(secret: &Secret, now: DateTime<Utc>) -> bool {
    secret
        .metadata
        .annotations
        .as_ref()
        .and_then(|a| a.get(EXPIRY_ANNOTATION))
        .and_then(|raw| DateTime::parse_from_rfc3339(raw).ok())
        .is_some_and(|expiry| expiry.with_timezone(&Utc) > now)
}

/// Read `key` from a secret's `data` (or `stringData`) as a credential
fn secret_data(
    secret: &Secret,
    namespace: &str,
    name: &str,
    key: &str,
) -> Result<Credential, CredentialError> {
    if let Some(bytes) = secret.data.as_ref().and_then(|d| d.get(key)) {
        let Ok(text) = String::from_utf8(bytes.0.clone()) else {
            return Err(CredentialError::InvalidEncoding {
                namespace: namespace.to_string(),
                name: name.to_string(),
            });
        };
        return Ok(Credential::new(text));
    }
    secret
        .string_data
        .as_ref()
        .and_then(|d| d.get(key))
        .map(|text| Credential::new(text.as_str()))
        .ok_or_else(|| CredentialError::MissingData {
            namespace: namespace.to_string(),
            name: name.to_string(),
            key: key.to_string(),
        })
}
