//! # Remote Apply
//!
//! Creates or updates a `Secret` on a member cluster reached through its kubeconfig.

use super::{Credential, RemoteApplier};
use crate::error::ApplyError;
use async_trait::async_trait;
use k8s_openapi::api::core::v1::Secret;
use kube::api::{Api, PostParams};
use kube::config::{KubeConfigOptions, Kubeconfig};
use kube::{Client, Config};
use tracing::{debug, info};

/// Applies secrets through a client built from the target cluster's kubeconfig
#[derive(Debug, Clone, Copy, Default)]
pub struct KubeRemoteApplier;

/// Build a client from an in-memory kubeconfig, using its current context
pub async fn client_from_kubeconfig(kubeconfig: &str) -> Result<Client, ApplyError> {
    let kubeconfig = Kubeconfig::from_yaml(kubeconfig)
        .map_err(|e| ApplyError::InvalidKubeconfig(e.to_string()))?;
    let config = Config::from_custom_kubeconfig(kubeconfig, &KubeConfigOptions::default())
        .await
        .map_err(|e| ApplyError::InvalidKubeconfig(e.to_string()))?;
    Client::try_from(config).map_err(|e| ApplyError::InvalidKubeconfig(e.to_string()))
}

#[async_trait]
impl RemoteApplier for KubeRemoteApplier {
    async fn apply(&self, credential: &Credential, secret: &Secret) -> Result<(), ApplyError> {
        if credential.is_blank() {
            return Err(ApplyError::EmptyCredential);
        }
        let client = client_from_kubeconfig(credential.expose()).await?;

        let namespace = secret.metadata.namespace.clone().unwrap_or_default();
        let name = secret.metadata.name.clone().unwrap_or_default();
        let api: Api<Secret> = Api::namespaced(client, &namespace);

        let existing = api.get_opt(&name).await.map_err(|source| ApplyError::Get {
            namespace: namespace.clone(),
            name: name.clone(),
            source,
        })?;

        let mut desired = secret.clone();
        match existing {
            None => {
                desired.metadata.resource_version = None;
                api.create(&PostParams::default(), &desired)
                    .await
                    .map_err(|source| ApplyError::Create {
                        namespace: namespace.clone(),
                        name: name.clone(),
                        source,
                    })?;
                info!("created secret {}/{} on remote cluster", namespace, name);
            }
            Some(current) => {
                desired.metadata.resource_version = current.metadata.resource_version;
                api.replace(&name, &PostParams::default(), &desired)
                    .await
                    .map_err(|source| ApplyError::Update {
                        namespace: namespace.clone(),
                        name: name.clone(),
                        source,
                    })?;
                debug!("updated secret {}/{} on remote cluster", namespace, name);
            }
        }
        Ok(())
    }
}
