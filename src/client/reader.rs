//! # Kubernetes Reader
//!
//! [`ResourceReader`] and [`SecretStore`] over a `kube::Client`, using dynamic objects
//! so no custom resource types have to be compiled in.

use super::{ResourceReader, SecretStore, WatchEvent, WatchStream};
use crate::document::Document;
use crate::error::ReaderError;
use crate::resource::ResourceType;
use async_trait::async_trait;
use futures::StreamExt;
use k8s_openapi::api::core::v1::Secret;
use kube::api::{Api, DynamicObject, ListParams};
use kube::Client;
use kube_runtime::watcher::{self, Event};
use kube_runtime::WatchStreamExt;
use tracing::debug;

/// Reads resources from the cluster the client points at
#[derive(Clone)]
pub struct KubeReader {
    client: Client,
}

impl std::fmt::Debug for KubeReader {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("KubeReader").finish_non_exhaustive()
    }
}

impl KubeReader {
    pub fn new(client: Client) -> Self {
        Self { client }
    }

    fn dynamic_api(&self, resource_type: &ResourceType, namespace: &str) -> Api<DynamicObject> {
        let ar = resource_type.api_resource();
        if namespace.is_empty() {
            Api::all_with(self.client.clone(), &ar)
        } else {
            Api::namespaced_with(self.client.clone(), namespace, &ar)
        }
    }
}

fn to_document(object: DynamicObject) -> Result<Document, ReaderError> {
    Document::try_from(object).map_err(|e| ReaderError::Decode {
        what: "dynamic object".to_string(),
        message: e.to_string(),
    })
}

#[async_trait]
impl ResourceReader for KubeReader {
    async fn get(
        &self,
        resource_type: &ResourceType,
        namespace: &str,
        name: &str,
    ) -> Result<Option<Document>, ReaderError> {
        debug!(resource = %resource_type, namespace, name, "get");
        self.dynamic_api(resource_type, namespace)
            .get_opt(name)
            .await?
            .map(to_document)
            .transpose()
    }

    async fn list(
        &self,
        resource_type: &ResourceType,
        namespace: &str,
    ) -> Result<Vec<Document>, ReaderError> {
        debug!(resource = %resource_type, namespace, "list");
        let list = self
            .dynamic_api(resource_type, namespace)
            .list(&ListParams::default())
            .await?;
        list.items.into_iter().map(to_document).collect()
    }

    fn watch(&self, resource_type: &ResourceType, namespace: &str) -> WatchStream {
        debug!(resource = %resource_type, namespace, "watch");
        watcher::watcher(
            self.dynamic_api(resource_type, namespace),
            watcher::Config::default(),
        )
        .default_backoff()
        .filter_map(|event| async move {
            match event {
                Ok(Event::InitApply(obj)) => Some(to_document(obj).map(WatchEvent::added)),
                Ok(Event::Apply(obj)) => Some(to_document(obj).map(WatchEvent::modified)),
                Ok(Event::Delete(obj)) => Some(to_document(obj).map(WatchEvent::deleted)),
                Ok(Event::Init | Event::InitDone) => None,
                Err(e) => Some(Err(ReaderError::Watch(e.to_string()))),
            }
        })
        .boxed()
    }
}

#[async_trait]
impl SecretStore for KubeReader {
    async fn list_secrets(
        &self,
        namespace: &str,
        label_selector: &str,
    ) -> Result<Vec<Secret>, ReaderError> {
        let api: Api<Secret> = Api::namespaced(self.client.clone(), namespace);
        let list = api
            .list(&ListParams::default().labels(label_selector))
            .await?;
        Ok(list.items)
    }

    async fn get_secret(&self, namespace: &str, name: &str) -> Result<Option<Secret>, ReaderError> {
        let api: Api<Secret> = Api::namespaced(self.client.clone(), namespace);
        Ok(api.get_opt(name).await?)
    }
}
