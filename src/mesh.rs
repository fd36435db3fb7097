//! # Mesh Enablement
//!
//! Creates, updates or deletes the single `XKubeMesh` object that interconnects every
//! member cluster.

use crate::client::ResourceReader;
use crate::constants::{DEFAULT_POD_CIDR, DEFAULT_SERVICE_CIDR, FIELD_MANAGER, XKUBE_MESH_NAME};
use crate::error::ReaderError;
use crate::resource::ResourceType;
use anyhow::{Context, Result};
use kube::api::{Api, DeleteParams, DynamicObject, Patch, PatchParams};
use kube::Client;
use serde_json::{json, Value};
use tracing::{debug, info, warn};

/// CIDRs of the local (management) cluster
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LocalCluster {
    pub pod_cidr: String,
    pub service_cidr: String,
}

impl Default for LocalCluster {
    fn default() -> Self {
        Self {
            pod_cidr: DEFAULT_POD_CIDR.to_string(),
            service_cidr: DEFAULT_SERVICE_CIDR.to_string(),
        }
    }
}

/// Names of all `XKube` objects, sorted
pub async fn cluster_names(reader: &dyn ResourceReader) -> Result<Vec<String>, ReaderError> {
    let mut names: Vec<String> = reader
        .list(&ResourceType::xkube(), "")
        .await?
        .iter()
        .map(|doc| doc.name().to_string())
        .filter(|name| !name.is_empty())
        .collect();
    names.sort();
    Ok(names)
}

/// Desired `XKubeMesh` manifest
pub fn mesh_manifest(cluster_names: &[String], local: &LocalCluster) -> Value {
    let mesh = ResourceType::xkube_mesh();
    json!({
        "apiVersion": mesh.api_version(),
        "kind": mesh.kind,
        "metadata": {"name": XKUBE_MESH_NAME},
        "spec": {
            "clusterNames": cluster_names,
            "localCluster": {
                "podCidr": local.pod_cidr,
                "serviceCidr": local.service_cidr,
            },
        },
    })
}

/// Create or update the mesh so it spans every `XKube`
///
/// Returns the cluster names written, or `None` when there are no clusters.
pub async fn upsert_mesh(
    client: &Client,
    reader: &dyn ResourceReader,
    local: &LocalCluster,
) -> Result<Option<Vec<String>>> {
    let names = cluster_names(reader)
        .await
        .context("Failed to list XKube objects")?;
    if names.is_empty() {
        warn!("no XKube objects found, not enabling the mesh");
        return Ok(None);
    }

    let manifest = mesh_manifest(&names, local);
    let api: Api<DynamicObject> =
        Api::all_with(client.clone(), &ResourceType::xkube_mesh().api_resource());
    api.patch(
        XKUBE_MESH_NAME,
        &PatchParams::apply(FIELD_MANAGER).force(),
        &Patch::Apply(&manifest),
    )
    .await
    .with_context(|| format!("Failed to apply XKubeMesh {XKUBE_MESH_NAME}"))?;

    info!("mesh {} spans {} clusters", XKUBE_MESH_NAME, names.len());
    Ok(Some(names))
}

/// Delete the mesh
///
/// Returns `false` when no mesh exists.
pub async fn delete_mesh(client: &Client) -> Result<bool> {
    let api: Api<DynamicObject> =
        Api::all_with(client.clone(), &ResourceType::xkube_mesh().api_resource());
    match api.delete(XKUBE_MESH_NAME, &DeleteParams::default()).await {
        Ok(_) => {
            info!("mesh {} deleted", XKUBE_MESH_NAME);
            Ok(true)
        }
        Err(kube::Error::Api(api_err)) if api_err.code == 404 => {
            debug!("mesh {} not found", XKUBE_MESH_NAME);
            Ok(false)
        }
        Err(e) => {
            Err(e).with_context(|| format!("Failed to delete XKubeMesh {XKUBE_MESH_NAME}"))
        }
    }
}
