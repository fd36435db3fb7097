//! # Kubeconfig Merge
//!
//! Combines the kubeconfigs of several member clusters into one file.

use anyhow::{Context, Result};
use kube::config::{Kubeconfig, NamedAuthInfo, NamedCluster, NamedContext};
use std::io::Write;
use std::path::Path;
use tracing::warn;

trait Named {
    fn name(&self) -> &str;
}

impl Named for NamedCluster {
    fn name(&self) -> &str {
        &self.name
    }
}

impl Named for NamedAuthInfo {
    fn name(&self) -> &str {
        &self.name
    }
}

impl Named for NamedContext {
    fn name(&self) -> &str {
        &self.name
    }
}

/// Replace same-named entries in place, append new ones
fn upsert<T: Named>(into: &mut Vec<T>, items: Vec<T>) {
    for item in items {
        match into.iter().position(|existing| existing.name() == item.name()) {
            Some(index) => into[index] = item,
            None => into.push(item),
        }
    }
}

/// Merge kubeconfig documents by cluster, user and context name
///
/// Later entries override earlier ones with the same name while keeping the order of
/// first appearance. The first non-empty `current-context` wins. Unparsable inputs are
/// logged and skipped; an error is returned when nothing could be merged.
pub fn merge_kubeconfigs<S: AsRef<str>>(blobs: &[S]) -> Result<String> {
    let mut merged = Kubeconfig {
        api_version: Some("v1".to_string()),
        kind: Some("Config".to_string()),
        ..Kubeconfig::default()
    };
    let mut parsed = 0;

    for (index, blob) in blobs.iter().enumerate() {
        let kubeconfig = match Kubeconfig::from_yaml(blob.as_ref()) {
            Ok(kubeconfig) => kubeconfig,
            Err(e) => {
                warn!("skipping kubeconfig #{}: {}", index + 1, e);
                continue;
            }
        };
        parsed += 1;

        upsert(&mut merged.clusters, kubeconfig.clusters);
        upsert(&mut merged.auth_infos, kubeconfig.auth_infos);
        upsert(&mut merged.contexts, kubeconfig.contexts);
        if merged.current_context.as_deref().unwrap_or_default().is_empty() {
            merged.current_context = kubeconfig.current_context.filter(|c| !c.is_empty());
        }
    }

    if parsed == 0 || merged.clusters.is_empty() {
        anyhow::bail!("no kubeconfig could be merged ({} inputs)", blobs.len());
    }
    serde_yaml::to_string(&merged).context("Failed to serialize merged kubeconfig")
}

/// Write a kubeconfig readable only by the current user
pub fn write_kubeconfig(path: &Path, contents: &str) -> Result<()> {
    let mut options = std::fs::OpenOptions::new();
    options.write(true).create(true).truncate(true);
    #[cfg(unix)]
    {
        use std::os::unix::fs::OpenOptionsExt;
        options.mode(0o600);
    }
    let mut file = options
        .open(path)
        .with_context(|| format!("Failed to open {}", path.display()))?;
    file.write_all(contents.as_bytes())
        .with_context(|| format!("Failed to write {}", path.display()))?;
    // `mode` only applies to newly created files
    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        std::fs::set_permissions(path, std::fs::Permissions::from_mode(0o600))
            .with_context(|| format!("Failed to restrict permissions of {}", path.display()))?;
    }
    Ok(())
}
