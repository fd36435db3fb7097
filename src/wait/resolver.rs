//! # Name Resolver
//!
//! Crossplane-managed objects get generated names. Descriptors that only know the
//! declarative name from the manifest (the fingerprint) are matched against the
//! listed candidates and receive the concrete object name.

use crate::client::ResourceReader;
use crate::document::Document;
use crate::error::{display_namespace, ResolveError};
use crate::resource::ResourceDescriptor;
use tracing::{debug, info};

const OBJECT_FINGERPRINT: &[&str] = &["spec", "forProvider", "manifest", "metadata", "name"];
const RELEASE_FINGERPRINT: &[&str] = &["spec", "forProvider", "chart", "name"];

/// Field path holding the fingerprint for a plural resource name
pub fn fingerprint_path(resource: &str) -> Option<&'static [&'static str]> {
    match resource {
        "objects" => Some(OBJECT_FINGERPRINT),
        "releases" => Some(RELEASE_FINGERPRINT),
        _ => None,
    }
}

/// Fill in the name of every descriptor that has a fingerprint but no name
///
/// Candidates are ordered by namespace, then name, and the first match wins.
/// Any listing failure, unknown resource type or miss aborts the pass; descriptors
/// resolved before the failure keep their names.
pub async fn resolve_names(
    reader: &dyn ResourceReader,
    descriptors: &mut [ResourceDescriptor],
) -> Result<(), ResolveError> {
    for descriptor in descriptors.iter_mut() {
        if !descriptor.needs_resolution() {
            continue;
        }

        let resource = &descriptor.resource_type.resource;
        let path =
            fingerprint_path(resource).ok_or_else(|| ResolveError::UnsupportedResourceType {
                kind: descriptor.kind_description.clone(),
                resource: resource.clone(),
            })?;

        let mut candidates = reader
            .list(&descriptor.resource_type, &descriptor.namespace)
            .await
            .map_err(|source| ResolveError::Listing {
                kind: descriptor.kind_description.clone(),
                resource: resource.clone(),
                source,
            })?;
        candidates.sort_by(|a, b| (a.namespace(), a.name()).cmp(&(b.namespace(), b.name())));
        debug!(
            "{} candidates for {} ({})",
            candidates.len(),
            descriptor.kind_description,
            resource
        );

        let name = first_match(&candidates, path, &descriptor.fingerprint).ok_or_else(|| {
            ResolveError::Unresolved {
                kind: descriptor.kind_description.clone(),
                resource: resource.clone(),
                namespace: display_namespace(&descriptor.namespace).to_string(),
                fingerprint: descriptor.fingerprint.clone(),
            }
        })?;

        info!(
            "resolved {} {:?} to {}",
            descriptor.kind_description, descriptor.fingerprint, name
        );
        descriptor.name = name;
    }
    Ok(())
}

fn first_match(candidates: &[Document], path: &[&str], fingerprint: &str) -> Option<String> {
    candidates
        .iter()
        .find(|c| c.nested_str(path).ok().flatten() == Some(fingerprint))
        .map(|c| c.name().to_string())
}
