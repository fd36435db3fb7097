//! # Watch Lists
//!
//! YAML description of the resources a `skyctl wait` run tracks.
//!
//! ```yaml
//! resources:
//!   - kind: Headscale server
//!     group: kubernetes.crossplane.io
//!     version: v1alpha2
//!     resource: objects
//!     resourceKind: Object
//!     fingerprint: headscale-server
//!     timeout: 5m
//!     pollInterval: 10s
//! ```
//!
//! `namespace`, `name` and `condition` (default `Ready`) are optional. Either `name`
//! or `fingerprint` must be given.

use crate::constants::READY_CONDITION;
use crate::resource::{ResourceDescriptor, ResourceType};
use anyhow::{Context, Result};
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;

/// Parsed watch-list file
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct WatchList {
    #[serde(default)]
    pub resources: Vec<WatchEntry>,
}

/// One entry of a watch-list file
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WatchEntry {
    /// Human-readable label
    pub kind: String,
    #[serde(default)]
    pub group: String,
    pub version: String,
    pub resource: String,
    pub resource_kind: String,
    #[serde(default)]
    pub namespace: String,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub fingerprint: String,
    #[serde(default = "default_condition")]
    pub condition: String,
    pub timeout: String,
    pub poll_interval: String,
}

fn default_condition() -> String {
    READY_CONDITION.to_string()
}

impl WatchList {
    /// Parse a watch list from YAML text
    pub fn from_yaml(text: &str) -> Result<Self> {
        serde_yaml::from_str(text).context("Failed to parse watch list")
    }

    /// Read and parse a watch-list file
    pub fn from_file(path: &Path) -> Result<Self> {
        let text = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read watch list {}", path.display()))?;
        Self::from_yaml(&text).with_context(|| format!("Invalid watch list {}", path.display()))
    }

    /// Convert every entry into a descriptor, validating durations and names
    pub fn descriptors(&self) -> Result<Vec<ResourceDescriptor>> {
        self.resources
            .iter()
            .map(|entry| {
                entry
                    .to_descriptor()
                    .with_context(|| format!("Invalid watch list entry {:?}", entry.kind))
            })
            .collect()
    }
}

impl WatchEntry {
    fn to_descriptor(&self) -> Result<ResourceDescriptor> {
        if self.name.is_empty() && self.fingerprint.is_empty() {
            anyhow::bail!("either name or fingerprint must be set");
        }
        let timeout = parse_kubernetes_duration(&self.timeout).context("timeout")?;
        let poll_interval =
            parse_kubernetes_duration(&self.poll_interval).context("pollInterval")?;
        Ok(ResourceDescriptor {
            kind_description: self.kind.clone(),
            resource_type: ResourceType::new(
                &self.group,
                &self.version,
                &self.resource,
                &self.resource_kind,
            ),
            namespace: self.namespace.clone(),
            name: self.name.clone(),
            fingerprint: self.fingerprint.clone(),
            condition: self.condition.clone(),
            timeout,
            poll_interval,
        })
    }
}

/// Parse a Kubernetes duration string into a `Duration`
///
/// Supports `<number><unit>` with unit `ms`, `s`, `m`, `h` or `d`, e.g. `500ms`,
/// `30s`, `5m`, `1h`, `1d`. Zero is rejected.
pub fn parse_kubernetes_duration(duration_str: &str) -> Result<Duration> {
    let duration_trimmed = duration_str.trim();

    if duration_trimmed.is_empty() {
        return Err(anyhow::anyhow!("Duration string cannot be empty"));
    }

    let duration_regex = Regex::new(r"^(?P<number>\d+)(?P<unit>ms|[smhd])$")
        .map_err(|e| anyhow::anyhow!("Failed to compile regex: {e}"))?;

    let interval_lower = duration_trimmed.to_lowercase();

    let captures = duration_regex
        .captures(&interval_lower)
        .ok_or_else(|| {
            anyhow::anyhow!(
                "Invalid duration format '{}'. Expected format: <number><unit> (e.g., '30s', '5m', '1h')",
                duration_trimmed
            )
        })?;

    let number: u64 = captures["number"].parse().map_err(|e| {
        anyhow::anyhow!(
            "Invalid duration number '{}' in '{}': {}",
            &captures["number"],
            duration_trimmed,
            e
        )
    })?;

    if number == 0 {
        return Err(anyhow::anyhow!(
            "Duration number must be greater than 0, got '{}'",
            duration_trimmed
        ));
    }

    let duration = match &captures["unit"] {
        "ms" => Some(Duration::from_millis(number)),
        "s" => Some(Duration::from_secs(number)),
        "m" => number.checked_mul(60).map(Duration::from_secs),
        "h" => number.checked_mul(3600).map(Duration::from_secs),
        "d" => number.checked_mul(86_400).map(Duration::from_secs),
        unit => {
            return Err(anyhow::anyhow!(
                "Invalid unit '{}' in duration '{}'. Expected: ms, s, m, h, or d",
                unit,
                duration_trimmed
            ));
        }
    };

    duration.ok_or_else(|| anyhow::anyhow!("Duration '{}' is too large", duration_trimmed))
}

/// Resources awaited after the management cluster is set up
pub fn default_setup_watch_list() -> Vec<ResourceDescriptor> {
    let object = ResourceType::crossplane_object;
    let release = ResourceType::helm_release;
    let entry = |kind: &str, resource_type: ResourceType, fingerprint: &str, timeout, poll| {
        ResourceDescriptor::fingerprinted(kind, resource_type, "", fingerprint)
            .with_timing(Duration::from_secs(timeout), Duration::from_secs(poll))
    };

    vec![
        entry(
            "Istio root CA certs generator",
            object(),
            "istio-root-ca-certs-generator",
            60,
            5,
        ),
        entry("Headscale cert generator", object(), "headscale-cert-gen", 180, 10),
        entry("Headscale server", object(), "headscale-server", 300, 10),
        entry(
            "Headscale connection secret",
            object(),
            "headscale-connection-secret",
            120,
            5,
        ),
        entry(
            "Submariner broker release",
            release(),
            "submariner-k8s-broker",
            240,
            10,
        ),
        entry("Submariner operator", object(), "submariner-operator", 240, 10),
    ]
}
