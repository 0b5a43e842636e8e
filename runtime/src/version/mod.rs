//! Version Descriptor
//!
//! The canonical record of the latest deployed build, as served by the
//! version endpoint. Ordering between deployments is decided by
//! `(build_timestamp, version)` only; `minimum_supported_version` is a floor
//! check and never participates in ordering.

mod endpoint;

pub use endpoint::*;

use std::cmp::Ordering;

use serde::{Deserialize, Serialize};

/// The deployed version's identity.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VersionDescriptor {
    pub version: String,
    /// Epoch millis, strictly monotonic across deployments.
    pub build_timestamp: u64,
    #[serde(default)]
    pub release_notes: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub minimum_supported_version: Option<String>,
    #[serde(default)]
    pub force_update: bool,
}

impl VersionDescriptor {
    pub fn new(version: impl Into<String>, build_timestamp: u64) -> Self {
        Self {
            version: version.into(),
            build_timestamp,
            release_notes: Vec::new(),
            minimum_supported_version: None,
            force_update: false,
        }
    }

    pub fn with_force_update(mut self, force: bool) -> Self {
        self.force_update = force;
        self
    }

    pub fn with_minimum_supported(mut self, version: impl Into<String>) -> Self {
        self.minimum_supported_version = Some(version.into());
        self
    }

    pub fn with_release_notes(mut self, notes: Vec<String>) -> Self {
        self.release_notes = notes;
        self
    }

    /// Compare two builds by the authoritative ordering key.
    pub fn cmp_build(&self, build_timestamp: u64, version: &str) -> Ordering {
        order_builds(self.build_timestamp, &self.version, build_timestamp, version)
    }

    /// Whether this deployment supersedes the given build.
    pub fn is_newer_than(&self, build_timestamp: u64, version: &str) -> bool {
        self.cmp_build(build_timestamp, version) == Ordering::Greater
    }

    /// Whether a client running `version` is below the supported floor.
    pub fn requires_update_from(&self, version: &str) -> bool {
        self.minimum_supported_version
            .as_deref()
            .is_some_and(|floor| compare_versions(version, floor) == Ordering::Less)
    }

    pub fn build_info(&self) -> BuildInfo {
        BuildInfo {
            version: self.version.clone(),
            build_timestamp: self.build_timestamp,
        }
    }
}

/// Identity a worker instance was built with.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BuildInfo {
    pub version: String,
    pub build_timestamp: u64,
}

impl BuildInfo {
    pub fn new(version: impl Into<String>, build_timestamp: u64) -> Self {
        Self {
            version: version.into(),
            build_timestamp,
        }
    }
}

/// `(timestamp, version)` ordering; ties on the timestamp fall back to a
/// lexicographic comparison of the version strings.
pub fn order_builds(ts_a: u64, version_a: &str, ts_b: u64, version_b: &str) -> Ordering {
    ts_a.cmp(&ts_b).then_with(|| version_a.cmp(version_b))
}

/// Compare the dotted numeric cores of two version strings.
///
/// A leading `v`, any `-prerelease` and `+build` suffix are ignored, missing
/// components count as zero and non-numeric components compare as zero, so
/// `1.10` > `1.9.3` and `2.0` == `2.0.0-1718000000`.
pub fn compare_versions(a: &str, b: &str) -> Ordering {
    let a = numeric_core(a);
    let b = numeric_core(b);
    let len = a.len().max(b.len());
    for i in 0..len {
        let x = a.get(i).copied().unwrap_or(0);
        let y = b.get(i).copied().unwrap_or(0);
        match x.cmp(&y) {
            Ordering::Equal => continue,
            other => return other,
        }
    }
    Ordering::Equal
}

fn numeric_core(version: &str) -> Vec<u64> {
    let trimmed = version.trim();
    let trimmed = trimmed
        .strip_prefix(['v', 'V'])
        .unwrap_or(trimmed);
    let core_end = trimmed.find(['-', '+']).unwrap_or(trimmed.len());
    trimmed[..core_end]
        .split('.')
        .map(|part| part.parse::<u64>().unwrap_or(0))
        .collect()
}
