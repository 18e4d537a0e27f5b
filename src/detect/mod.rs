//! Pre-flight blocking-dependency scan.
//!
//! Runs once during plan preparation, before the repair loop: flags packages
//! from the static known-blocking table, packages incompatible with the
//! running architecture, and source-archive URLs that no longer resolve.
//! Detection never fails; network trouble is treated as "unreachable".

use crate::core::constants;
use crate::core::types::{BlockReason, BlockingDependency, Dependency};
use crate::registry::ReplacementRegistry;
use std::time::Duration;
use tracing::{debug, warn};

const PROBE_TIMEOUT: Duration = Duration::from_secs(5);

pub struct BlockingDependencyDetector<'a> {
    registry: Option<&'a ReplacementRegistry>,
    architecture: String,
    client: reqwest::Client,
    probe_urls: bool,
}

impl<'a> BlockingDependencyDetector<'a> {
    pub fn new() -> Self {
        Self {
            registry: None,
            architecture: std::env::consts::ARCH.to_string(),
            client: reqwest::Client::builder()
                .timeout(PROBE_TIMEOUT)
                .build()
                .unwrap_or_default(),
            probe_urls: true,
        }
    }

    pub fn with_registry(mut self, registry: &'a ReplacementRegistry) -> Self {
        self.registry = Some(registry);
        self
    }

    /// Override the detected architecture (tests exercise the arch table
    /// without depending on the build host).
    pub fn with_architecture(mut self, architecture: impl Into<String>) -> Self {
        self.architecture = architecture.into();
        self
    }

    /// Disable the network probe; URL-sourced dependencies are then only
    /// checked against the registry's dead-URL tables.
    pub fn without_network(mut self) -> Self {
        self.probe_urls = false;
        self
    }

    /// Return every dependency that will block installation.
    pub async fn detect(&self, dependencies: &[Dependency]) -> Vec<BlockingDependency> {
        let mut blocked = Vec::new();
        for dep in dependencies {
            if let Some(found) = self.check(dep).await {
                debug!(package = %found.name, reason = ?found.reason, "blocking dependency");
                blocked.push(found);
            }
        }
        blocked
    }

    async fn check(&self, dep: &Dependency) -> Option<BlockingDependency> {
        // Static table first, independent of the declared version.
        if let Some(static_replacement) = constants::known_blocking(&dep.name) {
            let replacement = static_replacement
                .map(String::from)
                .or_else(|| self.registry_replacement(&dep.name));
            let reason = if replacement.is_some() {
                BlockReason::BuildFailure
            } else {
                BlockReason::DeprecatedNoReplacement
            };
            return Some(BlockingDependency {
                name: dep.name.clone(),
                version: dep.version.clone(),
                reason,
                replacement,
            });
        }

        if let Some(registry) = self.registry {
            if let Some(entry) = registry.arch_entry(&dep.name) {
                if entry
                    .incompatible_architectures
                    .iter()
                    .any(|a| a == &self.architecture)
                {
                    return Some(BlockingDependency {
                        name: dep.name.clone(),
                        version: dep.version.clone(),
                        reason: BlockReason::ArchitectureIncompatible,
                        replacement: entry
                            .replacement
                            .clone()
                            .or_else(|| self.registry_replacement(&dep.name)),
                    });
                }
            }
        }

        if is_archive_url(&dep.version) && self.url_is_dead(&dep.version).await {
            return Some(BlockingDependency {
                name: dep.name.clone(),
                version: dep.version.clone(),
                reason: BlockReason::DeadUrl,
                replacement: self.registry_replacement(&dep.name),
            });
        }

        None
    }

    fn registry_replacement(&self, name: &str) -> Option<String> {
        let replacement = self.registry?.lookup(name)?;
        if replacement.new_name.is_empty() {
            None
        } else {
            Some(replacement.new_name.clone())
        }
    }

    async fn url_is_dead(&self, url: &str) -> bool {
        if let Some(registry) = self.registry {
            if registry.is_dead_url(url) {
                return true;
            }
        }
        if !self.probe_urls {
            return false;
        }
        // Any failure, including timeout, counts as unreachable.
        match self.client.head(url).send().await {
            Ok(response) => {
                let ok = response.status().is_success();
                if !ok {
                    warn!(%url, status = %response.status(), "archive URL probe failed");
                }
                !ok
            }
            Err(e) => {
                warn!(%url, "archive URL unreachable: {e}");
                true
            }
        }
    }
}

impl Default for BlockingDependencyDetector<'_> {
    fn default() -> Self {
        Self::new()
    }
}

/// Whether a version string points at a source archive rather than a
/// registry version.
fn is_archive_url(version: &str) -> bool {
    let lowered = version.to_ascii_lowercase();
    (lowered.starts_with("http://") || lowered.starts_with("https://"))
        && (lowered.contains("/tarball/")
            || lowered.contains("/archive/")
            || lowered.ends_with(".tgz")
            || lowered.ends_with(".tar.gz")
            || lowered.ends_with(".tar.bz2"))
}
