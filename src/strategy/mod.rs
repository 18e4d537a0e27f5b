//! Fix-strategy selection and application.
//!
//! Selection consults fix history first, then walks the category's ordered
//! default templates, skipping anything already attempted this run, and
//! falls back to force-install once everything is exhausted. The attempt
//! ledger is keyed by a composite (error key, strategy key) pair and reset
//! at the start of each validation run, so within one run a given pair is
//! attempted at most once.

pub mod templates;

use crate::core::constants::{lockfiles, manifest_files};
use crate::core::types::{AnalyzedError, ErrorCategory, FixResult, FixStrategy, StrategyKey};
use crate::error::ResurrectError;
use crate::history::FixHistoryStore;
use crate::manifest::Manifest;
use std::collections::HashSet;
use std::fs;
use std::path::Path;
use tracing::{debug, info, warn};

type ErrorKey = (ErrorCategory, Option<String>);

#[derive(Debug, Default)]
pub struct FixStrategyEngine {
    attempted: HashSet<(ErrorKey, StrategyKey)>,
}

impl FixStrategyEngine {
    pub fn new() -> Self {
        Self::default()
    }

    fn error_key(error: &AnalyzedError) -> ErrorKey {
        (error.category, error.package_name.clone())
    }

    /// Pick the next strategy for `error`: a remembered historical fix if it
    /// has not been attempted this run, else the first unattempted default
    /// template, else force-install.
    pub fn select_strategy(&self, error: &AnalyzedError, history: &FixHistoryStore) -> FixStrategy {
        let error_key = Self::error_key(error);

        if let Some(remembered) = history.get_successful_fix(&error.pattern()) {
            if !self.was_attempted(&error_key, &remembered) {
                info!(pattern = %error.pattern(), "reusing historical fix");
                return remembered;
            }
        }

        for candidate in templates::default_strategies(
            error.category,
            error.package_name.as_deref(),
            error.version_constraint.as_deref(),
        ) {
            if !self.was_attempted(&error_key, &candidate) {
                return candidate;
            }
        }

        debug!(pattern = %error.pattern(), "strategy templates exhausted, falling back");
        FixStrategy::ForceInstall
    }

    fn was_attempted(&self, error_key: &ErrorKey, strategy: &FixStrategy) -> bool {
        self.attempted
            .contains(&(error_key.clone(), strategy.attempt_key()))
    }

    pub fn mark_strategy_attempted(&mut self, error: &AnalyzedError, strategy: &FixStrategy) {
        self.attempted
            .insert((Self::error_key(error), strategy.attempt_key()));
    }

    /// Whether any default template for `error` remains unattempted (the
    /// force-install fallback does not count).
    pub fn has_untried_strategies(&self, error: &AnalyzedError) -> bool {
        let error_key = Self::error_key(error);
        templates::default_strategies(
            error.category,
            error.package_name.as_deref(),
            error.version_constraint.as_deref(),
        )
        .iter()
        .any(|s| !self.was_attempted(&error_key, s))
    }

    /// Clear the ledger at the start of a validation run.
    pub fn reset_attempted_strategies(&mut self) {
        self.attempted.clear();
    }

    /// Apply one strategy to the repository. Failures (missing manifest,
    /// missing package) are reported in the result, never raised; the loop
    /// moves on to the next strategy.
    pub async fn apply_fix(&self, repo_path: &Path, strategy: &FixStrategy) -> FixResult {
        let applied = match strategy {
            FixStrategy::AdjustVersion {
                package,
                new_version,
            } => edit_manifest(repo_path, |manifest| {
                let groups = manifest.groups_containing(package);
                if groups.is_empty() {
                    return Err(ResurrectError::PackageMissing {
                        package: package.clone(),
                    });
                }
                for group in groups {
                    manifest.set_version(group, package, new_version);
                }
                Ok(())
            }),
            FixStrategy::RemovePackage { package } => edit_manifest(repo_path, |manifest| {
                let groups = manifest.groups_containing(package);
                if groups.is_empty() {
                    return Err(ResurrectError::PackageMissing {
                        package: package.clone(),
                    });
                }
                for group in groups {
                    manifest.remove(group, package);
                }
                Ok(())
            }),
            FixStrategy::SubstitutePackage {
                original,
                replacement,
            } => edit_manifest(repo_path, |manifest| {
                let groups = manifest.groups_containing(original);
                if groups.is_empty() {
                    return Err(ResurrectError::PackageMissing {
                        package: original.clone(),
                    });
                }
                for group in groups {
                    let version = manifest
                        .remove(group, original)
                        .unwrap_or_else(|| "latest".to_string());
                    // Old version ranges rarely apply to the substitute.
                    let version = if version.starts_with("http") || version.contains('/') {
                        "latest".to_string()
                    } else {
                        version
                    };
                    manifest.set_version(group, replacement, &version);
                }
                Ok(())
            }),
            FixStrategy::AddResolution { package, version } => {
                edit_manifest(repo_path, |manifest| {
                    manifest.set_resolution(package, version);
                    Ok(())
                })
            }
            FixStrategy::LegacyPeerDeps => append_npmrc_flag(repo_path, "legacy-peer-deps=true"),
            FixStrategy::ForceInstall => append_npmrc_flag(repo_path, "force=true"),
            FixStrategy::RemoveLockfile { lockfile } => {
                remove_lockfile(repo_path, lockfile.as_deref())
            }
        };

        match applied {
            Ok(()) => {
                info!(fix = %strategy.describe(), "applied fix");
                FixResult::applied(strategy.clone())
            }
            Err(message) => {
                warn!(fix = %strategy.describe(), %message, "fix application failed");
                FixResult::failed(strategy.clone(), message)
            }
        }
    }
}

fn edit_manifest<F>(repo_path: &Path, edit: F) -> Result<(), String>
where
    F: FnOnce(&mut Manifest) -> Result<(), ResurrectError>,
{
    let mut manifest = Manifest::load(repo_path).map_err(|e| e.to_string())?;
    edit(&mut manifest).map_err(|e| e.to_string())?;
    manifest.save().map_err(|e| e.to_string())
}

/// Idempotently append a flag line to the manifest-adjacent `.npmrc`.
fn append_npmrc_flag(repo_path: &Path, flag: &str) -> Result<(), String> {
    let path = repo_path.join(manifest_files::NPMRC);
    let existing = match fs::read_to_string(&path) {
        Ok(content) => content,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => String::new(),
        Err(e) => return Err(format!("reading {path:?}: {e}")),
    };
    if existing.lines().any(|line| line.trim() == flag) {
        debug!(%flag, "npmrc flag already present");
        return Ok(());
    }
    let mut updated = existing;
    if !updated.is_empty() && !updated.ends_with('\n') {
        updated.push('\n');
    }
    updated.push_str(flag);
    updated.push('\n');
    fs::write(&path, updated).map_err(|e| format!("writing {path:?}: {e}"))
}

/// Delete the named lockfile, or the first known lockfile found, and clear
/// the dependency cache directory for a clean reinstall.
fn remove_lockfile(repo_path: &Path, named: Option<&str>) -> Result<(), String> {
    let target = named
        .map(|name| repo_path.join(name))
        .filter(|path| path.exists())
        .or_else(|| {
            lockfiles::KNOWN
                .iter()
                .map(|name| repo_path.join(name))
                .find(|path| path.exists())
        });

    let Some(target) = target else {
        return Err("no lockfile present to remove".to_string());
    };
    fs::remove_file(&target).map_err(|e| format!("removing {target:?}: {e}"))?;
    info!(lockfile = ?target, "removed lockfile");

    let cache = repo_path.join(manifest_files::NODE_MODULES);
    if cache.is_dir() {
        if let Err(e) = fs::remove_dir_all(&cache) {
            warn!("Failed to clear {cache:?}: {e}");
        }
    }
    Ok(())
}
