//! package.json access: dependency groups, resolution/override blocks,
//! and the scripts table.
//!
//! All mutation is a fully-buffered read-modify-write cycle: the file is
//! loaded once, edited in memory, and written back whole. Unknown manifest
//! fields are preserved verbatim.

use crate::core::constants::{dependency_groups, manifest_files};
use crate::core::types::Dependency;
use crate::error::{ResurrectError, ResurrectResult};
use serde_json::{Map, Value};
use std::fs;
use std::path::{Path, PathBuf};

/// In-memory view of a package manifest.
#[derive(Debug, Clone)]
pub struct Manifest {
    path: PathBuf,
    root: Map<String, Value>,
}

impl Manifest {
    /// Load `package.json` from a repository root.
    pub fn load(repo_path: &Path) -> ResurrectResult<Self> {
        let path = repo_path.join(manifest_files::PACKAGE_JSON);
        let raw = fs::read_to_string(&path).map_err(|source| ResurrectError::ManifestRead {
            path: path.clone(),
            source,
        })?;
        let value: Value =
            serde_json::from_str(&raw).map_err(|e| ResurrectError::ManifestParse {
                path: path.clone(),
                reason: e.to_string(),
            })?;
        let root = match value {
            Value::Object(map) => map,
            other => {
                return Err(ResurrectError::ManifestParse {
                    path,
                    reason: format!("expected a JSON object, found {other}"),
                })
            }
        };
        Ok(Self { path, root })
    }

    /// Write the manifest back in one buffered operation.
    pub fn save(&self) -> ResurrectResult<()> {
        let mut rendered = serde_json::to_string_pretty(&Value::Object(self.root.clone()))
            .map_err(|e| ResurrectError::ManifestParse {
                path: self.path.clone(),
                reason: e.to_string(),
            })?;
        rendered.push('\n');
        fs::write(&self.path, rendered).map_err(|source| ResurrectError::ManifestWrite {
            path: self.path.clone(),
            source,
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Names of the dependency groups actually present in this manifest.
    pub fn present_groups(&self) -> Vec<&'static str> {
        dependency_groups::ALL
            .iter()
            .copied()
            .filter(|g| self.root.get(*g).map(Value::is_object).unwrap_or(false))
            .collect()
    }

    /// All declarations across every dependency group, in group order.
    pub fn all_dependencies(&self) -> Vec<Dependency> {
        let mut out = Vec::new();
        for group in dependency_groups::ALL {
            if let Some(Value::Object(entries)) = self.root.get(group) {
                for (name, version) in entries {
                    if let Value::String(v) = version {
                        out.push(Dependency::new(name.clone(), v.clone()));
                    }
                }
            }
        }
        out
    }

    pub fn version_in_group(&self, group: &str, package: &str) -> Option<String> {
        self.root
            .get(group)?
            .as_object()?
            .get(package)?
            .as_str()
            .map(String::from)
    }

    /// Groups in which `package` is declared.
    pub fn groups_containing(&self, package: &str) -> Vec<&'static str> {
        dependency_groups::ALL
            .iter()
            .copied()
            .filter(|g| {
                self.root
                    .get(*g)
                    .and_then(Value::as_object)
                    .map(|m| m.contains_key(package))
                    .unwrap_or(false)
            })
            .collect()
    }

    pub fn contains(&self, package: &str) -> bool {
        !self.groups_containing(package).is_empty()
    }

    /// Set the version of `package` in one group. The group must exist.
    pub fn set_version(&mut self, group: &str, package: &str, version: &str) {
        if let Some(Value::Object(entries)) = self.root.get_mut(group) {
            entries.insert(package.to_string(), Value::String(version.to_string()));
        }
    }

    /// Remove `package` from one group, returning its former version.
    pub fn remove(&mut self, group: &str, package: &str) -> Option<String> {
        let entries = self.root.get_mut(group)?.as_object_mut()?;
        entries
            .remove(package)
            .and_then(|v| v.as_str().map(String::from))
    }

    /// Write `package = version` under both the `resolutions` block (yarn)
    /// and the `overrides` block (npm), creating either if missing.
    pub fn set_resolution(&mut self, package: &str, version: &str) {
        for block in ["resolutions", "overrides"] {
            let entries = self
                .root
                .entry(block.to_string())
                .or_insert_with(|| Value::Object(Map::new()));
            if let Value::Object(map) = entries {
                map.insert(package.to_string(), Value::String(version.to_string()));
            }
        }
    }

    /// The `scripts` table, if any.
    pub fn scripts(&self) -> Option<&Map<String, Value>> {
        self.root.get("scripts")?.as_object()
    }

    pub fn script(&self, name: &str) -> Option<&str> {
        self.scripts()?.get(name)?.as_str()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use tempfile::TempDir;

    fn write_manifest(dir: &TempDir, body: &str) {
        fs::write(dir.path().join("package.json"), body).unwrap();
    }

    #[test]
    fn load_reads_all_dependency_groups() {
        let dir = TempDir::new().unwrap();
        write_manifest(
            &dir,
            r#"{
                "name": "fixture",
                "dependencies": {"react": "^16.8.0"},
                "devDependencies": {"typescript": "~3.9.0"}
            }"#,
        );
        let manifest = Manifest::load(dir.path()).unwrap();
        assert_eq!(
            manifest.all_dependencies(),
            vec![
                Dependency::new("react", "^16.8.0"),
                Dependency::new("typescript", "~3.9.0"),
            ]
        );
        assert_eq!(manifest.groups_containing("react"), vec!["dependencies"]);
        assert!(!manifest.contains("vue"));
    }

    #[test]
    fn set_resolution_creates_both_blocks() {
        let dir = TempDir::new().unwrap();
        write_manifest(&dir, r#"{"dependencies": {}}"#);
        let mut manifest = Manifest::load(dir.path()).unwrap();
        manifest.set_resolution("lodash", "4.17.21");
        manifest.save().unwrap();

        let raw = fs::read_to_string(dir.path().join("package.json")).unwrap();
        let value: Value = serde_json::from_str(&raw).unwrap();
        assert_eq!(value["resolutions"]["lodash"], "4.17.21");
        assert_eq!(value["overrides"]["lodash"], "4.17.21");
    }

    #[test]
    fn save_preserves_unknown_fields() {
        let dir = TempDir::new().unwrap();
        write_manifest(
            &dir,
            r#"{"name": "fixture", "license": "MIT", "dependencies": {"a": "1.0.0"}}"#,
        );
        let mut manifest = Manifest::load(dir.path()).unwrap();
        manifest.remove("dependencies", "a");
        manifest.save().unwrap();

        let raw = fs::read_to_string(dir.path().join("package.json")).unwrap();
        let value: Value = serde_json::from_str(&raw).unwrap();
        assert_eq!(value["license"], "MIT");
        assert!(value["dependencies"].as_object().unwrap().is_empty());
    }

    #[test]
    fn load_rejects_non_object_manifest() {
        let dir = TempDir::new().unwrap();
        write_manifest(&dir, "[1, 2, 3]");
        let err = Manifest::load(dir.path()).unwrap_err();
        assert!(matches!(err, ResurrectError::ManifestParse { .. }));
    }

    #[test]
    fn missing_manifest_is_a_read_error() {
        let dir = TempDir::new().unwrap();
        let err = Manifest::load(dir.path()).unwrap_err();
        assert!(matches!(err, ResurrectError::ManifestRead { .. }));
    }
}
