//! Applies a batch of registry replacements to a manifest.
//!
//! One load, all edits in memory, one save. A package absent from the
//! manifest produces no outcome record and no change.

use crate::core::types::{PackageReplacement, ReplacementOutcome};
use crate::manifest::Manifest;
use anyhow::Result;
use std::path::{Path, PathBuf};
use tracing::info;

pub struct ReplacementExecutor {
    repo_path: PathBuf,
}

impl ReplacementExecutor {
    pub fn new(repo_path: impl Into<PathBuf>) -> Self {
        Self {
            repo_path: repo_path.into(),
        }
    }

    pub fn repo_path(&self) -> &Path {
        &self.repo_path
    }

    /// Apply every replacement to every dependency group it appears in.
    /// Returns one outcome record per applied replacement per group.
    pub fn execute(&self, replacements: &[PackageReplacement]) -> Result<Vec<ReplacementOutcome>> {
        let mut manifest = Manifest::load(&self.repo_path)?;
        let mut outcomes = Vec::new();

        for replacement in replacements {
            for group in manifest.groups_containing(&replacement.old_name) {
                let Some(old_version) = manifest.remove(group, &replacement.old_name) else {
                    continue;
                };
                let new_version = replacement
                    .version_mapping
                    .get(&old_version)
                    .or_else(|| replacement.version_mapping.get("*"))
                    .cloned()
                    .unwrap_or_else(|| old_version.clone());

                // An empty new name is a pure removal.
                let reported_name = if replacement.new_name.is_empty() {
                    replacement.old_name.clone()
                } else {
                    manifest.set_version(group, &replacement.new_name, &new_version);
                    replacement.new_name.clone()
                };

                info!(
                    group,
                    old = %replacement.old_name,
                    new = %reported_name,
                    version = %new_version,
                    "applied package replacement"
                );
                outcomes.push(ReplacementOutcome {
                    package_name: reported_name,
                    old_version,
                    new_version,
                    requires_manual_review: replacement.requires_code_changes,
                });
            }
        }

        if !outcomes.is_empty() {
            manifest.save()?;
        }
        Ok(outcomes)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use serde_json::Value;
    use std::collections::HashMap;
    use std::fs;
    use tempfile::TempDir;

    fn repo_with(manifest: &str) -> TempDir {
        let dir = TempDir::new().unwrap();
        fs::write(dir.path().join("package.json"), manifest).unwrap();
        dir
    }

    fn mapping(pairs: &[(&str, &str)]) -> HashMap<String, String> {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }

    #[test]
    fn replaces_with_exact_version_mapping() {
        let dir = repo_with(r#"{"dependencies": {"old-pkg": "1.0.0"}}"#);
        let executor = ReplacementExecutor::new(dir.path());
        let outcomes = executor
            .execute(&[PackageReplacement {
                old_name: "old-pkg".into(),
                new_name: "new-pkg".into(),
                version_mapping: mapping(&[("1.0.0", "2.0.0")]),
                requires_code_changes: false,
                code_change_description: None,
            }])
            .unwrap();

        assert_eq!(
            outcomes,
            vec![ReplacementOutcome {
                package_name: "new-pkg".into(),
                old_version: "1.0.0".into(),
                new_version: "2.0.0".into(),
                requires_manual_review: false,
            }]
        );
        let raw = fs::read_to_string(dir.path().join("package.json")).unwrap();
        let value: Value = serde_json::from_str(&raw).unwrap();
        let deps = value["dependencies"].as_object().unwrap();
        assert!(!deps.contains_key("old-pkg"));
        assert_eq!(deps["new-pkg"], "2.0.0");
    }

    #[test]
    fn wildcard_mapping_covers_unlisted_versions() {
        let dir = repo_with(r#"{"dependencies": {"old-pkg": "3.1.4"}}"#);
        let outcomes = ReplacementExecutor::new(dir.path())
            .execute(&[PackageReplacement {
                old_name: "old-pkg".into(),
                new_name: "new-pkg".into(),
                version_mapping: mapping(&[("1.0.0", "2.0.0"), ("*", "^9.0.0")]),
                requires_code_changes: true,
                code_change_description: None,
            }])
            .unwrap();
        assert_eq!(outcomes[0].new_version, "^9.0.0");
        assert!(outcomes[0].requires_manual_review);
    }

    #[test]
    fn empty_mapping_keeps_the_current_version() {
        let dir = repo_with(r#"{"dependencies": {"old-pkg": "^5.2.0"}}"#);
        let outcomes = ReplacementExecutor::new(dir.path())
            .execute(&[PackageReplacement {
                old_name: "old-pkg".into(),
                new_name: "new-pkg".into(),
                version_mapping: HashMap::new(),
                requires_code_changes: false,
                code_change_description: None,
            }])
            .unwrap();
        assert_eq!(outcomes[0].new_version, "^5.2.0");
    }

    #[test]
    fn empty_new_name_is_pure_removal() {
        let dir = repo_with(r#"{"dependencies": {"gulp-util": "^3.0.8", "left": "1.0.0"}}"#);
        let outcomes = ReplacementExecutor::new(dir.path())
            .execute(&[PackageReplacement {
                old_name: "gulp-util".into(),
                new_name: "".into(),
                version_mapping: HashMap::new(),
                requires_code_changes: true,
                code_change_description: None,
            }])
            .unwrap();
        assert_eq!(outcomes[0].package_name, "gulp-util");

        let raw = fs::read_to_string(dir.path().join("package.json")).unwrap();
        let value: Value = serde_json::from_str(&raw).unwrap();
        let deps = value["dependencies"].as_object().unwrap();
        assert!(!deps.contains_key("gulp-util"));
        assert!(deps.contains_key("left"));
    }

    #[test]
    fn absent_package_yields_no_record_and_no_change() {
        let original = r#"{"dependencies": {"kept": "1.0.0"}}"#;
        let dir = repo_with(original);
        let outcomes = ReplacementExecutor::new(dir.path())
            .execute(&[PackageReplacement {
                old_name: "missing".into(),
                new_name: "other".into(),
                version_mapping: HashMap::new(),
                requires_code_changes: false,
                code_change_description: None,
            }])
            .unwrap();
        assert!(outcomes.is_empty());
        let raw = fs::read_to_string(dir.path().join("package.json")).unwrap();
        assert_eq!(raw, original);
    }

    #[test]
    fn replacement_applies_across_every_group() {
        let dir = repo_with(
            r#"{
                "dependencies": {"old-pkg": "1.0.0"},
                "devDependencies": {"old-pkg": "1.2.0"}
            }"#,
        );
        let outcomes = ReplacementExecutor::new(dir.path())
            .execute(&[PackageReplacement {
                old_name: "old-pkg".into(),
                new_name: "new-pkg".into(),
                version_mapping: mapping(&[("*", "2.0.0")]),
                requires_code_changes: false,
                code_change_description: None,
            }])
            .unwrap();
        assert_eq!(outcomes.len(), 2);

        let raw = fs::read_to_string(dir.path().join("package.json")).unwrap();
        let value: Value = serde_json::from_str(&raw).unwrap();
        assert_eq!(value["dependencies"]["new-pkg"], "2.0.0");
        assert_eq!(value["devDependencies"]["new-pkg"], "2.0.0");
    }
}
