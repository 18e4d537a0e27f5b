//! Ordered default-strategy templates per error category.
//!
//! Each template is customized with the error's extracted package name and
//! version constraint. Categories the manifest cannot help with (syntax,
//! type, unknown) have empty lists; the engine's final fallback covers them.

use crate::core::constants::native_alternative;
use crate::core::types::{ErrorCategory, FixStrategy};
use once_cell::sync::Lazy;
use regex::Regex;

static CONCRETE_SEMVER: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^\d+\.\d+\.\d+(-[\w.]+)?$").unwrap());

/// A version usable as an adjust_version target: the extracted constraint if
/// it is a concrete semantic version, else `latest`.
fn adjust_target(version: Option<&str>) -> String {
    match version {
        Some(v) if CONCRETE_SEMVER.is_match(v) => v.to_string(),
        _ => "latest".to_string(),
    }
}

/// The ordered list of candidate strategies for one error.
pub fn default_strategies(
    category: ErrorCategory,
    package: Option<&str>,
    version: Option<&str>,
) -> Vec<FixStrategy> {
    let mut strategies = Vec::new();
    match category {
        ErrorCategory::LockfileConflict => {
            strategies.push(FixStrategy::RemoveLockfile { lockfile: None });
            strategies.push(FixStrategy::LegacyPeerDeps);
        }
        ErrorCategory::PeerDependencyConflict => {
            strategies.push(FixStrategy::LegacyPeerDeps);
            if let Some(package) = package {
                strategies.push(FixStrategy::AddResolution {
                    package: package.to_string(),
                    version: adjust_target(version),
                });
                strategies.push(FixStrategy::RemovePackage {
                    package: package.to_string(),
                });
            }
        }
        ErrorCategory::DependencyVersionConflict => {
            if let Some(package) = package {
                strategies.push(FixStrategy::AdjustVersion {
                    package: package.to_string(),
                    new_version: adjust_target(version),
                });
                strategies.push(FixStrategy::AddResolution {
                    package: package.to_string(),
                    version: adjust_target(version),
                });
            }
            strategies.push(FixStrategy::LegacyPeerDeps);
        }
        ErrorCategory::NativeModuleFailure => {
            if let Some(package) = package {
                if let Some(replacement) = native_alternative(package) {
                    strategies.push(FixStrategy::SubstitutePackage {
                        original: package.to_string(),
                        replacement: replacement.to_string(),
                    });
                }
                strategies.push(FixStrategy::AdjustVersion {
                    package: package.to_string(),
                    new_version: "latest".to_string(),
                });
                strategies.push(FixStrategy::RemovePackage {
                    package: package.to_string(),
                });
            }
        }
        ErrorCategory::GitDependencyFailure => {
            if let Some(package) = package {
                strategies.push(FixStrategy::AdjustVersion {
                    package: package.to_string(),
                    new_version: "latest".to_string(),
                });
                strategies.push(FixStrategy::RemovePackage {
                    package: package.to_string(),
                });
            }
        }
        ErrorCategory::DependencyNotFound => {
            if let Some(package) = package {
                strategies.push(FixStrategy::AdjustVersion {
                    package: package.to_string(),
                    new_version: "latest".to_string(),
                });
                if let Some(replacement) = native_alternative(package) {
                    strategies.push(FixStrategy::SubstitutePackage {
                        original: package.to_string(),
                        replacement: replacement.to_string(),
                    });
                }
                strategies.push(FixStrategy::RemovePackage {
                    package: package.to_string(),
                });
            }
        }
        ErrorCategory::SyntaxError | ErrorCategory::TypeError | ErrorCategory::Unknown => {}
    }
    strategies
}

/// The default suggestion attached to an analyzed error: its category's
/// first template.
pub fn suggested_fix(
    category: ErrorCategory,
    package: Option<&str>,
    version: Option<&str>,
) -> Option<FixStrategy> {
    default_strategies(category, package, version).into_iter().next()
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn concrete_versions_are_kept_ranges_become_latest() {
        assert_eq!(adjust_target(Some("1.2.3")), "1.2.3");
        assert_eq!(adjust_target(Some("4.0.0-beta.2")), "4.0.0-beta.2");
        assert_eq!(adjust_target(Some("^1.2.3")), "latest");
        assert_eq!(adjust_target(Some(">=2.0.0 <3")), "latest");
        assert_eq!(adjust_target(None), "latest");
    }

    #[test]
    fn native_failures_prefer_known_substitutes() {
        let strategies =
            default_strategies(ErrorCategory::NativeModuleFailure, Some("node-sass"), None);
        assert_eq!(
            strategies[0],
            FixStrategy::SubstitutePackage {
                original: "node-sass".into(),
                replacement: "sass".into(),
            }
        );
    }

    #[test]
    fn native_failure_without_known_substitute_starts_with_adjust() {
        let strategies =
            default_strategies(ErrorCategory::NativeModuleFailure, Some("canvas"), None);
        assert_eq!(
            strategies[0],
            FixStrategy::AdjustVersion {
                package: "canvas".into(),
                new_version: "latest".into(),
            }
        );
    }

    #[test]
    fn lockfile_conflicts_start_with_lockfile_removal() {
        let strategies = default_strategies(ErrorCategory::LockfileConflict, None, None);
        assert_eq!(strategies[0], FixStrategy::RemoveLockfile { lockfile: None });
    }

    #[test]
    fn code_level_categories_have_no_manifest_templates() {
        for category in [
            ErrorCategory::SyntaxError,
            ErrorCategory::TypeError,
            ErrorCategory::Unknown,
        ] {
            assert!(default_strategies(category, Some("pkg"), None).is_empty());
        }
    }
}
