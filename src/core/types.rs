use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;

/// A dependency declaration as it appears in a manifest group.
///
/// `version` may be a semver range, a dist-tag, or a source reference
/// (git URL, archive URL).
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Dependency {
    pub name: String,
    pub version: String,
}

impl Dependency {
    pub fn new(name: impl Into<String>, version: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            version: version.into(),
        }
    }
}

/// Why a dependency will prevent installation from completing.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum BlockReason {
    ArchitectureIncompatible,
    DeadUrl,
    DeprecatedNoReplacement,
    BuildFailure,
    PeerConflict,
}

/// A dependency flagged by the pre-flight scan. Immutable value, created
/// fresh per detection call.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct BlockingDependency {
    pub name: String,
    pub version: String,
    pub reason: BlockReason,
    pub replacement: Option<String>,
}

/// A deprecated→modern package mapping owned by the replacement registry.
///
/// `version_mapping` maps old versions to new ones; the `"*"` key acts as a
/// wildcard fallback. Entries are replaced whole on update, never mutated.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct PackageReplacement {
    pub old_name: String,
    pub new_name: String,
    #[serde(default)]
    pub version_mapping: HashMap<String, String>,
    #[serde(default)]
    pub requires_code_changes: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub code_change_description: Option<String>,
}

/// A package known to fail on specific CPU architectures.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct ArchIncompatibleEntry {
    pub package_name: String,
    pub incompatible_architectures: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub replacement: Option<String>,
    pub reason: String,
}

/// Classification assigned to a parsed build-failure message.
///
/// Categorization is total: every message maps to exactly one variant, with
/// `Unknown` as the catch-all.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[serde(rename_all = "snake_case")]
pub enum ErrorCategory {
    LockfileConflict,
    PeerDependencyConflict,
    DependencyVersionConflict,
    NativeModuleFailure,
    GitDependencyFailure,
    DependencyNotFound,
    SyntaxError,
    TypeError,
    Unknown,
}

impl ErrorCategory {
    /// Fixed per-category priority. Only the relative order is contractual:
    /// lockfile conflicts rank highest, unknown and type errors lowest.
    pub fn priority(&self) -> u32 {
        match self {
            Self::LockfileConflict => 100,
            Self::PeerDependencyConflict => 90,
            Self::DependencyVersionConflict => 80,
            Self::NativeModuleFailure => 70,
            Self::GitDependencyFailure => 60,
            Self::DependencyNotFound => 50,
            Self::SyntaxError => 30,
            Self::TypeError => 20,
            Self::Unknown => 10,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::LockfileConflict => "lockfile_conflict",
            Self::PeerDependencyConflict => "peer_dependency_conflict",
            Self::DependencyVersionConflict => "dependency_version_conflict",
            Self::NativeModuleFailure => "native_module_failure",
            Self::GitDependencyFailure => "git_dependency_failure",
            Self::DependencyNotFound => "dependency_not_found",
            Self::SyntaxError => "syntax_error",
            Self::TypeError => "type_error",
            Self::Unknown => "unknown",
        }
    }
}

impl fmt::Display for ErrorCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One discrete, classified error extracted from build output.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct AnalyzedError {
    pub category: ErrorCategory,
    pub message: String,
    pub package_name: Option<String>,
    pub version_constraint: Option<String>,
    pub conflicting_packages: Vec<String>,
    pub priority: u32,
    pub suggested_fix: Option<FixStrategy>,
}

impl AnalyzedError {
    /// The `category:package-or-none` key that indexes fix history.
    pub fn pattern(&self) -> String {
        format!(
            "{}:{}",
            self.category,
            self.package_name.as_deref().unwrap_or("none")
        )
    }
}

/// One of the 7 concrete remediation actions applicable to a
/// manifest/lockfile. Compared structurally.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum FixStrategy {
    AdjustVersion {
        package: String,
        new_version: String,
    },
    LegacyPeerDeps,
    RemoveLockfile {
        lockfile: Option<String>,
    },
    SubstitutePackage {
        original: String,
        replacement: String,
    },
    RemovePackage {
        package: String,
    },
    AddResolution {
        package: String,
        version: String,
    },
    ForceInstall,
}

impl FixStrategy {
    pub fn kind(&self) -> StrategyKind {
        match self {
            Self::AdjustVersion { .. } => StrategyKind::AdjustVersion,
            Self::LegacyPeerDeps => StrategyKind::LegacyPeerDeps,
            Self::RemoveLockfile { .. } => StrategyKind::RemoveLockfile,
            Self::SubstitutePackage { .. } => StrategyKind::SubstitutePackage,
            Self::RemovePackage { .. } => StrategyKind::RemovePackage,
            Self::AddResolution { .. } => StrategyKind::AddResolution,
            Self::ForceInstall => StrategyKind::ForceInstall,
        }
    }

    /// Composite ledger key: discriminator plus the field that distinguishes
    /// two applications of the same variant.
    pub fn attempt_key(&self) -> StrategyKey {
        let detail = match self {
            Self::AdjustVersion { package, .. } => Some(package.clone()),
            Self::LegacyPeerDeps => None,
            Self::RemoveLockfile { lockfile } => lockfile.clone(),
            Self::SubstitutePackage { original, .. } => Some(original.clone()),
            Self::RemovePackage { package } => Some(package.clone()),
            Self::AddResolution { package, .. } => Some(package.clone()),
            Self::ForceInstall => None,
        };
        StrategyKey {
            kind: self.kind(),
            detail,
        }
    }

    /// Human-readable description used in progress events and logs.
    pub fn describe(&self) -> String {
        match self {
            Self::AdjustVersion {
                package,
                new_version,
            } => format!("adjust {package} to version {new_version}"),
            Self::LegacyPeerDeps => "enable legacy peer dependency resolution".to_string(),
            Self::RemoveLockfile { lockfile: Some(l) } => format!("remove lockfile {l}"),
            Self::RemoveLockfile { lockfile: None } => "remove the lockfile".to_string(),
            Self::SubstitutePackage {
                original,
                replacement,
            } => format!("substitute {original} with {replacement}"),
            Self::RemovePackage { package } => format!("remove {package}"),
            Self::AddResolution { package, version } => {
                format!("pin {package} to {version} via resolutions")
            }
            Self::ForceInstall => "force installation".to_string(),
        }
    }
}

/// Discriminator for the 7 strategy variants.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StrategyKind {
    AdjustVersion,
    LegacyPeerDeps,
    RemoveLockfile,
    SubstitutePackage,
    RemovePackage,
    AddResolution,
    ForceInstall,
}

/// Ledger key identifying a strategy application for attempt rotation.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct StrategyKey {
    pub kind: StrategyKind,
    pub detail: Option<String>,
}

/// Outcome of applying one fix strategy.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct FixResult {
    pub success: bool,
    pub strategy: FixStrategy,
    pub error: Option<String>,
}

impl FixResult {
    pub fn applied(strategy: FixStrategy) -> Self {
        Self {
            success: true,
            strategy,
            error: None,
        }
    }

    pub fn failed(strategy: FixStrategy, error: impl Into<String>) -> Self {
        Self {
            success: false,
            strategy,
            error: Some(error.into()),
        }
    }
}

/// Per-run record of one strategy application, kept in memory only for
/// progress/regression analysis and discarded at run end.
#[derive(Debug, Clone)]
pub struct FixAttempt {
    pub strategy: FixStrategy,
    pub iteration: u32,
    pub errors_before: usize,
    pub errors_after: Option<usize>,
    pub timestamp: DateTime<Utc>,
    pub success: bool,
}

/// A durable record of which strategy resolved which error pattern.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct HistoricalFix {
    pub error_pattern: String,
    pub strategy: FixStrategy,
    pub success_count: u32,
    pub last_used: DateTime<Utc>,
}

/// Persisted fix history, one per repository.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct FixHistory {
    pub repo_id: String,
    pub fixes: Vec<HistoricalFix>,
    pub last_resurrection: Option<DateTime<Utc>>,
}

impl FixHistory {
    pub fn empty(repo_id: impl Into<String>) -> Self {
        Self {
            repo_id: repo_id.into(),
            fixes: Vec::new(),
            last_resurrection: None,
        }
    }
}

/// One result record per applied replacement per dependency group.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct ReplacementOutcome {
    pub package_name: String,
    pub old_version: String,
    pub new_version: String,
    pub requires_manual_review: bool,
}

/// Terminal outcome of a validation run.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum ValidationOutcome {
    Succeeded,
    FailedMaxIterations,
    FailedUnparsable,
    SkippedNoBuildTarget,
}

/// Structured result of a full validation run.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ValidationResult {
    pub success: bool,
    pub outcome: ValidationOutcome,
    pub iterations: u32,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub proof: Option<crate::build::CompilationProof>,
    pub applied_fixes: Vec<FixResult>,
    pub remaining_errors: Vec<AnalyzedError>,
    pub duration_ms: u64,
}
