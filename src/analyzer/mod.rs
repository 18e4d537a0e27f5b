//! Build-output error analysis.
//!
//! Splits raw tool output into discrete error blocks, classifies each block
//! into one of the 9 categories, extracts package/version metadata,
//! deduplicates by `(category, package)`, assigns priorities, and attaches a
//! suggested fix. Classification is total: every block lands in exactly one
//! category, with `Unknown` as the catch-all.

pub mod patterns;

use crate::core::constants::KNOWN_NATIVE_MODULES;
use crate::core::types::{AnalyzedError, ErrorCategory};
use crate::strategy::templates;
use std::collections::HashMap;
use tracing::debug;

#[derive(Debug, Default)]
pub struct ErrorAnalyzer;

impl ErrorAnalyzer {
    pub fn new() -> Self {
        Self
    }

    /// Analyze combined build output into prioritized, deduplicated errors,
    /// sorted non-increasing by priority.
    pub fn analyze(&self, stdout: &str, stderr: &str) -> Vec<AnalyzedError> {
        let combined = if stdout.is_empty() {
            stderr.to_string()
        } else if stderr.is_empty() {
            stdout.to_string()
        } else {
            format!("{stdout}\n{stderr}")
        };

        let blocks = split_blocks(&combined);
        let mut deduped: HashMap<(ErrorCategory, Option<String>), AnalyzedError> = HashMap::new();
        let mut order: Vec<(ErrorCategory, Option<String>)> = Vec::new();

        for block in blocks {
            let category = self.categorize(&block);
            if category == ErrorCategory::Unknown && is_noise(&block) {
                continue;
            }
            let (package_name, version_constraint, conflicting) =
                extract_metadata(category, &block);

            let key = (category, package_name.clone());
            match deduped.get_mut(&key) {
                Some(existing) => {
                    for pkg in conflicting {
                        if !existing.conflicting_packages.contains(&pkg) {
                            existing.conflicting_packages.push(pkg);
                        }
                    }
                    if existing.version_constraint.is_none() {
                        existing.version_constraint = version_constraint;
                    }
                }
                None => {
                    let suggested_fix = templates::suggested_fix(
                        category,
                        package_name.as_deref(),
                        version_constraint.as_deref(),
                    );
                    deduped.insert(
                        key.clone(),
                        AnalyzedError {
                            category,
                            message: block,
                            package_name,
                            version_constraint,
                            conflicting_packages: conflicting,
                            priority: category.priority(),
                            suggested_fix,
                        },
                    );
                    order.push(key);
                }
            }
        }

        let mut errors: Vec<AnalyzedError> = order
            .into_iter()
            .filter_map(|key| deduped.remove(&key))
            .collect();
        errors.sort_by(|a, b| b.priority.cmp(&a.priority));
        debug!(count = errors.len(), "analyzed build output");
        errors
    }

    /// Deterministic, total classification: tests the fixed pattern list in
    /// priority order, first match wins, else `Unknown`.
    pub fn categorize(&self, message: &str) -> ErrorCategory {
        for (category, pattern) in patterns::CATEGORY_PATTERNS.iter() {
            if pattern.is_match(message) {
                return *category;
            }
        }
        ErrorCategory::Unknown
    }
}

/// Split combined output into error blocks: a line matching one of the
/// block-start heuristics opens a new block, every other line continues the
/// current one. A contiguous run of lines sharing one tool prefix (npm,
/// yarn, gyp) is one logical error, so only the first line of the run opens
/// a block. Lines before the first block start are discarded.
fn split_blocks(output: &str) -> Vec<String> {
    let mut blocks: Vec<String> = Vec::new();
    let mut run_prefix: Option<usize> = None;
    for line in output.lines() {
        let trimmed = line.trim_end();
        if trimmed.is_empty() {
            run_prefix = None;
            continue;
        }
        let prefix = patterns::TOOL_PREFIXES
            .iter()
            .position(|p| p.is_match(trimmed));
        let continues_run = prefix.is_some() && prefix == run_prefix;
        if !continues_run && patterns::BLOCK_START.iter().any(|p| p.is_match(trimmed)) {
            blocks.push(trimmed.to_string());
        } else if let Some(current) = blocks.last_mut() {
            current.push('\n');
            current.push_str(trimmed);
        }
        run_prefix = prefix;
    }
    blocks
}

fn is_noise(block: &str) -> bool {
    patterns::NOISE.iter().any(|p| p.is_match(block))
}

/// Category-specific package/version/conflict extraction.
fn extract_metadata(
    category: ErrorCategory,
    message: &str,
) -> (Option<String>, Option<String>, Vec<String>) {
    match category {
        ErrorCategory::DependencyNotFound => (extract_missing_module(message), None, Vec::new()),
        ErrorCategory::DependencyVersionConflict => {
            let (package, version) = extract_package_at_version(message);
            (package, version, Vec::new())
        }
        ErrorCategory::PeerDependencyConflict => extract_peer_conflict(message),
        ErrorCategory::NativeModuleFailure => (extract_native_package(message), None, Vec::new()),
        ErrorCategory::GitDependencyFailure => (extract_git_package(message), None, Vec::new()),
        ErrorCategory::LockfileConflict
        | ErrorCategory::SyntaxError
        | ErrorCategory::TypeError
        | ErrorCategory::Unknown => (None, None, Vec::new()),
    }
}

fn extract_missing_module(message: &str) -> Option<String> {
    for pattern in patterns::MODULE_NOT_FOUND.iter() {
        if let Some(captures) = pattern.captures(message) {
            if let Some(raw) = captures.get(1) {
                return normalize_module_specifier(raw.as_str());
            }
        }
    }
    None
}

/// Reduce a module specifier to its package name: scoped specifiers keep the
/// `@scope/name` grouping, bare specifiers keep the first path segment, and
/// relative/absolute paths are not packages at all.
fn normalize_module_specifier(specifier: &str) -> Option<String> {
    let specifier = specifier.replace("%2f", "/").replace("%2F", "/");
    if specifier.starts_with('.') || specifier.starts_with('/') {
        return None;
    }
    let mut segments = specifier.split('/');
    if specifier.starts_with('@') {
        let scope = segments.next()?;
        let name = segments.next()?;
        Some(format!("{scope}/{name}"))
    } else {
        segments.next().map(String::from)
    }
}

fn extract_package_at_version(message: &str) -> (Option<String>, Option<String>) {
    for pattern in patterns::PACKAGE_AT_VERSION.iter() {
        if let Some(captures) = pattern.captures(message) {
            let package = captures.get(1).map(|m| m.as_str().to_string());
            let version = captures.get(2).map(|m| m.as_str().to_string());
            if package.is_some() {
                return (package, version);
            }
        }
    }
    let package = patterns::GENERIC_PACKAGE
        .captures(message)
        .and_then(|c| c.get(1))
        .map(|m| m.as_str().to_string());
    (package, None)
}

fn extract_peer_conflict(message: &str) -> (Option<String>, Option<String>, Vec<String>) {
    let mut package = None;
    let mut version = None;
    if let Some(captures) = patterns::PEER_REQUESTED.captures(message) {
        package = captures.get(1).map(|m| m.as_str().to_string());
        version = captures.get(2).map(|m| m.as_str().to_string());
    }

    let mut conflicting = Vec::new();
    let mut push = |name: String| {
        if Some(&name) != package.as_ref() && !conflicting.contains(&name) {
            conflicting.push(name);
        }
    };
    for captures in patterns::PEER_FROM.captures_iter(message) {
        if let Some(m) = captures.get(1) {
            push(m.as_str().to_string());
        }
    }
    for captures in patterns::PEER_FOUND.captures_iter(message) {
        if let Some(m) = captures.get(1) {
            push(m.as_str().to_string());
        }
    }
    if package.is_none() {
        package = patterns::PEER_CONFLICTING
            .captures(message)
            .and_then(|c| c.get(1))
            .map(|m| m.as_str().to_string());
    }
    (package, version, conflicting)
}

fn extract_native_package(message: &str) -> Option<String> {
    if let Some(captures) = patterns::NODE_MODULES_PATH.captures(message) {
        if let Some(m) = captures.get(1) {
            return Some(m.as_str().replace('\\', "/"));
        }
    }
    // Regex found nothing; fall back to the fixed list of known native
    // packages.
    KNOWN_NATIVE_MODULES
        .iter()
        .find(|name| message.contains(*name))
        .map(|name| name.to_string())
}

fn extract_git_package(message: &str) -> Option<String> {
    for pattern in patterns::GIT_URL.iter() {
        if let Some(captures) = pattern.captures(message) {
            if let Some(m) = captures.get(1) {
                return Some(m.as_str().to_string());
            }
        }
    }
    None
}
