//! Compiled pattern tables for build-output classification.
//!
//! The category list is ordered: `categorize` tests these top to bottom and
//! the first match wins. Changing the order changes classification, so the
//! order here mirrors the category priority ranking.

use crate::core::types::ErrorCategory;
use once_cell::sync::Lazy;
use regex::Regex;

fn re(pattern: &str) -> Regex {
    // Patterns are fixed strings; a failure here is a programming error
    // caught by the pattern tests below.
    Regex::new(pattern).unwrap()
}

/// Tool prefixes that report one logical error as a run of prefixed lines.
/// A contiguous run sharing one of these prefixes is a single block.
pub static TOOL_PREFIXES: Lazy<Vec<Regex>> =
    Lazy::new(|| vec![re(r"^npm ERR!"), re(r"^yarn error"), re(r"^gyp ERR!")]);

/// Line-start heuristics that open a new error block. Non-matching lines are
/// continuation of the current block.
pub static BLOCK_START: Lazy<Vec<Regex>> = Lazy::new(|| {
    vec![
        re(r"^npm ERR!"),
        re(r"^yarn error"),
        re(r"^error\b"),
        re(r"^Error\b"),
        re(r"^ERROR\b"),
        re(r"^gyp ERR!"),
        re(r"^fatal:"),
        re(r"^✖"),
        re(r"^\S[^\n]*\berror TS\d+:"),
    ]
});

/// Ordered category patterns; first match wins, else `Unknown`.
pub static CATEGORY_PATTERNS: Lazy<Vec<(ErrorCategory, Regex)>> = Lazy::new(|| {
    vec![
        (
            ErrorCategory::LockfileConflict,
            re(r"(?i)(package-lock\.json|yarn\.lock|pnpm-lock\.yaml|npm-shrinkwrap\.json).*\b(conflict|out of sync|outdated|merge)|\block ?file\b.*\b(conflict|out of sync|outdated)|can only install packages when your package\.json and package-lock\.json are in sync"),
        ),
        (
            ErrorCategory::PeerDependencyConflict,
            re(r#"(?i)\bERESOLVE\b|peer dep(endenc(y|ies))?\b|conflicting peer|\bpeer\s+@?[\w.-]+(?:/[\w.-]+)?@""#),
        ),
        (
            ErrorCategory::DependencyVersionConflict,
            re(r"(?i)no matching version|\bETARGET\b|\bnotarget\b|version conflict|could not resolve dependency|incompatible\b.*\bversion"),
        ),
        (
            ErrorCategory::NativeModuleFailure,
            re(r"(?i)node-gyp|gyp ERR!|prebuild-install|node-pre-gyp|binding\.gyp|NODE_MODULE_VERSION|was compiled against a different Node\.js version"),
        ),
        (
            ErrorCategory::GitDependencyFailure,
            re(r"(?i)git dep|git clone|git checkout|\bgit@|repository not found|fatal: (unable to access|could not read|repository|remote error)"),
        ),
        (
            ErrorCategory::DependencyNotFound,
            re(r"(?i)cannot find module|module not found|\bE404\b|404 not found|is not in (this|the npm) registry|could not be found"),
        ),
        (
            ErrorCategory::SyntaxError,
            re(r"(?i)SyntaxError|unexpected token|unexpected end of (input|file)|pars(e|ing) error"),
        ),
        (
            ErrorCategory::TypeError,
            re(r"(?i)\bTS\d{4,5}\b|\btype ?error\b|is not assignable to|does not exist on type"),
        ),
    ]
});

/// Progress/info/warning noise: blocks that classify `Unknown` and match one
/// of these are dropped rather than surfaced.
pub static NOISE: Lazy<Vec<Regex>> = Lazy::new(|| {
    vec![
        re(r"(?i)^npm (notice|info|verb|timing|http)"),
        re(r"(?i)^(warning|warn)\b"),
        re(r"(?i)^info\b"),
        re(r"(?i)^(resolving|fetching|downloading|linking|building fresh packages)"),
        re(r"(?i)^progress"),
        re(r"(?i)^(added|removed|changed|audited) \d+ packages?"),
        re(r"(?i)^found \d+ vulnerabilit"),
        re(r"(?i)^up to date"),
        re(r"(?i)^npm ERR! A complete log of this run"),
        re(r"(?i)^npm ERR!\s*$"),
    ]
});

/// `Cannot find module 'X'` and friends.
pub static MODULE_NOT_FOUND: Lazy<Vec<Regex>> = Lazy::new(|| {
    vec![
        re(r#"[Cc]annot find module '([^']+)'"#),
        re(r#"[Cc]annot find module "([^"]+)""#),
        re(r#"[Mm]odule not found:[^'"]*['"]([^'"]+)['"]"#),
        re(r#"404\s+'(@?[A-Za-z0-9][\w.-]*(?:/[\w.-]+)?)@"#),
        re(r"404 Not Found.*registry\.npmjs\.org/((?:@[\w.-]+(?:%2[fF]|/))?[\w.-]+)"),
    ]
});

/// `package@constraint` in resolution failures.
pub static PACKAGE_AT_VERSION: Lazy<Vec<Regex>> = Lazy::new(|| {
    vec![
        re(r"[Nn]o matching version found for (@?[\w.-]+(?:/[\w.-]+)?)@([^\s'\x22]+)"),
        re(r"notarget.*?(@?[A-Za-z0-9][\w.-]*(?:/[\w.-]+)?)@([~^><=\d][^\s'\x22]*)"),
        re(r"(@?[A-Za-z0-9][\w.-]*(?:/[\w.-]+)?)@([~^><=]?\d[\w.*+-]*(?:\.[\w*+-]+)*)"),
    ]
});

/// Fallback generic "package X" extractor.
pub static GENERIC_PACKAGE: Lazy<Regex> =
    Lazy::new(|| re(r#"(?i)(?:package|module|dependency)[:\s]+['"]?(@?[A-Za-z0-9][\w.-]*(?:/[\w.-]+)?)"#));

/// Peer-conflict extraction: the requested peer and the packages requiring it.
pub static PEER_REQUESTED: Lazy<Regex> =
    Lazy::new(|| re(r#"peer (@?[\w.-]+(?:/[\w.-]+)?)@"([^"]+)""#));
pub static PEER_FROM: Lazy<Regex> =
    Lazy::new(|| re(r"from (@?[\w.-]+(?:/[\w.-]+)?)@[\w.^~*-]+"));
pub static PEER_CONFLICTING: Lazy<Regex> =
    Lazy::new(|| re(r"[Cc]onflicting peer dependency:?\s+(@?[\w.-]+(?:/[\w.-]+)?)@"));
pub static PEER_FOUND: Lazy<Regex> =
    Lazy::new(|| re(r"Found:\s+(@?[\w.-]+(?:/[\w.-]+)?)@"));

/// Native failures usually name the package through a node_modules path.
pub static NODE_MODULES_PATH: Lazy<Regex> =
    Lazy::new(|| re(r"node_modules[/\\](@[\w.-]+[/\\][\w.-]+|[\w.-]+)"));

/// Git dependency URL forms.
pub static GIT_URL: Lazy<Vec<Regex>> = Lazy::new(|| {
    vec![
        re(r"(?:git\+)?(?:https?|ssh|git)://[^\s'\x22]*/([A-Za-z0-9_-]+(?:\.[A-Za-z0-9_-]+)*?)(?:\.git)?/?(?:#[^\s'\x22]*)?(?:['\x22\s]|$)"),
        re(r"git@[\w.-]+:[\w.-]+/([A-Za-z0-9_.-]+?)(?:\.git)?\b"),
    ]
});

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn all_pattern_tables_compile() {
        assert!(!BLOCK_START.is_empty());
        assert!(!TOOL_PREFIXES.is_empty());
        assert_eq!(CATEGORY_PATTERNS.len(), 8);
        assert!(!NOISE.is_empty());
        assert!(!MODULE_NOT_FOUND.is_empty());
        assert!(!PACKAGE_AT_VERSION.is_empty());
        assert!(!GIT_URL.is_empty());
        let _ = (&*GENERIC_PACKAGE, &*PEER_REQUESTED, &*PEER_FROM);
        let _ = (&*PEER_CONFLICTING, &*PEER_FOUND, &*NODE_MODULES_PATH);
    }

    #[test]
    fn category_pattern_order_mirrors_priority_order() {
        let priorities: Vec<u32> = CATEGORY_PATTERNS
            .iter()
            .map(|(category, _)| category.priority())
            .collect();
        let mut sorted = priorities.clone();
        sorted.sort_unstable_by(|a, b| b.cmp(a));
        assert_eq!(priorities, sorted);
    }
}
