//! Durable package-replacement knowledge base.
//!
//! The registry owns three tables: deprecated→modern replacements, the
//! architecture-incompatibility list, and known-dead source-archive URLs
//! (exact strings plus glob patterns). It loads from a versioned JSON file
//! and falls back to a built-in default set when the file is missing or
//! corrupt; a bad knowledge file must never take the tool down.

pub mod defaults;

use crate::core::types::{ArchIncompatibleEntry, PackageReplacement};
use crate::error::ResurrectError;
use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

/// On-disk schema of the knowledge file.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct RegistryFile {
    pub version: String,
    pub last_updated: DateTime<Utc>,
    pub replacements: Vec<PackageReplacement>,
    #[serde(default)]
    pub architecture_incompatible: Vec<ArchIncompatibleEntry>,
    #[serde(default)]
    pub known_dead_urls: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub dead_url_patterns: Option<Vec<String>>,
}

pub struct ReplacementRegistry {
    path: PathBuf,
    data: RegistryFile,
}

impl ReplacementRegistry {
    /// Load the knowledge file at `path`, falling back to the built-in set
    /// on any failure.
    pub fn load(path: impl Into<PathBuf>) -> Self {
        let path = path.into();
        let data = match Self::read_file(&path) {
            Ok(data) => {
                debug!(
                    version = %data.version,
                    replacements = data.replacements.len(),
                    "loaded replacement registry"
                );
                data
            }
            Err(e) => {
                warn!("Failed to load registry from {:?}: {}, using built-in defaults", path, e);
                defaults::builtin()
            }
        };
        Self { path, data }
    }

    fn read_file(path: &Path) -> Result<RegistryFile, ResurrectError> {
        let raw = fs::read_to_string(path).map_err(|e| ResurrectError::KnowledgeCorrupt {
            path: path.to_path_buf(),
            reason: e.to_string(),
        })?;
        serde_json::from_str(&raw).map_err(|e| ResurrectError::KnowledgeCorrupt {
            path: path.to_path_buf(),
            reason: e.to_string(),
        })
    }

    /// The single replacement registered for `name`, if any.
    pub fn lookup(&self, name: &str) -> Option<&PackageReplacement> {
        self.data.replacements.iter().find(|r| r.old_name == name)
    }

    /// The architecture-incompatibility entry for `name`, if any.
    pub fn arch_entry(&self, name: &str) -> Option<&ArchIncompatibleEntry> {
        self.data
            .architecture_incompatible
            .iter()
            .find(|e| e.package_name == name)
    }

    /// Register a replacement, replacing any existing entry for the same old
    /// name (last-write-wins).
    pub fn add(&mut self, replacement: PackageReplacement) {
        self.data
            .replacements
            .retain(|r| r.old_name != replacement.old_name);
        self.data.replacements.push(replacement);
    }

    /// Persist the whole schema with a refreshed timestamp. Full-file
    /// overwrite, creating the parent directory if absent.
    pub fn save(&mut self) -> Result<()> {
        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent)
                .with_context(|| format!("creating registry directory {parent:?}"))?;
        }
        self.data.last_updated = Utc::now();
        let rendered = serde_json::to_string_pretty(&self.data)
            .context("serializing replacement registry")?;
        fs::write(&self.path, rendered)
            .with_context(|| format!("writing registry file {:?}", self.path))?;
        Ok(())
    }

    /// Whether `url` matches a known-dead URL, either exactly or through one
    /// of the glob patterns (`*` = any run of non-separator characters,
    /// `**` = anything).
    pub fn is_dead_url(&self, url: &str) -> bool {
        if self.data.known_dead_urls.iter().any(|u| u == url) {
            return true;
        }
        let Some(patterns) = &self.data.dead_url_patterns else {
            return false;
        };
        patterns.iter().any(|pattern| {
            match glob_to_regex(pattern) {
                Ok(re) => re.is_match(url),
                Err(e) => {
                    warn!("Invalid dead-URL pattern {pattern:?}: {e}");
                    false
                }
            }
        })
    }

    pub fn replacements(&self) -> &[PackageReplacement] {
        &self.data.replacements
    }

    pub fn file(&self) -> &RegistryFile {
        &self.data
    }
}

/// Compile a URL glob into an anchored regex. `**` matches any characters,
/// `*` any run of characters other than `/`.
fn glob_to_regex(pattern: &str) -> Result<Regex> {
    let mut regex = String::with_capacity(pattern.len() + 8);
    regex.push('^');
    let mut chars = pattern.chars().peekable();
    while let Some(c) = chars.next() {
        match c {
            '*' => {
                if chars.peek() == Some(&'*') {
                    chars.next();
                    regex.push_str(".*");
                } else {
                    regex.push_str("[^/]*");
                }
            }
            c if "\\.+()[]{}^$|?".contains(c) => {
                regex.push('\\');
                regex.push(c);
            }
            c => regex.push(c),
        }
    }
    regex.push('$');
    Regex::new(&regex).with_context(|| format!("compiling dead-URL pattern {pattern:?}"))
}
