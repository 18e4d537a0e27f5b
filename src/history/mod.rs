//! Durable, hash-addressable memory of "what worked".
//!
//! Per-repository histories live under a dot-directory inside the repository
//! when the identifier is a filesystem path, and under a content-addressed
//! directory in the user data dir for remote/URL identifiers. A process-wide
//! global pattern map remembers the first strategy that ever succeeded for a
//! pattern across repositories. It is write-once: an early fix is never
//! superseded, even at the cost of staleness.

use crate::core::types::{FixHistory, FixStrategy, HistoricalFix};
use anyhow::{Context, Result};
use chrono::Utc;
use once_cell::sync::Lazy;
use sha2::{Digest, Sha256};
use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Mutex;
use tracing::{debug, warn};

const HISTORY_DIR: &str = ".resurrector";
const HISTORY_FILE: &str = "fix-history.json";

/// First successful strategy per pattern, across every repository this
/// process touches. Seeded on first success, never overwritten.
static GLOBAL_FIXES: Lazy<Mutex<HashMap<String, FixStrategy>>> =
    Lazy::new(|| Mutex::new(HashMap::new()));

pub struct FixHistoryStore {
    base_dir: PathBuf,
    cache: HashMap<String, FixHistory>,
}

impl FixHistoryStore {
    pub fn new() -> Self {
        let base_dir = dirs::data_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("resurrector")
            .join("history");
        Self::with_base_dir(base_dir)
    }

    /// Store rooted at an explicit directory for content-addressed
    /// histories; path-identified repositories still persist in-repo.
    pub fn with_base_dir(base_dir: impl Into<PathBuf>) -> Self {
        Self {
            base_dir: base_dir.into(),
            cache: HashMap::new(),
        }
    }

    fn history_path(&self, repo_id: &str) -> PathBuf {
        let repo_path = Path::new(repo_id);
        if repo_path.exists() {
            repo_path.join(HISTORY_DIR).join(HISTORY_FILE)
        } else {
            // Remote or URL-identified repository: content-addressed slot.
            let digest = Sha256::digest(repo_id.as_bytes());
            let key = hex_prefix(&digest, 16);
            self.base_dir.join(key).join(HISTORY_FILE)
        }
    }

    /// Load (or create) the history for one repository, caching it. A
    /// corrupted or unreadable file is treated as no history.
    pub fn load(&mut self, repo_id: &str) -> &FixHistory {
        if !self.cache.contains_key(repo_id) {
            let path = self.history_path(repo_id);
            let history = match fs::read_to_string(&path) {
                Ok(raw) => match serde_json::from_str::<FixHistory>(&raw) {
                    Ok(history) => {
                        debug!(repo_id, fixes = history.fixes.len(), "loaded fix history");
                        history
                    }
                    Err(e) => {
                        warn!("Corrupt fix history at {path:?}: {e}, starting fresh");
                        FixHistory::empty(repo_id)
                    }
                },
                Err(_) => FixHistory::empty(repo_id),
            };
            self.cache.insert(repo_id.to_string(), history);
        }
        &self.cache[repo_id]
    }

    /// Record a successful fix: same pattern with a structurally equal
    /// strategy reinforces the entry; a different strategy replaces it
    /// outright (most recent success wins); a new pattern appends. Also
    /// seeds the global pattern map on first success.
    pub fn record_fix(&mut self, repo_id: &str, pattern: &str, strategy: &FixStrategy) {
        self.load(repo_id);
        let history = self
            .cache
            .get_mut(repo_id)
            .expect("history cached by load above");

        match history.fixes.iter_mut().find(|f| f.error_pattern == pattern) {
            Some(existing) if existing.strategy == *strategy => {
                existing.success_count += 1;
                existing.last_used = Utc::now();
            }
            Some(existing) => {
                *existing = HistoricalFix {
                    error_pattern: pattern.to_string(),
                    strategy: strategy.clone(),
                    success_count: 1,
                    last_used: Utc::now(),
                };
            }
            None => history.fixes.push(HistoricalFix {
                error_pattern: pattern.to_string(),
                strategy: strategy.clone(),
                success_count: 1,
                last_used: Utc::now(),
            }),
        }

        let mut global = GLOBAL_FIXES.lock().expect("global fix map poisoned");
        global
            .entry(pattern.to_string())
            .or_insert_with(|| strategy.clone());
    }

    /// The remembered strategy for a pattern: the global map first, then
    /// every cached per-repo history.
    pub fn get_successful_fix(&self, pattern: &str) -> Option<FixStrategy> {
        if let Some(strategy) = GLOBAL_FIXES
            .lock()
            .expect("global fix map poisoned")
            .get(pattern)
        {
            return Some(strategy.clone());
        }
        self.cache.values().find_map(|history| {
            history
                .fixes
                .iter()
                .find(|f| f.error_pattern == pattern)
                .map(|f| f.strategy.clone())
        })
    }

    /// Flush one repository's history: stamp the resurrection time and
    /// overwrite the whole file.
    pub fn save(&mut self, repo_id: &str) -> Result<()> {
        self.load(repo_id);
        let path = self.history_path(repo_id);
        let history = self
            .cache
            .get_mut(repo_id)
            .expect("history cached by load above");
        history.last_resurrection = Some(Utc::now());

        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)
                .with_context(|| format!("creating history directory {parent:?}"))?;
        }
        let rendered =
            serde_json::to_string_pretty(history).context("serializing fix history")?;
        fs::write(&path, rendered).with_context(|| format!("writing fix history {path:?}"))?;
        debug!(repo_id, path = ?path, "saved fix history");
        Ok(())
    }
}

impl Default for FixHistoryStore {
    fn default() -> Self {
        Self::new()
    }
}

fn hex_prefix(digest: &[u8], len: usize) -> String {
    let mut out = String::with_capacity(len + 2);
    for byte in digest {
        if out.len() >= len {
            break;
        }
        out.push_str(&format!("{byte:02x}"));
    }
    out.truncate(len);
    out
}
