//! Typed progress events emitted by the validator.
//!
//! Each payload is a distinct variant; consumers (CLI, tests) receive them
//! through a `ProgressSink`. Events are advisory: the loop is correct
//! without any listener.

use crate::core::types::{AnalyzedError, ErrorCategory, FixStrategy};
use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::Mutex;
use tracing::info;

#[derive(Debug, Clone)]
pub enum ProgressEvent {
    IterationStart {
        iteration: u32,
        max_iterations: u32,
        repo_path: PathBuf,
    },
    ErrorAnalysis {
        iteration: u32,
        error_count: usize,
        errors_by_category: HashMap<ErrorCategory, usize>,
        top_errors: Vec<AnalyzedError>,
    },
    FixApplied {
        iteration: u32,
        strategy: FixStrategy,
        target_error: String,
        description: String,
    },
    FixOutcome {
        iteration: u32,
        success: bool,
        strategy: FixStrategy,
        error: Option<String>,
    },
    ValidationComplete {
        success: bool,
        total_iterations: u32,
        total_fixes_applied: usize,
        successful_fixes: usize,
        remaining_errors: usize,
        duration_ms: u64,
        summary: String,
    },
    NoBuildTarget {
        repo_path: PathBuf,
        reason: String,
    },
}

pub trait ProgressSink: Send + Sync {
    fn emit(&self, event: ProgressEvent);
}

/// Sink that forwards events to the tracing subscriber; the CLI's default.
#[derive(Debug, Default)]
pub struct TracingSink;

impl ProgressSink for TracingSink {
    fn emit(&self, event: ProgressEvent) {
        match event {
            ProgressEvent::IterationStart {
                iteration,
                max_iterations,
                ..
            } => info!("iteration {iteration}/{max_iterations}"),
            ProgressEvent::ErrorAnalysis {
                error_count,
                top_errors,
                ..
            } => {
                let preview: Vec<String> = top_errors
                    .iter()
                    .map(|e| format!("{}:{}", e.category, e.package_name.as_deref().unwrap_or("-")))
                    .collect();
                info!(error_count, top = ?preview, "analyzed build failures");
            }
            ProgressEvent::FixApplied { description, .. } => info!("applying fix: {description}"),
            ProgressEvent::FixOutcome { success, error, .. } => {
                if success {
                    info!("fix applied");
                } else {
                    info!(error = ?error, "fix failed");
                }
            }
            ProgressEvent::ValidationComplete { summary, .. } => info!("{summary}"),
            ProgressEvent::NoBuildTarget { reason, .. } => info!("skipping validation: {reason}"),
        }
    }
}

/// Sink that records every event, for assertions in tests.
#[derive(Debug, Default)]
pub struct RecordingSink {
    events: Mutex<Vec<ProgressEvent>>,
}

impl RecordingSink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn events(&self) -> Vec<ProgressEvent> {
        self.events.lock().expect("event log poisoned").clone()
    }
}

impl ProgressSink for RecordingSink {
    fn emit(&self, event: ProgressEvent) {
        self.events.lock().expect("event log poisoned").push(event);
    }
}
