//! The post-resurrection validation state machine.
//!
//! Drives a repository through the compile → diagnose → repair → retry loop
//! until the build succeeds or the iteration budget is exhausted. States:
//! Idle → Iterating → {Succeeded, FailedMaxIterations, FailedUnparsable,
//! SkippedNoBuildTarget}. Strictly sequential: each iteration's build
//! completes (or times out) before analysis and fix application proceed.

pub mod events;

use crate::analyzer::ErrorAnalyzer;
use crate::build::{
    self, BuildRunner, CompileOptions, DEFAULT_BUILD_TIMEOUT,
};
use crate::core::types::{
    AnalyzedError, FixAttempt, FixResult, ValidationOutcome, ValidationResult,
};
use crate::history::FixHistoryStore;
use crate::manifest::Manifest;
use crate::strategy::FixStrategyEngine;
use anyhow::Result;
use chrono::Utc;
use events::{ProgressEvent, ProgressSink, TracingSink};
use std::collections::HashMap;
use std::path::Path;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::{debug, info, warn};

const STAGNATION_STREAK_THRESHOLD: u32 = 3;

#[derive(Debug, Clone)]
pub struct ValidatorConfig {
    pub max_iterations: u32,
    pub build_timeout: Duration,
}

impl Default for ValidatorConfig {
    fn default() -> Self {
        Self {
            max_iterations: 10,
            build_timeout: DEFAULT_BUILD_TIMEOUT,
        }
    }
}

/// How the current iteration's error count compares to the previous one.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum IterationTrend {
    Progress,
    Regression,
    Stagnation,
}

pub struct PostResurrectionValidator {
    runner: Arc<dyn BuildRunner>,
    analyzer: ErrorAnalyzer,
    engine: FixStrategyEngine,
    history: FixHistoryStore,
    sink: Arc<dyn ProgressSink>,
    config: ValidatorConfig,
}

impl PostResurrectionValidator {
    pub fn new(runner: Arc<dyn BuildRunner>) -> Self {
        Self {
            runner,
            analyzer: ErrorAnalyzer::new(),
            engine: FixStrategyEngine::new(),
            history: FixHistoryStore::new(),
            sink: Arc::new(TracingSink),
            config: ValidatorConfig::default(),
        }
    }

    pub fn with_config(mut self, config: ValidatorConfig) -> Self {
        self.config = config;
        self
    }

    pub fn with_sink(mut self, sink: Arc<dyn ProgressSink>) -> Self {
        self.sink = sink;
        self
    }

    pub fn with_history(mut self, history: FixHistoryStore) -> Self {
        self.history = history;
        self
    }

    /// Run the repair loop. `repo_id` keys the fix history; it is usually
    /// the repository path but may be a URL for remote checkouts.
    pub async fn validate(&mut self, repo_path: &Path, repo_id: &str) -> Result<ValidationResult> {
        let started = Instant::now();
        self.engine.reset_attempted_strategies();
        self.history.load(repo_id);

        let package_manager = build::detect_package_manager(repo_path);
        let build_command = Manifest::load(repo_path)
            .ok()
            .and_then(|manifest| build::detect_build_command(repo_path, &manifest));
        let Some(build_command) = build_command else {
            // Nothing to validate is a success with zero iterations.
            self.sink.emit(ProgressEvent::NoBuildTarget {
                repo_path: repo_path.to_path_buf(),
                reason: "no build script, compile script, or tsconfig found".to_string(),
            });
            return Ok(ValidationResult {
                success: true,
                outcome: ValidationOutcome::SkippedNoBuildTarget,
                iterations: 0,
                proof: None,
                applied_fixes: Vec::new(),
                remaining_errors: Vec::new(),
                duration_ms: started.elapsed().as_millis() as u64,
            });
        };
        let options = CompileOptions {
            package_manager,
            build_command,
            timeout: self.config.build_timeout,
        };

        let mut applied: Vec<(String, FixResult)> = Vec::new();
        let mut attempts: Vec<FixAttempt> = Vec::new();
        let mut stagnation_streak: u32 = 0;
        let mut last_errors: Vec<AnalyzedError> = Vec::new();

        for iteration in 1..=self.config.max_iterations {
            self.sink.emit(ProgressEvent::IterationStart {
                iteration,
                max_iterations: self.config.max_iterations,
                repo_path: repo_path.to_path_buf(),
            });

            let outcome = self.runner.compile(repo_path, &options).await;
            if outcome.success {
                let proof = build::generate_compilation_proof(&outcome, &options, iteration);
                self.persist_successful_fixes(repo_id, &applied);
                let result = ValidationResult {
                    success: true,
                    outcome: ValidationOutcome::Succeeded,
                    iterations: iteration,
                    proof: Some(proof),
                    applied_fixes: applied.into_iter().map(|(_, fix)| fix).collect(),
                    remaining_errors: Vec::new(),
                    duration_ms: started.elapsed().as_millis() as u64,
                };
                self.emit_complete(&result);
                return Ok(result);
            }

            let errors = self.analyzer.analyze(&outcome.stdout, &outcome.stderr);
            if let Some(attempt) = attempts.last_mut() {
                attempt.errors_after = Some(errors.len());
            }
            if errors.is_empty() {
                warn!(status = %outcome.status, "build failed with no parsable errors");
                let result = ValidationResult {
                    success: false,
                    outcome: ValidationOutcome::FailedUnparsable,
                    iterations: iteration,
                    proof: None,
                    applied_fixes: applied.into_iter().map(|(_, fix)| fix).collect(),
                    remaining_errors: Vec::new(),
                    duration_ms: started.elapsed().as_millis() as u64,
                };
                self.emit_complete(&result);
                return Ok(result);
            }

            let mut by_category: HashMap<_, usize> = HashMap::new();
            for error in &errors {
                *by_category.entry(error.category).or_default() += 1;
            }
            self.sink.emit(ProgressEvent::ErrorAnalysis {
                iteration,
                error_count: errors.len(),
                errors_by_category: by_category,
                top_errors: errors.iter().take(3).cloned().collect(),
            });

            // The previous attempt's before/after counts drive the trend.
            let trend = attempts
                .last()
                .and_then(|a| a.errors_after.map(|after| classify_trend(a.errors_before, after)));
            match trend {
                Some(IterationTrend::Progress) => {
                    stagnation_streak = 0;
                    debug!(errors = errors.len(), "making progress");
                }
                Some(IterationTrend::Regression) => {
                    stagnation_streak = 0;
                    warn!(errors = errors.len(), "error count regressed");
                }
                Some(IterationTrend::Stagnation) => {
                    stagnation_streak += 1;
                    // Logged only: the loop keeps consuming its budget
                    // rather than bailing out early.
                    if stagnation_streak >= STAGNATION_STREAK_THRESHOLD {
                        warn!(
                            streak = stagnation_streak,
                            "no progress for {stagnation_streak} iterations, continuing"
                        );
                    }
                }
                None => {}
            }

            let top = &errors[0];
            let strategy = self.engine.select_strategy(top, &self.history);
            self.sink.emit(ProgressEvent::FixApplied {
                iteration,
                strategy: strategy.clone(),
                target_error: top.pattern(),
                description: strategy.describe(),
            });

            let fix = self.engine.apply_fix(repo_path, &strategy).await;
            self.engine.mark_strategy_attempted(top, &strategy);
            attempts.push(FixAttempt {
                strategy: strategy.clone(),
                iteration,
                errors_before: errors.len(),
                errors_after: None,
                timestamp: Utc::now(),
                success: fix.success,
            });
            self.sink.emit(ProgressEvent::FixOutcome {
                iteration,
                success: fix.success,
                strategy,
                error: fix.error.clone(),
            });
            applied.push((top.pattern(), fix));
            last_errors = errors;
        }

        info!(
            budget = self.config.max_iterations,
            "iteration budget exhausted without a successful build"
        );
        let result = ValidationResult {
            success: false,
            outcome: ValidationOutcome::FailedMaxIterations,
            iterations: self.config.max_iterations,
            proof: None,
            applied_fixes: applied.into_iter().map(|(_, fix)| fix).collect(),
            remaining_errors: last_errors,
            duration_ms: started.elapsed().as_millis() as u64,
        };
        self.emit_complete(&result);
        Ok(result)
    }

    /// On success, remember every fix that applied cleanly this run.
    fn persist_successful_fixes(&mut self, repo_id: &str, applied: &[(String, FixResult)]) {
        for (pattern, fix) in applied {
            if fix.success {
                self.history.record_fix(repo_id, pattern, &fix.strategy);
            }
        }
        if let Err(e) = self.history.save(repo_id) {
            warn!("Failed to persist fix history: {e}");
        }
    }

    fn emit_complete(&self, result: &ValidationResult) {
        let successful = result.applied_fixes.iter().filter(|f| f.success).count();
        let summary = match result.outcome {
            ValidationOutcome::Succeeded => format!(
                "build restored after {} iteration(s), {} fix(es) applied",
                result.iterations, successful
            ),
            ValidationOutcome::FailedMaxIterations => format!(
                "gave up after {} iterations, {} error(s) remain",
                result.iterations,
                result.remaining_errors.len()
            ),
            ValidationOutcome::FailedUnparsable => {
                "build failed with output the analyzer could not parse".to_string()
            }
            ValidationOutcome::SkippedNoBuildTarget => "no build target to validate".to_string(),
        };
        self.sink.emit(ProgressEvent::ValidationComplete {
            success: result.success,
            total_iterations: result.iterations,
            total_fixes_applied: result.applied_fixes.len(),
            successful_fixes: successful,
            remaining_errors: result.remaining_errors.len(),
            duration_ms: result.duration_ms,
            summary,
        });
    }
}

fn classify_trend(previous: usize, current: usize) -> IterationTrend {
    if current < previous {
        IterationTrend::Progress
    } else if current > previous {
        IterationTrend::Regression
    } else {
        IterationTrend::Stagnation
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn trend_classification() {
        assert_eq!(classify_trend(5, 3), IterationTrend::Progress);
        assert_eq!(classify_trend(3, 5), IterationTrend::Regression);
        assert_eq!(classify_trend(4, 4), IterationTrend::Stagnation);
    }

    #[test]
    fn first_iteration_has_no_trend() {
        let attempts: Vec<FixAttempt> = Vec::new();
        let trend = attempts
            .last()
            .and_then(|a| a.errors_after.map(|after| classify_trend(a.errors_before, after)));
        assert_eq!(trend, None);
    }
}
