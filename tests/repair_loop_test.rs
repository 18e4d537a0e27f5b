//! End-to-end repair-loop scenarios against stub build runners.

use async_trait::async_trait;
use pretty_assertions::assert_eq;
use resurrector::history::FixHistoryStore;
use resurrector::validator::events::{ProgressEvent, RecordingSink};
use resurrector::validator::{PostResurrectionValidator, ValidatorConfig};
use resurrector::{BuildRunner, CompileOptions, CompileOutcome, ValidationOutcome};
use std::fs;
use std::path::Path;
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tempfile::TempDir;

fn repo_with_build_script(manifest_body: &str) -> TempDir {
    let dir = TempDir::new().unwrap();
    fs::write(dir.path().join("package.json"), manifest_body).unwrap();
    dir
}

fn outcome(success: bool, stderr: &str) -> CompileOutcome {
    CompileOutcome {
        success,
        status: if success { "ok" } else { "failed" }.to_string(),
        exit_code: Some(if success { 0 } else { 1 }),
        stdout: String::new(),
        stderr: stderr.to_string(),
        duration: Duration::from_millis(10),
    }
}

/// Counts compile calls and replays a fixed script of outcomes, repeating
/// the last entry forever.
struct ScriptedRunner {
    calls: AtomicU32,
    script: Vec<CompileOutcome>,
}

impl ScriptedRunner {
    fn new(script: Vec<CompileOutcome>) -> Self {
        Self {
            calls: AtomicU32::new(0),
            script,
        }
    }

    fn calls(&self) -> u32 {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl BuildRunner for ScriptedRunner {
    async fn compile(&self, _repo_path: &Path, _options: &CompileOptions) -> CompileOutcome {
        let call = self.calls.fetch_add(1, Ordering::SeqCst) as usize;
        self.script
            .get(call)
            .or_else(|| self.script.last())
            .cloned()
            .expect("scripted runner needs at least one outcome")
    }
}

fn validator_for(
    dir: &TempDir,
    runner: Arc<dyn BuildRunner>,
    max_iterations: u32,
) -> PostResurrectionValidator {
    PostResurrectionValidator::new(runner)
        .with_config(ValidatorConfig {
            max_iterations,
            build_timeout: Duration::from_secs(5),
        })
        .with_history(FixHistoryStore::with_base_dir(dir.path().join("history")))
}

#[tokio::test]
async fn immediate_success_takes_one_iteration_and_no_fixes() {
    let dir = repo_with_build_script(r#"{"scripts": {"build": "tsc"}}"#);
    let runner = Arc::new(ScriptedRunner::new(vec![outcome(true, "")]));
    let mut validator = validator_for(&dir, runner.clone(), 10);

    let result = validator
        .validate(dir.path(), &dir.path().to_string_lossy())
        .await
        .unwrap();

    assert!(result.success);
    assert_eq!(result.outcome, ValidationOutcome::Succeeded);
    assert_eq!(result.iterations, 1);
    assert!(result.applied_fixes.is_empty());
    assert!(result.proof.is_some());
    assert_eq!(runner.calls(), 1);
}

#[tokio::test]
async fn unparsable_failure_terminates_within_budget() {
    let dir = repo_with_build_script(r#"{"scripts": {"build": "tsc"}}"#);
    let runner = Arc::new(ScriptedRunner::new(vec![outcome(
        false,
        "the build gremlins are displeased today",
    )]));
    let mut validator = validator_for(&dir, runner.clone(), 5);

    let result = validator
        .validate(dir.path(), &dir.path().to_string_lossy())
        .await
        .unwrap();

    assert!(!result.success);
    assert_eq!(result.outcome, ValidationOutcome::FailedUnparsable);
    assert!(result.iterations <= 5);
    assert_eq!(runner.calls(), 1);
}

#[tokio::test]
async fn stable_error_rotates_strategies_and_exhausts_the_budget() {
    let dir = repo_with_build_script(
        r#"{"scripts": {"build": "tsc"}, "dependencies": {"left-pad": "1.0.0"}}"#,
    );
    let runner = Arc::new(ScriptedRunner::new(vec![outcome(
        false,
        "Error: Cannot find module 'left-pad'",
    )]));
    let mut validator = validator_for(&dir, runner.clone(), 3);

    let result = validator
        .validate(dir.path(), &dir.path().to_string_lossy())
        .await
        .unwrap();

    assert!(!result.success);
    assert_eq!(result.outcome, ValidationOutcome::FailedMaxIterations);
    assert_eq!(result.iterations, 3);
    assert_eq!(runner.calls(), 3);
    assert_eq!(result.applied_fixes.len(), 3);
    assert_eq!(result.remaining_errors.len(), 1);

    // Rotation: no strategy is attempted twice for the same error.
    let keys: Vec<_> = result
        .applied_fixes
        .iter()
        .map(|f| f.strategy.attempt_key())
        .collect();
    for (i, key) in keys.iter().enumerate() {
        assert!(!keys[..i].contains(key), "strategy repeated: {key:?}");
    }
}

#[tokio::test]
async fn repaired_build_persists_history_and_reports_fixes() {
    let dir = repo_with_build_script(
        r#"{"scripts": {"build": "tsc"}, "dependencies": {"repaired-pkg": "0.1.0"}}"#,
    );
    let runner = Arc::new(ScriptedRunner::new(vec![
        outcome(false, "Error: Cannot find module 'repaired-pkg'"),
        outcome(true, ""),
    ]));
    let mut validator = validator_for(&dir, runner.clone(), 10);

    let result = validator
        .validate(dir.path(), &dir.path().to_string_lossy())
        .await
        .unwrap();

    assert!(result.success);
    assert_eq!(result.iterations, 2);
    assert_eq!(result.applied_fixes.len(), 1);
    assert!(result.applied_fixes[0].success);

    // The winning fix is durable: the repository now carries a history file.
    let history_file = dir.path().join(".resurrector").join("fix-history.json");
    let raw = fs::read_to_string(history_file).unwrap();
    assert!(raw.contains("dependency_not_found:repaired-pkg"));
}

#[tokio::test]
async fn missing_build_target_is_success_with_zero_iterations() {
    let dir = repo_with_build_script(r#"{"scripts": {"test": "jest"}}"#);
    let runner = Arc::new(ScriptedRunner::new(vec![outcome(true, "")]));
    let sink = Arc::new(RecordingSink::new());
    let mut validator = validator_for(&dir, runner.clone(), 10).with_sink(sink.clone());

    let result = validator
        .validate(dir.path(), &dir.path().to_string_lossy())
        .await
        .unwrap();

    assert!(result.success);
    assert_eq!(result.outcome, ValidationOutcome::SkippedNoBuildTarget);
    assert_eq!(result.iterations, 0);
    assert_eq!(runner.calls(), 0);
    assert!(matches!(
        sink.events().as_slice(),
        [ProgressEvent::NoBuildTarget { .. }]
    ));
}

#[tokio::test]
async fn events_are_emitted_in_order_and_at_most_once_per_kind_per_iteration() {
    let dir = repo_with_build_script(
        r#"{"scripts": {"build": "tsc"}, "dependencies": {"evented-pkg": "1.0.0"}}"#,
    );
    let runner = Arc::new(ScriptedRunner::new(vec![
        outcome(false, "Error: Cannot find module 'evented-pkg'"),
        outcome(true, ""),
    ]));
    let sink = Arc::new(RecordingSink::new());
    let mut validator = validator_for(&dir, runner, 10).with_sink(sink.clone());

    validator
        .validate(dir.path(), &dir.path().to_string_lossy())
        .await
        .unwrap();

    let kinds: Vec<&'static str> = sink
        .events()
        .iter()
        .map(|event| match event {
            ProgressEvent::IterationStart { .. } => "iteration-start",
            ProgressEvent::ErrorAnalysis { .. } => "error-analysis",
            ProgressEvent::FixApplied { .. } => "fix-applied",
            ProgressEvent::FixOutcome { .. } => "fix-outcome",
            ProgressEvent::ValidationComplete { .. } => "validation-complete",
            ProgressEvent::NoBuildTarget { .. } => "no-build-target",
        })
        .collect();
    assert_eq!(
        kinds,
        vec![
            "iteration-start",
            "error-analysis",
            "fix-applied",
            "fix-outcome",
            "iteration-start",
            "validation-complete",
        ]
    );
}

#[tokio::test]
async fn stagnation_never_ends_the_run_early() {
    // Five iterations of the identical error: the streak is logged but the
    // loop still consumes its whole budget.
    let dir = repo_with_build_script(
        r#"{"scripts": {"build": "tsc"}, "dependencies": {"stagnant-pkg": "1.0.0"}}"#,
    );
    let runner = Arc::new(ScriptedRunner::new(vec![outcome(
        false,
        "Error: Cannot find module 'stagnant-pkg'",
    )]));
    let mut validator = validator_for(&dir, runner.clone(), 6);

    let result = validator
        .validate(dir.path(), &dir.path().to_string_lossy())
        .await
        .unwrap();

    assert_eq!(result.iterations, 6);
    assert_eq!(runner.calls(), 6);
    assert_eq!(result.outcome, ValidationOutcome::FailedMaxIterations);
}
