//! Build execution: the collaborator the validator drives.
//!
//! `ProcessBuildRunner` shells out to the detected package manager, bounded
//! by a timeout; a timed-out build surfaces as an ordinary failed
//! compilation, not a distinct error kind. Package-manager and build-command
//! detection read only the repository tree, never the network.

use crate::core::constants::{lockfiles, manifest_files};
use crate::manifest::Manifest;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::path::Path;
use std::time::{Duration, Instant};
use tokio::process::Command;
use tracing::{debug, info, warn};

pub const DEFAULT_BUILD_TIMEOUT: Duration = Duration::from_secs(300);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PackageManager {
    Npm,
    Yarn,
    Pnpm,
}

impl PackageManager {
    pub fn command(&self) -> &'static str {
        match self {
            Self::Npm => "npm",
            Self::Yarn => "yarn",
            Self::Pnpm => "pnpm",
        }
    }
}

/// The build invocation the validator will repeat each iteration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BuildCommand {
    pub program: String,
    pub args: Vec<String>,
}

impl BuildCommand {
    pub fn display(&self) -> String {
        let mut parts = vec![self.program.clone()];
        parts.extend(self.args.iter().cloned());
        parts.join(" ")
    }
}

#[derive(Debug, Clone)]
pub struct CompileOptions {
    pub package_manager: PackageManager,
    pub build_command: BuildCommand,
    pub timeout: Duration,
}

/// Result of one compilation attempt. `status` is a short label ("ok",
/// "failed", "timeout", "spawn-error") for logs and proofs.
#[derive(Debug, Clone)]
pub struct CompileOutcome {
    pub success: bool,
    pub status: String,
    pub exit_code: Option<i32>,
    pub stdout: String,
    pub stderr: String,
    pub duration: Duration,
}

/// Evidence that a compile attempt succeeded, suitable for attaching to a
/// validation result.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CompilationProof {
    pub command: String,
    pub exit_code: Option<i32>,
    pub duration_ms: u64,
    pub iteration: u32,
    pub output_digest: String,
    pub verified_at: DateTime<Utc>,
}

/// Seam between the validator and the outside world. Compilation never
/// errors at the trait level: every failure mode is a failed outcome.
#[async_trait]
pub trait BuildRunner: Send + Sync {
    async fn compile(&self, repo_path: &Path, options: &CompileOptions) -> CompileOutcome;
}

/// Runs `<pm> install` followed by the detected build command as real
/// subprocesses.
#[derive(Debug, Default)]
pub struct ProcessBuildRunner;

impl ProcessBuildRunner {
    pub fn new() -> Self {
        Self
    }

    async fn run(
        &self,
        repo_path: &Path,
        program: &str,
        args: &[String],
        timeout: Duration,
    ) -> CompileOutcome {
        let started = Instant::now();
        let invocation = Command::new(program)
            .args(args)
            .current_dir(repo_path)
            .kill_on_drop(true)
            .output();

        match tokio::time::timeout(timeout, invocation).await {
            Ok(Ok(output)) => {
                let success = output.status.success();
                CompileOutcome {
                    success,
                    status: if success { "ok" } else { "failed" }.to_string(),
                    exit_code: output.status.code(),
                    stdout: String::from_utf8_lossy(&output.stdout).into_owned(),
                    stderr: String::from_utf8_lossy(&output.stderr).into_owned(),
                    duration: started.elapsed(),
                }
            }
            Ok(Err(e)) => CompileOutcome {
                success: false,
                status: "spawn-error".to_string(),
                exit_code: None,
                stdout: String::new(),
                stderr: format!("failed to spawn {program}: {e}"),
                duration: started.elapsed(),
            },
            Err(_) => {
                warn!(%program, ?timeout, "build invocation timed out");
                CompileOutcome {
                    success: false,
                    status: "timeout".to_string(),
                    exit_code: None,
                    stdout: String::new(),
                    stderr: format!(
                        "build timed out after {} seconds",
                        timeout.as_secs()
                    ),
                    duration: started.elapsed(),
                }
            }
        }
    }
}

#[async_trait]
impl BuildRunner for ProcessBuildRunner {
    async fn compile(&self, repo_path: &Path, options: &CompileOptions) -> CompileOutcome {
        let pm = options.package_manager.command();
        info!(%pm, repo = ?repo_path, "installing dependencies");
        let install = self
            .run(repo_path, pm, &["install".to_string()], options.timeout)
            .await;
        if !install.success {
            return install;
        }

        info!(command = %options.build_command.display(), "running build");
        let build = self
            .run(
                repo_path,
                &options.build_command.program,
                &options.build_command.args,
                options.timeout,
            )
            .await;

        // Keep install output visible to the analyzer alongside the build's.
        CompileOutcome {
            success: build.success,
            status: build.status,
            exit_code: build.exit_code,
            stdout: join_output(&install.stdout, &build.stdout),
            stderr: join_output(&install.stderr, &build.stderr),
            duration: install.duration + build.duration,
        }
    }
}

fn join_output(first: &str, second: &str) -> String {
    if first.is_empty() {
        second.to_string()
    } else if second.is_empty() {
        first.to_string()
    } else {
        format!("{first}\n{second}")
    }
}

/// Identify the package manager from the lockfile present, defaulting to
/// npm.
pub fn detect_package_manager(repo_path: &Path) -> PackageManager {
    if repo_path.join(lockfiles::YARN_LOCK).exists() {
        PackageManager::Yarn
    } else if repo_path.join(lockfiles::PNPM_LOCK).exists() {
        PackageManager::Pnpm
    } else {
        PackageManager::Npm
    }
}

/// Determine the build invocation: the `build` script, then `compile`, then
/// bare `tsc` when a tsconfig is present. `None` means there is nothing to
/// validate.
pub fn detect_build_command(repo_path: &Path, manifest: &Manifest) -> Option<BuildCommand> {
    let pm = detect_package_manager(repo_path);
    for script in ["build", "compile"] {
        if manifest.script(script).is_some() {
            debug!(script, "detected build script");
            return Some(BuildCommand {
                program: pm.command().to_string(),
                args: vec!["run".to_string(), script.to_string()],
            });
        }
    }
    if repo_path.join(manifest_files::TSCONFIG_JSON).exists() {
        return Some(BuildCommand {
            program: "npx".to_string(),
            args: vec!["tsc".to_string(), "--noEmit".to_string()],
        });
    }
    None
}

/// Summarize a successful compile attempt.
pub fn generate_compilation_proof(
    outcome: &CompileOutcome,
    options: &CompileOptions,
    iteration: u32,
) -> CompilationProof {
    let mut hasher = Sha256::new();
    hasher.update(outcome.stdout.as_bytes());
    hasher.update(outcome.stderr.as_bytes());
    let digest = hasher.finalize();
    let output_digest = digest
        .iter()
        .take(8)
        .map(|b| format!("{b:02x}"))
        .collect::<String>();

    CompilationProof {
        command: options.build_command.display(),
        exit_code: outcome.exit_code,
        duration_ms: outcome.duration.as_millis() as u64,
        iteration,
        output_digest,
        verified_at: Utc::now(),
    }
}
