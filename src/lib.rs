//! # resurrector
//!
//! A repair-loop engine for resurrecting abandoned JavaScript/TypeScript
//! repositories: it identifies dependencies that will abort installation,
//! applies registry-driven package replacements, and drives the repository
//! through a compile → diagnose → repair → retry loop until the build
//! succeeds or the iteration budget is exhausted.
//!
//! ## Core Pieces
//!
//! - **Pre-flight scan**: known-bad packages, architecture incompatibility,
//!   and unreachable source-archive URLs, backed by a durable replacement
//!   registry
//! - **Error analysis**: a closed 9-category taxonomy reconstructed from
//!   free-text build output, with package/version metadata extraction
//! - **Fix strategies**: 7 concrete manifest/lockfile remediations with
//!   per-run attempt rotation that never repeats a failed remedy
//! - **Fix history**: durable, hash-addressable memory of which strategy
//!   fixed which error pattern, per repository and globally
//! - **Validation loop**: the state machine that ties them together, with
//!   typed progress events
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use resurrector::{run_cli};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     run_cli().await?;
//!     Ok(())
//! }
//! ```
//!
//! ## Module Overview
//!
//! - [`analyzer`] - Build-output splitting, classification, and prioritization
//! - [`build`] - Build execution, package-manager and build-command detection
//! - [`cli`] - Command-line interface and argument parsing
//! - [`core`] - Shared value types and fixed tables
//! - [`detect`] - Pre-flight blocking-dependency scan
//! - [`history`] - Durable fix history, per repository and global
//! - [`manifest`] - package.json reading and mutation
//! - [`registry`] - Replacement knowledge base
//! - [`replace`] - Batch application of registry replacements
//! - [`strategy`] - Fix-strategy selection, rotation, and application
//! - [`validator`] - The iterate-until-success state machine

/// Build-output error analysis and classification
pub mod analyzer;
/// Build execution and detection of the build invocation
pub mod build;
/// Command-line interface and argument parsing
pub mod cli;
/// Shared value types and fixed tables
pub mod core;
/// Pre-flight blocking-dependency detection
pub mod detect;
/// Error types and handling utilities
pub mod error;
/// Durable fix-history storage
pub mod history;
/// Manifest (package.json) access and mutation
pub mod manifest;
/// Package-replacement knowledge base
pub mod registry;
/// Batch replacement execution
pub mod replace;
/// Fix-strategy selection and application
pub mod strategy;
/// The post-resurrection validation state machine
pub mod validator;

// Re-export core functionality for easy access
pub use crate::core::*;
pub use analyzer::ErrorAnalyzer;
pub use build::{BuildRunner, CompileOptions, CompileOutcome, ProcessBuildRunner};
pub use cli::run_cli;
pub use detect::BlockingDependencyDetector;
pub use error::{ResurrectError, ResurrectResult};
pub use history::FixHistoryStore;
pub use manifest::Manifest;
pub use registry::ReplacementRegistry;
pub use replace::ReplacementExecutor;
pub use strategy::FixStrategyEngine;
pub use validator::{PostResurrectionValidator, ValidatorConfig};
