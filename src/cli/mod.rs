use crate::build::ProcessBuildRunner;
use crate::detect::BlockingDependencyDetector;
use crate::history::FixHistoryStore;
use crate::manifest::Manifest;
use crate::registry::ReplacementRegistry;
use crate::replace::ReplacementExecutor;
use crate::validator::events::TracingSink;
use crate::validator::{PostResurrectionValidator, ValidatorConfig};

use anyhow::{anyhow, Result};
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

#[derive(Parser)]
#[command(name = "resurrector")]
#[command(about = "Repair loop for resurrecting abandoned JavaScript/TypeScript repositories")]
#[command(version)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Enable verbose logging
    #[arg(short, long)]
    pub verbose: bool,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Scan a repository for dependencies that will block installation
    Scan {
        /// Repository path
        path: PathBuf,

        /// Skip the network probe of source-archive URLs
        #[arg(long)]
        offline: bool,

        /// Output format
        #[arg(short, long, value_enum, default_value = "text")]
        format: OutputFormat,
    },

    /// Apply every registry replacement that matches the manifest
    Replace {
        /// Repository path
        path: PathBuf,

        /// Output format
        #[arg(short, long, value_enum, default_value = "text")]
        format: OutputFormat,
    },

    /// Run the compile → diagnose → repair → retry loop
    Validate {
        /// Repository path
        path: PathBuf,

        /// Maximum repair iterations
        #[arg(long, default_value = "10")]
        max_iterations: u32,

        /// Build timeout in seconds
        #[arg(long, default_value = "300")]
        timeout: u64,

        /// Output format
        #[arg(short, long, value_enum, default_value = "text")]
        format: OutputFormat,
    },

    /// Show the recorded fix history for a repository
    History {
        /// Repository path or URL identifier
        repo: String,
    },

    /// Manage the replacement registry
    Registry {
        #[command(subcommand)]
        action: RegistryAction,
    },
}

#[derive(Subcommand)]
pub enum RegistryAction {
    /// Show every registered replacement
    Show,
    /// Register (or overwrite) a replacement mapping
    Add {
        /// Deprecated package name
        old_name: String,
        /// Modern package name (empty string removes the package)
        new_name: String,
        /// Fallback version for the new package
        #[arg(long, default_value = "latest")]
        version: String,
        /// Whether the switch requires manual code changes
        #[arg(long)]
        requires_code_changes: bool,
    },
}

#[derive(clap::ValueEnum, Clone, Copy, PartialEq, Eq)]
pub enum OutputFormat {
    Text,
    Json,
}

fn registry_path() -> PathBuf {
    dirs::data_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("resurrector")
        .join("registry.json")
}

pub async fn run_cli() -> Result<()> {
    let cli = Cli::parse();

    // Initialize logging
    let log_level = if cli.verbose { "debug" } else { "info" };
    tracing_subscriber::fmt()
        .with_env_filter(format!("resurrector={}", log_level))
        .init();

    match cli.command {
        Commands::Scan {
            path,
            offline,
            format,
        } => scan(path, offline, format).await,
        Commands::Replace { path, format } => replace(path, format),
        Commands::Validate {
            path,
            max_iterations,
            timeout,
            format,
        } => validate(path, max_iterations, timeout, format).await,
        Commands::History { repo } => history(repo),
        Commands::Registry { action } => registry(action),
    }
}

async fn scan(path: PathBuf, offline: bool, format: OutputFormat) -> Result<()> {
    let manifest = Manifest::load(&path)?;
    let dependencies = manifest.all_dependencies();
    let registry = ReplacementRegistry::load(registry_path());

    let mut detector = BlockingDependencyDetector::new().with_registry(&registry);
    if offline {
        detector = detector.without_network();
    }
    let blocked = detector.detect(&dependencies).await;

    match format {
        OutputFormat::Json => println!("{}", serde_json::to_string_pretty(&blocked)?),
        OutputFormat::Text => {
            if blocked.is_empty() {
                println!(
                    "No blocking dependencies among {} declaration(s).",
                    dependencies.len()
                );
            } else {
                println!("{} blocking dependenc(ies) found:", blocked.len());
                for dep in &blocked {
                    let replacement = dep
                        .replacement
                        .as_deref()
                        .map(|r| format!(" (replace with {r})"))
                        .unwrap_or_default();
                    println!("  {} {} - {:?}{}", dep.name, dep.version, dep.reason, replacement);
                }
            }
        }
    }
    Ok(())
}

fn replace(path: PathBuf, format: OutputFormat) -> Result<()> {
    let manifest = Manifest::load(&path)?;
    let registry = ReplacementRegistry::load(registry_path());

    // Only carry the replacements that actually target this manifest.
    let applicable: Vec<_> = registry
        .replacements()
        .iter()
        .filter(|r| manifest.contains(&r.old_name))
        .cloned()
        .collect();

    let outcomes = ReplacementExecutor::new(&path).execute(&applicable)?;
    match format {
        OutputFormat::Json => println!("{}", serde_json::to_string_pretty(&outcomes)?),
        OutputFormat::Text => {
            if outcomes.is_empty() {
                println!("No replacements applied.");
            }
            for outcome in &outcomes {
                let review = if outcome.requires_manual_review {
                    " [manual review required]"
                } else {
                    ""
                };
                println!(
                    "  {} {} -> {}{}",
                    outcome.package_name, outcome.old_version, outcome.new_version, review
                );
            }
        }
    }
    Ok(())
}

async fn validate(
    path: PathBuf,
    max_iterations: u32,
    timeout: u64,
    format: OutputFormat,
) -> Result<()> {
    if !path.exists() {
        return Err(anyhow!("repository path {path:?} does not exist"));
    }
    let repo_id = path.to_string_lossy().to_string();
    let mut validator = PostResurrectionValidator::new(Arc::new(ProcessBuildRunner::new()))
        .with_config(ValidatorConfig {
            max_iterations,
            build_timeout: Duration::from_secs(timeout),
        })
        .with_sink(Arc::new(TracingSink));

    let result = validator.validate(&path, &repo_id).await?;
    match format {
        OutputFormat::Json => println!("{}", serde_json::to_string_pretty(&result)?),
        OutputFormat::Text => {
            if result.success {
                println!("Build restored in {} iteration(s).", result.iterations);
            } else {
                println!(
                    "Build still failing after {} iteration(s); {} error(s) remain.",
                    result.iterations,
                    result.remaining_errors.len()
                );
                for error in result.remaining_errors.iter().take(5) {
                    println!("  [{}] {}", error.category, first_line(&error.message));
                }
            }
        }
    }
    Ok(())
}

fn history(repo: String) -> Result<()> {
    let mut store = FixHistoryStore::new();
    let history = store.load(&repo);
    if history.fixes.is_empty() {
        println!("No recorded fixes for {repo}.");
        return Ok(());
    }
    for fix in &history.fixes {
        println!(
            "  {} => {} (worked {} time(s), last {})",
            fix.error_pattern,
            fix.strategy.describe(),
            fix.success_count,
            fix.last_used.format("%Y-%m-%d")
        );
    }
    Ok(())
}

fn registry(action: RegistryAction) -> Result<()> {
    let mut registry = ReplacementRegistry::load(registry_path());
    match action {
        RegistryAction::Show => {
            for replacement in registry.replacements() {
                let target = if replacement.new_name.is_empty() {
                    "(remove)".to_string()
                } else {
                    replacement.new_name.clone()
                };
                println!("  {} -> {}", replacement.old_name, target);
            }
            Ok(())
        }
        RegistryAction::Add {
            old_name,
            new_name,
            version,
            requires_code_changes,
        } => {
            let mut version_mapping = std::collections::HashMap::new();
            version_mapping.insert("*".to_string(), version);
            registry.add(crate::core::types::PackageReplacement {
                old_name,
                new_name,
                version_mapping,
                requires_code_changes,
                code_change_description: None,
            });
            registry.save()
        }
    }
}

fn first_line(message: &str) -> &str {
    message.lines().next().unwrap_or(message)
}
