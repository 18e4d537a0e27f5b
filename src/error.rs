//! Domain-specific error types for resurrector using thiserror
//!
//! Most fallible paths in the crate use `anyhow::Result`; this module holds
//! the structured errors callers actually match on: manifest problems the
//! strategy engine converts into failed fix results, and knowledge-file
//! problems the registry recovers from.

use std::io;
use std::path::PathBuf;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ResurrectError {
    #[error("Failed to read manifest {path}")]
    ManifestRead {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("Failed to parse manifest {path}: {reason}")]
    ManifestParse { path: PathBuf, reason: String },

    #[error("Failed to write manifest {path}")]
    ManifestWrite {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("Package {package} is not declared in any dependency group")]
    PackageMissing { package: String },

    #[error("Knowledge file {path} is corrupt: {reason}")]
    KnowledgeCorrupt { path: PathBuf, reason: String },
}

pub type ResurrectResult<T> = Result<T, ResurrectError>;
