//! Package operation failures.
//!
//! Transport failures and rate limiting are absorbed by the registry client
//! and never show up here; by the time a lookup gives up it is `NotFound`.

use std::path::PathBuf;
use thiserror::Error;

#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum PackageError {
    #[error("Project not found: {query}")]
    NotFound { query: String },

    #[error("the requested tag {specifier} was not found for {package}")]
    TagNotFound { package: String, specifier: String },

    #[error(
        "{package} is already installed in {} but its version could not be verified to be compatible with the requested one.",
        path.display()
    )]
    VersionConflict { package: String, path: PathBuf },

    #[error("'{tool}' not found. Make sure '{tool}' is installed and in PATH")]
    ToolMissing { tool: String },

    #[error("failed to get {package}")]
    CloneFailure { package: String },

    #[error("Cannot uninstall {package} because it is needed by {dependent}, uninstall {dependent} first")]
    DependencyInUse { package: String, dependent: String },

    #[error("invalid content found in {}: {reason}", path.display())]
    Manifest { path: PathBuf, reason: String },

    #[error("Package {package} not found in {}.", modules_dir.display())]
    NotInstalled { package: String, modules_dir: PathBuf },

    #[error("invalid package name: {name:?}")]
    InvalidName { name: String },

    /// Summary failure of a root install, reported after rollback.
    #[error("package installation failed.")]
    InstallFailed { package: String },
}
