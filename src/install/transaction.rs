//! Install transaction: what one root install created and what failed.

use log::debug;
use std::path::{Path, PathBuf};

use crate::error::PackageError;
use crate::registry::PackageDescriptor;
use crate::runtime::Runtime;
use crate::ui;

/// A package cloned during the current root install.
#[derive(Debug, Clone)]
pub struct InstalledPackage {
    pub descriptor: PackageDescriptor,
    pub tag: Option<String>,
    pub dir: PathBuf,
}

/// A package that could not be installed.
#[derive(Debug, Clone)]
pub struct FailedInstall {
    pub package: String,
    pub requested: String,
    pub error: PackageError,
}

/// State shared by every call of one root install.
///
/// The root call creates it, the recursive calls append to it and the root
/// finally commits or rolls back everything recorded in `installed`.
#[derive(Debug)]
pub struct InstallContext {
    installed: Vec<InstalledPackage>,
    failed: Vec<FailedInstall>,
    project_dir: PathBuf,
}

impl InstallContext {
    pub fn new(project_dir: PathBuf) -> Self {
        Self {
            installed: Vec::new(),
            failed: Vec::new(),
            project_dir,
        }
    }

    /// Directory whose `package.json` is updated by a saving install.
    pub fn project_dir(&self) -> &Path {
        &self.project_dir
    }

    pub fn record_installed(&mut self, descriptor: PackageDescriptor, tag: Option<String>, dir: PathBuf) {
        debug!("recorded {} in {:?}", descriptor.name, dir);
        self.installed.push(InstalledPackage {
            descriptor,
            tag,
            dir,
        });
    }

    pub fn record_failure(&mut self, package: &str, requested: &str, error: PackageError) {
        debug!("recorded failure of {}: {}", package, error);
        self.failed.push(FailedInstall {
            package: package.to_string(),
            requested: requested.to_string(),
            error,
        });
    }

    pub fn installed(&self) -> &[InstalledPackage] {
        &self.installed
    }

    pub fn failures(&self) -> &[FailedInstall] {
        &self.failed
    }

    pub fn has_failures(&self) -> bool {
        !self.failed.is_empty()
    }

    /// Delete every directory cloned so far.
    #[tracing::instrument(skip(self, runtime))]
    pub fn rollback<R: Runtime>(&mut self, runtime: &R) {
        for package in self.installed.drain(..) {
            ui::warn(format!(
                "reverted installation of package {}",
                package.descriptor.name
            ));
            if !runtime.exists(&package.dir) {
                continue;
            }
            if let Err(e) = runtime.remove_dir_all(&package.dir) {
                ui::warn(format!("failed to remove {}: {:#}", package.dir.display(), e));
            }
        }
    }
}
