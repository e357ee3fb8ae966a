//! The flat modules directory shared by every package of one install root.

use anyhow::Result;
use std::path::{Component, Path, PathBuf};

use crate::error::PackageError;
use crate::runtime::Runtime;

use super::manifest::{MANIFEST_FILE, Manifest};

/// Name of the directory holding installed packages.
pub const MODULES_DIR: &str = "tinn_modules";

/// The `tinn_modules` directory of an install root.
///
/// Layout: `<root>/tinn_modules/<package>/package.json`. Nothing is nested:
/// dependencies of dependencies live next to their dependents.
pub struct ModulesDir<'a, R: Runtime> {
    runtime: &'a R,
    path: PathBuf,
}

impl<'a, R: Runtime> ModulesDir<'a, R> {
    pub fn new(runtime: &'a R, path: PathBuf) -> Self {
        Self { runtime, path }
    }

    /// `<root>/tinn_modules` for the given install root.
    pub fn for_root(runtime: &'a R, root: &Path) -> Self {
        Self::new(runtime, root.join(MODULES_DIR))
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// The directory containing `tinn_modules`, where the project manifest lives.
    pub fn root(&self) -> &Path {
        self.path.parent().unwrap_or(&self.path)
    }

    pub fn root_manifest_path(&self) -> PathBuf {
        self.root().join(MANIFEST_FILE)
    }

    /// `<modules>/<name>`. Names must be a single plain path component.
    pub fn package_dir(&self, name: &str) -> Result<PathBuf, PackageError> {
        let mut components = Path::new(name).components();
        match (components.next(), components.next()) {
            (Some(Component::Normal(_)), None) => Ok(self.path.join(name)),
            _ => Err(PackageError::InvalidName {
                name: name.to_string(),
            }),
        }
    }

    pub fn manifest_path(&self, name: &str) -> Result<PathBuf, PackageError> {
        Ok(self.package_dir(name)?.join(MANIFEST_FILE))
    }

    pub fn exists(&self) -> bool {
        self.runtime.is_dir(&self.path)
    }

    /// Create the modules directory; returns true if it had to be created.
    pub fn ensure(&self) -> Result<bool> {
        if self.exists() {
            return Ok(false);
        }
        self.runtime.create_dir_all(&self.path)?;
        Ok(true)
    }

    pub fn is_installed(&self, name: &str) -> bool {
        self.package_dir(name)
            .map(|dir| self.runtime.is_dir(&dir))
            .unwrap_or(false)
    }

    /// Names of every installed package, sorted.
    pub fn installed_packages(&self) -> Result<Vec<String>> {
        if !self.exists() {
            return Ok(vec![]);
        }

        let mut names: Vec<String> = self
            .runtime
            .read_dir(&self.path)?
            .into_iter()
            .filter(|entry| self.runtime.is_dir(entry))
            .filter_map(|entry| {
                entry
                    .file_name()
                    .and_then(|n| n.to_str())
                    .map(String::from)
            })
            .collect();
        names.sort();
        Ok(names)
    }

    /// Read an installed package's manifest (`None` if it has none).
    pub fn read_manifest(&self, name: &str) -> Result<Option<Manifest>, PackageError> {
        let path = self.manifest_path(name)?;
        Manifest::load(self.runtime, &path)
    }

    /// Recursively delete an installed package's directory.
    pub fn remove_package(&self, name: &str) -> Result<()> {
        let dir = self.package_dir(name)?;
        if self.runtime.exists(&dir) {
            self.runtime.remove_dir_all(&dir)?;
        }
        Ok(())
    }
}
