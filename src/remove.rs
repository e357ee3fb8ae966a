//! Safe package removal.
//!
//! A package is only deleted when no other installed package declares it as
//! a dependency. Its own dependencies follow it unless the project manifest
//! lists them directly.

use anyhow::Result;
use log::debug;
use std::path::PathBuf;

use crate::error::PackageError;
use crate::package::{Manifest, ModulesDir, dependency_name};
use crate::runtime::Runtime;
use crate::ui;

/// Dependencies the project itself pins, which are never removed as orphans.
enum Cascade {
    Pinned(Manifest),
    Disabled,
}

pub struct Remover<'a, R: Runtime> {
    runtime: &'a R,
    modules: ModulesDir<'a, R>,
}

impl<'a, R: Runtime> Remover<'a, R> {
    pub fn new(runtime: &'a R, install_root: impl Into<PathBuf>) -> Self {
        let install_root = install_root.into();
        Self {
            runtime,
            modules: ModulesDir::for_root(runtime, &install_root),
        }
    }

    /// Remove `name` from the install root, prune its orphaned dependencies
    /// and drop it from the project's `package.json`.
    #[tracing::instrument(skip(self))]
    pub fn remove(&self, name: &str) -> Result<()> {
        if !self.modules.is_installed(name) {
            let err = PackageError::NotInstalled {
                package: name.to_string(),
                modules_dir: self.modules.path().to_path_buf(),
            };
            ui::separator();
            ui::error(err.to_string());
            return Err(err.into());
        }

        let manifest_path = self.modules.root_manifest_path();
        let project = Manifest::load(self.runtime, &manifest_path);
        let cascade = match &project {
            Ok(manifest) => Cascade::Pinned(manifest.clone().unwrap_or_default()),
            Err(e) => {
                debug!("{}", e);
                ui::warn("failed to read local dependencies, uninstall may be incomplete");
                Cascade::Disabled
            }
        };

        if let Err(e) = self.remove_package(name, &cascade) {
            if e.downcast_ref::<PackageError>().is_some() {
                ui::separator();
                ui::error("Uninstall failed.");
            }
            return Err(e);
        }

        if let Ok(Some(mut manifest)) = project {
            if manifest.remove_dependency(name) {
                match manifest.save(self.runtime, &manifest_path) {
                    Ok(()) => println!("updated package.json"),
                    Err(e) => ui::warn(format!(
                        "failed to write {}: {:#}",
                        manifest_path.display(),
                        e
                    )),
                }
            }
        }

        ui::separator();
        ui::success("Package uninstalled.");
        Ok(())
    }

    fn remove_package(&self, name: &str, cascade: &Cascade) -> Result<()> {
        let own = match self.modules.read_manifest(name) {
            Ok(manifest) => manifest,
            Err(e) => {
                debug!("{}", e);
                ui::warn(format!(
                    "failed to read {} dependencies, uninstall may be incomplete",
                    name
                ));
                None
            }
        };

        self.ensure_unused(name)?;

        println!("Removing {} from {}", name, self.modules.path().display());
        self.modules.remove_package(name)?;

        let (Some(own), Cascade::Pinned(project)) = (own, cascade) else {
            return Ok(());
        };

        for (key, _) in own.dependency_list() {
            let dependency = dependency_name(&key).to_string();
            if project.depends_on(&dependency) {
                continue;
            }
            if !self.modules.is_installed(&dependency) {
                debug!("dependency {} is already gone", dependency);
                continue;
            }

            debug!("uninstalling dependency {}", dependency);
            match self.remove_package(&dependency, cascade) {
                Ok(()) => ui::success(format!("Dependency {} uninstalled", dependency)),
                Err(e) => debug!("kept dependency {}: {:#}", dependency, e),
            }
        }
        Ok(())
    }

    /// Fail when another installed package declares `name` as a dependency.
    ///
    /// A sibling manifest that cannot be read makes the check impossible and
    /// is an error as well.
    fn ensure_unused(&self, name: &str) -> Result<()> {
        for sibling in self.modules.installed_packages()? {
            if sibling == name {
                continue;
            }

            let manifest = self
                .modules
                .read_manifest(&sibling)
                .inspect_err(|e| ui::error(e.to_string()))?;

            if manifest.is_some_and(|m| m.depends_on(name)) {
                let err = PackageError::DependencyInUse {
                    package: name.to_string(),
                    dependent: sibling,
                };
                ui::error(err.to_string());
                return Err(err.into());
            }
        }
        Ok(())
    }
}
