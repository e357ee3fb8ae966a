//! Dependency-aware package installation.
//!
//! A root install clones the requested package into `tinn_modules`, then
//! walks its declared dependencies depth-first into the same directory. All
//! calls of one root install share an [`InstallContext`]; when anything in
//! the tree failed, the root removes everything cloned so far.

use anyhow::{Context, Result};
use futures_util::FutureExt;
use futures_util::future::BoxFuture;
use log::debug;
use std::path::{Path, PathBuf};

use crate::{
    error::PackageError,
    package::{Manifest, ModulesDir, dependency_name, is_compatible},
    registry::{PackageLocator, Registry},
    runtime::Runtime,
    ui,
};

mod git;
mod transaction;

pub use git::Git;
pub use transaction::{FailedInstall, InstallContext, InstalledPackage};

/// A package as named in a command or a dependency map.
///
/// Dependency keys may carry a registry id after the name (`"uuid 42"`) to
/// pick one search result among several.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PackageQuery {
    pub name: String,
    pub id: Option<String>,
}

impl PackageQuery {
    pub fn new(name: &str, id: Option<&str>) -> Self {
        Self {
            name: name.to_string(),
            id: id.map(String::from),
        }
    }

    /// Parse a dependency map key: `<name>` or `<name> <id>`.
    pub fn from_dependency_key(key: &str) -> Self {
        let id = key.split_whitespace().nth(1);
        Self::new(dependency_name(key), id)
    }
}

/// Outcome of one successful (sub-)install.
#[derive(Debug, Clone, PartialEq, Eq)]
enum Installed {
    AlreadyPresent,
    Cloned { tag: Option<String> },
}

pub struct Installer<R: Runtime, G: Registry> {
    pub runtime: R,
    pub registry: G,
    git: Git,
}

impl<R: Runtime, G: Registry> Installer<R, G> {
    #[tracing::instrument(skip(runtime, registry))]
    pub fn new(runtime: R, registry: G) -> Self {
        Self {
            runtime,
            registry,
            git: Git::new(),
        }
    }

    /// Install one package and its dependencies under `install_root`, then
    /// record it in the project's `package.json`.
    ///
    /// Failures are printed where they happen and end in
    /// [`PackageError::InstallFailed`] once the transaction is rolled back.
    #[tracing::instrument(skip(self))]
    pub async fn install(
        &self,
        query: &PackageQuery,
        specifier: &str,
        install_root: &Path,
    ) -> Result<()> {
        let project_dir = self.runtime.current_dir()?;
        let modules = ModulesDir::for_root(&self.runtime, install_root);
        self.prepare(&modules)?;

        let mut ctx = InstallContext::new(project_dir);
        let result = self
            .install_package(&modules, query, specifier, &mut ctx)
            .await;

        let installed = match result {
            Ok(installed) if !ctx.has_failures() => installed,
            _ => return Err(self.abort(&mut ctx, &query.name)),
        };

        if let Installed::Cloned { tag } = installed {
            ui::separator();
            ui::success(format!("{} ready.", query.name));
            let version = saved_version(&modules, &query.name, tag, specifier);
            self.save_dependency(ctx.project_dir(), &query.name, &version);
        }
        Ok(())
    }

    /// Install every dependency declared by the `package.json` of
    /// `install_root`, as one transaction.
    #[tracing::instrument(skip(self))]
    pub async fn install_all(&self, install_root: &Path) -> Result<()> {
        let modules = ModulesDir::for_root(&self.runtime, install_root);
        let manifest_path = modules.root_manifest_path();

        let manifest = match Manifest::load(&self.runtime, &manifest_path) {
            Ok(Some(manifest)) => manifest,
            Ok(None) => {
                println!(
                    "no package given and no package.json found in {}",
                    install_root.display()
                );
                return Ok(());
            }
            Err(e) => {
                ui::error(e.to_string());
                return Err(e.into());
            }
        };

        let dependencies = manifest.dependency_list();
        if dependencies.is_empty() {
            println!("no dependencies declared in {}", manifest_path.display());
            return Ok(());
        }

        let project_dir = self.runtime.current_dir()?;
        self.prepare(&modules)?;

        let mut ctx = InstallContext::new(project_dir);
        self.install_dependencies(&modules, &dependencies, &mut ctx)
            .await;

        if ctx.has_failures() {
            return Err(self.abort(&mut ctx, &manifest_path.display().to_string()));
        }

        ui::separator();
        ui::success("all dependencies ready.");
        Ok(())
    }

    fn prepare(&self, modules: &ModulesDir<'_, R>) -> Result<()> {
        let created = modules
            .ensure()
            .with_context(|| format!("Failed to create {}", modules.path().display()))?;
        if created {
            println!("created install directory: {}", modules.path().display());
        }
        Ok(())
    }

    /// Install a single package into `modules`, then its dependencies.
    ///
    /// Every failure is printed and recorded in `ctx` before being returned.
    fn install_package<'a>(
        &'a self,
        modules: &'a ModulesDir<'a, R>,
        query: &'a PackageQuery,
        specifier: &'a str,
        ctx: &'a mut InstallContext,
    ) -> BoxFuture<'a, Result<Installed, PackageError>> {
        async move {
            let result = self.clone_tree(modules, query, specifier, ctx).await;
            if let Err(err) = &result {
                ctx.record_failure(&query.name, specifier, err.clone());
            }
            result
        }
        .boxed()
    }

    async fn clone_tree(
        &self,
        modules: &ModulesDir<'_, R>,
        query: &PackageQuery,
        specifier: &str,
        ctx: &mut InstallContext,
    ) -> Result<Installed, PackageError> {
        let name = query.name.as_str();
        let dir = modules.package_dir(name).inspect_err(|e| ui::error(e.to_string()))?;

        if self.runtime.is_dir(&dir) {
            self.verify_existing(modules, name, specifier, &dir)?;
            println!("{} is already installed in {}", name, dir.display());
            return Ok(Installed::AlreadyPresent);
        }

        let locator = PackageLocator::new(&self.registry);
        let descriptor = locator.locate(name, query.id.as_deref()).await?;

        println!(
            "Installing {} in {}",
            descriptor.name,
            modules.path().display()
        );
        self.git.binary(&self.runtime)?;

        let tag = if specifier.is_empty() {
            None
        } else {
            match locator.resolve_tag(&descriptor, specifier).await {
                Some(tag) => Some(tag),
                None => {
                    let err = PackageError::TagNotFound {
                        package: descriptor.name.clone(),
                        specifier: specifier.to_string(),
                    };
                    ui::error(err.to_string());
                    return Err(err);
                }
            }
        };

        self.git
            .clone_package(
                &self.runtime,
                &descriptor.name,
                descriptor.clone_url(),
                tag.as_deref(),
                &dir,
            )
            .inspect_err(|e| ui::error(e.to_string()))?;
        ctx.record_installed(descriptor, tag.clone(), dir);

        match modules.read_manifest(name) {
            Ok(Some(manifest)) if manifest.dependencies.is_some() => {
                debug!("handle {} deps..", name);
                self.install_dependencies(modules, &manifest.dependency_list(), ctx)
                    .await;
            }
            Ok(_) => debug!("{}: no deps", name),
            Err(e) => ui::warn(format!("{}, dependencies of {} skipped", e, name)),
        }

        Ok(Installed::Cloned { tag })
    }

    async fn install_dependencies(
        &self,
        modules: &ModulesDir<'_, R>,
        dependencies: &[(String, String)],
        ctx: &mut InstallContext,
    ) {
        for (key, specifier) in dependencies {
            println!("Installing dependency: {} {}", key, specifier);
            let query = PackageQuery::from_dependency_key(key);

            match self.install_package(modules, &query, specifier, ctx).await {
                Ok(Installed::Cloned { .. }) => ui::success(format!("{} installed", query.name)),
                Ok(Installed::AlreadyPresent) => {}
                Err(PackageError::NotFound { .. }) => {
                    let requested = if specifier.is_empty() {
                        key.clone()
                    } else {
                        format!("{}@{}", key, specifier)
                    };
                    ui::error(format!("dependency not found: {}", requested));
                }
                Err(_) => {}
            }
        }
    }

    /// An existing package directory must declare a version compatible with
    /// `specifier`. It is never overwritten.
    fn verify_existing(
        &self,
        modules: &ModulesDir<'_, R>,
        name: &str,
        specifier: &str,
        dir: &Path,
    ) -> Result<(), PackageError> {
        let version = modules.read_manifest(name).ok().flatten().and_then(|m| m.version);
        let compatible = match version.as_deref() {
            None => false,
            Some(_) if specifier.is_empty() => true,
            Some(version) => is_compatible(specifier, version).is_some(),
        };

        if compatible {
            return Ok(());
        }

        let err = PackageError::VersionConflict {
            package: name.to_string(),
            path: dir.to_path_buf(),
        };
        ui::error(err.to_string());
        ui::error("You can try to remove this package if won't break other dependencies");
        Err(err)
    }

    /// Roll back the whole transaction and report the root failure.
    fn abort(&self, ctx: &mut InstallContext, package: &str) -> anyhow::Error {
        for failure in ctx.failures() {
            debug!(
                "{}@{} failed: {}",
                failure.package, failure.requested, failure.error
            );
        }

        if !ctx.installed().is_empty() {
            println!("one or more packages failed to install, rolling back...");
            ctx.rollback(&self.runtime);
        }

        let err = PackageError::InstallFailed {
            package: package.to_string(),
        };
        ui::separator();
        ui::error(err.to_string());
        err.into()
    }

    /// Upsert `dependencies[name] = version` in `<project_dir>/package.json`.
    /// Problems only warn: the install itself already succeeded.
    fn save_dependency(&self, project_dir: &Path, name: &str, version: &str) {
        let path: PathBuf = project_dir.join(crate::package::MANIFEST_FILE);
        let mut manifest = match Manifest::load(&self.runtime, &path) {
            Ok(Some(manifest)) => manifest,
            Ok(None) => {
                ui::warn(format!("package.json not found: {}", path.display()));
                return;
            }
            Err(_) => {
                ui::warn(format!(
                    "invalid content found in package.json: {}",
                    path.display()
                ));
                return;
            }
        };

        manifest.upsert_dependency(name, version);
        match manifest.save(&self.runtime, &path) {
            Ok(()) => println!("updated package.json"),
            Err(e) => ui::warn(format!("failed to write {}: {:#}", path.display(), e)),
        }
    }
}

/// Value recorded for a freshly installed package: its declared version,
/// else the tag it was cloned at, else what was asked for.
fn saved_version<R: Runtime>(
    modules: &ModulesDir<'_, R>,
    name: &str,
    tag: Option<String>,
    specifier: &str,
) -> String {
    modules
        .read_manifest(name)
        .ok()
        .flatten()
        .and_then(|m| m.version)
        .or(tag)
        .unwrap_or_else(|| specifier.to_string())
}
