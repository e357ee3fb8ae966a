//! Operator commands behind the CLI.

use anyhow::Result;
use log::debug;
use std::path::Path;

use crate::{
    error::PackageError,
    install::{Installer, PackageQuery},
    registry::{PackageLocator, Registry},
    remove::Remover,
    runtime::Runtime,
    ui,
};

pub mod config;
mod package_ref;
mod paths;

pub use package_ref::PackageRef;
pub use paths::{TINN_PATH, install_root};

use config::Config;

/// Print every registry result for `terms`.
#[tracing::instrument(skip(runtime, api_url))]
pub async fn search<R: Runtime>(runtime: R, terms: &[String], api_url: Option<String>) -> Result<()> {
    let config = Config::new(runtime, api_url)?;
    run_search(&config.registry, &terms.join(" ")).await
}

pub async fn run_search<G: Registry>(registry: &G, query: &str) -> Result<()> {
    let Some(results) = registry.search(query).await else {
        let err = PackageError::NotFound {
            query: query.to_string(),
        };
        ui::error(err.to_string());
        return Err(err.into());
    };

    println!("Found {} projects:", results.total_count);
    for item in &results.items {
        println!(
            "{} {} - {}",
            item.name,
            item.id,
            item.description.as_deref().unwrap_or("")
        );
    }
    Ok(())
}

/// Print the registry record of the package `terms` resolve to.
#[tracing::instrument(skip(runtime, api_url))]
pub async fn info<R: Runtime>(
    runtime: R,
    terms: &[String],
    id: Option<&str>,
    api_url: Option<String>,
) -> Result<()> {
    let config = Config::new(runtime, api_url)?;
    run_info(&config.registry, &terms.join(" "), id).await
}

pub async fn run_info<G: Registry>(registry: &G, query: &str, id: Option<&str>) -> Result<()> {
    let descriptor = PackageLocator::new(registry).locate(query, id).await?;
    println!("{}", serde_json::to_string_pretty(&descriptor)?);
    Ok(())
}

/// Install `package` (`name[@specifier]`), or every dependency of the
/// project manifest when no package is given.
#[tracing::instrument(skip(runtime, api_url))]
pub async fn install<R: Runtime>(
    runtime: R,
    package: Option<&str>,
    id: Option<&str>,
    global: bool,
    api_url: Option<String>,
) -> Result<()> {
    let config = Config::new(runtime, api_url)?;
    let root = install_root(&config.runtime, global)?;
    debug!("Using install root: {}", root.display());

    let installer = Installer::new(config.runtime, config.registry);
    run_install(&installer, package, id, &root).await
}

pub async fn run_install<R: Runtime, G: Registry>(
    installer: &Installer<R, G>,
    package: Option<&str>,
    id: Option<&str>,
    root: &Path,
) -> Result<()> {
    match package {
        Some(package) => {
            let package: PackageRef = package.parse()?;
            let query = PackageQuery::new(&package.name, id);
            installer.install(&query, &package.specifier, root).await
        }
        None => {
            println!("no package given... checking package.json");
            installer.install_all(root).await
        }
    }
}

/// Uninstall `package` from the install root.
#[tracing::instrument(skip(runtime))]
pub fn remove<R: Runtime>(runtime: R, package: &str, global: bool) -> Result<()> {
    let root = install_root(&runtime, global)?;
    debug!("Using install root: {}", root.display());

    Remover::new(&runtime, root).remove(package)
}
