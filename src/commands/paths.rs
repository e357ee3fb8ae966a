use anyhow::{Context, Result};
use log::{debug, info, warn};
use std::path::{Path, PathBuf};

use crate::runtime::Runtime;

/// Environment variable naming the global install root.
pub const TINN_PATH: &str = "TINN_PATH";

/// Directory whose `tinn_modules` is operated on.
///
/// Global operations use `TINN_PATH` when it names a directory; everything
/// else uses the current working directory.
#[tracing::instrument(skip(runtime))]
pub fn install_root<R: Runtime>(runtime: &R, global: bool) -> Result<PathBuf> {
    if global {
        match runtime.env_var(TINN_PATH) {
            Ok(path) if runtime.is_dir(Path::new(&path)) => {
                info!("Using install root from {}: {}", TINN_PATH, path);
                return Ok(PathBuf::from(path));
            }
            Ok(path) => warn!(
                "{} ({}) is not a directory, using the working directory",
                TINN_PATH, path
            ),
            Err(_) => debug!("{} not set", TINN_PATH),
        }
    }

    runtime
        .current_dir()
        .context("Could not determine the working directory")
}
