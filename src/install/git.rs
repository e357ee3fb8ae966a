//! The `git` command line used to fetch packages.

use log::debug;
use std::path::{Path, PathBuf};
use std::sync::OnceLock;

use crate::error::PackageError;
use crate::runtime::Runtime;
use crate::ui;

const GIT: &str = "git";

/// The `git` executable, looked up on `PATH` once.
#[derive(Debug, Default)]
pub struct Git {
    binary: OnceLock<Option<PathBuf>>,
}

impl Git {
    pub fn new() -> Self {
        Self::default()
    }

    /// Path of the git binary. Its absence is printed on the first lookup only.
    pub fn binary<R: Runtime>(&self, runtime: &R) -> Result<&Path, PackageError> {
        let mut first_lookup = false;
        let binary = self.binary.get_or_init(|| {
            first_lookup = true;
            runtime.which(GIT)
        });

        match binary {
            Some(path) => Ok(path),
            None => {
                let err = PackageError::ToolMissing { tool: GIT.into() };
                if first_lookup {
                    ui::error(err.to_string());
                }
                Err(err)
            }
        }
    }

    /// Clone `url` into `dest`, checking out only `tag` when given.
    ///
    /// The clone counts as successful when `dest` exists afterwards.
    #[tracing::instrument(skip(self, runtime))]
    pub fn clone_package<R: Runtime>(
        &self,
        runtime: &R,
        package: &str,
        url: &str,
        tag: Option<&str>,
        dest: &Path,
    ) -> Result<(), PackageError> {
        let git = self.binary(runtime)?;
        let args = clone_args(url, tag, dest);
        debug!("{} {}", git.display(), args.join(" "));

        match runtime.run(git, &args) {
            Ok(output) if !output.success => {
                debug!("git clone failed: {}", output.stderr.trim());
            }
            Ok(_) => {}
            Err(e) => debug!("could not run git: {:#}", e),
        }

        if runtime.is_dir(dest) {
            Ok(())
        } else {
            Err(PackageError::CloneFailure {
                package: package.to_string(),
            })
        }
    }
}

/// `clone [-b <tag> --single-branch] <url> <dest>`
fn clone_args(url: &str, tag: Option<&str>, dest: &Path) -> Vec<String> {
    let mut args = vec!["clone".to_string()];
    if let Some(tag) = tag {
        args.extend(["-b".to_string(), tag.to_string(), "--single-branch".to_string()]);
    }
    args.push(url.to_string());
    args.push(dest.to_string_lossy().into_owned());
    args
}
