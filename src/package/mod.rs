//! Package management module
//!
//! This module provides the manifest store, the flat modules directory, and
//! version specifier matching.

mod manifest;
mod repository;
mod version;

pub use manifest::{MANIFEST_FILE, Manifest, dependency_name};
pub use repository::{MODULES_DIR, ModulesDir};
pub use version::{SpecifierKind, first_compatible, is_compatible};
