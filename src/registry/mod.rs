//! Package registry abstraction.
//!
//! Packages are source repositories found through a repository search API
//! (GitHub's by default) and fetched with a version-control clone.

mod client;
mod locator;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

pub use client::{DEFAULT_API_URL, RegistryClient};
pub use locator::PackageLocator;

/// Identity of a package as returned by a registry search.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct PackageDescriptor {
    pub id: u64,
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub full_name: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
    pub git_url: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub clone_url: Option<String>,
    pub tags_url: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub html_url: Option<String>,
}

impl PackageDescriptor {
    /// URL handed to the VCS clone. `git_url` uses the `git://` protocol on
    /// GitHub, so the HTTPS `clone_url` wins when the registry sends one.
    pub fn clone_url(&self) -> &str {
        self.clone_url.as_deref().unwrap_or(&self.git_url)
    }
}

/// Result page of a registry search.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Default)]
pub struct SearchResults {
    #[serde(default)]
    pub total_count: u64,
    pub items: Vec<PackageDescriptor>,
}

/// Trait for package registries.
///
/// Both calls absorb transport failures and rate limiting; `None` means the
/// registry gave no usable answer after retrying.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait Registry: Send + Sync {
    /// Search packages matching `query`.
    async fn search(&self, query: &str) -> Option<SearchResults>;

    /// Tag names of a package, in the order the registry lists them.
    async fn list_tags(&self, descriptor: &PackageDescriptor) -> Option<Vec<String>>;
}
