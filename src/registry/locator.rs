//! Resolution of search expressions to one package and one tag.

use log::debug;

use crate::error::PackageError;
use crate::package::first_compatible;
use crate::ui;

use super::{PackageDescriptor, Registry};

/// Turns search expressions into concrete packages and version tags.
pub struct PackageLocator<'a, G: Registry> {
    registry: &'a G,
}

impl<'a, G: Registry> PackageLocator<'a, G> {
    pub fn new(registry: &'a G) -> Self {
        Self { registry }
    }

    /// Locate one package. With a numeric `id` the result with that id is
    /// picked, otherwise the first search result.
    #[tracing::instrument(skip(self))]
    pub async fn locate(
        &self,
        query: &str,
        id: Option<&str>,
    ) -> Result<PackageDescriptor, PackageError> {
        let not_found = || {
            let query = match id {
                Some(id) => format!("{} {}", query, id),
                None => query.to_string(),
            };
            PackageError::NotFound { query }
        };

        let results = match self.registry.search(query).await {
            Some(results) if !results.items.is_empty() => results,
            _ => {
                let err = not_found();
                ui::error(err.to_string());
                return Err(err);
            }
        };

        let wanted = id.and_then(|id| id.trim().parse::<u64>().ok());
        let found = match wanted {
            Some(wanted) => results.items.into_iter().find(|d| d.id == wanted),
            None => results.items.into_iter().next(),
        };

        match found {
            Some(descriptor) => {
                debug!("located {} ({})", descriptor.name, descriptor.id);
                Ok(descriptor)
            }
            None => {
                let err = not_found();
                ui::error(err.to_string());
                Err(err)
            }
        }
    }

    /// First tag of `descriptor`, in registry order, compatible with `specifier`.
    #[tracing::instrument(skip(self, descriptor), fields(package = %descriptor.name))]
    pub async fn resolve_tag(
        &self,
        descriptor: &PackageDescriptor,
        specifier: &str,
    ) -> Option<String> {
        let tags = self.registry.list_tags(descriptor).await?;
        first_compatible(specifier, tags.iter().map(String::as_str)).map(str::to_string)
    }
}
