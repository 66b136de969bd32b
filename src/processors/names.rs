//! Part studio name resolution

use std::fmt;
use tracing::{debug, warn};

use crate::core::api::CadApi;
use crate::core::errors::Result;
use crate::core::models::DocumentRef;

/// Name used when no endpoint reports one
pub const DEFAULT_PART_STUDIO_NAME: &str = "part";

/// One way of looking up the element's name
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NameSource {
    /// Workspace element listing, filtered by element id
    WorkspaceElements,
    /// Part studio metadata
    PartStudioMetadata,
    /// `elementName` of the element configuration
    ElementConfiguration,
}

impl NameSource {
    /// Lookup order
    pub const ORDER: [NameSource; 3] = [
        NameSource::WorkspaceElements,
        NameSource::PartStudioMetadata,
        NameSource::ElementConfiguration,
    ];

    async fn lookup<A: CadApi + ?Sized>(self, api: &A, doc: &DocumentRef) -> Result<Option<String>> {
        let name = match self {
            NameSource::WorkspaceElements => api
                .list_elements(doc)
                .await?
                .into_iter()
                .find(|element| element.id == doc.element_id)
                .and_then(|element| element.name),
            NameSource::PartStudioMetadata => api.part_studio_metadata(doc).await?.name,
            NameSource::ElementConfiguration => api.element_configuration(doc).await?.element_name,
        };

        Ok(name.filter(|name| !name.trim().is_empty()))
    }
}

impl fmt::Display for NameSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            NameSource::WorkspaceElements => write!(f, "workspace elements"),
            NameSource::PartStudioMetadata => write!(f, "part studio metadata"),
            NameSource::ElementConfiguration => write!(f, "element configuration"),
        }
    }
}

/// First non-empty name reported by the sources in [`NameSource::ORDER`],
/// or [`DEFAULT_PART_STUDIO_NAME`]. Lookup failures are logged and skipped.
pub async fn resolve_part_studio_name<A: CadApi + ?Sized>(api: &A, doc: &DocumentRef) -> String {
    for source in NameSource::ORDER {
        match source.lookup(api, doc).await {
            Ok(Some(name)) => {
                debug!("Part studio name '{}' from {}", name, source);
                return name;
            }
            Ok(None) => debug!("No part studio name in {}", source),
            Err(e) => warn!("Looking up part studio name via {} failed: {}", source, e),
        }
    }

    warn!(
        "Could not retrieve part studio name, using default '{}'",
        DEFAULT_PART_STUDIO_NAME
    );
    DEFAULT_PART_STUDIO_NAME.to_string()
}
