//! Remote operations the exporter needs from the CAD platform

use async_trait::async_trait;

use crate::core::errors::Result;
use crate::core::models::{
    DocumentRef, ElementConfiguration, ElementInfo, EncodedConfiguration, ParameterValue,
    PartStudioMetadata, StlExportParams, TranslationJob, TranslationRequest,
};

/// Trait for the Onshape REST endpoints used by the export workflow.
///
/// [`OnshapeClient`](crate::core::client::OnshapeClient) implements it over
/// HTTP; tests substitute an in-memory fake.
#[async_trait]
pub trait CadApi: Send + Sync + 'static {
    /// List every element of the document workspace.
    async fn list_elements(&self, doc: &DocumentRef) -> Result<Vec<ElementInfo>>;

    /// Fetch part studio metadata.
    async fn part_studio_metadata(&self, doc: &DocumentRef) -> Result<PartStudioMetadata>;

    /// Fetch the configuration parameters of the element.
    async fn element_configuration(&self, doc: &DocumentRef) -> Result<ElementConfiguration>;

    /// Encode parameter assignments into a configuration query token.
    async fn encode_configuration(
        &self,
        doc: &DocumentRef,
        parameters: &[ParameterValue],
    ) -> Result<EncodedConfiguration>;

    /// Start an asynchronous translation of the part studio.
    async fn create_translation(
        &self,
        doc: &DocumentRef,
        request: &TranslationRequest,
    ) -> Result<TranslationJob>;

    /// Fetch the current state of a translation.
    async fn translation_status(&self, translation_id: &str) -> Result<TranslationJob>;

    /// Download a translation result blob.
    async fn download_external_data(&self, doc: &DocumentRef, data_id: &str) -> Result<Vec<u8>>;

    /// Tessellate the part studio to STL in a single request.
    async fn export_stl(&self, doc: &DocumentRef, params: &StlExportParams) -> Result<Vec<u8>>;
}
