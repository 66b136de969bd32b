//! Core data models for exports and the Onshape wire format

use clap::ValueEnum;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Display name of the synthetic configuration every part studio has
pub const DEFAULT_CONFIGURATION: &str = "Default";

/// Identifies one element of one Onshape document workspace
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct DocumentRef {
    /// Document id, the segment after `/documents/`
    pub document_id: String,
    /// Workspace (or version) id
    pub workspace_id: String,
    /// Part studio element id
    pub element_id: String,
}

impl DocumentRef {
    /// Build a reference from its three ids
    pub fn new(
        document_id: impl Into<String>,
        workspace_id: impl Into<String>,
        element_id: impl Into<String>,
    ) -> Self {
        Self {
            document_id: document_id.into(),
            workspace_id: workspace_id.into(),
            element_id: element_id.into(),
        }
    }
}

impl fmt::Display for DocumentRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "d/{}/w/{}/e/{}",
            self.document_id, self.workspace_id, self.element_id
        )
    }
}

/// One exportable configuration of a part studio
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConfigurationOption {
    /// Encoded query token, e.g. `configuration=List_abc%3Dsmall`; empty for Default
    pub query: String,
    /// Label used in output file names
    pub display_name: String,
}

impl ConfigurationOption {
    /// Configuration with the given encoded token and label
    pub fn new(query: impl Into<String>, display_name: impl Into<String>) -> Self {
        Self {
            query: query.into(),
            display_name: display_name.into(),
        }
    }

    /// The synthetic default configuration with no query token
    pub fn default_configuration() -> Self {
        Self::new("", DEFAULT_CONFIGURATION)
    }

    /// Whether this is the synthetic Default configuration
    pub fn is_default(&self) -> bool {
        self.display_name == DEFAULT_CONFIGURATION
    }
}

/// Export format name as understood by the translation service
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ExportFormat(String);

impl ExportFormat {
    /// Normalize a user-supplied format name
    pub fn new(name: &str) -> Self {
        Self(name.trim().to_uppercase())
    }

    /// Upper-case name sent as `formatName`
    pub fn name(&self) -> &str {
        &self.0
    }

    /// Lower-case file extension
    pub fn extension(&self) -> String {
        self.0.to_lowercase()
    }

    /// STL can go through the synchronous tessellation endpoint
    pub fn is_stl(&self) -> bool {
        self.0 == "STL"
    }
}

impl std::str::FromStr for ExportFormat {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        let format = Self::new(s);
        if format.0.is_empty() {
            return Err("format name must not be empty".to_string());
        }
        if !format.0.chars().all(|c| c.is_ascii_alphanumeric() || c == '_') {
            return Err(format!("invalid format name: {s}"));
        }
        Ok(format)
    }
}

impl fmt::Display for ExportFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Mesh resolution for STL output
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum Resolution {
    /// Largest facets, smallest files
    Coarse,
    /// Between coarse and fine
    Medium,
    /// Smallest facets
    #[default]
    Fine,
}

impl Resolution {
    /// Lower-case wire name
    pub fn as_str(&self) -> &'static str {
        match self {
            Resolution::Coarse => "coarse",
            Resolution::Medium => "medium",
            Resolution::Fine => "fine",
        }
    }

    /// `(chordTolerance, minFacetWidth)` used by the synchronous STL endpoint
    pub fn tessellation(&self) -> (f64, f64) {
        match self {
            Resolution::Coarse => (0.00024, 0.000635),
            Resolution::Medium => (0.00012, 0.000254),
            Resolution::Fine => (0.00006, 0.0000254),
        }
    }
}

impl fmt::Display for Resolution {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Entry of the workspace element listing
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ElementInfo {
    /// Element id
    pub id: String,
    /// Element name as shown in the document tabs
    #[serde(default)]
    pub name: Option<String>,
}

/// Part studio metadata; only the name is of interest
#[derive(Debug, Clone, Default, Deserialize)]
pub struct PartStudioMetadata {
    /// Part studio name
    #[serde(default)]
    pub name: Option<String>,
}

/// Response of the element configuration endpoint
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ElementConfiguration {
    /// Parameters in declaration order
    #[serde(default)]
    pub configuration_parameters: Vec<ConfigurationParameter>,
    /// Name of the element the configuration belongs to
    #[serde(default)]
    pub element_name: Option<String>,
}

/// One configuration parameter of a part studio
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ConfigurationParameter {
    /// Id used when encoding a configuration
    #[serde(default)]
    pub parameter_id: String,
    /// Human-readable parameter name
    #[serde(default)]
    pub parameter_name: String,
    /// Options of a list parameter; empty for other kinds
    #[serde(default)]
    pub options: Vec<ParameterOption>,
}

/// One option of a list parameter
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ParameterOption {
    /// Option id sent as the parameter value
    #[serde(default)]
    pub option: String,
    /// Human-readable option label
    #[serde(default)]
    pub option_name: String,
}

/// A single `parameterId = parameterValue` assignment for the encoding endpoint
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ParameterValue {
    /// Parameter id
    pub parameter_id: String,
    /// String, number or boolean value
    pub parameter_value: serde_json::Value,
}

impl ParameterValue {
    /// Assign `value` to `parameter_id`
    pub fn new(parameter_id: impl Into<String>, value: impl Into<serde_json::Value>) -> Self {
        Self {
            parameter_id: parameter_id.into(),
            parameter_value: value.into(),
        }
    }

    /// Render the value the way a user would type it on the command line
    pub fn display_value(&self) -> String {
        match &self.parameter_value {
            serde_json::Value::String(s) => s.clone(),
            other => other.to_string(),
        }
    }
}

/// Body of the configuration encoding request
#[derive(Debug, Clone, Serialize)]
pub struct EncodingRequest {
    /// Assignments to encode
    pub parameters: Vec<ParameterValue>,
}

/// Response of the configuration encoding endpoint
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EncodedConfiguration {
    /// Encoded `configuration=...` query token
    #[serde(default)]
    pub query_param: String,
}

/// Body of the translation creation request
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TranslationRequest {
    /// Upper-case format name, e.g. `STEP`
    pub format_name: String,
    /// Always false; results are downloaded, not stored
    pub store_in_document: bool,
    /// Mesh resolution
    pub resolution: Resolution,
    /// Decoded configuration, when not Default
    #[serde(skip_serializing_if = "Option::is_none")]
    pub configuration: Option<String>,
}

impl TranslationRequest {
    /// Request for the Default configuration
    pub fn new(format: &ExportFormat, resolution: Resolution) -> Self {
        Self {
            format_name: format.name().to_string(),
            store_in_document: false,
            resolution,
            configuration: None,
        }
    }

    /// Attach a configuration value
    pub fn with_configuration(mut self, configuration: impl Into<String>) -> Self {
        self.configuration = Some(configuration.into());
        self
    }
}

/// Server-side state of a translation
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(from = "String")]
pub enum TranslationState {
    /// Still running
    Active,
    /// Finished with results
    Done,
    /// Finished with an error
    Failed,
    /// Any other state string
    Other(String),
}

impl From<String> for TranslationState {
    fn from(value: String) -> Self {
        match value.as_str() {
            "ACTIVE" => TranslationState::Active,
            "DONE" => TranslationState::Done,
            "FAILED" => TranslationState::Failed,
            _ => TranslationState::Other(value),
        }
    }
}

impl Default for TranslationState {
    fn default() -> Self {
        TranslationState::Other("MISSING".to_string())
    }
}

impl fmt::Display for TranslationState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TranslationState::Active => write!(f, "ACTIVE"),
            TranslationState::Done => write!(f, "DONE"),
            TranslationState::Failed => write!(f, "FAILED"),
            TranslationState::Other(state) => write!(f, "{}", state),
        }
    }
}

/// Translation job as reported by the create and status endpoints
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TranslationJob {
    /// Translation id
    #[serde(default)]
    pub id: String,
    /// Current state
    #[serde(default)]
    pub request_state: TranslationState,
    /// Set when the state is FAILED
    #[serde(default)]
    pub failure_reason: Option<String>,
    /// Downloadable result ids, set when DONE
    #[serde(default)]
    pub result_external_data_ids: Vec<String>,
}

impl TranslationJob {
    /// Whether the job should be polled again
    pub fn is_active(&self) -> bool {
        self.request_state == TranslationState::Active
    }
}

/// Query parameters of the synchronous STL export
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StlExportParams {
    /// Maximum chord deviation in meters
    pub chord_tolerance: f64,
    /// Minimum facet width in meters
    pub min_facet_width: f64,
    /// Encoded configuration, when not Default
    #[serde(skip_serializing_if = "Option::is_none")]
    pub configuration: Option<String>,
}

impl StlExportParams {
    /// Tessellation presets for the given resolution
    pub fn new(resolution: Resolution) -> Self {
        let (chord_tolerance, min_facet_width) = resolution.tessellation();
        Self {
            chord_tolerance,
            min_facet_width,
            configuration: None,
        }
    }
}
