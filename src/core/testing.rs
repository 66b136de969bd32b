//! In-memory [`CadApi`] used by unit tests

use async_trait::async_trait;
use percent_encoding::{utf8_percent_encode, NON_ALPHANUMERIC};
use std::collections::{HashMap, HashSet, VecDeque};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;

use crate::core::api::CadApi;
use crate::core::errors::{ExportError, Result};
use crate::core::models::{
    ConfigurationParameter, DocumentRef, ElementConfiguration, ElementInfo, EncodedConfiguration,
    ParameterOption, ParameterValue, PartStudioMetadata, StlExportParams, TranslationJob,
    TranslationRequest, TranslationState,
};

/// Scriptable fake; `None` fields answer with HTTP 404
#[derive(Debug, Default)]
pub struct FakeApi {
    pub elements: Option<Vec<ElementInfo>>,
    pub metadata: Option<PartStudioMetadata>,
    pub configuration: Option<ElementConfiguration>,
    /// Option values whose encoding fails
    pub failing_encodings: HashSet<String>,
    pub reject_translations: bool,
    /// States returned by successive status calls; the last one repeats
    pub status_script: Mutex<VecDeque<TranslationJob>>,
    pub downloads: HashMap<String, Vec<u8>>,
    pub stl_payload: Option<Vec<u8>>,

    pub encode_calls: AtomicUsize,
    pub status_calls: AtomicUsize,
    pub download_calls: AtomicUsize,
    pub translation_requests: Mutex<Vec<TranslationRequest>>,
    pub stl_requests: Mutex<Vec<StlExportParams>>,
}

pub fn doc() -> DocumentRef {
    DocumentRef::new("doc1", "ws1", "elem1")
}

pub fn job(state: &str, results: &[&str]) -> TranslationJob {
    TranslationJob {
        id: "tr-1".to_string(),
        request_state: TranslationState::from(state.to_string()),
        failure_reason: None,
        result_external_data_ids: results.iter().map(|s| s.to_string()).collect(),
    }
}

pub fn parameter(id: &str, name: &str, options: &[(&str, &str)]) -> ConfigurationParameter {
    ConfigurationParameter {
        parameter_id: id.to_string(),
        parameter_name: name.to_string(),
        options: options
            .iter()
            .map(|(option, option_name)| ParameterOption {
                option: option.to_string(),
                option_name: option_name.to_string(),
            })
            .collect(),
    }
}

/// Query token shaped like the real encoding endpoint's output
pub fn encode_token(parameters: &[ParameterValue]) -> String {
    let joined = parameters
        .iter()
        .map(|p| format!("{}={}", p.parameter_id, p.display_value()))
        .collect::<Vec<_>>()
        .join(";");
    format!("configuration={}", utf8_percent_encode(&joined, NON_ALPHANUMERIC))
}

fn not_found() -> ExportError {
    ExportError::api(404, "Not found")
}

impl FakeApi {
    pub fn with_configuration(parameters: Vec<ConfigurationParameter>) -> Self {
        Self {
            configuration: Some(ElementConfiguration {
                configuration_parameters: parameters,
                element_name: None,
            }),
            ..Default::default()
        }
    }

    /// Translation that finishes after `active_polls` ACTIVE answers
    pub fn with_translation(mut self, active_polls: usize, results: &[&str]) -> Self {
        let mut script: VecDeque<_> = (0..active_polls).map(|_| job("ACTIVE", &[])).collect();
        script.push_back(job("DONE", results));
        self.status_script = Mutex::new(script);
        for id in results {
            self.downloads
                .insert(id.to_string(), format!("payload-{}", id).into_bytes());
        }
        self
    }

    pub fn count(counter: &AtomicUsize) -> usize {
        counter.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl CadApi for FakeApi {
    async fn list_elements(&self, _doc: &DocumentRef) -> Result<Vec<ElementInfo>> {
        self.elements.clone().ok_or_else(not_found)
    }

    async fn part_studio_metadata(&self, _doc: &DocumentRef) -> Result<PartStudioMetadata> {
        self.metadata.clone().ok_or_else(not_found)
    }

    async fn element_configuration(&self, _doc: &DocumentRef) -> Result<ElementConfiguration> {
        self.configuration.clone().ok_or_else(not_found)
    }

    async fn encode_configuration(
        &self,
        _doc: &DocumentRef,
        parameters: &[ParameterValue],
    ) -> Result<EncodedConfiguration> {
        self.encode_calls.fetch_add(1, Ordering::SeqCst);
        if parameters
            .iter()
            .any(|p| self.failing_encodings.contains(&p.display_value()))
        {
            return Err(ExportError::api(400, "cannot encode"));
        }
        Ok(EncodedConfiguration {
            query_param: encode_token(parameters),
        })
    }

    async fn create_translation(
        &self,
        _doc: &DocumentRef,
        request: &TranslationRequest,
    ) -> Result<TranslationJob> {
        self.translation_requests
            .lock()
            .unwrap()
            .push(request.clone());
        if self.reject_translations {
            return Err(ExportError::api(400, "bad format"));
        }
        Ok(job("ACTIVE", &[]))
    }

    async fn translation_status(&self, _translation_id: &str) -> Result<TranslationJob> {
        self.status_calls.fetch_add(1, Ordering::SeqCst);
        let mut script = self.status_script.lock().unwrap();
        match script.len() {
            0 => Err(not_found()),
            1 => Ok(script[0].clone()),
            _ => Ok(script.pop_front().unwrap_or_default()),
        }
    }

    async fn download_external_data(&self, _doc: &DocumentRef, data_id: &str) -> Result<Vec<u8>> {
        self.download_calls.fetch_add(1, Ordering::SeqCst);
        self.downloads.get(data_id).cloned().ok_or_else(not_found)
    }

    async fn export_stl(&self, _doc: &DocumentRef, params: &StlExportParams) -> Result<Vec<u8>> {
        self.stl_requests.lock().unwrap().push(params.clone());
        self.stl_payload.clone().ok_or_else(not_found)
    }
}
