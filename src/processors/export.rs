//! Export driver: translation jobs, polling, downloads and file output

use percent_encoding::percent_decode_str;
use regex::Regex;
use std::collections::HashSet;
use std::path::{Path, PathBuf};
use std::sync::{Arc, LazyLock};
use tokio::sync::Semaphore;
use tokio::task::JoinSet;
use tracing::{debug, info, warn};

use crate::core::api::CadApi;
use crate::core::errors::{ExportError, Result};
use crate::core::models::{
    ConfigurationOption, DocumentRef, ExportFormat, Resolution, StlExportParams, TranslationJob,
    TranslationRequest, TranslationState,
};
use crate::core::retry::{poll_while, PollOutcome, PollPolicy};
use crate::utils::naming::{output_file_name, output_stem};

static CONFIGURATION_TOKEN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"configuration=([^&]+)").expect("valid configuration pattern"));

/// Configuration value attached to an export request
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConfigurationArgument {
    /// Decoded single `parameterId=value` assignment
    Single {
        /// Configuration parameter id
        parameter_id: String,
        /// Assigned value
        value: String,
    },
    /// Decoded, but not a single assignment; passed through unchanged
    Unsupported(String),
    /// Could not be percent-decoded; passed through raw
    Undecodable(String),
}

impl ConfigurationArgument {
    /// Extract the configuration from an encoded query token
    pub fn from_query(query: &str) -> Option<Self> {
        let raw = CONFIGURATION_TOKEN.captures(query)?.get(1)?.as_str();

        let decoded = match percent_decode_str(raw).decode_utf8() {
            Ok(decoded) => decoded.into_owned(),
            Err(_) => return Some(ConfigurationArgument::Undecodable(raw.to_string())),
        };

        let parts: Vec<&str> = decoded.split('=').collect();
        match parts.as_slice() {
            [parameter_id, value] => Some(ConfigurationArgument::Single {
                parameter_id: parameter_id.to_string(),
                value: value.to_string(),
            }),
            _ => Some(ConfigurationArgument::Unsupported(decoded)),
        }
    }

    /// Value sent to the server
    pub fn to_request_value(&self) -> String {
        match self {
            ConfigurationArgument::Single {
                parameter_id,
                value,
            } => format!("{}={}", parameter_id, value),
            ConfigurationArgument::Unsupported(value)
            | ConfigurationArgument::Undecodable(value) => value.clone(),
        }
    }

    fn warn_if_unsupported(&self) {
        match self {
            ConfigurationArgument::Single { .. } => {}
            ConfigurationArgument::Unsupported(value) => {
                warn!("Configuration format unexpected: {}", value)
            }
            ConfigurationArgument::Undecodable(value) => {
                warn!("Could not process configuration parameter: {}", value)
            }
        }
    }
}

/// Settings shared by every export job
#[derive(Debug, Clone)]
pub struct ExportSettings {
    /// Directory result files are written to
    pub output_dir: PathBuf,
    /// Mesh resolution sent with every request
    pub resolution: Resolution,
    /// Status polling bounds
    pub poll: PollPolicy,
    /// Export STL through the synchronous tessellation endpoint
    pub stl_sync: bool,
}

impl ExportSettings {
    /// Default settings writing to `output_dir`
    pub fn new(output_dir: impl Into<PathBuf>) -> Self {
        Self {
            output_dir: output_dir.into(),
            resolution: Resolution::default(),
            poll: PollPolicy::default(),
            stl_sync: false,
        }
    }
}

/// One (configuration, format) pair to export
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExportTask {
    /// Configuration to export
    pub configuration: ConfigurationOption,
    /// Target format
    pub format: ExportFormat,
}

impl ExportTask {
    /// Every configuration crossed with every format, configuration-major
    pub fn plan(configurations: &[ConfigurationOption], formats: &[ExportFormat]) -> Vec<Self> {
        configurations
            .iter()
            .flat_map(|configuration| {
                formats.iter().map(move |format| ExportTask {
                    configuration: configuration.clone(),
                    format: format.clone(),
                })
            })
            .collect()
    }
}

/// Result of one export task
#[derive(Debug)]
pub struct ExportReport {
    /// The task that ran
    pub task: ExportTask,
    /// Written files, or the error that aborted the job
    pub outcome: Result<Vec<PathBuf>>,
}

/// Runs export jobs for one part studio
#[derive(Debug)]
pub struct Exporter<A: CadApi> {
    api: Arc<A>,
    doc: DocumentRef,
    part_studio_name: String,
    settings: ExportSettings,
}

impl<A: CadApi> Exporter<A> {
    /// Exporter for one part studio; `part_studio_name` seeds the file names
    pub fn new(
        api: Arc<A>,
        doc: DocumentRef,
        part_studio_name: impl Into<String>,
        settings: ExportSettings,
    ) -> Self {
        Self {
            api,
            doc,
            part_studio_name: part_studio_name.into(),
            settings,
        }
    }

    /// Export one configuration in one format, returning the written files
    pub async fn export(&self, task: &ExportTask) -> Result<Vec<PathBuf>> {
        info!(
            "Exporting {} for {} {}",
            task.format, self.part_studio_name, task.configuration.display_name
        );

        let configuration = ConfigurationArgument::from_query(&task.configuration.query);
        if let Some(configuration) = &configuration {
            configuration.warn_if_unsupported();
        }

        if task.format.is_stl() && self.settings.stl_sync {
            return self.export_stl_sync(task, configuration).await;
        }

        let job = self.run_translation(task, configuration).await?;
        self.download_results(task, &job).await
    }

    /// Create the translation and wait until it is DONE
    async fn run_translation(
        &self,
        task: &ExportTask,
        configuration: Option<ConfigurationArgument>,
    ) -> Result<TranslationJob> {
        let mut request = TranslationRequest::new(&task.format, self.settings.resolution);
        if let Some(configuration) = configuration {
            request = request.with_configuration(configuration.to_request_value());
        }

        let created = self.api.create_translation(&self.doc, &request).await?;
        debug!("Translation {} created in state {}", created.id, created.request_state);

        let translation_id = created.id.clone();
        let api = &self.api;
        let outcome = poll_while(
            self.settings.poll,
            created,
            TranslationJob::is_active,
            || api.translation_status(&translation_id),
        )
        .await?;

        match outcome {
            PollOutcome::Exhausted { attempts, .. } => Err(ExportError::PollTimeout { attempts }),
            PollOutcome::Settled { value: job, .. } => match &job.request_state {
                TranslationState::Done => Ok(job),
                TranslationState::Failed => Err(ExportError::TranslationFailed {
                    reason: job
                        .failure_reason
                        .clone()
                        .unwrap_or_else(|| "Unknown failure".to_string()),
                }),
                other => Err(ExportError::UnexpectedState {
                    state: other.to_string(),
                }),
            },
        }
    }

    /// Download every result of a finished translation; failed files are skipped
    async fn download_results(&self, task: &ExportTask, job: &TranslationJob) -> Result<Vec<PathBuf>> {
        let result_ids = &job.result_external_data_ids;
        if result_ids.is_empty() {
            return Err(ExportError::NoResults);
        }

        let stem = output_stem(&self.part_studio_name, &task.configuration);
        let numbered = result_ids.len() > 1;
        let mut written = Vec::with_capacity(result_ids.len());

        for (i, result_id) in result_ids.iter().enumerate() {
            let data = match self.api.download_external_data(&self.doc, result_id).await {
                Ok(data) => data,
                Err(e) => {
                    warn!("Failed to download result {}: {}", result_id, e);
                    continue;
                }
            };

            let index = numbered.then_some(i + 1);
            let path = self
                .settings
                .output_dir
                .join(output_file_name(&stem, index, &task.format));
            if let Err(e) = write_output(&path, &data).await {
                warn!("Failed to save result {}: {}", result_id, e);
                continue;
            }
            written.push(path);
        }

        if written.is_empty() {
            return Err(ExportError::DownloadFailed {
                failed: result_ids.len(),
            });
        }

        Ok(written)
    }

    async fn export_stl_sync(
        &self,
        task: &ExportTask,
        configuration: Option<ConfigurationArgument>,
    ) -> Result<Vec<PathBuf>> {
        let mut params = StlExportParams::new(self.settings.resolution);
        params.configuration = configuration.map(|c| c.to_request_value());

        let data = self.api.export_stl(&self.doc, &params).await?;

        let stem = output_stem(&self.part_studio_name, &task.configuration);
        let path = self
            .settings
            .output_dir
            .join(output_file_name(&stem, None, &task.format));
        write_output(&path, &data).await?;
        Ok(vec![path])
    }

    /// Output file names that two or more tasks would share
    fn colliding_names(&self, tasks: &[ExportTask]) -> Vec<String> {
        let mut seen = HashSet::new();
        let mut collisions = Vec::new();
        for task in tasks {
            let name = output_file_name(
                &output_stem(&self.part_studio_name, &task.configuration),
                None,
                &task.format,
            );
            if !seen.insert(name.clone()) {
                collisions.push(name);
            }
        }
        collisions
    }

    /// Run every task, at most `max_concurrent` at a time.
    ///
    /// Reports come back in task order. Falls back to one job at a time when
    /// two tasks would write the same file.
    pub async fn run_all(
        self: &Arc<Self>,
        tasks: Vec<ExportTask>,
        max_concurrent: usize,
        on_done: impl Fn(&ExportReport),
    ) -> Vec<ExportReport> {
        let mut max_concurrent = max_concurrent.max(1);
        if max_concurrent > 1 {
            let collisions = self.colliding_names(&tasks);
            if !collisions.is_empty() {
                warn!(
                    "Output names collide ({}); exporting one job at a time",
                    collisions.join(", ")
                );
                max_concurrent = 1;
            }
        }

        if max_concurrent == 1 {
            let mut reports = Vec::with_capacity(tasks.len());
            for task in tasks {
                let outcome = self.export(&task).await;
                let report = ExportReport { task, outcome };
                on_done(&report);
                reports.push(report);
            }
            return reports;
        }

        let semaphore = Arc::new(Semaphore::new(max_concurrent));
        let mut jobs = JoinSet::new();
        for (index, task) in tasks.into_iter().enumerate() {
            let exporter = Arc::clone(self);
            let semaphore = Arc::clone(&semaphore);
            jobs.spawn(async move {
                let outcome = match semaphore.acquire_owned().await {
                    Ok(_permit) => exporter.export(&task).await,
                    Err(closed) => Err(closed.into()),
                };
                (index, ExportReport { task, outcome })
            });
        }

        let mut reports = Vec::new();
        while let Some(joined) = jobs.join_next().await {
            match joined {
                Ok((index, report)) => {
                    on_done(&report);
                    reports.push((index, report));
                }
                Err(e) => warn!("Export worker panicked: {}", e),
            }
        }

        reports.sort_by_key(|(index, _)| *index);
        reports.into_iter().map(|(_, report)| report).collect()
    }
}

/// Write a payload, replacing any existing file
async fn write_output(path: &Path, data: &[u8]) -> Result<()> {
    tokio::fs::write(path, data)
        .await
        .map_err(|e| ExportError::FileError {
            path: path.display().to_string(),
            message: e.to_string(),
        })?;
    debug!("Wrote {} bytes to {}", data.len(), path.display());
    Ok(())
}
