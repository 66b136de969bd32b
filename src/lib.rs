//! Onshape Exporter - export every configuration of a part studio to local files
//!
//! This library drives the Onshape translation API: it enumerates the
//! configurations of a part studio, runs one translation job per
//! configuration and format, and downloads the results.

#![forbid(unsafe_code)]
#![warn(missing_docs)]

pub mod cli;
pub mod core;
pub mod processors;
pub mod utils;

// Re-export key types for convenience
pub use crate::core::{
    api::CadApi,
    client::OnshapeClient,
    config::ExporterConfig,
    credentials::Credentials,
    errors::{ExportError, Result},
    models::{ConfigurationOption, DocumentRef, ExportFormat, Resolution, TranslationJob},
    url::parse_document_url,
};

pub use crate::processors::{
    configurations::{enumerate_configurations, select_configurations},
    export::{ExportReport, ExportSettings, ExportTask, Exporter},
    names::resolve_part_studio_name,
};

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Library name
pub const NAME: &str = env!("CARGO_PKG_NAME");
