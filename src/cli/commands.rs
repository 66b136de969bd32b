//! CLI argument definitions and the export command handler

use clap::Parser;
use std::path::PathBuf;
use std::sync::Arc;

use crate::core::models::{ExportFormat, Resolution};

/// Export every configuration of an Onshape part studio
#[derive(Parser, Debug)]
#[command(name = "onshape-export", version, about, long_about = None)]
pub struct Cli {
    /// Onshape document URL (…/documents/<did>/w/<wid>/e/<eid>)
    pub url: String,

    /// Directory to save exported files (created if missing)
    pub output_dir: PathBuf,

    /// Export format (e.g. STEP, STL, IGES); repeat for several formats
    #[arg(short = 'f', long = "format", required = true)]
    pub formats: Vec<ExportFormat>,

    /// Configuration override `parameterId=value`; repeatable.
    /// Exports only this configuration instead of all discovered ones
    #[arg(short = 'c', long = "config")]
    pub configs: Vec<String>,

    /// Mesh resolution for STL output
    #[arg(long, value_enum, default_value_t = Resolution::Fine)]
    pub resolution: Resolution,

    /// Export STL through the synchronous tessellation endpoint
    #[arg(long)]
    pub stl_sync: bool,

    /// Number of export jobs to run at once (default: ONSHAPE_MAX_CONCURRENT or 1)
    #[arg(short = 'j', long)]
    pub jobs: Option<usize>,

    /// Credential file (default: ~/.config/onshape-exporter.json)
    #[arg(long)]
    pub credentials: Option<PathBuf>,

    /// Log every API request
    #[arg(short, long)]
    pub verbose: bool,
}

/// Handle the export command
pub async fn handle_export(cli: Cli) -> anyhow::Result<()> {
    use crate::core::client::OnshapeClient;
    use crate::core::config::ExporterConfig;
    use crate::core::credentials::Credentials;
    use crate::core::url::parse_document_url;
    use crate::processors::configurations::select_configurations;
    use crate::processors::export::{ExportSettings, ExportTask, Exporter};
    use crate::processors::names::resolve_part_studio_name;
    use indicatif::{ProgressBar, ProgressStyle};
    use std::time::{Duration, Instant};
    use tracing::info;

    let start_time = Instant::now();

    let mut config = ExporterConfig::from_env()?;
    if let Some(path) = cli.credentials {
        config.credentials_path = path;
    }
    if let Some(jobs) = cli.jobs {
        config.max_concurrent = jobs;
    }
    config.validate()?;

    let credentials = Credentials::load_or_prompt(&config.credentials_path)?;
    let doc = parse_document_url(&cli.url)?;

    tokio::fs::create_dir_all(&cli.output_dir).await?;

    info!("Document: {}", doc);
    info!("Output: {}", cli.output_dir.display());

    let client = Arc::new(OnshapeClient::new(&config, credentials)?);

    let part_studio_name = resolve_part_studio_name(client.as_ref(), &doc).await;
    info!("Part Studio: {}", part_studio_name);

    let configurations = select_configurations(client.as_ref(), &doc, &cli.configs).await;
    let tasks = ExportTask::plan(&configurations, &cli.formats);
    if tasks.is_empty() {
        anyhow::bail!("Nothing to export");
    }

    let settings = ExportSettings {
        output_dir: cli.output_dir.clone(),
        resolution: cli.resolution,
        poll: config.poll_policy(),
        stl_sync: cli.stl_sync,
    };
    let exporter = Arc::new(Exporter::new(client, doc, part_studio_name, settings));

    // Create progress bar
    let pb = ProgressBar::new(tasks.len() as u64);
    pb.set_style(ProgressStyle::default_bar()
        .template("{spinner:.green} [{elapsed_precise}] [{bar:40.cyan/blue}] {pos}/{len} {msg}")?
        .progress_chars("=>-"));
    pb.enable_steady_tick(Duration::from_millis(120));

    let reports = exporter
        .run_all(tasks, config.max_concurrent, |report| {
            let label = format!(
                "{} {}",
                report.task.format, report.task.configuration.display_name
            );
            match &report.outcome {
                Ok(paths) => {
                    for path in paths {
                        pb.println(format!("✅ Saved {}", path.display()));
                    }
                }
                Err(e) => pb.println(format!("❌ {}: {}", label, e)),
            }
            pb.set_message(label);
            pb.inc(1);
        })
        .await;

    pb.finish_with_message("Completed");

    let failed = reports.iter().filter(|r| r.outcome.is_err()).count();
    let files: usize = reports
        .iter()
        .filter_map(|r| r.outcome.as_ref().ok())
        .map(Vec::len)
        .sum();

    let duration = start_time.elapsed();
    info!(
        "Completed: {} jobs, {} failed, {} files in {:?}",
        reports.len(),
        failed,
        files,
        duration
    );

    println!("\n✅ Export completed!");
    println!("   Jobs: {}", reports.len());
    println!("   Failed: {}", failed);
    println!("   Files: {}", files);
    println!("   Time: {:?}", duration);

    if reports
        .iter()
        .any(|r| matches!(&r.outcome, Err(e) if e.is_auth_failure()))
    {
        eprintln!(
            "   Authentication failed; check the keys in {}",
            config.credentials_path.display()
        );
    }

    Ok(())
}
