//! `commit-ingest` entry point.
//!
//! This binary is the composition root:
//!
//! 1. **Parse configuration**: flags, environment, and `config/config.yaml`.
//! 2. **Wire logging**: `tracing-subscriber` with an `EnvFilter`, text or JSON.
//! 3. **Construct infrastructure**: [`github::GithubCommitSource`],
//!    [`export::CsvExporter`], and optionally [`database::SqliteMirror`].
//! 4. **Run** [`pipeline::Ingestion`] once and print the report.
//!
//! Exit status is non-zero when configuration is invalid or the run fails
//! fatally (extraction or CSV export). Mirror failures only produce a warning.

mod args;
mod config;
mod logging;
mod report;

use std::process::ExitCode;

use anyhow::Context;
use clap::Parser;
use database::SqliteMirror;
use export::CsvExporter;
use github::GithubCommitSource;
use pipeline::{Ingestion, IngestionPlan, IngestionReport, Progress};
use tracing::{error, info};

use crate::args::Args;
use crate::config::Settings;

#[tokio::main(flavor = "current_thread")]
async fn main() -> ExitCode {
    let args = Args::parse();

    if let Err(e) = logging::init(args.log_format, args.log_file.as_deref()) {
        eprintln!("error: {e:#}");
        return ExitCode::FAILURE;
    }

    match run(&args).await {
        Ok(report) => {
            println!("{}", report::render(&report));
            ExitCode::SUCCESS
        }
        Err(e) => {
            error!("Ingestion failed: {e:#}");
            eprintln!("error: {e:#}");
            ExitCode::FAILURE
        }
    }
}

fn log_progress(progress: Progress) {
    if progress.finished {
        info!(
            processed = progress.processed,
            skipped = progress.skipped,
            "Extraction finished"
        );
    } else {
        info!(
            processed = progress.processed,
            skipped = progress.skipped,
            "Processed {} commits",
            progress.processed
        );
    }
}

async fn run(args: &Args) -> anyhow::Result<IngestionReport> {
    let (config_path, required) = args.config_file();
    let file = config::load_file(config_path, required).context("loading configuration")?;
    let settings = Settings::resolve(args, file).context("invalid configuration")?;

    info!(
        repository = %settings.repository,
        branch = %settings.branch,
        max_commits = settings.max_commits,
        output = %settings.output_path.display(),
        "Starting ingestion"
    );

    let source =
        GithubCommitSource::new(settings.github.clone()).context("configuring GitHub client")?;
    let mut mirror = settings
        .database
        .as_ref()
        .map(|db| SqliteMirror::new(db.url.clone(), db.table.clone()))
        .transpose()
        .context("configuring database mirror")?;
    let exporter = CsvExporter::new();

    source.log_rate_limit().await;

    let mut plan = IngestionPlan::new(
        settings.repository.clone(),
        settings.branch.clone(),
        settings.max_commits,
        settings.output_path.clone(),
    );
    if let Some(db) = &settings.database {
        plan.conflict_policy = db.conflict_policy;
    }

    let observer = log_progress;
    let mut ingestion = Ingestion::new(&source, &exporter).with_progress(&observer);
    if let Some(mirror) = mirror.as_mut() {
        ingestion = ingestion.with_mirror(mirror);
    }

    let report = ingestion.run(&plan).await?;
    info!(
        run_id = %report.run_id,
        extracted = report.extracted,
        skipped = report.skipped,
        mirror_ok = report.mirror.succeeded(),
        "Ingestion complete"
    );
    Ok(report)
}
