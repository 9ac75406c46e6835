//! End-to-end ingestion: extract, export, summarize, mirror.
//!
//! Failure tolerance differs per stage. Extraction and the CSV export are
//! fatal; the relational mirror is best-effort and its failure is reported
//! in [`IngestionReport::mirror`] rather than returned as an error. The
//! mirror's connection is always closed once a connect was attempted.

use std::path::PathBuf;

use tracing::{info, info_span, warn, Instrument};

use crate::{
    summarize, BranchName, CommitSource, ConflictPolicy, ExportSummary, Extractor,
    ExtractionResult, FileSink, IngestError, ProgressObserver, RelationalSink, RepositorySlug,
    RowsAffected, RunId, SinkError, SummaryStatistics, DEFAULT_PROGRESS_INTERVAL,
};

/// The values one run needs.
#[derive(Debug, Clone)]
pub struct IngestionPlan {
    pub repository: RepositorySlug,
    pub branch: BranchName,
    /// Upper bound on commits consumed from the source.
    pub max_commits: usize,
    /// Destination of the CSV export.
    pub output_path: PathBuf,
    /// Duplicate handling for the relational mirror.
    pub conflict_policy: ConflictPolicy,
    /// Commits between two progress notifications.
    pub progress_interval: usize,
}

impl IngestionPlan {
    pub fn new(
        repository: RepositorySlug,
        branch: BranchName,
        max_commits: usize,
        output_path: impl Into<PathBuf>,
    ) -> Self {
        Self {
            repository,
            branch,
            max_commits,
            output_path: output_path.into(),
            conflict_policy: ConflictPolicy::default(),
            progress_interval: DEFAULT_PROGRESS_INTERVAL,
        }
    }
}

/// What happened to the relational mirror.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MirrorOutcome {
    /// No relational sink was configured.
    Disabled,
    /// Records were loaded. `table_total` is `None` if the count query failed.
    Loaded {
        rows: RowsAffected,
        table_total: Option<u64>,
    },
    /// The mirror failed; the run still succeeded.
    Failed { reason: String },
}

impl MirrorOutcome {
    pub fn succeeded(&self) -> bool {
        matches!(self, Self::Loaded { .. })
    }
}

/// Summary of a completed run.
#[derive(Debug, Clone)]
pub struct IngestionReport {
    pub run_id: RunId,
    /// Records exported.
    pub extracted: usize,
    /// Commits skipped during normalization.
    pub skipped: usize,
    pub statistics: SummaryStatistics,
    pub export: ExportSummary,
    pub mirror: MirrorOutcome,
}

/// Wiring of the ports used by one run.
pub struct Ingestion<'a> {
    source: &'a dyn CommitSource,
    file_sink: &'a dyn FileSink,
    mirror: Option<&'a mut dyn RelationalSink>,
    observer: Option<&'a dyn ProgressObserver>,
}

impl<'a> Ingestion<'a> {
    pub fn new(source: &'a dyn CommitSource, file_sink: &'a dyn FileSink) -> Self {
        Self {
            source,
            file_sink,
            mirror: None,
            observer: None,
        }
    }

    /// Enables the relational mirror.
    pub fn with_mirror(mut self, mirror: &'a mut dyn RelationalSink) -> Self {
        self.mirror = Some(mirror);
        self
    }

    /// Forwards extraction progress to `observer`.
    pub fn with_progress(mut self, observer: &'a dyn ProgressObserver) -> Self {
        self.observer = Some(observer);
        self
    }

    /// Executes the run described by `plan`.
    ///
    /// # Errors
    ///
    /// - [`IngestError::Extract`] if the source fails; nothing is written.
    /// - [`IngestError::Export`] if the CSV cannot be written; the mirror is not attempted.
    pub async fn run(self, plan: &IngestionPlan) -> Result<IngestionReport, IngestError> {
        let run_id = RunId::new_random();
        let span = info_span!(
            "ingestion",
            %run_id,
            repository = %plan.repository,
            branch = %plan.branch,
        );
        self.run_inner(run_id, plan).instrument(span).await
    }

    async fn run_inner(
        self,
        run_id: RunId,
        plan: &IngestionPlan,
    ) -> Result<IngestionReport, IngestError> {
        let mut extractor = Extractor::new(self.source);
        if let Some(observer) = self.observer {
            extractor = extractor.with_progress(observer, plan.progress_interval);
        }
        let result = extractor
            .extract(&plan.repository, &plan.branch, plan.max_commits)
            .await?;

        let export = self.file_sink.export(&result, &plan.output_path)?;
        info!(path = %export.path.display(), rows = export.rows, "CSV export written");

        let statistics = summarize(&result);

        let mirror = match self.mirror {
            Some(sink) => run_mirror(sink, &result, plan.conflict_policy).await,
            None => MirrorOutcome::Disabled,
        };

        Ok(IngestionReport {
            run_id,
            extracted: result.len(),
            skipped: result.skipped_count(),
            statistics,
            export,
            mirror,
        })
    }
}

async fn run_mirror(
    sink: &mut dyn RelationalSink,
    result: &ExtractionResult,
    policy: ConflictPolicy,
) -> MirrorOutcome {
    let outcome = load_into(sink, result, policy).await;
    sink.close().await;

    match outcome {
        Ok((rows, table_total)) => {
            info!(
                written = rows.written,
                rejected = rows.rejected,
                table_total,
                "Relational mirror updated"
            );
            MirrorOutcome::Loaded { rows, table_total }
        }
        Err(e) => {
            warn!(error = %e, "Relational mirror skipped");
            MirrorOutcome::Failed {
                reason: e.to_string(),
            }
        }
    }
}

async fn load_into(
    sink: &mut dyn RelationalSink,
    result: &ExtractionResult,
    policy: ConflictPolicy,
) -> Result<(RowsAffected, Option<u64>), SinkError> {
    sink.connect().await?;
    sink.ensure_schema().await?;
    let rows = sink.load(result, policy).await?;

    let table_total = match sink.record_count().await {
        Ok(count) => Some(count),
        Err(e) => {
            warn!(error = %e, "Could not count mirrored rows");
            None
        }
    };
    Ok((rows, table_total))
}
