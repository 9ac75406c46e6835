//! The extraction stage: drive a [`CommitSource`], normalize each commit,
//! skip the ones that fail, and stamp the survivors with one capture time.

use tracing::{debug, info, warn};

use crate::{
    normalize, BranchName, CommitSource, ExtractError, ExtractionResult, RepositorySlug,
    SkippedCommit, Timestamp,
};

/// Default number of commits between two progress notifications.
pub const DEFAULT_PROGRESS_INTERVAL: usize = 100;

// ---------------------------------------------------------------------------
// Progress
// ---------------------------------------------------------------------------

/// Snapshot of an extraction in flight.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Progress {
    /// Commits consumed from the source so far (normalized or skipped).
    pub processed: usize,
    /// Commits skipped so far.
    pub skipped: usize,
    /// `true` for the final notification of a run.
    pub finished: bool,
}

/// Receives periodic [`Progress`] notifications. Advisory only.
pub trait ProgressObserver: Send + Sync {
    fn on_progress(&self, progress: Progress);
}

impl<F> ProgressObserver for F
where
    F: Fn(Progress) + Send + Sync,
{
    fn on_progress(&self, progress: Progress) {
        self(progress)
    }
}

// ---------------------------------------------------------------------------
// Extractor
// ---------------------------------------------------------------------------

/// Drives one [`CommitSource`] into an [`ExtractionResult`].
pub struct Extractor<'a> {
    source: &'a dyn CommitSource,
    observer: Option<&'a dyn ProgressObserver>,
    progress_interval: usize,
}

impl<'a> Extractor<'a> {
    pub fn new(source: &'a dyn CommitSource) -> Self {
        Self {
            source,
            observer: None,
            progress_interval: DEFAULT_PROGRESS_INTERVAL,
        }
    }

    /// Notifies `observer` every `interval` commits and once at the end.
    ///
    /// An interval of zero is treated as one.
    pub fn with_progress(mut self, observer: &'a dyn ProgressObserver, interval: usize) -> Self {
        self.observer = Some(observer);
        self.progress_interval = interval.max(1);
        self
    }

    /// Extracts at most `max_items` commits of `branch` in `repository`.
    ///
    /// `max_items == 0` returns an empty result without contacting the source.
    /// Commits that fail normalization are recorded in
    /// [`ExtractionResult::skipped`]; they never abort the run. A source error
    /// (including one raised mid-pagination) is fatal and discards the records
    /// gathered so far.
    ///
    /// # Errors
    ///
    /// Returns [`ExtractError::Source`] when the source cannot open the
    /// history or fails to produce the next commit.
    pub async fn extract(
        &self,
        repository: &RepositorySlug,
        branch: &BranchName,
        max_items: usize,
    ) -> Result<ExtractionResult, ExtractError> {
        if max_items == 0 {
            debug!("max_items is zero; nothing to extract");
            return Ok(ExtractionResult::empty(
                repository.clone(),
                branch.clone(),
                Timestamp::now(),
            ));
        }

        info!(%repository, %branch, max_items, "Starting commit extraction");
        let mut stream = self.source.open(repository, branch).await?;

        let mut commits = Vec::new();
        let mut skipped = Vec::new();
        let mut processed = 0usize;

        while processed < max_items {
            let Some(handle) = stream.next_commit().await? else {
                debug!(processed, "Commit history exhausted before the cap");
                break;
            };
            processed += 1;

            match normalize(&handle) {
                Ok(commit) => commits.push(commit),
                Err(reason) => {
                    warn!(sha = %handle.sha, %reason, "Skipping commit");
                    skipped.push(SkippedCommit {
                        sha: handle.sha,
                        reason,
                    });
                }
            }

            if processed % self.progress_interval == 0 {
                self.notify(processed, skipped.len(), false);
            }
        }
        self.notify(processed, skipped.len(), true);

        let extracted_at = Timestamp::now();
        info!(
            extracted = commits.len(),
            skipped = skipped.len(),
            %extracted_at,
            "Commit extraction finished"
        );
        Ok(ExtractionResult::from_commits(
            repository.clone(),
            branch.clone(),
            commits,
            skipped,
            extracted_at,
        ))
    }

    fn notify(&self, processed: usize, skipped: usize, finished: bool) {
        if let Some(observer) = self.observer {
            observer.on_progress(Progress {
                processed,
                skipped,
                finished,
            });
        }
    }
}
