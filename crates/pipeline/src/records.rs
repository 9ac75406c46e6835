//! Normalized commit records and the result of one extraction run.

use serde::{Deserialize, Serialize};

use crate::{BranchName, ChangeCounts, CommitHash, NormalizationError, RepositorySlug, Timestamp};

/// Field names of [`NormalizedRecord`] in export order.
///
/// Used verbatim as the CSV header and as the relational column list.
pub const RECORD_COLUMNS: [&str; 10] = [
    "commit_hash",
    "author",
    "author_name",
    "timestamp",
    "message",
    "files_changed",
    "lines_added",
    "lines_deleted",
    "total_changes",
    "extracted_at",
];

/// Marker substituted for an absent author email or name.
pub const UNKNOWN_AUTHOR: &str = "unknown";

// ---------------------------------------------------------------------------
// Normalized commit
// ---------------------------------------------------------------------------

/// A validated commit, before it is stamped with the run's extraction time.
///
/// Produced by [`crate::normalize`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NormalizedCommit {
    /// The commit hash.
    pub hash: CommitHash,
    /// Author email, or [`UNKNOWN_AUTHOR`].
    pub author: String,
    /// Author display name, or [`UNKNOWN_AUTHOR`].
    pub author_name: String,
    /// Authoring time in UTC.
    pub timestamp: Timestamp,
    /// Full commit message.
    pub message: String,
    /// File and line counts.
    pub counts: ChangeCounts,
}

/// One row of the extraction output.
///
/// Immutable once built: fields are read through accessors only.
/// `total_changes` is always `lines_added + lines_deleted`, and `extracted_at`
/// is identical for every record produced by the same run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NormalizedRecord {
    commit_hash: CommitHash,
    author: String,
    author_name: String,
    timestamp: Timestamp,
    message: String,
    files_changed: u64,
    lines_added: u64,
    lines_deleted: u64,
    total_changes: u64,
    extracted_at: Timestamp,
}

impl NormalizedRecord {
    fn stamp(commit: NormalizedCommit, extracted_at: Timestamp) -> Self {
        Self {
            commit_hash: commit.hash,
            author: commit.author,
            author_name: commit.author_name,
            timestamp: commit.timestamp,
            message: commit.message,
            files_changed: commit.counts.files_changed,
            lines_added: commit.counts.lines_added,
            lines_deleted: commit.counts.lines_deleted,
            total_changes: commit.counts.total_changes(),
            extracted_at,
        }
    }

    pub fn commit_hash(&self) -> &CommitHash {
        &self.commit_hash
    }

    pub fn author(&self) -> &str {
        &self.author
    }

    pub fn author_name(&self) -> &str {
        &self.author_name
    }

    pub fn timestamp(&self) -> Timestamp {
        self.timestamp
    }

    pub fn message(&self) -> &str {
        &self.message
    }

    pub fn files_changed(&self) -> u64 {
        self.files_changed
    }

    pub fn lines_added(&self) -> u64 {
        self.lines_added
    }

    pub fn lines_deleted(&self) -> u64 {
        self.lines_deleted
    }

    pub fn total_changes(&self) -> u64 {
        self.total_changes
    }

    pub fn extracted_at(&self) -> Timestamp {
        self.extracted_at
    }

    /// The three raw counts as one value.
    pub fn counts(&self) -> ChangeCounts {
        ChangeCounts {
            files_changed: self.files_changed,
            lines_added: self.lines_added,
            lines_deleted: self.lines_deleted,
        }
    }
}

// ---------------------------------------------------------------------------
// Extraction result
// ---------------------------------------------------------------------------

/// A commit the extractor could not normalize.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SkippedCommit {
    /// The SHA as reported by the source (may itself be the malformed part).
    pub sha: String,
    /// Why it was skipped.
    pub reason: NormalizationError,
}

/// Output of one extraction run: records in source order plus skipped commits.
#[derive(Debug, Clone)]
pub struct ExtractionResult {
    repository: RepositorySlug,
    branch: BranchName,
    extracted_at: Timestamp,
    records: Vec<NormalizedRecord>,
    skipped: Vec<SkippedCommit>,
}

impl ExtractionResult {
    /// Stamps every commit with `extracted_at` and assembles the result.
    ///
    /// `commits` must already be in source order.
    pub fn from_commits(
        repository: RepositorySlug,
        branch: BranchName,
        commits: Vec<NormalizedCommit>,
        skipped: Vec<SkippedCommit>,
        extracted_at: Timestamp,
    ) -> Self {
        let records = commits
            .into_iter()
            .map(|commit| NormalizedRecord::stamp(commit, extracted_at))
            .collect();
        Self {
            repository,
            branch,
            extracted_at,
            records,
            skipped,
        }
    }

    /// An empty result (no records, nothing skipped).
    pub fn empty(repository: RepositorySlug, branch: BranchName, extracted_at: Timestamp) -> Self {
        Self::from_commits(repository, branch, Vec::new(), Vec::new(), extracted_at)
    }

    pub fn repository(&self) -> &RepositorySlug {
        &self.repository
    }

    pub fn branch(&self) -> &BranchName {
        &self.branch
    }

    /// The capture time shared by every record.
    pub fn extracted_at(&self) -> Timestamp {
        self.extracted_at
    }

    pub fn records(&self) -> &[NormalizedRecord] {
        &self.records
    }

    pub fn skipped(&self) -> &[SkippedCommit] {
        &self.skipped
    }

    pub fn skipped_count(&self) -> usize {
        self.skipped.len()
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}
