//! Commit source port.
//!
//! A [`CommitSource`] resolves a repository and branch into a lazy, finite,
//! forward-only [`CommitStream`]. Each element is a [`CommitHandle`]: an
//! untrusted, loosely-typed view of one commit as the remote reported it.
//! Turning a handle into a [`crate::NormalizedRecord`] is the job of
//! [`crate::normalize`]; the source never validates field contents.
//!
//! Errors returned by the stream itself are fatal to the run. A commit whose
//! details could not be fetched is still yielded, carrying
//! [`CommitDetail::Unavailable`], so the extractor can skip it individually.

use async_trait::async_trait;

use crate::{BranchName, RepositorySlug, SourceError};

// ---------------------------------------------------------------------------
// Handle
// ---------------------------------------------------------------------------

/// Identity of the commit author as reported by the remote. Every field may be absent.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AuthorSignature {
    /// Author email address.
    pub email: Option<String>,
    /// Author display name.
    pub name: Option<String>,
    /// Authoring time as an RFC 3339 string.
    pub date: Option<String>,
}

/// Line statistics as reported by the remote, before sign checks.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LineStats {
    /// Lines added.
    pub additions: i64,
    /// Lines deleted.
    pub deletions: i64,
}

/// What the remote said about the files a commit touched.
///
/// `total` is an explicit count when the remote provides one; `listed` is the
/// file listing that came back with the commit. See [`crate::normalize`] for
/// how the two are reconciled.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FileSummary {
    /// Explicit total reported by the remote.
    pub total: Option<i64>,
    /// Paths of the files listed with the commit.
    pub listed: Option<Vec<String>>,
}

/// The per-commit detail payload (statistics and files).
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CommitDetail {
    /// Details were fetched; individual parts may still be missing.
    Available {
        /// Line statistics, if present in the payload.
        stats: Option<LineStats>,
        /// File information.
        files: FileSummary,
    },
    /// Details could not be fetched for this commit only.
    Unavailable {
        /// Description of the failure.
        reason: String,
    },
}

/// One commit as produced by a [`CommitStream`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommitHandle {
    /// Commit SHA as reported (not yet validated).
    pub sha: String,
    /// Author identity, absent when the remote has no author record.
    pub author: Option<AuthorSignature>,
    /// Full commit message.
    pub message: Option<String>,
    /// Statistics and files.
    pub detail: CommitDetail,
}

impl CommitHandle {
    /// Creates a handle with only the SHA set and details available but empty.
    pub fn new(sha: impl Into<String>) -> Self {
        Self {
            sha: sha.into(),
            author: None,
            message: None,
            detail: CommitDetail::Available {
                stats: None,
                files: FileSummary::default(),
            },
        }
    }

    /// Sets the author identity and timestamp.
    pub fn with_author(
        mut self,
        email: Option<&str>,
        name: Option<&str>,
        date: Option<&str>,
    ) -> Self {
        self.author = Some(AuthorSignature {
            email: email.map(str::to_string),
            name: name.map(str::to_string),
            date: date.map(str::to_string),
        });
        self
    }

    /// Sets the commit message.
    pub fn with_message(mut self, message: impl Into<String>) -> Self {
        self.message = Some(message.into());
        self
    }

    /// Sets the line statistics, keeping any file information already present.
    pub fn with_stats(mut self, additions: i64, deletions: i64) -> Self {
        let stats = Some(LineStats {
            additions,
            deletions,
        });
        self.detail = match self.detail {
            CommitDetail::Available { files, .. } => CommitDetail::Available { stats, files },
            CommitDetail::Unavailable { .. } => CommitDetail::Available {
                stats,
                files: FileSummary::default(),
            },
        };
        self
    }

    /// Sets the explicit file total and/or listing, keeping statistics already present.
    pub fn with_files(mut self, total: Option<i64>, listed: Option<Vec<String>>) -> Self {
        let files = FileSummary { total, listed };
        self.detail = match self.detail {
            CommitDetail::Available { stats, .. } => CommitDetail::Available { stats, files },
            CommitDetail::Unavailable { .. } => CommitDetail::Available { stats: None, files },
        };
        self
    }

    /// Marks the details as unavailable.
    pub fn with_unavailable_detail(mut self, reason: impl Into<String>) -> Self {
        self.detail = CommitDetail::Unavailable {
            reason: reason.into(),
        };
        self
    }
}

// ---------------------------------------------------------------------------
// Port traits
// ---------------------------------------------------------------------------

/// Resolves a repository and branch into a commit history.
///
/// Implementations own authentication, rate limiting, and network retries.
#[async_trait]
pub trait CommitSource: Send + Sync {
    /// Opens the history of `branch` in `repository`.
    ///
    /// # Errors
    ///
    /// - [`SourceError::RepositoryNotFound`] if the repository does not resolve.
    /// - [`SourceError::BranchNotFound`] if the branch does not exist.
    /// - Any other [`SourceError`] for transport or API failures.
    async fn open(
        &self,
        repository: &RepositorySlug,
        branch: &BranchName,
    ) -> Result<Box<dyn CommitStream>, SourceError>;
}

/// A lazy, forward-only sequence of commits in history order.
///
/// Remote pages are fetched on demand, so a consumer that stops early never
/// pays for the rest of the history.
#[async_trait]
pub trait CommitStream: Send {
    /// Returns the next commit, `Ok(None)` once the history is exhausted.
    async fn next_commit(&mut self) -> Result<Option<CommitHandle>, SourceError>;
}
