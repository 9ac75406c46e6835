//! Error and retry-policy types for the commit ingestion domain.
//!
//! The taxonomy follows the failure tolerance of each stage:
//!
//! | Error | Scope | Handling |
//! |-------|-------|----------|
//! | [`SourceError`] | whole run | fatal, surfaced to the caller |
//! | [`NormalizationError`] | one commit | commit skipped, run continues |
//! | [`ExportError`] | whole run | fatal, the CSV file is the deliverable |
//! | [`SinkError`] | relational mirror | logged as a warning by [`crate::ingest`] |
//!
//! [`RetryPolicy`] is a cross-cutting concern: the commit source adapter asks
//! a [`SourceError`] for its policy before deciding to re-issue a request.

use std::path::PathBuf;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::{BranchName, CommitHash, RepositorySlug};

// ---------------------------------------------------------------------------
// Retry semantics
// ---------------------------------------------------------------------------

/// Whether an error condition is safe to retry and, if so, after what delay.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum RetryPolicy {
    /// The operation may be retried.
    Retryable {
        /// Minimum back-off before the next attempt. `None` means retry
        /// immediately or apply the caller's own back-off schedule.
        after: Option<Duration>,
    },
    /// The operation must not be retried.
    NonRetryable,
}

// ---------------------------------------------------------------------------
// Commit source errors
// ---------------------------------------------------------------------------

/// Failures reported by a [`crate::CommitSource`] or its [`crate::CommitStream`].
///
/// Every variant is fatal to the extraction; per-commit problems are expressed
/// as a [`crate::CommitHandle`] with missing data instead.
#[derive(Debug, Error)]
pub enum SourceError {
    /// The `owner/name` pair does not resolve to a repository visible to the caller.
    #[error("Repository not found: {repository}")]
    RepositoryNotFound {
        /// The repository that was requested.
        repository: RepositorySlug,
    },

    /// The repository exists but has no branch with the requested name.
    #[error("Branch '{branch}' not found in {repository}")]
    BranchNotFound {
        /// Repository that was searched.
        repository: RepositorySlug,
        /// The branch that was requested.
        branch: BranchName,
    },

    /// The remote API refused the request because the rate limit is exhausted.
    #[error("Rate limit exceeded{}", reset_suffix(.reset_after))]
    RateLimited {
        /// Time until the limit resets, when the remote reported it.
        reset_after: Option<Duration>,
    },

    /// Credentials were rejected.
    #[error("Authentication rejected by the remote API: {message}")]
    Unauthorized {
        /// Message returned by the remote.
        message: String,
    },

    /// The request could not be completed at the transport level.
    #[error("Transport error: {message}")]
    Transport {
        /// Description of the network failure.
        message: String,
    },

    /// The remote answered with a status or body the adapter cannot interpret.
    #[error("Unexpected response ({status}): {message}")]
    UnexpectedResponse {
        /// HTTP status code returned.
        status: u16,
        /// Body excerpt or decoding error.
        message: String,
    },
}

fn reset_suffix(reset_after: &Option<Duration>) -> String {
    reset_after
        .map(|d| format!(" (resets in {}s)", d.as_secs()))
        .unwrap_or_default()
}

impl SourceError {
    /// Returns whether re-issuing the failed request can succeed.
    pub fn retry_policy(&self) -> RetryPolicy {
        match self {
            Self::RateLimited { reset_after } => RetryPolicy::Retryable {
                after: *reset_after,
            },
            Self::Transport { .. } => RetryPolicy::Retryable { after: None },
            Self::UnexpectedResponse { status, .. } if *status >= 500 => {
                RetryPolicy::Retryable { after: None }
            }
            _ => RetryPolicy::NonRetryable,
        }
    }
}

// ---------------------------------------------------------------------------
// Per-commit normalization errors
// ---------------------------------------------------------------------------

/// Reasons a single commit cannot be turned into a [`crate::NormalizedRecord`].
///
/// Never fatal: the extractor records the cause against the commit and moves on.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum NormalizationError {
    /// The reported identifier is not a 40-character hex hash.
    #[error("invalid commit hash '{value}'")]
    InvalidHash {
        /// The value the source reported.
        value: String,
    },

    /// The commit carries no authoring timestamp.
    #[error("missing author timestamp")]
    MissingTimestamp,

    /// The timestamp could not be parsed as RFC 3339 with a timezone.
    #[error("malformed author timestamp '{value}'")]
    MalformedTimestamp {
        /// The raw timestamp string.
        value: String,
    },

    /// The commit carries no message.
    #[error("missing commit message")]
    MissingMessage,

    /// Line statistics were not available for the commit.
    #[error("missing change statistics{}", detail_suffix(.detail))]
    MissingStatistics {
        /// Why the source could not provide them, if known.
        detail: Option<String>,
    },

    /// Neither a file total nor a file listing was available.
    #[error("missing file change information")]
    MissingFileInformation,

    /// A count that must be non-negative was reported as negative.
    #[error("negative {field}: {value}")]
    NegativeCount {
        /// Which field carried the bad value.
        field: &'static str,
        /// The value reported.
        value: i64,
    },
}

fn detail_suffix(detail: &Option<String>) -> String {
    detail.as_ref().map(|d| format!(": {d}")).unwrap_or_default()
}

// ---------------------------------------------------------------------------
// Stage-level errors
// ---------------------------------------------------------------------------

/// Fatal failure of [`crate::Extractor::extract`].
#[derive(Debug, Error)]
pub enum ExtractError {
    /// The commit source failed to open the history or to produce the next item.
    #[error(transparent)]
    Source(#[from] SourceError),
}

/// Fatal failure of a [`crate::FileSink`].
#[derive(Debug, Error)]
pub enum ExportError {
    /// Creating directories, writing, or publishing the file failed.
    #[error("Failed to write {}: {reason}", .path.display())]
    Write {
        /// Destination that was being written.
        path: PathBuf,
        /// Underlying I/O or encoding failure.
        reason: String,
    },
}

/// Failures of a [`crate::RelationalSink`].
///
/// Recovered by the orchestrator: the run still succeeds if the file export did.
#[derive(Debug, Error)]
pub enum SinkError {
    /// The database could not be reached or the connection check failed.
    #[error("Database connection failed: {message}")]
    Connection {
        /// Driver-level description.
        message: String,
    },

    /// An operation was invoked before `connect` (or `load` before `ensure_schema`).
    #[error(
        "Database not connected: {operation} requires a prior successful connect and ensure_schema"
    )]
    NotConnected {
        /// The operation that was attempted.
        operation: &'static str,
    },

    /// The target table could not be created or inspected.
    #[error("Schema error: {message}")]
    Schema {
        /// Driver-level description.
        message: String,
    },

    /// A record's hash already exists and the configured policy forbids it.
    #[error("Commit {hash} already present; load rolled back")]
    DuplicateCommit {
        /// The first conflicting hash.
        hash: CommitHash,
    },

    /// Writing rows failed for another reason.
    #[error("Load failed: {message}")]
    Load {
        /// Driver-level description.
        message: String,
    },

    /// The configured table name is not a plain SQL identifier.
    #[error("Invalid table name '{name}'")]
    InvalidTable {
        /// The rejected name.
        name: String,
    },
}

/// Fatal outcome of [`crate::Ingestion::run`].
#[derive(Debug, Error)]
pub enum IngestError {
    /// Extraction failed (repository, branch, or source failure).
    #[error("Extraction failed: {0}")]
    Extract(#[from] ExtractError),

    /// The authoritative CSV export failed.
    #[error("Export failed: {0}")]
    Export(#[from] ExportError),
}
