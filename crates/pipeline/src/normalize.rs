//! Conversion of a [`CommitHandle`] into a [`NormalizedCommit`].
//!
//! Rules, applied in order:
//!
//! 1. The SHA must be 40 hex characters; it is lower-cased.
//! 2. Author email and name default to [`UNKNOWN_AUTHOR`] when absent or blank.
//! 3. The authoring timestamp is required, must be RFC 3339 with an offset,
//!    and is normalised to UTC.
//! 4. The message is required (it may be empty).
//! 5. Line statistics are required; negative values are rejected.
//! 6. `files_changed` is the remote's explicit total when present, otherwise
//!    the length of the file listing. With neither, the commit is rejected.
//!    There is no other fallback.
//!
//! `total_changes` is derived from the line counts, never taken from the remote.

use crate::{
    ChangeCounts, CommitDetail, CommitHandle, CommitHash, FileSummary, NormalizationError,
    NormalizedCommit, Timestamp, UNKNOWN_AUTHOR,
};

/// Normalizes one commit.
///
/// # Errors
///
/// Returns the first rule violation as a [`NormalizationError`].
pub fn normalize(handle: &CommitHandle) -> Result<NormalizedCommit, NormalizationError> {
    let hash = CommitHash::parse(&handle.sha).ok_or_else(|| NormalizationError::InvalidHash {
        value: handle.sha.clone(),
    })?;

    let author = handle.author.as_ref();
    let email = identity_or_unknown(author.and_then(|a| a.email.as_deref()));
    let name = identity_or_unknown(author.and_then(|a| a.name.as_deref()));

    let raw_date = author
        .and_then(|a| a.date.as_deref())
        .ok_or(NormalizationError::MissingTimestamp)?;
    let timestamp =
        Timestamp::parse_rfc3339(raw_date).ok_or_else(|| NormalizationError::MalformedTimestamp {
            value: raw_date.to_string(),
        })?;

    let message = handle
        .message
        .clone()
        .ok_or(NormalizationError::MissingMessage)?;

    let (stats, files) = match &handle.detail {
        CommitDetail::Available { stats, files } => (stats, files),
        CommitDetail::Unavailable { reason } => {
            return Err(NormalizationError::MissingStatistics {
                detail: Some(reason.clone()),
            })
        }
    };
    let stats = stats.ok_or(NormalizationError::MissingStatistics { detail: None })?;

    let counts = ChangeCounts {
        files_changed: files_changed(files)?,
        lines_added: non_negative("lines_added", stats.additions)?,
        lines_deleted: non_negative("lines_deleted", stats.deletions)?,
    };

    Ok(NormalizedCommit {
        hash,
        author: email,
        author_name: name,
        timestamp,
        message,
        counts,
    })
}

/// Applies the single files-changed rule: explicit total, else listing length.
pub fn files_changed(files: &FileSummary) -> Result<u64, NormalizationError> {
    match (files.total, files.listed.as_ref()) {
        (Some(total), _) => non_negative("files_changed", total),
        (None, Some(listed)) => Ok(listed.len() as u64),
        (None, None) => Err(NormalizationError::MissingFileInformation),
    }
}

fn identity_or_unknown(value: Option<&str>) -> String {
    match value.map(str::trim) {
        Some(v) if !v.is_empty() => v.to_string(),
        _ => UNKNOWN_AUTHOR.to_string(),
    }
}

fn non_negative(field: &'static str, value: i64) -> Result<u64, NormalizationError> {
    u64::try_from(value).map_err(|_| NormalizationError::NegativeCount { field, value })
}
