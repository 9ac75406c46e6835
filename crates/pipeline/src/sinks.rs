//! Sink ports: the authoritative file export and the best-effort relational mirror.

use std::path::{Path, PathBuf};
use std::str::FromStr;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::{ExportError, ExtractionResult, SinkError};

// ---------------------------------------------------------------------------
// File sink
// ---------------------------------------------------------------------------

/// What a successful export wrote.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExportSummary {
    /// Final location of the file.
    pub path: PathBuf,
    /// Data rows written (excluding the header).
    pub rows: usize,
}

/// Writes a full snapshot of an [`ExtractionResult`] to a file.
///
/// Implementations must create missing parent directories, overwrite any
/// existing file, and never leave a partially written file at `destination`.
pub trait FileSink {
    /// # Errors
    ///
    /// Returns [`ExportError::Write`] on any I/O or encoding failure.
    fn export(
        &self,
        result: &ExtractionResult,
        destination: &Path,
    ) -> Result<ExportSummary, ExportError>;
}

// ---------------------------------------------------------------------------
// Relational sink
// ---------------------------------------------------------------------------

/// Behaviour of [`RelationalSink::load`] when a `commit_hash` already exists.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ConflictPolicy {
    /// Keep the stored row; the incoming duplicate is counted as rejected.
    #[default]
    Reject,
    /// Roll back the whole load on the first duplicate.
    Abort,
    /// Overwrite the stored row with the incoming values.
    Upsert,
}

impl FromStr for ConflictPolicy {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "reject" => Ok(Self::Reject),
            "abort" => Ok(Self::Abort),
            "upsert" => Ok(Self::Upsert),
            other => Err(format!(
                "unknown conflict policy '{other}' (expected reject, abort, or upsert)"
            )),
        }
    }
}

impl std::fmt::Display for ConflictPolicy {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            Self::Reject => "reject",
            Self::Abort => "abort",
            Self::Upsert => "upsert",
        };
        f.write_str(s)
    }
}

/// Outcome of one [`RelationalSink::load`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct RowsAffected {
    /// Rows inserted or (under [`ConflictPolicy::Upsert`]) updated.
    pub written: u64,
    /// Incoming rows dropped because their hash was already stored.
    pub rejected: u64,
}

/// A table-like store that can create its table if absent and append by unique key.
///
/// Call order is `connect`, `ensure_schema`, `load`/`record_count`, then
/// `close`. `close` must be safe to call in any state.
#[async_trait]
pub trait RelationalSink: Send {
    /// Opens the connection and verifies it with a trivial query.
    async fn connect(&mut self) -> Result<(), SinkError>;

    /// Creates the target table if it does not exist. Idempotent.
    async fn ensure_schema(&mut self) -> Result<(), SinkError>;

    /// Writes every record of `result` under `policy`.
    ///
    /// # Errors
    ///
    /// [`SinkError::NotConnected`] unless `connect` and `ensure_schema` succeeded.
    async fn load(
        &mut self,
        result: &ExtractionResult,
        policy: ConflictPolicy,
    ) -> Result<RowsAffected, SinkError>;

    /// Number of rows currently in the target table.
    async fn record_count(&mut self) -> Result<u64, SinkError>;

    /// Releases the connection.
    async fn close(&mut self);
}
