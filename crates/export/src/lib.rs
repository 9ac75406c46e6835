//! CSV file sink.
//!
//! Implements [`pipeline::FileSink`]. The file is written to a temporary file
//! in the destination directory and renamed into place, so a reader sees
//! either the previous file or the complete new one.
//!
//! Column order follows [`pipeline::RECORD_COLUMNS`]; timestamps are written
//! as RFC 3339 strings in UTC.

use std::io::Write;
use std::path::{Path, PathBuf};

use pipeline::{ExportError, ExportSummary, ExtractionResult, FileSink, RECORD_COLUMNS};
use tempfile::NamedTempFile;
use tracing::debug;

/// Writes extraction results as comma-separated values with a header row.
#[derive(Debug, Clone, Copy, Default)]
pub struct CsvExporter;

impl CsvExporter {
    pub fn new() -> Self {
        Self
    }
}

impl FileSink for CsvExporter {
    fn export(
        &self,
        result: &ExtractionResult,
        destination: &Path,
    ) -> Result<ExportSummary, ExportError> {
        let fail = |reason: String| ExportError::Write {
            path: destination.to_path_buf(),
            reason,
        };

        let dir = parent_dir(destination);
        std::fs::create_dir_all(&dir)
            .map_err(|e| fail(format!("cannot create {}: {e}", dir.display())))?;

        let staging = NamedTempFile::new_in(&dir).map_err(|e| fail(e.to_string()))?;
        debug!(staging = %staging.path().display(), "Writing CSV to staging file");

        let mut writer = csv::WriterBuilder::new()
            .has_headers(false)
            .from_writer(staging);
        writer
            .write_record(RECORD_COLUMNS)
            .map_err(|e| fail(e.to_string()))?;
        for record in result.records() {
            writer.serialize(record).map_err(|e| fail(e.to_string()))?;
        }

        let mut staging = writer.into_inner().map_err(|e| fail(e.to_string()))?;
        staging.flush().map_err(|e| fail(e.to_string()))?;
        staging
            .as_file()
            .sync_all()
            .map_err(|e| fail(e.to_string()))?;
        staging
            .persist(destination)
            .map_err(|e| fail(e.error.to_string()))?;

        Ok(ExportSummary {
            path: destination.to_path_buf(),
            rows: result.len(),
        })
    }
}

fn parent_dir(path: &Path) -> PathBuf {
    match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent.to_path_buf(),
        _ => PathBuf::from("."),
    }
}
