use std::fmt::Write;

use pipeline::{IngestionReport, MirrorOutcome};

const RULE: &str = "======================================================================";

/// Renders the end-of-run summary printed to stdout.
pub fn render(report: &IngestionReport) -> String {
    let mut out = String::new();
    // Writing into a String cannot fail.
    let _ = write_report(&mut out, report);
    out
}

fn write_report(out: &mut String, report: &IngestionReport) -> std::fmt::Result {
    writeln!(out, "{RULE}")?;
    writeln!(out, "EXTRACTION STATISTICS (run {})", report.run_id)?;
    writeln!(out, "{RULE}")?;
    writeln!(out, "{}", report.statistics)?;
    writeln!(
        out,
        "Extracted: {} commits, skipped: {}",
        report.extracted, report.skipped
    )?;
    writeln!(
        out,
        "CSV: {} ({} rows)",
        report.export.path.display(),
        report.export.rows
    )?;
    match &report.mirror {
        MirrorOutcome::Disabled => writeln!(out, "Database: not configured")?,
        MirrorOutcome::Loaded { rows, table_total } => {
            write!(
                out,
                "Database: {} rows written, {} duplicates rejected",
                rows.written, rows.rejected
            )?;
            match table_total {
                Some(total) => writeln!(out, ", {total} rows in table")?,
                None => writeln!(out)?,
            }
        }
        MirrorOutcome::Failed { reason } => writeln!(out, "Database: skipped ({reason})")?,
    }
    write!(out, "{RULE}")
}

#[cfg(test)]
mod tests {
    use super::*;
    use pipeline::{
        BranchName, ExportSummary, ExtractionResult, RowsAffected, RunId, Timestamp,
    };

    fn report(mirror: MirrorOutcome) -> IngestionReport {
        let empty = ExtractionResult::empty(
            "octocat/Hello-World".parse().unwrap(),
            BranchName::new("main").unwrap(),
            Timestamp::now(),
        );
        IngestionReport {
            run_id: RunId::new_random(),
            extracted: 0,
            skipped: 2,
            statistics: pipeline::summarize(&empty),
            export: ExportSummary {
                path: "data/raw/commits.csv".into(),
                rows: 0,
            },
            mirror,
        }
    }

    #[test]
    fn reports_counts_and_mirror_status() {
        let text = render(&report(MirrorOutcome::Loaded {
            rows: RowsAffected {
                written: 3,
                rejected: 1,
            },
            table_total: Some(10),
        }));
        assert!(text.contains("Extracted: 0 commits, skipped: 2"));
        assert!(text.contains("Date range: no data"));
        assert!(text.contains("3 rows written, 1 duplicates rejected, 10 rows in table"));
    }

    #[test]
    fn failed_mirror_shows_the_reason() {
        let text = render(&report(MirrorOutcome::Failed {
            reason: "Database connection failed: refused".into(),
        }));
        assert!(text.contains("Database: skipped (Database connection failed: refused)"));
    }
}
