//! Summary statistics over an [`ExtractionResult`].
//!
//! Undefined values (date range and means of an empty result) are `None`,
//! never `0.0` or NaN. Sums over an empty result are zero.

use std::collections::HashSet;

use serde::Serialize;

use crate::{ChangeCounts, ExtractionResult, Timestamp};

/// Earliest and latest authoring timestamps of a result.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct DateRange {
    pub start: Timestamp,
    pub end: Timestamp,
}

/// Arithmetic means of the per-commit counts.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct ChangeMeans {
    pub files_changed: f64,
    pub lines_added: f64,
    pub lines_deleted: f64,
}

/// Read-only projection of an [`ExtractionResult`].
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SummaryStatistics {
    /// Number of records.
    pub total_commits: usize,
    /// Number of distinct author emails (`"unknown"` counts as one author).
    pub unique_authors: usize,
    /// `None` when there are no records.
    pub date_range: Option<DateRange>,
    /// `None` when there are no records.
    pub means: Option<ChangeMeans>,
    /// Column sums; zero when there are no records.
    pub totals: ChangeCounts,
}

/// Aggregates `result` without modifying it.
pub fn summarize(result: &ExtractionResult) -> SummaryStatistics {
    let records = result.records();

    let unique_authors = records
        .iter()
        .map(|r| r.author())
        .collect::<HashSet<_>>()
        .len();

    let start = records.iter().map(|r| r.timestamp()).min();
    let end = records.iter().map(|r| r.timestamp()).max();
    let date_range = start.zip(end).map(|(start, end)| DateRange { start, end });

    let mut totals = ChangeCounts::default();
    for record in records {
        totals += record.counts();
    }

    let means = (!records.is_empty()).then(|| {
        let n = records.len() as f64;
        ChangeMeans {
            files_changed: totals.files_changed as f64 / n,
            lines_added: totals.lines_added as f64 / n,
            lines_deleted: totals.lines_deleted as f64 / n,
        }
    });

    SummaryStatistics {
        total_commits: records.len(),
        unique_authors,
        date_range,
        means,
        totals,
    }
}

impl std::fmt::Display for SummaryStatistics {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        writeln!(f, "Total commits: {}", self.total_commits)?;
        writeln!(f, "Unique authors: {}", self.unique_authors)?;
        match &self.date_range {
            Some(range) => writeln!(f, "Date range: {} to {}", range.start, range.end)?,
            None => writeln!(f, "Date range: no data")?,
        }
        match &self.means {
            Some(means) => {
                writeln!(f, "Avg files changed: {:.2}", means.files_changed)?;
                writeln!(f, "Avg lines added: {:.2}", means.lines_added)?;
                writeln!(f, "Avg lines deleted: {:.2}", means.lines_deleted)?;
            }
            None => writeln!(f, "Averages: no data")?,
        }
        writeln!(f, "Total lines added: {}", self.totals.lines_added)?;
        write!(f, "Total lines deleted: {}", self.totals.lines_deleted)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{normalize, BranchName, CommitHandle, RepositorySlug};

    fn result_of(handles: &[CommitHandle]) -> ExtractionResult {
        let commits = handles.iter().map(|h| normalize(h).unwrap()).collect();
        ExtractionResult::from_commits(
            "octocat/Hello-World".parse::<RepositorySlug>().unwrap(),
            BranchName::new("main").unwrap(),
            commits,
            Vec::new(),
            Timestamp::now(),
        )
    }

    fn handle(
        n: u8,
        email: &str,
        date: &str,
        files: i64,
        added: i64,
        deleted: i64,
    ) -> CommitHandle {
        CommitHandle::new(format!("{:040x}", n))
            .with_author(Some(email), Some("Dev"), Some(date))
            .with_message(format!("commit {n}"))
            .with_stats(added, deleted)
            .with_files(Some(files), None)
    }

    #[test]
    fn empty_result_has_explicit_no_data_markers() {
        let stats = summarize(&result_of(&[]));
        assert_eq!(stats.total_commits, 0);
        assert_eq!(stats.unique_authors, 0);
        assert!(stats.date_range.is_none());
        assert!(stats.means.is_none());
        assert_eq!(stats.totals, ChangeCounts::default());
        assert!(stats.to_string().contains("Date range: no data"));
    }

    #[test]
    fn aggregates_counts_authors_and_range() {
        let result = result_of(&[
            handle(1, "a@x.io", "2024-01-03T00:00:00Z", 2, 10, 4),
            handle(2, "b@x.io", "2024-01-01T00:00:00Z", 4, 20, 0),
            handle(3, "a@x.io", "2024-01-02T00:00:00Z", 3, 0, 2),
        ]);
        let stats = summarize(&result);

        assert_eq!(stats.total_commits, 3);
        assert_eq!(stats.unique_authors, 2);
        let range = stats.date_range.unwrap();
        assert_eq!(range.start.to_string(), "2024-01-01T00:00:00+00:00");
        assert_eq!(range.end.to_string(), "2024-01-03T00:00:00+00:00");

        assert_eq!(stats.totals.files_changed, 9);
        assert_eq!(stats.totals.lines_added, 30);
        assert_eq!(stats.totals.lines_deleted, 6);

        let means = stats.means.unwrap();
        assert_eq!(means.files_changed, 3.0);
        assert_eq!(means.lines_added, 10.0);
        assert_eq!(means.lines_deleted, 2.0);
    }

    #[test]
    fn summarize_does_not_alter_input() {
        let result = result_of(&[handle(1, "a@x.io", "2024-01-03T00:00:00Z", 1, 1, 1)]);
        let before = result.records().to_vec();
        let _ = summarize(&result);
        assert_eq!(result.records(), before.as_slice());
    }
}
