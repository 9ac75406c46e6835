mod common;

use std::sync::Mutex;

use common::{commit, main_branch, repo, OpenFailure, ScriptedSource, Step};
use pipeline::{
    ExtractError, Extractor, NormalizationError, Progress, SourceError, UNKNOWN_AUTHOR,
};

#[tokio::test]
async fn extracts_up_to_the_cap_and_stops_pulling() {
    let source = ScriptedSource::of_commits(20);
    let result = Extractor::new(&source)
        .extract(&repo(), &main_branch(), 5)
        .await
        .unwrap();

    assert_eq!(result.len(), 5);
    assert_eq!(result.skipped_count(), 0);
    assert_eq!(source.pulled(), 5, "the stream must not be read past the cap");
}

#[tokio::test]
async fn shorter_history_than_cap_yields_everything() {
    let source = ScriptedSource::of_commits(3);
    let result = Extractor::new(&source)
        .extract(&repo(), &main_branch(), 100)
        .await
        .unwrap();
    assert_eq!(result.len(), 3);
}

#[tokio::test]
async fn zero_cap_is_empty_without_error() {
    let source = ScriptedSource::of_commits(10);
    let result = Extractor::new(&source)
        .extract(&repo(), &main_branch(), 0)
        .await
        .unwrap();

    assert!(result.is_empty());
    assert_eq!(result.skipped_count(), 0);
    assert_eq!(source.opened(), 0);
}

#[tokio::test]
async fn one_malformed_commit_is_skipped_and_order_is_kept() {
    let mut bad = commit(3);
    bad.sha = "not-a-hash".into();
    let source = ScriptedSource::new(vec![
        Step::Commit(commit(1)),
        Step::Commit(commit(2)),
        Step::Commit(bad),
        Step::Commit(commit(4)),
        Step::Commit(commit(5)),
    ]);

    let result = Extractor::new(&source)
        .extract(&repo(), &main_branch(), 5)
        .await
        .unwrap();

    assert_eq!(result.len(), 4);
    assert_eq!(result.skipped_count(), 1);
    assert_eq!(result.skipped()[0].sha, "not-a-hash");
    assert!(matches!(
        result.skipped()[0].reason,
        NormalizationError::InvalidHash { .. }
    ));

    let hashes: Vec<String> = result
        .records()
        .iter()
        .map(|r| r.commit_hash().to_string())
        .collect();
    let expected: Vec<String> = [1u32, 2, 4, 5].iter().map(|n| format!("{:040x}", n)).collect();
    assert_eq!(hashes, expected);
}

#[tokio::test]
async fn skipped_commits_count_against_the_cap() {
    let source = ScriptedSource::new(vec![
        Step::Commit(commit(1).with_unavailable_detail("HTTP 500")),
        Step::Commit(commit(2)),
        Step::Commit(commit(3)),
    ]);
    let result = Extractor::new(&source)
        .extract(&repo(), &main_branch(), 2)
        .await
        .unwrap();

    assert_eq!(result.len() + result.skipped_count(), 2);
    assert_eq!(result.len(), 1);
}

#[tokio::test]
async fn total_changes_and_extracted_at_hold_for_every_record() {
    let source = ScriptedSource::of_commits(12);
    let result = Extractor::new(&source)
        .extract(&repo(), &main_branch(), 12)
        .await
        .unwrap();

    let stamp = result.extracted_at();
    for record in result.records() {
        assert_eq!(
            record.total_changes(),
            record.lines_added() + record.lines_deleted()
        );
        assert_eq!(record.extracted_at(), stamp);
    }
}

#[tokio::test]
async fn absent_identity_is_substituted() {
    let handle = commit(1).with_author(None, None, Some("2024-02-02T00:00:00Z"));
    let source = ScriptedSource::new(vec![Step::Commit(handle)]);
    let result = Extractor::new(&source)
        .extract(&repo(), &main_branch(), 1)
        .await
        .unwrap();

    let record = &result.records()[0];
    assert_eq!(record.author(), UNKNOWN_AUTHOR);
    assert_eq!(record.author_name(), UNKNOWN_AUTHOR);
}

#[tokio::test]
async fn missing_repository_and_branch_are_fatal() {
    let source = ScriptedSource::failing_open(OpenFailure::Repository);
    let err = Extractor::new(&source)
        .extract(&repo(), &main_branch(), 5)
        .await
        .unwrap_err();
    assert!(matches!(
        err,
        ExtractError::Source(SourceError::RepositoryNotFound { .. })
    ));

    let source = ScriptedSource::failing_open(OpenFailure::Branch);
    let err = Extractor::new(&source)
        .extract(&repo(), &main_branch(), 5)
        .await
        .unwrap_err();
    assert!(matches!(
        err,
        ExtractError::Source(SourceError::BranchNotFound { .. })
    ));
}

#[tokio::test]
async fn stream_failure_is_not_treated_as_a_skip() {
    let source = ScriptedSource::new(vec![
        Step::Commit(commit(1)),
        Step::Fail("connection reset"),
        Step::Commit(commit(3)),
    ]);
    let err = Extractor::new(&source)
        .extract(&repo(), &main_branch(), 3)
        .await
        .unwrap_err();
    assert!(matches!(
        err,
        ExtractError::Source(SourceError::Transport { .. })
    ));
}

#[tokio::test]
async fn progress_is_reported_at_interval_and_on_finish() {
    let seen = Mutex::new(Vec::new());
    let observer = |p: Progress| seen.lock().unwrap().push(p);

    let source = ScriptedSource::of_commits(7);
    Extractor::new(&source)
        .with_progress(&observer, 3)
        .extract(&repo(), &main_branch(), 10)
        .await
        .unwrap();

    let seen = seen.into_inner().unwrap();
    let processed: Vec<usize> = seen.iter().map(|p| p.processed).collect();
    assert_eq!(processed, vec![3, 6, 7]);
    assert!(seen.last().unwrap().finished);
    assert!(!seen[0].finished);
}
