//! GitHub JSON payloads and their mapping onto [`CommitHandle`].

use pipeline::{AuthorSignature, CommitDetail, CommitHandle, FileSummary, LineStats};
use serde::Deserialize;
use serde_json::Value;

/// Files returned per page of the single-commit endpoint when paginating.
pub(crate) const FILES_PER_PAGE: usize = 100;

/// GitHub lists at most 3000 files for one commit.
pub(crate) const MAX_FILE_PAGES: u32 = 30;

/// One element of the commit list, or the body of the single-commit endpoint.
///
/// The list endpoint omits `stats` and `files`.
#[derive(Debug, Clone, Deserialize)]
pub(crate) struct CommitPayload {
    pub sha: String,
    pub commit: GitCommit,
    #[serde(default)]
    pub stats: Option<StatsPayload>,
    #[serde(default)]
    pub files: Option<Vec<FilePayload>>,
}

#[derive(Debug, Clone, Deserialize)]
pub(crate) struct GitCommit {
    #[serde(default)]
    pub author: Option<GitActor>,
    #[serde(default)]
    pub message: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub(crate) struct GitActor {
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub date: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub(crate) struct StatsPayload {
    #[serde(default)]
    pub additions: Option<i64>,
    #[serde(default)]
    pub deletions: Option<i64>,
}

#[derive(Debug, Clone, Deserialize)]
pub(crate) struct FilePayload {
    pub filename: String,
}

/// A later page of the single-commit endpoint. Only the file listing changes
/// between pages.
#[derive(Debug, Clone, Default, Deserialize)]
pub(crate) struct FilesPage {
    #[serde(default)]
    pub files: Vec<FilePayload>,
}

#[derive(Debug, Clone, Deserialize)]
pub(crate) struct RepositoryPayload {
    pub full_name: String,
    #[serde(default)]
    pub default_branch: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub(crate) struct RateLimitPayload {
    pub resources: RateLimitResources,
}

#[derive(Debug, Clone, Deserialize)]
pub(crate) struct RateLimitResources {
    pub core: RateLimitWindow,
}

#[derive(Debug, Clone, Deserialize)]
pub(crate) struct RateLimitWindow {
    pub limit: u64,
    pub remaining: u64,
}

/// An element of a commit-list page.
#[derive(Debug, Clone)]
pub(crate) enum ListedCommit {
    Parsed(CommitPayload),
    /// The element did not match the expected shape. `sha` is empty when the
    /// element carried none.
    Malformed { sha: String, reason: String },
}

/// Decodes a commit-list page element by element, so one odd entry cannot
/// take down the rest of the page.
pub(crate) fn decode_page(page: Vec<Value>) -> Vec<ListedCommit> {
    page.into_iter().map(decode_listed).collect()
}

fn decode_listed(value: Value) -> ListedCommit {
    let sha = value
        .get("sha")
        .and_then(Value::as_str)
        .unwrap_or_default()
        .to_string();
    match serde_json::from_value::<CommitPayload>(value) {
        Ok(payload) => ListedCommit::Parsed(payload),
        Err(e) => ListedCommit::Malformed {
            sha,
            reason: format!("malformed commit list entry: {e}"),
        },
    }
}

/// Running count over the file pages of one commit.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub(crate) struct FileTally {
    count: usize,
    pages: u32,
    last_len: usize,
}

impl FileTally {
    pub(crate) fn record(&mut self, len: usize) {
        self.count += len;
        self.pages += 1;
        self.last_len = len;
    }

    /// The next page to request, or `None` once a short page was seen or the
    /// listing cap is reached.
    pub(crate) fn next_page(&self) -> Option<u32> {
        (self.pages > 0 && self.pages < MAX_FILE_PAGES && self.last_len == FILES_PER_PAGE)
            .then_some(self.pages + 1)
    }

    pub(crate) fn total(&self) -> i64 {
        i64::try_from(self.count).unwrap_or(i64::MAX)
    }
}

/// A fetched single-commit payload plus the file count across all its pages.
#[derive(Debug, Clone)]
pub(crate) struct FetchedDetail {
    pub payload: CommitPayload,
    /// `None` when the payload carried no file listing at all.
    pub total_files: Option<i64>,
}

impl FetchedDetail {
    /// Wraps a payload whose listing fits on one page.
    #[cfg(test)]
    pub(crate) fn single_page(payload: CommitPayload) -> Self {
        let total_files = payload
            .files
            .as_ref()
            .map(|files| i64::try_from(files.len()).unwrap_or(i64::MAX));
        Self {
            payload,
            total_files,
        }
    }
}

/// Builds the handle for one commit.
///
/// Identity and message come from the detail payload when it was fetched,
/// otherwise from the list entry. A failed detail fetch yields
/// [`CommitDetail::Unavailable`].
pub(crate) fn to_handle(
    listed: CommitPayload,
    detail: Result<FetchedDetail, String>,
) -> CommitHandle {
    let (payload, detail) = match detail {
        Ok(FetchedDetail {
            payload,
            total_files,
        }) => {
            let stats = payload.stats.as_ref().and_then(|s| {
                Some(LineStats {
                    additions: s.additions?,
                    deletions: s.deletions?,
                })
            });
            let files = FileSummary {
                total: total_files,
                listed: payload
                    .files
                    .as_ref()
                    .map(|files| files.iter().map(|f| f.filename.clone()).collect()),
            };
            (payload, CommitDetail::Available { stats, files })
        }
        Err(reason) => (listed, CommitDetail::Unavailable { reason }),
    };

    CommitHandle {
        sha: payload.sha,
        author: payload.commit.author.map(|a| AuthorSignature {
            email: a.email,
            name: a.name,
            date: a.date,
        }),
        message: payload.commit.message,
        detail,
    }
}
