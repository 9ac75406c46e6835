//! [`CommitSource`] implementation over the REST API.

use std::collections::VecDeque;
use std::sync::Arc;

use async_trait::async_trait;
use pipeline::{
    BranchName, CommitHandle, CommitSource, CommitStream, RepositorySlug, SourceError,
};
use serde::de::DeserializeOwned;
use serde_json::Value;
use tracing::{debug, info, warn};

use crate::client::{decode, is_not_found, ApiClient, GithubConfig, Transport};
use crate::models::{
    decode_page, to_handle, CommitPayload, FetchedDetail, FileTally, FilesPage, ListedCommit,
    RateLimitPayload, RepositoryPayload, FILES_PER_PAGE,
};

/// Reads a branch's history from GitHub, newest first.
pub struct GithubCommitSource {
    transport: Arc<dyn Transport>,
    authenticated: bool,
    per_page: u8,
}

impl GithubCommitSource {
    /// # Errors
    ///
    /// [`SourceError::Transport`] if the API URL is invalid or the HTTP client
    /// cannot be built.
    pub fn new(config: GithubConfig) -> Result<Self, SourceError> {
        let client = ApiClient::new(&config)?;
        Ok(Self {
            authenticated: client.is_authenticated(),
            transport: Arc::new(client),
            per_page: config.per_page.clamp(1, 100),
        })
    }

    #[cfg(test)]
    fn with_transport(transport: Arc<dyn Transport>, per_page: u8) -> Self {
        Self {
            transport,
            authenticated: true,
            per_page,
        }
    }

    /// Logs the remaining core quota. Failures are logged and ignored.
    pub async fn log_rate_limit(&self) {
        if !self.authenticated {
            warn!("No GitHub token configured; anonymous access is limited to 60 requests/hour");
        }
        let url = match self.transport.endpoint(&["rate_limit"]) {
            Ok(url) => url,
            Err(e) => {
                warn!(error = %e, "Could not build rate limit URL");
                return;
            }
        };
        match fetch::<RateLimitPayload>(self.transport.as_ref(), &url, &[]).await {
            Ok(payload) => info!(
                remaining = payload.resources.core.remaining,
                limit = payload.resources.core.limit,
                "GitHub rate limit"
            ),
            Err(e) => warn!(error = %e, "Could not read GitHub rate limit"),
        }
    }
}

async fn fetch<T: DeserializeOwned>(
    transport: &dyn Transport,
    url: &reqwest::Url,
    query: &[(&str, String)],
) -> Result<T, SourceError> {
    decode(transport.get_value(url, query).await?)
}

/// A 404 on the repository lookup means the repository does not exist (or is
/// invisible to the token).
fn repository_lookup_error(err: SourceError, repository: &RepositorySlug) -> SourceError {
    if is_not_found(&err) {
        SourceError::RepositoryNotFound {
            repository: repository.clone(),
        }
    } else {
        err
    }
}

fn branch_lookup_error(
    err: SourceError,
    repository: &RepositorySlug,
    branch: &BranchName,
) -> SourceError {
    if is_not_found(&err) {
        SourceError::BranchNotFound {
            repository: repository.clone(),
            branch: branch.clone(),
        }
    } else {
        err
    }
}

/// Splits detail failures into per-commit ones (`Ok(Err(reason))`) and those
/// that end the run. Only unexpected HTTP responses are per-commit.
fn per_commit_failure<T>(
    result: Result<T, SourceError>,
    sha: &str,
) -> Result<Result<T, String>, SourceError> {
    match result {
        Ok(value) => Ok(Ok(value)),
        Err(e @ SourceError::UnexpectedResponse { .. }) => {
            warn!(sha, error = %e, "Commit details unavailable");
            Ok(Err(e.to_string()))
        }
        Err(e) => Err(e),
    }
}

#[async_trait]
impl CommitSource for GithubCommitSource {
    async fn open(
        &self,
        repository: &RepositorySlug,
        branch: &BranchName,
    ) -> Result<Box<dyn CommitStream>, SourceError> {
        let transport = self.transport.as_ref();
        let url = transport.endpoint(&["repos", repository.owner(), repository.name()])?;
        let repo = fetch::<RepositoryPayload>(transport, &url, &[])
            .await
            .map_err(|e| repository_lookup_error(e, repository))?;
        info!(
            repository = %repo.full_name,
            default_branch = repo.default_branch.as_deref().unwrap_or("?"),
            "Connected to repository"
        );

        let url = transport.endpoint(&[
            "repos",
            repository.owner(),
            repository.name(),
            "branches",
            branch.as_str(),
        ])?;
        transport
            .get_value(&url, &[])
            .await
            .map_err(|e| branch_lookup_error(e, repository, branch))?;

        Ok(Box::new(GithubCommitStream {
            transport: Arc::clone(&self.transport),
            repository: repository.clone(),
            branch: branch.clone(),
            per_page: self.per_page,
            next_page: 1,
            buffer: VecDeque::new(),
            exhausted: false,
        }))
    }
}

/// Lazily paginated commit list.
///
/// A page is fetched only when the buffer is empty and another commit is
/// requested, so stopping early never costs an extra page.
struct GithubCommitStream {
    transport: Arc<dyn Transport>,
    repository: RepositorySlug,
    branch: BranchName,
    per_page: u8,
    next_page: u32,
    buffer: VecDeque<ListedCommit>,
    exhausted: bool,
}

impl GithubCommitStream {
    async fn fill(&mut self) -> Result<(), SourceError> {
        let url = self.transport.endpoint(&[
            "repos",
            self.repository.owner(),
            self.repository.name(),
            "commits",
        ])?;
        let query = [
            ("sha", self.branch.to_string()),
            ("per_page", self.per_page.to_string()),
            ("page", self.next_page.to_string()),
        ];
        let page: Vec<Value> = fetch(self.transport.as_ref(), &url, &query).await?;
        debug!(page = self.next_page, commits = page.len(), "Fetched commit page");

        if page.len() < usize::from(self.per_page) {
            self.exhausted = true;
        }
        self.next_page += 1;
        self.buffer.extend(decode_page(page));
        Ok(())
    }

    /// Fetches stats and every page of the file listing.
    async fn detail(&self, sha: &str) -> Result<Result<FetchedDetail, String>, SourceError> {
        let transport = self.transport.as_ref();
        let url = transport.endpoint(&[
            "repos",
            self.repository.owner(),
            self.repository.name(),
            "commits",
            sha,
        ])?;
        let query = |page: u32| {
            [
                ("per_page", FILES_PER_PAGE.to_string()),
                ("page", page.to_string()),
            ]
        };

        let first = fetch::<CommitPayload>(transport, &url, &query(1)).await;
        let payload = match per_commit_failure(first, sha)? {
            Ok(payload) => payload,
            Err(reason) => return Ok(Err(reason)),
        };
        let Some(first_len) = payload.files.as_ref().map(Vec::len) else {
            return Ok(Ok(FetchedDetail {
                payload,
                total_files: None,
            }));
        };

        let mut tally = FileTally::default();
        tally.record(first_len);
        while let Some(page) = tally.next_page() {
            let more = fetch::<FilesPage>(transport, &url, &query(page)).await;
            match per_commit_failure(more, sha)? {
                Ok(more) => tally.record(more.files.len()),
                Err(reason) => return Ok(Err(reason)),
            }
            debug!(sha, page, "Fetched commit file page");
        }
        Ok(Ok(FetchedDetail {
            payload,
            total_files: Some(tally.total()),
        }))
    }
}

#[async_trait]
impl CommitStream for GithubCommitStream {
    async fn next_commit(&mut self) -> Result<Option<CommitHandle>, SourceError> {
        if self.buffer.is_empty() && !self.exhausted {
            self.fill().await?;
        }
        match self.buffer.pop_front() {
            None => Ok(None),
            Some(ListedCommit::Malformed { sha, reason }) => {
                warn!(sha = %sha, reason = %reason, "Skipping malformed commit list entry");
                Ok(Some(CommitHandle::new(sha).with_unavailable_detail(reason)))
            }
            Some(ListedCommit::Parsed(listed)) => {
                let detail = self.detail(&listed.sha).await?;
                Ok(Some(to_handle(listed, detail)))
            }
        }
    }
}
