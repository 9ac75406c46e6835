//! In-memory fakes of the pipeline ports.

#![allow(dead_code)]

use std::path::Path;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use pipeline::{
    BranchName, CommitHandle, CommitSource, CommitStream, ConflictPolicy, ExportError,
    ExportSummary, ExtractionResult, FileSink, RelationalSink, RepositorySlug, RowsAffected,
    SinkError, SourceError,
};

pub fn repo() -> RepositorySlug {
    "octocat/Hello-World".parse().unwrap()
}

pub fn main_branch() -> BranchName {
    BranchName::new("main").unwrap()
}

/// A well-formed commit whose hash is derived from `n`.
pub fn commit(n: u32) -> CommitHandle {
    CommitHandle::new(format!("{:040x}", n))
        .with_author(
            Some(format!("dev{}@example.com", n % 3).as_str()),
            Some("Dev"),
            Some(format!("2024-01-{:02}T12:00:00Z", (n % 28) + 1).as_str()),
        )
        .with_message(format!("change #{n}"))
        .with_stats(i64::from(n) * 2, i64::from(n))
        .with_files(Some(i64::from(n % 5) + 1), None)
}

// ---------------------------------------------------------------------------
// Commit source
// ---------------------------------------------------------------------------

#[derive(Clone)]
pub enum Step {
    Commit(CommitHandle),
    /// The stream raises a transport error at this position.
    Fail(&'static str),
}

#[derive(Clone, Copy)]
pub enum OpenFailure {
    Repository,
    Branch,
}

/// Replays a fixed script of commits and failures.
pub struct ScriptedSource {
    steps: Vec<Step>,
    open_failure: Option<OpenFailure>,
    opened: AtomicUsize,
    pulled: Arc<AtomicUsize>,
}

impl ScriptedSource {
    pub fn new(steps: Vec<Step>) -> Self {
        Self {
            steps,
            open_failure: None,
            opened: AtomicUsize::new(0),
            pulled: Arc::new(AtomicUsize::new(0)),
        }
    }

    pub fn of_commits(count: u32) -> Self {
        Self::new((1..=count).map(|n| Step::Commit(commit(n))).collect())
    }

    pub fn failing_open(failure: OpenFailure) -> Self {
        Self {
            open_failure: Some(failure),
            ..Self::new(Vec::new())
        }
    }

    /// Number of `open` calls.
    pub fn opened(&self) -> usize {
        self.opened.load(Ordering::SeqCst)
    }

    /// Number of items handed out by streams (including failures).
    pub fn pulled(&self) -> usize {
        self.pulled.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl CommitSource for ScriptedSource {
    async fn open(
        &self,
        repository: &RepositorySlug,
        branch: &BranchName,
    ) -> Result<Box<dyn CommitStream>, SourceError> {
        self.opened.fetch_add(1, Ordering::SeqCst);
        match self.open_failure {
            Some(OpenFailure::Repository) => Err(SourceError::RepositoryNotFound {
                repository: repository.clone(),
            }),
            Some(OpenFailure::Branch) => Err(SourceError::BranchNotFound {
                repository: repository.clone(),
                branch: branch.clone(),
            }),
            None => Ok(Box::new(ScriptedStream {
                steps: self.steps.clone().into_iter(),
                pulled: Arc::clone(&self.pulled),
            })),
        }
    }
}

struct ScriptedStream {
    steps: std::vec::IntoIter<Step>,
    pulled: Arc<AtomicUsize>,
}

#[async_trait]
impl CommitStream for ScriptedStream {
    async fn next_commit(&mut self) -> Result<Option<CommitHandle>, SourceError> {
        match self.steps.next() {
            Some(step) => {
                self.pulled.fetch_add(1, Ordering::SeqCst);
                match step {
                    Step::Commit(handle) => Ok(Some(handle)),
                    Step::Fail(message) => Err(SourceError::Transport {
                        message: message.to_string(),
                    }),
                }
            }
            None => Ok(None),
        }
    }
}

// ---------------------------------------------------------------------------
// File sink
// ---------------------------------------------------------------------------

/// Captures the exported hashes instead of writing a file.
#[derive(Default)]
pub struct MemoryFileSink {
    pub fail: bool,
    pub exported: Mutex<Vec<String>>,
}

impl FileSink for MemoryFileSink {
    fn export(
        &self,
        result: &ExtractionResult,
        destination: &Path,
    ) -> Result<ExportSummary, ExportError> {
        if self.fail {
            return Err(ExportError::Write {
                path: destination.to_path_buf(),
                reason: "disk full".into(),
            });
        }
        let mut exported = self.exported.lock().unwrap();
        exported.clear();
        exported.extend(result.records().iter().map(|r| r.commit_hash().to_string()));
        Ok(ExportSummary {
            path: destination.to_path_buf(),
            rows: result.len(),
        })
    }
}

// ---------------------------------------------------------------------------
// Relational sink
// ---------------------------------------------------------------------------

#[derive(Clone, Copy, PartialEq, Eq)]
pub enum MirrorFailure {
    Connect,
    Schema,
    Load,
}

/// Records the calls it receives and fails at a chosen step.
#[derive(Default)]
pub struct RecordingMirror {
    pub fail_at: Option<MirrorFailure>,
    pub calls: Vec<&'static str>,
    pub loaded: Vec<String>,
    pub policy: Option<ConflictPolicy>,
    connected: bool,
}

impl RecordingMirror {
    pub fn failing_at(step: MirrorFailure) -> Self {
        Self {
            fail_at: Some(step),
            ..Self::default()
        }
    }
}

#[async_trait]
impl RelationalSink for RecordingMirror {
    async fn connect(&mut self) -> Result<(), SinkError> {
        self.calls.push("connect");
        if self.fail_at == Some(MirrorFailure::Connect) {
            return Err(SinkError::Connection {
                message: "connection refused".into(),
            });
        }
        self.connected = true;
        Ok(())
    }

    async fn ensure_schema(&mut self) -> Result<(), SinkError> {
        self.calls.push("ensure_schema");
        if self.fail_at == Some(MirrorFailure::Schema) {
            return Err(SinkError::Schema {
                message: "permission denied".into(),
            });
        }
        Ok(())
    }

    async fn load(
        &mut self,
        result: &ExtractionResult,
        policy: ConflictPolicy,
    ) -> Result<RowsAffected, SinkError> {
        self.calls.push("load");
        if !self.connected {
            return Err(SinkError::NotConnected { operation: "load" });
        }
        if self.fail_at == Some(MirrorFailure::Load) {
            return Err(SinkError::Load {
                message: "disk I/O error".into(),
            });
        }
        self.policy = Some(policy);
        self.loaded = result
            .records()
            .iter()
            .map(|r| r.commit_hash().to_string())
            .collect();
        Ok(RowsAffected {
            written: result.len() as u64,
            rejected: 0,
        })
    }

    async fn record_count(&mut self) -> Result<u64, SinkError> {
        self.calls.push("record_count");
        Ok(self.loaded.len() as u64)
    }

    async fn close(&mut self) {
        self.calls.push("close");
        self.connected = false;
    }
}
