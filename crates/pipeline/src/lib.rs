//! Commit ingestion domain.
//!
//! This crate contains the records, normalization rules, extraction loop,
//! statistics, and orchestration of a commit ingestion run, plus the port
//! traits the infrastructure crates implement.
//!
//! ## Architectural Layer
//!
//! **Business logic + port definitions.** This crate has no network, database,
//! or file-format dependencies. It defines *what* is needed; the `github`,
//! `export`, and `database` crates define *how* to supply it.
//!
//! ## Module Layout
//!
//! | Module | Contents |
//! |--------|----------|
//! | [`identifiers`] | Newtype identifiers (`CommitHash`, `RepositorySlug`, `RunId`, ...) |
//! | [`types`] | Value types (`Timestamp`, `ChangeCounts`) |
//! | [`errors`] | Error taxonomy and retry policy |
//! | [`source`] | Commit source port and the raw `CommitHandle` |
//! | [`records`] | `NormalizedRecord` and `ExtractionResult` |
//! | [`normalize`] | Handle → record rules |
//! | [`extract`] | The bounded, skip-on-failure extraction loop |
//! | [`statistics`] | `summarize` |
//! | [`sinks`] | File and relational sink ports |
//! | [`ingest`] | Extract → export → summarize → mirror |

pub mod errors;
pub mod extract;
pub mod identifiers;
pub mod ingest;
pub mod normalize;
pub mod records;
pub mod sinks;
pub mod source;
pub mod statistics;
pub mod types;

// Re-export everything at the crate root for ergonomic usage by downstream crates.
pub use errors::{
    ExportError, ExtractError, IngestError, NormalizationError, RetryPolicy, SinkError,
    SourceError,
};
pub use extract::{Extractor, Progress, ProgressObserver, DEFAULT_PROGRESS_INTERVAL};
pub use identifiers::{BranchName, CommitHash, RepositorySlug, RunId, TableName};
pub use ingest::{Ingestion, IngestionPlan, IngestionReport, MirrorOutcome};
pub use normalize::normalize;
pub use records::{
    ExtractionResult, NormalizedCommit, NormalizedRecord, SkippedCommit, RECORD_COLUMNS,
    UNKNOWN_AUTHOR,
};
pub use sinks::{ConflictPolicy, ExportSummary, FileSink, RelationalSink, RowsAffected};
pub use source::{
    AuthorSignature, CommitDetail, CommitHandle, CommitSource, CommitStream, FileSummary,
    LineStats,
};
pub use statistics::{summarize, ChangeMeans, DateRange, SummaryStatistics};
pub use types::{ChangeCounts, Timestamp};
