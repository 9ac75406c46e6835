//! Relational mirror adapter.
//!
//! Implements [`pipeline::RelationalSink`] on SQLite through `sqlx`. The
//! mirror is a convenience copy of the CSV export: the orchestrator treats
//! every failure here as non-fatal.
//!
//! Each `load` runs in one transaction. How an already-stored `commit_hash`
//! is handled depends on [`pipeline::ConflictPolicy`].

mod mirror;
mod schema;

pub use mirror::{SqliteMirror, DEFAULT_TABLE};
