//! GitHub infrastructure adapter.
//!
//! Implements [`pipeline::CommitSource`] over the GitHub REST API v3.
//!
//! ## Architectural Layer
//!
//! **Infrastructure.** This crate must not contain domain rules. All GitHub
//! API details (authentication, pagination, rate limiting, retries) are
//! handled here; the [`pipeline`] crate never sees them.
//!
//! ## Request flow
//!
//! | Step | Endpoint | Failure |
//! |------|----------|---------|
//! | open | `GET /repos/{owner}/{repo}` | 404 → `RepositoryNotFound` |
//! | open | `GET /repos/{owner}/{repo}/branches/{branch}` | 404 → `BranchNotFound` |
//! | page | `GET /repos/{owner}/{repo}/commits?sha={branch}&page=N` | fatal |
//! | commit | `GET /repos/{owner}/{repo}/commits/{sha}` | commit yielded without details |
//!
//! Pages are requested only when the consumer asks for the next commit.

mod client;
mod models;
mod source;

pub use client::{GithubConfig, DEFAULT_API_URL};
pub use source::GithubCommitSource;
