use std::path::{Path, PathBuf};

use clap::Parser;
use pipeline::ConflictPolicy;

use crate::logging::LogFormat;

/// Configuration file read when `--config` is not given. Its absence is not an error.
pub const DEFAULT_CONFIG_PATH: &str = "config/config.yaml";

/// Extract commit history from GitHub into a CSV file and an optional SQLite mirror.
#[derive(Parser, Debug, Default)]
#[command(name = "commit-ingest", version, about, long_about = None)]
pub struct Args {
    /// YAML configuration file [default: config/config.yaml]
    #[arg(long)]
    pub config: Option<PathBuf>,

    /// Repository owner (user or organisation)
    #[arg(long)]
    pub owner: Option<String>,

    /// Repository name
    #[arg(long)]
    pub name: Option<String>,

    /// Branch to read history from
    #[arg(long)]
    pub branch: Option<String>,

    /// Maximum number of commits to consume
    #[arg(long)]
    pub max_commits: Option<usize>,

    /// Destination of the CSV export
    #[arg(long)]
    pub output: Option<PathBuf>,

    /// GitHub personal access token
    #[arg(long, env = "GITHUB_TOKEN", hide_env_values = true)]
    pub github_token: Option<String>,

    /// GitHub API root (for GitHub Enterprise)
    #[arg(long)]
    pub github_api_url: Option<String>,

    /// SQLite connection string for the relational mirror
    #[arg(long, env = "DATABASE_URL", hide_env_values = true)]
    pub database_url: Option<String>,

    /// Table the mirror writes into
    #[arg(long)]
    pub table: Option<String>,

    /// How the mirror treats commits it already stores: reject, abort, or upsert
    #[arg(long)]
    pub conflict_policy: Option<ConflictPolicy>,

    /// Skip the relational mirror even if a database URL is configured
    #[arg(long)]
    pub no_database: bool,

    /// Log output format
    #[arg(long, value_enum, default_value_t = LogFormat::Text)]
    pub log_format: LogFormat,

    /// Also append logs to this file
    #[arg(long)]
    pub log_file: Option<PathBuf>,
}

impl Args {
    /// The configuration file to read, and whether it must exist.
    pub fn config_file(&self) -> (&Path, bool) {
        match &self.config {
            Some(path) => (path, true),
            None => (Path::new(DEFAULT_CONFIG_PATH), false),
        }
    }
}
