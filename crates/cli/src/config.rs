//! YAML configuration and its merge with command-line flags.
//!
//! Precedence, highest first: flag, environment variable (`GITHUB_TOKEN`,
//! `DATABASE_URL`), YAML file, built-in default. Any YAML string of the
//! form `${VAR}` or `${VAR:default}` is replaced by the variable's value.

use std::io;
use std::path::{Path, PathBuf};
use std::time::Duration;

use github::{GithubConfig, DEFAULT_API_URL};
use pipeline::{BranchName, ConflictPolicy, RepositorySlug, TableName};
use serde::Deserialize;
use serde_yaml::Value;
use thiserror::Error;

use crate::args::Args;

const DEFAULT_BRANCH: &str = "main";
const DEFAULT_MAX_COMMITS: usize = 1000;
const DEFAULT_OUTPUT: &str = "data/raw/commits.csv";

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("cannot read {}: {source}", .path.display())]
    Read { path: PathBuf, source: io::Error },

    #[error("invalid configuration in {}: {source}", .path.display())]
    Yaml {
        path: PathBuf,
        source: serde_yaml::Error,
    },

    #[error("environment variable {name} is not set and has no default")]
    UnsetVariable { name: String },

    #[error("missing {key}: set it in the config file or pass {flag}")]
    Missing {
        key: &'static str,
        flag: &'static str,
    },

    #[error("invalid {key}: {reason}")]
    Invalid { key: &'static str, reason: String },
}

// ---------------------------------------------------------------------------
// File layout
// ---------------------------------------------------------------------------

/// The recognised parts of the YAML file. Other top-level sections are ignored.
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct FileConfig {
    pub data_ingestion: IngestionSection,
    pub github: GithubSection,
    pub database: DatabaseSection,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct IngestionSection {
    pub repo_owner: Option<String>,
    pub repo_name: Option<String>,
    pub branch: Option<String>,
    pub max_commits: Option<usize>,
    pub raw_data_path: Option<PathBuf>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct GithubSection {
    pub token: Option<String>,
    pub api_url: Option<String>,
    pub max_retries: Option<u32>,
    pub max_wait_secs: Option<u64>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct DatabaseSection {
    pub url: Option<String>,
    pub table: Option<String>,
    pub conflict_policy: Option<ConflictPolicy>,
}

/// Reads `path`. A missing file yields the empty configuration unless `required`.
pub fn load_file(path: &Path, required: bool) -> Result<FileConfig, ConfigError> {
    let text = match std::fs::read_to_string(path) {
        Ok(text) => text,
        Err(e) if !required && e.kind() == io::ErrorKind::NotFound => {
            return Ok(FileConfig::default())
        }
        Err(source) => {
            return Err(ConfigError::Read {
                path: path.to_path_buf(),
                source,
            })
        }
    };
    parse(&text, path, &|name| std::env::var(name).ok())
}

fn parse(
    text: &str,
    path: &Path,
    env: &dyn Fn(&str) -> Option<String>,
) -> Result<FileConfig, ConfigError> {
    let yaml_error = |source| ConfigError::Yaml {
        path: path.to_path_buf(),
        source,
    };

    let mut value: Value = serde_yaml::from_str(text).map_err(yaml_error)?;
    if value.is_null() {
        return Ok(FileConfig::default());
    }
    resolve_placeholders(&mut value, env)?;
    serde_yaml::from_value(value).map_err(yaml_error)
}

/// Replaces `${VAR}` / `${VAR:default}` strings in place.
///
/// A substituted value that reads as a YAML number or boolean takes that
/// type, so `max_commits: ${MAX_COMMITS:500}` still deserializes as an integer.
fn resolve_placeholders(
    value: &mut Value,
    env: &dyn Fn(&str) -> Option<String>,
) -> Result<(), ConfigError> {
    match value {
        Value::Mapping(map) => {
            for (_, v) in map.iter_mut() {
                resolve_placeholders(v, env)?;
            }
        }
        Value::Sequence(items) => {
            for v in items {
                resolve_placeholders(v, env)?;
            }
        }
        Value::String(s) => {
            if let Some(spec) = s.strip_prefix("${").and_then(|r| r.strip_suffix('}')) {
                let (name, default) = match spec.split_once(':') {
                    Some((name, default)) => (name, Some(default)),
                    None => (spec, None),
                };
                let resolved = env(name)
                    .or_else(|| default.map(str::to_string))
                    .ok_or_else(|| ConfigError::UnsetVariable {
                        name: name.to_string(),
                    })?;
                *value = match serde_yaml::from_str::<Value>(&resolved) {
                    Ok(typed @ (Value::Number(_) | Value::Bool(_))) => typed,
                    _ => Value::String(resolved),
                };
            }
        }
        _ => {}
    }
    Ok(())
}

// ---------------------------------------------------------------------------
// Resolved settings
// ---------------------------------------------------------------------------

#[derive(Debug, Clone)]
pub struct DatabaseSettings {
    pub url: String,
    pub table: TableName,
    pub conflict_policy: ConflictPolicy,
}

/// Everything a run needs, validated.
#[derive(Debug, Clone)]
pub struct Settings {
    pub repository: RepositorySlug,
    pub branch: BranchName,
    pub max_commits: usize,
    pub output_path: PathBuf,
    pub github: GithubConfig,
    /// `None` disables the relational mirror.
    pub database: Option<DatabaseSettings>,
}

impl Settings {
    pub fn resolve(args: &Args, file: FileConfig) -> Result<Self, ConfigError> {
        let FileConfig {
            data_ingestion: ingest,
            github: gh,
            database: db,
        } = file;

        let owner = args.owner.clone().or(ingest.repo_owner).ok_or(ConfigError::Missing {
            key: "data_ingestion.repo_owner",
            flag: "--owner",
        })?;
        let name = args.name.clone().or(ingest.repo_name).ok_or(ConfigError::Missing {
            key: "data_ingestion.repo_name",
            flag: "--name",
        })?;
        let repository =
            RepositorySlug::new(owner.as_str(), name.as_str()).ok_or_else(|| {
                ConfigError::Invalid {
                    key: "repository",
                    reason: format!("'{owner}/{name}' is not a valid owner/name pair"),
                }
            })?;

        let branch = args
            .branch
            .clone()
            .or(ingest.branch)
            .unwrap_or_else(|| DEFAULT_BRANCH.to_string());
        let branch = BranchName::new(branch).ok_or(ConfigError::Invalid {
            key: "data_ingestion.branch",
            reason: "branch name is empty".to_string(),
        })?;

        let defaults = GithubConfig::default();
        let github = GithubConfig {
            api_url: args
                .github_api_url
                .clone()
                .or(gh.api_url)
                .unwrap_or_else(|| DEFAULT_API_URL.to_string()),
            max_retries: gh.max_retries.unwrap_or(defaults.max_retries),
            max_wait: gh
                .max_wait_secs
                .map(Duration::from_secs)
                .unwrap_or(defaults.max_wait),
            ..defaults
        }
        .with_token(args.github_token.clone().or(gh.token));

        let database = if args.no_database {
            None
        } else {
            args.database_url
                .clone()
                .or(db.url)
                .filter(|url| !url.trim().is_empty())
                .map(|url| -> Result<_, ConfigError> {
                    let table = args
                        .table
                        .clone()
                        .or(db.table)
                        .unwrap_or_else(|| database::DEFAULT_TABLE.to_string());
                    Ok(DatabaseSettings {
                        url,
                        table: TableName::new(table).ok_or(ConfigError::Invalid {
                            key: "database.table",
                            reason: "table name is empty".to_string(),
                        })?,
                        conflict_policy: args
                            .conflict_policy
                            .or(db.conflict_policy)
                            .unwrap_or_default(),
                    })
                })
                .transpose()?
        };

        Ok(Self {
            repository,
            branch,
            max_commits: args
                .max_commits
                .or(ingest.max_commits)
                .unwrap_or(DEFAULT_MAX_COMMITS),
            output_path: args
                .output
                .clone()
                .or(ingest.raw_data_path)
                .unwrap_or_else(|| PathBuf::from(DEFAULT_OUTPUT)),
            github,
            database,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE: &str = r#"
project:
  name: commit-analytics
data_ingestion:
  repo_owner: octocat
  repo_name: Hello-World
  max_commits: ${MAX_COMMITS:250}
  raw_data_path: out/commits.csv
github:
  token: ghp_PLACEHOLDER
database:
  url: ${DATABASE_FILE}
  conflict_policy: upsert
"#;

    fn env(name: &str) -> Option<String> {
        match name {
            "DATABASE_FILE" => Some("sqlite://data/commits.db".to_string()),
            _ => None,
        }
    }

    fn sample() -> FileConfig {
        parse(SAMPLE, Path::new("config.yaml"), &env).unwrap()
    }

    #[test]
    fn placeholders_resolve_from_environment_or_default() {
        let file = sample();
        assert_eq!(file.data_ingestion.max_commits, Some(250));
        assert_eq!(file.database.url.as_deref(), Some("sqlite://data/commits.db"));
        assert_eq!(file.database.conflict_policy, Some(ConflictPolicy::Upsert));
    }

    #[test]
    fn unset_variable_without_default_is_an_error() {
        let err = parse("database:\n  url: ${NOPE}\n", Path::new("c.yaml"), &|_| None).unwrap_err();
        assert!(matches!(err, ConfigError::UnsetVariable { name } if name == "NOPE"));
    }

    #[test]
    fn empty_file_is_the_default_configuration() {
        let file = parse("", Path::new("c.yaml"), &|_| None).unwrap();
        assert!(file.data_ingestion.repo_owner.is_none());
    }

    #[test]
    fn malformed_yaml_names_the_file() {
        let err = parse("data_ingestion: [", Path::new("broken.yaml"), &|_| None).unwrap_err();
        assert!(err.to_string().contains("broken.yaml"));
    }

    #[test]
    fn missing_default_file_is_tolerated_but_explicit_one_is_not() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("absent.yaml");
        assert!(load_file(&path, false).is_ok());
        assert!(matches!(load_file(&path, true), Err(ConfigError::Read { .. })));
    }

    #[test]
    fn file_values_fill_in_defaults() {
        let settings = Settings::resolve(&Args::default(), sample()).unwrap();

        assert_eq!(settings.repository.to_string(), "octocat/Hello-World");
        assert_eq!(settings.branch.as_str(), "main");
        assert_eq!(settings.max_commits, 250);
        assert_eq!(settings.output_path, PathBuf::from("out/commits.csv"));
        assert_eq!(settings.github.api_url, DEFAULT_API_URL);
        assert_eq!(settings.github.token, None, "placeholder token means anonymous");

        let db = settings.database.unwrap();
        assert_eq!(db.table.as_str(), "raw_commits");
        assert_eq!(db.conflict_policy, ConflictPolicy::Upsert);
    }

    #[test]
    fn flags_override_file_values() {
        let args = Args {
            owner: Some("rust-lang".into()),
            name: Some("rust".into()),
            branch: Some("master".into()),
            max_commits: Some(5),
            github_token: Some("ghp_real".into()),
            conflict_policy: Some(ConflictPolicy::Abort),
            table: Some("commits".into()),
            ..Args::default()
        };
        let settings = Settings::resolve(&args, sample()).unwrap();

        assert_eq!(settings.repository.to_string(), "rust-lang/rust");
        assert_eq!(settings.branch.as_str(), "master");
        assert_eq!(settings.max_commits, 5);
        assert_eq!(settings.github.token.as_deref(), Some("ghp_real"));
        let db = settings.database.unwrap();
        assert_eq!(db.table.as_str(), "commits");
        assert_eq!(db.conflict_policy, ConflictPolicy::Abort);
    }

    #[test]
    fn mirror_can_be_disabled() {
        let args = Args {
            no_database: true,
            ..Args::default()
        };
        assert!(Settings::resolve(&args, sample()).unwrap().database.is_none());

        let no_url = FileConfig {
            database: DatabaseSection::default(),
            ..sample()
        };
        assert!(Settings::resolve(&Args::default(), no_url)
            .unwrap()
            .database
            .is_none());
    }

    #[test]
    fn repository_is_required_and_validated() {
        let err = Settings::resolve(&Args::default(), FileConfig::default()).unwrap_err();
        assert!(matches!(err, ConfigError::Missing { flag: "--owner", .. }));

        let args = Args {
            owner: Some("octo/cat".into()),
            name: Some("repo".into()),
            ..Args::default()
        };
        let err = Settings::resolve(&args, FileConfig::default()).unwrap_err();
        assert!(matches!(err, ConfigError::Invalid { key: "repository", .. }));
    }

    #[test]
    fn blank_branch_is_rejected() {
        let args = Args {
            owner: Some("octocat".into()),
            name: Some("Hello-World".into()),
            branch: Some("  ".into()),
            ..Args::default()
        };
        let err = Settings::resolve(&args, FileConfig::default()).unwrap_err();
        assert!(matches!(err, ConfigError::Invalid { key: "data_ingestion.branch", .. }));
    }
}
