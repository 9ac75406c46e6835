//! Table naming and SQL text for the commit mirror.

use pipeline::{ConflictPolicy, SinkError, TableName, RECORD_COLUMNS};

/// Longest table name accepted (PostgreSQL's limit, kept for portability).
const MAX_IDENTIFIER_LEN: usize = 63;

/// Accepts `[A-Za-z_][A-Za-z0-9_]*` up to [`MAX_IDENTIFIER_LEN`] bytes.
pub(crate) fn validate_table(name: &TableName) -> Result<(), SinkError> {
    let s = name.as_str();
    let mut chars = s.chars();
    let head_ok = chars
        .next()
        .is_some_and(|c| c.is_ascii_alphabetic() || c == '_');
    let tail_ok = chars.all(|c| c.is_ascii_alphanumeric() || c == '_');
    if head_ok && tail_ok && s.len() <= MAX_IDENTIFIER_LEN {
        Ok(())
    } else {
        Err(SinkError::InvalidTable {
            name: s.to_string(),
        })
    }
}

pub(crate) fn create_table(table: &TableName) -> String {
    format!(
        r#"CREATE TABLE IF NOT EXISTS "{table}" (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    commit_hash VARCHAR(40) UNIQUE NOT NULL,
    author TEXT,
    author_name TEXT,
    timestamp TIMESTAMP,
    message TEXT,
    files_changed INTEGER,
    lines_added INTEGER,
    lines_deleted INTEGER,
    total_changes INTEGER,
    extracted_at TIMESTAMP,
    created_at TIMESTAMP DEFAULT CURRENT_TIMESTAMP
)"#
    )
}

/// `INSERT` for one record; parameters bind in [`RECORD_COLUMNS`] order.
pub(crate) fn insert(table: &TableName, policy: ConflictPolicy) -> String {
    let columns = RECORD_COLUMNS.join(", ");
    let params = (1..=RECORD_COLUMNS.len())
        .map(|i| format!("?{i}"))
        .collect::<Vec<_>>()
        .join(", ");
    let base = format!(r#"INSERT INTO "{table}" ({columns}) VALUES ({params})"#);

    match policy {
        ConflictPolicy::Abort => base,
        ConflictPolicy::Reject => format!("{base} ON CONFLICT(commit_hash) DO NOTHING"),
        ConflictPolicy::Upsert => {
            let updates = RECORD_COLUMNS
                .iter()
                .filter(|c| **c != "commit_hash")
                .map(|c| format!("{c} = excluded.{c}"))
                .collect::<Vec<_>>()
                .join(", ");
            format!("{base} ON CONFLICT(commit_hash) DO UPDATE SET {updates}")
        }
    }
}

pub(crate) fn count(table: &TableName) -> String {
    format!(r#"SELECT COUNT(*) FROM "{table}""#)
}
