use std::str::FromStr;

use async_trait::async_trait;
use pipeline::{
    ConflictPolicy, ExtractionResult, NormalizedRecord, RelationalSink, RowsAffected, SinkError,
    TableName,
};
use sqlx::sqlite::{SqliteConnectOptions, SqlitePool, SqlitePoolOptions};
use tracing::{debug, info};

use crate::schema;

/// Default table for mirrored commits.
pub const DEFAULT_TABLE: &str = "raw_commits";

/// SQLite-backed [`RelationalSink`].
///
/// Holds a single-connection pool between `connect` and `close`.
pub struct SqliteMirror {
    url: String,
    table: TableName,
    pool: Option<SqlitePool>,
    schema_ready: bool,
}

impl SqliteMirror {
    /// Prepares a mirror for `url` (e.g. `sqlite://data/commits.db`).
    ///
    /// No connection is made until [`RelationalSink::connect`].
    ///
    /// # Errors
    ///
    /// [`SinkError::InvalidTable`] if `table` is not a plain SQL identifier.
    pub fn new(url: impl Into<String>, table: TableName) -> Result<Self, SinkError> {
        schema::validate_table(&table)?;
        Ok(Self {
            url: url.into(),
            table,
            pool: None,
            schema_ready: false,
        })
    }

    fn pool(&self, operation: &'static str) -> Result<SqlitePool, SinkError> {
        self.pool
            .clone()
            .ok_or(SinkError::NotConnected { operation })
    }

    fn ready_pool(&self, operation: &'static str) -> Result<SqlitePool, SinkError> {
        if !self.schema_ready {
            return Err(SinkError::NotConnected { operation });
        }
        self.pool(operation)
    }
}

fn load_error(e: sqlx::Error) -> SinkError {
    SinkError::Load {
        message: e.to_string(),
    }
}

fn as_sql_int(field: &str, value: u64) -> Result<i64, SinkError> {
    i64::try_from(value).map_err(|_| SinkError::Load {
        message: format!("{field} = {value} does not fit an INTEGER column"),
    })
}

/// The four count columns, converted for binding.
fn sql_counts(record: &NormalizedRecord) -> Result<[i64; 4], SinkError> {
    Ok([
        as_sql_int("files_changed", record.files_changed())?,
        as_sql_int("lines_added", record.lines_added())?,
        as_sql_int("lines_deleted", record.lines_deleted())?,
        as_sql_int("total_changes", record.total_changes())?,
    ])
}

#[async_trait]
impl RelationalSink for SqliteMirror {
    async fn connect(&mut self) -> Result<(), SinkError> {
        let connection_error = |e: sqlx::Error| SinkError::Connection {
            message: e.to_string(),
        };

        let options = SqliteConnectOptions::from_str(&self.url)
            .map_err(connection_error)?
            .create_if_missing(true);
        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .connect_with(options)
            .await
            .map_err(connection_error)?;

        sqlx::query("SELECT 1")
            .execute(&pool)
            .await
            .map_err(connection_error)?;

        debug!(url = %self.url, "Connected to relational mirror");
        self.pool = Some(pool);
        self.schema_ready = false;
        Ok(())
    }

    async fn ensure_schema(&mut self) -> Result<(), SinkError> {
        let pool = self.pool("ensure_schema")?;
        sqlx::query(&schema::create_table(&self.table))
            .execute(&pool)
            .await
            .map_err(|e| SinkError::Schema {
                message: e.to_string(),
            })?;
        self.schema_ready = true;
        debug!(table = %self.table, "Mirror table ready");
        Ok(())
    }

    async fn load(
        &mut self,
        result: &ExtractionResult,
        policy: ConflictPolicy,
    ) -> Result<RowsAffected, SinkError> {
        let pool = self.ready_pool("load")?;
        let sql = schema::insert(&self.table, policy);
        let mut rows = RowsAffected::default();

        let mut tx = pool.begin().await.map_err(load_error)?;
        for record in result.records() {
            let [files, added, deleted, total] = sql_counts(record)?;
            let outcome = sqlx::query(&sql)
                .bind(record.commit_hash().as_str())
                .bind(record.author())
                .bind(record.author_name())
                .bind(record.timestamp().as_datetime())
                .bind(record.message())
                .bind(files)
                .bind(added)
                .bind(deleted)
                .bind(total)
                .bind(record.extracted_at().as_datetime())
                .execute(&mut *tx)
                .await;

            match outcome {
                Ok(done) if done.rows_affected() == 0 => rows.rejected += 1,
                Ok(_) => rows.written += 1,
                Err(sqlx::Error::Database(db)) if db.is_unique_violation() => {
                    tx.rollback().await.map_err(load_error)?;
                    return Err(SinkError::DuplicateCommit {
                        hash: record.commit_hash().clone(),
                    });
                }
                // Dropping `tx` rolls back.
                Err(e) => return Err(load_error(e)),
            }
        }
        tx.commit().await.map_err(load_error)?;

        info!(
            table = %self.table,
            %policy,
            written = rows.written,
            rejected = rows.rejected,
            "Loaded commits into mirror"
        );
        Ok(rows)
    }

    async fn record_count(&mut self) -> Result<u64, SinkError> {
        let pool = self.pool("record_count")?;
        let count: i64 = sqlx::query_scalar(&schema::count(&self.table))
            .fetch_one(&pool)
            .await
            .map_err(load_error)?;
        Ok(u64::try_from(count).unwrap_or(0))
    }

    async fn close(&mut self) {
        self.schema_ready = false;
        if let Some(pool) = self.pool.take() {
            pool.close().await;
            debug!("Relational mirror connection closed");
        }
    }
}
