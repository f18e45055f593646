//! # Database Handler (`database`)
//!
//! Runs queries against a SQLite pool and moves [`DataFrame`]s in and out of
//! tables. Every statement targets tables through the handler's schema
//! (`main` for the primary database, or the name of an attached one).

use sqlx::sqlite::{SqlitePool, SqlitePoolOptions, SqliteRow};
use sqlx::{Column, Executor, QueryBuilder, Row, Sqlite, TypeInfo, ValueRef};
use std::collections::HashSet;
use std::fmt;

use crate::frame::{infer_sql_types, DataFrame, FrameError, SqlType, Value};
use crate::utils::format::format_count;

// --- Error Handling ---
#[derive(thiserror::Error, Debug)]
pub enum DatabaseError {
    #[error("Database error: {0}")]
    Sqlx(#[from] sqlx::Error),
    #[error("Invalid identifier: '{0}'")]
    InvalidIdentifier(String),
    #[error("Table '{table}' not found in schema '{schema}'")]
    TableNotFound { schema: String, table: String },
    #[error("Table '{0}' already exists")]
    TableExists(String),
    #[error("chunk_size must be greater than 0")]
    InvalidChunkSize,
    #[error("Frame {index} has columns {got:?}, expected {expected:?}")]
    SchemaMismatch {
        index: usize,
        expected: Vec<String>,
        got: Vec<String>,
    },
    #[error("Frame error: {0}")]
    Frame(#[from] FrameError),
}

/// What [`DatabaseHandler::write_dataframes`] does when the table already exists.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum IfExists {
    #[default]
    Fail,
    Replace,
    Append,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WriteOptions {
    /// Rows per progress step. Wide frames split a chunk into several
    /// `INSERT`s to stay under SQLite's parameter limit.
    pub chunk_size: usize,
    pub if_exists: IfExists,
}

impl Default for WriteOptions {
    fn default() -> Self {
        WriteOptions {
            chunk_size: 1000,
            if_exists: IfExists::Fail,
        }
    }
}

/// Highest number of `?` parameters SQLite accepts in one statement.
const MAX_BOUND_PARAMETERS: usize = 32766;

/// Identifiers are interpolated into SQL, so only `[A-Za-z0-9_]` is accepted.
fn check_identifier(name: &str) -> Result<(), DatabaseError> {
    if name.is_empty() || !name.chars().all(|c| c.is_ascii_alphanumeric() || c == '_') {
        return Err(DatabaseError::InvalidIdentifier(name.to_string()));
    }
    Ok(())
}

/// # DatabaseHandler
///
/// Thin wrapper over a [`SqlitePool`] bound to one schema.
#[derive(Debug, Clone)]
pub struct DatabaseHandler {
    pool: SqlitePool,
    schema: String,
}

impl fmt::Display for DatabaseHandler {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "DatabaseHandler(db=sqlite, schema={})", self.schema)
    }
}

impl DatabaseHandler {
    pub fn new(pool: SqlitePool, schema: impl Into<String>) -> Self {
        DatabaseHandler {
            pool,
            schema: schema.into(),
        }
    }

    /// Opens a pool for `url` (e.g. `sqlite://data.db?mode=rwc`).
    pub async fn connect(url: &str, schema: impl Into<String>) -> Result<Self, DatabaseError> {
        let pool = SqlitePoolOptions::new().max_connections(5).connect(url).await?;
        Ok(DatabaseHandler::new(pool, schema))
    }

    pub fn schema(&self) -> &str {
        &self.schema
    }

    pub fn set_schema(&mut self, schema: impl Into<String>) {
        self.schema = schema.into();
    }

    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }

    fn qualified(&self, table: &str) -> Result<String, DatabaseError> {
        check_identifier(&self.schema)?;
        check_identifier(table)?;
        Ok(format!("\"{}\".\"{}\"", self.schema, table))
    }

    async fn table_exists(&self, table: &str) -> Result<bool, DatabaseError> {
        check_identifier(&self.schema)?;
        check_identifier(table)?;
        let sql = format!(
            "SELECT COUNT(*) FROM \"{}\".sqlite_master WHERE type = 'table' AND name = ?",
            self.schema
        );
        let count: i64 = sqlx::query_scalar(&sql)
            .bind(table)
            .fetch_one(&self.pool)
            .await?;
        Ok(count > 0)
    }

    /// Checks that `table` is a plain identifier naming a table in the schema.
    pub async fn validate_table_name(&self, table: &str) -> Result<(), DatabaseError> {
        if !self.table_exists(table).await? {
            return Err(DatabaseError::TableNotFound {
                schema: self.schema.clone(),
                table: table.to_string(),
            });
        }
        Ok(())
    }

    /// Runs a query and collects every row into a frame.
    pub async fn execute_query(&self, sql: &str) -> Result<DataFrame, DatabaseError> {
        tracing::info!("Executing SQL query: {sql}");
        let rows = sqlx::query(sql).fetch_all(&self.pool).await?;

        let columns: Vec<String> = match rows.first() {
            Some(row) => row.columns().iter().map(|c| c.name().to_string()).collect(),
            None => {
                let described = (&self.pool).describe(sql).await?;
                described
                    .columns()
                    .iter()
                    .map(|c| c.name().to_string())
                    .collect()
            }
        };

        let values = rows
            .iter()
            .map(row_values)
            .collect::<Result<Vec<_>, _>>()?;
        Ok(DataFrame::from_rows(unique_column_names(columns), values)?)
    }

    /// Removes every row from `table`. SQLite has no `TRUNCATE`, so this is a `DELETE`.
    pub async fn empty_table(&self, table: &str) -> Result<(), DatabaseError> {
        self.validate_table_name(table).await?;
        let qualified = self.qualified(table)?;
        tracing::warn!("Emptying table {qualified}...");
        sqlx::query(&format!("DELETE FROM {qualified}"))
            .execute(&self.pool)
            .await?;
        tracing::info!("Table {qualified} emptied.");
        Ok(())
    }

    /// Runs a delete statement in its own transaction and returns the number of rows removed.
    pub async fn delete_records(&self, sql: &str) -> Result<u64, DatabaseError> {
        tracing::info!("Deleting records from table...");
        let mut tx = self.pool.begin().await?;
        let deleted = sqlx::query(sql).execute(&mut *tx).await?.rows_affected();
        tx.commit().await?;
        tracing::info!("Deleted {} records from table.", format_count(deleted));
        Ok(deleted)
    }

    /// Writes `frames` into `table` (lower-cased) and returns the number of rows written.
    ///
    /// All frames must share the same columns. The `if_exists` policy is applied
    /// once, before the first insert; everything runs in a single transaction.
    pub async fn write_dataframes(
        &self,
        table: &str,
        frames: &[DataFrame],
        options: WriteOptions,
    ) -> Result<u64, DatabaseError> {
        if options.chunk_size == 0 {
            return Err(DatabaseError::InvalidChunkSize);
        }
        let table = table.to_lowercase();
        let qualified = self.qualified(&table)?;
        let Some(first) = frames.first() else {
            return Ok(0);
        };
        for (index, frame) in frames.iter().enumerate().skip(1) {
            if frame.columns() != first.columns() {
                return Err(DatabaseError::SchemaMismatch {
                    index,
                    expected: first.columns().to_vec(),
                    got: frame.columns().to_vec(),
                });
            }
        }
        for column in first.columns() {
            check_identifier(column)?;
        }

        let column_types = column_types(frames)?;
        let exists = self.table_exists(&table).await?;

        let mut tx = self.pool.begin().await?;
        match (exists, options.if_exists) {
            (true, IfExists::Fail) => return Err(DatabaseError::TableExists(table)),
            (true, IfExists::Append) => {}
            (true, IfExists::Replace) => {
                sqlx::query(&format!("DROP TABLE {qualified}"))
                    .execute(&mut *tx)
                    .await?;
                sqlx::query(&create_table_sql(&qualified, &column_types))
                    .execute(&mut *tx)
                    .await?;
            }
            (false, _) => {
                sqlx::query(&create_table_sql(&qualified, &column_types))
                    .execute(&mut *tx)
                    .await?;
            }
        }

        let column_list = first
            .columns()
            .iter()
            .map(|c| format!("\"{c}\""))
            .collect::<Vec<_>>()
            .join(", ");

        // A user chunk may need several statements to stay under the bound-parameter limit.
        let rows_per_statement = (MAX_BOUND_PARAMETERS / first.width().max(1)).max(1);

        let mut written = 0u64;
        for frame in frames {
            let rows = frame.height();
            let mut done = 0usize;
            for chunk in frame.rows().chunks(options.chunk_size) {
                for batch in chunk.chunks(rows_per_statement) {
                    let mut builder: QueryBuilder<Sqlite> =
                        QueryBuilder::new(format!("INSERT INTO {qualified} ({column_list}) "));
                    builder.push_values(batch, |mut b, row| {
                        for value in row {
                            match value {
                                Value::Null => b.push_bind(None::<String>),
                                Value::Bool(v) => b.push_bind(*v),
                                Value::Int(v) => b.push_bind(*v),
                                Value::Float(v) => b.push_bind(*v),
                                Value::Text(v) => b.push_bind(v.clone()),
                            };
                        }
                    });
                    builder.build().execute(&mut *tx).await?;
                }

                done += chunk.len();
                tracing::info!(
                    "Writing {} rows to {}: {:>3.0}% ({}/{})",
                    format_count(rows as u64),
                    table,
                    done as f64 * 100.0 / rows as f64,
                    format_count(done as u64),
                    format_count(rows as u64)
                );
            }
            written += rows as u64;
            tracing::info!("Successfully wrote {} rows to {}.", format_count(rows as u64), table);
        }
        tx.commit().await?;
        Ok(written)
    }
}

/// Column types for a batch of frames sharing the same columns. A column that
/// is entirely null in the first frame takes its type from a later frame.
fn column_types(frames: &[DataFrame]) -> Result<Vec<(String, SqlType)>, DatabaseError> {
    let Some(first) = frames.first() else {
        return Ok(Vec::new());
    };
    let mut types = infer_sql_types(first);
    for (name, sql_type) in types.iter_mut() {
        if first.dtype(name)?.is_some() {
            continue;
        }
        for frame in &frames[1..] {
            if let Some(dtype) = frame.dtype(name)? {
                *sql_type = SqlType::from(dtype);
                break;
            }
        }
    }
    Ok(types)
}

/// Renames repeated result columns (`id`, `id` -> `id`, `id_1`), as joins
/// selecting the same name from two tables produce them.
fn unique_column_names(columns: Vec<String>) -> Vec<String> {
    let mut seen: HashSet<String> = HashSet::with_capacity(columns.len());
    let mut unique = Vec::with_capacity(columns.len());
    for name in columns {
        let mut candidate = name.clone();
        let mut suffix = 1;
        while seen.contains(&candidate) {
            candidate = format!("{name}_{suffix}");
            suffix += 1;
        }
        seen.insert(candidate.clone());
        unique.push(candidate);
    }
    unique
}

fn create_table_sql(qualified: &str, column_types: &[(String, SqlType)]) -> String {
    let columns = column_types
        .iter()
        .map(|(name, sql_type)| format!("\"{name}\" {sql_type}"))
        .collect::<Vec<_>>()
        .join(", ");
    format!("CREATE TABLE {qualified} ({columns})")
}

/// Decodes a row by the storage class of each cell. Integers in a column
/// declared `BOOLEAN` come back as booleans.
fn row_values(row: &SqliteRow) -> Result<Vec<Value>, DatabaseError> {
    let mut values = Vec::with_capacity(row.len());
    for idx in 0..row.len() {
        let raw = row.try_get_raw(idx)?;
        if raw.is_null() {
            values.push(Value::Null);
            continue;
        }
        let storage = raw.type_info().name().to_string();
        let declared_bool = row.column(idx).type_info().name() == "BOOLEAN";
        let value = match storage.as_str() {
            "INTEGER" if declared_bool => Value::Bool(row.try_get::<i64, _>(idx)? != 0),
            "INTEGER" => Value::Int(row.try_get::<i64, _>(idx)?),
            "REAL" => Value::Float(row.try_get::<f64, _>(idx)?),
            "BLOB" => Value::Text(hex::encode(row.try_get::<Vec<u8>, _>(idx)?)),
            _ => Value::Text(row.try_get::<String, _>(idx)?),
        };
        values.push(value);
    }
    Ok(values)
}
