//! The reporting sink: where normalized inventory rows land.
//!
//! The sink contract is a deliberately small tabular surface — clear a
//! table, bulk-insert rows — because the replace strategy is full-refresh:
//! item deletions and renames in the source catalog must disappear from the
//! inventory, and there is no reliable key scheme across the heterogeneous
//! sources to compute a diff. The two-step clear-then-insert is not truly
//! atomic; the design assumes exclusive ownership of the destination table
//! for the duration of a run.
//!
//! [`JsonlSink`] writes one JSON object per row into a per-table file, which
//! is the bulk-load format the downstream reporting import consumes.

#[cfg(any(test, feature = "test-utils"))]
use std::collections::HashMap;
use std::path::PathBuf;

use thiserror::Error;
use tracing::debug;

/// Errors produced by sink operations.
#[derive(Error, Debug, Clone)]
pub enum SinkError {
    /// Clearing the destination table failed.
    #[error("failed to clear table '{table}': {reason}")]
    Clear {
        /// Destination table identifier
        table: String,
        /// Underlying failure
        reason: String,
    },

    /// Inserting rows failed; the table may already be cleared.
    #[error("failed to insert into table '{table}': {reason}")]
    Insert {
        /// Destination table identifier
        table: String,
        /// Underlying failure
        reason: String,
    },
}

/// A tabular store accepting the inventory snapshot.
pub trait Sink {
    /// Remove all existing rows from the table.
    fn clear(&mut self, table: &str) -> impl Future<Output = Result<(), SinkError>>;

    /// Append rows to the table; `columns` gives the column order of each
    /// row. Returns the number of rows written.
    fn bulk_insert(
        &mut self,
        table: &str,
        columns: &[&str],
        rows: &[Vec<String>],
    ) -> impl Future<Output = Result<usize, SinkError>>;
}

/// File-backed sink writing one JSON object per row.
///
/// Each table maps to `{dir}/{table}.jsonl`; `clear` truncates the file.
#[derive(Debug, Clone)]
pub struct JsonlSink {
    dir: PathBuf,
}

impl JsonlSink {
    /// Sink rooted at the given directory, created on first write.
    #[must_use]
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    fn table_path(&self, table: &str) -> PathBuf {
        self.dir.join(format!("{table}.jsonl"))
    }
}

impl Sink for JsonlSink {
    async fn clear(&mut self, table: &str) -> Result<(), SinkError> {
        let map_err = |e: std::io::Error| SinkError::Clear {
            table: table.to_string(),
            reason: e.to_string(),
        };

        tokio::fs::create_dir_all(&self.dir).await.map_err(map_err)?;
        tokio::fs::write(self.table_path(table), b"").await.map_err(map_err)?;
        debug!("cleared sink table '{table}'");
        Ok(())
    }

    async fn bulk_insert(
        &mut self,
        table: &str,
        columns: &[&str],
        rows: &[Vec<String>],
    ) -> Result<usize, SinkError> {
        let map_err = |e: std::io::Error| SinkError::Insert {
            table: table.to_string(),
            reason: e.to_string(),
        };

        let mut buffer = String::new();
        for row in rows {
            let object: serde_json::Map<String, serde_json::Value> = columns
                .iter()
                .zip(row)
                .map(|(col, value)| ((*col).to_string(), serde_json::Value::String(value.clone())))
                .collect();
            buffer.push_str(&serde_json::Value::Object(object).to_string());
            buffer.push('\n');
        }

        use tokio::io::AsyncWriteExt;
        let mut file = tokio::fs::OpenOptions::new()
            .create(true)
            .append(true)
            .open(self.table_path(table))
            .await
            .map_err(map_err)?;
        file.write_all(buffer.as_bytes()).await.map_err(map_err)?;
        file.flush().await.map_err(map_err)?;

        debug!("inserted {} row(s) into sink table '{table}'", rows.len());
        Ok(rows.len())
    }
}

/// In-memory sink for tests, with scriptable failure modes.
#[cfg(any(test, feature = "test-utils"))]
#[derive(Debug, Default)]
pub struct MemorySink {
    /// Rows currently held per table
    pub tables: HashMap<String, Vec<Vec<String>>>,
    /// Number of times `clear` was called
    pub clears: usize,
    fail_clear: bool,
    fail_insert: bool,
}

#[cfg(any(test, feature = "test-utils"))]
impl MemorySink {
    /// Empty sink.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Make `clear` fail.
    #[must_use]
    pub fn with_failing_clear(mut self) -> Self {
        self.fail_clear = true;
        self
    }

    /// Make `bulk_insert` fail.
    #[must_use]
    pub fn with_failing_insert(mut self) -> Self {
        self.fail_insert = true;
        self
    }

    /// Rows currently held for a table.
    #[must_use]
    pub fn rows(&self, table: &str) -> &[Vec<String>] {
        self.tables.get(table).map_or(&[], Vec::as_slice)
    }
}

#[cfg(any(test, feature = "test-utils"))]
impl Sink for MemorySink {
    async fn clear(&mut self, table: &str) -> Result<(), SinkError> {
        if self.fail_clear {
            return Err(SinkError::Clear {
                table: table.to_string(),
                reason: "scripted failure".to_string(),
            });
        }
        self.clears += 1;
        self.tables.insert(table.to_string(), Vec::new());
        Ok(())
    }

    async fn bulk_insert(
        &mut self,
        table: &str,
        _columns: &[&str],
        rows: &[Vec<String>],
    ) -> Result<usize, SinkError> {
        if self.fail_insert {
            return Err(SinkError::Insert {
                table: table.to_string(),
                reason: "scripted failure".to_string(),
            });
        }
        self.tables
            .entry(table.to_string())
            .or_default()
            .extend(rows.iter().cloned());
        Ok(rows.len())
    }
}
