// ABOUTME: Copies one table's rows into SQLite, whole or in fixed-size chunks
// ABOUTME: Commits every chunk and resumes after the last committed key or row after a reconnect

use super::{ensure_not_cancelled, MigrationSession, RowQuery, SourceDatabase, SourceRow};
use crate::error::Result;
use crate::mysql::converter::decode_row;
use crate::progress::{ProgressEvent, ProgressObserver};
use crate::sqlite::SqliteTarget;
use mysql_async::Value;

/// Position of the table currently being copied
#[derive(Debug, Clone, PartialEq)]
pub struct TransferCursor {
    pub table_name: String,
    pub chunk_size: Option<usize>,
    /// Next chunk to read; everything before it is committed
    pub current_chunk_index: u64,
    pub total_row_count: u64,
    pub rows_copied: u64,
    /// Primary key of the last committed row
    pub last_key: Option<Vec<Value>>,
}

impl TransferCursor {
    pub fn new(table_name: &str, chunk_size: Option<usize>) -> Self {
        Self {
            table_name: table_name.to_string(),
            chunk_size,
            current_chunk_index: 0,
            total_row_count: 0,
            rows_copied: 0,
            last_key: None,
        }
    }

    /// Number of chunks needed for the table; 1 when chunking is off
    ///
    /// # Examples
    ///
    /// ```
    /// # use mysql_sqlite_migrator::migration::TransferCursor;
    /// let mut cursor = TransferCursor::new("users", Some(100));
    /// cursor.total_row_count = 1001;
    /// assert_eq!(cursor.total_chunks(), 11);
    /// ```
    pub fn total_chunks(&self) -> u64 {
        match self.chunk_size {
            Some(size) => self.total_row_count.div_ceil(size as u64),
            None => 1,
        }
    }
}

impl<S: SourceDatabase, P: ProgressObserver> MigrationSession<S, P> {
    /// Copy all rows selected by `query` with `insert_sql`.
    ///
    /// Expects the cursor to have been reset for this table. Returns the
    /// number of rows read from the source.
    pub async fn transfer_table(
        &mut self,
        query: &RowQuery,
        insert_sql: &str,
        total_rows: u64,
    ) -> Result<u64> {
        self.cursor.total_row_count = total_rows;
        let table = self.cursor.table_name.clone();

        self.observer.notify(&ProgressEvent::TableStarted {
            table: table.clone(),
            total_rows,
            total_chunks: self.cursor.total_chunks(),
        });

        let mut attempt = 0;
        loop {
            if attempt > 0 {
                self.reconnect_source().await?;
                tracing::debug!(
                    "Resuming table '{}' at chunk {} after {} row(s)",
                    table,
                    self.cursor.current_chunk_index,
                    self.cursor.rows_copied
                );
            }

            match self.copy_rows(query, insert_sql).await {
                Ok(()) => break,
                Err(err) if self.should_retry(&err, attempt) => attempt += 1,
                Err(err) => {
                    tracing::error!("Failed transferring table {}: {}", table, err);
                    return Err(err.in_transfer(&table));
                }
            }
        }

        self.observer.notify(&ProgressEvent::TableFinished {
            table,
            rows: self.cursor.rows_copied,
        });

        Ok(self.cursor.rows_copied)
    }

    async fn copy_rows(&mut self, query: &RowQuery, insert_sql: &str) -> Result<()> {
        let Some(chunk_size) = self.cursor.chunk_size else {
            let rows = self.source.fetch_rows(query).await?;
            return self.write_chunk(rows, insert_sql);
        };

        if query.key.is_empty() {
            return self.stream_chunks(query, chunk_size, insert_sql).await;
        }

        let total_chunks = self.cursor.total_chunks();
        while self.cursor.current_chunk_index < total_chunks {
            self.check_cancelled()?;

            let page = query.page(self.cursor.last_key.clone(), chunk_size as u64);
            let rows = self.source.fetch_rows(&page).await?;

            // Rows deleted on the source since counting; nothing left to read
            if rows.is_empty() {
                tracing::debug!(
                    "Chunk {} of table '{}' came back empty",
                    self.cursor.current_chunk_index,
                    self.cursor.table_name
                );
                break;
            }

            let last_key = rows.last().and_then(|row| query.key_of(row));
            self.write_chunk(rows, insert_sql)?;
            self.cursor.last_key = last_key;
        }

        Ok(())
    }

    /// Copy a table without a primary key from one open scan.
    ///
    /// Separate statements over such a table have no guaranteed order, so
    /// the rows come from a single read; after a reconnect the scan is
    /// issued again and the rows already committed are passed over.
    async fn stream_chunks(
        &mut self,
        query: &RowQuery,
        chunk_size: usize,
        insert_sql: &str,
    ) -> Result<()> {
        let scan = query.skipping(self.cursor.rows_copied);
        let Self {
            source,
            target,
            observer,
            cancel,
            cursor,
            ..
        } = self;

        source
            .stream_rows(&scan, chunk_size, |rows| {
                ensure_not_cancelled(cancel)?;
                commit_chunk(target, cursor, observer, rows, insert_sql)
            })
            .await
    }

    fn write_chunk(&mut self, rows: Vec<SourceRow>, insert_sql: &str) -> Result<()> {
        commit_chunk(
            &mut self.target,
            &mut self.cursor,
            &mut self.observer,
            rows,
            insert_sql,
        )
    }
}

/// Insert and commit one chunk, then advance the cursor past it
fn commit_chunk<P: ProgressObserver>(
    target: &mut SqliteTarget,
    cursor: &mut TransferCursor,
    observer: &mut P,
    rows: Vec<SourceRow>,
    insert_sql: &str,
) -> Result<()> {
    let rows: Vec<_> = rows.into_iter().map(decode_row).collect();
    target.insert_rows(insert_sql, &rows)?;

    let copied = rows.len() as u64;
    cursor.rows_copied += copied;
    observer.notify(&ProgressEvent::ChunkCopied {
        table: cursor.table_name.clone(),
        chunk_index: cursor.current_chunk_index,
        total_chunks: cursor.total_chunks(),
        rows: copied,
    });
    cursor.current_chunk_index += 1;

    Ok(())
}
