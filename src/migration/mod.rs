// ABOUTME: Migration session and the orchestrator that moves every table
// ABOUTME: Ties the MySQL source, SQLite target, chunk cursor and progress observer together

pub mod chunked;
pub mod create;
pub mod source;

pub use chunked::TransferCursor;
pub use source::{RowQuery, SourceDatabase, SourceRow};

use crate::config::MigrationConfig;
use crate::error::{MigrationError, Result};
use crate::filters::TableFilter;
use crate::progress::{NoProgress, ProgressEvent, ProgressObserver};
use crate::sqlite::SqliteTarget;
use crate::utils::{format_bytes, format_duration};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

/// A lost connection is reconnected and retried this many times per operation
pub const MAX_RECONNECT_ATTEMPTS: u32 = 1;

/// Knobs that shape a run, independent of the connections
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TransferOptions {
    /// Rows per chunk; `None` copies each table in a single batch
    pub chunk_size: Option<usize>,
    pub vacuum: bool,
    pub filter: TableFilter,
}

impl TransferOptions {
    pub fn from_config(config: &MigrationConfig) -> Result<Self> {
        Ok(Self {
            chunk_size: config.chunk_size(),
            vacuum: config.vacuum,
            filter: config.table_filter()?,
        })
    }
}

/// What a completed run did
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MigrationReport {
    pub tables_created: usize,
    /// Tables that had rows to copy
    pub tables_copied: usize,
    /// Rows read from MySQL; rows ignored as key conflicts are included
    pub rows_copied: u64,
    pub target_bytes: u64,
    pub elapsed: Duration,
}

/// State shared by the table creator and the transfer engine for one run.
///
/// Owns both connections for its whole lifetime. The cursor is reset at the
/// start of every table and is what a reconnect resumes from.
pub struct MigrationSession<S, P = NoProgress> {
    source: S,
    target: SqliteTarget,
    options: TransferOptions,
    observer: P,
    cancel: Arc<AtomicBool>,
    cursor: TransferCursor,
}

impl<S: SourceDatabase> MigrationSession<S, NoProgress> {
    pub fn new(source: S, target: SqliteTarget, options: TransferOptions) -> Self {
        let cursor = TransferCursor::new("", options.chunk_size);
        Self {
            source,
            target,
            options,
            observer: NoProgress,
            cancel: Arc::new(AtomicBool::new(false)),
            cursor,
        }
    }
}

impl<S: SourceDatabase, P: ProgressObserver> MigrationSession<S, P> {
    /// Report progress to `observer` instead of discarding it
    pub fn with_observer<Q: ProgressObserver>(self, observer: Q) -> MigrationSession<S, Q> {
        MigrationSession {
            source: self.source,
            target: self.target,
            options: self.options,
            observer,
            cancel: self.cancel,
            cursor: self.cursor,
        }
    }

    /// Share a flag that stops the run at the next chunk or table boundary
    pub fn with_cancel_flag(mut self, cancel: Arc<AtomicBool>) -> Self {
        self.cancel = cancel;
        self
    }

    pub fn source(&self) -> &S {
        &self.source
    }

    pub fn target(&self) -> &SqliteTarget {
        &self.target
    }

    pub fn observer(&self) -> &P {
        &self.observer
    }

    pub fn cursor(&self) -> &TransferCursor {
        &self.cursor
    }

    /// Migrate every selected table, then release the source connection.
    ///
    /// The source is closed whether or not the transfer succeeded.
    pub async fn run(mut self) -> Result<MigrationReport> {
        let result = self.transfer().await;

        if let Err(err) = self.source.close().await {
            tracing::debug!("Error while closing MySQL connection: {}", err);
        }

        result
    }

    /// Create and copy every selected table in source order.
    ///
    /// Each table is created, then counted; tables without rows are left
    /// empty and the rest are copied. The first fatal error stops the run
    /// and leaves later tables untouched. Tables finished before it stay
    /// committed.
    pub async fn transfer(&mut self) -> Result<MigrationReport> {
        let started = Instant::now();

        let tables = self.source.list_tables().await?;
        let tables = self.options.filter.apply(tables);

        let mut report = MigrationReport::default();

        for table in &tables {
            self.check_cancelled()?;
            self.cursor = TransferCursor::new(table, self.options.chunk_size);

            let schema = self.create_table(table).await?;
            report.tables_created += 1;

            let total_rows = self
                .source
                .row_count(table)
                .await
                .map_err(|err| err.in_transfer(table))?;

            if total_rows == 0 {
                tracing::debug!("Table '{}' is empty, skipping data transfer", table);
                self.observer.notify(&ProgressEvent::TableSkipped {
                    table: table.clone(),
                });
                continue;
            }

            tracing::info!("Transferring table {}", table);

            let query = RowQuery::all(table, schema.column_names(), schema.primary_key());
            let rows = self
                .transfer_table(&query, &schema.insert_statement(), total_rows)
                .await?;

            report.tables_copied += 1;
            report.rows_copied += rows;
        }

        if self.options.vacuum {
            tracing::info!("Vacuuming created SQLite database file. This might take a while.");
            self.observer.notify(&ProgressEvent::Compacting);
            self.target.vacuum()?;
        }

        report.elapsed = started.elapsed();
        report.target_bytes = self.target.file_size()?;

        self.observer.notify(&ProgressEvent::RunFinished {
            tables: report.tables_created,
            rows: report.rows_copied,
        });

        tracing::info!(
            "Migrated {} table(s), {} row(s) in {} ({} written)",
            report.tables_created,
            report.rows_copied,
            format_duration(report.elapsed),
            format_bytes(report.target_bytes)
        );
        tracing::info!("Done!");

        Ok(report)
    }

    fn check_cancelled(&self) -> Result<()> {
        ensure_not_cancelled(&self.cancel)
    }

    /// Decide whether a failed attempt gets another try after reconnecting
    fn should_retry(&self, err: &MigrationError, attempt: u32) -> bool {
        if !err.is_connection_lost() {
            return false;
        }
        if attempt < MAX_RECONNECT_ATTEMPTS {
            tracing::warn!("Connection to MySQL server lost. Attempting to reconnect.");
            true
        } else {
            tracing::warn!("Connection to MySQL server lost. Reconnection attempt aborted.");
            false
        }
    }

    async fn reconnect_source(&mut self) -> Result<()> {
        self.source.reconnect().await.map_err(|err| {
            tracing::warn!("Connection to MySQL server lost. Reconnection attempt aborted.");
            err
        })
    }
}

fn ensure_not_cancelled(cancel: &AtomicBool) -> Result<()> {
    if cancel.load(Ordering::SeqCst) {
        tracing::warn!("Migration cancelled");
        return Err(MigrationError::Cancelled);
    }
    Ok(())
}
