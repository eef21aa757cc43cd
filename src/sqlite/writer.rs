// ABOUTME: Write schema and rows into the SQLite target
// ABOUTME: Runs DDL scripts and conflict-ignoring batch inserts, one commit per call

use crate::error::Result;
use crate::sqlite::open_sqlite;
use rusqlite::types::Value as SqlValue;
use rusqlite::{params_from_iter, Connection, OptionalExtension};
use std::path::Path;

/// Counters of what has been written to the target
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct WriteStats {
    pub scripts: u64,
    pub insert_batches: u64,
    /// Rows actually inserted; rows skipped as conflicts are not counted
    pub rows_inserted: u64,
}

/// An index already present in the target
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExistingIndex {
    pub table: String,
    pub columns: Vec<String>,
}

impl ExistingIndex {
    /// Whether this is a single-column index on `table`.`column`
    pub fn covers(&self, table: &str, column: &str) -> bool {
        self.table == table && self.columns.len() == 1 && self.columns[0] == column
    }
}

/// The SQLite database receiving the migrated schema and data
pub struct SqliteTarget {
    conn: Connection,
    stats: WriteStats,
}

impl SqliteTarget {
    /// Open or create the SQLite file at `path`
    pub fn open(path: &Path) -> Result<Self> {
        Ok(Self::from_connection(open_sqlite(path)?))
    }

    /// Wrap an already opened connection (e.g. an in-memory database)
    pub fn from_connection(conn: Connection) -> Self {
        Self {
            conn,
            stats: WriteStats::default(),
        }
    }

    pub fn connection(&self) -> &Connection {
        &self.conn
    }

    pub fn stats(&self) -> WriteStats {
        self.stats
    }

    /// Run a multi-statement script in one transaction and commit it
    pub fn execute_script(&mut self, sql: &str) -> Result<()> {
        let tx = self.conn.transaction()?;
        tx.execute_batch(sql)?;
        tx.commit()?;
        self.stats.scripts += 1;
        Ok(())
    }

    /// Look up an index by name, with the table and columns it covers
    pub fn find_index(&self, name: &str) -> Result<Option<ExistingIndex>> {
        let table: Option<String> = self
            .conn
            .query_row(
                "SELECT tbl_name FROM sqlite_master WHERE type = 'index' AND name = ?1",
                [name],
                |row| row.get(0),
            )
            .optional()?;
        let Some(table) = table else {
            return Ok(None);
        };

        let mut stmt = self
            .conn
            .prepare("SELECT name FROM pragma_index_info(?1) ORDER BY seqno")?;
        let columns = stmt
            .query_map([name], |row| row.get(0))?
            .collect::<rusqlite::Result<Vec<String>>>()?;

        Ok(Some(ExistingIndex { table, columns }))
    }

    /// Insert every row with `insert_sql` in one transaction and commit.
    ///
    /// `insert_sql` is expected to be an `INSERT OR IGNORE`, so rows that
    /// collide with existing keys are skipped. Returns the number of rows
    /// actually inserted.
    pub fn insert_rows(&mut self, insert_sql: &str, rows: &[Vec<SqlValue>]) -> Result<u64> {
        let tx = self.conn.transaction()?;
        let mut inserted = 0u64;
        {
            let mut stmt = tx.prepare_cached(insert_sql)?;
            for row in rows {
                inserted += stmt.execute(params_from_iter(row.iter()))? as u64;
            }
        }
        tx.commit()?;

        self.stats.insert_batches += 1;
        self.stats.rows_inserted += inserted;

        tracing::trace!("Inserted {} of {} rows", inserted, rows.len());

        Ok(inserted)
    }

    /// Rebuild the database file to reclaim free pages
    pub fn vacuum(&mut self) -> Result<()> {
        self.conn.execute_batch("VACUUM")?;
        Ok(())
    }

    /// Size of the main database file in bytes
    pub fn file_size(&self) -> Result<u64> {
        let size: i64 = self.conn.query_row(
            "SELECT page_count * page_size FROM pragma_page_count(), pragma_page_size()",
            [],
            |row| row.get(0),
        )?;
        Ok(u64::try_from(size).unwrap_or(0))
    }
}
