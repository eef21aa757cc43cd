// ABOUTME: Source database abstraction used by the table creator and transfer engine
// ABOUTME: Keyed tables are read in key-ordered pages, keyless tables through one streamed scan

use crate::error::Result;
use crate::schema::ColumnDescriptor;
use crate::utils::quote_mysql_ident;
use mysql_async::Value;

/// One row as delivered by the source, cells in column order
pub type SourceRow = Vec<Value>;

/// MySQL's documented "no limit" row count, needed to write a bare OFFSET
const NO_LIMIT: u64 = u64::MAX;

/// Which rows of a table to read, and in which column order
#[derive(Debug, Clone, PartialEq)]
pub struct RowQuery {
    pub table: String,
    pub columns: Vec<String>,
    /// Primary key columns; rows are ordered by them. Empty reads in storage order
    pub key: Vec<String>,
    /// Only rows whose key sorts after this one
    pub after: Option<Vec<Value>>,
    pub limit: Option<u64>,
    /// Rows passed over before the first one returned
    pub skip: u64,
}

impl RowQuery {
    /// Read the whole table
    pub fn all(table: &str, columns: Vec<String>, key: Vec<String>) -> Self {
        Self {
            table: table.to_string(),
            columns,
            key,
            after: None,
            limit: None,
            skip: 0,
        }
    }

    /// The next `limit` rows in key order following `after`
    pub fn page(&self, after: Option<Vec<Value>>, limit: u64) -> Self {
        Self {
            after,
            limit: Some(limit),
            ..self.clone()
        }
    }

    /// The same scan without its first `rows` rows
    pub fn skipping(&self, rows: u64) -> Self {
        Self {
            skip: rows,
            ..self.clone()
        }
    }

    /// Key values of `row`, or `None` when the query has no usable key
    pub fn key_of(&self, row: &[Value]) -> Option<Vec<Value>> {
        if self.key.is_empty() {
            return None;
        }
        self.key
            .iter()
            .map(|k| {
                let i = self.columns.iter().position(|c| c == k)?;
                row.get(i).cloned()
            })
            .collect()
    }

    /// Render as a MySQL SELECT
    ///
    /// # Examples
    ///
    /// ```
    /// # use mysql_sqlite_migrator::migration::RowQuery;
    /// # use mysql_async::Value;
    /// let query = RowQuery::all("users", vec!["id".into(), "name".into()], vec!["id".into()]);
    /// let after = Some(vec![Value::Bytes(b"200".to_vec())]);
    /// assert_eq!(
    ///     query.page(after, 100).to_sql(),
    ///     "SELECT `id`, `name` FROM `users` WHERE `id` > '200' ORDER BY `id` LIMIT 100"
    /// );
    /// ```
    pub fn to_sql(&self) -> String {
        let columns = if self.columns.is_empty() {
            "*".to_string()
        } else {
            self.columns
                .iter()
                .map(|c| quote_mysql_ident(c))
                .collect::<Vec<_>>()
                .join(", ")
        };

        let mut sql = format!("SELECT {} FROM {}", columns, quote_mysql_ident(&self.table));
        let key: Vec<String> = self.key.iter().map(|c| quote_mysql_ident(c)).collect();

        if let Some(after) = &self.after {
            let values: Vec<String> = after.iter().map(|v| v.as_sql(false)).collect();
            if key.len() == 1 {
                sql.push_str(&format!(" WHERE {} > {}", key[0], values.join(", ")));
            } else {
                sql.push_str(&format!(
                    " WHERE ({}) > ({})",
                    key.join(", "),
                    values.join(", ")
                ));
            }
        }

        if !key.is_empty() {
            sql.push_str(" ORDER BY ");
            sql.push_str(&key.join(", "));
        }

        match (self.limit, self.skip) {
            (Some(limit), 0) => sql.push_str(&format!(" LIMIT {}", limit)),
            (limit, skip) if skip > 0 => sql.push_str(&format!(
                " LIMIT {} OFFSET {}",
                limit.unwrap_or(NO_LIMIT),
                skip
            )),
            _ => {}
        }

        sql
    }
}

/// Read access to the database being migrated.
///
/// Implementations must report a dropped connection as
/// [`MigrationError::ConnectionLost`](crate::error::MigrationError::ConnectionLost)
/// and every other query failure as
/// [`MigrationError::Query`](crate::error::MigrationError::Query); the engine
/// retries only the former.
#[allow(async_fn_in_trait)]
pub trait SourceDatabase {
    /// Tables to migrate, in source-reported order
    async fn list_tables(&mut self) -> Result<Vec<String>>;

    /// Column metadata for a table, in ordinal order
    async fn table_columns(&mut self, table: &str) -> Result<Vec<ColumnDescriptor>>;

    async fn row_count(&mut self, table: &str) -> Result<u64>;

    async fn fetch_rows(&mut self, query: &RowQuery) -> Result<Vec<SourceRow>>;

    /// Read `query` with a single statement, passing rows to `sink` in
    /// batches of `batch` as they arrive.
    ///
    /// An error from `sink` stops the read and is returned unchanged. The
    /// default collects the whole result first.
    async fn stream_rows<F>(&mut self, query: &RowQuery, batch: usize, mut sink: F) -> Result<()>
    where
        F: FnMut(Vec<SourceRow>) -> Result<()>,
    {
        let mut rows = self.fetch_rows(query).await?.into_iter().peekable();
        while rows.peek().is_some() {
            sink(rows.by_ref().take(batch.max(1)).collect())?;
        }
        Ok(())
    }

    /// Replace the underlying connection with a fresh one
    async fn reconnect(&mut self) -> Result<()>;

    /// Release the connection
    async fn close(self) -> Result<()>
    where
        Self: Sized,
    {
        Ok(())
    }
}
