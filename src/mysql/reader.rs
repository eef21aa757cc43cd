// ABOUTME: MySQL database introspection and data reading
// ABOUTME: Lists tables, describes columns, counts rows, and reads key pages or streamed scans

use super::classify;
use crate::error::{MigrationError, Result};
use crate::migration::{RowQuery, SourceRow};
use crate::schema::{ColumnDescriptor, KeyKind};
use crate::utils::{quote_mysql_ident, sanitize_identifier};
use mysql_async::{prelude::*, Conn, Row};

/// List all base tables in the connected MySQL database
///
/// Queries INFORMATION_SCHEMA for the current database, excluding views.
/// Returns tables in alphabetical order, the order `SHOW TABLES` reports.
///
/// # Examples
///
/// ```no_run
/// # use mysql_sqlite_migrator::mysql::{build_opts, connect_mysql, reader::list_tables};
/// # async fn example(config: mysql_sqlite_migrator::config::MigrationConfig) -> anyhow::Result<()> {
/// let mut conn = connect_mysql(&build_opts(&config)?).await?;
/// let tables = list_tables(&mut conn).await?;
/// println!("Found {} tables", tables.len());
/// # Ok(())
/// # }
/// ```
pub async fn list_tables(conn: &mut Conn) -> Result<Vec<String>> {
    let query = r#"
        SELECT TABLE_NAME
        FROM INFORMATION_SCHEMA.TABLES
        WHERE TABLE_SCHEMA = DATABASE()
        AND TABLE_TYPE = 'BASE TABLE'
        ORDER BY TABLE_NAME
    "#;

    let tables: Vec<String> = conn.query(query).await.map_err(classify)?;

    tracing::info!("Found {} table(s) in MySQL database", tables.len());

    Ok(tables)
}

/// Describe the columns of a table in ordinal order
///
/// Reads name, full column type (e.g. `varchar(191)`), nullability and the
/// `PRI`/`UNI`/`MUL` key marker.
///
/// # Errors
///
/// Returns a `Query` error when the table has no columns (it does not exist).
pub async fn table_columns(conn: &mut Conn, table: &str) -> Result<Vec<ColumnDescriptor>> {
    let query = r#"
        SELECT COLUMN_NAME, COLUMN_TYPE, IS_NULLABLE, COLUMN_KEY
        FROM INFORMATION_SCHEMA.COLUMNS
        WHERE TABLE_SCHEMA = DATABASE()
        AND TABLE_NAME = ?
        ORDER BY ORDINAL_POSITION
    "#;

    let rows: Vec<(String, String, String, String)> =
        conn.exec(query, (table,)).await.map_err(classify)?;

    if rows.is_empty() {
        return Err(MigrationError::Query(
            format!("Table '{}' has no columns", sanitize_identifier(table)).into(),
        ));
    }

    let columns = rows
        .into_iter()
        .map(|(name, column_type, is_nullable, column_key)| {
            ColumnDescriptor::new(
                name,
                column_type,
                is_nullable.eq_ignore_ascii_case("YES"),
                KeyKind::from_mysql(&column_key),
            )
        })
        .collect();

    Ok(columns)
}

/// Get row count for a MySQL table
pub async fn row_count(conn: &mut Conn, table: &str) -> Result<u64> {
    let query = format!("SELECT COUNT(*) FROM {}", quote_mysql_ident(table));

    let count: Option<u64> = conn.query_first(query).await.map_err(classify)?;
    let count = count.unwrap_or(0);

    tracing::debug!("Table '{}' has {} rows", sanitize_identifier(table), count);

    Ok(count)
}

/// Read the rows selected by `query`
///
/// With `buffered` the whole result set is collected as rows before being
/// split into values; otherwise rows are unpacked as they stream off the wire.
/// Both use the text protocol, so the values are the same either way.
pub async fn fetch_rows(
    conn: &mut Conn,
    query: &RowQuery,
    buffered: bool,
) -> Result<Vec<SourceRow>> {
    let sql = query.to_sql();
    tracing::trace!("{}", sql);

    if buffered {
        let rows: Vec<Row> = conn.query(sql).await.map_err(classify)?;
        Ok(rows.into_iter().map(Row::unwrap).collect())
    } else {
        let result = conn.query_iter(sql).await.map_err(classify)?;
        result.map_and_drop(Row::unwrap).await.map_err(classify)
    }
}

/// Read `query` as one statement, handing rows to `sink` `batch` at a time
///
/// Unbuffered reads pull rows off the open result as the sink consumes them,
/// so only one batch is held in memory. If `sink` fails the rest of the
/// result is discarded by the driver before the connection is reused.
pub async fn stream_rows<F>(
    conn: &mut Conn,
    query: &RowQuery,
    batch: usize,
    buffered: bool,
    mut sink: F,
) -> Result<()>
where
    F: FnMut(Vec<SourceRow>) -> Result<()>,
{
    let batch = batch.max(1);

    if buffered {
        let mut rows = fetch_rows(conn, query, true).await?.into_iter().peekable();
        while rows.peek().is_some() {
            sink(rows.by_ref().take(batch).collect())?;
        }
        return Ok(());
    }

    let sql = query.to_sql();
    tracing::trace!("{}", sql);

    let mut result = conn.query_iter(sql).await.map_err(classify)?;
    let mut pending = Vec::with_capacity(batch);
    while let Some(row) = result.next().await.map_err(classify)? {
        pending.push(row.unwrap());
        if pending.len() == batch {
            sink(std::mem::replace(&mut pending, Vec::with_capacity(batch)))?;
        }
    }
    if !pending.is_empty() {
        sink(pending)?;
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mysql::connect_mysql;
    use mysql_async::Opts;

    async fn test_conn() -> Conn {
        let url = std::env::var("TEST_MYSQL_URL").expect("TEST_MYSQL_URL must be set");
        connect_mysql(&Opts::from_url(&url).unwrap()).await.unwrap()
    }

    #[tokio::test]
    #[ignore]
    async fn test_table_columns_reads_keys() {
        let mut conn = test_conn().await;
        conn.query_drop("DROP TABLE IF EXISTS reader_keys").await.unwrap();
        conn.query_drop(
            "CREATE TABLE reader_keys (
                id INT PRIMARY KEY AUTO_INCREMENT,
                sku VARCHAR(50) NOT NULL UNIQUE,
                owner_id INT,
                INDEX (owner_id)
            )",
        )
        .await
        .unwrap();

        let columns = table_columns(&mut conn, "reader_keys").await.unwrap();
        let kinds: Vec<KeyKind> = columns.iter().map(|c| c.key_kind).collect();
        assert_eq!(kinds, vec![KeyKind::Primary, KeyKind::Unique, KeyKind::Indexed]);
        assert!(!columns[1].nullable);
        assert!(columns[2].nullable);

        conn.query_drop("DROP TABLE reader_keys").await.unwrap();
    }

    #[tokio::test]
    #[ignore]
    async fn test_buffered_and_streamed_reads_match() {
        let mut conn = test_conn().await;
        conn.query_drop("DROP TABLE IF EXISTS reader_rows").await.unwrap();
        conn.query_drop("CREATE TABLE reader_rows (id INT PRIMARY KEY, note TEXT)")
            .await
            .unwrap();
        conn.query_drop("INSERT INTO reader_rows VALUES (1, 'a'), (2, NULL), (3, 'c')")
            .await
            .unwrap();

        let query = RowQuery::all("reader_rows", vec!["id".into(), "note".into()], vec!["id".into()]);
        let buffered = fetch_rows(&mut conn, &query, true).await.unwrap();
        let streamed = fetch_rows(&mut conn, &query, false).await.unwrap();
        assert_eq!(buffered, streamed);
        assert_eq!(row_count(&mut conn, "reader_rows").await.unwrap(), 3);

        conn.query_drop("DROP TABLE reader_rows").await.unwrap();
    }

    #[tokio::test]
    #[ignore]
    async fn test_key_pages_and_streamed_scan_cover_table() {
        let mut conn = test_conn().await;
        conn.query_drop("DROP TABLE IF EXISTS reader_pages").await.unwrap();
        conn.query_drop("CREATE TABLE reader_pages (id INT PRIMARY KEY, note TEXT)")
            .await
            .unwrap();
        conn.query_drop("INSERT INTO reader_pages VALUES (1, 'a'), (2, 'b'), (3, 'c'), (4, 'd'), (5, 'e')")
            .await
            .unwrap();

        let query = RowQuery::all("reader_pages", vec!["id".into(), "note".into()], vec!["id".into()]);
        let first = fetch_rows(&mut conn, &query.page(None, 2), false).await.unwrap();
        let after = first.last().and_then(|row| query.key_of(row));
        let second = fetch_rows(&mut conn, &query.page(after, 2), false).await.unwrap();
        assert_eq!(second[0][0], mysql_async::Value::Bytes(b"3".to_vec()));

        let keyless = RowQuery::all("reader_pages", vec!["note".into()], vec![]);
        let mut batches = Vec::new();
        stream_rows(&mut conn, &keyless.skipping(1), 2, false, |rows| {
            batches.push(rows.len());
            Ok(())
        })
        .await
        .unwrap();
        assert_eq!(batches, vec![2, 2]);

        conn.query_drop("DROP TABLE reader_pages").await.unwrap();
    }

    #[tokio::test]
    #[ignore]
    async fn test_missing_table_is_query_error() {
        let mut conn = test_conn().await;
        let err = table_columns(&mut conn, "definitely_not_here").await.unwrap_err();
        assert!(matches!(err, MigrationError::Query(_)));
    }
}
