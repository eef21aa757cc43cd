// ABOUTME: Integration tests for MySQL-to-SQLite migration against a live server
// ABOUTME: Needs TEST_MYSQL_URL pointing at a scratch database; ignored by default

use mysql_async::prelude::*;
use mysql_async::Opts;
use mysql_sqlite_migrator::config::MigrationConfig;
use mysql_sqlite_migrator::migration::{MigrationSession, TransferOptions};
use mysql_sqlite_migrator::mysql::{connect_mysql, MySqlSource};
use mysql_sqlite_migrator::sqlite::SqliteTarget;
use rusqlite::Connection;
use std::env;
use std::path::Path;
use tempfile::TempDir;

/// Helper to get test MySQL source URL from environment
fn get_test_mysql_url() -> String {
    env::var("TEST_MYSQL_URL").expect("TEST_MYSQL_URL must be set")
}

/// Build a run configuration from the test URL
fn test_config(sqlite_file: &Path, chunk: Option<i64>) -> MigrationConfig {
    let opts = Opts::from_url(&get_test_mysql_url()).expect("Invalid TEST_MYSQL_URL");
    MigrationConfig {
        mysql_user: opts.user().map(str::to_string),
        mysql_password: opts.pass().map(str::to_string),
        mysql_host: opts.ip_or_hostname().to_string(),
        mysql_port: opts.tcp_port(),
        mysql_database: opts.db_name().map(str::to_string),
        sqlite_file: Some(sqlite_file.to_path_buf()),
        chunk,
        ..Default::default()
    }
}

/// Create test tables in MySQL database with various data types
async fn create_test_mysql_tables() -> anyhow::Result<()> {
    let opts = Opts::from_url(&get_test_mysql_url())?;
    let mut conn = connect_mysql(&opts).await?;

    for table in ["it_users", "it_posts", "it_empty"] {
        conn.query_drop(format!("DROP TABLE IF EXISTS {}", table)).await?;
    }

    conn.query_drop(
        "
        CREATE TABLE it_users (
            id INT PRIMARY KEY AUTO_INCREMENT,
            name VARCHAR(255) NOT NULL,
            email VARCHAR(191) UNIQUE,
            age INT UNSIGNED,
            balance DECIMAL(10, 2),
            bio TEXT,
            avatar BLOB,
            created_at DATETIME
        )
    ",
    )
    .await?;

    conn.query_drop(
        "
        CREATE TABLE it_posts (
            user_id INT NOT NULL,
            slug VARCHAR(64) NOT NULL,
            title VARCHAR(255) NOT NULL,
            published TINYINT(1),
            PRIMARY KEY (user_id, slug),
            INDEX (title)
        )
    ",
    )
    .await?;

    conn.query_drop("CREATE TABLE it_empty (id INT PRIMARY KEY, data TEXT)")
        .await?;

    conn.query_drop(
        "
        INSERT INTO it_users (name, email, age, balance, bio, avatar, created_at) VALUES
            ('Alice', 'alice@example.com', 30, 100.50, 'Alice bio', X'48656c6c6f', '2024-01-15 10:30:45'),
            ('Bob', 'bob@example.com', 25, 200.75, NULL, X'FF00FE', '2024-02-01 00:00:00'),
            ('Charlie', NULL, NULL, 150.25, 'Wörld', NULL, NULL)
    ",
    )
    .await?;

    conn.query_drop(
        "
        INSERT INTO it_posts VALUES
            (1, 'first', 'First Post', 1),
            (1, 'second', 'Second Post', 1),
            (2, 'hello', 'Bob Post', 0)
    ",
    )
    .await?;

    conn.disconnect().await?;
    Ok(())
}

async fn migrate(config: &MigrationConfig) -> anyhow::Result<()> {
    let sqlite_file = config.sqlite_file.as_deref().expect("sqlite_file is set");
    let target = SqliteTarget::open(sqlite_file)?;
    let source = MySqlSource::connect(config).await?;
    let options = TransferOptions::from_config(config)?;
    MigrationSession::new(source, target, options).run().await?;
    Ok(())
}

fn count(conn: &Connection, table: &str) -> i64 {
    conn.query_row(&format!("SELECT COUNT(*) FROM \"{}\"", table), [], |r| r.get(0))
        .unwrap()
}

#[tokio::test]
#[ignore]
async fn test_mysql_full_migration_integration() {
    create_test_mysql_tables()
        .await
        .expect("Failed to create test tables");

    let dir = TempDir::new().unwrap();
    let path = dir.path().join("mysql_full.sqlite3");
    let config = test_config(&path, None);

    migrate(&config).await.expect("Migration failed");

    let conn = Connection::open(&path).unwrap();
    assert_eq!(count(&conn, "it_users"), 3);
    assert_eq!(count(&conn, "it_posts"), 3);
    assert_eq!(count(&conn, "it_empty"), 0);

    let (name, avatar): (String, Vec<u8>) = conn
        .query_row(
            "SELECT name, avatar FROM it_users WHERE id = 2",
            [],
            |r| Ok((r.get(0)?, r.get(1)?)),
        )
        .unwrap();
    assert_eq!(name, "Bob");
    assert_eq!(avatar, vec![0xFF, 0x00, 0xFE]);

    let bio: String = conn
        .query_row("SELECT bio FROM it_users WHERE id = 3", [], |r| r.get(0))
        .unwrap();
    assert_eq!(bio, "Wörld");

    let indexes: i64 = conn
        .query_row(
            "SELECT COUNT(*) FROM sqlite_master WHERE type = 'index' AND name IN ('it_users_email_IDX', 'it_posts_title_IDX')",
            [],
            |r| r.get(0),
        )
        .unwrap();
    assert_eq!(indexes, 2);
}

#[tokio::test]
#[ignore]
async fn test_mysql_chunked_migration_matches_unchunked() {
    create_test_mysql_tables()
        .await
        .expect("Failed to create test tables");

    let dir = TempDir::new().unwrap();
    let whole = dir.path().join("whole.sqlite3");
    let chunked = dir.path().join("chunked.sqlite3");

    migrate(&test_config(&whole, None)).await.unwrap();
    migrate(&test_config(&chunked, Some(2))).await.unwrap();

    let query = "SELECT * FROM it_users ORDER BY id";
    let read = |path: &Path| -> Vec<Vec<rusqlite::types::Value>> {
        let conn = Connection::open(path).unwrap();
        let mut stmt = conn.prepare(query).unwrap();
        let columns = stmt.column_count();
        let rows = stmt
            .query_map([], |row| {
                (0..columns)
                    .map(|i| row.get::<_, rusqlite::types::Value>(i))
                    .collect::<rusqlite::Result<Vec<_>>>()
            })
            .unwrap()
            .collect::<rusqlite::Result<Vec<_>>>()
            .unwrap();
        rows
    };

    assert_eq!(read(&whole), read(&chunked));
}

#[tokio::test]
#[ignore]
async fn test_mysql_rerun_is_idempotent() {
    create_test_mysql_tables()
        .await
        .expect("Failed to create test tables");

    let dir = TempDir::new().unwrap();
    let path = dir.path().join("rerun.sqlite3");
    let config = test_config(&path, Some(1));

    migrate(&config).await.unwrap();
    migrate(&config).await.unwrap();

    let conn = Connection::open(&path).unwrap();
    assert_eq!(count(&conn, "it_users"), 3);
    assert_eq!(count(&conn, "it_posts"), 3);
}
