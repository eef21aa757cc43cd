// ABOUTME: SQLite target file handling for the MySQL migration
// ABOUTME: Validates the target path and opens a read-write connection

pub mod writer;

pub use writer::{ExistingIndex, SqliteTarget, WriteStats};

use crate::error::{MigrationError, Result};
use std::path::{Path, PathBuf};

/// Validate the SQLite target path
///
/// The file itself may not exist yet, but:
/// - the path must not be empty
/// - it must not point at a directory
/// - its parent directory must exist
///
/// Returns the absolute path of the target file.
///
/// # Examples
///
/// ```no_run
/// # use mysql_sqlite_migrator::sqlite::validate_sqlite_path;
/// assert!(validate_sqlite_path("export.sqlite3".as_ref()).is_ok());
/// assert!(validate_sqlite_path("".as_ref()).is_err());
/// assert!(validate_sqlite_path("/nonexistent/dir/export.db".as_ref()).is_err());
/// ```
pub fn validate_sqlite_path(path: &Path) -> Result<PathBuf> {
    if path.as_os_str().is_empty() {
        return Err(MigrationError::configuration(
            "SQLite file path cannot be empty",
        ));
    }

    if path.is_dir() {
        return Err(MigrationError::configuration(format!(
            "SQLite path '{}' is a directory",
            path.display()
        )));
    }

    let file_name = path.file_name().ok_or_else(|| {
        MigrationError::configuration(format!(
            "SQLite path '{}' has no file name",
            path.display()
        ))
    })?;

    let parent = match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent,
        _ => Path::new("."),
    };

    // Canonicalizing the parent also checks that it exists
    let parent = parent.canonicalize().map_err(|err| {
        MigrationError::configuration(format!(
            "Directory for SQLite file '{}' is not accessible: {}",
            path.display(),
            err
        ))
    })?;

    let resolved = parent.join(file_name);
    tracing::debug!("Validated SQLite path: {}", resolved.display());

    Ok(resolved)
}

/// Open (creating if needed) the SQLite target for writing
///
/// # Errors
///
/// Returns `Configuration` for an invalid path and `Target` when SQLite
/// cannot open the file or answer a version query.
pub fn open_sqlite(path: &Path) -> Result<rusqlite::Connection> {
    let resolved = validate_sqlite_path(path)?;

    tracing::info!("Opening SQLite database: {}", resolved.display());

    let conn = rusqlite::Connection::open(&resolved)?;

    // Verify we can query the database
    let version: String = conn.query_row("SELECT sqlite_version()", [], |row| row.get(0))?;

    tracing::debug!("Opened SQLite database (SQLite {})", version);

    Ok(conn)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn test_validate_empty_path() {
        let result = validate_sqlite_path(Path::new(""));
        assert!(result.is_err());
        assert!(result.unwrap_err().to_string().contains("cannot be empty"));
    }

    #[test]
    fn test_validate_missing_parent_directory() {
        let result = validate_sqlite_path(Path::new("/nonexistent/dir/database.db"));
        assert!(matches!(result, Err(MigrationError::Configuration(_))));
    }

    #[test]
    fn test_validate_directory() {
        let dir = tempdir().unwrap();
        let result = validate_sqlite_path(dir.path());
        assert!(result.is_err());
        assert!(result.unwrap_err().to_string().contains("is a directory"));
    }

    #[test]
    fn test_validate_new_file_in_existing_directory() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("fresh.sqlite3");
        let resolved = validate_sqlite_path(&path).unwrap();
        assert!(resolved.is_absolute());
        assert_eq!(resolved.file_name().unwrap(), "fresh.sqlite3");
    }

    #[test]
    fn test_open_sqlite_creates_file() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("created.db");
        let conn = open_sqlite(&path).unwrap();
        conn.execute_batch("CREATE TABLE t (id INTEGER)").unwrap();
        assert!(path.exists());
    }
}
