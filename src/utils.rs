// ABOUTME: Utility functions for identifier quoting and human-readable output
// ABOUTME: Shared by DDL synthesis, MySQL queries, and the run summary

use std::time::Duration;

/// Quote an identifier for SQLite, doubling embedded double quotes
///
/// # Examples
///
/// ```
/// # use mysql_sqlite_migrator::utils::quote_sqlite_ident;
/// assert_eq!(quote_sqlite_ident("users"), "\"users\"");
/// assert_eq!(quote_sqlite_ident("we\"ird"), "\"we\"\"ird\"");
/// ```
pub fn quote_sqlite_ident(identifier: &str) -> String {
    format!("\"{}\"", identifier.replace('"', "\"\""))
}

/// Quote an identifier for MySQL, doubling embedded backticks
///
/// # Examples
///
/// ```
/// # use mysql_sqlite_migrator::utils::quote_mysql_ident;
/// assert_eq!(quote_mysql_ident("users"), "`users`");
/// assert_eq!(quote_mysql_ident("we`ird"), "`we``ird`");
/// ```
pub fn quote_mysql_ident(identifier: &str) -> String {
    format!("`{}`", identifier.replace('`', "``"))
}

/// Whether a name can appear unquoted in SQL: `[A-Za-z_][A-Za-z0-9_]*`
pub fn is_plain_identifier(identifier: &str) -> bool {
    let mut chars = identifier.chars();
    match chars.next() {
        Some(first) if first.is_ascii_alphabetic() || first == '_' => {
            chars.all(|c| c.is_ascii_alphanumeric() || c == '_')
        }
        _ => false,
    }
}

/// Render a SQLite object name bare when it is a plain identifier, quoted otherwise
pub fn sqlite_object_name(name: &str) -> String {
    if is_plain_identifier(name) {
        name.to_string()
    } else {
        quote_sqlite_ident(name)
    }
}

/// Sanitize an identifier (table name, column name) for display
///
/// Removes control characters and limits length to prevent log injection and
/// keep error messages readable. For SQL, use the quoting helpers instead.
///
/// # Examples
///
/// ```
/// # use mysql_sqlite_migrator::utils::sanitize_identifier;
/// assert_eq!(sanitize_identifier("normal_table"), "normal_table");
/// assert_eq!(sanitize_identifier("table\nname"), "tablename");
/// assert_eq!(sanitize_identifier(&"a".repeat(200)).len(), 100);
/// ```
pub fn sanitize_identifier(identifier: &str) -> String {
    identifier
        .chars()
        .filter(|c| !c.is_control())
        .take(100)
        .collect()
}

/// Format bytes into human-readable string
///
/// # Examples
///
/// ```
/// # use mysql_sqlite_migrator::utils::format_bytes;
/// assert_eq!(format_bytes(1024), "1.0 KB");
/// assert_eq!(format_bytes(1073741824), "1.0 GB");
/// ```
pub fn format_bytes(bytes: u64) -> String {
    const UNITS: &[&str] = &["B", "KB", "MB", "GB", "TB"];
    let mut size = bytes as f64;
    let mut unit_idx = 0;

    while size >= 1024.0 && unit_idx < UNITS.len() - 1 {
        size /= 1024.0;
        unit_idx += 1;
    }

    format!("{:.1} {}", size, UNITS[unit_idx])
}

/// Format an elapsed duration into a human-readable string
///
/// # Examples
///
/// ```
/// # use std::time::Duration;
/// # use mysql_sqlite_migrator::utils::format_duration;
/// assert_eq!(format_duration(Duration::from_secs(45)), "45 seconds");
/// assert_eq!(format_duration(Duration::from_secs(120)), "2.0 minutes");
/// ```
pub fn format_duration(duration: Duration) -> String {
    let secs = duration.as_secs();

    if secs < 60 {
        format!("{} seconds", secs)
    } else if secs < 3600 {
        format!("{:.1} minutes", secs as f64 / 60.0)
    } else {
        format!("{:.1} hours", secs as f64 / 3600.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_is_plain_identifier() {
        assert!(is_plain_identifier("orders_sku_IDX"));
        assert!(is_plain_identifier("_private"));
        assert!(!is_plain_identifier("1table"));
        assert!(!is_plain_identifier("my table"));
        assert!(!is_plain_identifier("odd\"name"));
        assert!(!is_plain_identifier(""));
    }

    #[test]
    fn test_sqlite_object_name() {
        assert_eq!(sqlite_object_name("orders_sku_IDX"), "orders_sku_IDX");
        assert_eq!(sqlite_object_name("my-table_x_IDX"), "\"my-table_x_IDX\"");
    }

    #[test]
    fn test_format_bytes() {
        assert_eq!(format_bytes(0), "0.0 B");
        assert_eq!(format_bytes(1536), "1.5 KB");
        assert_eq!(format_bytes(1048576), "1.0 MB");
        assert_eq!(format_bytes(1099511627776), "1.0 TB");
    }

    #[test]
    fn test_format_duration() {
        assert_eq!(format_duration(Duration::from_secs(0)), "0 seconds");
        assert_eq!(format_duration(Duration::from_secs(59)), "59 seconds");
        assert_eq!(format_duration(Duration::from_secs(90)), "1.5 minutes");
        assert_eq!(format_duration(Duration::from_secs(7200)), "2.0 hours");
    }
}
