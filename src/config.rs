// ABOUTME: Migration settings loaded from an optional TOML file and CLI flags
// ABOUTME: Validates required MySQL credentials and the SQLite target before connecting

use crate::error::{MigrationError, Result};
use crate::filters::TableFilter;
use anyhow::Context;
use serde::Deserialize;
use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};

pub const DEFAULT_MYSQL_HOST: &str = "localhost";
pub const DEFAULT_MYSQL_PORT: u16 = 3306;

/// Everything one migration run needs, as plain values
#[derive(Clone, Deserialize, PartialEq, Eq)]
#[serde(default, deny_unknown_fields)]
pub struct MigrationConfig {
    pub mysql_user: Option<String>,
    pub mysql_password: Option<String>,
    pub mysql_host: String,
    pub mysql_port: u16,
    pub mysql_database: Option<String>,
    pub sqlite_file: Option<PathBuf>,
    /// Rows per chunk; absent or `<= 0` copies each table in one batch
    pub chunk: Option<i64>,
    /// Run VACUUM on the SQLite file after all tables are copied
    pub vacuum: bool,
    /// Collect each MySQL result set before converting it instead of streaming it
    pub buffered: bool,
    pub log_file: Option<PathBuf>,
    pub include_tables: Option<Vec<String>>,
    pub exclude_tables: Option<Vec<String>>,
}

impl Default for MigrationConfig {
    fn default() -> Self {
        Self {
            mysql_user: None,
            mysql_password: None,
            mysql_host: DEFAULT_MYSQL_HOST.to_string(),
            mysql_port: DEFAULT_MYSQL_PORT,
            mysql_database: None,
            sqlite_file: None,
            chunk: None,
            vacuum: false,
            buffered: false,
            log_file: None,
            include_tables: None,
            exclude_tables: None,
        }
    }
}

// Hand-written so the password never reaches a log line
impl fmt::Debug for MigrationConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MigrationConfig")
            .field("mysql_user", &self.mysql_user)
            .field(
                "mysql_password",
                &self.mysql_password.as_ref().map(|_| "********"),
            )
            .field("mysql_host", &self.mysql_host)
            .field("mysql_port", &self.mysql_port)
            .field("mysql_database", &self.mysql_database)
            .field("sqlite_file", &self.sqlite_file)
            .field("chunk", &self.chunk)
            .field("vacuum", &self.vacuum)
            .field("buffered", &self.buffered)
            .field("log_file", &self.log_file)
            .field("include_tables", &self.include_tables)
            .field("exclude_tables", &self.exclude_tables)
            .finish()
    }
}

impl MigrationConfig {
    /// Load settings from a TOML file; missing keys keep their defaults
    pub fn from_file(path: &Path) -> anyhow::Result<Self> {
        let raw = fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file at {}", path.display()))?;
        toml::from_str(&raw)
            .with_context(|| format!("Failed to parse TOML config at {}", path.display()))
    }

    /// Check that the run can start: credentials, database and target are present
    pub fn validate(&self) -> Result<()> {
        if is_blank(&self.mysql_user) {
            return Err(MigrationError::configuration("Please provide a MySQL user"));
        }
        if is_blank(&self.mysql_database) {
            return Err(MigrationError::configuration(
                "Please provide a MySQL database",
            ));
        }
        let sqlite_missing = self
            .sqlite_file
            .as_ref()
            .map_or(true, |p| p.as_os_str().is_empty());
        if sqlite_missing {
            return Err(MigrationError::configuration("Please provide a SQLite file"));
        }
        if self.mysql_host.trim().is_empty() {
            return Err(MigrationError::configuration("MySQL host cannot be empty"));
        }
        self.table_filter()?;
        Ok(())
    }

    /// Rows per chunk, or `None` when chunking is disabled
    pub fn chunk_size(&self) -> Option<usize> {
        match self.chunk {
            Some(size) if size > 0 => usize::try_from(size).ok(),
            _ => None,
        }
    }

    pub fn table_filter(&self) -> Result<TableFilter> {
        TableFilter::new(self.include_tables.clone(), self.exclude_tables.clone())
    }
}

fn is_blank(value: &Option<String>) -> bool {
    value.as_deref().map_or(true, |v| v.trim().is_empty())
}
