// ABOUTME: Error types for the MySQL to SQLite migration engine
// ABOUTME: Separates transient connection loss from fatal schema and transfer failures

use thiserror::Error;

/// Boxed error used to carry driver failures without tying callers to a driver type
pub type BoxError = Box<dyn std::error::Error + Send + Sync + 'static>;

/// Main error type for migration operations.
#[derive(Error, Debug)]
pub enum MigrationError {
    /// Missing or contradictory settings, raised before any connection is opened
    #[error("Configuration error: {0}")]
    Configuration(String),

    /// Initial MySQL handshake failed or the server reported not connected
    #[error("Unable to connect to MySQL: {0}")]
    Connection(#[source] BoxError),

    /// A column type declaration had no extractable leading type name
    #[error("Invalid column type declaration: '{0}'")]
    InvalidTypeDeclaration(String),

    /// The MySQL connection dropped mid-run; retried once by the caller
    #[error("Connection to MySQL server lost")]
    ConnectionLost(#[source] BoxError),

    /// A source query failed for a reason unrelated to connectivity
    #[error("MySQL query failed")]
    Query(#[source] BoxError),

    /// Creating a table (or one of its indexes) failed
    #[error("Failed to create table '{table}'")]
    Schema {
        table: String,
        #[source]
        source: BoxError,
    },

    /// Copying rows for a table failed
    #[error("Failed to transfer table '{table}'")]
    Transfer {
        table: String,
        #[source]
        source: BoxError,
    },

    /// SQLite error outside of a table-scoped operation
    #[error("SQLite error: {0}")]
    Target(#[from] rusqlite::Error),

    /// The run was interrupted between chunks or tables
    #[error("Migration cancelled")]
    Cancelled,
}

impl MigrationError {
    /// Create a Configuration error
    pub fn configuration(message: impl Into<String>) -> Self {
        MigrationError::Configuration(message.into())
    }

    /// Whether this error is a transient loss of the source connection
    pub fn is_connection_lost(&self) -> bool {
        matches!(self, MigrationError::ConnectionLost(_))
    }

    /// Attach table context for a schema creation failure.
    ///
    /// Connection loss, cancellation and type declaration errors keep their own
    /// classification so the retry loop and the caller can still see them.
    pub fn in_schema(self, table: &str) -> Self {
        match self {
            MigrationError::ConnectionLost(_)
            | MigrationError::Cancelled
            | MigrationError::InvalidTypeDeclaration(_)
            | MigrationError::Schema { .. } => self,
            MigrationError::Query(source) => MigrationError::Schema {
                table: table.to_string(),
                source,
            },
            other => MigrationError::Schema {
                table: table.to_string(),
                source: Box::new(other),
            },
        }
    }

    /// Attach table context for a row transfer failure.
    pub fn in_transfer(self, table: &str) -> Self {
        match self {
            MigrationError::ConnectionLost(_)
            | MigrationError::Cancelled
            | MigrationError::Transfer { .. } => self,
            MigrationError::Query(source) => MigrationError::Transfer {
                table: table.to_string(),
                source,
            },
            other => MigrationError::Transfer {
                table: table.to_string(),
                source: Box::new(other),
            },
        }
    }

    /// Format error with full details including error chain
    pub fn format_detailed(&self) -> String {
        let mut output = format!("Error: {}\n", self);

        let mut source = std::error::Error::source(self);
        let mut depth = 1;
        while let Some(err) = source {
            output.push_str(&format!("\nCaused by:\n  {}: {}", depth, err));
            source = err.source();
            depth += 1;
        }

        output
    }
}

/// Result type alias for migration operations.
pub type Result<T> = std::result::Result<T, MigrationError>;
