// ABOUTME: MySQL connection handling for the migration source
// ABOUTME: Builds connection options, classifies lost connections, and reconnects

pub mod converter;
pub mod reader;

use crate::config::MigrationConfig;
use crate::error::{MigrationError, Result};
use crate::migration::{RowQuery, SourceDatabase, SourceRow};
use crate::schema::ColumnDescriptor;
use mysql_async::{prelude::Queryable, Conn, DriverError, Opts, OptsBuilder};

/// Client-side "MySQL server has gone away"
const CR_SERVER_GONE_ERROR: u16 = 2006;
/// Client-side "Lost connection to MySQL server during query"
const CR_SERVER_LOST: u16 = 2013;
const ER_SERVER_SHUTDOWN: u16 = 1053;
const ER_CONNECTION_KILLED: u16 = 1927;
/// Server-side "Unknown database"
const ER_BAD_DB_ERROR: u16 = 1049;

/// Build connection options from the migration settings
///
/// # Errors
///
/// Returns a `Configuration` error when the user or database is missing.
pub fn build_opts(config: &MigrationConfig) -> Result<Opts> {
    config.validate()?;

    let builder = OptsBuilder::default()
        .ip_or_hostname(config.mysql_host.clone())
        .tcp_port(config.mysql_port)
        .user(config.mysql_user.clone())
        .pass(config.mysql_password.clone())
        .db_name(config.mysql_database.clone());

    Ok(Opts::from(builder))
}

/// Whether a driver error means the connection itself is gone
///
/// # Examples
///
/// ```
/// # use mysql_sqlite_migrator::mysql::is_connection_lost;
/// let err = mysql_async::Error::Driver(mysql_async::DriverError::ConnectionClosed);
/// assert!(is_connection_lost(&err));
/// ```
pub fn is_connection_lost(err: &mysql_async::Error) -> bool {
    match err {
        mysql_async::Error::Io(_) => true,
        mysql_async::Error::Driver(DriverError::ConnectionClosed) => true,
        mysql_async::Error::Server(server) => matches!(
            server.code,
            CR_SERVER_GONE_ERROR | CR_SERVER_LOST | ER_SERVER_SHUTDOWN | ER_CONNECTION_KILLED
        ),
        _ => false,
    }
}

/// Map a driver error onto the retryable / fatal split
pub fn classify(err: mysql_async::Error) -> MigrationError {
    if is_connection_lost(&err) {
        MigrationError::ConnectionLost(Box::new(err))
    } else {
        MigrationError::Query(Box::new(err))
    }
}

/// Connect to MySQL and verify the connection answers
///
/// # Errors
///
/// Returns `Connection` when the handshake fails (bad credentials, unknown
/// database, unreachable host) or the server does not answer a ping.
pub async fn connect_mysql(opts: &Opts) -> Result<Conn> {
    tracing::info!(
        "Connecting to MySQL at {}:{}",
        opts.ip_or_hostname(),
        opts.tcp_port()
    );

    let mut conn = Conn::new(opts.clone()).await.map_err(|err| {
        if let mysql_async::Error::Server(ref server) = err {
            if server.code == ER_BAD_DB_ERROR {
                tracing::error!("MySQL Database does not exist!");
            }
        }
        tracing::error!("{}", err);
        MigrationError::Connection(Box::new(err))
    })?;

    conn.ping().await.map_err(|err| {
        tracing::error!("MySQL connection is not usable: {}", err);
        MigrationError::Connection(Box::new(err))
    })?;

    tracing::debug!("Successfully connected to MySQL");

    Ok(conn)
}

/// The MySQL database being migrated
pub struct MySqlSource {
    conn: Conn,
    opts: Opts,
    buffered: bool,
}

impl MySqlSource {
    /// Connect using the migration settings
    pub async fn connect(config: &MigrationConfig) -> Result<Self> {
        let opts = build_opts(config)?;
        let conn = connect_mysql(&opts).await?;
        Ok(Self {
            conn,
            opts,
            buffered: config.buffered,
        })
    }

    pub fn database(&self) -> Option<&str> {
        self.opts.db_name()
    }
}

impl SourceDatabase for MySqlSource {
    async fn list_tables(&mut self) -> Result<Vec<String>> {
        reader::list_tables(&mut self.conn).await
    }

    async fn table_columns(&mut self, table: &str) -> Result<Vec<ColumnDescriptor>> {
        reader::table_columns(&mut self.conn, table).await
    }

    async fn row_count(&mut self, table: &str) -> Result<u64> {
        reader::row_count(&mut self.conn, table).await
    }

    async fn fetch_rows(&mut self, query: &RowQuery) -> Result<Vec<SourceRow>> {
        reader::fetch_rows(&mut self.conn, query, self.buffered).await
    }

    async fn stream_rows<F>(&mut self, query: &RowQuery, batch: usize, sink: F) -> Result<()>
    where
        F: FnMut(Vec<SourceRow>) -> Result<()>,
    {
        reader::stream_rows(&mut self.conn, query, batch, self.buffered, sink).await
    }

    async fn reconnect(&mut self) -> Result<()> {
        let fresh = Conn::new(self.opts.clone())
            .await
            .map_err(|err| MigrationError::ConnectionLost(Box::new(err)))?;
        let stale = std::mem::replace(&mut self.conn, fresh);

        // The old connection is already broken; closing it is best effort
        if let Err(err) = stale.disconnect().await {
            tracing::debug!("Ignoring error while closing stale MySQL connection: {}", err);
        }

        tracing::info!("Reconnected to MySQL");
        Ok(())
    }

    async fn close(self) -> Result<()> {
        self.conn.disconnect().await.map_err(classify)
    }
}
