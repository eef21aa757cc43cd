// ABOUTME: CLI entry point for mysql-sqlite-migrator
// ABOUTME: Merges flags with an optional config file, sets up logging, and runs the migration

use anyhow::{anyhow, Context};
use clap::{ArgAction, Parser};
use indicatif::{ProgressBar, ProgressStyle};
use mysql_sqlite_migrator::config::MigrationConfig;
use mysql_sqlite_migrator::error::MigrationError;
use mysql_sqlite_migrator::migration::{MigrationSession, TransferOptions};
use mysql_sqlite_migrator::mysql::MySqlSource;
use mysql_sqlite_migrator::progress::{LogProgress, ProgressEvent, ProgressObserver};
use mysql_sqlite_migrator::sqlite::SqliteTarget;
use std::fs::File;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tokio::sync::mpsc::{self, UnboundedReceiver, UnboundedSender};
use tokio::task::JoinHandle;
use tracing_subscriber::prelude::*;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "mysql-sqlite-migrator")]
#[command(about = "Transfer a MySQL database to a SQLite file", long_about = None)]
// -h is the MySQL host, so help is long-only
#[command(disable_help_flag = true)]
struct Cli {
    /// SQLite database file
    #[arg(short = 'f', long)]
    sqlite_file: Option<PathBuf>,
    /// MySQL user
    #[arg(short = 'u', long)]
    mysql_user: Option<String>,
    /// MySQL password
    #[arg(short = 'p', long)]
    mysql_password: Option<String>,
    /// Prompt for the MySQL password instead of passing it on the command line
    #[arg(long, conflicts_with = "mysql_password")]
    prompt_mysql_password: bool,
    /// MySQL database name
    #[arg(short = 'd', long)]
    mysql_database: Option<String>,
    /// MySQL host [default: localhost]
    #[arg(short = 'h', long)]
    mysql_host: Option<String>,
    /// MySQL port [default: 3306]
    #[arg(short = 'P', long)]
    mysql_port: Option<u16>,
    /// Rows per chunk; 0 or less copies each table in one batch
    #[arg(short = 'c', long, allow_hyphen_values = true)]
    chunk: Option<i64>,
    /// VACUUM the SQLite file after the transfer
    #[arg(short = 'V', long)]
    vacuum: bool,
    /// Collect each MySQL result set before converting it
    #[arg(short = 'K', long)]
    use_buffered_cursors: bool,
    /// Also write log output to this file
    #[arg(short = 'l', long)]
    log_file: Option<PathBuf>,
    /// Transfer only these tables (comma-separated)
    #[arg(short = 't', long, value_delimiter = ',', conflicts_with = "exclude_mysql_tables")]
    mysql_tables: Option<Vec<String>>,
    /// Transfer every table except these (comma-separated)
    #[arg(short = 'e', long, value_delimiter = ',')]
    exclude_mysql_tables: Option<Vec<String>>,
    /// TOML file with default settings; flags override it
    #[arg(long)]
    config: Option<PathBuf>,
    /// Print help
    #[arg(long, action = ArgAction::Help)]
    help: Option<bool>,
}

impl Cli {
    /// Start from the config file (if any) and overlay every flag that was given
    fn into_config(self) -> anyhow::Result<MigrationConfig> {
        let mut config = match &self.config {
            Some(path) => MigrationConfig::from_file(path)?,
            None => MigrationConfig::default(),
        };

        if self.sqlite_file.is_some() {
            config.sqlite_file = self.sqlite_file;
        }
        if self.mysql_user.is_some() {
            config.mysql_user = self.mysql_user;
        }
        if self.mysql_password.is_some() {
            config.mysql_password = self.mysql_password;
        }
        if self.mysql_database.is_some() {
            config.mysql_database = self.mysql_database;
        }
        if let Some(host) = self.mysql_host {
            config.mysql_host = host;
        }
        if let Some(port) = self.mysql_port {
            config.mysql_port = port;
        }
        if self.chunk.is_some() {
            config.chunk = self.chunk;
        }
        if self.log_file.is_some() {
            config.log_file = self.log_file;
        }
        config.vacuum |= self.vacuum;
        config.buffered |= self.use_buffered_cursors;

        // A table list on the command line replaces both lists from the file
        if self.mysql_tables.is_some() || self.exclude_mysql_tables.is_some() {
            config.include_tables = self.mysql_tables;
            config.exclude_tables = self.exclude_mysql_tables;
        }

        if self.prompt_mysql_password {
            let password = dialoguer::Password::new()
                .with_prompt("MySQL password")
                .allow_empty_password(true)
                .interact()
                .context("Failed to read MySQL password")?;
            config.mysql_password = Some(password);
        }

        Ok(config)
    }
}

/// Install the subscriber: stdout always, plus a plain-text copy in `log_file`
fn init_logging(log_file: Option<&Path>) -> anyhow::Result<()> {
    // Default to INFO level if RUST_LOG not set
    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

    let file_layer = match log_file {
        Some(path) => {
            let file = File::create(path)
                .with_context(|| format!("Failed to create log file {}", path.display()))?;
            Some(
                tracing_subscriber::fmt::layer()
                    .with_ansi(false)
                    .with_writer(Arc::new(file)),
            )
        }
        None => None,
    };

    tracing_subscriber::registry()
        .with(env_filter)
        .with(tracing_subscriber::fmt::layer())
        .with(file_layer)
        .try_init()
        .map_err(|e| anyhow!("Failed to initialize logging: {}", e))
}

/// Draw one bar per table from the engine's progress events.
///
/// Every event is also logged at debug level, so a log file keeps the
/// chunk-by-chunk history the bars erase.
fn spawn_progress_renderer(
    mut events: UnboundedReceiver<ProgressEvent>,
) -> anyhow::Result<JoinHandle<()>> {
    let style = ProgressStyle::with_template(
        "{msg:20} [{elapsed_precise}] [{wide_bar}] {pos:>8}/{len:<8} rows ({eta})",
    )
    .map_err(|e| anyhow!("Failed to set progress bar template: {}", e))?;

    Ok(tokio::spawn(async move {
        let mut bar: Option<ProgressBar> = None;
        let mut log = LogProgress;
        while let Some(event) = events.recv().await {
            log.notify(&event);
            match event {
                ProgressEvent::TableStarted {
                    table, total_rows, ..
                } => {
                    let pb = ProgressBar::new(total_rows);
                    pb.set_style(style.clone());
                    pb.set_message(table);
                    bar = Some(pb);
                }
                ProgressEvent::ChunkCopied { rows, .. } => {
                    if let Some(pb) = &bar {
                        pb.inc(rows);
                    }
                }
                ProgressEvent::TableFinished { .. } => {
                    if let Some(pb) = bar.take() {
                        pb.finish_and_clear();
                    }
                }
                _ => {}
            }
        }
        if let Some(pb) = bar.take() {
            pb.abandon();
        }
    }))
}

async fn migrate(
    config: MigrationConfig,
    progress: UnboundedSender<ProgressEvent>,
) -> Result<(), MigrationError> {
    config.validate()?;
    let options = TransferOptions::from_config(&config)?;

    let sqlite_file = config
        .sqlite_file
        .as_deref()
        .ok_or_else(|| MigrationError::configuration("Please provide a SQLite file"))?;
    let target = SqliteTarget::open(sqlite_file)?;
    let source = MySqlSource::connect(&config).await?;

    let cancel = Arc::new(AtomicBool::new(false));
    {
        let cancel = cancel.clone();
        tokio::spawn(async move {
            if tokio::signal::ctrl_c().await.is_ok() {
                tracing::warn!("Interrupt received, stopping at the next chunk boundary");
                cancel.store(true, Ordering::SeqCst);
            }
        });
    }

    MigrationSession::new(source, target, options)
        .with_observer(progress)
        .with_cancel_flag(cancel)
        .run()
        .await?;

    Ok(())
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> anyhow::Result<()> {
    let config = Cli::parse().into_config()?;

    init_logging(config.log_file.as_deref())?;
    tracing::debug!("{:?}", config);

    let (tx, rx) = mpsc::unbounded_channel();
    let renderer = spawn_progress_renderer(rx)?;

    let result = migrate(config, tx).await;

    // The sender is gone once migrate returns, so the renderer drains and exits
    if let Err(err) = renderer.await {
        tracing::debug!("Progress renderer stopped abnormally: {}", err);
    }

    if let Err(err) = result {
        tracing::error!("{}", err.format_detailed());
        return Err(err.into());
    }

    Ok(())
}
