// ABOUTME: Library module for mysql-sqlite-migrator
// ABOUTME: Exports all core functionality for use in binary and tests

pub mod config;
pub mod error;
pub mod filters;
pub mod migration;
pub mod mysql;
pub mod progress;
pub mod schema;
pub mod sqlite;
pub mod typemap;
pub mod utils;
