// ABOUTME: Creates one target table and its indexes from MySQL column metadata
// ABOUTME: Retries once on a lost MySQL connection before giving up on the run

use super::{MigrationSession, SourceDatabase};
use crate::error::Result;
use crate::progress::ProgressObserver;
use crate::schema::{suffixed_index_name, TableDefinition, TableSchema};
use std::collections::HashSet;

impl<S: SourceDatabase, P: ProgressObserver> MigrationSession<S, P> {
    /// Create `table` in SQLite, returning the introspected source schema.
    ///
    /// The table statement is `CREATE TABLE IF NOT EXISTS` and indexes that
    /// already exist on the same column are left alone, so running against a
    /// populated target is harmless. An index name already used by another
    /// table gets a numeric suffix instead of being dropped. Any failure
    /// other than a lost connection is fatal.
    pub async fn create_table(&mut self, table: &str) -> Result<TableSchema> {
        let mut attempt = 0;
        loop {
            if attempt > 0 {
                self.reconnect_source().await?;
            }

            match self.try_create_table(table).await {
                Ok(schema) => return Ok(schema),
                Err(err) if self.should_retry(&err, attempt) => attempt += 1,
                Err(err) => {
                    tracing::error!("Failed creating table {}: {}", table, err);
                    return Err(err);
                }
            }
        }
    }

    async fn try_create_table(&mut self, table: &str) -> Result<TableSchema> {
        let columns = self
            .source
            .table_columns(table)
            .await
            .map_err(|err| err.in_schema(table))?;
        let schema = TableSchema::new(table, columns);

        let definition = TableDefinition::from_schema(&schema)?;
        let ddl = definition.render();

        let mut script = ddl.create_statement;
        let mut taken: HashSet<String> =
            definition.indexes.iter().map(|index| index.name.clone()).collect();

        for mut index in definition.indexes {
            let mut n = 2;
            loop {
                let existing = self
                    .target
                    .find_index(&index.name)
                    .map_err(|err| err.in_schema(table))?;
                match existing {
                    None => {
                        script.push_str(&index.render());
                        break;
                    }
                    Some(existing) if existing.covers(&index.table, &index.column) => {
                        tracing::debug!("Index '{}' already exists, skipping", index.name);
                        break;
                    }
                    Some(existing) => {
                        // Another table or column owns the name; move to the next free suffix
                        let mut name = suffixed_index_name(table, &index.column, n);
                        while !taken.insert(name.clone()) {
                            n += 1;
                            name = suffixed_index_name(table, &index.column, n);
                        }
                        n += 1;
                        tracing::debug!(
                            "Index name '{}' belongs to table '{}', using '{}'",
                            index.name,
                            existing.table,
                            name
                        );
                        index.name = name;
                    }
                }
            }
        }

        tracing::debug!("{}", script);

        self.target
            .execute_script(&script)
            .map_err(|err| err.in_schema(table))?;

        Ok(schema)
    }
}
