// ABOUTME: Table include/exclude filtering for selective migration
// ABOUTME: Narrows the enumerated MySQL table list while keeping source order

use crate::error::{MigrationError, Result};

/// Represents table selection rules
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TableFilter {
    include_tables: Option<Vec<String>>,
    exclude_tables: Option<Vec<String>>,
}

impl TableFilter {
    /// Creates a filter from CLI or config values
    pub fn new(
        include_tables: Option<Vec<String>>,
        exclude_tables: Option<Vec<String>>,
    ) -> Result<Self> {
        if include_tables.is_some() && exclude_tables.is_some() {
            return Err(MigrationError::configuration(
                "Cannot use both --mysql-tables and --exclude-mysql-tables",
            ));
        }

        for table in include_tables
            .iter()
            .chain(exclude_tables.iter())
            .flatten()
        {
            if table.trim().is_empty() {
                return Err(MigrationError::configuration(
                    "Table names in filters cannot be empty",
                ));
            }
        }

        Ok(Self {
            include_tables,
            exclude_tables,
        })
    }

    /// Creates an empty filter (migrate everything)
    pub fn empty() -> Self {
        Self::default()
    }

    /// Checks if any filters are active
    pub fn is_empty(&self) -> bool {
        self.include_tables.is_none() && self.exclude_tables.is_none()
    }

    /// Determines if a table should be migrated
    pub fn should_migrate_table(&self, table_name: &str) -> bool {
        if let Some(ref include) = self.include_tables {
            if !include.iter().any(|t| t == table_name) {
                return false;
            }
        }

        if let Some(ref exclude) = self.exclude_tables {
            if exclude.iter().any(|t| t == table_name) {
                return false;
            }
        }

        true
    }

    /// Keep only selected tables, in the order they were given
    pub fn apply(&self, tables: Vec<String>) -> Vec<String> {
        if self.is_empty() {
            return tables;
        }

        let total = tables.len();
        let selected: Vec<String> = tables
            .into_iter()
            .filter(|table| self.should_migrate_table(table))
            .collect();

        tracing::debug!("Table filter selected {} of {} table(s)", selected.len(), total);

        if let Some(ref include) = self.include_tables {
            for wanted in include {
                if !selected.contains(wanted) {
                    tracing::warn!(
                        "Table '{}' was requested but does not exist in the MySQL database",
                        crate::utils::sanitize_identifier(wanted)
                    );
                }
            }
        }

        selected
    }
}
