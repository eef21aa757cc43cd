// ABOUTME: Table metadata model and SQLite DDL synthesis from MySQL column metadata
// ABOUTME: Builds a structured table definition first, then renders CREATE TABLE/INDEX text

use crate::error::Result;
use crate::typemap::translate_type;
use crate::utils::{quote_sqlite_ident, sqlite_object_name};
use std::collections::HashSet;

/// Key classification reported by MySQL for a column (`COLUMN_KEY`)
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KeyKind {
    None,
    Primary,
    Unique,
    Indexed,
}

impl KeyKind {
    /// Parse MySQL's `PRI` / `UNI` / `MUL` markers; anything else is `None`
    pub fn from_mysql(key: &str) -> Self {
        match key.trim().to_ascii_uppercase().as_str() {
            "PRI" => KeyKind::Primary,
            "UNI" => KeyKind::Unique,
            "MUL" => KeyKind::Indexed,
            _ => KeyKind::None,
        }
    }
}

/// One column as introspected from the source table
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ColumnDescriptor {
    pub name: String,
    pub raw_type: String,
    pub nullable: bool,
    pub key_kind: KeyKind,
}

impl ColumnDescriptor {
    pub fn new(
        name: impl Into<String>,
        raw_type: impl Into<String>,
        nullable: bool,
        key_kind: KeyKind,
    ) -> Self {
        Self {
            name: name.into(),
            raw_type: raw_type.into(),
            nullable,
            key_kind,
        }
    }
}

/// A source table: its name and columns in introspection order.
///
/// Column order decides the target column order and the positional bind order
/// of the insert statement.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TableSchema {
    pub name: String,
    pub columns: Vec<ColumnDescriptor>,
}

impl TableSchema {
    pub fn new(name: impl Into<String>, columns: Vec<ColumnDescriptor>) -> Self {
        Self {
            name: name.into(),
            columns,
        }
    }

    pub fn column_names(&self) -> Vec<String> {
        self.columns.iter().map(|c| c.name.clone()).collect()
    }

    /// Primary key columns in encounter order
    pub fn primary_key(&self) -> Vec<String> {
        self.columns
            .iter()
            .filter(|c| c.key_kind == KeyKind::Primary)
            .map(|c| c.name.clone())
            .collect()
    }

    /// Parameterized insert that skips rows conflicting with existing keys.
    ///
    /// # Examples
    ///
    /// ```
    /// # use mysql_sqlite_migrator::schema::{ColumnDescriptor, KeyKind, TableSchema};
    /// let schema = TableSchema::new(
    ///     "tags",
    ///     vec![
    ///         ColumnDescriptor::new("id", "int(11)", false, KeyKind::Primary),
    ///         ColumnDescriptor::new("name", "varchar(32)", true, KeyKind::None),
    ///     ],
    /// );
    /// assert_eq!(
    ///     schema.insert_statement(),
    ///     r#"INSERT OR IGNORE INTO "tags" ("id", "name") VALUES (?, ?)"#
    /// );
    /// ```
    pub fn insert_statement(&self) -> String {
        let columns: Vec<String> = self
            .columns
            .iter()
            .map(|c| quote_sqlite_ident(&c.name))
            .collect();
        let placeholders = vec!["?"; self.columns.len()];

        format!(
            "INSERT OR IGNORE INTO {} ({}) VALUES ({})",
            quote_sqlite_ident(&self.name),
            columns.join(", "),
            placeholders.join(", ")
        )
    }
}

/// A rendered column clause: `"name" TYPE NULL|NOT NULL`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ColumnClause {
    pub name: String,
    pub sqlite_type: String,
    pub nullable: bool,
}

impl ColumnClause {
    fn render(&self) -> String {
        format!(
            "{} {} {}",
            quote_sqlite_ident(&self.name),
            self.sqlite_type,
            if self.nullable { "NULL" } else { "NOT NULL" }
        )
    }
}

/// A secondary index on a single column
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IndexDefinition {
    pub name: String,
    pub table: String,
    pub column: String,
    pub unique: bool,
}

impl IndexDefinition {
    /// `CREATE [UNIQUE] INDEX` statement for this index
    pub fn render(&self) -> String {
        format!(
            "CREATE {}INDEX {} ON {} ({});",
            if self.unique { "UNIQUE " } else { "" },
            sqlite_object_name(&self.name),
            quote_sqlite_ident(&self.table),
            quote_sqlite_ident(&self.column)
        )
    }
}

/// Structured form of a target table before it is rendered to SQL
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TableDefinition {
    pub name: String,
    pub columns: Vec<ColumnClause>,
    pub primary_key: Vec<String>,
    pub indexes: Vec<IndexDefinition>,
}

impl TableDefinition {
    /// Translate a source table into its target definition
    pub fn from_schema(schema: &TableSchema) -> Result<Self> {
        let mut columns = Vec::with_capacity(schema.columns.len());
        let mut primary_key = Vec::new();
        let mut indexes = Vec::new();
        let mut index_names = HashSet::new();

        for column in &schema.columns {
            columns.push(ColumnClause {
                name: column.name.clone(),
                sqlite_type: translate_type(&column.raw_type)?,
                nullable: column.nullable,
            });

            match column.key_kind {
                KeyKind::Primary => primary_key.push(column.name.clone()),
                KeyKind::Unique | KeyKind::Indexed => {
                    // Columns whose slugs collide get a numeric suffix
                    let mut name = index_name(&schema.name, &column.name);
                    let mut n = 2;
                    while !index_names.insert(name.clone()) {
                        name = suffixed_index_name(&schema.name, &column.name, n);
                        n += 1;
                    }
                    indexes.push(IndexDefinition {
                        name,
                        table: schema.name.clone(),
                        column: column.name.clone(),
                        unique: column.key_kind == KeyKind::Unique,
                    });
                }
                KeyKind::None => {}
            }
        }

        Ok(Self {
            name: schema.name.clone(),
            columns,
            primary_key,
            indexes,
        })
    }

    /// Render the definition to SQL text
    pub fn render(&self) -> TargetDdl {
        let mut clauses: Vec<String> = self.columns.iter().map(ColumnClause::render).collect();

        if !self.primary_key.is_empty() {
            let keys: Vec<String> = self
                .primary_key
                .iter()
                .map(|k| quote_sqlite_ident(k))
                .collect();
            clauses.push(format!("PRIMARY KEY({})", keys.join(", ")));
        }

        TargetDdl {
            create_statement: format!(
                "CREATE TABLE IF NOT EXISTS {} ( {});",
                quote_sqlite_ident(&self.name),
                clauses.join(", ")
            ),
            index_statements: self.indexes.iter().map(IndexDefinition::render).collect(),
        }
    }
}

/// Rendered DDL for one table
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TargetDdl {
    pub create_statement: String,
    pub index_statements: Vec<String>,
}

impl TargetDdl {
    /// The create statement followed by every index statement, as one script
    pub fn script(&self) -> String {
        let mut script = self.create_statement.clone();
        for statement in &self.index_statements {
            script.push_str(statement);
        }
        script
    }
}

/// Synthesize the target DDL for a source table
///
/// # Examples
///
/// ```
/// # use mysql_sqlite_migrator::schema::{synthesize, ColumnDescriptor, KeyKind, TableSchema};
/// let schema = TableSchema::new(
///     "orders",
///     vec![
///         ColumnDescriptor::new("id", "INT", false, KeyKind::Primary),
///         ColumnDescriptor::new("sku", "VARCHAR(50)", false, KeyKind::Unique),
///     ],
/// );
/// let ddl = synthesize(&schema).unwrap();
/// assert_eq!(ddl.index_statements.len(), 1);
/// assert!(ddl.create_statement.ends_with(r#"PRIMARY KEY("id"));"#));
/// ```
pub fn synthesize(schema: &TableSchema) -> Result<TargetDdl> {
    Ok(TableDefinition::from_schema(schema)?.render())
}

/// `<table>_<column slug>_IDX`
pub fn index_name(table: &str, column: &str) -> String {
    format!("{}_{}_IDX", table, slugify(column))
}

/// `<table>_<column slug>_<n>_IDX`, the fallback when the plain name is taken
pub fn suffixed_index_name(table: &str, column: &str, n: u32) -> String {
    format!("{}_{}_{}_IDX", table, slugify(column), n)
}

/// Lowercase a name and collapse every run of non-alphanumeric characters to `_`.
///
/// Leading and trailing separators are dropped. Non-ASCII characters count
/// as separators rather than being transliterated, so `créé` becomes `cr`;
/// columns that end up with the same slug are told apart by the numeric
/// suffix in [`TableDefinition::from_schema`].
pub fn slugify(name: &str) -> String {
    let mut slug = String::with_capacity(name.len());
    let mut pending_separator = false;

    for ch in name.chars() {
        if ch.is_ascii_alphanumeric() {
            if pending_separator && !slug.is_empty() {
                slug.push('_');
            }
            pending_separator = false;
            slug.push(ch.to_ascii_lowercase());
        } else {
            pending_separator = true;
        }
    }

    slug
}
