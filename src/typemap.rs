// ABOUTME: Translation of MySQL column type declarations into SQLite column types
// ABOUTME: Pure lookup with a TEXT fallback, never touches a database

use crate::error::{MigrationError, Result};

/// Map a MySQL column type declaration to a SQLite column type.
///
/// The declaration is what `INFORMATION_SCHEMA.COLUMNS.COLUMN_TYPE` reports, e.g.
/// `int(11)`, `varchar(191)`, `bigint unsigned` or `enum('a','b')`.
///
/// - Integer families keep their name, `INT`/`INTEGER` become `INTEGER`
/// - `DECIMAL`, `NUMERIC`, `YEAR`, `TIME` become `NUMERIC`
/// - `DATETIME`/`TIMESTAMP` become `DATETIME`
/// - Binary and blob types become `BLOB`
/// - `CHAR`, `NCHAR`, `VARCHAR`, `NVARCHAR` keep their length suffix, e.g. `VARCHAR(191)`
/// - Anything else becomes `TEXT`
///
/// # Errors
///
/// Returns `InvalidTypeDeclaration` when no leading type name can be extracted
/// (empty input, or input starting with `(`).
///
/// # Examples
///
/// ```
/// # use mysql_sqlite_migrator::typemap::translate_type;
/// assert_eq!(translate_type("varchar(191)").unwrap(), "VARCHAR(191)");
/// assert_eq!(translate_type("int(11)").unwrap(), "INTEGER");
/// assert_eq!(translate_type("enum('a','b')").unwrap(), "TEXT");
/// assert!(translate_type("(10)").is_err());
/// ```
pub fn translate_type(column_type: &str) -> Result<String> {
    let data_type = type_name(column_type)?;

    let translated = match data_type.as_str() {
        "TINYINT" => "TINYINT",
        "SMALLINT" => "SMALLINT",
        "MEDIUMINT" => "MEDIUMINT",
        "INT" | "INTEGER" => "INTEGER",
        "BIGINT" => "BIGINT",

        "DOUBLE" => "DOUBLE",
        "FLOAT" => "FLOAT",
        "REAL" => "REAL",

        "DECIMAL" | "YEAR" | "TIME" | "NUMERIC" => "NUMERIC",

        "DATETIME" | "TIMESTAMP" => "DATETIME",
        "DATE" => "DATE",

        "BIT" | "BINARY" | "BLOB" | "LONGBLOB" | "MEDIUMBLOB" | "TINYBLOB" | "VARBINARY" => {
            "BLOB"
        }

        "BOOLEAN" => "BOOLEAN",

        "CHAR" | "NCHAR" | "NVARCHAR" | "VARCHAR" => {
            return Ok(format!("{}{}", data_type, length_suffix(column_type)));
        }

        _ => "TEXT",
    };

    Ok(translated.to_string())
}

/// Extract the upper-cased type name that leads a declaration.
///
/// Everything before the first `(` is the type clause; its first word is the
/// type name, so modifiers such as `unsigned` or `zerofill` are ignored.
fn type_name(column_type: &str) -> Result<String> {
    let clause = column_type
        .trim()
        .split('(')
        .next()
        .unwrap_or_default()
        .trim();

    clause
        .split_whitespace()
        .next()
        .map(|name| name.to_uppercase())
        .ok_or_else(|| MigrationError::InvalidTypeDeclaration(column_type.to_string()))
}

/// The trailing `(digits)` suffix of a declaration, or an empty string
fn length_suffix(column_type: &str) -> &str {
    let trimmed = column_type.trim_end();
    let Some(body) = trimmed.strip_suffix(')') else {
        return "";
    };
    let Some(open) = body.rfind('(') else {
        return "";
    };
    let digits = &body[open + 1..];

    if !digits.is_empty() && digits.bytes().all(|b| b.is_ascii_digit()) {
        &trimmed[open..]
    } else {
        ""
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_integer_types() {
        assert_eq!(translate_type("tinyint(1)").unwrap(), "TINYINT");
        assert_eq!(translate_type("smallint(6)").unwrap(), "SMALLINT");
        assert_eq!(translate_type("mediumint(9)").unwrap(), "MEDIUMINT");
        assert_eq!(translate_type("INT(11)").unwrap(), "INTEGER");
        assert_eq!(translate_type("integer").unwrap(), "INTEGER");
        assert_eq!(translate_type("bigint(20)").unwrap(), "BIGINT");
    }

    #[test]
    fn test_integer_modifiers_are_ignored() {
        // Only the first word names the type. Keeping the whole clause would
        // turn `bigint unsigned` into an unknown type and store it as TEXT.
        assert_ne!(translate_type("bigint unsigned").unwrap(), "TEXT");
        assert_eq!(translate_type("int unsigned").unwrap(), "INTEGER");
        assert_eq!(translate_type("int(10) unsigned zerofill").unwrap(), "INTEGER");
        assert_eq!(translate_type("bigint unsigned").unwrap(), "BIGINT");
    }

    #[test]
    fn test_floating_and_numeric_types() {
        assert_eq!(translate_type("double").unwrap(), "DOUBLE");
        assert_eq!(translate_type("float(7,4)").unwrap(), "FLOAT");
        assert_eq!(translate_type("real").unwrap(), "REAL");
        assert_eq!(translate_type("decimal(10,2)").unwrap(), "NUMERIC");
        assert_eq!(translate_type("numeric(5)").unwrap(), "NUMERIC");
        assert_eq!(translate_type("year(4)").unwrap(), "NUMERIC");
        assert_eq!(translate_type("time").unwrap(), "NUMERIC");
    }

    #[test]
    fn test_datetime_types() {
        assert_eq!(translate_type("datetime").unwrap(), "DATETIME");
        assert_eq!(translate_type("timestamp(6)").unwrap(), "DATETIME");
        assert_eq!(translate_type("date").unwrap(), "DATE");
    }

    #[test]
    fn test_binary_types() {
        for ty in [
            "bit(1)",
            "binary(16)",
            "blob",
            "longblob",
            "mediumblob",
            "tinyblob",
            "varbinary(255)",
        ] {
            assert_eq!(translate_type(ty).unwrap(), "BLOB", "type {}", ty);
        }
    }

    #[test]
    fn test_string_types_keep_length() {
        assert_eq!(translate_type("VARCHAR(191)").unwrap(), "VARCHAR(191)");
        assert_eq!(translate_type("char(2)").unwrap(), "CHAR(2)");
        assert_eq!(translate_type("nchar(10)").unwrap(), "NCHAR(10)");
        assert_eq!(translate_type("nvarchar(40)").unwrap(), "NVARCHAR(40)");
        assert_eq!(translate_type("varchar").unwrap(), "VARCHAR");
    }

    #[test]
    fn test_unknown_types_fall_back_to_text() {
        assert_eq!(translate_type("ENUM('a','b')").unwrap(), "TEXT");
        assert_eq!(translate_type("set('x','y')").unwrap(), "TEXT");
        assert_eq!(translate_type("json").unwrap(), "TEXT");
        assert_eq!(translate_type("longtext").unwrap(), "TEXT");
        assert_eq!(translate_type("geometry").unwrap(), "TEXT");
    }

    #[test]
    fn test_boolean() {
        assert_eq!(translate_type("boolean").unwrap(), "BOOLEAN");
    }

    #[test]
    fn test_malformed_declarations_are_rejected() {
        for ty in ["", "   ", "(10)", " (191)"] {
            let err = translate_type(ty).unwrap_err();
            assert!(
                matches!(err, MigrationError::InvalidTypeDeclaration(_)),
                "'{}' should be rejected",
                ty
            );
        }
    }

    #[test]
    fn test_length_suffix() {
        assert_eq!(length_suffix("varchar(191)"), "(191)");
        assert_eq!(length_suffix("decimal(10,2)"), "");
        assert_eq!(length_suffix("enum('1')"), "");
        assert_eq!(length_suffix("varchar"), "");
        assert_eq!(length_suffix("varchar()"), "");
    }

    #[test]
    fn test_translation_is_deterministic() {
        for ty in ["int(11)", "varchar(50)", "enum('a')", "longblob"] {
            assert_eq!(translate_type(ty).unwrap(), translate_type(ty).unwrap());
        }
    }
}
