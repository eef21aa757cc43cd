// ABOUTME: MySQL to SQLite value conversion for row binding
// ABOUTME: Decodes text-protocol byte strings to TEXT, keeping NULL and non-UTF-8 bytes intact

use mysql_async::Value;
use rusqlite::types::Value as SqlValue;

/// Convert a MySQL value into a SQLite value ready for binding
///
/// - NULL → NULL
/// - Byte strings → TEXT when valid UTF-8, otherwise BLOB unchanged
/// - Integers → INTEGER (unsigned values above `i64::MAX` become TEXT)
/// - Floats/Doubles → REAL
/// - Dates/Times → TEXT in MySQL's own formats
///
/// # Examples
///
/// ```
/// # use mysql_async::Value;
/// # use rusqlite::types::Value as SqlValue;
/// # use mysql_sqlite_migrator::mysql::converter::mysql_value_to_sqlite;
/// assert_eq!(
///     mysql_value_to_sqlite(Value::Bytes(b"42".to_vec())),
///     SqlValue::Text("42".to_string())
/// );
/// assert_eq!(mysql_value_to_sqlite(Value::NULL), SqlValue::Null);
/// ```
pub fn mysql_value_to_sqlite(value: Value) -> SqlValue {
    match value {
        Value::NULL => SqlValue::Null,

        Value::Bytes(bytes) => match String::from_utf8(bytes) {
            Ok(text) => SqlValue::Text(text),
            Err(err) => SqlValue::Blob(err.into_bytes()),
        },

        Value::Int(i) => SqlValue::Integer(i),
        Value::UInt(u) => i64::try_from(u)
            .map(SqlValue::Integer)
            .unwrap_or_else(|_| SqlValue::Text(u.to_string())),

        Value::Float(f) => SqlValue::Real(f as f64),
        Value::Double(d) => SqlValue::Real(d),

        Value::Date(year, month, day, hour, minute, second, micro) => {
            let mut text = format!(
                "{:04}-{:02}-{:02} {:02}:{:02}:{:02}",
                year, month, day, hour, minute, second
            );
            if micro > 0 {
                text.push_str(&format!(".{:06}", micro));
            }
            SqlValue::Text(text)
        }

        Value::Time(is_negative, days, hours, minutes, seconds, micro) => {
            let total_hours = u64::from(days) * 24 + u64::from(hours);
            let mut text = format!(
                "{}{:02}:{:02}:{:02}",
                if is_negative { "-" } else { "" },
                total_hours,
                minutes,
                seconds
            );
            if micro > 0 {
                text.push_str(&format!(".{:06}", micro));
            }
            SqlValue::Text(text)
        }
    }
}

/// Convert a whole source row, keeping column order
pub fn decode_row(row: Vec<Value>) -> Vec<SqlValue> {
    row.into_iter().map(mysql_value_to_sqlite).collect()
}
