/// Query Result Module
///
/// This module defines the result model shared by the backend and the
/// renderer: tabular results with coarse-typed, nullable values, and the
/// outcome of a command-shaped statement.

use chrono::NaiveDateTime;
use std::fmt;

/// Display format for timestamp values.
pub const TIMESTAMP_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

/// Coarse type tag of a result column.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ValueKind {
    Text,
    Integer,
    Floating,
    Boolean,
    Timestamp,
    Binary,
}

/// A single scalar value of a result row.
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    Null,
    Text(String),
    Integer(i64),
    Floating(f64),
    Boolean(bool),
    Timestamp(NaiveDateTime),
    Binary(Vec<u8>),
}

impl Value {
    /// Returns the coarse type tag, or `None` for SQL NULL.
    pub fn kind(&self) -> Option<ValueKind> {
        match self {
            Value::Null => None,
            Value::Text(_) => Some(ValueKind::Text),
            Value::Integer(_) => Some(ValueKind::Integer),
            Value::Floating(_) => Some(ValueKind::Floating),
            Value::Boolean(_) => Some(ValueKind::Boolean),
            Value::Timestamp(_) => Some(ValueKind::Timestamp),
            Value::Binary(_) => Some(ValueKind::Binary),
        }
    }
}

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Value::Text(s.to_string())
    }
}

impl From<String> for Value {
    fn from(s: String) -> Self {
        Value::Text(s)
    }
}

impl From<i64> for Value {
    fn from(i: i64) -> Self {
        Value::Integer(i)
    }
}

impl From<i32> for Value {
    fn from(i: i32) -> Self {
        Value::Integer(i64::from(i))
    }
}

impl From<f64> for Value {
    fn from(x: f64) -> Self {
        Value::Floating(x)
    }
}

impl From<bool> for Value {
    fn from(b: bool) -> Self {
        Value::Boolean(b)
    }
}

impl<T: Into<Value>> From<Option<T>> for Value {
    fn from(v: Option<T>) -> Self {
        v.map(Into::into).unwrap_or(Value::Null)
    }
}

/// Console form of a value: NULL is empty, booleans are `t`/`f`,
/// timestamps use [`TIMESTAMP_FORMAT`] and binary data is shown as raw text.
impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Null => Ok(()),
            Value::Text(s) => f.write_str(s),
            Value::Integer(i) => write!(f, "{}", i),
            Value::Floating(x) => write!(f, "{}", x),
            Value::Boolean(b) => f.write_str(if *b { "t" } else { "f" }),
            Value::Timestamp(ts) => write!(f, "{}", ts.format(TIMESTAMP_FORMAT)),
            Value::Binary(bytes) => f.write_str(&String::from_utf8_lossy(bytes)),
        }
    }
}

/// Represents the tabular result of a query-shaped statement
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ResultSet {
    /// Column labels, in result order
    pub columns: Vec<String>,
    /// Rows, each holding one value per column
    pub rows: Vec<Vec<Value>>,
    /// Set when the backend stopped collecting before the last row
    pub truncated: bool,
}

impl ResultSet {
    /// Creates a new ResultSet from column names and row data
    pub fn new(columns: Vec<String>, rows: Vec<Vec<Value>>) -> Self {
        ResultSet {
            columns,
            rows,
            truncated: false,
        }
    }

    /// Builds a result from string-like column labels.
    pub fn with_columns<S: AsRef<str>>(columns: &[S]) -> Self {
        ResultSet {
            columns: columns.iter().map(|c| c.as_ref().to_string()).collect(),
            rows: Vec::new(),
            truncated: false,
        }
    }

    /// Appends a row; builder style.
    pub fn row(mut self, values: Vec<Value>) -> Self {
        self.rows.push(values);
        self
    }

    /// Marks the result as cut short; builder style.
    pub fn truncated(mut self) -> Self {
        self.truncated = true;
        self
    }

    /// Number of rows returned by the backend
    pub fn row_count(&self) -> usize {
        self.rows.len()
    }

    /// The first value of the first row, if any.
    pub fn first_value(&self) -> Option<&Value> {
        self.rows.first().and_then(|r| r.first())
    }
}

/// What a successfully routed statement produced.
#[derive(Debug, Clone, PartialEq)]
pub enum CommandOutcome {
    /// A query-shaped statement and its rows
    Rows(ResultSet),
    /// A command-shaped statement: tag and affected-row count
    Command { tag: &'static str, rows_affected: u64 },
    /// A transaction keyword acknowledged by the backend
    Transaction { tag: &'static str },
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    #[test]
    fn test_value_display() {
        assert_eq!(Value::Null.to_string(), "");
        assert_eq!(Value::Boolean(true).to_string(), "t");
        assert_eq!(Value::Boolean(false).to_string(), "f");
        assert_eq!(Value::Integer(-42).to_string(), "-42");
        assert_eq!(Value::Floating(1.5).to_string(), "1.5");
        assert_eq!(Value::Binary(b"raw bytes".to_vec()).to_string(), "raw bytes");

        let ts = NaiveDate::from_ymd_opt(2024, 3, 1)
            .unwrap()
            .and_hms_milli_opt(7, 8, 9, 345)
            .unwrap();
        assert_eq!(Value::Timestamp(ts).to_string(), "2024-03-01 07:08:09");
    }

    #[test]
    fn test_value_conversions() {
        assert_eq!(Value::from("ab"), Value::Text("ab".to_string()));
        assert_eq!(Value::from(None::<i64>), Value::Null);
        assert_eq!(Value::from(Some(3i64)), Value::Integer(3));
        assert_eq!(Value::Integer(1).kind(), Some(ValueKind::Integer));
        assert_eq!(Value::Null.kind(), None);
    }

    #[test]
    fn test_result_set_builder() {
        let rs = ResultSet::with_columns(&["id", "name"])
            .row(vec![Value::Integer(1), "ab".into()])
            .row(vec![Value::Integer(2), Value::Null]);
        assert_eq!(rs.columns, vec!["id", "name"]);
        assert_eq!(rs.row_count(), 2);
        assert_eq!(rs.first_value(), Some(&Value::Integer(1)));
    }
}
