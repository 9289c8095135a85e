// Database Driver Traits
// Defines the connection abstraction every backend adapter implements

use crate::db::tx::TxOptions;
use serde::{Deserialize, Serialize};
use std::fmt;
use tokio_util::sync::CancellationToken;

/// Common database error type
#[derive(Debug, thiserror::Error)]
pub enum DatabaseError {
    #[error("Connection failed: {0}")]
    ConnectionFailed(String),

    #[error("not connected to a database")]
    NotConnected,

    #[error("unregistered backend: {0}")]
    UnregisteredBackend(String),

    #[error("backend already registered: {0}")]
    DuplicateBackend(String),

    #[error("Query execution error: {0}")]
    QueryError(String),

    #[error("feature not supported by this backend: {0}")]
    Unsupported(String),

    #[error("transaction error: {0}")]
    TransactionState(String),

    #[error("isolation level not supported by this backend: {0}")]
    UnsupportedIsolation(String),

    #[error("Did not find any relation named \"{0}\"")]
    NotFound(String),

    #[error("invalid database url: {0}")]
    InvalidUrl(String),

    #[error("query cancelled")]
    Cancelled,

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),
}

impl DatabaseError {
    /// Whether this error reports a capability the active backend switched off
    pub fn is_unsupported(&self) -> bool {
        matches!(self, DatabaseError::Unsupported(_))
    }
}

/// Cell value in a result set
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum CellValue {
    Null,
    Bool(bool),
    Int(i64),
    Float(f64),
    String(String),
    Binary(Vec<u8>),
}

impl CellValue {
    pub fn is_null(&self) -> bool {
        matches!(self, CellValue::Null)
    }

    /// Text form, `None` for NULL
    pub fn as_string(&self) -> Option<String> {
        match self {
            CellValue::Null => None,
            other => Some(other.to_string()),
        }
    }

    pub fn as_i64(&self) -> Option<i64> {
        match self {
            CellValue::Int(v) => Some(*v),
            CellValue::Bool(b) => Some(*b as i64),
            CellValue::Float(f) => Some(*f as i64),
            CellValue::String(s) => s.trim().parse().ok(),
            _ => None,
        }
    }

    pub fn as_f64(&self) -> Option<f64> {
        match self {
            CellValue::Int(v) => Some(*v as f64),
            CellValue::Float(f) => Some(*f),
            CellValue::String(s) => s.trim().parse().ok(),
            _ => None,
        }
    }

    /// Truthiness for catalog flags stored as `YES`/`NO`, 0/1 or booleans
    pub fn as_bool(&self) -> bool {
        match self {
            CellValue::Bool(b) => *b,
            CellValue::Int(v) => *v != 0,
            CellValue::String(s) => matches!(s.to_ascii_uppercase().as_str(), "YES" | "Y" | "TRUE" | "T" | "1"),
            _ => false,
        }
    }
}

impl fmt::Display for CellValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CellValue::Null => Ok(()),
            CellValue::Bool(b) => write!(f, "{}", b),
            CellValue::Int(v) => write!(f, "{}", v),
            CellValue::Float(v) => write!(f, "{}", v),
            CellValue::String(s) => f.write_str(s),
            CellValue::Binary(b) => {
                f.write_str("\\x")?;
                for byte in b {
                    write!(f, "{:02x}", byte)?;
                }
                Ok(())
            }
        }
    }
}

/// Query result containing column names and rows
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct QueryResult {
    pub columns: Vec<String>,
    /// Backend-reported column types, empty when the driver does not expose them
    pub column_types: Vec<String>,
    pub rows: Vec<Vec<CellValue>>,
    pub rows_affected: u64,
}

impl QueryResult {
    pub fn new(columns: Vec<String>) -> Self {
        Self {
            columns,
            ..Default::default()
        }
    }

    pub fn row_count(&self) -> usize {
        self.rows.len()
    }

    /// Text value at (row, column); NULL and missing cells read as `None`
    pub fn text(&self, row: usize, col: usize) -> Option<String> {
        self.rows.get(row)?.get(col)?.as_string()
    }
}

/// Connection trait - all database connections must implement this
#[async_trait::async_trait]
pub trait Connection: Send + Sync {
    /// Get the connection ID
    fn connection_id(&self) -> &str;

    /// Test if the connection is alive
    async fn is_alive(&self) -> bool;

    /// Run a statement that returns rows.
    ///
    /// Cancelling `cancel` must abort the outstanding call promptly and
    /// return [`DatabaseError::Cancelled`].
    async fn query(
        &self,
        sql: &str,
        params: &[CellValue],
        cancel: &CancellationToken,
    ) -> Result<QueryResult, DatabaseError>;

    /// Run a statement that does not return rows
    async fn execute(&self, sql: &str) -> Result<u64, DatabaseError>;

    /// Open a transaction. Backends that cannot honour the requested options fail here.
    async fn begin(&self, opts: Option<&TxOptions>) -> Result<(), DatabaseError> {
        let sql = match opts {
            Some(opts) => opts.start_transaction_sql(),
            None => "BEGIN".to_string(),
        };
        self.execute(&sql).await.map(|_| ())
    }

    async fn commit(&self) -> Result<(), DatabaseError> {
        self.execute("COMMIT").await.map(|_| ())
    }

    async fn rollback(&self) -> Result<(), DatabaseError> {
        self.execute("ROLLBACK").await.map(|_| ())
    }

    /// Allow downcasting for driver-specific operations
    fn as_any(&self) -> &dyn std::any::Any;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cell_value_text() {
        assert_eq!(CellValue::Null.as_string(), None);
        assert_eq!(CellValue::Int(42).as_string().as_deref(), Some("42"));
        assert_eq!(CellValue::Binary(vec![0xde, 0xad]).to_string(), "\\xdead");
    }

    #[test]
    fn test_cell_value_flags() {
        assert!(CellValue::String("YES".into()).as_bool());
        assert!(!CellValue::String("NO".into()).as_bool());
        assert!(CellValue::Int(1).as_bool());
        assert!(!CellValue::Null.as_bool());
        assert_eq!(CellValue::String(" 7 ".into()).as_i64(), Some(7));
    }

    #[test]
    fn test_query_result_text() {
        let mut result = QueryResult::new(vec!["a".into(), "b".into()]);
        result.rows.push(vec![CellValue::String("x".into()), CellValue::Null]);
        assert_eq!(result.row_count(), 1);
        assert_eq!(result.text(0, 0).as_deref(), Some("x"));
        assert_eq!(result.text(0, 1), None);
        assert_eq!(result.text(3, 0), None);
    }

    #[test]
    fn test_unsupported_flag() {
        assert!(DatabaseError::Unsupported("indexes".into()).is_unsupported());
        assert!(!DatabaseError::Cancelled.is_unsupported());
    }
}
