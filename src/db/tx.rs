// Transaction Options
// Isolation levels and the option set handed to a session when opening a transaction

use serde::{Deserialize, Serialize};
use std::fmt;

/// Transaction isolation level requested by `\begin`
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum IsolationLevel {
    #[default]
    Default,
    ReadUncommitted,
    ReadCommitted,
    WriteCommitted,
    RepeatableRead,
    Snapshot,
    Serializable,
    Linearizable,
}

impl IsolationLevel {
    pub const ALL: [IsolationLevel; 8] = [
        IsolationLevel::Default,
        IsolationLevel::ReadUncommitted,
        IsolationLevel::ReadCommitted,
        IsolationLevel::WriteCommitted,
        IsolationLevel::RepeatableRead,
        IsolationLevel::Snapshot,
        IsolationLevel::Serializable,
        IsolationLevel::Linearizable,
    ];

    /// Name as typed after `\begin`
    pub fn name(&self) -> &'static str {
        match self {
            IsolationLevel::Default => "default",
            IsolationLevel::ReadUncommitted => "read-uncommitted",
            IsolationLevel::ReadCommitted => "read-committed",
            IsolationLevel::WriteCommitted => "write-committed",
            IsolationLevel::RepeatableRead => "repeatable-read",
            IsolationLevel::Snapshot => "snapshot",
            IsolationLevel::Serializable => "serializable",
            IsolationLevel::Linearizable => "linearizable",
        }
    }

    /// Case-insensitive lookup by name
    pub fn from_name(name: &str) -> Option<Self> {
        Self::ALL
            .into_iter()
            .find(|level| level.name().eq_ignore_ascii_case(name))
    }

    /// SQL spelling used in `SET TRANSACTION ISOLATION LEVEL`, if the level has one
    pub fn sql_name(&self) -> Option<&'static str> {
        match self {
            IsolationLevel::ReadUncommitted => Some("READ UNCOMMITTED"),
            IsolationLevel::ReadCommitted => Some("READ COMMITTED"),
            IsolationLevel::RepeatableRead => Some("REPEATABLE READ"),
            IsolationLevel::Snapshot => Some("SNAPSHOT"),
            IsolationLevel::Serializable => Some("SERIALIZABLE"),
            _ => None,
        }
    }
}

impl fmt::Display for IsolationLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Options for opening a transaction. `None` at the call site means backend default.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TxOptions {
    pub isolation: IsolationLevel,
    pub read_only: bool,
}

impl TxOptions {
    /// Standard `START TRANSACTION` statement for these options
    pub fn start_transaction_sql(&self) -> String {
        let mut modes = Vec::new();
        if let Some(level) = self.isolation.sql_name() {
            modes.push(format!("ISOLATION LEVEL {}", level));
        }
        if self.read_only {
            modes.push("READ ONLY".to_string());
        }
        if modes.is_empty() {
            "START TRANSACTION".to_string()
        } else {
            format!("START TRANSACTION {}", modes.join(", "))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_name_is_case_insensitive() {
        assert_eq!(IsolationLevel::from_name("SERIALIZABLE"), Some(IsolationLevel::Serializable));
        assert_eq!(IsolationLevel::from_name("Read-Committed"), Some(IsolationLevel::ReadCommitted));
        assert_eq!(IsolationLevel::from_name("bogus"), None);
        assert_eq!(IsolationLevel::from_name(""), None);
    }

    #[test]
    fn test_every_level_round_trips_its_name() {
        for level in IsolationLevel::ALL {
            assert_eq!(IsolationLevel::from_name(level.name()), Some(level));
        }
    }

    #[test]
    fn test_start_transaction_sql() {
        assert_eq!(TxOptions::default().start_transaction_sql(), "START TRANSACTION");
        let opts = TxOptions {
            isolation: IsolationLevel::Serializable,
            read_only: true,
        };
        assert_eq!(
            opts.start_transaction_sql(),
            "START TRANSACTION ISOLATION LEVEL SERIALIZABLE, READ ONLY"
        );
    }
}
