// Metadata Record Types
// Plain records returned by catalog readers

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Catalog {
    pub name: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Schema {
    pub catalog: Option<String>,
    pub name: String,
}

/// A table-like relation: base table, view, materialized view, sequence or foreign table
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Table {
    pub catalog: Option<String>,
    pub schema: String,
    pub name: String,
    /// Catalog type string, e.g. `BASE TABLE`, `VIEW`, `SYSTEM TABLE`
    pub kind: String,
    pub size: Option<String>,
    pub comment: Option<String>,
}

impl Table {
    /// Short type label shown in listings
    pub fn kind_label(&self) -> String {
        match self.kind.as_str() {
            "BASE TABLE" => "table".to_string(),
            other => other.to_lowercase(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Column {
    pub schema: String,
    pub table: String,
    pub name: String,
    pub ordinal_position: i64,
    pub data_type: String,
    pub is_nullable: bool,
    pub default: Option<String>,
    pub is_primary_key: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Index {
    pub schema: String,
    pub table: String,
    pub name: String,
    pub is_unique: bool,
    pub is_primary: bool,
    pub columns: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Constraint {
    pub schema: String,
    pub table: String,
    pub name: String,
    /// `PRIMARY KEY`, `UNIQUE`, `FOREIGN KEY` or `CHECK`
    pub kind: String,
    pub columns: Vec<String>,
    pub foreign_table: Option<String>,
    pub foreign_columns: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Function {
    pub schema: String,
    pub name: String,
    pub result_type: String,
    pub arg_types: String,
    /// `FUNCTION`, `PROCEDURE` or `AGGREGATE`
    pub kind: String,
    pub volatility: Option<String>,
    pub security: Option<String>,
    pub language: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Sequence {
    pub schema: String,
    pub name: String,
    pub data_type: String,
    pub start: Option<String>,
    pub min: Option<String>,
    pub max: Option<String>,
    pub increment: Option<String>,
    pub cycles: bool,
    pub current: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PrivilegeSummary {
    pub schema: String,
    pub name: String,
    pub kind: String,
    pub object_privileges: Vec<String>,
    pub column_privileges: Vec<String>,
}

/// Whole-table statistics
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TableStats {
    pub name: String,
    pub rows: Option<i64>,
    pub size_bytes: Option<i64>,
    /// Current value of the table's row sequence, when it has one
    pub sequence: Option<i64>,
}

/// Per-column statistics
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ColumnStats {
    pub name: String,
    pub data_type: String,
    pub min: Option<String>,
    pub max: Option<String>,
    pub null_frac: Option<f64>,
    pub n_distinct: Option<i64>,
    pub avg_width: Option<f64>,
    pub histogram_bounds: Vec<String>,
    pub most_common_values: Vec<String>,
    pub most_common_freqs: Vec<f64>,
}
