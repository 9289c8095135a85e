//! Metadata introspection layer.
//!
//! A [`MetadataReader`] fetches catalog records from a live connection; a
//! [`MetadataWriter`] is the facade the meta-command dispatcher calls, turning
//! reader output into formatted reports. Readers are parameterised per backend
//! through [`ReaderOptions`]: placeholder syntax, enabled optional features and
//! SQL clause overrides.
//!
//! ## Module Structure
//!
//! - `types`: records returned by readers
//! - `pattern`: psql-style name patterns to SQL `LIKE` filters
//! - `infos`: generic `information_schema` reader
//! - `writer`: default text writer over any reader

pub mod infos;
pub mod pattern;
pub mod types;
pub mod writer;

pub use infos::InformationSchemaReader;
pub use types::{
    Catalog, Column, ColumnStats, Constraint, Function, Index, PrivilegeSummary, Schema, Sequence,
    Table, TableStats,
};
pub use writer::DefaultWriter;

use crate::db::traits::DatabaseError;
use crate::db::url::DbUrl;
use std::collections::{HashMap, HashSet};
use std::fmt;
use std::sync::Arc;

/// Optional reader capabilities a backend can switch off
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Feature {
    Catalogs,
    Indexes,
    Constraints,
    Functions,
    Sequences,
    TablePrivileges,
    ColumnPrivileges,
    Stats,
}

impl Feature {
    pub fn name(&self) -> &'static str {
        match self {
            Feature::Catalogs => "catalogs",
            Feature::Indexes => "indexes",
            Feature::Constraints => "constraints",
            Feature::Functions => "functions",
            Feature::Sequences => "sequences",
            Feature::TablePrivileges => "table privileges",
            Feature::ColumnPrivileges => "column privileges",
            Feature::Stats => "stats",
        }
    }
}

impl fmt::Display for Feature {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Named SQL fragments a backend may override when its catalog deviates from the standard
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ClauseName {
    TablesTableType,
    ColumnsDataType,
    ColumnsIsNullable,
    ColumnsColumnDefault,
    SequenceColumnsDataType,
    SequenceColumnsStart,
    SequenceColumnsMin,
    SequenceColumnsMax,
    SequenceColumnsIncrement,
    SequenceColumnsCycles,
    FunctionsSecurityType,
    FunctionsLanguage,
}

impl ClauseName {
    /// Standard `information_schema` expression
    pub fn default_expr(&self) -> &'static str {
        match self {
            ClauseName::TablesTableType => "table_type",
            ClauseName::ColumnsDataType => "data_type",
            ClauseName::ColumnsIsNullable => "is_nullable",
            ClauseName::ColumnsColumnDefault => "column_default",
            ClauseName::SequenceColumnsDataType => "data_type",
            ClauseName::SequenceColumnsStart => "start_value",
            ClauseName::SequenceColumnsMin => "minimum_value",
            ClauseName::SequenceColumnsMax => "maximum_value",
            ClauseName::SequenceColumnsIncrement => "increment",
            ClauseName::SequenceColumnsCycles => "cycle_option",
            ClauseName::FunctionsSecurityType => "security_type",
            ClauseName::FunctionsLanguage => "routine_body",
        }
    }
}

/// Renders the n-th (1-based) bind placeholder
pub type PlaceholderFn = Arc<dyn Fn(usize) -> String + Send + Sync>;

/// Per-backend reader configuration
#[derive(Clone)]
pub struct ReaderOptions {
    pub placeholder: PlaceholderFn,
    disabled: HashSet<Feature>,
    clauses: HashMap<ClauseName, String>,
    pub system_schemas: Vec<String>,
}

impl ReaderOptions {
    pub fn new() -> Self {
        Self {
            placeholder: Arc::new(|n| format!("${}", n)),
            // information_schema carries no statistics
            disabled: HashSet::from([Feature::Stats]),
            clauses: HashMap::new(),
            system_schemas: vec![
                "information_schema".to_string(),
                "pg_catalog".to_string(),
                "sys".to_string(),
            ],
        }
    }

    pub fn with_placeholder(mut self, placeholder: impl Fn(usize) -> String + Send + Sync + 'static) -> Self {
        self.placeholder = Arc::new(placeholder);
        self
    }

    pub fn with_feature(mut self, feature: Feature, enabled: bool) -> Self {
        if enabled {
            self.disabled.remove(&feature);
        } else {
            self.disabled.insert(feature);
        }
        self
    }

    pub fn with_custom_clauses(mut self, clauses: impl IntoIterator<Item = (ClauseName, String)>) -> Self {
        self.clauses.extend(clauses);
        self
    }

    pub fn with_system_schemas(mut self, schemas: &[&str]) -> Self {
        self.system_schemas = schemas.iter().map(|s| s.to_string()).collect();
        self
    }

    pub fn enabled(&self, feature: Feature) -> bool {
        !self.disabled.contains(&feature)
    }

    /// Fail with unsupported-feature when `feature` is switched off
    pub fn require(&self, feature: Feature) -> Result<(), DatabaseError> {
        if self.enabled(feature) {
            Ok(())
        } else {
            Err(DatabaseError::Unsupported(feature.name().to_string()))
        }
    }

    /// Clause text, honouring backend overrides
    pub fn clause(&self, name: ClauseName) -> &str {
        self.clauses
            .get(&name)
            .map(|s| s.as_str())
            .unwrap_or_else(|| name.default_expr())
    }

    pub fn placeholder(&self, n: usize) -> String {
        (self.placeholder)(n)
    }
}

impl Default for ReaderOptions {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for ReaderOptions {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ReaderOptions")
            .field("placeholder", &self.placeholder(1))
            .field("disabled", &self.disabled)
            .field("clauses", &self.clauses)
            .finish()
    }
}

/// Catalog filter; string filters use SQL `LIKE` syntax
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Filter {
    pub catalog: Option<String>,
    pub schema: Option<String>,
    /// Owning object, e.g. the table of a column or index
    pub parent: Option<String>,
    pub name: Option<String>,
    /// Object type strings to keep; empty keeps all
    pub types: Vec<String>,
    pub with_system: bool,
}

/// What `\ss` computes statistics over
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StatsTarget {
    Table(String),
    Query(String),
}

impl StatsTarget {
    /// Free-form SQL is recognised by its leading keyword
    pub fn parse(text: &str) -> Self {
        let head = text
            .trim_start()
            .split(|c: char| c.is_whitespace() || c == '(')
            .next()
            .unwrap_or("")
            .to_ascii_uppercase();
        match head.as_str() {
            "SELECT" | "WITH" | "VALUES" | "TABLE" => StatsTarget::Query(text.trim().to_string()),
            _ => StatsTarget::Table(text.trim().to_string()),
        }
    }

    pub fn label(&self) -> &str {
        match self {
            StatsTarget::Table(name) | StatsTarget::Query(name) => name,
        }
    }
}

/// Statistic families shown by `\ss`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum StatCategory {
    Sequence,
    Size,
    Window,
    NullFraction,
    Uniqueness,
    Length,
    Histogram,
    MostCommonValues,
    Frequency,
}

impl StatCategory {
    pub const ALL: [StatCategory; 9] = [
        StatCategory::Sequence,
        StatCategory::Size,
        StatCategory::Window,
        StatCategory::NullFraction,
        StatCategory::Uniqueness,
        StatCategory::Length,
        StatCategory::Histogram,
        StatCategory::MostCommonValues,
        StatCategory::Frequency,
    ];

    pub fn title(&self) -> &'static str {
        match self {
            StatCategory::Sequence => "Sequence",
            StatCategory::Size => "Rows",
            StatCategory::Window => "Min/Max",
            StatCategory::NullFraction => "Null fraction",
            StatCategory::Uniqueness => "Distinct",
            StatCategory::Length => "Avg width",
            StatCategory::Histogram => "Histogram bounds",
            StatCategory::MostCommonValues => "Most common values",
            StatCategory::Frequency => "Most common freqs",
        }
    }
}

/// Catalog reader for one live connection
#[async_trait::async_trait]
pub trait MetadataReader: Send + Sync {
    async fn catalogs(&self, _filter: &Filter) -> Result<Vec<Catalog>, DatabaseError> {
        Err(DatabaseError::Unsupported(Feature::Catalogs.name().to_string()))
    }

    async fn schemas(&self, _filter: &Filter) -> Result<Vec<Schema>, DatabaseError> {
        Err(DatabaseError::Unsupported("schemas".to_string()))
    }

    async fn tables(&self, _filter: &Filter) -> Result<Vec<Table>, DatabaseError> {
        Err(DatabaseError::Unsupported("tables".to_string()))
    }

    async fn columns(&self, _filter: &Filter) -> Result<Vec<Column>, DatabaseError> {
        Err(DatabaseError::Unsupported("columns".to_string()))
    }

    async fn indexes(&self, _filter: &Filter) -> Result<Vec<Index>, DatabaseError> {
        Err(DatabaseError::Unsupported(Feature::Indexes.name().to_string()))
    }

    async fn constraints(&self, _filter: &Filter) -> Result<Vec<Constraint>, DatabaseError> {
        Err(DatabaseError::Unsupported(Feature::Constraints.name().to_string()))
    }

    async fn functions(&self, _filter: &Filter) -> Result<Vec<Function>, DatabaseError> {
        Err(DatabaseError::Unsupported(Feature::Functions.name().to_string()))
    }

    async fn sequences(&self, _filter: &Filter) -> Result<Vec<Sequence>, DatabaseError> {
        Err(DatabaseError::Unsupported(Feature::Sequences.name().to_string()))
    }

    async fn privilege_summaries(&self, _filter: &Filter) -> Result<Vec<PrivilegeSummary>, DatabaseError> {
        Err(DatabaseError::Unsupported(Feature::TablePrivileges.name().to_string()))
    }

    async fn table_stats(&self, _target: &StatsTarget) -> Result<TableStats, DatabaseError> {
        Err(DatabaseError::Unsupported(Feature::Stats.name().to_string()))
    }

    /// Column statistics; `k` bounds most-common-value and histogram output
    async fn column_stats(&self, _target: &StatsTarget, _k: usize) -> Result<Vec<ColumnStats>, DatabaseError> {
        Err(DatabaseError::Unsupported(Feature::Stats.name().to_string()))
    }
}

/// Facade behind the informational meta-commands.
///
/// Each operation writes one complete report to the output sink, or fails
/// without writing anything.
#[async_trait::async_trait]
pub trait MetadataWriter: Send {
    /// Full description of every relation matching `pattern`
    async fn describe_table_details(
        &mut self,
        url: &DbUrl,
        pattern: &str,
        verbose: bool,
        show_system: bool,
    ) -> Result<(), DatabaseError>;

    /// List relations whose kind letter (`t`, `v`, `m`, `s`, `E`) appears in `kinds`
    async fn list_tables(
        &mut self,
        url: &DbUrl,
        kinds: &str,
        pattern: &str,
        verbose: bool,
        show_system: bool,
    ) -> Result<(), DatabaseError>;

    async fn list_schemas(
        &mut self,
        url: &DbUrl,
        pattern: &str,
        verbose: bool,
        show_system: bool,
    ) -> Result<(), DatabaseError>;

    async fn list_indexes(
        &mut self,
        url: &DbUrl,
        pattern: &str,
        verbose: bool,
        show_system: bool,
    ) -> Result<(), DatabaseError>;

    async fn list_all_dbs(&mut self, url: &DbUrl, pattern: &str, verbose: bool) -> Result<(), DatabaseError>;

    async fn list_privilege_summaries(
        &mut self,
        url: &DbUrl,
        pattern: &str,
        show_system: bool,
    ) -> Result<(), DatabaseError>;

    /// `kinds` is the invoking command base: `df` for functions, `da` for aggregates
    async fn describe_functions(
        &mut self,
        url: &DbUrl,
        kinds: &str,
        pattern: &str,
        verbose: bool,
        show_system: bool,
    ) -> Result<(), DatabaseError>;

    async fn show_stats(
        &mut self,
        url: &DbUrl,
        categories: &[StatCategory],
        pattern: &str,
        verbose: bool,
        k: usize,
    ) -> Result<(), DatabaseError>;
}
