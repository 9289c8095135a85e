// Information Schema Reader
// Generic catalog reader over the standard information_schema views

use super::pattern::has_wildcards;
use super::{
    ClauseName, Column, Constraint, Feature, Filter, Function, Index, MetadataReader, PrivilegeSummary,
    ReaderOptions, Schema, Sequence, Table,
};
use crate::db::traits::{CellValue, Connection, DatabaseError, QueryResult};
use std::collections::BTreeMap;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tracing::debug;

/// Builds a `WHERE` clause with backend-specific placeholders
struct Conditions<'a> {
    opts: &'a ReaderOptions,
    clauses: Vec<String>,
    params: Vec<CellValue>,
}

impl<'a> Conditions<'a> {
    fn new(opts: &'a ReaderOptions) -> Self {
        Self::continue_from(opts, Vec::new())
    }

    /// Keep numbering placeholders after already-bound parameters
    fn continue_from(opts: &'a ReaderOptions, params: Vec<CellValue>) -> Self {
        Self {
            opts,
            clauses: Vec::new(),
            params,
        }
    }

    fn bind(&mut self, value: &str) -> String {
        self.params.push(CellValue::String(value.to_string()));
        self.opts.placeholder(self.params.len())
    }

    /// `column LIKE ?`, or `column = ?` when the filter has no wildcards
    fn matches(&mut self, column: &str, filter: &Option<String>) {
        if let Some(value) = filter {
            let op = if has_wildcards(value) { "LIKE" } else { "=" };
            let ph = self.bind(value);
            self.clauses.push(format!("{} {} {}", column, op, ph));
        }
    }

    fn one_of(&mut self, column: &str, values: &[String]) {
        if values.is_empty() {
            return;
        }
        let phs: Vec<String> = values.iter().map(|v| self.bind(v)).collect();
        self.clauses.push(format!("{} IN ({})", column, phs.join(", ")));
    }

    fn exclude_system(&mut self, column: &str, with_system: bool) {
        if with_system || self.opts.system_schemas.is_empty() {
            return;
        }
        let schemas = self.opts.system_schemas.clone();
        let phs: Vec<String> = schemas.iter().map(|s| self.bind(s)).collect();
        self.clauses.push(format!("{} NOT IN ({})", column, phs.join(", ")));
    }

    fn where_sql(&self) -> String {
        if self.clauses.is_empty() {
            String::new()
        } else {
            format!(" WHERE {}", self.clauses.join(" AND "))
        }
    }
}

fn text(result: &QueryResult, row: usize, col: usize) -> String {
    result.text(row, col).unwrap_or_default()
}

/// Catalog reader for backends exposing `information_schema`
pub struct InformationSchemaReader {
    conn: Arc<dyn Connection>,
    opts: ReaderOptions,
    cancel: CancellationToken,
}

impl InformationSchemaReader {
    pub fn new(conn: Arc<dyn Connection>, opts: ReaderOptions, cancel: CancellationToken) -> Self {
        Self { conn, opts, cancel }
    }

    /// Reader factory closure in the shape a driver descriptor stores
    pub fn factory(
        opts: ReaderOptions,
    ) -> impl Fn(Arc<dyn Connection>, CancellationToken) -> Box<dyn MetadataReader> + Send + Sync + 'static {
        move |conn, cancel| Box::new(InformationSchemaReader::new(conn, opts.clone(), cancel))
    }

    pub fn options(&self) -> &ReaderOptions {
        &self.opts
    }

    async fn run(&self, sql: String, params: Vec<CellValue>) -> Result<QueryResult, DatabaseError> {
        debug!(sql = %sql, params = params.len(), "information_schema query");
        self.conn.query(&sql, &params, &self.cancel).await
    }
}

#[async_trait::async_trait]
impl MetadataReader for InformationSchemaReader {
    async fn catalogs(&self, _filter: &Filter) -> Result<Vec<super::Catalog>, DatabaseError> {
        self.opts.require(Feature::Catalogs)?;
        let result = self
            .run(
                "SELECT catalog_name FROM information_schema.information_schema_catalog_name".to_string(),
                Vec::new(),
            )
            .await?;
        Ok((0..result.row_count())
            .map(|i| super::Catalog { name: text(&result, i, 0) })
            .collect())
    }

    async fn schemas(&self, filter: &Filter) -> Result<Vec<Schema>, DatabaseError> {
        let mut conds = Conditions::new(&self.opts);
        conds.matches("schema_name", &filter.name);
        conds.exclude_system("schema_name", filter.with_system);
        let sql = format!(
            "SELECT catalog_name, schema_name FROM information_schema.schemata{} ORDER BY catalog_name, schema_name",
            conds.where_sql()
        );
        let result = self.run(sql, conds.params).await?;
        Ok((0..result.row_count())
            .map(|i| Schema {
                catalog: result.text(i, 0),
                name: text(&result, i, 1),
            })
            .collect())
    }

    async fn tables(&self, filter: &Filter) -> Result<Vec<Table>, DatabaseError> {
        let want_sequences = filter.types.is_empty() || filter.types.iter().any(|t| t == "SEQUENCE");
        let table_types: Vec<String> = filter.types.iter().filter(|t| *t != "SEQUENCE").cloned().collect();

        let table_type = self.opts.clause(ClauseName::TablesTableType);
        let mut conds = Conditions::new(&self.opts);
        conds.matches("table_schema", &filter.schema);
        conds.matches("table_name", &filter.name);
        conds.one_of(table_type, &table_types);
        conds.exclude_system("table_schema", filter.with_system);
        let mut sql = format!(
            "SELECT table_catalog, table_schema, table_name, {} AS table_type FROM information_schema.tables{}",
            table_type,
            conds.where_sql()
        );
        let mut params = conds.params;

        // A type list holding only SEQUENCE must not fall back to "all tables"
        let skip_tables = !filter.types.is_empty() && table_types.is_empty();
        if skip_tables {
            sql.clear();
            params.clear();
        }

        if want_sequences && self.opts.enabled(Feature::Sequences) {
            let mut seq = Conditions::continue_from(&self.opts, params);
            seq.matches("sequence_schema", &filter.schema);
            seq.matches("sequence_name", &filter.name);
            seq.exclude_system("sequence_schema", filter.with_system);
            let seq_sql = format!(
                "SELECT sequence_catalog, sequence_schema, sequence_name, 'SEQUENCE' AS table_type FROM information_schema.sequences{}",
                seq.where_sql()
            );
            sql = if sql.is_empty() {
                seq_sql
            } else {
                format!("{} UNION ALL {}", sql, seq_sql)
            };
            params = seq.params;
        }

        if sql.is_empty() {
            return Ok(Vec::new());
        }
        sql.push_str(" ORDER BY 2, 3");

        let result = self.run(sql, params).await?;
        Ok((0..result.row_count())
            .map(|i| Table {
                catalog: result.text(i, 0),
                schema: text(&result, i, 1),
                name: text(&result, i, 2),
                kind: text(&result, i, 3),
                size: None,
                comment: None,
            })
            .collect())
    }

    async fn columns(&self, filter: &Filter) -> Result<Vec<Column>, DatabaseError> {
        let mut conds = Conditions::new(&self.opts);
        conds.matches("table_schema", &filter.schema);
        conds.matches("table_name", &filter.parent);
        conds.matches("column_name", &filter.name);
        conds.exclude_system("table_schema", filter.with_system);
        let sql = format!(
            "SELECT table_schema, table_name, column_name, ordinal_position, {}, {}, {} \
             FROM information_schema.columns{} ORDER BY table_schema, table_name, ordinal_position",
            self.opts.clause(ClauseName::ColumnsDataType),
            self.opts.clause(ClauseName::ColumnsIsNullable),
            self.opts.clause(ClauseName::ColumnsColumnDefault),
            conds.where_sql()
        );
        let result = self.run(sql, conds.params).await?;
        Ok(result
            .rows
            .iter()
            .enumerate()
            .map(|(i, row)| Column {
                schema: text(&result, i, 0),
                table: text(&result, i, 1),
                name: text(&result, i, 2),
                ordinal_position: row.get(3).and_then(|v| v.as_i64()).unwrap_or(i as i64 + 1),
                data_type: text(&result, i, 4),
                is_nullable: row.get(5).map(|v| v.as_bool()).unwrap_or(true),
                default: result.text(i, 6),
                is_primary_key: false,
            })
            .collect())
    }

    async fn indexes(&self, filter: &Filter) -> Result<Vec<Index>, DatabaseError> {
        self.opts.require(Feature::Indexes)?;
        let mut conds = Conditions::new(&self.opts);
        conds.matches("table_schema", &filter.schema);
        conds.matches("table_name", &filter.parent);
        conds.matches("index_name", &filter.name);
        conds.exclude_system("table_schema", filter.with_system);
        let sql = format!(
            "SELECT table_schema, table_name, index_name, non_unique, column_name \
             FROM information_schema.statistics{} ORDER BY table_schema, table_name, index_name, seq_in_index",
            conds.where_sql()
        );
        let result = self.run(sql, conds.params).await?;

        let mut indexes: Vec<Index> = Vec::new();
        for (i, row) in result.rows.iter().enumerate() {
            let (schema, table, name) = (text(&result, i, 0), text(&result, i, 1), text(&result, i, 2));
            let column = text(&result, i, 4);
            match indexes.last_mut() {
                Some(last) if last.schema == schema && last.table == table && last.name == name => {
                    last.columns.push(column)
                }
                _ => indexes.push(Index {
                    is_unique: !row.get(3).map(|v| v.as_bool()).unwrap_or(true),
                    is_primary: name.eq_ignore_ascii_case("PRIMARY"),
                    schema,
                    table,
                    name,
                    columns: vec![column],
                }),
            }
        }
        Ok(indexes)
    }

    async fn constraints(&self, filter: &Filter) -> Result<Vec<Constraint>, DatabaseError> {
        self.opts.require(Feature::Constraints)?;
        let mut conds = Conditions::new(&self.opts);
        conds.matches("tc.table_schema", &filter.schema);
        conds.matches("tc.table_name", &filter.parent);
        conds.matches("tc.constraint_name", &filter.name);
        conds.exclude_system("tc.table_schema", filter.with_system);
        let sql = format!(
            "SELECT tc.table_schema, tc.table_name, tc.constraint_name, tc.constraint_type, \
             kcu.column_name, ccu.table_name, ccu.column_name \
             FROM information_schema.table_constraints tc \
             LEFT JOIN information_schema.key_column_usage kcu \
             ON kcu.constraint_schema = tc.constraint_schema AND kcu.constraint_name = tc.constraint_name \
             LEFT JOIN information_schema.constraint_column_usage ccu \
             ON tc.constraint_type = 'FOREIGN KEY' \
             AND ccu.constraint_schema = tc.constraint_schema AND ccu.constraint_name = tc.constraint_name{} \
             ORDER BY tc.table_schema, tc.table_name, tc.constraint_name, kcu.ordinal_position",
            conds.where_sql()
        );
        let result = self.run(sql, conds.params).await?;

        let mut constraints: Vec<Constraint> = Vec::new();
        for i in 0..result.row_count() {
            let (schema, table, name) = (text(&result, i, 0), text(&result, i, 1), text(&result, i, 2));
            let column = result.text(i, 4);
            let foreign_column = result.text(i, 6);
            let continues = constraints
                .last()
                .is_some_and(|last| last.schema == schema && last.table == table && last.name == name);
            if !continues {
                constraints.push(Constraint {
                    kind: text(&result, i, 3),
                    foreign_table: result.text(i, 5),
                    schema,
                    table,
                    name,
                    columns: Vec::new(),
                    foreign_columns: Vec::new(),
                });
            }
            let Some(constraint) = constraints.last_mut() else {
                continue;
            };
            if let Some(column) = column {
                if !constraint.columns.contains(&column) {
                    constraint.columns.push(column);
                }
            }
            if let Some(column) = foreign_column {
                if !constraint.foreign_columns.contains(&column) {
                    constraint.foreign_columns.push(column);
                }
            }
        }
        Ok(constraints)
    }

    async fn functions(&self, filter: &Filter) -> Result<Vec<Function>, DatabaseError> {
        self.opts.require(Feature::Functions)?;
        let mut conds = Conditions::new(&self.opts);
        conds.matches("routine_schema", &filter.schema);
        conds.matches("routine_name", &filter.name);
        conds.one_of("routine_type", &filter.types);
        conds.exclude_system("routine_schema", filter.with_system);
        let sql = format!(
            "SELECT specific_schema, specific_name, routine_schema, routine_name, data_type, routine_type, {}, {} \
             FROM information_schema.routines{} ORDER BY routine_schema, routine_name",
            self.opts.clause(ClauseName::FunctionsSecurityType),
            self.opts.clause(ClauseName::FunctionsLanguage),
            conds.where_sql()
        );
        let routines = self.run(sql, conds.params).await?;
        if routines.row_count() == 0 {
            return Ok(Vec::new());
        }

        let mut params_conds = Conditions::new(&self.opts);
        params_conds.matches("specific_schema", &filter.schema);
        let params_sql = format!(
            "SELECT specific_schema, specific_name, data_type FROM information_schema.parameters{} \
             ORDER BY specific_schema, specific_name, ordinal_position",
            params_conds.where_sql()
        );
        let parameters = self.run(params_sql, params_conds.params).await?;
        let mut args: BTreeMap<(String, String), Vec<String>> = BTreeMap::new();
        for i in 0..parameters.row_count() {
            args.entry((text(&parameters, i, 0), text(&parameters, i, 1)))
                .or_default()
                .push(text(&parameters, i, 2));
        }

        Ok((0..routines.row_count())
            .map(|i| {
                let key = (text(&routines, i, 0), text(&routines, i, 1));
                Function {
                    schema: text(&routines, i, 2),
                    name: text(&routines, i, 3),
                    result_type: text(&routines, i, 4),
                    kind: text(&routines, i, 5),
                    arg_types: args.get(&key).map(|a| a.join(", ")).unwrap_or_default(),
                    volatility: None,
                    security: routines.text(i, 6),
                    language: routines.text(i, 7),
                }
            })
            .collect())
    }

    async fn sequences(&self, filter: &Filter) -> Result<Vec<Sequence>, DatabaseError> {
        self.opts.require(Feature::Sequences)?;
        let mut conds = Conditions::new(&self.opts);
        conds.matches("sequence_schema", &filter.schema);
        conds.matches("sequence_name", &filter.name);
        conds.exclude_system("sequence_schema", filter.with_system);
        let sql = format!(
            "SELECT sequence_schema, sequence_name, {}, {}, {}, {}, {}, {} \
             FROM information_schema.sequences{} ORDER BY sequence_schema, sequence_name",
            self.opts.clause(ClauseName::SequenceColumnsDataType),
            self.opts.clause(ClauseName::SequenceColumnsStart),
            self.opts.clause(ClauseName::SequenceColumnsMin),
            self.opts.clause(ClauseName::SequenceColumnsMax),
            self.opts.clause(ClauseName::SequenceColumnsIncrement),
            self.opts.clause(ClauseName::SequenceColumnsCycles),
            conds.where_sql()
        );
        let result = self.run(sql, conds.params).await?;
        Ok(result
            .rows
            .iter()
            .enumerate()
            .map(|(i, row)| Sequence {
                schema: text(&result, i, 0),
                name: text(&result, i, 1),
                data_type: text(&result, i, 2),
                start: result.text(i, 3),
                min: result.text(i, 4),
                max: result.text(i, 5),
                increment: result.text(i, 6).filter(|s| !s.is_empty()),
                cycles: row.get(7).map(|v| v.as_bool()).unwrap_or(false),
                current: None,
            })
            .collect())
    }

    async fn privilege_summaries(&self, filter: &Filter) -> Result<Vec<PrivilegeSummary>, DatabaseError> {
        self.opts.require(Feature::TablePrivileges)?;
        let mut conds = Conditions::new(&self.opts);
        conds.matches("p.table_schema", &filter.schema);
        conds.matches("p.table_name", &filter.name);
        conds.exclude_system("p.table_schema", filter.with_system);
        let sql = format!(
            "SELECT p.table_schema, p.table_name, t.{} AS table_type, p.grantee, p.privilege_type \
             FROM information_schema.table_privileges p \
             JOIN information_schema.tables t ON t.table_schema = p.table_schema AND t.table_name = p.table_name{} \
             ORDER BY p.table_schema, p.table_name, p.grantee, p.privilege_type",
            self.opts.clause(ClauseName::TablesTableType),
            conds.where_sql()
        );
        let result = self.run(sql, conds.params).await?;

        // (schema, table) -> (kind, grantee -> privileges)
        let mut objects: BTreeMap<(String, String), (String, BTreeMap<String, Vec<String>>)> = BTreeMap::new();
        for i in 0..result.row_count() {
            let entry = objects
                .entry((text(&result, i, 0), text(&result, i, 1)))
                .or_insert_with(|| (text(&result, i, 2), BTreeMap::new()));
            entry.1.entry(text(&result, i, 3)).or_default().push(text(&result, i, 4));
        }

        let mut columns: BTreeMap<(String, String), BTreeMap<String, Vec<String>>> = BTreeMap::new();
        if self.opts.enabled(Feature::ColumnPrivileges) {
            let mut conds = Conditions::new(&self.opts);
            conds.matches("table_schema", &filter.schema);
            conds.matches("table_name", &filter.name);
            conds.exclude_system("table_schema", filter.with_system);
            let sql = format!(
                "SELECT table_schema, table_name, column_name, grantee, privilege_type \
                 FROM information_schema.column_privileges{} \
                 ORDER BY table_schema, table_name, column_name, grantee",
                conds.where_sql()
            );
            let result = self.run(sql, conds.params).await?;
            for i in 0..result.row_count() {
                columns
                    .entry((text(&result, i, 0), text(&result, i, 1)))
                    .or_default()
                    .entry(format!("{}: {}", text(&result, i, 2), text(&result, i, 3)))
                    .or_default()
                    .push(text(&result, i, 4));
            }
        }

        let render = |grants: &BTreeMap<String, Vec<String>>| -> Vec<String> {
            grants
                .iter()
                .map(|(grantee, privs)| format!("{}={}", grantee, privs.join(",")))
                .collect()
        };
        Ok(objects
            .into_iter()
            .map(|((schema, name), (kind, grants))| {
                let column_privileges = columns
                    .get(&(schema.clone(), name.clone()))
                    .map(|c| render(c))
                    .unwrap_or_default();
                PrivilegeSummary {
                    object_privileges: render(&grants),
                    column_privileges,
                    schema,
                    name,
                    kind,
                }
            })
            .collect())
    }
}
