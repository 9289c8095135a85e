// SQLite Driver
// Connection and catalog reader for SQLite using rusqlite

use crate::db::descriptor::DriverDescriptor;
use crate::db::traits::{CellValue, Connection, DatabaseError, QueryResult};
use crate::db::tx::{IsolationLevel, TxOptions};
use crate::db::url::DbUrl;
use crate::metadata::pattern::{has_wildcards, like_match};
use crate::metadata::{
    Catalog, Column, ColumnStats, Constraint, Filter, Index, MetadataReader, Schema, StatsTarget, Table,
    TableStats,
};
use rusqlite::types::{ToSqlOutput, Value, ValueRef};
use rusqlite::{Connection as RusqliteConnection, InterruptHandle, OpenFlags, ToSql};
use std::path::Path;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Mutex;
use tokio_util::sync::CancellationToken;
use tracing::debug;
use uuid::Uuid;

impl ToSql for CellValue {
    fn to_sql(&self) -> rusqlite::Result<ToSqlOutput<'_>> {
        Ok(match self {
            CellValue::Null => ToSqlOutput::Owned(Value::Null),
            CellValue::Bool(b) => ToSqlOutput::Owned(Value::Integer(*b as i64)),
            CellValue::Int(v) => ToSqlOutput::Owned(Value::Integer(*v)),
            CellValue::Float(v) => ToSqlOutput::Owned(Value::Real(*v)),
            CellValue::String(s) => ToSqlOutput::Borrowed(ValueRef::Text(s.as_bytes())),
            CellValue::Binary(b) => ToSqlOutput::Borrowed(ValueRef::Blob(b)),
        })
    }
}

fn query_error(e: rusqlite::Error) -> DatabaseError {
    match e {
        rusqlite::Error::SqliteFailure(ref err, _) if err.code == rusqlite::ErrorCode::OperationInterrupted => {
            DatabaseError::Cancelled
        }
        other => DatabaseError::QueryError(other.to_string()),
    }
}

fn cell_value(value: ValueRef<'_>) -> CellValue {
    match value {
        ValueRef::Null => CellValue::Null,
        ValueRef::Integer(v) => CellValue::Int(v),
        ValueRef::Real(v) => CellValue::Float(v),
        ValueRef::Text(t) => CellValue::String(String::from_utf8_lossy(t).into_owned()),
        ValueRef::Blob(b) => CellValue::Binary(b.to_vec()),
    }
}

/// Quote an identifier for interpolation
fn quote_ident(name: &str) -> String {
    format!("\"{}\"", name.replace('"', "\"\""))
}

fn run_statement(conn: &RusqliteConnection, sql: &str, params: &[CellValue]) -> Result<QueryResult, DatabaseError> {
    let mut stmt = conn.prepare(sql).map_err(query_error)?;
    let columns: Vec<String> = stmt.column_names().iter().map(|c| c.to_string()).collect();
    let mut result = QueryResult::new(columns);

    if result.columns.is_empty() {
        result.rows_affected = stmt
            .execute(rusqlite::params_from_iter(params.iter()))
            .map_err(query_error)? as u64;
        return Ok(result);
    }

    let width = result.columns.len();
    let mut rows = stmt
        .query(rusqlite::params_from_iter(params.iter()))
        .map_err(query_error)?;
    while let Some(row) = rows.next().map_err(query_error)? {
        let mut cells = Vec::with_capacity(width);
        for idx in 0..width {
            cells.push(cell_value(row.get_ref(idx).map_err(query_error)?));
        }
        result.rows.push(cells);
    }
    Ok(result)
}

/// SQLite specific connection wrapper
pub struct SqliteConnection {
    pub id: String,
    conn: Arc<Mutex<RusqliteConnection>>,
    interrupt: Arc<InterruptHandle>,
    read_only_tx: AtomicBool,
}

impl SqliteConnection {
    /// Open the database file named by the URL path; `:memory:` opens a private in-memory database
    pub fn open(url: &DbUrl) -> Result<Self, DatabaseError> {
        let path = Self::database_path(url)?;
        let conn = RusqliteConnection::open_with_flags(
            &path,
            OpenFlags::SQLITE_OPEN_READ_WRITE | OpenFlags::SQLITE_OPEN_CREATE | OpenFlags::SQLITE_OPEN_URI,
        )
        .map_err(|e| DatabaseError::ConnectionFailed(format!("Failed to open SQLite database: {}", e)))?;
        debug!(path = %path, "opened sqlite database");
        Ok(Self::from_connection(&Uuid::new_v4().to_string(), conn))
    }

    pub fn from_connection(id: &str, conn: RusqliteConnection) -> Self {
        let interrupt = Arc::new(conn.get_interrupt_handle());
        Self {
            id: id.to_string(),
            conn: Arc::new(Mutex::new(conn)),
            interrupt,
            read_only_tx: AtomicBool::new(false),
        }
    }

    /// Extract the database path from the URL
    fn database_path(url: &DbUrl) -> Result<String, DatabaseError> {
        let raw = url.path();
        let raw = match url.host() {
            // sqlite://relative.db puts the file name in the host slot
            Some(host) if !host.is_empty() => format!("{}{}", host, raw),
            _ => raw.to_string(),
        };
        if raw.is_empty() {
            return Err(DatabaseError::InvalidUrl(format!("{}: SQLite database path is required", url)));
        }

        // Expand ~ to home directory if present
        let path = match raw.strip_prefix("~/") {
            Some(rest) => match std::env::var_os("HOME") {
                Some(home) => Path::new(&home).join(rest).to_string_lossy().to_string(),
                None => raw,
            },
            None => raw,
        };
        Ok(path)
    }
}

#[async_trait::async_trait]
impl Connection for SqliteConnection {
    fn connection_id(&self) -> &str {
        &self.id
    }

    async fn is_alive(&self) -> bool {
        self.query("SELECT 1", &[], &CancellationToken::new()).await.is_ok()
    }

    async fn query(
        &self,
        sql: &str,
        params: &[CellValue],
        cancel: &CancellationToken,
    ) -> Result<QueryResult, DatabaseError> {
        if cancel.is_cancelled() {
            return Err(DatabaseError::Cancelled);
        }
        let conn = Arc::clone(&self.conn);
        let sql = sql.to_string();
        let params = params.to_vec();
        let mut task = tokio::task::spawn_blocking(move || {
            let guard = conn.blocking_lock();
            run_statement(&guard, &sql, &params)
        });

        tokio::select! {
            joined = &mut task => joined.map_err(|e| DatabaseError::QueryError(format!("query task failed: {}", e)))?,
            _ = cancel.cancelled() => {
                // keep interrupting until the statement actually stops, so the
                // connection is free again once we return
                loop {
                    self.interrupt.interrupt();
                    tokio::select! {
                        _ = &mut task => break,
                        _ = tokio::time::sleep(Duration::from_millis(10)) => {}
                    }
                }
                debug!(connection = %self.id, "sqlite query interrupted");
                Err(DatabaseError::Cancelled)
            }
        }
    }

    async fn execute(&self, sql: &str) -> Result<u64, DatabaseError> {
        self.query(sql, &[], &CancellationToken::new())
            .await
            .map(|r| r.rows_affected)
    }

    async fn begin(&self, opts: Option<&TxOptions>) -> Result<(), DatabaseError> {
        if let Some(opts) = opts {
            match opts.isolation {
                // SQLite transactions are always serializable
                IsolationLevel::Default | IsolationLevel::Serializable => {}
                IsolationLevel::ReadUncommitted => {
                    self.execute("PRAGMA read_uncommitted = 1").await?;
                }
                other => return Err(DatabaseError::UnsupportedIsolation(other.name().to_string())),
            }
            if opts.read_only {
                self.execute("PRAGMA query_only = 1").await?;
                self.read_only_tx.store(true, Ordering::SeqCst);
            }
        }
        self.execute("BEGIN").await.map(|_| ())
    }

    async fn commit(&self) -> Result<(), DatabaseError> {
        self.execute("COMMIT").await?;
        self.end_read_only().await
    }

    async fn rollback(&self) -> Result<(), DatabaseError> {
        self.execute("ROLLBACK").await?;
        self.end_read_only().await
    }

    fn as_any(&self) -> &dyn std::any::Any {
        self
    }
}

impl SqliteConnection {
    async fn end_read_only(&self) -> Result<(), DatabaseError> {
        if self.read_only_tx.swap(false, Ordering::SeqCst) {
            self.execute("PRAGMA query_only = 0").await?;
        }
        Ok(())
    }
}

/// Catalog reader over `sqlite_master` and the table-valued pragmas
pub struct SqliteReader {
    conn: Arc<dyn Connection>,
    cancel: CancellationToken,
}

impl SqliteReader {
    pub fn new(conn: Arc<dyn Connection>, cancel: CancellationToken) -> Self {
        Self { conn, cancel }
    }

    async fn run(&self, sql: &str, params: Vec<CellValue>) -> Result<QueryResult, DatabaseError> {
        debug!(sql, "sqlite catalog query");
        self.conn.query(sql, &params, &self.cancel).await
    }

    /// Table and view names matching `name`, plus their `sqlite_master` type
    async fn relations(&self, name: &Option<String>, with_system: bool) -> Result<Vec<(String, String)>, DatabaseError> {
        let mut sql = "SELECT name, type FROM sqlite_master WHERE type IN ('table', 'view')".to_string();
        let mut params = Vec::new();
        if !with_system {
            sql.push_str(" AND name NOT LIKE 'sqlite\\_%' ESCAPE '\\'");
        }
        if let Some(name) = name {
            sql.push_str(if has_wildcards(name) { " AND name LIKE ?" } else { " AND name = ?" });
            params.push(CellValue::String(name.clone()));
        }
        sql.push_str(" ORDER BY name");
        let result = self.run(&sql, params).await?;
        Ok((0..result.row_count())
            .map(|i| (result.text(i, 0).unwrap_or_default(), result.text(i, 1).unwrap_or_default()))
            .collect())
    }

    /// Tables a column/index/constraint filter applies to
    async fn parent_tables(&self, filter: &Filter) -> Result<Vec<String>, DatabaseError> {
        if !schema_matches(filter) {
            return Ok(Vec::new());
        }
        Ok(self
            .relations(&filter.parent, true)
            .await?
            .into_iter()
            .map(|(name, _)| name)
            .collect())
    }

    fn source(target: &StatsTarget) -> String {
        match target {
            StatsTarget::Table(name) => quote_ident(name),
            StatsTarget::Query(query) => format!("({})", query.trim_end().trim_end_matches(';')),
        }
    }
}

/// SQLite exposes a single `main` schema
fn schema_matches(filter: &Filter) -> bool {
    filter.schema.as_deref().map_or(true, |s| like_match(s, "main"))
}

#[async_trait::async_trait]
impl MetadataReader for SqliteReader {
    async fn catalogs(&self, _filter: &Filter) -> Result<Vec<Catalog>, DatabaseError> {
        let result = self.run("SELECT name FROM pragma_database_list ORDER BY seq", Vec::new()).await?;
        Ok((0..result.row_count())
            .map(|i| Catalog {
                name: result.text(i, 0).unwrap_or_default(),
            })
            .collect())
    }

    async fn schemas(&self, filter: &Filter) -> Result<Vec<Schema>, DatabaseError> {
        let schemas = self.catalogs(&Filter::default()).await?;
        Ok(schemas
            .into_iter()
            .filter(|c| filter.with_system || c.name != "temp")
            .filter(|c| filter.name.as_deref().map_or(true, |p| like_match(p, &c.name)))
            .map(|c| Schema {
                catalog: None,
                name: c.name,
            })
            .collect())
    }

    async fn tables(&self, filter: &Filter) -> Result<Vec<Table>, DatabaseError> {
        if !schema_matches(filter) {
            return Ok(Vec::new());
        }
        let relations = self.relations(&filter.name, filter.with_system).await?;
        Ok(relations
            .into_iter()
            .map(|(name, kind)| {
                let kind = match kind.as_str() {
                    "view" => "VIEW",
                    _ if name.starts_with("sqlite_") => "SYSTEM TABLE",
                    _ => "BASE TABLE",
                };
                Table {
                    catalog: None,
                    schema: "main".to_string(),
                    name,
                    kind: kind.to_string(),
                    size: None,
                    comment: None,
                }
            })
            .filter(|t| filter.types.is_empty() || filter.types.contains(&t.kind))
            .collect())
    }

    async fn columns(&self, filter: &Filter) -> Result<Vec<Column>, DatabaseError> {
        let mut columns = Vec::new();
        for table in self.parent_tables(filter).await? {
            let result = self
                .run(
                    "SELECT cid, name, type, \"notnull\", dflt_value, pk FROM pragma_table_info(?) ORDER BY cid",
                    vec![CellValue::String(table.clone())],
                )
                .await?;
            for i in 0..result.row_count() {
                let name = result.text(i, 1).unwrap_or_default();
                if filter.name.as_deref().is_some_and(|p| !like_match(p, &name)) {
                    continue;
                }
                let pk = result.rows[i][5].as_i64().unwrap_or(0) > 0;
                columns.push(Column {
                    schema: "main".to_string(),
                    table: table.clone(),
                    name,
                    ordinal_position: result.rows[i][0].as_i64().unwrap_or(0) + 1,
                    data_type: result.text(i, 2).unwrap_or_default().to_lowercase(),
                    is_nullable: !pk && !result.rows[i][3].as_bool(),
                    default: result.text(i, 4),
                    is_primary_key: pk,
                });
            }
        }
        Ok(columns)
    }

    async fn indexes(&self, filter: &Filter) -> Result<Vec<Index>, DatabaseError> {
        let mut indexes = Vec::new();
        for table in self.parent_tables(filter).await? {
            let list = self
                .run(
                    "SELECT name, \"unique\", origin FROM pragma_index_list(?) ORDER BY name",
                    vec![CellValue::String(table.clone())],
                )
                .await?;
            for i in 0..list.row_count() {
                let name = list.text(i, 0).unwrap_or_default();
                if filter.name.as_deref().is_some_and(|p| !like_match(p, &name)) {
                    continue;
                }
                let info = self
                    .run(
                        "SELECT name FROM pragma_index_info(?) ORDER BY seqno",
                        vec![CellValue::String(name.clone())],
                    )
                    .await?;
                indexes.push(Index {
                    schema: "main".to_string(),
                    table: table.clone(),
                    name,
                    is_unique: list.rows[i][1].as_bool(),
                    is_primary: list.text(i, 2).as_deref() == Some("pk"),
                    columns: (0..info.row_count()).filter_map(|j| info.text(j, 0)).collect(),
                });
            }
        }
        Ok(indexes)
    }

    async fn constraints(&self, filter: &Filter) -> Result<Vec<Constraint>, DatabaseError> {
        let mut constraints: Vec<Constraint> = Vec::new();
        for table in self.parent_tables(filter).await? {
            let result = self
                .run(
                    "SELECT id, \"table\", \"from\", \"to\" FROM pragma_foreign_key_list(?) ORDER BY id, seq",
                    vec![CellValue::String(table.clone())],
                )
                .await?;
            let mut last_id = None;
            for i in 0..result.row_count() {
                let id = result.rows[i][0].as_i64();
                if last_id != Some(id) {
                    last_id = Some(id);
                    constraints.push(Constraint {
                        schema: "main".to_string(),
                        table: table.clone(),
                        name: format!("{}_fk{}", table, id.unwrap_or(0)),
                        kind: "FOREIGN KEY".to_string(),
                        columns: Vec::new(),
                        foreign_table: result.text(i, 1),
                        foreign_columns: Vec::new(),
                    });
                }
                let Some(fk) = constraints.last_mut() else {
                    continue;
                };
                fk.columns.extend(result.text(i, 2));
                fk.foreign_columns.extend(result.text(i, 3));
            }
        }
        Ok(constraints)
    }

    async fn table_stats(&self, target: &StatsTarget) -> Result<TableStats, DatabaseError> {
        let count = self
            .run(&format!("SELECT COUNT(*) FROM {}", Self::source(target)), Vec::new())
            .await?;
        let mut stats = TableStats {
            name: target.label().to_string(),
            rows: count.rows.first().and_then(|r| r.first()).and_then(|c| c.as_i64()),
            ..Default::default()
        };

        if let StatsTarget::Table(name) = target {
            let has_sequences = self
                .run("SELECT 1 FROM sqlite_master WHERE name = 'sqlite_sequence'", Vec::new())
                .await?;
            if has_sequences.row_count() > 0 {
                let seq = self
                    .run(
                        "SELECT seq FROM sqlite_sequence WHERE name = ?",
                        vec![CellValue::String(name.clone())],
                    )
                    .await?;
                stats.sequence = seq.rows.first().and_then(|r| r.first()).and_then(|c| c.as_i64());
            }
        }
        Ok(stats)
    }

    async fn column_stats(&self, target: &StatsTarget, k: usize) -> Result<Vec<ColumnStats>, DatabaseError> {
        let source = Self::source(target);
        let columns: Vec<(String, String)> = match target {
            StatsTarget::Table(name) => {
                let info = self
                    .run(
                        "SELECT name, type FROM pragma_table_info(?) ORDER BY cid",
                        vec![CellValue::String(name.clone())],
                    )
                    .await?;
                if info.row_count() == 0 {
                    return Err(DatabaseError::NotFound(name.clone()));
                }
                (0..info.row_count())
                    .map(|i| (info.text(i, 0).unwrap_or_default(), info.text(i, 1).unwrap_or_default().to_lowercase()))
                    .collect()
            }
            StatsTarget::Query(_) => {
                let probe = self.run(&format!("SELECT * FROM {} LIMIT 0", source), Vec::new()).await?;
                probe.columns.into_iter().map(|c| (c, String::new())).collect()
            }
        };

        let mut stats = Vec::with_capacity(columns.len());
        for (name, data_type) in columns {
            let col = quote_ident(&name);
            let agg = self
                .run(
                    &format!(
                        "SELECT MIN({c}), MAX({c}), AVG(CASE WHEN {c} IS NULL THEN 1.0 ELSE 0.0 END), \
                         COUNT(DISTINCT {c}), AVG(LENGTH({c})), COUNT(*) FROM {src}",
                        c = col,
                        src = source
                    ),
                    Vec::new(),
                )
                .await?;
            let Some(row) = agg.rows.first() else {
                continue;
            };
            let total = row[5].as_i64().unwrap_or(0);
            let mut stat = ColumnStats {
                name: name.clone(),
                data_type,
                min: row[0].as_string(),
                max: row[1].as_string(),
                null_frac: row[2].as_f64(),
                n_distinct: row[3].as_i64(),
                avg_width: row[4].as_f64(),
                ..Default::default()
            };

            if k > 0 {
                let common = self
                    .run(
                        &format!(
                            "SELECT {c}, COUNT(*) AS n FROM {src} WHERE {c} IS NOT NULL \
                             GROUP BY {c} ORDER BY n DESC, {c} LIMIT {k}",
                            c = col,
                            src = source,
                            k = k
                        ),
                        Vec::new(),
                    )
                    .await?;
                for r in &common.rows {
                    stat.most_common_values.push(r[0].to_string());
                    if total > 0 {
                        stat.most_common_freqs.push(r[1].as_f64().unwrap_or(0.0) / total as f64);
                    }
                }

                let bounds = self
                    .run(
                        &format!(
                            "SELECT MAX(v) FROM (SELECT {c} AS v, NTILE({k}) OVER (ORDER BY {c}) AS b \
                             FROM {src} WHERE {c} IS NOT NULL) GROUP BY b ORDER BY b",
                            c = col,
                            src = source,
                            k = k
                        ),
                        Vec::new(),
                    )
                    .await?;
                stat.histogram_bounds = bounds.rows.iter().map(|r| r[0].to_string()).collect();
            }
            stats.push(stat);
        }
        Ok(stats)
    }
}

/// Descriptor for the `sqlite` backend
pub fn descriptor() -> DriverDescriptor {
    DriverDescriptor::new("sqlite")
        .with_aliases(&["sqlite3", "file"])
        .with_open(|url| Ok(Arc::new(SqliteConnection::open(url)?) as Arc<dyn Connection>))
        .with_reader(|conn, cancel| Box::new(SqliteReader::new(conn, cancel)))
        .with_column_types()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn memory() -> Arc<dyn Connection> {
        let url = DbUrl::parse("sqlite::memory:").unwrap();
        Arc::new(SqliteConnection::open(&url).unwrap())
    }

    async fn fixture() -> Arc<dyn Connection> {
        let conn = memory();
        for sql in [
            "CREATE TABLE authors (id INTEGER PRIMARY KEY AUTOINCREMENT, name TEXT NOT NULL)",
            "CREATE TABLE books (id INTEGER PRIMARY KEY, author_id INTEGER REFERENCES authors(id), title TEXT, genre TEXT)",
            "CREATE UNIQUE INDEX books_title ON books (title)",
            "CREATE VIEW book_titles AS SELECT title FROM books",
            "INSERT INTO authors (name) VALUES ('ann'), ('bob')",
            "INSERT INTO books (author_id, title, genre) VALUES (1, 'a', 'sf'), (1, 'b', 'sf'), (2, 'c', NULL), (2, 'd', 'crime')",
        ] {
            conn.execute(sql).await.unwrap();
        }
        conn
    }

    fn reader(conn: Arc<dyn Connection>) -> SqliteReader {
        SqliteReader::new(conn, CancellationToken::new())
    }

    #[test]
    fn test_database_path() {
        let url = DbUrl::parse("sqlite:/tmp/app.db").unwrap();
        assert_eq!(SqliteConnection::database_path(&url).unwrap(), "/tmp/app.db");
        let url = DbUrl::parse("sqlite::memory:").unwrap();
        assert_eq!(SqliteConnection::database_path(&url).unwrap(), ":memory:");
        let url = DbUrl::parse("file:///var/db/x.sqlite").unwrap();
        assert_eq!(SqliteConnection::database_path(&url).unwrap(), "/var/db/x.sqlite");
    }

    #[tokio::test]
    async fn test_query_with_params() {
        let conn = fixture().await;
        let result = conn
            .query(
                "SELECT title FROM books WHERE author_id = ? ORDER BY title",
                &[CellValue::Int(1)],
                &CancellationToken::new(),
            )
            .await
            .unwrap();
        assert_eq!(result.columns, vec!["title".to_string()]);
        assert_eq!(result.row_count(), 2);
        assert_eq!(result.text(1, 0).as_deref(), Some("b"));
    }

    #[tokio::test]
    async fn test_execute_reports_changes() {
        let conn = fixture().await;
        let changed = conn.execute("UPDATE books SET genre = 'x' WHERE author_id = 1").await.unwrap();
        assert_eq!(changed, 2);
    }

    #[tokio::test]
    async fn test_query_error() {
        let conn = memory();
        let err = conn
            .query("SELECT * FROM nope", &[], &CancellationToken::new())
            .await
            .unwrap_err();
        assert!(matches!(err, DatabaseError::QueryError(_)));
    }

    #[tokio::test]
    async fn test_cancel_interrupts_running_query() {
        let conn = memory();
        let cancel = CancellationToken::new();
        let trigger = cancel.clone();
        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(100)).await;
            trigger.cancel();
        });
        let err = conn
            .query(
                "WITH RECURSIVE c(x) AS (SELECT 1 UNION ALL SELECT x + 1 FROM c) SELECT COUNT(*) FROM c",
                &[],
                &cancel,
            )
            .await
            .unwrap_err();
        assert!(matches!(err, DatabaseError::Cancelled));
        // connection stays usable
        assert!(conn.is_alive().await);
    }

    #[tokio::test]
    async fn test_read_only_transaction() {
        let conn = fixture().await;
        let opts = TxOptions {
            isolation: IsolationLevel::Default,
            read_only: true,
        };
        conn.begin(Some(&opts)).await.unwrap();
        assert!(conn.execute("DELETE FROM books").await.is_err());
        conn.rollback().await.unwrap();
        assert_eq!(conn.execute("DELETE FROM books").await.unwrap(), 4);
    }

    #[tokio::test]
    async fn test_unsupported_isolation() {
        let conn = memory();
        let opts = TxOptions {
            isolation: IsolationLevel::Snapshot,
            read_only: false,
        };
        let err = conn.begin(Some(&opts)).await.unwrap_err();
        assert!(matches!(err, DatabaseError::UnsupportedIsolation(n) if n == "snapshot"));
    }

    #[tokio::test]
    async fn test_reader_tables_and_kinds() {
        let r = reader(fixture().await);
        let all = r.tables(&Filter::default()).await.unwrap();
        let names: Vec<&str> = all.iter().map(|t| t.name.as_str()).collect();
        assert_eq!(names, vec!["authors", "book_titles", "books"]);

        let views = r
            .tables(&Filter {
                types: vec!["VIEW".into()],
                ..Default::default()
            })
            .await
            .unwrap();
        assert_eq!(views.len(), 1);
        assert_eq!(views[0].kind, "VIEW");

        let system = r
            .tables(&Filter {
                name: Some("sqlite_%".into()),
                with_system: true,
                ..Default::default()
            })
            .await
            .unwrap();
        assert!(system.iter().any(|t| t.name == "sqlite_sequence" && t.kind == "SYSTEM TABLE"));
    }

    #[tokio::test]
    async fn test_reader_columns_indexes_constraints() {
        let r = reader(fixture().await);
        let filter = Filter {
            parent: Some("books".into()),
            ..Default::default()
        };
        let columns = r.columns(&filter).await.unwrap();
        assert_eq!(columns.len(), 4);
        assert!(columns[0].is_primary_key);
        assert_eq!(columns[1].name, "author_id");
        assert_eq!(columns[1].ordinal_position, 2);

        let indexes = r.indexes(&filter).await.unwrap();
        let title = indexes.iter().find(|i| i.name == "books_title").unwrap();
        assert!(title.is_unique);
        assert_eq!(title.columns, vec!["title".to_string()]);

        let fks = r.constraints(&filter).await.unwrap();
        assert_eq!(fks.len(), 1);
        assert_eq!(fks[0].foreign_table.as_deref(), Some("authors"));
        assert_eq!(fks[0].columns, vec!["author_id".to_string()]);
    }

    #[tokio::test]
    async fn test_reader_functions_unsupported() {
        let r = reader(memory());
        assert!(r.functions(&Filter::default()).await.unwrap_err().is_unsupported());
        assert!(r.privilege_summaries(&Filter::default()).await.unwrap_err().is_unsupported());
    }

    #[tokio::test]
    async fn test_table_stats() {
        let r = reader(fixture().await);
        let stats = r.table_stats(&StatsTarget::Table("authors".into())).await.unwrap();
        assert_eq!(stats.rows, Some(2));
        assert_eq!(stats.sequence, Some(2));

        let stats = r
            .table_stats(&StatsTarget::parse("select * from books where genre = 'sf'"))
            .await
            .unwrap();
        assert_eq!(stats.rows, Some(2));
        assert_eq!(stats.sequence, None);
    }

    #[tokio::test]
    async fn test_column_stats() {
        let r = reader(fixture().await);
        let stats = r.column_stats(&StatsTarget::Table("books".into()), 2).await.unwrap();
        let genre = stats.iter().find(|s| s.name == "genre").unwrap();
        assert_eq!(genre.n_distinct, Some(2));
        assert_eq!(genre.null_frac, Some(0.25));
        assert_eq!(genre.most_common_values[0], "sf");
        assert_eq!(genre.most_common_freqs[0], 0.5);
        assert_eq!(genre.histogram_bounds.len(), 2);

        let stats = r.column_stats(&StatsTarget::Table("books".into()), 0).await.unwrap();
        assert!(stats.iter().all(|s| s.most_common_values.is_empty()));

        let err = r.column_stats(&StatsTarget::Table("nope".into()), 0).await.unwrap_err();
        assert!(matches!(err, DatabaseError::NotFound(_)));
    }
}
