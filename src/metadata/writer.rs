// Default Metadata Writer
// Formats reader output as plain-text reports for the informational meta-commands

use super::pattern::{like_match, parse_pattern, NamePattern};
use super::{
    ColumnStats, DatabaseError, Filter, MetadataReader, MetadataWriter, StatCategory, StatsTarget, Table,
};
use crate::db::url::DbUrl;
use std::io::Write;
use tracing::debug;

/// Render a psql-style aligned table
pub fn render_table(title: &str, headers: &[&str], rows: &[Vec<String>]) -> String {
    let mut widths: Vec<usize> = headers.iter().map(|h| h.chars().count()).collect();
    for row in rows {
        for (i, cell) in row.iter().enumerate() {
            if let Some(w) = widths.get_mut(i) {
                *w = (*w).max(cell.chars().count());
            }
        }
    }
    let total: usize = widths.iter().map(|w| w + 2).sum::<usize>() + widths.len().saturating_sub(1);

    let mut out = String::new();
    if !title.is_empty() {
        let pad = total.saturating_sub(title.chars().count()) / 2;
        out.push_str(&format!("{}{}\n", " ".repeat(pad), title));
    }

    let line = |cells: Vec<String>| -> String {
        let padded: Vec<String> = cells
            .iter()
            .zip(&widths)
            .map(|(c, w)| format!(" {}{} ", c, " ".repeat(w.saturating_sub(c.chars().count()))))
            .collect();
        format!("{}\n", padded.join("|").trim_end())
    };
    out.push_str(&line(headers.iter().map(|h| h.to_string()).collect()));
    out.push_str(&format!(
        "{}\n",
        widths.iter().map(|w| "-".repeat(w + 2)).collect::<Vec<_>>().join("+")
    ));
    for row in rows {
        let mut cells = row.clone();
        cells.resize(widths.len(), String::new());
        out.push_str(&line(cells));
    }
    out.push_str(&match rows.len() {
        1 => "(1 row)\n\n".to_string(),
        n => format!("({} rows)\n\n", n),
    });
    out
}

/// Catalog type strings for relation kind letters
pub fn kinds_to_types(kinds: &str, show_system: bool) -> Vec<String> {
    let mut types = Vec::new();
    for c in kinds.chars() {
        let add: &[&str] = match c {
            't' if show_system => &["BASE TABLE", "TABLE", "LOCAL TEMPORARY", "SYSTEM TABLE"],
            't' => &["BASE TABLE", "TABLE", "LOCAL TEMPORARY"],
            'v' if show_system => &["VIEW", "SYSTEM VIEW"],
            'v' => &["VIEW"],
            'm' => &["MATERIALIZED VIEW"],
            's' => &["SEQUENCE"],
            'E' => &["FOREIGN TABLE"],
            _ => &[],
        };
        for t in add {
            if !types.iter().any(|x: &String| x == t) {
                types.push(t.to_string());
            }
        }
    }
    types
}

// Optional report sections degrade to "absent" when the backend lacks them
fn optional<T>(result: Result<Vec<T>, DatabaseError>) -> Result<Vec<T>, DatabaseError> {
    match result {
        Err(e) if e.is_unsupported() => Ok(Vec::new()),
        other => other,
    }
}

fn kind_label(kind: &str) -> String {
    match kind {
        "BASE TABLE" => "table".to_string(),
        other => other.to_lowercase(),
    }
}

fn title_case(kind: &str) -> String {
    let label = kind_label(kind);
    let mut chars = label.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().collect::<String>() + chars.as_str(),
        None => String::new(),
    }
}

fn qualified(schema: &str, name: &str) -> String {
    if schema.is_empty() {
        name.to_string()
    } else {
        format!("{}.{}", schema, name)
    }
}

/// Generic writer composing over any [`MetadataReader`].
///
/// Every report is rendered in memory first and reaches the sink only once
/// complete.
pub struct DefaultWriter {
    reader: Box<dyn MetadataReader>,
    out: Box<dyn Write + Send>,
}

impl DefaultWriter {
    pub fn new(reader: Box<dyn MetadataReader>, out: Box<dyn Write + Send>) -> Self {
        Self { reader, out }
    }

    fn emit(&mut self, report: &str) -> Result<(), DatabaseError> {
        self.out.write_all(report.as_bytes())?;
        self.out.flush()?;
        Ok(())
    }

    fn relation_filter(pattern: &NamePattern, types: Vec<String>, show_system: bool) -> Filter {
        Filter {
            schema: pattern.schema.clone(),
            name: pattern.name.clone(),
            types,
            with_system: show_system,
            ..Default::default()
        }
    }

    async fn describe_relation(
        reader: &dyn MetadataReader,
        table: &Table,
        verbose: bool,
    ) -> Result<String, DatabaseError> {
        let title = format!("{} \"{}\"", title_case(&table.kind), qualified(&table.schema, &table.name));
        let exact = Filter {
            schema: Some(table.schema.clone()).filter(|s| !s.is_empty()),
            parent: Some(table.name.clone()),
            with_system: true,
            ..Default::default()
        };

        if table.kind == "SEQUENCE" {
            let seqs = optional(
                reader
                    .sequences(&Filter {
                        name: Some(table.name.clone()),
                        parent: None,
                        ..exact.clone()
                    })
                    .await,
            )?;
            let rows: Vec<Vec<String>> = seqs
                .iter()
                .map(|s| {
                    vec![
                        s.data_type.clone(),
                        s.start.clone().unwrap_or_default(),
                        s.min.clone().unwrap_or_default(),
                        s.max.clone().unwrap_or_default(),
                        s.increment.clone().unwrap_or_default(),
                        if s.cycles { "yes" } else { "no" }.to_string(),
                        s.current.clone().unwrap_or_default(),
                    ]
                })
                .collect();
            return Ok(render_table(
                &title,
                &["Type", "Start", "Minimum", "Maximum", "Increment", "Cycles?", "Current"],
                &rows,
            ));
        }

        let columns = reader.columns(&exact).await?;
        let mut headers = vec!["Column", "Type", "Nullable", "Default"];
        if verbose {
            headers.push("Position");
        }
        let rows: Vec<Vec<String>> = columns
            .iter()
            .map(|c| {
                let mut row = vec![
                    c.name.clone(),
                    c.data_type.clone(),
                    if c.is_nullable { String::new() } else { "not null".to_string() },
                    c.default.clone().unwrap_or_default(),
                ];
                if verbose {
                    row.push(c.ordinal_position.to_string());
                }
                row
            })
            .collect();
        let mut report = render_table(&title, &headers, &rows);
        // footer sections attach to the table, before its row-count line gap
        report.truncate(report.trim_end().len());
        report.push('\n');

        let indexes = optional(reader.indexes(&exact).await)?;
        if !indexes.is_empty() {
            report.push_str("Indexes:\n");
            for idx in &indexes {
                let kind = if idx.is_primary {
                    "PRIMARY KEY, "
                } else if idx.is_unique {
                    "UNIQUE, "
                } else {
                    ""
                };
                report.push_str(&format!("    \"{}\" {}({})\n", idx.name, kind, idx.columns.join(", ")));
            }
        }

        let constraints = optional(reader.constraints(&exact).await)?;
        let foreign: Vec<_> = constraints.iter().filter(|c| c.kind == "FOREIGN KEY").collect();
        if !foreign.is_empty() {
            report.push_str("Foreign-key constraints:\n");
            for fk in foreign {
                report.push_str(&format!(
                    "    \"{}\" FOREIGN KEY ({}) REFERENCES {}({})\n",
                    fk.name,
                    fk.columns.join(", "),
                    fk.foreign_table.clone().unwrap_or_default(),
                    fk.foreign_columns.join(", ")
                ));
            }
        }
        report.push('\n');
        Ok(report)
    }

    fn stats_cells(category: StatCategory, stat: &ColumnStats) -> Vec<String> {
        let opt = |v: &Option<String>| v.clone().unwrap_or_default();
        match category {
            StatCategory::Window => vec![opt(&stat.min), opt(&stat.max)],
            StatCategory::NullFraction => vec![stat.null_frac.map(|f| format!("{:.3}", f)).unwrap_or_default()],
            StatCategory::Uniqueness => vec![stat.n_distinct.map(|n| n.to_string()).unwrap_or_default()],
            StatCategory::Length => vec![stat.avg_width.map(|w| format!("{:.1}", w)).unwrap_or_default()],
            StatCategory::Histogram => vec![stat.histogram_bounds.join(", ")],
            StatCategory::MostCommonValues => vec![stat.most_common_values.join(", ")],
            StatCategory::Frequency => vec![stat
                .most_common_freqs
                .iter()
                .map(|f| format!("{:.3}", f))
                .collect::<Vec<_>>()
                .join(", ")],
            StatCategory::Sequence | StatCategory::Size => Vec::new(),
        }
    }

    fn stats_headers(category: StatCategory) -> Vec<&'static str> {
        match category {
            StatCategory::Window => vec!["Min", "Max"],
            StatCategory::Sequence | StatCategory::Size => Vec::new(),
            other => vec![other.title()],
        }
    }
}

#[async_trait::async_trait]
impl MetadataWriter for DefaultWriter {
    async fn describe_table_details(
        &mut self,
        url: &DbUrl,
        pattern: &str,
        verbose: bool,
        show_system: bool,
    ) -> Result<(), DatabaseError> {
        debug!(url = %url, pattern, "describe table details");
        let np = parse_pattern(pattern);
        let filter = Self::relation_filter(&np, kinds_to_types("tvmsE", true), show_system);
        let tables = self.reader.tables(&filter).await?;
        if tables.is_empty() {
            return Err(DatabaseError::NotFound(pattern.to_string()));
        }
        let mut report = String::new();
        for table in &tables {
            report.push_str(&Self::describe_relation(self.reader.as_ref(), table, verbose).await?);
        }
        self.emit(&report)
    }

    async fn list_tables(
        &mut self,
        url: &DbUrl,
        kinds: &str,
        pattern: &str,
        verbose: bool,
        show_system: bool,
    ) -> Result<(), DatabaseError> {
        debug!(url = %url, kinds, pattern, "list tables");
        let np = parse_pattern(pattern);
        let filter = Self::relation_filter(&np, kinds_to_types(kinds, show_system), show_system);
        let tables = self.reader.tables(&filter).await?;
        if tables.is_empty() {
            let msg = if np.is_empty() {
                "Did not find any relations.\n".to_string()
            } else {
                format!("Did not find any relation named \"{}\".\n", pattern)
            };
            return self.emit(&msg);
        }

        let mut headers = vec!["Schema", "Name", "Type"];
        if verbose {
            headers.extend(["Size", "Description"]);
        }
        let rows: Vec<Vec<String>> = tables
            .iter()
            .map(|t| {
                let mut row = vec![t.schema.clone(), t.name.clone(), t.kind_label()];
                if verbose {
                    row.push(t.size.clone().unwrap_or_default());
                    row.push(t.comment.clone().unwrap_or_default());
                }
                row
            })
            .collect();
        let report = render_table("List of relations", &headers, &rows);
        self.emit(&report)
    }

    async fn list_schemas(
        &mut self,
        url: &DbUrl,
        pattern: &str,
        verbose: bool,
        show_system: bool,
    ) -> Result<(), DatabaseError> {
        debug!(url = %url, pattern, "list schemas");
        let np = parse_pattern(pattern);
        let filter = Filter {
            name: np.name.or(np.schema),
            with_system: show_system,
            ..Default::default()
        };
        let schemas = self.reader.schemas(&filter).await?;
        let mut headers = vec!["Name"];
        if verbose {
            headers.push("Catalog");
        }
        let rows: Vec<Vec<String>> = schemas
            .iter()
            .map(|s| {
                let mut row = vec![s.name.clone()];
                if verbose {
                    row.push(s.catalog.clone().unwrap_or_default());
                }
                row
            })
            .collect();
        let report = render_table("List of schemas", &headers, &rows);
        self.emit(&report)
    }

    async fn list_indexes(
        &mut self,
        url: &DbUrl,
        pattern: &str,
        verbose: bool,
        show_system: bool,
    ) -> Result<(), DatabaseError> {
        debug!(url = %url, pattern, "list indexes");
        let np = parse_pattern(pattern);
        let filter = Self::relation_filter(&np, Vec::new(), show_system);
        let indexes = self.reader.indexes(&filter).await?;
        let mut headers = vec!["Schema", "Name", "Type", "Table"];
        if verbose {
            headers.extend(["Columns", "Primary", "Unique"]);
        }
        let rows: Vec<Vec<String>> = indexes
            .iter()
            .map(|i| {
                let mut row = vec![i.schema.clone(), i.name.clone(), "index".to_string(), i.table.clone()];
                if verbose {
                    row.push(i.columns.join(", "));
                    row.push(if i.is_primary { "yes" } else { "no" }.to_string());
                    row.push(if i.is_unique { "yes" } else { "no" }.to_string());
                }
                row
            })
            .collect();
        let report = render_table("List of relations", &headers, &rows);
        self.emit(&report)
    }

    async fn list_all_dbs(&mut self, url: &DbUrl, pattern: &str, _verbose: bool) -> Result<(), DatabaseError> {
        debug!(url = %url, pattern, "list databases");
        let np = parse_pattern(pattern);
        let filter = Filter {
            name: np.name.clone(),
            ..Default::default()
        };
        let catalogs = self.reader.catalogs(&filter).await?;
        let rows: Vec<Vec<String>> = catalogs
            .into_iter()
            .filter(|c| np.name.as_deref().map_or(true, |p| like_match(p, &c.name)))
            .map(|c| vec![c.name])
            .collect();
        let report = render_table("List of databases", &["Name"], &rows);
        self.emit(&report)
    }

    async fn list_privilege_summaries(
        &mut self,
        url: &DbUrl,
        pattern: &str,
        show_system: bool,
    ) -> Result<(), DatabaseError> {
        debug!(url = %url, pattern, "list privilege summaries");
        let np = parse_pattern(pattern);
        let filter = Self::relation_filter(&np, Vec::new(), show_system);
        let privileges = self.reader.privilege_summaries(&filter).await?;
        let rows: Vec<Vec<String>> = privileges
            .iter()
            .map(|p| {
                vec![
                    p.schema.clone(),
                    p.name.clone(),
                    kind_label(&p.kind),
                    p.object_privileges.join(", "),
                    p.column_privileges.join(", "),
                ]
            })
            .collect();
        let report = render_table(
            "Access privileges",
            &["Schema", "Name", "Type", "Access privileges", "Column privileges"],
            &rows,
        );
        self.emit(&report)
    }

    async fn describe_functions(
        &mut self,
        url: &DbUrl,
        kinds: &str,
        pattern: &str,
        verbose: bool,
        show_system: bool,
    ) -> Result<(), DatabaseError> {
        debug!(url = %url, kinds, pattern, "describe functions");
        let types: Vec<String> = if kinds.ends_with('a') {
            vec!["AGGREGATE".to_string()]
        } else {
            vec!["FUNCTION".to_string(), "PROCEDURE".to_string()]
        };
        let np = parse_pattern(pattern);
        let filter = Self::relation_filter(&np, types, show_system);
        let functions = self.reader.functions(&filter).await?;
        let mut headers = vec!["Schema", "Name", "Result data type", "Argument data types", "Type"];
        if verbose {
            headers.extend(["Volatility", "Security", "Language"]);
        }
        let rows: Vec<Vec<String>> = functions
            .iter()
            .map(|f| {
                let mut row = vec![
                    f.schema.clone(),
                    f.name.clone(),
                    f.result_type.clone(),
                    f.arg_types.clone(),
                    f.kind.to_lowercase(),
                ];
                if verbose {
                    row.push(f.volatility.clone().unwrap_or_default());
                    row.push(f.security.clone().unwrap_or_default());
                    row.push(f.language.clone().unwrap_or_default());
                }
                row
            })
            .collect();
        let report = render_table("List of functions", &headers, &rows);
        self.emit(&report)
    }

    async fn show_stats(
        &mut self,
        url: &DbUrl,
        categories: &[StatCategory],
        pattern: &str,
        verbose: bool,
        k: usize,
    ) -> Result<(), DatabaseError> {
        debug!(url = %url, pattern, k, "show stats");
        if pattern.trim().is_empty() {
            return Err(DatabaseError::QueryError("a table name or query is required".to_string()));
        }
        let target = StatsTarget::parse(pattern);
        let mut report = String::new();

        let wants = |c: StatCategory| categories.contains(&c);
        if wants(StatCategory::Size) || wants(StatCategory::Sequence) {
            let stats = self.reader.table_stats(&target).await?;
            let mut headers = Vec::new();
            let mut row = Vec::new();
            if wants(StatCategory::Size) {
                headers.push(StatCategory::Size.title());
                row.push(stats.rows.map(|r| r.to_string()).unwrap_or_default());
                if verbose {
                    headers.push("Size");
                    row.push(stats.size_bytes.map(|b| b.to_string()).unwrap_or_default());
                }
            }
            if wants(StatCategory::Sequence) {
                headers.push(StatCategory::Sequence.title());
                row.push(stats.sequence.map(|s| s.to_string()).unwrap_or_default());
            }
            report.push_str(&render_table(
                &format!("Table \"{}\"", target.label()),
                &headers,
                &[row],
            ));
        }

        // value distributions are only shown on request
        let column_categories: Vec<StatCategory> = categories
            .iter()
            .copied()
            .filter(|c| !matches!(c, StatCategory::Size | StatCategory::Sequence))
            .filter(|c| {
                verbose && k > 0
                    || !matches!(
                        c,
                        StatCategory::Histogram | StatCategory::MostCommonValues | StatCategory::Frequency
                    )
            })
            .collect();
        if !column_categories.is_empty() {
            let stats = self.reader.column_stats(&target, k).await?;
            let mut headers = vec!["Column", "Type"];
            for c in &column_categories {
                headers.extend(Self::stats_headers(*c));
            }
            let rows: Vec<Vec<String>> = stats
                .iter()
                .map(|s| {
                    let mut row = vec![s.name.clone(), s.data_type.clone()];
                    for c in &column_categories {
                        row.extend(Self::stats_cells(*c, s));
                    }
                    row
                })
                .collect();
            report.push_str(&render_table("Column stats", &headers, &rows));
        }

        self.emit(&report)
    }
}
