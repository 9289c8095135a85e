// Meta-Command Handlers
// Help, Reset, Transact, Describe and Stats

use super::descs::render_catalog;
use super::interrupt::InterruptScope;
use super::pager;
use super::parse::ArgParser;
use super::{MetaError, Params};
use crate::db::traits::DatabaseError;
use crate::db::tx::{IsolationLevel, TxOptions};
use crate::metadata::{StatCategory, StatsTarget};
use std::io::Write;
use tracing::debug;

/// Handler reference stored in the command table
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Cmd {
    Help,
    Reset,
    Transact,
    Describe,
    Stats,
}

impl Cmd {
    pub async fn run(self, p: Params<'_>) -> Result<(), MetaError> {
        match self {
            Cmd::Help => help(p).await,
            Cmd::Reset => {
                p.handler.reset();
                Ok(())
            }
            Cmd::Transact => transact(p).await,
            Cmd::Describe => describe(p).await,
            Cmd::Stats => stats(p).await,
        }
    }
}

/// `\?`: write the catalog, through the pager when interactive
async fn help(p: Params<'_>) -> Result<(), MetaError> {
    let catalog = render_catalog(false);
    match p.handler.pager().filter(|cmd| !cmd.trim().is_empty()) {
        Some(cmd) if p.handler.interactive() => pager::page(&cmd, &catalog).await,
        _ => {
            let mut out = p.handler.stdout();
            out.write_all(catalog.as_bytes())?;
            out.flush()?;
            Ok(())
        }
    }
}

/// Parse `\begin` arguments. `None` means no options were given.
pub fn parse_begin(args: &mut ArgParser) -> Result<Option<TxOptions>, MetaError> {
    let read_only = match args.next_opt()? {
        Some(flag) if flag == "read-only" => true,
        Some(flag) => return Err(MetaError::InvalidOption(flag)),
        None => false,
    };
    let level = args.next_ok()?;
    if !read_only && level.is_none() {
        return Ok(None);
    }

    let isolation = match level.as_deref() {
        None | Some("") => IsolationLevel::Default,
        Some(name) => {
            IsolationLevel::from_name(name).ok_or_else(|| MetaError::InvalidIsolationLevel(name.to_string()))?
        }
    };
    Ok(Some(TxOptions { isolation, read_only }))
}

async fn transact(mut p: Params<'_>) -> Result<(), MetaError> {
    match p.name.as_str() {
        "commit" => Ok(p.handler.commit().await?),
        "rollback" => Ok(p.handler.rollback().await?),
        _ => {
            let opts = parse_begin(&mut p.args)?;
            debug!(?opts, "begin transaction");
            Ok(p.handler.begin(opts).await?)
        }
    }
}

/// Parsed `\d` family invocation
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DescribeRequest {
    /// Command name with the modifier letters stripped
    pub base: String,
    pub verbose: bool,
    pub show_system: bool,
    pub pattern: String,
}

impl DescribeRequest {
    pub fn parse(name: &str, args: &mut ArgParser) -> Result<Self, MetaError> {
        Ok(Self {
            base: name.trim_end_matches(['S', '+']).to_string(),
            verbose: name.contains('+'),
            show_system: name.contains('S'),
            pattern: args.next()?,
        })
    }
}

async fn describe(mut p: Params<'_>) -> Result<(), MetaError> {
    let req = DescribeRequest::parse(&p.name, &mut p.args)?;
    let url = p.handler.url().cloned().ok_or(DatabaseError::NotConnected)?;
    let scope = InterruptScope::new(&p.cancel);
    let mut m = p.handler.metadata_writer(scope.token())?;
    let (pattern, verbose, system) = (req.pattern.as_str(), req.verbose, req.show_system);

    debug!(?req, "describe");
    match req.base.as_str() {
        "d" if !pattern.is_empty() => {
            scope
                .run(m.describe_table_details(&url, pattern, verbose, system))
                .await
        }
        "d" => scope.run(m.list_tables(&url, "tvmsE", pattern, verbose, system)).await,
        "df" | "da" => {
            scope
                .run(m.describe_functions(&url, &req.base, pattern, verbose, system))
                .await
        }
        "dt" | "dtv" | "dtm" | "dts" | "dv" | "dm" | "ds" => {
            scope
                .run(m.list_tables(&url, &req.base, pattern, verbose, system))
                .await
        }
        "dn" => scope.run(m.list_schemas(&url, pattern, verbose, system)).await,
        "di" => scope.run(m.list_indexes(&url, pattern, verbose, system)).await,
        "l" => scope.run(m.list_all_dbs(&url, pattern, verbose)).await,
        "dp" => scope.run(m.list_privilege_summaries(&url, pattern, system)).await,
        _ => Ok(()),
    }
}

/// Parsed `\ss` invocation
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StatsRequest {
    pub categories: Vec<StatCategory>,
    pub pattern: String,
    pub verbose: bool,
    pub k: usize,
}

impl StatsRequest {
    pub fn parse(name: &str, args: &mut ArgParser) -> Result<Self, MetaError> {
        let mut verbose = name.ends_with('+');
        let base = name.trim_end_matches('+');
        let categories = match base {
            "ss" => StatCategory::ALL.to_vec(),
            other => return Err(MetaError::UnknownCommand(other.to_string())),
        };
        // an unquoted query takes the rest of the line and leaves no room for k
        let (pattern, k_arg) = if args.has_more() && is_unquoted_query(args) {
            (args.raw(), None)
        } else {
            (args.next()?, args.next_ok()?)
        };

        let mut k = if verbose { 3 } else { 0 };
        if let Some(value) = k_arg {
            verbose = true;
            k = value.parse().map_err(|_| MetaError::InvalidNumber(value.clone()))?;
        }
        Ok(Self {
            categories,
            pattern,
            verbose,
            k,
        })
    }
}

fn is_unquoted_query(args: &ArgParser) -> bool {
    matches!(StatsTarget::parse(&args.clone().raw()), StatsTarget::Query(_))
}

async fn stats(mut p: Params<'_>) -> Result<(), MetaError> {
    let req = StatsRequest::parse(&p.name, &mut p.args)?;
    let url = p.handler.url().cloned().ok_or(DatabaseError::NotConnected)?;
    let scope = InterruptScope::new(&p.cancel);
    let mut m = p.handler.metadata_writer(scope.token())?;

    debug!(?req, "stats");
    scope
        .run(m.show_stats(&url, &req.categories, &req.pattern, req.verbose, req.k))
        .await
}
