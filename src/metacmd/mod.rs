//! Backslash meta-command interpreter.
//!
//! A line such as `\dS+ widgets` is split into the command token and its
//! argument text, the token is resolved through the flattened command table
//! in [`descs`], and the matching handler in [`cmds`] runs against a
//! [`Handler`], the session that owns the connection, transaction state and
//! output.
//!
//! ## Module Structure
//!
//! - `descs`: command catalog, modifier expansion and lookup
//! - `parse`: argument tokenizer
//! - `cmds`: Help, Reset, Transact, Describe and Stats handlers
//! - `pager`: external pager for help output
//! - `interrupt`: cancellable scope bound to Ctrl-C

pub mod cmds;
pub mod descs;
pub mod interrupt;
pub mod pager;
pub mod parse;

pub use cmds::Cmd;
pub use descs::{lookup, render_catalog, Desc, Section};
pub use parse::ArgParser;

use crate::db::traits::DatabaseError;
use crate::db::tx::TxOptions;
use crate::db::url::DbUrl;
use crate::metadata::MetadataWriter;
use std::io::Write;
use tokio_util::sync::CancellationToken;
use tracing::debug;

/// Meta-command errors
#[derive(Debug, thiserror::Error)]
pub enum MetaError {
    #[error("unknown command: \\{0}")]
    UnknownCommand(String),

    #[error("invalid option: -{0}")]
    InvalidOption(String),

    #[error("invalid isolation level: {0}")]
    InvalidIsolationLevel(String),

    #[error("invalid number: {0}")]
    InvalidNumber(String),

    #[error("missing required argument: {0}")]
    MissingArgument(String),

    #[error("unterminated quoted string")]
    UnterminatedQuote,

    #[error("cancelled")]
    Cancelled,

    #[error("could not start pager: {0}")]
    PagerSpawn(#[source] std::io::Error),

    #[error("pager error: {0}")]
    PagerIo(#[source] std::io::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Database(DatabaseError),
}

impl MetaError {
    /// Cancellation is not a failure of the command itself
    pub fn is_cancelled(&self) -> bool {
        matches!(self, MetaError::Cancelled)
    }
}

impl From<DatabaseError> for MetaError {
    fn from(err: DatabaseError) -> Self {
        match err {
            DatabaseError::Cancelled => MetaError::Cancelled,
            other => MetaError::Database(other),
        }
    }
}

/// Session side of the meta-commands: connection, transaction state and output
#[async_trait::async_trait]
pub trait Handler: Send {
    /// Whether input comes from a terminal
    fn interactive(&self) -> bool;

    /// Pager command line, if one is configured
    fn pager(&self) -> Option<String>;

    /// Sink for command output
    fn stdout(&self) -> Box<dyn Write + Send>;

    /// URL of the open connection
    fn url(&self) -> Option<&DbUrl>;

    /// Clear the query buffer
    fn reset(&mut self);

    /// Open a transaction; `None` leaves isolation and access mode to the backend
    async fn begin(&mut self, opts: Option<TxOptions>) -> Result<(), DatabaseError>;

    async fn commit(&mut self) -> Result<(), DatabaseError>;

    async fn rollback(&mut self) -> Result<(), DatabaseError>;

    /// Metadata writer over the open connection, writing to [`Handler::stdout`]
    fn metadata_writer(&self, cancel: CancellationToken) -> Result<Box<dyn MetadataWriter>, DatabaseError>;
}

/// One invocation of a meta-command
pub struct Params<'a> {
    pub handler: &'a mut dyn Handler,
    /// Resolved command name: aliases replaced, modifiers in canonical order
    pub name: String,
    pub args: ArgParser,
    /// Parent token for cancellable scopes
    pub cancel: CancellationToken,
}

/// Split a meta-command line into command token and argument text
pub fn split_command(line: &str) -> (&str, &str) {
    let line = line.trim_start();
    let line = line.strip_prefix('\\').unwrap_or(line);
    match line.find(char::is_whitespace) {
        Some(i) => (&line[..i], &line[i..]),
        None => (line, ""),
    }
}

/// Resolve and run one meta-command line
pub async fn dispatch(handler: &mut dyn Handler, line: &str, cancel: &CancellationToken) -> Result<(), MetaError> {
    let (token, rest) = split_command(line);
    let (name, cmd) = lookup(token).ok_or_else(|| MetaError::UnknownCommand(token.to_string()))?;
    debug!(command = %name, "dispatching meta-command");
    let params = Params {
        handler,
        name,
        args: ArgParser::new(rest),
        cancel: cancel.clone(),
    };
    cmd.run(params).await
}

#[cfg(test)]
pub(crate) mod testing {
    use super::*;
    use crate::metadata::{DefaultWriter, MetadataReader, StatCategory};
    use std::sync::{Arc, Mutex};

    /// Calls recorded by [`MockHandler`]
    #[derive(Debug, Clone, PartialEq)]
    pub enum Call {
        Reset,
        Begin(Option<TxOptions>),
        Commit,
        Rollback,
        Describe(String),
        Stats(Vec<StatCategory>, String, bool, usize),
    }

    #[derive(Clone, Default)]
    pub struct SharedBuf(pub Arc<Mutex<Vec<u8>>>);

    impl SharedBuf {
        pub fn contents(&self) -> String {
            String::from_utf8(self.0.lock().unwrap().clone()).unwrap()
        }
    }

    impl Write for SharedBuf {
        fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
            self.0.lock().unwrap().extend_from_slice(buf);
            Ok(buf.len())
        }

        fn flush(&mut self) -> std::io::Result<()> {
            Ok(())
        }
    }

    /// Writer that records calls, optionally blocking until its token is cancelled
    pub struct RecordingWriter {
        pub calls: Arc<Mutex<Vec<Call>>>,
        pub hang: bool,
        pub cancel: CancellationToken,
    }

    impl RecordingWriter {
        async fn record(&mut self, call: Call) -> Result<(), DatabaseError> {
            if self.hang {
                self.cancel.cancelled().await;
                return Err(DatabaseError::Cancelled);
            }
            self.calls.lock().unwrap().push(call);
            Ok(())
        }
    }

    #[async_trait::async_trait]
    impl MetadataWriter for RecordingWriter {
        async fn describe_table_details(&mut self, _u: &DbUrl, p: &str, v: bool, s: bool) -> Result<(), DatabaseError> {
            self.record(Call::Describe(format!("details {} v={} s={}", p, v, s))).await
        }

        async fn list_tables(&mut self, _u: &DbUrl, k: &str, p: &str, v: bool, s: bool) -> Result<(), DatabaseError> {
            self.record(Call::Describe(format!("tables {} {} v={} s={}", k, p, v, s))).await
        }

        async fn list_schemas(&mut self, _u: &DbUrl, p: &str, v: bool, s: bool) -> Result<(), DatabaseError> {
            self.record(Call::Describe(format!("schemas {} v={} s={}", p, v, s))).await
        }

        async fn list_indexes(&mut self, _u: &DbUrl, p: &str, v: bool, s: bool) -> Result<(), DatabaseError> {
            self.record(Call::Describe(format!("indexes {} v={} s={}", p, v, s))).await
        }

        async fn list_all_dbs(&mut self, _u: &DbUrl, p: &str, v: bool) -> Result<(), DatabaseError> {
            self.record(Call::Describe(format!("dbs {} v={}", p, v))).await
        }

        async fn list_privilege_summaries(&mut self, _u: &DbUrl, p: &str, s: bool) -> Result<(), DatabaseError> {
            self.record(Call::Describe(format!("privileges {} s={}", p, s))).await
        }

        async fn describe_functions(
            &mut self,
            _u: &DbUrl,
            k: &str,
            p: &str,
            v: bool,
            s: bool,
        ) -> Result<(), DatabaseError> {
            self.record(Call::Describe(format!("functions {} {} v={} s={}", k, p, v, s))).await
        }

        async fn show_stats(
            &mut self,
            _u: &DbUrl,
            c: &[StatCategory],
            p: &str,
            v: bool,
            k: usize,
        ) -> Result<(), DatabaseError> {
            self.record(Call::Stats(c.to_vec(), p.to_string(), v, k)).await
        }
    }

    struct EmptyReader;

    impl MetadataReader for EmptyReader {}

    /// Handler recording every call it receives
    pub struct MockHandler {
        pub interactive: bool,
        pub pager: Option<String>,
        pub url: Option<DbUrl>,
        pub calls: Arc<Mutex<Vec<Call>>>,
        pub out: SharedBuf,
        pub in_tx: bool,
        pub hang: bool,
        /// Build the default writer over a reader with no capabilities
        pub bare_backend: bool,
    }

    impl MockHandler {
        pub fn new() -> Self {
            Self {
                interactive: false,
                pager: None,
                url: Some(DbUrl::parse("sqlite::memory:").unwrap()),
                calls: Arc::default(),
                out: SharedBuf::default(),
                in_tx: false,
                hang: false,
                bare_backend: false,
            }
        }

        pub fn calls(&self) -> Vec<Call> {
            self.calls.lock().unwrap().clone()
        }
    }

    #[async_trait::async_trait]
    impl Handler for MockHandler {
        fn interactive(&self) -> bool {
            self.interactive
        }

        fn pager(&self) -> Option<String> {
            self.pager.clone()
        }

        fn stdout(&self) -> Box<dyn Write + Send> {
            Box::new(self.out.clone())
        }

        fn url(&self) -> Option<&DbUrl> {
            self.url.as_ref()
        }

        fn reset(&mut self) {
            self.calls.lock().unwrap().push(Call::Reset);
        }

        async fn begin(&mut self, opts: Option<TxOptions>) -> Result<(), DatabaseError> {
            if self.in_tx {
                return Err(DatabaseError::TransactionState("already in a transaction".into()));
            }
            self.in_tx = true;
            self.calls.lock().unwrap().push(Call::Begin(opts));
            Ok(())
        }

        async fn commit(&mut self) -> Result<(), DatabaseError> {
            if !self.in_tx {
                return Err(DatabaseError::TransactionState("no transaction in progress".into()));
            }
            self.in_tx = false;
            self.calls.lock().unwrap().push(Call::Commit);
            Ok(())
        }

        async fn rollback(&mut self) -> Result<(), DatabaseError> {
            if !self.in_tx {
                return Err(DatabaseError::TransactionState("no transaction in progress".into()));
            }
            self.in_tx = false;
            self.calls.lock().unwrap().push(Call::Rollback);
            Ok(())
        }

        fn metadata_writer(&self, cancel: CancellationToken) -> Result<Box<dyn MetadataWriter>, DatabaseError> {
            if self.url.is_none() {
                return Err(DatabaseError::NotConnected);
            }
            if self.bare_backend {
                return Ok(Box::new(DefaultWriter::new(Box::new(EmptyReader), self.stdout())));
            }
            Ok(Box::new(RecordingWriter {
                calls: self.calls.clone(),
                hang: self.hang,
                cancel,
            }))
        }
    }
}
