// Session
// Open connection, query buffer and transaction state behind the meta-command handler

use crate::db::descriptor::DriverDescriptor;
use crate::db::registry::DriverRegistry;
use crate::db::traits::{Connection, DatabaseError, QueryResult};
use crate::db::tx::TxOptions;
use crate::db::url::DbUrl;
use crate::metacmd::Handler;
use crate::metadata::writer::render_table;
use crate::metadata::MetadataWriter;
use std::io::Write;
use std::sync::{Arc, Mutex};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

/// In-memory output sink shared between the session and its writers
#[derive(Debug, Clone, Default)]
pub struct SharedBuffer(Arc<Mutex<Vec<u8>>>);

impl SharedBuffer {
    /// Everything written so far, lossily decoded
    pub fn contents(&self) -> String {
        match self.0.lock() {
            Ok(buf) => String::from_utf8_lossy(&buf).into_owned(),
            Err(poisoned) => String::from_utf8_lossy(&poisoned.into_inner()).into_owned(),
        }
    }

    pub fn clear(&self) {
        if let Ok(mut buf) = self.0.lock() {
            buf.clear();
        }
    }
}

impl Write for SharedBuffer {
    fn write(&mut self, data: &[u8]) -> std::io::Result<usize> {
        let mut buf = self
            .0
            .lock()
            .map_err(|_| std::io::Error::new(std::io::ErrorKind::Other, "output buffer poisoned"))?;
        buf.extend_from_slice(data);
        Ok(data.len())
    }

    fn flush(&mut self) -> std::io::Result<()> {
        Ok(())
    }
}

#[derive(Debug, Clone)]
enum Output {
    Stdout,
    Buffer(SharedBuffer),
}

/// One client session against one backend
pub struct Session {
    descriptor: Arc<DriverDescriptor>,
    url: DbUrl,
    conn: Arc<dyn Connection>,
    buffer: String,
    in_tx: bool,
    interactive: bool,
    pager: Option<String>,
    output: Output,
}

impl Session {
    /// Resolve the URL scheme through the registry, apply the driver's URL hook and connect
    pub fn open(registry: &DriverRegistry, url: &str) -> Result<Self, DatabaseError> {
        let mut url = DbUrl::parse(url)?;
        let descriptor = registry.lookup(&url.driver())?;
        descriptor.force_params(&mut url);
        let conn = descriptor.open(&url)?;
        info!(driver = %descriptor.name, url = %url, "session opened");
        Ok(Self::with_connection(descriptor, url, conn))
    }

    /// Wrap an already open connection
    pub fn with_connection(descriptor: Arc<DriverDescriptor>, url: DbUrl, conn: Arc<dyn Connection>) -> Self {
        Self {
            descriptor,
            url,
            conn,
            buffer: String::new(),
            in_tx: false,
            interactive: false,
            pager: None,
            output: Output::Stdout,
        }
    }

    pub fn with_interactive(mut self, interactive: bool) -> Self {
        self.interactive = interactive;
        self
    }

    pub fn with_pager(mut self, pager: Option<String>) -> Self {
        self.pager = pager.filter(|p| !p.trim().is_empty());
        self
    }

    /// Send all output to an in-memory buffer instead of stdout
    pub fn capture_output(&mut self) -> SharedBuffer {
        let buf = SharedBuffer::default();
        self.output = Output::Buffer(buf.clone());
        buf
    }

    pub fn descriptor(&self) -> &DriverDescriptor {
        &self.descriptor
    }

    pub fn connection(&self) -> Arc<dyn Connection> {
        self.conn.clone()
    }

    pub fn in_transaction(&self) -> bool {
        self.in_tx
    }

    /// Pending statement text
    pub fn buffer(&self) -> &str {
        &self.buffer
    }

    /// Append a line to the query buffer; returns the complete statement once it ends with `;`
    pub fn push_line(&mut self, line: &str) -> Option<String> {
        if !self.buffer.is_empty() {
            self.buffer.push('\n');
        }
        self.buffer.push_str(line);
        if self.buffer.trim_end().ends_with(';') {
            let stmt = std::mem::take(&mut self.buffer);
            Some(stmt.trim().to_string())
        } else {
            None
        }
    }

    /// Run one statement through the driver's statement hook
    pub async fn execute(&self, stmt: &str, cancel: &CancellationToken) -> Result<QueryResult, DatabaseError> {
        let stmt = self.descriptor.process(stmt);
        debug!(driver = %self.descriptor.name, "executing statement");
        self.conn.query(&stmt, &[], cancel).await
    }

    /// Print a result set, or the affected row count for statements without columns
    pub fn write_result(&self, result: &QueryResult) -> std::io::Result<()> {
        let text = if result.columns.is_empty() {
            format!("{} rows affected\n", result.rows_affected)
        } else {
            let headers: Vec<&str> = result.columns.iter().map(String::as_str).collect();
            let rows: Vec<Vec<String>> = result
                .rows
                .iter()
                .map(|row| row.iter().map(|v| v.to_string()).collect())
                .collect();
            render_table("", &headers, &rows)
        };
        let mut out = self.stdout();
        out.write_all(text.as_bytes())?;
        out.flush()
    }
}

#[async_trait::async_trait]
impl Handler for Session {
    fn interactive(&self) -> bool {
        self.interactive
    }

    fn pager(&self) -> Option<String> {
        self.pager.clone()
    }

    fn stdout(&self) -> Box<dyn Write + Send> {
        match &self.output {
            Output::Stdout => Box::new(std::io::stdout()),
            Output::Buffer(buf) => Box::new(buf.clone()),
        }
    }

    fn url(&self) -> Option<&DbUrl> {
        Some(&self.url)
    }

    fn reset(&mut self) {
        self.buffer.clear();
    }

    async fn begin(&mut self, opts: Option<TxOptions>) -> Result<(), DatabaseError> {
        if self.in_tx {
            return Err(DatabaseError::TransactionState("already in a transaction".to_string()));
        }
        self.conn.begin(opts.as_ref()).await?;
        debug!(?opts, "transaction started");
        self.in_tx = true;
        Ok(())
    }

    async fn commit(&mut self) -> Result<(), DatabaseError> {
        if !self.in_tx {
            return Err(DatabaseError::TransactionState("no transaction in progress".to_string()));
        }
        self.conn.commit().await?;
        debug!("transaction committed");
        self.in_tx = false;
        Ok(())
    }

    async fn rollback(&mut self) -> Result<(), DatabaseError> {
        if !self.in_tx {
            return Err(DatabaseError::TransactionState("no transaction in progress".to_string()));
        }
        let result = self.conn.rollback().await;
        if let Err(e) = &result {
            warn!(error = %e, "rollback failed, transaction state cleared");
        }
        self.in_tx = false;
        result
    }

    fn metadata_writer(&self, cancel: CancellationToken) -> Result<Box<dyn MetadataWriter>, DatabaseError> {
        self.descriptor
            .metadata_writer(self.conn.clone(), self.stdout(), cancel)
    }
}
