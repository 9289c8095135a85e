// Driver Descriptors
// Capability record each backend registers: hooks plus metadata factories

use crate::db::traits::{Connection, DatabaseError};
use crate::db::url::{DbUrl, ForceParamsFn, ProcessFn};
use crate::metadata::{DefaultWriter, MetadataReader, MetadataWriter};
use std::fmt;
use std::io::Write;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;

/// Dials a backend for a (already force-param'd) URL
pub type OpenFn = Arc<dyn Fn(&DbUrl) -> Result<Arc<dyn Connection>, DatabaseError> + Send + Sync>;

/// Builds an introspection reader over a live connection
pub type ReaderFactory = Arc<dyn Fn(Arc<dyn Connection>, CancellationToken) -> Box<dyn MetadataReader> + Send + Sync>;

/// Builds a report writer over a live connection and an output sink
pub type WriterFactory = Arc<
    dyn Fn(Arc<dyn Connection>, Box<dyn Write + Send>, CancellationToken) -> Box<dyn MetadataWriter> + Send + Sync,
>;

/// Per-backend capabilities. Immutable once registered.
#[derive(Clone, Default)]
pub struct DriverDescriptor {
    pub name: String,
    pub aliases: Vec<String>,
    /// Statement rewrite applied before execution
    pub process: Option<ProcessFn>,
    /// URL rewrite applied before dialing
    pub force_params: Option<ForceParamsFn>,
    pub open: Option<OpenFn>,
    pub new_metadata_reader: Option<ReaderFactory>,
    pub new_metadata_writer: Option<WriterFactory>,
    /// Result formatting should consult driver-reported column types
    pub use_column_types: bool,
}

impl DriverDescriptor {
    pub fn new(name: &str) -> Self {
        Self {
            name: name.to_string(),
            ..Default::default()
        }
    }

    pub fn with_aliases(mut self, aliases: &[&str]) -> Self {
        self.aliases = aliases.iter().map(|a| a.to_string()).collect();
        self
    }

    pub fn with_process(mut self, process: impl Fn(&str) -> String + Send + Sync + 'static) -> Self {
        self.process = Some(Arc::new(process));
        self
    }

    pub fn with_force_params(mut self, force: ForceParamsFn) -> Self {
        self.force_params = Some(force);
        self
    }

    pub fn with_open(
        mut self,
        open: impl Fn(&DbUrl) -> Result<Arc<dyn Connection>, DatabaseError> + Send + Sync + 'static,
    ) -> Self {
        self.open = Some(Arc::new(open));
        self
    }

    pub fn with_reader(
        mut self,
        factory: impl Fn(Arc<dyn Connection>, CancellationToken) -> Box<dyn MetadataReader> + Send + Sync + 'static,
    ) -> Self {
        self.new_metadata_reader = Some(Arc::new(factory));
        self
    }

    pub fn with_writer(
        mut self,
        factory: impl Fn(Arc<dyn Connection>, Box<dyn Write + Send>, CancellationToken) -> Box<dyn MetadataWriter>
            + Send
            + Sync
            + 'static,
    ) -> Self {
        self.new_metadata_writer = Some(Arc::new(factory));
        self
    }

    pub fn with_column_types(mut self) -> Self {
        self.use_column_types = true;
        self
    }

    /// Apply the statement hook, if any
    pub fn process(&self, stmt: &str) -> String {
        match &self.process {
            Some(process) => process(stmt),
            None => stmt.to_string(),
        }
    }

    /// Apply the URL hook, if any
    pub fn force_params(&self, url: &mut DbUrl) {
        if let Some(force) = &self.force_params {
            force(url);
        }
    }

    pub fn open(&self, url: &DbUrl) -> Result<Arc<dyn Connection>, DatabaseError> {
        match &self.open {
            Some(open) => open(url),
            None => Err(DatabaseError::Unsupported(format!("opening {} connections", self.name))),
        }
    }

    /// Resolve a metadata writer: the explicit factory, else the default
    /// writer over the reader factory, else unsupported.
    pub fn metadata_writer(
        &self,
        conn: Arc<dyn Connection>,
        out: Box<dyn Write + Send>,
        cancel: CancellationToken,
    ) -> Result<Box<dyn MetadataWriter>, DatabaseError> {
        if let Some(factory) = &self.new_metadata_writer {
            return Ok(factory(conn, out, cancel));
        }
        match &self.new_metadata_reader {
            Some(reader) => Ok(Box::new(DefaultWriter::new(reader(conn, cancel), out))),
            None => Err(DatabaseError::Unsupported(format!("metadata for {}", self.name))),
        }
    }
}

impl fmt::Debug for DriverDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DriverDescriptor")
            .field("name", &self.name)
            .field("aliases", &self.aliases)
            .field("process", &self.process.is_some())
            .field("force_params", &self.force_params.is_some())
            .field("open", &self.open.is_some())
            .field("new_metadata_reader", &self.new_metadata_reader.is_some())
            .field("new_metadata_writer", &self.new_metadata_writer.is_some())
            .field("use_column_types", &self.use_column_types)
            .finish()
    }
}
